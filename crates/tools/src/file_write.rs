//! Mutating filesystem tools: create_folder, create_file, write_to_file, delete_file.

use async_trait::async_trait;
use serde_json::{Map, Value};
use toolpilot_core::error::ToolError;
use toolpilot_core::tool::{ArgumentSchema, ParamKind, Tool, ToolOutput};
use tracing::info;

use crate::workspace::{Workspace, io_failure, str_arg};

pub struct CreateFolderTool {
    workspace: Workspace,
}

impl CreateFolderTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for CreateFolderTool {
    fn name(&self) -> &str {
        "create_folder"
    }

    fn description(&self) -> &str {
        "Create a new folder at the specified path."
    }

    fn schema(&self) -> ArgumentSchema {
        ArgumentSchema::new().required(
            "path",
            ParamKind::String,
            "The path where the folder should be created",
        )
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let path = self.workspace.resolve(str_arg(arguments, "path")?);

        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| io_failure(self.name(), "create folder", &path, e))?;

        info!(path = %path.display(), "Created folder");
        Ok(ToolOutput::text(format!("Folder created at {}", path.display())))
    }
}

pub struct CreateFileTool {
    workspace: Workspace,
}

impl CreateFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for CreateFileTool {
    fn name(&self) -> &str {
        "create_file"
    }

    fn description(&self) -> &str {
        "Create a new file at the specified path with optional content."
    }

    fn schema(&self) -> ArgumentSchema {
        ArgumentSchema::new()
            .required("path", ParamKind::String, "The path where the file should be created")
            .optional("content", ParamKind::String, "The initial content of the file (optional)")
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let path = self.workspace.resolve(str_arg(arguments, "path")?);
        let content = arguments.get("content").and_then(Value::as_str).unwrap_or("");

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_failure(self.name(), "create directory", parent, e))?;
        }

        tokio::fs::write(&path, content)
            .await
            .map_err(|e| io_failure(self.name(), "create file", &path, e))?;

        info!(path = %path.display(), bytes = content.len(), "Created file");
        Ok(ToolOutput::text(format!("File created at {}", path.display())))
    }
}

pub struct WriteToFileTool {
    workspace: Workspace,
}

impl WriteToFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for WriteToFileTool {
    fn name(&self) -> &str {
        "write_to_file"
    }

    fn description(&self) -> &str {
        "Write content to a file at the specified path. Replaces any existing content."
    }

    fn schema(&self) -> ArgumentSchema {
        ArgumentSchema::new()
            .required("path", ParamKind::String, "The path of the file to write to")
            .required("content", ParamKind::String, "The full content to write to the file")
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let path = self.workspace.resolve(str_arg(arguments, "path")?);
        let content = str_arg(arguments, "content")?;

        tokio::fs::write(&path, content)
            .await
            .map_err(|e| io_failure(self.name(), "write", &path, e))?;

        info!(path = %path.display(), bytes = content.len(), "Wrote file");
        Ok(ToolOutput::text(format!(
            "Wrote {} bytes to {}",
            content.len(),
            path.display()
        )))
    }
}

pub struct DeleteFileTool {
    workspace: Workspace,
}

impl DeleteFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &str {
        "delete_file"
    }

    fn description(&self) -> &str {
        "Delete a file at the specified path."
    }

    fn schema(&self) -> ArgumentSchema {
        ArgumentSchema::new().required("path", ParamKind::String, "The path of the file to delete")
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let path = self.workspace.resolve(str_arg(arguments, "path")?);

        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| io_failure(self.name(), "delete", &path, e))?;

        info!(path = %path.display(), "Deleted file");
        Ok(ToolOutput::text(format!("File deleted: {}", path.display())))
    }
}

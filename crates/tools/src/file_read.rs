//! Read-only filesystem tools: read_file and list_files.

use async_trait::async_trait;
use serde_json::{Map, Value};
use toolpilot_core::error::ToolError;
use toolpilot_core::tool::{ArgumentSchema, ParamKind, Tool, ToolOutput};
use tracing::debug;

use crate::workspace::{Workspace, io_failure, str_arg};

pub struct ReadFileTool {
    workspace: Workspace,
}

impl ReadFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file at the specified path."
    }

    fn schema(&self) -> ArgumentSchema {
        ArgumentSchema::new().required("path", ParamKind::String, "The path of the file to read")
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let path = self.workspace.resolve(str_arg(arguments, "path")?);

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| io_failure(self.name(), "read", &path, e))?;

        debug!(path = %path.display(), bytes = content.len(), "Read file");
        Ok(ToolOutput::text(content))
    }
}

pub struct ListFilesTool {
    workspace: Workspace,
}

impl ListFilesTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List all files and directories in the specified path."
    }

    fn schema(&self) -> ArgumentSchema {
        ArgumentSchema::new().optional(
            "path",
            ParamKind::String,
            "The path of the folder to list (optional, defaults to current directory)",
        )
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let raw = arguments.get("path").and_then(Value::as_str).unwrap_or(".");
        let path = self.workspace.resolve(raw);

        let mut dir = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| io_failure(self.name(), "list", &path, e))?;

        let mut files = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| io_failure(self.name(), "list", &path, e))?
        {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                name.push('/');
            }
            files.push(name);
        }
        files.sort();

        debug!(path = %path.display(), count = files.len(), "Listed directory");

        let output = if files.is_empty() {
            format!("{} is empty", path.display())
        } else {
            files.join("\n")
        };
        Ok(ToolOutput::text(output).with_data(serde_json::json!({ "files": files })))
    }
}

//! Path resolution shared by the filesystem tools.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use toolpilot_core::error::ToolError;

/// The directory relative tool paths are resolved against.
#[derive(Debug, Clone)]
pub struct Workspace {
    base_dir: PathBuf,
}

impl Workspace {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// A workspace rooted at the process's current directory.
    pub fn current_dir() -> Result<Self, ToolError> {
        std::env::current_dir()
            .map(Self::new)
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "workspace".into(),
                reason: format!("Cannot determine current directory: {e}"),
            })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Absolute paths are used as-is; relative ones are joined to the base.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }
}

/// Fetch a string argument that the schema already guaranteed, or fail.
pub(crate) fn str_arg<'a>(arguments: &'a Map<String, Value>, key: &str) -> Result<&'a str, ToolError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

pub(crate) fn io_failure(tool_name: &str, action: &str, path: &Path, e: std::io::Error) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: tool_name.into(),
        reason: format!("Failed to {action} {}: {e}", path.display()),
    }
}

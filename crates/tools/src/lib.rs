//! Built-in tool implementations for toolpilot.
//!
//! Tools give the assistant the ability to interact with the world:
//! search the web, and create, write, read, list, and delete files.
//! Filesystem tools resolve relative paths against a [`Workspace`].

pub mod file_read;
pub mod file_write;
pub mod search;
pub mod web_search;
pub mod workspace;

use std::sync::Arc;
use toolpilot_core::error::ToolError;
use toolpilot_core::search::SearchProvider;
use toolpilot_core::tool::ToolRegistry;

pub use file_read::{ListFilesTool, ReadFileTool};
pub use file_write::{CreateFileTool, CreateFolderTool, DeleteFileTool, WriteToFileTool};
pub use web_search::SearchTool;
pub use workspace::Workspace;

/// Create the registry with every built-in tool.
pub fn default_registry(
    workspace: Workspace,
    search: Arc<dyn SearchProvider>,
    results_limit: usize,
) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SearchTool::new(search, results_limit)))?;
    registry.register(Arc::new(CreateFolderTool::new(workspace.clone())))?;
    registry.register(Arc::new(CreateFileTool::new(workspace.clone())))?;
    registry.register(Arc::new(WriteToFileTool::new(workspace.clone())))?;
    registry.register(Arc::new(ReadFileTool::new(workspace.clone())))?;
    registry.register(Arc::new(ListFilesTool::new(workspace.clone())))?;
    registry.register(Arc::new(DeleteFileTool::new(workspace)))?;
    Ok(registry)
}

//! The Tool trait: the abstraction over assistant capabilities.
//!
//! Tools are what give the assistant the ability to act in the world:
//! search the web, create folders, read and write files.
//! The model chooses a tool by name at runtime, so every request is
//! checked against the tool's declared [`ArgumentSchema`] before dispatch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ToolError;

/// The JSON type a parameter must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamKind {
    /// The JSON Schema `type` keyword for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Whether `value` has this JSON type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

/// The closed set of parameters a tool accepts, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgumentSchema {
    pub params: Vec<ParamSpec>,
}

impl ArgumentSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required parameter.
    pub fn required(mut self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            kind,
            required: true,
            description: description.into(),
        });
        self
    }

    /// Add an optional parameter.
    pub fn optional(mut self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            kind,
            required: false,
            description: description.into(),
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Check `arguments` against the schema.
    ///
    /// Reports every problem at once: missing required parameters, unknown
    /// extra parameters, and values of the wrong JSON type. An explicit
    /// `null` is accepted for an optional parameter.
    pub fn validate(&self, arguments: &Map<String, Value>) -> std::result::Result<(), String> {
        let mut problems = Vec::new();

        for param in self.params.iter().filter(|p| p.required) {
            if !arguments.contains_key(&param.name) {
                problems.push(format!("missing required argument '{}'", param.name));
            }
        }

        for (key, value) in arguments {
            match self.get(key) {
                None => problems.push(format!("unexpected argument '{key}'")),
                Some(param) if value.is_null() && !param.required => {}
                Some(param) if !param.kind.matches(value) => problems.push(format!(
                    "argument '{}' must be of type {}",
                    param.name,
                    param.kind.as_str()
                )),
                Some(_) => {}
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }

    /// Render as a JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            properties.insert(
                param.name.clone(),
                serde_json::json!({
                    "type": param.kind.as_str(),
                    "description": param.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// The published description of a registered tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub schema: ArgumentSchema,
}

impl ToolSpec {
    /// The function signature shown to the model.
    pub fn to_function_json(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.schema.to_json_schema(),
        })
    }
}

/// A structured tool invocation extracted from model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Unique request ID, assigned when the request is extracted
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments keyed by parameter name
    pub arguments: Map<String, Value>,
}

impl ToolCallRequest {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: format!("call_{}", Uuid::new_v4().simple()),
            name: name.into(),
            arguments,
        }
    }
}

/// What a tool handler hands back on success.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Human and model readable summary
    pub output: String,

    /// Optional structured payload (search hits, file listings)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolOutput {
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Why a tool call produced a failure result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnknownTool,
    InvalidArguments,
    Execution,
    Timeout,
}

/// The outcome of one tool call. Every request yields exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The request this result answers
    pub request: ToolCallRequest,

    /// Whether the tool executed successfully
    pub success: bool,

    /// Output on success, error description on failure
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl ToolResult {
    pub fn success(request: ToolCallRequest, output: ToolOutput) -> Self {
        Self {
            request,
            success: true,
            output: output.output,
            data: output.data,
            failure: None,
        }
    }

    pub fn failure(request: ToolCallRequest, kind: FailureKind, error: impl Into<String>) -> Self {
        Self {
            request,
            success: false,
            output: error.into(),
            data: None,
            failure: Some(kind),
        }
    }

    /// Render the result the way it is fed back to the model.
    pub fn render_for_model(&self) -> String {
        let mut body = serde_json::json!({
            "name": self.request.name,
            "success": self.success,
        });
        if self.success {
            body["output"] = Value::String(self.output.clone());
            if let Some(data) = &self.data {
                body["data"] = data.clone();
            }
        } else {
            body["error"] = Value::String(self.output.clone());
        }
        format!("<tool_response>{body}</tool_response>")
    }
}

/// The core Tool trait.
///
/// Each built-in tool (search, create_file, read_file, ...) implements this
/// trait and is registered in the [`ToolRegistry`] at start-up.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "search", "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// The parameters this tool accepts.
    fn schema(&self) -> ArgumentSchema;

    /// Execute the tool. Arguments have already been validated against
    /// [`Tool::schema`].
    async fn execute(&self, arguments: &Map<String, Value>) -> std::result::Result<ToolOutput, ToolError>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            schema: self.schema(),
        }
    }
}

/// A registry of available tools.
///
/// Built once at start-up, then shared read-only behind an `Arc`.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Fails if a tool with the same name exists.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> std::result::Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateName(name));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Look up a tool by name.
    pub fn resolve(&self, name: &str) -> std::result::Result<Arc<dyn Tool>, ToolError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// All tool specs, sorted by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self.tools.values().map(|t| t.spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// All registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn schema(&self) -> ArgumentSchema {
            ArgumentSchema::new()
                .required("text", ParamKind::String, "Text to echo")
                .optional("times", ParamKind::Integer, "Repeat count")
        }
        async fn execute(&self, arguments: &Map<String, Value>) -> std::result::Result<ToolOutput, ToolError> {
            let text = arguments.get("text").and_then(Value::as_str).unwrap_or("");
            Ok(ToolOutput::text(text))
        }
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn registry_register_and_resolve() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();
        assert!(registry.resolve("echo").is_ok());
        assert!(matches!(
            registry.resolve("nonexistent"),
            Err(ToolError::NotFound(name)) if name == "nonexistent"
        ));
    }

    #[test]
    fn registry_rejects_duplicate_names() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();
        let err = registry.register(Arc::new(EchoTool)).unwrap_err();
        assert!(matches!(err, ToolError::DuplicateName(name) if name == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_specs() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();
        let specs = registry.specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "echo");
        assert_eq!(specs[0].schema.params.len(), 2);
    }

    #[tokio::test]
    async fn resolved_tool_executes() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();
        let tool = registry.resolve("echo").unwrap();
        let out = tool.execute(&args(json!({"text": "hello world"}))).await.unwrap();
        assert_eq!(out.output, "hello world");
    }

    #[test]
    fn schema_accepts_valid_arguments() {
        let schema = EchoTool.schema();
        assert!(schema.validate(&args(json!({"text": "hi"}))).is_ok());
        assert!(schema.validate(&args(json!({"text": "hi", "times": 3}))).is_ok());
        assert!(schema.validate(&args(json!({"text": "hi", "times": null}))).is_ok());
    }

    #[test]
    fn schema_reports_missing_extra_and_mistyped() {
        let schema = EchoTool.schema();

        let err = schema.validate(&Map::new()).unwrap_err();
        assert!(err.contains("missing required argument 'text'"));

        let err = schema.validate(&args(json!({"text": "hi", "colour": "red"}))).unwrap_err();
        assert!(err.contains("unexpected argument 'colour'"));

        let err = schema.validate(&args(json!({"text": 42, "times": "twice"}))).unwrap_err();
        assert!(err.contains("'text' must be of type string"));
        assert!(err.contains("'times' must be of type integer"));
    }

    #[test]
    fn json_schema_lists_required_params() {
        let schema = EchoTool.schema().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["text"]["type"], "string");
        assert_eq!(schema["required"], json!(["text"]));
    }

    #[test]
    fn request_ids_are_unique() {
        let a = ToolCallRequest::new("echo", Map::new());
        let b = ToolCallRequest::new("echo", Map::new());
        assert!(a.id.starts_with("call_"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn failure_result_renders_error() {
        let request = ToolCallRequest::new("nope", Map::new());
        let result = ToolResult::failure(request, FailureKind::UnknownTool, "Tool not found: nope");
        assert!(!result.success);
        let rendered = result.render_for_model();
        assert!(rendered.starts_with("<tool_response>"));
        assert!(rendered.ends_with("</tool_response>"));
        assert!(rendered.contains("Tool not found: nope"));
    }
}

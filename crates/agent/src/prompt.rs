//! System prompt assembly.
//!
//! The system turn has three parts, in this order:
//!
//! 1. Instructions describing the `<tool_call>` protocol
//! 2. A `<tools>` block with one JSON function signature per line
//! 3. Recalled past exchanges, when retrieval returned any

use toolpilot_core::memory::ContextRecord;
use toolpilot_core::tool::ToolSpec;

pub const DEFAULT_INSTRUCTIONS: &str = "You are provided with function signatures within <tools></tools> XML tags. \
You may call one or more functions to assist with the user query. \
Don't make assumptions about what values to plug into functions. \
For each function call return a json object with function name and arguments within <tool_call></tool_call> XML tags as follows:
<tool_call>
{\"name\": <function-name>,\"arguments\": <args-dict>}
</tool_call>";

/// Render the `<tools>` block.
pub fn render_tools(specs: &[ToolSpec]) -> String {
    let mut block = String::from("<tools>\n");
    for spec in specs {
        block.push_str(&spec.to_function_json().to_string());
        block.push('\n');
    }
    block.push_str("</tools>");
    block
}

/// Render recalled exchanges, most similar first. Empty when there are none.
pub fn render_context(records: &[ContextRecord]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let mut block = String::from("Relevant past conversations:\n");
    for (i, record) in records.iter().enumerate() {
        block.push_str(&format!(
            "{}. [similarity={:.2}]\nUser: {}\nAssistant: {}\n",
            i + 1,
            record.similarity.unwrap_or_default(),
            record.prompt,
            record.response
        ));
    }
    block
}

/// Build the full system prompt.
pub fn build_system_prompt(
    instructions: Option<&str>,
    specs: &[ToolSpec],
    context: &[ContextRecord],
) -> String {
    let mut prompt = format!(
        "{}\n\nHere are the available tools:\n{}\n",
        instructions.unwrap_or(DEFAULT_INSTRUCTIONS),
        render_tools(specs)
    );

    let recalled = render_context(context);
    if !recalled.is_empty() {
        prompt.push('\n');
        prompt.push_str(&recalled);
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolpilot_core::tool::{ArgumentSchema, ParamKind};

    fn spec(name: &str) -> ToolSpec {
        ToolSpec {
            name: name.into(),
            description: format!("{name} things"),
            schema: ArgumentSchema::new().required("path", ParamKind::String, "Target path"),
        }
    }

    #[test]
    fn tools_block_has_one_line_per_tool() {
        let block = render_tools(&[spec("read_file"), spec("list_files")]);
        let lines: Vec<_> = block.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "<tools>");
        assert_eq!(lines[3], "</tools>");

        let first: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(first["name"], "read_file");
        assert_eq!(first["parameters"]["required"][0], "path");
    }

    #[test]
    fn default_prompt_describes_protocol() {
        let prompt = build_system_prompt(None, &[spec("search")], &[]);
        assert!(prompt.starts_with("You are provided with function signatures"));
        assert!(prompt.contains("<tool_call>"));
        assert!(prompt.contains("Here are the available tools:\n<tools>\n"));
        assert!(!prompt.contains("Relevant past conversations"));
    }

    #[test]
    fn custom_instructions_replace_default() {
        let prompt = build_system_prompt(Some("Be brief."), &[], &[]);
        assert!(prompt.starts_with("Be brief."));
        assert!(prompt.contains("<tools>\n</tools>"));
    }

    #[test]
    fn recalled_context_is_appended() {
        let mut record = ContextRecord::new("s1", 1, "favourite editor?", "helix", vec![1.0]);
        record.similarity = Some(0.91);

        let prompt = build_system_prompt(None, &[], &[record]);
        assert!(prompt.contains("Relevant past conversations:"));
        assert!(prompt.contains("[similarity=0.91]"));
        assert!(prompt.contains("User: favourite editor?\nAssistant: helix"));
    }
}

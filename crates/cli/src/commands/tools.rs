//! `toolpilot tools` — List the tools the model can call.

use toolpilot_config::AppConfig;
use toolpilot_core::tool::ToolSpec;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    let registry = super::build_registry(config)?;

    println!("🔧 Available Tools ({})", registry.len());
    println!("====================");
    for spec in registry.specs() {
        println!();
        print!("{}", describe(&spec));
    }

    if !config.search_configured() {
        println!();
        println!(
            "  ⚠️  The {} search backend is not configured; `search` calls will fail.",
            config.search.provider.as_str()
        );
    }
    Ok(())
}

fn describe(spec: &ToolSpec) -> String {
    let mut out = format!("  {}\n    {}\n", spec.name, spec.description);
    for param in &spec.schema.params {
        out.push_str(&format!(
            "    - {} ({}{}): {}\n",
            param.name,
            param.kind.as_str(),
            if param.required { "" } else { ", optional" },
            param.description
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolpilot_core::tool::{ArgumentSchema, ParamKind};

    #[test]
    fn describe_marks_optional_params() {
        let spec = ToolSpec {
            name: "create_file".into(),
            description: "Create a file".into(),
            schema: ArgumentSchema::new()
                .required("path", ParamKind::String, "File path")
                .optional("content", ParamKind::String, "Initial content"),
        };
        let text = describe(&spec);
        assert!(text.contains("- path (string): File path"));
        assert!(text.contains("- content (string, optional): Initial content"));
    }
}

//! `yamline directives` - Print the accepted directive table
//!
//! The output is itself a valid directive file, so it can be copied, edited
//! and passed back through the `directives` configuration entry.

use anyhow::{Context, Result};
use yamline::pipeline::DirectiveRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Yaml,
    Json,
}

pub fn list_directives(registry: &DirectiveRegistry, format: TableFormat) -> Result<String> {
    match format {
        TableFormat::Yaml => {
            serde_yaml::to_string(registry).context("Failed to serialize directive table")
        }
        TableFormat::Json => {
            serde_json::to_string_pretty(registry).context("Failed to serialize directive table")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yamline::pipeline::DirectiveSection;

    #[test]
    fn test_yaml_table_loads_back() {
        let registry = DirectiveRegistry::builtin();
        let text = list_directives(&registry, TableFormat::Yaml).unwrap();
        assert_eq!(DirectiveRegistry::from_yaml(&text).unwrap(), registry);
    }

    #[test]
    fn test_json_table() {
        let text = list_directives(&DirectiveRegistry::builtin(), TableFormat::Json).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        let timeout = json["options"]
            .as_array()
            .unwrap()
            .iter()
            .find(|spec| spec["name"] == "timeout")
            .unwrap();
        assert_eq!(timeout["required"][0], "time");
        assert!(
            DirectiveRegistry::builtin()
                .get(DirectiveSection::Tools, "maven")
                .is_some()
        );
    }
}

//! Generator configuration.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default naming template for implicit foreign-key columns.
pub const DEFAULT_FOREIGN_KEY_TEMPLATE: &str = "{field}_{column}";

fn placeholder_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_]*)\}").ok()).as_ref()
}

/// Knobs of the generation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Naming template for implicit foreign-key columns. `{field}` is the
    /// referencing column's name, `{column}` the referenced column's name.
    pub foreign_key_template: String,
    /// Emit `IF NOT EXISTS` in creation DDL.
    pub if_not_exists: bool,
    /// Render Rust source for adapters and the registry.
    pub emit_source: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            foreign_key_template: DEFAULT_FOREIGN_KEY_TEMPLATE.to_string(),
            if_not_exists: true,
            emit_source: true,
        }
    }
}

impl GeneratorConfig {
    /// Render a foreign-key column name with the configured template.
    #[must_use]
    pub fn foreign_key_column_name(&self, field: &str, column: &str) -> String {
        render_template(&self.foreign_key_template, field, column)
    }
}

/// Substitute `{field}` and `{column}` in `template`.
#[must_use]
pub fn render_template(template: &str, field: &str, column: &str) -> String {
    let Some(re) = placeholder_regex() else {
        return template.replace("{field}", field).replace("{column}", column);
    };
    re.replace_all(template, |caps: &regex::Captures<'_>| match &caps[1] {
        "field" => field.to_string(),
        "column" => column.to_string(),
        _ => caps[0].to_string(),
    })
    .into_owned()
}

/// Check a naming template, returning a description of the first problem.
///
/// A template must name the referenced column, otherwise composite keys
/// collapse onto one local column.
pub fn check_template(template: &str) -> Result<(), String> {
    let Some(re) = placeholder_regex() else {
        return Ok(());
    };
    let mut has_column = false;
    for caps in re.captures_iter(template) {
        match &caps[1] {
            "column" => has_column = true,
            "field" => {}
            other => return Err(format!("unknown placeholder `{{{other}}}`")),
        }
    }
    if has_column {
        Ok(())
    } else {
        Err("template must contain `{column}`".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template() {
        let config = GeneratorConfig::default();
        assert_eq!(config.foreign_key_column_name("team", "id"), "team_id");
        assert!(config.if_not_exists);
        assert!(config.emit_source);
    }

    #[test]
    fn test_custom_template() {
        assert_eq!(render_template("fk{column}Of{field}", "owner", "uid"), "fkuidOfowner");
        assert_eq!(render_template("{other}_{column}", "a", "b"), "{other}_b");
    }

    #[test]
    fn test_check_template() {
        assert!(check_template("{field}_{column}").is_ok());
        assert!(check_template("{column}").is_ok());
        assert_eq!(
            check_template("{field}_id").unwrap_err(),
            "template must contain `{column}`"
        );
        assert_eq!(
            check_template("{field}_{col}").unwrap_err(),
            "unknown placeholder `{col}`"
        );
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: GeneratorConfig = serde_json::from_str(r#"{ "if_not_exists": false }"#).unwrap();
        assert!(!config.if_not_exists);
        assert_eq!(config.foreign_key_template, DEFAULT_FOREIGN_KEY_TEMPLATE);
    }
}

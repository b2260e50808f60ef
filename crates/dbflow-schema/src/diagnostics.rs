//! Build-time diagnostics.
//!
//! Validation never aborts the pipeline. Each problem is recorded against
//! the offending entity (and member, when there is one) and logged; the
//! entity is then excluded from generation while the rest of the pipeline
//! keeps going so every problem surfaces in one run.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// One problem attached to a declaration element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Entity (or database, converter, migration) name.
    pub element: String,
    /// Member within the element, if the problem is member-level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// `Element.member` or `Element`.
    #[must_use]
    pub fn location(&self) -> String {
        match &self.member {
            Some(member) => format!("{}.{}", self.element, member),
            None => self.element.clone(),
        }
    }
}

/// Ordered collection of diagnostics for one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, element: &str, message: impl Into<String>) {
        self.push(Severity::Error, element, None, message.into());
    }

    pub fn member_error(&mut self, element: &str, member: &str, message: impl Into<String>) {
        self.push(Severity::Error, element, Some(member), message.into());
    }

    pub fn warning(&mut self, element: &str, message: impl Into<String>) {
        self.push(Severity::Warning, element, None, message.into());
    }

    pub fn member_warning(&mut self, element: &str, member: &str, message: impl Into<String>) {
        self.push(Severity::Warning, element, Some(member), message.into());
    }

    fn push(&mut self, severity: Severity, element: &str, member: Option<&str>, message: String) {
        match severity {
            Severity::Error => {
                tracing::error!(element = element, member = ?member, "{message}");
            }
            Severity::Warning => {
                tracing::warn!(element = element, member = ?member, "{message}");
            }
        }
        self.items.push(Diagnostic {
            severity,
            element: element.to_string(),
            member: member.map(str::to_string),
            message,
        });
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    /// Whether any error is attached to `element`.
    #[must_use]
    pub fn has_errors_for(&self, element: &str) -> bool {
        self.items
            .iter()
            .any(|d| d.is_error() && d.element == element)
    }

    /// Whether `element` itself carries an error, ignoring member-level ones.
    #[must_use]
    pub fn has_element_errors(&self, element: &str) -> bool {
        self.items
            .iter()
            .any(|d| d.is_error() && d.element == element && d.member.is_none())
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.is_error())
    }

    /// Machine-readable report.
    pub fn to_json(&self) -> dbflow_core::Result<String> {
        Ok(serde_json::to_string_pretty(&self.items)?)
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_and_warnings() {
        let mut diags = Diagnostics::new();
        diags.member_warning("Hero", "age", "default ignored");
        assert!(!diags.has_errors());
        diags.member_error("Hero", "kind", "enum cannot be a primary key");
        diags.error("Team", "no primary key");
        assert!(diags.has_errors());
        assert_eq!(diags.error_count(), 2);
        assert!(diags.has_errors_for("Hero"));
        assert!(!diags.has_errors_for("Villain"));
        assert!(!diags.has_element_errors("Hero"));
        assert!(diags.has_element_errors("Team"));
        let locations: Vec<String> = diags.iter().map(Diagnostic::location).collect();
        assert_eq!(locations, ["Hero.age", "Hero.kind", "Team"]);
    }

    #[test]
    fn test_json_report() {
        let mut diags = Diagnostics::new();
        diags.error("Team", "no primary key");
        let json = diags.to_json().unwrap();
        let parsed: Vec<Diagnostic> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0].severity, Severity::Error);
        assert_eq!(parsed[0].member, None);
        assert!(json.contains("\"severity\": \"error\""));
    }
}

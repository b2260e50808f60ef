//! Identifier quoting and literal escaping.
//!
//! DBFlow holds one SQL surface: identifiers are backtick-quoted and string
//! literals are single-quoted with embedded quotes doubled.

const QUOTE: char = '`';

/// Quote an identifier with backticks unless it is already quoted or is `*`.
/// Embedded backticks are doubled.
///
/// Qualified names (`table.column`) are quoted per segment.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    if name.is_empty() || name == "*" || is_quoted(name) {
        return name.to_string();
    }
    if let Some((table, column)) = name.split_once('.') {
        if !table.is_empty() && !column.is_empty() && !column.contains('.') {
            return format!("{}.{}", quote_ident(table), quote_ident(column));
        }
    }
    format!("{QUOTE}{}{QUOTE}", name.replace(QUOTE, "``"))
}

/// Whether `name` is wrapped in backticks.
#[must_use]
pub fn is_quoted(name: &str) -> bool {
    name.len() >= 2 && name.starts_with(QUOTE) && name.ends_with(QUOTE)
}

/// Remove one level of backtick quoting, if present.
#[must_use]
pub fn strip_quotes(name: &str) -> &str {
    if is_quoted(name) {
        &name[1..name.len() - 1]
    } else {
        name
    }
}

/// Escape a string into a single-quoted SQL literal.
#[must_use]
pub fn sql_escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Render bytes as an SQLite blob literal (`X'0AFF'`).
#[must_use]
pub fn blob_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2 + 3);
    out.push_str("X'");
    for b in bytes {
        out.push_str(&format!("{b:02X}"));
    }
    out.push('\'');
    out
}

/// Replace every non-identifier character with `_`.
#[must_use]
pub fn sanitize_identifier(s: &str) -> String {
    let mut out: String = s
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() {
        out.push('_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("name"), "`name`");
        assert_eq!(quote_ident("`name`"), "`name`");
        assert_eq!(quote_ident("*"), "*");
        assert_eq!(quote_ident("Hero.name"), "`Hero`.`name`");
        assert_eq!(quote_ident("odd`name"), "`odd``name`");
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("`id`"), "id");
        assert_eq!(strip_quotes("id"), "id");
        assert_eq!(strip_quotes("`"), "`");
    }

    #[test]
    fn test_sql_escape_string() {
        assert_eq!(sql_escape_string("test"), "'test'");
        assert_eq!(sql_escape_string("O'Brien"), "'O''Brien'");
        assert_eq!(sql_escape_string(""), "''");
    }

    #[test]
    fn test_blob_literal() {
        assert_eq!(blob_literal(&[0x0a, 0xff]), "X'0AFF'");
        assert_eq!(blob_literal(&[]), "X''");
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("my table"), "my_table");
        assert_eq!(sanitize_identifier(""), "_");
    }
}

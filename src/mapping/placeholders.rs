//! `{{ prefix:name }}` placeholder substitution in configured strings

use crate::model::ConnectionId;

pub const CONNECTION_ID: &str = "connection:id";

/// Strip one surrounding `{{ }}` pair, if present.
pub fn strip_braces(expression: &str) -> &str {
    let trimmed = expression.trim();
    trimmed
        .strip_prefix("{{")
        .and_then(|rest| rest.strip_suffix("}}"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Substitute `{{ connection:id }}` in `template`.
///
/// Returns `None` if the template contains any other placeholder or an
/// unclosed `{{`, since such a string cannot be fully resolved.
pub fn resolve_connection_id(connection_id: &ConnectionId, template: &str) -> Option<String> {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}")?;
        if after[..end].trim() != CONNECTION_ID {
            return None;
        }
        result.push_str(connection_id.as_str());
        rest = &after[end + 2..];
    }

    result.push_str(rest);
    Some(result)
}

//! Placeholder substitution for command templates.
//!
//! Templates are plain strings with `{name}` placeholders. Substitution is
//! a single left-to-right pass, so substituted values are never rescanned —
//! a password that happens to contain braces stays literal. Unknown
//! placeholders are left verbatim so a misconfigured template is visible in
//! the rendered command instead of silently producing an empty argument.

use crate::types::ConnectionInfo;

pub fn render(template: &str, vars: &[(String, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        let Some(end) = rest.find('}') else {
            // Unterminated brace: copy through and stop scanning.
            break;
        };
        let key = &rest[1..end];
        match vars.iter().find(|(k, _)| k == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[..=end]),
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    out
}

/// The standard placeholder set for one endpoint. `prefix` is empty for
/// backup templates and `src_` / `dst_` for the two migration endpoints.
pub fn connection_vars(prefix: &str, conn: &ConnectionInfo) -> Vec<(String, String)> {
    vec![
        (format!("{prefix}host"), conn.host.clone()),
        (format!("{prefix}port"), conn.port.to_string()),
        (format!("{prefix}username"), conn.username.clone()),
        (format!("{prefix}password"), conn.password.clone()),
        (format!("{prefix}database"), conn.database.clone()),
    ]
}

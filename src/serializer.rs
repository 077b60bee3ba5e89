use std::path::Path;

use tracing::debug;

use crate::error::Error;
use crate::model::EnvMap;

/// Render a map as dotenv text that parses back to the same map.
///
/// Keys are sorted. Values are double-quoted unless they are plain integers.
/// Lines are joined with `\n` and there is no trailing newline.
pub fn marshal(map: &EnvMap) -> String {
    let mut entries: Vec<(&str, &str)> = map.iter().collect();
    entries.sort_unstable_by(|left, right| left.0.cmp(right.0));

    let lines: Vec<String> = entries
        .into_iter()
        .map(|(key, value)| {
            if is_integer_literal(value) {
                format!("{key}={value}")
            } else {
                format!("{key}=\"{}\"", escape_double_quoted(value))
            }
        })
        .collect();

    lines.join("\n")
}

/// Write [`marshal`] output to `path`, followed by a newline.
pub fn write(map: &EnvMap, path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    let mut content = marshal(map);
    content.push('\n');
    std::fs::write(path, content)?;
    debug!(path = %path.display(), keys = map.len(), "wrote dotenv file");
    Ok(())
}

/// Integers are written bare only when their canonical form matches the
/// value exactly, so `007` or `+1` stay quoted and survive a round trip.
fn is_integer_literal(value: &str) -> bool {
    value
        .parse::<i64>()
        .is_ok_and(|number| number.to_string() == value)
}

fn escape_double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' | '"' | '!' | '$' | '`' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

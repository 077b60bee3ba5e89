use crate::error::ParseError;
use crate::model::EnvMap;
use crate::substitution::{Layered, NoLookup, Resolver, expand, expand_with_escapes};

/// How a value was written, which decides the rules applied to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QuoteStyle {
    /// Inline comments stripped, `$NAME` expanded.
    Unquoted,
    /// Taken literally.
    Single,
    /// Backslash escapes decoded, `$NAME` expanded.
    Double,
}

/// Parse a single dotenv line against `presets`.
///
/// Returns `Ok(None)` for blank and comment lines, and for a bare `KEY`
/// declaration when nothing provides a value for it.
pub fn parse_line(line: &str, presets: &EnvMap) -> Result<Option<(String, String)>, ParseError> {
    parse_line_with_lookup(line, presets, &NoLookup)
}

/// Parse a single dotenv line, resolving references missing from `presets`
/// through `lookup`.
pub fn parse_line_with_lookup(
    line: &str,
    presets: &EnvMap,
    lookup: &dyn Resolver,
) -> Result<Option<(String, String)>, ParseError> {
    parse_statement(line, 1, presets, lookup)
}

pub(crate) fn parse_statement(
    statement: &str,
    line_num: u32,
    presets: &EnvMap,
    lookup: &dyn Resolver,
) -> Result<Option<(String, String)>, ParseError> {
    let mut working = statement.trim_start();
    if working.is_empty() || working.starts_with('#') {
        return Ok(None);
    }

    if let Some(rest) = working.strip_prefix("export")
        && rest.starts_with(char::is_whitespace)
    {
        working = rest.trim_start();
    }

    let Some(sep_idx) = working.find(['=', ':']) else {
        // A bare `KEY` inherits its value from the lookup.
        let key = working.trim_end();
        if !is_bare_key(key) {
            return Err(ParseError::new(line_num, statement));
        }
        return Ok(lookup.resolve(key).map(|value| (key.to_owned(), value)));
    };

    let key = working[..sep_idx].trim();
    if !key.is_empty() && !is_bare_key(key) {
        return Err(ParseError::new(line_num, statement));
    }
    let value_input = working[sep_idx + 1..].trim_start();
    let resolver = Layered {
        primary: presets,
        fallback: lookup,
    };

    Ok(Some((key.to_owned(), parse_value(value_input, &resolver))))
}

fn parse_value(input: &str, resolver: &dyn Resolver) -> String {
    let (style, content) = classify(input);
    match style {
        QuoteStyle::Single => content.to_owned(),
        QuoteStyle::Double => expand_with_escapes(content, resolver, unescape_double),
        QuoteStyle::Unquoted => expand(strip_inline_comment(content), resolver),
    }
}

/// Determine the quoting style of a value and return the text its rules
/// apply to: the inside of the quotes, or the whole input when unquoted.
///
/// A value is only quoted if its closing quote is followed by nothing but
/// whitespace or a comment. Unterminated quotes leave the value unquoted with
/// the opening quote kept as content.
pub(crate) fn classify(input: &str) -> (QuoteStyle, &str) {
    let (style, quote) = match input.as_bytes().first() {
        Some(b'"') => (QuoteStyle::Double, b'"'),
        Some(b'\'') => (QuoteStyle::Single, b'\''),
        _ => return (QuoteStyle::Unquoted, input),
    };

    let Some(close) = find_closing_quote(input.as_bytes(), quote) else {
        return (QuoteStyle::Unquoted, input);
    };

    let tail = input[close + 1..].trim_start();
    if !tail.is_empty() && !tail.starts_with('#') {
        return (QuoteStyle::Unquoted, input);
    }

    (style, &input[1..close])
}

fn find_closing_quote(bytes: &[u8], quote: u8) -> Option<usize> {
    (1..bytes.len()).find(|&idx| bytes[idx] == quote && !is_preceded_by_odd_backslashes(bytes, idx))
}

fn is_preceded_by_odd_backslashes(bytes: &[u8], idx: usize) -> bool {
    let backslash_count = bytes[..idx]
        .iter()
        .rev()
        .take_while(|byte| **byte == b'\\')
        .count();

    backslash_count % 2 == 1
}

fn unescape_double(ch: char) -> Option<char> {
    match ch {
        'n' => Some('\n'),
        'r' => Some('\r'),
        // `\"`, `\\`, `\ ` and unknown escapes drop the backslash.
        other => Some(other),
    }
}

/// Cut an inline comment: a `#` at the start or after whitespace.
fn strip_inline_comment(input: &str) -> &str {
    let bytes = input.as_bytes();
    let end = (0..bytes.len())
        .find(|&idx| bytes[idx] == b'#' && (idx == 0 || bytes[idx - 1].is_ascii_whitespace()))
        .unwrap_or(bytes.len());

    input[..end].trim_end()
}

fn is_bare_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '.' || ch == '-')
}

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, ParseError};
use crate::model::EnvMap;
use crate::parser::parse_statement;
use crate::splitter::{Statements, normalize_newlines};
use crate::substitution::{NoLookup, ProcessEnv, Resolver};

/// File read when no paths are given.
pub const DEFAULT_FILENAME: &str = ".env";

/// Parse dotenv text from a reader.
pub fn parse<R: Read>(reader: R) -> Result<EnvMap, Error> {
    parse_with_lookup(reader, &NoLookup)
}

/// Parse dotenv text from a reader, resolving unknown references through
/// `lookup`.
pub fn parse_with_lookup<R: Read>(mut reader: R, lookup: &dyn Resolver) -> Result<EnvMap, Error> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    parse_bytes(&buf, lookup)
}

/// Parse dotenv text.
pub fn unmarshal(text: &str) -> Result<EnvMap, Error> {
    Ok(parse_document(text, &NoLookup)?)
}

/// Parse dotenv text from UTF-8 bytes.
pub fn unmarshal_bytes(bytes: &[u8]) -> Result<EnvMap, Error> {
    parse_bytes(bytes, &NoLookup)
}

/// Read and merge dotenv files, later files winning.
///
/// References not defined earlier in the same file fall back to the process
/// environment. With no paths, reads [`DEFAULT_FILENAME`].
pub fn read<I, P>(paths: I) -> Result<EnvMap, Error>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    read_with_lookup(&ProcessEnv, paths)
}

/// Like [`read`], but unknown references are resolved through `lookup`
/// instead of the process environment.
pub fn read_with_lookup<I, P>(lookup: &dyn Resolver, paths: I) -> Result<EnvMap, Error>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut merged = EnvMap::new();
    for path in paths_or_default(paths) {
        merged.extend(read_file(&path, lookup)?);
    }
    Ok(merged)
}

pub(crate) fn read_file(path: &Path, lookup: &dyn Resolver) -> Result<EnvMap, Error> {
    let bytes = std::fs::read(path)?;
    let map = parse_bytes(&bytes, lookup)?;
    debug!(path = %path.display(), keys = map.len(), "read dotenv file");
    Ok(map)
}

pub(crate) fn paths_or_default<I, P>(paths: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let paths: Vec<PathBuf> = paths
        .into_iter()
        .map(|path| path.as_ref().to_path_buf())
        .collect();
    if paths.is_empty() {
        vec![PathBuf::from(DEFAULT_FILENAME)]
    } else {
        paths
    }
}

fn parse_bytes(bytes: &[u8], lookup: &dyn Resolver) -> Result<EnvMap, Error> {
    let text = std::str::from_utf8(bytes)?;
    Ok(parse_document(text, lookup)?)
}

/// Parse a whole document. Each assignment becomes visible to the lines
/// after it; the first malformed statement aborts the parse.
pub(crate) fn parse_document(input: &str, lookup: &dyn Resolver) -> Result<EnvMap, ParseError> {
    let normalized = normalize_newlines(input);
    let mut map = EnvMap::new();

    for statement in Statements::new(&normalized) {
        if let Some((key, value)) = parse_statement(statement.text, statement.line, &map, lookup)? {
            map.insert(key, value);
        }
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_quoting() {
        let map = parse("ONE=1\nTWO='2'\nTHREE = \"3\"".as_bytes()).expect("parse should succeed");
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("ONE"), Some("1"));
        assert_eq!(map.get("TWO"), Some("2"));
        assert_eq!(map.get("THREE"), Some("3"));
    }

    #[test]
    fn later_lines_see_earlier_keys() {
        let map = unmarshal("FOO=test\nBAR=$FOO").expect("parse should succeed");
        assert_eq!(map.get("FOO"), Some("test"));
        assert_eq!(map.get("BAR"), Some("test"));
    }

    #[test]
    fn earlier_lines_do_not_see_later_keys() {
        let map = unmarshal("A=$B\nB=value").expect("parse should succeed");
        assert_eq!(map.get("A"), Some(""));
        assert_eq!(map.get("B"), Some("value"));
    }

    #[test]
    fn substitution_sees_latest_assignment_so_far() {
        let map = unmarshal("A=1\nB=$A\nA=2\nC=$A").expect("parse should succeed");
        assert_eq!(map.get("A"), Some("2"));
        assert_eq!(map.get("B"), Some("1"));
        assert_eq!(map.get("C"), Some("2"));
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, ["A", "B", "C"]);
    }

    #[test]
    fn parses_multiline_quoted_values() {
        let input = "TEST_URLS=\"stratum+tcp://stratum.antpool.com:3333\nstratum+tcp://stratum.antpool.com:443\"";
        let map = unmarshal(input).expect("parse should succeed");
        assert_eq!(map.len(), 1);
        assert_eq!(
            map.get("TEST_URLS"),
            Some("stratum+tcp://stratum.antpool.com:3333\nstratum+tcp://stratum.antpool.com:443")
        );
    }

    #[test]
    fn parses_crlf_documents() {
        let map = unmarshal("A=\"line1\r\nline2\"\r\nB=ok\r\n").expect("parse should succeed");
        assert_eq!(map.get("A"), Some("line1\nline2"));
        assert_eq!(map.get("B"), Some("ok"));
    }

    #[test]
    fn unterminated_quote_does_not_swallow_following_lines() {
        let map = unmarshal("KEY=\"value\nNEXT=ok\n").expect("parse should succeed");
        assert_eq!(map.get("KEY"), Some("\"value"));
        assert_eq!(map.get("NEXT"), Some("ok"));
    }

    #[test]
    fn late_closing_quote_does_not_swallow_next_assignment() {
        let map = unmarshal("A=\"abc\nB=\"def\"\nC=1").expect("parse should succeed");
        assert_eq!(map.get("A"), Some("\"abc"));
        assert_eq!(map.get("B"), Some("def"));
        assert_eq!(map.get("C"), Some("1"));
    }

    #[test]
    fn format_error_reports_statement_line() {
        let err = unmarshal("A=ok\n\n# note\nBAD LINE\nC=3\n").expect_err("expected parse error");
        match err {
            Error::Parse(parse_err) => {
                assert_eq!(parse_err.line, 4);
                assert_eq!(parse_err.statement, "BAD LINE");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_utf8() {
        let err = unmarshal_bytes(b"A=\xff\n").expect_err("expected encoding error");
        assert!(matches!(err, Error::InvalidEncoding(_)));
    }

    #[test]
    fn lookup_fills_unknown_references_and_bare_keys() {
        let lookup = |name: &str| (name == "HOME").then(|| "/home/app".to_owned());
        let map = parse_with_lookup("HOME\nCACHE=$HOME/.cache\nGONE\n".as_bytes(), &lookup)
            .expect("parse should succeed");
        assert_eq!(map.get("HOME"), Some("/home/app"));
        assert_eq!(map.get("CACHE"), Some("/home/app/.cache"));
        assert!(!map.contains_key("GONE"));
    }

    #[test]
    fn no_paths_default_to_dotenv() {
        let paths = paths_or_default(std::iter::empty::<&Path>());
        assert_eq!(paths, [PathBuf::from(".env")]);
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid UTF-8 input: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),
}

/// A statement whose key is malformed: no `=` or `:` separator and not a
/// bare key name, or a key with characters outside `[A-Za-z0-9_.-]` and
/// Unicode letters or digits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: can't separate key from value in `{statement}`")]
pub struct ParseError {
    pub line: u32,
    pub statement: String,
}

impl ParseError {
    pub(crate) fn new(line: u32, statement: &str) -> Self {
        Self {
            line,
            statement: statement.to_owned(),
        }
    }
}

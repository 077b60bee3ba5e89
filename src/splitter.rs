use std::borrow::Cow;

/// One logical statement: a `KEY=value` line, possibly spanning several
/// physical lines when a quoted value contains newlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Statement<'a> {
    pub(crate) text: &'a str,
    /// 1-based physical line the statement starts on.
    pub(crate) line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Key,
    ValueStart,
    Unquoted,
    Quoted(u8),
    Escaped(u8),
    Trailing,
}

impl State {
    fn in_quote(self) -> bool {
        matches!(self, Self::Quoted(_) | Self::Escaped(_))
    }
}

/// Iterator over the statements of a document with `\n` line endings.
///
/// Blank lines, whitespace-only lines and `#` comment lines are skipped.
pub(crate) struct Statements<'a> {
    src: &'a str,
    offset: usize,
    line: u32,
}

impl<'a> Statements<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self {
            src,
            offset: 0,
            line: 1,
        }
    }

    /// Advance past whitespace and comment lines to the next statement start.
    fn skip_ignored(&mut self) {
        let bytes = self.src.as_bytes();
        loop {
            while self.offset < bytes.len() && bytes[self.offset].is_ascii_whitespace() {
                if bytes[self.offset] == b'\n' {
                    self.line = self.line.saturating_add(1);
                }
                self.offset += 1;
            }
            if self.offset >= bytes.len() || bytes[self.offset] != b'#' {
                return;
            }
            match self.src[self.offset..].find('\n') {
                Some(len) => self.offset += len,
                None => self.offset = bytes.len(),
            }
        }
    }
}

impl<'a> Iterator for Statements<'a> {
    type Item = Statement<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_ignored();
        let bytes = self.src.as_bytes();
        if self.offset >= bytes.len() {
            return None;
        }

        let start = self.offset;
        let scan = scan_statement(&bytes[start..]);
        let mut end = start + scan.len;
        if scan.is_malformed(&self.src[start..end]) {
            // Fall back to a single physical line.
            if let Some(len) = self.src[start..].find('\n') {
                end = start + len;
            }
        }

        let text = self.src[start..end].trim_end();
        let statement = Statement {
            text,
            line: self.line,
        };

        let newlines = self.src[start..end].matches('\n').count();
        self.line = self
            .line
            .saturating_add(u32::try_from(newlines).unwrap_or(u32::MAX));
        self.offset = end;
        Some(statement)
    }
}

/// Result of scanning one statement.
struct Scan {
    /// Length of the statement, excluding the newline that terminates it.
    len: usize,
    state: State,
    /// Offset of the quote that closed the value, if any.
    close: Option<usize>,
}

impl Scan {
    /// An unterminated quote, or a quote that closes on a later line and is
    /// followed by more value text.
    fn is_malformed(&self, text: &str) -> bool {
        if self.state.in_quote() {
            return true;
        }
        let Some(close) = self.close else {
            return false;
        };
        let tail = text[close + 1..].trim_start();
        text[..close].contains('\n') && !tail.is_empty() && !tail.starts_with('#')
    }
}

fn scan_statement(bytes: &[u8]) -> Scan {
    let mut state = State::Key;
    let mut close = None;
    for (idx, &byte) in bytes.iter().enumerate() {
        if byte == b'\n' && !state.in_quote() {
            return Scan {
                len: idx,
                state,
                close,
            };
        }
        let next = step(state, byte);
        if matches!(state, State::Quoted(_)) && next == State::Trailing {
            close = Some(idx);
        }
        state = next;
    }
    Scan {
        len: bytes.len(),
        state,
        close,
    }
}

fn step(state: State, byte: u8) -> State {
    match state {
        State::Key => match byte {
            b'=' | b':' => State::ValueStart,
            _ => State::Key,
        },
        State::ValueStart => match byte {
            b' ' | b'\t' => State::ValueStart,
            b'"' | b'\'' => State::Quoted(byte),
            _ => State::Unquoted,
        },
        State::Unquoted => State::Unquoted,
        State::Quoted(quote) => match byte {
            b'\\' => State::Escaped(quote),
            _ if byte == quote => State::Trailing,
            _ => State::Quoted(quote),
        },
        State::Escaped(quote) => State::Quoted(quote),
        State::Trailing => State::Trailing,
    }
}

/// Convert `\r\n` and lone `\r` line endings to `\n`.
pub(crate) fn normalize_newlines(input: &str) -> Cow<'_, str> {
    if !input.contains('\r') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\r' {
            out.push('\n');
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            continue;
        }
        out.push(ch);
    }

    Cow::Owned(out)
}

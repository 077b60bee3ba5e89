use crate::model::EnvMap;

/// Source of values for `$NAME` references.
///
/// Implemented for closures, so a lookup can be passed as
/// `|name: &str| std::env::var(name).ok()`.
pub trait Resolver {
    fn resolve(&self, name: &str) -> Option<String>;
}

impl<F> Resolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve(&self, name: &str) -> Option<String> {
        self(name)
    }
}

impl Resolver for EnvMap {
    fn resolve(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_owned)
    }
}

/// Resolves nothing; every reference becomes an empty string.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl Resolver for NoLookup {
    fn resolve(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Reads the current process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Resolver for ProcessEnv {
    fn resolve(&self, name: &str) -> Option<String> {
        std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
    }
}

/// Two resolvers in precedence order: `primary` wins, `fallback` is consulted
/// only when `primary` has no value.
#[derive(Clone, Copy)]
pub struct Layered<'a> {
    pub primary: &'a dyn Resolver,
    pub fallback: &'a dyn Resolver,
}

impl Resolver for Layered<'_> {
    fn resolve(&self, name: &str) -> Option<String> {
        self.primary
            .resolve(name)
            .or_else(|| self.fallback.resolve(name))
    }
}

/// Expand `$NAME`, `${NAME}` and `${NAME:-default}` references in `input`.
///
/// `\$` produces a literal `$`. Other backslashes are copied unchanged.
/// Unresolved references expand to an empty string.
pub fn expand(input: &str, resolver: &dyn Resolver) -> String {
    expand_with_escapes(input, resolver, |_| None)
}

/// Expand references while decoding backslash escapes through `unescape`.
///
/// `unescape` receives the character after a backslash and returns its
/// replacement, or `None` to keep the backslash sequence as written. `\$` is
/// always handled here and never reaches `unescape`.
pub(crate) fn expand_with_escapes<U>(input: &str, resolver: &dyn Resolver, unescape: U) -> String
where
    U: Fn(char) -> Option<char>,
{
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0usize;

    while let Some(offset) = input[cursor..].find(['\\', '$']) {
        let idx = cursor + offset;
        out.push_str(&input[cursor..idx]);

        if input.as_bytes()[idx] == b'\\' {
            let Some(next) = input[idx + 1..].chars().next() else {
                out.push('\\');
                cursor = idx + 1;
                break;
            };
            if next == '$' {
                out.push('$');
            } else if let Some(ch) = unescape(next) {
                out.push(ch);
            } else {
                out.push('\\');
                out.push(next);
            }
            cursor = idx + 1 + next.len_utf8();
            continue;
        }

        match parse_reference(input, idx) {
            Some(reference) => {
                out.push_str(&reference.resolve(resolver));
                cursor = reference.end;
            }
            None => {
                out.push('$');
                cursor = idx + 1;
            }
        }
    }

    out.push_str(&input[cursor..]);
    out
}

#[derive(Debug, PartialEq, Eq)]
struct Reference<'a> {
    name: &'a str,
    default: Option<&'a str>,
    end: usize,
}

impl Reference<'_> {
    fn resolve(&self, resolver: &dyn Resolver) -> String {
        let value = resolver.resolve(self.name);
        match self.default {
            Some(default) => value
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_owned()),
            None => value.unwrap_or_default(),
        }
    }
}

/// Parse the reference starting at the `$` at `start`.
fn parse_reference(input: &str, start: usize) -> Option<Reference<'_>> {
    let rest = &input[start + 1..];

    if let Some(braced) = rest.strip_prefix('{') {
        let close = braced.find('}')?;
        let body = &braced[..close];
        let (name, default) = match body.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (body, None),
        };
        if name.is_empty() {
            return None;
        }
        return Some(Reference {
            name,
            default,
            end: start + 2 + close + 1,
        });
    }

    let len = rest
        .bytes()
        .take_while(|byte| byte.is_ascii_alphanumeric() || *byte == b'_')
        .count();
    if len == 0 {
        return None;
    }

    Some(Reference {
        name: &rest[..len],
        default: None,
        end: start + 1 + len,
    })
}

//! Parse, interpolate, and write `.env` files.
//!
//! [`read`], [`unmarshal`] and [`parse`] return an ordered [`EnvMap`] without
//! touching the process environment. [`marshal`] turns a map back into text
//! that parses to the same map.
//!
//! Values may reference earlier keys as `$NAME` or `${NAME}`; names that are
//! not defined earlier in the file are resolved through a [`Resolver`].
//!
//! [`load`] and [`overload`] mutate the process environment and are `unsafe`,
//! because callers must guarantee no concurrent process-environment access.
//! [`EnvLoader`] with an in-memory [`TargetEnv`] is the safe alternative.

mod env;
mod error;
mod loader;
mod model;
mod parser;
mod reader;
mod serializer;
mod splitter;
mod substitution;

pub use env::TargetEnv;
pub use error::{Error, ParseError};
pub use loader::{EnvLoader, load, overload};
pub use model::{EnvMap, LoadReport};
pub use parser::{parse_line, parse_line_with_lookup};
pub use reader::{
    DEFAULT_FILENAME, parse, parse_with_lookup, read, read_with_lookup, unmarshal, unmarshal_bytes,
};
pub use serializer::{marshal, write};
pub use substitution::{Layered, NoLookup, ProcessEnv, Resolver, expand};

//! Request matching utilities.

mod path;
mod query;

pub use path::{CompiledPattern, Params, PatternError};
pub use query::{parse_query, Query, QueryValue};

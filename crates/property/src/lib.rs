//! Property definitions and property queries.
//!
//! Providers describe each algorithm implementation with a [`PropertySet`]
//! (`"provider=default,fips=yes"`). Callers select among implementations with a
//! [`PropertyQuery`] (`"fips=yes,-legacy,?provider=default"`). Matching is an
//! open-world subset test: a definition matches when every mandatory clause of
//! the query holds, whatever else it declares.
//!
//! # Query syntax
//!
//! | Clause | Meaning |
//! |--------|---------|
//! | `key=value` | `key` is defined with `value` |
//! | `key` | shorthand for `key=yes` |
//! | `key!=value` | `key` is defined with some other value |
//! | `-key` | `key` is not defined |
//! | `?clause` | optional: ranks candidates, never rejects them |
//!
//! Keys and unquoted values are case-insensitive; `yes`/`no` are booleans,
//! digit strings are numbers, quoted values are case-preserving strings.
//! Everything here is a pure function of its inputs.

mod error;
mod parse;
mod query;
mod set;
mod value;

pub use error::ParseError;
pub use query::{Clause, PropertyQuery, Test, matches};
pub use set::PropertySet;
pub use value::PropertyValue;

//! Identifier engine: turns a naming template and one header record into a
//! series key / output prefix.
//!
//! A template mixes literal text with two-character placeholders (`%` and one
//! letter). See [`Placeholder`] for the supported set. Resolution is a pure
//! function: identical inputs always give the identical, sanitised string,
//! which is what lets the series aggregator group files by it.

mod error;
mod placeholder;
mod template;

pub use error::IdentifierError;
pub use placeholder::Placeholder;
pub use template::{resolve, sanitize, Template, FORBIDDEN_CHARS};

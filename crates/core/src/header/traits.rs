//! Trait definitions for the header module.

use std::path::Path;

use super::error::HeaderError;
use super::types::HeaderRecord;

/// Reads the header of one input file into a [`HeaderRecord`].
///
/// Implementations are synchronous; callers run them on blocking threads.
pub trait HeaderParser: Send + Sync {
    /// Returns the name of this parser implementation.
    fn name(&self) -> &str;

    /// Parses the header of the file at `path`.
    fn parse(&self, path: &Path) -> Result<HeaderRecord, HeaderError>;
}

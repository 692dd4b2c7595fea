//! Header parser over JSON fixture files.

use std::path::Path;

use crate::header::{HeaderError, HeaderParser, HeaderRecord};

/// Reads `*.json` files as header records; any other file is not of this
/// format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonHeaderParser;

impl HeaderParser for JsonHeaderParser {
    fn name(&self) -> &str {
        "json"
    }

    fn parse(&self, path: &Path) -> Result<HeaderRecord, HeaderError> {
        if path.extension().is_none_or(|ext| ext != "json") {
            return Err(HeaderError::not_this_format(path));
        }
        let text = std::fs::read_to_string(path).map_err(|source| HeaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| HeaderError::parse(path, e.to_string()))
    }
}

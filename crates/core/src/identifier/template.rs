//! Template parsing, resolution and sanitisation.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use super::error::IdentifierError;
use super::placeholder::Placeholder;
use crate::header::HeaderRecord;

/// Characters replaced by `_` in every resolved identifier.
pub const FORBIDDEN_CHARS: &[char] = &[' ', '<', '>', ':', '"', '/', '\\', '|', '?', '*'];

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%[A-Za-z]").expect("placeholder pattern is valid"));

/// Replaces filesystem-unsafe characters with `_`.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Resolves `template` against one header record and the folder it came from.
pub fn resolve(
    template: &str,
    header: &HeaderRecord,
    folder: &Path,
) -> Result<String, IdentifierError> {
    Template::new(template).resolve(header, folder)
}

/// A naming template such as `%p_%t_%s`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template(String);

impl Template {
    /// Wraps a template string. Placeholders are checked on use.
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// The raw template text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Placeholder tokens in order of appearance, duplicates included.
    pub fn tokens(&self) -> Vec<&str> {
        PLACEHOLDER_RE
            .find_iter(&self.0)
            .map(|m| m.as_str())
            .collect()
    }

    /// Whether the template mentions `token`.
    pub fn contains_token(&self, token: &str) -> bool {
        self.tokens().iter().any(|t| *t == token)
    }

    /// Checks every placeholder is supported.
    pub fn validate(&self) -> Result<Vec<Placeholder>, IdentifierError> {
        self.tokens()
            .into_iter()
            .map(|token| {
                Placeholder::from_token(token).ok_or_else(|| {
                    IdentifierError::UnsupportedPlaceholder {
                        placeholder: token.to_string(),
                        template: self.0.clone(),
                    }
                })
            })
            .collect()
    }

    /// Returns a copy with every occurrence of `from` replaced by `to`.
    pub fn substitute(&self, from: &str, to: &str) -> Self {
        Self(self.0.replace(from, to))
    }

    /// Appends `marker` unless the template already contains it.
    pub fn with_marker(&self, marker: &str) -> Self {
        if marker.is_empty() || self.0.contains(marker) {
            self.clone()
        } else {
            Self(format!("{}{}", self.0, marker))
        }
    }

    /// Substitutes every placeholder and sanitises the result.
    pub fn resolve(&self, header: &HeaderRecord, folder: &Path) -> Result<String, IdentifierError> {
        let mut out = String::with_capacity(self.0.len() * 2);
        let mut last = 0;
        for m in PLACEHOLDER_RE.find_iter(&self.0) {
            out.push_str(&self.0[last..m.start()]);
            let placeholder = Placeholder::from_token(m.as_str()).ok_or_else(|| {
                IdentifierError::UnsupportedPlaceholder {
                    placeholder: m.as_str().to_string(),
                    template: self.0.clone(),
                }
            })?;
            out.push_str(&placeholder.render(header, folder)?);
            last = m.end();
        }
        out.push_str(&self.0[last..]);
        Ok(sanitize(&out))
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Template {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Template {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

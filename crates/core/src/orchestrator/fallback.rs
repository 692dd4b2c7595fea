//! Field-fallback retry around series aggregation.

use std::collections::BTreeSet;
use std::path::Path;
use tracing::{error, info};

use crate::header::HeaderParser;
use crate::identifier::{IdentifierError, Placeholder, Template};
use crate::series::{scan, AggregateError, SeriesMap};

/// Template state threaded through the retries of one top-level input.
///
/// Substitutions stick: the next folder of the same input starts from the
/// rewritten template. Other inputs own their own state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptState {
    template: Template,
    tried_fields: BTreeSet<String>,
    substitutions: usize,
}

impl AttemptState {
    pub fn new(template: Template) -> Self {
        Self {
            template,
            tried_fields: BTreeSet::new(),
            substitutions: 0,
        }
    }

    /// The active, possibly rewritten, template.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Header fields reported missing so far.
    pub fn tried_fields(&self) -> &BTreeSet<String> {
        &self.tried_fields
    }

    /// Substitutions made so far.
    pub fn substitutions(&self) -> usize {
        self.substitutions
    }

    /// Next fallback not already in the template and whose field was not
    /// reported missing.
    fn next_candidate(&self, fallback: &[Placeholder]) -> Option<Placeholder> {
        fallback.iter().copied().find(|candidate| {
            !self.template.contains_token(candidate.token())
                && candidate
                    .field()
                    .is_some_and(|field| !self.tried_fields.contains(field))
        })
    }
}

/// How aggregation of one folder ended.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Series grouped under the state's current template.
    Aggregated(SeriesMap),
    /// Nothing in the folder parsed; skip it.
    NoValidInput,
    /// A field was missing and no fallback was left.
    Exhausted { last_error: IdentifierError },
}

/// Scans `folder`, replacing placeholders whose header field is missing
/// with the next fallback candidate until the scan succeeds.
///
/// Errors other than a missing field or an empty folder are returned as is.
pub fn aggregate_with_fallback(
    parser: &dyn HeaderParser,
    folder: &Path,
    state: &mut AttemptState,
    fallback: &[Placeholder],
) -> Result<AttemptOutcome, AggregateError> {
    loop {
        let err = match scan(parser, folder, &state.template) {
            Ok(series) => return Ok(AttemptOutcome::Aggregated(series)),
            Err(e) if e.is_no_valid_input() => {
                info!(
                    "{} does not contain any DICOM file, it will be skipped",
                    folder.display()
                );
                return Ok(AttemptOutcome::NoValidInput);
            }
            Err(e) => e,
        };

        let (field, placeholder) = match err.identifier_error() {
            Some(IdentifierError::MissingHeaderField { field, placeholder }) => {
                (field.clone(), placeholder.clone())
            }
            _ => return Err(err),
        };
        state.tried_fields.insert(field.clone());

        match state.next_candidate(fallback) {
            Some(candidate) => {
                let rewritten = state.template.substitute(&placeholder, candidate.token());
                info!(
                    "{} not found in a file from {}, replacing {} with {}: template {} -> {}",
                    field,
                    folder.display(),
                    placeholder,
                    candidate.token(),
                    state.template,
                    rewritten
                );
                state.template = rewritten;
                state.substitutions += 1;
            }
            None => {
                error!(
                    "All replacement fields tried in {} (template {}) but {} was not found in the header",
                    folder.display(),
                    state.template,
                    field
                );
                return Ok(AttemptOutcome::Exhausted {
                    last_error: IdentifierError::MissingHeaderField { field, placeholder },
                });
            }
        }
    }
}

//! Series aggregation.
//!
//! Scans one folder, groups its files by the identifier their headers
//! resolve to, and merges each group's headers into one metadata record:
//! fields that agree across members fold to a scalar, fields that differ
//! are kept as a list in instance-number order.

mod aggregator;
mod error;
mod types;

pub use aggregator::{scan, SeriesMap};
pub use error::AggregateError;
pub use types::{Series, METADATA_SUFFIX};

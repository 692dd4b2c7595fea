//! Dataset-wide reconciliation.
//!
//! Runs after every conversion finished: merges the per-folder indexes
//! under an output root into one dataset index, resolves keys produced by
//! more than one folder, and lists folders failing the integrity check.

mod config;
mod error;
mod policy;
mod runner;

pub use config::{ConflictPolicy, ReconcileConfig};
pub use error::ReconcileError;
pub use policy::{DuplicateResolver, KeepFirstFound};
pub use runner::{reconcile, ReconcileReport};

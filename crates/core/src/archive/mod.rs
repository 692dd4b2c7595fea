//! Archive expansion.
//!
//! Inputs may be ZIP archives, or directories holding them. Each archive is
//! extracted into a `<name>_unzip` scratch folder, with nested archives
//! flattened into the same folder.

mod error;
mod expander;

pub use error::ArchiveError;
pub use expander::{expand, scratch_dir, Expansion, SCRATCH_SUFFIX};

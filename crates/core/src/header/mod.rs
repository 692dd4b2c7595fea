//! Header records and the parsers that produce them.
//!
//! A [`HeaderRecord`] is the flat keyword → value view of one input file's
//! header. Records are produced by a [`HeaderParser`]; the production
//! implementation is [`DicomHeaderParser`], which reads DICOM files up to the
//! pixel data.
//!
//! Parsers distinguish between files that are simply not of the expected
//! format ([`HeaderError::NotThisFormat`], silently skipped by the series
//! aggregator) and files that look right but fail to parse
//! ([`HeaderError::Parse`], which aborts the scan of the folder).

mod dicom_parser;
mod error;
mod traits;
mod types;

pub use dicom_parser::DicomHeaderParser;
pub use error::HeaderError;
pub use traits::HeaderParser;
pub use types::{HeaderRecord, INSTANCE_NUMBER};

//! Converter module driving the external DICOM to NIfTI converter.
//!
//! This module provides the `Converter` trait, the dcm2niix implementation,
//! and the parser turning the converter's status text into per-output
//! records.
//!
//! # Example
//!
//! ```ignore
//! use dcmconv_core::converter::{
//!     parse_status_text, ConversionJob, Converter, ConverterConfig, Dcm2niixConverter,
//! };
//!
//! let converter = Dcm2niixConverter::new(ConverterConfig::default());
//! let output = converter.convert(ConversionJob {
//!     input_dir: "/data/patient01/T1".into(),
//!     output_dir: "/out/patient01".into(),
//!     template: "%p_%t_%s__pref__".into(),
//!     extra_flags: vec!["-z".into(), "y".into()],
//! }).await?;
//! let report = parse_status_text(&output.stdout);
//! ```

mod config;
mod dcm2niix;
mod error;
mod flags;
mod status;
mod traits;
mod types;

pub use config::ConverterConfig;
pub use dcm2niix::Dcm2niixConverter;
pub use error::ConverterError;
pub use flags::{normalize_flags, NormalizedFlags};
pub use status::{collect_outputs, parse_status_text, StatusReport};
pub use traits::Converter;
pub use types::{ConversionJob, ConverterOutput};

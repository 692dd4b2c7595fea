//! DICOM header parser built on the `dicom` crate.

use dicom::core::dictionary::{DataDictionary, DataDictionaryEntry};
use dicom::core::header::Header;
use dicom::core::value::Value as DicomValue;
use dicom::core::VR;
use dicom::object::mem::InMemElement;
use dicom::object::OpenFileOptions;
use dicom_dictionary_std::{tags, StandardDataDictionary};
use serde_json::{Number, Value};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use super::error::HeaderError;
use super::traits::HeaderParser;
use super::types::HeaderRecord;

/// Offset of the `DICM` magic after the 128-byte preamble.
const MAGIC_OFFSET: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";

/// Reads DICOM part-10 files up to the pixel data.
#[derive(Debug, Clone, Default)]
pub struct DicomHeaderParser;

impl DicomHeaderParser {
    /// Creates a new parser.
    pub fn new() -> Self {
        Self
    }

    /// Checks the preamble magic without parsing the data set.
    fn has_dicm_magic(path: &Path) -> Result<bool, HeaderError> {
        let mut file = File::open(path).map_err(|source| HeaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut head = [0u8; MAGIC_OFFSET + 4];
        let mut filled = 0;
        while filled < head.len() {
            match file.read(&mut head[filled..]) {
                Ok(0) => return Ok(false),
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(HeaderError::Io {
                        path: path.to_path_buf(),
                        source,
                    })
                }
            }
        }
        Ok(&head[MAGIC_OFFSET..] == MAGIC)
    }

    /// Converts one element to a JSON value, or `None` when it is not kept.
    fn element_value(element: &InMemElement) -> Option<Value> {
        if !matches!(element.value(), DicomValue::Primitive(_)) {
            return None;
        }

        match element.vr() {
            VR::OB | VR::OD | VR::OF | VR::OL | VR::OV | VR::OW | VR::UN | VR::SQ => None,
            VR::IS | VR::SS | VR::US | VR::SL | VR::UL | VR::SV | VR::UV => element
                .to_multi_int::<i64>()
                .ok()
                .map(|values| collapse(values.into_iter().map(Value::from).collect()))
                .or_else(|| Self::text_value(element)),
            VR::DS | VR::FL | VR::FD => element
                .to_multi_float64()
                .ok()
                .map(|values| {
                    collapse(
                        values
                            .into_iter()
                            .map(|v| Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null))
                            .collect(),
                    )
                })
                .or_else(|| Self::text_value(element)),
            _ => Self::text_value(element),
        }
    }

    fn text_value(element: &InMemElement) -> Option<Value> {
        element
            .to_str()
            .ok()
            .map(|s| Value::String(s.trim_end_matches(['\0', ' ']).to_string()))
    }
}

/// Single values are stored as scalars, multi-valued elements as lists.
fn collapse(mut values: Vec<Value>) -> Value {
    if values.len() == 1 {
        values.remove(0)
    } else {
        Value::Array(values)
    }
}

impl HeaderParser for DicomHeaderParser {
    fn name(&self) -> &str {
        "dicom"
    }

    fn parse(&self, path: &Path) -> Result<HeaderRecord, HeaderError> {
        if !Self::has_dicm_magic(path)? {
            return Err(HeaderError::not_this_format(path));
        }

        let object = OpenFileOptions::new()
            .read_until(tags::PIXEL_DATA)
            .open_file(path)
            .map_err(|e| HeaderError::parse(path, e.to_string()))?;

        let mut record = HeaderRecord::new();
        for element in object.iter() {
            let Some(entry) = StandardDataDictionary.by_tag(element.tag()) else {
                continue;
            };
            if let Some(value) = Self::element_value(element) {
                record.insert(entry.alias(), value);
            }
        }

        debug!("Parsed {} header fields from {}", record.len(), path.display());
        Ok(record)
    }
}

// crates/basin-core/src/core/dataset.rs
// ============================================================================
// Module: Basin Dataset Codec
// Description: Dataset typing, canonical encoding, compression, and hashing.
// Purpose: Produce deterministic payloads and content fingerprints for dedup.
// Dependencies: base64, flate2, serde, serde_jcs, serde_json, sha2, time
// ============================================================================

//! ## Overview
//! Datasets carry one of four value types. Scalars and descriptors are
//! stored as their textual form, arrays as canonical JSON, and timeseries
//! as a JSON object keyed by ISO-8601 timestamps at nanosecond precision.
//! Encoded payloads above a configured threshold are zlib-compressed;
//! readers inflate opportunistically, treating non-zlib bytes as stored raw.
//!
//! The content fingerprint is RFC 8785 canonical JSON of
//! `(name, units, dimension, type, value, metadata)` hashed with SHA-256
//! and reduced to 64 bits. It is the dedup key: two content-equal datasets
//! collapse to one stored row. The fingerprint covers the uncompressed
//! encoding so dedup is independent of the compression threshold.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;
use time::Date;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::UtcOffset;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

use crate::core::identifiers::DatasetId;
use crate::core::identifiers::UserId;

// ============================================================================
// SECTION: Timestamp Formats
// ============================================================================

/// Canonical output format: ISO-8601 with nine subsecond digits, no offset.
const TS_OUTPUT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]");

/// Lenient input format: `T`-separated with subseconds.
const TS_IN_T_SUBSEC: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");

/// Lenient input format: `T`-separated without subseconds.
const TS_IN_T: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Lenient input format: space-separated with subseconds.
const TS_IN_SPACE_SUBSEC: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");

/// Lenient input format: space-separated without subseconds.
const TS_IN_SPACE: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Lenient input format: bare calendar date.
const TS_IN_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the dataset codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataError {
    /// The declared data type is unknown or the payload does not match it.
    #[error("invalid data type: {0}")]
    InvalidDataType(String),
    /// A required field is missing or an input shape is unusable.
    #[error("invalid dataset input: {0}")]
    InvalidInput(String),
    /// Canonical JSON serialization of the fingerprint failed.
    #[error("failed to canonicalize dataset fingerprint: {0}")]
    Canonicalization(String),
    /// Compressing an encoded payload failed.
    #[error("failed to compress dataset value: {0}")]
    Compression(String),
}

// ============================================================================
// SECTION: Dataset Types
// ============================================================================

/// The four value types a dataset may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetType {
    /// A single numeric value stored as text.
    Scalar,
    /// A free-text value.
    Descriptor,
    /// A JSON array of values.
    Array,
    /// A time-indexed table of values.
    Timeseries,
}

impl DatasetType {
    /// Returns the persisted lowercase label for this type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Descriptor => "descriptor",
            Self::Array => "array",
            Self::Timeseries => "timeseries",
        }
    }

    /// Parses a case-insensitive type label.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidDataType`] when the label is outside the
    /// enumerated set.
    pub fn parse(label: &str) -> Result<Self, DataError> {
        match label.to_ascii_lowercase().as_str() {
            "scalar" => Ok(Self::Scalar),
            "descriptor" => Ok(Self::Descriptor),
            "array" => Ok(Self::Array),
            "timeseries" => Ok(Self::Timeseries),
            other => Err(DataError::InvalidDataType(other.to_string())),
        }
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Metadata
// ============================================================================

/// Unordered key/value metadata attached to a dataset. A sorted map keeps
/// fingerprint serialization stable.
pub type MetadataMap = BTreeMap<String, String>;

// ============================================================================
// SECTION: Dataset DTO
// ============================================================================

/// A stored dataset, detached from any session.
///
/// # Invariants
/// - `hash` is the 64-bit content fingerprint and is unique storage-wide.
/// - `value` is `None` only when masked for a caller without view access on
///   a hidden dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    /// Dataset identifier.
    pub dataset_id: DatasetId,
    /// Declared value type.
    pub data_type: DatasetType,
    /// Dataset name.
    pub name: String,
    /// Unit label, when any.
    pub units: Option<String>,
    /// Dimension label, when any.
    pub dimension: Option<String>,
    /// 64-bit content fingerprint.
    pub hash: i64,
    /// Stored payload bytes, inflated for callers; `None` when masked.
    pub value: Option<Vec<u8>>,
    /// Timeseries start time, when recorded; masked for hidden datasets.
    pub start_time: Option<String>,
    /// Timeseries frequency, when recorded; masked for hidden datasets.
    pub frequency: Option<String>,
    /// Whether the dataset contents are restricted to its owners.
    pub hidden: bool,
    /// Creating user, when recorded.
    pub created_by: Option<UserId>,
    /// Attached metadata; emptied when masked.
    pub metadata: MetadataMap,
}

impl Dataset {
    /// Withholds the restricted fields from a caller without view access.
    pub fn mask(&mut self) {
        self.value = None;
        self.start_time = None;
        self.frequency = None;
        self.metadata = MetadataMap::new();
    }
}

// ============================================================================
// SECTION: Input Values
// ============================================================================

/// Raw dataset value as supplied by a caller, prior to encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetInput {
    /// A textual value: scalar/descriptor text or a pre-serialized JSON payload.
    Text(String),
    /// A structured JSON value, used for arrays and scalar numbers.
    Json(Value),
    /// A timeseries as `(timestamp, value)` pairs awaiting normalization.
    Pairs(Vec<(String, String)>),
}

/// A decoded dataset value, produced from stored payload bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodedValue {
    /// Scalar text.
    Scalar(String),
    /// Descriptor text.
    Descriptor(String),
    /// Array value.
    Array(Value),
    /// Time-indexed table in ascending timestamp order.
    Timeseries(Vec<(String, Value)>),
}

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Encodes a raw value into its canonical byte payload for the given type.
///
/// # Errors
///
/// Returns [`DataError::InvalidDataType`] when the payload does not match
/// the declared type and [`DataError::InvalidInput`] when the input shape is
/// unusable for it.
pub fn encode(data_type: DatasetType, input: &DatasetInput) -> Result<Vec<u8>, DataError> {
    match data_type {
        DatasetType::Scalar | DatasetType::Descriptor => encode_plain(data_type, input),
        DatasetType::Array => encode_array(input),
        DatasetType::Timeseries => encode_timeseries(input),
    }
}

/// Encodes scalar and descriptor values as their textual form.
fn encode_plain(data_type: DatasetType, input: &DatasetInput) -> Result<Vec<u8>, DataError> {
    match input {
        DatasetInput::Text(text) => Ok(text.clone().into_bytes()),
        DatasetInput::Json(Value::String(text)) => Ok(text.clone().into_bytes()),
        DatasetInput::Json(Value::Number(number)) => Ok(number.to_string().into_bytes()),
        DatasetInput::Json(Value::Bool(flag)) => Ok(flag.to_string().into_bytes()),
        DatasetInput::Json(other) => Err(DataError::InvalidDataType(format!(
            "{data_type} value must be textual, got {other}"
        ))),
        DatasetInput::Pairs(_) => Err(DataError::InvalidInput(format!(
            "{data_type} value cannot be a timeseries pair list"
        ))),
    }
}

/// Encodes an array value as canonical JSON.
fn encode_array(input: &DatasetInput) -> Result<Vec<u8>, DataError> {
    let value = match input {
        DatasetInput::Json(value) => value.clone(),
        DatasetInput::Text(text) => serde_json::from_str(text)
            .map_err(|err| DataError::InvalidDataType(format!("array is not valid JSON: {err}")))?,
        DatasetInput::Pairs(_) => {
            return Err(DataError::InvalidInput(
                "array value cannot be a timeseries pair list".to_string(),
            ));
        }
    };
    if !value.is_array() {
        return Err(DataError::InvalidDataType(format!(
            "array payload must be a JSON array, got {value}"
        )));
    }
    serde_json::to_vec(&value)
        .map_err(|err| DataError::Canonicalization(err.to_string()))
}

/// Encodes a timeseries either from `(timestamp, value)` pairs or from a
/// pre-serialized JSON payload.
fn encode_timeseries(input: &DatasetInput) -> Result<Vec<u8>, DataError> {
    let table = match input {
        DatasetInput::Pairs(pairs) => {
            // A sorted map keeps the serialized index in timestamp order.
            let mut table: BTreeMap<String, Value> = BTreeMap::new();
            for (timestamp, token) in pairs {
                let key = normalize_timestamp(timestamp).unwrap_or_else(|| timestamp.clone());
                table.insert(key, coerce_value(token));
            }
            return serde_json::to_vec(&table)
                .map_err(|err| DataError::Canonicalization(err.to_string()));
        }
        DatasetInput::Text(text) => {
            let value: Value = serde_json::from_str(text).map_err(|err| {
                DataError::InvalidDataType(format!("timeseries is not valid JSON: {err}"))
            })?;
            if !value.is_object() {
                return Err(DataError::InvalidDataType(format!(
                    "timeseries payload must be a JSON object, got {value}"
                )));
            }
            value
        }
        DatasetInput::Json(value) => {
            if !value.is_object() {
                return Err(DataError::InvalidDataType(format!(
                    "timeseries payload must be a JSON object, got {value}"
                )));
            }
            value.clone()
        }
    };
    serde_json::to_vec(&table)
        .map_err(|err| DataError::Canonicalization(err.to_string()))
}

/// Normalizes one timestamp token to ISO-8601 at nanosecond precision.
/// Returns `None` when the token parses under none of the accepted formats;
/// callers retain the raw token as the index label in that case.
fn normalize_timestamp(token: &str) -> Option<String> {
    let trimmed = token.trim();
    if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        let utc = parsed.to_offset(UtcOffset::UTC);
        return PrimitiveDateTime::new(utc.date(), utc.time()).format(TS_OUTPUT).ok();
    }
    for format in [TS_IN_T_SUBSEC, TS_IN_T, TS_IN_SPACE_SUBSEC, TS_IN_SPACE] {
        if let Ok(parsed) = PrimitiveDateTime::parse(trimmed, format) {
            return parsed.format(TS_OUTPUT).ok();
        }
    }
    if let Ok(date) = Date::parse(trimmed, TS_IN_DATE) {
        return date.midnight().format(TS_OUTPUT).ok();
    }
    None
}

/// Coerces one value token: tokens that parse as JSON literals (numbers,
/// arrays, objects, booleans, null) take their parsed form; anything else is
/// retained as a string.
fn coerce_value(token: &str) -> Value {
    serde_json::from_str(token.trim()).unwrap_or_else(|_| Value::String(token.to_string()))
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Decodes stored payload bytes back into a typed value. Callers inflate
/// compressed payloads first (see [`inflate_opportunistic`]).
///
/// # Errors
///
/// Returns [`DataError::InvalidDataType`] when the bytes do not decode under
/// the declared type.
pub fn decode(data_type: DatasetType, bytes: &[u8]) -> Result<DecodedValue, DataError> {
    match data_type {
        DatasetType::Scalar => Ok(DecodedValue::Scalar(decode_text(bytes)?)),
        DatasetType::Descriptor => Ok(DecodedValue::Descriptor(decode_text(bytes)?)),
        DatasetType::Array => {
            let value: Value = serde_json::from_slice(bytes).map_err(|err| {
                DataError::InvalidDataType(format!("stored array is not valid JSON: {err}"))
            })?;
            Ok(DecodedValue::Array(value))
        }
        DatasetType::Timeseries => {
            let table: BTreeMap<String, Value> =
                serde_json::from_slice(bytes).map_err(|err| {
                    DataError::InvalidDataType(format!(
                        "stored timeseries is not a JSON object: {err}"
                    ))
                })?;
            Ok(DecodedValue::Timeseries(table.into_iter().collect()))
        }
    }
}

/// Decodes stored bytes as UTF-8 text.
fn decode_text(bytes: &[u8]) -> Result<String, DataError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|err| DataError::InvalidDataType(format!("stored value is not UTF-8: {err}")))
}

// ============================================================================
// SECTION: Compression
// ============================================================================

/// Compresses the encoded payload when it exceeds `threshold` bytes;
/// smaller payloads pass through untouched. There is no framing byte:
/// readers distinguish the two forms by attempting inflation.
///
/// # Errors
///
/// Returns [`DataError::Compression`] when the deflate stream fails.
pub fn compress_if_large(bytes: Vec<u8>, threshold: usize) -> Result<Vec<u8>, DataError> {
    if bytes.len() <= threshold {
        return Ok(bytes);
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&bytes)
        .map_err(|err| DataError::Compression(err.to_string()))?;
    encoder
        .finish()
        .map_err(|err| DataError::Compression(err.to_string()))
}

/// Inflates a stored payload when it is zlib-framed; bytes that fail to
/// inflate are returned as-is, meaning the payload was stored uncompressed.
/// The silent fallback is the read contract.
#[must_use]
pub fn inflate_opportunistic(bytes: &[u8]) -> Vec<u8> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut inflated = Vec::new();
    match decoder.read_to_end(&mut inflated) {
        Ok(_) => inflated,
        Err(_) => bytes.to_vec(),
    }
}

// ============================================================================
// SECTION: Content Hashing
// ============================================================================

/// Canonical fingerprint input. Field order is irrelevant: RFC 8785 sorts
/// keys, and the metadata map is already sorted.
#[derive(Serialize)]
struct Fingerprint<'a> {
    /// Dataset name.
    name: &'a str,
    /// Unit label, when any.
    units: Option<&'a str>,
    /// Dimension label, when any.
    dimension: Option<&'a str>,
    /// Declared value type label.
    data_type: &'a str,
    /// Base64 of the encoded, uncompressed payload.
    value: String,
    /// Attached metadata.
    metadata: &'a MetadataMap,
}

/// Computes the 64-bit content fingerprint of a dataset: RFC 8785 canonical
/// JSON of the six content fields, hashed with SHA-256 and reduced to the
/// first eight big-endian bytes.
///
/// # Errors
///
/// Returns [`DataError::Canonicalization`] when serialization fails.
pub fn dataset_hash(
    name: &str,
    units: Option<&str>,
    dimension: Option<&str>,
    data_type: DatasetType,
    value: &[u8],
    metadata: &MetadataMap,
) -> Result<i64, DataError> {
    let fingerprint = Fingerprint {
        name,
        units,
        dimension,
        data_type: data_type.as_str(),
        value: BASE64.encode(value),
        metadata,
    };
    let canonical = serde_jcs::to_vec(&fingerprint)
        .map_err(|err| DataError::Canonicalization(err.to_string()))?;
    let digest = Sha256::digest(&canonical);
    let mut reduced = [0_u8; 8];
    reduced.copy_from_slice(&digest[..8]);
    Ok(i64::from_be_bytes(reduced))
}

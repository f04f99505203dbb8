// crates/basin-core/tests/dataset_codec.rs
// ============================================================================
// Module: Dataset Codec Tests
// Description: Tests for dataset encoding, decoding, and compression framing.
// Purpose: Validate canonical payloads per type and the try-inflate read contract.
// Dependencies: basin-core
// ============================================================================
//! ## Overview
//! Exercises the four dataset types through encode/decode, the timeseries
//! normalization rules, and the opportunistic inflate fallback for payloads
//! stored uncompressed.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use basin_core::DataError;
use basin_core::DatasetInput;
use basin_core::DatasetType;
use basin_core::DecodedValue;
use basin_core::compress_if_large;
use basin_core::decode;
use basin_core::encode;
use basin_core::inflate_opportunistic;
use serde_json::json;

/// Verifies scalar payloads round-trip as their textual form.
#[test]
fn scalar_roundtrip() {
    let encoded = encode(DatasetType::Scalar, &DatasetInput::Text("3.14".to_string())).unwrap();
    assert_eq!(encoded, b"3.14");
    let decoded = decode(DatasetType::Scalar, &encoded).unwrap();
    assert_eq!(decoded, DecodedValue::Scalar("3.14".to_string()));
}

/// Verifies numeric JSON scalars are stringified.
#[test]
fn scalar_accepts_json_number() {
    let encoded = encode(DatasetType::Scalar, &DatasetInput::Json(json!(42))).unwrap();
    assert_eq!(encoded, b"42");
}

/// Verifies descriptor payloads round-trip as text.
#[test]
fn descriptor_roundtrip() {
    let encoded = encode(
        DatasetType::Descriptor,
        &DatasetInput::Text("reservoir outflow policy".to_string()),
    )
    .unwrap();
    let decoded = decode(DatasetType::Descriptor, &encoded).unwrap();
    assert_eq!(
        decoded,
        DecodedValue::Descriptor("reservoir outflow policy".to_string())
    );
}

/// Verifies array payloads round-trip as JSON.
#[test]
fn array_roundtrip() {
    let value = json!([1.0, 2.5, [3.0, 4.0]]);
    let encoded = encode(DatasetType::Array, &DatasetInput::Json(value.clone())).unwrap();
    let decoded = decode(DatasetType::Array, &encoded).unwrap();
    assert_eq!(decoded, DecodedValue::Array(value));
}

/// Verifies a textual array is parsed before storage.
#[test]
fn array_accepts_preserialized_text() {
    let encoded =
        encode(DatasetType::Array, &DatasetInput::Text("[1, 2, 3]".to_string())).unwrap();
    let decoded = decode(DatasetType::Array, &encoded).unwrap();
    assert_eq!(decoded, DecodedValue::Array(json!([1, 2, 3])));
}

/// Verifies a non-array payload is rejected for the array type.
#[test]
fn array_rejects_non_array() {
    let err = encode(DatasetType::Array, &DatasetInput::Json(json!({"a": 1}))).unwrap_err();
    assert!(matches!(err, DataError::InvalidDataType(_)));
}

/// Verifies timeseries pairs normalize to ISO-8601 nanosecond keys with
/// coerced values, in ascending timestamp order.
#[test]
fn timeseries_pairs_normalize() {
    let pairs = vec![
        ("2020-01-02".to_string(), "2.5".to_string()),
        ("2020-01-01 06:30:00".to_string(), "[1, 2]".to_string()),
        ("2020-01-03T00:00:00Z".to_string(), "not a number".to_string()),
    ];
    let encoded = encode(DatasetType::Timeseries, &DatasetInput::Pairs(pairs)).unwrap();
    let DecodedValue::Timeseries(rows) = decode(DatasetType::Timeseries, &encoded).unwrap() else {
        panic!("expected timeseries");
    };
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].0, "2020-01-01T06:30:00.000000000");
    assert_eq!(rows[0].1, json!([1, 2]));
    assert_eq!(rows[1].0, "2020-01-02T00:00:00.000000000");
    assert_eq!(rows[1].1, json!(2.5));
    assert_eq!(rows[2].0, "2020-01-03T00:00:00.000000000");
    assert_eq!(rows[2].1, json!("not a number"));
}

/// Verifies an unparseable timestamp token is retained verbatim as the key.
#[test]
fn timeseries_retains_unparseable_timestamp() {
    let pairs = vec![("spring flood".to_string(), "7".to_string())];
    let encoded = encode(DatasetType::Timeseries, &DatasetInput::Pairs(pairs)).unwrap();
    let DecodedValue::Timeseries(rows) = decode(DatasetType::Timeseries, &encoded).unwrap() else {
        panic!("expected timeseries");
    };
    assert_eq!(rows[0].0, "spring flood");
    assert_eq!(rows[0].1, json!(7));
}

/// Verifies a pre-serialized timeseries payload passes through.
#[test]
fn timeseries_accepts_preserialized_text() {
    let text = r#"{"2020-01-01T00:00:00.000000000": 1.5}"#.to_string();
    let encoded = encode(DatasetType::Timeseries, &DatasetInput::Text(text)).unwrap();
    let DecodedValue::Timeseries(rows) = decode(DatasetType::Timeseries, &encoded).unwrap() else {
        panic!("expected timeseries");
    };
    assert_eq!(rows[0].1, json!(1.5));
}

/// Verifies non-object timeseries payloads are rejected.
#[test]
fn timeseries_rejects_non_object() {
    let err = encode(
        DatasetType::Timeseries,
        &DatasetInput::Text("[1, 2]".to_string()),
    )
    .unwrap_err();
    assert!(matches!(err, DataError::InvalidDataType(_)));
}

/// Verifies unknown type labels are rejected.
#[test]
fn unknown_type_label_rejected() {
    let err = DatasetType::parse("matrix").unwrap_err();
    assert!(matches!(err, DataError::InvalidDataType(_)));
}

/// Verifies type labels parse case-insensitively.
#[test]
fn type_label_case_insensitive() {
    assert_eq!(DatasetType::parse("TimeSeries").unwrap(), DatasetType::Timeseries);
}

/// Verifies payloads at or below the threshold pass through uncompressed
/// and inflate opportunistically to themselves.
#[test]
fn small_payload_stays_raw() {
    let bytes = b"3.14".to_vec();
    let stored = compress_if_large(bytes.clone(), 5_000).unwrap();
    assert_eq!(stored, bytes);
    assert_eq!(inflate_opportunistic(&stored), bytes);
}

/// Verifies payloads above the threshold are compressed and inflate back.
#[test]
fn large_payload_compresses_and_inflates() {
    let bytes = vec![b'7'; 10_000];
    let stored = compress_if_large(bytes.clone(), 5_000).unwrap();
    assert_ne!(stored, bytes);
    assert!(stored.len() < bytes.len());
    assert_eq!(inflate_opportunistic(&stored), bytes);
}

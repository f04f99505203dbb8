// crates/basin-core/src/core/config.rs
// ============================================================================
// Module: Basin Dataset Store Configuration
// Description: Tunables consumed by the dataset codec and store.
// Purpose: Carry the compression threshold with serde defaults and validation.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The core consumes exactly one setting: the payload size above which
//! encoded dataset values are deflate-compressed before storage. Everything
//! else (database location, authentication) is configured by the embedding
//! service.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default payload size in bytes above which values are compressed.
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 5_000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for dataset encoding and storage.
///
/// # Invariants
/// - `compression_threshold` is interpreted as a byte count of the encoded,
///   uncompressed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DatasetStoreConfig {
    /// Payload size in bytes above which encoded values are deflate-compressed.
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold: usize,
}

impl Default for DatasetStoreConfig {
    fn default() -> Self {
        Self {
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
        }
    }
}

/// Returns the default compression threshold.
const fn default_compression_threshold() -> usize {
    DEFAULT_COMPRESSION_THRESHOLD
}

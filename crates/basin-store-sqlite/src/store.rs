// crates/basin-store-sqlite/src/store.rs
// ============================================================================
// Module: Basin SQLite Store
// Description: Store configuration, connection setup, and error taxonomy.
// Purpose: Own the transactional session each engine operation runs inside.
// Dependencies: basin-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! A [`BasinStore`] wraps one SQLite connection pinned to one request
//! handler. Engine operations are methods on the store; each opens a
//! transaction, performs its reads and writes, and commits on success. Any
//! error path returns before the commit, so the transaction rolls back and
//! no partial state becomes visible. Concurrency across handlers is
//! provided by separate store values and the database's own serialization
//! of conflicting row updates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use basin_core::DataError;
use basin_core::DatasetStoreConfig;
use basin_core::ScenarioId;
use basin_core::UserId;
use rusqlite::Connection;
use rusqlite::Transaction;
use serde::Deserialize;
use thiserror::Error;

use crate::schema;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite`-backed Basin store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Dataset codec tunables.
    #[serde(default)]
    pub dataset: DatasetStoreConfig,
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Caller Context
// ============================================================================

/// The authenticated caller context every operation receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Authenticated user.
    pub user_id: UserId,
    /// Application name recorded as the `source` of data it writes.
    pub app_name: Option<String>,
}

impl Caller {
    /// Creates a caller context without an application name.
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            app_name: None,
        }
    }

    /// Creates a caller context with an application name.
    #[must_use]
    pub fn with_app(user_id: UserId, app_name: impl Into<String>) -> Self {
        Self {
            user_id,
            app_name: Some(app_name.into()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Basin store errors.
///
/// # Invariants
/// - Structural kinds (`NotFound`, `Permission`, `Conflict`, `Locked`,
///   `CrossNetwork`) roll back the operation's transaction when returned.
/// - Error messages avoid embedding dataset payload bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A referenced entity id is absent.
    #[error("not found: {0}")]
    NotFound(String),
    /// The caller lacks the required permission bit.
    #[error("permission denied: {0}")]
    Permission(String),
    /// A uniqueness rule was violated.
    #[error("conflict: {0}")]
    Conflict(String),
    /// A mutation was attempted on a locked scenario.
    #[error("scenario {0} is locked")]
    Locked(ScenarioId),
    /// Operands span more than one network.
    #[error("cross-network operation: {0}")]
    CrossNetwork(String),
    /// A dataset payload does not match its declared type.
    #[error("invalid data type: {0}")]
    InvalidDataType(String),
    /// A required field is missing or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Underlying database failure.
    #[error("database error: {0}")]
    Db(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}

impl From<DataError> for StoreError {
    fn from(error: DataError) -> Self {
        match error {
            DataError::InvalidDataType(message) => Self::InvalidDataType(message),
            DataError::InvalidInput(message) => Self::InvalidInput(message),
            DataError::Canonicalization(message) | DataError::Compression(message) => {
                Self::Db(message)
            }
        }
    }
}

/// Returns whether a database error is a uniqueness-constraint violation,
/// used to translate duplicate inserts into [`StoreError::Conflict`] and to
/// resolve the content-hash insert race.
pub(crate) fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

// ============================================================================
// SECTION: Flag Helpers
// ============================================================================

/// Renders a boolean as the persisted `Y`/`N` flag.
pub(crate) const fn flag(value: bool) -> &'static str {
    if value { "Y" } else { "N" }
}

/// Parses a persisted `Y`/`N` flag.
pub(crate) fn is_set(value: &str) -> bool {
    value == "Y"
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed Basin store: one connection, one request at a time.
///
/// # Invariants
/// - Every public operation runs inside a single transaction; errors roll
///   it back before any state becomes visible.
pub struct BasinStore {
    /// The pinned connection.
    conn: Connection,
    /// Dataset codec tunables.
    dataset_config: DatasetStoreConfig,
}

impl BasinStore {
    /// Opens a store at the configured path, applying pragmas and schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] when the database cannot be opened or the
    /// schema cannot be applied.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, StoreError> {
        let conn = Connection::open(&config.path)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        let _mode: String = conn.query_row(
            &format!("PRAGMA journal_mode = {}", config.journal_mode.pragma_value()),
            [],
            |row| row.get(0),
        )?;
        conn.pragma_update(None, "synchronous", config.sync_mode.pragma_value())?;
        Self::from_connection(conn, config.dataset)
    }

    /// Opens an in-memory store with default dataset tunables. Intended for
    /// tests and ephemeral sessions.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] when the schema cannot be applied.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::in_memory_with(DatasetStoreConfig::default())
    }

    /// Opens an in-memory store with explicit dataset tunables.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] when the schema cannot be applied.
    pub fn in_memory_with(dataset_config: DatasetStoreConfig) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, dataset_config)
    }

    /// Wraps an existing connection, enabling foreign keys and applying the
    /// schema. This is the embedding escape hatch: migrations and fixtures
    /// may prepare the connection first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] when the schema cannot be applied.
    pub fn from_connection(
        conn: Connection,
        dataset_config: DatasetStoreConfig,
    ) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::apply(&conn)?;
        Ok(Self {
            conn,
            dataset_config,
        })
    }

    /// Returns the dataset codec tunables.
    #[must_use]
    pub const fn dataset_config(&self) -> &DatasetStoreConfig {
        &self.dataset_config
    }

    /// Runs one operation inside a transaction, committing on success. The
    /// operation boundary is the transaction: an `Err` return leaves the
    /// database untouched.
    pub(crate) fn txn<T>(
        &mut self,
        operation: impl FnOnce(&Transaction<'_>, DatasetStoreConfig) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let dataset_config = self.dataset_config;
        let tx = self.conn.transaction()?;
        let result = operation(&tx, dataset_config)?;
        tx.commit()?;
        Ok(result)
    }
}

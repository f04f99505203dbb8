// crates/basin-store-sqlite/src/datasets.rs
// ============================================================================
// Module: Basin Dataset Store
// Description: Content-addressed dataset persistence with dedup and reuse.
// Purpose: Insert-or-reuse by content hash, in-place update, and bulk insert.
// Dependencies: basin-core, rusqlite
// ============================================================================

//! ## Overview
//! Datasets are content-addressed: the 64-bit fingerprint over the encoded
//! payload and its descriptive fields is UNIQUE storage-wide, so inserting
//! an already-known value aliases the existing row instead of duplicating
//! it. Two concurrent inserts of the same content race on that constraint;
//! the loser re-reads the winner's row. In-place update exists as a
//! copy-on-demand shortcut used only when the dataset is provably private
//! to a single binding; when its new hash collides with another row the
//! caller falls back to insert-or-reuse. Datasets are never deleted here,
//! only superseded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use basin_core::AccessLevel;
use basin_core::Dataset;
use basin_core::DatasetId;
use basin_core::DatasetInput;
use basin_core::DatasetStoreConfig;
use basin_core::DatasetType;
use basin_core::MetadataMap;
use basin_core::UserId;
use basin_core::Visibility;
use basin_core::compress_if_large;
use basin_core::dataset_hash;
use basin_core::dataset_visibility;
use basin_core::encode;
use basin_core::inflate_opportunistic;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::permissions::OwnedKind;
use crate::permissions::check_dataset_access;
use crate::permissions::owner_rows;
use crate::store::BasinStore;
use crate::store::Caller;
use crate::store::StoreError;
use crate::store::flag;
use crate::store::is_set;
use crate::store::is_unique_violation;

// ============================================================================
// SECTION: Dataset Spec
// ============================================================================

/// An incoming dataset payload, prior to encoding and storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    /// Declared value type.
    pub data_type: DatasetType,
    /// Dataset name.
    pub name: String,
    /// Unit label, when any.
    pub units: Option<String>,
    /// Dimension label, when any.
    pub dimension: Option<String>,
    /// Raw value; required for storage.
    pub value: Option<DatasetInput>,
    /// Attached metadata.
    pub metadata: MetadataMap,
    /// Whether the dataset contents are restricted to its owners.
    pub hidden: bool,
}

impl DatasetSpec {
    /// Builds a visible spec with no units, dimension, or metadata.
    #[must_use]
    pub fn plain(data_type: DatasetType, name: impl Into<String>, value: DatasetInput) -> Self {
        Self {
            data_type,
            name: name.into(),
            units: None,
            dimension: None,
            value: Some(value),
            metadata: MetadataMap::new(),
            hidden: false,
        }
    }
}

/// A spec encoded to its canonical payload and fingerprint.
pub(crate) struct EncodedSpec {
    /// Encoded, uncompressed payload bytes.
    pub encoded: Vec<u8>,
    /// 64-bit content fingerprint of the spec.
    pub hash: i64,
}

/// Encodes a spec and computes its fingerprint.
pub(crate) fn encode_spec(spec: &DatasetSpec) -> Result<EncodedSpec, StoreError> {
    let value = spec.value.as_ref().ok_or_else(|| {
        StoreError::InvalidInput(format!("dataset {} has no value", spec.name))
    })?;
    let encoded = encode(spec.data_type, value)?;
    let hash = dataset_hash(
        &spec.name,
        spec.units.as_deref(),
        spec.dimension.as_deref(),
        spec.data_type,
        &encoded,
        &spec.metadata,
    )?;
    Ok(EncodedSpec { encoded, hash })
}

// ============================================================================
// SECTION: Row Loading
// ============================================================================

/// Column list shared by every dataset read; order matches [`read_dataset_row`].
pub(crate) const DATASET_COLUMNS: &str = "d.dataset_id, d.data_type, d.data_name, d.data_units, \
     d.data_dimen, d.data_hash, d.value, d.start_time, d.frequency, d.hidden, d.created_by";

/// A raw dataset row before inflation and masking.
pub(crate) struct DatasetRow {
    /// Dataset identifier.
    pub dataset_id: i64,
    /// Stored type label.
    pub data_type: String,
    /// Dataset name.
    pub name: String,
    /// Unit label.
    pub units: Option<String>,
    /// Dimension label.
    pub dimension: Option<String>,
    /// Content fingerprint.
    pub hash: i64,
    /// Stored payload bytes, possibly deflate-framed.
    pub value: Option<Vec<u8>>,
    /// Recorded start time.
    pub start_time: Option<String>,
    /// Recorded frequency.
    pub frequency: Option<String>,
    /// Hidden flag.
    pub hidden: String,
    /// Creating user.
    pub created_by: Option<i64>,
}

/// Reads a dataset row in [`DATASET_COLUMNS`] order, starting at `offset`.
pub(crate) fn read_dataset_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<DatasetRow> {
    Ok(DatasetRow {
        dataset_id: row.get(offset)?,
        data_type: row.get(offset + 1)?,
        name: row.get(offset + 2)?,
        units: row.get(offset + 3)?,
        dimension: row.get(offset + 4)?,
        hash: row.get(offset + 5)?,
        value: row.get(offset + 6)?,
        start_time: row.get(offset + 7)?,
        frequency: row.get(offset + 8)?,
        hidden: row.get(offset + 9)?,
        created_by: row.get(offset + 10)?,
    })
}

/// Loads the metadata map for a dataset.
pub(crate) fn dataset_metadata(
    conn: &Connection,
    dataset_id: i64,
) -> Result<MetadataMap, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT metadata_name, metadata_val FROM tMetadata WHERE dataset_id = ?1",
    )?;
    let rows = stmt.query_map(params![dataset_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let mut metadata = MetadataMap::new();
    for row in rows {
        let (name, value) = row?;
        metadata.insert(name, value);
    }
    Ok(metadata)
}

/// Turns a raw row into a caller-facing [`Dataset`]: inflates the payload,
/// materializes metadata, and masks the restricted fields when the dataset
/// is hidden and the caller is not among its owners. Masking is silent;
/// reads never fail on hidden data.
pub(crate) fn hydrate_dataset(
    conn: &Connection,
    row: DatasetRow,
    user: UserId,
) -> Result<Dataset, StoreError> {
    let hidden = is_set(&row.hidden);
    let created_by = row.created_by.map(UserId::new);
    let owners = owner_rows(conn, OwnedKind::Dataset, row.dataset_id)?;
    let visibility = dataset_visibility(hidden, created_by, &owners, user);
    let mut dataset = Dataset {
        dataset_id: DatasetId::new(row.dataset_id),
        data_type: DatasetType::parse(&row.data_type)?,
        name: row.name,
        units: row.units,
        dimension: row.dimension,
        hash: row.hash,
        value: row.value.map(|bytes| inflate_opportunistic(&bytes)),
        start_time: row.start_time,
        frequency: row.frequency,
        hidden,
        created_by,
        metadata: dataset_metadata(conn, row.dataset_id)?,
    };
    if visibility == Visibility::Masked {
        dataset.mask();
    }
    Ok(dataset)
}

/// Loads one dataset by id, failing with `NotFound`.
pub(crate) fn load_dataset(
    conn: &Connection,
    dataset_id: DatasetId,
    user: UserId,
) -> Result<Dataset, StoreError> {
    let row = find_dataset_row(conn, dataset_id)?;
    hydrate_dataset(conn, row, user)
}

/// Loads one raw dataset row by id, failing with `NotFound`.
fn find_dataset_row(conn: &Connection, dataset_id: DatasetId) -> Result<DatasetRow, StoreError> {
    let sql = format!("SELECT {DATASET_COLUMNS} FROM tDataset d WHERE d.dataset_id = ?1");
    conn.query_row(&sql, params![dataset_id.get()], |row| read_dataset_row(row, 0))
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("dataset {dataset_id} does not exist")))
}

/// Looks a dataset up by content fingerprint.
pub(crate) fn find_by_hash(
    conn: &Connection,
    hash: i64,
) -> Result<Option<DatasetRow>, StoreError> {
    let sql = format!("SELECT {DATASET_COLUMNS} FROM tDataset d WHERE d.data_hash = ?1");
    Ok(conn
        .query_row(&sql, params![hash], |row| read_dataset_row(row, 0))
        .optional()?)
}

// ============================================================================
// SECTION: Metadata Upsert
// ============================================================================

/// Upserts metadata rows: existing keys are updated, new keys inserted,
/// keys not mentioned are left intact.
pub(crate) fn set_metadata_tx(
    conn: &Connection,
    dataset_id: i64,
    metadata: &MetadataMap,
) -> Result<(), StoreError> {
    for (name, value) in metadata {
        let updated = conn.execute(
            "UPDATE tMetadata SET metadata_val = ?1 WHERE dataset_id = ?2 AND metadata_name = ?3",
            params![value, dataset_id, name],
        )?;
        if updated == 0 {
            conn.execute(
                "INSERT INTO tMetadata (dataset_id, metadata_name, metadata_val)
                 VALUES (?1, ?2, ?3)",
                params![dataset_id, name, value],
            )?;
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Insert-Or-Reuse
// ============================================================================

/// Inserts the `tDataset` row alone, with the payload already compressed.
/// Kept separate so the UNIQUE-hash race can be distinguished from
/// unrelated failures.
fn insert_value_row(
    conn: &Connection,
    spec: &DatasetSpec,
    hash: i64,
    stored: &[u8],
    user: UserId,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO tDataset
             (data_type, data_units, data_dimen, data_name, data_hash, value, hidden, created_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            spec.data_type.as_str(),
            spec.units,
            spec.dimension,
            spec.name,
            hash,
            stored,
            flag(spec.hidden),
            user.get()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Inserts a dataset or reuses the row an equal content hash already maps
/// to. The UNIQUE constraint arbitrates concurrent inserts of identical
/// content: the loser catches the violation and re-reads the winner's row.
/// A reused hidden row the caller cannot view is returned masked.
pub(crate) fn insert_or_reuse_tx(
    conn: &Connection,
    config: DatasetStoreConfig,
    spec: &DatasetSpec,
    user: UserId,
) -> Result<Dataset, StoreError> {
    let encoded = encode_spec(spec)?;
    let stored = compress_if_large(encoded.encoded.clone(), config.compression_threshold)?;
    let mut retried = false;
    loop {
        if let Some(row) = find_by_hash(conn, encoded.hash)? {
            debug!(dataset_id = row.dataset_id, hash = encoded.hash, "reusing dataset");
            return hydrate_dataset(conn, row, user);
        }
        match insert_value_row(conn, spec, encoded.hash, &stored, user) {
            Ok(dataset_id) => {
                set_metadata_tx(conn, dataset_id, &spec.metadata)?;
                conn.execute(
                    "INSERT INTO tDatasetOwner (user_id, dataset_id, view, edit, share)
                     VALUES (?1, ?2, 'Y', 'Y', 'Y')",
                    params![user.get(), dataset_id],
                )?;
                debug!(dataset_id, hash = encoded.hash, "inserted dataset");
                return load_dataset(conn, DatasetId::new(dataset_id), user);
            }
            Err(err) if is_unique_violation(&err) && !retried => {
                retried = true;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

// ============================================================================
// SECTION: In-Place Update
// ============================================================================

/// Outcome of an in-place update attempt.
pub(crate) enum UpdateOutcome {
    /// The row was mutated in place.
    Updated(Dataset),
    /// The new content hash already belongs to another dataset; the caller
    /// must fall back to insert-or-reuse.
    Collided(DatasetId),
}

/// Mutates a dataset row in place, recomputing its fingerprint. Valid only
/// while the dataset has a single referencing binding; the caller proves
/// that within the same transaction.
pub(crate) fn update_dataset_tx(
    conn: &Connection,
    config: DatasetStoreConfig,
    dataset_id: DatasetId,
    spec: &DatasetSpec,
    user: UserId,
) -> Result<UpdateOutcome, StoreError> {
    let _existing = find_dataset_row(conn, dataset_id)?;
    check_dataset_access(conn, dataset_id, user, AccessLevel::Edit)?;
    let encoded = encode_spec(spec)?;
    if let Some(other) = find_by_hash(conn, encoded.hash)? {
        if other.dataset_id != dataset_id.get() {
            return Ok(UpdateOutcome::Collided(DatasetId::new(other.dataset_id)));
        }
    }
    let stored = compress_if_large(encoded.encoded, config.compression_threshold)?;
    conn.execute(
        "UPDATE tDataset
         SET data_type = ?1, data_units = ?2, data_dimen = ?3, data_name = ?4,
             data_hash = ?5, value = ?6, hidden = ?7
         WHERE dataset_id = ?8",
        params![
            spec.data_type.as_str(),
            spec.units,
            spec.dimension,
            spec.name,
            encoded.hash,
            stored,
            flag(spec.hidden),
            dataset_id.get()
        ],
    )?;
    set_metadata_tx(conn, dataset_id.get(), &spec.metadata)?;
    debug!(dataset_id = dataset_id.get(), hash = encoded.hash, "updated dataset in place");
    Ok(UpdateOutcome::Updated(load_dataset(conn, dataset_id, user)?))
}

// ============================================================================
// SECTION: Public Operations
// ============================================================================

impl BasinStore {
    /// Inserts a dataset or returns the existing row its content hash maps
    /// to. The creator receives implicit full ownership on insert.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the spec has no value and
    /// `InvalidDataType` when the payload does not match the declared type.
    pub fn add_or_reuse_dataset(
        &mut self,
        spec: &DatasetSpec,
        caller: &Caller,
    ) -> Result<Dataset, StoreError> {
        self.txn(|tx, config| insert_or_reuse_tx(tx, config, spec, caller.user_id))
    }

    /// Mutates a dataset in place. Intended for datasets with a single
    /// referencing binding owned by the caller; a recomputed hash that
    /// collides with another row is reported as `Conflict`, and callers
    /// fall back to [`Self::add_or_reuse_dataset`].
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing dataset, `Permission` without edit
    /// access, and `Conflict` on a hash collision.
    pub fn update_dataset(
        &mut self,
        dataset_id: DatasetId,
        spec: &DatasetSpec,
        caller: &Caller,
    ) -> Result<Dataset, StoreError> {
        self.txn(|tx, config| {
            match update_dataset_tx(tx, config, dataset_id, spec, caller.user_id)? {
                UpdateOutcome::Updated(dataset) => Ok(dataset),
                UpdateOutcome::Collided(other) => Err(StoreError::Conflict(format!(
                    "content hash of the new value already belongs to dataset {other}"
                ))),
            }
        })
    }

    /// Inserts many datasets, reusing rows for known content, and returns
    /// one dataset per input in input order. Hash lookups are batched;
    /// content-equal inputs within one batch collapse to one row.
    ///
    /// # Errors
    ///
    /// Returns the first encoding or storage error; nothing is committed on
    /// failure.
    pub fn bulk_insert_datasets(
        &mut self,
        specs: &[DatasetSpec],
        caller: &Caller,
    ) -> Result<Vec<Dataset>, StoreError> {
        self.txn(|tx, config| bulk_insert_tx(tx, config, specs, caller.user_id))
    }

    /// Loads one dataset, masked when hidden and the caller lacks view.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing dataset.
    pub fn get_dataset(
        &mut self,
        dataset_id: DatasetId,
        caller: &Caller,
    ) -> Result<Dataset, StoreError> {
        self.txn(|tx, _| load_dataset(tx, dataset_id, caller.user_id))
    }
}

/// Bulk insert body: one batched hash lookup, then per-spec reuse or insert.
pub(crate) fn bulk_insert_tx(
    conn: &Connection,
    config: DatasetStoreConfig,
    specs: &[DatasetSpec],
    user: UserId,
) -> Result<Vec<Dataset>, StoreError> {
    let mut encoded_specs = Vec::with_capacity(specs.len());
    for spec in specs {
        encoded_specs.push(encode_spec(spec)?);
    }

    let mut known: HashMap<i64, DatasetId> = HashMap::new();
    if !encoded_specs.is_empty() {
        let placeholders = vec!["?"; encoded_specs.len()].join(", ");
        let sql = format!(
            "SELECT data_hash, dataset_id FROM tDataset WHERE data_hash IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(encoded_specs.iter().map(|e| e.hash)),
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;
        for row in rows {
            let (hash, dataset_id) = row?;
            known.insert(hash, DatasetId::new(dataset_id));
        }
    }

    let mut datasets = Vec::with_capacity(specs.len());
    for (spec, encoded) in specs.iter().zip(&encoded_specs) {
        let dataset_id = if let Some(existing) = known.get(&encoded.hash) {
            *existing
        } else {
            let stored =
                compress_if_large(encoded.encoded.clone(), config.compression_threshold)?;
            let dataset_id = insert_value_row(conn, spec, encoded.hash, &stored, user)
                .map_err(StoreError::from)?;
            set_metadata_tx(conn, dataset_id, &spec.metadata)?;
            conn.execute(
                "INSERT INTO tDatasetOwner (user_id, dataset_id, view, edit, share)
                 VALUES (?1, ?2, 'Y', 'Y', 'Y')",
                params![user.get(), dataset_id],
            )?;
            let dataset_id = DatasetId::new(dataset_id);
            known.insert(encoded.hash, dataset_id);
            dataset_id
        };
        datasets.push(load_dataset(conn, dataset_id, user)?);
    }
    Ok(datasets)
}

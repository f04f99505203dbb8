// crates/basin-store-sqlite/src/permissions.rs
// ============================================================================
// Module: Basin Permission Guard
// Description: Owner-row queries and access checks for shareable entities.
// Purpose: Gate every engine operation on creator/owner permission bits.
// Dependencies: basin-core, rusqlite
// ============================================================================

//! ## Overview
//! Projects, networks, templates, and datasets each carry an owner table
//! with per-user view/edit/share bits. The guard loads the creator and the
//! owner rows and delegates the decision to the pure evaluation rules in
//! the core crate. Nodes, links, groups, and scenarios have no owner rows
//! of their own; they delegate upward to their network. Owner management
//! (set/unset) lives here too and is itself gated on the share bit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use basin_core::AccessLevel;
use basin_core::DatasetId;
use basin_core::NetworkId;
use basin_core::OwnerRecord;
use basin_core::ProjectId;
use basin_core::TemplateId;
use basin_core::UserId;
use basin_core::evaluate_access;
use basin_core::evaluate_template_read;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use tracing::warn;

use crate::store::BasinStore;
use crate::store::Caller;
use crate::store::StoreError;
use crate::store::flag;
use crate::store::is_set;

// ============================================================================
// SECTION: Owned Entity Kinds
// ============================================================================

/// The four entity kinds that carry owner rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OwnedKind {
    /// A project (`tProjectOwner`).
    Project,
    /// A network (`tNetworkOwner`).
    Network,
    /// A template (`tTemplateOwner`).
    Template,
    /// A dataset (`tDatasetOwner`).
    Dataset,
}

impl OwnedKind {
    /// Returns the entity table name.
    const fn table(self) -> &'static str {
        match self {
            Self::Project => "tProject",
            Self::Network => "tNetwork",
            Self::Template => "tTemplate",
            Self::Dataset => "tDataset",
        }
    }

    /// Returns the owner table name.
    const fn owner_table(self) -> &'static str {
        match self {
            Self::Project => "tProjectOwner",
            Self::Network => "tNetworkOwner",
            Self::Template => "tTemplateOwner",
            Self::Dataset => "tDatasetOwner",
        }
    }

    /// Returns the id column shared by the entity and owner tables.
    const fn id_column(self) -> &'static str {
        match self {
            Self::Project => "project_id",
            Self::Network => "network_id",
            Self::Template => "template_id",
            Self::Dataset => "dataset_id",
        }
    }

    /// Returns the lowercase label used in error messages.
    const fn label(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Network => "network",
            Self::Template => "template",
            Self::Dataset => "dataset",
        }
    }
}

/// Returns the lowercase label for an access level in error messages.
const fn level_label(level: AccessLevel) -> &'static str {
    match level {
        AccessLevel::View => "view",
        AccessLevel::Edit => "edit",
        AccessLevel::Share => "share",
    }
}

// ============================================================================
// SECTION: Row Loading
// ============================================================================

/// Loads an entity's creator, failing with `NotFound` when the row is absent.
pub(crate) fn creator_of(
    conn: &Connection,
    kind: OwnedKind,
    entity_id: i64,
) -> Result<Option<UserId>, StoreError> {
    let sql = format!(
        "SELECT created_by FROM {} WHERE {} = ?1",
        kind.table(),
        kind.id_column()
    );
    let created_by: Option<Option<i64>> = conn
        .query_row(&sql, params![entity_id], |row| row.get(0))
        .optional()?;
    match created_by {
        Some(raw) => Ok(raw.map(UserId::new)),
        None => Err(StoreError::NotFound(format!(
            "{} {entity_id} does not exist",
            kind.label()
        ))),
    }
}

/// Loads the owner rows for an entity.
pub(crate) fn owner_rows(
    conn: &Connection,
    kind: OwnedKind,
    entity_id: i64,
) -> Result<Vec<OwnerRecord>, StoreError> {
    let sql = format!(
        "SELECT user_id, view, edit, share FROM {} WHERE {} = ?1 ORDER BY user_id",
        kind.owner_table(),
        kind.id_column()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![entity_id], |row| {
        let view: String = row.get(1)?;
        let edit: String = row.get(2)?;
        let share: String = row.get(3)?;
        Ok(OwnerRecord {
            user_id: UserId::new(row.get(0)?),
            view: is_set(&view),
            edit: is_set(&edit),
            share: is_set(&share),
        })
    })?;
    let mut owners = Vec::new();
    for row in rows {
        owners.push(row?);
    }
    Ok(owners)
}

// ============================================================================
// SECTION: Access Checks
// ============================================================================

/// Checks one access level on one owned entity, failing with `Permission`.
pub(crate) fn check_entity_access(
    conn: &Connection,
    kind: OwnedKind,
    entity_id: i64,
    user: UserId,
    level: AccessLevel,
) -> Result<(), StoreError> {
    let created_by = creator_of(conn, kind, entity_id)?;
    let owners = owner_rows(conn, kind, entity_id)?;
    if evaluate_access(created_by, &owners, user, level) {
        Ok(())
    } else {
        Err(StoreError::Permission(format!(
            "user {user} does not have {} access on {} {entity_id}",
            level_label(level),
            kind.label()
        )))
    }
}

/// Checks an access level on a project.
pub(crate) fn check_project_access(
    conn: &Connection,
    project_id: ProjectId,
    user: UserId,
    level: AccessLevel,
) -> Result<(), StoreError> {
    check_entity_access(conn, OwnedKind::Project, project_id.get(), user, level)
}

/// Checks an access level on a network. Nodes, links, groups, and scenarios
/// delegate here.
pub(crate) fn check_network_access(
    conn: &Connection,
    network_id: NetworkId,
    user: UserId,
    level: AccessLevel,
) -> Result<(), StoreError> {
    check_entity_access(conn, OwnedKind::Network, network_id.get(), user, level)
}

/// Checks an access level on a dataset (used for write and share paths;
/// reads mask instead of failing).
pub(crate) fn check_dataset_access(
    conn: &Connection,
    dataset_id: DatasetId,
    user: UserId,
    level: AccessLevel,
) -> Result<(), StoreError> {
    check_entity_access(conn, OwnedKind::Dataset, dataset_id.get(), user, level)
}

/// Evaluates template read access, honoring the anonymous-user rule.
pub(crate) fn template_read_allowed(
    conn: &Connection,
    template_id: TemplateId,
    user: UserId,
) -> Result<bool, StoreError> {
    let created_by = creator_of(conn, OwnedKind::Template, template_id.get())?;
    let owners = owner_rows(conn, OwnedKind::Template, template_id.get())?;
    Ok(evaluate_template_read(created_by, &owners, user))
}

// ============================================================================
// SECTION: Owner Management
// ============================================================================

/// Upserts an owner row: an existing row for the user is updated in place,
/// otherwise a new row is inserted. Matching is by `user_id` only; a row's
/// user binding is never rewritten.
fn set_owner_tx(
    conn: &Connection,
    kind: OwnedKind,
    entity_id: i64,
    target: UserId,
    bits: (bool, bool, bool),
) -> Result<(), StoreError> {
    let (view, edit, share) = bits;
    let updated = conn.execute(
        &format!(
            "UPDATE {} SET view = ?1, edit = ?2, share = ?3 WHERE {} = ?4 AND user_id = ?5",
            kind.owner_table(),
            kind.id_column()
        ),
        params![flag(view), flag(edit), flag(share), entity_id, target.get()],
    )?;
    if updated == 0 {
        conn.execute(
            &format!(
                "INSERT INTO {} ({}, user_id, view, edit, share) VALUES (?1, ?2, ?3, ?4, ?5)",
                kind.owner_table(),
                kind.id_column()
            ),
            params![entity_id, target.get(), flag(view), flag(edit), flag(share)],
        )?;
    }
    Ok(())
}

/// Deletes an owner row. The creator's row is never removed; the request is
/// ignored with a warning, matching the established behavior.
fn unset_owner_tx(
    conn: &Connection,
    kind: OwnedKind,
    entity_id: i64,
    target: UserId,
) -> Result<(), StoreError> {
    let created_by = creator_of(conn, kind, entity_id)?;
    if created_by == Some(target) {
        warn!(
            entity = kind.label(),
            entity_id,
            user = target.get(),
            "cannot unset the creating user as owner"
        );
        return Ok(());
    }
    conn.execute(
        &format!(
            "DELETE FROM {} WHERE {} = ?1 AND user_id = ?2",
            kind.owner_table(),
            kind.id_column()
        ),
        params![entity_id, target.get()],
    )?;
    Ok(())
}

/// Checks share access and applies one owner upsert.
fn share_gated_set(
    conn: &Connection,
    kind: OwnedKind,
    entity_id: i64,
    target: UserId,
    bits: (bool, bool, bool),
    caller: &Caller,
) -> Result<(), StoreError> {
    check_entity_access(conn, kind, entity_id, caller.user_id, AccessLevel::Share)?;
    set_owner_tx(conn, kind, entity_id, target, bits)
}

/// Checks share access and applies one owner removal.
fn share_gated_unset(
    conn: &Connection,
    kind: OwnedKind,
    entity_id: i64,
    target: UserId,
    caller: &Caller,
) -> Result<(), StoreError> {
    check_entity_access(conn, kind, entity_id, caller.user_id, AccessLevel::Share)?;
    unset_owner_tx(conn, kind, entity_id, target)
}

impl BasinStore {
    /// Grants or updates a user's permission bits on a project.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing project and `Permission` when the
    /// caller lacks share access.
    pub fn set_project_owner(
        &mut self,
        project_id: ProjectId,
        target: UserId,
        view: bool,
        edit: bool,
        share: bool,
        caller: &Caller,
    ) -> Result<(), StoreError> {
        self.txn(|tx, _| {
            share_gated_set(tx, OwnedKind::Project, project_id.get(), target, (view, edit, share), caller)
        })
    }

    /// Removes a user's owner row from a project. The creator is never removed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing project and `Permission` when the
    /// caller lacks share access.
    pub fn unset_project_owner(
        &mut self,
        project_id: ProjectId,
        target: UserId,
        caller: &Caller,
    ) -> Result<(), StoreError> {
        self.txn(|tx, _| share_gated_unset(tx, OwnedKind::Project, project_id.get(), target, caller))
    }

    /// Grants or updates a user's permission bits on a network.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing network and `Permission` when the
    /// caller lacks share access.
    pub fn set_network_owner(
        &mut self,
        network_id: NetworkId,
        target: UserId,
        view: bool,
        edit: bool,
        share: bool,
        caller: &Caller,
    ) -> Result<(), StoreError> {
        self.txn(|tx, _| {
            share_gated_set(tx, OwnedKind::Network, network_id.get(), target, (view, edit, share), caller)
        })
    }

    /// Removes a user's owner row from a network. The creator is never removed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing network and `Permission` when the
    /// caller lacks share access.
    pub fn unset_network_owner(
        &mut self,
        network_id: NetworkId,
        target: UserId,
        caller: &Caller,
    ) -> Result<(), StoreError> {
        self.txn(|tx, _| share_gated_unset(tx, OwnedKind::Network, network_id.get(), target, caller))
    }

    /// Grants or updates a user's permission bits on a template. An existing
    /// row is matched by user id; otherwise a new row is created.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing template and `Permission` when the
    /// caller lacks share access.
    pub fn set_template_owner(
        &mut self,
        template_id: TemplateId,
        target: UserId,
        view: bool,
        edit: bool,
        share: bool,
        caller: &Caller,
    ) -> Result<(), StoreError> {
        self.txn(|tx, _| {
            share_gated_set(tx, OwnedKind::Template, template_id.get(), target, (view, edit, share), caller)
        })
    }

    /// Removes a user's owner row from a template. The creator is never removed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing template and `Permission` when the
    /// caller lacks share access.
    pub fn unset_template_owner(
        &mut self,
        template_id: TemplateId,
        target: UserId,
        caller: &Caller,
    ) -> Result<(), StoreError> {
        self.txn(|tx, _| share_gated_unset(tx, OwnedKind::Template, template_id.get(), target, caller))
    }

    /// Grants or updates a user's permission bits on a dataset.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing dataset and `Permission` when the
    /// caller lacks share access.
    pub fn set_dataset_owner(
        &mut self,
        dataset_id: DatasetId,
        target: UserId,
        view: bool,
        edit: bool,
        share: bool,
        caller: &Caller,
    ) -> Result<(), StoreError> {
        self.txn(|tx, _| {
            share_gated_set(tx, OwnedKind::Dataset, dataset_id.get(), target, (view, edit, share), caller)
        })
    }

    /// Removes a user's owner row from a dataset. The creator is never removed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing dataset and `Permission` when the
    /// caller lacks share access.
    pub fn unset_dataset_owner(
        &mut self,
        dataset_id: DatasetId,
        target: UserId,
        caller: &Caller,
    ) -> Result<(), StoreError> {
        self.txn(|tx, _| share_gated_unset(tx, OwnedKind::Dataset, dataset_id.get(), target, caller))
    }

    /// Evaluates template read access for the caller, honoring the
    /// anonymous-user rule.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing template.
    pub fn can_read_template(
        &mut self,
        template_id: TemplateId,
        caller: &Caller,
    ) -> Result<bool, StoreError> {
        self.txn(|tx, _| template_read_allowed(tx, template_id, caller.user_id))
    }
}

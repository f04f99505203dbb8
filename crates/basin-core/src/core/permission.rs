// crates/basin-core/src/core/permission.rs
// ============================================================================
// Module: Basin Permission Evaluation
// Description: Pure view/edit/share evaluation over loaded owner rows.
// Purpose: Decide access without touching storage; backends load rows and ask.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! Every shareable entity (project, network, template, dataset) carries a
//! set of owner rows, one per user, each with three permission bits. The
//! rules are uniform: the creator always passes, otherwise the first owner
//! row for the user with the relevant bit set grants. Templates additionally
//! grant read when a row exists for the anonymous system user. Hidden
//! datasets use [`dataset_visibility`] so readers can branch on a tag
//! instead of catching an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::UserId;

// ============================================================================
// SECTION: Access Levels
// ============================================================================

/// The three access levels an owner row can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Read the entity and its contents.
    View,
    /// Mutate the entity.
    Edit,
    /// Grant or revoke access for other users.
    Share,
}

/// The anonymous/system user id. A template owner row for this user grants
/// read access to everyone.
pub const ANONYMOUS_USER: UserId = UserId::new(1);

// ============================================================================
// SECTION: Owner Records
// ============================================================================

/// One owner row: the permission bits one user holds on one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRecord {
    /// User the row applies to.
    pub user_id: UserId,
    /// Whether the user may view the entity.
    pub view: bool,
    /// Whether the user may edit the entity.
    pub edit: bool,
    /// Whether the user may share the entity.
    pub share: bool,
}

impl OwnerRecord {
    /// Returns whether this row grants the given access level.
    #[must_use]
    pub const fn grants(&self, level: AccessLevel) -> bool {
        match level {
            AccessLevel::View => self.view,
            AccessLevel::Edit => self.edit,
            AccessLevel::Share => self.share,
        }
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates whether `user` holds `level` access given the entity's creator
/// and owner rows. The creator always passes regardless of owner rows.
#[must_use]
pub fn evaluate_access(
    created_by: Option<UserId>,
    owners: &[OwnerRecord],
    user: UserId,
    level: AccessLevel,
) -> bool {
    if created_by == Some(user) {
        return true;
    }
    owners
        .iter()
        .any(|owner| owner.user_id == user && owner.grants(level))
}

/// Evaluates template read access: the ordinary rules apply, and a row for
/// the anonymous system user grants read to everyone.
#[must_use]
pub fn evaluate_template_read(
    created_by: Option<UserId>,
    owners: &[OwnerRecord],
    user: UserId,
) -> bool {
    if evaluate_access(created_by, owners, user, AccessLevel::View) {
        return true;
    }
    owners
        .iter()
        .any(|owner| owner.user_id == ANONYMOUS_USER && owner.view)
}

// ============================================================================
// SECTION: Dataset Visibility
// ============================================================================

/// Result of a hidden-dataset visibility check.
///
/// Reads branch on this tag: `Masked` means value, start time, frequency,
/// and metadata are withheld, never that the read fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// The caller may see the dataset contents.
    Visible,
    /// The dataset is hidden and the caller is not among its owners.
    Masked,
}

/// Decides whether a dataset's contents are visible to `user`. Non-hidden
/// datasets are visible to everyone; hidden datasets are visible to their
/// creator and to owners holding the view bit.
#[must_use]
pub fn dataset_visibility(
    hidden: bool,
    created_by: Option<UserId>,
    owners: &[OwnerRecord],
    user: UserId,
) -> Visibility {
    if !hidden || evaluate_access(created_by, owners, user, AccessLevel::View) {
        Visibility::Visible
    } else {
        Visibility::Masked
    }
}

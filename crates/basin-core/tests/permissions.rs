// crates/basin-core/tests/permissions.rs
// ============================================================================
// Module: Permission Evaluation Tests
// Description: Tests for owner-row access evaluation and dataset visibility.
// Purpose: Validate creator bypass, per-bit grants, and hidden masking rules.
// Dependencies: basin-core
// ============================================================================
//! ## Overview
//! Access rules are uniform across entities: creator always passes, owner
//! rows grant per bit. Templates additionally honor an anonymous-user row
//! for read, and hidden datasets resolve to a visibility tag rather than an
//! error.

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

use basin_core::ANONYMOUS_USER;
use basin_core::AccessLevel;
use basin_core::OwnerRecord;
use basin_core::UserId;
use basin_core::Visibility;
use basin_core::dataset_visibility;
use basin_core::evaluate_access;
use basin_core::evaluate_template_read;

/// Builds an owner row with the given bits.
const fn owner(user: i64, view: bool, edit: bool, share: bool) -> OwnerRecord {
    OwnerRecord {
        user_id: UserId::new(user),
        view,
        edit,
        share,
    }
}

/// Verifies the creator passes every level with no owner rows.
#[test]
fn creator_always_passes() {
    let creator = UserId::new(7);
    for level in [AccessLevel::View, AccessLevel::Edit, AccessLevel::Share] {
        assert!(evaluate_access(Some(creator), &[], creator, level));
    }
}

/// Verifies each access level keys on exactly its own bit.
#[test]
fn owner_rows_grant_per_bit() {
    let rows = [owner(2, true, false, false)];
    let user = UserId::new(2);
    assert!(evaluate_access(None, &rows, user, AccessLevel::View));
    assert!(!evaluate_access(None, &rows, user, AccessLevel::Edit));
    assert!(!evaluate_access(None, &rows, user, AccessLevel::Share));
}

/// Verifies a user with no row is denied.
#[test]
fn missing_row_denies() {
    let rows = [owner(2, true, true, true)];
    assert!(!evaluate_access(None, &rows, UserId::new(3), AccessLevel::View));
}

/// Verifies template read honors a row for the anonymous system user.
#[test]
fn template_read_honors_anonymous_row() {
    let rows = [owner(ANONYMOUS_USER.get(), true, false, false)];
    assert!(evaluate_template_read(None, &rows, UserId::new(9)));
}

/// Verifies template read still denies without any matching row.
#[test]
fn template_read_denies_without_rows() {
    let rows = [owner(2, true, false, false)];
    assert!(!evaluate_template_read(None, &rows, UserId::new(9)));
}

/// Verifies non-hidden datasets are visible to everyone.
#[test]
fn non_hidden_datasets_visible() {
    assert_eq!(
        dataset_visibility(false, None, &[], UserId::new(5)),
        Visibility::Visible
    );
}

/// Verifies hidden datasets mask for non-owners and show for owners.
#[test]
fn hidden_datasets_mask_non_owners() {
    let rows = [owner(2, true, false, false)];
    assert_eq!(
        dataset_visibility(true, None, &rows, UserId::new(2)),
        Visibility::Visible
    );
    assert_eq!(
        dataset_visibility(true, None, &rows, UserId::new(3)),
        Visibility::Masked
    );
}

/// Verifies the creator sees hidden datasets without an owner row.
#[test]
fn hidden_dataset_visible_to_creator() {
    assert_eq!(
        dataset_visibility(true, Some(UserId::new(4)), &[], UserId::new(4)),
        Visibility::Visible
    );
}

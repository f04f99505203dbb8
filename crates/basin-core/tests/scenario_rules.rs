// crates/basin-core/tests/scenario_rules.rs
// ============================================================================
// Module: Scenario Rule Tests
// Description: Tests for clone naming and pure scenario comparison.
// Purpose: Validate the clone-count naming convention and symmetric diffs.
// Dependencies: basin-core
// ============================================================================
//! ## Overview
//! Clone naming counts prior scenarios whose name contains `clone`;
//! comparison reports only bindings that differ and the symmetric
//! difference of group membership.

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

use basin_core::DatasetId;
use basin_core::GroupId;
use basin_core::GroupItem;
use basin_core::GroupItemId;
use basin_core::GroupMemberRef;
use basin_core::NodeId;
use basin_core::ResourceAttrId;
use basin_core::ResourceScenario;
use basin_core::ScenarioId;
use basin_core::clone_name;
use basin_core::diff_group_items;
use basin_core::diff_resource_scenarios;

/// Builds a binding row for diff tests.
fn binding(scenario: i64, attr: i64, dataset: i64) -> ResourceScenario {
    ResourceScenario {
        scenario_id: ScenarioId::new(scenario),
        resource_attr_id: ResourceAttrId::new(attr),
        dataset_id: DatasetId::new(dataset),
        source: None,
    }
}

/// Verifies the first clone in a network takes the bare suffix.
#[test]
fn first_clone_takes_bare_suffix() {
    let existing = ["exp"];
    assert_eq!(clone_name("exp", existing), "exp (clone)");
}

/// Verifies clone names count prior clones in the network.
#[test]
fn clone_names_count_prior_clones() {
    let one_clone = ["exp", "exp (clone)"];
    assert_eq!(clone_name("exp", one_clone), "exp (clone) 1");

    let two_clones = ["exp", "exp (clone)", "exp (clone) 1"];
    assert_eq!(clone_name("exp", two_clones), "exp (clone) 2");
}

/// Verifies differing bindings produce one entry with both sides.
#[test]
fn diff_reports_both_sides() {
    let s1 = vec![binding(1, 7, 100)];
    let s2 = vec![binding(2, 7, 101)];
    let diffs = diff_resource_scenarios(&s1, &s2);
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].resource_attr_id, ResourceAttrId::new(7));
    assert_eq!(diffs[0].scenario_1_dataset, Some(DatasetId::new(100)));
    assert_eq!(diffs[0].scenario_2_dataset, Some(DatasetId::new(101)));
}

/// Verifies equal bindings produce no entries.
#[test]
fn diff_skips_equal_bindings() {
    let s1 = vec![binding(1, 7, 100), binding(1, 8, 200)];
    let s2 = vec![binding(2, 7, 100), binding(2, 8, 201)];
    let diffs = diff_resource_scenarios(&s1, &s2);
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].resource_attr_id, ResourceAttrId::new(8));
}

/// Verifies a binding absent on one side reports the present side's attribute.
#[test]
fn diff_reports_one_sided_binding() {
    let s1 = vec![];
    let s2 = vec![binding(2, 9, 300)];
    let diffs = diff_resource_scenarios(&s1, &s2);
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].resource_attr_id, ResourceAttrId::new(9));
    assert_eq!(diffs[0].scenario_1_dataset, None);
    assert_eq!(diffs[0].scenario_2_dataset, Some(DatasetId::new(300)));
}

/// Verifies group comparison is a symmetric difference over membership keys.
#[test]
fn group_diff_is_symmetric_difference() {
    let shared = GroupItem {
        item_id: GroupItemId::new(1),
        scenario_id: ScenarioId::new(1),
        group_id: GroupId::new(5),
        member: GroupMemberRef::Node(NodeId::new(10)),
    };
    let only_1 = GroupItem {
        item_id: GroupItemId::new(2),
        scenario_id: ScenarioId::new(1),
        group_id: GroupId::new(5),
        member: GroupMemberRef::Node(NodeId::new(11)),
    };
    let mut shared_in_2 = shared.clone();
    shared_in_2.item_id = GroupItemId::new(3);
    shared_in_2.scenario_id = ScenarioId::new(2);
    let only_2 = GroupItem {
        item_id: GroupItemId::new(4),
        scenario_id: ScenarioId::new(2),
        group_id: GroupId::new(5),
        member: GroupMemberRef::Subgroup(GroupId::new(6)),
    };

    let diff = diff_group_items(&[shared, only_1], &[shared_in_2, only_2]);
    assert_eq!(
        diff.scenario_1_items,
        vec![(GroupId::new(5), GroupMemberRef::Node(NodeId::new(11)))]
    );
    assert_eq!(
        diff.scenario_2_items,
        vec![(GroupId::new(5), GroupMemberRef::Subgroup(GroupId::new(6)))]
    );
}

/// Verifies identical scenarios produce empty diffs.
#[test]
fn identical_scenarios_diff_empty() {
    let s1 = vec![binding(1, 7, 100)];
    let s2 = vec![binding(2, 7, 100)];
    assert!(diff_resource_scenarios(&s1, &s2).is_empty());
    let diff = diff_group_items(&[], &[]);
    assert!(diff.scenario_1_items.is_empty());
    assert!(diff.scenario_2_items.is_empty());
}

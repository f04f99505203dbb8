// crates/basin-store-sqlite/tests/engine_scenarios.rs
// ============================================================================
// Module: Scenario Engine End-To-End Tests
// Description: Dedup, locking, cloning, comparison, mapping, copy-on-write.
// Purpose: Validate the engine's end-to-end behaviors on an in-memory store.
// Dependencies: basin-core, basin-store-sqlite
// ============================================================================
//! ## Overview
//! Walks the engine through its defining behaviors: content-equal values
//! collapse to one dataset, locked scenarios reject mutation until
//! unlocked, clone names count prior clones, comparison reports exactly
//! the differing bindings, mapping propagates absence, and updating a
//! shared dataset copies instead of mutating.

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

mod common;

use basin_store_sqlite::StoreError;
use common::binding;
use common::fixture;
use common::scalar;
use common::scenario;

/// Verifies content-equal values bound to different attributes and
/// scenarios share one dataset row.
#[test]
fn equal_content_shares_one_dataset() {
    let mut fx = fixture();
    let scen_a = fx
        .store
        .add_scenario(
            fx.network_id,
            &scenario("a", vec![binding(fx.ra_flow_a, scalar("inflow", "3.14"))]),
            &fx.owner,
        )
        .unwrap();
    let scen_b = fx
        .store
        .add_scenario(
            fx.network_id,
            &scenario("b", vec![binding(fx.ra_flow_b, scalar("inflow", "3.14"))]),
            &fx.owner,
        )
        .unwrap();

    let dataset_a = scen_a.resource_scenarios[0].dataset_id;
    let dataset_b = scen_b.resource_scenarios[0].dataset_id;
    assert_eq!(dataset_a, dataset_b);

    // The shared dataset is referenced from both scenarios.
    let referencing = fx.store.get_dataset_scenarios(dataset_a, &fx.owner).unwrap();
    assert_eq!(referencing.len(), 2);
}

/// Verifies a locked scenario rejects data updates until unlocked.
#[test]
fn lock_blocks_updates_until_unlock() {
    let mut fx = fixture();
    let scen = fx
        .store
        .add_scenario(fx.network_id, &scenario("ops", vec![]), &fx.owner)
        .unwrap();
    let scenario_id = scen.scenario.scenario_id;

    fx.store.lock_scenario(scenario_id, &fx.owner).unwrap();
    let err = fx
        .store
        .update_resourcedata(
            scenario_id,
            &[binding(fx.ra_flow_a, scalar("inflow", "1.0"))],
            &fx.owner,
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::Locked(id) if id == scenario_id));

    fx.store.unlock_scenario(scenario_id, &fx.owner).unwrap();
    let updated = fx
        .store
        .update_resourcedata(
            scenario_id,
            &[binding(fx.ra_flow_a, scalar("inflow", "1.0"))],
            &fx.owner,
        )
        .unwrap();
    assert_eq!(updated.len(), 1);
}

/// Verifies clone names count the network's prior clones.
#[test]
fn clone_names_count_prior_clones() {
    let mut fx = fixture();
    fx.store
        .add_scenario(fx.network_id, &scenario("exp", vec![]), &fx.owner)
        .unwrap();
    fx.store
        .add_scenario(fx.network_id, &scenario("exp (clone)", vec![]), &fx.owner)
        .unwrap();

    let exp = fx.store.get_network_scenarios(fx.network_id, &fx.owner).unwrap();
    let exp_id = exp
        .iter()
        .find(|scenario| scenario.name == "exp")
        .unwrap()
        .scenario_id;

    let first = fx.store.clone_scenario(exp_id, &fx.owner).unwrap();
    assert_eq!(first.scenario.name, "exp (clone) 1");
    let second = fx.store.clone_scenario(exp_id, &fx.owner).unwrap();
    assert_eq!(second.scenario.name, "exp (clone) 2");
}

/// Verifies a clone is unlocked even when its source is locked and binds
/// the same datasets without copying them.
#[test]
fn clone_shares_datasets_and_unlocks() {
    let mut fx = fixture();
    let source = fx
        .store
        .add_scenario(
            fx.network_id,
            &scenario("base", vec![binding(fx.ra_flow_a, scalar("inflow", "42"))]),
            &fx.owner,
        )
        .unwrap();
    fx.store
        .lock_scenario(source.scenario.scenario_id, &fx.owner)
        .unwrap();

    let clone = fx
        .store
        .clone_scenario(source.scenario.scenario_id, &fx.owner)
        .unwrap();
    assert!(!clone.scenario.locked);
    assert_eq!(
        clone.resource_scenarios[0].dataset_id,
        source.resource_scenarios[0].dataset_id
    );

    // An immediate comparison of source and clone is empty.
    let diff = fx
        .store
        .compare_scenarios(source.scenario.scenario_id, clone.scenario.scenario_id, &fx.owner)
        .unwrap();
    assert!(diff.resourcescenarios.is_empty());
    assert!(diff.groups.scenario_1_items.is_empty());
    assert!(diff.groups.scenario_2_items.is_empty());
}

/// Verifies comparison reports one entry per differing binding with both
/// sides hydrated.
#[test]
fn comparison_reports_differing_bindings() {
    let mut fx = fixture();
    let scen_1 = fx
        .store
        .add_scenario(
            fx.network_id,
            &scenario("wet year", vec![binding(fx.ra_flow_a, scalar("inflow", "100"))]),
            &fx.owner,
        )
        .unwrap();
    let scen_2 = fx
        .store
        .add_scenario(
            fx.network_id,
            &scenario("dry year", vec![binding(fx.ra_flow_a, scalar("inflow", "101"))]),
            &fx.owner,
        )
        .unwrap();

    let diff = fx
        .store
        .compare_scenarios(scen_1.scenario.scenario_id, scen_2.scenario.scenario_id, &fx.owner)
        .unwrap();
    assert_eq!(diff.resourcescenarios.len(), 1);
    let entry = &diff.resourcescenarios[0];
    assert_eq!(entry.resource_attr_id, fx.ra_flow_a);
    assert_eq!(
        entry.scenario_1_dataset.as_ref().unwrap().dataset_id,
        scen_1.resource_scenarios[0].dataset_id
    );
    assert_eq!(
        entry.scenario_2_dataset.as_ref().unwrap().dataset_id,
        scen_2.resource_scenarios[0].dataset_id
    );
}

/// Verifies comparing scenarios of different networks is rejected.
#[test]
fn comparison_requires_one_network() {
    let mut fx = fixture();
    let other_network = fx
        .store
        .add_network(fx.project_id, "lower basin", None, None, &fx.owner)
        .unwrap();
    let scen_1 = fx
        .store
        .add_scenario(fx.network_id, &scenario("here", vec![]), &fx.owner)
        .unwrap();
    let scen_2 = fx
        .store
        .add_scenario(other_network, &scenario("there", vec![]), &fx.owner)
        .unwrap();

    let err = fx
        .store
        .compare_scenarios(scen_1.scenario.scenario_id, scen_2.scenario.scenario_id, &fx.owner)
        .unwrap_err();
    assert!(matches!(err, StoreError::CrossNetwork(_)));
}

/// Verifies mapping propagation deletes the target binding when the source
/// has none, and returns null.
#[test]
fn mapping_propagates_absence() {
    let mut fx = fixture();
    let source = fx
        .store
        .add_scenario(fx.network_id, &scenario("source", vec![]), &fx.owner)
        .unwrap();
    let target = fx
        .store
        .add_scenario(
            fx.network_id,
            &scenario("target", vec![binding(fx.ra_flow_b, scalar("inflow", "7"))]),
            &fx.owner,
        )
        .unwrap();
    fx.store
        .add_resource_attr_map(fx.ra_flow_a, fx.ra_flow_b)
        .unwrap();

    let result = fx
        .store
        .update_value_from_mapping(
            fx.ra_flow_a,
            fx.ra_flow_b,
            source.scenario.scenario_id,
            target.scenario.scenario_id,
            &fx.owner,
        )
        .unwrap();
    assert!(result.is_none());

    let target_data = fx
        .store
        .get_scenario(target.scenario.scenario_id, &fx.owner)
        .unwrap();
    assert!(target_data.resource_scenarios.is_empty());
}

/// Verifies mapping propagation creates and rebinds target bindings, and
/// is idempotent.
#[test]
fn mapping_propagates_presence_idempotently() {
    let mut fx = fixture();
    let source = fx
        .store
        .add_scenario(
            fx.network_id,
            &scenario("source", vec![binding(fx.ra_flow_a, scalar("inflow", "7"))]),
            &fx.owner,
        )
        .unwrap();
    let target = fx
        .store
        .add_scenario(fx.network_id, &scenario("target", vec![]), &fx.owner)
        .unwrap();
    fx.store
        .add_resource_attr_map(fx.ra_flow_b, fx.ra_flow_a)
        .unwrap();

    let first = fx
        .store
        .update_value_from_mapping(
            fx.ra_flow_a,
            fx.ra_flow_b,
            source.scenario.scenario_id,
            target.scenario.scenario_id,
            &fx.owner,
        )
        .unwrap()
        .unwrap();
    let second = fx
        .store
        .update_value_from_mapping(
            fx.ra_flow_a,
            fx.ra_flow_b,
            source.scenario.scenario_id,
            target.scenario.scenario_id,
            &fx.owner,
        )
        .unwrap()
        .unwrap();
    assert_eq!(first.dataset_id, second.dataset_id);
    assert_eq!(first.dataset_id, source.resource_scenarios[0].dataset_id);
}

/// Verifies a missing mapping is reported rather than silently skipped.
#[test]
fn mapping_requires_a_mapping_row() {
    let mut fx = fixture();
    let source = fx
        .store
        .add_scenario(fx.network_id, &scenario("source", vec![]), &fx.owner)
        .unwrap();
    let target = fx
        .store
        .add_scenario(fx.network_id, &scenario("target", vec![]), &fx.owner)
        .unwrap();

    let err = fx
        .store
        .update_value_from_mapping(
            fx.ra_flow_a,
            fx.ra_flow_b,
            source.scenario.scenario_id,
            target.scenario.scenario_id,
            &fx.owner,
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

/// Verifies updating one of two bindings sharing a dataset copies rather
/// than mutating: the untouched binding keeps the original dataset.
#[test]
fn shared_dataset_update_copies_on_write() {
    let mut fx = fixture();
    let scen = fx
        .store
        .add_scenario(
            fx.network_id,
            &scenario(
                "shared",
                vec![
                    binding(fx.ra_flow_a, scalar("inflow", "55")),
                    binding(fx.ra_flow_b, scalar("inflow", "55")),
                ],
            ),
            &fx.owner,
        )
        .unwrap();
    let shared_dataset = scen.resource_scenarios[0].dataset_id;
    assert_eq!(shared_dataset, scen.resource_scenarios[1].dataset_id);

    fx.store
        .update_resourcedata(
            scen.scenario.scenario_id,
            &[binding(fx.ra_flow_a, scalar("inflow", "56"))],
            &fx.owner,
        )
        .unwrap();

    let after = fx
        .store
        .get_scenario(scen.scenario.scenario_id, &fx.owner)
        .unwrap();
    let binding_a = after
        .resource_scenarios
        .iter()
        .find(|rs| rs.resource_attr_id == fx.ra_flow_a)
        .unwrap();
    let binding_b = after
        .resource_scenarios
        .iter()
        .find(|rs| rs.resource_attr_id == fx.ra_flow_b)
        .unwrap();
    assert_ne!(binding_a.dataset_id, shared_dataset);
    assert_eq!(binding_b.dataset_id, shared_dataset);
}

/// Verifies a solely-referenced dataset is updated in place instead of
/// being superseded by a new row.
#[test]
fn private_dataset_updates_in_place() {
    let mut fx = fixture();
    let scen = fx
        .store
        .add_scenario(
            fx.network_id,
            &scenario("private", vec![binding(fx.ra_flow_a, scalar("inflow", "8"))]),
            &fx.owner,
        )
        .unwrap();
    let original_dataset = scen.resource_scenarios[0].dataset_id;

    let updated = fx
        .store
        .update_resourcedata(
            scen.scenario.scenario_id,
            &[binding(fx.ra_flow_a, scalar("inflow", "9"))],
            &fx.owner,
        )
        .unwrap();
    assert_eq!(updated[0].dataset_id, original_dataset);

    let dataset = fx.store.get_dataset(original_dataset, &fx.owner).unwrap();
    assert_eq!(dataset.value.as_deref(), Some(b"9".as_slice()));
}

/// Verifies duplicate scenario names within a network are rejected.
#[test]
fn duplicate_scenario_name_conflicts() {
    let mut fx = fixture();
    fx.store
        .add_scenario(fx.network_id, &scenario("baseline", vec![]), &fx.owner)
        .unwrap();
    let err = fx
        .store
        .add_scenario(fx.network_id, &scenario("baseline", vec![]), &fx.owner)
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

/// Verifies purging a scenario removes it and its children while leaving
/// datasets in the content store.
#[test]
fn purge_cascades_but_keeps_datasets() {
    let mut fx = fixture();
    let scen = fx
        .store
        .add_scenario(
            fx.network_id,
            &scenario("doomed", vec![binding(fx.ra_flow_a, scalar("inflow", "3"))]),
            &fx.owner,
        )
        .unwrap();
    let dataset_id = scen.resource_scenarios[0].dataset_id;

    fx.store
        .purge_scenario(scen.scenario.scenario_id, &fx.owner)
        .unwrap();
    let err = fx
        .store
        .get_scenario(scen.scenario.scenario_id, &fx.owner)
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));

    // The dataset survives the purge.
    let dataset = fx.store.get_dataset(dataset_id, &fx.owner).unwrap();
    assert_eq!(dataset.dataset_id, dataset_id);
}

// crates/basin-store-sqlite/tests/permissions_and_locking.rs
// ============================================================================
// Module: Permission And Locking Tests
// Description: Permission gating, hidden masking, and the lock state machine.
// Purpose: Validate denied mutations leave no trace and hidden data masks silently.
// Dependencies: basin-core, basin-store-sqlite
// ============================================================================
//! ## Overview
//! Exercises the guard from the outside: callers without edit access are
//! rejected with nothing committed, locked scenarios reject every mutation
//! but unlock, hidden datasets mask silently on reads, and cross-network
//! bulk updates commit nothing.

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

use basin_core::ANONYMOUS_USER;
use basin_core::DatasetInput;
use basin_core::DatasetType;
use basin_core::MetadataMap;
use basin_store_sqlite::Caller;
use basin_store_sqlite::DatasetSpec;
use basin_store_sqlite::StoreError;
use common::binding;
use common::deletion;
use common::fixture;
use common::scalar;
use common::scenario;

/// Verifies a user without edit access cannot mutate and nothing changes.
#[test]
fn denied_mutation_leaves_no_trace() {
    let mut fx = fixture();
    let scen = fx
        .store
        .add_scenario(fx.network_id, &scenario("guarded", vec![]), &fx.owner)
        .unwrap();
    let scenario_id = scen.scenario.scenario_id;

    let err = fx
        .store
        .update_resourcedata(
            scenario_id,
            &[binding(fx.ra_flow_a, scalar("inflow", "1"))],
            &fx.outsider,
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::Permission(_)));

    let after = fx.store.get_scenario(scenario_id, &fx.owner).unwrap();
    assert!(after.resource_scenarios.is_empty());
}

/// Verifies a view-only grant permits reads but not writes.
#[test]
fn view_grant_does_not_permit_writes() {
    let mut fx = fixture();
    let viewer = Caller::new(fx.store.add_user("viewer", "V. Iewer").unwrap());
    fx.store
        .set_network_owner(fx.network_id, viewer.user_id, true, false, false, &fx.owner)
        .unwrap();
    let scen = fx
        .store
        .add_scenario(fx.network_id, &scenario("readable", vec![]), &fx.owner)
        .unwrap();

    assert!(fx.store.get_scenario(scen.scenario.scenario_id, &viewer).is_ok());
    let err = fx
        .store
        .lock_scenario(scen.scenario.scenario_id, &viewer)
        .unwrap_err();
    assert!(matches!(err, StoreError::Permission(_)));
}

/// Verifies every mutation but unlock fails on a locked scenario.
#[test]
fn locked_scenario_rejects_all_mutations() {
    let mut fx = fixture();
    let scen = fx
        .store
        .add_scenario(
            fx.network_id,
            &scenario("frozen", vec![binding(fx.ra_flow_a, scalar("inflow", "5"))]),
            &fx.owner,
        )
        .unwrap();
    let scenario_id = scen.scenario.scenario_id;
    fx.store.lock_scenario(scenario_id, &fx.owner).unwrap();

    let dataset_id = scen.resource_scenarios[0].dataset_id;
    let locked = |err: StoreError| matches!(err, StoreError::Locked(id) if id == scenario_id);

    assert!(locked(
        fx.store
            .update_resourcedata(scenario_id, &[binding(fx.ra_flow_b, scalar("n", "1"))], &fx.owner)
            .unwrap_err()
    ));
    assert!(locked(
        fx.store
            .delete_resourcedata(scenario_id, fx.ra_flow_a, &fx.owner)
            .unwrap_err()
    ));
    assert!(locked(
        fx.store
            .add_data_to_attribute(scenario_id, fx.ra_flow_b, &scalar("n", "1"), &fx.owner)
            .unwrap_err()
    ));
    assert!(locked(
        fx.store
            .set_resourcescenario_dataset(fx.ra_flow_a, scenario_id, dataset_id, &fx.owner)
            .unwrap_err()
    ));
    assert!(locked(
        fx.store
            .empty_group(fx.group_id, scenario_id, &fx.owner)
            .unwrap_err()
    ));
    assert!(locked(fx.store.purge_scenario(scenario_id, &fx.owner).unwrap_err()));
    assert!(locked(
        fx.store
            .set_scenario_status(scenario_id, false, &fx.owner)
            .unwrap_err()
    ));

    // Unlock is the one admitted transition.
    fx.store.unlock_scenario(scenario_id, &fx.owner).unwrap();
    fx.store
        .delete_resourcedata(scenario_id, fx.ra_flow_a, &fx.owner)
        .unwrap();
}

/// Verifies hidden datasets come back masked for non-owners and intact for
/// their creator, without any error.
#[test]
fn hidden_datasets_mask_silently() {
    let mut fx = fixture();
    let hidden_spec = DatasetSpec {
        data_type: DatasetType::Scalar,
        name: "confidential demand".to_string(),
        units: None,
        dimension: None,
        value: Some(DatasetInput::Text("99".to_string())),
        metadata: MetadataMap::from([("source".to_string(), "client".to_string())]),
        hidden: true,
    };
    let scen = fx
        .store
        .add_scenario(
            fx.network_id,
            &scenario(
                "sensitive",
                vec![binding(fx.ra_flow_a, hidden_spec)],
            ),
            &fx.owner,
        )
        .unwrap();

    // A network viewer without dataset ownership sees the masked form.
    let viewer = Caller::new(fx.store.add_user("viewer", "V. Iewer").unwrap());
    fx.store
        .set_network_owner(fx.network_id, viewer.user_id, true, false, false, &fx.owner)
        .unwrap();
    let masked = fx
        .store
        .get_scenario_data(scen.scenario.scenario_id, &viewer)
        .unwrap();
    assert_eq!(masked.len(), 1);
    assert!(masked[0].value.is_none());
    assert!(masked[0].start_time.is_none());
    assert!(masked[0].frequency.is_none());
    assert!(masked[0].metadata.is_empty());

    // The creator sees everything.
    let visible = fx
        .store
        .get_scenario_data(scen.scenario.scenario_id, &fx.owner)
        .unwrap();
    assert_eq!(visible[0].value.as_deref(), Some(b"99".as_slice()));
    assert_eq!(visible[0].metadata.len(), 1);
}

/// Verifies a dataset owner grant restores visibility of a hidden dataset.
#[test]
fn dataset_owner_grant_unmasks() {
    let mut fx = fixture();
    let mut spec = scalar("rating curve", "17");
    spec.hidden = true;
    let dataset = fx.store.add_or_reuse_dataset(&spec, &fx.owner).unwrap();

    let analyst = Caller::new(fx.store.add_user("analyst", "A. Nalyst").unwrap());
    let masked = fx.store.get_dataset(dataset.dataset_id, &analyst).unwrap();
    assert!(masked.value.is_none());

    fx.store
        .set_dataset_owner(dataset.dataset_id, analyst.user_id, true, false, false, &fx.owner)
        .unwrap();
    let visible = fx.store.get_dataset(dataset.dataset_id, &analyst).unwrap();
    assert_eq!(visible.value.as_deref(), Some(b"17".as_slice()));
}

/// Verifies the creator's owner row cannot be removed.
#[test]
fn creator_cannot_be_unset() {
    let mut fx = fixture();
    let dataset = fx
        .store
        .add_or_reuse_dataset(&scalar("keeper", "1"), &fx.owner)
        .unwrap();
    fx.store
        .unset_dataset_owner(dataset.dataset_id, fx.owner.user_id, &fx.owner)
        .unwrap();
    // Still fully visible and editable by the creator.
    let still = fx.store.get_dataset(dataset.dataset_id, &fx.owner).unwrap();
    assert_eq!(still.value.as_deref(), Some(b"1".as_slice()));
}

/// Verifies template read honors a row for the anonymous system user.
#[test]
fn template_anonymous_row_grants_read() {
    let mut fx = fixture();
    let template_id = fx.store.add_template("hydrology", &fx.owner).unwrap();

    assert!(!fx.store.can_read_template(template_id, &fx.outsider).unwrap());
    fx.store
        .set_template_owner(template_id, ANONYMOUS_USER, true, false, false, &fx.owner)
        .unwrap();
    assert!(fx.store.can_read_template(template_id, &fx.outsider).unwrap());
}

/// Verifies bulk updates across two networks fail and commit nothing.
#[test]
fn cross_network_bulk_update_commits_nothing() {
    let mut fx = fixture();
    let other_network = fx
        .store
        .add_network(fx.project_id, "lower basin", None, None, &fx.owner)
        .unwrap();
    let scen_here = fx
        .store
        .add_scenario(fx.network_id, &scenario("here", vec![]), &fx.owner)
        .unwrap();
    let scen_there = fx
        .store
        .add_scenario(other_network, &scenario("there", vec![]), &fx.owner)
        .unwrap();

    let err = fx
        .store
        .bulk_update_resourcedata(
            &[scen_here.scenario.scenario_id, scen_there.scenario.scenario_id],
            &[binding(fx.ra_flow_a, scalar("inflow", "1"))],
            &fx.owner,
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::CrossNetwork(_)));

    let here = fx
        .store
        .get_scenario(scen_here.scenario.scenario_id, &fx.owner)
        .unwrap();
    assert!(here.resource_scenarios.is_empty());
}

/// Verifies bulk updates apply to every scenario of one network and a nil
/// value deletes the binding.
#[test]
fn bulk_update_applies_and_nil_deletes() {
    let mut fx = fixture();
    let scen_1 = fx
        .store
        .add_scenario(
            fx.network_id,
            &scenario("one", vec![binding(fx.ra_flow_a, scalar("inflow", "1"))]),
            &fx.owner,
        )
        .unwrap();
    let scen_2 = fx
        .store
        .add_scenario(
            fx.network_id,
            &scenario("two", vec![binding(fx.ra_flow_a, scalar("inflow", "2"))]),
            &fx.owner,
        )
        .unwrap();

    let results = fx
        .store
        .bulk_update_resourcedata(
            &[scen_1.scenario.scenario_id, scen_2.scenario.scenario_id],
            &[deletion(fx.ra_flow_a), binding(fx.ra_flow_b, scalar("inflow", "3"))],
            &fx.owner,
        )
        .unwrap();
    assert_eq!(results.len(), 2);

    for scenario_id in [scen_1.scenario.scenario_id, scen_2.scenario.scenario_id] {
        let data = fx.store.get_scenario(scenario_id, &fx.owner).unwrap();
        assert_eq!(data.resource_scenarios.len(), 1);
        assert_eq!(data.resource_scenarios[0].resource_attr_id, fx.ra_flow_b);
    }
}

/// Verifies soft-delete flips status and activation restores it.
#[test]
fn soft_delete_and_activate_flip_status() {
    let mut fx = fixture();
    let scen = fx
        .store
        .add_scenario(
            fx.network_id,
            &scenario("transient", vec![binding(fx.ra_flow_a, scalar("inflow", "4"))]),
            &fx.owner,
        )
        .unwrap();
    let scenario_id = scen.scenario.scenario_id;
    let dataset_id = scen.resource_scenarios[0].dataset_id;

    fx.store.delete_scenario(scenario_id, &fx.owner).unwrap();
    // An inactive scenario no longer appears among a dataset's referents.
    assert!(fx.store.get_dataset_scenarios(dataset_id, &fx.owner).unwrap().is_empty());

    fx.store.activate_scenario(scenario_id, &fx.owner).unwrap();
    assert_eq!(fx.store.get_dataset_scenarios(dataset_id, &fx.owner).unwrap().len(), 1);
}

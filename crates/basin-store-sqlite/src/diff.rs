// crates/basin-store-sqlite/src/diff.rs
// ============================================================================
// Module: Basin Scenario Differ
// Description: Symmetric comparison of two scenarios in one network.
// Purpose: Report differing bindings with masked datasets and membership diffs.
// Dependencies: basin-core, rusqlite
// ============================================================================

//! ## Overview
//! Comparison is read-only: the differ loads both scenarios' bindings and
//! group membership, computes the pure diff, and hydrates the differing
//! datasets with the usual hidden-dataset masking. Scenarios in different
//! networks cannot be compared.

// ============================================================================
// SECTION: Imports
// ============================================================================

use basin_core::AccessLevel;
use basin_core::Dataset;
use basin_core::GroupMembershipDiff;
use basin_core::ResourceAttrId;
use basin_core::ScenarioId;
use basin_core::diff_group_items;
use basin_core::diff_resource_scenarios;
use serde::Deserialize;
use serde::Serialize;

use crate::datasets::load_dataset;
use crate::permissions::check_network_access;
use crate::scenarios::load_group_items;
use crate::scenarios::load_resource_scenarios;
use crate::scenarios::load_scenario;
use crate::store::BasinStore;
use crate::store::Caller;
use crate::store::StoreError;

// ============================================================================
// SECTION: Diff DTOs
// ============================================================================

/// One differing attribute binding with its datasets hydrated and masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceScenarioDiff {
    /// The attribute whose bindings differ.
    pub resource_attr_id: ResourceAttrId,
    /// Dataset bound in the first scenario, when any.
    pub scenario_1_dataset: Option<Dataset>,
    /// Dataset bound in the second scenario, when any.
    pub scenario_2_dataset: Option<Dataset>,
}

/// The full comparison of two scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioDiff {
    /// Bindings that differ between the scenarios.
    pub resourcescenarios: Vec<ResourceScenarioDiff>,
    /// Symmetric difference of group membership.
    pub groups: GroupMembershipDiff,
}

// ============================================================================
// SECTION: Comparison
// ============================================================================

impl BasinStore {
    /// Compares two scenarios of one network: per-attribute binding
    /// differences plus the symmetric difference of group membership.
    /// Hidden datasets the caller cannot view appear masked.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing scenario, `CrossNetwork` when the
    /// scenarios are in different networks, and `Permission` when the
    /// caller cannot view the network.
    pub fn compare_scenarios(
        &mut self,
        scenario_id_1: ScenarioId,
        scenario_id_2: ScenarioId,
        caller: &Caller,
    ) -> Result<ScenarioDiff, StoreError> {
        self.txn(|tx, _| {
            let scenario_1 = load_scenario(tx, scenario_id_1)?;
            let scenario_2 = load_scenario(tx, scenario_id_2)?;
            if scenario_1.network_id != scenario_2.network_id {
                return Err(StoreError::CrossNetwork(
                    "cannot compare scenarios that are not in the same network".to_string(),
                ));
            }
            check_network_access(tx, scenario_1.network_id, caller.user_id, AccessLevel::View)?;

            let bindings_1 = load_resource_scenarios(tx, scenario_id_1)?;
            let bindings_2 = load_resource_scenarios(tx, scenario_id_2)?;

            let mut resourcescenarios = Vec::new();
            for entry in diff_resource_scenarios(&bindings_1, &bindings_2) {
                let scenario_1_dataset = entry
                    .scenario_1_dataset
                    .map(|dataset_id| load_dataset(tx, dataset_id, caller.user_id))
                    .transpose()?;
                let scenario_2_dataset = entry
                    .scenario_2_dataset
                    .map(|dataset_id| load_dataset(tx, dataset_id, caller.user_id))
                    .transpose()?;
                resourcescenarios.push(ResourceScenarioDiff {
                    resource_attr_id: entry.resource_attr_id,
                    scenario_1_dataset,
                    scenario_2_dataset,
                });
            }

            let groups = diff_group_items(
                &load_group_items(tx, scenario_id_1)?,
                &load_group_items(tx, scenario_id_2)?,
            );

            Ok(ScenarioDiff {
                resourcescenarios,
                groups,
            })
        })
    }
}

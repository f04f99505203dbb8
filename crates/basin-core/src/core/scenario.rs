// crates/basin-core/src/core/scenario.rs
// ============================================================================
// Module: Basin Scenario Model
// Description: Scenario DTOs, clone naming, and pure comparison logic.
// Purpose: Provide the in-memory scenario shapes and the diff rules backends reuse.
// Dependencies: crate::core::{identifiers, refs}, serde
// ============================================================================

//! ## Overview
//! A scenario is a versioned snapshot within one network: it binds every
//! resource attribute to a dataset and records group membership. The DTOs
//! here are flat and id-based; object graphs never cross the component
//! boundary. Comparison is a symmetric difference computed over the flat
//! rows, and clone naming follows the established convention of counting
//! prior clones in the network.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::DatasetId;
use crate::core::identifiers::GroupId;
use crate::core::identifiers::GroupItemId;
use crate::core::identifiers::NetworkId;
use crate::core::identifiers::ResourceAttrId;
use crate::core::identifiers::ScenarioId;
use crate::core::identifiers::UserId;
use crate::core::refs::GroupMemberRef;

// ============================================================================
// SECTION: Scenario DTOs
// ============================================================================

/// A scenario row, detached from any session.
///
/// # Invariants
/// - `name` is unique within `network_id`.
/// - When `locked` is set, the scenario admits no mutation except unlock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario identifier.
    pub scenario_id: ScenarioId,
    /// Owning network.
    pub network_id: NetworkId,
    /// Scenario name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Simulation start time, when any.
    pub start_time: Option<String>,
    /// Simulation end time, when any.
    pub end_time: Option<String>,
    /// Simulation time step, when any.
    pub time_step: Option<String>,
    /// Whether the scenario is locked against mutation.
    pub locked: bool,
    /// Soft-delete status: `true` while active.
    pub active: bool,
    /// Creating user, when recorded.
    pub created_by: Option<UserId>,
}

/// The per-scenario binding of one resource attribute to one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceScenario {
    /// Owning scenario.
    pub scenario_id: ScenarioId,
    /// Bound resource attribute.
    pub resource_attr_id: ResourceAttrId,
    /// Bound dataset.
    pub dataset_id: DatasetId,
    /// Application that last wrote the binding, when recorded.
    pub source: Option<String>,
}

/// One group membership row within a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupItem {
    /// Item identifier.
    pub item_id: GroupItemId,
    /// Owning scenario.
    pub scenario_id: ScenarioId,
    /// Containing group.
    pub group_id: GroupId,
    /// The member: a node, link, or nested group.
    pub member: GroupMemberRef,
}

// ============================================================================
// SECTION: Clone Naming
// ============================================================================

/// Derives the name for a clone of `source_name` given every scenario name
/// already present in the network. The base form is `"<source> (clone)"`;
/// when the network already holds scenarios whose name contains `"clone"`,
/// the count of those names is appended.
#[must_use]
pub fn clone_name<'a, I>(source_name: &str, existing_names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let prior_clones = existing_names
        .into_iter()
        .filter(|name| name.contains("clone"))
        .count();
    if prior_clones == 0 {
        format!("{source_name} (clone)")
    } else {
        format!("{source_name} (clone) {prior_clones}")
    }
}

// ============================================================================
// SECTION: Scenario Comparison
// ============================================================================

/// One differing attribute binding between two scenarios. A `None` side
/// means the attribute is bound in the other scenario only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDiffIds {
    /// The attribute whose bindings differ.
    pub resource_attr_id: ResourceAttrId,
    /// Dataset bound in the first scenario, when any.
    pub scenario_1_dataset: Option<DatasetId>,
    /// Dataset bound in the second scenario, when any.
    pub scenario_2_dataset: Option<DatasetId>,
}

/// Identity of one group membership for comparison purposes.
pub type GroupItemKey = (GroupId, GroupMemberRef);

/// Symmetric difference of group membership between two scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembershipDiff {
    /// Memberships present in the first scenario only.
    pub scenario_1_items: Vec<GroupItemKey>,
    /// Memberships present in the second scenario only.
    pub scenario_2_items: Vec<GroupItemKey>,
}

/// Computes the per-attribute binding differences between two scenarios.
/// An entry is produced only when the two sides bind different datasets or
/// one side is absent. Entries are ordered by attribute id.
#[must_use]
pub fn diff_resource_scenarios(
    scenario_1: &[ResourceScenario],
    scenario_2: &[ResourceScenario],
) -> Vec<ResourceDiffIds> {
    let bindings_1: BTreeMap<ResourceAttrId, DatasetId> = scenario_1
        .iter()
        .map(|rs| (rs.resource_attr_id, rs.dataset_id))
        .collect();
    let bindings_2: BTreeMap<ResourceAttrId, DatasetId> = scenario_2
        .iter()
        .map(|rs| (rs.resource_attr_id, rs.dataset_id))
        .collect();

    let attr_ids: BTreeSet<ResourceAttrId> =
        bindings_1.keys().chain(bindings_2.keys()).copied().collect();

    let mut diffs = Vec::new();
    for resource_attr_id in attr_ids {
        let dataset_1 = bindings_1.get(&resource_attr_id).copied();
        let dataset_2 = bindings_2.get(&resource_attr_id).copied();
        if dataset_1 != dataset_2 {
            diffs.push(ResourceDiffIds {
                resource_attr_id,
                scenario_1_dataset: dataset_1,
                scenario_2_dataset: dataset_2,
            });
        }
    }
    diffs
}

/// Computes the symmetric difference of group membership between two
/// scenarios. Item ids are irrelevant; membership identity is the
/// `(group, member)` pair.
#[must_use]
pub fn diff_group_items(scenario_1: &[GroupItem], scenario_2: &[GroupItem]) -> GroupMembershipDiff {
    let keys_1: BTreeSet<GroupItemKey> = scenario_1
        .iter()
        .map(|item| (item.group_id, item.member))
        .collect();
    let keys_2: BTreeSet<GroupItemKey> = scenario_2
        .iter()
        .map(|item| (item.group_id, item.member))
        .collect();

    GroupMembershipDiff {
        scenario_1_items: keys_1.difference(&keys_2).copied().collect(),
        scenario_2_items: keys_2.difference(&keys_1).copied().collect(),
    }
}

// crates/basin-store-sqlite/src/scenarios.rs
// ============================================================================
// Module: Basin Scenario Engine
// Description: Scenario CRUD, resource-data upsert, groups, and the lock machine.
// Purpose: Implement every scenario mutation under permission and lock gating.
// Dependencies: basin-core, rusqlite
// ============================================================================

//! ## Overview
//! Scenarios move between two states: unlocked, where mutation is allowed,
//! and locked, where every mutation except unlock fails. Lock transitions
//! require edit access on the parent network, as does every mutation.
//!
//! Resource data flows through one upsert path implementing the dataset
//! mutation policy: an unchanged content hash is a no-op; a dataset proven
//! private to the binding is updated in place; anything else goes through
//! insert-or-reuse and a rebind, leaving other bindings untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use basin_core::AccessLevel;
use basin_core::DatasetId;
use basin_core::DatasetStoreConfig;
use basin_core::GroupId;
use basin_core::GroupItem;
use basin_core::GroupItemId;
use basin_core::GroupMemberRef;
use basin_core::NetworkId;
use basin_core::ResourceAttrId;
use basin_core::ResourceRef;
use basin_core::ResourceScenario;
use basin_core::Scenario;
use basin_core::ScenarioId;
use basin_core::UserId;
use basin_core::clone_name;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;

use crate::datasets::DatasetSpec;
use crate::datasets::UpdateOutcome;
use crate::datasets::bulk_insert_tx;
use crate::datasets::encode_spec;
use crate::datasets::insert_or_reuse_tx;
use crate::datasets::update_dataset_tx;
use crate::permissions::check_network_access;
use crate::resources::load_resource_attr;
use crate::resources::network_project;
use crate::resources::resource_network;
use crate::store::BasinStore;
use crate::store::Caller;
use crate::store::StoreError;
use crate::store::flag;
use crate::store::is_set;
use crate::store::is_unique_violation;

// ============================================================================
// SECTION: Specs
// ============================================================================

/// One incoming attribute binding: a value to upsert, or `None` to delete
/// the binding where the operation supports deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceScenarioSpec {
    /// The attribute to bind.
    pub resource_attr_id: ResourceAttrId,
    /// The value; `None` requests deletion of the binding.
    pub value: Option<DatasetSpec>,
}

/// One incoming group membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupItemSpec {
    /// Containing group.
    pub group_id: GroupId,
    /// The member to add.
    pub member: GroupMemberRef,
}

/// An incoming scenario definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// Scenario name, unique within the network.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Simulation start time.
    pub start_time: Option<String>,
    /// Simulation end time.
    pub end_time: Option<String>,
    /// Simulation time step.
    pub time_step: Option<String>,
    /// Embedded attribute bindings; every entry must carry a value.
    pub resourcescenarios: Vec<ResourceScenarioSpec>,
    /// Embedded group memberships.
    pub resourcegroupitems: Vec<GroupItemSpec>,
}

/// An incoming scenario update; identity plus the same fields as a spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioUpdate {
    /// Scenario to update.
    pub scenario_id: ScenarioId,
    /// New name.
    pub name: String,
    /// New description.
    pub description: Option<String>,
    /// New start time.
    pub start_time: Option<String>,
    /// New end time.
    pub end_time: Option<String>,
    /// New time step.
    pub time_step: Option<String>,
    /// Bindings to upsert when data updates are requested.
    pub resourcescenarios: Vec<ResourceScenarioSpec>,
    /// Memberships to add when group updates are requested.
    pub resourcegroupitems: Vec<GroupItemSpec>,
}

/// A scenario with its bindings and group membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioData {
    /// The scenario row.
    pub scenario: Scenario,
    /// Its attribute bindings.
    pub resource_scenarios: Vec<ResourceScenario>,
    /// Its group membership.
    pub group_items: Vec<GroupItem>,
}

// ============================================================================
// SECTION: Row Loading
// ============================================================================

/// Column list shared by every scenario read; order matches [`read_scenario_row`].
pub(crate) const SCENARIO_COLUMNS: &str = "s.scenario_id, s.scenario_name, \
     s.scenario_description, s.network_id, s.status, s.start_time, s.end_time, s.time_step, \
     s.locked, s.created_by";

/// Reads a scenario row in [`SCENARIO_COLUMNS`] order.
pub(crate) fn read_scenario_row(row: &Row<'_>) -> rusqlite::Result<Scenario> {
    let status: String = row.get(4)?;
    let locked: String = row.get(8)?;
    let created_by: Option<i64> = row.get(9)?;
    Ok(Scenario {
        scenario_id: ScenarioId::new(row.get(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        network_id: NetworkId::new(row.get(3)?),
        active: is_set(&status),
        start_time: row.get(5)?,
        end_time: row.get(6)?,
        time_step: row.get(7)?,
        locked: is_set(&locked),
        created_by: created_by.map(UserId::new),
    })
}

/// Loads a scenario, failing with `NotFound`.
pub(crate) fn load_scenario(
    conn: &Connection,
    scenario_id: ScenarioId,
) -> Result<Scenario, StoreError> {
    let sql = format!("SELECT {SCENARIO_COLUMNS} FROM tScenario s WHERE s.scenario_id = ?1");
    conn.query_row(&sql, params![scenario_id.get()], read_scenario_row)
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("scenario {scenario_id} does not exist")))
}

/// Loads every attribute binding of a scenario.
pub(crate) fn load_resource_scenarios(
    conn: &Connection,
    scenario_id: ScenarioId,
) -> Result<Vec<ResourceScenario>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT resource_attr_id, dataset_id, source FROM tResourceScenario
         WHERE scenario_id = ?1 ORDER BY resource_attr_id",
    )?;
    let rows = stmt.query_map(params![scenario_id.get()], |row| {
        Ok(ResourceScenario {
            scenario_id,
            resource_attr_id: ResourceAttrId::new(row.get(0)?),
            dataset_id: DatasetId::new(row.get(1)?),
            source: row.get(2)?,
        })
    })?;
    let mut bindings = Vec::new();
    for row in rows {
        bindings.push(row?);
    }
    Ok(bindings)
}

/// Loads every group membership of a scenario.
pub(crate) fn load_group_items(
    conn: &Connection,
    scenario_id: ScenarioId,
) -> Result<Vec<GroupItem>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT item_id, group_id, ref_key, node_id, link_id, subgroup_id
         FROM tResourceGroupItem WHERE scenario_id = ?1 ORDER BY item_id",
    )?;
    let rows = stmt.query_map(params![scenario_id.get()], |row| {
        let item_id: i64 = row.get(0)?;
        let group_id: i64 = row.get(1)?;
        let ref_key: String = row.get(2)?;
        let node_id: Option<i64> = row.get(3)?;
        let link_id: Option<i64> = row.get(4)?;
        let subgroup_id: Option<i64> = row.get(5)?;
        Ok((item_id, group_id, ref_key, node_id, link_id, subgroup_id))
    })?;
    let mut items = Vec::new();
    for row in rows {
        let (item_id, group_id, ref_key, node_id, link_id, subgroup_id) = row?;
        let member = GroupMemberRef::from_columns(&ref_key, node_id, link_id, subgroup_id)
            .ok_or_else(|| {
                StoreError::Db(format!(
                    "group item {item_id} has inconsistent member columns"
                ))
            })?;
        items.push(GroupItem {
            item_id: GroupItemId::new(item_id),
            scenario_id,
            group_id: GroupId::new(group_id),
            member,
        });
    }
    Ok(items)
}

/// Loads a scenario with its bindings and membership.
pub(crate) fn load_scenario_data(
    conn: &Connection,
    scenario_id: ScenarioId,
) -> Result<ScenarioData, StoreError> {
    Ok(ScenarioData {
        scenario: load_scenario(conn, scenario_id)?,
        resource_scenarios: load_resource_scenarios(conn, scenario_id)?,
        group_items: load_group_items(conn, scenario_id)?,
    })
}

// ============================================================================
// SECTION: Gating
// ============================================================================

/// Fails with `Locked` when the scenario is locked.
fn ensure_unlocked(scenario: &Scenario) -> Result<(), StoreError> {
    if scenario.locked {
        Err(StoreError::Locked(scenario.scenario_id))
    } else {
        Ok(())
    }
}

/// Loads a scenario and checks the caller may mutate it: edit access on the
/// parent network and an unlocked state.
pub(crate) fn load_for_mutation(
    conn: &Connection,
    scenario_id: ScenarioId,
    user: UserId,
) -> Result<Scenario, StoreError> {
    let scenario = load_scenario(conn, scenario_id)?;
    check_network_access(conn, scenario.network_id, user, AccessLevel::Edit)?;
    ensure_unlocked(&scenario)?;
    Ok(scenario)
}

/// Verifies an attribute may be bound in a scenario: the attribute's
/// network must be the scenario's network, or, for project-scoped
/// attributes, its project must be the network's parent.
fn ensure_attr_in_network(
    conn: &Connection,
    scenario: &Scenario,
    resource: ResourceRef,
) -> Result<(), StoreError> {
    match resource_network(conn, resource)? {
        Some(network_id) if network_id == scenario.network_id => Ok(()),
        Some(network_id) => Err(StoreError::CrossNetwork(format!(
            "resource {resource} belongs to network {network_id}, not network {}",
            scenario.network_id
        ))),
        None => {
            let ResourceRef::Project(project_id) = resource else {
                return Ok(());
            };
            if network_project(conn, scenario.network_id)? == project_id {
                Ok(())
            } else {
                Err(StoreError::CrossNetwork(format!(
                    "project {project_id} is not the parent of network {}",
                    scenario.network_id
                )))
            }
        }
    }
}

// ============================================================================
// SECTION: Resource-Data Upsert
// ============================================================================

/// Loads one binding row when present.
pub(crate) fn find_binding(
    conn: &Connection,
    scenario_id: ScenarioId,
    resource_attr_id: ResourceAttrId,
) -> Result<Option<ResourceScenario>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT dataset_id, source FROM tResourceScenario
             WHERE scenario_id = ?1 AND resource_attr_id = ?2",
            params![scenario_id.get(), resource_attr_id.get()],
            |row| {
                Ok(ResourceScenario {
                    scenario_id,
                    resource_attr_id,
                    dataset_id: DatasetId::new(row.get(0)?),
                    source: row.get(1)?,
                })
            },
        )
        .optional()?)
}

/// Upserts one attribute binding under the dataset mutation policy:
///
/// 1. No binding yet: insert-or-reuse the dataset and create the binding.
/// 2. Unchanged content hash: no-op.
/// 3. Dataset referenced by this binding alone: update it in place, falling
///    back to insert-or-reuse when the new hash collides with another row.
/// 4. Dataset shared with other bindings: insert-or-reuse and rebind,
///    leaving the other bindings on the old dataset.
pub(crate) fn upsert_resource_scenario_tx(
    conn: &Connection,
    config: DatasetStoreConfig,
    scenario: &Scenario,
    resource_attr_id: ResourceAttrId,
    spec: &DatasetSpec,
    user: UserId,
    source: Option<&str>,
) -> Result<ResourceScenario, StoreError> {
    let attr = load_resource_attr(conn, resource_attr_id)?;
    ensure_attr_in_network(conn, scenario, attr.resource)?;

    let existing = find_binding(conn, scenario.scenario_id, resource_attr_id)?;
    let encoded = encode_spec(spec)?;

    if let Some(existing) = existing {
        let current_hash: i64 = conn.query_row(
            "SELECT data_hash FROM tDataset WHERE dataset_id = ?1",
            params![existing.dataset_id.get()],
            |row| row.get(0),
        )?;
        if current_hash == encoded.hash {
            debug!(
                resource_attr_id = resource_attr_id.get(),
                "dataset unchanged, skipping"
            );
            return Ok(existing);
        }

        let other_referrers: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tResourceScenario
             WHERE dataset_id = ?1 AND NOT (scenario_id = ?2 AND resource_attr_id = ?3)",
            params![
                existing.dataset_id.get(),
                scenario.scenario_id.get(),
                resource_attr_id.get()
            ],
            |row| row.get(0),
        )?;

        let dataset = if other_referrers == 0 {
            match update_dataset_tx(conn, config, existing.dataset_id, spec, user)? {
                UpdateOutcome::Updated(dataset) => dataset,
                UpdateOutcome::Collided(_) => insert_or_reuse_tx(conn, config, spec, user)?,
            }
        } else {
            insert_or_reuse_tx(conn, config, spec, user)?
        };

        if dataset.dataset_id == existing.dataset_id {
            return Ok(existing);
        }
        conn.execute(
            "UPDATE tResourceScenario SET dataset_id = ?1, source = ?2
             WHERE scenario_id = ?3 AND resource_attr_id = ?4",
            params![
                dataset.dataset_id.get(),
                source,
                scenario.scenario_id.get(),
                resource_attr_id.get()
            ],
        )?;
        Ok(ResourceScenario {
            scenario_id: scenario.scenario_id,
            resource_attr_id,
            dataset_id: dataset.dataset_id,
            source: source.map(str::to_string),
        })
    } else {
        let dataset = insert_or_reuse_tx(conn, config, spec, user)?;
        conn.execute(
            "INSERT INTO tResourceScenario (dataset_id, scenario_id, resource_attr_id, source)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                dataset.dataset_id.get(),
                scenario.scenario_id.get(),
                resource_attr_id.get(),
                source
            ],
        )?;
        Ok(ResourceScenario {
            scenario_id: scenario.scenario_id,
            resource_attr_id,
            dataset_id: dataset.dataset_id,
            source: source.map(str::to_string),
        })
    }
}

/// Deletes one binding, failing with `NotFound` when absent.
fn delete_binding_tx(
    conn: &Connection,
    scenario_id: ScenarioId,
    resource_attr_id: ResourceAttrId,
) -> Result<(), StoreError> {
    let deleted = conn.execute(
        "DELETE FROM tResourceScenario WHERE scenario_id = ?1 AND resource_attr_id = ?2",
        params![scenario_id.get(), resource_attr_id.get()],
    )?;
    if deleted == 0 {
        return Err(StoreError::NotFound(format!(
            "resource attribute {resource_attr_id} has no binding in scenario {scenario_id}"
        )));
    }
    Ok(())
}

/// Applies a list of binding specs to one scenario: values upsert, `None`
/// values delete. Returns the surviving bindings in input order.
fn apply_resource_scenarios(
    conn: &Connection,
    config: DatasetStoreConfig,
    scenario: &Scenario,
    specs: &[ResourceScenarioSpec],
    user: UserId,
    source: Option<&str>,
) -> Result<Vec<ResourceScenario>, StoreError> {
    let mut updated = Vec::new();
    for spec in specs {
        match &spec.value {
            Some(value) => {
                updated.push(upsert_resource_scenario_tx(
                    conn,
                    config,
                    scenario,
                    spec.resource_attr_id,
                    value,
                    user,
                    source,
                )?);
            }
            None => delete_binding_tx(conn, scenario.scenario_id, spec.resource_attr_id)?,
        }
    }
    Ok(updated)
}

// ============================================================================
// SECTION: Group Items
// ============================================================================

/// Inserts one group membership, translating the uniqueness rule into
/// `Conflict`.
fn insert_group_item_tx(
    conn: &Connection,
    scenario_id: ScenarioId,
    item: &GroupItemSpec,
) -> Result<GroupItem, StoreError> {
    let (node_id, link_id, subgroup_id) = item.member.fk_slots();
    let inserted = conn.execute(
        "INSERT INTO tResourceGroupItem
             (ref_key, node_id, link_id, subgroup_id, group_id, scenario_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            item.member.ref_key(),
            node_id,
            link_id,
            subgroup_id,
            item.group_id.get(),
            scenario_id.get()
        ],
    );
    match inserted {
        Ok(_) => Ok(GroupItem {
            item_id: GroupItemId::new(conn.last_insert_rowid()),
            scenario_id,
            group_id: item.group_id,
            member: item.member,
        }),
        Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict(format!(
            "{} is already a member of group {} in scenario {scenario_id}",
            item.member, item.group_id
        ))),
        Err(err) => Err(err.into()),
    }
}

// ============================================================================
// SECTION: Scenario Operations
// ============================================================================

impl BasinStore {
    /// Loads a scenario with its bindings and group membership.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing scenario and `Permission` when the
    /// caller cannot view the parent network.
    pub fn get_scenario(
        &mut self,
        scenario_id: ScenarioId,
        caller: &Caller,
    ) -> Result<ScenarioData, StoreError> {
        self.txn(|tx, _| {
            let scenario = load_scenario(tx, scenario_id)?;
            check_network_access(tx, scenario.network_id, caller.user_id, AccessLevel::View)?;
            load_scenario_data(tx, scenario_id)
        })
    }

    /// Creates a scenario in a network, bulk-inserting embedded datasets
    /// and materializing embedded group items in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `Permission` without edit access on the network, `Conflict`
    /// for a duplicate scenario name, and `InvalidInput` when an embedded
    /// binding carries no value.
    pub fn add_scenario(
        &mut self,
        network_id: NetworkId,
        spec: &ScenarioSpec,
        caller: &Caller,
    ) -> Result<ScenarioData, StoreError> {
        self.txn(|tx, config| {
            check_network_access(tx, network_id, caller.user_id, AccessLevel::Edit)?;
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT scenario_id FROM tScenario
                     WHERE network_id = ?1 AND scenario_name = ?2",
                    params![network_id.get(), spec.name],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Err(StoreError::Conflict(format!(
                    "scenario with name {} already exists in network {network_id}",
                    spec.name
                )));
            }

            tx.execute(
                "INSERT INTO tScenario
                     (scenario_name, scenario_description, network_id, start_time, end_time,
                      time_step, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    spec.name,
                    spec.description,
                    network_id.get(),
                    spec.start_time,
                    spec.end_time,
                    spec.time_step,
                    caller.user_id.get()
                ],
            )?;
            let scenario = load_scenario(tx, ScenarioId::new(tx.last_insert_rowid()))?;
            info!(scenario_id = scenario.scenario_id.get(), name = %scenario.name, "added scenario");

            let source = caller.app_name.as_deref();
            let mut dataset_specs = Vec::with_capacity(spec.resourcescenarios.len());
            for binding in &spec.resourcescenarios {
                let value = binding.value.as_ref().ok_or_else(|| {
                    StoreError::InvalidInput(format!(
                        "binding for resource attribute {} has no value",
                        binding.resource_attr_id
                    ))
                })?;
                dataset_specs.push(value.clone());
            }
            let datasets = bulk_insert_tx(tx, config, &dataset_specs, caller.user_id)?;
            for (binding, dataset) in spec.resourcescenarios.iter().zip(&datasets) {
                let attr = load_resource_attr(tx, binding.resource_attr_id)?;
                ensure_attr_in_network(tx, &scenario, attr.resource)?;
                let inserted = tx.execute(
                    "INSERT INTO tResourceScenario
                         (dataset_id, scenario_id, resource_attr_id, source)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        dataset.dataset_id.get(),
                        scenario.scenario_id.get(),
                        binding.resource_attr_id.get(),
                        source
                    ],
                );
                match inserted {
                    Ok(_) => {}
                    Err(err) if is_unique_violation(&err) => {
                        return Err(StoreError::Conflict(format!(
                            "resource attribute {} is bound twice in the new scenario",
                            binding.resource_attr_id
                        )));
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            for item in &spec.resourcegroupitems {
                insert_group_item_tx(tx, scenario.scenario_id, item)?;
            }
            load_scenario_data(tx, scenario.scenario_id)
        })
    }

    /// Updates a scenario's fields and optionally its data and groups. Data
    /// updates upsert every incoming binding; group updates add items and
    /// leave unmentioned items intact.
    ///
    /// # Errors
    ///
    /// Returns `Locked` for a locked scenario, `Permission` without edit
    /// access, and `Conflict` when renaming onto an existing name.
    pub fn update_scenario(
        &mut self,
        update: &ScenarioUpdate,
        update_data: bool,
        update_groups: bool,
        caller: &Caller,
    ) -> Result<ScenarioData, StoreError> {
        self.txn(|tx, config| {
            let scenario = load_for_mutation(tx, update.scenario_id, caller.user_id)?;
            let name_taken: Option<i64> = tx
                .query_row(
                    "SELECT scenario_id FROM tScenario
                     WHERE network_id = ?1 AND scenario_name = ?2 AND scenario_id <> ?3",
                    params![scenario.network_id.get(), update.name, scenario.scenario_id.get()],
                    |row| row.get(0),
                )
                .optional()?;
            if name_taken.is_some() {
                return Err(StoreError::Conflict(format!(
                    "scenario with name {} already exists in network {}",
                    update.name, scenario.network_id
                )));
            }
            tx.execute(
                "UPDATE tScenario
                 SET scenario_name = ?1, scenario_description = ?2, start_time = ?3,
                     end_time = ?4, time_step = ?5
                 WHERE scenario_id = ?6",
                params![
                    update.name,
                    update.description,
                    update.start_time,
                    update.end_time,
                    update.time_step,
                    scenario.scenario_id.get()
                ],
            )?;

            if update_data {
                let source = caller.app_name.as_deref();
                for binding in &update.resourcescenarios {
                    let value = binding.value.as_ref().ok_or_else(|| {
                        StoreError::InvalidInput(format!(
                            "binding for resource attribute {} has no value",
                            binding.resource_attr_id
                        ))
                    })?;
                    upsert_resource_scenario_tx(
                        tx,
                        config,
                        &scenario,
                        binding.resource_attr_id,
                        value,
                        caller.user_id,
                        source,
                    )?;
                }
            }
            if update_groups {
                for item in &update.resourcegroupitems {
                    insert_group_item_tx(tx, scenario.scenario_id, item)?;
                }
            }
            load_scenario_data(tx, scenario.scenario_id)
        })
    }

    /// Sets a scenario's soft-delete status.
    ///
    /// # Errors
    ///
    /// Returns `Locked` for a locked scenario and `Permission` without edit
    /// access.
    pub fn set_scenario_status(
        &mut self,
        scenario_id: ScenarioId,
        active: bool,
        caller: &Caller,
    ) -> Result<(), StoreError> {
        self.txn(|tx, _| {
            let scenario = load_for_mutation(tx, scenario_id, caller.user_id)?;
            tx.execute(
                "UPDATE tScenario SET status = ?1 WHERE scenario_id = ?2",
                params![flag_status(active), scenario.scenario_id.get()],
            )?;
            Ok(())
        })
    }

    /// Reactivates a soft-deleted scenario.
    ///
    /// # Errors
    ///
    /// Returns `Locked` for a locked scenario and `Permission` without edit
    /// access.
    pub fn activate_scenario(
        &mut self,
        scenario_id: ScenarioId,
        caller: &Caller,
    ) -> Result<(), StoreError> {
        self.set_scenario_status(scenario_id, true, caller)
    }

    /// Soft-deletes a scenario.
    ///
    /// # Errors
    ///
    /// Returns `Locked` for a locked scenario and `Permission` without edit
    /// access.
    pub fn delete_scenario(
        &mut self,
        scenario_id: ScenarioId,
        caller: &Caller,
    ) -> Result<(), StoreError> {
        self.set_scenario_status(scenario_id, false, caller)
    }

    /// Hard-deletes a scenario, cascading to its bindings and group items.
    /// Datasets are left in the content store.
    ///
    /// # Errors
    ///
    /// Returns `Locked` for a locked scenario and `Permission` without edit
    /// access.
    pub fn purge_scenario(
        &mut self,
        scenario_id: ScenarioId,
        caller: &Caller,
    ) -> Result<(), StoreError> {
        self.txn(|tx, _| {
            let scenario = load_for_mutation(tx, scenario_id, caller.user_id)?;
            tx.execute(
                "DELETE FROM tScenario WHERE scenario_id = ?1",
                params![scenario.scenario_id.get()],
            )?;
            info!(scenario_id = scenario.scenario_id.get(), "purged scenario");
            Ok(())
        })
    }

    /// Clones a scenario within its network. Bindings are copied by dataset
    /// reference, group items are copied, and the clone is unlocked
    /// regardless of the source's lock state. The clone's `source` fields
    /// take the caller's application name, falling back to each binding's
    /// own value.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing scenario and `Permission` when the
    /// caller cannot view the source or edit its network.
    pub fn clone_scenario(
        &mut self,
        scenario_id: ScenarioId,
        caller: &Caller,
    ) -> Result<ScenarioData, StoreError> {
        self.txn(|tx, _| {
            let source = load_scenario(tx, scenario_id)?;
            check_network_access(tx, source.network_id, caller.user_id, AccessLevel::View)?;
            check_network_access(tx, source.network_id, caller.user_id, AccessLevel::Edit)?;

            let mut stmt = tx.prepare(
                "SELECT scenario_name FROM tScenario WHERE network_id = ?1",
            )?;
            let names = stmt
                .query_map(params![source.network_id.get()], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            let cloned_name = clone_name(&source.name, names.iter().map(String::as_str));
            info!(source = %source.name, clone = %cloned_name, "cloning scenario");

            tx.execute(
                "INSERT INTO tScenario
                     (scenario_name, scenario_description, network_id, start_time, end_time,
                      time_step, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    cloned_name,
                    source.description,
                    source.network_id.get(),
                    source.start_time,
                    source.end_time,
                    source.time_step,
                    caller.user_id.get()
                ],
            )?;
            let clone_id = tx.last_insert_rowid();

            tx.execute(
                "INSERT INTO tResourceScenario (dataset_id, scenario_id, resource_attr_id, source)
                 SELECT dataset_id, ?1, resource_attr_id, COALESCE(?2, source)
                 FROM tResourceScenario WHERE scenario_id = ?3",
                params![clone_id, caller.app_name, scenario_id.get()],
            )?;
            tx.execute(
                "INSERT INTO tResourceGroupItem
                     (ref_key, node_id, link_id, subgroup_id, group_id, scenario_id)
                 SELECT ref_key, node_id, link_id, subgroup_id, group_id, ?1
                 FROM tResourceGroupItem WHERE scenario_id = ?2",
                params![clone_id, scenario_id.get()],
            )?;
            load_scenario_data(tx, ScenarioId::new(clone_id))
        })
    }

    /// Locks a scenario against mutation.
    ///
    /// # Errors
    ///
    /// Returns `Permission` without edit access on the parent network.
    pub fn lock_scenario(
        &mut self,
        scenario_id: ScenarioId,
        caller: &Caller,
    ) -> Result<(), StoreError> {
        self.set_locked(scenario_id, true, caller)
    }

    /// Unlocks a scenario. This is the only mutation a locked scenario
    /// admits.
    ///
    /// # Errors
    ///
    /// Returns `Permission` without edit access on the parent network.
    pub fn unlock_scenario(
        &mut self,
        scenario_id: ScenarioId,
        caller: &Caller,
    ) -> Result<(), StoreError> {
        self.set_locked(scenario_id, false, caller)
    }

    /// Applies one lock transition under network edit access.
    fn set_locked(
        &mut self,
        scenario_id: ScenarioId,
        locked: bool,
        caller: &Caller,
    ) -> Result<(), StoreError> {
        self.txn(|tx, _| {
            let scenario = load_scenario(tx, scenario_id)?;
            check_network_access(tx, scenario.network_id, caller.user_id, AccessLevel::Edit)?;
            tx.execute(
                "UPDATE tScenario SET locked = ?1 WHERE scenario_id = ?2",
                params![flag(locked), scenario.scenario_id.get()],
            )?;
            info!(scenario_id = scenario.scenario_id.get(), locked, "lock transition");
            Ok(())
        })
    }

    /// Upserts attribute bindings in one scenario. A `None` value deletes
    /// the binding. Bindings not mentioned are left intact.
    ///
    /// # Errors
    ///
    /// Returns `Locked` for a locked scenario, `Permission` without edit
    /// access, and `NotFound` when deleting an absent binding.
    pub fn update_resourcedata(
        &mut self,
        scenario_id: ScenarioId,
        specs: &[ResourceScenarioSpec],
        caller: &Caller,
    ) -> Result<Vec<ResourceScenario>, StoreError> {
        self.txn(|tx, config| {
            let scenario = load_for_mutation(tx, scenario_id, caller.user_id)?;
            apply_resource_scenarios(
                tx,
                config,
                &scenario,
                specs,
                caller.user_id,
                caller.app_name.as_deref(),
            )
        })
    }

    /// Applies the same binding specs to several scenarios, which must all
    /// belong to one network. Each scenario is updated independently.
    ///
    /// # Errors
    ///
    /// Returns `CrossNetwork` when the scenarios span networks; nothing is
    /// committed in that case.
    pub fn bulk_update_resourcedata(
        &mut self,
        scenario_ids: &[ScenarioId],
        specs: &[ResourceScenarioSpec],
        caller: &Caller,
    ) -> Result<BTreeMap<ScenarioId, Vec<ResourceScenario>>, StoreError> {
        self.txn(|tx, config| {
            let mut scenarios = Vec::with_capacity(scenario_ids.len());
            for scenario_id in scenario_ids {
                scenarios.push(load_scenario(tx, *scenario_id)?);
            }
            let networks: BTreeSet<NetworkId> =
                scenarios.iter().map(|scenario| scenario.network_id).collect();
            if networks.len() != 1 {
                return Err(StoreError::CrossNetwork(
                    "scenario ids are not in the same network".to_string(),
                ));
            }

            let mut results = BTreeMap::new();
            for scenario in &scenarios {
                check_network_access(tx, scenario.network_id, caller.user_id, AccessLevel::Edit)?;
                ensure_unlocked(scenario)?;
                let updated = apply_resource_scenarios(
                    tx,
                    config,
                    scenario,
                    specs,
                    caller.user_id,
                    caller.app_name.as_deref(),
                )?;
                results.insert(scenario.scenario_id, updated);
            }
            Ok(results)
        })
    }

    /// Deletes one attribute binding from a scenario.
    ///
    /// # Errors
    ///
    /// Returns `Locked` for a locked scenario, `Permission` without edit
    /// access, and `NotFound` for an absent binding.
    pub fn delete_resourcedata(
        &mut self,
        scenario_id: ScenarioId,
        resource_attr_id: ResourceAttrId,
        caller: &Caller,
    ) -> Result<(), StoreError> {
        self.txn(|tx, _| {
            let scenario = load_for_mutation(tx, scenario_id, caller.user_id)?;
            delete_binding_tx(tx, scenario.scenario_id, resource_attr_id)
        })
    }

    /// Adds data to one attribute outside a wider scenario update.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the dataset carries no value, `Locked`
    /// for a locked scenario, and `Permission` without edit access.
    pub fn add_data_to_attribute(
        &mut self,
        scenario_id: ScenarioId,
        resource_attr_id: ResourceAttrId,
        dataset: &DatasetSpec,
        caller: &Caller,
    ) -> Result<ResourceScenario, StoreError> {
        self.txn(|tx, config| {
            let scenario = load_for_mutation(tx, scenario_id, caller.user_id)?;
            if dataset.value.is_none() {
                return Err(StoreError::InvalidInput(format!(
                    "no value was sent with dataset {}",
                    dataset.name
                )));
            }
            upsert_resource_scenario_tx(
                tx,
                config,
                &scenario,
                resource_attr_id,
                dataset,
                caller.user_id,
                caller.app_name.as_deref(),
            )
        })
    }

    /// Rebinds one attribute binding to an existing dataset by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the binding or dataset is missing, `Locked`
    /// for a locked scenario, and `Permission` without edit access.
    pub fn set_resourcescenario_dataset(
        &mut self,
        resource_attr_id: ResourceAttrId,
        scenario_id: ScenarioId,
        dataset_id: DatasetId,
        caller: &Caller,
    ) -> Result<ResourceScenario, StoreError> {
        self.txn(|tx, _| {
            let scenario = load_for_mutation(tx, scenario_id, caller.user_id)?;
            let binding = find_binding(tx, scenario.scenario_id, resource_attr_id)?.ok_or_else(
                || {
                    StoreError::NotFound(format!(
                        "resource attribute {resource_attr_id} has no binding in scenario {scenario_id}"
                    ))
                },
            )?;
            let dataset_exists: Option<i64> = tx
                .query_row(
                    "SELECT dataset_id FROM tDataset WHERE dataset_id = ?1",
                    params![dataset_id.get()],
                    |row| row.get(0),
                )
                .optional()?;
            if dataset_exists.is_none() {
                return Err(StoreError::NotFound(format!(
                    "dataset {dataset_id} does not exist"
                )));
            }
            tx.execute(
                "UPDATE tResourceScenario SET dataset_id = ?1
                 WHERE scenario_id = ?2 AND resource_attr_id = ?3",
                params![dataset_id.get(), scenario.scenario_id.get(), resource_attr_id.get()],
            )?;
            Ok(ResourceScenario {
                dataset_id,
                ..binding
            })
        })
    }

    /// Copies dataset references for the listed attributes from one
    /// scenario to another: existing target bindings are rebound, missing
    /// ones are created. Attributes unbound in the source are skipped.
    ///
    /// # Errors
    ///
    /// Returns `Permission` when the caller cannot view the source network
    /// or edit the target's, and `Locked` for a locked target.
    pub fn copy_data_from_scenario(
        &mut self,
        resource_attr_ids: &[ResourceAttrId],
        source_scenario_id: ScenarioId,
        target_scenario_id: ScenarioId,
        caller: &Caller,
    ) -> Result<Vec<ResourceScenario>, StoreError> {
        self.txn(|tx, _| {
            let source = load_scenario(tx, source_scenario_id)?;
            check_network_access(tx, source.network_id, caller.user_id, AccessLevel::View)?;
            let target = load_for_mutation(tx, target_scenario_id, caller.user_id)?;

            let mut copied = Vec::new();
            for resource_attr_id in resource_attr_ids {
                let Some(source_binding) =
                    find_binding(tx, source.scenario_id, *resource_attr_id)?
                else {
                    continue;
                };
                if let Some(target_binding) =
                    find_binding(tx, target.scenario_id, *resource_attr_id)?
                {
                    tx.execute(
                        "UPDATE tResourceScenario SET dataset_id = ?1
                         WHERE scenario_id = ?2 AND resource_attr_id = ?3",
                        params![
                            source_binding.dataset_id.get(),
                            target.scenario_id.get(),
                            resource_attr_id.get()
                        ],
                    )?;
                    copied.push(ResourceScenario {
                        dataset_id: source_binding.dataset_id,
                        ..target_binding
                    });
                } else {
                    tx.execute(
                        "INSERT INTO tResourceScenario
                             (dataset_id, scenario_id, resource_attr_id, source)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            source_binding.dataset_id.get(),
                            target.scenario_id.get(),
                            resource_attr_id.get(),
                            caller.app_name
                        ],
                    )?;
                    copied.push(ResourceScenario {
                        scenario_id: target.scenario_id,
                        resource_attr_id: *resource_attr_id,
                        dataset_id: source_binding.dataset_id,
                        source: caller.app_name.clone(),
                    });
                }
            }
            Ok(copied)
        })
    }

    /// Adds group memberships to a scenario.
    ///
    /// # Errors
    ///
    /// Returns `Locked` for a locked scenario, `Permission` without edit
    /// access, and `Conflict` for a duplicate membership.
    pub fn add_resourcegroupitems(
        &mut self,
        scenario_id: ScenarioId,
        items: &[GroupItemSpec],
        caller: &Caller,
    ) -> Result<Vec<GroupItem>, StoreError> {
        self.txn(|tx, _| {
            let scenario = load_for_mutation(tx, scenario_id, caller.user_id)?;
            let mut added = Vec::with_capacity(items.len());
            for item in items {
                added.push(insert_group_item_tx(tx, scenario.scenario_id, item)?);
            }
            Ok(added)
        })
    }

    /// Deletes the listed group memberships from a scenario.
    ///
    /// # Errors
    ///
    /// Returns `Locked` for a locked scenario, `Permission` without edit
    /// access, and `NotFound` when an item does not exist in the scenario.
    pub fn delete_resourcegroupitems(
        &mut self,
        scenario_id: ScenarioId,
        item_ids: &[GroupItemId],
        caller: &Caller,
    ) -> Result<(), StoreError> {
        self.txn(|tx, _| {
            let scenario = load_for_mutation(tx, scenario_id, caller.user_id)?;
            for item_id in item_ids {
                let deleted = tx.execute(
                    "DELETE FROM tResourceGroupItem WHERE item_id = ?1 AND scenario_id = ?2",
                    params![item_id.get(), scenario.scenario_id.get()],
                )?;
                if deleted == 0 {
                    return Err(StoreError::NotFound(format!(
                        "group item {item_id} does not exist in scenario {scenario_id}"
                    )));
                }
            }
            Ok(())
        })
    }

    /// Deletes every membership of one group in one scenario.
    ///
    /// # Errors
    ///
    /// Returns `Locked` for a locked scenario and `Permission` without edit
    /// access.
    pub fn empty_group(
        &mut self,
        group_id: GroupId,
        scenario_id: ScenarioId,
        caller: &Caller,
    ) -> Result<(), StoreError> {
        self.txn(|tx, _| {
            let scenario = load_for_mutation(tx, scenario_id, caller.user_id)?;
            tx.execute(
                "DELETE FROM tResourceGroupItem WHERE group_id = ?1 AND scenario_id = ?2",
                params![group_id.get(), scenario.scenario_id.get()],
            )?;
            Ok(())
        })
    }

    /// Lists the members of one group in one scenario.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing scenario and `Permission` without
    /// view access on the network.
    pub fn get_resourcegroupitems(
        &mut self,
        group_id: GroupId,
        scenario_id: ScenarioId,
        caller: &Caller,
    ) -> Result<Vec<GroupItem>, StoreError> {
        self.txn(|tx, _| {
            let scenario = load_scenario(tx, scenario_id)?;
            check_network_access(tx, scenario.network_id, caller.user_id, AccessLevel::View)?;
            let items = load_group_items(tx, scenario.scenario_id)?;
            Ok(items
                .into_iter()
                .filter(|item| item.group_id == group_id)
                .collect())
        })
    }

    /// Lists the active scenarios referencing a dataset.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing dataset.
    pub fn get_dataset_scenarios(
        &mut self,
        dataset_id: DatasetId,
        caller: &Caller,
    ) -> Result<Vec<Scenario>, StoreError> {
        let _ = caller;
        self.txn(|tx, _| {
            let exists: Option<i64> = tx
                .query_row(
                    "SELECT dataset_id FROM tDataset WHERE dataset_id = ?1",
                    params![dataset_id.get()],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                return Err(StoreError::NotFound(format!(
                    "dataset {dataset_id} does not exist"
                )));
            }
            let sql = format!(
                "SELECT DISTINCT {SCENARIO_COLUMNS} FROM tScenario s
                 JOIN tResourceScenario rs ON rs.scenario_id = s.scenario_id
                 WHERE s.status = 'A' AND rs.dataset_id = ?1
                 ORDER BY s.scenario_id"
            );
            let mut stmt = tx.prepare(&sql)?;
            let rows = stmt.query_map(params![dataset_id.get()], read_scenario_row)?;
            let mut scenarios = Vec::new();
            for row in rows {
                scenarios.push(row?);
            }
            Ok(scenarios)
        })
    }
}

/// Renders the soft-delete status flag.
const fn flag_status(active: bool) -> &'static str {
    if active { "A" } else { "X" }
}

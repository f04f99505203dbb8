// crates/basin-store-sqlite/src/mapping.rs
// ============================================================================
// Module: Basin Mapping Applier
// Description: Value propagation across attribute-to-attribute mappings.
// Purpose: Mirror the source binding onto the target, including absence.
// Dependencies: basin-core, rusqlite
// ============================================================================

//! ## Overview
//! A resource-attribute mapping declares two attributes equivalent across
//! scenarios, order-insensitively. Propagation rebinds the target to the
//! source's dataset, creates the target binding when missing, and deletes
//! it when the source binding is absent: the mapping propagates absence as
//! faithfully as presence. The operation is idempotent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use basin_core::ResourceAttrId;
use basin_core::ResourceScenario;
use basin_core::ScenarioId;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use tracing::debug;

use crate::scenarios::find_binding;
use crate::scenarios::load_for_mutation;
use crate::scenarios::load_scenario;
use crate::store::BasinStore;
use crate::store::Caller;
use crate::store::StoreError;

// ============================================================================
// SECTION: Result Type
// ============================================================================

/// Result of a mapping propagation: the target binding, or `None` when the
/// propagation removed it (or there was nothing to propagate).
pub type MappingResult = Option<ResourceScenario>;

// ============================================================================
// SECTION: Mapping Lookup
// ============================================================================

/// Verifies a mapping exists between two resource attributes, in either
/// direction.
fn mapping_exists(
    conn: &Connection,
    resource_attr_a: ResourceAttrId,
    resource_attr_b: ResourceAttrId,
) -> Result<bool, StoreError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM tResourceAttrMap
             WHERE (resource_attr_id_a = ?1 AND resource_attr_id_b = ?2)
                OR (resource_attr_id_a = ?2 AND resource_attr_id_b = ?1)",
            params![resource_attr_a.get(), resource_attr_b.get()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

// ============================================================================
// SECTION: Propagation
// ============================================================================

impl BasinStore {
    /// Propagates a value across a mapping: with both bindings present the
    /// target is rebound to the source's dataset; with only the source
    /// present the target binding is created; with only the target present
    /// it is deleted. With neither present, nothing happens.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no mapping links the two attributes or a
    /// scenario is missing, `Locked` for a locked target scenario, and
    /// `Permission` without edit access on the target network.
    pub fn update_value_from_mapping(
        &mut self,
        source_resource_attr_id: ResourceAttrId,
        target_resource_attr_id: ResourceAttrId,
        source_scenario_id: ScenarioId,
        target_scenario_id: ScenarioId,
        caller: &Caller,
    ) -> Result<MappingResult, StoreError> {
        self.txn(|tx, _| {
            if !mapping_exists(tx, source_resource_attr_id, target_resource_attr_id)? {
                return Err(StoreError::NotFound(format!(
                    "mapping between {source_resource_attr_id} and {target_resource_attr_id} not found"
                )));
            }
            let source = load_scenario(tx, source_scenario_id)?;
            let target = load_for_mutation(tx, target_scenario_id, caller.user_id)?;

            let source_binding = find_binding(tx, source.scenario_id, source_resource_attr_id)?;
            let target_binding = find_binding(tx, target.scenario_id, target_resource_attr_id)?;

            match (source_binding, target_binding) {
                (Some(source_binding), Some(target_binding)) => {
                    debug!("target binding exists, rebinding to the source dataset");
                    tx.execute(
                        "UPDATE tResourceScenario SET dataset_id = ?1
                         WHERE scenario_id = ?2 AND resource_attr_id = ?3",
                        params![
                            source_binding.dataset_id.get(),
                            target.scenario_id.get(),
                            target_resource_attr_id.get()
                        ],
                    )?;
                    Ok(Some(ResourceScenario {
                        dataset_id: source_binding.dataset_id,
                        ..target_binding
                    }))
                }
                (Some(source_binding), None) => {
                    debug!("target has no binding, creating one from the source dataset");
                    tx.execute(
                        "INSERT INTO tResourceScenario
                             (dataset_id, scenario_id, resource_attr_id, source)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            source_binding.dataset_id.get(),
                            target.scenario_id.get(),
                            target_resource_attr_id.get(),
                            caller.app_name
                        ],
                    )?;
                    Ok(Some(ResourceScenario {
                        scenario_id: target.scenario_id,
                        resource_attr_id: target_resource_attr_id,
                        dataset_id: source_binding.dataset_id,
                        source: caller.app_name.clone(),
                    }))
                }
                (None, target_binding) => {
                    debug!("source has no binding, deleting the target binding");
                    if target_binding.is_some() {
                        tx.execute(
                            "DELETE FROM tResourceScenario
                             WHERE scenario_id = ?1 AND resource_attr_id = ?2",
                            params![target.scenario_id.get(), target_resource_attr_id.get()],
                        )?;
                    }
                    Ok(None)
                }
            }
        })
    }
}

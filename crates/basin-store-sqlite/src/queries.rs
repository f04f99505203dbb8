// crates/basin-store-sqlite/src/queries.rs
// ============================================================================
// Module: Basin Query Surface
// Description: Read-side queries over resources, attributes, and scenarios.
// Purpose: Compose filter clauses and return detached, masked dataset rows.
// Dependencies: basin-core, rusqlite
// ============================================================================

//! ## Overview
//! Every read here follows the same discipline: join bindings with their
//! resource attribute and dataset, inflate deflate-framed payloads, load
//! metadata eagerly, and mask hidden datasets the caller cannot view.
//! Masking is silent; these queries never fail on hidden data. Filters
//! (resource, scenario list, attribute list, template type) compose into a
//! single WHERE clause built from present inputs only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use basin_core::AccessLevel;
use basin_core::AttrId;
use basin_core::Dataset;
use basin_core::DatasetId;
use basin_core::GroupId;
use basin_core::LinkId;
use basin_core::NetworkId;
use basin_core::NodeId;
use basin_core::ResourceAttrId;
use basin_core::ResourceRef;
use basin_core::ResourceScenario;
use basin_core::Scenario;
use basin_core::ScenarioId;
use basin_core::TemplateTypeId;
use basin_core::UserId;
use rusqlite::Connection;
use rusqlite::Row;
use rusqlite::params_from_iter;
use serde::Deserialize;
use serde::Serialize;

use crate::datasets::DATASET_COLUMNS;
use crate::datasets::DatasetRow;
use crate::datasets::hydrate_dataset;
use crate::datasets::read_dataset_row;
use crate::permissions::check_network_access;
use crate::resources::ResourceAttr;
use crate::scenarios::SCENARIO_COLUMNS;
use crate::scenarios::load_scenario;
use crate::scenarios::read_scenario_row;
use crate::store::BasinStore;
use crate::store::Caller;
use crate::store::StoreError;
use crate::store::is_set;

// ============================================================================
// SECTION: Query DTOs
// ============================================================================

/// One binding joined with its resource attribute and masked dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceScenarioData {
    /// The binding row.
    pub resource_scenario: ResourceScenario,
    /// The bound resource attribute.
    pub resource_attr: ResourceAttr,
    /// The dataset, inflated and masked for the caller.
    pub dataset: Dataset,
}

/// One scenario with the bindings a filtered query selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenariosData {
    /// The scenario row.
    pub scenario: Scenario,
    /// The selected bindings.
    pub resource_scenarios: Vec<ResourceScenarioData>,
}

/// One resource attribute with its bindings across the selected scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAttrData {
    /// The resource attribute.
    pub resource_attr: ResourceAttr,
    /// Its bindings.
    pub resource_scenarios: Vec<ResourceScenarioData>,
}

/// Resource attributes and bindings for a node/attribute cross query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeData {
    /// The matching resource attributes.
    pub resource_attrs: Vec<ResourceAttr>,
    /// Every binding of those attributes, across scenarios.
    pub resource_scenarios: Vec<ResourceScenarioData>,
}

// ============================================================================
// SECTION: Filter Builder
// ============================================================================

/// A WHERE clause under construction; all parameters are ids.
#[derive(Default)]
struct RsFilter {
    /// Clause fragments joined with AND.
    clauses: Vec<String>,
    /// Positional id parameters, in clause order.
    params: Vec<i64>,
}

impl RsFilter {
    /// Adds an `IN` clause over an id list; an empty list adds no clause.
    fn id_list(&mut self, column: &str, ids: impl IntoIterator<Item = i64>) {
        let ids: Vec<i64> = ids.into_iter().collect();
        if ids.is_empty() {
            return;
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        self.clauses.push(format!("{column} IN ({placeholders})"));
        self.params.extend(ids);
    }

    /// Pins the query to one resource: its `ref_key` and foreign-key slot.
    fn resource(&mut self, resource: ResourceRef) {
        self.clauses
            .push(format!("ra.ref_key = '{}'", resource.ref_key()));
        self.clauses.push(format!("{} = ?", ra_column(resource)));
        self.params.push(resource.raw_id());
    }

    /// Restricts to attributes bound to any of the listed networks, nodes,
    /// or links. Absent lists contribute nothing; with all three absent no
    /// clause is added.
    fn any_resource(&mut self, networks: &[NetworkId], nodes: &[NodeId], links: &[LinkId]) {
        let mut alternatives = Vec::new();
        for (column, ids) in [
            ("ra.network_id", networks.iter().map(|id| id.get()).collect::<Vec<_>>()),
            ("ra.node_id", nodes.iter().map(|id| id.get()).collect()),
            ("ra.link_id", links.iter().map(|id| id.get()).collect()),
        ] {
            if ids.is_empty() {
                continue;
            }
            let placeholders = vec!["?"; ids.len()].join(", ");
            alternatives.push(format!("{column} IN ({placeholders})"));
            self.params.extend(ids);
        }
        if !alternatives.is_empty() {
            self.clauses.push(format!("({})", alternatives.join(" OR ")));
        }
    }

    /// Restricts to attributes belonging to any of the listed template
    /// types.
    fn type_ids(&mut self, type_ids: &[TemplateTypeId]) {
        if type_ids.is_empty() {
            return;
        }
        let placeholders = vec!["?"; type_ids.len()].join(", ");
        self.clauses.push(format!(
            "ra.attr_id IN (SELECT attr_id FROM tTypeAttr WHERE type_id IN ({placeholders}))"
        ));
        self.params.extend(type_ids.iter().map(|id| id.get()));
    }

    /// Renders the WHERE clause body.
    fn sql(&self) -> String {
        if self.clauses.is_empty() {
            "1 = 1".to_string()
        } else {
            self.clauses.join(" AND ")
        }
    }
}

/// Returns the `tResourceAttr` column a reference kind routes to.
const fn ra_column(resource: ResourceRef) -> &'static str {
    match resource {
        ResourceRef::Project(_) => "ra.project_id",
        ResourceRef::Network(_) => "ra.network_id",
        ResourceRef::Node(_) => "ra.node_id",
        ResourceRef::Link(_) => "ra.link_id",
        ResourceRef::Group(_) => "ra.group_id",
    }
}

// ============================================================================
// SECTION: Joined Row Loading
// ============================================================================

/// One raw row of the binding/attribute/dataset join.
struct RawRsRow {
    /// Binding columns.
    scenario_id: i64,
    /// Bound resource attribute id.
    resource_attr_id: i64,
    /// Bound dataset id.
    dataset_id: i64,
    /// Recorded writing application.
    source: Option<String>,
    /// Attribute id.
    attr_id: i64,
    /// Reference discriminator.
    ref_key: String,
    /// Project slot.
    project_id: Option<i64>,
    /// Network slot.
    network_id: Option<i64>,
    /// Node slot.
    node_id: Option<i64>,
    /// Link slot.
    link_id: Option<i64>,
    /// Group slot.
    group_id: Option<i64>,
    /// Computed-attribute flag.
    is_var: String,
    /// The dataset columns.
    dataset: DatasetRow,
}

/// Reads one joined row; dataset columns start at offset 12.
fn read_raw_rs_row(row: &Row<'_>) -> rusqlite::Result<RawRsRow> {
    Ok(RawRsRow {
        scenario_id: row.get(0)?,
        resource_attr_id: row.get(1)?,
        dataset_id: row.get(2)?,
        source: row.get(3)?,
        attr_id: row.get(4)?,
        ref_key: row.get(5)?,
        project_id: row.get(6)?,
        network_id: row.get(7)?,
        node_id: row.get(8)?,
        link_id: row.get(9)?,
        group_id: row.get(10)?,
        is_var: row.get(11)?,
        dataset: read_dataset_row(row, 12)?,
    })
}

/// Converts a raw joined row into its caller-facing shape.
fn raw_to_data(
    conn: &Connection,
    raw: RawRsRow,
    user: UserId,
) -> Result<ResourceScenarioData, StoreError> {
    let resource = ResourceRef::from_columns(
        &raw.ref_key,
        raw.project_id,
        raw.network_id,
        raw.node_id,
        raw.link_id,
        raw.group_id,
    )
    .ok_or_else(|| {
        StoreError::Db(format!(
            "resource attribute {} has inconsistent reference columns",
            raw.resource_attr_id
        ))
    })?;
    Ok(ResourceScenarioData {
        resource_scenario: ResourceScenario {
            scenario_id: ScenarioId::new(raw.scenario_id),
            resource_attr_id: ResourceAttrId::new(raw.resource_attr_id),
            dataset_id: DatasetId::new(raw.dataset_id),
            source: raw.source,
        },
        resource_attr: ResourceAttr {
            resource_attr_id: ResourceAttrId::new(raw.resource_attr_id),
            attr_id: AttrId::new(raw.attr_id),
            resource,
            is_var: is_set(&raw.is_var),
        },
        dataset: hydrate_dataset(conn, raw.dataset, user)?,
    })
}

/// Runs the binding/attribute/dataset join under a filter.
fn query_rs_data(
    conn: &Connection,
    filter: &RsFilter,
    user: UserId,
) -> Result<Vec<ResourceScenarioData>, StoreError> {
    let sql = format!(
        "SELECT rs.scenario_id, rs.resource_attr_id, rs.dataset_id, rs.source,
                ra.attr_id, ra.ref_key, ra.project_id, ra.network_id, ra.node_id, ra.link_id,
                ra.group_id, ra.attr_is_var, {DATASET_COLUMNS}
         FROM tResourceScenario rs
         JOIN tResourceAttr ra ON ra.resource_attr_id = rs.resource_attr_id
         JOIN tDataset d ON d.dataset_id = rs.dataset_id
         WHERE {}
         ORDER BY rs.scenario_id, rs.resource_attr_id",
        filter.sql()
    );
    let mut stmt = conn.prepare(&sql)?;
    let raw_rows = stmt
        .query_map(params_from_iter(filter.params.iter()), read_raw_rs_row)?
        .collect::<Result<Vec<_>, _>>()?;
    let mut data = Vec::with_capacity(raw_rows.len());
    for raw in raw_rows {
        data.push(raw_to_data(conn, raw, user)?);
    }
    Ok(data)
}

/// Groups binding data by resource attribute, preserving attribute order.
fn group_by_resource_attr(data: Vec<ResourceScenarioData>) -> Vec<ResourceAttrData> {
    let mut grouped: BTreeMap<ResourceAttrId, ResourceAttrData> = BTreeMap::new();
    for entry in data {
        grouped
            .entry(entry.resource_attr.resource_attr_id)
            .or_insert_with(|| ResourceAttrData {
                resource_attr: entry.resource_attr,
                resource_scenarios: Vec::new(),
            })
            .resource_scenarios
            .push(entry);
    }
    grouped.into_values().collect()
}

/// Verifies every distinct id in a list exists in a table.
fn ensure_all_exist(
    conn: &Connection,
    table: &str,
    id_column: &str,
    ids: &[i64],
    label: &str,
) -> Result<(), StoreError> {
    let distinct: BTreeSet<i64> = ids.iter().copied().collect();
    if distinct.is_empty() {
        return Ok(());
    }
    let placeholders = vec!["?"; distinct.len()].join(", ");
    let sql = format!(
        "SELECT COUNT(DISTINCT {id_column}) FROM {table} WHERE {id_column} IN ({placeholders})"
    );
    let found: i64 = conn.query_row(&sql, params_from_iter(distinct.iter()), |row| row.get(0))?;
    let expected = i64::try_from(distinct.len())
        .map_err(|_| StoreError::InvalidInput(format!("too many {label} ids")))?;
    if found != expected {
        return Err(StoreError::NotFound(format!(
            "unrecognised {label} ids were found in the list"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Query Operations
// ============================================================================

impl BasinStore {
    /// Returns the distinct datasets a scenario binds, inflated and masked.
    /// Hidden datasets the caller cannot view come back with value, start
    /// time, frequency, and metadata withheld; the read never fails on
    /// hidden data.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing scenario.
    pub fn get_scenario_data(
        &mut self,
        scenario_id: ScenarioId,
        caller: &Caller,
    ) -> Result<Vec<Dataset>, StoreError> {
        self.txn(|tx, _| {
            load_scenario(tx, scenario_id)?;
            let sql = format!(
                "SELECT DISTINCT {DATASET_COLUMNS} FROM tDataset d
                 JOIN tResourceScenario rs ON rs.dataset_id = d.dataset_id
                 WHERE rs.scenario_id = ?1
                 ORDER BY d.dataset_id"
            );
            let mut stmt = tx.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![scenario_id.get()], |row| {
                    read_dataset_row(row, 0)
                })?
                .collect::<Result<Vec<_>, _>>()?;
            let mut datasets = Vec::with_capacity(rows.len());
            for row in rows {
                datasets.push(hydrate_dataset(tx, row, caller.user_id)?);
            }
            Ok(datasets)
        })
    }

    /// Returns every binding of one resource in the given scenarios,
    /// optionally restricted to attributes of one template type.
    ///
    /// # Errors
    ///
    /// Returns `Db` on storage failure.
    pub fn get_resource_data(
        &mut self,
        resource: ResourceRef,
        scenario_ids: &[ScenarioId],
        type_id: Option<TemplateTypeId>,
        caller: &Caller,
    ) -> Result<Vec<ResourceScenarioData>, StoreError> {
        self.txn(|tx, _| {
            let mut filter = RsFilter::default();
            filter.resource(resource);
            filter.id_list("rs.scenario_id", scenario_ids.iter().map(|id| id.get()));
            if let Some(type_id) = type_id {
                filter.type_ids(&[type_id]);
            }
            query_rs_data(tx, &filter, caller.user_id)
        })
    }

    /// Returns a node's bindings in the given scenarios.
    ///
    /// # Errors
    ///
    /// Returns `Db` on storage failure.
    pub fn get_node_data(
        &mut self,
        node_id: NodeId,
        scenario_ids: &[ScenarioId],
        type_id: Option<TemplateTypeId>,
        caller: &Caller,
    ) -> Result<Vec<ResourceScenarioData>, StoreError> {
        self.get_resource_data(ResourceRef::Node(node_id), scenario_ids, type_id, caller)
    }

    /// Returns a link's bindings in the given scenarios.
    ///
    /// # Errors
    ///
    /// Returns `Db` on storage failure.
    pub fn get_link_data(
        &mut self,
        link_id: LinkId,
        scenario_ids: &[ScenarioId],
        type_id: Option<TemplateTypeId>,
        caller: &Caller,
    ) -> Result<Vec<ResourceScenarioData>, StoreError> {
        self.get_resource_data(ResourceRef::Link(link_id), scenario_ids, type_id, caller)
    }

    /// Returns a network's own bindings in the given scenarios.
    ///
    /// # Errors
    ///
    /// Returns `Db` on storage failure.
    pub fn get_network_data(
        &mut self,
        network_id: NetworkId,
        scenario_ids: &[ScenarioId],
        type_id: Option<TemplateTypeId>,
        caller: &Caller,
    ) -> Result<Vec<ResourceScenarioData>, StoreError> {
        self.get_resource_data(ResourceRef::Network(network_id), scenario_ids, type_id, caller)
    }

    /// Returns a resource group's bindings in the given scenarios.
    ///
    /// # Errors
    ///
    /// Returns `Db` on storage failure.
    pub fn get_resourcegroup_data(
        &mut self,
        group_id: GroupId,
        scenario_ids: &[ScenarioId],
        type_id: Option<TemplateTypeId>,
        caller: &Caller,
    ) -> Result<Vec<ResourceScenarioData>, StoreError> {
        self.get_resource_data(ResourceRef::Group(group_id), scenario_ids, type_id, caller)
    }

    /// Returns, for each selected scenario, the bindings matching the
    /// attribute, resource, and type filters. Absent filters select
    /// everything.
    ///
    /// # Errors
    ///
    /// Returns `Db` on storage failure.
    #[allow(
        clippy::too_many_arguments,
        reason = "The filter set mirrors the service operation's signature."
    )]
    pub fn get_scenarios_data(
        &mut self,
        networks: &[NetworkId],
        nodes: &[NodeId],
        links: &[LinkId],
        scenario_ids: &[ScenarioId],
        attr_ids: &[AttrId],
        type_ids: &[TemplateTypeId],
        caller: &Caller,
    ) -> Result<Vec<ScenariosData>, StoreError> {
        self.txn(|tx, _| {
            let mut scenarios = Vec::new();
            for scenario_id in scenario_ids {
                scenarios.push(load_scenario(tx, *scenario_id)?);
            }
            let mut results = Vec::with_capacity(scenarios.len());
            for scenario in scenarios {
                let mut filter = RsFilter::default();
                filter.id_list("rs.scenario_id", [scenario.scenario_id.get()]);
                filter.id_list("ra.attr_id", attr_ids.iter().map(|id| id.get()));
                filter.any_resource(networks, nodes, links);
                filter.type_ids(type_ids);
                let resource_scenarios = query_rs_data(tx, &filter, caller.user_id)?;
                results.push(ScenariosData {
                    scenario,
                    resource_scenarios,
                });
            }
            Ok(results)
        })
    }

    /// Returns one resource's bindings for the listed attributes in the
    /// given scenarios.
    ///
    /// # Errors
    ///
    /// Returns `Db` on storage failure.
    pub fn get_resource_attribute_data(
        &mut self,
        resource: ResourceRef,
        scenario_ids: &[ScenarioId],
        attr_ids: &[AttrId],
        caller: &Caller,
    ) -> Result<Vec<ResourceScenarioData>, StoreError> {
        self.txn(|tx, _| {
            let mut filter = RsFilter::default();
            filter.resource(resource);
            filter.id_list("rs.scenario_id", scenario_ids.iter().map(|id| id.get()));
            filter.id_list("ra.attr_id", attr_ids.iter().map(|id| id.get()));
            query_rs_data(tx, &filter, caller.user_id)
        })
    }

    /// Returns every resource attribute carrying one attribute, with the
    /// bindings present in the given scenarios.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing attribute.
    pub fn get_attribute_datasets(
        &mut self,
        attr_id: AttrId,
        scenario_ids: &[ScenarioId],
        caller: &Caller,
    ) -> Result<Vec<ResourceAttrData>, StoreError> {
        self.txn(|tx, _| {
            ensure_all_exist(tx, "tAttr", "attr_id", &[attr_id.get()], "attribute")?;
            let mut filter = RsFilter::default();
            filter.id_list("ra.attr_id", [attr_id.get()]);
            filter.id_list("rs.scenario_id", scenario_ids.iter().map(|id| id.get()));
            Ok(group_by_resource_attr(query_rs_data(tx, &filter, caller.user_id)?))
        })
    }

    /// Returns the bindings of the listed resource attributes in the given
    /// scenarios, grouped by resource attribute.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when a listed resource attribute does not exist.
    pub fn get_resource_attribute_datasets(
        &mut self,
        resource_attr_ids: &[ResourceAttrId],
        scenario_ids: &[ScenarioId],
        caller: &Caller,
    ) -> Result<Vec<ResourceAttrData>, StoreError> {
        self.txn(|tx, _| {
            let raw_ids: Vec<i64> = resource_attr_ids.iter().map(|id| id.get()).collect();
            ensure_all_exist(tx, "tResourceAttr", "resource_attr_id", &raw_ids, "resource attribute")?;
            let mut filter = RsFilter::default();
            filter.id_list("rs.resource_attr_id", raw_ids);
            filter.id_list("rs.scenario_id", scenario_ids.iter().map(|id| id.get()));
            Ok(group_by_resource_attr(query_rs_data(tx, &filter, caller.user_id)?))
        })
    }

    /// Returns the bindings of the listed resource attributes in the listed
    /// scenarios.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when a listed resource attribute or scenario does
    /// not exist.
    pub fn get_resourcescenarios(
        &mut self,
        resource_attr_ids: &[ResourceAttrId],
        scenario_ids: &[ScenarioId],
        caller: &Caller,
    ) -> Result<Vec<ResourceScenarioData>, StoreError> {
        self.txn(|tx, _| {
            let raw_ra_ids: Vec<i64> = resource_attr_ids.iter().map(|id| id.get()).collect();
            let raw_scenario_ids: Vec<i64> = scenario_ids.iter().map(|id| id.get()).collect();
            ensure_all_exist(tx, "tResourceAttr", "resource_attr_id", &raw_ra_ids, "resource attribute")?;
            ensure_all_exist(tx, "tScenario", "scenario_id", &raw_scenario_ids, "scenario")?;
            let mut filter = RsFilter::default();
            filter.id_list("rs.resource_attr_id", raw_ra_ids);
            filter.id_list("rs.scenario_id", raw_scenario_ids);
            query_rs_data(tx, &filter, caller.user_id)
        })
    }

    /// Returns the matching node attributes and every binding of those
    /// attributes across scenarios.
    ///
    /// # Errors
    ///
    /// Returns `Db` on storage failure.
    pub fn get_node_attribute_data(
        &mut self,
        node_ids: &[NodeId],
        attr_ids: &[AttrId],
        caller: &Caller,
    ) -> Result<AttributeData, StoreError> {
        self.txn(|tx, _| {
            let mut attr_filter = RsFilter::default();
            attr_filter.id_list("ra.node_id", node_ids.iter().map(|id| id.get()));
            attr_filter.id_list("ra.attr_id", attr_ids.iter().map(|id| id.get()));
            let sql = format!(
                "SELECT ra.resource_attr_id, ra.attr_id, ra.ref_key, ra.project_id,
                        ra.network_id, ra.node_id, ra.link_id, ra.group_id, ra.attr_is_var
                 FROM tResourceAttr ra
                 WHERE {}
                 ORDER BY ra.resource_attr_id",
                attr_filter.sql()
            );
            let mut stmt = tx.prepare(&sql)?;
            let raw_attrs = stmt
                .query_map(params_from_iter(attr_filter.params.iter()), |row| {
                    let resource_attr_id: i64 = row.get(0)?;
                    let attr_id: i64 = row.get(1)?;
                    let ref_key: String = row.get(2)?;
                    let project_id: Option<i64> = row.get(3)?;
                    let network_id: Option<i64> = row.get(4)?;
                    let node_id: Option<i64> = row.get(5)?;
                    let link_id: Option<i64> = row.get(6)?;
                    let group_id: Option<i64> = row.get(7)?;
                    let is_var: String = row.get(8)?;
                    Ok((
                        resource_attr_id,
                        attr_id,
                        ref_key,
                        project_id,
                        network_id,
                        node_id,
                        link_id,
                        group_id,
                        is_var,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut resource_attrs = Vec::with_capacity(raw_attrs.len());
            for (ra_id, attr_id, ref_key, project_id, network_id, node_id, link_id, group_id, is_var) in
                raw_attrs
            {
                let resource = ResourceRef::from_columns(
                    &ref_key, project_id, network_id, node_id, link_id, group_id,
                )
                .ok_or_else(|| {
                    StoreError::Db(format!(
                        "resource attribute {ra_id} has inconsistent reference columns"
                    ))
                })?;
                resource_attrs.push(ResourceAttr {
                    resource_attr_id: ResourceAttrId::new(ra_id),
                    attr_id: AttrId::new(attr_id),
                    resource,
                    is_var: is_set(&is_var),
                });
            }

            let mut data_filter = RsFilter::default();
            data_filter.id_list(
                "rs.resource_attr_id",
                resource_attrs.iter().map(|ra| ra.resource_attr_id.get()),
            );
            let resource_scenarios = if resource_attrs.is_empty() {
                Vec::new()
            } else {
                query_rs_data(tx, &data_filter, caller.user_id)?
            };
            Ok(AttributeData {
                resource_attrs,
                resource_scenarios,
            })
        })
    }

    /// Returns one attribute binding with its dataset, view-gated on the
    /// scenario's network.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the scenario or binding is missing and
    /// `Permission` without view access.
    pub fn get_resource_scenario(
        &mut self,
        resource_attr_id: ResourceAttrId,
        scenario_id: ScenarioId,
        caller: &Caller,
    ) -> Result<ResourceScenarioData, StoreError> {
        self.txn(|tx, _| {
            let scenario = load_scenario(tx, scenario_id)?;
            check_network_access(tx, scenario.network_id, caller.user_id, AccessLevel::View)?;
            let mut filter = RsFilter::default();
            filter.id_list("rs.scenario_id", [scenario_id.get()]);
            filter.id_list("rs.resource_attr_id", [resource_attr_id.get()]);
            query_rs_data(tx, &filter, caller.user_id)?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    StoreError::NotFound(format!(
                        "resource scenario for {resource_attr_id} not found in scenario {scenario_id}"
                    ))
                })
        })
    }

    /// Lists the scenarios of a network, newest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing network and `Permission` without
    /// view access.
    pub fn get_network_scenarios(
        &mut self,
        network_id: NetworkId,
        caller: &Caller,
    ) -> Result<Vec<Scenario>, StoreError> {
        self.txn(|tx, _| {
            check_network_access(tx, network_id, caller.user_id, AccessLevel::View)?;
            let sql = format!(
                "SELECT {SCENARIO_COLUMNS} FROM tScenario s
                 WHERE s.network_id = ?1 ORDER BY s.scenario_id DESC"
            );
            let mut stmt = tx.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![network_id.get()], read_scenario_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

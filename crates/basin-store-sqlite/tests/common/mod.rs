// crates/basin-store-sqlite/tests/common/mod.rs
// ============================================================================
// Module: Store Test Fixtures
// Description: Shared in-memory network fixture for engine tests.
// Purpose: Build a small project/network topology with users and attributes.
// Dependencies: basin-core, basin-store-sqlite
// ============================================================================
//! ## Overview
//! The fixture creates three users (the system user, an owning user who
//! creates the topology, and an outsider with no grants), one project and
//! network, two nodes joined by a link, one group, and two node attributes
//! ready for scenario bindings.

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only fixture; not every test uses every field."
)]

use basin_core::AttrId;
use basin_core::DatasetInput;
use basin_core::DatasetType;
use basin_core::GroupId;
use basin_core::LinkId;
use basin_core::NetworkId;
use basin_core::NodeId;
use basin_core::ProjectId;
use basin_core::ResourceAttrId;
use basin_core::ResourceRef;
use basin_store_sqlite::BasinStore;
use basin_store_sqlite::Caller;
use basin_store_sqlite::DatasetSpec;
use basin_store_sqlite::ResourceScenarioSpec;
use basin_store_sqlite::ScenarioSpec;

/// A small network with users, topology, and two node attributes.
pub struct Fixture {
    /// The in-memory store under test.
    pub store: BasinStore,
    /// Creator of the whole topology; full permissions everywhere.
    pub owner: Caller,
    /// A user with no grants at all.
    pub outsider: Caller,
    /// The project.
    pub project_id: ProjectId,
    /// The network.
    pub network_id: NetworkId,
    /// First node.
    pub node_a: NodeId,
    /// Second node.
    pub node_b: NodeId,
    /// The link joining the two nodes.
    pub link: LinkId,
    /// A resource group.
    pub group_id: GroupId,
    /// A flow attribute.
    pub attr_flow: AttrId,
    /// A level attribute.
    pub attr_level: AttrId,
    /// Flow bound to node A.
    pub ra_flow_a: ResourceAttrId,
    /// Flow bound to node B.
    pub ra_flow_b: ResourceAttrId,
    /// Level bound to node A.
    pub ra_level_a: ResourceAttrId,
}

/// Builds the fixture on a fresh in-memory store.
pub fn fixture() -> Fixture {
    fixture_with(BasinStore::in_memory().unwrap())
}

/// Builds the fixture on a provided store.
pub fn fixture_with(mut store: BasinStore) -> Fixture {
    store.add_user("system", "System").unwrap();
    let owner = Caller::new(store.add_user("marisol", "Marisol O.").unwrap());
    let outsider = Caller::new(store.add_user("drifter", "D. Rifter").unwrap());

    let project_id = store.add_project("river basin study", None, &owner).unwrap();
    let network_id = store
        .add_network(project_id, "upper basin", None, None, &owner)
        .unwrap();
    let node_a = store
        .add_node(network_id, "reservoir", None, Some(0.0), Some(0.0), &owner)
        .unwrap();
    let node_b = store
        .add_node(network_id, "treatment plant", None, Some(1.0), Some(1.0), &owner)
        .unwrap();
    let link = store
        .add_link(network_id, "penstock", None, node_a, node_b, &owner)
        .unwrap();
    let group_id = store
        .add_group(network_id, "demand sites", None, &owner)
        .unwrap();

    let attr_flow = store.add_attr("flow", Some("Volumetric flow rate")).unwrap();
    let attr_level = store.add_attr("level", Some("Length")).unwrap();
    let ra_flow_a = store
        .add_resource_attr(ResourceRef::Node(node_a), attr_flow, false, &owner)
        .unwrap();
    let ra_flow_b = store
        .add_resource_attr(ResourceRef::Node(node_b), attr_flow, false, &owner)
        .unwrap();
    let ra_level_a = store
        .add_resource_attr(ResourceRef::Node(node_a), attr_level, false, &owner)
        .unwrap();

    Fixture {
        store,
        owner,
        outsider,
        project_id,
        network_id,
        node_a,
        node_b,
        link,
        group_id,
        attr_flow,
        attr_level,
        ra_flow_a,
        ra_flow_b,
        ra_level_a,
    }
}

/// Builds a scalar dataset spec.
pub fn scalar(name: &str, value: &str) -> DatasetSpec {
    DatasetSpec::plain(
        DatasetType::Scalar,
        name,
        DatasetInput::Text(value.to_string()),
    )
}

/// Builds a binding spec carrying a value.
pub fn binding(resource_attr_id: ResourceAttrId, spec: DatasetSpec) -> ResourceScenarioSpec {
    ResourceScenarioSpec {
        resource_attr_id,
        value: Some(spec),
    }
}

/// Builds a binding spec requesting deletion.
pub fn deletion(resource_attr_id: ResourceAttrId) -> ResourceScenarioSpec {
    ResourceScenarioSpec {
        resource_attr_id,
        value: None,
    }
}

/// Builds a bare scenario spec with the given name and bindings.
pub fn scenario(name: &str, bindings: Vec<ResourceScenarioSpec>) -> ScenarioSpec {
    ScenarioSpec {
        name: name.to_string(),
        description: None,
        start_time: None,
        end_time: None,
        time_step: None,
        resourcescenarios: bindings,
        resourcegroupitems: Vec::new(),
    }
}

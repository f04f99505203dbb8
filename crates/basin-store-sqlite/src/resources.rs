// crates/basin-store-sqlite/src/resources.rs
// ============================================================================
// Module: Basin Resource Graph
// Description: Topology creation and polymorphic resource routing.
// Purpose: Resolve references, attach attributes, and walk up to the network.
// Dependencies: basin-core, rusqlite
// ============================================================================

//! ## Overview
//! The resource graph covers two concerns. Creation: users, projects,
//! networks, nodes, links, groups, attributes, and the bindings between
//! them, with the same name-uniqueness rules the schema enforces. Routing:
//! resolving a [`ResourceRef`] to its row, attaching an attribute to the
//! right foreign-key slot, and walking a resource attribute up to its
//! network (project-scoped attributes have none). Routing never touches
//! datasets or scenarios.

// ============================================================================
// SECTION: Imports
// ============================================================================

use basin_core::AccessLevel;
use basin_core::AttrId;
use basin_core::GroupId;
use basin_core::LinkId;
use basin_core::NetworkId;
use basin_core::NodeId;
use basin_core::ProjectId;
use basin_core::ResourceAttrId;
use basin_core::ResourceRef;
use basin_core::TemplateId;
use basin_core::TemplateTypeId;
use basin_core::UserId;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;

use crate::permissions::OwnedKind;
use crate::permissions::check_entity_access;
use crate::permissions::check_network_access;
use crate::permissions::check_project_access;
use crate::store::BasinStore;
use crate::store::Caller;
use crate::store::StoreError;
use crate::store::flag;
use crate::store::is_set;

// ============================================================================
// SECTION: Resource Attribute DTO
// ============================================================================

/// The binding of one attribute to one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAttr {
    /// Binding identifier.
    pub resource_attr_id: ResourceAttrId,
    /// Bound attribute.
    pub attr_id: AttrId,
    /// Owning resource.
    pub resource: ResourceRef,
    /// Whether the attribute is computed rather than supplied.
    pub is_var: bool,
}

// ============================================================================
// SECTION: Routing
// ============================================================================

/// Resolves the network a resource belongs to, verifying the resource
/// exists. Projects yield `None`: they sit above networks.
pub(crate) fn resource_network(
    conn: &Connection,
    resource: ResourceRef,
) -> Result<Option<NetworkId>, StoreError> {
    let (sql, label) = match resource {
        ResourceRef::Project(_) => ("SELECT NULL FROM tProject WHERE project_id = ?1", "project"),
        ResourceRef::Network(_) => {
            ("SELECT network_id FROM tNetwork WHERE network_id = ?1", "network")
        }
        ResourceRef::Node(_) => ("SELECT network_id FROM tNode WHERE node_id = ?1", "node"),
        ResourceRef::Link(_) => ("SELECT network_id FROM tLink WHERE link_id = ?1", "link"),
        ResourceRef::Group(_) => {
            ("SELECT network_id FROM tResourceGroup WHERE group_id = ?1", "resource group")
        }
    };
    let network: Option<Option<i64>> = conn
        .query_row(sql, params![resource.raw_id()], |row| row.get(0))
        .optional()?;
    match network {
        Some(raw) => Ok(raw.map(NetworkId::new)),
        None => Err(StoreError::NotFound(format!(
            "{label} {} does not exist",
            resource.raw_id()
        ))),
    }
}

/// Checks an access level on a resource: projects carry their own owner
/// rows, everything else delegates to its network.
pub(crate) fn check_resource_access(
    conn: &Connection,
    resource: ResourceRef,
    user: UserId,
    level: AccessLevel,
) -> Result<(), StoreError> {
    match resource {
        ResourceRef::Project(project_id) => check_project_access(conn, project_id, user, level),
        _ => match resource_network(conn, resource)? {
            Some(network_id) => check_network_access(conn, network_id, user, level),
            // Unreachable for non-project refs; networks always resolve.
            None => Ok(()),
        },
    }
}

/// Loads a resource attribute row, failing with `NotFound` when absent or
/// when its reference columns are inconsistent.
pub(crate) fn load_resource_attr(
    conn: &Connection,
    resource_attr_id: ResourceAttrId,
) -> Result<ResourceAttr, StoreError> {
    let row = conn
        .query_row(
            "SELECT attr_id, ref_key, project_id, network_id, node_id, link_id, group_id,
                    attr_is_var
             FROM tResourceAttr WHERE resource_attr_id = ?1",
            params![resource_attr_id.get()],
            |row| {
                let attr_id: i64 = row.get(0)?;
                let ref_key: String = row.get(1)?;
                let project_id: Option<i64> = row.get(2)?;
                let network_id: Option<i64> = row.get(3)?;
                let node_id: Option<i64> = row.get(4)?;
                let link_id: Option<i64> = row.get(5)?;
                let group_id: Option<i64> = row.get(6)?;
                let is_var: String = row.get(7)?;
                Ok((attr_id, ref_key, project_id, network_id, node_id, link_id, group_id, is_var))
            },
        )
        .optional()?;
    let Some((attr_id, ref_key, project_id, network_id, node_id, link_id, group_id, is_var)) = row
    else {
        return Err(StoreError::NotFound(format!(
            "resource attribute {resource_attr_id} does not exist"
        )));
    };
    let resource =
        ResourceRef::from_columns(&ref_key, project_id, network_id, node_id, link_id, group_id)
            .ok_or_else(|| {
                StoreError::Db(format!(
                    "resource attribute {resource_attr_id} has inconsistent reference columns"
                ))
            })?;
    Ok(ResourceAttr {
        resource_attr_id,
        attr_id: AttrId::new(attr_id),
        resource,
        is_var: is_set(&is_var),
    })
}

/// Resolves a resource attribute up to its network; project-scoped
/// attributes yield `None`.
pub(crate) fn resource_attr_network(
    conn: &Connection,
    resource_attr_id: ResourceAttrId,
) -> Result<Option<NetworkId>, StoreError> {
    let attr = load_resource_attr(conn, resource_attr_id)?;
    resource_network(conn, attr.resource)
}

/// Resolves a network's parent project.
pub(crate) fn network_project(
    conn: &Connection,
    network_id: NetworkId,
) -> Result<ProjectId, StoreError> {
    let project: Option<i64> = conn
        .query_row(
            "SELECT project_id FROM tNetwork WHERE network_id = ?1",
            params![network_id.get()],
            |row| row.get(0),
        )
        .optional()?;
    project.map(ProjectId::new).ok_or_else(|| {
        StoreError::NotFound(format!("network {network_id} does not exist"))
    })
}

/// Fails with `Conflict` when a name is already taken within a scope.
fn check_name_free(
    conn: &Connection,
    sql: &str,
    scope_id: i64,
    name: &str,
    message: impl FnOnce() -> String,
) -> Result<(), StoreError> {
    let existing: Option<i64> = conn
        .query_row(sql, params![scope_id, name], |row| row.get(0))
        .optional()?;
    if existing.is_some() {
        return Err(StoreError::Conflict(message()));
    }
    Ok(())
}

// ============================================================================
// SECTION: Creation Operations
// ============================================================================

impl BasinStore {
    /// Creates a user.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` when the username is taken.
    pub fn add_user(
        &mut self,
        username: &str,
        display_name: &str,
    ) -> Result<UserId, StoreError> {
        self.txn(|tx, _| {
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT user_id FROM tUser WHERE username = ?1",
                    params![username],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Err(StoreError::Conflict(format!(
                    "username {username} is already taken"
                )));
            }
            tx.execute(
                "INSERT INTO tUser (username, display_name) VALUES (?1, ?2)",
                params![username, display_name],
            )?;
            Ok(UserId::new(tx.last_insert_rowid()))
        })
    }

    /// Creates a project owned by the caller, who receives a full owner row.
    ///
    /// # Errors
    ///
    /// Returns `Db` on storage failure.
    pub fn add_project(
        &mut self,
        name: &str,
        description: Option<&str>,
        caller: &Caller,
    ) -> Result<ProjectId, StoreError> {
        self.txn(|tx, _| {
            tx.execute(
                "INSERT INTO tProject (project_name, project_description, created_by)
                 VALUES (?1, ?2, ?3)",
                params![name, description, caller.user_id.get()],
            )?;
            let project_id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO tProjectOwner (user_id, project_id, view, edit, share)
                 VALUES (?1, ?2, 'Y', 'Y', 'Y')",
                params![caller.user_id.get(), project_id],
            )?;
            Ok(ProjectId::new(project_id))
        })
    }

    /// Creates a network under a project. The caller needs edit access on
    /// the project and receives a full owner row on the network.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing project, `Permission` without edit
    /// access, and `Conflict` for a duplicate name within the project.
    pub fn add_network(
        &mut self,
        project_id: ProjectId,
        name: &str,
        description: Option<&str>,
        projection: Option<&str>,
        caller: &Caller,
    ) -> Result<NetworkId, StoreError> {
        self.txn(|tx, _| {
            check_project_access(tx, project_id, caller.user_id, AccessLevel::Edit)?;
            check_name_free(
                tx,
                "SELECT network_id FROM tNetwork WHERE project_id = ?1 AND network_name = ?2",
                project_id.get(),
                name,
                || format!("a network named {name} already exists in project {project_id}"),
            )?;
            tx.execute(
                "INSERT INTO tNetwork
                     (network_name, network_description, project_id, projection, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, description, project_id.get(), projection, caller.user_id.get()],
            )?;
            let network_id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO tNetworkOwner (user_id, network_id, view, edit, share)
                 VALUES (?1, ?2, 'Y', 'Y', 'Y')",
                params![caller.user_id.get(), network_id],
            )?;
            Ok(NetworkId::new(network_id))
        })
    }

    /// Creates a node in a network.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing network, `Permission` without edit
    /// access, and `Conflict` for a duplicate name within the network.
    pub fn add_node(
        &mut self,
        network_id: NetworkId,
        name: &str,
        description: Option<&str>,
        x: Option<f64>,
        y: Option<f64>,
        caller: &Caller,
    ) -> Result<NodeId, StoreError> {
        self.txn(|tx, _| {
            check_network_access(tx, network_id, caller.user_id, AccessLevel::Edit)?;
            check_name_free(
                tx,
                "SELECT node_id FROM tNode WHERE network_id = ?1 AND node_name = ?2",
                network_id.get(),
                name,
                || format!("a node named {name} already exists in network {network_id}"),
            )?;
            tx.execute(
                "INSERT INTO tNode (network_id, node_name, node_description, node_x, node_y)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![network_id.get(), name, description, x, y],
            )?;
            Ok(NodeId::new(tx.last_insert_rowid()))
        })
    }

    /// Creates a link between two nodes of the same network.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for missing entities, `Permission` without edit
    /// access, `Conflict` for a duplicate name, and `CrossNetwork` when an
    /// endpoint belongs to another network.
    pub fn add_link(
        &mut self,
        network_id: NetworkId,
        name: &str,
        description: Option<&str>,
        node_1: NodeId,
        node_2: NodeId,
        caller: &Caller,
    ) -> Result<LinkId, StoreError> {
        self.txn(|tx, _| {
            check_network_access(tx, network_id, caller.user_id, AccessLevel::Edit)?;
            check_name_free(
                tx,
                "SELECT link_id FROM tLink WHERE network_id = ?1 AND link_name = ?2",
                network_id.get(),
                name,
                || format!("a link named {name} already exists in network {network_id}"),
            )?;
            for node in [node_1, node_2] {
                let home = resource_network(tx, ResourceRef::Node(node))?;
                if home != Some(network_id) {
                    return Err(StoreError::CrossNetwork(format!(
                        "node {node} does not belong to network {network_id}"
                    )));
                }
            }
            tx.execute(
                "INSERT INTO tLink
                     (network_id, link_name, link_description, node_1_id, node_2_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![network_id.get(), name, description, node_1.get(), node_2.get()],
            )?;
            Ok(LinkId::new(tx.last_insert_rowid()))
        })
    }

    /// Creates a resource group in a network.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing network, `Permission` without edit
    /// access, and `Conflict` for a duplicate name within the network.
    pub fn add_group(
        &mut self,
        network_id: NetworkId,
        name: &str,
        description: Option<&str>,
        caller: &Caller,
    ) -> Result<GroupId, StoreError> {
        self.txn(|tx, _| {
            check_network_access(tx, network_id, caller.user_id, AccessLevel::Edit)?;
            check_name_free(
                tx,
                "SELECT group_id FROM tResourceGroup WHERE network_id = ?1 AND group_name = ?2",
                network_id.get(),
                name,
                || format!("a resource group named {name} already exists in network {network_id}"),
            )?;
            tx.execute(
                "INSERT INTO tResourceGroup (network_id, group_name, group_description)
                 VALUES (?1, ?2, ?3)",
                params![network_id.get(), name, description],
            )?;
            Ok(GroupId::new(tx.last_insert_rowid()))
        })
    }

    /// Creates an attribute. Attributes are global and unique per
    /// `(name, dimension)`.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` when the pair already exists.
    pub fn add_attr(
        &mut self,
        name: &str,
        dimension: Option<&str>,
    ) -> Result<AttrId, StoreError> {
        self.txn(|tx, _| {
            let dimension = dimension.unwrap_or("dimensionless");
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT attr_id FROM tAttr WHERE attr_name = ?1 AND attr_dimen = ?2",
                    params![name, dimension],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Err(StoreError::Conflict(format!(
                    "attribute {name} with dimension {dimension} already exists"
                )));
            }
            tx.execute(
                "INSERT INTO tAttr (attr_name, attr_dimen) VALUES (?1, ?2)",
                params![name, dimension],
            )?;
            Ok(AttrId::new(tx.last_insert_rowid()))
        })
    }

    /// Attaches an attribute to a resource, routing the id into the matching
    /// foreign-key slot.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for missing entities, `Permission` without edit
    /// access on the resource, and `Conflict` when the resource already
    /// carries the attribute.
    pub fn add_resource_attr(
        &mut self,
        resource: ResourceRef,
        attr_id: AttrId,
        is_var: bool,
        caller: &Caller,
    ) -> Result<ResourceAttrId, StoreError> {
        self.txn(|tx, _| {
            check_resource_access(tx, resource, caller.user_id, AccessLevel::Edit)?;
            let attr_exists: Option<i64> = tx
                .query_row(
                    "SELECT attr_id FROM tAttr WHERE attr_id = ?1",
                    params![attr_id.get()],
                    |row| row.get(0),
                )
                .optional()?;
            if attr_exists.is_none() {
                return Err(StoreError::NotFound(format!(
                    "attribute {attr_id} does not exist"
                )));
            }
            let (project_id, network_id, node_id, link_id, group_id) = resource.fk_slots();
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT resource_attr_id FROM tResourceAttr
                     WHERE attr_id = ?1 AND ref_key = ?2
                       AND COALESCE(project_id, -1) = COALESCE(?3, -1)
                       AND COALESCE(network_id, -1) = COALESCE(?4, -1)
                       AND COALESCE(node_id, -1) = COALESCE(?5, -1)
                       AND COALESCE(link_id, -1) = COALESCE(?6, -1)
                       AND COALESCE(group_id, -1) = COALESCE(?7, -1)",
                    params![
                        attr_id.get(),
                        resource.ref_key(),
                        project_id,
                        network_id,
                        node_id,
                        link_id,
                        group_id
                    ],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Err(StoreError::Conflict(format!(
                    "attribute {attr_id} is already attached to {resource}"
                )));
            }
            tx.execute(
                "INSERT INTO tResourceAttr
                     (attr_id, ref_key, project_id, network_id, node_id, link_id, group_id,
                      attr_is_var)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    attr_id.get(),
                    resource.ref_key(),
                    project_id,
                    network_id,
                    node_id,
                    link_id,
                    group_id,
                    flag(is_var)
                ],
            )?;
            Ok(ResourceAttrId::new(tx.last_insert_rowid()))
        })
    }

    /// Creates a template owned by the caller, who receives a full owner row.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` when the template name is taken.
    pub fn add_template(&mut self, name: &str, caller: &Caller) -> Result<TemplateId, StoreError> {
        self.txn(|tx, _| {
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT template_id FROM tTemplate WHERE template_name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Err(StoreError::Conflict(format!(
                    "a template named {name} already exists"
                )));
            }
            tx.execute(
                "INSERT INTO tTemplate (template_name, created_by) VALUES (?1, ?2)",
                params![name, caller.user_id.get()],
            )?;
            let template_id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO tTemplateOwner (user_id, template_id, view, edit, share)
                 VALUES (?1, ?2, 'Y', 'Y', 'Y')",
                params![caller.user_id.get(), template_id],
            )?;
            Ok(TemplateId::new(template_id))
        })
    }

    /// Creates a template type under a template.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing template and `Permission` without
    /// edit access.
    pub fn add_template_type(
        &mut self,
        template_id: TemplateId,
        name: &str,
        resource_type: Option<&str>,
        caller: &Caller,
    ) -> Result<TemplateTypeId, StoreError> {
        self.txn(|tx, _| {
            check_entity_access(
                tx,
                OwnedKind::Template,
                template_id.get(),
                caller.user_id,
                AccessLevel::Edit,
            )?;
            tx.execute(
                "INSERT INTO tTemplateType (template_id, type_name, resource_type)
                 VALUES (?1, ?2, ?3)",
                params![template_id.get(), name, resource_type],
            )?;
            Ok(TemplateTypeId::new(tx.last_insert_rowid()))
        })
    }

    /// Adds an attribute to a template type, enabling type-filtered queries.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the type or attribute is missing.
    pub fn add_type_attr(
        &mut self,
        type_id: TemplateTypeId,
        attr_id: AttrId,
    ) -> Result<(), StoreError> {
        self.txn(|tx, _| {
            let type_exists: Option<i64> = tx
                .query_row(
                    "SELECT type_id FROM tTemplateType WHERE type_id = ?1",
                    params![type_id.get()],
                    |row| row.get(0),
                )
                .optional()?;
            if type_exists.is_none() {
                return Err(StoreError::NotFound(format!(
                    "template type {type_id} does not exist"
                )));
            }
            tx.execute(
                "INSERT INTO tTypeAttr (attr_id, type_id) VALUES (?1, ?2)",
                params![attr_id.get(), type_id.get()],
            )?;
            Ok(())
        })
    }

    /// Records an attribute-to-attribute mapping between two resource
    /// attributes, keyed by their networks.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when either resource attribute is missing.
    pub fn add_resource_attr_map(
        &mut self,
        resource_attr_a: ResourceAttrId,
        resource_attr_b: ResourceAttrId,
    ) -> Result<(), StoreError> {
        self.txn(|tx, _| {
            let network_a = resource_attr_network(tx, resource_attr_a)?;
            let network_b = resource_attr_network(tx, resource_attr_b)?;
            let (Some(network_a), Some(network_b)) = (network_a, network_b) else {
                return Err(StoreError::InvalidInput(
                    "project-scoped attributes cannot be mapped".to_string(),
                ));
            };
            tx.execute(
                "INSERT INTO tResourceAttrMap
                     (network_a_id, network_b_id, resource_attr_id_a, resource_attr_id_b)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    network_a.get(),
                    network_b.get(),
                    resource_attr_a.get(),
                    resource_attr_b.get()
                ],
            )?;
            Ok(())
        })
    }
}

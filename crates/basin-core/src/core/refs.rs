// crates/basin-core/src/core/refs.rs
// ============================================================================
// Module: Basin Resource References
// Description: Tagged references to the five resource kinds and group members.
// Purpose: Replace string ref_key dispatch with sum types routed by pattern match.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! The persisted schema represents resource polymorphism as a `ref_key`
//! string plus five nullable foreign-key columns, exactly one of which is
//! populated. In memory Basin uses [`ResourceRef`] and [`GroupMemberRef`]
//! sum types instead; conversion to and from the column representation
//! happens once at the row boundary, and all routing is a single match.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::GroupId;
use crate::core::identifiers::LinkId;
use crate::core::identifiers::NetworkId;
use crate::core::identifiers::NodeId;
use crate::core::identifiers::ProjectId;

// ============================================================================
// SECTION: Resource References
// ============================================================================

/// Reference to one of the five resource kinds an attribute may bind to.
///
/// # Invariants
/// - The carried id corresponds to the variant's foreign-key column; the
///   remaining four columns are null in the persisted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "ref_key", content = "ref_id")]
pub enum ResourceRef {
    /// A project, the root of a subtree of networks.
    #[serde(rename = "PROJECT")]
    Project(ProjectId),
    /// A network within a project.
    #[serde(rename = "NETWORK")]
    Network(NetworkId),
    /// A node within a network.
    #[serde(rename = "NODE")]
    Node(NodeId),
    /// A link joining two nodes of a network.
    #[serde(rename = "LINK")]
    Link(LinkId),
    /// A resource group within a network.
    #[serde(rename = "GROUP")]
    Group(GroupId),
}

impl ResourceRef {
    /// Returns the persisted `ref_key` discriminator for this reference.
    #[must_use]
    pub const fn ref_key(&self) -> &'static str {
        match self {
            Self::Project(_) => "PROJECT",
            Self::Network(_) => "NETWORK",
            Self::Node(_) => "NODE",
            Self::Link(_) => "LINK",
            Self::Group(_) => "GROUP",
        }
    }

    /// Returns the raw referenced id regardless of kind.
    #[must_use]
    pub const fn raw_id(&self) -> i64 {
        match self {
            Self::Project(id) => id.get(),
            Self::Network(id) => id.get(),
            Self::Node(id) => id.get(),
            Self::Link(id) => id.get(),
            Self::Group(id) => id.get(),
        }
    }

    /// Routes the id into the five nullable foreign-key slots
    /// `(project_id, network_id, node_id, link_id, group_id)`.
    #[must_use]
    pub const fn fk_slots(
        &self,
    ) -> (
        Option<i64>,
        Option<i64>,
        Option<i64>,
        Option<i64>,
        Option<i64>,
    ) {
        match self {
            Self::Project(id) => (Some(id.get()), None, None, None, None),
            Self::Network(id) => (None, Some(id.get()), None, None, None),
            Self::Node(id) => (None, None, Some(id.get()), None, None),
            Self::Link(id) => (None, None, None, Some(id.get()), None),
            Self::Group(id) => (None, None, None, None, Some(id.get())),
        }
    }

    /// Reconstructs a reference from a `ref_key` discriminator and the five
    /// nullable foreign-key columns. Returns `None` when the discriminator is
    /// unknown or the matching column is null.
    #[must_use]
    pub fn from_columns(
        ref_key: &str,
        project_id: Option<i64>,
        network_id: Option<i64>,
        node_id: Option<i64>,
        link_id: Option<i64>,
        group_id: Option<i64>,
    ) -> Option<Self> {
        match ref_key {
            "PROJECT" => project_id.map(|id| Self::Project(ProjectId::new(id))),
            "NETWORK" => network_id.map(|id| Self::Network(NetworkId::new(id))),
            "NODE" => node_id.map(|id| Self::Node(NodeId::new(id))),
            "LINK" => link_id.map(|id| Self::Link(LinkId::new(id))),
            "GROUP" => group_id.map(|id| Self::Group(GroupId::new(id))),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ref_key(), self.raw_id())
    }
}

// ============================================================================
// SECTION: Group Member References
// ============================================================================

/// Reference to a member of a resource group within a scenario.
///
/// # Invariants
/// - Groups may contain nodes, links, or other groups (subgroups); a member
///   populates exactly one of the `node_id`/`link_id`/`subgroup_id` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "ref_key", content = "ref_id")]
pub enum GroupMemberRef {
    /// A node member.
    #[serde(rename = "NODE")]
    Node(NodeId),
    /// A link member.
    #[serde(rename = "LINK")]
    Link(LinkId),
    /// A nested group member.
    #[serde(rename = "GROUP")]
    Subgroup(GroupId),
}

impl GroupMemberRef {
    /// Returns the persisted `ref_key` discriminator for this member.
    #[must_use]
    pub const fn ref_key(&self) -> &'static str {
        match self {
            Self::Node(_) => "NODE",
            Self::Link(_) => "LINK",
            Self::Subgroup(_) => "GROUP",
        }
    }

    /// Returns the raw referenced id regardless of kind.
    #[must_use]
    pub const fn raw_id(&self) -> i64 {
        match self {
            Self::Node(id) => id.get(),
            Self::Link(id) => id.get(),
            Self::Subgroup(id) => id.get(),
        }
    }

    /// Routes the id into the nullable member slots
    /// `(node_id, link_id, subgroup_id)`.
    #[must_use]
    pub const fn fk_slots(&self) -> (Option<i64>, Option<i64>, Option<i64>) {
        match self {
            Self::Node(id) => (Some(id.get()), None, None),
            Self::Link(id) => (None, Some(id.get()), None),
            Self::Subgroup(id) => (None, None, Some(id.get())),
        }
    }

    /// Reconstructs a member reference from a `ref_key` discriminator and the
    /// three nullable member columns. Returns `None` when the discriminator is
    /// unknown or the matching column is null.
    #[must_use]
    pub fn from_columns(
        ref_key: &str,
        node_id: Option<i64>,
        link_id: Option<i64>,
        subgroup_id: Option<i64>,
    ) -> Option<Self> {
        match ref_key {
            "NODE" => node_id.map(|id| Self::Node(NodeId::new(id))),
            "LINK" => link_id.map(|id| Self::Link(LinkId::new(id))),
            "GROUP" => subgroup_id.map(|id| Self::Subgroup(GroupId::new(id))),
            _ => None,
        }
    }
}

impl fmt::Display for GroupMemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ref_key(), self.raw_id())
    }
}

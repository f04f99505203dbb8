// crates/basin-core/src/core/mod.rs
// ============================================================================
// Module: Basin Core Domain Modules
// Description: Module tree for the Basin domain core.
// Purpose: Group identifiers, references, datasets, permissions, and scenarios.
// Dependencies: crate::core::{config, dataset, identifiers, permission, refs, scenario}
// ============================================================================

//! ## Overview
//! Domain modules are leaves-first: identifiers and references carry no
//! behavior beyond routing, datasets own the codec and fingerprint logic,
//! permissions evaluate loaded owner rows, and scenarios provide DTOs plus
//! the pure comparison and clone-naming rules.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod dataset;
pub mod identifiers;
pub mod permission;
pub mod refs;
pub mod scenario;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::DEFAULT_COMPRESSION_THRESHOLD;
pub use config::DatasetStoreConfig;
pub use dataset::DataError;
pub use dataset::Dataset;
pub use dataset::DatasetInput;
pub use dataset::DatasetType;
pub use dataset::DecodedValue;
pub use dataset::MetadataMap;
pub use dataset::compress_if_large;
pub use dataset::dataset_hash;
pub use dataset::decode;
pub use dataset::encode;
pub use dataset::inflate_opportunistic;
pub use identifiers::AttrId;
pub use identifiers::DatasetId;
pub use identifiers::GroupId;
pub use identifiers::GroupItemId;
pub use identifiers::LinkId;
pub use identifiers::NetworkId;
pub use identifiers::NodeId;
pub use identifiers::ProjectId;
pub use identifiers::ResourceAttrId;
pub use identifiers::ScenarioId;
pub use identifiers::TemplateId;
pub use identifiers::TemplateTypeId;
pub use identifiers::UserId;
pub use permission::ANONYMOUS_USER;
pub use permission::AccessLevel;
pub use permission::OwnerRecord;
pub use permission::Visibility;
pub use permission::dataset_visibility;
pub use permission::evaluate_access;
pub use permission::evaluate_template_read;
pub use refs::GroupMemberRef;
pub use refs::ResourceRef;
pub use scenario::GroupItem;
pub use scenario::GroupItemKey;
pub use scenario::GroupMembershipDiff;
pub use scenario::ResourceDiffIds;
pub use scenario::ResourceScenario;
pub use scenario::Scenario;
pub use scenario::clone_name;
pub use scenario::diff_group_items;
pub use scenario::diff_resource_scenarios;

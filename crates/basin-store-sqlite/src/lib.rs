// crates/basin-store-sqlite/src/lib.rs
// ============================================================================
// Module: Basin SQLite Store Library
// Description: Public API surface for the SQLite-backed scenario engine.
// Purpose: Expose the store, the scenario engine operations, and the query surface.
// Dependencies: basin-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate persists Basin networks and scenarios in a relational SQLite
//! schema and implements the engine over it: scenario CRUD with the lock
//! state machine, the content-addressed dataset store with insert-or-reuse
//! and copy-on-write, the permission guard, scenario comparison, mapping
//! propagation, and the read-side query surface. Every public operation
//! runs in a single transaction; any error rolls the transaction back.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod datasets;
pub mod diff;
pub mod mapping;
pub mod permissions;
pub mod queries;
pub mod resources;
pub mod scenarios;
pub mod schema;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use datasets::DatasetSpec;
pub use diff::ResourceScenarioDiff;
pub use diff::ScenarioDiff;
pub use mapping::MappingResult;
pub use queries::AttributeData;
pub use queries::ResourceAttrData;
pub use queries::ResourceScenarioData;
pub use queries::ScenariosData;
pub use resources::ResourceAttr;
pub use scenarios::GroupItemSpec;
pub use scenarios::ResourceScenarioSpec;
pub use scenarios::ScenarioData;
pub use scenarios::ScenarioSpec;
pub use scenarios::ScenarioUpdate;
pub use store::BasinStore;
pub use store::Caller;
pub use store::SqliteJournalMode;
pub use store::SqliteStoreConfig;
pub use store::SqliteSyncMode;
pub use store::StoreError;

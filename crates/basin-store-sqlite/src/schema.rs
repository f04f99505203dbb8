// crates/basin-store-sqlite/src/schema.rs
// ============================================================================
// Module: Basin Relational Schema
// Description: DDL for the Basin tables, keys, and uniqueness constraints.
// Purpose: Create the persisted schema on store open; verify the schema version.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! The schema keeps the established five-column nullable-foreign-key shape
//! for resource polymorphism; the in-memory layer converts to tagged
//! references at the row boundary. Scenario children (`tResourceScenario`,
//! `tResourceGroupItem`, `tRule`) cascade on scenario deletion; datasets are
//! never deleted by this engine and carry the UNIQUE content hash that
//! backs dedup.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::Connection;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Schema version recorded in `user_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Full DDL, idempotent through `IF NOT EXISTS`.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tUser (
    user_id      INTEGER PRIMARY KEY,
    username     TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL DEFAULT '',
    cr_date      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS tProject (
    project_id          INTEGER PRIMARY KEY,
    project_name        TEXT NOT NULL,
    project_description TEXT,
    status              TEXT NOT NULL DEFAULT 'A',
    cr_date             TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    created_by          INTEGER REFERENCES tUser (user_id),
    UNIQUE (project_name, created_by, status)
);

CREATE TABLE IF NOT EXISTS tNetwork (
    network_id          INTEGER PRIMARY KEY,
    network_name        TEXT NOT NULL,
    network_description TEXT,
    project_id          INTEGER NOT NULL REFERENCES tProject (project_id),
    status              TEXT NOT NULL DEFAULT 'A',
    projection          TEXT,
    cr_date             TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    created_by          INTEGER REFERENCES tUser (user_id),
    UNIQUE (network_name, project_id)
);

CREATE TABLE IF NOT EXISTS tNode (
    node_id          INTEGER PRIMARY KEY,
    network_id       INTEGER NOT NULL REFERENCES tNetwork (network_id),
    node_name        TEXT NOT NULL,
    node_description TEXT,
    status           TEXT NOT NULL DEFAULT 'A',
    node_x           REAL,
    node_y           REAL,
    cr_date          TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (network_id, node_name)
);

CREATE TABLE IF NOT EXISTS tLink (
    link_id          INTEGER PRIMARY KEY,
    network_id       INTEGER NOT NULL REFERENCES tNetwork (network_id),
    link_name        TEXT NOT NULL,
    link_description TEXT,
    status           TEXT NOT NULL DEFAULT 'A',
    node_1_id        INTEGER NOT NULL REFERENCES tNode (node_id),
    node_2_id        INTEGER NOT NULL REFERENCES tNode (node_id),
    cr_date          TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (network_id, link_name)
);

CREATE TABLE IF NOT EXISTS tResourceGroup (
    group_id          INTEGER PRIMARY KEY,
    network_id        INTEGER NOT NULL REFERENCES tNetwork (network_id),
    group_name        TEXT NOT NULL,
    group_description TEXT,
    status            TEXT NOT NULL DEFAULT 'A',
    cr_date           TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (network_id, group_name)
);

CREATE TABLE IF NOT EXISTS tAttr (
    attr_id          INTEGER PRIMARY KEY,
    attr_name        TEXT NOT NULL,
    attr_dimen       TEXT DEFAULT 'dimensionless',
    attr_description TEXT,
    cr_date          TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (attr_name, attr_dimen)
);

CREATE TABLE IF NOT EXISTS tTemplate (
    template_id   INTEGER PRIMARY KEY,
    template_name TEXT NOT NULL UNIQUE,
    cr_date       TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    created_by    INTEGER REFERENCES tUser (user_id)
);

CREATE TABLE IF NOT EXISTS tTemplateType (
    type_id       INTEGER PRIMARY KEY,
    template_id   INTEGER NOT NULL REFERENCES tTemplate (template_id),
    type_name     TEXT NOT NULL,
    resource_type TEXT,
    cr_date       TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (template_id, type_name, resource_type)
);

CREATE TABLE IF NOT EXISTS tTypeAttr (
    attr_id INTEGER NOT NULL REFERENCES tAttr (attr_id),
    type_id INTEGER NOT NULL REFERENCES tTemplateType (type_id) ON DELETE CASCADE,
    cr_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (attr_id, type_id)
);

CREATE TABLE IF NOT EXISTS tResourceAttr (
    resource_attr_id INTEGER PRIMARY KEY,
    attr_id          INTEGER NOT NULL REFERENCES tAttr (attr_id),
    ref_key          TEXT NOT NULL,
    project_id       INTEGER REFERENCES tProject (project_id),
    network_id       INTEGER REFERENCES tNetwork (network_id),
    node_id          INTEGER REFERENCES tNode (node_id),
    link_id          INTEGER REFERENCES tLink (link_id),
    group_id         INTEGER REFERENCES tResourceGroup (group_id),
    attr_is_var      TEXT NOT NULL DEFAULT 'N',
    cr_date          TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (project_id, attr_id),
    UNIQUE (network_id, attr_id),
    UNIQUE (node_id, attr_id),
    UNIQUE (link_id, attr_id),
    UNIQUE (group_id, attr_id)
);
CREATE INDEX IF NOT EXISTS ix_resourceattr_ref_key ON tResourceAttr (ref_key);

CREATE TABLE IF NOT EXISTS tScenario (
    scenario_id          INTEGER PRIMARY KEY,
    scenario_name        TEXT NOT NULL,
    scenario_description TEXT,
    network_id           INTEGER NOT NULL REFERENCES tNetwork (network_id),
    status               TEXT NOT NULL DEFAULT 'A',
    start_time           TEXT,
    end_time             TEXT,
    time_step            TEXT,
    locked               TEXT NOT NULL DEFAULT 'N',
    cr_date              TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    created_by           INTEGER REFERENCES tUser (user_id),
    UNIQUE (network_id, scenario_name)
);

CREATE TABLE IF NOT EXISTS tDataset (
    dataset_id INTEGER PRIMARY KEY,
    data_type  TEXT NOT NULL,
    data_units TEXT,
    data_dimen TEXT,
    data_name  TEXT NOT NULL,
    data_hash  INTEGER NOT NULL UNIQUE,
    start_time TEXT,
    frequency  TEXT,
    value      BLOB,
    hidden     TEXT NOT NULL DEFAULT 'N',
    cr_date    TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    created_by INTEGER REFERENCES tUser (user_id)
);

CREATE TABLE IF NOT EXISTS tMetadata (
    dataset_id    INTEGER NOT NULL REFERENCES tDataset (dataset_id) ON DELETE CASCADE,
    metadata_name TEXT NOT NULL,
    metadata_val  TEXT NOT NULL,
    PRIMARY KEY (dataset_id, metadata_name)
);

CREATE TABLE IF NOT EXISTS tResourceScenario (
    dataset_id       INTEGER NOT NULL REFERENCES tDataset (dataset_id),
    scenario_id      INTEGER NOT NULL REFERENCES tScenario (scenario_id) ON DELETE CASCADE,
    resource_attr_id INTEGER NOT NULL REFERENCES tResourceAttr (resource_attr_id),
    source           TEXT,
    cr_date          TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (scenario_id, resource_attr_id)
);
CREATE INDEX IF NOT EXISTS ix_resourcescenario_dataset ON tResourceScenario (dataset_id);

CREATE TABLE IF NOT EXISTS tResourceGroupItem (
    item_id     INTEGER PRIMARY KEY,
    ref_key     TEXT NOT NULL,
    node_id     INTEGER REFERENCES tNode (node_id),
    link_id     INTEGER REFERENCES tLink (link_id),
    subgroup_id INTEGER REFERENCES tResourceGroup (group_id),
    group_id    INTEGER REFERENCES tResourceGroup (group_id),
    scenario_id INTEGER NOT NULL REFERENCES tScenario (scenario_id) ON DELETE CASCADE,
    cr_date     TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (group_id, node_id, scenario_id),
    UNIQUE (group_id, link_id, scenario_id),
    UNIQUE (group_id, subgroup_id, scenario_id)
);

CREATE TABLE IF NOT EXISTS tDatasetCollection (
    collection_id   INTEGER PRIMARY KEY,
    collection_name TEXT NOT NULL,
    cr_date         TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS tDatasetCollectionItem (
    collection_id INTEGER NOT NULL REFERENCES tDatasetCollection (collection_id) ON DELETE CASCADE,
    dataset_id    INTEGER NOT NULL REFERENCES tDataset (dataset_id),
    cr_date       TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (collection_id, dataset_id)
);

CREATE TABLE IF NOT EXISTS tRule (
    rule_id          INTEGER PRIMARY KEY,
    rule_name        TEXT NOT NULL,
    rule_description TEXT,
    ref_key          TEXT NOT NULL,
    value            BLOB,
    status           TEXT NOT NULL DEFAULT 'A',
    scenario_id      INTEGER NOT NULL REFERENCES tScenario (scenario_id) ON DELETE CASCADE,
    network_id       INTEGER REFERENCES tNetwork (network_id),
    node_id          INTEGER REFERENCES tNode (node_id),
    link_id          INTEGER REFERENCES tLink (link_id),
    group_id         INTEGER REFERENCES tResourceGroup (group_id),
    cr_date          TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (scenario_id, rule_name)
);

CREATE TABLE IF NOT EXISTS tNote (
    note_id     INTEGER PRIMARY KEY,
    ref_key     TEXT NOT NULL,
    note_text   BLOB,
    created_by  INTEGER REFERENCES tUser (user_id),
    scenario_id INTEGER REFERENCES tScenario (scenario_id) ON DELETE CASCADE,
    project_id  INTEGER REFERENCES tProject (project_id),
    network_id  INTEGER REFERENCES tNetwork (network_id),
    node_id     INTEGER REFERENCES tNode (node_id),
    link_id     INTEGER REFERENCES tLink (link_id),
    group_id    INTEGER REFERENCES tResourceGroup (group_id),
    cr_date     TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS tProjectOwner (
    user_id    INTEGER NOT NULL REFERENCES tUser (user_id),
    project_id INTEGER NOT NULL REFERENCES tProject (project_id) ON DELETE CASCADE,
    view       TEXT NOT NULL,
    edit       TEXT NOT NULL,
    share      TEXT NOT NULL,
    cr_date    TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (user_id, project_id)
);

CREATE TABLE IF NOT EXISTS tNetworkOwner (
    user_id    INTEGER NOT NULL REFERENCES tUser (user_id),
    network_id INTEGER NOT NULL REFERENCES tNetwork (network_id) ON DELETE CASCADE,
    view       TEXT NOT NULL,
    edit       TEXT NOT NULL,
    share      TEXT NOT NULL,
    cr_date    TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (user_id, network_id)
);

CREATE TABLE IF NOT EXISTS tTemplateOwner (
    user_id     INTEGER NOT NULL REFERENCES tUser (user_id),
    template_id INTEGER NOT NULL REFERENCES tTemplate (template_id) ON DELETE CASCADE,
    view        TEXT NOT NULL,
    edit        TEXT NOT NULL,
    share       TEXT NOT NULL,
    cr_date     TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (user_id, template_id)
);

CREATE TABLE IF NOT EXISTS tDatasetOwner (
    user_id    INTEGER NOT NULL REFERENCES tUser (user_id),
    dataset_id INTEGER NOT NULL REFERENCES tDataset (dataset_id) ON DELETE CASCADE,
    view       TEXT NOT NULL,
    edit       TEXT NOT NULL,
    share      TEXT NOT NULL,
    cr_date    TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (user_id, dataset_id)
);

CREATE TABLE IF NOT EXISTS tPerm (
    perm_id   INTEGER PRIMARY KEY,
    perm_code TEXT NOT NULL,
    perm_name TEXT NOT NULL,
    cr_date   TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS tRole (
    role_id   INTEGER PRIMARY KEY,
    role_code TEXT NOT NULL,
    role_name TEXT NOT NULL,
    cr_date   TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS tRolePerm (
    perm_id INTEGER NOT NULL REFERENCES tPerm (perm_id),
    role_id INTEGER NOT NULL REFERENCES tRole (role_id),
    cr_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (perm_id, role_id)
);

CREATE TABLE IF NOT EXISTS tRoleUser (
    user_id INTEGER NOT NULL REFERENCES tUser (user_id),
    role_id INTEGER NOT NULL REFERENCES tRole (role_id),
    cr_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (user_id, role_id)
);

CREATE TABLE IF NOT EXISTS tAttrMap (
    attr_id_a INTEGER NOT NULL REFERENCES tAttr (attr_id),
    attr_id_b INTEGER NOT NULL REFERENCES tAttr (attr_id),
    PRIMARY KEY (attr_id_a, attr_id_b)
);

CREATE TABLE IF NOT EXISTS tResourceAttrMap (
    network_a_id       INTEGER NOT NULL REFERENCES tNetwork (network_id),
    network_b_id       INTEGER NOT NULL REFERENCES tNetwork (network_id),
    resource_attr_id_a INTEGER NOT NULL REFERENCES tResourceAttr (resource_attr_id),
    resource_attr_id_b INTEGER NOT NULL REFERENCES tResourceAttr (resource_attr_id),
    PRIMARY KEY (network_a_id, network_b_id, resource_attr_id_a, resource_attr_id_b)
);
";

// ============================================================================
// SECTION: Schema Application
// ============================================================================

/// Applies the schema to a connection and stamps the schema version.
///
/// # Errors
///
/// Returns the underlying database error when DDL execution fails.
pub fn apply(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)?;
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current == 0 {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}

/// Reads the stamped schema version.
///
/// # Errors
///
/// Returns the underlying database error when the pragma read fails.
pub fn version(conn: &Connection) -> Result<i64, rusqlite::Error> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

//! Schema migration: a single versioned DDL application tracked by
//! `PRAGMA user_version`, the same mechanism the teacher workspace uses.

use rusqlite::Connection;

use crate::{schema, Result, StoreError};

pub const SCHEMA_VERSION: u32 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    let version: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(StoreError::Sqlite)?;

    if version == 0 {
        conn.execute_batch(schema::SCHEMA_SQL)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    } else if version != SCHEMA_VERSION {
        return Err(StoreError::Corrupt(format!(
            "unsupported schema version {version}, expected {SCHEMA_VERSION}"
        )));
    }
    Ok(())
}

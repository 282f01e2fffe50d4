//! `documents` table layout and its version stamp.

use super::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// Value kept in `PRAGMA user_version` once the table exists.
pub const SCHEMA_VERSION: u32 = 1;

const CREATE_DOCUMENTS: &str = include_str!("documents.sql");

/// Creates the `documents` table on an unstamped database and stamps it.
///
/// A current file is left untouched. The create statement tolerates a table
/// that already exists, so an unstamped file keeps its rows.
pub fn ensure_schema(conn: &mut Connection) -> DbResult<()> {
    let found = schema_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(DbError::SchemaTooNew {
            found,
            supported: SCHEMA_VERSION,
        });
    }
    if found == SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    tx.execute_batch(CREATE_DOCUMENTS)?;
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;
    info!("event=db_schema module=db status=ok from_version={found} version={SCHEMA_VERSION}");
    Ok(())
}

/// Reads the stamped schema version; 0 for a fresh file.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

//! Local plan database.
//!
//! One table, `documents`, maps a document path to its JSON body. The
//! schema version lives in `PRAGMA user_version`; a file stamped by a newer
//! build is refused instead of being read with the wrong layout.

mod open;
pub mod schema;

use std::error::Error;
use std::fmt::{Display, Formatter};

pub use open::{open_db, open_db_in_memory};
pub use schema::SCHEMA_VERSION;

pub type DbResult<T> = Result<T, DbError>;

/// Failure opening or preparing the plan database.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file carries a schema this build cannot read.
    SchemaTooNew { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "plan database error: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "plan database uses schema v{found}; this build reads up to v{supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

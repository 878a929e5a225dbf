use std::path::Path;

use ratchet_common::{Error, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Pragmas applied to every connection this crate opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseOptions {
    pub journal_mode: String,
    pub foreign_keys: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            journal_mode: "WAL".to_string(),
            foreign_keys: true,
        }
    }
}

impl DatabaseOptions {
    fn pragma_batch(&self) -> Result<String> {
        let mode = self.journal_mode.to_ascii_uppercase();
        if !matches!(
            mode.as_str(),
            "DELETE" | "TRUNCATE" | "PERSIST" | "MEMORY" | "WAL" | "OFF"
        ) {
            return Err(Error::Config(format!(
                "unsupported journal_mode: {}",
                self.journal_mode
            )));
        }
        let fk = if self.foreign_keys { "ON" } else { "OFF" };
        Ok(format!("PRAGMA journal_mode={mode}; PRAGMA foreign_keys={fk};"))
    }
}

/// Open (creating if needed) the database file at `db_path`.
pub fn open_database(db_path: &Path, options: &DatabaseOptions) -> Result<Connection> {
    info!("opening database at {}", db_path.display());
    let pragmas = options.pragma_batch()?;
    let conn = Connection::open(db_path)
        .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;

    conn.execute_batch(&pragmas)
        .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;
    Ok(conn)
}

pub fn open_in_memory(options: &DatabaseOptions) -> Result<Connection> {
    let pragmas = options.pragma_batch()?;
    let conn = Connection::open_in_memory()
        .map_err(|e| Error::Database(format!("failed to open in-memory database: {e}")))?;

    conn.execute_batch(&pragmas)
        .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;
    Ok(conn)
}

use rusqlite::Connection;
use serde::Serialize;

use crate::migrations::Migration;
use crate::version::get_version;

/// Snapshot of how far a database is behind a migration sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub current: u32,
    pub latest: u32,
    pub pending: u32,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.pending == 0
    }

    /// The database was migrated by a longer sequence than the one supplied.
    pub fn is_ahead(&self) -> bool {
        self.current > self.latest
    }
}

/// Compare the persisted version with `migrations` without touching anything.
pub fn status(conn: &Connection, migrations: &[Migration]) -> rusqlite::Result<MigrationStatus> {
    let current = get_version(conn)?;
    let latest = u32::try_from(migrations.len()).unwrap_or(u32::MAX);
    Ok(MigrationStatus {
        current,
        latest,
        pending: latest.saturating_sub(current),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::migrate;
    use crate::version::set_version;

    #[test]
    fn fresh_database_has_everything_pending() {
        let conn = Connection::open_in_memory().unwrap();
        let migrations = Migration::sql_sequence(["SELECT 1", "SELECT 2", "SELECT 3"]);

        let st = status(&conn, &migrations).unwrap();
        assert_eq!(
            st,
            MigrationStatus {
                current: 0,
                latest: 3,
                pending: 3
            }
        );
        assert!(!st.is_up_to_date());
    }

    #[test]
    fn up_to_date_after_migrate() {
        let conn = Connection::open_in_memory().unwrap();
        let migrations = Migration::sql_sequence(["CREATE TABLE a (id INTEGER)"]);
        assert!(migrate(&conn, &migrations).is_success());

        let st = status(&conn, &migrations).unwrap();
        assert!(st.is_up_to_date());
        assert!(!st.is_ahead());
    }

    #[test]
    fn ahead_when_sequence_is_shorter() {
        let conn = Connection::open_in_memory().unwrap();
        set_version(&conn, 4).unwrap();
        let migrations = Migration::sql_sequence(["SELECT 1"]);

        let st = status(&conn, &migrations).unwrap();
        assert_eq!(st.pending, 0);
        assert!(st.is_ahead());
    }
}

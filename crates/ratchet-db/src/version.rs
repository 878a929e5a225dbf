//! Persisted schema version.
//!
//! The version lives in SQLite's `user_version` header slot rather than in a
//! table, so tracking migrations leaves no schema footprint. Both functions
//! run on whatever connection they are handed; when that connection has an
//! open transaction the write rolls back with it.

use rusqlite::{Connection, Error};

const PRAGMA: &str = "user_version";

/// Read the persisted version. A freshly created database reads as `0`.
///
/// A negative value (only reachable by writing the pragma by hand) is
/// reported as an out-of-range error instead of wrapping.
pub fn get_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.pragma_query_value(None, PRAGMA, |row| row.get::<_, u32>(0))
}

/// Overwrite the persisted version.
///
/// No ordering checks happen here; keeping the value monotonic is the
/// runner's job. `user_version` is a signed 32-bit field, so anything above
/// `i32::MAX` is rejected.
pub fn set_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    let value = i32::try_from(version).map_err(|e| Error::ToSqlConversionFailure(Box::new(e)))?;
    conn.pragma_update(None, PRAGMA, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reads_zero() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_version(&conn).unwrap(), 0);
    }

    #[test]
    fn set_then_get_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        set_version(&conn, 7).unwrap();
        assert_eq!(get_version(&conn).unwrap(), 7);

        // Not monotonic: the store accepts whatever it is given.
        set_version(&conn, 2).unwrap();
        assert_eq!(get_version(&conn).unwrap(), 2);
    }

    #[test]
    fn write_inside_rolled_back_transaction_is_undone() {
        let conn = Connection::open_in_memory().unwrap();
        set_version(&conn, 1).unwrap();

        let tx = conn.unchecked_transaction().unwrap();
        set_version(&tx, 5).unwrap();
        assert_eq!(get_version(&tx).unwrap(), 5);
        tx.rollback().unwrap();

        assert_eq!(get_version(&conn).unwrap(), 1);
    }

    #[test]
    fn rejects_values_outside_pragma_range() {
        let conn = Connection::open_in_memory().unwrap();
        let err = set_version(&conn, u32::MAX).unwrap_err();
        assert!(matches!(err, Error::ToSqlConversionFailure(_)));
        assert_eq!(get_version(&conn).unwrap(), 0);
    }

    #[test]
    fn negative_stored_value_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA user_version = -3").unwrap();
        assert!(get_version(&conn).is_err());
    }
}

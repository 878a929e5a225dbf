//! Loading SQL migrations from a directory.
//!
//! Files are named `<number>_<description>.sql` (or `<number>.sql`). The
//! number is the version the file produces, so the set must be exactly
//! `1..=n`.

use std::fs;
use std::path::Path;

use ratchet_common::{Error, Result};
use tracing::debug;

use crate::migrations::Migration;

/// Read every `*.sql` file in `dir` as a numbered migration.
pub fn load_dir(dir: &Path) -> Result<Vec<Migration>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != "sql") {
            continue;
        }
        let index = parse_index(&path)?;
        files.push((index, path));
    }
    files.sort_by_key(|(index, _)| *index);

    let mut migrations = Vec::with_capacity(files.len());
    for (position, (index, path)) in files.into_iter().enumerate() {
        let expected = position as u32 + 1;
        if index != expected {
            return Err(Error::Migration(if index < expected {
                format!("duplicate migration number {index} at {}", path.display())
            } else {
                format!(
                    "missing migration {expected}: next file is {}",
                    path.display()
                )
            }));
        }
        let sql = fs::read_to_string(&path)?;
        debug!("loaded migration {index} from {}", path.display());
        migrations.push(Migration::sql(index, sql));
    }
    Ok(migrations)
}

fn parse_index(path: &Path) -> Result<u32> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Migration(format!("invalid file name: {}", path.display())))?;

    let digits_end = stem
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(stem.len());
    let (digits, rest) = stem.split_at(digits_end);
    if digits.is_empty() || !(rest.is_empty() || rest.starts_with('_')) {
        return Err(Error::Migration(format!(
            "migration file must start with a version number: {}",
            path.display()
        )));
    }

    match digits.parse::<u32>() {
        Ok(0) | Err(_) => Err(Error::Migration(format!(
            "migration number out of range in {}",
            path.display()
        ))),
        Ok(index) => Ok(index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::migrate;
    use rusqlite::Connection;

    #[test]
    fn loads_in_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        let dir = dir.path();
        fs::write(dir.join("0002_posts.sql"), "CREATE TABLE posts (id INTEGER);").unwrap();
        fs::write(dir.join("10_tags.sql"), "CREATE TABLE tags10 (id INTEGER);").unwrap();
        fs::write(dir.join("0001_users.sql"), "CREATE TABLE users (id INTEGER);").unwrap();
        for n in 3..10 {
            fs::write(dir.join(format!("{n}.sql")), format!("CREATE TABLE t{n} (id INTEGER);"))
                .unwrap();
        }
        fs::write(dir.join("README.md"), "not a migration").unwrap();

        let migrations = load_dir(dir).unwrap();
        let indices: Vec<u32> = migrations.iter().map(Migration::index).collect();
        assert_eq!(indices, (1..=10).collect::<Vec<_>>());

        let conn = Connection::open_in_memory().unwrap();
        let receipt = migrate(&conn, &migrations);
        assert_eq!(receipt.version, 10);
        assert!(receipt.is_success());
    }

    #[test]
    fn empty_directory_yields_no_migrations() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_dir(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn gap_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("0001_a.sql"), "SELECT 1;").unwrap();
        fs::write(dir.path().join("0003_c.sql"), "SELECT 1;").unwrap();

        let err = load_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("missing migration 2"), "{err}");
    }

    #[test]
    fn duplicate_number_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("0001_a.sql"), "SELECT 1;").unwrap();
        fs::write(dir.path().join("1_b.sql"), "SELECT 1;").unwrap();

        let err = load_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("duplicate migration number 1"), "{err}");
    }

    #[test]
    fn malformed_names_are_rejected() {
        for name in ["create_users.sql", "0000_init.sql", "1.5.sql", "2a_users.sql"] {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join(name), "SELECT 1;").unwrap();
            assert!(
                matches!(load_dir(dir.path()), Err(Error::Migration(_))),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_dir(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}

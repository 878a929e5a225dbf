//! Migration runner for tracking and applying forward-only schema changes.
//!
//! Each migration carries the version it produces and a body that runs
//! against the connection. Migrations are applied in order, each in its own
//! transaction, and progress is recorded through [`crate::version`].

use std::borrow::Cow;
use std::fmt;

use rusqlite::Connection;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::version::{get_version, set_version};

/// Opaque error returned by a migration body.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

type ApplyFn = dyn Fn(&Connection) -> Result<(), BoxError>;

/// A single schema change, tagged with the version it produces.
///
/// The migration at position `i` of a sequence must carry index `i + 1`.
pub struct Migration {
    index: u32,
    apply: Box<ApplyFn>,
}

impl Migration {
    pub fn new<F>(index: u32, apply: F) -> Self
    where
        F: Fn(&Connection) -> Result<(), BoxError> + 'static,
    {
        Self {
            index,
            apply: Box::new(apply),
        }
    }

    /// A migration whose body is a batch of SQL statements.
    pub fn sql(index: u32, script: impl Into<Cow<'static, str>>) -> Self {
        let script = script.into();
        Self::new(index, move |conn| {
            conn.execute_batch(&script)?;
            Ok(())
        })
    }

    /// Number a list of SQL scripts `1..=n` in the order given.
    pub fn sql_sequence<I, S>(scripts: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Cow<'static, str>>,
    {
        scripts
            .into_iter()
            .zip(1u32..)
            .map(|(script, index)| Self::sql(index, script))
            .collect()
    }

    /// The version this migration brings the database to.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn apply(&self, conn: &Connection) -> Result<(), BoxError> {
        (self.apply)(conn)
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

/// Why a run stopped early. Variants wrapping a database or body failure
/// keep the underlying cause as their `source`.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration at position {position} is tagged with version {index}, expected {}", .position + 1)]
    OutOfOrder { position: usize, index: u32 },

    #[error("failed to read schema version: {0}")]
    VersionRead(#[source] rusqlite::Error),

    #[error("failed to begin transaction for migration {version}: {source}")]
    BeginFailed {
        version: u32,
        #[source]
        source: rusqlite::Error,
    },

    #[error("migration {version} failed: {source}")]
    StatementFailed {
        version: u32,
        #[source]
        source: BoxError,
    },

    #[error("failed to record schema version {version}: {source}")]
    VersionWriteFailed {
        version: u32,
        #[source]
        source: rusqlite::Error,
    },

    #[error("migration {version} ended its own transaction")]
    TransactionClosed { version: u32 },

    #[error("failed to commit migration {version}: {source}")]
    CommitFailed {
        version: u32,
        #[source]
        source: rusqlite::Error,
    },

    #[error("rollback of migration {version} failed ({source}) after: {cause}")]
    TransactionAbortFailed {
        version: u32,
        cause: Box<MigrationError>,
        #[source]
        source: rusqlite::Error,
    },
}

impl MigrationError {
    /// Target version of the migration that failed, when one was involved.
    pub fn version(&self) -> Option<u32> {
        match self {
            Self::OutOfOrder { index, .. } => Some(*index),
            Self::VersionRead(_) => None,
            Self::BeginFailed { version, .. }
            | Self::StatementFailed { version, .. }
            | Self::VersionWriteFailed { version, .. }
            | Self::TransactionClosed { version }
            | Self::CommitFailed { version, .. }
            | Self::TransactionAbortFailed { version, .. } => Some(*version),
        }
    }
}

/// Outcome of one [`migrate`] call.
#[derive(Debug)]
pub struct MigrationReceipt {
    /// Version persisted when the run started.
    pub from_version: u32,
    /// Last version successfully reached.
    pub version: u32,
    /// Set when the run stopped on a failure.
    pub error: Option<MigrationError>,
}

impl MigrationReceipt {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Number of migrations committed during this run.
    pub fn applied(&self) -> u32 {
        self.version.saturating_sub(self.from_version)
    }

    pub fn into_result(self) -> Result<u32, MigrationError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.version),
        }
    }
}

/// Apply every migration whose index is above the persisted version.
///
/// Each pending migration runs in its own transaction together with the
/// version bump. The first failure rolls that transaction back and ends the
/// run; the receipt then reports the last committed version and the cause.
/// This function never returns early through `Err`.
pub fn migrate(conn: &Connection, migrations: &[Migration]) -> MigrationReceipt {
    let current = match get_version(conn) {
        Ok(v) => v,
        Err(e) => {
            warn!("could not read schema version: {e}");
            return MigrationReceipt {
                from_version: 0,
                version: 0,
                error: Some(MigrationError::VersionRead(e)),
            };
        }
    };

    let receipt = |version, error| MigrationReceipt {
        from_version: current,
        version,
        error,
    };

    if let Some(err) = check_sequence(migrations) {
        warn!("refusing to migrate: {err}");
        return receipt(current, Some(err));
    }

    if current as usize > migrations.len() {
        warn!(
            "database is at version {current} but only {} migrations are known",
            migrations.len()
        );
        return receipt(current, None);
    }

    let mut reached = current;
    for migration in migrations {
        let target = migration.index();
        if target <= current {
            debug!("skipping migration {target} (already applied)");
            continue;
        }

        if let Err(e) = apply_one(conn, migration) {
            warn!("migration {target} rolled back: {e}");
            return receipt(reached, Some(e));
        }
        info!("applied migration {target}");
        reached = target;
    }

    if reached > current {
        info!("database migrated from version {current} to {reached}");
    } else {
        debug!("database already at version {current}");
    }
    receipt(reached, None)
}

fn check_sequence(migrations: &[Migration]) -> Option<MigrationError> {
    migrations
        .iter()
        .enumerate()
        .find(|(position, m)| m.index() as usize != position + 1)
        .map(|(position, m)| MigrationError::OutOfOrder {
            position,
            index: m.index(),
        })
}

fn apply_one(conn: &Connection, migration: &Migration) -> Result<(), MigrationError> {
    let version = migration.index();
    let tx = conn
        .unchecked_transaction()
        .map_err(|source| MigrationError::BeginFailed { version, source })?;

    let outcome = migration
        .apply(&tx)
        .map_err(|source| MigrationError::StatementFailed { version, source });

    // A body that issued COMMIT or ROLLBACK left nothing to attach the
    // version write to; writing it now would persist it in autocommit.
    if outcome.is_ok() && tx.is_autocommit() {
        return Err(MigrationError::TransactionClosed { version });
    }

    let outcome = outcome.and_then(|()| {
        set_version(&tx, version)
            .map_err(|source| MigrationError::VersionWriteFailed { version, source })
    });

    match outcome {
        // A failed COMMIT drops the transaction, which rolls it back.
        Ok(()) => tx
            .commit()
            .map_err(|source| MigrationError::CommitFailed { version, source }),
        Err(cause) => match tx.rollback() {
            Ok(()) => Err(cause),
            Err(source) => Err(MigrationError::TransactionAbortFailed {
                version,
                cause: Box::new(cause),
                source,
            }),
        },
    }
}

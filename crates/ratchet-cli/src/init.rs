use std::path::Path;

use anyhow::{Context, Result};
use ratchet_config::{AppConfig, ConfigLoader};
use tracing::info;

const FIRST_MIGRATION: &str = "0001_initial.sql";

const TEMPLATE: &str = "\
-- Migration 1. Runs once, inside its own transaction.
-- Add later changes as 0002_<name>.sql, 0003_<name>.sql, ...
-- Never edit a migration after it has been applied.
";

/// Write a starter `config.yml` and `migrations/0001_initial.sql` into `dir`.
/// Files that already exist are left alone.
pub fn run_init(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let config = AppConfig::default();
    let config_path = dir.join("config.yml");
    if config_path.exists() {
        println!("  {} already exists, keeping it", config_path.display());
    } else {
        let yaml = ConfigLoader::to_yaml(&config)?;
        std::fs::write(&config_path, &yaml)
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        info!("config written to {}", config_path.display());
        println!("  Config written to {}", config_path.display());
    }

    let migrations_dir = dir.join(&config.migrations.directory);
    std::fs::create_dir_all(&migrations_dir)
        .with_context(|| format!("failed to create {}", migrations_dir.display()))?;

    let has_sql = std::fs::read_dir(&migrations_dir)?
        .filter_map(|e| e.ok())
        .any(|e| e.path().extension().is_some_and(|x| x == "sql"));
    if !has_sql {
        let first = migrations_dir.join(FIRST_MIGRATION);
        std::fs::write(&first, TEMPLATE)
            .with_context(|| format!("failed to write {}", first.display()))?;
        println!("  Template written to {}", first.display());
    }

    println!("  Run `ratchet migrate` to apply pending migrations.");
    Ok(())
}

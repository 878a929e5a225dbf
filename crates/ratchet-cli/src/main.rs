mod init;
mod report;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use ratchet_config::{AppConfig, ConfigLoader, LogConfig, LogFormat};
use ratchet_db::{DatabaseOptions, Migration, load_dir, migrate, open_database, status};
use rusqlite::Connection;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ratchet", version, about = "Forward-only SQLite schema migrations")]
struct Cli {
    /// Config file (YAML or TOML). Defaults to ./config.yml, then ~/.config/ratchet.
    #[arg(long, global = true, env = "RATCHET_CONFIG")]
    config: Option<PathBuf>,

    /// Database file to migrate.
    #[arg(long, global = true, env = "RATCHET_DATABASE")]
    database: Option<PathBuf>,

    /// Directory of NNNN_name.sql migration files.
    #[arg(long, global = true, env = "RATCHET_MIGRATIONS")]
    migrations: Option<PathBuf>,

    /// Print machine-readable JSON instead of a summary box.
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write a starter config.yml and migrations directory.
    Init {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Show the current, latest, and pending versions.
    Status,
    /// Apply every pending migration.
    Migrate,
}

fn main() -> Result<ExitCode> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    run(&cli)
}

fn run(cli: &Cli) -> Result<ExitCode> {
    match &cli.command {
        // No config or database is needed to scaffold a project.
        Command::Init { dir } => {
            init_tracing(&LogConfig::default(), cli.verbose);
            init::run_init(dir)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => {
            let config = configure(cli)?;
            let (conn, migrations) = open_target(&config)?;
            let st = status(&conn, &migrations).context("failed to read schema version")?;
            report::print_status(&config.database.path, &st, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Migrate => {
            let config = configure(cli)?;
            let (conn, migrations) = open_target(&config)?;
            let receipt = migrate(&conn, &migrations);
            report::print_receipt(&config.database.path, &receipt, cli.json)?;
            if receipt.is_success() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn configure(cli: &Cli) -> Result<AppConfig> {
    let config = resolve_config(cli)?;
    init_tracing(&config.log, cli.verbose);
    Ok(config)
}

/// Config file values, overridden by flags and environment variables.
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => load_default_config()?,
    };

    if let Some(database) = &cli.database {
        config.database.path = database.clone();
    }
    if let Some(migrations) = &cli.migrations {
        config.migrations.directory = migrations.clone();
    }
    Ok(config)
}

fn load_default_config() -> Result<AppConfig> {
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    let dirs = std::iter::once(cwd).chain(ConfigLoader::default_config_dir());
    for dir in dirs {
        if let Some(path) = ConfigLoader::find_in(&dir) {
            return ConfigLoader::load(&path)
                .with_context(|| format!("failed to load config from {}", path.display()));
        }
    }
    Ok(AppConfig::default())
}

fn init_tracing(log: &LogConfig, verbose: u8) {
    let default_filter = match verbose {
        0 => log.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    // Only the first subscriber wins; later calls in the same process are no-ops.
    let _ = match log.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
}

fn open_target(config: &AppConfig) -> Result<(Connection, Vec<Migration>)> {
    let migrations = load_migrations(&config.migrations.directory)?;
    debug!("{} migrations found", migrations.len());

    let options = DatabaseOptions {
        journal_mode: config.database.journal_mode.clone(),
        foreign_keys: config.database.foreign_keys,
    };
    let conn = open_database(&config.database.path, &options)
        .with_context(|| format!("failed to open {}", config.database.path.display()))?;
    Ok((conn, migrations))
}

fn load_migrations(dir: &Path) -> Result<Vec<Migration>> {
    info!("loading migrations from {}", dir.display());
    load_dir(dir).with_context(|| format!("failed to load migrations from {}", dir.display()))
}

//! Sqlock CLI - distributed locks over a shared SQLite database

use clap::{Parser, Subcommand};
use serde_json::json;
use sqlock_core::Error;
use sqlock_core::config::Config;
use sqlock_core::domain::locking::{
    LockHandle, LockRow, LockStore, LockType, LockingMechanismRegistry,
    SqliteDistributedLockingMechanism, ids,
};
use sqlock_core::domain::scope::ScopeProvider;
use sqlock_core::storage::{Database, DatabaseConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "sqlock")]
#[command(author, version, about = "Distributed locks over a shared SQLite database", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database file (defaults to the configured connection string)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and seed the well-known lock rows
    Init,

    /// Inspect lock rows
    Locks {
        #[command(subcommand)]
        action: LocksAction,
    },

    /// Acquire a lock inside a scope, optionally hold it, then commit
    Lock {
        #[command(subcommand)]
        action: LockAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum LocksAction {
    /// List all lock rows
    List,
}

#[derive(Subcommand)]
enum LockAction {
    /// Take a shared lock
    Read {
        /// Lock id
        #[arg(allow_hyphen_values = true)]
        id: i32,
        #[command(flatten)]
        options: LockOptions,
    },
    /// Take an exclusive lock
    Write {
        /// Lock id
        #[arg(allow_hyphen_values = true)]
        id: i32,
        #[command(flatten)]
        options: LockOptions,
    },
}

#[derive(clap::Args)]
struct LockOptions {
    /// Lock timeout in milliseconds (defaults to the configured timeout)
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Keep the scope open this long before committing
    #[arg(long, default_value_t = 0)]
    hold_ms: u64,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show the config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sqlock=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let format = cli.format;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Init => cmd_init(cli.database, format, quiet).await,
        Commands::Locks { action } => cmd_locks(cli.database, action, format).await,
        Commands::Lock { action } => cmd_lock(cli.database, action, format, quiet).await,
        Commands::Config { action } => cmd_config(action, quiet),
        Commands::Doctor => cmd_doctor(cli.database, quiet).await,
    }
}

// ============================================================================
// Wiring
// ============================================================================

/// Database and mechanism for one invocation
///
/// `--database` wins over the configured connection string; the mechanism is
/// pointed at whichever database was opened.
struct Session {
    config: Config,
    db: Database,
    registry: LockingMechanismRegistry,
}

impl Session {
    async fn open(database: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = Config::load()?;
        config.validate()?;

        let db_config = match database {
            Some(path) => DatabaseConfig::with_path(path)
                .max_connections(config.database.max_connections)
                .busy_timeout(config.database.busy_timeout()),
            None if config.database.resolved_connection_string().is_some() => {
                DatabaseConfig::from_config(&config)?
            }
            None => DatabaseConfig::default()
                .max_connections(config.database.max_connections)
                .busy_timeout(config.database.busy_timeout()),
        };
        config.database.connection_string = Some(format!("sqlite:{}", db_config.path.display()));
        debug!(path = %db_config.path.display(), "Opening database");

        let db = Database::new(db_config).await?;
        let mechanism = SqliteDistributedLockingMechanism::new(
            config.database.connection_string.clone(),
            config.database.provider_name.clone(),
            config.locking.clone(),
        );
        let registry = LockingMechanismRegistry::new().with(Arc::new(mechanism));

        Ok(Self {
            config,
            db,
            registry,
        })
    }

    fn scopes(&self) -> ScopeProvider {
        ScopeProvider::from_database(&self.db)
    }
}

/// Attach the error code and suggestion to a lock error
fn lock_error(err: Error) -> anyhow::Error {
    match err.suggestion() {
        Some(hint) => anyhow::anyhow!("[{}] {}\n  hint: {}", err.code(), err, hint),
        None => anyhow::anyhow!("[{}] {}", err.code(), err),
    }
}

fn lock_name(lock_id: i32) -> &'static str {
    ids::name_of(lock_id).unwrap_or("-")
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_init(
    database: Option<PathBuf>,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let session = Session::open(database).await?;
    let status = session.db.migration_status().await?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "path": session.db.path().display().to_string(),
                "schema_version": status.current_version,
                "journal_mode": session.db.journal_mode().await?,
            })
        ),
        OutputFormat::Text => {
            if !quiet {
                println!("Database initialized");
                println!("  Path: {}", session.db.path().display());
                println!("  Schema: v{}", status.current_version);
                println!("  Journal mode: {}", session.db.journal_mode().await?);
            }
        }
    }

    session.db.close().await;
    Ok(())
}

async fn cmd_locks(
    database: Option<PathBuf>,
    action: LocksAction,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let session = Session::open(database).await?;

    match action {
        LocksAction::List => {
            let rows: Vec<LockRow> = session
                .scopes()
                .run(LockStore::list)
                .await
                .map_err(lock_error)?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
                OutputFormat::Text => {
                    println!("{:>8}  {:>5}  NAME", "ID", "VALUE");
                    for row in &rows {
                        println!("{:>8}  {:>5}  {}", row.id, row.value, row.name);
                    }
                }
            }
        }
    }

    session.db.close().await;
    Ok(())
}

async fn cmd_lock(
    database: Option<PathBuf>,
    action: LockAction,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let (lock_type, lock_id, options) = match action {
        LockAction::Read { id, options } => (LockType::ReadLock, id, options),
        LockAction::Write { id, options } => (LockType::WriteLock, id, options),
    };
    let timeout = options.timeout_ms.map(Duration::from_millis);
    let hold = Duration::from_millis(options.hold_ms);

    let session = Session::open(database).await?;
    let registry = &session.registry;

    let acquired = session
        .scopes()
        .run(|| async move {
            let mechanism = registry.select()?;
            let handle: LockHandle = match lock_type {
                LockType::ReadLock => mechanism.read_lock(lock_id, timeout).await?,
                LockType::WriteLock => mechanism.write_lock(lock_id, timeout).await?,
            };
            if !hold.is_zero() {
                tokio::time::sleep(hold).await;
            }
            Ok((handle.scope_id(), handle.holder().to_string(), handle.acquired_at()))
        })
        .await;

    let (scope_id, holder, acquired_at) = match acquired {
        Ok(acquired) => acquired,
        Err(err) => {
            if err.is_retryable() {
                warn!(lock_id = lock_id, lock_type = %lock_type, "Lock not acquired");
            }
            session.db.close().await;
            return Err(lock_error(err));
        }
    };

    let timeout_ms = timeout
        .unwrap_or_else(|| match lock_type {
            LockType::ReadLock => session.config.locking.read_lock_timeout(),
            LockType::WriteLock => session.config.locking.write_lock_timeout(),
        })
        .as_millis() as u64;

    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "lock_id": lock_id,
                "name": ids::name_of(lock_id),
                "lock_type": lock_type,
                "scope_id": scope_id.to_string(),
                "holder": holder,
                "acquired_at": acquired_at.to_rfc3339(),
                "timeout_ms": timeout_ms,
                "held_ms": options.hold_ms,
            })
        ),
        OutputFormat::Text => {
            if !quiet {
                println!(
                    "Acquired {} on lock {} ({})",
                    lock_type,
                    lock_id,
                    lock_name(lock_id)
                );
                println!("  Scope: {}", scope_id);
                println!("  Holder: {}", holder);
                if options.hold_ms > 0 {
                    println!("  Held for {}ms", options.hold_ms);
                }
                println!("Released on commit");
            }
        }
    }

    session.db.close().await;
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            for (key, value) in config.list()? {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn cmd_doctor(database: Option<PathBuf>, quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("Sqlock Health Check");
        println!("===================");
        println!();
    }

    let mut all_ok = true;

    match Config::load().and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
                println!(
                    "     Provider: {} (read {}ms, write {}ms)",
                    config.database.provider_name,
                    config.locking.read_lock_timeout_ms,
                    config.locking.write_lock_timeout_ms
                );
            }
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Configuration: Error - {}", e);
            }
        }
    }

    if !quiet {
        match Config::config_path() {
            Ok(path) if path.exists() => println!("[OK] Config file: {}", path.display()),
            Ok(path) => println!("[--] Config file: {} (using defaults)", path.display()),
            Err(e) => println!("[!!] Config file: Error - {}", e),
        }
    }

    match Session::open(database).await {
        Ok(session) => {
            let db = &session.db;
            match db.health_check().await {
                Ok(()) => {
                    if !quiet {
                        println!("[OK] Database: Connected");
                        println!("     Path: {}", db.path().display());
                    }
                }
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] Database: Health check failed - {}", e);
                    }
                }
            }

            match db.journal_mode().await {
                Ok(mode) if mode.eq_ignore_ascii_case("wal") => {
                    if !quiet {
                        println!("[OK] Journal mode: {}", mode);
                    }
                }
                Ok(mode) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] Journal mode: {} (WAL required)", mode);
                    }
                }
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] Journal mode: Error - {}", e);
                    }
                }
            }

            match db.migration_status().await {
                Ok(status) if status.needs_migration => {
                    all_ok = false;
                    if !quiet {
                        println!(
                            "[!!] Database: Migrations pending (v{} -> v{})",
                            status.current_version, status.target_version
                        );
                    }
                }
                Ok(status) => {
                    if !quiet {
                        println!("[OK] Database: Schema v{}", status.current_version);
                    }
                }
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] Database: Migration check failed - {}", e);
                    }
                }
            }

            let missing: Vec<i32> = match session.scopes().run(LockStore::list).await {
                Ok(rows) => ids::WELL_KNOWN_LOCKS
                    .iter()
                    .map(|(id, _)| *id)
                    .filter(|id| !rows.iter().any(|row| row.id == *id))
                    .collect(),
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] Lock rows: Error - {}", e);
                    }
                    Vec::new()
                }
            };
            if missing.is_empty() {
                if !quiet {
                    println!("[OK] Lock rows: {} well-known ids seeded", ids::WELL_KNOWN_LOCKS.len());
                }
            } else {
                all_ok = false;
                if !quiet {
                    println!("[!!] Lock rows: missing {:?}", missing);
                }
            }

            db.close().await;
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Database: Failed to initialize - {}", e);
            }
        }
    }

    if !quiet {
        println!();
        if all_ok {
            println!("All checks passed!");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }

    Ok(())
}

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use spacegate_core::config::Config;
use spacegate_core::core_access::hash_password;
use spacegate_core::core_credentials::SecretSealer;
use spacegate_core::core_space::{
    allowed_transitions, can_transition, SpaceAdmin, SpaceId, SpaceStatus, SystemClock,
};
use spacegate_core::core_store::SqlPortalStore;
use spacegate_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use spacegate_core::metrics::init_metrics;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "spacegate")]
#[command(author, version, about = "Operator tools for the Spacegate access portal", long_about = None)]
struct Args {
    /// Configuration file (TOML). SPACEGATE_* environment variables override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or upgrade the database schema
    Migrate,

    /// Seal a third-party credential with the configured key
    EncryptSecret {
        value: String,
    },

    /// Recover a sealed credential
    DecryptSecret {
        blob: String,
    },

    /// Produce the stored hash for a portal password
    HashPassword {
        password: String,
    },

    /// Check a status transition against the lifecycle table
    CheckTransition {
        from: SpaceStatus,
        to: SpaceStatus,
    },

    /// Move a space to a new status
    Transition {
        space_id: SpaceId,
        status: SpaceStatus,
    },
}

fn log_config(args: &Args, config: &Config) -> Result<LogConfig> {
    let mut log_config = LogConfig::from_config(&config.logging)?;

    if let Some(level) = &args.log_level {
        log_config.level = LogLevel::from_str(level)
            .with_context(|| format!("invalid log level '{}'", level))?;
    }
    if args.json_logs {
        log_config = log_config.json_format(true);
    }

    Ok(log_config)
}

fn open_store(config: &Config) -> Result<SqlPortalStore> {
    SqlPortalStore::open(&config.store).with_context(|| {
        format!("failed to open database at {}", config.store.database_path.display())
    })
}

fn sealer(config: &Config) -> Result<SecretSealer> {
    SecretSealer::from_config(&config.security).context("credential key is not usable")
}

fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Migrate => {
            open_store(config)?;
            info!(path = %config.store.database_path.display(), "Database schema is current");
        }

        Command::EncryptSecret { value } => {
            println!("{}", sealer(config)?.seal(&value)?);
        }

        Command::DecryptSecret { blob } => {
            println!("{}", sealer(config)?.unseal(&blob)?);
        }

        Command::HashPassword { password } => {
            println!("{}", hash_password(&password)?);
        }

        Command::CheckTransition { from, to } => {
            if !can_transition(from, to) {
                let allowed: Vec<&str> = allowed_transitions(from).iter().map(|s| s.as_str()).collect();
                bail!("{} -> {} is not allowed (from {}: {})", from, to, from, allowed.join(", "));
            }
            println!("{} -> {} is allowed", from, to);
        }

        Command::Transition { space_id, status } => {
            let store = Arc::new(open_store(config)?);
            let admin = SpaceAdmin::new(store, Arc::new(SystemClock));
            let space = admin.transition_status(&space_id, status)?;
            println!("{} is now {}", space.id, space.status);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("failed to load configuration")?;

    init_logging_with_config(log_config(&args, &config)?)?;
    init_metrics();

    debug!("Spacegate CLI started");

    run(args.command, &config)
}

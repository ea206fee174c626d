use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use waymark::config::{read_config, CONFIG_FILE};
use waymark::{DirectorySource, Migrator};

/// Waymark - inspect migration state for a migrations directory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON config file (optional)
    #[arg(short, long, env = "WAYMARK_CONFIG", default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Directory holding the migration files (overrides the config file)
    #[arg(short, long, env = "WAYMARK_MIGRATIONS_DIR")]
    dir: Option<PathBuf>,

    /// Regex a migration file name must match (overrides the config file)
    #[arg(short, long, env = "WAYMARK_PATTERN")]
    pattern: Option<String>,

    /// Path to the JSON ledger of applied migrations (overrides the config file)
    #[arg(short, long, env = "WAYMARK_STORAGE")]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List applied migrations in the order they were recorded
    Executed,
    /// List migrations that have not been applied yet
    Pending,
    /// Show every known migration with its state
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut file_config = match read_config(&args.config).await? {
        Some(config) => {
            info!(path = %args.config.display(), "Loaded config file");
            config
        }
        None => Default::default(),
    };

    if let Some(dir) = args.dir {
        file_config.migrations_path = dir;
    }
    if let Some(pattern) = args.pattern {
        file_config.migrations_pattern = Some(pattern);
    }
    if let Some(storage) = args.storage {
        file_config.storage_path = Some(storage);
    }

    let migrations_path = file_config.migrations_path.clone();
    let migrator = Migrator::new(
        file_config.to_config()?,
        DirectorySource::listing(&migrations_path),
    );

    match args.command {
        Command::Executed => {
            for id in migrator.executed().await? {
                println!("{id}");
            }
        }
        Command::Pending => {
            for id in migrator.pending().await? {
                println!("{id}");
            }
        }
        Command::Status => {
            let known = migrator.migrations().await?;
            let pending: HashSet<String> = migrator.pending().await?.into_iter().collect();
            let orphaned = migrator.orphaned().await?;

            for id in &known {
                let mark = if pending.contains(id) { " " } else { "x" };
                println!("[{mark}] {id}");
            }

            for name in &orphaned {
                warn!(migration = %name, "Applied migration has no matching file");
                println!("[?] {name}");
            }

            info!(
                known = known.len(),
                pending = pending.len(),
                orphaned = orphaned.len(),
                dir = %migrations_path.display(),
                "Migration status"
            );
        }
    }

    Ok(())
}

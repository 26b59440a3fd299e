//! `mtctl` entry point: argument parsing, logging and driver dispatch.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::debug;

use mtctl::config::{self, Registry};
use mtctl::console::Console;
use mtctl::{session, wizard, AdminClient, Error};

/// Operator console for Motor Town dedicated servers.
#[derive(Parser)]
#[command(name = "mtctl", version)]
struct Cli {
    /// Path to the instance registry (default: instances.toml beside the executable).
    #[arg(long, global = true, env = config::REGISTRY_PATH_ENV)]
    instances: Option<PathBuf>,

    /// tracing filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add, edit or delete server instances.
    Configure,
    /// Open an admin session against a configured instance.
    Connect {
        /// Instance to connect to; prompts for a choice when omitted.
        name: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let path = config::resolve_registry_path(cli.instances.as_deref());
    debug!("Registry path: {}", path.display());
    let mut registry = Registry::load(&path)?;

    let mut console = Console::new(BufReader::new(tokio::io::stdin()), std::io::stdout());

    match cli.command {
        Commands::Configure => wizard::run(&mut console, &mut registry, &path).await,
        Commands::Connect { name } => {
            let client = AdminClient::new()?;
            session::connect(&mut console, &registry, &client, name.as_deref()).await
        }
    }
}

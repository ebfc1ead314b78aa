// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEGUARD CLI - Stranded Stake Watchdog for DPOS Validators
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, Level};

mod commands;

#[derive(Parser)]
#[command(name = "stakeguard")]
#[command(about = "Stakeguard - keeps rewarded DPOS validators from sitting at zero stake", long_about = None)]
#[command(version)]
struct Cli {
    /// RPC endpoint URL (overrides config file and STAKEGUARD_RPC_URL)
    #[arg(short, long)]
    rpc: Option<String>,

    /// DPOS contract address (overrides config file and STAKEGUARD_CONTRACT)
    #[arg(long)]
    contract: Option<String>,

    /// TOML config file; its keys override STAKEGUARD_* variables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Defaults to `run` when omitted
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Startup sweep, then watch Undelegated events
    Run {
        /// Log what would be delegated without submitting
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the startup sweep once and exit
    Sweep {
        /// Log what would be delegated without submitting
        #[arg(long)]
        dry_run: bool,
    },

    /// Show one validator and its remediation verdict
    Check {
        /// Validator address (0x...)
        address: String,
    },

    /// List all stranded validators
    Stranded,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let loaded_env = load_env_file();
    let cli = Cli::parse();

    let level = Level::from_str(&cli.log_level)
        .map_err(|_| format!("Invalid log level '{}'", cli.log_level))?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    print_banner();

    if let Some(path) = loaded_env {
        info!("Loaded environment from {}", path);
    }

    let config = match commands::common::resolve_config(
        cli.config.as_deref(),
        cli.rpc.as_deref(),
        cli.contract.as_deref(),
    ) {
        Ok(config) => config,
        Err(e) => {
            print_error(&format!("Configuration error: {}", e));
            return Err(e.into());
        }
    };

    match cli.command.unwrap_or(Commands::Run { dry_run: false }) {
        Commands::Run { dry_run } => commands::watch::run(&config, dry_run).await?,
        Commands::Sweep { dry_run } => commands::watch::sweep(&config, dry_run).await?,
        Commands::Check { address } => commands::inspect::check(&config, &address).await?,
        Commands::Stranded => commands::inspect::stranded(&config).await?,
    }

    Ok(())
}

/// Load `.env` from the working directory if present. A missing file is fine;
/// a malformed one is reported and ignored.
fn load_env_file() -> Option<String> {
    match dotenvy::dotenv() {
        Ok(path) => Some(path.display().to_string()),
        Err(e) => {
            if !matches!(e, dotenvy::Error::Io(_)) {
                eprintln!("Warning: failed to load .env: {}", e);
            }
            None
        }
    }
}

fn print_banner() {
    println!(
        "{}",
        "╔═══════════════════════════════════════════════╗".cyan()
    );
    println!(
        "{}",
        "║        STAKEGUARD - DPOS Stake Watchdog       ║"
            .cyan()
            .bold()
    );
    println!(
        "{}",
        "║   Sweep | React | Delegate Minimal Stake      ║".cyan()
    );
    println!(
        "{}",
        "╚═══════════════════════════════════════════════╝".cyan()
    );
    println!();
}

fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

fn print_warning(msg: &str) {
    println!("{} {}", "!".yellow().bold(), msg);
}

fn print_info(msg: &str) {
    println!("{} {}", "ℹ".blue().bold(), msg);
}

// ─────────────────────────────────────────────────────────────────
// UNIT TESTS
// ─────────────────────────────────────────────────────────────────

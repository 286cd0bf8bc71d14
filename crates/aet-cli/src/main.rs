mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aet")]
#[command(about = "Agent execution tower: file-based order intake for Alpaca", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile, then watch the intake directory and dispatch orders
    Watch {
        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Override paths.root
        #[arg(long)]
        root: Option<PathBuf>,

        /// One scan of the intake directory, then exit
        #[arg(long, default_value_t = false)]
        once: bool,
    },

    /// Validate an order file without moving or dispatching it
    Validate { file: PathBuf },

    /// Write a new order file
    Create(commands::create::CreateArgs),

    /// Duplicate-ledger maintenance
    Ledger {
        #[arg(long = "config")]
        config_paths: Vec<String>,

        #[arg(long)]
        root: Option<PathBuf>,

        #[command(subcommand)]
        cmd: LedgerCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> local)
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum LedgerCmd {
    Stats,

    /// Is this client_order_id already recorded?
    Check { key: String },

    List,

    /// Delete every recorded key. Previously processed orders become submittable again.
    Clear {
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent when absent; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Watch {
            config_paths,
            root,
            once,
        } => commands::watch::watch(&config_paths, root, once).await?,

        Commands::Validate { file } => {
            if !commands::validate(&file) {
                std::process::exit(1);
            }
        }

        Commands::Create(args) => commands::create::create(args)?,

        Commands::Ledger {
            config_paths,
            root,
            cmd,
        } => {
            let (cfg, _) = commands::load_config(&config_paths, root)?;
            let path = cfg.paths.ledger_file();
            match cmd {
                LedgerCmd::Stats => commands::ledger::stats(&path)?,
                LedgerCmd::Check { key } => commands::ledger::check(&path, &key)?,
                LedgerCmd::List => commands::ledger::list(&path)?,
                LedgerCmd::Clear { yes } => commands::ledger::clear(&path, yes)?,
            }
        }

        Commands::ConfigHash { config_paths } => {
            let loaded = aet_config::load_layered_yaml(&config_paths[..])?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries `key=value` results only.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

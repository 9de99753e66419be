//! ChunkKV CLI
//!
//! Command-line interface over a file-backed ChunkKV store.

use clap::{Parser, Subcommand};
use chunkkv::config::SyncStrategy;
use chunkkv::{Command, Config, Engine, FileStoreFactory};
use tracing_subscriber::{fmt, EnvFilter};

/// ChunkKV CLI
#[derive(Parser, Debug)]
#[command(name = "chunkkv-cli")]
#[command(about = "Store strings of any length in a block-capped key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./chunkkv_data")]
    data_dir: String,

    /// Block store name
    #[arg(short, long, default_value = "chunkkv")]
    store: String,

    /// Block size in bytes (must match the size the data was written with)
    #[arg(short, long, default_value = "100")]
    block_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a value under a key
    Write {
        /// The key to write
        key: String,

        /// The value to write
        value: String,
    },

    /// Read a value by key
    Read {
        /// The key to read
        key: String,
    },

    /// Delete a key
    Delete {
        /// The key to delete
        key: String,
    },

    /// Check whether a key holds a value
    Exists {
        /// The key to check
        key: String,
    },

    /// Show how many blocks a key occupies
    Blocks {
        /// The key to inspect
        key: String,
    },
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Write { key, value } => Command::Write { key, value },
            Commands::Read { key } => Command::Read { key },
            Commands::Delete { key } => Command::Delete { key },
            Commands::Exists { key } => Command::Exists { key },
            Commands::Blocks { key } => Command::Blocks { key },
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,chunkkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::debug!("ChunkKV CLI v{}", chunkkv::VERSION);

    // Build config from args; every CLI write is synced before exit
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .store_name(&args.store)
        .block_size(args.block_size)
        .sync_strategy(SyncStrategy::EveryWrite)
        .build();

    let factory = FileStoreFactory::from_config(&config);
    let engine = match Engine::open(&factory, config).await {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    match engine.execute(args.command.into()).await {
        Ok(reply) => println!("{}", reply),
        Err(e) => {
            tracing::error!("Command failed: {}", e);
            std::process::exit(1);
        }
    }
}

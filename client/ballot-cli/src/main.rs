//! The `ballot` binary: reads and votes on the voting contract from the terminal.

mod app;
mod config;

use std::path::PathBuf;

use anyhow::Context;
use ballot_interface::address::parse_address;
use ballot_interface::Address;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::ClientConfig;

#[derive(Parser)]
#[command(author, version, about = "Vote on the ballot contract", long_about = None)]
struct Cli {
    /// Path to the client configuration.
    #[arg(long, default_value = "ballot_config.toml")]
    config: PathBuf,
    /// JSON-RPC endpoint, overrides the configuration.
    #[arg(long, env = "BALLOT_RPC_URL")]
    rpc_url: Option<String>,
    /// Voting contract address, overrides the configuration.
    #[arg(long, env = "BALLOT_CONTRACT_ADDRESS", value_parser = parse_address)]
    contract_address: Option<Address>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Reads the contract once and prints the ballot.
    Status {
        /// Show the ballot for this address instead of the signing key's.
        #[arg(long, value_parser = parse_address)]
        address: Option<Address>,
    },
    /// Keeps the ballot up to date and reads commands from stdin.
    Watch,
    /// Votes for a candidate.
    Vote {
        /// Candidate id as shown by `status`.
        candidate_id: u64,
    },
    /// Registers a voter. Only the admin may do this.
    Register {
        /// Address of the voter.
        address: String,
    },
}

fn main() -> Result<(), anyhow::Error> {
    // Logs go to stderr, stdout is reserved for the ballot itself.
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Unable to set global default subscriber")?;

    let cli = Cli::parse();
    info!("Reading client config from {:?}", cli.config);
    let mut config = ClientConfig::load(&cli.config)?;
    config.apply_overrides(cli.rpc_url, cli.contract_address);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    runtime.block_on(app::run(config, cli.command))
}

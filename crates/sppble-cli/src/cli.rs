//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a scripted session against the simulated link stack
    Simulate {
        /// Base device name
        #[arg(short, long, default_value = "motor")]
        name: String,
        /// Number of centrals that connect
        #[arg(short, long, default_value_t = 1)]
        peers: u8,
        /// Text written to the stream and flushed to the peers
        #[arg(long, default_value = "hello")]
        payload: String,
        /// Text a peer writes back to the data characteristic
        #[arg(long, default_value = "ping")]
        inbound: String,
    },
    /// Print the effective configuration as TOML
    Config,
}

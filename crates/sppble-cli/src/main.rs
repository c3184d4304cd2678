//! sppble - drive the BLE serial-port transport from the command line

mod cli;
mod config;
mod simulate;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use simulate::Scenario;

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let mut config = config::load_configuration(cli.config.as_deref())?;
    if cli.verbose {
        config.log.enabled = true;
    }

    match cli.command {
        Commands::Simulate {
            name,
            peers,
            payload,
            inbound,
        } => {
            let scenario = Scenario {
                name,
                peers,
                payload,
                inbound,
            };
            let report = simulate::run(config, &scenario)?;

            println!("device name: {}", report.device_name);
            println!("connected peers: {}", report.connected);
            for (target, data) in &report.notifications {
                println!(
                    "notify 0x{:02X} ({} bytes): {}",
                    target.raw(),
                    data.len(),
                    hex::encode(data)
                );
            }
            println!(
                "received ({} bytes): {}",
                report.received.len(),
                String::from_utf8_lossy(&report.received)
            );
        }
        Commands::Config => {
            print!("{}", config::render(&config)?);
        }
    }

    info!("sppble exited successfully");
    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

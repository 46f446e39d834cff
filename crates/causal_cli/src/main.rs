//! Causal replica CLI
//!
//! Runs replicas of the causal replicated store and talks to them.
//!
//! # Commands
//!
//! - `serve` - Run one replica until interrupted
//! - `read` - Read the register from a replica
//! - `write` - Write a value to the register through a replica

mod commands;

use causal_protocol::VectorClock;
use clap::{Parser, Subcommand};
use commands::client::{parse_clock, Target};
use commands::serve::ServeOptions;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

/// Causal replica server and client.
#[derive(Parser)]
#[command(name = "causal")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address of every replica, in replica-id order (repeat per replica)
    #[arg(global = true, short, long = "peer")]
    peers: Vec<SocketAddr>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one replica
    Serve {
        /// This replica's id (its index in the peer list)
        #[arg(short, long)]
        id: u64,

        /// Base gossip interval in microseconds
        #[arg(long, default_value = "1000")]
        gossip_interval_us: u64,

        /// Upper bound of the random delay added to each gossip tick
        #[arg(long, default_value = "100")]
        jitter_us: u64,

        /// Delay before redialing an unreachable peer, in milliseconds
        #[arg(long, default_value = "100")]
        dial_retry_ms: u64,

        /// Rescan buffered operations until none apply
        #[arg(long)]
        fixed_point_drain: bool,

        /// Do not acknowledge received gossip
        #[arg(long)]
        no_gossip_acks: bool,
    },

    /// Read the register
    Read {
        /// Replica to ask
        #[arg(short, long, default_value = "0")]
        replica: u64,

        /// Client id (random if omitted; never reuse one against the same replica)
        #[arg(short, long)]
        client: Option<u64>,

        /// Clock already observed by this session, e.g. 1,0,2
        #[arg(long, value_parser = parse_clock)]
        clock: Option<VectorClock>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Write a value to the register
    Write {
        /// Value to write
        value: u64,

        /// Replica to write through
        #[arg(short, long, default_value = "0")]
        replica: u64,

        /// Client id (random if omitted; never reuse one against the same replica)
        #[arg(short, long)]
        client: Option<u64>,

        /// Clock already observed by this session, e.g. 1,0,2
        #[arg(long, value_parser = parse_clock)]
        clock: Option<VectorClock>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if cli.peers.is_empty() {
        return Err("At least one --peer is required".into());
    }

    match cli.command {
        Commands::Serve {
            id,
            gossip_interval_us,
            jitter_us,
            dial_retry_ms,
            fixed_point_drain,
            no_gossip_acks,
        } => {
            let options = ServeOptions {
                replica_id: id,
                peers: cli.peers,
                gossip_interval_us,
                jitter_us,
                dial_retry_ms,
                fixed_point_drain,
                gossip_acks: !no_gossip_acks,
            };
            commands::serve::run(options).await?;
        }
        Commands::Read {
            replica,
            client,
            clock,
            format,
        } => {
            let target = Target {
                peers: cli.peers,
                replica_id: replica,
                client_id: client,
                clock,
            };
            commands::client::read(&target, &format).await?;
        }
        Commands::Write {
            value,
            replica,
            client,
            clock,
            format,
        } => {
            let target = Target {
                peers: cli.peers,
                replica_id: replica,
                client_id: client,
                clock,
            };
            commands::client::write(&target, value, &format).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_serve_flags() {
        let cli = Cli::try_parse_from([
            "causal",
            "--peer",
            "127.0.0.1:7000",
            "--peer",
            "127.0.0.1:7001",
            "serve",
            "--id",
            "1",
            "--gossip-interval-us",
            "500",
            "--fixed-point-drain",
        ])
        .unwrap();

        assert_eq!(cli.peers.len(), 2);
        match cli.command {
            Commands::Serve {
                id,
                gossip_interval_us,
                jitter_us,
                fixed_point_drain,
                no_gossip_acks,
                ..
            } => {
                assert_eq!(id, 1);
                assert_eq!(gossip_interval_us, 500);
                assert_eq!(jitter_us, 100);
                assert!(fixed_point_drain);
                assert!(!no_gossip_acks);
            }
            _ => unreachable!("parsed a different subcommand"),
        }
    }

    #[test]
    fn parses_write_with_clock() {
        let cli = Cli::try_parse_from([
            "causal", "write", "42", "-p", "127.0.0.1:7000", "-r", "0", "--clock", "3",
        ])
        .unwrap();

        match cli.command {
            Commands::Write {
                value,
                clock,
                client,
                ..
            } => {
                assert_eq!(value, 42);
                assert_eq!(clock, Some(VectorClock::from([3])));
                assert_eq!(client, None);
            }
            _ => unreachable!("parsed a different subcommand"),
        }
    }
}

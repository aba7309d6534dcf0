use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use cp_balancer::{BalancerConfig, BalancerNode, DispatchConfig};

mod args;
use args::Args;

fn timeout(millis: u64) -> Option<Duration> {
    (millis > 0).then(|| Duration::from_millis(millis))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Retrieve server configuration from command line.
    // Note: There are default values for EACH argument.
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    // Configure address.
    let listen = format!("{}:{}", args.host, args.port)
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid listen address {}:{}", args.host, args.port))?;

    let config = BalancerConfig {
        listen,
        chunk_size: args.chunk_size,
        dispatch: DispatchConfig {
            max_chunk_attempts: args.max_chunk_attempts,
        },
        probe_timeout: timeout(args.probe_timeout_ms),
        execute_timeout: timeout(args.execute_timeout_ms),
    };

    let node = BalancerNode::start(config).await?;

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Balancer {} shutting down...", node.address());
            node.shutdown().await?;
            Ok(())
        }
        Err(err) => {
            error!("Fatal error encountered {}", err);
            node.shutdown().await?;
            Err(format!("Unable to listen for shutdown signal: {}", err).into())
        }
    }
}

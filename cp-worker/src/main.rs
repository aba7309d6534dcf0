use std::net::SocketAddr;

use anyhow::{anyhow, Context};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use cp_worker::{WorkerConfig, WorkerNode};

mod args;
use args::Args;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let workload = workload::try_named(&args.workload).ok_or_else(|| {
        anyhow!(
            "The workload `{}` is not a known workload (known: {})",
            args.workload,
            workload::names().collect::<Vec<_>>().join(", ")
        )
    })?;

    let listen = format!("{}:{}", args.host, args.port)
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid listen address {}:{}", args.host, args.port))?;

    // Registration failure is fatal for this worker, it would never get work.
    let node = WorkerNode::start(WorkerConfig::new(listen, args.balancer, workload)).await?;

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Worker {} shutting down...", node.id());
            node.shutdown().await?;
            Ok(())
        }
        Err(err) => {
            error!("Fatal error encountered {}", err);
            // we also shut down in case of error
            node.shutdown().await?;
            Err(format!("Unable to listen for shutdown signal: {}", err).into())
        }
    }
}

use std::fs::OpenOptions;
use std::io::Write;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::info;

use cp_balancer::{BalancerConfig, BalancerNode};
use cp_worker::{WorkerConfig, WorkerNode};

mod args;
use args::Args;

fn loopback() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    if args.trials == 0 {
        return Err(anyhow!("at least one trial is needed"));
    }

    let workload = workload::try_named(&args.workload).ok_or_else(|| {
        anyhow!(
            "The workload `{}` is not a known workload (known: {})",
            args.workload,
            workload::names().collect::<Vec<_>>().join(", ")
        )
    })?;

    let balancer = BalancerNode::start(BalancerConfig::new(loopback())).await?;

    // Make the worker machines, registering on the balancer.
    let mut workers = Vec::with_capacity(args.workers);
    for _ in 0..args.workers {
        let config = WorkerConfig::new(loopback(), balancer.address(), workload);
        workers.push(WorkerNode::start(config).await?);
    }
    info!("Started {} workers running {}", workers.len(), workload.name);

    let mut results = match &args.results {
        Some(path) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("unable to open results file {}", path))?,
        ),
        None => None,
    };

    let mut total = Duration::ZERO;
    for trial in 1..=args.trials {
        println!("Starting trial {}.", trial);

        let start = Instant::now();
        let report = balancer
            .balancer()
            .run_job_path(&args.input, args.chunk_size)
            .await?;
        let elapsed = start.elapsed();
        total += elapsed;

        println!("{} ({:?})", report.aggregate, elapsed);
        if let Some(file) = results.as_mut() {
            writeln!(file, "{} machines: {:?}", args.workers, elapsed)?;
        }
    }

    let average = total / args.trials;
    println!("Average over {} trials: {:?}", args.trials, average);
    if let Some(file) = results.as_mut() {
        writeln!(file, "AVERAGE {} machines: {:?}", args.workers, average)?;
    }

    for worker in workers {
        worker.shutdown().await?;
    }
    balancer.shutdown().await?;

    Ok(())
}

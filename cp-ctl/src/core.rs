use std::path::Path;
use std::time::Duration;

use tonic::transport::Channel;

//
// Import gRPC stubs/definitions.
//
use common::proto::balancer::balancer_client::BalancerClient;
use common::proto::{JobsRequest, RunJobRequest, WorkersRequest};
use common::rpc;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

async fn connect(balancer: &str) -> Result<BalancerClient<Channel>, Box<dyn std::error::Error>> {
    let channel = rpc::connect(balancer, CONNECT_TIMEOUT).await?;
    Ok(BalancerClient::new(channel))
}

/// The balancer resolves relative paths against its own working directory,
/// so send an absolute one when the file exists here.
fn absolute(input: &str) -> String {
    match Path::new(input).canonicalize() {
        Ok(path) => path.display().to_string(),
        Err(_) => input.to_string(),
    }
}

pub async fn run(balancer: &str, input: String, chunk_size: u64) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = connect(balancer).await?;
    let request = tonic::Request::new(RunJobRequest {
        input_path: absolute(&input),
        chunk_size,
    });
    let reply = client.run_job(request).await?.into_inner();

    println!("[Job]");
    println!("aggregate: {}", reply.aggregate);
    println!(
        "{} chunks on {} workers, {} retried, {} ms",
        reply.chunks, reply.workers, reply.retried, reply.elapsed_ms
    );

    Ok(())
}

pub async fn workers(balancer: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = connect(balancer).await?;
    let request = tonic::Request::new(WorkersRequest {});
    let workers = client.workers(request).await?.into_inner().workers;

    println!("[Workers]");
    println!("{:>4}  {:<24} {:<8} {:>8}", "ID", "ADDRESS", "STATE", "FAILURES");
    for worker in workers {
        println!(
            "{:>4}  {:<24} {:<8} {:>8}",
            worker.id, worker.address, worker.state, worker.failures
        );
    }

    Ok(())
}

pub async fn jobs(balancer: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = connect(balancer).await?;
    let request = tonic::Request::new(JobsRequest {});
    let jobs = client.jobs(request).await?.into_inner().jobs;

    println!("[Jobs]");
    if jobs.is_empty() {
        println!("No jobs have been run.");
    }

    for job in jobs {
        println!(
            "#{} {} ({} byte chunks): {}",
            job.id, job.input, job.chunk_size, job.state
        );
        match job.state.as_str() {
            "completed" => println!(
                "    aggregate {} from {} chunks, {} retried, {} ms",
                job.aggregate, job.chunks, job.retried, job.elapsed_ms
            ),
            "failed" => println!("    {}", job.error),
            _ => {}
        }
    }

    Ok(())
}

use std::io::Write;
use std::time::Duration;

use tonic::transport::Channel;
use tonic::Code;

use common::proto::balancer::balancer_client::BalancerClient;
use common::proto::{JobsRequest, RunJobRequest, WorkersRequest};
use common::rpc;
use cp_balancer::{BalancerConfig, BalancerNode};
use cp_worker::{WorkerConfig, WorkerNode};

async fn start_balancer() -> BalancerNode {
    let config = BalancerConfig {
        probe_timeout: Some(Duration::from_secs(1)),
        execute_timeout: Some(Duration::from_secs(5)),
        ..BalancerConfig::new("127.0.0.1:0".parse().unwrap())
    };
    BalancerNode::start(config).await.unwrap()
}

async fn start_worker(balancer: &BalancerNode, workload: &str) -> WorkerNode {
    let config = WorkerConfig::new(
        "127.0.0.1:0".parse().unwrap(),
        balancer.address(),
        workload::try_named(workload).unwrap(),
    );
    WorkerNode::start(config).await.unwrap()
}

async fn client(balancer: &BalancerNode) -> BalancerClient<Channel> {
    let channel = rpc::connect(balancer.address(), Duration::from_secs(1))
        .await
        .unwrap();
    BalancerClient::new(channel)
}

fn input_file(contents: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();
    file
}

fn run_request(file: &tempfile::NamedTempFile, chunk_size: u64) -> RunJobRequest {
    RunJobRequest {
        input_path: file.path().display().to_string(),
        chunk_size,
    }
}

#[tokio::test]
async fn test_job_over_real_workers() {
    let balancer = start_balancer().await;
    let mut workers = vec![];
    for _ in 0..3 {
        workers.push(start_worker(&balancer, "digit-sum").await);
    }
    let mut client = client(&balancer).await;
    let input = input_file(b"123456789");

    let reply = client
        .run_job(run_request(&input, 4))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(reply.aggregate, 45);
    assert_eq!(reply.chunks, 3);
    assert_eq!(reply.workers, 3);
    assert_eq!(workers.iter().map(|w| w.completed()).sum::<u64>(), 3);

    let roster = client
        .workers(WorkersRequest {})
        .await
        .unwrap()
        .into_inner()
        .workers;
    assert_eq!(roster.len(), 3);
    assert!(roster.iter().all(|w| w.state == "idle" && w.failures == 0));

    for worker in workers {
        worker.shutdown().await.unwrap();
    }
    balancer.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_stopped_worker_is_left_out_of_next_job() {
    let balancer = start_balancer().await;
    let first = start_worker(&balancer, "digit-sum").await;
    let second = start_worker(&balancer, "digit-sum").await;
    let mut client = client(&balancer).await;
    let input = input_file(b"11223344556677889900");

    let reply = client.run_job(run_request(&input, 3)).await.unwrap().into_inner();
    assert_eq!(reply.aggregate, 90);
    assert_eq!(reply.workers, 2);

    second.shutdown().await.unwrap();

    let reply = client.run_job(run_request(&input, 3)).await.unwrap().into_inner();
    assert_eq!(reply.aggregate, 90);
    assert_eq!(reply.workers, 1);
    assert_eq!(reply.chunks, 7);

    let jobs = client.jobs(JobsRequest {}).await.unwrap().into_inner().jobs;
    assert_eq!(jobs.len(), 2);
    assert!(jobs.iter().all(|job| job.state == "completed" && job.aggregate == 90));

    first.shutdown().await.unwrap();
    balancer.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_default_chunk_size_and_other_workloads() {
    let balancer = start_balancer().await;
    let worker = start_worker(&balancer, "line-count").await;
    let mut client = client(&balancer).await;
    let input = input_file(b"one\ntwo\nthree\n");

    let reply = client.run_job(run_request(&input, 0)).await.unwrap().into_inner();

    assert_eq!(reply.aggregate, 3);
    assert_eq!(reply.chunks, 1);

    worker.shutdown().await.unwrap();
    balancer.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_stray_bytes_do_not_retire_workers() {
    let balancer = start_balancer().await;
    let worker = start_worker(&balancer, "digit-sum").await;
    let mut client = client(&balancer).await;
    let input = input_file(b"12x45\n");

    let reply = client.run_job(run_request(&input, 3)).await.unwrap().into_inner();

    assert_eq!(reply.aggregate, 12);
    assert_eq!(reply.retried, 0);

    let roster = client
        .workers(WorkersRequest {})
        .await
        .unwrap()
        .into_inner()
        .workers;
    assert_eq!(roster[0].state, "idle");
    assert_eq!(roster[0].failures, 0);

    worker.shutdown().await.unwrap();
    balancer.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_job_without_workers_is_unavailable() {
    let balancer = start_balancer().await;
    let mut client = client(&balancer).await;
    let input = input_file(b"123");

    let status = client.run_job(run_request(&input, 1)).await.unwrap_err();

    assert_eq!(status.code(), Code::Unavailable);
    balancer.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_worker_registration_fails_without_balancer() {
    let config = WorkerConfig {
        register_timeout: Duration::from_millis(200),
        ..WorkerConfig::new(
            "127.0.0.1:0".parse().unwrap(),
            "127.0.0.1:1",
            workload::try_named("digit-sum").unwrap(),
        )
    };

    assert!(WorkerNode::start(config).await.is_err());
}

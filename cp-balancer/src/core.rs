use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::AsyncRead;
use tokio::sync::Mutex;
use tonic::{Request, Response, Status};
use tracing::{info, warn};

use common::proto::balancer::balancer_server::Balancer;
pub use common::proto::balancer::balancer_server::BalancerServer;
use common::proto::{
    JobsReply, JobsRequest, RegisterReply, RegisterRequest, RunJobReply, RunJobRequest,
    WorkersReply, WorkersRequest,
};

use crate::config::BalancerConfig;
use crate::dispatch::{Dispatcher, JobReport};
use crate::error::JobError;
use crate::jobs::{JobLog, JobRecord};
use crate::transport::{GrpcTransport, WorkerTransport};
use crate::worker_info::{WorkerID, WorkerInfo};
use crate::worker_registry::{SharedRegistry, WorkerRegistry};

pub struct CPBalancer {
    /// Our own endpoint, as handed to workers.
    address: String,

    /// Used when a request leaves the chunk size at 0.
    default_chunk_size: usize,

    workers: SharedRegistry,
    dispatcher: Dispatcher,
    jobs: Mutex<JobLog>,

    /// Held for the whole of a job. One job at a time.
    job_lock: Mutex<()>,
}

impl CPBalancer {
    /// A balancer that reaches its workers over gRPC.
    pub fn new(address: impl Into<String>, config: &BalancerConfig) -> Self {
        let address = address.into();
        let transport = GrpcTransport::new(
            address.clone(),
            config.probe_timeout,
            config.execute_timeout,
        );
        Self::with_transport(address, config, Arc::new(transport))
    }

    pub fn with_transport(
        address: impl Into<String>,
        config: &BalancerConfig,
        transport: Arc<dyn WorkerTransport>,
    ) -> Self {
        let workers = WorkerRegistry::shared();
        let dispatcher = Dispatcher::new(transport, workers.clone(), config.dispatch);

        Self {
            address: address.into(),
            default_chunk_size: config.chunk_size,
            workers,
            dispatcher,
            jobs: Mutex::new(JobLog::new()),
            job_lock: Mutex::new(()),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Append a worker to the roster. Always succeeds.
    pub async fn register_worker(&self, address: impl Into<String>) -> WorkerID {
        self.workers.lock().await.register_worker(address)
    }

    pub async fn workers(&self) -> Vec<WorkerInfo> {
        self.workers.lock().await.get_workers().to_vec()
    }

    pub async fn jobs(&self) -> Vec<JobRecord> {
        self.jobs.lock().await.get_all_jobs().iter().cloned().collect()
    }

    /// Run a job over any byte stream. Waits for a running job to finish
    /// first.
    pub async fn run_job<R>(&self, label: &str, input: R, chunk_size: usize) -> Result<JobReport, JobError>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.record(label, chunk_size, self.dispatcher.run(label, input, chunk_size))
            .await
    }

    /// Run a job over a file readable by the balancer.
    pub async fn run_job_path(&self, path: impl AsRef<Path>, chunk_size: usize) -> Result<JobReport, JobError> {
        let path = path.as_ref();
        let label = path.display().to_string();

        let job = async {
            if chunk_size == 0 {
                return Err(JobError::InvalidChunkSize(chunk_size));
            }
            let file = File::open(path).await.map_err(|source| JobError::Input {
                input: label.clone(),
                source,
            })?;
            self.dispatcher.run(&label, file, chunk_size).await
        };

        self.record(&label, chunk_size, job).await
    }

    /// Serialize `job` behind the job lock and keep its outcome in the
    /// history.
    async fn record<F>(&self, label: &str, chunk_size: usize, job: F) -> Result<JobReport, JobError>
    where
        F: Future<Output = Result<JobReport, JobError>>,
    {
        let _running = self.job_lock.lock().await;

        let id = self.jobs.lock().await.start(label, chunk_size);
        info!("Starting job {} over {}", id, label);

        let outcome = job.await;
        self.jobs.lock().await.finish(id, &outcome);

        outcome
    }
}

#[tonic::async_trait]
impl Balancer for CPBalancer {
    /// Worker requests to join the roster.
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<RegisterReply>, Status> {
        let address = request.into_inner().address;
        if address.is_empty() {
            warn!("Rejected registration without an address");
            return Err(Status::invalid_argument("worker address is empty"));
        }

        let worker_id = self.register_worker(address).await;

        let reply = RegisterReply {
            success: true,
            worker_id,
        };
        Ok(Response::new(reply))
    }

    async fn run_job(&self, request: Request<RunJobRequest>) -> Result<Response<RunJobReply>, Status> {
        let request = request.into_inner();

        let chunk_size = match request.chunk_size {
            0 => self.default_chunk_size,
            size => usize::try_from(size)
                .map_err(|_| Status::invalid_argument(format!("chunk size {} is too large", size)))?,
        };

        let report = self.run_job_path(&request.input_path, chunk_size).await?;

        let reply = RunJobReply {
            aggregate: report.aggregate,
            chunks: report.chunks,
            retried: report.retried,
            workers: report.workers as u32,
            elapsed_ms: report.elapsed.as_millis() as u64,
        };
        Ok(Response::new(reply))
    }

    async fn workers(&self, _request: Request<WorkersRequest>) -> Result<Response<WorkersReply>, Status> {
        let workers = self
            .workers
            .lock()
            .await
            .get_workers()
            .iter()
            .map(WorkerInfo::to_entry)
            .collect();

        Ok(Response::new(WorkersReply { workers }))
    }

    async fn jobs(&self, _request: Request<JobsRequest>) -> Result<Response<JobsReply>, Status> {
        let jobs = self
            .jobs
            .lock()
            .await
            .get_all_jobs()
            .iter()
            .map(JobRecord::to_entry)
            .collect();

        Ok(Response::new(JobsReply { jobs }))
    }
}

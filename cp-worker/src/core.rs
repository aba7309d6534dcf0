use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use tonic::{Request, Response, Status};
use tracing::{debug, warn};

use common::proto::worker::worker_server::Worker;
pub use common::proto::worker::worker_server::WorkerServer;
use common::proto::{ExecuteReply, ExecuteRequest, ReadyReply, ReadyRequest};
use workload::Workload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Busy,
}

#[derive(Debug)]
pub struct CPWorker {
    workload: Workload,

    /// Chunks currently being computed.
    in_flight: AtomicUsize,

    /// Chunks computed successfully since startup.
    completed: AtomicU64,

    /// Set once shutdown begins, after which readiness probes answer `false`.
    draining: AtomicBool,
}

/// Keeps `in_flight` accurate even if the request future is dropped.
struct BusyGuard<'a>(&'a AtomicUsize);

impl<'a> BusyGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl CPWorker {
    pub fn new(workload: Workload) -> Self {
        Self {
            workload,
            in_flight: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            draining: AtomicBool::new(false),
        }
    }

    pub fn workload(&self) -> &Workload {
        &self.workload
    }

    pub fn state(&self) -> WorkerState {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            WorkerState::Busy
        } else {
            WorkerState::Idle
        }
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Stop advertising readiness. Chunks already accepted still run.
    pub fn start_draining(&self) {
        self.draining.store(true, Ordering::SeqCst);
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    /// Run the workload over one chunk on the blocking pool.
    async fn run_chunk(&self, request: ExecuteRequest) -> ExecuteReply {
        let _busy = BusyGuard::enter(&self.in_flight);

        let len = request.chunk.len();
        let workload = self.workload;
        let outcome = tokio::task::spawn_blocking(move || workload.run(request.chunk)).await;

        match outcome {
            Ok(Ok(result)) => {
                self.completed.fetch_add(1, Ordering::SeqCst);
                debug!("Computed {} over {} bytes: {}", workload.name, len, result);
                ExecuteReply {
                    result,
                    success: true,
                    error: String::new(),
                }
            }
            Ok(Err(e)) => {
                warn!("{} failed on a {} byte chunk: {}", workload.name, len, e);
                ExecuteReply {
                    result: 0,
                    success: false,
                    error: e.to_string(),
                }
            }
            Err(e) => {
                warn!("{} task aborted: {}", workload.name, e);
                ExecuteReply {
                    result: 0,
                    success: false,
                    error: format!("task aborted: {}", e),
                }
            }
        }
    }
}

#[tonic::async_trait]
impl Worker for CPWorker {
    async fn ready(&self, request: Request<ReadyRequest>) -> Result<Response<ReadyReply>, Status> {
        let ready = !self.is_draining();
        debug!(
            "Readiness probe from {}: {}",
            request.into_inner().balancer,
            ready
        );
        Ok(Response::new(ReadyReply { ready }))
    }

    async fn execute(
        &self,
        request: Request<ExecuteRequest>,
    ) -> Result<Response<ExecuteReply>, Status> {
        let reply = self.run_chunk(request.into_inner()).await;
        Ok(Response::new(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn digit_worker() -> CPWorker {
        CPWorker::new(workload::try_named("digit-sum").unwrap())
    }

    fn execute_request(chunk: &'static [u8]) -> Request<ExecuteRequest> {
        Request::new(ExecuteRequest {
            balancer: "test".to_string(),
            chunk: Bytes::from_static(chunk),
        })
    }

    #[tokio::test]
    async fn test_ready_until_draining() {
        let worker = digit_worker();
        let probe = || {
            Request::new(ReadyRequest {
                balancer: "test".to_string(),
            })
        };

        assert!(worker.ready(probe()).await.unwrap().into_inner().ready);
        worker.start_draining();
        assert!(!worker.ready(probe()).await.unwrap().into_inner().ready);
    }

    #[tokio::test]
    async fn test_execute_returns_partial_result() {
        let worker = digit_worker();

        let reply = worker.execute(execute_request(b"456")).await.unwrap().into_inner();

        assert!(reply.success);
        assert_eq!(reply.result, 15);
        assert!(reply.error.is_empty());
        assert_eq!(worker.completed(), 1);
        assert_eq!(worker.state(), WorkerState::Idle);
    }

    #[tokio::test]
    async fn test_execute_reports_task_error() {
        let worker = CPWorker::new(workload::Workload {
            name: "refuses",
            task_fn: |_| Err(anyhow::anyhow!("refusing chunk")),
        });

        let reply = worker.execute(execute_request(b"456")).await.unwrap().into_inner();

        assert!(!reply.success);
        assert!(reply.error.contains("refusing chunk"));
        assert_eq!(worker.completed(), 0);
    }
}

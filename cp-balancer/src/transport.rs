//! How the dispatch loop reaches workers.
//!
//! The loop only needs two synchronous calls, so it talks to a
//! [`WorkerTransport`] rather than to tonic directly. [`GrpcTransport`] is
//! the real one; tests substitute scripted fakes.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tonic::transport::Channel;

use common::proto::worker::worker_client::WorkerClient;
use common::proto::{ExecuteRequest, ReadyRequest};
use common::rpc::{self, RpcError};

use crate::worker_info::WorkerHandle;

/// What a worker said about a chunk it accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
    Completed(i64),

    /// The worker ran the task and reported `success = false`.
    Failed(String),
}

#[tonic::async_trait]
pub trait WorkerTransport: Send + Sync + 'static {
    /// Ask whether the worker can take a chunk right now.
    async fn ready(&self, worker: &WorkerHandle) -> Result<bool, RpcError>;

    /// Run one chunk on the worker and wait for its answer.
    async fn execute(&self, worker: &WorkerHandle, chunk: Bytes) -> Result<ExecuteOutcome, RpcError>;
}

pub struct GrpcTransport {
    /// Our own address, sent along with every call.
    caller: String,

    probe_timeout: Option<Duration>,
    execute_timeout: Option<Duration>,

    /// One lazily connected client per worker address.
    clients: Mutex<HashMap<String, WorkerClient<Channel>>>,
}

impl GrpcTransport {
    pub fn new(
        caller: impl Into<String>,
        probe_timeout: Option<Duration>,
        execute_timeout: Option<Duration>,
    ) -> Self {
        Self {
            caller: caller.into(),
            probe_timeout,
            execute_timeout,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn client(&self, address: &str) -> Result<WorkerClient<Channel>, RpcError> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(client) = clients.get(address) {
            return Ok(client.clone());
        }

        let client = WorkerClient::new(rpc::lazy_channel(address)?);
        clients.insert(address.to_string(), client.clone());
        Ok(client)
    }
}

#[tonic::async_trait]
impl WorkerTransport for GrpcTransport {
    async fn ready(&self, worker: &WorkerHandle) -> Result<bool, RpcError> {
        let mut client = self.client(&worker.address)?;
        let request = tonic::Request::new(ReadyRequest {
            balancer: self.caller.clone(),
        });

        let reply = rpc::call(&worker.address, self.probe_timeout, client.ready(request)).await?;
        Ok(reply.ready)
    }

    async fn execute(&self, worker: &WorkerHandle, chunk: Bytes) -> Result<ExecuteOutcome, RpcError> {
        let mut client = self.client(&worker.address)?;
        let request = tonic::Request::new(ExecuteRequest {
            balancer: self.caller.clone(),
            chunk,
        });

        let reply = rpc::call(&worker.address, self.execute_timeout, client.execute(request)).await?;
        if reply.success {
            Ok(ExecuteOutcome::Completed(reply.result))
        } else {
            Ok(ExecuteOutcome::Failed(reply.error))
        }
    }
}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tonic::Status;
use tracing::{error, info};

use common::proto::balancer::balancer_client::BalancerClient;
use common::proto::RegisterRequest;
use common::rpc::{self, RpcError};
use workload::Workload;

use crate::core::{CPWorker, WorkerServer, WorkerState};

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("failed to bind worker listener: {0}")]
    Bind(#[from] std::io::Error),

    #[error("failed to register with balancer: {0}")]
    Register(#[from] RpcError),

    #[error("worker server error: {0}")]
    Server(#[from] tonic::transport::Error),

    #[error("worker server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Where the worker's gRPC server binds. Port 0 picks a free port.
    pub listen: SocketAddr,

    /// Address handed to the balancer. Defaults to the bound address.
    pub advertise: Option<String>,

    /// Address of the balancer to register with.
    pub balancer: String,

    pub workload: Workload,

    /// Bound on connecting to the balancer and on the registration call.
    pub register_timeout: Duration,
}

impl WorkerConfig {
    pub fn new(listen: SocketAddr, balancer: impl Into<String>, workload: Workload) -> Self {
        Self {
            listen,
            advertise: None,
            balancer: balancer.into(),
            workload,
            register_timeout: Duration::from_secs(5),
        }
    }
}

/// A running, registered worker.
pub struct WorkerNode {
    id: u32,
    address: String,
    worker: Arc<CPWorker>,
    shutdown: CancellationToken,
    server: JoinHandle<Result<(), tonic::transport::Error>>,
}

impl WorkerNode {
    /// Start serving, then join the balancer's roster.
    ///
    /// A worker that cannot register never receives work, so a failed
    /// registration stops the server again and is returned as an error.
    pub async fn start(config: WorkerConfig) -> Result<Self, WorkerError> {
        let listener = TcpListener::bind(config.listen).await?;
        let local_addr = listener.local_addr()?;
        let address = config
            .advertise
            .clone()
            .unwrap_or_else(|| local_addr.to_string());

        let worker = Arc::new(CPWorker::new(config.workload));
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(serve(worker.clone(), listener, shutdown.clone()));
        info!(
            "Worker server listening on {} ({})",
            local_addr, config.workload.name
        );

        let id = match register(&config.balancer, &address, config.register_timeout).await {
            Ok(id) => id,
            Err(e) => {
                error!("Unable to register with balancer {}: {}", config.balancer, e);
                shutdown.cancel();
                let _ = server.await;
                return Err(e.into());
            }
        };

        info!("Worker {} registered with {} (ID={})", address, config.balancer, id);

        Ok(Self {
            id,
            address,
            worker,
            shutdown,
            server,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn state(&self) -> WorkerState {
        self.worker.state()
    }

    pub fn completed(&self) -> u64 {
        self.worker.completed()
    }

    /// Close the listener. Calls already accepted are allowed to finish.
    pub async fn shutdown(self) -> Result<(), WorkerError> {
        self.worker.start_draining();
        self.shutdown.cancel();
        self.server.await??;
        info!("Worker {} stopped", self.address);
        Ok(())
    }
}

async fn serve(
    worker: Arc<CPWorker>,
    listener: TcpListener,
    shutdown: CancellationToken,
) -> Result<(), tonic::transport::Error> {
    Server::builder()
        .add_service(WorkerServer::from_arc(worker))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
            shutdown.cancelled().await
        })
        .await
}

/// Call the balancer's registration operation with our own address and
/// return the id the roster assigned.
pub async fn register(balancer: &str, address: &str, timeout: Duration) -> Result<u32, RpcError> {
    let channel = rpc::connect(balancer, timeout).await?;
    let mut client = BalancerClient::new(channel);

    let request = tonic::Request::new(RegisterRequest {
        address: address.to_string(),
    });
    let reply = rpc::call(balancer, Some(timeout), client.register(request)).await?;

    if !reply.success {
        return Err(RpcError::Call(
            balancer.to_string(),
            Status::failed_precondition("registration declined"),
        ));
    }

    Ok(reply.worker_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_fails_without_balancer() {
        let config = WorkerConfig {
            register_timeout: Duration::from_millis(200),
            ..WorkerConfig::new(
                "127.0.0.1:0".parse().unwrap(),
                "127.0.0.1:1",
                workload::try_named("digit-sum").unwrap(),
            )
        };

        let result = WorkerNode::start(config).await;

        assert!(matches!(result, Err(WorkerError::Register(_))));
    }
}

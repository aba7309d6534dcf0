use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::info;

use crate::config::BalancerConfig;
use crate::core::{BalancerServer, CPBalancer};

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("failed to bind balancer listener: {0}")]
    Bind(#[from] std::io::Error),

    #[error("balancer server error: {0}")]
    Server(#[from] tonic::transport::Error),

    #[error("balancer server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A balancer serving gRPC on its own task.
pub struct BalancerNode {
    address: String,
    balancer: Arc<CPBalancer>,
    shutdown: CancellationToken,
    server: JoinHandle<Result<(), tonic::transport::Error>>,
}

impl BalancerNode {
    /// Bind `config.listen` and start serving. Port 0 picks a free port.
    pub async fn start(config: BalancerConfig) -> Result<Self, ServeError> {
        let listener = TcpListener::bind(config.listen).await?;
        let address = listener.local_addr()?.to_string();

        let balancer = Arc::new(CPBalancer::new(address.clone(), &config));
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(serve(balancer.clone(), listener, shutdown.clone()));
        info!("BalancerServer listening on {}", address);

        Ok(Self {
            address,
            balancer,
            shutdown,
            server,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn balancer(&self) -> &Arc<CPBalancer> {
        &self.balancer
    }

    /// Close the listener and wait for accepted calls to finish.
    pub async fn shutdown(self) -> Result<(), ServeError> {
        self.shutdown.cancel();
        self.server.await??;
        info!("Balancer {} stopped", self.address);
        Ok(())
    }
}

async fn serve(
    balancer: Arc<CPBalancer>,
    listener: TcpListener,
    shutdown: CancellationToken,
) -> Result<(), tonic::transport::Error> {
    Server::builder()
        .add_service(BalancerServer::from_arc(balancer))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
            shutdown.cancelled().await
        })
        .await
}

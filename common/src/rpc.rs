//! Wrapper for dialing peers and calling their exported methods.
//!
//! Every remote call is a single unary round trip. There is no retry here,
//! callers decide what a failed call means for them.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tonic::transport::{Channel, Endpoint};
use tonic::{Response, Status};

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("invalid endpoint `{0}`")]
    InvalidEndpoint(String),

    #[error("unable to reach {0}: {1}")]
    Unreachable(String, #[source] tonic::transport::Error),

    #[error("call to {0} failed: {1}")]
    Call(String, Status),

    #[error("call to {0} timed out after {1:?}")]
    Timeout(String, Duration),
}

/// Turn an opaque `host:port` address into a URI tonic can dial.
pub fn endpoint_uri(address: &str) -> String {
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

fn endpoint(address: &str) -> Result<Endpoint, RpcError> {
    Endpoint::from_shared(endpoint_uri(address))
        .map_err(|_| RpcError::InvalidEndpoint(address.to_string()))
}

/// Channel that connects on first use. Connection failures surface from
/// the first call made through it.
pub fn lazy_channel(address: &str) -> Result<Channel, RpcError> {
    Ok(endpoint(address)?.connect_lazy())
}

/// Eagerly connect, failing fast when the peer is not listening.
pub async fn connect(address: &str, timeout: Duration) -> Result<Channel, RpcError> {
    endpoint(address)?
        .connect_timeout(timeout)
        .connect()
        .await
        .map_err(|e| RpcError::Unreachable(address.to_string(), e))
}

/// Await one unary call, bounding it by `timeout` when given.
pub async fn call<T, F>(address: &str, timeout: Option<Duration>, fut: F) -> Result<T, RpcError>
where
    F: Future<Output = Result<Response<T>, Status>>,
{
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| RpcError::Timeout(address.to_string(), limit))?,
        None => fut.await,
    };

    result
        .map(Response::into_inner)
        .map_err(|status| RpcError::Call(address.to_string(), status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_uri_adds_scheme() {
        assert_eq!(endpoint_uri("127.0.0.1:8030"), "http://127.0.0.1:8030");
        assert_eq!(endpoint_uri("http://[::1]:9000"), "http://[::1]:9000");
    }

    #[tokio::test]
    async fn test_lazy_channel_rejects_garbage() {
        let result = lazy_channel("not a valid address");
        assert!(matches!(result, Err(RpcError::InvalidEndpoint(_))));
    }

    #[tokio::test]
    async fn test_call_times_out() {
        let pending = std::future::pending::<Result<Response<()>, Status>>();
        let result = call("127.0.0.1:1", Some(Duration::from_millis(20)), pending).await;
        assert!(matches!(result, Err(RpcError::Timeout(_, _))));
    }

    #[tokio::test]
    async fn test_call_maps_status() {
        let failed = async { Err::<Response<()>, _>(Status::unavailable("down")) };
        match call("w1", None, failed).await {
            Err(RpcError::Call(addr, status)) => {
                assert_eq!(addr, "w1");
                assert_eq!(status.code(), tonic::Code::Unavailable);
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_is_unreachable() {
        // Port 1 is privileged and never served in the test environment.
        let result = connect("127.0.0.1:1", Duration::from_millis(200)).await;
        assert!(matches!(result, Err(RpcError::Unreachable(_, _))));
    }
}

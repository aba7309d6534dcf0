//! Shared pieces of the chunkpool workspace: the wire messages exchanged
//! between the balancer, its workers and the control client, plus the
//! small transport wrapper every participant dials peers through.

pub mod proto;
pub mod rpc;

pub use rpc::{endpoint_uri, RpcError};

/// Default port the balancer listens on.
pub const DEFAULT_BALANCER_PORT: u16 = 8030;

/// Default chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 30_000;

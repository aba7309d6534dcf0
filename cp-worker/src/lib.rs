//! Worker side of chunkpool: a gRPC service that answers readiness probes
//! and runs one workload over the chunks a balancer sends it.

pub mod core;
pub mod node;

pub use crate::core::{CPWorker, WorkerState};
pub use node::{register, WorkerConfig, WorkerError, WorkerNode};

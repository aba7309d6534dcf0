//! The balancer: keeps the roster of registered workers and runs one
//! chunked job at a time across whichever of them answer ready.

pub mod chunker;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod jobs;
pub mod node;
pub mod transport;
pub mod worker_info;
pub mod worker_registry;

pub use crate::core::{BalancerServer, CPBalancer};
pub use config::{BalancerConfig, DispatchConfig};
pub use dispatch::{Dispatcher, JobReport};
pub use error::JobError;
pub use node::{BalancerNode, ServeError};
pub use transport::{ExecuteOutcome, GrpcTransport, WorkerTransport};
pub use worker_info::{WorkerHandle, WorkerID, WorkerInfo, WorkerState};
pub use worker_registry::{SharedRegistry, WorkerRegistry};

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use tonic::Status;

use common::RpcError;
use cp_balancer::{
    DispatchConfig, Dispatcher, ExecuteOutcome, WorkerHandle, WorkerRegistry, WorkerTransport,
};

/// How a scripted worker answers.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Ready, and computes the digit sum of every chunk.
    Healthy,

    /// Answers the probe with `false`.
    Declines,

    /// Never reachable.
    Unreachable,

    /// Ready, then reports `success = false` for every chunk.
    Broken,

    /// Ready, then the connection drops on every chunk.
    Vanishes,

    /// Healthy, but takes this long per chunk.
    Slow(Duration),

    /// Healthy, sleeping a random 0..=n milliseconds per chunk.
    Jittery(u64),

    /// Ready, and answers every chunk with this value.
    Returns(i64),
}

/// In-memory workers keyed by address.
///
/// Records every chunk it completes and counts any moment a worker is
/// handed a chunk while still holding one.
#[derive(Default)]
pub struct FakeTransport {
    behaviors: Mutex<HashMap<String, Behavior>>,
    holding: Mutex<HashSet<String>>,
    completed: Mutex<Vec<(String, Bytes)>>,
    attempts: AtomicUsize,
    overlaps: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, address: &str, behavior: Behavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(address.to_string(), behavior);
    }

    fn behavior(&self, address: &str) -> Behavior {
        self.behaviors
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or(Behavior::Unreachable)
    }

    /// Chunks that produced a result, in completion order.
    pub fn completed(&self) -> Vec<(String, Bytes)> {
        self.completed.lock().unwrap().clone()
    }

    pub fn completed_by(&self, address: &str) -> usize {
        self.completed
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| a == address)
            .count()
    }

    /// Every `execute` call, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self, address: &str) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.holding.lock().unwrap().insert(address.to_string()) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self, address: &str) {
        self.holding.lock().unwrap().remove(address);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    async fn run(&self, address: &str, chunk: Bytes) -> Result<ExecuteOutcome, RpcError> {
        match self.behavior(address) {
            Behavior::Broken => return Ok(ExecuteOutcome::Failed("injected failure".into())),
            Behavior::Vanishes | Behavior::Unreachable => return Err(refused(address)),
            Behavior::Slow(delay) => tokio::time::sleep(delay).await,
            Behavior::Jittery(max) => {
                let millis = rand::thread_rng().gen_range(0..=max);
                tokio::time::sleep(Duration::from_millis(millis)).await;
            }
            Behavior::Returns(value) => {
                self.completed
                    .lock()
                    .unwrap()
                    .push((address.to_string(), chunk));
                return Ok(ExecuteOutcome::Completed(value));
            }
            Behavior::Healthy | Behavior::Declines => {}
        }

        match workload::digit_sum::task(chunk.clone()) {
            Ok(result) => {
                self.completed
                    .lock()
                    .unwrap()
                    .push((address.to_string(), chunk));
                Ok(ExecuteOutcome::Completed(result))
            }
            Err(e) => Ok(ExecuteOutcome::Failed(e.to_string())),
        }
    }
}

fn refused(address: &str) -> RpcError {
    RpcError::Call(address.to_string(), Status::unavailable("connection refused"))
}

#[tonic::async_trait]
impl WorkerTransport for FakeTransport {
    async fn ready(&self, worker: &WorkerHandle) -> Result<bool, RpcError> {
        match self.behavior(&worker.address) {
            Behavior::Declines => Ok(false),
            Behavior::Unreachable => Err(refused(&worker.address)),
            _ => Ok(true),
        }
    }

    async fn execute(&self, worker: &WorkerHandle, chunk: Bytes) -> Result<ExecuteOutcome, RpcError> {
        self.enter(&worker.address);
        let outcome = self.run(&worker.address, chunk).await;
        self.leave(&worker.address);
        outcome
    }
}

/// A dispatcher over scripted workers, registered in the given order.
pub async fn dispatcher(
    workers: &[(&str, Behavior)],
    config: DispatchConfig,
) -> (Dispatcher, Arc<FakeTransport>) {
    let transport = FakeTransport::new();
    let registry = WorkerRegistry::shared();

    for (address, behavior) in workers {
        transport.set(address, *behavior);
        registry.lock().await.register_worker(*address);
    }

    let dispatcher = Dispatcher::new(transport.clone(), registry, config);
    (dispatcher, transport)
}

/// Sum of the ASCII digits in `input`.
pub fn digit_sum(input: &[u8]) -> i64 {
    input
        .iter()
        .filter(|b| b.is_ascii_digit())
        .map(|b| (b - b'0') as i64)
        .sum()
}

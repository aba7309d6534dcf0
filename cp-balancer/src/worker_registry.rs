use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::worker_info::*;

/// The roster, shared between the RPC handlers and the dispatch loop.
pub type SharedRegistry = Arc<Mutex<WorkerRegistry>>;

/// Registry for workers.
///
/// Append-only: workers are never removed, and registering the same
/// address twice yields two entries.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    /// List of workers, indexed by their ID.
    worker_list: Vec<WorkerInfo>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRegistry {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Add worker to the registry and return its ID.
    pub fn register_worker(&mut self, address: impl Into<String>) -> WorkerID {
        let worker_id = self.worker_list.len() as WorkerID;
        let worker_info = WorkerInfo::new(worker_id, address);

        info!("Worker {} joined the roster", worker_info.handle());
        self.worker_list.push(worker_info);

        worker_id
    }

    /// Set worker state. Unknown IDs are ignored.
    pub fn set_worker_state(&mut self, worker_id: WorkerID, new_state: WorkerState) {
        if let Some(worker) = self.get_worker_mut(worker_id) {
            worker.set_state(new_state);
        }
    }

    /// Mark the worker failed and count the failure.
    pub fn record_failure(&mut self, worker_id: WorkerID) {
        if let Some(worker) = self.get_worker_mut(worker_id) {
            worker.set_state(WorkerState::Failed);
            worker.failures += 1;
        }
    }

    pub fn get_worker_state(&self, worker_id: WorkerID) -> Option<WorkerState> {
        self.get_worker(worker_id).map(|worker| worker.state)
    }

    /// Snapshot of every entry, in registration order.
    pub fn handles(&self) -> Vec<WorkerHandle> {
        self.worker_list.iter().map(WorkerInfo::handle).collect()
    }

    /// Size of the worker registry.
    pub fn len(&self) -> usize {
        self.worker_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worker_list.is_empty()
    }

    pub fn get_workers(&self) -> &[WorkerInfo] {
        &self.worker_list
    }

    pub fn get_worker(&self, worker_id: WorkerID) -> Option<&WorkerInfo> {
        self.worker_list.get(worker_id as usize)
    }

    pub fn get_worker_mut(&mut self, worker_id: WorkerID) -> Option<&mut WorkerInfo> {
        self.worker_list.get_mut(worker_id as usize)
    }
}

use std::fmt;

use common::proto::WorkerEntry;

pub type WorkerID = u32;

/// Health of a roster entry as last seen by the dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum WorkerState {
    /// Registered, or finished its last job cleanly.
    Idle,

    /// Holding a chunk.
    Busy,

    /// Dropped a chunk (unreachable or task error). Re-probed by the next job.
    Failed,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Idle => "idle",
            WorkerState::Busy => "busy",
            WorkerState::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the dispatch loop passes around: enough to address one worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerHandle {
    pub id: WorkerID,

    /// Opaque endpoint, `host:port` for the gRPC transport.
    pub address: String,
}

impl WorkerHandle {
    pub fn new(id: WorkerID, address: impl Into<String>) -> Self {
        Self {
            id,
            address: address.into(),
        }
    }
}

impl fmt::Display for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.address)
    }
}

#[derive(Debug, Clone)]
pub struct WorkerInfo {
    /// Unique ID for each worker.
    pub id: WorkerID,

    /// Address of the worker's gRPC server.
    pub address: String,

    /// The state of the worker.
    pub state: WorkerState,

    /// Chunks this worker has dropped over the balancer's lifetime.
    pub failures: u32,
}

impl WorkerInfo {
    pub fn new(id: WorkerID, address: impl Into<String>) -> Self {
        Self {
            id,
            address: address.into(),
            state: WorkerState::Idle, // By default, workers start off idle.
            failures: 0,
        }
    }

    /// Set worker state.
    pub fn set_state(&mut self, new_state: WorkerState) {
        self.state = new_state;
    }

    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle::new(self.id, self.address.clone())
    }

    pub fn to_entry(&self) -> WorkerEntry {
        WorkerEntry {
            id: self.id,
            address: self.address.clone(),
            state: self.state.to_string(),
            failures: self.failures,
        }
    }
}

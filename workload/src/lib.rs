//! Per-chunk computations a worker can be started with.
//!
//! A workload turns one chunk of raw input bytes into a single integer.
//! The balancer sums those integers, so a workload is only meaningful if
//! summing its per-chunk results gives the answer for the whole input.

use anyhow::Result;
use bytes::Bytes;

pub mod counting;
pub mod digit_sum;

/// A task function takes one chunk and returns its partial result.
pub type TaskFn = fn(chunk: Bytes) -> Result<i64>;

/// A named chunk computation.
#[derive(Copy, Clone, Debug)]
pub struct Workload {
    pub name: &'static str,
    pub task_fn: TaskFn,
}

impl Workload {
    /// Run the task over `chunk`.
    #[inline]
    pub fn run(&self, chunk: Bytes) -> Result<i64> {
        (self.task_fn)(chunk)
    }
}

const WORKLOADS: &[Workload] = &[
    Workload {
        name: "digit-sum",
        task_fn: digit_sum::task,
    },
    Workload {
        name: "byte-count",
        task_fn: counting::bytes,
    },
    Workload {
        name: "line-count",
        task_fn: counting::lines,
    },
];

/// Look a workload up by name.
pub fn try_named(name: &str) -> Option<Workload> {
    WORKLOADS.iter().find(|w| w.name == name).copied()
}

/// Names of every known workload.
pub fn names() -> impl Iterator<Item = &'static str> {
    WORKLOADS.iter().map(|w| w.name)
}

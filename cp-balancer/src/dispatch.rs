//! The dispatch loop: matches ready workers with chunks until the input is
//! consumed and every chunk has reported back.
//!
//! Per job, four kinds of task cooperate over channels:
//!
//! * readiness probes, one per roster entry, that push willing workers onto
//!   the ready queue;
//! * the requeue listener, moving workers that finished a chunk from the
//!   released channel back onto the ready queue;
//! * the collector, summing partial results;
//! * one dispatch task per chunk, holding the chunk for the length of one
//!   `execute` call.
//!
//! The main loop owns the input and is the only reader of it. It returns
//! once the input is exhausted, no chunk waits for a retry, and the
//! in-flight set has drained.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::AsyncRead;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chunker::{Chunk, ChunkReader};
use crate::config::DispatchConfig;
use crate::error::JobError;
use crate::transport::{ExecuteOutcome, WorkerTransport};
use crate::worker_info::{WorkerHandle, WorkerID, WorkerState};
use crate::worker_registry::SharedRegistry;

/// Summary of a job that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub aggregate: i64,

    /// Chunks that produced a result.
    pub chunks: u64,

    /// Failed attempts that were handed to another worker.
    pub retried: u64,

    /// Workers that answered the readiness probe.
    pub workers: usize,

    pub elapsed: Duration,
}

pub struct Dispatcher {
    transport: Arc<dyn WorkerTransport>,
    registry: SharedRegistry,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn WorkerTransport>,
        registry: SharedRegistry,
        config: DispatchConfig,
    ) -> Self {
        Self {
            transport,
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn config(&self) -> DispatchConfig {
        self.config
    }

    /// Run one job over `input`, split into `chunk_size` byte chunks.
    ///
    /// `label` names the input in logs and errors. Calls are not serialized
    /// here; callers that share a roster must run one job at a time.
    pub async fn run<R>(&self, label: &str, input: R, chunk_size: usize) -> Result<JobReport, JobError>
    where
        R: AsyncRead + Unpin + Send,
    {
        if chunk_size == 0 {
            return Err(JobError::InvalidChunkSize(chunk_size));
        }
        let started = Instant::now();

        let roster = self.snapshot_roster().await;
        if roster.is_empty() {
            warn!("Job {}: the roster is empty", label);
            return Err(JobError::NoWorkersAvailable);
        }
        info!(
            "Job {}: probing {} workers, chunk size {}",
            label,
            roster.len(),
            chunk_size
        );

        let (ready_tx, mut ready_rx) = mpsc::unbounded_channel();
        let (release_tx, release_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let job_done = CancellationToken::new();

        let requeue = tokio::spawn(requeue_listener(release_rx, ready_tx.clone(), job_done.clone()));
        let collector = tokio::spawn(collect_results(result_rx, job_done.clone()));

        let mut run = JobRun::new(self, label, ChunkReader::new(input, chunk_size));
        for worker in roster {
            run.probes
                .spawn(probe(self.transport.clone(), worker, ready_tx.clone()));
        }
        drop(ready_tx);

        let outcome = run.drive(&mut ready_rx, &result_tx, &release_tx).await;

        let Tally {
            completed,
            retried,
            ready_workers,
            participants,
            failed,
        } = run.into_tally();

        job_done.cancel();
        let aggregate = collector
            .await
            .map_err(|e| JobError::Internal(format!("result collector failed: {}", e)));
        if let Err(e) = requeue.await {
            warn!("Job {}: requeue listener failed: {}", label, e);
        }

        {
            let mut registry = self.registry.lock().await;
            for id in participants.difference(&failed) {
                registry.set_worker_state(*id, WorkerState::Idle);
            }
        }

        if let Err(e) = outcome {
            warn!("Job {} aborted: {}", label, e);
            return Err(e);
        }

        let aggregate = aggregate?;
        if aggregate.overflowed {
            warn!("Job {}: aggregate does not fit in an i64", label);
            return Err(JobError::AggregateOverflow {
                results: aggregate.results,
            });
        }
        if aggregate.results != completed {
            return Err(JobError::Internal(format!(
                "collected {} results for {} completed chunks",
                aggregate.results, completed
            )));
        }

        let report = JobReport {
            aggregate: aggregate.sum,
            chunks: completed,
            retried,
            workers: ready_workers,
            elapsed: started.elapsed(),
        };
        info!(
            "Job {} finished: aggregate {} from {} chunks on {} workers ({} retried) in {:?}",
            label, report.aggregate, report.chunks, report.workers, report.retried, report.elapsed
        );

        Ok(report)
    }

    /// Current roster, with entries sharing an address collapsed to one.
    async fn snapshot_roster(&self) -> Vec<WorkerHandle> {
        let handles = self.registry.lock().await.handles();

        let mut seen = HashSet::new();
        handles
            .into_iter()
            .filter(|worker| seen.insert(worker.address.clone()))
            .collect()
    }
}

/// One finished `execute` call, handed back to the main loop.
struct ChunkAttempt {
    worker: WorkerHandle,
    chunk: Chunk,
    outcome: Result<i64, String>,
}

struct Tally {
    completed: u64,
    retried: u64,
    ready_workers: usize,
    participants: HashSet<WorkerID>,
    failed: HashSet<WorkerID>,
}

/// Per-job state owned by the main loop.
struct JobRun<'a, R> {
    dispatcher: &'a Dispatcher,
    label: &'a str,
    reader: ChunkReader<R>,

    /// Chunks whose last attempt failed, served before fresh input.
    retry: VecDeque<Chunk>,

    /// Ready workers for whom there was nothing to do.
    parked: Vec<WorkerHandle>,

    in_flight: JoinSet<ChunkAttempt>,
    probes: JoinSet<(WorkerHandle, bool)>,

    ready_workers: usize,
    failed: HashSet<WorkerID>,
    participants: HashSet<WorkerID>,
    completed: u64,
    retried: u64,
}

impl<'a, R: AsyncRead + Unpin> JobRun<'a, R> {
    fn new(dispatcher: &'a Dispatcher, label: &'a str, reader: ChunkReader<R>) -> Self {
        Self {
            dispatcher,
            label,
            reader,
            retry: VecDeque::new(),
            parked: Vec::new(),
            in_flight: JoinSet::new(),
            probes: JoinSet::new(),
            ready_workers: 0,
            failed: HashSet::new(),
            participants: HashSet::new(),
            completed: 0,
            retried: 0,
        }
    }

    /// Counters of the run. Anything still in flight or still probing is
    /// aborted.
    fn into_tally(self) -> Tally {
        Tally {
            completed: self.completed,
            retried: self.retried,
            ready_workers: self.ready_workers,
            participants: self.participants,
            failed: self.failed,
        }
    }

    fn is_finished(&self) -> bool {
        self.reader.is_exhausted() && self.retry.is_empty() && self.in_flight.is_empty()
    }

    async fn drive(
        &mut self,
        ready_rx: &mut UnboundedReceiver<WorkerHandle>,
        result_tx: &UnboundedSender<i64>,
        release_tx: &UnboundedSender<WorkerHandle>,
    ) -> Result<(), JobError> {
        loop {
            if self.is_finished() {
                return Ok(());
            }

            // Every worker that said yes has failed, and none are left to ask.
            if self.probes.is_empty() && self.failed.len() >= self.ready_workers {
                return Err(if self.ready_workers == 0 {
                    JobError::NoWorkersAvailable
                } else {
                    JobError::WorkersExhausted {
                        failed: self.failed.len(),
                    }
                });
            }

            tokio::select! {
                Some(worker) = ready_rx.recv() => {
                    self.on_ready(worker).await?;
                }
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    self.on_attempt_finished(joined, result_tx, release_tx).await?;
                }
                Some(joined) = self.probes.join_next(), if !self.probes.is_empty() => {
                    let (worker, ready) = joined.map_err(|e| task_failed("readiness probe", e))?;
                    if ready {
                        self.ready_workers += 1;
                    } else {
                        debug!("Job {}: worker {} sits this job out", self.label, worker);
                    }
                }
                else => {
                    return Err(JobError::Internal(
                        "dispatch loop stalled with work outstanding".to_string(),
                    ));
                }
            }
        }
    }

    async fn on_ready(&mut self, worker: WorkerHandle) -> Result<(), JobError> {
        if self.failed.contains(&worker.id) {
            return Ok(());
        }

        match self.next_work().await? {
            Some(chunk) => self.assign(worker, chunk).await,
            None => self.parked.push(worker),
        }
        Ok(())
    }

    /// A retried chunk if one is waiting, otherwise the next chunk of input.
    async fn next_work(&mut self) -> Result<Option<Chunk>, JobError> {
        if let Some(chunk) = self.retry.pop_front() {
            return Ok(Some(chunk));
        }

        match self.reader.next_chunk().await {
            Ok(Some(chunk)) => Ok(Some(chunk)),
            Ok(None) => {
                if self.reader.close() {
                    info!(
                        "Job {}: input exhausted after {} chunks ({} bytes)",
                        self.label,
                        self.reader.chunks_read(),
                        self.reader.bytes_read()
                    );
                }
                Ok(None)
            }
            Err(source) => Err(JobError::Input {
                input: self.label.to_string(),
                source,
            }),
        }
    }

    async fn assign(&mut self, worker: WorkerHandle, chunk: Chunk) {
        self.participants.insert(worker.id);
        self.dispatcher
            .registry
            .lock()
            .await
            .set_worker_state(worker.id, WorkerState::Busy);

        debug!(
            "Job {}: chunk {} ({} bytes at offset {}) -> worker {}",
            self.label,
            chunk.seq,
            chunk.len(),
            chunk.offset,
            worker
        );
        self.in_flight
            .spawn(dispatch_chunk(self.dispatcher.transport.clone(), worker, chunk));
    }

    async fn on_attempt_finished(
        &mut self,
        joined: Result<ChunkAttempt, JoinError>,
        result_tx: &UnboundedSender<i64>,
        release_tx: &UnboundedSender<WorkerHandle>,
    ) -> Result<(), JobError> {
        let ChunkAttempt {
            worker,
            chunk,
            outcome,
        } = joined.map_err(|e| task_failed("chunk dispatch", e))?;

        match outcome {
            Ok(result) => {
                self.completed += 1;
                debug!(
                    "Job {}: chunk {} = {} from worker {}",
                    self.label, chunk.seq, result, worker
                );
                result_tx
                    .send(result)
                    .map_err(|_| JobError::Internal("result collector stopped".to_string()))?;
                release_tx
                    .send(worker)
                    .map_err(|_| JobError::Internal("requeue listener stopped".to_string()))?;
                Ok(())
            }
            Err(reason) => self.on_chunk_failed(worker, chunk, reason).await,
        }
    }

    /// Retire the worker for this job and put the chunk up for another
    /// attempt elsewhere.
    async fn on_chunk_failed(
        &mut self,
        worker: WorkerHandle,
        mut chunk: Chunk,
        reason: String,
    ) -> Result<(), JobError> {
        warn!(
            "Job {}: worker {} failed chunk {}: {}",
            self.label, worker, chunk.seq, reason
        );
        self.failed.insert(worker.id);
        self.dispatcher.registry.lock().await.record_failure(worker.id);

        chunk.attempts += 1;
        if chunk.attempts >= self.dispatcher.config.max_chunk_attempts.max(1) {
            return Err(JobError::ChunkFailed {
                seq: chunk.seq,
                attempts: chunk.attempts,
                reason,
            });
        }

        self.retried += 1;
        self.retry.push_back(chunk);

        if let Some(parked) = self.parked.pop() {
            self.on_ready(parked).await?;
        }
        Ok(())
    }
}

fn task_failed(task: &str, e: JoinError) -> JobError {
    JobError::Internal(format!("{} task failed: {}", task, e))
}

/// Ask one worker whether it will take part. Willing workers go straight
/// onto the ready queue.
async fn probe(
    transport: Arc<dyn WorkerTransport>,
    worker: WorkerHandle,
    ready_tx: UnboundedSender<WorkerHandle>,
) -> (WorkerHandle, bool) {
    let ready = match transport.ready(&worker).await {
        Ok(true) => ready_tx.send(worker.clone()).is_ok(),
        Ok(false) => {
            info!("Worker {} declined the readiness probe", worker);
            false
        }
        Err(e) => {
            warn!("Worker {} did not answer the readiness probe: {}", worker, e);
            false
        }
    };
    (worker, ready)
}

async fn dispatch_chunk(
    transport: Arc<dyn WorkerTransport>,
    worker: WorkerHandle,
    chunk: Chunk,
) -> ChunkAttempt {
    let outcome = match transport.execute(&worker, chunk.data.clone()).await {
        Ok(ExecuteOutcome::Completed(result)) => Ok(result),
        Ok(ExecuteOutcome::Failed(reason)) => Err(reason),
        Err(e) => Err(e.to_string()),
    };

    ChunkAttempt {
        worker,
        chunk,
        outcome,
    }
}

/// Forward released workers to the ready queue until the job is done.
async fn requeue_listener(
    mut release_rx: UnboundedReceiver<WorkerHandle>,
    ready_tx: UnboundedSender<WorkerHandle>,
    job_done: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = job_done.cancelled() => break,
            released = release_rx.recv() => match released {
                Some(worker) => {
                    if ready_tx.send(worker).is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Aggregate {
    sum: i64,
    results: u64,

    /// Set once the running sum left the `i64` range. `sum` is then
    /// meaningless.
    overflowed: bool,
}

impl Aggregate {
    fn add(&mut self, result: i64) {
        self.results += 1;
        match self.sum.checked_add(result) {
            Some(sum) => self.sum = sum,
            None => self.overflowed = true,
        }
    }
}

/// Sum partial results. Once the job is done, whatever is already queued
/// is still counted.
async fn collect_results(mut result_rx: UnboundedReceiver<i64>, job_done: CancellationToken) -> Aggregate {
    let mut aggregate = Aggregate::default();

    loop {
        tokio::select! {
            biased;
            Some(result) = result_rx.recv() => aggregate.add(result),
            _ = job_done.cancelled() => break,
        }
    }

    while let Ok(result) = result_rx.try_recv() {
        aggregate.add(result);
    }

    aggregate
}

use std::collections::VecDeque;
use std::time::Duration;

use common::proto::JobEntry;

use crate::dispatch::JobReport;
use crate::error::JobError;

pub type JobID = u64;

/// State of the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Dispatch loop is running.
    Running,

    /// Job produced an aggregate.
    Completed,

    /// Job aborted with an error.
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

/// A job context.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobID,

    /// Where the input came from, e.g. a file path.
    pub input: String,

    pub chunk_size: usize,

    pub state: JobState,

    /// Set once the job completed.
    pub report: Option<JobReport>,

    /// Set once the job failed.
    pub error: Option<String>,
}

impl JobRecord {
    pub fn to_entry(&self) -> JobEntry {
        let (aggregate, chunks, retried, elapsed) = match &self.report {
            Some(report) => (
                report.aggregate,
                report.chunks,
                report.retried,
                report.elapsed,
            ),
            None => (0, 0, 0, Duration::ZERO),
        };

        JobEntry {
            id: self.id,
            input: self.input.clone(),
            chunk_size: self.chunk_size as u64,
            state: self.state.as_str().to_string(),
            aggregate,
            chunks,
            retried,
            elapsed_ms: elapsed.as_millis() as u64,
            error: self.error.clone().unwrap_or_default(),
        }
    }
}

/// Job history.
///
/// Jobs are kept in order to maintain history. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct JobLog {
    jobs: VecDeque<JobRecord>,
}

impl JobLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a job that is about to start.
    pub fn start(&mut self, input: impl Into<String>, chunk_size: usize) -> JobID {
        let id = self.jobs.len() as JobID;
        self.jobs.push_back(JobRecord {
            id,
            input: input.into(),
            chunk_size,
            state: JobState::Running,
            report: None,
            error: None,
        });
        id
    }

    /// Store the outcome of a job started with [`JobLog::start`].
    pub fn finish(&mut self, id: JobID, outcome: &Result<JobReport, JobError>) {
        let Some(job) = self.get_mut(id) else {
            return;
        };

        match outcome {
            Ok(report) => {
                job.state = JobState::Completed;
                job.report = Some(report.clone());
            }
            Err(e) => {
                job.state = JobState::Failed;
                job.error = Some(e.to_string());
            }
        }
    }

    pub fn get(&self, id: JobID) -> Option<&JobRecord> {
        self.jobs.get(id as usize)
    }

    fn get_mut(&mut self, id: JobID) -> Option<&mut JobRecord> {
        self.jobs.get_mut(id as usize)
    }

    /// Get the entries of all jobs.
    pub fn get_all_jobs(&self) -> &VecDeque<JobRecord> {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> JobReport {
        JobReport {
            aggregate: 45,
            chunks: 3,
            retried: 1,
            workers: 2,
            elapsed: Duration::from_millis(12),
        }
    }

    #[test]
    fn test_history_keeps_outcomes() {
        let mut log = JobLog::new();

        let first = log.start("a.txt", 3);
        let second = log.start("b.txt", 4);
        assert_eq!(log.get(first).unwrap().state, JobState::Running);

        log.finish(first, &Ok(report()));
        log.finish(second, &Err(JobError::NoWorkersAvailable));

        let entries: Vec<JobEntry> = log.get_all_jobs().iter().map(JobRecord::to_entry).collect();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].state, "completed");
        assert_eq!(entries[0].aggregate, 45);
        assert_eq!(entries[0].retried, 1);
        assert_eq!(entries[0].elapsed_ms, 12);
        assert!(entries[0].error.is_empty());

        assert_eq!(entries[1].state, "failed");
        assert_eq!(entries[1].input, "b.txt");
        assert_eq!(entries[1].error, "no workers available");
    }

    #[test]
    fn test_finish_unknown_job_is_ignored() {
        let mut log = JobLog::new();
        log.finish(7, &Ok(report()));
        assert!(log.is_empty());
    }
}

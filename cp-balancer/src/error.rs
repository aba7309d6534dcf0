use std::io;

use thiserror::Error;
use tonic::Status;

/// Why a job produced no aggregate.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("chunk size must be at least one byte, got {0}")]
    InvalidChunkSize(usize),

    #[error("no workers available")]
    NoWorkersAvailable,

    #[error("all {failed} workers in the job failed before the input was consumed")]
    WorkersExhausted { failed: usize },

    #[error("failed to read input `{input}`: {source}")]
    Input {
        input: String,
        #[source]
        source: io::Error,
    },

    #[error("chunk {seq} failed {attempts} times, last error: {reason}")]
    ChunkFailed {
        seq: u64,
        attempts: u32,
        reason: String,
    },

    #[error("aggregate of {results} chunk results overflows a 64-bit integer")]
    AggregateOverflow { results: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<JobError> for Status {
    fn from(err: JobError) -> Self {
        let message = err.to_string();
        match err {
            JobError::InvalidChunkSize(_) => Status::invalid_argument(message),
            JobError::NoWorkersAvailable | JobError::WorkersExhausted { .. } => {
                Status::unavailable(message)
            }
            JobError::Input { .. } => Status::failed_precondition(message),
            JobError::ChunkFailed { .. } => Status::aborted(message),
            JobError::AggregateOverflow { .. } => Status::out_of_range(message),
            JobError::Internal(_) => Status::internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn test_status_codes() {
        let cases = [
            (JobError::InvalidChunkSize(0), Code::InvalidArgument),
            (JobError::NoWorkersAvailable, Code::Unavailable),
            (JobError::WorkersExhausted { failed: 2 }, Code::Unavailable),
            (
                JobError::Input {
                    input: "in.txt".into(),
                    source: io::Error::new(io::ErrorKind::NotFound, "gone"),
                },
                Code::FailedPrecondition,
            ),
            (
                JobError::ChunkFailed {
                    seq: 3,
                    attempts: 3,
                    reason: "boom".into(),
                },
                Code::Aborted,
            ),
            (JobError::AggregateOverflow { results: 2 }, Code::OutOfRange),
            (JobError::Internal("oops".into()), Code::Internal),
        ];

        for (err, code) in cases {
            assert_eq!(Status::from(err).code(), code);
        }
    }

    #[test]
    fn test_message_is_kept() {
        let status = Status::from(JobError::NoWorkersAvailable);
        assert_eq!(status.message(), "no workers available");
    }
}

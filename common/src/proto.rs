//! Wire messages shared by the balancer, the workers and the control client.
//!
//! NOTE: These are TIGHTLY coupled with the service descriptions in `build.rs`.
//!       Tags are part of the wire format, never renumber an existing field.

/////////////////////////////////////////////////////////////////////////////
// Balancer service
/////////////////////////////////////////////////////////////////////////////

/// Sent by a worker on startup to join the roster.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterRequest {
    /// Endpoint the worker's own gRPC server listens on (`host:port`).
    #[prost(string, tag = "1")]
    pub address: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterReply {
    #[prost(bool, tag = "1")]
    pub success: bool,

    /// Roster id assigned to the worker.
    #[prost(uint32, tag = "2")]
    pub worker_id: u32,
}

/// Run one job over a file readable by the balancer.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RunJobRequest {
    #[prost(string, tag = "1")]
    pub input_path: ::prost::alloc::string::String,

    /// Chunk size in bytes. Zero selects the balancer's configured default.
    #[prost(uint64, tag = "2")]
    pub chunk_size: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RunJobReply {
    #[prost(int64, tag = "1")]
    pub aggregate: i64,

    #[prost(uint64, tag = "2")]
    pub chunks: u64,

    #[prost(uint64, tag = "3")]
    pub retried: u64,

    /// Number of workers that answered the readiness probe.
    #[prost(uint32, tag = "4")]
    pub workers: u32,

    #[prost(uint64, tag = "5")]
    pub elapsed_ms: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WorkersRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WorkerEntry {
    #[prost(uint32, tag = "1")]
    pub id: u32,

    #[prost(string, tag = "2")]
    pub address: ::prost::alloc::string::String,

    /// `idle`, `busy` or `failed`.
    #[prost(string, tag = "3")]
    pub state: ::prost::alloc::string::String,

    #[prost(uint32, tag = "4")]
    pub failures: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WorkersReply {
    #[prost(message, repeated, tag = "1")]
    pub workers: ::prost::alloc::vec::Vec<WorkerEntry>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobsRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobEntry {
    #[prost(uint64, tag = "1")]
    pub id: u64,

    #[prost(string, tag = "2")]
    pub input: ::prost::alloc::string::String,

    #[prost(uint64, tag = "3")]
    pub chunk_size: u64,

    /// `running`, `completed` or `failed`.
    #[prost(string, tag = "4")]
    pub state: ::prost::alloc::string::String,

    #[prost(int64, tag = "5")]
    pub aggregate: i64,

    #[prost(uint64, tag = "6")]
    pub chunks: u64,

    #[prost(uint64, tag = "7")]
    pub retried: u64,

    #[prost(uint64, tag = "8")]
    pub elapsed_ms: u64,

    /// Empty unless the job failed.
    #[prost(string, tag = "9")]
    pub error: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobsReply {
    #[prost(message, repeated, tag = "1")]
    pub jobs: ::prost::alloc::vec::Vec<JobEntry>,
}

/////////////////////////////////////////////////////////////////////////////
// Worker service
/////////////////////////////////////////////////////////////////////////////

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadyRequest {
    /// Address of the balancer asking.
    #[prost(string, tag = "1")]
    pub balancer: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadyReply {
    #[prost(bool, tag = "1")]
    pub ready: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecuteRequest {
    #[prost(string, tag = "1")]
    pub balancer: ::prost::alloc::string::String,

    #[prost(bytes = "bytes", tag = "2")]
    pub chunk: ::prost::bytes::Bytes,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecuteReply {
    #[prost(int64, tag = "1")]
    pub result: i64,

    #[prost(bool, tag = "2")]
    pub success: bool,

    /// Why the task failed, empty on success.
    #[prost(string, tag = "3")]
    pub error: ::prost::alloc::string::String,
}

/////////////////////////////////////////////////////////////////////////////
// Generated service stubs
/////////////////////////////////////////////////////////////////////////////

pub mod balancer {
    include!(concat!(env!("OUT_DIR"), "/cp.Balancer.rs"));
}

pub mod worker {
    include!(concat!(env!("OUT_DIR"), "/cp.Worker.rs"));
}

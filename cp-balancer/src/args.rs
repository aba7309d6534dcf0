use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The port for the server to run on.
    #[arg(short, long, default_value = "8030")]
    pub port: u16,

    /// The interface to bind.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Chunk size in bytes for jobs that do not pick one.
    #[arg(short, long, default_value = "30000")]
    pub chunk_size: usize,

    /// Attempts a chunk gets before its job is aborted.
    #[arg(long, default_value = "3")]
    pub max_chunk_attempts: u32,

    /// Readiness probe timeout in milliseconds. 0 waits forever.
    #[arg(long, default_value = "5000")]
    pub probe_timeout_ms: u64,

    /// Chunk execution timeout in milliseconds. 0 waits forever.
    #[arg(long, default_value = "60000")]
    pub execute_timeout_ms: u64,
}

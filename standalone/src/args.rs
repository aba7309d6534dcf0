use clap::Parser;

/// Run a balancer and a pool of workers in one process and time repeated
/// jobs over the same input.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Number of workers to start.
    #[arg(short, long, default_value = "10")]
    pub workers: usize,

    /// Input file.
    #[arg(short, long, default_value = "nums.txt")]
    pub input: String,

    /// Chunk size in bytes.
    #[arg(short, long, default_value_t = common::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Number of times to run the job.
    #[arg(short, long, default_value = "10")]
    pub trials: u32,

    /// Name of the per-chunk workload the workers run.
    #[arg(long, default_value = "digit-sum")]
    pub workload: String,

    /// File to append per-trial timings to.
    #[arg(short, long)]
    pub results: Option<String>,
}

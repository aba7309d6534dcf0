use clap::{Parser, Subcommand};

//
// For parsing user specified command.
//
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Address of the balancer.
    #[arg(short, long, global = true, default_value = "127.0.0.1:8030")]
    pub balancer: String,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a job over a file the balancer can read and print the aggregate.
    Run {
        /// Path of the input file.
        #[arg(short, long)]
        input: String,

        /// Chunk size in bytes. 0 uses the balancer's default.
        #[arg(short, long, default_value = "0")]
        chunk_size: u64,
    },
    /// List every worker in the balancer's roster and its health.
    Workers,
    /// List all jobs run on the balancer and their outcomes.
    Jobs,
}

/// Parse user command.
/// Can be 1 of 3:
/// - run
/// - workers
/// - jobs
pub fn parse_args() -> Args {
    Args::parse()
}

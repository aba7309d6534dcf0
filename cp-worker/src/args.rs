use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The address of the balancer server.
    #[arg(short = 'j', long = "join", default_value = "127.0.0.1:8030")]
    pub balancer: String,

    /// The port to run the worker on. 0 picks a free port.
    #[arg(short, long, default_value = "0")]
    pub port: u16,

    /// The interface to bind and advertise to the balancer.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Name of the per-chunk workload to run.
    #[arg(short, long, default_value = "digit-sum")]
    pub workload: String,
}

mod args;
use args::{parse_args, Commands};

mod core;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args();

    match args.command {
        Commands::Run { input, chunk_size } => {
            crate::core::run(&args.balancer, input, chunk_size).await?;
        }
        Commands::Workers => crate::core::workers(&args.balancer).await?,
        Commands::Jobs => crate::core::jobs(&args.balancer).await?,
    }

    Ok(())
}

use boxbot::{Client, DefaultObserver, PlannerConfig, Strategy};
use clap::Parser;
use dotenv::dotenv;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Soft memory limit for sub-searches, in MB
    #[arg(long, env = "BOXBOT_MAX_MEMORY", default_value_t = 2048.0, value_name = "MB")]
    max_memory: f64,

    /// Frontier used by sub-searches
    #[arg(short, long, env = "BOXBOT_STRATEGY", value_enum, default_value_t = Strategy::Astar)]
    strategy: Strategy,

    /// Weight for the weighted A* strategy
    #[arg(short, long, default_value_t = 5)]
    weight: usize,

    /// Seed for the successor shuffle
    #[arg(long, env = "BOXBOT_SEED", default_value_t = 1)]
    seed: u64,

    /// Conflict tree nodes to expand before giving up
    #[arg(long, default_value_t = 1000)]
    max_ct_nodes: usize,

    /// Folder receiving a log of every run
    #[arg(long, env = "BOXBOT_REPLAYS_FOLDER", value_name = "DIR")]
    replays_folder: Option<String>,
}

impl Args {
    fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            max_memory_mb: self.max_memory,
            strategy: self.strategy,
            weight: self.weight,
            expansion_seed: self.seed,
            max_ct_nodes: self.max_ct_nodes,
        }
    }
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("boxbot=debug,info"));

    // stdout carries the protocol
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let args = Args::parse();
    init_logging()?;

    let config = args.planner_config();
    tracing::info!("Strategy: {}", config.strategy);
    tracing::info!("Max memory: {} MB", config.max_memory_mb);

    let mut client = Client::new(config, args.replays_folder, DefaultObserver);
    if let Err(err) = client.run().await {
        tracing::error!("{}", err);
        tracing::warn!("Unable to solve level.");
    }

    Ok(())
}

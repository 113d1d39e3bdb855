use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod run;

#[derive(Debug, Parser)]
#[command(name = "reelsync")]
#[command(about = "Social media sync, aggregation, and notification engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Execute the stage sequence (all stages, or one with --stage).
    Run {
        /// Run a single named stage instead of the full sequence.
        #[arg(long, value_enum)]
        stage: Option<Stage>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Stage {
    ProfileAgency,
    IngestAgency,
    Metrics,
    ProfileCompetitors,
    IngestCompetitors,
    SwarmPosts,
    SwarmReadiness,
    GrowthMode,
    Notify,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = reelsync_core::load_app_config_from_env()
        .map_err(|e| anyhow::anyhow!("configuration error: {e}"))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::debug!(?config, "configuration loaded");

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { stage } => run::execute(&config, stage).await,
    }
}

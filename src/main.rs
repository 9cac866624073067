use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

mod cache;
mod canon;
mod enrich;
mod http;
mod ingestion;
mod llm;
mod output;
mod pipeline;
mod publish;
mod telemetry;
#[cfg(test)]
mod testutil;
mod util;

#[derive(Parser)]
#[command(name = "news-agent", version, about = "Feed ingestion, enrichment and publishing CLI")]
struct Cli {
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch feeds, enrich new items and publish them
    Run(pipeline::RunCmd),
    /// Inspect or reset the conditional-fetch cache
    Cache(cache::CacheCmd),
    /// Print canonical URL and stable id
    Canon(canon::CanonCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // initialize logging/tracing (stderr). Respect RUST_LOG and NEWS_LOG_FORMAT
    telemetry::config::init_tracing();

    match cli.command {
        Commands::Run(args) => pipeline::run(args).await?,
        Commands::Cache(args) => cache::run(args).await?,
        Commands::Canon(args) => canon::run(args).await?,
    }

    Ok(())
}

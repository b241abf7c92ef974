mod app;
mod cli;
mod config;
mod consts;
mod core;
mod error;
mod pricing;
mod source;
mod utils;

use clap::Parser;

use app::{ReportRequest, Runtime, run_report};
use cli::{Cli, granularity};
use config::{Config, EnvOverrides, Settings};
use error::AppError;
use pricing::default_cache_dir;
use utils::init_logging;

async fn run(cli: Cli) -> Result<String, AppError> {
    let env = EnvOverrides::from_env()?;
    let config = Config::load()?;
    let settings = Settings::resolve(&cli.overrides(), env, config, default_cache_dir())?;

    let request = ReportRequest {
        granularity: granularity(cli.command),
        since: cli.since,
        until: cli.until,
        provider: cli.provider,
        model: cli.model,
        source: cli.source,
    };
    let runtime = Runtime::production(&settings);
    let output = run_report(&request, &settings, runtime).await?;
    Ok(serde_json::to_string_pretty(&output)?)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(cli).await {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

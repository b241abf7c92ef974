//! CLI argument definitions

use clap::Parser;

use crate::config::CliOverrides;

use super::commands::Commands;

#[derive(Debug, Parser)]
#[command(name = "agentcost")]
#[command(about = "Token usage and cost reports for AI coding agents", version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Option<Commands>,

    /// Filter from date (YYYYMMDD or YYYY-MM-DD)
    #[arg(short, long, global = true)]
    pub(crate) since: Option<String>,

    /// Filter until date (YYYYMMDD or YYYY-MM-DD)
    #[arg(short, long, global = true)]
    pub(crate) until: Option<String>,

    /// Timezone for day boundaries (e.g., "Asia/Shanghai", "UTC", "local")
    #[arg(long, global = true, value_name = "TZ")]
    pub(crate) timezone: Option<String>,

    /// Keep events whose provider contains this text (case-insensitive)
    #[arg(long, global = true)]
    pub(crate) provider: Option<String>,

    /// Comma-separated model names; exact when one matches exactly, substring otherwise
    #[arg(short, long, global = true)]
    pub(crate) model: Option<String>,

    /// Comma-separated sources to read (e.g., "claude,cx")
    #[arg(long, global = true)]
    pub(crate) source: Option<String>,

    /// Use cached pricing only (never fetch)
    #[arg(short = 'O', long, global = true)]
    pub(crate) offline: bool,

    /// Rate table URL (LiteLLM format)
    #[arg(long, global = true, value_name = "URL")]
    pub(crate) pricing_url: Option<String>,

    /// Continue without costs when pricing cannot be loaded
    #[arg(long, global = true)]
    pub(crate) ignore_pricing_failures: bool,

    /// Concurrent file parses per source
    #[arg(long, global = true, value_name = "N", allow_negative_numbers = true)]
    pub(crate) concurrency: Option<f64>,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    pub(crate) debug: bool,
}

impl Cli {
    pub(crate) fn overrides(&self) -> CliOverrides {
        CliOverrides {
            timezone: self.timezone.clone(),
            offline: self.offline,
            pricing_url: self.pricing_url.clone(),
            ignore_pricing_failures: self.ignore_pricing_failures,
            concurrency: self.concurrency,
        }
    }
}

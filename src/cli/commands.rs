//! CLI subcommand definitions

use clap::Subcommand;

use crate::core::Granularity;

/// Report period commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub(crate) enum Commands {
    /// Usage per day (default)
    Daily,
    /// Usage per ISO week
    Weekly,
    /// Usage per calendar month
    Monthly,
}

/// Period size for an optional subcommand; no subcommand means daily.
pub(crate) fn granularity(cmd: Option<Commands>) -> Granularity {
    match cmd {
        Some(Commands::Daily) | None => Granularity::Daily,
        Some(Commands::Weekly) => Granularity::Weekly,
        Some(Commands::Monthly) => Granularity::Monthly,
    }
}

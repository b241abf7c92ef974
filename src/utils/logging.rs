use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive that overrides `--debug`.
pub(crate) const LOG_ENV: &str = "AGENTCOST_LOG";

/// Install the stderr subscriber. Safe to call more than once.
pub(crate) fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .compact()
        .try_init();
}

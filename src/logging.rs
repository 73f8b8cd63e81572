use tracing_subscriber::EnvFilter;

/// Diagnostics go to stderr so they don't interleave with the conversation on stdout.
/// `RUST_LOG` wins when set.
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose { "recipe_chat=debug,info" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

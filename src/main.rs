//! Binary entrypoint: tracing bootstrap and CLI dispatch.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use noteflow::cli::Cli;

/// Default directives when `RUST_LOG` is unset. The HTTP trace layer logs
/// its request spans and events at debug; a bare `info` default silences
/// them.
const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    Cli::parse().execute().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_filter_parses_in_full() {
        // EnvFilter::new drops invalid directives silently; try_new
        // surfaces them.
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }
}

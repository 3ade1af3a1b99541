//! Structured logging on stderr.
//!
//! stdout carries the handshake line and nothing else, so every log line
//! goes to stderr. `RUST_LOG` overrides [`DEFAULT_FILTER`]:
//!
//! ```bash
//! RUST_LOG=hemmer_provider_buddy=debug hemmer-provider-buddy
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Provider events at `info`, dependencies at `warn`.
pub const DEFAULT_FILTER: &str = "warn,hemmer_provider_buddy=info";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Returns `false` when one is already set.
pub fn init_logging() -> bool {
    tracing_subscriber::registry()
        .with(filter())
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_parse() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
        assert!(EnvFilter::try_new("hemmer_provider_buddy::sandbox_wait=debug").is_ok());
    }

    #[test]
    fn test_second_init_is_harmless() {
        init_logging();
        assert!(!init_logging());
    }
}

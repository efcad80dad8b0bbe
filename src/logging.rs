//! Structured logging setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable overriding the configured level with a full filter directive.
pub const LOG_ENV: &str = "RUST_LOG";

/// Installs a `fmt` subscriber filtered at `level`, unless `RUST_LOG` says otherwise.
///
/// Returns `false` when a global subscriber was already installed, so calling
/// it more than once is harmless.
pub fn init(level: &str) -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    let stdout = fmt::layer().with_target(true);
    Registry::default().with(filter).with(stdout).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        init("debug");
        assert!(!init("info"));
    }
}

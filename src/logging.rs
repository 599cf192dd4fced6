//! Tracing subscriber setup. Logs go to stderr so hook output never mixes
//! with anything git reads from stdout.
use crate::config::LogLevel;
use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Env var with the highest filter precedence.
pub const LOG_ENV: &str = "DOCMAP_HOOK_LOG";

/// Filter directive: `DOCMAP_HOOK_LOG`, else `RUST_LOG`, else `level`.
pub fn filter_directive<F>(level: LogLevel, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    [LOG_ENV, "RUST_LOG"]
        .into_iter()
        .filter_map(&lookup)
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| level.as_filter().to_string())
}

pub fn init_tracing(level: LogLevel) -> Result<()> {
    let directive = filter_directive(level, |key| std::env::var(key).ok());
    let filter =
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(level.as_filter()));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .map_err(|err| anyhow!("init tracing: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_precedence() {
        let both = |key: &str| match key {
            LOG_ENV => Some("docmap_hook=trace".to_string()),
            "RUST_LOG" => Some("warn".to_string()),
            _ => None,
        };
        assert_eq!(filter_directive(LogLevel::Info, both), "docmap_hook=trace");

        let rust_log = |key: &str| (key == "RUST_LOG").then(|| "error".to_string());
        assert_eq!(filter_directive(LogLevel::Info, rust_log), "error");

        let blank = |key: &str| (key == LOG_ENV).then(|| "  ".to_string());
        assert_eq!(filter_directive(LogLevel::Debug, blank), "debug");
    }
}

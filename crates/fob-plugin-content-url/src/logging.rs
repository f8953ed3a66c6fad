//! Logging setup for binaries and tests that use the plugin directly
//!
//! Only available with the `logging` feature. As a library the plugin only emits
//! `tracing` events under the `fob_plugin_content_url` target; bundlers that
//! already install a subscriber do not need this module.

use std::sync::Once;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Verbosity of content-url logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Silent,
    Error,
    Warn,
    #[default]
    Info,
    /// Per-asset mode decisions
    Debug,
    /// Name interpolation details
    Trace,
}

impl LogLevel {
    fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Silent => "fob_plugin_content_url=off",
            LogLevel::Error => "fob_plugin_content_url=error",
            LogLevel::Warn => "fob_plugin_content_url=warn",
            LogLevel::Info => "fob_plugin_content_url=info",
            LogLevel::Debug => "fob_plugin_content_url=debug",
            LogLevel::Trace => "fob_plugin_content_url=trace",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "off" => Ok(LogLevel::Silent),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("Invalid log level: {}", other)),
        }
    }
}

/// Install a global subscriber for content-url events at `level`.
///
/// Only the first call in a process has an effect. `RUST_LOG` directives are
/// still honored on top of the default.
pub fn init_logging(level: LogLevel) {
    INIT.call_once(|| {
        let filter = match level.as_directive().parse() {
            Ok(directive) => EnvFilter::builder()
                .with_default_directive(directive)
                .from_env_lossy(),
            Err(_) => EnvFilter::from_default_env(),
        };

        // try_init: a host may already own the global subscriber
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false).without_time())
            .try_init();
    });
}

/// Install a subscriber configured purely from `RUST_LOG` (info when unset)
pub fn init_logging_from_env() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false).without_time())
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("OFF".parse::<LogLevel>().unwrap(), LogLevel::Silent);
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(LogLevel::Debug);
        init_logging(LogLevel::Silent);
        init_logging_from_env();
    }
}

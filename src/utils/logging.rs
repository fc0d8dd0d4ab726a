//! Structured logging built on `tracing`.

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level emitted when `RUST_LOG` is not set.
    pub level: Level,
    /// Include timestamps in output.
    pub with_timestamps: bool,
    /// Include the emitting module path.
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            with_timestamps: true,
            with_target: false,
        }
    }
}

impl LogConfig {
    /// Verbose preset for debugging pipeline runs.
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            with_timestamps: true,
            with_target: true,
        }
    }

    /// Quiet preset: warnings and errors only.
    pub fn quiet() -> Self {
        Self {
            level: Level::WARN,
            with_timestamps: false,
            with_target: false,
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured level. Safe to call more than once;
/// later calls are ignored.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_lowercase()));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(config.with_target);

    let result = if config.with_timestamps {
        builder.try_init()
    } else {
        builder.without_time().try_init()
    };

    // Ignore AlreadyInit from repeated calls (tests, embedding crates).
    let _ = result;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(LogConfig::default().level, Level::INFO);
        assert_eq!(LogConfig::verbose().level, Level::DEBUG);
        assert_eq!(LogConfig::quiet().level, Level::WARN);
    }

    #[test]
    fn test_init_is_idempotent() {
        init_logging(&LogConfig::quiet());
        init_logging(&LogConfig::quiet());
    }
}

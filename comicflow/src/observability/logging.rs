//! `tracing` subscriber installation for the binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// How the binary should log.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Log at debug level unless `RUST_LOG` says otherwise.
    pub verbose: bool,
    /// Emit one JSON object per line instead of human-readable text.
    pub json: bool,
}

impl LoggingConfig {
    /// Creates the default configuration (info level, text output).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables debug logging.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Enables JSON logs.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// The filter used when `RUST_LOG` is unset.
    #[must_use]
    pub fn default_directive(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// Installs the global subscriber. Logs go to stderr.
///
/// Fails if a global subscriber is already set or `RUST_LOG` is malformed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.default_directive()))?;

    let fmt_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

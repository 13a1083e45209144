//! Global logger setup for the binary and for hosts embedding the crate.

use std::sync::Once;

/// `env_filter` uses the `env_logger` filter syntax, e.g. "combiner_raytrace=debug".
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
}

static INIT: Once = Once::new();

/// Initializes the global logger once. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        // A host may already own the global logger.
        if builder.try_init().is_err() {
            return;
        }
        log::debug!("logging initialized");
    });
}

//! Logging and tracing initialization.
//!
//! Renders run on whichever producer thread delivered the frame, so the
//! text format tags every line with the emitting thread.

use crate::config::LoggingConfig;

/// Crates whose events follow the configured level. Everything else is
/// held at `warn`.
const TESSERA_TARGETS: [&str; 4] = ["tessera_common", "tessera_frame", "tessera_mixer", "tessera"];

/// Filter directives for a configured level.
///
/// A bare level such as `debug` applies to the Tessera crates only. Anything
/// that already looks like a directive list is used verbatim.
pub fn filter_directives(level: &str) -> String {
    let level = level.trim();
    if level.is_empty() {
        return filter_directives(&LoggingConfig::default().level);
    }
    if level.contains(['=', ',']) {
        return level.to_string();
    }
    let mut directives = String::from("warn");
    for target in TESSERA_TARGETS {
        directives.push_str(&format!(",{target}={level}"));
    }
    directives
}

/// Initialize the tracing subscriber with the given configuration.
///
/// `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&config.level)));

    if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json()
            .with_thread_names(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_names(true)
            .with_thread_ids(true)
            .with_file(false)
            .with_line_number(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}

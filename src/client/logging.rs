// Logging configuration for the GBA state reader

use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

// Keep the guards alive for the lifetime of the program
static LOG_GUARD: OnceLock<Vec<WorkerGuard>> = OnceLock::new();

const CRATE_DIRECTIVE: &str = "gba_state_reader=debug";

/// Initialize logging with optional console and file outputs.
///
/// With neither output enabled, warnings still go to stderr so field
/// failures are never silent.
///
/// # Arguments
/// * `enable_console` - If true, logs will be written to stdout
/// * `log_file_path` - If Some, logs will be written to this file
pub fn init_logging(enable_console: bool, log_file_path: Option<PathBuf>) {
    let mut guards = Vec::new();

    // Filter: INFO by default, DEBUG for this crate, RUST_LOG overrides
    let mut filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    if let Ok(directive) = CRATE_DIRECTIVE.parse::<Directive>() {
        filter = filter.add_directive(directive);
    }

    // Create file layer if path is provided
    let file_layer = log_file_path.and_then(|path| {
        let parent = path.parent()?.to_path_buf();
        let file_name = path.file_name()?.to_str()?.to_string();

        let file_appender = tracing_appender::rolling::never(parent, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        guards.push(guard);

        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false),
        )
    });

    // Create console layer if enabled
    let console_layer = if enable_console {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
        guards.push(guard);

        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false),
        )
    } else {
        None
    };

    // Fallback: warnings to stderr
    let stderr_layer = if file_layer.is_none() && console_layer.is_none() {
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(LevelFilter::WARN),
        )
    } else {
        None
    };

    // Build and set the subscriber; a second call keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .with(stderr_layer)
        .try_init();

    // Store guards to keep logging alive
    let _ = LOG_GUARD.set(guards);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_directive_parses() {
        assert!(CRATE_DIRECTIVE.parse::<Directive>().is_ok());
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_logging(false, None);
        init_logging(false, None);
        tracing::warn!("[logging] test message");
    }
}

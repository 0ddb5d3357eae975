use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

pub const LOG_FILE_NAME: &str = "autobuy.log";

/// Default filter when `RUST_LOG` is unset
pub fn default_filter(config: &LoggingConfig) -> String {
    format!("{},autobuy=debug", config.level.trim())
}

/// Console plus daily rolling file logging.
///
/// The returned guard flushes the file writer and must live as long as the
/// process. `None` means file logging is disabled.
pub fn init_logging(log_dir: &Path, config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(config)));

    // `tracing_appender::rolling::daily` panics if it can't create the
    // initial log file, so writability is preflighted.
    let (file_layer, guard) = match preflight(log_dir) {
        Ok(()) => {
            let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!(
                "Warning: Could not write to log directory {} ({}), file logging disabled",
                log_dir.display(),
                e
            );
            (None, None)
        }
    };

    let console_layer = (!config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
    });
    let json_layer = config
        .json
        .then(|| tracing_subscriber::fmt::layer().json().with_target(true));

    let file_logging_enabled = file_layer.is_some();
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init();
    if let Err(e) = installed {
        eprintln!("Warning: logging already initialised: {}", e);
    }

    if file_logging_enabled {
        eprintln!("Logging to: {}/{}", log_dir.display(), LOG_FILE_NAME);
    }
    guard
}

fn preflight(log_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(log_dir)?;
    let test_path = log_dir.join(".autobuy_write_test");
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&test_path)?;
    let _ = std::fs::remove_file(&test_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_keeps_crate_at_debug() {
        let config = LoggingConfig {
            level: "warn".into(),
            json: false,
        };
        assert_eq!(default_filter(&config), "warn,autobuy=debug");
        assert_eq!(
            default_filter(&LoggingConfig::default()),
            "info,autobuy=debug"
        );
    }

    #[test]
    fn preflight_creates_directory() {
        let dir = std::env::temp_dir().join(format!("autobuy-logs-{}", uuid::Uuid::new_v4()));
        assert!(preflight(&dir).is_ok());
        assert!(dir.is_dir());
        assert!(!dir.join(".autobuy_write_test").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}

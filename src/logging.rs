use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::shared::config::{CONFIG, LoggingConfig};

const LOG_FILE_PREFIX: &str = "telemetry-refiner.log";

/// Install logging from the global `[logging]` settings.
pub fn init() -> anyhow::Result<WorkerGuard> {
    init_with(&CONFIG.logging)
}

/// Stdout plus a daily-rolling file under `log_dir`, each with its own level.
/// The returned guard flushes the file writer on drop; hold it until exit.
pub fn init_with(cfg: &LoggingConfig) -> anyhow::Result<WorkerGuard> {
    let stdout_filter: LevelFilter = cfg.stdout_level.parse()?;
    let file_filter: LevelFilter = cfg.file_level.parse()?;

    let appender = tracing_appender::rolling::daily(&cfg.log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_filter(stdout_filter))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer)
                .with_filter(file_filter),
        )
        .try_init()?;

    info!(
        log_dir = %cfg.log_dir,
        stdout = %stdout_filter,
        file = %file_filter,
        "logging initialized"
    );
    Ok(guard)
}

#[cfg(test)]
pub fn init_for_tests() {
    use std::sync::Once;
    use tracing_subscriber::EnvFilter;

    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("telemetry_refiner=debug"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

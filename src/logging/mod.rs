/*!
 * Logging Module
 * Subscriber setup (console + daily rolling files) and request middleware
 */
pub mod config;
pub mod middleware;

use std::io;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use config::LogLevel;

const LOG_DIR: &str = "logs";

/// Initialize the logging system. The returned guards flush the background
/// writers on drop and must be held for the lifetime of the process.
pub fn init(environment: &str) -> Vec<WorkerGuard> {
    let is_production = environment == "production";

    if let Err(e) = std::fs::create_dir_all(LOG_DIR) {
        eprintln!("Could not create log directory '{LOG_DIR}': {e}");
    }

    // All logs, and errors only
    let (file_writer, file_guard) = non_blocking(rolling::daily(LOG_DIR, "app.log"));
    let (error_writer, error_guard) = non_blocking(rolling::daily(LOG_DIR, "error.log"));
    let (console_writer, console_guard) = non_blocking(io::stdout());

    let level = LogLevel::from_env(is_production);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directives()));

    let error_layer = fmt::layer()
        .json()
        .with_writer(error_writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(tracing_subscriber::filter::LevelFilter::ERROR);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(error_layer);

    if is_production {
        let file_layer = fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        let console_layer = fmt::layer()
            .json()
            .with_writer(console_writer)
            .with_target(false);

        subscriber.with(file_layer).with(console_layer).init();
    } else {
        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false);

        let console_layer = fmt::layer()
            .with_writer(console_writer)
            .with_target(true)
            .pretty();

        subscriber.with(file_layer).with(console_layer).init();
    }

    tracing::info!(level = %level, "Logging initialized for {} environment", environment);

    vec![file_guard, error_guard, console_guard]
}

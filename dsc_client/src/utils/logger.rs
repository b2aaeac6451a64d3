use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::Layer as FmtLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Setup logger configuration for the client
///
/// Console output is always on and honours `RUST_LOG` (default `info`).
///
/// With `log_inside_file` set, three daily-rotated files are written under
/// `log_directory` as well:
/// - `combined` with every level
/// - `warn` with warnings and errors
/// - `error` with errors only
pub fn setup_logger(log_inside_file: bool, log_directory: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout is reserved for command output
    let console_layer = FmtLayer::new()
        .with_writer(std::io::stderr)
        .with_line_number(false)
        .with_target(false)
        .with_thread_ids(false);

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if !log_inside_file {
        registry
            .try_init()
            .context("Failed to install console logger")?;
        return Ok(());
    }

    let directory = Path::new(log_directory);

    let combined_layer = FmtLayer::new()
        .with_writer(rolling_appender(directory, "combined")?)
        .with_ansi(false)
        .with_thread_ids(false);

    let warn_layer = FmtLayer::new()
        .with_writer(rolling_appender(directory, "warn")?)
        .with_ansi(false)
        .with_thread_ids(false)
        .with_filter(EnvFilter::new("warn"));

    let error_layer = FmtLayer::new()
        .with_writer(rolling_appender(directory, "error")?)
        .with_ansi(false)
        .with_thread_ids(false)
        .with_filter(EnvFilter::new("error"));

    registry
        .with(combined_layer)
        .with(warn_layer)
        .with(error_layer)
        .try_init()
        .context("Failed to install file logger")?;

    Ok(())
}

fn rolling_appender(directory: &Path, prefix: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(directory)
        .context(format!("Failed to create {} logs appender", prefix))
}

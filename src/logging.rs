//! Logging setup for the `tablewash` binary.
//!
//! The library only emits `tracing` events. This module installs the
//! subscriber: a console layer on stderr and, when a directory is given, a
//! daily-rolling file layer plus a warnings-only file.
//!
//! ```no_run
//! use std::path::Path;
//!
//! tablewash::logging::init(Some(Path::new("logs"))).expect("logging");
//! tracing::info!("started");
//! ```

use anyhow::{Context as _, Result};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

const MAX_LOG_FILES: usize = 10;

/// Install the global subscriber. `RUST_LOG` overrides the default `info`
/// level.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created, a file appender
/// fails, or a subscriber is already installed.
pub fn init(log_dir: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (all_logs_layer, warn_logs_layer) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

            let all_logs_appender = appender(dir, "tablewash")?;
            let warn_logs_appender = appender(dir, "warnings")?;

            let all_logs = fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(all_logs_appender);
            let warn_logs = fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(warn_logs_appender)
                .with_filter(EnvFilter::new("warn"));
            (Some(all_logs), Some(warn_logs))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(all_logs_layer)
        .with(warn_logs_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(dir) = log_dir {
        tracing::debug!("Logging to {}", dir.display());
    }
    Ok(())
}

fn appender(dir: &Path, prefix: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(dir)
        .with_context(|| format!("Failed to create {prefix} log appender"))
}

//! Logging for Meridian test runs.
//!
//! Installs a tracing subscriber that writes to a trace file in the client
//! trace directory and to the test harness output. Safe to call from every
//! test: only the first call installs anything.

use anyhow::{Context, Result};
use meridian_test_utils::TestEnv;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "meridian_test_utils=debug,meridian_logging=info";
const TRACE_FILE_SUFFIX: &str = "trace.log";

/// Logging configuration for a test binary.
pub struct TestLogConfig<'a> {
    /// Base name of the trace file
    pub app_name: &'a str,
    /// Directory receiving the trace file
    pub trace_dir: PathBuf,
    /// Mirror everything to the test output instead of warnings only
    pub verbose: bool,
}

impl<'a> TestLogConfig<'a> {
    /// Log into the environment's client trace directory.
    pub fn for_env(app_name: &'a str, env: &TestEnv) -> Self {
        Self {
            app_name,
            trace_dir: env.client_trace_dir(),
            verbose: false,
        }
    }

    /// Path of the trace file this config writes.
    pub fn trace_file(&self) -> PathBuf {
        self.trace_dir
            .join(format!("{}.{}", sanitize_name(self.app_name), TRACE_FILE_SUFFIX))
    }
}

/// Initialize tracing with a trace file writer and captured test output.
///
/// Returns `Ok(false)` when a global subscriber is already installed.
pub fn init_test_logging(config: TestLogConfig<'_>) -> Result<bool> {
    ensure_trace_dir(&config.trace_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(sanitize_name(config.app_name))
        .filename_suffix(TRACE_FILE_SUFFIX)
        .build(&config.trace_dir)
        .with_context(|| format!("Failed to open trace file for {}", config.app_name))?;

    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_filter = if config.verbose {
        file_filter.clone()
    } else {
        EnvFilter::new("warn")
    };

    let installed = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_test_writer()
                .with_filter(console_filter),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(file = %config.trace_file().display(), "Test logging initialized");
    }

    Ok(installed)
}

/// Initialize logging into the process environment's trace directory.
pub fn init_from_env(app_name: &str) -> Result<bool> {
    init_test_logging(TestLogConfig::for_env(app_name, TestEnv::global()))
}

fn ensure_trace_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create trace directory: {}", dir.display()))
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}

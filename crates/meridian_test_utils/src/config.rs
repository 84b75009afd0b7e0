//! Process-level test environment configuration.

use crate::dirs::join_dirs;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Default storage engine used when the environment does not name one.
pub const DEFAULT_STORAGE_ENGINE: &str = "MVStore";

/// Default host for networked endpoints.
pub const DEFAULT_HOST: &str = "localhost";

/// Default TCP port for networked endpoints.
pub const DEFAULT_PORT: u16 = 9210;

/// Default database name used by the no-argument render.
pub const DEFAULT_DB_NAME: &str = "test";

/// Environment variable: base directory for test data.
pub const ENV_TEST_DIR: &str = "MERIDIAN_TEST_DIR";
/// Environment variable: default storage engine name.
pub const ENV_STORAGE_ENGINE: &str = "MERIDIAN_DEFAULT_STORAGE_ENGINE";
/// Environment variable: default server host.
pub const ENV_HOST: &str = "MERIDIAN_TEST_HOST";
/// Environment variable: default server port.
pub const ENV_PORT: &str = "MERIDIAN_TEST_PORT";
/// Environment variable: endpoint pinned for the whole test run.
pub const ENV_PINNED_URL: &str = "MERIDIAN_TEST_URL";

/// Test environment shared by every builder and bootstrap in a test run.
///
/// Loaded once (see [`TestEnv::global`]) and read thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestEnv {
    /// Root directory for on-disk databases and logs
    pub base_dir: PathBuf,
    /// Storage engine used by builders that do not set one
    pub default_storage_engine: String,
    /// Default server host
    pub host: String,
    /// Default server port
    pub port: u16,
    /// Endpoint returned verbatim by the no-argument render, if set
    pub pinned_url: Option<String>,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            default_storage_engine: DEFAULT_STORAGE_ENGINE.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            pinned_url: None,
        }
    }
}

impl TestEnv {
    /// Load from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset. A port that does not parse is
    /// logged and replaced with [`DEFAULT_PORT`].
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut env = Self::default();

        if let Some(dir) = get(ENV_TEST_DIR) {
            env.base_dir = PathBuf::from(dir);
        }
        if let Some(engine) = get(ENV_STORAGE_ENGINE) {
            env.default_storage_engine = engine;
        }
        if let Some(host) = get(ENV_HOST) {
            env.host = host;
        }
        if let Some(raw) = get(ENV_PORT) {
            match raw.parse::<u16>() {
                Ok(port) => env.port = port,
                Err(e) => warn!(
                    "Ignoring {}={:?} ({}), using port {}",
                    ENV_PORT, raw, e, DEFAULT_PORT
                ),
            }
        }
        env.pinned_url = get(ENV_PINNED_URL);

        debug!(base_dir = %env.base_dir.display(), "Loaded test environment");
        env
    }

    /// The process-wide environment, loaded from env vars on first use.
    pub fn global() -> &'static TestEnv {
        static GLOBAL: OnceLock<TestEnv> = OnceLock::new();
        GLOBAL.get_or_init(TestEnv::from_env)
    }

    /// Join path segments onto the base test directory.
    pub fn join_dirs<S: AsRef<str>>(&self, segments: &[S]) -> PathBuf {
        join_dirs(&self.base_dir, segments)
    }

    /// Scratch directory for temporary files: `<base>/tmp`.
    pub fn tmp_dir(&self) -> PathBuf {
        self.join_dirs(&["tmp"])
    }

    /// Client trace directory: `<base>/client_trace`.
    pub fn client_trace_dir(&self) -> PathBuf {
        self.join_dirs(&["client_trace"])
    }

    /// Create the base, tmp and client trace directories.
    pub fn prepare(&self) -> Result<()> {
        for dir in [self.base_dir.clone(), self.tmp_dir(), self.client_trace_dir()] {
            create_dir(&dir)?;
        }
        Ok(())
    }
}

fn default_base_dir() -> PathBuf {
    join_dirs(".", &["meridian-test-data", "test"])
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create test directory: {}", dir.display()))
}

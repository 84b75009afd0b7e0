//! Shared transaction engine bootstrap.
//!
//! A test suite usually wants one transaction engine for the whole process.
//! [`SharedEngine`] owns the engine factory and its configuration and hands
//! out the same handle to every caller, initializing it on first request.
//!
//! # Usage
//!
//! ```rust,ignore
//! use meridian_test_utils::{SharedEngine, TestEnv};
//! use std::sync::OnceLock;
//!
//! fn engine() -> &'static SharedEngine<MvccFactory> {
//!     static ENGINE: OnceLock<SharedEngine<MvccFactory>> = OnceLock::new();
//!     ENGINE.get_or_init(|| SharedEngine::for_env(MvccFactory, TestEnv::global()))
//! }
//!
//! #[test]
//! fn test_commit() {
//!     let te = engine().get_or_init().unwrap();
//!     // ...
//! }
//! ```

use crate::config::TestEnv;
use crate::dirs::join_dirs;
use crate::error::{BootstrapError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Name reported by factories that do not override [`TransactionEngineFactory::name`].
pub const DEFAULT_TRANSACTION_ENGINE_NAME: &str = "MVCC";

/// Config key: engine base directory.
pub const KEY_BASE_DIR: &str = "base_dir";
/// Config key: transaction log directory, relative to the base directory.
pub const KEY_TRANSACTION_LOG_DIR: &str = "transaction_log_dir";
/// Config key: log sync policy.
pub const KEY_LOG_SYNC_TYPE: &str = "log_sync_type";

const DEFAULT_TRANSACTION_LOG_DIR: &str = "tlog";

/// When the transaction log is forced to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LogSyncPolicy {
    /// Sync on a background interval
    Periodic,
    /// Sync on every commit
    Instant,
    /// Never sync explicitly (fastest, for tests)
    #[default]
    NoSync,
}

impl LogSyncPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogSyncPolicy::Periodic => "periodic",
            LogSyncPolicy::Instant => "instant",
            LogSyncPolicy::NoSync => "no_sync",
        }
    }
}

impl fmt::Display for LogSyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration handed to the engine exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    base_dir: PathBuf,
    transaction_log_dir: String,
    log_sync: LogSyncPolicy,
}

impl EngineConfig {
    /// Test configuration rooted at `base_dir`, logging to `tlog` without sync.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            transaction_log_dir: DEFAULT_TRANSACTION_LOG_DIR.to_string(),
            log_sync: LogSyncPolicy::default(),
        }
    }

    /// Test configuration rooted at the environment's base directory.
    pub fn for_env(env: &TestEnv) -> Self {
        Self::new(env.base_dir.clone())
    }

    pub fn transaction_log_dir(mut self, dir: impl Into<String>) -> Self {
        self.transaction_log_dir = dir.into();
        self
    }

    pub fn log_sync(mut self, policy: LogSyncPolicy) -> Self {
        self.log_sync = policy;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn log_sync_policy(&self) -> LogSyncPolicy {
        self.log_sync
    }

    /// Absolute location of the transaction log.
    pub fn transaction_log_path(&self) -> PathBuf {
        join_dirs(&self.base_dir, &[self.transaction_log_dir.as_str()])
    }

    /// The key/value view the engine consumes.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                KEY_BASE_DIR.to_string(),
                self.base_dir.to_string_lossy().into_owned(),
            ),
            (
                KEY_TRANSACTION_LOG_DIR.to_string(),
                self.transaction_log_dir.clone(),
            ),
            (KEY_LOG_SYNC_TYPE.to_string(), self.log_sync.to_string()),
        ])
    }
}

/// Creates a transaction engine. Implemented by the engine under test.
pub trait TransactionEngineFactory: Send + Sync {
    /// Handle shared by every test once the engine is up.
    type Handle: Send + Sync + 'static;
    /// Initialization failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Engine name, used in logs and errors.
    fn name(&self) -> &str {
        DEFAULT_TRANSACTION_ENGINE_NAME
    }

    /// Bring the engine up. Called at most once per successful bootstrap.
    fn initialize(&self, config: &EngineConfig) -> std::result::Result<Self::Handle, Self::Error>;
}

/// Lazily initialized engine handle shared across threads.
///
/// Initialization happens under a mutex: the first caller runs the factory
/// while every other caller blocks, then all of them get the same
/// `Arc`. A failed (or panicking) initialization leaves the slot empty, so
/// the next caller retries.
pub struct SharedEngine<F: TransactionEngineFactory> {
    factory: F,
    config: EngineConfig,
    slot: Mutex<Option<Arc<F::Handle>>>,
}

impl<F: TransactionEngineFactory> SharedEngine<F> {
    pub fn new(factory: F, config: EngineConfig) -> Self {
        Self {
            factory,
            config,
            slot: Mutex::new(None),
        }
    }

    /// Shared engine configured from the test environment.
    pub fn for_env(factory: F, env: &TestEnv) -> Self {
        Self::new(factory, EngineConfig::for_env(env))
    }

    /// Return the engine handle, initializing the engine if needed.
    pub fn get_or_init(&self) -> Result<Arc<F::Handle>> {
        let mut slot = self.lock_slot();

        if let Some(handle) = slot.as_ref() {
            debug!(engine = self.factory.name(), "Reusing transaction engine");
            return Ok(Arc::clone(handle));
        }

        info!(
            engine = self.factory.name(),
            base_dir = %self.config.base_dir.display(),
            log_sync = %self.config.log_sync,
            "Initializing transaction engine"
        );

        match self.factory.initialize(&self.config) {
            Ok(handle) => {
                let handle = Arc::new(handle);
                *slot = Some(Arc::clone(&handle));
                Ok(handle)
            }
            Err(e) => {
                warn!(engine = self.factory.name(), "Engine init failed: {}", e);
                Err(BootstrapError::engine_init_failed(self.factory.name(), e))
            }
        }
    }

    /// The handle, if the engine is already up. Never initializes.
    pub fn get(&self) -> Option<Arc<F::Handle>> {
        self.lock_slot().as_ref().map(Arc::clone)
    }

    pub fn is_initialized(&self) -> bool {
        self.lock_slot().is_some()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    // The slot only ever holds a fully built handle, so a poisoned lock
    // still guards a consistent value.
    fn lock_slot(&self) -> MutexGuard<'_, Option<Arc<F::Handle>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//! Meridian Test Utilities
//!
//! Shared scaffolding for Meridian test suites: connection endpoint synthesis
//! across deployment modes and a process-wide transaction engine bootstrap.
//!
//! # Features
//!
//! - `server-tests`: Enable tests that need a running Meridian server
//!
//! # Usage
//!
//! ```rust,ignore
//! use meridian_test_utils::{TestContext, TestEnv};
//!
//! #[test]
//! fn test_embedded_memory() {
//!     let ctx = TestContext::from_env();
//!     let config = ctx.endpoint().embedded(true).in_memory(true).build();
//!
//!     let conn = ctx.connect(&driver::open, &config).unwrap();
//!     // ...
//! }
//! ```

pub mod config;
pub mod context;
pub mod dirs;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod server;

// Re-exports for convenience
pub use config::{TestEnv, DEFAULT_DB_NAME};
pub use context::{ConnectionOpener, TestContext};
pub use dirs::join_dirs;
pub use endpoint::{EndpointBuilder, EndpointConfig, TraceLevel};
pub use engine::{EngineConfig, LogSyncPolicy, SharedEngine, TransactionEngineFactory};
pub use error::{BootstrapError, Result};
pub use server::{is_server_reachable, wait_for_endpoint, wait_for_server};

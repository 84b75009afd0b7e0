//! Error types for the test utilities.

use thiserror::Error;

/// Bootstrap result type.
pub type Result<T> = std::result::Result<T, BootstrapError>;

/// Errors raised while bringing up shared test resources.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// The transaction engine refused to initialize
    #[error("Engine init failed for {engine}: {source}")]
    EngineInitFailed {
        engine: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl BootstrapError {
    /// Create an engine init error.
    pub fn engine_init_failed(
        engine: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        Self::EngineInitFailed {
            engine: engine.into(),
            source: source.into(),
        }
    }
}

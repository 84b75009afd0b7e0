//! Test harness context: pinned endpoint override and connection opening.

use crate::config::{TestEnv, DEFAULT_DB_NAME};
use crate::endpoint::{EndpointBuilder, EndpointConfig};
use tracing::info;

/// Opens a driver connection from a rendered endpoint string.
///
/// Implemented by whatever driver the suite uses. Errors are passed through
/// to the test untouched.
pub trait ConnectionOpener {
    type Connection;
    type Error;

    fn open(&self, url: &str) -> Result<Self::Connection, Self::Error>;
}

impl<C, E, F> ConnectionOpener for F
where
    F: Fn(&str) -> Result<C, E>,
{
    type Connection = C;
    type Error = E;

    fn open(&self, url: &str) -> Result<C, E> {
        self(url)
    }
}

/// Per-run harness state.
///
/// Holds the environment and, optionally, an endpoint pinned for the whole
/// run. When pinned, every URL this context hands out is the pinned one and
/// the builder state is ignored entirely.
#[derive(Debug, Clone)]
pub struct TestContext {
    env: TestEnv,
    pinned_url: Option<String>,
}

impl TestContext {
    /// Context for `env`, pinning `env.pinned_url` if present.
    pub fn new(env: TestEnv) -> Self {
        let pinned_url = env.pinned_url.clone();
        Self { env, pinned_url }
    }

    /// Context for the process environment.
    pub fn from_env() -> Self {
        Self::new(TestEnv::global().clone())
    }

    /// Pin one endpoint for every URL and connection this context produces.
    pub fn with_pinned_url(mut self, url: impl Into<String>) -> Self {
        self.pinned_url = Some(url.into());
        self
    }

    /// Drop any pinned endpoint.
    pub fn without_pinned_url(mut self) -> Self {
        self.pinned_url = None;
        self
    }

    pub fn pinned_url(&self) -> Option<&str> {
        self.pinned_url.as_deref()
    }

    pub fn env(&self) -> &TestEnv {
        &self.env
    }

    /// A builder seeded from this context's environment.
    pub fn endpoint(&self) -> EndpointBuilder {
        EndpointBuilder::from_env(&self.env)
    }

    /// Endpoint for the default database, or the pinned endpoint if set.
    pub fn url(&self, config: &EndpointConfig) -> String {
        match &self.pinned_url {
            Some(url) => url.clone(),
            None => config.render(DEFAULT_DB_NAME),
        }
    }

    /// Endpoint for a named database, or the pinned endpoint if set.
    pub fn url_for(&self, config: &EndpointConfig, database: &str) -> String {
        match &self.pinned_url {
            Some(url) => url.clone(),
            None => config.render(database),
        }
    }

    /// Endpoint with `user`/`password` set, via [`TestContext::url`].
    pub fn url_with_credentials(&self, config: &EndpointConfig, user: &str, password: &str) -> String {
        self.url(&config.with_credentials(user, password))
    }

    /// Log the endpoint for the default database.
    pub fn log_url(&self, config: &EndpointConfig) {
        info!("JDBC URL: {}", self.url(config));
    }

    pub fn connect<O: ConnectionOpener>(
        &self,
        opener: &O,
        config: &EndpointConfig,
    ) -> Result<O::Connection, O::Error> {
        opener.open(&self.url(config))
    }

    pub fn connect_to<O: ConnectionOpener>(
        &self,
        opener: &O,
        config: &EndpointConfig,
        database: &str,
    ) -> Result<O::Connection, O::Error> {
        opener.open(&self.url_for(config, database))
    }

    pub fn connect_as<O: ConnectionOpener>(
        &self,
        opener: &O,
        config: &EndpointConfig,
        user: &str,
        password: &str,
    ) -> Result<O::Connection, O::Error> {
        opener.open(&self.url_with_credentials(config, user, password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn context() -> TestContext {
        TestContext::new(TestEnv::default())
    }

    #[test]
    fn test_url_uses_default_database() {
        let ctx = context();
        let config = ctx.endpoint().host("127.0.0.1").port(5210).build();
        assert!(ctx
            .url(&config)
            .starts_with("jdbc:meridian:tcp://127.0.0.1:5210/test;"));
    }

    #[test]
    fn test_pinned_url_wins() {
        let ctx = context().with_pinned_url("jdbc:meridian:tcp://fixed:1/db");
        let config = ctx.endpoint().embedded(true).build();
        assert_eq!(ctx.url(&config), "jdbc:meridian:tcp://fixed:1/db");
        assert_eq!(
            ctx.url_with_credentials(&config, "bob", "pw"),
            "jdbc:meridian:tcp://fixed:1/db"
        );
        assert_eq!(
            ctx.url_for(&config, "other"),
            "jdbc:meridian:tcp://fixed:1/db"
        );
    }

    #[test]
    fn test_pinned_url_from_env() {
        let env = TestEnv {
            pinned_url: Some("jdbc:meridian:mem:embed:x".to_string()),
            ..TestEnv::default()
        };
        let ctx = TestContext::new(env);
        assert_eq!(ctx.pinned_url(), Some("jdbc:meridian:mem:embed:x"));
        assert!(ctx.without_pinned_url().pinned_url().is_none());
    }

    #[test]
    fn test_url_with_credentials() {
        let ctx = context();
        let config = ctx.endpoint().build();
        let url = ctx.url_with_credentials(&config, "bob", "secret");
        assert!(url.ends_with(";DATABASE_TO_UPPER=false;user=bob;password=secret"));
        assert!(!url.contains("user=sa"));
    }

    #[test]
    fn test_connect_passes_rendered_url() {
        let seen = RefCell::new(Vec::new());
        let opener = |url: &str| -> Result<usize, String> {
            seen.borrow_mut().push(url.to_string());
            Ok(seen.borrow().len())
        };

        let ctx = context();
        let config = ctx.endpoint().build();
        assert_eq!(ctx.connect(&opener, &config).unwrap(), 1);
        assert_eq!(ctx.connect_to(&opener, &config, "orders").unwrap(), 2);
        assert_eq!(ctx.connect_as(&opener, &config, "bob", "pw").unwrap(), 3);

        let seen = seen.borrow();
        assert!(seen[0].contains("/test;"));
        assert!(seen[1].contains("/orders;"));
        assert!(seen[2].contains("user=bob;password=pw"));
    }

    #[test]
    fn test_connect_to_named_database_uses_pinned_url() {
        let seen = RefCell::new(Vec::new());
        let opener = |url: &str| -> Result<(), String> {
            seen.borrow_mut().push(url.to_string());
            Ok(())
        };

        let ctx = context().with_pinned_url("jdbc:meridian:tcp://fixed:1/db");
        let config = ctx.endpoint().embedded(true).build();
        ctx.connect_to(&opener, &config, "orders").unwrap();
        ctx.connect_as(&opener, &config, "bob", "pw").unwrap();

        assert_eq!(
            *seen.borrow(),
            vec!["jdbc:meridian:tcp://fixed:1/db"; 2]
        );
    }

    #[test]
    fn test_connect_error_is_unchanged() {
        let opener = |_: &str| -> Result<(), String> { Err("connection refused".to_string()) };
        let ctx = context();
        let err = ctx.connect(&opener, &ctx.endpoint().build()).unwrap_err();
        assert_eq!(err, "connection refused");
    }
}

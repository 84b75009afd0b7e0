//! Connection endpoint synthesis.
//!
//! An [`EndpointBuilder`] collects mode flags, network target, storage engine
//! and connection parameters, then freezes them into an [`EndpointConfig`]
//! whose [`render`](EndpointConfig::render) produces the endpoint string:
//!
//! ```text
//! jdbc:meridian:[mem:](embed:[<dir>/] | rs://<a>,<b>,<c>/ | (tcp:|ssl:)//<host>:<port>/)<db>
//!     (;|?)default_storage_engine=<name>((;|&)<key>=<value>)*
//! ```

use crate::config::TestEnv;
use indexmap::IndexMap;
use std::fmt;
use std::path::PathBuf;

/// Scheme prefix for every endpoint.
pub const URL_PREFIX: &str = "jdbc:meridian:";
/// In-memory marker.
pub const URL_MEM: &str = "mem:";
/// Embedded (in-process) marker.
pub const URL_EMBED: &str = "embed:";
/// Plain TCP marker.
pub const URL_TCP: &str = "tcp:";
/// TLS marker.
pub const URL_SSL: &str = "ssl:";
/// Replica-set marker.
pub const URL_RS: &str = "rs:";

/// Fixed replica-set members rendered in replica-set mode.
pub const REPLICA_SET_HOSTS: [&str; 3] = ["127.0.0.1", "127.0.0.2", "127.0.0.3"];

/// Parameter carrying the session user.
pub const PARAM_USER: &str = "user";
/// Parameter carrying the session password.
pub const PARAM_PASSWORD: &str = "password";
/// Identifier case-folding setting.
pub const PARAM_DATABASE_TO_UPPER: &str = "DATABASE_TO_UPPER";
/// Server-side trace level written to stdout.
pub const PARAM_TRACE_LEVEL: &str = "TRACE_LEVEL_SYSTEM_OUT";

const DEFAULT_USER: &str = "sa";
const DEFAULT_PASSWORD: &str = "";

/// Server trace verbosity for [`EndpointBuilder::trace_level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceLevel {
    /// Tracing disabled
    Off,
    /// Errors only
    Error,
    /// Errors and informational messages
    Info,
    /// Everything including debug output
    Debug,
    /// Adapter-level tracing
    Adapter,
}

impl TraceLevel {
    /// Numeric level understood by the server.
    pub fn level(&self) -> u8 {
        match self {
            TraceLevel::Off => 0,
            TraceLevel::Error => 1,
            TraceLevel::Info => 2,
            TraceLevel::Debug => 3,
            TraceLevel::Adapter => 4,
        }
    }
}

impl fmt::Display for TraceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

/// Frozen endpoint configuration. Rendering never mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    parameters: IndexMap<String, String>,
    storage_engine: String,
    embedded: bool,
    in_memory: bool,
    mysql_url_style: bool,
    replica_set: bool,
    tls: bool,
    host: String,
    port: u16,
    base_dir: PathBuf,
}

impl EndpointConfig {
    /// Render the endpoint for `database`.
    pub fn render(&self, database: &str) -> String {
        let mut url = String::with_capacity(100);

        url.push_str(URL_PREFIX);
        if self.in_memory {
            url.push_str(URL_MEM);
        }

        if self.embedded {
            url.push_str(URL_EMBED);
            if !self.in_memory {
                url.push_str(&self.base_dir.to_string_lossy());
                url.push('/');
            }
        } else if self.replica_set {
            url.push_str(URL_RS);
            url.push_str("//");
            url.push_str(&REPLICA_SET_HOSTS.join(","));
            url.push('/');
        } else {
            url.push_str(if self.tls { URL_SSL } else { URL_TCP });
            url.push_str("//");
            url.push_str(&self.host_and_port());
            url.push('/');
        }

        let (first_separator, separator) = if self.mysql_url_style {
            ('?', '&')
        } else {
            (';', ';')
        };

        url.push_str(database);
        url.push(first_separator);
        url.push_str("default_storage_engine=");
        url.push_str(&self.storage_engine);

        for (key, value) in self.effective_parameters() {
            url.push(separator);
            url.push_str(key);
            url.push('=');
            url.push_str(value);
        }

        url
    }

    /// Parameters as rendered: injected defaults first, then the caller's
    /// parameters in insertion order. Caller values always win.
    pub fn effective_parameters(&self) -> Vec<(&str, &str)> {
        let mut params = Vec::with_capacity(self.parameters.len() + 3);

        if !self.parameters.contains_key(PARAM_DATABASE_TO_UPPER) {
            params.push((PARAM_DATABASE_TO_UPPER, "false"));
        }
        if !self.parameters.contains_key(PARAM_USER) {
            params.push((PARAM_USER, DEFAULT_USER));
            if !self.parameters.contains_key(PARAM_PASSWORD) {
                params.push((PARAM_PASSWORD, DEFAULT_PASSWORD));
            }
        }

        params.extend(
            self.parameters
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
        params
    }

    /// Copy of this config with `user`/`password` set.
    pub fn with_credentials(&self, user: &str, password: &str) -> EndpointConfig {
        let mut config = self.clone();
        config
            .parameters
            .insert(PARAM_USER.to_string(), user.to_string());
        config
            .parameters
            .insert(PARAM_PASSWORD.to_string(), password.to_string());
        config
    }

    /// `host:port` of the network target.
    pub fn host_and_port(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// True unless the database runs in-process.
    pub fn is_networked(&self) -> bool {
        !self.embedded
    }

    /// True when both embedded and replica-set modes are requested.
    ///
    /// Rendering lets embedded win; this exposes the combination so callers
    /// can reject it if they consider it a configuration mistake.
    pub fn conflicting_modes(&self) -> bool {
        self.embedded && self.replica_set
    }

    pub fn parameters(&self) -> &IndexMap<String, String> {
        &self.parameters
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    pub fn storage_engine(&self) -> &str {
        &self.storage_engine
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    pub fn is_in_memory(&self) -> bool {
        self.in_memory
    }

    pub fn is_mysql_url_style(&self) -> bool {
        self.mysql_url_style
    }

    pub fn is_replica_set(&self) -> bool {
        self.replica_set
    }

    pub fn is_tls(&self) -> bool {
        self.tls
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Fluent builder for [`EndpointConfig`].
///
/// Setters take and return the builder by value and accept anything; there is
/// no validation.
///
/// # Example
///
/// ```rust
/// use meridian_test_utils::EndpointBuilder;
///
/// let url = EndpointBuilder::new()
///     .host("127.0.0.1")
///     .port(5210)
///     .render("test");
/// assert!(url.contains("tcp://127.0.0.1:5210/test;"));
/// ```
#[derive(Debug, Clone)]
pub struct EndpointBuilder {
    config: EndpointConfig,
}

impl Default for EndpointBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointBuilder {
    /// Builder seeded from [`TestEnv::global`].
    pub fn new() -> Self {
        Self::from_env(TestEnv::global())
    }

    /// Builder seeded from an explicit environment.
    pub fn from_env(env: &TestEnv) -> Self {
        Self {
            config: EndpointConfig {
                parameters: IndexMap::new(),
                storage_engine: env.default_storage_engine.clone(),
                embedded: false,
                in_memory: false,
                mysql_url_style: false,
                replica_set: false,
                tls: false,
                host: env.host.clone(),
                port: env.port,
                base_dir: env.base_dir.clone(),
            },
        }
    }

    pub fn storage_engine(mut self, name: impl Into<String>) -> Self {
        self.config.storage_engine = name.into();
        self
    }

    pub fn embedded(mut self, embedded: bool) -> Self {
        self.config.embedded = embedded;
        self
    }

    pub fn in_memory(mut self, in_memory: bool) -> Self {
        self.config.in_memory = in_memory;
        self
    }

    pub fn replica_set(mut self, replica_set: bool) -> Self {
        self.config.replica_set = replica_set;
        self
    }

    pub fn mysql_url_style(mut self, mysql_url_style: bool) -> Self {
        self.config.mysql_url_style = mysql_url_style;
        self
    }

    pub fn tls(mut self, tls: bool) -> Self {
        self.config.tls = tls;
        self
    }

    pub fn enable_tls(self) -> Self {
        self.tls(true)
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Directory rendered for embedded on-disk databases.
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.base_dir = dir.into();
        self
    }

    /// Add or replace a connection parameter.
    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.parameters.insert(key.into(), value.into());
        self
    }

    pub fn credentials(self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.parameter(PARAM_USER, user).parameter(PARAM_PASSWORD, password)
    }

    pub fn trace_level(self, level: TraceLevel) -> Self {
        self.parameter(PARAM_TRACE_LEVEL, level.to_string())
    }

    pub fn enable_trace(self) -> Self {
        self.trace_level(TraceLevel::Info)
    }

    /// Freeze the configuration.
    pub fn build(self) -> EndpointConfig {
        self.config
    }

    /// Render without consuming the builder.
    pub fn render(&self, database: &str) -> String {
        self.config.render(database)
    }
}

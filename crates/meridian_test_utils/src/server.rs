//! Reachability checks for networked test endpoints.

use crate::endpoint::{EndpointConfig, REPLICA_SET_HOSTS};
use anyhow::{bail, Result};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

/// Default timeout for a server to start accepting connections
pub const SERVER_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Interval between reachability attempts
const PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// Upper bound on a single connect attempt
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Check if a TCP port is accepting connections.
pub async fn is_server_reachable(host: &str, port: u16) -> bool {
    let addr = format!("{}:{}", host, port);
    matches!(
        timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr)).await,
        Ok(Ok(_))
    )
}

/// Wait until `host:port` accepts connections or `wait` elapses.
pub async fn wait_for_server(host: &str, port: u16, wait: Duration) -> Result<()> {
    info!("Waiting for server on {}:{}", host, port);

    let start = Instant::now();

    loop {
        if is_server_reachable(host, port).await {
            debug!("{}:{} is reachable after {:?}", host, port, start.elapsed());
            return Ok(());
        }

        if start.elapsed() > wait {
            bail!(
                "Timeout waiting for server on {}:{} after {:?}",
                host,
                port,
                wait
            );
        }

        sleep(PROBE_INTERVAL).await;
    }
}

/// Wait until every server an endpoint targets is reachable.
///
/// Embedded endpoints return immediately. Replica-set endpoints wait on each
/// member at the configured port.
pub async fn wait_for_endpoint(config: &EndpointConfig, wait: Duration) -> Result<()> {
    if !config.is_networked() {
        debug!("Embedded endpoint, nothing to wait for");
        return Ok(());
    }

    if config.is_replica_set() {
        for host in REPLICA_SET_HOSTS {
            wait_for_server(host, config.port(), wait).await?;
        }
        return Ok(());
    }

    wait_for_server(config.host(), config.port(), wait).await
}

//! TCP reachability probe.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// A single bounded-timeout reachability check against a host:port.
///
/// No retries happen at this level; retry policy belongs to the supervisor's
/// failure counter.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// True iff a connection was established within `limit`.
    async fn probe(&self, host: &str, port: u16, limit: Duration) -> bool;
}

/// Plain TCP connect probe
pub struct TcpProbe;

#[async_trait]
impl HealthCheck for TcpProbe {
    async fn probe(&self, host: &str, port: u16, limit: Duration) -> bool {
        match tokio::time::timeout(limit, TcpStream::connect((host, port))).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("probe to {host}:{port} failed: {e}");
                false
            }
            Err(_) => {
                debug!("probe to {host}:{port} timed out after {limit:?}");
                false
            }
        }
    }
}

//! Serve command implementation.

use causal_engine::{EngineConfig, PendingDrain};
use causal_server::{ReplicaServer, ServerConfig};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

/// Options for running one replica.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// This replica's id.
    pub replica_id: u64,
    /// Addresses of all replicas, indexed by id.
    pub peers: Vec<SocketAddr>,
    /// Base gossip interval in microseconds.
    pub gossip_interval_us: u64,
    /// Gossip jitter bound in microseconds.
    pub jitter_us: u64,
    /// Redial delay in milliseconds.
    pub dial_retry_ms: u64,
    /// Rescan the pending buffer until nothing applies.
    pub fixed_point_drain: bool,
    /// Acknowledge received gossip batches.
    pub gossip_acks: bool,
}

impl ServeOptions {
    /// Builds the server configuration these options describe.
    pub fn to_config(&self) -> ServerConfig {
        let drain = if self.fixed_point_drain {
            PendingDrain::FixedPoint
        } else {
            PendingDrain::SinglePass
        };
        let engine = EngineConfig::new()
            .with_pending_drain(drain)
            .with_gossip_acks(self.gossip_acks);

        ServerConfig::new(self.replica_id, self.peers.clone())
            .with_gossip_interval(Duration::from_micros(self.gossip_interval_us))
            .with_gossip_jitter(Duration::from_micros(self.jitter_us))
            .with_dial_retry_delay(Duration::from_millis(self.dial_retry_ms))
            .with_engine(engine)
    }
}

/// Runs a replica until interrupted.
pub async fn run(options: ServeOptions) -> Result<(), Box<dyn std::error::Error>> {
    let server = ReplicaServer::new(options.to_config())?;
    let handle = server.start().await?;

    tokio::signal::ctrl_c().await?;

    let state = handle.state();
    let stats = state.stats();
    info!(
        replica_id = state.id(),
        clock = %state.clock(),
        value = state.current_value(),
        log_len = state.log().len(),
        pending = state.pending().len(),
        deferred = state.unsatisfied().len(),
        requests_served = stats.requests_served,
        operations_applied = stats.operations_applied,
        gossip_sent = stats.gossip_sent,
        "replica shutting down"
    );
    handle.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_map_to_config() {
        let options = ServeOptions {
            replica_id: 1,
            peers: vec![
                "127.0.0.1:7000".parse().unwrap(),
                "127.0.0.1:7001".parse().unwrap(),
            ],
            gossip_interval_us: 2_000,
            jitter_us: 0,
            dial_retry_ms: 50,
            fixed_point_drain: true,
            gossip_acks: false,
        };

        let config = options.to_config();
        assert_eq!(config.replica_id, 1);
        assert_eq!(config.bind_addr().unwrap().port(), 7001);
        assert_eq!(config.gossip_interval, Duration::from_millis(2));
        assert_eq!(config.gossip_jitter, Duration::ZERO);
        assert_eq!(config.dial_retry_delay, Duration::from_millis(50));
        assert_eq!(config.engine.pending_drain, PendingDrain::FixedPoint);
        assert!(!config.engine.acknowledge_gossip);
        assert!(config.validate().is_ok());
    }
}

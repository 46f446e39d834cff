//! Server configuration.

use crate::error::{ServerError, ServerResult};
use causal_engine::EngineConfig;
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for one replica server.
///
/// `peers` lists every replica of the cluster, this one included, indexed
/// by replica id. The server listens on its own entry.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// This replica's id.
    pub replica_id: u64,
    /// Addresses of all replicas, indexed by id.
    pub peers: Vec<SocketAddr>,
    /// Base delay between anti-entropy ticks.
    pub gossip_interval: Duration,
    /// Upper bound of the random delay added to each tick.
    pub gossip_jitter: Duration,
    /// Delay before redialing a peer that refused a connection.
    pub dial_retry_delay: Duration,
    /// Replica state machine settings.
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// Creates a configuration for replica `replica_id` of `peers`.
    pub fn new(replica_id: u64, peers: Vec<SocketAddr>) -> Self {
        Self {
            replica_id,
            peers,
            gossip_interval: Duration::from_micros(1_000),
            gossip_jitter: Duration::from_micros(100),
            dial_retry_delay: Duration::from_millis(100),
            engine: EngineConfig::default(),
        }
    }

    /// Sets the base gossip interval.
    pub fn with_gossip_interval(mut self, interval: Duration) -> Self {
        self.gossip_interval = interval;
        self
    }

    /// Sets the gossip jitter bound.
    pub fn with_gossip_jitter(mut self, jitter: Duration) -> Self {
        self.gossip_jitter = jitter;
        self
    }

    /// Sets the redial delay.
    pub fn with_dial_retry_delay(mut self, delay: Duration) -> Self {
        self.dial_retry_delay = delay;
        self
    }

    /// Sets the engine configuration.
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Number of replicas in the cluster.
    pub fn replicas(&self) -> usize {
        self.peers.len()
    }

    /// Address this replica listens on.
    pub fn bind_addr(&self) -> ServerResult<SocketAddr> {
        usize::try_from(self.replica_id)
            .ok()
            .and_then(|index| self.peers.get(index))
            .copied()
            .ok_or_else(|| {
                ServerError::invalid_config(format!(
                    "replica id {} has no entry among {} peers",
                    self.replica_id,
                    self.peers.len()
                ))
            })
    }

    /// Addresses of every other replica, paired with their ids.
    pub fn remote_peers(&self) -> impl Iterator<Item = (u64, SocketAddr)> + '_ {
        self.peers
            .iter()
            .enumerate()
            .map(|(index, addr)| (index as u64, *addr))
            .filter(move |(id, _)| *id != self.replica_id)
    }

    /// Checks that the configuration describes a working replica.
    pub fn validate(&self) -> ServerResult<()> {
        if self.peers.is_empty() {
            return Err(ServerError::invalid_config("peer list is empty"));
        }
        self.bind_addr()?;
        if self.gossip_interval.is_zero() && self.gossip_jitter.is_zero() {
            return Err(ServerError::invalid_config(
                "gossip interval and jitter cannot both be zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peers(n: u16) -> Vec<SocketAddr> {
        (0..n)
            .map(|i| SocketAddr::from(([127, 0, 0, 1], 7000 + i)))
            .collect()
    }

    #[test]
    fn default_timings() {
        let config = ServerConfig::new(0, peers(3));
        assert_eq!(config.gossip_interval, Duration::from_micros(1_000));
        assert_eq!(config.gossip_jitter, Duration::from_micros(100));
        assert_eq!(config.replicas(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new(1, peers(2))
            .with_gossip_interval(Duration::from_millis(5))
            .with_gossip_jitter(Duration::ZERO)
            .with_dial_retry_delay(Duration::from_millis(20))
            .with_engine(EngineConfig::new().with_gossip_acks(false));

        assert_eq!(config.gossip_interval, Duration::from_millis(5));
        assert_eq!(config.dial_retry_delay, Duration::from_millis(20));
        assert!(!config.engine.acknowledge_gossip);
        assert_eq!(config.bind_addr().unwrap().port(), 7001);
    }

    #[test]
    fn remote_peers_skip_self() {
        let config = ServerConfig::new(1, peers(3));
        let ids: Vec<_> = config.remote_peers().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn invalid_configs_rejected() {
        assert!(ServerConfig::new(0, Vec::new()).validate().is_err());
        assert!(ServerConfig::new(3, peers(3)).validate().is_err());

        let silent = ServerConfig::new(0, peers(1))
            .with_gossip_interval(Duration::ZERO)
            .with_gossip_jitter(Duration::ZERO);
        assert!(silent.validate().is_err());
    }
}

//! Configuration for the replica engine.

/// Highest own-coordinate value (and own-origin log length) at which a
/// write is still admitted. Keeps the increment clear of `u64::MAX`.
pub const COUNTER_CEILING: u64 = u64::MAX - 2;

/// How the pending buffer is rescanned after a gossip batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingDrain {
    /// One pass over the buffer per batch. A chain of buffered operations
    /// may need several later batches to fully drain.
    #[default]
    SinglePass,
    /// Rescan until a pass applies nothing. Any chain whose links are all
    /// buffered drains within the same batch.
    FixedPoint,
}

/// Configuration for a replica engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pending-buffer drain policy.
    pub pending_drain: PendingDrain,
    /// Whether to answer each gossip batch with a gossip ack.
    pub acknowledge_gossip: bool,
    /// Write admission ceiling for the own counter and own-origin log.
    pub counter_ceiling: u64,
}

impl EngineConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self {
            pending_drain: PendingDrain::SinglePass,
            acknowledge_gossip: true,
            counter_ceiling: COUNTER_CEILING,
        }
    }

    /// Sets the pending-buffer drain policy.
    pub fn with_pending_drain(mut self, drain: PendingDrain) -> Self {
        self.pending_drain = drain;
        self
    }

    /// Enables or disables gossip acknowledgments.
    pub fn with_gossip_acks(mut self, enabled: bool) -> Self {
        self.acknowledge_gossip = enabled;
        self
    }

    /// Sets the write admission ceiling.
    pub fn with_counter_ceiling(mut self, ceiling: u64) -> Self {
        self.counter_ceiling = ceiling.min(COUNTER_CEILING);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

//! Read and write command implementations.

use causal_protocol::VectorClock;
use causal_server::ReplicaClient;
use rand::Rng;
use serde::Serialize;
use std::net::SocketAddr;
use thiserror::Error;

/// A `--clock` argument that is not a comma-separated list of counters.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid clock {input:?}: expected comma-separated counters such as 1,0,2")]
pub struct ClockParseError {
    input: String,
}

/// Parses a clock written as `1,0,2`.
pub fn parse_clock(input: &str) -> Result<VectorClock, ClockParseError> {
    input
        .split(',')
        .map(|part| part.trim().parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map(VectorClock::from)
        .map_err(|_| ClockParseError {
            input: input.to_string(),
        })
}

/// Where a client request goes and what the session has already seen.
#[derive(Debug, Clone)]
pub struct Target {
    /// Addresses of all replicas, indexed by id.
    pub peers: Vec<SocketAddr>,
    /// Replica to send the request to.
    pub replica_id: u64,
    /// Client id. A fresh random id is used when absent.
    ///
    /// A replica keeps routing replies for an id to the first connection
    /// that used it, so an explicit id must not be reused across runs
    /// against the same replica.
    pub client_id: Option<u64>,
    /// Clock the session has already observed.
    pub clock: Option<VectorClock>,
}

/// Result of one client request.
#[derive(Debug, Serialize)]
pub struct RequestResult {
    /// Operation performed.
    pub op: &'static str,
    /// Replica that answered.
    pub replica_id: u64,
    /// Value read, if this was a read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u64>,
    /// Session clock after the reply.
    pub clock: Vec<u64>,
}

impl RequestResult {
    fn print(&self, format: &str) -> Result<(), Box<dyn std::error::Error>> {
        match format {
            "json" => println!("{}", serde_json::to_string(self)?),
            "text" => {
                let clock = VectorClock::from(self.clock.clone());
                match self.value {
                    Some(value) => println!("{value} {clock}"),
                    None => println!("ok {clock}"),
                }
            }
            other => return Err(format!("Unknown format: {other}").into()),
        }
        Ok(())
    }
}

async fn connect(target: &Target) -> Result<ReplicaClient, Box<dyn std::error::Error>> {
    let addr = usize::try_from(target.replica_id)
        .ok()
        .and_then(|index| target.peers.get(index))
        .copied()
        .ok_or_else(|| {
            format!(
                "Replica {} is not among {} peers",
                target.replica_id,
                target.peers.len()
            )
        })?;

    let clock = match &target.clock {
        Some(clock) => {
            clock.check_len(target.peers.len())?;
            clock.clone()
        }
        None => VectorClock::zeroed(target.peers.len()),
    };
    let client_id = target.client_id.unwrap_or_else(fresh_client_id);
    Ok(ReplicaClient::connect_with_clock(addr, target.replica_id, client_id, clock).await?)
}

/// Random client id for a one-shot session.
fn fresh_client_id() -> u64 {
    rand::thread_rng().gen()
}

/// Runs the read command.
pub async fn read(target: &Target, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = connect(target).await?;
    let value = client.read().await?;
    RequestResult {
        op: "read",
        replica_id: target.replica_id,
        value: Some(value),
        clock: client.into_clock().into_counters(),
    }
    .print(format)
}

/// Runs the write command.
pub async fn write(
    target: &Target,
    data: u64,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = connect(target).await?;
    client.write(data).await?;
    RequestResult {
        op: "write",
        replica_id: target.replica_id,
        value: None,
        clock: client.into_clock().into_counters(),
    }
    .print(format)
}

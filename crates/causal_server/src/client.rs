//! Client session against one replica.
//!
//! A session remembers the largest clock it has observed and sends it as
//! the dependency of every request. Moving a session's clock to another
//! replica with [`ReplicaClient::connect_with_clock`] keeps read-your-writes
//! and monotonic reads across replicas.
//!
//! A replica sends replies for a client id to the first connection that
//! used it, for as long as it runs. Reusing an id on a new connection to
//! the same replica is unsupported: the replies go to the old connection.

use crate::error::{ServerError, ServerResult};
use crate::transport::{read_frame, write_frame};
use causal_protocol::{ClientReply, ClientRequest, Message, VectorClock};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// A client connected to one replica.
#[derive(Debug)]
pub struct ReplicaClient {
    stream: TcpStream,
    replica_id: u64,
    client_id: u64,
    clock: VectorClock,
}

impl ReplicaClient {
    /// Connects a fresh session to replica `replica_id` of a cluster of
    /// `replicas`.
    pub async fn connect(
        addr: SocketAddr,
        replica_id: u64,
        client_id: u64,
        replicas: usize,
    ) -> ServerResult<Self> {
        Self::connect_with_clock(addr, replica_id, client_id, VectorClock::zeroed(replicas)).await
    }

    /// Connects a session that has already observed `clock`.
    pub async fn connect_with_clock(
        addr: SocketAddr,
        replica_id: u64,
        client_id: u64,
        clock: VectorClock,
    ) -> ServerResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!(%addr, replica_id, client_id, "client connected");
        Ok(Self {
            stream,
            replica_id,
            client_id,
            clock,
        })
    }

    /// Reads the register.
    ///
    /// Blocks until the replica has seen everything this session has.
    pub async fn read(&mut self) -> ServerResult<u64> {
        let request = ClientRequest::read(self.client_id, self.replica_id, self.clock.clone());
        let reply = self.call(request).await?;
        Ok(reply.data)
    }

    /// Writes `data` to the register and returns the write's clock.
    pub async fn write(&mut self, data: u64) -> ServerResult<VectorClock> {
        let request =
            ClientRequest::write(self.client_id, self.replica_id, data, self.clock.clone());
        let reply = self.call(request).await?;
        Ok(reply.clock)
    }

    /// Largest clock this session has observed.
    pub fn clock(&self) -> &VectorClock {
        &self.clock
    }

    /// Ends the session, keeping its clock.
    pub fn into_clock(self) -> VectorClock {
        self.clock
    }

    async fn call(&mut self, request: ClientRequest) -> ServerResult<ClientReply> {
        write_frame(&mut self.stream, &request.into()).await?;
        loop {
            match read_frame(&mut self.stream).await? {
                None => return Err(ServerError::ConnectionClosed),
                Some(Message::ClientReply(reply)) if reply.client_id == self.client_id => {
                    reply.clock.check_len(self.clock.len())?;
                    self.clock.merge_in(&reply.clock);
                    trace!(clock = %self.clock, "client clock advanced");
                    return Ok(reply);
                }
                Some(other) => {
                    debug!(kind = other.kind(), "client ignoring unexpected message");
                }
            }
        }
    }
}

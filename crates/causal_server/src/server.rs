//! Replica server.
//!
//! One server hosts one replica. The replica lives behind a single mutex;
//! every inbound message is fed through the dispatcher while holding it,
//! and the resulting messages are routed to per-link writer queues after
//! the lock is released. Sockets are only ever touched by the tasks that
//! own them.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::registry::ConnectionRegistry;
use crate::transport::{read_frame, write_frame};
use causal_engine::{Replica, ReplicaState, ReplicaStats};
use causal_protocol::Message;
use parking_lot::Mutex;
use rand::Rng;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, trace, warn};

/// Pause after a failed `accept` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// State shared by every task of one server.
struct Shared {
    replica: Mutex<Replica>,
    gossip_links: ConnectionRegistry<u64>,
    ack_links: ConnectionRegistry<u64>,
    clients: ConnectionRegistry<u64>,
}

impl Shared {
    /// Runs one message through the replica and routes what it emits.
    fn dispatch(&self, message: Message) {
        let outbound = self.replica.lock().handle(message);
        self.route_all(outbound);
    }

    fn route_all(&self, outbound: Vec<Message>) {
        for message in outbound {
            self.route(message);
        }
    }

    fn route(&self, message: Message) {
        let (registry, key) = match &message {
            Message::ClientReply(reply) => (&self.clients, reply.client_id),
            Message::Gossip(batch) => (&self.gossip_links, batch.receiver_id),
            Message::GossipAck(ack) => (&self.ack_links, ack.receiver_id),
            Message::ClientRequest(_) | Message::Tick => {
                warn!(kind = message.kind(), "replica emitted an unroutable message");
                return;
            }
        };

        if let Err(message) = registry.send(&key, message) {
            warn!(
                kind = message.kind(),
                destination = key,
                "no open link; message dropped"
            );
        }
    }
}

/// A replica server that has not started yet.
pub struct ReplicaServer {
    config: ServerConfig,
    shared: Arc<Shared>,
}

impl ReplicaServer {
    /// Creates a server from a validated configuration.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let replica = Replica::new(config.replica_id, config.replicas(), config.engine.clone())?;
        let shared = Arc::new(Shared {
            replica: Mutex::new(replica),
            gossip_links: ConnectionRegistry::new(),
            ack_links: ConnectionRegistry::new(),
            clients: ConnectionRegistry::new(),
        });
        Ok(Self { config, shared })
    }

    /// Binds this replica's own peer address and starts serving.
    pub async fn start(self) -> ServerResult<ServerHandle> {
        let listener = TcpListener::bind(self.config.bind_addr()?).await?;
        self.serve_on(listener)
    }

    /// Starts serving on an already bound listener.
    ///
    /// Spawns the accept loop, two outbound links per peer, and the gossip
    /// ticker onto the current tokio runtime.
    pub fn serve_on(self, listener: TcpListener) -> ServerResult<ServerHandle> {
        let local_addr = listener.local_addr()?;
        let config = self.config;
        let shared = self.shared;
        info!(
            replica_id = config.replica_id,
            replicas = config.replicas(),
            %local_addr,
            "replica listening"
        );

        let mut tasks = Vec::new();
        for (peer, addr) in config.remote_peers() {
            let (gossip_tx, gossip_rx) = mpsc::unbounded_channel();
            shared.gossip_links.register(peer, gossip_tx);
            tasks.push(tokio::spawn(run_peer_link(
                peer,
                addr,
                config.dial_retry_delay,
                gossip_rx,
                "gossip",
            )));

            let (ack_tx, ack_rx) = mpsc::unbounded_channel();
            shared.ack_links.register(peer, ack_tx);
            tasks.push(tokio::spawn(run_peer_link(
                peer,
                addr,
                config.dial_retry_delay,
                ack_rx,
                "ack",
            )));
        }

        tasks.push(tokio::spawn(run_accept_loop(Arc::clone(&shared), listener)));
        tasks.push(tokio::spawn(run_ticker(
            Arc::clone(&shared),
            config.gossip_interval,
            config.gossip_jitter,
        )));

        Ok(ServerHandle {
            local_addr,
            shared,
            tasks,
        })
    }
}

/// A running replica server.
///
/// Dropping the handle stops the server's tasks.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shared: Arc<Shared>,
    tasks: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Address the server accepts connections on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Snapshot of the replica state.
    pub fn state(&self) -> ReplicaState {
        self.shared.replica.lock().state().clone()
    }

    /// Snapshot of the replica counters.
    pub fn stats(&self) -> ReplicaStats {
        self.shared.replica.lock().state().stats().clone()
    }

    /// Number of clients that have a reply link.
    pub fn client_count(&self) -> usize {
        self.shared.clients.len()
    }

    /// Stops the server.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Accepts inbound connections until aborted.
///
/// Connection tasks live in a [`JoinSet`], so aborting the loop also
/// closes every connection it accepted.
async fn run_accept_loop(shared: Arc<Shared>, listener: TcpListener) {
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, remote)) => {
                    debug!(%remote, "accepted connection");
                    connections.spawn(serve_connection(Arc::clone(&shared), stream, remote));
                }
                Err(err) => {
                    warn!(error = %err, "accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }
}

/// Serves one inbound connection until either direction fails.
///
/// Peers only ever write to connections they dialed, so anything sent back
/// on an inbound connection is a client reply.
async fn serve_connection(shared: Arc<Shared>, stream: TcpStream, remote: SocketAddr) {
    if let Err(err) = stream.set_nodelay(true) {
        debug!(%remote, error = %err, "could not disable Nagle");
    }
    let (mut reader, mut writer) = stream.into_split();
    let (link, queue) = mpsc::unbounded_channel::<Message>();

    let result = tokio::select! {
        result = read_loop(&shared, &mut reader, &link, remote) => result,
        result = write_loop(&mut writer, queue) => result,
    };
    match result {
        Ok(()) => debug!(%remote, "connection closed"),
        Err(err) => warn!(%remote, error = %err, "connection failed"),
    }
}

/// Feeds every frame read from `reader` to the replica.
///
/// The connection becomes a client's reply link on the first request it
/// carries for that client.
async fn read_loop(
    shared: &Shared,
    reader: &mut OwnedReadHalf,
    link: &UnboundedSender<Message>,
    remote: SocketAddr,
) -> ServerResult<()> {
    while let Some(message) = read_frame(reader).await? {
        match &message {
            Message::ClientRequest(request) => {
                if shared.clients.register(request.client_id, link.clone()) {
                    debug!(client_id = request.client_id, %remote, "registered client link");
                }
            }
            Message::Tick | Message::ClientReply(_) => {
                warn!(kind = message.kind(), %remote, "ignoring message not meant for the wire");
                continue;
            }
            Message::Gossip(_) | Message::GossipAck(_) => {}
        }
        trace!(kind = message.kind(), %remote, "received");
        shared.dispatch(message);
    }
    Ok(())
}

async fn write_loop(
    writer: &mut OwnedWriteHalf,
    mut queue: UnboundedReceiver<Message>,
) -> ServerResult<()> {
    while let Some(message) = queue.recv().await {
        write_frame(writer, &message).await?;
    }
    Ok(())
}

/// Owns the outbound link to one peer.
///
/// Dials until the peer accepts, then drains the queue onto the socket. A
/// write that fails on the socket redials and resends the message; a
/// message that cannot be framed at all is dropped and the link stays up.
async fn run_peer_link(
    peer: u64,
    addr: SocketAddr,
    retry_delay: Duration,
    mut queue: UnboundedReceiver<Message>,
    role: &'static str,
) {
    let mut unsent = None;
    loop {
        let mut stream = dial(peer, addr, retry_delay, role).await;
        loop {
            let message = match unsent.take() {
                Some(message) => message,
                None => match queue.recv().await {
                    Some(message) => message,
                    None => return,
                },
            };
            if let Err(err) = write_frame(&mut stream, &message).await {
                if !err.is_retryable() {
                    warn!(peer, role, kind = message.kind(), error = %err, "dropping unsendable message");
                    continue;
                }
                warn!(peer, %addr, role, error = %err, "peer link failed; redialing");
                unsent = Some(message);
                break;
            }
        }
    }
}

async fn dial(peer: u64, addr: SocketAddr, retry_delay: Duration, role: &'static str) -> TcpStream {
    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                if let Err(err) = stream.set_nodelay(true) {
                    debug!(peer, error = %err, "could not disable Nagle");
                }
                info!(peer, %addr, role, "connected to peer");
                return stream;
            }
            Err(err) => {
                debug!(peer, %addr, role, error = %err, "dial failed; retrying");
                tokio::time::sleep(retry_delay).await;
            }
        }
    }
}

/// Injects anti-entropy ticks.
///
/// Ticks are skipped while this replica has never originated a write.
async fn run_ticker(shared: Arc<Shared>, interval: Duration, jitter: Duration) {
    loop {
        tokio::time::sleep(interval + jitter_delay(jitter)).await;
        let outbound = {
            let mut replica = shared.replica.lock();
            if !replica.has_own_operations() {
                continue;
            }
            replica.handle(Message::Tick)
        };
        shared.route_all(outbound);
    }
}

/// Uniform random delay in `[0, jitter)`, at microsecond resolution.
fn jitter_delay(jitter: Duration) -> Duration {
    let micros = u64::try_from(jitter.as_micros()).unwrap_or(u64::MAX);
    if micros == 0 {
        return Duration::ZERO;
    }
    Duration::from_micros(rand::thread_rng().gen_range(0..micros))
}

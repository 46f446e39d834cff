//! End-to-end tests: replicas talking over loopback TCP.

use causal_protocol::VectorClock;
use causal_server::{ReplicaClient, ReplicaServer, ServerConfig, ServerHandle};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::timeout;

const DEADLINE: Duration = Duration::from_secs(10);

/// Starts a cluster of `size` replicas on ephemeral loopback ports.
async fn start_cluster(size: usize) -> Vec<ServerHandle> {
    let mut listeners = Vec::new();
    for _ in 0..size {
        listeners.push(TcpListener::bind("127.0.0.1:0").await.unwrap());
    }
    let peers: Vec<SocketAddr> = listeners
        .iter()
        .map(|l| l.local_addr().unwrap())
        .collect();

    listeners
        .into_iter()
        .enumerate()
        .map(|(id, listener)| {
            let config = ServerConfig::new(id as u64, peers.clone())
                .with_gossip_interval(Duration::from_millis(2))
                .with_gossip_jitter(Duration::from_millis(1))
                .with_dial_retry_delay(Duration::from_millis(10));
            ReplicaServer::new(config)
                .unwrap()
                .serve_on(listener)
                .unwrap()
        })
        .collect()
}

async fn wait_for_clock(handle: &ServerHandle, expected: &VectorClock) {
    timeout(DEADLINE, async {
        while handle.state().clock() != expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn write_then_read_on_same_replica() {
    let cluster = start_cluster(2).await;
    let mut client = ReplicaClient::connect(cluster[0].local_addr(), 0, 1, 2)
        .await
        .unwrap();

    let clock = client.write(42).await.unwrap();
    assert_eq!(clock, VectorClock::from([1, 0]));
    assert_eq!(client.read().await.unwrap(), 42);
    assert_eq!(client.clock(), &VectorClock::from([1, 0]));
    assert_eq!(cluster[0].client_count(), 1);
}

#[tokio::test]
async fn consecutive_sessions_with_distinct_ids() {
    let cluster = start_cluster(1).await;
    let addr = cluster[0].local_addr();

    let mut first = ReplicaClient::connect(addr, 0, 10, 1).await.unwrap();
    first.write(5).await.unwrap();
    let clock = first.into_clock();

    // Replies follow the first connection an id arrived on, so a new
    // connection needs a new id.
    let mut second = ReplicaClient::connect_with_clock(addr, 0, 11, clock)
        .await
        .unwrap();
    let value = timeout(DEADLINE, second.read()).await.unwrap().unwrap();
    assert_eq!(value, 5);
    assert_eq!(cluster[0].client_count(), 2);
    assert_eq!(cluster[0].stats().requests_served, 2);
}

#[tokio::test]
async fn session_reads_its_write_on_another_replica() {
    let cluster = start_cluster(2).await;

    let mut at_r0 = ReplicaClient::connect(cluster[0].local_addr(), 0, 1, 2)
        .await
        .unwrap();
    at_r0.write(7).await.unwrap();

    // The session moves to replica 1 carrying [1,0]; the read is held
    // until gossip from replica 0 arrives.
    let mut at_r1 =
        ReplicaClient::connect_with_clock(cluster[1].local_addr(), 1, 2, at_r0.into_clock())
            .await
            .unwrap();
    let value = timeout(DEADLINE, at_r1.read()).await.unwrap().unwrap();
    assert_eq!(value, 7);
    assert!(at_r1.clock().dominates(&VectorClock::from([1, 0])));
}

#[tokio::test]
async fn concurrent_writes_converge() {
    let cluster = start_cluster(3).await;

    let mut a = ReplicaClient::connect(cluster[0].local_addr(), 0, 1, 3)
        .await
        .unwrap();
    let mut b = ReplicaClient::connect(cluster[1].local_addr(), 1, 2, 3)
        .await
        .unwrap();
    a.write(10).await.unwrap();
    b.write(20).await.unwrap();

    let expected = VectorClock::from([1, 1, 0]);
    for handle in &cluster {
        wait_for_clock(handle, &expected).await;
        // [1,0,0] orders after [0,1,0].
        assert_eq!(handle.state().current_value(), 10);
    }

    // Acks eventually settle every watermark at the writer's log length.
    timeout(DEADLINE, async {
        loop {
            let r0 = cluster[0].state();
            let r1 = cluster[1].state();
            if r0.gossip_acks() == [0, 1, 1] && r1.gossip_acks() == [1, 0, 1] {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn replica_waits_for_peer_that_starts_late() {
    let early = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let late = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let peers = vec![early.local_addr().unwrap(), late.local_addr().unwrap()];
    let late_addr = peers[1];
    drop(late);

    let config = |id| {
        ServerConfig::new(id, peers.clone())
            .with_gossip_interval(Duration::from_millis(2))
            .with_dial_retry_delay(Duration::from_millis(10))
    };
    let r0 = ReplicaServer::new(config(0)).unwrap().serve_on(early).unwrap();

    let mut client = ReplicaClient::connect(r0.local_addr(), 0, 1, 2).await.unwrap();
    client.write(5).await.unwrap();

    // Gossip for replica 1 queues until it comes up.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let listener = TcpListener::bind(late_addr).await.unwrap();
    let r1 = ReplicaServer::new(config(1)).unwrap().serve_on(listener).unwrap();

    wait_for_clock(&r1, &VectorClock::from([1, 0])).await;
    assert_eq!(r1.state().current_value(), 5);
    assert_eq!(r0.stats().requests_served, 1);
}

//! End-to-end tests for the switch over real localhost TCP: route
//! learning, pending delivery, route overwrite, framing violations,
//! disconnect cleanup and the sink hand-off.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use codec::{Frame, FRAME_SIZE, LOG_RECORD_TAG};
use sink::RecordReceiver;
use switch::{Switch, SwitchConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

/// Comfortably longer than the test poll interval: after one of
/// these, every frame already written has been through a cycle.
const CYCLE: Duration = Duration::from_millis(250);

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn test_config() -> SwitchConfig {
    SwitchConfig {
        port: 0,
        poll_interval_ms: 25,
        accept_interval_ms: 25,
        send_timeout_ms: 100,
        ..SwitchConfig::default()
    }
}

async fn start_switch(config: SwitchConfig) -> (Switch, RecordReceiver) {
    let (log_tx, log_rx) = sink::record_queue(config.log_queue_depth);
    let switch = Switch::start(config, log_tx).await.unwrap();
    (switch, log_rx)
}

struct Client {
    stream: TcpStream,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.unwrap(),
        }
    }

    /// Connect and claim an identity with the conventional announce
    /// frame (mti 0, dst 0).
    async fn announce(addr: SocketAddr, id: u32) -> Self {
        let mut client = Self::connect(addr).await;
        client.send(Frame::request(0, id, 0)).await;
        client
    }

    async fn send(&mut self, frame: Frame) {
        self.stream.write_all(&frame.encode()).await.unwrap();
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    async fn recv(&mut self) -> Frame {
        let mut buf = [0u8; FRAME_SIZE];
        timeout(RECV_TIMEOUT, self.stream.read_exact(&mut buf))
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed while waiting for a frame");
        Frame::from_bytes(&buf)
    }

    /// Assert that nothing arrives for a little while.
    async fn expect_silence(&mut self) {
        let mut buf = [0u8; FRAME_SIZE];
        let got = timeout(Duration::from_millis(300), self.stream.read_exact(&mut buf)).await;
        assert!(got.is_err(), "expected no traffic, got a frame");
    }
}

async fn next_record(rx: &mut RecordReceiver) -> Frame {
    let record = timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for a sink record")
        .expect("record queue closed unexpectedly");
    assert_eq!(record.tag, LOG_RECORD_TAG);
    Frame::from_bytes(&record.frame)
}

#[tokio::test]
async fn frames_route_to_the_member_owning_the_destination_id() {
    let (switch, mut log_rx) = start_switch(test_config()).await;
    let addr = switch.local_addr();

    let mut x = Client::announce(addr, 5).await;
    let mut y = Client::announce(addr, 7).await;
    sleep(CYCLE).await;
    assert_eq!(switch.route_count(), 2);

    x.send(Frame::request(200, 5, 7)).await;

    let delivered = y.recv().await;
    assert_eq!(delivered.mti, 200);
    assert_eq!(delivered.src, 5);
    assert_eq!(delivered.dst, 7);

    // Exactly one sink record, matching the delivered frame.
    let logged = next_record(&mut log_rx).await;
    assert_eq!(logged, delivered);

    switch.shutdown().await;
}

/// The full pending-queue scenario: a message to a not-yet-seen
/// identity waits, and the destination's first frame releases it
/// within the same readiness event.
#[tokio::test]
async fn pending_frames_deliver_once_the_destination_appears() {
    let (switch, mut log_rx) = start_switch(test_config()).await;
    let addr = switch.local_addr();

    // X announces; the announce itself (dst 0) is never routable and
    // produces no pending growth and no sink record.
    let mut x = Client::announce(addr, 5).await;
    sleep(CYCLE).await;
    assert_eq!(switch.route_count(), 1);

    // Id 7 has never sent anything: the message waits.
    x.send(Frame::request(200, 5, 7)).await;
    sleep(CYCLE).await;

    // Y shows up, sends one frame to X and then goes quiet. That one
    // frame must do everything: learn Y's route, reach X, and release
    // the stalled request back to Y without any further traffic.
    let mut y = Client::connect(addr).await;
    y.send(Frame::request(1, 7, 5)).await;

    let to_x = x.recv().await;
    assert_eq!((to_x.mti, to_x.src, to_x.dst), (1, 7, 5));

    let stalled = y.recv().await;
    assert_eq!((stalled.mti, stalled.src, stalled.dst), (200, 5, 7));
    assert!(!stalled.is_reply());

    // Sink order matches delivery order.
    assert_eq!(next_record(&mut log_rx).await, to_x);
    assert_eq!(next_record(&mut log_rx).await, stalled);

    switch.shutdown().await;
}

#[tokio::test]
async fn later_claim_of_an_identity_overwrites_the_route() {
    let (switch, _log_rx) = start_switch(test_config()).await;
    let addr = switch.local_addr();

    // A claims id 7 first, then B claims it too. Last writer wins.
    let mut a = Client::announce(addr, 7).await;
    sleep(CYCLE).await;
    let mut b = Client::announce(addr, 7).await;
    sleep(CYCLE).await;
    assert_eq!(switch.route_count(), 1);

    let mut c = Client::announce(addr, 3).await;
    sleep(CYCLE).await;
    c.send(Frame::request(42, 3, 7)).await;

    let delivered = b.recv().await;
    assert_eq!(delivered.mti, 42);
    a.expect_silence().await;

    switch.shutdown().await;
}

#[tokio::test]
async fn unaligned_read_is_discarded_without_side_effects() {
    let (switch, _log_rx) = start_switch(test_config()).await;
    let addr = switch.local_addr();

    let mut x = Client::announce(addr, 5).await;
    let mut y = Client::announce(addr, 7).await;
    sleep(CYCLE).await;
    assert_eq!(switch.connection_count(), 2);
    assert_eq!(switch.route_count(), 2);

    // 20 bytes is not a whole frame: the whole read is dumped.
    x.send_raw(&[0xAB; 20]).await;
    sleep(CYCLE).await;

    // Connection set and routes are untouched, both directions still
    // deliver.
    assert_eq!(switch.connection_count(), 2);
    assert_eq!(switch.route_count(), 2);

    x.send(Frame::request(200, 5, 7)).await;
    assert_eq!(y.recv().await.mti, 200);

    y.send(Frame::request(1, 7, 5)).await;
    assert_eq!(x.recv().await.mti, 1);

    switch.shutdown().await;
}

#[tokio::test]
async fn disconnect_purges_exactly_that_members_routes() {
    let (switch, _log_rx) = start_switch(test_config()).await;
    let addr = switch.local_addr();

    let mut x = Client::announce(addr, 5).await;
    let y = Client::announce(addr, 7).await;
    sleep(CYCLE).await;
    assert_eq!(switch.route_count(), 2);

    // Y goes away; the next cycle notices the EOF, removes the
    // connection and purges its route. X's route survives.
    drop(y);
    sleep(CYCLE).await;
    assert_eq!(switch.connection_count(), 1);
    assert_eq!(switch.route_count(), 1);

    // Traffic to the vanished id waits instead of being dropped.
    x.send(Frame::request(200, 5, 7)).await;
    sleep(CYCLE).await;

    // A new connection reclaims id 7; its first frame reaches X and
    // the stalled frame follows straight back without more traffic.
    let mut z = Client::connect(addr).await;
    z.send(Frame::request(1, 7, 5)).await;
    assert_eq!(x.recv().await.mti, 1);

    let stalled = z.recv().await;
    assert_eq!(stalled.mti, 200);

    switch.shutdown().await;
}

/// A destination that fails on send is removed outright: its routes
/// are purged and the undeliverable frame is dropped, never queued
/// for retry. Exercised at the router level so the failure hits the
/// send path rather than the read path.
#[tokio::test]
async fn hard_send_failure_removes_the_destination_and_drops_the_frame() {
    use switch::router::Router;
    use switch::{ConnectionSet, RouteTable};

    let connections = Arc::new(ConnectionSet::new());
    let routes = Arc::new(RouteTable::new());
    let (log_tx, mut log_rx) = sink::record_queue(8);
    let mut router = Router::new(
        Arc::clone(&connections),
        Arc::clone(&routes),
        log_tx,
        Duration::from_millis(100),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut x_client = TcpStream::connect(addr).await.unwrap();
    let (stream, peer) = listener.accept().await.unwrap();
    let x_conn = connections.insert(stream, peer);

    let y_client = TcpStream::connect(addr).await.unwrap();
    let (stream, peer) = listener.accept().await.unwrap();
    let y_conn = connections.insert(stream, peer);

    routes.learn(5, x_conn.id());
    routes.learn(7, y_conn.id());

    // Y vanishes with an immediate reset so the next send to it fails
    // hard instead of landing in a kernel buffer.
    y_client.set_linger(Some(Duration::from_secs(0))).unwrap();
    drop(y_client);
    sleep(Duration::from_millis(50)).await;

    x_client
        .write_all(&Frame::request(200, 5, 7).encode())
        .await
        .unwrap();
    sleep(Duration::from_millis(50)).await;
    router.service(&x_conn).await;

    // The destination is gone and its route with it; the sender's
    // route survives, and the frame was neither queued nor logged.
    assert!(!connections.contains(y_conn.id()));
    assert_eq!(routes.lookup(7), None);
    assert_eq!(routes.lookup(5), Some(x_conn.id()));
    assert_eq!(router.pending_len(), 0);
    assert!(log_rx.try_recv().is_err());
}

#[tokio::test]
async fn frames_to_identity_zero_are_never_routed() {
    let (switch, mut log_rx) = start_switch(test_config()).await;
    let addr = switch.local_addr();

    let mut x = Client::announce(addr, 5).await;
    let mut y = Client::announce(addr, 7).await;
    sleep(CYCLE).await;

    // An explicit dst 0 frame goes nowhere and is not queued.
    x.send(Frame::request(9, 5, 0)).await;
    sleep(CYCLE).await;
    y.expect_silence().await;

    // The first record the sink ever sees is real routed traffic;
    // neither the announces nor the dst 0 frame were logged.
    y.send(Frame::request(1, 7, 5)).await;
    assert_eq!(x.recv().await.mti, 1);
    let first = next_record(&mut log_rx).await;
    assert_eq!((first.mti, first.src, first.dst), (1, 7, 5));

    switch.shutdown().await;
}

#[tokio::test]
async fn connections_beyond_the_cap_are_dropped() {
    let config = SwitchConfig {
        max_connections: 1,
        ..test_config()
    };
    let (switch, _log_rx) = start_switch(config).await;
    let addr = switch.local_addr();

    let mut x = Client::announce(addr, 5).await;
    sleep(CYCLE).await;
    assert_eq!(switch.connection_count(), 1);

    // The second connection is accepted and immediately dropped.
    let mut extra = Client::connect(addr).await;
    let mut buf = [0u8; 1];
    let read = timeout(RECV_TIMEOUT, extra.stream.read(&mut buf))
        .await
        .expect("expected the switch to close the extra connection");
    assert_eq!(read.unwrap(), 0);
    assert_eq!(switch.connection_count(), 1);

    // The admitted member is unaffected.
    x.send(Frame::request(200, 5, 5)).await;
    assert_eq!(x.recv().await.mti, 200);

    switch.shutdown().await;
}

#[tokio::test]
async fn shutdown_closes_connections_and_the_record_queue() {
    let (switch, mut log_rx) = start_switch(test_config()).await;
    let addr = switch.local_addr();

    let mut x = Client::announce(addr, 5).await;
    sleep(CYCLE).await;
    assert_eq!(switch.connection_count(), 1);

    switch.shutdown().await;

    // The member sees the close.
    let mut buf = [0u8; 1];
    let read = timeout(RECV_TIMEOUT, x.stream.read(&mut buf))
        .await
        .expect("expected EOF after shutdown");
    assert_eq!(read.unwrap(), 0);

    // The router is gone, so the record queue has closed.
    let closed = timeout(RECV_TIMEOUT, log_rx.recv())
        .await
        .expect("expected the record queue to close");
    assert!(closed.is_none());
}

//! # Multiplexer
//!
//! The switch's single processing loop. Each cycle snapshots the
//! connection set, issues one readiness wait across the whole
//! snapshot with a bounded timeout, and services every connection
//! that is ready - one at a time, in snapshot order. A slow
//! destination can therefore delay service of other connections
//! within the same cycle; that trade keeps the forwarding path
//! single-threaded and the pending queue lock-free.
//!
//! No readiness wait is ever issued against an empty set; an empty
//! snapshot idles briefly and re-snapshots. A wait that times out
//! with nothing ready is not an error and simply repeats.
//!
//! On stop, the multiplexer closes every connection, clears the
//! route table, and exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::select_all;
use futures::FutureExt;
use tokio::time::{sleep, timeout};
use tracing::info;

use crate::connection::ConnectionSet;
use crate::router::Router;
use crate::routes::RouteTable;

/// Idle pause between snapshots while no members are connected.
const EMPTY_SET_IDLE: Duration = Duration::from_millis(1);

pub(crate) async fn run(
    mut router: Router,
    connections: Arc<ConnectionSet>,
    routes: Arc<RouteTable>,
    stop: Arc<AtomicBool>,
    poll_interval: Duration,
) {
    while !stop.load(Ordering::Relaxed) {
        let snapshot = connections.snapshot();
        if snapshot.is_empty() {
            sleep(EMPTY_SET_IDLE).await;
            continue;
        }

        // One bounded readiness wait across the whole snapshot.
        let waits = snapshot
            .iter()
            .map(|conn| {
                let conn = Arc::clone(conn);
                Box::pin(async move { conn.readable().await })
            })
            .collect::<Vec<_>>();

        if timeout(poll_interval, select_all(waits)).await.is_err() {
            // Timeout with no ready connection; go around again.
            continue;
        }

        // Service everything that is ready right now. A connection
        // that turns out not to be ready reports would-block inside
        // the router, which is a no-op by design.
        for conn in &snapshot {
            if !connections.contains(conn.id()) {
                // Removed earlier in this cycle (close or send
                // failure); do not service a dead handle.
                continue;
            }
            if conn.readable().now_or_never().is_some() {
                router.service(conn).await;
            }
        }
    }

    shutdown(&connections, &routes, &router);
}

fn shutdown(connections: &ConnectionSet, routes: &RouteTable, router: &Router) {
    let drained = connections.drain();
    routes.clear();
    info!(
        connections_closed = drained.len(),
        pending_discarded = router.pending_len(),
        "multiplexer stopped, all connections closed"
    );
    // Dropping the drained handles closes the sockets.
    drop(drained);
}

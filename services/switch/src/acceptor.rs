//! # Acceptor
//!
//! Owns the listening socket and continuously admits new member
//! connections into the [`ConnectionSet`]. Accept failures during
//! steady state are logged and retried, never fatal - only the bind
//! at startup can kill the switch.
//!
//! Termination is cooperative: each accept wait is bounded so the
//! stop flag is observed within one interval. The acceptor does not
//! close already-open connections on exit; that belongs to the
//! multiplexer's shutdown path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::connection::ConnectionSet;

pub(crate) async fn run(
    listener: TcpListener,
    connections: Arc<ConnectionSet>,
    stop: Arc<AtomicBool>,
    max_connections: usize,
    accept_interval: Duration,
) {
    while !stop.load(Ordering::Relaxed) {
        match timeout(accept_interval, listener.accept()).await {
            // Nothing to accept within the interval; poll the stop
            // flag and wait again.
            Err(_) => continue,
            Ok(Ok((stream, peer))) => {
                if connections.len() >= max_connections {
                    warn!(%peer, max_connections, "connection limit reached, dropping");
                    continue;
                }
                let conn = connections.insert(stream, peer);
                info!(
                    connection = %conn.id(),
                    %peer,
                    total = connections.len(),
                    "connection accepted"
                );
            }
            Ok(Err(e)) => {
                warn!(error = %e, "accept failed, retrying");
            }
        }
    }

    debug!("acceptor stopped");
}

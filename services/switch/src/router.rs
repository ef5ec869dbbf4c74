//! # Router
//!
//! Message handling for one ready connection, plus the pending queue
//! for frames whose destination has no route yet.
//!
//! Every read iteration starts by giving each pending frame one
//! forwarding attempt (unresolved frames re-append at the tail,
//! preserving FIFO order), then reads from the ready connection. The
//! drain repeats before every read, so a route learned from frames
//! just read releases the traffic stalled on it within the same
//! readiness event - the destination does not have to speak twice.
//! A read whose length is not a multiple of the frame size discards
//! the whole buffer and leaves the connection open. No partial-frame reassembly is attempted across reads; this
//! is a deliberate simplification inherited from the protocol's
//! one-frame-per-write clients, and it will drop frames if TCP
//! fragments or coalesces writes across the frame boundary.
//!
//! Pending frames are never deduplicated and never expire: an
//! unresolved destination accumulates entries until a route appears
//! or the switch restarts, and retries happen only on cycles driven
//! by new traffic - an idle switch retries nothing.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use codec::{Frame, LogRecord, FRAME_SIZE};
use sink::RecordSender;
use tracing::{debug, info, warn};

use crate::connection::{Connection, ConnectionId, ConnectionSet};
use crate::routes::RouteTable;

/// Read granularity: up to 28 frames per cycle, matching the
/// historical receive buffer.
const READ_BUFFER_SIZE: usize = 1024;

/// Outcome of one forwarding attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Forward {
    /// Sent to the destination connection and handed to the log relay.
    Delivered,
    /// No usable route; the frame joined the pending queue.
    Queued,
    /// The destination connection failed on send and was removed; the
    /// frame is gone, not retried.
    Dropped,
}

pub struct Router {
    connections: Arc<ConnectionSet>,
    routes: Arc<RouteTable>,
    pending: VecDeque<[u8; FRAME_SIZE]>,
    log_tx: RecordSender,
    send_timeout: Duration,
}

impl Router {
    pub fn new(
        connections: Arc<ConnectionSet>,
        routes: Arc<RouteTable>,
        log_tx: RecordSender,
        send_timeout: Duration,
    ) -> Self {
        Self {
            connections,
            routes,
            pending: VecDeque::new(),
            log_tx,
            send_timeout,
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Handle one ready connection for this cycle: alternate pending
    /// retries with reads until the connection runs dry.
    pub async fn service(&mut self, conn: &Arc<Connection>) {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        loop {
            // Route anything stalled before reading: frames decoded
            // on the previous iteration may have learned the route a
            // pending entry was waiting for.
            self.drain_pending().await;

            let n = match conn.try_read(&mut buf) {
                // Spurious readiness; nothing to do this cycle.
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Ok(0) => {
                    info!(connection = %conn.id(), "peer closed connection");
                    self.remove_connection(conn.id());
                    return;
                }
                Err(e) => {
                    warn!(connection = %conn.id(), error = %e, "receive failed");
                    self.remove_connection(conn.id());
                    return;
                }
                Ok(n) => n,
            };

            if n % FRAME_SIZE != 0 {
                // Framing violation: dump the whole read, keep the
                // connection for the next cycle.
                warn!(connection = %conn.id(), bytes = n, "read not frame-aligned, discarding");
                return;
            }

            for chunk in buf[..n].chunks_exact(FRAME_SIZE) {
                let mut raw = [0u8; FRAME_SIZE];
                raw.copy_from_slice(chunk);
                let frame = Frame::from_bytes(&raw);

                // Traffic is the only registration step: whoever sent
                // this frame owns its source identity now.
                self.routes.learn(frame.src, conn.id());

                if frame.dst != 0 {
                    self.forward(raw, frame.dst).await;
                }
            }
        }
    }

    /// Give every currently queued frame one forwarding attempt, in
    /// FIFO order. Still-unresolved frames re-append at the tail and
    /// are not touched again until the next cycle.
    async fn drain_pending(&mut self) {
        let mut delivered = 0usize;
        let mut requeued = 0usize;

        for _ in 0..self.pending.len() {
            let Some(raw) = self.pending.pop_front() else {
                break;
            };
            let dst = Frame::from_bytes(&raw).dst;
            match self.forward(raw, dst).await {
                Forward::Delivered => delivered += 1,
                Forward::Queued => requeued += 1,
                Forward::Dropped => {}
            }
        }

        if delivered > 0 || requeued > 0 {
            debug!(delivered, requeued, "pending queue pass");
        }
    }

    /// Forward a verbatim frame toward destination identity `dst`.
    async fn forward(&mut self, raw: [u8; FRAME_SIZE], dst: codec::MemberId) -> Forward {
        let Some(owner) = self.routes.lookup(dst) else {
            self.pending.push_back(raw);
            return Forward::Queued;
        };

        let Some(dest) = self.connections.get(owner) else {
            // Stale route: the owning connection already left the set.
            // Purge it and let the frame wait for a fresh claim.
            self.routes.purge(owner);
            self.pending.push_back(raw);
            return Forward::Queued;
        };

        match dest.send(&raw, self.send_timeout).await {
            Ok(()) => {
                // Best effort: a full or closed relay queue never
                // fails the forward.
                if let Err(e) = self.log_tx.try_send(LogRecord::new(raw)) {
                    warn!(error = %e, "log relay hand-off failed");
                }
                Forward::Delivered
            }
            Err(e) => {
                warn!(
                    connection = %dest.id(),
                    member = dst,
                    error = %e,
                    "send to destination failed, removing connection"
                );
                self.remove_connection(dest.id());
                Forward::Dropped
            }
        }
    }

    /// Drop a connection from the set and purge every route that
    /// pointed at it. Nothing in flight to it is redelivered.
    fn remove_connection(&self, id: ConnectionId) {
        if self.connections.remove(id).is_some() {
            let purged = self.routes.purge(id);
            info!(
                connection = %id,
                routes_purged = purged,
                total = self.connections.len(),
                "connection removed"
            );
        } else {
            debug!(connection = %id, "connection already removed");
        }
    }
}

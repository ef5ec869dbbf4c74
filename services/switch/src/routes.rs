//! # Route Table
//!
//! The learned mapping from member identity to the connection that
//! currently owns it. Routes are built lazily from traffic: an
//! identity gains a route the first time a frame arrives *from* it,
//! never from the connect event alone - a freshly connected, silent
//! member has no route.
//!
//! At most one connection owns an identity at a time. A later frame
//! claiming the same identity on a different connection overwrites
//! the mapping; there is no "identity already owned" rejection.

use codec::MemberId;
use dashmap::DashMap;
use tracing::debug;

use crate::connection::ConnectionId;

#[derive(Debug, Default)]
pub struct RouteTable {
    routes: DashMap<MemberId, ConnectionId>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `id` is owned by `conn`. Last writer wins; identity
    /// 0 is anonymous and never learned.
    pub fn learn(&self, id: MemberId, conn: ConnectionId) {
        if id == 0 {
            return;
        }
        match self.routes.insert(id, conn) {
            None => debug!(member = id, connection = %conn, "route learned"),
            Some(prev) if prev != conn => {
                debug!(member = id, connection = %conn, previous = %prev, "route overwritten")
            }
            Some(_) => {}
        }
    }

    /// The connection currently owning `id`, if any. Identity 0 is
    /// never routable.
    pub fn lookup(&self, id: MemberId) -> Option<ConnectionId> {
        if id == 0 {
            return None;
        }
        self.routes.get(&id).map(|entry| *entry.value())
    }

    /// Drop every route pointing at `conn`. Returns how many were
    /// removed.
    pub fn purge(&self, conn: ConnectionId) -> usize {
        let before = self.routes.len();
        self.routes.retain(|_, owner| *owner != conn);
        before - self.routes.len()
    }

    pub fn clear(&self) {
        self.routes.clear();
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

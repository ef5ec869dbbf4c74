//! # Connection Management
//!
//! The live set of accepted member connections. A connection is a
//! non-blocking TCP stream plus a unique handle; no identity is
//! attached here - ownership of an identity is tracked solely in the
//! route table, from source id to handle.
//!
//! The set's lock is held only for map mutation and snapshotting,
//! never across an I/O call. Reads use `try_read` (would-block is a
//! normal outcome), sends use readiness plus `try_write` under a
//! bounded timeout so no operation blocks indefinitely.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpStream;

/// Unique handle for one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One live member connection.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    stream: TcpStream,
    peer: SocketAddr,
}

impl Connection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Wait until the stream reports readable. EOF counts as readable;
    /// errors are surfaced by the subsequent `try_read`.
    pub async fn readable(&self) {
        let _ = self.stream.readable().await;
    }

    /// Non-blocking read. `Ok(0)` means the peer closed; a would-block
    /// error means nothing to do this cycle.
    pub fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.try_read(buf)
    }

    /// Write the whole buffer, bounded by `timeout`. Failure of any
    /// kind (including the timeout) is a hard send failure and the
    /// caller is expected to remove the connection.
    pub async fn send(&self, bytes: &[u8], timeout: Duration) -> io::Result<()> {
        let write_all = async {
            let mut written = 0usize;
            while written < bytes.len() {
                self.stream.writable().await?;
                match self.stream.try_write(&bytes[written..]) {
                    Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                    Ok(n) => written += n,
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                    Err(e) => return Err(e),
                }
            }
            Ok(())
        };

        tokio::time::timeout(timeout, write_all)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "send timed out"))?
    }
}

/// The live collection of accepted connections, safe for concurrent
/// add/remove from the acceptor and the multiplexer.
#[derive(Debug, Default)]
pub struct ConnectionSet {
    connections: Mutex<HashMap<ConnectionId, Arc<Connection>>>,
    next_id: AtomicU64,
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly accepted stream under a new handle.
    pub fn insert(&self, stream: TcpStream, peer: SocketAddr) -> Arc<Connection> {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let conn = Arc::new(Connection { id, stream, peer });
        self.connections.lock().insert(id, Arc::clone(&conn));
        conn
    }

    /// Remove a connection. The underlying socket closes once the last
    /// reference drops.
    pub fn remove(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.lock().remove(&id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.lock().get(&id).cloned()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.lock().contains_key(&id)
    }

    /// Cheap point-in-time copy of the set for one multiplexer cycle.
    pub fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.connections.lock().values().cloned().collect()
    }

    /// Remove and return every connection; used at shutdown.
    pub fn drain(&self) -> Vec<Arc<Connection>> {
        self.connections.lock().drain().map(|(_, c)| c).collect()
    }

    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }
}

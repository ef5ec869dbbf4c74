//! # Message Switch
//!
//! A small message-switching server. Members connect over TCP and
//! exchange fixed 36-byte frames tagged with a source and destination
//! identity; the switch forwards each frame to whichever currently
//! connected member owns the destination identity.
//!
//! Routes are learned opportunistically from traffic: the first frame
//! a member sends claims its source id, no registration step exists.
//! Frames addressed to an identity with no known route wait in a FIFO
//! pending queue and are retried ahead of every read until the
//! destination shows up. A verbatim copy of every delivered frame is
//! handed to the log sink over a bounded queue.
//!
//! Three cooperating control flows make up the switch:
//! - the [`acceptor`], which admits new connections;
//! - the [`multiplexer`], which waits for readiness across the whole
//!   connection set and services ready connections one at a time;
//! - the [`router`], invoked per ready connection, which learns routes,
//!   forwards frames and owns the pending queue.

pub mod acceptor;
pub mod config;
pub mod connection;
pub mod multiplexer;
pub mod router;
pub mod routes;
pub mod switch;

pub use config::SwitchConfig;
pub use connection::{Connection, ConnectionId, ConnectionSet};
pub use routes::RouteTable;
pub use switch::Switch;

/// Switch-level errors. Everything here is fatal: per-connection
/// failures are contained at the connection boundary and never
/// surface as an error from the switch itself.
#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("setup error: {0}")]
    Setup(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for switch operations.
pub type SwitchResult<T> = std::result::Result<T, SwitchError>;

//! Switch assembly: binds the listener, wires the shared state, and
//! runs the acceptor and multiplexer as independent tasks with a
//! shared cooperative stop flag.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sink::RecordSender;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::SwitchConfig;
use crate::connection::ConnectionSet;
use crate::router::Router;
use crate::routes::RouteTable;
use crate::{acceptor, multiplexer, SwitchError, SwitchResult};

/// A running message switch.
///
/// `log_tx` travels into the router; when the switch stops and the
/// router drops, the record queue closes and the sink drains out on
/// its own - no separate signal is needed.
pub struct Switch {
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    connections: Arc<ConnectionSet>,
    routes: Arc<RouteTable>,
    tasks: Vec<JoinHandle<()>>,
}

impl Switch {
    /// Bind and start. Bind/listen failure at startup is the only
    /// fatal error the switch can produce; everything later is
    /// contained at the connection boundary.
    pub async fn start(config: SwitchConfig, log_tx: RecordSender) -> SwitchResult<Self> {
        let listen_addr = config.listen_addr()?;
        let listener = TcpListener::bind(listen_addr).await.map_err(|e| {
            SwitchError::Setup(format!("cannot listen on {listen_addr}: {e}"))
        })?;
        let local_addr = listener.local_addr()?;

        let stop = Arc::new(AtomicBool::new(false));
        let connections = Arc::new(ConnectionSet::new());
        let routes = Arc::new(RouteTable::new());

        let router = Router::new(
            Arc::clone(&connections),
            Arc::clone(&routes),
            log_tx,
            config.send_timeout(),
        );

        let tasks = vec![
            tokio::spawn(acceptor::run(
                listener,
                Arc::clone(&connections),
                Arc::clone(&stop),
                config.max_connections,
                config.accept_interval(),
            )),
            tokio::spawn(multiplexer::run(
                router,
                Arc::clone(&connections),
                Arc::clone(&routes),
                Arc::clone(&stop),
                config.poll_interval(),
            )),
        ];

        info!(%local_addr, max_connections = config.max_connections, "switch running");

        Ok(Self {
            local_addr,
            stop,
            connections,
            routes,
            tasks,
        })
    }

    /// The address the switch actually listens on (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of currently connected members.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of identities with a learned route.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Orderly shutdown: raise the stop flag, then join both loops.
    /// Every loop observes the flag within one polling interval; the
    /// multiplexer closes all connections and clears the routes on
    /// its way out.
    pub async fn shutdown(self) {
        self.stop.store(true, Ordering::Relaxed);
        for task in self.tasks {
            let _ = task.await;
        }
        info!("switch stopped");
    }
}

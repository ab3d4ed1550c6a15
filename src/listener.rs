//! FastAGI listener: accepts one connection per protocol exchange and
//! dispatches each to an independently scheduled session handler.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::handler::{self, Bridge};

/// The listener accepts incoming FastAGI connections and spawns handlers.
pub struct Listener {
    listener: TcpListener,
    bridge: Arc<Bridge>,
}

impl Listener {
    /// Bind the listener to the specified address.
    pub async fn bind(addr: SocketAddr, bridge: Arc<Bridge>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "FastAGI listener bound");
        Ok(Self { listener, bridge })
    }

    /// The actual bound address (useful with port 0).
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the listener, accepting connections forever.
    ///
    /// The switch opens a fresh connection per exchange; several exchanges
    /// for different calls (or stages of the same call) may be in flight
    /// concurrently. Handler failures never reach this loop.
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(%addr, "connection accepted");
                    let bridge = Arc::clone(&self.bridge);
                    tokio::spawn(async move {
                        handler::run(stream, addr, bridge).await;
                    });
                }
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                }
            }
        }
    }
}

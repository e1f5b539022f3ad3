//! Server lifecycle: listeners, protocol demux, and graceful shutdown.

use std::{
    collections::HashSet,
    io,
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use thiserror::Error;
use tokio::{
    net::{TcpListener, TcpStream},
    time,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    handler::handle_toc_connection,
    http_relay::{HttpConnection, HttpHandoff},
    rate_limit::SignonLimiter,
    translator::{BackendServices, CommandTranslator},
};

/// Gateway configuration; plain data, loaded by the embedding process.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Addresses to listen on. Each socket multiplexes TOC and HTTP.
    pub listeners: Vec<SocketAddr>,
    /// Sign-on tokens refilled per second, per address.
    pub signon_rate: f64,
    /// Sign-on burst per address.
    pub signon_burst: u32,
    /// Idle lifetime of a rate-limiter entry.
    pub signon_ttl: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listeners: vec![SocketAddr::from(([0, 0, 0, 0], 9898))],
            signon_rate: 0.5,
            signon_burst: 10,
            signon_ttl: Duration::from_secs(15 * 60),
        }
    }
}

/// Errors that keep the gateway from starting.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A listener failed to bind.
    #[error("bind {addr}: {source}")]
    Bind {
        /// The address that failed
        addr: SocketAddr,
        /// The underlying error
        source: io::Error,
    },
}

#[derive(Debug, Default)]
struct ConnectionSet {
    peers: Mutex<HashSet<SocketAddr>>,
}

impl ConnectionSet {
    fn insert(&self, peer: SocketAddr) {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner).insert(peer);
    }

    fn remove(&self, peer: &SocketAddr) {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner).remove(peer);
    }

    fn len(&self) -> usize {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// The TOC gateway: accept loops, demux, and connection tracking.
pub struct Gateway {
    translator: Arc<CommandTranslator>,
    limiter: Arc<SignonLimiter>,
    connections: Arc<ConnectionSet>,
    http: Option<HttpHandoff>,
    cancel: CancellationToken,
    tracker: TaskTracker,
    config: GatewayConfig,
}

impl Gateway {
    /// Gateway over `services`, optionally wired to an HTTP helper.
    pub fn new(config: GatewayConfig, services: BackendServices, http: Option<HttpHandoff>) -> Self {
        let limiter =
            SignonLimiter::new(config.signon_rate, config.signon_burst, config.signon_ttl);
        Self {
            translator: Arc::new(CommandTranslator::new(services)),
            limiter: Arc::new(limiter),
            connections: Arc::new(ConnectionSet::default()),
            http,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
            config,
        }
    }

    /// Bind every configured listener and start accepting. Returns the
    /// bound local addresses (useful with port 0).
    pub async fn serve(&self) -> Result<Vec<SocketAddr>, GatewayError> {
        let mut bound = Vec::with_capacity(self.config.listeners.len());
        for addr in &self.config.listeners {
            let listener = TcpListener::bind(addr)
                .await
                .map_err(|source| GatewayError::Bind { addr: *addr, source })?;
            let local = listener.local_addr().unwrap_or(*addr);
            tracing::info!(%local, "TOC gateway listening");
            bound.push(local);

            let translator = Arc::clone(&self.translator);
            let limiter = Arc::clone(&self.limiter);
            let connections = Arc::clone(&self.connections);
            let http = self.http.clone();
            let cancel = self.cancel.clone();
            let tracker = self.tracker.clone();
            self.tracker.spawn(accept_loop(
                listener,
                translator,
                limiter,
                connections,
                http,
                cancel,
                tracker,
            ));
        }
        Ok(bound)
    }

    /// Number of live tracked connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Token cancelled at shutdown; connection handlers derive from it.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop accepting, cancel every connection, and drain for at most
    /// `deadline`. Completes either way; a timed-out drain logs a warning.
    pub async fn shutdown(&self, deadline: Duration) {
        tracing::info!("TOC gateway shutting down");
        self.cancel.cancel();
        self.tracker.close();
        if time::timeout(deadline, self.tracker.wait()).await.is_err() {
            tracing::warn!(
                remaining = self.connections.len(),
                "shutdown deadline exceeded; abandoning drain"
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn accept_loop(
    listener: TcpListener,
    translator: Arc<CommandTranslator>,
    limiter: Arc<SignonLimiter>,
    connections: Arc<ConnectionSet>,
    http: Option<HttpHandoff>,
    cancel: CancellationToken,
    tracker: TaskTracker,
) {
    loop {
        let accepted = tokio::select! {
            () = cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        let (stream, peer) = match accepted {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(error = %err, "accept failed");
                continue;
            },
        };

        let translator = Arc::clone(&translator);
        let limiter = Arc::clone(&limiter);
        let connections = Arc::clone(&connections);
        let http = http.clone();
        let cancel = cancel.clone();
        tracker.spawn(async move {
            connections.insert(peer);
            if let Err(err) = demux_connection(translator, &limiter, http, stream, peer, cancel).await
            {
                tracing::debug!(%peer, error = %err, "connection ended with error");
            }
            connections.remove(&peer);
        });
    }
}

/// Route a fresh connection by its first four octets: `FLAP` means TOC,
/// anything else goes to the HTTP helper.
async fn demux_connection(
    translator: Arc<CommandTranslator>,
    limiter: &SignonLimiter,
    http: Option<HttpHandoff>,
    stream: TcpStream,
    peer: SocketAddr,
    cancel: CancellationToken,
) -> Result<(), crate::error::ConnectionError> {
    let mut discriminator = [0u8; 4];
    loop {
        let peeked = tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            peeked = stream.peek(&mut discriminator) => peeked,
        };
        match peeked {
            Ok(0) => return Ok(()),
            Ok(n) if n >= 4 => break,
            // First segment shorter than the discriminator; wait for more.
            Ok(_) => time::sleep(Duration::from_millis(10)).await,
            Err(err) => {
                return Err(crate::error::ConnectionError::ClientRead(err.into()));
            },
        }
    }

    if &discriminator == b"FLAP" {
        handle_toc_connection(translator, limiter, stream, peer, cancel).await
    } else {
        match http {
            Some(handoff) => {
                if !handoff.hand_off(HttpConnection { stream, peer }).await {
                    tracing::warn!(%peer, "HTTP helper unavailable; dropping connection");
                }
            },
            None => {
                tracing::warn!(%peer, "non-FLAP connection with no HTTP helper attached");
            },
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::http_relay::http_handoff;

    // A gateway whose backend rejects everything still demuxes correctly.
    fn unavailable_services() -> BackendServices {
        crate::testing::unavailable_backend()
    }

    fn config() -> GatewayConfig {
        GatewayConfig {
            listeners: vec![SocketAddr::from(([127, 0, 0, 1], 0))],
            ..GatewayConfig::default()
        }
    }

    #[tokio::test]
    async fn non_flap_connections_reach_the_http_helper() {
        let (handoff, mut intake) = http_handoff(4);
        let gateway = Gateway::new(config(), unavailable_services(), Some(handoff));
        let bound = gateway.serve().await.unwrap();

        let mut client = TcpStream::connect(bound[0]).await.unwrap();
        client.write_all(b"GET /info HTTP/1.0\r\n\r\n").await.unwrap();

        let mut conn = intake.accept().await.unwrap();
        let mut buf = [0u8; 9];
        conn.stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"GET /info");

        gateway.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn flap_connections_get_the_signon_frame() {
        let gateway = Gateway::new(config(), unavailable_services(), None);
        let bound = gateway.serve().await.unwrap();

        let mut client = TcpStream::connect(bound[0]).await.unwrap();
        client.write_all(b"FLAPON\r\n\r\n").await.unwrap();

        // Server answers with an empty signon FLAP frame.
        let mut header = [0u8; 6];
        client.read_exact(&mut header).await.unwrap();
        assert_eq!(header[0], 0x2A);
        assert_eq!(header[1], 1);

        drop(client);
        gateway.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn shutdown_completes_with_idle_listeners() {
        let gateway = Gateway::new(config(), unavailable_services(), None);
        gateway.serve().await.unwrap();
        assert_eq!(gateway.connection_count(), 0);
        gateway.shutdown(Duration::from_millis(200)).await;
    }
}

//! Channel-backed hand-off for the auxiliary HTTP helper.
//!
//! The gateway's listeners multiplex TOC and HTTP on one port, split by the
//! first four octets. Connections that are not FLAP are pushed through this
//! pair: the accept loops hold an [`HttpHandoff`], the external HTTP helper
//! drains the [`HttpIntake`] as if it were a listener. The helper itself —
//! the profile and directory HTML views — lives outside this crate.

use std::net::SocketAddr;

use tokio::{net::TcpStream, sync::mpsc};

/// A connection that spoke something other than FLAP.
#[derive(Debug)]
pub struct HttpConnection {
    /// The raw stream, with nothing consumed.
    pub stream: TcpStream,
    /// Remote peer address.
    pub peer: SocketAddr,
}

/// Producer side: the gateway's accept loops push non-FLAP connections.
#[derive(Debug, Clone)]
pub struct HttpHandoff {
    tx: mpsc::Sender<HttpConnection>,
}

impl HttpHandoff {
    /// Hand a connection to the helper; `false` when the helper is gone or
    /// saturated (the connection drops).
    pub async fn hand_off(&self, conn: HttpConnection) -> bool {
        self.tx.send(conn).await.is_ok()
    }
}

/// Consumer side: the HTTP helper's accept surface.
#[derive(Debug)]
pub struct HttpIntake {
    rx: mpsc::Receiver<HttpConnection>,
}

impl HttpIntake {
    /// Next handed-off connection; `None` once every listener is gone.
    pub async fn accept(&mut self) -> Option<HttpConnection> {
        self.rx.recv().await
    }
}

/// A connected hand-off pair with the given backlog.
pub fn http_handoff(backlog: usize) -> (HttpHandoff, HttpIntake) {
    let (tx, rx) = mpsc::channel(backlog);
    (HttpHandoff { tx }, HttpIntake { rx })
}

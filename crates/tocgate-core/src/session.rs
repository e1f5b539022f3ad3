//! The session object shared between the gateway and the backend.
//!
//! One [`Session`] exists per signed-on identity (the BOS session) and one
//! per joined chat room. The backend pushes [`SnacMessage`]s into the
//! session's channel; the gateway's backend-listener task drains it. The
//! closed signal is a cancellation token: the backend fires it when another
//! login takes over the identity, and the gateway fires it when tearing the
//! session down.

use std::{
    net::SocketAddr,
    sync::{
        Mutex, RwLock,
        atomic::{AtomicU16, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio_util::sync::CancellationToken;
use tocgate_proto::{
    Capability, Tlv, TlvUserInfo,
    oservice::{USER_INFO_FLAGS, USER_INFO_SIGNON_TOD},
};

use crate::{message::SnacMessage, screen_name::ScreenName};

/// Backlog of backend messages a session buffers before the producer
/// blocks.
const MESSAGE_BACKLOG: usize = 64;

/// Per-identity state plus the backend-to-gateway message channel.
#[derive(Debug)]
pub struct Session {
    screen_name: RwLock<ScreenName>,
    warning: AtomicU16,
    signon_time: SystemTime,
    remote_addr: Mutex<Option<SocketAddr>>,
    caps: Mutex<Vec<Capability>>,
    msg_tx: mpsc::Sender<SnacMessage>,
    msg_rx: AsyncMutex<mpsc::Receiver<SnacMessage>>,
    closed: CancellationToken,
}

impl Session {
    /// New session for `screen_name`, signed on now.
    pub fn new(screen_name: ScreenName) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(MESSAGE_BACKLOG);
        Self {
            screen_name: RwLock::new(screen_name),
            warning: AtomicU16::new(0),
            signon_time: SystemTime::now(),
            remote_addr: Mutex::new(None),
            caps: Mutex::new(Vec::new()),
            msg_tx,
            msg_rx: AsyncMutex::new(msg_rx),
            closed: CancellationToken::new(),
        }
    }

    /// Display screen name.
    pub fn screen_name(&self) -> ScreenName {
        match self.screen_name.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the display screen name (admin nick formatting).
    pub fn set_screen_name(&self, screen_name: ScreenName) {
        match self.screen_name.write() {
            Ok(mut guard) => *guard = screen_name,
            Err(poisoned) => *poisoned.into_inner() = screen_name,
        }
    }

    /// Current warning level, tenths of a percent.
    pub fn warning(&self) -> u16 {
        self.warning.load(Ordering::Relaxed)
    }

    /// Update the warning level.
    pub fn set_warning(&self, warning: u16) {
        self.warning.store(warning, Ordering::Relaxed);
    }

    /// When this session signed on.
    pub fn signon_time(&self) -> SystemTime {
        self.signon_time
    }

    /// Remote peer address, once known.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        match self.remote_addr.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Record the remote peer address.
    pub fn set_remote_addr(&self, addr: Option<SocketAddr>) {
        match self.remote_addr.lock() {
            Ok(mut guard) => *guard = addr,
            Err(poisoned) => *poisoned.into_inner() = addr,
        }
    }

    /// Capabilities advertised for this session.
    pub fn caps(&self) -> Vec<Capability> {
        match self.caps.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the advertised capability set.
    pub fn set_caps(&self, caps: Vec<Capability>) {
        match self.caps.lock() {
            Ok(mut guard) => *guard = caps,
            Err(poisoned) => *poisoned.into_inner() = caps,
        }
    }

    /// Presence record for this session, as peers see it.
    pub fn tlv_user_info(&self) -> TlvUserInfo {
        let signon_epoch = self
            .signon_time
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs() as u32);
        TlvUserInfo {
            screen_name: self.screen_name().to_string(),
            warning_level: self.warning(),
            tlvs: vec![
                Tlv { tag: USER_INFO_FLAGS, value: 0u16.to_be_bytes().to_vec() },
                Tlv { tag: USER_INFO_SIGNON_TOD, value: signon_epoch.to_be_bytes().to_vec() },
            ]
            .into(),
        }
    }

    /// Queue a message for the gateway; `false` when the session is closed
    /// or its backlog is full.
    pub fn send_message(&self, message: SnacMessage) -> bool {
        if self.closed.is_cancelled() {
            return false;
        }
        self.msg_tx.try_send(message).is_ok()
    }

    /// Receive the next backend message. Intended for the single
    /// backend-listener (or chat relay) task of the owning connection.
    pub async fn recv_message(&self) -> Option<SnacMessage> {
        self.msg_rx.lock().await.recv().await
    }

    /// Resolves when the session is closed.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }

    /// Close the session; idempotent.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// True once [`Session::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tocgate_proto::SnacFrame;

    use super::*;
    use crate::message::SnacBody;

    fn message() -> SnacMessage {
        SnacMessage { frame: SnacFrame::new(0x0003, 0x000B), body: SnacBody::Unknown(vec![]) }
    }

    #[tokio::test]
    async fn messages_flow_in_order() {
        let sess = Session::new(ScreenName::new("alice"));
        assert!(sess.send_message(message()));
        assert!(sess.send_message(message()));
        assert!(sess.recv_message().await.is_some());
        assert!(sess.recv_message().await.is_some());
    }

    #[tokio::test]
    async fn closed_session_refuses_messages() {
        let sess = Session::new(ScreenName::new("alice"));
        assert!(!sess.is_closed());
        sess.close();
        assert!(sess.is_closed());
        assert!(!sess.send_message(message()));
        sess.closed().await; // resolves immediately
    }

    #[test]
    fn user_info_reflects_state() {
        let sess = Session::new(ScreenName::new("Jim Bob"));
        sess.set_warning(30);
        let info = sess.tlv_user_info();
        assert_eq!(info.screen_name, "Jim Bob");
        assert_eq!(info.warning_level, 30);
        assert!(info.tlvs.has_tag(USER_INFO_SIGNON_TOD));
    }
}

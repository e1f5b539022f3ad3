//! Scenario harness: a cooperative scripted backend plus a client driven
//! over in-memory pipes.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{io::DuplexStream, sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tocgate_core::{
    HmacCookieBaker, MemoryConfigStore, ScreenName, ServiceError, Session, SnacBody, SnacMessage,
    services,
};
use tocgate_proto::{
    FlapFrameType, FlapReader, FlapSignonFrame, FlapWriter, SnacError, SnacFrame,
    admin::AdminInfoChangeRequest,
    buddy::{BuddyAddBuddies, BuddyDelBuddies},
    chat::{ChatChannelMsgToHost, ChatRoom},
    chatnav::ChatNavRequestRoomInfo,
    icbm::{IcbmChannelMsgToHost, IcbmEvilRequest},
    locate::{LocateSetDirInfo, LocateSetInfo, LocateUserInfoQuery},
    new_tlv_be,
    oservice::{OServiceClientOnline, OServiceIdleNotification, OServiceServiceRequest},
    permit_deny::{PermitDenyAddDenyListEntries, PermitDenyAddPermListEntries},
    snac::{ERROR_CODE_NOT_LOGGED_ON, FOOD_GROUP_LOCATE, SUB_GROUP_ERR},
    tlv::TlvRestBlock,
};
use tocgate_server::{
    BackendServices, CommandTranslator, ConnectionError, SignonLimiter, handle_toc_connection,
};

const AUTH_COOKIE_TLV: u16 = 0x0006;
const ERROR_SUBCODE_TLV: u16 = 0x0008;

/// Backend that accepts the `alice` sign-on and scripts simple replies.
pub struct ScriptedBackend {
    /// The BOS session handed out at sign-on; tests push events into it.
    pub session: Arc<Session>,
    /// Reject every login with an error subcode when set.
    pub reject_login: std::sync::atomic::AtomicBool,
    /// Config store pre-seeded with alice's stored TOC config.
    pub config_store: Arc<MemoryConfigStore>,
    /// Records channel-msg-to-host calls for assertions.
    pub sent_ims: mpsc::UnboundedSender<IcbmChannelMsgToHost>,
}

impl ScriptedBackend {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<IcbmChannelMsgToHost>) {
        let (sent_ims, im_log) = mpsc::unbounded_channel();
        let backend = Arc::new(Self {
            session: Arc::new(Session::new(ScreenName::new("alice"))),
            reject_login: std::sync::atomic::AtomicBool::new(false),
            config_store: Arc::new(MemoryConfigStore::seeded([(
                ScreenName::new("alice"),
                "m 1\ng Buddies\nb bob".to_owned(),
            )])),
            sent_ims,
        });
        (backend, im_log)
    }

    pub fn services(self: &Arc<Self>) -> BackendServices {
        BackendServices {
            auth: self.clone(),
            oservice: self.clone(),
            locate: self.clone(),
            buddy: self.clone(),
            icbm: self.clone(),
            permit_deny: self.clone(),
            admin: self.clone(),
            chat_nav: self.clone(),
            chat: self.clone(),
            buddy_list: self.clone(),
            config_store: self.config_store.clone(),
            cookie_baker: Arc::new(HmacCookieBaker::new(*b"scenario-harness-key")),
        }
    }
}

#[async_trait]
impl services::AuthService for ScriptedBackend {
    async fn flap_login(&self, _frame: FlapSignonFrame) -> Result<TlvRestBlock, ServiceError> {
        if self.reject_login.load(std::sync::atomic::Ordering::Relaxed) {
            Ok(vec![new_tlv_be(ERROR_SUBCODE_TLV, &5u16)?].into())
        } else {
            Ok(vec![new_tlv_be(AUTH_COOKIE_TLV, &b"bos-cookie"[..])?].into())
        }
    }

    async fn register_bos_session(
        &self,
        auth_cookie: &[u8],
    ) -> Result<Option<Arc<Session>>, ServiceError> {
        assert_eq!(auth_cookie, b"bos-cookie");
        Ok(Some(self.session.clone()))
    }

    async fn register_chat_session(
        &self,
        _login_cookie: &[u8],
    ) -> Result<Option<Arc<Session>>, ServiceError> {
        Ok(Some(Arc::new(Session::new(ScreenName::new("alice")))))
    }

    async fn signout(&self, _sess: &Arc<Session>) {}

    async fn signout_chat(&self, _sess: &Arc<Session>) {}
}

#[async_trait]
impl services::OServiceService for ScriptedBackend {
    async fn client_online(
        &self,
        _body: OServiceClientOnline,
        _sess: &Arc<Session>,
    ) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn service_request(
        &self,
        _sess: &Arc<Session>,
        _frame: SnacFrame,
        _body: OServiceServiceRequest,
    ) -> Result<SnacMessage, ServiceError> {
        Err(ServiceError::Unavailable("no chat service scripted".into()))
    }

    async fn idle_notification(
        &self,
        _sess: &Arc<Session>,
        _body: OServiceIdleNotification,
    ) -> Result<(), ServiceError> {
        Ok(())
    }
}

#[async_trait]
impl services::LocateService for ScriptedBackend {
    async fn set_info(
        &self,
        _sess: &Arc<Session>,
        _body: LocateSetInfo,
    ) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn set_dir_info(
        &self,
        _sess: &Arc<Session>,
        _body: LocateSetDirInfo,
    ) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn user_info_query(
        &self,
        _sess: &Arc<Session>,
        _frame: SnacFrame,
        _body: LocateUserInfoQuery,
    ) -> Result<SnacMessage, ServiceError> {
        // Every queried target is offline in this script.
        Ok(SnacMessage {
            frame: SnacFrame::new(FOOD_GROUP_LOCATE, SUB_GROUP_ERR).server_originated(),
            body: SnacBody::Error(SnacError {
                code: ERROR_CODE_NOT_LOGGED_ON,
                tlvs: TlvRestBlock::default(),
            }),
        })
    }
}

#[async_trait]
impl services::BuddyService for ScriptedBackend {
    async fn add_buddies(
        &self,
        _sess: &Arc<Session>,
        _body: BuddyAddBuddies,
    ) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn del_buddies(
        &self,
        _sess: &Arc<Session>,
        _body: BuddyDelBuddies,
    ) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn broadcast_buddy_departed(&self, _sess: &Arc<Session>) -> Result<(), ServiceError> {
        Ok(())
    }
}

#[async_trait]
impl services::IcbmService for ScriptedBackend {
    async fn channel_msg_to_host(
        &self,
        _sess: &Arc<Session>,
        _frame: SnacFrame,
        body: IcbmChannelMsgToHost,
    ) -> Result<Option<SnacMessage>, ServiceError> {
        let _ = self.sent_ims.send(body);
        Ok(None)
    }

    async fn evil_request(
        &self,
        _sess: &Arc<Session>,
        _frame: SnacFrame,
        _body: IcbmEvilRequest,
    ) -> Result<SnacMessage, ServiceError> {
        Err(ServiceError::Unavailable("no evil scripted".into()))
    }
}

#[async_trait]
impl services::PermitDenyService for ScriptedBackend {
    async fn add_perm_list_entries(
        &self,
        _sess: &Arc<Session>,
        _body: PermitDenyAddPermListEntries,
    ) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn add_deny_list_entries(
        &self,
        _sess: &Arc<Session>,
        _body: PermitDenyAddDenyListEntries,
    ) -> Result<(), ServiceError> {
        Ok(())
    }
}

#[async_trait]
impl services::AdminService for ScriptedBackend {
    async fn info_change_request(
        &self,
        _sess: &Arc<Session>,
        _frame: SnacFrame,
        _body: AdminInfoChangeRequest,
    ) -> Result<SnacMessage, ServiceError> {
        Err(ServiceError::Unavailable("no admin scripted".into()))
    }
}

#[async_trait]
impl services::ChatNavService for ScriptedBackend {
    async fn create_room(
        &self,
        _sess: &Arc<Session>,
        _frame: SnacFrame,
        _room: ChatRoom,
    ) -> Result<SnacMessage, ServiceError> {
        Err(ServiceError::Unavailable("no chat nav scripted".into()))
    }

    async fn request_room_info(
        &self,
        _frame: SnacFrame,
        _body: ChatNavRequestRoomInfo,
    ) -> Result<SnacMessage, ServiceError> {
        Err(ServiceError::Unavailable("no chat nav scripted".into()))
    }
}

#[async_trait]
impl services::ChatService for ScriptedBackend {
    async fn channel_msg_to_host(
        &self,
        _sess: &Arc<Session>,
        _frame: SnacFrame,
        _body: ChatChannelMsgToHost,
    ) -> Result<Option<SnacMessage>, ServiceError> {
        Err(ServiceError::Unavailable("no chat scripted".into()))
    }
}

#[async_trait]
impl services::BuddyListRegistry for ScriptedBackend {
    async fn register_buddy_list(&self, _user: &ScreenName) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn unregister_buddy_list(&self, _user: &ScreenName) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// The client's half of a gateway conversation over in-memory pipes.
pub struct TestClient {
    pub reader: FlapReader<tokio::io::ReadHalf<DuplexStream>>,
    pub writer: FlapWriter<tokio::io::WriteHalf<DuplexStream>>,
}

impl TestClient {
    /// Send one TOC command as a data frame.
    pub async fn send_command(&mut self, line: &str) {
        self.writer.send_data_frame(line.as_bytes()).await.unwrap();
    }

    /// Receive the next data frame as text.
    pub async fn recv_line(&mut self) -> String {
        let (frame_type, payload) = timeout(self.reader.receive_frame()).await.unwrap();
        assert_eq!(frame_type, FlapFrameType::Data);
        String::from_utf8(payload).unwrap()
    }
}

/// A gateway connection under test.
pub struct Scenario {
    pub client: TestClient,
    pub cancel: CancellationToken,
    pub handle: JoinHandle<Result<(), ConnectionError>>,
}

/// Bound on every await in the scenarios.
pub async fn timeout<F: std::future::Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future).await.expect("scenario step timed out")
}

/// Start a handler over pipes with the given backend and limiter.
pub fn spawn_gateway(backend: &Arc<ScriptedBackend>, limiter: Arc<SignonLimiter>) -> Scenario {
    let (client_stream, server_stream) = tokio::io::duplex(64 * 1024);
    let translator = Arc::new(CommandTranslator::new(backend.services()));
    let cancel = CancellationToken::new();
    let peer: SocketAddr = "127.0.0.1:49152".parse().unwrap();

    let handler_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        handle_toc_connection(translator, &limiter, server_stream, peer, handler_cancel).await
    });

    let (read_half, write_half) = tokio::io::split(client_stream);
    Scenario {
        client: TestClient {
            reader: FlapReader::new(read_half),
            writer: FlapWriter::new(write_half),
        },
        cancel,
        handle,
    }
}

impl Scenario {
    /// Run the FLAP handshake and the `toc_signon` exchange; returns the
    /// `SIGN_ON` and `CONFIG` lines.
    pub async fn sign_on(&mut self) -> (String, String) {
        use tokio::io::AsyncWriteExt as _;
        self.client.writer.get_mut().write_all(tocgate_proto::flap::FLAPON).await.unwrap();
        let _server_signon = timeout(self.client.reader.receive_signon_frame()).await.unwrap();
        self.client
            .writer
            .send_signon_frame(TlvRestBlock::default())
            .await
            .unwrap();
        self.client
            .send_command("toc_signon 127.0.0.1 5190 alice 0x0000000000000000 english TIC:1.0")
            .await;
        let sign_on = self.client.recv_line().await;
        let config = self.client.recv_line().await;
        (sign_on, config)
    }
}

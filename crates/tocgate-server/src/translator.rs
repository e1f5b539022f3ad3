//! The TOC command translator.
//!
//! One handler per supported verb: parse the TOC arguments, build the
//! SNACs, call the backend contracts, and synthesize the TOC reply line.
//! Handlers return `Ok(String)` — possibly empty for silent verbs — and
//! never surface raw errors to the client: the dispatcher logs failures and
//! answers `ERROR:989:internal server error`.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tocgate_core::{
    ScreenName, Session, SnacBody,
    services::{
        AdminService, AuthService, BuddyListRegistry, BuddyService, ChatNavService, ChatService,
        IcbmService, LocateService, OServiceService, PermitDenyService,
    },
    CookieBaker, TocConfigStore,
};
use tocgate_proto::{
    Capability, SnacFrame, Tlv, new_tlv_be,
    admin::{
        ADMIN_ERR_INVALID_FIELD_LENGTH, ADMIN_ERR_VALIDATE_PASSWORD, ADMIN_INFO_CHANGE_REQUEST,
        ADMIN_TLV_ERROR_CODE, ADMIN_TLV_NEW_PASSWORD, ADMIN_TLV_OLD_PASSWORD,
        ADMIN_TLV_SCREEN_NAME_FORMATTED, AdminInfoChangeRequest,
    },
    buddy::{BuddyAddBuddies, BuddyDelBuddies, BuddyName},
    chat::{
        CHAT_CHANNEL_MSG_TO_HOST, CHAT_TLV_ENABLE_REFLECTION_FLAG, CHAT_TLV_PUBLIC_WHISPER_FLAG,
        CHAT_TLV_ROOM_NAME, CHAT_TLV_SENDER_INFORMATION, CHAT_TLV_WHISPER_TO_USER, ChatChannelMsgToHost,
        ChatRoom, ChatRoomKey, chat_message_info, chat_message_text,
    },
    chatnav::{CHAT_NAV_CREATE_ROOM, CHAT_NAV_REQUEST_ROOM_INFO, ChatNavRequestRoomInfo},
    codec::decode_be,
    flap::FlapSignonFrame,
    icbm::{
        ICBM_CHANNEL_IM, ICBM_CHANNEL_MSG_TO_HOST, ICBM_CHANNEL_RENDEZVOUS, ICBM_EVIL_REQUEST,
        ICBM_TLV_AUTO_RESPONSE, ICBM_TLV_FRAGMENT_LIST, ICBM_TLV_RENDEZVOUS, IcbmCh2Fragment,
        IcbmChannelMsgToHost, IcbmEvilRequest, RDV_CANCEL_REASON_USER_CANCEL, RDV_TLV_CANCEL_REASON,
        RDV_TLV_INVITATION, RDV_TLV_INVITE_MIME_CHARSET, RDV_TLV_INVITE_MIME_LANG,
        RDV_TLV_SEQUENCE, RDV_TLV_SVC_DATA, RDV_TYPE_ACCEPT, RDV_TYPE_CANCEL, RDV_TYPE_PROPOSE,
        message_fragments,
    },
    locate::{
        DIR_TLV_CITY, DIR_TLV_COUNTRY, DIR_TLV_FIRST_NAME, DIR_TLV_LAST_NAME, DIR_TLV_MAIDEN_NAME,
        DIR_TLV_MIDDLE_NAME, DIR_TLV_STATE,
        LOCATE_TLV_CAPABILITIES, LOCATE_TLV_SIG_DATA, LOCATE_TLV_UNAVAILABLE_DATA,
        LOCATE_USER_INFO_QUERY, LocateSetDirInfo, LocateSetInfo, LocateUserInfoQuery,
        USER_INFO_QUERY_AWAY, USER_INFO_QUERY_SIG,
    },
    oservice::{
        OSERVICE_SERVICE_REQUEST, OServiceClientOnline, OServiceIdleNotification,
        OServiceServiceRequest, SERVICE_REQUEST_ROOM_INFO, SERVICE_RESPONSE_LOGIN_COOKIE,
    },
    permit_deny::{PermitDenyAddDenyListEntries, PermitDenyAddPermListEntries},
    snac::{
        ERROR_CODE_NOT_LOGGED_ON, FOOD_GROUP_ADMIN, FOOD_GROUP_CHAT, FOOD_GROUP_CHAT_NAV,
        FOOD_GROUP_ICBM, FOOD_GROUP_LOCATE, FOOD_GROUP_OSERVICE,
    },
    tlv::new_record_tlv_be,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::{
    args::{parse_args, split_verb},
    chat_registry::ChatRegistry,
    error::CommandError,
    events::{spawn_chat_relay, trim_trailing_nuls, update_buddy_arrived},
};

/// The catch-all TOC error line.
pub const ERR_INTERNAL: &str = "ERROR:989:internal server error";

/// FLAP login TLV: screen name.
const LOGIN_TLV_SCREEN_NAME: u16 = 0x0001;
/// FLAP login TLV: roasted password octets.
const LOGIN_TLV_ROASTED_PASSWORD: u16 = 0x0002;
/// FLAP login TLV: authorization cookie.
const LOGIN_TLV_AUTH_COOKIE: u16 = 0x0006;
/// FLAP login TLV: error subcode, present on rejection.
const LOGIN_TLV_ERROR_SUBCODE: u16 = 0x0008;

/// Positional field names of `toc_dir_search`, colon-separated.
const DIR_SEARCH_FIELDS: [&str; 11] = [
    "first_name",
    "middle_name",
    "last_name",
    "maiden_name",
    "country",
    "state",
    "city",
    "nick_name",
    "zip_code",
    "address",
    "email",
];

/// The backend collaborators the translator calls into.
#[derive(Clone)]
pub struct BackendServices {
    /// Authentication and session registration.
    pub auth: Arc<dyn AuthService>,
    /// OService operations.
    pub oservice: Arc<dyn OServiceService>,
    /// Locate operations.
    pub locate: Arc<dyn LocateService>,
    /// Buddy roster operations.
    pub buddy: Arc<dyn BuddyService>,
    /// Instant messaging and rendezvous.
    pub icbm: Arc<dyn IcbmService>,
    /// Permit/deny lists.
    pub permit_deny: Arc<dyn PermitDenyService>,
    /// Account administration.
    pub admin: Arc<dyn AdminService>,
    /// Chat room creation and lookup.
    pub chat_nav: Arc<dyn ChatNavService>,
    /// Chat room messaging.
    pub chat: Arc<dyn ChatService>,
    /// Buddy-list lifecycle registry.
    pub buddy_list: Arc<dyn BuddyListRegistry>,
    /// TOC configuration persistence.
    pub config_store: Arc<dyn TocConfigStore>,
    /// HMAC cookie baker for `GOTO_URL` tokens.
    pub cookie_baker: Arc<dyn CookieBaker>,
}

/// Per-connection state a command handler may touch.
pub struct ConnContext {
    /// The signed-on BOS session.
    pub sess: Arc<Session>,
    /// This connection's chat registry.
    pub chats: Arc<ChatRegistry>,
    /// Producer side of the outbound line queue.
    pub reply_tx: mpsc::Sender<String>,
    /// Connection-scoped cancellation, parent of every chat relay.
    pub cancel: CancellationToken,
}

/// Successful sign-on: the BOS session plus the reply lines to emit.
pub struct SignonOutcome {
    /// The registered BOS session.
    pub sess: Arc<Session>,
    /// `SIGN_ON` and `CONFIG` lines, in order.
    pub lines: Vec<String>,
}

/// Sign-on failure; every cause surfaces to the client as `ERROR:980`.
#[derive(Debug, Error)]
#[error("bad sign-on: {0}")]
pub struct SignonFailure(String);

impl SignonFailure {
    /// The line to send before closing.
    pub fn line(&self) -> &'static str {
        "ERROR:980"
    }
}

/// Translates TOC verbs into backend choreography.
pub struct CommandTranslator {
    services: BackendServices,
}

impl CommandTranslator {
    /// Translator over the given backend.
    pub fn new(services: BackendServices) -> Self {
        Self { services }
    }

    /// The backend bundle, for connection teardown.
    pub fn services(&self) -> &BackendServices {
        &self.services
    }

    /// Handle the `toc_signon` payload (arguments after the verb).
    ///
    /// Wire shape: `<host> <port> <screen> <password> <lang> <version>`;
    /// host, port, lang, and version are ignored. The password is the
    /// hex-encoded roasted form prefixed `0x`; de-roasting is the backend's
    /// job.
    pub async fn signon(
        &self,
        arguments: &str,
        peer: std::net::SocketAddr,
    ) -> Result<SignonOutcome, SignonFailure> {
        let args = parse_args(arguments);
        let [_host, _port, screen, password, ..] = args.as_slice() else {
            return Err(SignonFailure("too few sign-on arguments".into()));
        };

        let roasted = password
            .strip_prefix("0x")
            .ok_or_else(|| SignonFailure("password is not roasted-hex".into()))
            .and_then(|hex_text| {
                hex::decode(hex_text).map_err(|err| SignonFailure(format!("bad password hex: {err}")))
            })?;

        let frame = FlapSignonFrame {
            flap_version: 1,
            tlvs: vec![
                new_tlv_be(LOGIN_TLV_SCREEN_NAME, screen.as_str())
                    .map_err(|err| SignonFailure(err.to_string()))?,
                Tlv { tag: LOGIN_TLV_ROASTED_PASSWORD, value: roasted },
            ]
            .into(),
        };

        let reply = self
            .services
            .auth
            .flap_login(frame)
            .await
            .map_err(|err| SignonFailure(format!("login failed: {err}")))?;
        if reply.has_tag(LOGIN_TLV_ERROR_SUBCODE) {
            return Err(SignonFailure("credentials rejected".into()));
        }
        let cookie = reply
            .bytes(LOGIN_TLV_AUTH_COOKIE)
            .ok_or_else(|| SignonFailure("login reply carried no cookie".into()))?;

        let sess = self
            .services
            .auth
            .register_bos_session(cookie)
            .await
            .map_err(|err| SignonFailure(format!("session registration failed: {err}")))?
            .ok_or_else(|| SignonFailure("auth cookie did not resolve".into()))?;

        sess.set_remote_addr(Some(peer));
        sess.set_caps(vec![Capability::CHAT]);

        let screen_name = sess.screen_name();
        self.services
            .buddy_list
            .register_buddy_list(&screen_name)
            .await
            .map_err(|err| SignonFailure(format!("buddy list registration failed: {err}")))?;

        let config = self
            .services
            .config_store
            .toc_config(&screen_name)
            .await
            .map_err(|err| SignonFailure(format!("config load failed: {err}")))?
            .unwrap_or_default();

        tracing::info!(screen_name = %screen_name, %peer, "TOC sign-on");
        Ok(SignonOutcome {
            sess,
            lines: vec!["SIGN_ON:TOC1.0".to_owned(), format!("CONFIG:{config}")],
        })
    }

    /// Dispatch one inbound TOC command; returns the reply line, empty for
    /// silent verbs.
    pub async fn handle_command(&self, ctx: &ConnContext, payload: &str) -> String {
        let (verb, rest) = split_verb(payload);
        let result = match verb {
            "toc_init_done" => self.init_done(ctx).await,
            "toc_send_im" => self.send_im(ctx, rest).await,
            "toc_add_buddy" => self.add_buddy(ctx, rest).await,
            "toc_remove_buddy" => self.remove_buddy(ctx, rest).await,
            "toc_add_permit" => self.add_permit(ctx, rest).await,
            "toc_add_deny" => self.add_deny(ctx, rest).await,
            "toc_set_away" => self.set_away(ctx, rest).await,
            "toc_set_info" => self.set_info(ctx, rest).await,
            "toc_set_dir" => self.set_dir(ctx, rest).await,
            "toc_set_idle" => self.set_idle(ctx, rest).await,
            "toc_set_caps" => self.set_caps(ctx, rest).await,
            "toc_set_config" => self.set_config(ctx, rest).await,
            "toc_get_status" => self.get_status(ctx, rest).await,
            "toc_get_info" => self.get_info(ctx, rest),
            "toc_get_dir" => self.get_dir(ctx, rest),
            "toc_dir_search" => self.dir_search(ctx, rest),
            "toc_chat_join" => self.chat_join(ctx, rest).await,
            "toc_chat_accept" => self.chat_accept(ctx, rest).await,
            "toc_chat_send" => self.chat_send(ctx, rest).await,
            "toc_chat_whisper" => self.chat_whisper(ctx, rest).await,
            "toc_chat_invite" => self.chat_invite(ctx, rest).await,
            "toc_chat_leave" => self.chat_leave(ctx, rest).await,
            "toc_evil" => self.evil(ctx, rest).await,
            "toc_change_passwd" => self.change_passwd(ctx, rest).await,
            "toc_format_nickname" => self.format_nickname(ctx, rest).await,
            "toc_rvous_accept" => self.rvous_accept(ctx, rest).await,
            "toc_rvous_cancel" => self.rvous_cancel(ctx, rest).await,
            other => Err(CommandError::UnknownVerb(other.to_owned())),
        };
        match result {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(verb, error = %err, "TOC command failed");
                ERR_INTERNAL.to_owned()
            },
        }
    }

    async fn init_done(&self, ctx: &ConnContext) -> Result<String, CommandError> {
        self.services.oservice.client_online(OServiceClientOnline::default(), &ctx.sess).await?;
        Ok(String::new())
    }

    async fn send_im(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let [dst, msg, extra @ ..] = args.as_slice() else {
            return Err(CommandError::MissingArgs);
        };
        let auto = extra.first().is_some_and(|flag| flag == "auto");

        let mut tlvs =
            vec![new_tlv_be(ICBM_TLV_FRAGMENT_LIST, &message_fragments(msg)?[..])?];
        if auto {
            tlvs.push(new_tlv_be::<[u8]>(ICBM_TLV_AUTO_RESPONSE, &[])?);
        }
        let body = IcbmChannelMsgToHost {
            cookie: icbm_cookie(),
            channel: ICBM_CHANNEL_IM,
            screen_name: dst.clone(),
            tlvs: tlvs.into(),
        };
        self.services
            .icbm
            .channel_msg_to_host(
                &ctx.sess,
                SnacFrame::new(FOOD_GROUP_ICBM, ICBM_CHANNEL_MSG_TO_HOST),
                body,
            )
            .await?;
        Ok(String::new())
    }

    async fn add_buddy(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let body = BuddyAddBuddies { buddies: buddy_names(rest) };
        self.services.buddy.add_buddies(&ctx.sess, body).await?;
        Ok(String::new())
    }

    async fn remove_buddy(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let body = BuddyDelBuddies { buddies: buddy_names(rest) };
        self.services.buddy.del_buddies(&ctx.sess, body).await?;
        Ok(String::new())
    }

    async fn add_permit(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let body = PermitDenyAddPermListEntries { users: buddy_names(rest) };
        self.services.permit_deny.add_perm_list_entries(&ctx.sess, body).await?;
        Ok(String::new())
    }

    async fn add_deny(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let body = PermitDenyAddDenyListEntries { users: buddy_names(rest) };
        self.services.permit_deny.add_deny_list_entries(&ctx.sess, body).await?;
        Ok(String::new())
    }

    async fn set_away(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let message = args.first().map(String::as_str).unwrap_or_default();
        let body = LocateSetInfo {
            tlvs: vec![new_tlv_be(LOCATE_TLV_UNAVAILABLE_DATA, message)?].into(),
        };
        self.services.locate.set_info(&ctx.sess, body).await?;
        Ok(String::new())
    }

    async fn set_info(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let [profile, ..] = args.as_slice() else {
            return Err(CommandError::MissingArgs);
        };
        let body = LocateSetInfo {
            tlvs: vec![new_tlv_be(LOCATE_TLV_SIG_DATA, profile.as_str())?].into(),
        };
        self.services.locate.set_info(&ctx.sess, body).await?;
        Ok(String::new())
    }

    async fn set_dir(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let [spec, ..] = args.as_slice() else {
            return Err(CommandError::MissingArgs);
        };
        let fields: Vec<&str> = spec.split(':').collect();
        if fields.len() > 9 {
            return Err(CommandError::BadArg(format!(
                "{} directory fields, at most 9 allowed",
                fields.len()
            )));
        }
        let field = |idx: usize| fields.get(idx).copied().unwrap_or_default();

        // Positions: first, middle, last, maiden, city, state, country,
        // email, web. Email and web are ignored.
        let tlvs = vec![
            new_tlv_be(DIR_TLV_FIRST_NAME, field(0))?,
            new_tlv_be(DIR_TLV_MIDDLE_NAME, field(1))?,
            new_tlv_be(DIR_TLV_LAST_NAME, field(2))?,
            new_tlv_be(DIR_TLV_MAIDEN_NAME, field(3))?,
            new_tlv_be(DIR_TLV_CITY, field(4))?,
            new_tlv_be(DIR_TLV_STATE, field(5))?,
            new_tlv_be(DIR_TLV_COUNTRY, field(6))?,
        ];
        self.services
            .locate
            .set_dir_info(&ctx.sess, LocateSetDirInfo { tlvs: tlvs.into() })
            .await?;
        Ok(String::new())
    }

    async fn set_idle(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let [seconds, ..] = args.as_slice() else {
            return Err(CommandError::MissingArgs);
        };
        let idle_time = seconds
            .parse::<u32>()
            .map_err(|err| CommandError::BadArg(format!("idle seconds: {err}")))?;
        self.services
            .oservice
            .idle_notification(&ctx.sess, OServiceIdleNotification { idle_time })
            .await?;
        Ok(String::new())
    }

    async fn set_caps(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let mut caps = Vec::with_capacity(args.len() + 1);
        for arg in &args {
            let cap = Capability::parse(arg)
                .ok_or_else(|| CommandError::BadArg(format!("capability {arg:?}")))?;
            caps.push(cap);
        }
        if !caps.contains(&Capability::CHAT) {
            caps.push(Capability::CHAT);
        }
        ctx.sess.set_caps(caps.clone());

        let mut value = Vec::with_capacity(caps.len() * 16);
        for cap in &caps {
            value.extend_from_slice(cap.as_bytes());
        }
        let body = LocateSetInfo {
            tlvs: vec![new_tlv_be(LOCATE_TLV_CAPABILITIES, &value[..])?].into(),
        };
        self.services.locate.set_info(&ctx.sess, body).await?;
        Ok(String::new())
    }

    async fn set_config(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let config = rest.trim_matches(|c| c == '\'' || c == '"' || c == ' ');
        self.services
            .config_store
            .set_toc_config(&ctx.sess.screen_name(), config)
            .await?;
        Ok(String::new())
    }

    async fn get_status(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let [screen, ..] = args.as_slice() else {
            return Err(CommandError::MissingArgs);
        };
        let body = LocateUserInfoQuery {
            query_type: USER_INFO_QUERY_SIG | USER_INFO_QUERY_AWAY,
            screen_name: screen.clone(),
        };
        let reply = self
            .services
            .locate
            .user_info_query(
                &ctx.sess,
                SnacFrame::new(FOOD_GROUP_LOCATE, LOCATE_USER_INFO_QUERY),
                body,
            )
            .await?;
        match reply.body {
            SnacBody::UserInfoReply(reply) => Ok(update_buddy_arrived(&reply.user_info)),
            SnacBody::Error(err) if err.code == ERROR_CODE_NOT_LOGGED_ON => {
                Ok(format!("ERROR:901:{screen}"))
            },
            _ => Err(CommandError::UnexpectedReply),
        }
    }

    fn get_info(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let [user, ..] = args.as_slice() else {
            return Err(CommandError::MissingArgs);
        };
        let me = ctx.sess.screen_name();
        let cookie = self.http_cookie(&me)?;
        let query = query_string(&[
            ("cookie", cookie.as_str()),
            ("from", me.as_str()),
            ("user", user.as_str()),
        ]);
        Ok(format!("GOTO_URL:profile:info?{query}"))
    }

    fn get_dir(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let [user, ..] = args.as_slice() else {
            return Err(CommandError::MissingArgs);
        };
        let cookie = self.http_cookie(&ctx.sess.screen_name())?;
        let query = query_string(&[("cookie", cookie.as_str()), ("user", user.as_str())]);
        Ok(format!("GOTO_URL:directory info:dir_info?{query}"))
    }

    fn dir_search(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let [spec, ..] = args.as_slice() else {
            return Err(CommandError::MissingArgs);
        };
        let fields: Vec<&str> = spec.split(':').collect();
        if fields.len() > DIR_SEARCH_FIELDS.len() {
            return Err(CommandError::BadArg(format!(
                "{} search fields, at most {} allowed",
                fields.len(),
                DIR_SEARCH_FIELDS.len()
            )));
        }
        let mut pairs: Vec<(&str, &str)> = DIR_SEARCH_FIELDS
            .iter()
            .zip(fields.iter())
            .filter(|(_, value)| !value.is_empty())
            .map(|(name, value)| (*name, *value))
            .collect();
        if pairs.is_empty() {
            return Err(CommandError::BadArg("no search fields supplied".into()));
        }
        let cookie = self.http_cookie(&ctx.sess.screen_name())?;
        pairs.push(("cookie", cookie.as_str()));
        let query = query_string(&pairs);
        Ok(format!("GOTO_URL:search results:dir_search?{query}"))
    }

    async fn chat_join(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let [exchange, name, ..] = args.as_slice() else {
            return Err(CommandError::MissingArgs);
        };
        let exchange = exchange
            .parse::<u16>()
            .map_err(|err| CommandError::BadArg(format!("exchange: {err}")))?;

        let request = ChatRoom {
            exchange,
            cookie: "create".to_owned(),
            instance: 0,
            detail_level: 2,
            tlvs: vec![new_tlv_be(CHAT_TLV_ROOM_NAME, name.as_str())?].into(),
        };
        let reply = self
            .services
            .chat_nav
            .create_room(
                &ctx.sess,
                SnacFrame::new(FOOD_GROUP_CHAT_NAV, CHAT_NAV_CREATE_ROOM),
                request,
            )
            .await?;
        let SnacBody::ChatNavInfo(info) = reply.body else {
            return Err(CommandError::UnexpectedReply);
        };
        let room = info.room().ok_or(CommandError::UnexpectedReply)?;

        let chat_id = self.connect_chat(ctx, room.key()).await?;
        Ok(format!("CHAT_JOIN:{chat_id}:{}", room.name()))
    }

    async fn chat_accept(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let chat_id = parse_chat_id(&args)?;
        let key = ctx
            .chats
            .lookup_room(chat_id)
            .ok_or_else(|| CommandError::BadArg(format!("unknown chat id {chat_id}")))?;

        let request = ChatNavRequestRoomInfo {
            exchange: key.exchange,
            cookie: key.cookie.clone(),
            instance: key.instance,
            detail_level: 2,
        };
        let reply = self
            .services
            .chat_nav
            .request_room_info(
                SnacFrame::new(FOOD_GROUP_CHAT_NAV, CHAT_NAV_REQUEST_ROOM_INFO),
                request,
            )
            .await?;
        let SnacBody::ChatNavInfo(info) = reply.body else {
            return Err(CommandError::UnexpectedReply);
        };
        let room = info.room().ok_or(CommandError::UnexpectedReply)?;

        let chat_id = self.connect_chat(ctx, room.key()).await?;
        Ok(format!("CHAT_JOIN:{chat_id}:{}", room.name()))
    }

    /// Shared tail of join/accept: request the chat service connection,
    /// register the chat session, bring it online, and wire the relay.
    async fn connect_chat(
        &self,
        ctx: &ConnContext,
        key: ChatRoomKey,
    ) -> Result<u32, CommandError> {
        let request = OServiceServiceRequest {
            food_group: FOOD_GROUP_CHAT,
            tlvs: vec![new_record_tlv_be(SERVICE_REQUEST_ROOM_INFO, &key)?].into(),
        };
        let reply = self
            .services
            .oservice
            .service_request(
                &ctx.sess,
                SnacFrame::new(FOOD_GROUP_OSERVICE, OSERVICE_SERVICE_REQUEST),
                request,
            )
            .await?;
        let SnacBody::ServiceResponse(response) = reply.body else {
            return Err(CommandError::UnexpectedReply);
        };
        let cookie = response
            .tlvs
            .bytes(SERVICE_RESPONSE_LOGIN_COOKIE)
            .ok_or(CommandError::UnexpectedReply)?;

        let chat_sess = self
            .services
            .auth
            .register_chat_session(cookie)
            .await?
            .ok_or(CommandError::UnexpectedReply)?;
        self.services
            .oservice
            .client_online(OServiceClientOnline::default(), &chat_sess)
            .await?;

        let chat_id = ctx.chats.add(key);
        ctx.chats.register_session(chat_id, chat_sess.clone());
        spawn_chat_relay(chat_id, chat_sess, ctx.reply_tx.clone(), ctx.cancel.child_token());
        Ok(chat_id)
    }

    async fn chat_send(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let [chat_id, msg, ..] = args.as_slice() else {
            return Err(CommandError::MissingArgs);
        };
        let chat_id = chat_id
            .parse::<u32>()
            .map_err(|err| CommandError::BadArg(format!("chat id: {err}")))?;
        let chat_sess = ctx
            .chats
            .retrieve_session(chat_id)
            .ok_or_else(|| CommandError::BadArg(format!("unknown chat id {chat_id}")))?;

        // TLV order matters to period clients: reflection, sender, public
        // flag, then the message.
        let body = ChatChannelMsgToHost {
            cookie: icbm_cookie(),
            channel: 3,
            tlvs: vec![
                new_tlv_be(CHAT_TLV_ENABLE_REFLECTION_FLAG, &1u8)?,
                new_record_tlv_be(CHAT_TLV_SENDER_INFORMATION, &ctx.sess.tlv_user_info())?,
                new_tlv_be::<[u8]>(CHAT_TLV_PUBLIC_WHISPER_FLAG, &[])?,
                chat_message_info(msg)?,
            ]
            .into(),
        };
        let reply = self
            .services
            .chat
            .channel_msg_to_host(
                &chat_sess,
                SnacFrame::new(FOOD_GROUP_CHAT, CHAT_CHANNEL_MSG_TO_HOST),
                body,
            )
            .await?;

        let Some(reflected) = reply else {
            return Ok(String::new());
        };
        let SnacBody::ChatMessageToClient(reflected) = reflected.body else {
            return Err(CommandError::UnexpectedReply);
        };
        let sender = reflected
            .tlvs
            .bytes(CHAT_TLV_SENDER_INFORMATION)
            .and_then(|raw| decode_be::<tocgate_proto::TlvUserInfo>(raw).ok())
            .map_or_else(|| ctx.sess.screen_name().to_string(), |info| info.screen_name);
        let text = chat_message_text(&reflected.tlvs).unwrap_or_else(|| msg.clone());
        Ok(format!("CHAT_IN:{chat_id}:{sender}:F:{text}"))
    }

    async fn chat_whisper(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let [chat_id, dst, msg, ..] = args.as_slice() else {
            return Err(CommandError::MissingArgs);
        };
        let chat_id = chat_id
            .parse::<u32>()
            .map_err(|err| CommandError::BadArg(format!("chat id: {err}")))?;
        let chat_sess = ctx
            .chats
            .retrieve_session(chat_id)
            .ok_or_else(|| CommandError::BadArg(format!("unknown chat id {chat_id}")))?;

        let body = ChatChannelMsgToHost {
            cookie: icbm_cookie(),
            channel: 3,
            tlvs: vec![
                new_record_tlv_be(CHAT_TLV_SENDER_INFORMATION, &ctx.sess.tlv_user_info())?,
                new_tlv_be(CHAT_TLV_WHISPER_TO_USER, dst.as_str())?,
                chat_message_info(msg)?,
            ]
            .into(),
        };
        self.services
            .chat
            .channel_msg_to_host(
                &chat_sess,
                SnacFrame::new(FOOD_GROUP_CHAT, CHAT_CHANNEL_MSG_TO_HOST),
                body,
            )
            .await?;
        Ok(String::new())
    }

    async fn chat_invite(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let [chat_id, msg, invitees @ ..] = args.as_slice() else {
            return Err(CommandError::MissingArgs);
        };
        if invitees.is_empty() {
            return Err(CommandError::MissingArgs);
        }
        let chat_id = chat_id
            .parse::<u32>()
            .map_err(|err| CommandError::BadArg(format!("chat id: {err}")))?;
        let key = ctx
            .chats
            .lookup_room(chat_id)
            .ok_or_else(|| CommandError::BadArg(format!("unknown chat id {chat_id}")))?;

        for invitee in invitees {
            let cookie = icbm_cookie();
            let fragment = IcbmCh2Fragment {
                rdv_type: RDV_TYPE_PROPOSE,
                cookie,
                capability: Capability::CHAT,
                tlvs: vec![
                    new_tlv_be(RDV_TLV_SEQUENCE, &1u16)?,
                    new_tlv_be(RDV_TLV_INVITATION, msg.as_str())?,
                    new_tlv_be(RDV_TLV_INVITE_MIME_CHARSET, "us-ascii")?,
                    new_tlv_be(RDV_TLV_INVITE_MIME_LANG, "en")?,
                    new_record_tlv_be(RDV_TLV_SVC_DATA, &key)?,
                ]
                .into(),
            };
            let body = IcbmChannelMsgToHost {
                cookie,
                channel: ICBM_CHANNEL_RENDEZVOUS,
                screen_name: invitee.clone(),
                tlvs: vec![new_record_tlv_be(ICBM_TLV_RENDEZVOUS, &fragment)?].into(),
            };
            self.services
                .icbm
                .channel_msg_to_host(
                    &ctx.sess,
                    SnacFrame::new(FOOD_GROUP_ICBM, ICBM_CHANNEL_MSG_TO_HOST),
                    body,
                )
                .await?;
        }
        Ok(String::new())
    }

    async fn chat_leave(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let chat_id = parse_chat_id(&args)?;
        let chat_sess = ctx
            .chats
            .remove_session(chat_id)
            .ok_or_else(|| CommandError::BadArg(format!("unknown chat id {chat_id}")))?;
        self.services.auth.signout_chat(&chat_sess).await;
        chat_sess.close();
        Ok(format!("CHAT_LEFT:{chat_id}"))
    }

    async fn evil(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let [screen, mode, ..] = args.as_slice() else {
            return Err(CommandError::MissingArgs);
        };
        let send_as = match mode.as_str() {
            "norm" => 0,
            "anon" => 1,
            other => return Err(CommandError::BadArg(format!("evil mode {other:?}"))),
        };
        self.services
            .icbm
            .evil_request(
                &ctx.sess,
                SnacFrame::new(FOOD_GROUP_ICBM, ICBM_EVIL_REQUEST),
                IcbmEvilRequest { send_as, screen_name: screen.clone() },
            )
            .await?;
        Ok(String::new())
    }

    async fn change_passwd(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let [old, new, ..] = args.as_slice() else {
            return Err(CommandError::MissingArgs);
        };
        let body = AdminInfoChangeRequest {
            tlvs: vec![
                new_tlv_be(ADMIN_TLV_OLD_PASSWORD, old.as_str())?,
                new_tlv_be(ADMIN_TLV_NEW_PASSWORD, new.as_str())?,
            ]
            .into(),
        };
        let reply = self.admin_change(ctx, body).await?;
        Ok(match reply {
            None => "ADMIN_PASSWD_STATUS:0".to_owned(),
            Some(ADMIN_ERR_INVALID_FIELD_LENGTH) => "ERROR:911".to_owned(),
            Some(ADMIN_ERR_VALIDATE_PASSWORD) => "ERROR:912".to_owned(),
            Some(_) => "ERROR:913".to_owned(),
        })
    }

    async fn format_nickname(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let [name, ..] = args.as_slice() else {
            return Err(CommandError::MissingArgs);
        };
        let name = name
            .strip_prefix('{')
            .and_then(|inner| inner.strip_suffix('}'))
            .unwrap_or(name);

        let body = AdminInfoChangeRequest {
            tlvs: vec![new_tlv_be(ADMIN_TLV_SCREEN_NAME_FORMATTED, name)?].into(),
        };
        let reply = self.admin_change(ctx, body).await?;
        Ok(match reply {
            None => {
                ctx.sess.set_screen_name(ScreenName::new(name));
                "ADMIN_NICK_STATUS:0".to_owned()
            },
            Some(ADMIN_ERR_INVALID_FIELD_LENGTH) => "ERROR:911".to_owned(),
            Some(_) => "ERROR:913".to_owned(),
        })
    }

    /// Run an admin change; `Ok(None)` on success, `Ok(Some(code))` when
    /// the backend reports an admin error code.
    async fn admin_change(
        &self,
        ctx: &ConnContext,
        body: AdminInfoChangeRequest,
    ) -> Result<Option<u16>, CommandError> {
        let reply = self
            .services
            .admin
            .info_change_request(
                &ctx.sess,
                SnacFrame::new(FOOD_GROUP_ADMIN, ADMIN_INFO_CHANGE_REQUEST),
                body,
            )
            .await?;
        match reply.body {
            SnacBody::AdminChangeReply(reply) => Ok(reply.tlvs.u16_be(ADMIN_TLV_ERROR_CODE)),
            _ => Err(CommandError::UnexpectedReply),
        }
    }

    async fn rvous_accept(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        self.rvous_response(ctx, rest, RDV_TYPE_ACCEPT).await
    }

    async fn rvous_cancel(&self, ctx: &ConnContext, rest: &str) -> Result<String, CommandError> {
        self.rvous_response(ctx, rest, RDV_TYPE_CANCEL).await
    }

    async fn rvous_response(
        &self,
        ctx: &ConnContext,
        rest: &str,
        rdv_type: u16,
    ) -> Result<String, CommandError> {
        let args = parse_args(rest);
        let [nick, cookie_b64, uuid, ..] = args.as_slice() else {
            return Err(CommandError::MissingArgs);
        };
        let cookie_bytes = BASE64
            .decode(cookie_b64)
            .map_err(|err| CommandError::BadArg(format!("rendezvous cookie: {err}")))?;
        let cookie: [u8; 8] = cookie_bytes
            .try_into()
            .map_err(|_| CommandError::BadArg("rendezvous cookie is not 8 bytes".into()))?;
        let capability = Capability::parse(uuid)
            .ok_or_else(|| CommandError::BadArg(format!("capability {uuid:?}")))?;

        let mut tlvs = Vec::new();
        if rdv_type == RDV_TYPE_CANCEL {
            tlvs.push(new_tlv_be(RDV_TLV_CANCEL_REASON, &RDV_CANCEL_REASON_USER_CANCEL)?);
        }
        let fragment = IcbmCh2Fragment { rdv_type, cookie, capability, tlvs: tlvs.into() };
        let body = IcbmChannelMsgToHost {
            cookie,
            channel: ICBM_CHANNEL_RENDEZVOUS,
            screen_name: nick.clone(),
            tlvs: vec![new_record_tlv_be(ICBM_TLV_RENDEZVOUS, &fragment)?].into(),
        };
        self.services
            .icbm
            .channel_msg_to_host(
                &ctx.sess,
                SnacFrame::new(FOOD_GROUP_ICBM, ICBM_CHANNEL_MSG_TO_HOST),
                body,
            )
            .await?;
        Ok(String::new())
    }

    /// Mint the hex auth cookie for `GOTO_URL` lines: HMAC over the
    /// caller's screen name, trailing zero bytes trimmed.
    fn http_cookie(&self, me: &ScreenName) -> Result<String, CommandError> {
        let cookie = self.services.cookie_baker.issue(me.as_str().as_bytes())?;
        Ok(hex::encode(trim_trailing_nuls(&cookie)))
    }
}

fn parse_chat_id(args: &[String]) -> Result<u32, CommandError> {
    let [chat_id, ..] = args else {
        return Err(CommandError::MissingArgs);
    };
    chat_id.parse::<u32>().map_err(|err| CommandError::BadArg(format!("chat id: {err}")))
}

fn buddy_names(rest: &str) -> Vec<BuddyName> {
    parse_args(rest).into_iter().map(BuddyName::new).collect()
}

fn icbm_cookie() -> [u8; 8] {
    rand::random()
}

/// Percent-encode a query value; spaces become `+`.
fn query_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            },
            b' ' => out.push('+'),
            _ => {
                out.push('%');
                out.push_str(&format!("{byte:02X}"));
            },
        }
    }
    out
}

fn query_string(pairs: &[(&str, &str)]) -> String {
    let mut query = String::new();
    for (name, value) in pairs {
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(name);
        query.push('=');
        query.push_str(&query_encode(value));
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_encoding_is_conservative() {
        assert_eq!(query_encode("alice"), "alice");
        assert_eq!(query_encode("jim bob"), "jim+bob");
        assert_eq!(query_encode("a&b=c"), "a%26b%3Dc");
        assert_eq!(query_encode("100%"), "100%25");
    }

    #[test]
    fn query_strings_join_pairs() {
        assert_eq!(
            query_string(&[("cookie", "abc"), ("from", "jim bob"), ("user", "x&y")]),
            "cookie=abc&from=jim+bob&user=x%26y"
        );
    }

    #[test]
    fn chat_id_parses_from_first_arg() {
        assert_eq!(parse_chat_id(&["7".to_owned(), "x".to_owned()]).ok(), Some(7));
        assert!(parse_chat_id(&[]).is_err());
        assert!(parse_chat_id(&["seven".to_owned()]).is_err());
    }

    #[test]
    fn buddy_names_tokenize() {
        let names = buddy_names(r#"alice "bob jr" carol"#);
        let names: Vec<&str> = names.iter().map(|n| n.screen_name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob jr", "carol"]);
    }
}

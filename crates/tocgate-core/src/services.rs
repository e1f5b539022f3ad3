//! Backend service contracts, one per food group the gateway speaks.
//!
//! Every method either performs a fire-and-forget operation or returns the
//! backend's SNAC response for the gateway to translate. Implementations
//! live with the OSCAR backend; the gateway only holds trait objects.

use std::sync::Arc;

use async_trait::async_trait;
use tocgate_proto::{
    SnacFrame,
    admin::AdminInfoChangeRequest,
    buddy::{BuddyAddBuddies, BuddyDelBuddies},
    chat::{ChatChannelMsgToHost, ChatRoom},
    chatnav::ChatNavRequestRoomInfo,
    flap::FlapSignonFrame,
    icbm::{IcbmChannelMsgToHost, IcbmEvilRequest},
    locate::{LocateSetDirInfo, LocateSetInfo, LocateUserInfoQuery},
    oservice::{OServiceClientOnline, OServiceIdleNotification, OServiceServiceRequest},
    permit_deny::{PermitDenyAddDenyListEntries, PermitDenyAddPermListEntries},
    tlv::TlvRestBlock,
};

use crate::{ScreenName, ServiceError, Session, SnacMessage};

/// Authentication and session registration.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Validate a FLAP sign-on frame (screen name + roasted password).
    /// The reply TLVs carry either an authorization cookie or an error
    /// subcode.
    async fn flap_login(&self, frame: FlapSignonFrame) -> Result<TlvRestBlock, ServiceError>;

    /// Exchange an authorization cookie for a BOS session. `None` when the
    /// cookie does not resolve.
    async fn register_bos_session(
        &self,
        auth_cookie: &[u8],
    ) -> Result<Option<Arc<Session>>, ServiceError>;

    /// Exchange a chat login cookie for a chat-room session.
    async fn register_chat_session(
        &self,
        login_cookie: &[u8],
    ) -> Result<Option<Arc<Session>>, ServiceError>;

    /// Sign a BOS session out of the backend.
    async fn signout(&self, sess: &Arc<Session>);

    /// Sign a chat session out of its room.
    async fn signout_chat(&self, sess: &Arc<Session>);
}

/// OService: session-generic operations.
#[async_trait]
pub trait OServiceService: Send + Sync {
    /// The client finished configuring and wants traffic.
    async fn client_online(
        &self,
        body: OServiceClientOnline,
        sess: &Arc<Session>,
    ) -> Result<(), ServiceError>;

    /// Request a connection to another service (chat rooms). The response
    /// carries the service's login cookie.
    async fn service_request(
        &self,
        sess: &Arc<Session>,
        frame: SnacFrame,
        body: OServiceServiceRequest,
    ) -> Result<SnacMessage, ServiceError>;

    /// Report the user's idle time.
    async fn idle_notification(
        &self,
        sess: &Arc<Session>,
        body: OServiceIdleNotification,
    ) -> Result<(), ServiceError>;
}

/// Locate: profiles, away messages, directory entries.
#[async_trait]
pub trait LocateService: Send + Sync {
    /// Replace parts of the caller's locate info.
    async fn set_info(&self, sess: &Arc<Session>, body: LocateSetInfo)
    -> Result<(), ServiceError>;

    /// Replace the caller's directory listing.
    async fn set_dir_info(
        &self,
        sess: &Arc<Session>,
        body: LocateSetDirInfo,
    ) -> Result<(), ServiceError>;

    /// Query another user's info; errors and not-logged-on come back as a
    /// SNAC error body.
    async fn user_info_query(
        &self,
        sess: &Arc<Session>,
        frame: SnacFrame,
        body: LocateUserInfoQuery,
    ) -> Result<SnacMessage, ServiceError>;
}

/// Buddy: roster maintenance and presence fan-out.
#[async_trait]
pub trait BuddyService: Send + Sync {
    /// Watch these users.
    async fn add_buddies(
        &self,
        sess: &Arc<Session>,
        body: BuddyAddBuddies,
    ) -> Result<(), ServiceError>;

    /// Stop watching these users.
    async fn del_buddies(
        &self,
        sess: &Arc<Session>,
        body: BuddyDelBuddies,
    ) -> Result<(), ServiceError>;

    /// Tell watchers this session departed.
    async fn broadcast_buddy_departed(&self, sess: &Arc<Session>) -> Result<(), ServiceError>;
}

/// ICBM: instant messages, rendezvous, warnings.
#[async_trait]
pub trait IcbmService: Send + Sync {
    /// Relay a message; the reply is present when the host acknowledges or
    /// rejects.
    async fn channel_msg_to_host(
        &self,
        sess: &Arc<Session>,
        frame: SnacFrame,
        body: IcbmChannelMsgToHost,
    ) -> Result<Option<SnacMessage>, ServiceError>;

    /// Warn another user.
    async fn evil_request(
        &self,
        sess: &Arc<Session>,
        frame: SnacFrame,
        body: IcbmEvilRequest,
    ) -> Result<SnacMessage, ServiceError>;
}

/// Permit/deny visibility lists.
#[async_trait]
pub trait PermitDenyService: Send + Sync {
    /// Add users to the permit list.
    async fn add_perm_list_entries(
        &self,
        sess: &Arc<Session>,
        body: PermitDenyAddPermListEntries,
    ) -> Result<(), ServiceError>;

    /// Add users to the deny list.
    async fn add_deny_list_entries(
        &self,
        sess: &Arc<Session>,
        body: PermitDenyAddDenyListEntries,
    ) -> Result<(), ServiceError>;
}

/// Admin: account changes.
#[async_trait]
pub trait AdminService: Send + Sync {
    /// Request an account change; the reply's TLVs carry an error code on
    /// failure.
    async fn info_change_request(
        &self,
        sess: &Arc<Session>,
        frame: SnacFrame,
        body: AdminInfoChangeRequest,
    ) -> Result<SnacMessage, ServiceError>;
}

/// Chat navigation: room creation and lookup.
#[async_trait]
pub trait ChatNavService: Send + Sync {
    /// Create (or find) a room; the nav-info reply describes it.
    async fn create_room(
        &self,
        sess: &Arc<Session>,
        frame: SnacFrame,
        room: ChatRoom,
    ) -> Result<SnacMessage, ServiceError>;

    /// Look up an existing room.
    async fn request_room_info(
        &self,
        frame: SnacFrame,
        body: ChatNavRequestRoomInfo,
    ) -> Result<SnacMessage, ServiceError>;
}

/// Chat: room messaging.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Relay a room message; the reply is the reflected message when the
    /// sender asked for reflection.
    async fn channel_msg_to_host(
        &self,
        sess: &Arc<Session>,
        frame: SnacFrame,
        body: ChatChannelMsgToHost,
    ) -> Result<Option<SnacMessage>, ServiceError>;
}

/// Buddy-list registration for session lifecycle.
#[async_trait]
pub trait BuddyListRegistry: Send + Sync {
    /// Attach the stored buddy list to a signing-on user.
    async fn register_buddy_list(&self, user: &ScreenName) -> Result<(), ServiceError>;

    /// Detach the buddy list of a signed-off user.
    async fn unregister_buddy_list(&self, user: &ScreenName) -> Result<(), ServiceError>;
}

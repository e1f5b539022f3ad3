//! Test doubles for the backend contracts.
//!
//! [`unavailable_backend`] wires every service to a stub that fails with
//! `ServiceError::Unavailable`. Good enough for exercising the listener,
//! demux, and handshake paths; scenario tests that need a cooperative
//! backend script their own implementations of the [`services`] traits.

use std::sync::Arc;

use async_trait::async_trait;
use tocgate_core::{
    HmacCookieBaker, ScreenName, ServiceError, Session, SnacMessage, TocConfigStore, services,
};
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

use crate::translator::BackendServices;

fn unavailable() -> ServiceError {
    ServiceError::Unavailable("no backend attached".into())
}

/// Backend stub whose every call fails with `Unavailable`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableBackend;

#[async_trait]
impl services::AuthService for UnavailableBackend {
    async fn flap_login(&self, _frame: FlapSignonFrame) -> Result<TlvRestBlock, ServiceError> {
        Err(unavailable())
    }

    async fn register_bos_session(
        &self,
        _auth_cookie: &[u8],
    ) -> Result<Option<Arc<Session>>, ServiceError> {
        Err(unavailable())
    }

    async fn register_chat_session(
        &self,
        _login_cookie: &[u8],
    ) -> Result<Option<Arc<Session>>, ServiceError> {
        Err(unavailable())
    }

    async fn signout(&self, _sess: &Arc<Session>) {}

    async fn signout_chat(&self, _sess: &Arc<Session>) {}
}

#[async_trait]
impl services::OServiceService for UnavailableBackend {
    async fn client_online(
        &self,
        _body: OServiceClientOnline,
        _sess: &Arc<Session>,
    ) -> Result<(), ServiceError> {
        Err(unavailable())
    }

    async fn service_request(
        &self,
        _sess: &Arc<Session>,
        _frame: SnacFrame,
        _body: OServiceServiceRequest,
    ) -> Result<SnacMessage, ServiceError> {
        Err(unavailable())
    }

    async fn idle_notification(
        &self,
        _sess: &Arc<Session>,
        _body: OServiceIdleNotification,
    ) -> Result<(), ServiceError> {
        Err(unavailable())
    }
}

#[async_trait]
impl services::LocateService for UnavailableBackend {
    async fn set_info(
        &self,
        _sess: &Arc<Session>,
        _body: LocateSetInfo,
    ) -> Result<(), ServiceError> {
        Err(unavailable())
    }

    async fn set_dir_info(
        &self,
        _sess: &Arc<Session>,
        _body: LocateSetDirInfo,
    ) -> Result<(), ServiceError> {
        Err(unavailable())
    }

    async fn user_info_query(
        &self,
        _sess: &Arc<Session>,
        _frame: SnacFrame,
        _body: LocateUserInfoQuery,
    ) -> Result<SnacMessage, ServiceError> {
        Err(unavailable())
    }
}

#[async_trait]
impl services::BuddyService for UnavailableBackend {
    async fn add_buddies(
        &self,
        _sess: &Arc<Session>,
        _body: BuddyAddBuddies,
    ) -> Result<(), ServiceError> {
        Err(unavailable())
    }

    async fn del_buddies(
        &self,
        _sess: &Arc<Session>,
        _body: BuddyDelBuddies,
    ) -> Result<(), ServiceError> {
        Err(unavailable())
    }

    async fn broadcast_buddy_departed(&self, _sess: &Arc<Session>) -> Result<(), ServiceError> {
        Err(unavailable())
    }
}

#[async_trait]
impl services::IcbmService for UnavailableBackend {
    async fn channel_msg_to_host(
        &self,
        _sess: &Arc<Session>,
        _frame: SnacFrame,
        _body: IcbmChannelMsgToHost,
    ) -> Result<Option<SnacMessage>, ServiceError> {
        Err(unavailable())
    }

    async fn evil_request(
        &self,
        _sess: &Arc<Session>,
        _frame: SnacFrame,
        _body: IcbmEvilRequest,
    ) -> Result<SnacMessage, ServiceError> {
        Err(unavailable())
    }
}

#[async_trait]
impl services::PermitDenyService for UnavailableBackend {
    async fn add_perm_list_entries(
        &self,
        _sess: &Arc<Session>,
        _body: PermitDenyAddPermListEntries,
    ) -> Result<(), ServiceError> {
        Err(unavailable())
    }

    async fn add_deny_list_entries(
        &self,
        _sess: &Arc<Session>,
        _body: PermitDenyAddDenyListEntries,
    ) -> Result<(), ServiceError> {
        Err(unavailable())
    }
}

#[async_trait]
impl services::AdminService for UnavailableBackend {
    async fn info_change_request(
        &self,
        _sess: &Arc<Session>,
        _frame: SnacFrame,
        _body: AdminInfoChangeRequest,
    ) -> Result<SnacMessage, ServiceError> {
        Err(unavailable())
    }
}

#[async_trait]
impl services::ChatNavService for UnavailableBackend {
    async fn create_room(
        &self,
        _sess: &Arc<Session>,
        _frame: SnacFrame,
        _room: ChatRoom,
    ) -> Result<SnacMessage, ServiceError> {
        Err(unavailable())
    }

    async fn request_room_info(
        &self,
        _frame: SnacFrame,
        _body: ChatNavRequestRoomInfo,
    ) -> Result<SnacMessage, ServiceError> {
        Err(unavailable())
    }
}

#[async_trait]
impl services::ChatService for UnavailableBackend {
    async fn channel_msg_to_host(
        &self,
        _sess: &Arc<Session>,
        _frame: SnacFrame,
        _body: ChatChannelMsgToHost,
    ) -> Result<Option<SnacMessage>, ServiceError> {
        Err(unavailable())
    }
}

#[async_trait]
impl services::BuddyListRegistry for UnavailableBackend {
    async fn register_buddy_list(&self, _user: &ScreenName) -> Result<(), ServiceError> {
        Err(unavailable())
    }

    async fn unregister_buddy_list(&self, _user: &ScreenName) -> Result<(), ServiceError> {
        Err(unavailable())
    }
}

#[async_trait]
impl TocConfigStore for UnavailableBackend {
    async fn toc_config(&self, _user: &ScreenName) -> Result<Option<String>, ServiceError> {
        Err(unavailable())
    }

    async fn set_toc_config(&self, _user: &ScreenName, _config: &str) -> Result<(), ServiceError> {
        Err(unavailable())
    }
}

/// A [`BackendServices`] bundle wired entirely to [`UnavailableBackend`].
pub fn unavailable_backend() -> BackendServices {
    let stub = Arc::new(UnavailableBackend);
    BackendServices {
        auth: stub.clone(),
        oservice: stub.clone(),
        locate: stub.clone(),
        buddy: stub.clone(),
        icbm: stub.clone(),
        permit_deny: stub.clone(),
        admin: stub.clone(),
        chat_nav: stub.clone(),
        chat: stub.clone(),
        buddy_list: stub.clone(),
        config_store: stub,
        cookie_baker: Arc::new(HmacCookieBaker::new(*b"gateway-test-cookie-key")),
    }
}

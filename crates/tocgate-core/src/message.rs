//! Typed messages flowing from the backend to a session.

use tocgate_proto::{
    SnacError, SnacFrame,
    admin::AdminInfoChangeReply,
    buddy::{BuddyArrived, BuddyDeparted},
    chat::{ChatChannelMsgToClient, ChatRoom, ChatUsersJoined, ChatUsersLeft},
    chatnav::ChatNavNavInfo,
    icbm::{IcbmChannelMsgToClient, IcbmEvilReply},
    locate::LocateUserInfoReply,
    oservice::{OServiceEvilNotification, OServiceServiceResponse},
};

/// A SNAC frame paired with its decoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnacMessage {
    /// Frame identifying the (food group, sub group) and request id.
    pub frame: SnacFrame,
    /// Decoded body.
    pub body: SnacBody,
}

impl SnacMessage {
    /// Name of this message for log lines; `"unknown"` off-catalog.
    pub fn name(&self) -> &'static str {
        self.frame.name()
    }
}

/// Bodies of the server-to-client SNACs the gateway subscribes to.
///
/// A closed enum in place of a dynamically-typed payload: the event
/// translator matches on it exhaustively, and anything a backend emits
/// outside the catalog arrives as [`SnacBody::Unknown`] and is logged and
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnacBody {
    /// Error body from any food group.
    Error(SnacError),
    /// OService service-request response.
    ServiceResponse(OServiceServiceResponse),
    /// Warning-level change.
    EvilNotification(OServiceEvilNotification),
    /// Locate user-info reply.
    UserInfoReply(LocateUserInfoReply),
    /// A buddy signed on.
    BuddyArrived(BuddyArrived),
    /// A buddy signed off.
    BuddyDeparted(BuddyDeparted),
    /// Incoming instant message or rendezvous.
    IcbmMessageToClient(IcbmChannelMsgToClient),
    /// Warning request result.
    IcbmEvilReply(IcbmEvilReply),
    /// Admin change result.
    AdminChangeReply(AdminInfoChangeReply),
    /// Chat-navigation reply.
    ChatNavInfo(ChatNavNavInfo),
    /// Chat room metadata update.
    ChatRoomUpdate(ChatRoom),
    /// Users entered a chat room.
    ChatUsersJoined(ChatUsersJoined),
    /// Users left a chat room.
    ChatUsersLeft(ChatUsersLeft),
    /// Chat room message.
    ChatMessageToClient(ChatChannelMsgToClient),
    /// Anything off-catalog, kept raw.
    Unknown(Vec<u8>),
}

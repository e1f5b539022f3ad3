//! SNAC frame, food-group identifiers, and the logging name table.

use crate::{
    codec::{self, ByteOrder, Reader, Wire},
    error::WireError,
    tlv::TlvRestBlock,
    admin, buddy, chat, chatnav, icbm, locate, odir, oservice, permit_deny,
};

/// OService food group.
pub const FOOD_GROUP_OSERVICE: u16 = 0x0001;
/// Locate food group.
pub const FOOD_GROUP_LOCATE: u16 = 0x0002;
/// Buddy food group.
pub const FOOD_GROUP_BUDDY: u16 = 0x0003;
/// ICBM food group.
pub const FOOD_GROUP_ICBM: u16 = 0x0004;
/// Admin food group.
pub const FOOD_GROUP_ADMIN: u16 = 0x0007;
/// Permit/deny food group.
pub const FOOD_GROUP_PERMIT_DENY: u16 = 0x0009;
/// Chat navigation food group.
pub const FOOD_GROUP_CHAT_NAV: u16 = 0x000D;
/// Chat food group.
pub const FOOD_GROUP_CHAT: u16 = 0x000E;
/// Directory search food group.
pub const FOOD_GROUP_ODIR: u16 = 0x000F;

/// Error sub-group, shared by every food group.
pub const SUB_GROUP_ERR: u16 = 0x0001;

/// SNAC error code: the queried user is not signed on.
pub const ERROR_CODE_NOT_LOGGED_ON: u16 = 0x0004;

/// Request-id bit marking a server-originated message.
const SERVER_ORIGINATED: u32 = 0x8000_0000;

/// The 12-octet SNAC frame preceding every typed body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnacFrame {
    /// Service namespace.
    pub food_group: u16,
    /// Operation within the service.
    pub sub_group: u16,
    /// Frame flags.
    pub flags: u16,
    /// Request correlation id; high bit set on server-originated frames.
    pub request_id: u32,
}

impl SnacFrame {
    /// Frame for a client-originated request.
    pub const fn new(food_group: u16, sub_group: u16) -> Self {
        Self { food_group, sub_group, flags: 0, request_id: 0 }
    }

    /// Mark this frame as server-originated.
    #[must_use]
    pub const fn server_originated(mut self) -> Self {
        self.request_id |= SERVER_ORIGINATED;
        self
    }

    /// True when the server originated the message.
    pub const fn is_server_originated(&self) -> bool {
        self.request_id & SERVER_ORIGINATED != 0
    }

    /// Human-readable name for logging; unknown pairs render `"unknown"`.
    pub fn name(&self) -> &'static str {
        snac_name(self.food_group, self.sub_group)
    }
}

impl Wire for SnacFrame {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        O::put_u16(dst, self.food_group);
        O::put_u16(dst, self.sub_group);
        O::put_u16(dst, self.flags);
        O::put_u32(dst, self.request_id);
        Ok(())
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            food_group: O::read_u16(src)?,
            sub_group: O::read_u16(src)?,
            flags: O::read_u16(src)?,
            request_id: O::read_u32(src)?,
        })
    }
}

/// SNAC error body: a code followed by optional detail TLVs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnacError {
    /// Error code; see the `ERROR_CODE_*` constants.
    pub code: u16,
    /// Optional detail TLVs.
    pub tlvs: TlvRestBlock,
}

impl Wire for SnacError {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        O::put_u16(dst, self.code);
        codec::put_record::<O, _>(dst, None, &self.tlvs)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self { code: O::read_u16(src)?, tlvs: codec::read_record::<O, _>(src, None)? })
    }
}

/// Name for a (food-group, sub-group) pair, for log lines.
pub fn snac_name(food_group: u16, sub_group: u16) -> &'static str {
    match (food_group, sub_group) {
        (FOOD_GROUP_OSERVICE, SUB_GROUP_ERR) => "OServiceErr",
        (FOOD_GROUP_OSERVICE, oservice::OSERVICE_CLIENT_ONLINE) => "OServiceClientOnline",
        (FOOD_GROUP_OSERVICE, oservice::OSERVICE_SERVICE_REQUEST) => "OServiceServiceRequest",
        (FOOD_GROUP_OSERVICE, oservice::OSERVICE_SERVICE_RESPONSE) => "OServiceServiceResponse",
        (FOOD_GROUP_OSERVICE, oservice::OSERVICE_EVIL_NOTIFICATION) => "OServiceEvilNotification",
        (FOOD_GROUP_OSERVICE, oservice::OSERVICE_IDLE_NOTIFICATION) => "OServiceIdleNotification",
        (FOOD_GROUP_LOCATE, SUB_GROUP_ERR) => "LocateErr",
        (FOOD_GROUP_LOCATE, locate::LOCATE_SET_INFO) => "LocateSetInfo",
        (FOOD_GROUP_LOCATE, locate::LOCATE_USER_INFO_QUERY) => "LocateUserInfoQuery",
        (FOOD_GROUP_LOCATE, locate::LOCATE_USER_INFO_REPLY) => "LocateUserInfoReply",
        (FOOD_GROUP_LOCATE, locate::LOCATE_SET_DIR_INFO) => "LocateSetDirInfo",
        (FOOD_GROUP_BUDDY, SUB_GROUP_ERR) => "BuddyErr",
        (FOOD_GROUP_BUDDY, buddy::BUDDY_ADD_BUDDIES) => "BuddyAddBuddies",
        (FOOD_GROUP_BUDDY, buddy::BUDDY_DEL_BUDDIES) => "BuddyDelBuddies",
        (FOOD_GROUP_BUDDY, buddy::BUDDY_ARRIVED) => "BuddyArrived",
        (FOOD_GROUP_BUDDY, buddy::BUDDY_DEPARTED) => "BuddyDeparted",
        (FOOD_GROUP_ICBM, SUB_GROUP_ERR) => "ICBMErr",
        (FOOD_GROUP_ICBM, icbm::ICBM_CHANNEL_MSG_TO_HOST) => "ICBMChannelMsgToHost",
        (FOOD_GROUP_ICBM, icbm::ICBM_CHANNEL_MSG_TO_CLIENT) => "ICBMChannelMsgToClient",
        (FOOD_GROUP_ICBM, icbm::ICBM_EVIL_REQUEST) => "ICBMEvilRequest",
        (FOOD_GROUP_ICBM, icbm::ICBM_EVIL_REPLY) => "ICBMEvilReply",
        (FOOD_GROUP_ADMIN, SUB_GROUP_ERR) => "AdminErr",
        (FOOD_GROUP_ADMIN, admin::ADMIN_INFO_CHANGE_REQUEST) => "AdminInfoChangeRequest",
        (FOOD_GROUP_ADMIN, admin::ADMIN_INFO_CHANGE_REPLY) => "AdminInfoChangeReply",
        (FOOD_GROUP_PERMIT_DENY, SUB_GROUP_ERR) => "PermitDenyErr",
        (FOOD_GROUP_PERMIT_DENY, permit_deny::PD_ADD_PERM_LIST_ENTRIES) => {
            "PermitDenyAddPermListEntries"
        },
        (FOOD_GROUP_PERMIT_DENY, permit_deny::PD_ADD_DENY_LIST_ENTRIES) => {
            "PermitDenyAddDenyListEntries"
        },
        (FOOD_GROUP_CHAT_NAV, SUB_GROUP_ERR) => "ChatNavErr",
        (FOOD_GROUP_CHAT_NAV, chatnav::CHAT_NAV_REQUEST_ROOM_INFO) => "ChatNavRequestRoomInfo",
        (FOOD_GROUP_CHAT_NAV, chatnav::CHAT_NAV_CREATE_ROOM) => "ChatNavCreateRoom",
        (FOOD_GROUP_CHAT_NAV, chatnav::CHAT_NAV_NAV_INFO) => "ChatNavNavInfo",
        (FOOD_GROUP_CHAT, SUB_GROUP_ERR) => "ChatErr",
        (FOOD_GROUP_CHAT, chat::CHAT_ROOM_INFO_UPDATE) => "ChatRoomInfoUpdate",
        (FOOD_GROUP_CHAT, chat::CHAT_USERS_JOINED) => "ChatUsersJoined",
        (FOOD_GROUP_CHAT, chat::CHAT_USERS_LEFT) => "ChatUsersLeft",
        (FOOD_GROUP_CHAT, chat::CHAT_CHANNEL_MSG_TO_HOST) => "ChatChannelMsgToHost",
        (FOOD_GROUP_CHAT, chat::CHAT_CHANNEL_MSG_TO_CLIENT) => "ChatChannelMsgToClient",
        (FOOD_GROUP_ODIR, SUB_GROUP_ERR) => "ODirErr",
        (FOOD_GROUP_ODIR, odir::ODIR_INFO_QUERY) => "ODirInfoQuery",
        (FOOD_GROUP_ODIR, odir::ODIR_INFO_REPLY) => "ODirInfoReply",
        _ => "unknown",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::codec::{decode_be, encode_be};

    #[test]
    fn frame_round_trips() {
        let frame = SnacFrame {
            food_group: FOOD_GROUP_ICBM,
            sub_group: icbm::ICBM_CHANNEL_MSG_TO_CLIENT,
            flags: 0,
            request_id: 42,
        };
        let wire = encode_be(&frame).unwrap();
        assert_eq!(wire.len(), 10);
        assert_eq!(decode_be::<SnacFrame>(&wire).unwrap(), frame);
    }

    #[test]
    fn server_originated_sets_high_bit() {
        let frame = SnacFrame::new(FOOD_GROUP_BUDDY, buddy::BUDDY_ARRIVED).server_originated();
        assert!(frame.is_server_originated());
        assert_eq!(frame.request_id, 0x8000_0000);

        let client = SnacFrame::new(FOOD_GROUP_ICBM, icbm::ICBM_CHANNEL_MSG_TO_HOST);
        assert!(!client.is_server_originated());
    }

    #[test]
    fn name_table_knows_the_catalog() {
        assert_eq!(snac_name(FOOD_GROUP_BUDDY, buddy::BUDDY_ARRIVED), "BuddyArrived");
        assert_eq!(snac_name(FOOD_GROUP_CHAT, chat::CHAT_USERS_LEFT), "ChatUsersLeft");
        assert_eq!(snac_name(0x7777, 0x01), "unknown");
        assert_eq!(snac_name(FOOD_GROUP_BUDDY, 0xFF), "unknown");
    }
}

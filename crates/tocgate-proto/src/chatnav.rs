//! Chat-navigation food group (0x000D): room creation and lookup.

use crate::{
    codec::{self, ByteOrder, Prefix, Reader, Wire},
    error::WireError,
    tlv::TlvRestBlock,
};

/// Sub-group: look up an existing room.
pub const CHAT_NAV_REQUEST_ROOM_INFO: u16 = 0x0004;
/// Sub-group: create (or find) a room.
pub const CHAT_NAV_CREATE_ROOM: u16 = 0x0008;
/// Sub-group: navigation info reply.
pub const CHAT_NAV_NAV_INFO: u16 = 0x0009;

/// Nav-info TLV: maximum concurrent rooms.
pub const CHAT_NAV_TLV_MAX_ROOMS: u16 = 0x0002;
/// Nav-info TLV: an encoded [`crate::chat::ChatRoom`].
pub const CHAT_NAV_TLV_ROOM_INFO: u16 = 0x0004;

/// 0x000D/0x0004: look up a room by its identifying triple.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatNavRequestRoomInfo {
    /// Exchange the room lives on.
    pub exchange: u16,
    /// Server-assigned room cookie.
    pub cookie: String,
    /// Room instance number.
    pub instance: u16,
    /// Requested detail level.
    pub detail_level: u8,
}

impl Wire for ChatNavRequestRoomInfo {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        O::put_u16(dst, self.exchange);
        codec::put_string::<O>(dst, Some(Prefix::U8), false, &self.cookie)?;
        O::put_u16(dst, self.instance);
        dst.push(self.detail_level);
        Ok(())
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            exchange: O::read_u16(src)?,
            cookie: codec::read_string::<O>(src, Some(Prefix::U8), false)?,
            instance: O::read_u16(src)?,
            detail_level: src.read_u8()?,
        })
    }
}

/// 0x000D/0x0009: navigation reply; room details ride in
/// [`CHAT_NAV_TLV_ROOM_INFO`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatNavNavInfo {
    /// Reply TLVs.
    pub tlvs: TlvRestBlock,
}

impl ChatNavNavInfo {
    /// Decode the room description TLV, if present.
    pub fn room(&self) -> Option<crate::chat::ChatRoom> {
        let raw = self.tlvs.bytes(CHAT_NAV_TLV_ROOM_INFO)?;
        codec::decode_be(raw).ok()
    }
}

impl Wire for ChatNavNavInfo {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        codec::put_record::<O, _>(dst, None, &self.tlvs)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self { tlvs: codec::read_record::<O, _>(src, None)? })
    }
}

//! Chat food group (0x000E): room messages and occupancy events.
//!
//! Also home to [`ChatRoomKey`], the (exchange, cookie, instance) triple
//! that names a room everywhere: in service requests, rendezvous service
//! data, and the gateway's chat registry.

use crate::{
    codec::{self, ByteOrder, Prefix, Reader, SeqPrefix, Wire},
    error::WireError,
    oservice::TlvUserInfo,
    tlv::{Tlv, TlvBlock, TlvRestBlock, new_tlv_be},
};

/// Sub-group: room metadata update.
pub const CHAT_ROOM_INFO_UPDATE: u16 = 0x0002;
/// Sub-group: users entered the room.
pub const CHAT_USERS_JOINED: u16 = 0x0003;
/// Sub-group: users left the room.
pub const CHAT_USERS_LEFT: u16 = 0x0004;
/// Sub-group: send a room message.
pub const CHAT_CHANNEL_MSG_TO_HOST: u16 = 0x0005;
/// Sub-group: a room message delivered to this client.
pub const CHAT_CHANNEL_MSG_TO_CLIENT: u16 = 0x0006;

/// Chat message TLV: message is public (vs whisper).
pub const CHAT_TLV_PUBLIC_WHISPER_FLAG: u16 = 0x0001;
/// Chat message TLV: whisper target screen name.
pub const CHAT_TLV_WHISPER_TO_USER: u16 = 0x0002;
/// Chat message TLV: sender's user info.
pub const CHAT_TLV_SENDER_INFORMATION: u16 = 0x0003;
/// Chat message TLV: nested message-info TLVs.
pub const CHAT_TLV_MESSAGE_INFO: u16 = 0x0005;
/// Chat message TLV: sender wants the message reflected back.
pub const CHAT_TLV_ENABLE_REFLECTION_FLAG: u16 = 0x0006;

/// Message-info TLV: message text.
pub const CHAT_TLV_MESSAGE_INFO_TEXT: u16 = 0x0001;
/// Message-info TLV: text encoding.
pub const CHAT_TLV_MESSAGE_INFO_ENCODING: u16 = 0x0002;
/// Message-info TLV: text language.
pub const CHAT_TLV_MESSAGE_INFO_LANG: u16 = 0x0003;

/// Room-detail TLV: human-readable room name.
pub const CHAT_TLV_ROOM_NAME: u16 = 0x00D3;

/// The identifying triple of a chat room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ChatRoomKey {
    /// Exchange the room lives on.
    pub exchange: u16,
    /// Server-assigned room cookie.
    pub cookie: String,
    /// Room instance number.
    pub instance: u16,
}

impl Wire for ChatRoomKey {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        O::put_u16(dst, self.exchange);
        codec::put_string::<O>(dst, Some(Prefix::U8), false, &self.cookie)?;
        O::put_u16(dst, self.instance);
        Ok(())
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            exchange: O::read_u16(src)?,
            cookie: codec::read_string::<O>(src, Some(Prefix::U8), false)?,
            instance: O::read_u16(src)?,
        })
    }
}

/// Human room name hidden in a room cookie: its third dash-delimited
/// segment (`"<exchange>-<instance>-<name>"`). Falls back to the whole
/// cookie for non-conforming values.
pub fn room_name_from_cookie(cookie: &str) -> &str {
    cookie.splitn(3, '-').nth(2).unwrap_or(cookie)
}

/// Full room description: the key plus detail level and metadata TLVs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatRoom {
    /// Exchange the room lives on.
    pub exchange: u16,
    /// Server-assigned room cookie.
    pub cookie: String,
    /// Room instance number.
    pub instance: u16,
    /// Requested detail level.
    pub detail_level: u8,
    /// Metadata TLVs (room name, limits).
    pub tlvs: TlvBlock,
}

impl ChatRoom {
    /// The identifying triple of this room.
    pub fn key(&self) -> ChatRoomKey {
        ChatRoomKey {
            exchange: self.exchange,
            cookie: self.cookie.clone(),
            instance: self.instance,
        }
    }

    /// Human-readable room name, from TLVs or the cookie.
    pub fn name(&self) -> String {
        self.tlvs
            .string(CHAT_TLV_ROOM_NAME)
            .unwrap_or_else(|| room_name_from_cookie(&self.cookie).to_owned())
    }
}

impl Wire for ChatRoom {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        O::put_u16(dst, self.exchange);
        codec::put_string::<O>(dst, Some(Prefix::U8), false, &self.cookie)?;
        O::put_u16(dst, self.instance);
        dst.push(self.detail_level);
        codec::put_record::<O, _>(dst, None, &self.tlvs)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            exchange: O::read_u16(src)?,
            cookie: codec::read_string::<O>(src, Some(Prefix::U8), false)?,
            instance: O::read_u16(src)?,
            detail_level: src.read_u8()?,
            tlvs: codec::read_record::<O, _>(src, None)?,
        })
    }
}

macro_rules! chat_msg_body {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            /// Message cookie.
            pub cookie: [u8; 8],
            /// Chat channel (always 3 for room text).
            pub channel: u16,
            /// Message TLVs (`CHAT_TLV_*`).
            pub tlvs: TlvRestBlock,
        }

        impl Wire for $name {
            fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
                codec::put_record::<O, _>(dst, None, &self.cookie)?;
                O::put_u16(dst, self.channel);
                codec::put_record::<O, _>(dst, None, &self.tlvs)
            }

            fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
                Ok(Self {
                    cookie: codec::read_record::<O, _>(src, None)?,
                    channel: O::read_u16(src)?,
                    tlvs: codec::read_record::<O, _>(src, None)?,
                })
            }
        }
    };
}

chat_msg_body!(
    /// 0x000E/0x0005: client sends a room message.
    ChatChannelMsgToHost
);

chat_msg_body!(
    /// 0x000E/0x0006: server delivers a room message.
    ChatChannelMsgToClient
);

macro_rules! chat_roster_body {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            /// Affected occupants.
            pub users: Vec<TlvUserInfo>,
        }

        impl Wire for $name {
            fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
                codec::put_seq::<O, _>(dst, SeqPrefix::rest(), &self.users)
            }

            fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
                Ok(Self { users: codec::read_seq::<O, _>(src, SeqPrefix::rest())? })
            }
        }
    };
}

chat_roster_body!(
    /// 0x000E/0x0003: these users entered the room.
    ChatUsersJoined
);

chat_roster_body!(
    /// 0x000E/0x0004: these users left the room.
    ChatUsersLeft
);

/// Build the message-info TLV wrapping `text`.
pub fn chat_message_info(text: &str) -> Result<Tlv, WireError> {
    let inner: TlvRestBlock = vec![
        new_tlv_be(CHAT_TLV_MESSAGE_INFO_TEXT, text)?,
        new_tlv_be(CHAT_TLV_MESSAGE_INFO_ENCODING, "us-ascii")?,
    ]
    .into();
    crate::tlv::new_record_tlv_be(CHAT_TLV_MESSAGE_INFO, &inner)
}

/// Extract the message text from a chat message's TLVs.
pub fn chat_message_text(tlvs: &crate::tlv::TlvList) -> Option<String> {
    let info = tlvs.bytes(CHAT_TLV_MESSAGE_INFO)?;
    let inner: TlvRestBlock = codec::decode_be(info).ok()?;
    inner.string(CHAT_TLV_MESSAGE_INFO_TEXT)
}

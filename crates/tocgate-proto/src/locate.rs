//! Locate food group (0x0002): profiles, away state, directory entries.

use crate::{
    codec::{self, ByteOrder, Prefix, Reader, Wire},
    error::WireError,
    oservice::TlvUserInfo,
    tlv::TlvRestBlock,
};

/// Sub-group: set profile / away / capability info.
pub const LOCATE_SET_INFO: u16 = 0x0004;
/// Sub-group: query another user's info.
pub const LOCATE_USER_INFO_QUERY: u16 = 0x0005;
/// Sub-group: user info query reply.
pub const LOCATE_USER_INFO_REPLY: u16 = 0x0006;
/// Sub-group: set directory info.
pub const LOCATE_SET_DIR_INFO: u16 = 0x0009;

/// Set-info TLV: profile body.
pub const LOCATE_TLV_SIG_DATA: u16 = 0x0002;
/// Set-info TLV: away message body; empty clears.
pub const LOCATE_TLV_UNAVAILABLE_DATA: u16 = 0x0004;
/// Set-info TLV: concatenated 16-octet capabilities.
pub const LOCATE_TLV_CAPABILITIES: u16 = 0x0005;

/// Directory TLV: first name.
pub const DIR_TLV_FIRST_NAME: u16 = 0x0001;
/// Directory TLV: last name.
pub const DIR_TLV_LAST_NAME: u16 = 0x0002;
/// Directory TLV: middle name.
pub const DIR_TLV_MIDDLE_NAME: u16 = 0x0003;
/// Directory TLV: maiden name.
pub const DIR_TLV_MAIDEN_NAME: u16 = 0x0004;
/// Directory TLV: country.
pub const DIR_TLV_COUNTRY: u16 = 0x0006;
/// Directory TLV: state.
pub const DIR_TLV_STATE: u16 = 0x0007;
/// Directory TLV: city.
pub const DIR_TLV_CITY: u16 = 0x0008;

/// User-info query bit: signature (profile).
pub const USER_INFO_QUERY_SIG: u16 = 0x0001;
/// User-info query bit: away message.
pub const USER_INFO_QUERY_AWAY: u16 = 0x0002;
/// User-info query bit: capabilities.
pub const USER_INFO_QUERY_CAPS: u16 = 0x0004;

/// 0x0002/0x0004: replace parts of the caller's locate info.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocateSetInfo {
    /// Info TLVs; only the supplied tags change.
    pub tlvs: TlvRestBlock,
}

impl Wire for LocateSetInfo {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        codec::put_record::<O, _>(dst, None, &self.tlvs)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self { tlvs: codec::read_record::<O, _>(src, None)? })
    }
}

/// 0x0002/0x0009: replace the caller's directory listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocateSetDirInfo {
    /// Directory TLVs.
    pub tlvs: TlvRestBlock,
}

impl Wire for LocateSetDirInfo {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        codec::put_record::<O, _>(dst, None, &self.tlvs)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self { tlvs: codec::read_record::<O, _>(src, None)? })
    }
}

/// 0x0002/0x0005: ask for another user's info.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocateUserInfoQuery {
    /// Bitmask of `USER_INFO_QUERY_*` requests.
    pub query_type: u16,
    /// Target screen name.
    pub screen_name: String,
}

impl Wire for LocateUserInfoQuery {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        O::put_u16(dst, self.query_type);
        codec::put_string::<O>(dst, Some(Prefix::U8), false, &self.screen_name)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            query_type: O::read_u16(src)?,
            screen_name: codec::read_string::<O>(src, Some(Prefix::U8), false)?,
        })
    }
}

/// 0x0002/0x0006: user info query reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocateUserInfoReply {
    /// Presence info for the queried user.
    pub user_info: TlvUserInfo,
    /// Requested locate fragments (profile, away, caps).
    pub locate_info: TlvRestBlock,
}

impl Wire for LocateUserInfoReply {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        codec::put_record::<O, _>(dst, None, &self.user_info)?;
        codec::put_record::<O, _>(dst, None, &self.locate_info)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            user_info: codec::read_record::<O, _>(src, None)?,
            locate_info: codec::read_record::<O, _>(src, None)?,
        })
    }
}

//! OService food group (0x0001): generic session operations.

use crate::{
    codec::{self, ByteOrder, Prefix, Reader, SeqPrefix, Wire},
    error::WireError,
    tlv::{TlvBlock, TlvRestBlock},
};

/// Sub-group: client is ready for service.
pub const OSERVICE_CLIENT_ONLINE: u16 = 0x0002;
/// Sub-group: request a service connection (chat rooms).
pub const OSERVICE_SERVICE_REQUEST: u16 = 0x0004;
/// Sub-group: service connection details.
pub const OSERVICE_SERVICE_RESPONSE: u16 = 0x0005;
/// Sub-group: warning level changed.
pub const OSERVICE_EVIL_NOTIFICATION: u16 = 0x0010;
/// Sub-group: idle time report.
pub const OSERVICE_IDLE_NOTIFICATION: u16 = 0x0011;

/// User-info TLV: user flags (u16).
pub const USER_INFO_FLAGS: u16 = 0x0001;
/// User-info TLV: sign-on time as epoch seconds (u32).
pub const USER_INFO_SIGNON_TOD: u16 = 0x0003;
/// User-info TLV: idle time in minutes (u16).
pub const USER_INFO_IDLE_TIME: u16 = 0x0004;
/// User-flags bit: the user is unavailable (away).
pub const USER_FLAG_UNAVAILABLE: u16 = 0x0020;

/// Service-request TLV: the chat room being requested.
pub const SERVICE_REQUEST_ROOM_INFO: u16 = 0x0001;
/// Service-response TLV: host to reconnect to.
pub const SERVICE_RESPONSE_RECONNECT_HOST: u16 = 0x0005;
/// Service-response TLV: login cookie for the requested service.
pub const SERVICE_RESPONSE_LOGIN_COOKIE: u16 = 0x0006;
/// Service-response TLV: food group the cookie is for.
pub const SERVICE_RESPONSE_FOOD_GROUP: u16 = 0x000D;

/// Screen name, warning level, and metadata TLVs describing one user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlvUserInfo {
    /// Display screen name.
    pub screen_name: String,
    /// Warning level in tenths of a percent.
    pub warning_level: u16,
    /// Metadata TLVs (flags, sign-on time, idle minutes).
    pub tlvs: TlvBlock,
}

impl Wire for TlvUserInfo {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        codec::put_string::<O>(dst, Some(Prefix::U8), false, &self.screen_name)?;
        O::put_u16(dst, self.warning_level);
        codec::put_record::<O, _>(dst, None, &self.tlvs)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            screen_name: codec::read_string::<O>(src, Some(Prefix::U8), false)?,
            warning_level: O::read_u16(src)?,
            tlvs: codec::read_record::<O, _>(src, None)?,
        })
    }
}

/// One (food group, version) pair in a client-online report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupVersion {
    /// Food group the client speaks.
    pub food_group: u16,
    /// Highest supported version.
    pub version: u16,
}

impl Wire for GroupVersion {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        O::put_u16(dst, self.food_group);
        O::put_u16(dst, self.version);
        Ok(())
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self { food_group: O::read_u16(src)?, version: O::read_u16(src)? })
    }
}

/// 0x0001/0x0002: the client is done configuring and wants traffic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OServiceClientOnline {
    /// Food groups and versions the client supports.
    pub group_versions: Vec<GroupVersion>,
}

impl Wire for OServiceClientOnline {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        codec::put_seq::<O, _>(dst, SeqPrefix::rest(), &self.group_versions)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self { group_versions: codec::read_seq::<O, _>(src, SeqPrefix::rest())? })
    }
}

/// 0x0001/0x0004: request a connection to another service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OServiceServiceRequest {
    /// Food group being requested.
    pub food_group: u16,
    /// Request TLVs (room info for chat).
    pub tlvs: TlvRestBlock,
}

impl Wire for OServiceServiceRequest {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        O::put_u16(dst, self.food_group);
        codec::put_record::<O, _>(dst, None, &self.tlvs)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            food_group: O::read_u16(src)?,
            tlvs: codec::read_record::<O, _>(src, None)?,
        })
    }
}

/// 0x0001/0x0005: where and how to reach the requested service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OServiceServiceResponse {
    /// Response TLVs (host, login cookie, food group).
    pub tlvs: TlvRestBlock,
}

impl Wire for OServiceServiceResponse {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        codec::put_record::<O, _>(dst, None, &self.tlvs)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self { tlvs: codec::read_record::<O, _>(src, None)? })
    }
}

/// 0x0001/0x0010: this user's warning level changed.
///
/// The snitcher is present only when the warning was not anonymous; it is
/// the catalog's optional-trailing-record case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OServiceEvilNotification {
    /// New warning level in tenths of a percent.
    pub new_evil: u16,
    /// Who warned us, if the warning was attributed.
    pub snitcher: Option<TlvUserInfo>,
}

impl Wire for OServiceEvilNotification {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        O::put_u16(dst, self.new_evil);
        codec::put_optional::<O, _>(dst, self.snitcher.as_ref())
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self { new_evil: O::read_u16(src)?, snitcher: codec::read_optional::<O, _>(src)? })
    }
}

/// 0x0001/0x0011: seconds the user has been idle; zero clears.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OServiceIdleNotification {
    /// Idle time in seconds.
    pub idle_time: u32,
}

impl Wire for OServiceIdleNotification {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        O::put_u32(dst, self.idle_time);
        Ok(())
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self { idle_time: O::read_u32(src)? })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        codec::{decode_be, encode_be},
        tlv::new_tlv_be,
    };

    #[test]
    fn evil_notification_optional_snitcher() {
        let anonymous = OServiceEvilNotification { new_evil: 80, snitcher: None };
        let wire = encode_be(&anonymous).unwrap();
        assert_eq!(wire, vec![0, 80]);
        assert_eq!(decode_be::<OServiceEvilNotification>(&wire).unwrap(), anonymous);

        let attributed = OServiceEvilNotification {
            new_evil: 80,
            snitcher: Some(TlvUserInfo {
                screen_name: "bob".into(),
                warning_level: 10,
                tlvs: TlvBlock::default(),
            }),
        };
        let wire = encode_be(&attributed).unwrap();
        assert_eq!(decode_be::<OServiceEvilNotification>(&wire).unwrap(), attributed);
    }

    #[test]
    fn user_info_round_trips() {
        let info = TlvUserInfo {
            screen_name: "alice".into(),
            warning_level: 30,
            tlvs: vec![
                new_tlv_be(USER_INFO_FLAGS, &USER_FLAG_UNAVAILABLE).unwrap(),
                new_tlv_be(USER_INFO_IDLE_TIME, &5u16).unwrap(),
            ]
            .into(),
        };
        let wire = encode_be(&info).unwrap();
        let parsed = decode_be::<TlvUserInfo>(&wire).unwrap();
        assert_eq!(parsed, info);
        assert_eq!(parsed.tlvs.u16_be(USER_INFO_FLAGS), Some(USER_FLAG_UNAVAILABLE));
    }
}

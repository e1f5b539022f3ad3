//! Admin food group (0x0007): account changes (password, nick formatting).

use crate::{
    codec::{self, ByteOrder, Reader, Wire},
    error::WireError,
    tlv::{TlvBlock, TlvRestBlock},
};

/// Sub-group: request an account info change.
pub const ADMIN_INFO_CHANGE_REQUEST: u16 = 0x0004;
/// Sub-group: account info change result.
pub const ADMIN_INFO_CHANGE_REPLY: u16 = 0x0005;

/// Change TLV: formatted screen name.
pub const ADMIN_TLV_SCREEN_NAME_FORMATTED: u16 = 0x0001;
/// Change TLV: new password.
pub const ADMIN_TLV_NEW_PASSWORD: u16 = 0x0002;
/// Reply TLV: error detail URL.
pub const ADMIN_TLV_ERROR_URL: u16 = 0x0004;
/// Reply TLV: error code (u16).
pub const ADMIN_TLV_ERROR_CODE: u16 = 0x0008;
/// Change TLV: registration email.
pub const ADMIN_TLV_EMAIL: u16 = 0x0011;
/// Change TLV: current password, for verification.
pub const ADMIN_TLV_OLD_PASSWORD: u16 = 0x0012;

/// Admin error code: a supplied field had an invalid length.
pub const ADMIN_ERR_INVALID_FIELD_LENGTH: u16 = 0x0002;
/// Admin error code: the old password failed validation.
pub const ADMIN_ERR_VALIDATE_PASSWORD: u16 = 0x0005;

/// 0x0007/0x0004: change account fields named by the TLVs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminInfoChangeRequest {
    /// Fields to change.
    pub tlvs: TlvRestBlock,
}

impl Wire for AdminInfoChangeRequest {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        codec::put_record::<O, _>(dst, None, &self.tlvs)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self { tlvs: codec::read_record::<O, _>(src, None)? })
    }
}

/// 0x0007/0x0005: change result; an error-code TLV marks failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminInfoChangeReply {
    /// Account permission bits.
    pub permissions: u16,
    /// Result TLVs; `ADMIN_TLV_ERROR_CODE` present on failure.
    pub tlvs: TlvBlock,
}

impl Wire for AdminInfoChangeReply {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        O::put_u16(dst, self.permissions);
        codec::put_record::<O, _>(dst, None, &self.tlvs)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            permissions: O::read_u16(src)?,
            tlvs: codec::read_record::<O, _>(src, None)?,
        })
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
    fn change_reply_round_trips() {
        let reply = AdminInfoChangeReply {
            permissions: 3,
            tlvs: vec![new_tlv_be(ADMIN_TLV_ERROR_CODE, &ADMIN_ERR_VALIDATE_PASSWORD).unwrap()]
                .into(),
        };
        let wire = encode_be(&reply).unwrap();
        let parsed = decode_be::<AdminInfoChangeReply>(&wire).unwrap();
        assert_eq!(parsed, reply);
        assert_eq!(parsed.tlvs.u16_be(ADMIN_TLV_ERROR_CODE), Some(ADMIN_ERR_VALIDATE_PASSWORD));
    }
}

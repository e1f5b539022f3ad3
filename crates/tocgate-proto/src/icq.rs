//! ICQ message reply envelope.
//!
//! ICQ predates OSCAR's big-endian convention; its reply envelope and
//! everything nested under it are little-endian on the wire no matter what
//! order the enclosing message uses. The quirk is carried as a codec flag on
//! the envelope type, not as a global mode.

use crate::{
    codec::{self, ByteOrder, Prefix, Reader, Wire},
    error::WireError,
};

/// Inner ICQ reply payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IcqMessageReply {
    /// Target ICQ number.
    pub uin: u32,
    /// ICQ message type.
    pub message_type: u16,
    /// Request sequence number.
    pub sequence: u16,
    /// Type-specific payload, to the end of the envelope.
    pub payload: Vec<u8>,
}

impl Wire for IcqMessageReply {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        O::put_u32(dst, self.uin);
        O::put_u16(dst, self.message_type);
        O::put_u16(dst, self.sequence);
        codec::put_bytes::<O>(dst, None, &self.payload)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            uin: O::read_u32(src)?,
            message_type: O::read_u16(src)?,
            sequence: O::read_u16(src)?,
            payload: codec::read_bytes::<O>(src, None)?,
        })
    }
}

/// Length-prefixed ICQ reply envelope; forces little-endian for its whole
/// subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IcqMessageReplyEnvelope {
    /// The enclosed reply.
    pub message: IcqMessageReply,
}

impl Wire for IcqMessageReplyEnvelope {
    const FORCE_LITTLE_ENDIAN: bool = true;

    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        codec::put_record::<O, _>(dst, Some(Prefix::U16), &self.message)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self { message: codec::read_record::<O, _>(src, Some(Prefix::U16))? })
    }
}

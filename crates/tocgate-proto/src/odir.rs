//! Directory-search food group (0x000F).
//!
//! The gateway itself only names these operations (the HTML views live in
//! the external HTTP helper), but the catalog carries the shapes so the
//! backend contract can speak them.

use crate::{
    codec::{self, ByteOrder, Prefix, Reader, SeqPrefix, Wire},
    error::WireError,
    tlv::{TlvBlock, TlvRestBlock},
};

/// Sub-group: directory query.
pub const ODIR_INFO_QUERY: u16 = 0x0002;
/// Sub-group: directory query reply.
pub const ODIR_INFO_REPLY: u16 = 0x0003;

/// 0x000F/0x0002: search the directory by the supplied TLVs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ODirInfoQuery {
    /// Search fields.
    pub tlvs: TlvRestBlock,
}

impl Wire for ODirInfoQuery {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        codec::put_record::<O, _>(dst, None, &self.tlvs)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self { tlvs: codec::read_record::<O, _>(src, None)? })
    }
}

/// 0x000F/0x0003: search results as counted TLV blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ODirInfoReply {
    /// Query status code.
    pub status: u16,
    /// One TLV block per matching directory entry.
    pub results: Vec<TlvBlock>,
}

impl Wire for ODirInfoReply {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        O::put_u16(dst, self.status);
        codec::put_seq::<O, _>(dst, SeqPrefix::count_prefixed(Prefix::U16), &self.results)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            status: O::read_u16(src)?,
            results: codec::read_seq::<O, _>(src, SeqPrefix::count_prefixed(Prefix::U16))?,
        })
    }
}

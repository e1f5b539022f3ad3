//! Rendezvous capability UUIDs.
//!
//! Capabilities are 16-octet identifiers advertised in locate info and
//! rendezvous proposals. The text form is the uppercase dashed UUID layout
//! (8-4-4-4-12).

use std::fmt;

use crate::{
    codec::{ByteOrder, Reader, Wire},
    error::WireError,
};

/// A 16-octet capability identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capability(pub [u8; 16]);

impl Capability {
    /// Chat rendezvous capability.
    pub const CHAT: Self = Self([
        0x74, 0x8F, 0x24, 0x20, 0x62, 0x87, 0x11, 0xD1, 0x82, 0x22, 0x44, 0x45, 0x53, 0x54,
        0x00, 0x00,
    ]);

    /// File-transfer rendezvous capability.
    pub const FILE_TRANSFER: Self = Self([
        0x09, 0x46, 0x13, 0x43, 0x4C, 0x7F, 0x11, 0xD1, 0x82, 0x22, 0x44, 0x45, 0x53, 0x54,
        0x00, 0x00,
    ]);

    /// Parse the dashed UUID text form; case-insensitive.
    pub fn parse(text: &str) -> Option<Self> {
        let hex: String = text.chars().filter(|c| *c != '-').collect();
        if hex.len() != 32 || !hex.is_ascii() {
            return None;
        }
        let mut out = [0u8; 16];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(out))
    }

    /// Raw octets.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl Wire for Capability {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        dst.extend_from_slice(&self.0);
        Ok(())
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        <[u8; 16]>::decode::<O>(src).map(Self)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}{:02X}{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7], b[8], b[9], b[10], b[11], b[12],
            b[13], b[14], b[15]
        )
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capability({self})")
    }
}

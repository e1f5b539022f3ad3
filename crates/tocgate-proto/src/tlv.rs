//! Tag-length-value containers and typed accessors.
//!
//! A [`Tlv`] is `(tag:u16, length:u16, value:bytes)`. Lists come in three
//! framings: [`TlvRestBlock`] (TLVs until the container ends), [`TlvBlock`]
//! (16-bit element count first), and [`TlvLBlock`] (16-bit total byte length
//! first). All three dereference to [`TlvList`], which carries the typed
//! getters.
//!
//! Width-checked getters assert on mismatched value sizes: reading a `u32`
//! out of a two-byte value is a contract bug in the caller, not data
//! corruption, and must fail loudly.

use std::ops::{Deref, DerefMut};

use crate::{
    codec::{self, BigEndian, ByteOrder, LittleEndian, Prefix, Reader, SeqPrefix, Wire},
    error::WireError,
};

/// One tagged value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    /// 16-bit tag.
    pub tag: u16,
    /// Opaque value octets.
    pub value: Vec<u8>,
}

impl Wire for Tlv {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        O::put_u16(dst, self.tag);
        codec::put_bytes::<O>(dst, Some(Prefix::U16), &self.value)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            tag: O::read_u16(src)?,
            value: codec::read_bytes::<O>(src, Some(Prefix::U16))?,
        })
    }
}

/// A value that can be marshalled into TLV value bytes.
pub trait TlvValue {
    /// Marshal into value octets in the given order.
    fn to_wire<O: ByteOrder>(&self) -> Result<Vec<u8>, WireError>;
}

impl TlvValue for u8 {
    fn to_wire<O: ByteOrder>(&self) -> Result<Vec<u8>, WireError> {
        Ok(vec![*self])
    }
}

impl TlvValue for u16 {
    fn to_wire<O: ByteOrder>(&self) -> Result<Vec<u8>, WireError> {
        let mut out = Vec::with_capacity(2);
        O::put_u16(&mut out, *self);
        Ok(out)
    }
}

impl TlvValue for u32 {
    fn to_wire<O: ByteOrder>(&self) -> Result<Vec<u8>, WireError> {
        let mut out = Vec::with_capacity(4);
        O::put_u32(&mut out, *self);
        Ok(out)
    }
}

impl TlvValue for [u8] {
    fn to_wire<O: ByteOrder>(&self) -> Result<Vec<u8>, WireError> {
        Ok(self.to_vec())
    }
}

impl TlvValue for str {
    fn to_wire<O: ByteOrder>(&self) -> Result<Vec<u8>, WireError> {
        Ok(self.as_bytes().to_vec())
    }
}

/// Build a TLV whose value is marshalled big-endian.
pub fn new_tlv_be<V: TlvValue + ?Sized>(tag: u16, value: &V) -> Result<Tlv, WireError> {
    Ok(Tlv { tag, value: value.to_wire::<BigEndian>()? })
}

/// Build a TLV whose value is marshalled little-endian.
pub fn new_tlv_le<V: TlvValue + ?Sized>(tag: u16, value: &V) -> Result<Tlv, WireError> {
    Ok(Tlv { tag, value: value.to_wire::<LittleEndian>()? })
}

/// Build a TLV whose value is a nested record, marshalled big-endian.
pub fn new_record_tlv_be<T: Wire>(tag: u16, value: &T) -> Result<Tlv, WireError> {
    Ok(Tlv { tag, value: codec::encode_be(value)? })
}

/// Build a TLV whose value is a nested record, marshalled little-endian.
pub fn new_record_tlv_le<T: Wire>(tag: u16, value: &T) -> Result<Tlv, WireError> {
    Ok(Tlv { tag, value: codec::encode_le(value)? })
}

/// Ordered TLV collection with typed getters.
///
/// Lookups scan in order and return the first match; unknown tags return
/// `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlvList {
    /// The TLVs, in wire order.
    pub tlvs: Vec<Tlv>,
}

impl TlvList {
    /// Empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one TLV.
    pub fn append(&mut self, tlv: Tlv) {
        self.tlvs.push(tlv);
    }

    /// Append every TLV from `tlvs`, preserving order.
    pub fn append_list(&mut self, tlvs: impl IntoIterator<Item = Tlv>) {
        self.tlvs.extend(tlvs);
    }

    /// True when any TLV carries `tag`.
    pub fn has_tag(&self, tag: u16) -> bool {
        self.tlvs.iter().any(|tlv| tlv.tag == tag)
    }

    fn value(&self, tag: u16) -> Option<&[u8]> {
        self.tlvs.iter().find(|tlv| tlv.tag == tag).map(|tlv| tlv.value.as_slice())
    }

    /// Raw value octets for `tag`.
    pub fn bytes(&self, tag: u16) -> Option<&[u8]> {
        self.value(tag)
    }

    /// Value for `tag` as text.
    pub fn string(&self, tag: u16) -> Option<String> {
        self.value(tag).map(|v| String::from_utf8_lossy(v).into_owned())
    }

    /// One-octet value for `tag`.
    pub fn u8(&self, tag: u16) -> Option<u8> {
        self.value(tag).map(|v| {
            assert_eq!(v.len(), 1, "TLV {tag:#06x}: expected 1-byte value, got {}", v.len());
            v[0]
        })
    }

    /// Big-endian `u16` value for `tag`.
    pub fn u16_be(&self, tag: u16) -> Option<u16> {
        self.fixed::<2>(tag).map(u16::from_be_bytes)
    }

    /// Little-endian `u16` value for `tag`.
    pub fn u16_le(&self, tag: u16) -> Option<u16> {
        self.fixed::<2>(tag).map(u16::from_le_bytes)
    }

    /// Big-endian `u32` value for `tag`.
    pub fn u32_be(&self, tag: u16) -> Option<u32> {
        self.fixed::<4>(tag).map(u32::from_be_bytes)
    }

    /// Little-endian `u32` value for `tag`.
    pub fn u32_le(&self, tag: u16) -> Option<u32> {
        self.fixed::<4>(tag).map(u32::from_le_bytes)
    }

    /// Value for `tag` parsed as an ICQ string:
    /// `[u16 LE length][bytes][0x00]`, where the length counts the
    /// terminator. Returns `None` when the layout does not hold.
    pub fn icq_string(&self, tag: u16) -> Option<String> {
        let value = self.value(tag)?;
        if value.len() < 2 {
            return None;
        }
        let (len_bytes, rest) = value.split_at(2);
        let len = usize::from(u16::from_le_bytes([len_bytes[0], len_bytes[1]]));
        if len == 0 || rest.len() != len || rest[len - 1] != 0 {
            return None;
        }
        Some(String::from_utf8_lossy(&rest[..len - 1]).into_owned())
    }

    fn fixed<const N: usize>(&self, tag: u16) -> Option<[u8; N]> {
        self.value(tag).map(|v| {
            assert_eq!(v.len(), N, "TLV {tag:#06x}: expected {N}-byte value, got {}", v.len());
            let mut out = [0u8; N];
            out.copy_from_slice(v);
            out
        })
    }
}

impl From<Vec<Tlv>> for TlvList {
    fn from(tlvs: Vec<Tlv>) -> Self {
        Self { tlvs }
    }
}

impl FromIterator<Tlv> for TlvList {
    fn from_iter<I: IntoIterator<Item = Tlv>>(iter: I) -> Self {
        Self { tlvs: iter.into_iter().collect() }
    }
}

macro_rules! tlv_framing {
    ($(#[$doc:meta])* $name:ident, $prefix:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name(pub TlvList);

        impl Wire for $name {
            fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
                codec::put_seq::<O, _>(dst, $prefix, &self.0.tlvs)
            }

            fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
                Ok(Self(TlvList { tlvs: codec::read_seq::<O, _>(src, $prefix)? }))
            }
        }

        impl Deref for $name {
            type Target = TlvList;

            fn deref(&self) -> &TlvList {
                &self.0
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut TlvList {
                &mut self.0
            }
        }

        impl From<Vec<Tlv>> for $name {
            fn from(tlvs: Vec<Tlv>) -> Self {
                Self(TlvList { tlvs })
            }
        }
    };
}

tlv_framing!(
    /// TLVs until the end of the enclosing container.
    TlvRestBlock,
    SeqPrefix::rest()
);

tlv_framing!(
    /// 16-bit element count, then TLVs.
    TlvBlock,
    SeqPrefix::count_prefixed(Prefix::U16)
);

tlv_framing!(
    /// 16-bit total byte length, then TLVs.
    TlvLBlock,
    SeqPrefix::length_prefixed(Prefix::U16)
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::codec::{decode_be, encode_be};

    fn sample_list() -> TlvList {
        let mut list = TlvList::new();
        list.append(new_tlv_be(0x01, "alice").unwrap());
        list.append(new_tlv_be(0x02, &0x1234u16).unwrap());
        list.append(new_tlv_le(0x03, &0x5678_9ABCu32).unwrap());
        list.append(new_tlv_be(0x04, &[0xDE, 0xAD][..]).unwrap());
        list
    }

    #[test]
    fn typed_getters_agree_with_has_tag() {
        let list = sample_list();

        assert!(list.has_tag(0x01));
        assert_eq!(list.string(0x01), Some("alice".to_owned()));
        assert_eq!(list.u16_be(0x02), Some(0x1234));
        assert_eq!(list.u32_le(0x03), Some(0x5678_9ABC));
        assert_eq!(list.bytes(0x04), Some(&[0xDE, 0xAD][..]));

        assert!(!list.has_tag(0x99));
        assert_eq!(list.string(0x99), None);
        assert_eq!(list.u16_be(0x99), None);
    }

    #[test]
    #[should_panic(expected = "expected 4-byte value")]
    fn mismatched_width_is_a_programming_error() {
        let list = sample_list();
        // Tag 0x02 holds two bytes; asking for u32 is a caller bug.
        let _ = list.u32_be(0x02);
    }

    #[test]
    fn icq_string_round_trip() {
        let mut value = 6u16.to_le_bytes().to_vec();
        value.extend_from_slice(b"hello\0");
        let list: TlvList = vec![Tlv { tag: 0x07, value }].into();

        assert_eq!(list.icq_string(0x07), Some("hello".to_owned()));
    }

    #[test]
    fn icq_string_rejects_length_mismatch_and_bad_terminator() {
        let mut short = 9u16.to_le_bytes().to_vec();
        short.extend_from_slice(b"hello\0");
        let mut unterminated = 5u16.to_le_bytes().to_vec();
        unterminated.extend_from_slice(b"hello");
        let list: TlvList = vec![
            Tlv { tag: 0x01, value: short },
            Tlv { tag: 0x02, value: unterminated },
            Tlv { tag: 0x03, value: vec![0] },
        ]
        .into();

        assert_eq!(list.icq_string(0x01), None);
        assert_eq!(list.icq_string(0x02), None);
        assert_eq!(list.icq_string(0x03), None);
    }

    #[test]
    fn block_framings_round_trip() {
        let tlvs = sample_list().tlvs;

        let rest = TlvRestBlock::from(tlvs.clone());
        let wire = encode_be(&rest).unwrap();
        assert_eq!(decode_be::<TlvRestBlock>(&wire).unwrap(), rest);

        let counted = TlvBlock::from(tlvs.clone());
        let wire = encode_be(&counted).unwrap();
        assert_eq!(u16::from_be_bytes([wire[0], wire[1]]), 4);
        assert_eq!(decode_be::<TlvBlock>(&wire).unwrap(), counted);

        let measured = TlvLBlock::from(tlvs);
        let wire = encode_be(&measured).unwrap();
        assert_eq!(
            usize::from(u16::from_be_bytes([wire[0], wire[1]])),
            wire.len() - 2
        );
        assert_eq!(decode_be::<TlvLBlock>(&wire).unwrap(), measured);
    }

    #[test]
    fn empty_blocks_encode_to_prefix_bytes_only() {
        assert_eq!(encode_be(&TlvRestBlock::default()).unwrap(), Vec::<u8>::new());
        assert_eq!(encode_be(&TlvBlock::default()).unwrap(), vec![0, 0]);
        assert_eq!(encode_be(&TlvLBlock::default()).unwrap(), vec![0, 0]);
    }

    proptest! {
        #[test]
        fn arbitrary_lists_round_trip(
            entries in prop::collection::vec((any::<u16>(), prop::collection::vec(any::<u8>(), 0..32)), 0..8)
        ) {
            let tlvs: Vec<Tlv> =
                entries.into_iter().map(|(tag, value)| Tlv { tag, value }).collect();
            let block = TlvRestBlock::from(tlvs);
            let wire = encode_be(&block).unwrap();
            prop_assert_eq!(decode_be::<TlvRestBlock>(&wire).unwrap(), block);
        }
    }
}

//! Tag-driven record codec.
//!
//! Records are ordered field lists; each field is a scalar, a fixed byte
//! array, a string, a nested record, or a sequence, optionally annotated
//! with a length prefix, a count prefix, or a null terminator. Catalog
//! records implement [`Wire`] by hand on top of the field primitives in this
//! module, which enforce the grammar's invariants at run time:
//!
//! - length and count prefixes are mutually exclusive on one field
//! - a value must fit its prefix width
//! - null-terminated spans must end with a zero octet; empty strings encode
//!   as a zero prefix and no terminator
//! - an `optional` field may only be a trailing `Option<record>`; EOF at its
//!   first byte decodes as absent, EOF anywhere else is an error
//!
//! Byte order is an argument of the encode/decode entry points, not a
//! property of the type — except for records that set
//! [`Wire::FORCE_LITTLE_ENDIAN`], whose entire subtree is little-endian no
//! matter what the caller asked for.

use bytes::BufMut;

use crate::error::WireError;

/// Byte-order strategy for multi-octet scalars.
pub trait ByteOrder {
    /// Append a `u16` in this order.
    fn put_u16(dst: &mut Vec<u8>, value: u16);
    /// Append a `u32` in this order.
    fn put_u32(dst: &mut Vec<u8>, value: u32);
    /// Append a `u64` in this order.
    fn put_u64(dst: &mut Vec<u8>, value: u64);
    /// Consume a `u16` in this order.
    fn read_u16(src: &mut Reader<'_>) -> Result<u16, WireError>;
    /// Consume a `u32` in this order.
    fn read_u32(src: &mut Reader<'_>) -> Result<u32, WireError>;
    /// Consume a `u64` in this order.
    fn read_u64(src: &mut Reader<'_>) -> Result<u64, WireError>;
}

/// Network byte order.
#[derive(Debug, Clone, Copy)]
pub struct BigEndian;

/// The legacy ICQ byte order.
#[derive(Debug, Clone, Copy)]
pub struct LittleEndian;

impl ByteOrder for BigEndian {
    fn put_u16(dst: &mut Vec<u8>, value: u16) {
        dst.put_u16(value);
    }

    fn put_u32(dst: &mut Vec<u8>, value: u32) {
        dst.put_u32(value);
    }

    fn put_u64(dst: &mut Vec<u8>, value: u64) {
        dst.put_u64(value);
    }

    fn read_u16(src: &mut Reader<'_>) -> Result<u16, WireError> {
        Ok(u16::from_be_bytes(src.take_array()?))
    }

    fn read_u32(src: &mut Reader<'_>) -> Result<u32, WireError> {
        Ok(u32::from_be_bytes(src.take_array()?))
    }

    fn read_u64(src: &mut Reader<'_>) -> Result<u64, WireError> {
        Ok(u64::from_be_bytes(src.take_array()?))
    }
}

impl ByteOrder for LittleEndian {
    fn put_u16(dst: &mut Vec<u8>, value: u16) {
        dst.put_u16_le(value);
    }

    fn put_u32(dst: &mut Vec<u8>, value: u32) {
        dst.put_u32_le(value);
    }

    fn put_u64(dst: &mut Vec<u8>, value: u64) {
        dst.put_u64_le(value);
    }

    fn read_u16(src: &mut Reader<'_>) -> Result<u16, WireError> {
        Ok(u16::from_le_bytes(src.take_array()?))
    }

    fn read_u32(src: &mut Reader<'_>) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(src.take_array()?))
    }

    fn read_u64(src: &mut Reader<'_>) -> Result<u64, WireError> {
        Ok(u64::from_le_bytes(src.take_array()?))
    }
}

/// Bounded cursor over an input slice.
///
/// Every read is checked against the remaining span; underflow is a
/// [`WireError::UnexpectedEof`], never a panic.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    /// Wrap an input slice.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes left in this container.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// True when the container is exhausted.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume exactly `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.buf.len() < n {
            return Err(WireError::UnexpectedEof { needed: n, remaining: self.buf.len() });
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    /// Consume everything left in the container.
    pub fn take_rest(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.buf)
    }

    /// Consume a single octet.
    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let span = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(span);
        Ok(out)
    }
}

/// Width of a length or count prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    /// One-octet prefix.
    U8,
    /// Two-octet prefix.
    U16,
    /// Four-octet prefix.
    U32,
}

impl Prefix {
    fn max(self) -> usize {
        match self {
            Self::U8 => usize::from(u8::MAX),
            Self::U16 => usize::from(u16::MAX),
            Self::U32 => u32::MAX as usize,
        }
    }

    fn write<O: ByteOrder>(self, dst: &mut Vec<u8>, len: usize) -> Result<(), WireError> {
        if len > self.max() {
            return Err(WireError::PrefixOverflow { len, max: self.max() });
        }
        match self {
            Self::U8 => dst.put_u8(len as u8),
            Self::U16 => O::put_u16(dst, len as u16),
            Self::U32 => O::put_u32(dst, len as u32),
        }
        Ok(())
    }

    fn read<O: ByteOrder>(self, src: &mut Reader<'_>) -> Result<usize, WireError> {
        Ok(match self {
            Self::U8 => usize::from(src.read_u8()?),
            Self::U16 => usize::from(O::read_u16(src)?),
            Self::U32 => O::read_u32(src)? as usize,
        })
    }
}

/// Framing descriptor for a sequence field.
///
/// A sequence is either read until the enclosing container ends (`rest`),
/// preceded by its total byte length, or preceded by its element count.
/// Carrying both prefixes is a contradiction and yields
/// [`WireError::ConflictingPrefixes`] on either direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeqPrefix {
    /// Byte-length prefix, if any.
    pub len: Option<Prefix>,
    /// Element-count prefix, if any.
    pub count: Option<Prefix>,
}

impl SeqPrefix {
    /// Sequence runs to the end of the enclosing container.
    pub const fn rest() -> Self {
        Self { len: None, count: None }
    }

    /// Sequence preceded by its total byte length.
    pub const fn length_prefixed(width: Prefix) -> Self {
        Self { len: Some(width), count: None }
    }

    /// Sequence preceded by its element count.
    pub const fn count_prefixed(width: Prefix) -> Self {
        Self { len: None, count: Some(width) }
    }

    fn check(self) -> Result<(), WireError> {
        if self.len.is_some() && self.count.is_some() {
            return Err(WireError::ConflictingPrefixes);
        }
        Ok(())
    }
}

/// A record that can marshal itself to and from the wire.
///
/// Implementations spell out their fields in declaration order using the
/// field primitives below; the byte-order parameter threads through nested
/// records automatically.
pub trait Wire: Sized {
    /// Forces the little-endian order for this record's whole subtree,
    /// regardless of the caller's requested order. Only the ICQ message
    /// reply envelope sets this.
    const FORCE_LITTLE_ENDIAN: bool = false;

    /// Append this record's fields to `dst`.
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError>;

    /// Parse this record's fields from `src`.
    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError>;
}

impl<const N: usize> Wire for [u8; N] {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        dst.extend_from_slice(self);
        Ok(())
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        src.take_array()
    }
}

/// Marshal a record in big-endian order.
pub fn encode_be<T: Wire>(value: &T) -> Result<Vec<u8>, WireError> {
    let mut dst = Vec::new();
    put_record::<BigEndian, T>(&mut dst, None, value)?;
    Ok(dst)
}

/// Marshal a record in little-endian order.
pub fn encode_le<T: Wire>(value: &T) -> Result<Vec<u8>, WireError> {
    let mut dst = Vec::new();
    put_record::<LittleEndian, T>(&mut dst, None, value)?;
    Ok(dst)
}

/// Unmarshal a record in big-endian order.
pub fn decode_be<T: Wire>(bytes: &[u8]) -> Result<T, WireError> {
    let mut src = Reader::new(bytes);
    read_record::<BigEndian, T>(&mut src, None)
}

/// Unmarshal a record in little-endian order.
pub fn decode_le<T: Wire>(bytes: &[u8]) -> Result<T, WireError> {
    let mut src = Reader::new(bytes);
    read_record::<LittleEndian, T>(&mut src, None)
}

fn encode_subtree<O: ByteOrder, T: Wire>(value: &T, dst: &mut Vec<u8>) -> Result<(), WireError> {
    if T::FORCE_LITTLE_ENDIAN {
        value.encode::<LittleEndian>(dst)
    } else {
        value.encode::<O>(dst)
    }
}

fn decode_subtree<O: ByteOrder, T: Wire>(src: &mut Reader<'_>) -> Result<T, WireError> {
    if T::FORCE_LITTLE_ENDIAN { T::decode::<LittleEndian>(src) } else { T::decode::<O>(src) }
}

/// Append a nested record, optionally behind a byte-length prefix.
pub fn put_record<O: ByteOrder, T: Wire>(
    dst: &mut Vec<u8>,
    len_prefix: Option<Prefix>,
    value: &T,
) -> Result<(), WireError> {
    match len_prefix {
        None => encode_subtree::<O, T>(value, dst),
        Some(width) => {
            // Side-buffer the fields so the prefix can carry the byte length.
            let mut side = Vec::new();
            encode_subtree::<O, T>(value, &mut side)?;
            width.write::<O>(dst, side.len())?;
            dst.extend_from_slice(&side);
            Ok(())
        },
    }
}

/// Parse a nested record, optionally from behind a byte-length prefix.
pub fn read_record<O: ByteOrder, T: Wire>(
    src: &mut Reader<'_>,
    len_prefix: Option<Prefix>,
) -> Result<T, WireError> {
    match len_prefix {
        None => decode_subtree::<O, T>(src),
        Some(width) => {
            let len = width.read::<O>(src)?;
            let mut sub = Reader::new(src.take(len)?);
            decode_subtree::<O, T>(&mut sub)
        },
    }
}

/// Append a trailing optional record: absent encodes to zero bytes.
pub fn put_optional<O: ByteOrder, T: Wire>(
    dst: &mut Vec<u8>,
    value: Option<&T>,
) -> Result<(), WireError> {
    match value {
        None => Ok(()),
        Some(value) => encode_subtree::<O, T>(value, dst),
    }
}

/// Parse a trailing optional record.
///
/// EOF before any byte is consumed for the field means absent; a partial
/// record past the first byte is still a marshal error.
pub fn read_optional<O: ByteOrder, T: Wire>(
    src: &mut Reader<'_>,
) -> Result<Option<T>, WireError> {
    if src.is_empty() {
        return Ok(None);
    }
    decode_subtree::<O, T>(src).map(Some)
}

/// Append raw bytes, optionally behind a byte-length prefix. Without a
/// prefix the bytes run to the end of the enclosing container.
pub fn put_bytes<O: ByteOrder>(
    dst: &mut Vec<u8>,
    len_prefix: Option<Prefix>,
    value: &[u8],
) -> Result<(), WireError> {
    if let Some(width) = len_prefix {
        width.write::<O>(dst, value.len())?;
    }
    dst.extend_from_slice(value);
    Ok(())
}

/// Parse raw bytes, prefixed or running to the container's end.
pub fn read_bytes<O: ByteOrder>(
    src: &mut Reader<'_>,
    len_prefix: Option<Prefix>,
) -> Result<Vec<u8>, WireError> {
    match len_prefix {
        Some(width) => {
            let len = width.read::<O>(src)?;
            Ok(src.take(len)?.to_vec())
        },
        None => Ok(src.take_rest().to_vec()),
    }
}

/// Append a string field.
///
/// With `nullterm`, a trailing zero octet is appended and counted by the
/// length prefix; an empty string encodes as a zero prefix and no
/// terminator.
pub fn put_string<O: ByteOrder>(
    dst: &mut Vec<u8>,
    len_prefix: Option<Prefix>,
    nullterm: bool,
    value: &str,
) -> Result<(), WireError> {
    let bytes = value.as_bytes();
    let terminated = nullterm && !bytes.is_empty();
    let encoded_len = if terminated { bytes.len() + 1 } else { bytes.len() };
    if let Some(width) = len_prefix {
        width.write::<O>(dst, encoded_len)?;
    }
    dst.extend_from_slice(bytes);
    if terminated {
        dst.put_u8(0);
    }
    Ok(())
}

/// Parse a string field; see [`put_string`] for the nullterm rules.
pub fn read_string<O: ByteOrder>(
    src: &mut Reader<'_>,
    len_prefix: Option<Prefix>,
    nullterm: bool,
) -> Result<String, WireError> {
    let raw = match len_prefix {
        Some(width) => {
            let len = width.read::<O>(src)?;
            src.take(len)?
        },
        None => src.take_rest(),
    };
    let text = if nullterm && !raw.is_empty() {
        match raw.split_last() {
            Some((0, head)) => head,
            _ => return Err(WireError::UnterminatedString),
        }
    } else {
        raw
    };
    Ok(String::from_utf8_lossy(text).into_owned())
}

/// Append a sequence of records under the given framing.
pub fn put_seq<O: ByteOrder, T: Wire>(
    dst: &mut Vec<u8>,
    prefix: SeqPrefix,
    items: &[T],
) -> Result<(), WireError> {
    prefix.check()?;
    if let Some(width) = prefix.count {
        width.write::<O>(dst, items.len())?;
        for item in items {
            encode_subtree::<O, T>(item, dst)?;
        }
        return Ok(());
    }
    if let Some(width) = prefix.len {
        let mut side = Vec::new();
        for item in items {
            encode_subtree::<O, T>(item, &mut side)?;
        }
        width.write::<O>(dst, side.len())?;
        dst.extend_from_slice(&side);
        return Ok(());
    }
    for item in items {
        encode_subtree::<O, T>(item, dst)?;
    }
    Ok(())
}

/// Parse a sequence of records under the given framing.
pub fn read_seq<O: ByteOrder, T: Wire>(
    src: &mut Reader<'_>,
    prefix: SeqPrefix,
) -> Result<Vec<T>, WireError> {
    prefix.check()?;
    if let Some(width) = prefix.count {
        let count = width.read::<O>(src)?;
        // Cap the pre-allocation; the count is attacker-controlled.
        let mut items = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            items.push(decode_subtree::<O, T>(src)?);
        }
        return Ok(items);
    }
    if let Some(width) = prefix.len {
        let len = width.read::<O>(src)?;
        let mut sub = Reader::new(src.take(len)?);
        let mut items = Vec::new();
        while !sub.is_empty() {
            items.push(decode_subtree::<O, T>(&mut sub)?);
        }
        return Ok(items);
    }
    let mut items = Vec::new();
    while !src.is_empty() {
        items.push(decode_subtree::<O, T>(src)?);
    }
    Ok(items)
}

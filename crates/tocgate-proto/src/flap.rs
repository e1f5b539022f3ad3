//! FLAP framing: the length-prefixed outer layer carrying TOC lines and
//! SNACs.
//!
//! Every frame is `[0x2A][type:u8][sequence:u16 BE][length:u16 BE][payload]`.
//! The writer owns the outbound sequence counter (16-bit wrap, one increment
//! per send); the reader ignores inbound sequencing. Neither half is safe
//! for concurrent use — each connection pairs exactly one reader task with
//! one writer task.
//!
//! The `disconnect` variant sends only marker, type, and sequence (no
//! length field). It is the last frame on the wire, used to terminate
//! clients that mishandle a zero-length signoff.

use bytes::BufMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    codec::{self, ByteOrder, Reader, Wire},
    error::{FlapError, WireError},
    snac::SnacFrame,
    tlv::TlvRestBlock,
};

/// First octet of every FLAP frame.
pub const FLAP_START_MARKER: u8 = 0x2A;

/// FLAP protocol version carried in signon frames.
pub const FLAP_VERSION: u32 = 1;

/// Literal a TOC client sends before its first FLAP frame.
pub const FLAPON: &[u8] = b"FLAPON\r\n\r\n";

/// FLAP frame discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlapFrameType {
    /// Channel negotiation.
    SignOn = 1,
    /// Application payload (TOC lines, SNACs).
    Data = 2,
    /// FLAP-level error.
    Error = 3,
    /// Connection teardown.
    SignOff = 4,
    /// Liveness probe.
    KeepAlive = 5,
}

impl FlapFrameType {
    /// Parse the frame-type octet.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::SignOn),
            2 => Some(Self::Data),
            3 => Some(Self::Error),
            4 => Some(Self::SignOff),
            5 => Some(Self::KeepAlive),
            _ => None,
        }
    }
}

/// Payload of a signon frame: FLAP version then TLVs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlapSignonFrame {
    /// Always [`FLAP_VERSION`].
    pub flap_version: u32,
    /// Negotiation TLVs (screen name, roasted password, cookies).
    pub tlvs: TlvRestBlock,
}

impl Wire for FlapSignonFrame {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        O::put_u32(dst, self.flap_version);
        codec::put_record::<O, _>(dst, None, &self.tlvs)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            flap_version: O::read_u32(src)?,
            tlvs: codec::read_record::<O, _>(src, None)?,
        })
    }
}

/// Writing half of a FLAP connection.
#[derive(Debug)]
pub struct FlapWriter<W> {
    writer: W,
    sequence: u16,
}

impl<W: AsyncWrite + Unpin> FlapWriter<W> {
    /// Wrap the write half of a connection.
    pub fn new(writer: W) -> Self {
        Self { writer, sequence: 0 }
    }

    /// Next outbound sequence number.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// The underlying writer, for pre-framing bytes like the sign-on
    /// literal.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    async fn send_frame(
        &mut self,
        frame_type: FlapFrameType,
        payload: &[u8],
    ) -> Result<(), FlapError> {
        let Ok(len) = u16::try_from(payload.len()) else {
            return Err(FlapError::PayloadTooLarge(payload.len()));
        };
        let mut buf = Vec::with_capacity(6 + payload.len());
        buf.put_u8(FLAP_START_MARKER);
        buf.put_u8(frame_type as u8);
        buf.put_u16(self.sequence);
        buf.put_u16(len);
        buf.extend_from_slice(payload);
        self.writer.write_all(&buf).await?;
        self.writer.flush().await?;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(())
    }

    /// Send a signon frame carrying `tlvs`.
    pub async fn send_signon_frame(&mut self, tlvs: TlvRestBlock) -> Result<(), FlapError> {
        let frame = FlapSignonFrame { flap_version: FLAP_VERSION, tlvs };
        let payload = codec::encode_be(&frame)?;
        self.send_frame(FlapFrameType::SignOn, &payload).await
    }

    /// Send a data frame with a raw payload (TOC lines are ASCII inside
    /// data frames).
    pub async fn send_data_frame(&mut self, payload: &[u8]) -> Result<(), FlapError> {
        self.send_frame(FlapFrameType::Data, payload).await
    }

    /// Send a SNAC: frame header then typed body bytes, inside a data
    /// frame.
    pub async fn send_snac(&mut self, frame: SnacFrame, body: &[u8]) -> Result<(), FlapError> {
        let mut payload = codec::encode_be(&frame)?;
        payload.extend_from_slice(body);
        self.send_frame(FlapFrameType::Data, &payload).await
    }

    /// Send an empty keep-alive frame.
    pub async fn send_keepalive(&mut self) -> Result<(), FlapError> {
        self.send_frame(FlapFrameType::KeepAlive, &[]).await
    }

    /// Send a signoff frame carrying `tlvs`.
    pub async fn send_signoff(&mut self, tlvs: TlvRestBlock) -> Result<(), FlapError> {
        let payload = codec::encode_be(&tlvs)?;
        self.send_frame(FlapFrameType::SignOff, &payload).await
    }

    /// Send the four-octet no-length signoff variant and consume the
    /// writer; nothing may follow it.
    pub async fn disconnect(mut self) -> Result<(), FlapError> {
        let mut buf = [0u8; 4];
        buf[0] = FLAP_START_MARKER;
        buf[1] = FlapFrameType::SignOff as u8;
        buf[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        self.writer.write_all(&buf).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Reading half of a FLAP connection.
#[derive(Debug)]
pub struct FlapReader<R> {
    reader: R,
}

impl<R: AsyncRead + Unpin> FlapReader<R> {
    /// Wrap the read half of a connection.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Consume the `FLAPON\r\n\r\n` opening literal.
    pub async fn expect_flapon(&mut self) -> Result<(), FlapError> {
        let mut literal = [0u8; FLAPON.len()];
        self.reader.read_exact(&mut literal).await?;
        if literal != *FLAPON {
            return Err(FlapError::BadSignonLiteral);
        }
        Ok(())
    }

    /// Read the next frame as (type, payload).
    pub async fn receive_frame(&mut self) -> Result<(FlapFrameType, Vec<u8>), FlapError> {
        let mut header = [0u8; 6];
        self.reader.read_exact(&mut header).await?;
        if header[0] != FLAP_START_MARKER {
            return Err(FlapError::BadStartMarker(header[0]));
        }
        let frame_type =
            FlapFrameType::from_u8(header[1]).ok_or(FlapError::UnknownFrameType(header[1]))?;
        let len = usize::from(u16::from_be_bytes([header[4], header[5]]));
        let mut payload = vec![0u8; len];
        self.reader.read_exact(&mut payload).await?;
        Ok((frame_type, payload))
    }

    /// Read a frame that must be a signon frame and parse its payload.
    pub async fn receive_signon_frame(&mut self) -> Result<FlapSignonFrame, FlapError> {
        let (frame_type, payload) = self.receive_frame().await?;
        if frame_type != FlapFrameType::SignOn {
            return Err(FlapError::UnexpectedFrame {
                expected: FlapFrameType::SignOn,
                got: frame_type,
            });
        }
        Ok(codec::decode_be(&payload)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tlv::new_tlv_be;

    #[tokio::test]
    async fn data_frames_round_trip_with_monotonic_sequence() {
        let (client, server) = tokio::io::duplex(4096);
        let mut writer = FlapWriter::new(client);
        let mut reader = FlapReader::new(server);

        for i in 0u16..5 {
            assert_eq!(writer.sequence(), i);
            writer.send_data_frame(format!("line {i}").as_bytes()).await.unwrap();
        }

        for i in 0u16..5 {
            let (frame_type, payload) = reader.receive_frame().await.unwrap();
            assert_eq!(frame_type, FlapFrameType::Data);
            assert_eq!(payload, format!("line {i}").as_bytes());
        }
    }

    #[tokio::test]
    async fn sequence_wraps_modulo_u16() {
        let (client, _server) = tokio::io::duplex(65536);
        let mut writer = FlapWriter::new(client);
        writer.sequence = u16::MAX;

        writer.send_keepalive().await.unwrap();
        assert_eq!(writer.sequence(), 0);
        writer.send_keepalive().await.unwrap();
        assert_eq!(writer.sequence(), 1);
    }

    #[tokio::test]
    async fn signon_frame_round_trips() {
        let (client, server) = tokio::io::duplex(4096);
        let mut writer = FlapWriter::new(client);
        let mut reader = FlapReader::new(server);

        let tlvs: TlvRestBlock = vec![new_tlv_be(0x01, "alice").unwrap()].into();
        writer.send_signon_frame(tlvs.clone()).await.unwrap();

        let frame = reader.receive_signon_frame().await.unwrap();
        assert_eq!(frame.flap_version, FLAP_VERSION);
        assert_eq!(frame.tlvs, tlvs);
    }

    #[tokio::test]
    async fn disconnect_emits_exactly_four_octets() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut writer = FlapWriter::new(client);
        writer.send_keepalive().await.unwrap();
        writer.disconnect().await.unwrap();

        let mut wire = Vec::new();
        server.read_to_end(&mut wire).await.unwrap();
        // Keep-alive frame (6 bytes) then the no-length variant (4 bytes).
        assert_eq!(wire.len(), 10);
        assert_eq!(&wire[6..], &[FLAP_START_MARKER, 4, 0, 1]);
    }

    #[tokio::test]
    async fn bad_start_marker_rejected() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = FlapReader::new(server);

        client.write_all(&[0x2B, 2, 0, 0, 0, 0]).await.unwrap();
        let err = reader.receive_frame().await.unwrap_err();
        assert!(matches!(err, FlapError::BadStartMarker(0x2B)));
    }

    #[tokio::test]
    async fn flapon_literal_enforced() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = FlapReader::new(server);

        client.write_all(b"GET / HTTP").await.unwrap();
        let err = reader.expect_flapon().await.unwrap_err();
        assert!(matches!(err, FlapError::BadSignonLiteral));
    }
}

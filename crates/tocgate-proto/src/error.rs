//! Error types for the wire layer.
//!
//! [`WireError`] is the distinguished "marshal failure" for structural
//! problems in record encode/decode; [`FlapError`] covers the framing layer,
//! where I/O failures and protocol violations both terminate the connection.

use std::io;

use thiserror::Error;

/// Structural failure while marshalling or unmarshalling a record.
///
/// These indicate either malformed input octets or a record definition that
/// violates the shape grammar (contradictory prefixes, oversized values).
/// Reads past end-of-stream on the first byte of an `optional` field are not
/// errors; they decode as absent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Stream ended in the middle of a non-optional field.
    #[error("marshal failure: unexpected end of stream (needed {needed} bytes, {remaining} left)")]
    UnexpectedEof {
        /// Bytes the current field still required
        needed: usize,
        /// Bytes left in the enclosing container
        remaining: usize,
    },

    /// A sequence field carried both a length prefix and a count prefix.
    #[error("marshal failure: length and count prefixes on the same field")]
    ConflictingPrefixes,

    /// A value was too long for its prefix width.
    #[error("marshal failure: value of {len} bytes exceeds prefix maximum of {max}")]
    PrefixOverflow {
        /// Actual encoded length
        len: usize,
        /// Largest length the prefix integer can express
        max: usize,
    },

    /// A null-terminated string span did not end with a zero octet.
    #[error("marshal failure: null-terminated string missing terminator")]
    UnterminatedString,
}

/// Errors from the FLAP framing layer.
#[derive(Error, Debug)]
pub enum FlapError {
    /// Underlying transport failure.
    #[error("i/o: {0}")]
    Io(#[from] io::Error),

    /// Payload failed to marshal or unmarshal.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// First octet of a frame was not the `0x2A` start marker.
    #[error("bad FLAP start marker {0:#04x}")]
    BadStartMarker(u8),

    /// Frame-type octet outside the known set.
    #[error("unknown FLAP frame type {0:#04x}")]
    UnknownFrameType(u8),

    /// Received a frame of the wrong type for the current handshake step.
    #[error("unexpected FLAP frame: wanted {expected:?}, got {got:?}")]
    UnexpectedFrame {
        /// Frame type the handshake required
        expected: crate::flap::FlapFrameType,
        /// Frame type actually received
        got: crate::flap::FlapFrameType,
    },

    /// Client did not open with the `FLAPON\r\n\r\n` literal.
    #[error("bad sign-on literal")]
    BadSignonLiteral,

    /// Outbound payload larger than a FLAP frame can carry.
    #[error("payload of {0} bytes exceeds FLAP frame maximum")]
    PayloadTooLarge(usize),
}

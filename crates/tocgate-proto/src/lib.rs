//! Wire types for the OSCAR side of the TOC gateway.
//!
//! This crate owns everything that touches octets:
//!
//! - [`codec`]: the tag-driven record codec (length/count prefixes,
//!   null-terminated strings, optional trailing records, switchable byte
//!   order)
//! - [`tlv`]: tag-length-value containers with typed accessors
//! - [`flap`]: the outer FLAP framing layer and its async reader/writer pair
//! - the SNAC catalog: one module per food group ([`oservice`], [`locate`],
//!   [`buddy`], [`icbm`], [`admin`], [`permit_deny`], [`chatnav`], [`chat`],
//!   [`odir`], [`icq`]) plus the frame and name table in [`snac`]
//!
//! Catalog records are plain data structs implementing [`codec::Wire`]; the
//! byte order is chosen by the caller at the encode/decode entry points, not
//! baked into the type. The single exception is the ICQ reply envelope,
//! which forces little-endian for its subtree (see [`icq`]).

pub mod admin;
pub mod buddy;
pub mod capability;
pub mod chat;
pub mod chatnav;
pub mod codec;
pub mod error;
pub mod flap;
pub mod icbm;
pub mod icq;
pub mod locate;
pub mod odir;
pub mod oservice;
pub mod permit_deny;
pub mod snac;
pub mod tlv;

pub use capability::Capability;
pub use codec::{Wire, decode_be, decode_le, encode_be, encode_le};
pub use error::{FlapError, WireError};
pub use flap::{FlapFrameType, FlapReader, FlapSignonFrame, FlapWriter};
pub use oservice::TlvUserInfo;
pub use snac::{SnacError, SnacFrame};
pub use tlv::{Tlv, TlvBlock, TlvLBlock, TlvList, TlvRestBlock, new_tlv_be, new_tlv_le};

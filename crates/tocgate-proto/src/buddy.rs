//! Buddy food group (0x0003): roster maintenance and presence events.

use crate::{
    codec::{self, ByteOrder, Prefix, Reader, SeqPrefix, Wire},
    error::WireError,
    oservice::TlvUserInfo,
};

/// Sub-group: add roster entries.
pub const BUDDY_ADD_BUDDIES: u16 = 0x0004;
/// Sub-group: remove roster entries.
pub const BUDDY_DEL_BUDDIES: u16 = 0x0005;
/// Sub-group: a buddy signed on.
pub const BUDDY_ARRIVED: u16 = 0x000B;
/// Sub-group: a buddy signed off.
pub const BUDDY_DEPARTED: u16 = 0x000C;

/// One roster entry: a length-prefixed screen name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuddyName {
    /// Screen name.
    pub screen_name: String,
}

impl BuddyName {
    /// Entry for `screen_name`.
    pub fn new(screen_name: impl Into<String>) -> Self {
        Self { screen_name: screen_name.into() }
    }
}

impl Wire for BuddyName {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        codec::put_string::<O>(dst, Some(Prefix::U8), false, &self.screen_name)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self { screen_name: codec::read_string::<O>(src, Some(Prefix::U8), false)? })
    }
}

macro_rules! buddy_list_body {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            /// Roster entries, until the end of the frame.
            pub buddies: Vec<BuddyName>,
        }

        impl Wire for $name {
            fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
                codec::put_seq::<O, _>(dst, SeqPrefix::rest(), &self.buddies)
            }

            fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
                Ok(Self { buddies: codec::read_seq::<O, _>(src, SeqPrefix::rest())? })
            }
        }
    };
}

buddy_list_body!(
    /// 0x0003/0x0004: add these users to the caller's buddy list.
    BuddyAddBuddies
);

buddy_list_body!(
    /// 0x0003/0x0005: remove these users from the caller's buddy list.
    BuddyDelBuddies
);

/// 0x0003/0x000B: a watched user arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuddyArrived {
    /// Presence info for the arriving user.
    pub user_info: TlvUserInfo,
}

impl Wire for BuddyArrived {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        codec::put_record::<O, _>(dst, None, &self.user_info)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self { user_info: codec::read_record::<O, _>(src, None)? })
    }
}

/// 0x0003/0x000C: a watched user departed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuddyDeparted {
    /// Last-known info for the departing user.
    pub user_info: TlvUserInfo,
}

impl Wire for BuddyDeparted {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        codec::put_record::<O, _>(dst, None, &self.user_info)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self { user_info: codec::read_record::<O, _>(src, None)? })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::codec::{decode_be, encode_be};

    #[test]
    fn buddy_lists_round_trip() {
        let body = BuddyAddBuddies {
            buddies: vec![BuddyName::new("alice"), BuddyName::new("bob")],
        };
        let wire = encode_be(&body).unwrap();
        assert_eq!(wire, vec![5, b'a', b'l', b'i', b'c', b'e', 3, b'b', b'o', b'b']);
        assert_eq!(decode_be::<BuddyAddBuddies>(&wire).unwrap(), body);
    }

    #[test]
    fn empty_buddy_list_is_empty_frame() {
        let body = BuddyDelBuddies::default();
        assert_eq!(encode_be(&body).unwrap(), Vec::<u8>::new());
        assert_eq!(decode_be::<BuddyDelBuddies>(&[]).unwrap(), body);
    }
}

//! Permit/deny food group (0x0009): visibility lists.

use crate::{
    codec::{self, ByteOrder, Reader, SeqPrefix, Wire},
    buddy::BuddyName,
    error::WireError,
};

/// Sub-group: add users to the permit list.
pub const PD_ADD_PERM_LIST_ENTRIES: u16 = 0x0005;
/// Sub-group: add users to the deny list.
pub const PD_ADD_DENY_LIST_ENTRIES: u16 = 0x0007;

macro_rules! pd_list_body {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            /// List entries, until the end of the frame.
            pub users: Vec<BuddyName>,
        }

        impl Wire for $name {
            fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
                codec::put_seq::<O, _>(dst, SeqPrefix::rest(), &self.users)
            }

            fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
                Ok(Self { users: codec::read_seq::<O, _>(src, SeqPrefix::rest())? })
            }
        }
    };
}

pd_list_body!(
    /// 0x0009/0x0005: add these users to the caller's permit list.
    PermitDenyAddPermListEntries
);

pd_list_body!(
    /// 0x0009/0x0007: add these users to the caller's deny list.
    PermitDenyAddDenyListEntries
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::codec::{decode_be, encode_be};

    #[test]
    fn permit_entries_round_trip() {
        let body = PermitDenyAddPermListEntries {
            users: vec![BuddyName::new("carol"), BuddyName::new("dave")],
        };
        let wire = encode_be(&body).unwrap();
        assert_eq!(decode_be::<PermitDenyAddPermListEntries>(&wire).unwrap(), body);
    }
}

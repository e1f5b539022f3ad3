//! ICBM food group (0x0004): instant messages, rendezvous, warnings.
//!
//! Channel 1 carries plain instant messages as a fragment list inside TLV
//! 0x02. Channel 2 carries rendezvous negotiations (chat invitations, file
//! transfers) as an [`IcbmCh2Fragment`] inside TLV 0x05.

use crate::{
    capability::Capability,
    codec::{self, ByteOrder, Prefix, Reader, SeqPrefix, Wire},
    error::WireError,
    oservice::TlvUserInfo,
    tlv::TlvRestBlock,
};

/// Sub-group: send a message through the server.
pub const ICBM_CHANNEL_MSG_TO_HOST: u16 = 0x0006;
/// Sub-group: a message delivered to this client.
pub const ICBM_CHANNEL_MSG_TO_CLIENT: u16 = 0x0007;
/// Sub-group: warn another user.
pub const ICBM_EVIL_REQUEST: u16 = 0x0008;
/// Sub-group: warning request result.
pub const ICBM_EVIL_REPLY: u16 = 0x0009;

/// Channel 1: instant messages.
pub const ICBM_CHANNEL_IM: u16 = 0x0001;
/// Channel 2: rendezvous.
pub const ICBM_CHANNEL_RENDEZVOUS: u16 = 0x0002;

/// Message TLV: the fragment list.
pub const ICBM_TLV_FRAGMENT_LIST: u16 = 0x0002;
/// Message TLV: sender wants a host acknowledgement.
pub const ICBM_TLV_REQUEST_HOST_ACK: u16 = 0x0003;
/// Message TLV: this message is an auto-response.
pub const ICBM_TLV_AUTO_RESPONSE: u16 = 0x0004;
/// Message TLV: rendezvous sub-fragment.
pub const ICBM_TLV_RENDEZVOUS: u16 = 0x0005;

/// Fragment id: message text.
pub const FRAGMENT_ID_MESSAGE_TEXT: u8 = 0x01;
/// Fragment id: capabilities array.
pub const FRAGMENT_ID_CAPABILITIES: u8 = 0x05;
/// Fragment payload version emitted by this gateway.
pub const FRAGMENT_VERSION: u8 = 0x01;

/// Rendezvous message type: propose.
pub const RDV_TYPE_PROPOSE: u16 = 0x0000;
/// Rendezvous message type: cancel.
pub const RDV_TYPE_CANCEL: u16 = 0x0001;
/// Rendezvous message type: accept.
pub const RDV_TYPE_ACCEPT: u16 = 0x0002;

/// Rendezvous TLV: proposer's own address.
pub const RDV_TLV_REQUESTER_IP: u16 = 0x0002;
/// Rendezvous TLV: rendezvous point address.
pub const RDV_TLV_RDV_IP: u16 = 0x0003;
/// Rendezvous TLV: server-verified proposer address.
pub const RDV_TLV_VERIFIED_IP: u16 = 0x0004;
/// Rendezvous TLV: port (u16).
pub const RDV_TLV_PORT: u16 = 0x0005;
/// Rendezvous TLV: proposal sequence number (u16).
pub const RDV_TLV_SEQUENCE: u16 = 0x000A;
/// Rendezvous TLV: cancellation reason (u16).
pub const RDV_TLV_CANCEL_REASON: u16 = 0x000B;
/// Rendezvous TLV: invitation prompt text.
pub const RDV_TLV_INVITATION: u16 = 0x000C;
/// Rendezvous TLV: prompt MIME charset.
pub const RDV_TLV_INVITE_MIME_CHARSET: u16 = 0x000D;
/// Rendezvous TLV: prompt MIME language.
pub const RDV_TLV_INVITE_MIME_LANG: u16 = 0x000E;
/// Rendezvous TLV: capability-specific service data.
pub const RDV_TLV_SVC_DATA: u16 = 0x2711;

/// Rendezvous cancel reason: the user cancelled.
pub const RDV_CANCEL_REASON_USER_CANCEL: u16 = 0x0001;

/// 0x0004/0x0006: client sends a message to `screen_name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IcbmChannelMsgToHost {
    /// Message cookie, echoed in acks and rendezvous responses.
    pub cookie: [u8; 8],
    /// ICBM channel.
    pub channel: u16,
    /// Destination screen name.
    pub screen_name: String,
    /// Channel-specific TLVs.
    pub tlvs: TlvRestBlock,
}

impl Wire for IcbmChannelMsgToHost {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        codec::put_record::<O, _>(dst, None, &self.cookie)?;
        O::put_u16(dst, self.channel);
        codec::put_string::<O>(dst, Some(Prefix::U8), false, &self.screen_name)?;
        codec::put_record::<O, _>(dst, None, &self.tlvs)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            cookie: codec::read_record::<O, _>(src, None)?,
            channel: O::read_u16(src)?,
            screen_name: codec::read_string::<O>(src, Some(Prefix::U8), false)?,
            tlvs: codec::read_record::<O, _>(src, None)?,
        })
    }
}

/// 0x0004/0x0007: server delivers a message from `user_info`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IcbmChannelMsgToClient {
    /// Message cookie.
    pub cookie: [u8; 8],
    /// ICBM channel.
    pub channel: u16,
    /// Sender presence info.
    pub user_info: TlvUserInfo,
    /// Channel-specific TLVs.
    pub tlvs: TlvRestBlock,
}

impl Wire for IcbmChannelMsgToClient {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        codec::put_record::<O, _>(dst, None, &self.cookie)?;
        O::put_u16(dst, self.channel);
        codec::put_record::<O, _>(dst, None, &self.user_info)?;
        codec::put_record::<O, _>(dst, None, &self.tlvs)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            cookie: codec::read_record::<O, _>(src, None)?,
            channel: O::read_u16(src)?,
            user_info: codec::read_record::<O, _>(src, None)?,
            tlvs: codec::read_record::<O, _>(src, None)?,
        })
    }
}

/// One entry of a channel-1 fragment list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IcbmFragment {
    /// Fragment identifier (`FRAGMENT_ID_*`).
    pub id: u8,
    /// Fragment version.
    pub version: u8,
    /// Fragment payload.
    pub payload: Vec<u8>,
}

impl Wire for IcbmFragment {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        dst.push(self.id);
        dst.push(self.version);
        codec::put_bytes::<O>(dst, Some(Prefix::U16), &self.payload)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            id: src.read_u8()?,
            version: src.read_u8()?,
            payload: codec::read_bytes::<O>(src, Some(Prefix::U16))?,
        })
    }
}

/// Payload of a message-text fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IcbmMessageText {
    /// Character set identifier.
    pub charset: u16,
    /// Language identifier.
    pub lang: u16,
    /// Message octets, to the end of the fragment.
    pub text: Vec<u8>,
}

impl Wire for IcbmMessageText {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        O::put_u16(dst, self.charset);
        O::put_u16(dst, self.lang);
        codec::put_bytes::<O>(dst, None, &self.text)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            charset: O::read_u16(src)?,
            lang: O::read_u16(src)?,
            text: codec::read_bytes::<O>(src, None)?,
        })
    }
}

/// Build the standard outbound fragment list for a text message:
/// a capabilities fragment followed by the message text.
pub fn message_fragments(text: &str) -> Result<Vec<u8>, WireError> {
    let body = IcbmMessageText { charset: 0, lang: 0, text: text.as_bytes().to_vec() };
    let fragments = vec![
        IcbmFragment {
            id: FRAGMENT_ID_CAPABILITIES,
            version: FRAGMENT_VERSION,
            payload: vec![0x01],
        },
        IcbmFragment {
            id: FRAGMENT_ID_MESSAGE_TEXT,
            version: FRAGMENT_VERSION,
            payload: codec::encode_be(&body)?,
        },
    ];
    let mut out = Vec::new();
    codec::put_seq::<codec::BigEndian, _>(&mut out, SeqPrefix::rest(), &fragments)?;
    Ok(out)
}

/// Extract the message text from fragment-list bytes; `None` when no text
/// fragment is present.
pub fn text_from_fragments(fragment_list: &[u8]) -> Result<Option<String>, WireError> {
    let mut src = Reader::new(fragment_list);
    let fragments: Vec<IcbmFragment> =
        codec::read_seq::<codec::BigEndian, _>(&mut src, SeqPrefix::rest())?;
    for fragment in fragments {
        if fragment.id == FRAGMENT_ID_MESSAGE_TEXT {
            let body: IcbmMessageText = codec::decode_be(&fragment.payload)?;
            return Ok(Some(String::from_utf8_lossy(&body.text).into_owned()));
        }
    }
    Ok(None)
}

/// Channel-2 rendezvous sub-fragment (the value of TLV 0x05).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcbmCh2Fragment {
    /// Propose, cancel, or accept (`RDV_TYPE_*`).
    pub rdv_type: u16,
    /// Rendezvous cookie, matching the enclosing ICBM cookie.
    pub cookie: [u8; 8],
    /// Capability this rendezvous negotiates.
    pub capability: Capability,
    /// Rendezvous TLVs (`RDV_TLV_*`).
    pub tlvs: TlvRestBlock,
}

impl Default for IcbmCh2Fragment {
    fn default() -> Self {
        Self {
            rdv_type: RDV_TYPE_PROPOSE,
            cookie: [0; 8],
            capability: Capability([0; 16]),
            tlvs: TlvRestBlock::default(),
        }
    }
}

impl Wire for IcbmCh2Fragment {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        O::put_u16(dst, self.rdv_type);
        codec::put_record::<O, _>(dst, None, &self.cookie)?;
        codec::put_record::<O, _>(dst, None, &self.capability)?;
        codec::put_record::<O, _>(dst, None, &self.tlvs)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            rdv_type: O::read_u16(src)?,
            cookie: codec::read_record::<O, _>(src, None)?,
            capability: codec::read_record::<O, _>(src, None)?,
            tlvs: codec::read_record::<O, _>(src, None)?,
        })
    }
}

/// 0x0004/0x0008: warn another user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IcbmEvilRequest {
    /// 0 = attributed, 1 = anonymous.
    pub send_as: u16,
    /// Target screen name.
    pub screen_name: String,
}

impl Wire for IcbmEvilRequest {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        O::put_u16(dst, self.send_as);
        codec::put_string::<O>(dst, Some(Prefix::U8), false, &self.screen_name)
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            send_as: O::read_u16(src)?,
            screen_name: codec::read_string::<O>(src, Some(Prefix::U8), false)?,
        })
    }
}

/// 0x0004/0x0009: warning applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IcbmEvilReply {
    /// Warning delta that was applied, tenths of a percent.
    pub evil_delta_applied: u16,
    /// Target's warning level after the delta.
    pub updated_evil_value: u16,
}

impl Wire for IcbmEvilReply {
    fn encode<O: ByteOrder>(&self, dst: &mut Vec<u8>) -> Result<(), WireError> {
        O::put_u16(dst, self.evil_delta_applied);
        O::put_u16(dst, self.updated_evil_value);
        Ok(())
    }

    fn decode<O: ByteOrder>(src: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            evil_delta_applied: O::read_u16(src)?,
            updated_evil_value: O::read_u16(src)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::codec::{decode_be, encode_be};

    #[test]
    fn fragment_list_text_round_trips() {
        let wire = message_fragments("hello there").unwrap();
        assert_eq!(text_from_fragments(&wire).unwrap(), Some("hello there".to_owned()));
    }

    #[test]
    fn fragment_list_without_text_yields_none() {
        let caps_only = IcbmFragment {
            id: FRAGMENT_ID_CAPABILITIES,
            version: FRAGMENT_VERSION,
            payload: vec![0x01],
        };
        let wire = encode_be(&caps_only).unwrap();
        assert_eq!(text_from_fragments(&wire).unwrap(), None);
    }

    #[test]
    fn ch2_fragment_round_trips() {
        let fragment = IcbmCh2Fragment {
            rdv_type: RDV_TYPE_PROPOSE,
            cookie: *b"AAAABBBB",
            capability: Capability::CHAT,
            tlvs: vec![
                crate::tlv::new_tlv_be(RDV_TLV_SEQUENCE, &1u16).unwrap(),
                crate::tlv::new_tlv_be(RDV_TLV_INVITATION, "join us").unwrap(),
            ]
            .into(),
        };
        let wire = encode_be(&fragment).unwrap();
        let parsed = decode_be::<IcbmCh2Fragment>(&wire).unwrap();
        assert_eq!(parsed, fragment);
        assert_eq!(parsed.tlvs.u16_be(RDV_TLV_SEQUENCE), Some(1));
    }

    #[test]
    fn msg_to_host_round_trips() {
        let msg = IcbmChannelMsgToHost {
            cookie: [1; 8],
            channel: ICBM_CHANNEL_IM,
            screen_name: "bob".into(),
            tlvs: vec![crate::tlv::new_tlv_be::<[u8]>(ICBM_TLV_AUTO_RESPONSE, &[]).unwrap()]
                .into(),
        };
        let wire = encode_be(&msg).unwrap();
        assert_eq!(decode_be::<IcbmChannelMsgToHost>(&wire).unwrap(), msg);
    }
}

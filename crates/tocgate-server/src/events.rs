//! Asynchronous backend events rendered as TOC lines.
//!
//! The backend-listener task feeds BOS-session SNACs through
//! [`translate_bos_event`]; each chat relay feeds its room's SNACs through
//! [`translate_chat_event`]. Anything off-catalog is logged by name and
//! dropped.

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tocgate_core::{Session, SnacBody, SnacMessage};
use tocgate_proto::{
    Capability, TlvUserInfo,
    chat::{
        CHAT_TLV_SENDER_INFORMATION, ChatChannelMsgToClient, chat_message_text,
        room_name_from_cookie,
    },
    codec::decode_be,
    icbm::{
        ICBM_CHANNEL_IM, ICBM_CHANNEL_RENDEZVOUS, ICBM_TLV_AUTO_RESPONSE, ICBM_TLV_FRAGMENT_LIST,
        ICBM_TLV_RENDEZVOUS, IcbmCh2Fragment, IcbmChannelMsgToClient, RDV_TLV_INVITATION,
        RDV_TLV_PORT, RDV_TLV_RDV_IP, RDV_TLV_REQUESTER_IP, RDV_TLV_SEQUENCE, RDV_TLV_SVC_DATA,
        RDV_TLV_VERIFIED_IP, RDV_TYPE_PROPOSE, text_from_fragments,
    },
    oservice::{USER_FLAG_UNAVAILABLE, USER_INFO_FLAGS, USER_INFO_IDLE_TIME, USER_INFO_SIGNON_TOD},
};

use crate::chat_registry::ChatRegistry;

/// Translate a BOS-session SNAC into a TOC line; `None` drops it.
pub fn translate_bos_event(chats: &ChatRegistry, msg: &SnacMessage) -> Option<String> {
    match &msg.body {
        SnacBody::BuddyArrived(body) => Some(update_buddy_arrived(&body.user_info)),
        SnacBody::BuddyDeparted(body) => {
            Some(format!("UPDATE_BUDDY:{}:F:0:0:0:   ", body.user_info.screen_name))
        },
        SnacBody::EvilNotification(body) => {
            let snitcher =
                body.snitcher.as_ref().map(|info| info.screen_name.as_str()).unwrap_or_default();
            Some(format!("EVILED:{}:{snitcher}", body.new_evil / 10))
        },
        SnacBody::IcbmMessageToClient(body) => translate_icbm(chats, body),
        _ => {
            tracing::debug!(snac = msg.name(), "dropping unhandled backend SNAC");
            None
        },
    }
}

/// `UPDATE_BUDDY` line for an online user.
///
/// Fields: name, online flag, warning percent, sign-on epoch, idle
/// minutes, then the three-character class whose last character is `U` iff
/// the user is unavailable.
pub fn update_buddy_arrived(info: &TlvUserInfo) -> String {
    let signon = info.tlvs.u32_be(USER_INFO_SIGNON_TOD).unwrap_or(0);
    let idle = info.tlvs.u16_be(USER_INFO_IDLE_TIME).unwrap_or(0);
    let unavailable = info.tlvs.u16_be(USER_INFO_FLAGS).unwrap_or(0) & USER_FLAG_UNAVAILABLE != 0;
    let class = if unavailable { " OU" } else { " O " };
    format!(
        "UPDATE_BUDDY:{}:T:{}:{signon}:{idle}:{class}",
        info.screen_name,
        info.warning_level / 10
    )
}

fn translate_icbm(chats: &ChatRegistry, msg: &IcbmChannelMsgToClient) -> Option<String> {
    match msg.channel {
        ICBM_CHANNEL_IM => {
            let fragments = msg.tlvs.bytes(ICBM_TLV_FRAGMENT_LIST)?;
            let text = match text_from_fragments(fragments) {
                Ok(text) => text?,
                Err(err) => {
                    tracing::warn!(error = %err, "bad ICBM fragment list");
                    return None;
                },
            };
            let auto = if msg.tlvs.has_tag(ICBM_TLV_AUTO_RESPONSE) { "T" } else { "F" };
            Some(format!("IM_IN:{}:{auto}:{text}", msg.user_info.screen_name))
        },
        ICBM_CHANNEL_RENDEZVOUS => {
            let raw = msg.tlvs.bytes(ICBM_TLV_RENDEZVOUS)?;
            let fragment: IcbmCh2Fragment = match decode_be(raw) {
                Ok(fragment) => fragment,
                Err(err) => {
                    tracing::warn!(error = %err, "bad rendezvous fragment");
                    return None;
                },
            };
            if fragment.rdv_type != RDV_TYPE_PROPOSE {
                return None;
            }
            if fragment.capability == Capability::CHAT {
                chat_invite(chats, &msg.user_info.screen_name, &fragment)
            } else if fragment.capability == Capability::FILE_TRANSFER {
                Some(rvous_propose(&msg.user_info.screen_name, &fragment))
            } else {
                tracing::debug!(capability = %fragment.capability, "dropping rendezvous proposal");
                None
            }
        },
        channel => {
            tracing::debug!(channel, "dropping ICBM on unsupported channel");
            None
        },
    }
}

fn chat_invite(chats: &ChatRegistry, sender: &str, fragment: &IcbmCh2Fragment) -> Option<String> {
    let svc_data = fragment.tlvs.bytes(RDV_TLV_SVC_DATA)?;
    let room: tocgate_proto::chat::ChatRoomKey = decode_be(svc_data).ok()?;
    let prompt = fragment.tlvs.string(RDV_TLV_INVITATION).unwrap_or_default();
    let name = room_name_from_cookie(&room.cookie).to_owned();
    let chat_id = chats.add(room);
    Some(format!("CHAT_INVITE:{name}:{chat_id}:{sender}:{prompt}"))
}

fn rvous_propose(sender: &str, fragment: &IcbmCh2Fragment) -> String {
    let cookie = BASE64.encode(fragment.cookie);
    let sequence = fragment.tlvs.u16_be(RDV_TLV_SEQUENCE).unwrap_or(0);
    let rdv_ip = dotted_quad(fragment.tlvs.bytes(RDV_TLV_RDV_IP));
    let proposer_ip = dotted_quad(fragment.tlvs.bytes(RDV_TLV_REQUESTER_IP));
    let verified_ip = dotted_quad(fragment.tlvs.bytes(RDV_TLV_VERIFIED_IP));
    let port = fragment.tlvs.u16_be(RDV_TLV_PORT).unwrap_or(0);
    let meta = fragment.tlvs.bytes(RDV_TLV_SVC_DATA).unwrap_or_default();
    let meta = BASE64.encode(trim_trailing_nuls(meta));
    format!(
        "RVOUS_PROPOSE:{sender}:{}:{cookie}:{sequence}:{rdv_ip}:{proposer_ip}:{verified_ip}:{port}:{}:{meta}",
        fragment.capability, RDV_TLV_SVC_DATA
    )
}

fn dotted_quad(bytes: Option<&[u8]>) -> String {
    match bytes {
        Some([a, b, c, d]) => format!("{a}.{b}.{c}.{d}"),
        _ => "0.0.0.0".to_owned(),
    }
}

/// Strip trailing zero octets; legacy clients choke on padded blobs.
pub fn trim_trailing_nuls(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |pos| pos + 1);
    &bytes[..end]
}

/// Translate a chat-session SNAC into a TOC line; `None` drops it.
pub fn translate_chat_event(chat_id: u32, msg: &SnacMessage) -> Option<String> {
    match &msg.body {
        SnacBody::ChatUsersJoined(body) => Some(chat_update_buddy(chat_id, true, &body.users)),
        SnacBody::ChatUsersLeft(body) => Some(chat_update_buddy(chat_id, false, &body.users)),
        SnacBody::ChatMessageToClient(body) => chat_in(chat_id, body),
        _ => {
            tracing::debug!(snac = msg.name(), chat_id, "dropping unhandled chat SNAC");
            None
        },
    }
}

fn chat_update_buddy(chat_id: u32, joined: bool, users: &[TlvUserInfo]) -> String {
    let mut line = format!("CHAT_UPDATE_BUDDY:{chat_id}:{}", if joined { 'T' } else { 'F' });
    for user in users {
        line.push(':');
        line.push_str(&user.screen_name);
    }
    line
}

fn chat_in(chat_id: u32, msg: &ChatChannelMsgToClient) -> Option<String> {
    let sender = msg
        .tlvs
        .bytes(CHAT_TLV_SENDER_INFORMATION)
        .and_then(|raw| decode_be::<TlvUserInfo>(raw).ok())
        .map(|info| info.screen_name)?;
    let text = chat_message_text(&msg.tlvs)?;
    Some(format!("CHAT_IN:{chat_id}:{sender}:F:{text}"))
}

/// Forward one chat session's events into the connection's outbound queue
/// until the session closes or the connection cancels.
pub(crate) fn spawn_chat_relay(
    chat_id: u32,
    sess: Arc<Session>,
    reply_tx: mpsc::Sender<String>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                () = cancel.cancelled() => break,
                () = sess.closed() => break,
                msg = sess.recv_message() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };
            if let Some(line) = translate_chat_event(chat_id, &msg) {
                let sent = tokio::select! {
                    () = cancel.cancelled() => break,
                    sent = reply_tx.send(line) => sent,
                };
                if sent.is_err() {
                    break;
                }
            }
        }
        tracing::debug!(chat_id, "chat relay stopped");
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tocgate_proto::{
        SnacFrame,
        buddy::{BUDDY_ARRIVED, BuddyArrived, BuddyDeparted},
        chat::{CHAT_CHANNEL_MSG_TO_CLIENT, ChatUsersJoined, chat_message_info},
        codec::encode_be,
        icbm::message_fragments,
        new_tlv_be,
        oservice::OServiceEvilNotification,
        snac::{FOOD_GROUP_BUDDY, FOOD_GROUP_CHAT},
        tlv::new_record_tlv_be,
    };

    use super::*;

    fn user(name: &str, tlvs: Vec<tocgate_proto::Tlv>) -> TlvUserInfo {
        TlvUserInfo { screen_name: name.into(), warning_level: 30, tlvs: tlvs.into() }
    }

    fn bos_msg(body: SnacBody) -> SnacMessage {
        SnacMessage {
            frame: SnacFrame::new(FOOD_GROUP_BUDDY, BUDDY_ARRIVED).server_originated(),
            body,
        }
    }

    #[test]
    fn buddy_arrived_line() {
        let info = user(
            "alice",
            vec![
                new_tlv_be(USER_INFO_SIGNON_TOD, &1_700_000_000u32).unwrap(),
                new_tlv_be(USER_INFO_IDLE_TIME, &5u16).unwrap(),
            ],
        );
        let chats = ChatRegistry::new();
        let line =
            translate_bos_event(&chats, &bos_msg(SnacBody::BuddyArrived(BuddyArrived { user_info: info })));
        assert_eq!(line.unwrap(), "UPDATE_BUDDY:alice:T:3:1700000000:5: O ");
    }

    #[test]
    fn unavailable_buddy_gets_class_u() {
        let info = user("alice", vec![new_tlv_be(USER_INFO_FLAGS, &USER_FLAG_UNAVAILABLE).unwrap()]);
        let line = update_buddy_arrived(&info);
        assert!(line.ends_with(": OU"), "line was {line:?}");
    }

    #[test]
    fn buddy_departed_line() {
        let chats = ChatRegistry::new();
        let line = translate_bos_event(
            &chats,
            &bos_msg(SnacBody::BuddyDeparted(BuddyDeparted { user_info: user("bob", vec![]) })),
        );
        assert_eq!(line.unwrap(), "UPDATE_BUDDY:bob:F:0:0:0:   ");
    }

    #[test]
    fn eviled_line_with_and_without_snitcher() {
        let chats = ChatRegistry::new();
        let anonymous = translate_bos_event(
            &chats,
            &bos_msg(SnacBody::EvilNotification(OServiceEvilNotification {
                new_evil: 80,
                snitcher: None,
            })),
        );
        assert_eq!(anonymous.unwrap(), "EVILED:8:");

        let attributed = translate_bos_event(
            &chats,
            &bos_msg(SnacBody::EvilNotification(OServiceEvilNotification {
                new_evil: 80,
                snitcher: Some(user("karen", vec![])),
            })),
        );
        assert_eq!(attributed.unwrap(), "EVILED:8:karen");
    }

    #[test]
    fn im_in_with_auto_flag() {
        let fragments = message_fragments("hey").unwrap();
        let msg = IcbmChannelMsgToClient {
            cookie: [0; 8],
            channel: ICBM_CHANNEL_IM,
            user_info: user("carol", vec![]),
            tlvs: vec![
                new_tlv_be(ICBM_TLV_FRAGMENT_LIST, &fragments[..]).unwrap(),
                new_tlv_be::<[u8]>(ICBM_TLV_AUTO_RESPONSE, &[]).unwrap(),
            ]
            .into(),
        };
        let chats = ChatRegistry::new();
        let line = translate_bos_event(&chats, &bos_msg(SnacBody::IcbmMessageToClient(msg)));
        assert_eq!(line.unwrap(), "IM_IN:carol:T:hey");
    }

    #[test]
    fn chat_invite_registers_the_room() {
        let room = tocgate_proto::chat::ChatRoomKey {
            exchange: 4,
            cookie: "foo-bar-mychat".into(),
            instance: 0,
        };
        let fragment = IcbmCh2Fragment {
            rdv_type: RDV_TYPE_PROPOSE,
            cookie: [7; 8],
            capability: Capability::CHAT,
            tlvs: vec![
                new_tlv_be(RDV_TLV_INVITATION, "join us").unwrap(),
                new_record_tlv_be(RDV_TLV_SVC_DATA, &room).unwrap(),
            ]
            .into(),
        };
        let msg = IcbmChannelMsgToClient {
            cookie: [7; 8],
            channel: ICBM_CHANNEL_RENDEZVOUS,
            user_info: user("charlie", vec![]),
            tlvs: vec![new_tlv_be(ICBM_TLV_RENDEZVOUS, &encode_be(&fragment).unwrap()[..]).unwrap()]
                .into(),
        };

        let chats = ChatRegistry::new();
        let line =
            translate_bos_event(&chats, &bos_msg(SnacBody::IcbmMessageToClient(msg))).unwrap();
        let expected_id = chats.add(room.clone());
        assert_eq!(line, format!("CHAT_INVITE:mychat:{expected_id}:charlie:join us"));
        assert_eq!(chats.lookup_room(expected_id), Some(room));
    }

    #[test]
    fn file_transfer_propose_line() {
        let fragment = IcbmCh2Fragment {
            rdv_type: RDV_TYPE_PROPOSE,
            cookie: *b"RVCOOKIE",
            capability: Capability::FILE_TRANSFER,
            tlvs: vec![
                new_tlv_be(RDV_TLV_SEQUENCE, &1u16).unwrap(),
                new_tlv_be(RDV_TLV_REQUESTER_IP, &[10u8, 0, 0, 9][..]).unwrap(),
                new_tlv_be(RDV_TLV_PORT, &5190u16).unwrap(),
                new_tlv_be(RDV_TLV_SVC_DATA, &b"meta\0\0"[..]).unwrap(),
            ]
            .into(),
        };
        let msg = IcbmChannelMsgToClient {
            cookie: *b"RVCOOKIE",
            channel: ICBM_CHANNEL_RENDEZVOUS,
            user_info: user("dana", vec![]),
            tlvs: vec![new_tlv_be(ICBM_TLV_RENDEZVOUS, &encode_be(&fragment).unwrap()[..]).unwrap()]
                .into(),
        };

        let chats = ChatRegistry::new();
        let line =
            translate_bos_event(&chats, &bos_msg(SnacBody::IcbmMessageToClient(msg))).unwrap();
        let cookie = BASE64.encode(b"RVCOOKIE");
        let meta = BASE64.encode(b"meta");
        assert_eq!(
            line,
            format!(
                "RVOUS_PROPOSE:dana:09461343-4C7F-11D1-8222-444553540000:{cookie}:1:0.0.0.0:10.0.0.9:0.0.0.0:5190:10001:{meta}"
            )
        );
    }

    #[test]
    fn non_propose_rendezvous_dropped() {
        let fragment = IcbmCh2Fragment {
            rdv_type: tocgate_proto::icbm::RDV_TYPE_CANCEL,
            cookie: [0; 8],
            capability: Capability::CHAT,
            tlvs: vec![].into(),
        };
        let msg = IcbmChannelMsgToClient {
            cookie: [0; 8],
            channel: ICBM_CHANNEL_RENDEZVOUS,
            user_info: user("charlie", vec![]),
            tlvs: vec![new_tlv_be(ICBM_TLV_RENDEZVOUS, &encode_be(&fragment).unwrap()[..]).unwrap()]
                .into(),
        };
        let chats = ChatRegistry::new();
        assert!(translate_bos_event(&chats, &bos_msg(SnacBody::IcbmMessageToClient(msg))).is_none());
    }

    #[test]
    fn chat_events_render() {
        let joined = SnacMessage {
            frame: SnacFrame::new(FOOD_GROUP_CHAT, CHAT_CHANNEL_MSG_TO_CLIENT),
            body: SnacBody::ChatUsersJoined(ChatUsersJoined {
                users: vec![user("eve", vec![]), user("frank", vec![])],
            }),
        };
        assert_eq!(translate_chat_event(3, &joined).unwrap(), "CHAT_UPDATE_BUDDY:3:T:eve:frank");

        let sender = user("eve", vec![]);
        let chat_msg = SnacMessage {
            frame: SnacFrame::new(FOOD_GROUP_CHAT, CHAT_CHANNEL_MSG_TO_CLIENT),
            body: SnacBody::ChatMessageToClient(ChatChannelMsgToClient {
                cookie: [0; 8],
                channel: 3,
                tlvs: vec![
                    new_record_tlv_be(CHAT_TLV_SENDER_INFORMATION, &sender).unwrap(),
                    chat_message_info("hi room").unwrap(),
                ]
                .into(),
            }),
        };
        assert_eq!(translate_chat_event(3, &chat_msg).unwrap(), "CHAT_IN:3:eve:F:hi room");
    }

    #[test]
    fn trailing_nuls_trimmed() {
        assert_eq!(trim_trailing_nuls(b"abc\0\0"), b"abc");
        assert_eq!(trim_trailing_nuls(b"\0\0"), b"");
        assert_eq!(trim_trailing_nuls(b"a\0b"), b"a\0b");
    }
}

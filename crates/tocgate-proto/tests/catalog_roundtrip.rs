//! Round-trip coverage for every record in the catalog subset.

#![allow(clippy::unwrap_used)]

use tocgate_proto::{
    Capability, SnacError, SnacFrame, TlvBlock, TlvUserInfo,
    admin::{ADMIN_TLV_ERROR_CODE, ADMIN_TLV_NEW_PASSWORD, AdminInfoChangeReply, AdminInfoChangeRequest},
    buddy::{BuddyAddBuddies, BuddyArrived, BuddyDelBuddies, BuddyDeparted, BuddyName},
    chat::{
        CHAT_TLV_ROOM_NAME, ChatChannelMsgToClient, ChatChannelMsgToHost, ChatRoom, ChatRoomKey,
        ChatUsersJoined, ChatUsersLeft, chat_message_info,
    },
    chatnav::{CHAT_NAV_TLV_ROOM_INFO, ChatNavNavInfo, ChatNavRequestRoomInfo},
    codec::{decode_be, decode_le, encode_be, encode_le},
    flap::FlapSignonFrame,
    icbm::{
        ICBM_CHANNEL_IM, ICBM_CHANNEL_RENDEZVOUS, IcbmCh2Fragment, IcbmChannelMsgToClient,
        IcbmChannelMsgToHost, IcbmEvilReply, IcbmEvilRequest, IcbmFragment, IcbmMessageText,
        RDV_TLV_INVITATION, RDV_TYPE_PROPOSE,
    },
    icq::{IcqMessageReply, IcqMessageReplyEnvelope},
    locate::{LocateSetDirInfo, LocateSetInfo, LocateUserInfoQuery, LocateUserInfoReply},
    new_tlv_be,
    odir::{ODirInfoQuery, ODirInfoReply},
    oservice::{
        GroupVersion, OServiceClientOnline, OServiceEvilNotification, OServiceIdleNotification,
        OServiceServiceRequest, OServiceServiceResponse, SERVICE_RESPONSE_LOGIN_COOKIE,
        USER_INFO_FLAGS,
    },
    permit_deny::{PermitDenyAddDenyListEntries, PermitDenyAddPermListEntries},
    tlv::new_record_tlv_be,
};

fn round_trip<T>(value: &T)
where
    T: tocgate_proto::Wire + PartialEq + std::fmt::Debug,
{
    let be = encode_be(value).unwrap();
    assert_eq!(&decode_be::<T>(&be).unwrap(), value, "big-endian round trip");

    let le = encode_le(value).unwrap();
    assert_eq!(&decode_le::<T>(&le).unwrap(), value, "little-endian round trip");
}

fn user_info(name: &str) -> TlvUserInfo {
    TlvUserInfo {
        screen_name: name.to_owned(),
        warning_level: 20,
        tlvs: vec![new_tlv_be(USER_INFO_FLAGS, &0x0020u16).unwrap()].into(),
    }
}

fn room() -> ChatRoom {
    ChatRoom {
        exchange: 4,
        cookie: "4-7-observatory".into(),
        instance: 7,
        detail_level: 2,
        tlvs: vec![new_tlv_be(CHAT_TLV_ROOM_NAME, "observatory").unwrap()].into(),
    }
}

#[test]
fn flap_and_frame_records() {
    round_trip(&FlapSignonFrame {
        flap_version: 1,
        tlvs: vec![new_tlv_be(0x01, "alice").unwrap()].into(),
    });
    round_trip(&SnacFrame { food_group: 1, sub_group: 2, flags: 0, request_id: 9 });
    round_trip(&SnacError { code: 4, tlvs: vec![new_tlv_be(0x08, &1u16).unwrap()].into() });
}

#[test]
fn oservice_records() {
    round_trip(&OServiceClientOnline {
        group_versions: vec![GroupVersion { food_group: 1, version: 4 }],
    });
    round_trip(&OServiceServiceRequest {
        food_group: 0x000E,
        tlvs: vec![new_tlv_be(0x01, &[1u8, 2][..]).unwrap()].into(),
    });
    round_trip(&OServiceServiceResponse {
        tlvs: vec![new_tlv_be(SERVICE_RESPONSE_LOGIN_COOKIE, &[9u8; 12][..]).unwrap()].into(),
    });
    round_trip(&OServiceEvilNotification { new_evil: 100, snitcher: None });
    round_trip(&OServiceEvilNotification { new_evil: 100, snitcher: Some(user_info("karen")) });
    round_trip(&OServiceIdleNotification { idle_time: 600 });
    round_trip(&user_info("alice"));
}

#[test]
fn locate_records() {
    round_trip(&LocateSetInfo { tlvs: vec![new_tlv_be(0x02, "<html>hi</html>").unwrap()].into() });
    round_trip(&LocateSetDirInfo { tlvs: vec![new_tlv_be(0x01, "Ada").unwrap()].into() });
    round_trip(&LocateUserInfoQuery { query_type: 3, screen_name: "bob".into() });
    round_trip(&LocateUserInfoReply {
        user_info: user_info("bob"),
        locate_info: vec![new_tlv_be(0x02, "profile").unwrap()].into(),
    });
}

#[test]
fn buddy_and_permit_deny_records() {
    let names = vec![BuddyName::new("alice"), BuddyName::new("bob jr")];
    round_trip(&BuddyAddBuddies { buddies: names.clone() });
    round_trip(&BuddyDelBuddies { buddies: names.clone() });
    round_trip(&BuddyArrived { user_info: user_info("alice") });
    round_trip(&BuddyDeparted { user_info: user_info("alice") });
    round_trip(&PermitDenyAddPermListEntries { users: names.clone() });
    round_trip(&PermitDenyAddDenyListEntries { users: names });
}

#[test]
fn icbm_records() {
    round_trip(&IcbmChannelMsgToHost {
        cookie: [1; 8],
        channel: ICBM_CHANNEL_IM,
        screen_name: "bob".into(),
        tlvs: vec![new_tlv_be(0x02, &[0u8, 1][..]).unwrap()].into(),
    });
    round_trip(&IcbmChannelMsgToClient {
        cookie: [2; 8],
        channel: ICBM_CHANNEL_RENDEZVOUS,
        user_info: user_info("carol"),
        tlvs: vec![new_tlv_be(0x05, &[0u8][..]).unwrap()].into(),
    });
    round_trip(&IcbmFragment { id: 1, version: 1, payload: vec![0, 0, 0, 0, b'x'] });
    round_trip(&IcbmMessageText { charset: 0, lang: 0, text: b"hello".to_vec() });
    round_trip(&IcbmCh2Fragment {
        rdv_type: RDV_TYPE_PROPOSE,
        cookie: *b"COOKIE01",
        capability: Capability::CHAT,
        tlvs: vec![new_tlv_be(RDV_TLV_INVITATION, "join us").unwrap()].into(),
    });
    round_trip(&IcbmEvilRequest { send_as: 1, screen_name: "mallory".into() });
    round_trip(&IcbmEvilReply { evil_delta_applied: 30, updated_evil_value: 90 });
}

#[test]
fn admin_records() {
    round_trip(&AdminInfoChangeRequest {
        tlvs: vec![new_tlv_be(ADMIN_TLV_NEW_PASSWORD, "hunter2").unwrap()].into(),
    });
    round_trip(&AdminInfoChangeReply {
        permissions: 3,
        tlvs: vec![new_tlv_be(ADMIN_TLV_ERROR_CODE, &5u16).unwrap()].into(),
    });
}

#[test]
fn chat_records() {
    round_trip(&room());
    round_trip(&ChatRoomKey { exchange: 4, cookie: "4-7-observatory".into(), instance: 7 });
    round_trip(&ChatNavRequestRoomInfo {
        exchange: 4,
        cookie: "4-7-observatory".into(),
        instance: 7,
        detail_level: 2,
    });
    round_trip(&ChatNavNavInfo {
        tlvs: vec![new_record_tlv_be(CHAT_NAV_TLV_ROOM_INFO, &room()).unwrap()].into(),
    });
    round_trip(&ChatChannelMsgToHost {
        cookie: [3; 8],
        channel: 3,
        tlvs: vec![chat_message_info("hi all").unwrap()].into(),
    });
    round_trip(&ChatChannelMsgToClient {
        cookie: [3; 8],
        channel: 3,
        tlvs: vec![chat_message_info("hi all").unwrap()].into(),
    });
    round_trip(&ChatUsersJoined { users: vec![user_info("eve"), user_info("frank")] });
    round_trip(&ChatUsersLeft { users: vec![user_info("eve")] });
}

#[test]
fn odir_records() {
    round_trip(&ODirInfoQuery { tlvs: vec![new_tlv_be(0x01, "Ada").unwrap()].into() });
    round_trip(&ODirInfoReply {
        status: 1,
        results: vec![TlvBlock::from(vec![new_tlv_be(0x01, "Ada").unwrap()])],
    });
}

#[test]
fn icq_envelope_round_trips_bit_identical() {
    let envelope = IcqMessageReplyEnvelope {
        message: IcqMessageReply {
            uin: 123_456,
            message_type: 1,
            sequence: 2,
            payload: vec![1, 2, 3],
        },
    };
    round_trip(&envelope);
    // Both entry points must produce identical bytes for this record.
    assert_eq!(encode_be(&envelope).unwrap(), encode_le(&envelope).unwrap());
}

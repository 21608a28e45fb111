// crates/oms-protocol/tests/codec.rs
use std::collections::BTreeMap;

use oms_protocol::tags::{self, msg_type};
use oms_protocol::{checksum, decode, encode, verify_checksum, ParseError, Tag, WireMessage};
use proptest::prelude::*;

fn text(bytes: &[u8]) -> &str {
    std::str::from_utf8(bytes).unwrap()
}

#[test]
fn encodes_known_execution_report() {
    let msg = WireMessage::of_type(msg_type::EXECUTION_REPORT)
        .with(tags::SIDE, "1")
        .with(tags::PRICE, "100.00");

    assert_eq!(
        text(&msg.encoded()),
        "8=FIX.4.4;9=20;35=8;44=100.00;54=1;10=151;"
    );
}

#[test]
fn body_pairs_are_written_in_ascending_tag_order() {
    let msg = WireMessage::new()
        .with(tags::MSG_TYPE, "D")
        .with(tags::CL_ORD_ID, "ORD1");

    assert_eq!(text(&encode(&msg)), "8=FIX.4.4;9=13;11=ORD1;35=D;10=132;");
}

#[test]
fn checksum_field_is_sum_of_preceding_bytes() {
    let msg = WireMessage::of_type(msg_type::NEW_ORDER_SINGLE)
        .with(tags::CL_ORD_ID, "abcdef")
        .with(tags::ORDER_QTY, "250")
        .with(tags::CURRENCY, "GBP");
    let frame = msg.encoded();

    let start = frame.len() - "10=000;".len();
    assert_eq!(&frame[start..start + 3], b"10=");
    let declared: u32 = text(&frame[start + 3..frame.len() - 1]).parse().unwrap();
    assert_eq!(declared, u32::from(checksum(&frame[..start])));
    assert_eq!(verify_checksum(&frame), Ok(()));
}

#[test]
fn body_length_counts_bytes_between_length_and_checksum() {
    let msg = WireMessage::of_type("D").with(tags::TEXT, "hello world");
    let frame = msg.encoded();
    let decoded_text = text(&frame);

    let body_start = decoded_text.find("35=").unwrap();
    let body_end = decoded_text.rfind("10=").unwrap();
    let declared = decoded_text
        .strip_prefix("8=FIX.4.4;9=")
        .and_then(|rest| rest.split(';').next())
        .unwrap();

    assert_eq!(declared.parse::<usize>().unwrap(), body_end - body_start);
}

#[test]
fn reserved_tags_cannot_be_set() {
    let mut msg = WireMessage::of_type("D");
    assert!(!msg.set(tags::BEGIN_STRING, "FIX.4.2"));
    assert!(!msg.set(tags::BODY_LENGTH, "999"));
    assert!(!msg.set(tags::CHECKSUM, "000"));
    assert_eq!(msg.len(), 1);
}

#[test]
fn values_containing_the_delimiter_are_refused() {
    let mut msg = WireMessage::new();
    assert!(!msg.set(tags::TEXT, "a;b"));
    assert!(!msg.has(tags::TEXT));
}

#[test]
fn decode_tolerates_reserved_tags_anywhere_and_any_order() {
    let msg = decode(b"54=1;10=000;35=D;9=1;11=X;8=FIX.4.2;").unwrap();

    assert_eq!(msg.msg_type(), Some("D"));
    assert_eq!(msg.get(tags::CL_ORD_ID), Some("X"));
    assert_eq!(msg.get(tags::SIDE), Some("1"));
    assert!(!msg.has(tags::BEGIN_STRING));
    assert!(!msg.has(tags::CHECKSUM));
    assert_eq!(msg.len(), 3);
}

#[test]
fn decode_keeps_equals_signs_inside_values() {
    let msg = decode(b"35=QR;10002=a=b;").unwrap();
    assert_eq!(msg.get(tags::ADMIN_RESPONSE), Some("a=b"));
}

#[test]
fn decode_rejects_pair_without_separator() {
    assert_eq!(
        decode(b"35=D;garbage;"),
        Err(ParseError::MissingSeparator("garbage".to_string()))
    );
}

#[test]
fn decode_rejects_non_numeric_and_negative_tags() {
    assert_eq!(
        decode(b"abc=1;"),
        Err(ParseError::InvalidTag("abc".to_string()))
    );
    assert_eq!(
        decode(b"-5=1;"),
        Err(ParseError::InvalidTag("-5".to_string()))
    );
}

#[test]
fn decode_rejects_invalid_utf8() {
    assert_eq!(decode(&[b'3', b'5', b'=', 0xff, b';']), Err(ParseError::InvalidUtf8));
}

#[test]
fn verify_checksum_reports_mismatch() {
    let err = verify_checksum(b"8=FIX.4.4;9=20;35=8;44=100.00;54=1;10=150;").unwrap_err();
    assert_eq!(
        err,
        ParseError::ChecksumMismatch {
            declared: 150,
            computed: 151
        }
    );
}

#[test]
fn verify_checksum_requires_trailer() {
    assert_eq!(verify_checksum(b"35=D;11=X;"), Err(ParseError::MissingChecksum));
    assert_eq!(verify_checksum(b"35=D;10=1x1;"), Err(ParseError::MissingChecksum));
}

#[test]
fn mutation_invalidates_cached_encoding() {
    let mut msg = WireMessage::of_type("D").with(tags::CL_ORD_ID, "A");
    let before = msg.encoded();

    msg.set(tags::CL_ORD_ID, "B");
    let after = msg.encoded();

    assert_ne!(before, after);
    assert_eq!(decode(&after).unwrap().get(tags::CL_ORD_ID), Some("B"));

    msg.remove(tags::CL_ORD_ID);
    assert!(!text(&msg.encoded()).contains("11="));
}

#[test]
fn decoded_frame_reencodes_identically() {
    let frame = b"8=FIX.4.4;9=20;35=8;44=100.00;54=1;10=151;";
    let msg = decode(frame).unwrap();
    assert_eq!(&msg.encoded()[..], &frame[..]);
}

fn body_pairs() -> impl Strategy<Value = BTreeMap<Tag, String>> {
    prop::collection::btree_map(
        (1u32..20_000).prop_filter("reserved", |tag| !tags::is_reserved(*tag)),
        "[A-Za-z0-9 ._=-]{0,16}",
        0..12,
    )
}

proptest! {
    #[test]
    fn round_trip_preserves_pairs(pairs in body_pairs()) {
        let msg: WireMessage = pairs.clone().into_iter().collect();
        let frame = msg.encoded();

        prop_assert_eq!(verify_checksum(&frame), Ok(()));

        let decoded = decode(&frame).unwrap();
        let decoded_pairs: BTreeMap<Tag, String> = decoded
            .iter()
            .map(|(tag, value)| (tag, value.to_string()))
            .collect();
        prop_assert_eq!(decoded_pairs, pairs);
    }
}

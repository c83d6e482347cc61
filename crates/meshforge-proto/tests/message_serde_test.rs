//! Serialization tests for messages.
//!
//! Messages may be captured by test harnesses and replayed later, so the
//! encoded form must stay compact and stable: the kind is encoded as its
//! numeric discriminant, not as a variant name.

use bytes::Bytes;
use meshforge_proto::{Message, MessageType};
use proptest::prelude::*;

fn encode<T: serde::Serialize>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).expect("encoding should succeed");
    buf
}

#[test]
fn message_type_encodes_as_integer() {
    let encoded = encode(&MessageType::Heartbeat);
    let value: ciborium::Value = ciborium::from_reader(encoded.as_slice()).expect("decode");

    assert_eq!(value, ciborium::Value::Integer(8.into()));
}

#[test]
fn unknown_message_type_fails_to_decode() {
    let encoded = encode(&200u8);
    let result: Result<MessageType, _> = ciborium::from_reader(encoded.as_slice());

    assert!(result.is_err());
}

#[test]
fn payload_survives_encoding() {
    let msg = Message::new(MessageType::AppendEntries, "node-1", "node-2", Bytes::from_static(b"entry"))
        .with_term(3);

    let decoded: Message = ciborium::from_reader(encode(&msg).as_slice()).expect("decode");

    assert_eq!(decoded, msg);
}

proptest! {
    #[test]
    fn prop_message_type_byte_mapping(byte in any::<u8>()) {
        match MessageType::try_from(byte) {
            Ok(kind) => prop_assert_eq!(u8::from(kind), byte),
            Err(err) => {
                prop_assert!(byte > 9);
                prop_assert_eq!(err.0, byte);
            },
        }
    }
}

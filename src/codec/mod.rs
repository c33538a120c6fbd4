//! The binary codec (§4.7-§4.10): preamble framing, size calculation,
//! serialization, and deserialization.
//!
//! Split into submodules the way the teacher's `mcap2arrow-core::schema`
//! splits `types`/`format` out of one concern: [`framing`] is the
//! preamble's bit-level constants, [`resolve`] applies §4.8's default-value
//! rule once so [`size`] and [`encode`] can share a single resolved value
//! walk (keeping `serializedMessageSize`/`serializeMessage` in lockstep per
//! §8 invariant 1), and [`decode`] is the independent read path.

mod decode;
mod encode;
mod framing;
mod resolve;
mod size;

pub use decode::deserialize_message;
pub use encode::{serialize_message, serialized_message_size};
pub use framing::{decode_size_and_variant, encode_size_and_variant, HEADER_SIZE, MAGIC};

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::index::create_schema_maps;
    use crate::message::OutgoingMessage;
    use crate::value::{FieldValue, NumericArray};

    use super::*;

    fn schema(src: &str) -> crate::index::SchemaIndex {
        let entities = crate::parse(src).expect("test schema parses");
        create_schema_maps(entities)
    }

    /// Scenario A: `struct a { string b; bool c; }`.
    #[test]
    fn scenario_a_simple_struct() {
        let index = schema("struct a { string b; bool c; }");
        let mut message = HashMap::new();
        message.insert("b".to_string(), FieldValue::Str("Hello, world!".to_string()));
        message.insert("c".to_string(), FieldValue::Bool(true));
        let msg = OutgoingMessage::new("a", 1.0, message);

        let size = serialized_message_size(&index, &msg).unwrap();
        assert_eq!(size, 42);

        let bytes = serialize_message(&index, &msg).unwrap();
        assert_eq!(bytes.len(), 42);
        assert_eq!(&bytes[0..4], &MAGIC.to_le_bytes());

        let decoded = deserialize_message(&index, &bytes, None).unwrap();
        assert_eq!(decoded.size, 42);
        assert_eq!(decoded.variant, 0);
        assert_eq!(decoded.message.get("c"), Some(&FieldValue::Bool(true)));
        assert_eq!(
            decoded.message.get("b"),
            Some(&FieldValue::Str("Hello, world!".to_string()))
        );

        // Post-edit the sizeAndVariant word to (9<<27)|42 (§8 invariant 5, Scenario A).
        let mut edited = bytes.clone();
        let word = (9u32 << 27) | 42;
        edited[4..8].copy_from_slice(&word.to_le_bytes());
        let redecoded = deserialize_message(&index, &edited, None).unwrap();
        assert_eq!(redecoded.size, 42);
        assert_eq!(redecoded.variant, 9);
    }

    /// Scenario B: a `@naked` nested struct contributes its payload directly,
    /// with no inner preamble.
    #[test]
    fn scenario_b_nested_naked() {
        let index = schema(
            "struct nested @naked { string text; } struct outer { nested n; }",
        );
        let mut inner = HashMap::new();
        inner.insert("text".to_string(), FieldValue::Str("hi".to_string()));
        let mut message = HashMap::new();
        message.insert("n".to_string(), FieldValue::Struct(inner));
        let msg = OutgoingMessage::new("outer", 0.0, message);

        let bytes = serialize_message(&index, &msg).unwrap();
        // header(24) + string len prefix(4) + "hi"(2) = 30, no inner preamble.
        assert_eq!(bytes.len(), 30);
        assert_eq!(serialized_message_size(&index, &msg).unwrap(), 30);
    }

    /// Scenario C: a non-naked nested struct carries its own preamble with
    /// `timestamp = 0.0`.
    #[test]
    fn scenario_c_nested_non_naked() {
        let index = schema("struct nested { string text; } struct outer { nested n; }");
        let mut inner = HashMap::new();
        inner.insert("text".to_string(), FieldValue::Str("hi".to_string()));
        let mut message = HashMap::new();
        message.insert("n".to_string(), FieldValue::Struct(inner));
        let msg = OutgoingMessage::new("outer", 0.0, message);

        let bytes = serialize_message(&index, &msg).unwrap();
        // outer header(24) + nested header(24) + string len(4) + "hi"(2) = 54.
        assert_eq!(bytes.len(), 54);
        let nested_magic = &bytes[24..28];
        assert_eq!(nested_magic, &MAGIC.to_le_bytes());
        let nested_timestamp = f64::from_le_bytes(bytes[40..48].try_into().unwrap());
        assert_eq!(nested_timestamp, 0.0);

        let decoded = deserialize_message(&index, &bytes, None).unwrap();
        let FieldValue::Struct(nested) = decoded.message.get("n").unwrap() else {
            panic!("expected nested struct");
        };
        assert_eq!(nested.get("text"), Some(&FieldValue::Str("hi".to_string())));
    }

    /// Scenario D: a fixed short_string array has no element count prefix,
    /// and every element is exactly 16 bytes.
    #[test]
    fn scenario_d_fixed_short_string_array() {
        let index = schema("struct a { short_string names[2]; }");
        let mut message = HashMap::new();
        message.insert(
            "names".to_string(),
            FieldValue::ArrayStr(vec!["ab".to_string(), "1234567890123456789".to_string()]),
        );
        let msg = OutgoingMessage::new("a", 0.0, message);

        let bytes = serialize_message(&index, &msg).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + 32);

        let decoded = deserialize_message(&index, &bytes, None).unwrap();
        let FieldValue::ArrayStr(names) = decoded.message.get("names").unwrap() else {
            panic!("expected string array");
        };
        assert_eq!(names[0], "ab");
        assert_eq!(names[1], "1234567890123456");
    }

    #[test]
    fn missing_fields_use_declared_default_then_zero() {
        let index = schema("struct a { u32 x = 7; bool y; string z; }");
        let msg = OutgoingMessage::new("a", 0.0, HashMap::new());
        let size = serialized_message_size(&index, &msg).unwrap();
        assert_eq!(size, HEADER_SIZE + 4 + 1 + 4);

        let bytes = serialize_message(&index, &msg).unwrap();
        assert_eq!(bytes.len(), size);
        let decoded = deserialize_message(&index, &bytes, None).unwrap();
        assert_eq!(decoded.message.get("x"), Some(&FieldValue::U32(7)));
        assert_eq!(decoded.message.get("y"), Some(&FieldValue::Bool(false)));
        assert_eq!(decoded.message.get("z"), Some(&FieldValue::Str(String::new())));
    }

    #[test]
    fn numeric_array_zero_copy_view_aliases_aligned_buffer() {
        let index = schema("struct a { u32 pad; u32 xs[4]; }");
        let mut message = HashMap::new();
        message.insert("pad".to_string(), FieldValue::U32(0));
        message.insert(
            "xs".to_string(),
            FieldValue::ArrayU32(NumericArray::Owned(vec![1, 2, 3, 4])),
        );
        let msg = OutgoingMessage::new("a", 0.0, message);
        let bytes = serialize_message(&index, &msg).unwrap();

        let decoded = deserialize_message(&index, &bytes, None).unwrap();
        let FieldValue::ArrayU32(xs) = decoded.message.get("xs").unwrap() else {
            panic!("expected u32 array");
        };
        assert!(matches!(xs, NumericArray::Borrowed(_)));
        assert_eq!(xs.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn numeric_array_copies_when_offset_misaligned() {
        // A leading `u8` field shifts the `u32` array off a 4-byte boundary.
        let index = schema("struct a { u8 pad; u32 xs[3]; }");
        let mut message = HashMap::new();
        message.insert("pad".to_string(), FieldValue::U8(1));
        message.insert(
            "xs".to_string(),
            FieldValue::ArrayU32(NumericArray::Owned(vec![10, 20, 30])),
        );
        let msg = OutgoingMessage::new("a", 0.0, message);
        let bytes = serialize_message(&index, &msg).unwrap();

        let decoded = deserialize_message(&index, &bytes, None).unwrap();
        let FieldValue::ArrayU32(xs) = decoded.message.get("xs").unwrap() else {
            panic!("expected u32 array");
        };
        assert!(matches!(xs, NumericArray::Owned(_)));
        assert_eq!(xs.as_slice(), &[10, 20, 30]);
    }

    #[test]
    fn decode_rejects_bad_magic() {
        let index = schema("struct a { bool b; }");
        let mut bytes = vec![0u8; HEADER_SIZE + 1];
        bytes[4..8].copy_from_slice(&encode_size_and_variant(HEADER_SIZE + 1).to_le_bytes());
        let err = deserialize_message(&index, &bytes, None).unwrap_err();
        assert!(matches!(err, crate::error::CbufError::BadMagic { .. }));
    }

    #[test]
    fn decode_rejects_size_exceeding_buffer() {
        let index = schema("struct a { bool b; }");
        let mut bytes = vec![0u8; HEADER_SIZE + 1];
        bytes[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        bytes[4..8].copy_from_slice(&encode_size_and_variant(999).to_le_bytes());
        let err = deserialize_message(&index, &bytes, None).unwrap_err();
        assert!(matches!(err, crate::error::CbufError::SizeExceedsBuffer { .. }));
    }

    #[test]
    fn decode_rejects_unknown_hash() {
        let index = schema("struct a { bool b; }");
        let mut message = HashMap::new();
        message.insert("b".to_string(), FieldValue::Bool(true));
        let msg = OutgoingMessage::new("a", 0.0, message);
        let mut bytes = serialize_message(&index, &msg).unwrap();
        bytes[8..16].copy_from_slice(&0xDEAD_BEEFu64.to_le_bytes());
        let err = deserialize_message(&index, &bytes, None).unwrap_err();
        assert!(matches!(err, crate::error::CbufError::HashNotFound(_)));
    }

    #[test]
    fn decode_recognizes_metadata_by_hash_without_a_registered_schema() {
        let index = schema("struct unrelated { bool b; }");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC.to_le_bytes());
        let msg_name = "cbufmsg::metadata";
        let payload_len = 8 + 4 + 8 /* msg_hash + msg_name prefix+body + msg_meta prefix */;
        let _ = payload_len; // computed explicitly below for clarity
        let mut payload = Vec::new();
        payload.extend_from_slice(&crate::index::METADATA_HASH.to_le_bytes());
        payload.extend_from_slice(&(msg_name.len() as u32).to_le_bytes());
        payload.extend_from_slice(msg_name.as_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes());
        let total = HEADER_SIZE + payload.len();
        bytes.extend_from_slice(&encode_size_and_variant(total).to_le_bytes());
        bytes.extend_from_slice(&crate::index::METADATA_HASH.to_le_bytes());
        bytes.extend_from_slice(&0.0f64.to_le_bytes());
        bytes.extend_from_slice(&payload);

        let decoded = deserialize_message(&index, &bytes, None).unwrap();
        assert_eq!(decoded.type_name, "cbufmsg::metadata");
        assert_eq!(
            decoded.message.get("msg_name"),
            Some(&FieldValue::Str(msg_name.to_string()))
        );
    }
}

//! The caller-facing message records (§3 "Binary message", §6.1): the
//! input to [`crate::codec::serialize_message`]/[`crate::codec::serialized_message_size`]
//! and the output of [`crate::codec::deserialize_message`].

use crate::value::FieldMap;

/// A message to be serialized. Only `type_name`, `timestamp`, and `message`
/// are required on the input side (§3) — `size`, `variant`, and `hash_value`
/// are derived from the schema and written by the encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage<'a> {
    pub type_name: String,
    pub timestamp: f64,
    pub message: FieldMap<'a>,
}

impl<'a> OutgoingMessage<'a> {
    pub fn new(type_name: impl Into<String>, timestamp: f64, message: FieldMap<'a>) -> Self {
        Self {
            type_name: type_name.into(),
            timestamp,
            message,
        }
    }
}

/// A message produced by [`crate::codec::deserialize_message`]. Carries the
/// framing fields read from the preamble in addition to the decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMessage<'a> {
    pub type_name: String,
    pub size: usize,
    pub variant: u8,
    pub hash_value: u64,
    pub timestamp: f64,
    pub message: FieldMap<'a>,
}

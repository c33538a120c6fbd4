//! Serialization (§4.8): writes a resolved field map out as bytes, walking
//! the same field shapes [`super::size::naked_size`] measures.

use crate::ast::{FieldDef, FieldType, SchemaEntity};
use crate::error::CbufError;
use crate::index::SchemaIndex;
use crate::message::OutgoingMessage;
use crate::value::{FieldMap, FieldValue, NumericArray};

use super::framing::{encode_size_and_variant, HEADER_SIZE, MAGIC};
use super::resolve::resolve_struct;
use super::size::naked_size;

/// `serializedMessageSize` (§6.1, §4.9).
pub fn serialized_message_size(index: &SchemaIndex, msg: &OutgoingMessage) -> Result<usize, CbufError> {
    let entity = lookup(index, &msg.type_name)?;
    let resolved = resolve_struct(index, entity, &msg.message)?;
    Ok(HEADER_SIZE + naked_size(index, entity, &resolved))
}

/// `serializeMessage` (§6.1, §4.7-§4.8). Allocates exactly
/// `serializedMessageSize`'s worth of bytes and fully fills them (§4.9).
pub fn serialize_message(index: &SchemaIndex, msg: &OutgoingMessage) -> Result<Vec<u8>, CbufError> {
    let entity = lookup(index, &msg.type_name)?;
    if entity.is_naked_struct {
        return Err(CbufError::UnsupportedType {
            field: entity.qualified_name.clone(),
        });
    }
    let resolved = resolve_struct(index, entity, &msg.message)?;
    let payload_size = naked_size(index, entity, &resolved);
    let total = HEADER_SIZE + payload_size;

    let mut buf = Vec::with_capacity(total);
    buf.extend_from_slice(&MAGIC.to_le_bytes());
    buf.extend_from_slice(&encode_size_and_variant(total).to_le_bytes());
    buf.extend_from_slice(&entity.hash_value.to_le_bytes());
    buf.extend_from_slice(&msg.timestamp.to_le_bytes());
    write_struct_naked(&mut buf, index, entity, &resolved);

    debug_assert_eq!(buf.len(), total, "encoder must fill exactly the computed size");
    Ok(buf)
}

fn lookup<'b>(index: &'b SchemaIndex, type_name: &str) -> Result<&'b SchemaEntity, CbufError> {
    index.get_by_name(type_name).ok_or_else(|| CbufError::UnknownMessageType {
        type_name: type_name.to_string(),
    })
}

pub(super) fn write_struct_naked(
    buf: &mut Vec<u8>,
    index: &SchemaIndex,
    entity: &SchemaEntity,
    values: &FieldMap,
) {
    for field in &entity.fields {
        write_field(
            buf,
            index,
            field,
            values.get(&field.name).expect("resolve_struct fills every declared field"),
        );
    }
}

fn write_struct_wire(buf: &mut Vec<u8>, index: &SchemaIndex, entity: &SchemaEntity, values: &FieldMap) {
    if entity.is_naked_struct {
        write_struct_naked(buf, index, entity, values);
        return;
    }
    let payload = naked_size(index, entity, values);
    buf.extend_from_slice(&MAGIC.to_le_bytes());
    buf.extend_from_slice(&encode_size_and_variant(HEADER_SIZE + payload).to_le_bytes());
    buf.extend_from_slice(&entity.hash_value.to_le_bytes());
    // Nested preambles carry no real timestamp (§4.7).
    buf.extend_from_slice(&0.0f64.to_le_bytes());
    write_struct_naked(buf, index, entity, values);
}

fn write_array_prefix(buf: &mut Vec<u8>, field: &FieldDef, len: usize) {
    if field.array_length.is_none() {
        buf.extend_from_slice(&(len as u32).to_le_bytes());
    }
}

fn write_string(buf: &mut Vec<u8>, upper_bound: Option<usize>, s: &str) {
    match upper_bound {
        Some(n) => {
            let bytes = s.as_bytes();
            let take = bytes.len().min(n);
            buf.extend_from_slice(&bytes[..take]);
            buf.resize(buf.len() + (n - take), 0);
        }
        None => {
            buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
            buf.extend_from_slice(s.as_bytes());
        }
    }
}

fn nested_entity<'b>(index: &'b SchemaIndex, field: &FieldDef) -> &'b SchemaEntity {
    let FieldType::Complex(name) = &field.ty else {
        unreachable!("write_field only reaches nested_entity for Struct/ArrayStruct values")
    };
    index
        .get_by_name(name)
        .expect("resolve_struct already validated this nested type exists")
}

fn write_numeric_slice<T: Copy>(buf: &mut Vec<u8>, values: &NumericArray<T>, to_le: impl Fn(T) -> Vec<u8>) {
    for v in values.as_slice() {
        buf.extend_from_slice(&to_le(*v));
    }
}

fn write_field(buf: &mut Vec<u8>, index: &SchemaIndex, field: &FieldDef, value: &FieldValue) {
    match value {
        FieldValue::Bool(b) => buf.push(*b as u8),
        FieldValue::I8(v) => buf.push(*v as u8),
        FieldValue::U8(v) => buf.push(*v),
        FieldValue::I16(v) => buf.extend_from_slice(&v.to_le_bytes()),
        FieldValue::U16(v) => buf.extend_from_slice(&v.to_le_bytes()),
        FieldValue::I32(v) => buf.extend_from_slice(&v.to_le_bytes()),
        FieldValue::U32(v) => buf.extend_from_slice(&v.to_le_bytes()),
        FieldValue::I64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        FieldValue::U64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        FieldValue::F32(v) => buf.extend_from_slice(&v.to_le_bytes()),
        FieldValue::F64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        FieldValue::Str(s) => write_string(buf, field.upper_bound, s),
        FieldValue::ArrayBool(v) => {
            write_array_prefix(buf, field, v.len());
            for b in v {
                buf.push(*b as u8);
            }
        }
        FieldValue::ArrayI8(a) => {
            write_array_prefix(buf, field, a.len());
            write_numeric_slice(buf, a, |v| vec![v as u8]);
        }
        FieldValue::ArrayU8(a) => {
            write_array_prefix(buf, field, a.len());
            write_numeric_slice(buf, a, |v| vec![v]);
        }
        FieldValue::ArrayI16(a) => {
            write_array_prefix(buf, field, a.len());
            write_numeric_slice(buf, a, |v| v.to_le_bytes().to_vec());
        }
        FieldValue::ArrayU16(a) => {
            write_array_prefix(buf, field, a.len());
            write_numeric_slice(buf, a, |v| v.to_le_bytes().to_vec());
        }
        FieldValue::ArrayI32(a) => {
            write_array_prefix(buf, field, a.len());
            write_numeric_slice(buf, a, |v| v.to_le_bytes().to_vec());
        }
        FieldValue::ArrayU32(a) => {
            write_array_prefix(buf, field, a.len());
            write_numeric_slice(buf, a, |v| v.to_le_bytes().to_vec());
        }
        FieldValue::ArrayF32(a) => {
            write_array_prefix(buf, field, a.len());
            write_numeric_slice(buf, a, |v| v.to_le_bytes().to_vec());
        }
        FieldValue::ArrayI64(a) => {
            write_array_prefix(buf, field, a.len());
            write_numeric_slice(buf, a, |v| v.to_le_bytes().to_vec());
        }
        FieldValue::ArrayU64(a) => {
            write_array_prefix(buf, field, a.len());
            write_numeric_slice(buf, a, |v| v.to_le_bytes().to_vec());
        }
        FieldValue::ArrayF64(a) => {
            write_array_prefix(buf, field, a.len());
            write_numeric_slice(buf, a, |v| v.to_le_bytes().to_vec());
        }
        FieldValue::ArrayStr(v) => {
            write_array_prefix(buf, field, v.len());
            for s in v {
                write_string(buf, field.upper_bound, s);
            }
        }
        FieldValue::ArrayStruct(elems) => {
            write_array_prefix(buf, field, elems.len());
            let nested = nested_entity(index, field);
            for elem in elems {
                write_struct_wire(buf, index, nested, elem);
            }
        }
        FieldValue::Struct(inner) => {
            let nested = nested_entity(index, field);
            write_struct_wire(buf, index, nested, inner);
        }
    }
}

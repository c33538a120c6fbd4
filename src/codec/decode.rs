//! Deserialization (§4.10): reads a preamble, looks the struct up by hash,
//! and walks the field list to build a [`FieldMap`]. Numeric primitive
//! arrays alias the input buffer when the cursor position is naturally
//! aligned for the element type, and are copied otherwise (§4.8, §9).

use std::borrow::Cow;
use std::collections::HashMap;

use crate::ast::{FieldDef, FieldType, PrimitiveTag, SchemaEntity};
use crate::error::CbufError;
use crate::index::{metadata_schema, SchemaIndex, METADATA_HASH};
use crate::message::BinaryMessage;
use crate::value::{FieldMap, FieldValue, NumericArray};

use super::framing::{decode_size_and_variant, HEADER_SIZE, MAGIC};

/// `deserializeMessage` (§6.1, §4.10).
pub fn deserialize_message<'a>(
    index: &SchemaIndex,
    bytes: &'a [u8],
    offset: Option<usize>,
) -> Result<BinaryMessage<'a>, CbufError> {
    let start = offset.unwrap_or(0);
    let region = bytes.get(start..).ok_or(CbufError::BufferTooSmall {
        needed: HEADER_SIZE,
        available: 0,
    })?;
    if region.len() < HEADER_SIZE {
        return Err(CbufError::BufferTooSmall {
            needed: HEADER_SIZE,
            available: region.len(),
        });
    }

    let mut cursor = Cursor::new(region);
    let magic = cursor.u32()?;
    if magic != MAGIC {
        return Err(CbufError::BadMagic {
            expected: MAGIC,
            found: magic,
        });
    }
    let word = cursor.u32()?;
    let (size, variant) = decode_size_and_variant(word);
    let hash_value = cursor.u64()?;
    let timestamp = cursor.f64()?;

    if size > region.len() {
        return Err(CbufError::SizeExceedsBuffer {
            size,
            available: region.len(),
        });
    }

    let entity = lookup_entity(index, hash_value)?;
    let message = decode_struct(&mut cursor, index, &entity)?;

    let consumed = cursor.pos;
    if consumed != size {
        return Err(CbufError::SizeMismatch {
            expected: size,
            actual: consumed,
        });
    }

    Ok(BinaryMessage {
        type_name: entity.qualified_name.clone(),
        size,
        variant,
        hash_value,
        timestamp,
        message,
    })
}

fn lookup_entity(index: &SchemaIndex, hash_value: u64) -> Result<Cow<'_, SchemaEntity>, CbufError> {
    if let Some(e) = index.get_by_hash(hash_value) {
        return Ok(Cow::Borrowed(e));
    }
    if hash_value == METADATA_HASH {
        return Ok(Cow::Owned(metadata_schema()));
    }
    Err(CbufError::HashNotFound(hash_value))
}

fn unknown_type(name: &str) -> CbufError {
    CbufError::UnknownMessageType {
        type_name: name.to_string(),
    }
}

fn lookup_nested<'b>(index: &'b SchemaIndex, name: &str) -> Result<Cow<'b, SchemaEntity>, CbufError> {
    index
        .get_by_name(name)
        .map(Cow::Borrowed)
        .ok_or_else(|| unknown_type(name))
}

/// A read-only cursor over the caller's buffer. Numeric array reads hand
/// back sub-slices of `bytes` directly so the caller can keep aliasing them.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CbufError> {
        if self.remaining() < n {
            return Err(CbufError::BufferTooSmall {
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, CbufError> {
        Ok(self.take(1)?[0])
    }

    fn bool(&mut self) -> Result<bool, CbufError> {
        Ok(self.u8()? != 0)
    }

    fn i8(&mut self) -> Result<i8, CbufError> {
        Ok(self.u8()? as i8)
    }

    fn u16(&mut self) -> Result<u16, CbufError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn i16(&mut self) -> Result<i16, CbufError> {
        Ok(i16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn u32(&mut self) -> Result<u32, CbufError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn i32(&mut self) -> Result<i32, CbufError> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn f32(&mut self) -> Result<f32, CbufError> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64, CbufError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn i64(&mut self) -> Result<i64, CbufError> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn f64(&mut self) -> Result<f64, CbufError> {
        Ok(f64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }
}

fn decode_struct<'a>(
    cursor: &mut Cursor<'a>,
    index: &SchemaIndex,
    entity: &SchemaEntity,
) -> Result<FieldMap<'a>, CbufError> {
    let mut map = HashMap::with_capacity(entity.fields.len());
    for field in &entity.fields {
        map.insert(field.name.clone(), decode_field(cursor, index, field)?);
    }
    Ok(map)
}

/// Reads a nested struct off the wire: a full preamble plus payload unless
/// `entity` is `@naked`, in which case only the payload is present (§4.7).
fn decode_struct_wire<'a>(
    cursor: &mut Cursor<'a>,
    index: &SchemaIndex,
    entity: &SchemaEntity,
) -> Result<FieldMap<'a>, CbufError> {
    if entity.is_naked_struct {
        return decode_struct(cursor, index, entity);
    }
    let magic = cursor.u32()?;
    if magic != MAGIC {
        return Err(CbufError::BadMagic {
            expected: MAGIC,
            found: magic,
        });
    }
    let _word = cursor.u32()?;
    let _hash = cursor.u64()?;
    let _timestamp = cursor.f64()?;
    decode_struct(cursor, index, entity)
}

fn decode_field<'a>(
    cursor: &mut Cursor<'a>,
    index: &SchemaIndex,
    field: &FieldDef,
) -> Result<FieldValue<'a>, CbufError> {
    if field.is_array {
        return decode_array_field(cursor, index, field);
    }
    match &field.ty {
        FieldType::Complex(name) => {
            let nested = lookup_nested(index, name)?;
            Ok(FieldValue::Struct(decode_struct_wire(cursor, index, &nested)?))
        }
        FieldType::Primitive(PrimitiveTag::String) => {
            Ok(FieldValue::Str(decode_string(cursor, field.upper_bound)?))
        }
        FieldType::Primitive(tag) => decode_scalar(cursor, *tag),
    }
}

fn decode_scalar<'a>(cursor: &mut Cursor<'a>, tag: PrimitiveTag) -> Result<FieldValue<'a>, CbufError> {
    Ok(match tag {
        PrimitiveTag::Bool => FieldValue::Bool(cursor.bool()?),
        PrimitiveTag::I8 => FieldValue::I8(cursor.i8()?),
        PrimitiveTag::U8 => FieldValue::U8(cursor.u8()?),
        PrimitiveTag::I16 => FieldValue::I16(cursor.i16()?),
        PrimitiveTag::U16 => FieldValue::U16(cursor.u16()?),
        PrimitiveTag::I32 => FieldValue::I32(cursor.i32()?),
        PrimitiveTag::U32 => FieldValue::U32(cursor.u32()?),
        PrimitiveTag::I64 => FieldValue::I64(cursor.i64()?),
        PrimitiveTag::U64 => FieldValue::U64(cursor.u64()?),
        PrimitiveTag::F32 => FieldValue::F32(cursor.f32()?),
        PrimitiveTag::F64 => FieldValue::F64(cursor.f64()?),
        PrimitiveTag::String => unreachable!("string is handled by decode_field directly"),
    })
}

fn decode_string<'a>(cursor: &mut Cursor<'a>, upper_bound: Option<usize>) -> Result<String, CbufError> {
    match upper_bound {
        Some(n) => {
            let bytes = cursor.take(n)?;
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
        }
        None => {
            let len = cursor.u32()? as usize;
            let bytes = cursor.take(len)?;
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn decode_array_field<'a>(
    cursor: &mut Cursor<'a>,
    index: &SchemaIndex,
    field: &FieldDef,
) -> Result<FieldValue<'a>, CbufError> {
    let count = match field.array_length {
        Some(n) => n,
        None => cursor.u32()? as usize,
    };
    match &field.ty {
        FieldType::Complex(name) => {
            let nested = lookup_nested(index, name)?;
            let mut elems = Vec::with_capacity(count);
            for _ in 0..count {
                elems.push(decode_struct_wire(cursor, index, &nested)?);
            }
            Ok(FieldValue::ArrayStruct(elems))
        }
        FieldType::Primitive(PrimitiveTag::Bool) => {
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                out.push(cursor.bool()?);
            }
            Ok(FieldValue::ArrayBool(out))
        }
        FieldType::Primitive(PrimitiveTag::String) => {
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                out.push(decode_string(cursor, field.upper_bound)?);
            }
            Ok(FieldValue::ArrayStr(out))
        }
        FieldType::Primitive(tag) => decode_numeric_array(cursor, *tag, count),
    }
}

/// View `bytes` as `&[T]` when naturally aligned for `T`, else copy
/// element-by-element into an owned `Vec<T>` (§4.8, §9). `bytemuck` performs
/// the alignment/length check for us; this only ever reinterprets bytes that
/// are already little-endian on the wire, so it is correct on little-endian
/// hosts (the assumption the wire format itself is built on, per §1).
/// The copy path reads each chunk with `pod_read_unaligned`, since `bytes`
/// is by construction *not* aligned for `T` here (that's why the cast above
/// failed) and `from_bytes` would panic on exactly that input.
fn view_or_copy<'a, T: bytemuck::Pod>(bytes: &'a [u8]) -> NumericArray<'a, T> {
    match bytemuck::try_cast_slice::<u8, T>(bytes) {
        Ok(view) => NumericArray::Borrowed(view),
        Err(_) => {
            let width = std::mem::size_of::<T>();
            let owned = bytes
                .chunks_exact(width)
                .map(bytemuck::pod_read_unaligned::<T>)
                .collect();
            NumericArray::Owned(owned)
        }
    }
}

fn decode_numeric_array<'a>(
    cursor: &mut Cursor<'a>,
    tag: PrimitiveTag,
    count: usize,
) -> Result<FieldValue<'a>, CbufError> {
    let width = tag.fixed_width().expect("numeric tags have a fixed width");
    let bytes = cursor.take(count * width)?;
    Ok(match tag {
        PrimitiveTag::I8 => FieldValue::ArrayI8(view_or_copy(bytes)),
        PrimitiveTag::U8 => FieldValue::ArrayU8(view_or_copy(bytes)),
        PrimitiveTag::I16 => FieldValue::ArrayI16(view_or_copy(bytes)),
        PrimitiveTag::U16 => FieldValue::ArrayU16(view_or_copy(bytes)),
        PrimitiveTag::I32 => FieldValue::ArrayI32(view_or_copy(bytes)),
        PrimitiveTag::U32 => FieldValue::ArrayU32(view_or_copy(bytes)),
        PrimitiveTag::I64 => FieldValue::ArrayI64(view_or_copy(bytes)),
        PrimitiveTag::U64 => FieldValue::ArrayU64(view_or_copy(bytes)),
        PrimitiveTag::F32 => FieldValue::ArrayF32(view_or_copy(bytes)),
        PrimitiveTag::F64 => FieldValue::ArrayF64(view_or_copy(bytes)),
        PrimitiveTag::Bool | PrimitiveTag::String => {
            unreachable!("bool/string arrays are dispatched before reaching decode_numeric_array")
        }
    })
}

//! Size calculation (§4.9): `nakedSize` recurses over a resolved field map
//! without writing bytes. Shares the resolved-value walk with
//! [`super::encode::write_struct_naked`] so that `serializedMessageSize` and
//! `serializeMessage` can never disagree (§8 invariant 1).

use crate::ast::{FieldDef, FieldType, SchemaEntity};
use crate::index::SchemaIndex;
use crate::value::FieldValue;

use super::framing::HEADER_SIZE;

/// The payload size of `entity` given its fully resolved field values —
/// i.e. `nakedSize` (§4.9).
pub fn naked_size(index: &SchemaIndex, entity: &SchemaEntity, values: &crate::value::FieldMap) -> usize {
    entity
        .fields
        .iter()
        .map(|field| {
            field_size(
                index,
                field,
                values
                    .get(&field.name)
                    .expect("resolve_struct fills every declared field"),
            )
        })
        .sum()
}

/// The wire size of a nested struct: its naked size, plus a preamble unless
/// it is `@naked`.
pub fn struct_wire_size(index: &SchemaIndex, entity: &SchemaEntity, values: &crate::value::FieldMap) -> usize {
    let payload = naked_size(index, entity, values);
    if entity.is_naked_struct {
        payload
    } else {
        HEADER_SIZE + payload
    }
}

/// A variable-length array carries a 4-byte element count prefix; a fixed
/// `[N]` array carries none (§4.8).
fn array_prefix(field: &FieldDef) -> usize {
    if field.array_length.is_some() {
        0
    } else {
        4
    }
}

fn field_size(index: &SchemaIndex, field: &FieldDef, value: &FieldValue) -> usize {
    match value {
        FieldValue::Bool(_) | FieldValue::I8(_) | FieldValue::U8(_) => 1,
        FieldValue::I16(_) | FieldValue::U16(_) => 2,
        FieldValue::I32(_) | FieldValue::U32(_) | FieldValue::F32(_) => 4,
        FieldValue::I64(_) | FieldValue::U64(_) | FieldValue::F64(_) => 8,
        FieldValue::Str(s) => string_size(field.upper_bound, s),
        FieldValue::ArrayBool(v) => array_prefix(field) + v.len(),
        FieldValue::ArrayI8(a) => array_prefix(field) + a.len(),
        FieldValue::ArrayU8(a) => array_prefix(field) + a.len(),
        FieldValue::ArrayI16(a) => array_prefix(field) + a.len() * 2,
        FieldValue::ArrayU16(a) => array_prefix(field) + a.len() * 2,
        FieldValue::ArrayI32(a) => array_prefix(field) + a.len() * 4,
        FieldValue::ArrayU32(a) => array_prefix(field) + a.len() * 4,
        FieldValue::ArrayF32(a) => array_prefix(field) + a.len() * 4,
        FieldValue::ArrayI64(a) => array_prefix(field) + a.len() * 8,
        FieldValue::ArrayU64(a) => array_prefix(field) + a.len() * 8,
        FieldValue::ArrayF64(a) => array_prefix(field) + a.len() * 8,
        FieldValue::ArrayStr(v) => {
            array_prefix(field) + v.iter().map(|s| string_size(field.upper_bound, s)).sum::<usize>()
        }
        FieldValue::ArrayStruct(elems) => {
            let nested = nested_entity(index, field);
            array_prefix(field) + elems.iter().map(|e| struct_wire_size(index, nested, e)).sum::<usize>()
        }
        FieldValue::Struct(inner) => {
            let nested = nested_entity(index, field);
            struct_wire_size(index, nested, inner)
        }
    }
}

fn string_size(upper_bound: Option<usize>, s: &str) -> usize {
    match upper_bound {
        Some(n) => n,
        None => 4 + s.len(),
    }
}

fn nested_entity<'b>(index: &'b SchemaIndex, field: &FieldDef) -> &'b SchemaEntity {
    let FieldType::Complex(name) = &field.ty else {
        unreachable!("field_size only reaches nested_entity for Struct/ArrayStruct values")
    };
    index
        .get_by_name(name)
        .expect("resolve_struct already validated this nested type exists")
}

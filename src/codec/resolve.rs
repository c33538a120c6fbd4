//! Applies §4.8's default-value rule (declared default, else the type's
//! zero) and the tolerant-encode coercions of §9 to a caller-supplied
//! [`FieldMap`], producing an owned [`FieldMap`] with every field of every
//! struct present and correctly typed. Both [`super::size::naked_size`] and
//! [`super::encode::write_struct_naked`] walk this resolved map rather than
//! re-deriving defaults independently, which is what keeps
//! `serialized_message_size` and `serialize_message` in lockstep (§8
//! invariant 1).

use std::collections::HashMap;

use crate::ast::{DefaultValue, FieldDef, FieldType, PrimitiveTag, ScalarValue, SchemaEntity};
use crate::error::CbufError;
use crate::index::SchemaIndex;
use crate::value::{FieldMap, FieldValue, NumericArray};

pub fn resolve_struct(
    index: &SchemaIndex,
    entity: &SchemaEntity,
    values: &FieldMap,
) -> Result<FieldMap<'static>, CbufError> {
    let mut out = HashMap::with_capacity(entity.fields.len());
    for field in &entity.fields {
        let resolved = resolve_field(index, field, values.get(&field.name))?;
        out.insert(field.name.clone(), resolved);
    }
    Ok(out)
}

fn resolve_field(
    index: &SchemaIndex,
    field: &FieldDef,
    value: Option<&FieldValue>,
) -> Result<FieldValue<'static>, CbufError> {
    if field.is_array {
        return resolve_array_field(index, field, value);
    }
    match &field.ty {
        FieldType::Complex(name) => resolve_struct_field(index, name, field, value),
        FieldType::Primitive(tag) => resolve_scalar_field(*tag, field, value),
    }
}

fn unsupported(field_name: &str) -> CbufError {
    CbufError::UnsupportedType {
        field: field_name.to_string(),
    }
}

fn unknown_type(name: &str) -> CbufError {
    CbufError::UnknownMessageType {
        type_name: name.to_string(),
    }
}

fn lookup_nested<'b>(index: &'b SchemaIndex, name: &str) -> Result<&'b SchemaEntity, CbufError> {
    index.get_by_name(name).ok_or_else(|| unknown_type(name))
}

fn resolve_struct_field(
    index: &SchemaIndex,
    name: &str,
    field: &FieldDef,
    value: Option<&FieldValue>,
) -> Result<FieldValue<'static>, CbufError> {
    let nested = lookup_nested(index, name)?;
    let inner = match value {
        Some(FieldValue::Struct(map)) => resolve_struct(index, nested, map)?,
        Some(_) => return Err(unsupported(&field.name)),
        None => resolve_struct(index, nested, &FieldMap::new())?,
    };
    Ok(FieldValue::Struct(inner))
}

fn resolve_scalar_field(
    tag: PrimitiveTag,
    field: &FieldDef,
    value: Option<&FieldValue>,
) -> Result<FieldValue<'static>, CbufError> {
    if let Some(v) = value {
        return coerce_scalar(tag, v, &field.name);
    }
    if let Some(DefaultValue::Scalar(sv)) = &field.default_value {
        return scalar_default_to_field(tag, sv, &field.name);
    }
    Ok(zero_scalar(tag))
}

fn coerce_scalar(
    tag: PrimitiveTag,
    value: &FieldValue,
    field_name: &str,
) -> Result<FieldValue<'static>, CbufError> {
    Ok(match tag {
        PrimitiveTag::Bool => FieldValue::Bool(value.as_bool().ok_or_else(|| unsupported(field_name))?),
        PrimitiveTag::I8 => FieldValue::I8(value.as_i64().ok_or_else(|| unsupported(field_name))? as i8),
        PrimitiveTag::I16 => {
            FieldValue::I16(value.as_i64().ok_or_else(|| unsupported(field_name))? as i16)
        }
        PrimitiveTag::I32 => {
            FieldValue::I32(value.as_i64().ok_or_else(|| unsupported(field_name))? as i32)
        }
        PrimitiveTag::I64 => FieldValue::I64(value.as_i64().ok_or_else(|| unsupported(field_name))?),
        PrimitiveTag::U8 => FieldValue::U8(value.as_u64().ok_or_else(|| unsupported(field_name))? as u8),
        PrimitiveTag::U16 => {
            FieldValue::U16(value.as_u64().ok_or_else(|| unsupported(field_name))? as u16)
        }
        PrimitiveTag::U32 => {
            FieldValue::U32(value.as_u64().ok_or_else(|| unsupported(field_name))? as u32)
        }
        PrimitiveTag::U64 => FieldValue::U64(value.as_u64().ok_or_else(|| unsupported(field_name))?),
        PrimitiveTag::F32 => {
            FieldValue::F32(value.as_f64().ok_or_else(|| unsupported(field_name))? as f32)
        }
        PrimitiveTag::F64 => FieldValue::F64(value.as_f64().ok_or_else(|| unsupported(field_name))?),
        PrimitiveTag::String => {
            FieldValue::Str(value.as_str().ok_or_else(|| unsupported(field_name))?.to_string())
        }
    })
}

fn zero_scalar(tag: PrimitiveTag) -> FieldValue<'static> {
    match tag {
        PrimitiveTag::Bool => FieldValue::Bool(false),
        PrimitiveTag::I8 => FieldValue::I8(0),
        PrimitiveTag::I16 => FieldValue::I16(0),
        PrimitiveTag::I32 => FieldValue::I32(0),
        PrimitiveTag::I64 => FieldValue::I64(0),
        PrimitiveTag::U8 => FieldValue::U8(0),
        PrimitiveTag::U16 => FieldValue::U16(0),
        PrimitiveTag::U32 => FieldValue::U32(0),
        PrimitiveTag::U64 => FieldValue::U64(0),
        PrimitiveTag::F32 => FieldValue::F32(0.0),
        PrimitiveTag::F64 => FieldValue::F64(0.0),
        PrimitiveTag::String => FieldValue::Str(String::new()),
    }
}

fn scalar_default_to_field(
    tag: PrimitiveTag,
    sv: &ScalarValue,
    field_name: &str,
) -> Result<FieldValue<'static>, CbufError> {
    let err = || unsupported(field_name);
    Ok(match (tag, sv) {
        (PrimitiveTag::Bool, ScalarValue::Bool(b)) => FieldValue::Bool(*b),
        (PrimitiveTag::I8, ScalarValue::I64(n)) => FieldValue::I8(*n as i8),
        (PrimitiveTag::I16, ScalarValue::I64(n)) => FieldValue::I16(*n as i16),
        (PrimitiveTag::I32, ScalarValue::I64(n)) => FieldValue::I32(*n as i32),
        (PrimitiveTag::I64, ScalarValue::I64(n)) => FieldValue::I64(*n),
        (PrimitiveTag::U8, ScalarValue::U64(n)) => FieldValue::U8(*n as u8),
        (PrimitiveTag::U16, ScalarValue::U64(n)) => FieldValue::U16(*n as u16),
        (PrimitiveTag::U32, ScalarValue::U64(n)) => FieldValue::U32(*n as u32),
        (PrimitiveTag::U64, ScalarValue::U64(n)) => FieldValue::U64(*n),
        (PrimitiveTag::F32, ScalarValue::F64(n)) => FieldValue::F32(*n as f32),
        (PrimitiveTag::F64, ScalarValue::F64(n)) => FieldValue::F64(*n),
        (PrimitiveTag::String, ScalarValue::Str(s)) => FieldValue::Str(s.clone()),
        _ => return Err(err()),
    })
}

fn resolve_array_field(
    index: &SchemaIndex,
    field: &FieldDef,
    value: Option<&FieldValue>,
) -> Result<FieldValue<'static>, CbufError> {
    match &field.ty {
        FieldType::Complex(name) => resolve_struct_array(index, name, field, value),
        FieldType::Primitive(PrimitiveTag::Bool) => resolve_bool_array(field, value),
        FieldType::Primitive(PrimitiveTag::String) => resolve_string_array(field, value),
        FieldType::Primitive(tag) => resolve_numeric_array(*tag, field, value),
    }
}

/// A fixed-length array's "full default" is `array_length` zeroed elements;
/// an unbounded or `@compact` array's default is empty — the supplemented
/// rule of `SPEC_FULL.md` §4 for arrays without a natural "full" length.
fn default_array_len(field: &FieldDef) -> usize {
    field.array_length.unwrap_or(0)
}

fn resolve_struct_array(
    index: &SchemaIndex,
    name: &str,
    field: &FieldDef,
    value: Option<&FieldValue>,
) -> Result<FieldValue<'static>, CbufError> {
    let nested = lookup_nested(index, name)?;
    match value {
        Some(FieldValue::ArrayStruct(elems)) => {
            let mut out = Vec::with_capacity(elems.len());
            for elem in elems {
                out.push(resolve_struct(index, nested, elem)?);
            }
            Ok(FieldValue::ArrayStruct(out))
        }
        Some(_) => Err(unsupported(&field.name)),
        None => {
            let len = default_array_len(field);
            let mut out = Vec::with_capacity(len);
            for _ in 0..len {
                out.push(resolve_struct(index, nested, &FieldMap::new())?);
            }
            Ok(FieldValue::ArrayStruct(out))
        }
    }
}

fn resolve_bool_array(
    field: &FieldDef,
    value: Option<&FieldValue>,
) -> Result<FieldValue<'static>, CbufError> {
    match value {
        Some(FieldValue::ArrayBool(v)) => Ok(FieldValue::ArrayBool(v.clone())),
        Some(_) => Err(unsupported(&field.name)),
        None => match &field.default_value {
            Some(DefaultValue::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        ScalarValue::Bool(b) => out.push(*b),
                        _ => return Err(unsupported(&field.name)),
                    }
                }
                Ok(FieldValue::ArrayBool(out))
            }
            _ => Ok(FieldValue::ArrayBool(vec![false; default_array_len(field)])),
        },
    }
}

fn resolve_string_array(
    field: &FieldDef,
    value: Option<&FieldValue>,
) -> Result<FieldValue<'static>, CbufError> {
    match value {
        Some(FieldValue::ArrayStr(v)) => Ok(FieldValue::ArrayStr(v.clone())),
        Some(_) => Err(unsupported(&field.name)),
        None => match &field.default_value {
            Some(DefaultValue::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        ScalarValue::Str(s) => out.push(s.clone()),
                        _ => return Err(unsupported(&field.name)),
                    }
                }
                Ok(FieldValue::ArrayStr(out))
            }
            _ => Ok(FieldValue::ArrayStr(vec![String::new(); default_array_len(field)])),
        },
    }
}

macro_rules! numeric_array_arm {
    ($tag:ident, $variant:ident, $elem_ty:ty, $field:expr, $value:expr, $scalar_pat:pat => $scalar_expr:expr) => {{
        match $value {
            Some(FieldValue::$variant(arr)) => {
                Ok(FieldValue::$variant(NumericArray::Owned(arr.as_slice().to_vec())))
            }
            Some(_) => Err(unsupported(&$field.name)),
            None => match &$field.default_value {
                Some(DefaultValue::Array(items)) => {
                    let mut out: Vec<$elem_ty> = Vec::with_capacity(items.len());
                    for item in items {
                        let v = match item {
                            $scalar_pat => $scalar_expr,
                            _ => return Err(unsupported(&$field.name)),
                        };
                        out.push(v);
                    }
                    Ok(FieldValue::$variant(NumericArray::Owned(out)))
                }
                _ => Ok(FieldValue::$variant(NumericArray::Owned(vec![
                    <$elem_ty>::default();
                    default_array_len($field)
                ]))),
            },
        }
    }};
}

fn resolve_numeric_array(
    tag: PrimitiveTag,
    field: &FieldDef,
    value: Option<&FieldValue>,
) -> Result<FieldValue<'static>, CbufError> {
    match tag {
        PrimitiveTag::I8 => {
            numeric_array_arm!(I8, ArrayI8, i8, field, value, ScalarValue::I64(n) => *n as i8)
        }
        PrimitiveTag::I16 => {
            numeric_array_arm!(I16, ArrayI16, i16, field, value, ScalarValue::I64(n) => *n as i16)
        }
        PrimitiveTag::I32 => {
            numeric_array_arm!(I32, ArrayI32, i32, field, value, ScalarValue::I64(n) => *n as i32)
        }
        PrimitiveTag::I64 => {
            numeric_array_arm!(I64, ArrayI64, i64, field, value, ScalarValue::I64(n) => *n)
        }
        PrimitiveTag::U8 => {
            numeric_array_arm!(U8, ArrayU8, u8, field, value, ScalarValue::U64(n) => *n as u8)
        }
        PrimitiveTag::U16 => {
            numeric_array_arm!(U16, ArrayU16, u16, field, value, ScalarValue::U64(n) => *n as u16)
        }
        PrimitiveTag::U32 => {
            numeric_array_arm!(U32, ArrayU32, u32, field, value, ScalarValue::U64(n) => *n as u32)
        }
        PrimitiveTag::U64 => {
            numeric_array_arm!(U64, ArrayU64, u64, field, value, ScalarValue::U64(n) => *n)
        }
        PrimitiveTag::F32 => {
            numeric_array_arm!(F32, ArrayF32, f32, field, value, ScalarValue::F64(n) => *n as f32)
        }
        PrimitiveTag::F64 => {
            numeric_array_arm!(F64, ArrayF64, f64, field, value, ScalarValue::F64(n) => *n)
        }
        PrimitiveTag::Bool | PrimitiveTag::String => {
            unreachable!("bool/string arrays are dispatched before reaching resolve_numeric_array")
        }
    }
}

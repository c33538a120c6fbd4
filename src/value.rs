//! The polymorphic payload value (§9 "Polymorphic field values"): a tagged
//! sum covering every scalar and array shape the codec can encode or decode,
//! plus the zero-copy numeric array view used by decoded messages.

use std::collections::HashMap;

/// A decoded or to-be-encoded numeric array. Decoding aliases the input
/// buffer ([`NumericArray::Borrowed`]) when the element offset is naturally
/// aligned for `T`; otherwise a copy is made ([`NumericArray::Owned`]) to
/// restore alignment (§4.8, §9). Callers building a message to encode always
/// construct the `Owned` variant.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericArray<'a, T> {
    Borrowed(&'a [T]),
    Owned(Vec<T>),
}

impl<'a, T> NumericArray<'a, T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            NumericArray::Borrowed(s) => s,
            NumericArray::Owned(v) => v,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn into_owned(self) -> Vec<T>
    where
        T: Clone,
    {
        match self {
            NumericArray::Borrowed(s) => s.to_vec(),
            NumericArray::Owned(v) => v,
        }
    }
}

impl<T> From<Vec<T>> for NumericArray<'static, T> {
    fn from(v: Vec<T>) -> Self {
        NumericArray::Owned(v)
    }
}

/// A struct's decoded (or to-be-encoded) field values, keyed by field name.
pub type FieldMap<'a> = HashMap<String, FieldValue<'a>>;

/// One field's value: a tagged sum over every primitive/array shape the
/// codec dispatches on (§9). Numeric scalars accept cross-width coercion on
/// encode via [`FieldValue::as_i64`]/[`FieldValue::as_u64`]/[`FieldValue::as_f64`]
/// (a boolean is accepted as 0/1; any integer variant is accepted where a
/// 64-bit integer is expected), matching the tolerant-encode rule of §9.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    ArrayBool(Vec<bool>),
    ArrayI8(NumericArray<'a, i8>),
    ArrayI16(NumericArray<'a, i16>),
    ArrayI32(NumericArray<'a, i32>),
    ArrayI64(NumericArray<'a, i64>),
    ArrayU8(NumericArray<'a, u8>),
    ArrayU16(NumericArray<'a, u16>),
    ArrayU32(NumericArray<'a, u32>),
    ArrayU64(NumericArray<'a, u64>),
    ArrayF32(NumericArray<'a, f32>),
    ArrayF64(NumericArray<'a, f64>),
    ArrayStr(Vec<String>),
    ArrayStruct(Vec<FieldMap<'a>>),
    Struct(FieldMap<'a>),
}

impl<'a> FieldValue<'a> {
    /// Coerce any boolean or integer scalar to `i64`, for encoding into a
    /// signed integer field.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            FieldValue::Bool(b) => Some(b as i64),
            FieldValue::I8(v) => Some(v as i64),
            FieldValue::I16(v) => Some(v as i64),
            FieldValue::I32(v) => Some(v as i64),
            FieldValue::I64(v) => Some(v),
            FieldValue::U8(v) => Some(v as i64),
            FieldValue::U16(v) => Some(v as i64),
            FieldValue::U32(v) => Some(v as i64),
            FieldValue::U64(v) => Some(v as i64),
            _ => None,
        }
    }

    /// Coerce any boolean or integer scalar to `u64`, for encoding into an
    /// unsigned integer field.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            FieldValue::Bool(b) => Some(b as u64),
            FieldValue::I8(v) => Some(v as i64 as u64),
            FieldValue::I16(v) => Some(v as i64 as u64),
            FieldValue::I32(v) => Some(v as i64 as u64),
            FieldValue::I64(v) => Some(v as u64),
            FieldValue::U8(v) => Some(v as u64),
            FieldValue::U16(v) => Some(v as u64),
            FieldValue::U32(v) => Some(v as u64),
            FieldValue::U64(v) => Some(v),
            _ => None,
        }
    }

    /// Coerce any numeric scalar to `f64`, for encoding into a float field.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            FieldValue::F32(v) => Some(v as f64),
            FieldValue::F64(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            FieldValue::Bool(b) => Some(b),
            FieldValue::I8(v) => Some(v != 0),
            FieldValue::U8(v) => Some(v != 0),
            FieldValue::I32(v) => Some(v != 0),
            FieldValue::U32(v) => Some(v != 0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

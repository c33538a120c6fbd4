//! The resolved schema data model: primitive tags, field descriptors, and
//! schema entities, as produced by [`crate::semantic::analyze`].

/// The closed set of primitive type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTag {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    /// Plain or fixed-width (`upper_bound = Some(16)` for `short_string`) string.
    String,
}

impl PrimitiveTag {
    /// Width in bytes on the wire, or `None` for the variable-length `string`.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            PrimitiveTag::Bool | PrimitiveTag::I8 | PrimitiveTag::U8 => Some(1),
            PrimitiveTag::I16 | PrimitiveTag::U16 => Some(2),
            PrimitiveTag::I32 | PrimitiveTag::U32 | PrimitiveTag::F32 => Some(4),
            PrimitiveTag::I64 | PrimitiveTag::U64 | PrimitiveTag::F64 => Some(8),
            PrimitiveTag::String => None,
        }
    }

    /// Map a source spelling to its canonical tag. `short_string` is handled
    /// by the caller (it yields `String` plus an
    /// `upper_bound` of 16, which isn't part of the tag itself).
    pub fn from_spelling(spelling: &str) -> Option<Self> {
        Some(match spelling {
            "bool" => PrimitiveTag::Bool,
            "s8" | "int8" | "int8_t" => PrimitiveTag::I8,
            "u8" | "uint8" | "uint8_t" => PrimitiveTag::U8,
            "s16" | "int16" | "int16_t" => PrimitiveTag::I16,
            "u16" | "uint16" | "uint16_t" => PrimitiveTag::U16,
            "s32" | "int32" | "int32_t" | "int" => PrimitiveTag::I32,
            "u32" | "uint32" | "uint32_t" => PrimitiveTag::U32,
            "s64" | "int64" | "int64_t" => PrimitiveTag::I64,
            "u64" | "uint64" | "uint64_t" => PrimitiveTag::U64,
            "f32" | "float32" | "float" => PrimitiveTag::F32,
            "f64" | "float64" | "double" => PrimitiveTag::F64,
            "string" => PrimitiveTag::String,
            _ => return None,
        })
    }

    /// The C spelling used in the hasher's canonical text, for primitives
    /// other than the `short_string`/`string` special case which the hasher
    /// handles itself (`std::string` vs. `VString<15>`).
    pub fn c_spelling(self) -> &'static str {
        match self {
            PrimitiveTag::Bool => "bool",
            PrimitiveTag::I8 => "int8_t",
            PrimitiveTag::U8 => "uint8_t",
            PrimitiveTag::I16 => "int16_t",
            PrimitiveTag::U16 => "uint16_t",
            PrimitiveTag::I32 => "int32_t",
            PrimitiveTag::U32 => "uint32_t",
            PrimitiveTag::I64 => "int64_t",
            PrimitiveTag::U64 => "uint64_t",
            PrimitiveTag::F32 => "float",
            PrimitiveTag::F64 => "double",
            PrimitiveTag::String => "std::string",
        }
    }
}

/// Reserved words that cannot be used as identifiers: every keyword plus
/// every type spelling.
pub const RESERVED_WORDS: &[&str] = &[
    "namespace",
    "const",
    "enum",
    "class",
    "struct",
    "naked",
    "compact",
    "short_string",
    "true",
    "false",
    "bool",
    "s8",
    "int8",
    "int8_t",
    "u8",
    "uint8",
    "uint8_t",
    "s16",
    "int16",
    "int16_t",
    "u16",
    "uint16",
    "uint16_t",
    "s32",
    "int32",
    "int32_t",
    "int",
    "u32",
    "uint32",
    "uint32_t",
    "s64",
    "int64",
    "int64_t",
    "u64",
    "uint64",
    "uint64_t",
    "f32",
    "float32",
    "float",
    "f64",
    "float64",
    "double",
    "string",
];

/// A field's type after enum rewriting: either a primitive tag or the fully
/// qualified name of a struct (never an enum — enum refs become `uint32`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Primitive(PrimitiveTag),
    Complex(String),
}

impl FieldType {
    pub fn is_complex(&self) -> bool {
        matches!(self, FieldType::Complex(_))
    }
}

/// A scalar constant value, typed to match its field or const declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
}

/// A field or const's default/constant value.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Scalar(ScalarValue),
    Array(Vec<ScalarValue>),
}

/// One field of a struct, or one member of an enum (modeled as a
/// pseudo-field).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: FieldType,
    pub is_array: bool,
    /// `[N]` fixed-length array.
    pub array_length: Option<usize>,
    /// `[N] @compact` bounded array.
    pub array_upper_bound: Option<usize>,
    /// `string` upper bound; `Some(16)` for `short_string`.
    pub upper_bound: Option<usize>,
    pub default_value: Option<DefaultValue>,
    /// `true` only for enum member pseudo-fields.
    pub is_constant: bool,
    /// The enum member's integer value, when `is_constant`.
    pub value: Option<i64>,
}

impl FieldDef {
    pub fn is_complex(&self) -> bool {
        self.ty.is_complex()
    }
}

/// A struct or enum, fully resolved and (for structs) hashed.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaEntity {
    pub name: String,
    pub qualified_name: String,
    pub namespaces: Vec<String>,
    pub fields: Vec<FieldDef>,
    /// `0` for enums; the struct's djb2 hash otherwise.
    pub hash_value: u64,
    pub is_enum: bool,
    pub is_enum_class: bool,
    pub is_naked_struct: bool,
}

//! Error types for schema parsing, semantic analysis, and codec operations.

/// Errors produced by every public operation in this crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CbufError {
    /// `#import "path"` referenced a path absent from the caller-supplied mapping.
    #[error("import not found: {path}")]
    ImportNotFound { path: String },

    /// The grammar could not recognize a statement.
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    /// A statement matched more than one grammar production.
    #[error("ambiguous parse near line {line}")]
    AmbiguousParse { line: usize },

    /// The input produced no top-level entities at all.
    #[error("empty parse: no top-level declarations found")]
    EmptyParse,

    /// A `namespace` block was declared inside another `namespace` block.
    #[error("nested namespace '{name}' is not allowed")]
    NestedNamespace { name: String },

    /// Two entities share a fully qualified name.
    #[error("duplicate entity '{qualified_name}'")]
    DuplicateEntity { qualified_name: String },

    /// A type name did not resolve via the namespace walk.
    #[error("unknown type '{name}' referenced from namespace '{context}'")]
    UnknownType { name: String, context: String },

    /// A named default value did not match any member of the target enum.
    #[error("'{value}' is not a member of enum '{enum_name}'")]
    UnknownEnumValue { enum_name: String, value: String },

    /// A default value was supplied for a complex-typed field.
    #[error("field '{field}' has a complex type and cannot carry a default value")]
    ComplexDefaultForbidden { field: String },

    /// A default value's shape or primitive type did not match its field.
    #[error("default value for field '{field}' does not match its declared type")]
    InvalidDefaultValue { field: String },

    /// A compiled schema contained zero struct entities.
    #[error("schema contains no struct definitions")]
    NoStructs,

    /// A struct's nested-struct fields form a cycle, which the hasher cannot recurse through.
    #[error("cyclic schema detected while hashing '{qualified_name}'")]
    CyclicSchema { qualified_name: String },

    /// `serialize_message`/`serialized_message_size` referenced a type absent from the index.
    #[error("unknown message type '{type_name}'")]
    UnknownMessageType { type_name: String },

    /// A decode read past the end of the available bytes.
    #[error("buffer too small: needed {needed} bytes, only {available} available")]
    BufferTooSmall { needed: usize, available: usize },

    /// The 4-byte magic number did not match `0x56444E54`.
    #[error("bad magic: expected {expected:#010x}, found {found:#010x}")]
    BadMagic { expected: u32, found: u32 },

    /// A preamble's hash matched neither a schema in the index nor the built-in metadata hash.
    #[error("no schema registered for hash {0:#018x}")]
    HashNotFound(u64),

    /// The preamble's size field claimed more bytes than the buffer holds.
    #[error("size {size} exceeds available buffer of {available} bytes")]
    SizeExceedsBuffer { size: usize, available: usize },

    /// The number of bytes actually consumed while decoding a message did not equal its framed size.
    #[error("size mismatch: framed size {expected}, but {actual} bytes were consumed")]
    SizeMismatch { expected: usize, actual: usize },

    /// A field's primitive tag was not one this codec knows how to encode/decode.
    #[error("unsupported type for field '{field}'")]
    UnsupportedType { field: String },
}

//! `cbuf`: a parser, 64-bit struct hasher, and binary codec for the cbuf
//! interface definition language.
//!
//! The pipeline is *source text → [`preprocess`] → parser → semantic
//! analyzer → [`parse`]'s hashed [`SchemaEntity`] list → [`create_schema_maps`]
//! → [`codec`]*. Schema text never reaches the codec directly: callers parse
//! once into a [`SchemaIndex`], then serialize/deserialize any number of
//! messages against it.

mod ast;
mod codec;
mod error;
mod hash;
mod index;
mod lex;
mod message;
mod parser;
mod preprocess;
mod raw;
mod semantic;
mod value;

pub use ast::{
    DefaultValue, FieldDef, FieldType, PrimitiveTag, ScalarValue, SchemaEntity, RESERVED_WORDS,
};
pub use codec::{deserialize_message, serialize_message, serialized_message_size};
pub use error::CbufError;
pub use hash::compute_hash_value;
pub use index::{create_schema_maps, metadata_schema, SchemaIndex, METADATA_HASH};
pub use message::{BinaryMessage, OutgoingMessage};
pub use preprocess::preprocess;
pub use value::{FieldMap, FieldValue, NumericArray};

/// `parse` (§6.1): parse preprocessed cbuf source text into a fully
/// resolved, hashed schema entity list. Combines the grammar parser
/// (unresolved entities), the semantic analyzer (namespace qualification,
/// enum rewriting, default validation), and the hasher (§4.6) in one call.
pub fn parse(text: &str) -> Result<Vec<SchemaEntity>, CbufError> {
    let raw = parser::parse(text)?;
    let mut entities = semantic::analyze(raw)?;
    hash::compute_hashes(&mut entities)?;
    Ok(entities)
}

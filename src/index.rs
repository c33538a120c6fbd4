//! The schema index (§3 "Schema index", §6.1 `createSchemaMaps`): built once
//! from a parsed, hashed entity list and read thereafter by the codec.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::{FieldDef, FieldType, PrimitiveTag, SchemaEntity};

/// The built-in `cbufmsg::metadata` definition (§4.7), recognized by hash
/// during decode even though it is never present in `by_name` — it cannot be
/// referenced as a nested field type from user schemas, only discovered as a
/// decode-time fallback when a preamble's hash misses `by_hash`.
pub const METADATA_HASH: u64 = 0xBE6738D544AB72C6;

fn metadata_field(name: &str, ty: PrimitiveTag) -> FieldDef {
    FieldDef {
        name: name.to_string(),
        ty: FieldType::Primitive(ty),
        is_array: false,
        array_length: None,
        array_upper_bound: None,
        upper_bound: None,
        default_value: None,
        is_constant: false,
        value: None,
    }
}

/// Build the ambient `cbufmsg::metadata` entity on demand (§4.7): `{uint64
/// msg_hash; string msg_name; string msg_meta;}`, with its hash fixed at
/// [`METADATA_HASH`] rather than computed from its canonical text.
pub fn metadata_schema() -> SchemaEntity {
    SchemaEntity {
        name: "metadata".to_string(),
        qualified_name: "cbufmsg::metadata".to_string(),
        namespaces: vec!["cbufmsg".to_string()],
        fields: vec![
            metadata_field("msg_hash", PrimitiveTag::U64),
            metadata_field("msg_name", PrimitiveTag::String),
            metadata_field("msg_meta", PrimitiveTag::String),
        ],
        hash_value: METADATA_HASH,
        is_enum: false,
        is_enum_class: false,
        is_naked_struct: false,
    }
}

/// `name → entity` and `hash → entity` lookup tables, built once per parse
/// result and read-only thereafter (§5: concurrent readers are safe; callers
/// must not mutate the backing entity list while codec operations are in
/// flight, a policy this type does not itself enforce).
#[derive(Debug, Clone)]
pub struct SchemaIndex {
    by_name: HashMap<String, Arc<SchemaEntity>>,
    by_hash: HashMap<u64, Arc<SchemaEntity>>,
}

impl SchemaIndex {
    /// Build the two maps from a hashed entity list. Enums are indexed by
    /// name only (`hashValue == 0` for every enum, so they are excluded from
    /// `by_hash` per §3).
    pub fn new(entities: Vec<SchemaEntity>) -> Self {
        let mut by_name = HashMap::with_capacity(entities.len());
        let mut by_hash = HashMap::new();
        for entity in entities {
            let shared = Arc::new(entity);
            by_name.insert(shared.qualified_name.clone(), Arc::clone(&shared));
            if !shared.is_enum {
                by_hash.insert(shared.hash_value, shared);
            }
        }
        Self { by_name, by_hash }
    }

    pub fn get_by_name(&self, qualified_name: &str) -> Option<&SchemaEntity> {
        self.by_name.get(qualified_name).map(Arc::as_ref)
    }

    pub fn get_by_hash(&self, hash: u64) -> Option<&SchemaEntity> {
        self.by_hash.get(&hash).map(Arc::as_ref)
    }

    pub fn struct_names(&self) -> impl Iterator<Item = &str> {
        self.by_name
            .values()
            .filter(|e| !e.is_enum)
            .map(|e| e.qualified_name.as_str())
    }
}

/// `createSchemaMaps` (§6.1): build an index from a hashed entity list.
pub fn create_schema_maps(entities: Vec<SchemaEntity>) -> SchemaIndex {
    SchemaIndex::new(entities)
}

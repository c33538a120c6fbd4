//! Canonical textual encoding and djb2-style 64-bit hash (§4.6), with
//! recursion into nested struct hashes and cycle detection (§9).

use std::collections::{HashMap, HashSet};

use crate::ast::{FieldType, SchemaEntity};
use crate::error::CbufError;

/// Fill in `hash_value` for every struct entity in `entities` (enums are
/// left at `0`). Struct hashes may depend on other structs' hashes (nested
/// fields), so this resolves dependencies recursively with memoization and
/// fails with [`CbufError::CyclicSchema`] if the dependency graph has a cycle.
pub fn compute_hashes(entities: &mut [SchemaEntity]) -> Result<(), CbufError> {
    let by_name: HashMap<String, usize> = entities
        .iter()
        .enumerate()
        .filter(|(_, e)| !e.is_enum)
        .map(|(i, e)| (e.qualified_name.clone(), i))
        .collect();

    let mut memo: HashMap<String, u64> = HashMap::new();
    let names: Vec<String> = by_name.keys().cloned().collect();
    for name in &names {
        let mut visiting = HashSet::new();
        hash_of(name, entities, &by_name, &mut memo, &mut visiting)?;
    }

    for entity in entities.iter_mut() {
        if !entity.is_enum
            && let Some(h) = memo.get(&entity.qualified_name)
        {
            entity.hash_value = *h;
        }
    }
    Ok(())
}

/// Compute (or retrieve from `memo`) the hash of the struct named
/// `qualified_name`, recursing into nested struct field types.
fn hash_of(
    qualified_name: &str,
    entities: &[SchemaEntity],
    by_name: &HashMap<String, usize>,
    memo: &mut HashMap<String, u64>,
    visiting: &mut HashSet<String>,
) -> Result<u64, CbufError> {
    if let Some(h) = memo.get(qualified_name) {
        return Ok(*h);
    }
    if !visiting.insert(qualified_name.to_string()) {
        return Err(CbufError::CyclicSchema {
            qualified_name: qualified_name.to_string(),
        });
    }

    let idx = by_name
        .get(qualified_name)
        .copied()
        .expect("qualified_name was collected from by_name's own keys");
    let entity = &entities[idx];

    let mut text = format!("struct {} \n", entity.name);
    for field in &entity.fields {
        if field.is_array {
            text.push_str(&format!("[{}] ", field.array_length.unwrap_or(0)));
        }
        let element = match &field.ty {
            FieldType::Primitive(crate::ast::PrimitiveTag::String)
                if field.upper_bound == Some(16) =>
            {
                "VString<15>".to_string()
            }
            FieldType::Primitive(tag) => tag.c_spelling().to_string(),
            FieldType::Complex(name) => {
                hash_of(name, entities, by_name, memo, visiting)?.to_string()
            }
        };
        text.push_str(&element);
        text.push(' ');
        text.push_str(&field.name);
        text.push_str("; \n");
    }

    visiting.remove(qualified_name);
    let hash = djb2(&text);
    memo.insert(qualified_name.to_string(), hash);
    Ok(hash)
}

/// The djb2-like rolling hash of §4.6: `hash := ((hash << 5) + hash + code(c))
/// mod 2^64`, starting from `5381`. Rust's `u64` arithmetic wraps on overflow
/// with `wrapping_*`, which is exactly `mod 2^64`.
fn djb2(text: &str) -> u64 {
    let mut hash: u64 = 5381;
    for c in text.chars() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_add(hash)
            .wrapping_add(c as u64);
    }
    hash
}

/// Compute the hash of a single named type on demand (§6.1
/// `computeHashValue`), resolving `type_name` via the namespace walk first.
pub fn compute_hash_value(
    entities: &[SchemaEntity],
    namespaces: &[String],
    type_name: &str,
) -> Result<u64, CbufError> {
    let qualified = resolve_qualified(entities, namespaces, type_name)?;
    let by_name: HashMap<String, usize> = entities
        .iter()
        .enumerate()
        .filter(|(_, e)| !e.is_enum)
        .map(|(i, e)| (e.qualified_name.clone(), i))
        .collect();
    let mut memo = HashMap::new();
    let mut visiting = HashSet::new();
    hash_of(&qualified, entities, &by_name, &mut memo, &mut visiting)
}

fn resolve_qualified(
    entities: &[SchemaEntity],
    namespaces: &[String],
    type_name: &str,
) -> Result<String, CbufError> {
    if type_name.contains("::") {
        if entities
            .iter()
            .any(|e| !e.is_enum && e.qualified_name == type_name)
        {
            return Ok(type_name.to_string());
        }
    } else {
        for depth in (0..=namespaces.len()).rev() {
            let candidate = if depth == 0 {
                type_name.to_string()
            } else {
                format!("{}::{}", namespaces[..depth].join("::"), type_name)
            };
            if entities
                .iter()
                .any(|e| !e.is_enum && e.qualified_name == candidate)
            {
                return Ok(candidate);
            }
        }
    }
    Err(CbufError::UnknownType {
        name: type_name.to_string(),
        context: namespaces.join("::"),
    })
}

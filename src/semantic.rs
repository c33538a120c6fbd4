//! Semantic analysis: namespace qualification, duplicate detection,
//! enum-to-`uint32` field rewriting, default-value type checking, and
//! namespace-walk name resolution.
//!
//! Runs in two passes over the raw entity list: pass one registers every
//! qualified struct/enum name (and validates consts and enum member values)
//! so that pass two can resolve forward references — fields naming a struct
//! or enum declared later in the same source unit. Each definition is
//! collected into a map first, and every struct's fields are then resolved
//! against the complete set.

use std::collections::{HashMap, HashSet};

use crate::ast::{DefaultValue, FieldDef, FieldType, PrimitiveTag, ScalarValue, SchemaEntity};
use crate::error::CbufError;
use crate::raw::{RawConst, RawEntity, RawEnum, RawField, RawType, RawValue};

struct EnumInfo {
    is_class: bool,
    members: Vec<(String, i64)>,
}

/// Resolve, validate, and rewrite a raw entity list into the final schema
/// entity list (constants are validated but do not appear in the output).
pub fn analyze(entities: Vec<RawEntity>) -> Result<Vec<SchemaEntity>, CbufError> {
    let mut declared: HashSet<String> = HashSet::new();
    let mut struct_names: HashSet<String> = HashSet::new();
    let mut enums: HashMap<String, EnumInfo> = HashMap::new();

    // Pass 1: register every qualified name, validate consts and enum values.
    for entity in &entities {
        match entity {
            RawEntity::Const(c) => {
                let qualified = qualify(&c.namespaces, &c.name);
                register(&mut declared, qualified.clone())?;
                check_const(c, &qualified)?;
            }
            RawEntity::Enum(e) => {
                let qualified = qualify(&e.namespaces, &e.name);
                register(&mut declared, qualified.clone())?;
                let members = assign_enum_values(e)?;
                enums.insert(
                    qualified,
                    EnumInfo {
                        is_class: e.is_class,
                        members,
                    },
                );
            }
            RawEntity::Struct(s) => {
                let qualified = qualify(&s.namespaces, &s.name);
                register(&mut declared, qualified.clone())?;
                struct_names.insert(qualified);
            }
        }
    }

    // Pass 2: rewrite struct fields against the complete name set, emitting
    // enum and struct entities in source order (consts are dropped).
    let mut output = Vec::with_capacity(entities.len());
    for entity in &entities {
        match entity {
            RawEntity::Const(_) => {}
            RawEntity::Enum(e) => {
                let qualified = qualify(&e.namespaces, &e.name);
                let info = &enums[&qualified];
                let fields = info
                    .members
                    .iter()
                    .map(|(name, value)| FieldDef {
                        name: name.clone(),
                        ty: FieldType::Primitive(PrimitiveTag::U32),
                        is_array: false,
                        array_length: None,
                        array_upper_bound: None,
                        upper_bound: None,
                        default_value: None,
                        is_constant: true,
                        value: Some(*value),
                    })
                    .collect();
                output.push(SchemaEntity {
                    name: e.name.clone(),
                    qualified_name: qualified,
                    namespaces: e.namespaces.clone(),
                    fields,
                    hash_value: 0,
                    is_enum: true,
                    is_enum_class: e.is_class,
                    is_naked_struct: false,
                });
            }
            RawEntity::Struct(s) => {
                let qualified = qualify(&s.namespaces, &s.name);
                let mut fields = Vec::with_capacity(s.fields.len());
                for field in &s.fields {
                    fields.push(resolve_field(field, &s.namespaces, &struct_names, &enums)?);
                }
                output.push(SchemaEntity {
                    name: s.name.clone(),
                    qualified_name: qualified,
                    namespaces: s.namespaces.clone(),
                    fields,
                    hash_value: 0,
                    is_enum: false,
                    is_enum_class: false,
                    is_naked_struct: s.is_naked,
                });
            }
        }
    }

    if struct_names.is_empty() {
        return Err(CbufError::NoStructs);
    }

    Ok(output)
}

fn qualify(namespaces: &[String], name: &str) -> String {
    if namespaces.is_empty() {
        name.to_string()
    } else {
        format!("{}::{}", namespaces.join("::"), name)
    }
}

fn register(declared: &mut HashSet<String>, qualified_name: String) -> Result<(), CbufError> {
    if !declared.insert(qualified_name.clone()) {
        return Err(CbufError::DuplicateEntity { qualified_name });
    }
    Ok(())
}

fn check_const(c: &RawConst, qualified: &str) -> Result<(), CbufError> {
    let RawType::Primitive(tag) = c.ty else {
        return Err(CbufError::ComplexDefaultForbidden {
            field: qualified.to_string(),
        });
    };
    check_scalar_value(tag, &c.value, None, qualified).map(|_| ())
}

fn assign_enum_values(e: &RawEnum) -> Result<Vec<(String, i64)>, CbufError> {
    let mut members = Vec::with_capacity(e.members.len());
    let mut next = 0i64;
    for member in &e.members {
        let value = match &member.value {
            None => next,
            Some(RawValue::Number(n)) if n.fract() == 0.0 => *n as i64,
            Some(_) => {
                return Err(CbufError::InvalidDefaultValue {
                    field: format!("{}::{}", e.name, member.name),
                });
            }
        };
        members.push((member.name.clone(), value));
        next = value + 1;
    }
    Ok(members)
}

enum Resolution {
    Struct(String),
    Enum(String),
}

/// The namespace walk of §4.4. If `type_name` already contains `::`, it is
/// looked up directly; otherwise each namespace prefix is tried, from the
/// full enclosing namespace stack down to the bare name.
fn resolve_name(
    namespaces: &[String],
    type_name: &str,
    struct_names: &HashSet<String>,
    enums: &HashMap<String, EnumInfo>,
) -> Result<Resolution, CbufError> {
    let lookup = |candidate: &str| -> Option<Resolution> {
        if struct_names.contains(candidate) {
            Some(Resolution::Struct(candidate.to_string()))
        } else if enums.contains_key(candidate) {
            Some(Resolution::Enum(candidate.to_string()))
        } else {
            None
        }
    };

    if type_name.contains("::") {
        return lookup(type_name).ok_or_else(|| CbufError::UnknownType {
            name: type_name.to_string(),
            context: namespaces.join("::"),
        });
    }

    for depth in (0..=namespaces.len()).rev() {
        let candidate = if depth == 0 {
            type_name.to_string()
        } else {
            format!("{}::{}", namespaces[..depth].join("::"), type_name)
        };
        if let Some(found) = lookup(&candidate) {
            return Ok(found);
        }
    }

    Err(CbufError::UnknownType {
        name: type_name.to_string(),
        context: namespaces.join("::"),
    })
}

fn resolve_field(
    field: &RawField,
    namespaces: &[String],
    struct_names: &HashSet<String>,
    enums: &HashMap<String, EnumInfo>,
) -> Result<FieldDef, CbufError> {
    let (ty, enum_members): (FieldType, Option<&Vec<(String, i64)>>) = match &field.ty {
        RawType::Primitive(tag) => (FieldType::Primitive(*tag), None),
        RawType::Named(name) => match resolve_name(namespaces, name, struct_names, enums)? {
            Resolution::Struct(qualified) => (FieldType::Complex(qualified), None),
            Resolution::Enum(qualified) => {
                (FieldType::Primitive(PrimitiveTag::U32), Some(&enums[&qualified].members))
            }
        },
    };

    let is_array = field.array.is_some();
    let (array_length, array_upper_bound) = match field.array {
        Some(spec) if spec.compact => (None, spec.length),
        Some(spec) => (spec.length, None),
        None => (None, None),
    };
    let upper_bound = if field.short_string { Some(16) } else { None };

    let default_value = match &field.default {
        None => None,
        Some(_) if ty.is_complex() => {
            return Err(CbufError::ComplexDefaultForbidden {
                field: field.name.clone(),
            });
        }
        Some(raw) => {
            let FieldType::Primitive(tag) = ty else {
                unreachable!("complex defaults rejected above");
            };
            Some(resolve_default(
                tag,
                is_array,
                raw,
                enum_members,
                &field.name,
            )?)
        }
    };

    Ok(FieldDef {
        name: field.name.clone(),
        ty,
        is_array,
        array_length,
        array_upper_bound,
        upper_bound,
        default_value,
        is_constant: false,
        value: None,
    })
}

fn resolve_default(
    tag: PrimitiveTag,
    is_array: bool,
    raw: &RawValue,
    enum_members: Option<&Vec<(String, i64)>>,
    field_name: &str,
) -> Result<DefaultValue, CbufError> {
    match (is_array, raw) {
        (true, RawValue::Array(items)) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(check_scalar_value(tag, item, enum_members, field_name)?);
            }
            Ok(DefaultValue::Array(values))
        }
        (true, _) => Err(CbufError::InvalidDefaultValue {
            field: field_name.to_string(),
        }),
        (false, RawValue::Array(_)) => Err(CbufError::InvalidDefaultValue {
            field: field_name.to_string(),
        }),
        (false, other) => Ok(DefaultValue::Scalar(check_scalar_value(
            tag,
            other,
            enum_members,
            field_name,
        )?)),
    }
}

fn check_scalar_value(
    tag: PrimitiveTag,
    value: &RawValue,
    enum_members: Option<&Vec<(String, i64)>>,
    field_name: &str,
) -> Result<ScalarValue, CbufError> {
    let invalid = || CbufError::InvalidDefaultValue {
        field: field_name.to_string(),
    };

    if let (PrimitiveTag::U32, RawValue::Ident(name)) = (tag, value) {
        let members = enum_members.ok_or_else(invalid)?;
        let found = members
            .iter()
            .find(|(member_name, _)| member_name == name)
            .ok_or_else(|| CbufError::UnknownEnumValue {
                enum_name: field_name.to_string(),
                value: name.clone(),
            })?;
        return Ok(ScalarValue::U64(found.1 as u64));
    }

    match (tag, value) {
        (PrimitiveTag::Bool, RawValue::Bool(b)) => Ok(ScalarValue::Bool(*b)),
        (PrimitiveTag::String, RawValue::Str(s)) => Ok(ScalarValue::Str(s.clone())),
        (
            PrimitiveTag::I8 | PrimitiveTag::I16 | PrimitiveTag::I32 | PrimitiveTag::I64,
            RawValue::Number(n),
        ) if n.fract() == 0.0 => Ok(ScalarValue::I64(*n as i64)),
        (
            PrimitiveTag::U8 | PrimitiveTag::U16 | PrimitiveTag::U32 | PrimitiveTag::U64,
            RawValue::Number(n),
        ) if n.fract() == 0.0 && *n >= 0.0 => Ok(ScalarValue::U64(*n as u64)),
        (PrimitiveTag::F32 | PrimitiveTag::F64, RawValue::Number(n)) => Ok(ScalarValue::F64(*n)),
        _ => Err(invalid()),
    }
}

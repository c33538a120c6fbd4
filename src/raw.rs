//! The unresolved AST produced by [`crate::parser`], before [`crate::semantic`]
//! qualifies names, rewrites enum references, and validates defaults.

/// A type as written in the source: either a primitive spelling (already
/// canonicalized to its tag) or a possibly-unqualified complex name.
#[derive(Debug, Clone, PartialEq)]
pub enum RawType {
    Primitive(crate::ast::PrimitiveTag),
    /// A complex type reference, possibly unqualified; `::`-qualification and
    /// enum-vs-struct classification happen in semantic analysis.
    Named(String),
}

/// A scalar or array literal as written on the right-hand side of `=`.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    Str(String),
    Bool(bool),
    /// A bare identifier, accepted by the grammar so enum members can be
    /// referenced by name; resolved or rejected during semantic analysis.
    Ident(String),
    Array(Vec<RawValue>),
}

/// `[]`, `[N]`, or `[N] @compact`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawArraySpec {
    pub length: Option<usize>,
    pub compact: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
    pub name: String,
    pub ty: RawType,
    /// `Some(16)` when the field was written `short_string`.
    pub short_string: bool,
    pub array: Option<RawArraySpec>,
    pub default: Option<RawValue>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawConst {
    pub namespaces: Vec<String>,
    pub name: String,
    pub ty: RawType,
    pub value: RawValue,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawEnumMember {
    pub name: String,
    pub value: Option<RawValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawEnum {
    pub namespaces: Vec<String>,
    pub name: String,
    pub is_class: bool,
    pub members: Vec<RawEnumMember>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawStruct {
    pub namespaces: Vec<String>,
    pub name: String,
    pub is_naked: bool,
    pub fields: Vec<RawField>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawEntity {
    Const(RawConst),
    Enum(RawEnum),
    Struct(RawStruct),
}

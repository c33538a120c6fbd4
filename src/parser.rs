//! The cbuf grammar: recursive descent over brace-delimited blocks, with
//! `nom` combinators for the leaf productions — type spellings, literal
//! values, and the constant-folded `+ - * /` array-length expression.
//!
//! Namespace/struct/enum bodies are located by finding their matching closing
//! brace ([`crate::lex::find_matching_close`]) and recursed into; field and
//! const declarations are located by finding their terminating `;`
//! ([`crate::lex::find_statement_end`]). Blocks are located first and only
//! then handed to `nom` for declaration-level parsing; cbuf's free-form
//! whitespace means blocks are found by brace/semicolon scanning instead of
//! by line.

use nom::character::complete::{char, digit1};
use nom::combinator::{map_res, opt, pair, recognize};
use nom::sequence::tuple;
use nom::IResult;

use crate::ast::{PrimitiveTag, RESERVED_WORDS};
use crate::error::CbufError;
use crate::lex::{find_matching_close, find_statement_end, find_unquoted};
use crate::raw::{
    RawArraySpec, RawConst, RawEntity, RawEnum, RawEnumMember, RawField, RawStruct, RawType,
    RawValue,
};

/// Parse preprocessed cbuf source text into the raw, unresolved entity list.
pub fn parse(text: &str) -> Result<Vec<RawEntity>, CbufError> {
    let mut entities = Vec::new();
    parse_block(text, 0, text.len(), &[], &mut entities)?;
    if entities.is_empty() {
        return Err(CbufError::EmptyParse);
    }
    Ok(entities)
}

fn line_at(text: &str, pos: usize) -> usize {
    1 + text[..pos].matches('\n').count()
}

fn skip_ws(text: &str, pos: usize, end: usize) -> usize {
    let slice = &text[pos..end];
    pos + (slice.len() - slice.trim_start().len())
}

/// If `text[pos..end]`, after skipping whitespace, starts with keyword `kw`
/// at a token boundary, return the offset right after it.
fn keyword_at(text: &str, pos: usize, end: usize, kw: &str) -> Option<usize> {
    let p = skip_ws(text, pos, end);
    let slice = &text[p..end];
    if !slice.starts_with(kw) {
        return None;
    }
    let after = p + kw.len();
    if after < end && text[after..].chars().next().is_some_and(is_ident_continue) {
        return None;
    }
    Some(after)
}

/// Like [`keyword_at`] but never fails — returns `(new_pos, matched)`. Used
/// for optional tokens (`class`, `@naked`, `@compact`).
fn eat_keyword(text: &str, pos: usize, end: usize, kw: &str) -> (usize, bool) {
    match keyword_at(text, pos, end, kw) {
        Some(after) => (after, true),
        None => (pos, false),
    }
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Scan a bare identifier span starting at `pos` (no leading whitespace
/// skip, no reserved-word check). Returns the identifier and the offset of
/// the first unconsumed byte.
fn take_raw_ident(text: &str, pos: usize, end: usize) -> Result<(String, usize), CbufError> {
    let slice = &text[pos..end];
    let ident_len = slice
        .char_indices()
        .take_while(|&(i, c)| if i == 0 { c.is_alphabetic() || c == '_' } else { is_ident_continue(c) })
        .count();
    if ident_len == 0 {
        return Err(CbufError::SyntaxError {
            line: line_at(text, pos),
            message: "expected identifier".to_string(),
        });
    }
    Ok((slice[..ident_len].to_string(), pos + ident_len))
}

/// Like [`take_raw_ident`] but rejects the reserved set (keywords and every
/// type spelling). Used for names being *declared* — struct, namespace,
/// enum, field, const, and enum member names — never for type references,
/// since a type reference may legitimately be a primitive spelling (`bool`,
/// `u32`, ...), which is itself in the reserved set.
fn take_ident(text: &str, pos: usize, end: usize) -> Result<(String, usize), CbufError> {
    let (name, after) = take_raw_ident(text, pos, end)?;
    if RESERVED_WORDS.contains(&name.as_str()) {
        return Err(CbufError::SyntaxError {
            line: line_at(text, pos),
            message: format!("'{name}' is a reserved word and cannot be used as an identifier"),
        });
    }
    Ok((name, after))
}

/// Parse `a::b::c`-style qualified name, or a single identifier.
fn take_qualified_name(text: &str, pos: usize, end: usize) -> Result<(String, usize), CbufError> {
    let (first, mut after) = take_ident(text, pos, end)?;
    let mut qualified = first;
    while after + 1 < end && &text[after..after + 2] == "::" {
        let (seg, seg_after) = take_ident(text, after + 2, end)?;
        qualified.push_str("::");
        qualified.push_str(&seg);
        after = seg_after;
    }
    Ok((qualified, after))
}

/// Parse `IDENT {`'s identifier (used by `namespace IDENT {` / `enum
/// [class] IDENT {` headers); the brace itself is located separately.
fn parse_simple_header(text: &str, pos: usize, end: usize, what: &str) -> Result<(String, usize), CbufError> {
    let p = skip_ws(text, pos, end);
    take_ident(text, p, end).map_err(|_| CbufError::SyntaxError {
        line: line_at(text, p),
        message: format!("expected identifier after '{what}'"),
    })
}

/// Parse the top-level forms inside `text[start..end]` — a namespace body or
/// the whole file — emitting entities qualified by `namespaces` into `out`.
fn parse_block(
    text: &str,
    start: usize,
    end: usize,
    namespaces: &[String],
    out: &mut Vec<RawEntity>,
) -> Result<(), CbufError> {
    let mut pos = start;
    loop {
        pos = skip_ws(text, pos, end);
        if pos >= end {
            return Ok(());
        }
        let stmt_line = line_at(text, pos);

        if let Some(rest) = keyword_at(text, pos, end, "namespace") {
            let (name, after_name) = parse_simple_header(text, rest, end, "namespace")?;
            if !namespaces.is_empty() {
                return Err(CbufError::NestedNamespace { name });
            }
            let (open, close) = block_braces(text, after_name, end, stmt_line, "namespace")?;
            let mut nested = namespaces.to_vec();
            nested.push(name);
            parse_block(text, open + 1, close, &nested, out)?;
            pos = close + 1;
            continue;
        }

        if let Some(rest) = keyword_at(text, pos, end, "const") {
            let semi = find_statement_end(text, rest)
                .filter(|&s| s < end)
                .ok_or_else(|| CbufError::SyntaxError {
                    line: stmt_line,
                    message: "const declaration missing ';'".to_string(),
                })?;
            let c = parse_const_body(&text[rest..semi], stmt_line, namespaces)?;
            out.push(RawEntity::Const(c));
            pos = semi + 1;
            continue;
        }

        if let Some(rest) = keyword_at(text, pos, end, "enum") {
            let (after_class, is_class) = eat_keyword(text, rest, end, "class");
            let (name, after_name) = parse_simple_header(text, after_class, end, "enum")?;
            let (open, close) = block_braces(text, after_name, end, stmt_line, "enum")?;
            let members = parse_enum_body(&text[open + 1..close], stmt_line)?;
            out.push(RawEntity::Enum(RawEnum {
                namespaces: namespaces.to_vec(),
                name,
                is_class,
                members,
                line: stmt_line,
            }));
            pos = close + 1;
            continue;
        }

        if let Some(rest) = keyword_at(text, pos, end, "struct") {
            let (name, after_name) = parse_simple_header(text, rest, end, "struct")?;
            let (after_naked, is_naked) = eat_keyword(text, after_name, end, "@naked");
            let (open, close) = block_braces(text, after_naked, end, stmt_line, "struct")?;
            let fields = parse_struct_body(text, open + 1, close)?;
            out.push(RawEntity::Struct(RawStruct {
                namespaces: namespaces.to_vec(),
                name,
                is_naked,
                fields,
                line: stmt_line,
            }));
            pos = close + 1;
            continue;
        }

        return Err(CbufError::SyntaxError {
            line: stmt_line,
            message: format!(
                "expected 'namespace', 'const', 'enum', or 'struct', found: {}",
                &text[pos..end.min(pos + 40)]
            ),
        });
    }
}

/// Locate the `{` at or after `pos` and its matching `}`, both within `end`.
fn block_braces(
    text: &str,
    pos: usize,
    end: usize,
    line: usize,
    what: &str,
) -> Result<(usize, usize), CbufError> {
    let open = find_unquoted(text, pos, '{')
        .filter(|&o| o < end)
        .ok_or_else(|| CbufError::SyntaxError {
            line,
            message: format!("{what} missing opening '{{'"),
        })?;
    let close = find_matching_close(text, open, '{', '}')
        .filter(|&c| c < end)
        .ok_or_else(|| CbufError::SyntaxError {
            line,
            message: format!("{what} missing closing '}}'"),
        })?;
    Ok((open, close))
}

fn parse_enum_body(body: &str, line: usize) -> Result<Vec<RawEnumMember>, CbufError> {
    let mut members = Vec::new();
    for chunk in split_unquoted(body, ',') {
        let trimmed = chunk.trim();
        if trimmed.is_empty() {
            continue;
        }
        let (name, after) =
            take_ident(trimmed, 0, trimmed.len()).map_err(|_| CbufError::SyntaxError {
                line,
                message: format!("invalid enum member: {trimmed}"),
            })?;
        let remainder = trimmed[after..].trim();
        let value = if let Some(rhs) = remainder.strip_prefix('=') {
            Some(parse_rhs_value(rhs.trim(), line)?)
        } else if remainder.is_empty() {
            None
        } else {
            return Err(CbufError::SyntaxError {
                line,
                message: format!("unexpected trailing text in enum member: {remainder}"),
            });
        };
        members.push(RawEnumMember { name, value });
    }
    Ok(members)
}

/// Split `text` on unquoted occurrences of `sep` at bracket depth 0,
/// respecting string literals (so a nested `{...}`/`(...)` is not split).
fn split_unquoted(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0usize;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' | '{' => depth += 1,
            ')' | '}' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn parse_struct_body(text: &str, start: usize, end: usize) -> Result<Vec<RawField>, CbufError> {
    let mut fields = Vec::new();
    let mut pos = start;
    loop {
        pos = skip_ws(text, pos, end);
        if pos >= end {
            return Ok(fields);
        }
        let line = line_at(text, pos);
        let semi = find_statement_end(text, pos)
            .filter(|&s| s < end)
            .ok_or_else(|| CbufError::SyntaxError {
                line,
                message: "field declaration missing ';'".to_string(),
            })?;
        fields.push(parse_field_body(&text[pos..semi], line)?);
        pos = semi + 1;
    }
}

fn parse_const_body(body: &str, line: usize, namespaces: &[String]) -> Result<RawConst, CbufError> {
    let body = body.trim();
    let (ty, after_ty) = parse_type(body, line)?;
    let rest = &body[after_ty..];
    let rest_start = rest.len() - rest.trim_start().len();
    let (name, after_name) =
        take_ident(rest, rest_start, rest.len()).map_err(|_| CbufError::SyntaxError {
            line,
            message: "expected identifier in const declaration".to_string(),
        })?;
    let rhs = rest[after_name..]
        .trim_start()
        .strip_prefix('=')
        .ok_or_else(|| CbufError::SyntaxError {
            line,
            message: "const declaration missing '='".to_string(),
        })?;
    let value = parse_rhs_value(rhs.trim(), line)?;
    Ok(RawConst {
        namespaces: namespaces.to_vec(),
        name,
        ty,
        value,
        line,
    })
}

fn parse_field_body(body: &str, line: usize) -> Result<RawField, CbufError> {
    let body = body.trim();
    let (short_string, ty_source) = match strip_keyword(body, "short_string") {
        Some(rest) => (true, rest.trim_start()),
        None => (false, body),
    };
    let (ty, after_ty) = if short_string {
        (RawType::Primitive(PrimitiveTag::String), 0)
    } else {
        parse_type(ty_source, line)?
    };
    let rest = &ty_source[after_ty..];
    let rest_start = rest.len() - rest.trim_start().len();
    let (name, after_name) =
        take_ident(rest, rest_start, rest.len()).map_err(|_| CbufError::SyntaxError {
            line,
            message: "expected field name".to_string(),
        })?;
    let mut rest = rest[after_name..].trim_start();

    let mut array = None;
    if let Some(after_bracket) = rest.strip_prefix('[') {
        let close = find_unquoted(after_bracket, 0, ']').ok_or_else(|| CbufError::SyntaxError {
            line,
            message: "array field missing closing ']'".to_string(),
        })?;
        let inner = after_bracket[..close].trim();
        let length = if inner.is_empty() {
            None
        } else {
            Some(eval_array_length(inner, line)?)
        };
        rest = after_bracket[close + 1..].trim_start();
        let compact = match strip_keyword(rest, "@compact") {
            Some(after_compact) => {
                rest = after_compact.trim_start();
                true
            }
            None => false,
        };
        if compact && length.is_none() {
            return Err(CbufError::SyntaxError {
                line,
                message: "'[] @compact' is not a valid array form; only '[N] @compact' is"
                    .to_string(),
            });
        }
        array = Some(RawArraySpec { length, compact });
    }

    let default = if let Some(rhs) = rest.strip_prefix('=') {
        Some(parse_rhs_value(rhs.trim(), line)?)
    } else if rest.trim().is_empty() {
        None
    } else {
        return Err(CbufError::SyntaxError {
            line,
            message: format!("unexpected trailing text in field declaration: {rest}"),
        });
    };

    Ok(RawField {
        name,
        ty,
        short_string,
        array,
        default,
        line,
    })
}

fn strip_keyword<'a>(text: &'a str, kw: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(kw)?;
    match rest.chars().next() {
        Some(c) if is_ident_continue(c) => None,
        _ => Some(rest),
    }
}

/// Parse a type: primitive spelling or qualified complex name. Returns the
/// type and the byte offset of the first unconsumed character.
///
/// Primitive spellings (`bool`, `u32`, `string`, ...) are themselves part of
/// the reserved set, so they are recognized via a bare identifier scan
/// before any reserved-word check runs; only once a name fails to match
/// a primitive spelling is it parsed (and reserved-word-checked) as a
/// possibly-qualified complex type name.
fn parse_type(body: &str, line: usize) -> Result<(RawType, usize), CbufError> {
    let (first, after) = take_raw_ident(body, 0, body.len()).map_err(|_| CbufError::SyntaxError {
        line,
        message: "expected a type name".to_string(),
    })?;
    if let Some(tag) = PrimitiveTag::from_spelling(&first) {
        return Ok((RawType::Primitive(tag), after));
    }
    let (name, after) =
        take_qualified_name(body, 0, body.len()).map_err(|_| CbufError::SyntaxError {
            line,
            message: "expected a type name".to_string(),
        })?;
    Ok((RawType::Named(name), after))
}

fn parse_rhs_value(text: &str, line: usize) -> Result<RawValue, CbufError> {
    let text = text.trim();
    if let Some(inner) = text.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        let mut elements = Vec::new();
        for chunk in split_unquoted(inner, ',') {
            let trimmed = chunk.trim();
            if trimmed.is_empty() {
                continue;
            }
            elements.push(parse_rhs_scalar(trimmed, line)?);
        }
        return Ok(RawValue::Array(elements));
    }
    parse_rhs_scalar(text, line)
}

fn parse_rhs_scalar(text: &str, line: usize) -> Result<RawValue, CbufError> {
    let text = text.trim();
    if let Some(inner) = text.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return Ok(RawValue::Str(unescape(inner)));
    }
    if text == "true" {
        return Ok(RawValue::Bool(true));
    }
    if text == "false" {
        return Ok(RawValue::Bool(false));
    }
    if let Ok((remaining, n)) = signed_number(text)
        && remaining.trim().is_empty()
    {
        return Ok(RawValue::Number(n));
    }
    let (ident, after) = take_ident(text, 0, text.len()).map_err(|_| CbufError::SyntaxError {
        line,
        message: format!("invalid value: {text}"),
    })?;
    if text[after..].trim().is_empty() {
        return Ok(RawValue::Ident(ident));
    }
    Err(CbufError::SyntaxError {
        line,
        message: format!("invalid value: {text}"),
    })
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// `-?[0-9]+(\.[0-9]+)?`, via `nom`.
fn signed_number(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((opt(char('-')), digit1, opt(pair(char('.'), digit1))))),
        |s: &str| s.parse::<f64>(),
    )(input)
}

/// Evaluate the `[N]` array-length expression: `+ - * /` and parens over
/// numeric literals, folded at parse time.
fn eval_array_length(text: &str, line: usize) -> Result<usize, CbufError> {
    let (remaining, value) = expr(text.trim()).map_err(|e| CbufError::SyntaxError {
        line,
        message: format!("invalid array length expression '{text}': {e}"),
    })?;
    if !remaining.trim().is_empty() {
        return Err(CbufError::SyntaxError {
            line,
            message: format!("unexpected trailing text in array length: {remaining}"),
        });
    }
    if value < 0.0 || value.fract() != 0.0 {
        return Err(CbufError::SyntaxError {
            line,
            message: format!("array length must be a non-negative integer, found {value}"),
        });
    }
    Ok(value as usize)
}

enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

fn expr(input: &str) -> IResult<&str, f64> {
    let (input, init) = term(input)?;
    fold_ops(input, init, &[('+', Op::Add), ('-', Op::Sub)], term)
}

fn term(input: &str) -> IResult<&str, f64> {
    let (input, init) = factor(input)?;
    fold_ops(input, init, &[('*', Op::Mul), ('/', Op::Div)], factor)
}

fn fold_ops<'a>(
    mut input: &'a str,
    mut acc: f64,
    ops: &[(char, Op)],
    next: impl Fn(&'a str) -> IResult<&'a str, f64>,
) -> IResult<&'a str, f64> {
    loop {
        let trimmed = input.trim_start();
        let Some((_, matched_op)) = ops.iter().find(|(c, _)| trimmed.starts_with(*c)) else {
            return Ok((input, acc));
        };
        let (rest, rhs) = next(trimmed[1..].trim_start())?;
        acc = match matched_op {
            Op::Add => acc + rhs,
            Op::Sub => acc - rhs,
            Op::Mul => acc * rhs,
            Op::Div => acc / rhs,
        };
        input = rest;
    }
}

fn factor(input: &str) -> IResult<&str, f64> {
    let input = input.trim_start();
    if let Some(rest) = input.strip_prefix('(') {
        let (rest, value) = expr(rest)?;
        let rest = rest.trim_start();
        let (rest, _) = char(')')(rest)?;
        return Ok((rest, value));
    }
    signed_number(input)
}

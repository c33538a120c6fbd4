//! Comment stripping and `#import` splicing (§4.1 of the schema format).

use std::collections::{HashMap, HashSet};

use crate::error::CbufError;
use crate::lex::strip_comments;

/// Strip comments from `text` and recursively splice in every `#import "path"`
/// directive, resolving each path against `imports`.
///
/// Comments are stripped from each text unit *before* its `#import` lines are
/// scanned, and this is applied recursively to each imported unit as it is
/// spliced in — so an imported file that itself contains comments or further
/// imports is handled correctly. A path imported more than once (directly or
/// transitively) is replaced with empty text on its second and later
/// occurrences, which makes the expansion idempotent and immune to import
/// cycles.
pub fn preprocess(text: &str, imports: &HashMap<String, String>) -> Result<String, CbufError> {
    let mut seen = HashSet::new();
    expand(text, imports, &mut seen)
}

fn expand(
    text: &str,
    imports: &HashMap<String, String>,
    seen: &mut HashSet<String>,
) -> Result<String, CbufError> {
    let stripped = strip_comments(text);
    let mut out = String::with_capacity(stripped.len());

    for line in stripped.lines() {
        match parse_import_line(line) {
            Some(path) => {
                if seen.contains(&path) {
                    continue;
                }
                seen.insert(path.clone());
                let imported = imports
                    .get(&path)
                    .ok_or_else(|| CbufError::ImportNotFound { path: path.clone() })?;
                out.push_str(&expand(imported, imports, seen)?);
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }

    Ok(out)
}

/// Recognize a line of the form `#import "path"`, ignoring surrounding
/// whitespace. Returns the unquoted path.
fn parse_import_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix("#import")?;
    let rest = rest.trim();
    let rest = rest.strip_prefix('"')?;
    let path = rest.strip_suffix('"')?;
    Some(path.to_string())
}

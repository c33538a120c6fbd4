//! Preprocessor tests (§4.1): comment stripping, import splicing, cycle
//! idempotency, and the idempotence invariant (§8 invariant 3).

use std::collections::HashMap;

use cbuf::preprocess;

#[test]
fn strips_line_and_block_comments() {
    let src = "// leading comment\nstruct a { /* inline */ bool b; } // trailing\n";
    let out = preprocess(src, &HashMap::new()).unwrap();
    assert!(!out.contains("//"));
    assert!(!out.contains("/*"));
    assert!(out.contains("struct a"));
    assert!(out.contains("bool b;"));
}

#[test]
fn block_comment_spans_multiple_lines() {
    let src = "struct a {\n/* this\nspans\nlines */\nbool b;\n}";
    let out = preprocess(src, &HashMap::new()).unwrap();
    assert!(!out.contains("spans"));
    assert!(out.contains("bool b;"));
}

#[test]
fn comments_inside_string_literals_are_untouched() {
    let src = "const string s = \"not // a comment\";";
    let out = preprocess(src, &HashMap::new()).unwrap();
    assert!(out.contains("not // a comment"));
}

#[test]
fn single_import_is_spliced_in() {
    let mut imports = HashMap::new();
    imports.insert("common.cbuf".to_string(), "struct common { bool flag; }".to_string());
    let src = "#import \"common.cbuf\"\nstruct a { common c; }";
    let out = preprocess(src, &imports).unwrap();
    assert!(!out.contains("#import"));
    assert!(out.contains("struct common"));
    assert!(out.contains("struct a"));
}

#[test]
fn recursive_imports_are_fully_expanded() {
    let mut imports = HashMap::new();
    imports.insert("base.cbuf".to_string(), "struct base { bool flag; }".to_string());
    imports.insert(
        "middle.cbuf".to_string(),
        "#import \"base.cbuf\"\nstruct middle { base b; }".to_string(),
    );
    let src = "#import \"middle.cbuf\"\nstruct top { middle m; }";
    let out = preprocess(src, &imports).unwrap();
    assert!(out.contains("struct base"));
    assert!(out.contains("struct middle"));
    assert!(out.contains("struct top"));
    assert!(!out.contains("#import"));
}

#[test]
fn repeated_import_is_expanded_only_once() {
    let mut imports = HashMap::new();
    imports.insert("common.cbuf".to_string(), "struct common { bool flag; }".to_string());
    let src = "#import \"common.cbuf\"\n#import \"common.cbuf\"\nstruct a { common c; }";
    let out = preprocess(src, &imports).unwrap();
    assert_eq!(out.matches("struct common").count(), 1);
}

#[test]
fn import_cycle_does_not_duplicate_or_hang() {
    let mut imports = HashMap::new();
    imports.insert("a.cbuf".to_string(), "#import \"b.cbuf\"\nstruct a { bool x; }".to_string());
    imports.insert("b.cbuf".to_string(), "#import \"a.cbuf\"\nstruct b { bool y; }".to_string());
    let out = preprocess("#import \"a.cbuf\"\nstruct top { bool z; }", &imports).unwrap();
    assert_eq!(out.matches("struct a").count(), 1);
    assert_eq!(out.matches("struct b").count(), 1);
    assert_eq!(out.matches("struct top").count(), 1);
}

#[test]
fn missing_import_fails() {
    let err = preprocess("#import \"missing.cbuf\"\n", &HashMap::new()).unwrap_err();
    assert!(matches!(err, cbuf::CbufError::ImportNotFound { path } if path == "missing.cbuf"));
}

#[test]
fn preprocessing_is_idempotent_without_imports() {
    // §8 invariant 3: parse(preprocess(T)) == parse(preprocess(preprocess(T))).
    let src = "// comment\nstruct a { /* c */ bool b; }\n";
    let once = preprocess(src, &HashMap::new()).unwrap();
    let twice = preprocess(&once, &HashMap::new()).unwrap();
    let parsed_once = cbuf::parse(&once).unwrap();
    let parsed_twice = cbuf::parse(&twice).unwrap();
    assert_eq!(parsed_once, parsed_twice);
}

// ABOUTME: Unit tests for the placeholder grammar, escaping, and both binder operations
// ABOUTME: Covers escape round-trips, NULL substitution, %% handling, and params mask derivation
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use sqlgate::{
    bind_query_params, convert_array_to_sql_list, convert_to_statement_format, escape_string,
    DbError, Value,
};

/// Helper: decode a SQL-escaped string back to its original form
fn unescape(escaped: &str) -> String {
    let mut out = String::new();
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('0') => out.push('\0'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('Z') => out.push('\u{1a}'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[test]
fn test_escape_string_covers_all_dangerous_characters() {
    assert_eq!(escape_string("a\\b"), "a\\\\b");
    assert_eq!(escape_string("a\0b"), "a\\0b");
    assert_eq!(escape_string("a\nb"), "a\\nb");
    assert_eq!(escape_string("a\rb"), "a\\rb");
    assert_eq!(escape_string("a\u{1a}b"), "a\\Zb");
    assert_eq!(escape_string("a'b"), "a\\'b");
    assert_eq!(escape_string("a\"b"), "a\\\"b");
    assert_eq!(escape_string("plain"), "plain");
}

#[test]
fn test_escape_string_round_trips() {
    let nasty = "x\\y\0z\n\r\u{1a}'quoted'\"double\"";
    assert_eq!(unescape(&escape_string(nasty)), nasty);
}

#[test]
fn test_emulated_binding_escapes_and_substitutes_in_order() {
    let sql = bind_query_params(
        "SET x=%s WHERE id=%d",
        &[Value::from("a'b"), Value::from(5)],
    )
    .unwrap();
    assert_eq!(sql, "SET x='a\\'b' WHERE id=5");
}

#[test]
fn test_emulated_binding_substitutes_null_for_absent_values() {
    let sql = bind_query_params("SET a=%s, b=%s", &[Value::Null, Value::Null]).unwrap();
    assert_eq!(sql, "SET a=NULL, b=NULL");
}

#[test]
fn test_emulated_binding_integer_coercion_truncates() {
    let sql = bind_query_params(
        "SET a=%d, b=%d, c=%d",
        &[Value::from("12abc"), Value::from(3.9), Value::from("junk")],
    )
    .unwrap();
    assert_eq!(sql, "SET a=12, b=3, c=0");
}

#[test]
fn test_emulated_binding_float_coercion() {
    let sql = bind_query_params("SET a=%f, b=%f", &[Value::from("3.5x"), Value::Null]).unwrap();
    assert_eq!(sql, "SET a=3.5, b=NULL");
}

#[test]
fn test_escaped_percent_is_never_a_placeholder() {
    let sql = bind_query_params("SELECT * FROM t WHERE name LIKE '%%ada%%'", &[]).unwrap();
    assert_eq!(sql, "SELECT * FROM t WHERE name LIKE '%ada%'");

    // %%d is an escaped percent followed by a literal 'd', not a placeholder
    let sql = bind_query_params("SET a='100%%d'", &[]).unwrap();
    assert_eq!(sql, "SET a='100%d'");
}

#[test]
fn test_unrecognized_percent_sequences_pass_through() {
    let sql = bind_query_params("SELECT '%x' FROM t", &[]).unwrap();
    assert_eq!(sql, "SELECT '%x' FROM t");
}

#[test]
fn test_parameter_exhaustion_is_an_error() {
    let err = bind_query_params("SET a=%s, b=%s", &[Value::from("one")]).unwrap_err();
    assert!(matches!(
        err,
        DbError::MissingParameter {
            placeholder: 2,
            supplied: 1
        }
    ));
}

#[test]
fn test_blob_placeholder_is_unsupported() {
    let err = bind_query_params("INSERT INTO t VALUES (%b)", &[Value::from("x")]).unwrap_err();
    assert!(matches!(err, DbError::UnsupportedPlaceholder { tag: 'b' }));
}

#[test]
fn test_list_placeholder_renders_parenthesized_list() {
    let sql = bind_query_params(
        "SELECT * FROM t WHERE id IN %a",
        &[Value::from(vec![Value::from(1), Value::from(2)])],
    )
    .unwrap();
    assert_eq!(sql, "SELECT * FROM t WHERE id IN (1,2)");
}

#[test]
fn test_statement_format_rewrites_placeholders_and_derives_mask() {
    let (text, mask) = convert_to_statement_format("SELECT * FROM t WHERE id=%d").unwrap();
    assert_eq!(text, "SELECT * FROM t WHERE id=?");
    assert_eq!(mask.as_str(), "i");

    let (text, mask) =
        convert_to_statement_format("UPDATE t SET name=%s, score=%f WHERE id=%d").unwrap();
    assert_eq!(text, "UPDATE t SET name=?, score=? WHERE id=?");
    assert_eq!(mask.as_str(), "sdi");
    assert_eq!(mask.len(), 3);
}

#[test]
fn test_statement_format_preserves_escaped_percent() {
    let (text, mask) = convert_to_statement_format("SELECT '100%%' FROM t").unwrap();
    assert_eq!(text, "SELECT '100%' FROM t");
    assert!(mask.is_empty());
}

#[test]
fn test_statement_format_rejects_list_placeholder() {
    let err = convert_to_statement_format("SELECT * FROM t WHERE id IN %a").unwrap_err();
    assert!(matches!(err, DbError::UnsupportedPlaceholder { tag: 'a' }));
}

#[test]
fn test_array_to_sql_list_quotes_text_and_keeps_numerics_verbatim() {
    let sql = convert_array_to_sql_list(&[Value::from(1), Value::from("a"), Value::Null]);
    assert_eq!(sql, "(1,\"a\",NULL)");
}

#[test]
fn test_array_to_sql_list_flattens_nested_lists() {
    let sql = convert_array_to_sql_list(&[
        Value::from(vec![Value::from(1), Value::from(2)]),
        Value::from(vec![Value::from(3), Value::from(4)]),
    ]);
    assert_eq!(sql, "(1,2,3,4)");
}

#[test]
fn test_array_to_sql_list_escapes_text_elements() {
    let sql = convert_array_to_sql_list(&[Value::from("a\"b")]);
    assert_eq!(sql, "(\"a\\\"b\")");
}

// ABOUTME: Placeholder grammar scanner and the two parameter binders
// ABOUTME: Produces literal SQL for emulated binding or driver statement text plus a params mask
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Placeholder grammar and binding.
//!
//! Templates embed two-character placeholders `%s` (string), `%d` (integer),
//! `%f` (float), and `%a` (list, emulated binding only). `%%` is the escape
//! for a literal percent sign and never consumes a parameter. `%b` is part of
//! the grammar but unsupported. Both binder operations share one
//! left-to-right scanner, so parameter pairing order and the `%%` skip rule
//! are a single contract.

use crate::errors::{DbError, DbResult};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Positional parameter type tags of a prepared statement.
///
/// One character per `s`/`d`/`f` placeholder in left-to-right template order:
/// `i` integer, `d` double, `s` string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamsMask(String);

impl ParamsMask {
    /// Number of positional parameters the statement expects
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the statement takes no parameters (binding is skipped entirely)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The mask as its compact tag string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate the per-parameter type tags in positional order
    pub fn tags(&self) -> impl Iterator<Item = char> + '_ {
        self.0.chars()
    }
}

/// Escape a string for embedding in a SQL string literal.
///
/// This is the sole injection defense for the emulated binding path: it must
/// transform backslash, NUL, LF, CR, SUB (0x1A), single quote, and double
/// quote into their SQL-safe escape sequences.
#[must_use]
pub fn escape_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}

/// Emulated binder: substitute `params` into `template` left-to-right,
/// producing fully literal SQL.
///
/// Placeholders pair 1:1 with the parameter sequence in order; a `Null`
/// parameter renders as the `NULL` keyword. Surplus parameters are ignored.
///
/// # Errors
///
/// Returns [`DbError::MissingParameter`] when the parameter sequence is
/// shorter than the placeholder count, and
/// [`DbError::UnsupportedPlaceholder`] for `%b`.
pub fn bind_query_params(template: &str, params: &[Value]) -> DbResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut next_param = 0usize;

    scan(template, |piece| {
        match piece {
            Piece::Literal(c) => out.push(c),
            Piece::Placeholder(tag) => {
                let value = params.get(next_param).ok_or(DbError::MissingParameter {
                    placeholder: next_param + 1,
                    supplied: params.len(),
                })?;
                next_param += 1;
                render_placeholder(tag, value, &mut out)?;
            }
        }
        Ok(())
    })?;

    Ok(out)
}

/// Statement binder: rewrite `s`/`d`/`f` placeholders to the driver's
/// positional marker and derive the [`ParamsMask`] in the same scan.
///
/// # Errors
///
/// Returns [`DbError::UnsupportedPlaceholder`] for `%a` (lists cannot be
/// bound positionally) and `%b`.
pub fn convert_to_statement_format(template: &str) -> DbResult<(String, ParamsMask)> {
    let mut text = String::with_capacity(template.len());
    let mut mask = String::new();

    scan(template, |piece| {
        match piece {
            Piece::Literal(c) => text.push(c),
            Piece::Placeholder(tag) => {
                let type_tag = match tag {
                    'd' => 'i',
                    'f' => 'd',
                    's' => 's',
                    other => return Err(DbError::UnsupportedPlaceholder { tag: other }),
                };
                text.push('?');
                mask.push(type_tag);
            }
        }
        Ok(())
    })?;

    Ok((text, ParamsMask(mask)))
}

/// Render a list value as a parenthesized, comma-joined SQL list.
///
/// Text elements are double-quoted and escaped, numerics render verbatim,
/// NULL renders as the keyword, and nested lists flatten without their own
/// parentheses, which supports multi-row `VALUES (...),(...)` constructs.
#[must_use]
pub fn convert_array_to_sql_list(values: &[Value]) -> String {
    let mut out = String::from("(");
    push_list_items(values, &mut out);
    out.push(')');
    out
}

fn push_list_items(values: &[Value], out: &mut String) {
    let mut first = true;
    for value in values {
        if !first {
            out.push(',');
        }
        first = false;
        match value {
            Value::Null => out.push_str("NULL"),
            Value::Int(v) => out.push_str(&v.to_string()),
            Value::Float(v) => out.push_str(&v.to_string()),
            Value::Text(s) => {
                out.push('"');
                out.push_str(&escape_string(s));
                out.push('"');
            }
            Value::List(inner) => push_list_items(inner, out),
        }
    }
}

enum Piece {
    /// A literal output character (includes the `%` produced by `%%`)
    Literal(char),
    /// A recognized placeholder tag: one of `a`, `d`, `f`, `s`, `b`
    Placeholder(char),
}

/// Shared left-to-right scanner. `%%` emits a single literal `%` and is
/// never treated as a placeholder; unrecognized `%x` sequences pass through
/// verbatim.
fn scan<F>(template: &str, mut emit: F) -> DbResult<()>
where
    F: FnMut(Piece) -> DbResult<()>,
{
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            emit(Piece::Literal(c))?;
            continue;
        }
        match chars.peek().copied() {
            Some('%') => {
                chars.next();
                emit(Piece::Literal('%'))?;
            }
            Some(tag @ ('a' | 'd' | 'f' | 's' | 'b')) => {
                chars.next();
                emit(Piece::Placeholder(tag))?;
            }
            _ => emit(Piece::Literal('%'))?,
        }
    }
    Ok(())
}

fn render_placeholder(tag: char, value: &Value, out: &mut String) -> DbResult<()> {
    match tag {
        's' => match value {
            Value::Null => out.push_str("NULL"),
            other => {
                out.push('\'');
                out.push_str(&escape_string(&other.to_text()));
                out.push('\'');
            }
        },
        'd' => match value.to_int() {
            Some(v) => out.push_str(&v.to_string()),
            None => out.push_str("NULL"),
        },
        'f' => match value.to_float() {
            Some(v) => out.push_str(&v.to_string()),
            None => out.push_str("NULL"),
        },
        'a' => match value {
            Value::List(items) => out.push_str(&convert_array_to_sql_list(items)),
            single => out.push_str(&convert_array_to_sql_list(std::slice::from_ref(single))),
        },
        other => return Err(DbError::UnsupportedPlaceholder { tag: other }),
    }
    Ok(())
}

// ABOUTME: Tagged SQL value passed between callers, the binder, and the driver
// ABOUTME: Carries NULL, integer, float, text, and list values with cast-style coercions
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use serde::{Deserialize, Serialize};

/// A single SQL parameter or column value.
///
/// `List` is only meaningful for emulated binding (`%a` placeholders and
/// `convert_array_to_sql_list`); true prepared statements reject it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL / absent value
    Null,
    /// 64-bit signed integer
    Int(i64),
    /// Double-precision float
    Float(f64),
    /// Text value
    Text(String),
    /// Ordered list of values, possibly nested
    List(Vec<Value>),
}

impl Value {
    /// Whether this value is SQL NULL
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer cast with truncating semantics.
    ///
    /// Floats truncate toward zero; text yields the value of its leading
    /// decimal digits (`"12abc"` → 12, `"abc"` → 0), matching the cast
    /// behavior the emulated binder inherited from its source environment.
    /// Returns `None` only for NULL; lists coerce to 0.
    #[must_use]
    pub fn to_int(&self) -> Option<i64> {
        match self {
            Self::Null => None,
            Self::Int(v) => Some(*v),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(v) => Some(*v as i64),
            Self::Text(s) => Some(leading_int(s)),
            Self::List(_) => Some(0),
        }
    }

    /// Float cast with the same truncating text semantics as [`Self::to_int`]
    #[must_use]
    pub fn to_float(&self) -> Option<f64> {
        match self {
            Self::Null => None,
            #[allow(clippy::cast_precision_loss)]
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(s) => Some(leading_float(s)),
            Self::List(_) => Some(0.0),
        }
    }

    /// Render this value as unescaped text (NULL renders as empty text)
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Text(s) => s.clone(),
            Self::List(_) => String::new(),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

/// Value of the leading decimal integer in `s`, 0 when there is none.
/// Saturates instead of overflowing.
fn leading_int(s: &str) -> i64 {
    let trimmed = s.trim_start();
    let mut chars = trimmed.chars().peekable();
    let negative = match chars.peek() {
        Some('-') => {
            chars.next();
            true
        }
        Some('+') => {
            chars.next();
            false
        }
        _ => false,
    };

    let mut value: i64 = 0;
    while let Some(c) = chars.peek() {
        let Some(digit) = c.to_digit(10) else { break };
        chars.next();
        value = value.saturating_mul(10).saturating_add(i64::from(digit));
    }

    if negative {
        value.saturating_neg()
    } else {
        value
    }
}

/// Value of the longest leading float literal in `s`, 0.0 when there is none
fn leading_float(s: &str) -> f64 {
    let trimmed = s.trim_start();
    let boundaries: Vec<usize> = trimmed
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .collect();
    for end in boundaries.into_iter().rev() {
        if let Ok(v) = trimmed[..end].parse::<f64>() {
            return v;
        }
    }
    0.0
}

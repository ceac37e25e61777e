//! Scalar values and the primitive types that describe them.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar value stored at a leaf, a leaf-list entry, or used as a list key.
///
/// `Int` and `Uint` holding the same number compare equal: documents read
/// every non-negative integer back as `Int`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Marker stored for an `empty` leaf that has been created
    Empty,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Decimal(f64),
    String(String),
}

impl Value {
    /// The literal spelling of this value inside a path predicate.
    #[must_use]
    pub fn to_literal(&self) -> String {
        match self {
            Value::Empty => String::new(),
            Value::Bool(true) => "true".to_string(),
            Value::Bool(false) => "false".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Uint(u) => u.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::String(s) => s.clone(),
        }
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::String(s) if s.is_empty())
    }

    fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(i) => Some(i128::from(*i)),
            Value::Uint(u) => Some(i128::from(*u)),
            Value::String(s) => s.trim().parse::<i128>().ok(),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::Int(i) => Some(*i as f64),
            Value::Uint(u) => Some(*u as f64),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Empty, Value::Empty) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(_) | Value::Uint(_), Value::Int(_) | Value::Uint(_)) => {
                self.as_i128() == other.as_i128()
            }
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_literal())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::Uint(u)
    }
}

impl From<u32> for Value {
    fn from(u: u32) -> Self {
        Value::Uint(u64::from(u))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Primitive type tag of a leaf, leaf-list, or list key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeafType {
    Boolean,
    Decimal64,
    Empty,
    Enumeration,
    String,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Union,
}

impl LeafType {
    fn integer_range(self) -> Option<(i128, i128)> {
        match self {
            LeafType::Int8 => Some((i128::from(i8::MIN), i128::from(i8::MAX))),
            LeafType::Int16 => Some((i128::from(i16::MIN), i128::from(i16::MAX))),
            LeafType::Int32 => Some((i128::from(i32::MIN), i128::from(i32::MAX))),
            LeafType::Int64 => Some((i128::from(i64::MIN), i128::from(i64::MAX))),
            LeafType::Uint8 => Some((0, i128::from(u8::MAX))),
            LeafType::Uint16 => Some((0, i128::from(u16::MAX))),
            LeafType::Uint32 => Some((0, i128::from(u32::MAX))),
            LeafType::Uint64 => Some((0, i128::from(u64::MAX))),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_integer(self) -> bool {
        self.integer_range().is_some()
    }
}

impl fmt::Display for LeafType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LeafType::Boolean => "boolean",
            LeafType::Decimal64 => "decimal64",
            LeafType::Empty => "empty",
            LeafType::Enumeration => "enumeration",
            LeafType::String => "string",
            LeafType::Int8 => "int8",
            LeafType::Int16 => "int16",
            LeafType::Int32 => "int32",
            LeafType::Int64 => "int64",
            LeafType::Uint8 => "uint8",
            LeafType::Uint16 => "uint16",
            LeafType::Uint32 => "uint32",
            LeafType::Uint64 => "uint64",
            LeafType::Union => "union",
        };
        write!(f, "{}", name)
    }
}

/// Full type description: the base tag plus enumeration values or union members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub base: LeafType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<TypeSpec>,
}

impl From<LeafType> for TypeSpec {
    fn from(base: LeafType) -> Self {
        Self {
            base,
            enums: Vec::new(),
            members: Vec::new(),
        }
    }
}

impl TypeSpec {
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base: LeafType::Enumeration,
            enums: values.into_iter().map(Into::into).collect(),
            members: Vec::new(),
        }
    }

    pub fn union<I: IntoIterator<Item = TypeSpec>>(members: I) -> Self {
        Self {
            base: LeafType::Union,
            enums: Vec::new(),
            members: members.into_iter().collect(),
        }
    }

    /// Encode `value` as it must appear in a key predicate.
    #[must_use]
    pub fn literal(&self, value: &Value) -> String {
        match self.base {
            LeafType::Boolean => value.to_literal().to_lowercase(),
            _ => value.to_literal(),
        }
    }

    /// Map `value` onto the concrete type it will be stored as.
    ///
    /// Unions resolve to the first member that accepts the value: enumerations
    /// first, then strings, decimals and finally the narrowest integer type.
    pub fn check(&self, path: &str, value: &Value) -> Result<LeafType> {
        match self.base {
            LeafType::Union => self.check_union(path, value),
            LeafType::Enumeration => {
                let literal = value.to_literal();
                if self.enums.iter().any(|e| *e == literal) {
                    Ok(LeafType::Enumeration)
                } else {
                    Err(Error::ValueDoesNotMatchEnumeration {
                        path: path.to_string(),
                        value: literal,
                    })
                }
            }
            base => {
                if accepts(base, value) {
                    Ok(base)
                } else {
                    Err(Error::value_not_mapped(path, value.to_literal()))
                }
            }
        }
    }

    fn check_union(&self, path: &str, value: &Value) -> Result<LeafType> {
        let literal = value.to_literal();
        for member in &self.members {
            if member.base == LeafType::Union {
                return Err(Error::value_not_mapped(path, &literal));
            }
            if member.base == LeafType::Enumeration && member.enums.iter().any(|e| *e == literal) {
                return Ok(LeafType::Enumeration);
            }
        }
        let has = |t: LeafType| self.members.iter().any(|m| m.base == t);
        if let Value::String(_) = value {
            if has(LeafType::String) {
                return Ok(LeafType::String);
            }
        }
        if let Value::Bool(_) = value {
            if has(LeafType::Boolean) {
                return Ok(LeafType::Boolean);
            }
        }
        let looks_decimal = matches!(value, Value::Decimal(_))
            || (literal.contains('.') && literal.parse::<f64>().is_ok());
        if looks_decimal && has(LeafType::Decimal64) {
            return Ok(LeafType::Decimal64);
        }
        if let Some(n) = value.as_i128() {
            let narrowest = [
                LeafType::Int8,
                LeafType::Uint8,
                LeafType::Int16,
                LeafType::Uint16,
                LeafType::Int32,
                LeafType::Uint32,
                LeafType::Int64,
                LeafType::Uint64,
            ]
            .into_iter()
            .filter(|t| has(*t))
            .find(|t| {
                t.integer_range()
                    .is_some_and(|(lo, hi)| n >= lo && n <= hi)
            });
            if let Some(t) = narrowest {
                return Ok(t);
            }
        }
        Err(Error::value_not_mapped(path, literal))
    }

    /// Turn a textual literal (from a predicate or the command line) into a typed value.
    pub fn parse(&self, path: &str, literal: &str) -> Result<Value> {
        let as_string = Value::String(literal.to_string());
        let concrete = self.check(path, &as_string)?;
        let value = match concrete {
            LeafType::Boolean => Value::Bool(literal.eq_ignore_ascii_case("true")),
            LeafType::Decimal64 => as_string
                .as_f64()
                .map(Value::Decimal)
                .ok_or_else(|| Error::value_not_mapped(path, literal))?,
            LeafType::Empty => Value::Empty,
            t if t.is_integer() => match literal.trim().parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => literal
                    .trim()
                    .parse::<u64>()
                    .map(Value::Uint)
                    .map_err(|_| Error::value_not_mapped(path, literal))?,
            },
            _ => as_string,
        };
        Ok(value)
    }
}

fn accepts(base: LeafType, value: &Value) -> bool {
    match (base, value) {
        (LeafType::Empty, Value::Empty) => true,
        (LeafType::Empty, _) | (_, Value::Empty) => false,
        (LeafType::Boolean, Value::Bool(_)) => true,
        (LeafType::Boolean, Value::String(s)) => {
            s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false")
        }
        (LeafType::Boolean, _) => false,
        (LeafType::String, _) => true,
        (LeafType::Decimal64, v) => v.as_f64().is_some(),
        (t, v) => match (t.integer_range(), v.as_i128()) {
            (Some((lo, hi)), Some(n)) => n >= lo && n <= hi,
            _ => false,
        },
    }
}

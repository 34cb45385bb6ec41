//! Scalar leaf values and declared leaf types.
//!
//! A leaf stores a [`Scalar`]. Typed leaves additionally carry a
//! [`ScalarType`]; every assignment is coerced into that type or rejected
//! with [`ConfigError::Validation`].

use crate::error::{ConfigError, Result};
use crate::interpolation;
use std::fmt;
use std::rc::Rc;

/// The mandatory-missing marker. A leaf holding this string is required but
/// has not been supplied yet.
pub const MISSING: &str = "???";

/// A scalar leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Enum(EnumValue),
}

/// A member of a declared enum type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub type_name: String,
    pub member: String,
    pub value: i64,
}

/// An enum declaration: a type name and its ordered members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    name: String,
    members: Vec<(String, i64)>,
}

/// Declared type of a leaf or of the elements of a typed container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScalarType {
    /// No coercion.
    #[default]
    Any,
    Bool,
    Int,
    Float,
    Str,
    Enum(Rc<EnumType>),
}

impl Scalar {
    /// The mandatory-missing marker as a scalar.
    pub fn missing() -> Self {
        Scalar::Str(MISSING.to_string())
    }

    /// Name of this value's type, as used in error messages.
    pub fn type_name(&self) -> String {
        match self {
            Scalar::Null => "null".to_string(),
            Scalar::Bool(_) => "bool".to_string(),
            Scalar::Int(_) => "int".to_string(),
            Scalar::Float(_) => "float".to_string(),
            Scalar::Str(_) => "str".to_string(),
            Scalar::Enum(e) => e.type_name.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// True if this is the mandatory-missing marker.
    pub fn is_missing(&self) -> bool {
        matches!(self, Scalar::Str(s) if s == MISSING)
    }

    /// True if this is a string containing at least one `${...}` reference.
    pub fn is_interpolation(&self) -> bool {
        matches!(self, Scalar::Str(s) if interpolation::is_interpolation(s))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Scalar::Float(f) => Some(*f),
            Scalar::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            // Debug keeps the fractional part of integral floats ("1.0").
            Scalar::Float(x) => write!(f, "{x:?}"),
            Scalar::Str(s) => write!(f, "{s}"),
            Scalar::Enum(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.member)
    }
}

impl EnumType {
    /// Declare an enum from `(member, value)` pairs.
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        members: impl IntoIterator<Item = (S, i64)>,
    ) -> Self {
        Self {
            name: name.into(),
            members: members.into_iter().map(|(m, v)| (m.into(), v)).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|(m, _)| m.as_str())
    }

    /// Look up a member by name.
    pub fn member(&self, name: &str) -> Option<EnumValue> {
        self.members
            .iter()
            .find(|(m, _)| m == name)
            .map(|(m, v)| self.value_of(m, *v))
    }

    /// Look up a member by its integer value.
    pub fn member_by_value(&self, value: i64) -> Option<EnumValue> {
        self.members
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(m, v)| self.value_of(m, *v))
    }

    fn value_of(&self, member: &str, value: i64) -> EnumValue {
        EnumValue {
            type_name: self.name.clone(),
            member: member.to_string(),
            value,
        }
    }
}

impl ScalarType {
    /// Name of the type, as used in error messages.
    pub fn name(&self) -> String {
        match self {
            ScalarType::Any => "Any".to_string(),
            ScalarType::Bool => "bool".to_string(),
            ScalarType::Int => "int".to_string(),
            ScalarType::Float => "float".to_string(),
            ScalarType::Str => "str".to_string(),
            ScalarType::Enum(e) => e.name().to_string(),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, ScalarType::Any)
    }

    /// Coerce `value` into this type.
    ///
    /// The missing marker and interpolation strings are stored verbatim for
    /// every type; they are validated when they are resolved, not when set.
    /// `full_key` is only evaluated on failure.
    pub fn coerce(
        &self,
        value: Scalar,
        optional: bool,
        full_key: impl FnOnce() -> String,
    ) -> Result<Scalar> {
        if value.is_missing() || value.is_interpolation() {
            return Ok(value);
        }
        if value.is_null() {
            if optional || self.is_any() {
                return Ok(value);
            }
            return Err(self.reject(&value, full_key));
        }

        let coerced = match (self, &value) {
            (ScalarType::Any, _) => Some(value.clone()),

            (ScalarType::Int, Scalar::Int(_)) => Some(value.clone()),
            (ScalarType::Int, Scalar::Str(s)) => s.trim().parse::<i64>().ok().map(Scalar::Int),

            (ScalarType::Float, Scalar::Float(_)) => Some(value.clone()),
            (ScalarType::Float, Scalar::Int(i)) => Some(Scalar::Float(*i as f64)),
            (ScalarType::Float, Scalar::Str(s)) => {
                s.trim().parse::<f64>().ok().map(Scalar::Float)
            }

            (ScalarType::Bool, Scalar::Bool(_)) => Some(value.clone()),
            (ScalarType::Bool, Scalar::Int(i)) => Some(Scalar::Bool(*i != 0)),
            (ScalarType::Bool, Scalar::Str(s)) => parse_bool(s).map(Scalar::Bool),

            (ScalarType::Str, Scalar::Str(_)) => Some(value.clone()),
            (ScalarType::Str, other) => Some(Scalar::Str(other.to_string())),

            (ScalarType::Enum(ty), Scalar::Enum(e)) if e.type_name == ty.name() => {
                Some(value.clone())
            }
            (ScalarType::Enum(ty), Scalar::Str(s)) => {
                let member = s
                    .strip_prefix(ty.name())
                    .and_then(|rest| rest.strip_prefix('.'))
                    .unwrap_or(s.as_str());
                ty.member(member).map(Scalar::Enum)
            }
            (ScalarType::Enum(ty), Scalar::Int(i)) => ty.member_by_value(*i).map(Scalar::Enum),

            _ => None,
        };

        coerced.ok_or_else(|| self.reject(&value, full_key))
    }

    fn reject(&self, value: &Scalar, full_key: impl FnOnce() -> String) -> ConfigError {
        ConfigError::Validation {
            value: value.to_string(),
            value_type: value.type_name(),
            expected: self.name(),
            full_key: full_key(),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "on" | "true" => Some(true),
        "n" | "no" | "off" | "false" => Some(false),
        other => other.parse::<i64>().ok().map(|i| i != 0),
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value.into())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

impl From<EnumValue> for Scalar {
    fn from(value: EnumValue) -> Self {
        Scalar::Enum(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> String {
        "a.b".to_string()
    }

    fn color() -> Rc<EnumType> {
        Rc::new(EnumType::new("Color", [("RED", 1), ("GREEN", 2)]))
    }

    #[test]
    fn test_int_coercion() {
        let ty = ScalarType::Int;
        assert_eq!(ty.coerce(Scalar::Int(3), false, key).unwrap(), Scalar::Int(3));
        assert_eq!(ty.coerce("42".into(), false, key).unwrap(), Scalar::Int(42));
        assert!(ty.coerce(Scalar::Bool(true), false, key).is_err());
        assert!(ty.coerce(Scalar::Float(1.5), false, key).is_err());
    }

    #[test]
    fn test_int_rejects_word() {
        let err = ScalarType::Int.coerce("one".into(), false, key).unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @"Value 'one' of type 'str' could not be converted to 'int' at 'a.b'"
        );
    }

    #[test]
    fn test_float_coercion() {
        let ty = ScalarType::Float;
        assert_eq!(ty.coerce(Scalar::Int(2), false, key).unwrap(), Scalar::Float(2.0));
        assert_eq!(ty.coerce("2.5".into(), false, key).unwrap(), Scalar::Float(2.5));
        assert!(ty.coerce(Scalar::Bool(false), false, key).is_err());
    }

    #[test]
    fn test_bool_coercion() {
        let ty = ScalarType::Bool;
        assert_eq!(ty.coerce("Yes".into(), false, key).unwrap(), Scalar::Bool(true));
        assert_eq!(ty.coerce("off".into(), false, key).unwrap(), Scalar::Bool(false));
        assert_eq!(ty.coerce(Scalar::Int(0), false, key).unwrap(), Scalar::Bool(false));
        assert_eq!(ty.coerce("7".into(), false, key).unwrap(), Scalar::Bool(true));
        assert!(ty.coerce("maybe".into(), false, key).is_err());
    }

    #[test]
    fn test_str_stringifies_scalars() {
        let ty = ScalarType::Str;
        assert_eq!(ty.coerce(Scalar::Int(5), false, key).unwrap(), Scalar::from("5"));
        assert_eq!(ty.coerce(Scalar::Float(1.0), false, key).unwrap(), Scalar::from("1.0"));
        assert_eq!(ty.coerce(Scalar::Bool(true), false, key).unwrap(), Scalar::from("true"));
    }

    #[test]
    fn test_enum_coercion() {
        let ty = ScalarType::Enum(color());
        let red = ty.coerce("RED".into(), false, key).unwrap();
        assert_eq!(red.to_string(), "Color.RED");
        let green = ty.coerce("Color.GREEN".into(), false, key).unwrap();
        assert_eq!(green.to_string(), "Color.GREEN");
        let by_value = ty.coerce(Scalar::Int(1), false, key).unwrap();
        assert_eq!(by_value, red);
        assert!(ty.coerce("BLUE".into(), false, key).is_err());
    }

    #[test]
    fn test_null_requires_optional() {
        assert!(ScalarType::Int.coerce(Scalar::Null, false, key).is_err());
        assert_eq!(ScalarType::Int.coerce(Scalar::Null, true, key).unwrap(), Scalar::Null);
        assert_eq!(ScalarType::Any.coerce(Scalar::Null, false, key).unwrap(), Scalar::Null);
    }

    #[test]
    fn test_marker_and_interpolation_bypass_coercion() {
        let ty = ScalarType::Int;
        assert!(ty.coerce(Scalar::missing(), false, key).unwrap().is_missing());
        assert_eq!(
            ty.coerce("${other}".into(), false, key).unwrap(),
            Scalar::from("${other}")
        );
    }
}

//! Value types for representing field data in a backend-agnostic way.
//!
//! The [`Value`] enum is the core type used throughout the mapping layer to
//! represent field values, filter parameters, and row contents. [`ValueKind`]
//! is the coarse type-class partition that type descriptors can declare and
//! validation checks against.

use std::fmt;

/// A backend-agnostic representation of a field or column value.
///
/// `Value` is the universal type passed between the mapping layer and storage
/// backends. Application-side values and their serialized storage forms are
/// both expressed as `Value`s; a field's serializer and deserializer convert
/// between the two.
///
/// # Examples
///
/// ```
/// use estelle_db::value::Value;
///
/// let v = Value::from(42_i64);
/// assert_eq!(v, Value::Int(42));
///
/// let v = Value::from("hello");
/// assert_eq!(v, Value::String("hello".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// SQL NULL. Distinct from an absent field: an entity may hold an
    /// explicit `Null` for a field, or not hold the field at all.
    Null,
    /// A boolean value.
    Bool(bool),
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// A UTF-8 string.
    String(String),
    /// A date and time in UTC.
    DateTime(chrono::DateTime<chrono::Utc>),
    /// A UUID value.
    Uuid(uuid::Uuid),
    /// A structured JSON value.
    Json(serde_json::Value),
}

/// The coarse type class of a [`Value`].
///
/// Type descriptors may declare the kind they accept; validation rejects a
/// value whose runtime kind does not match before the field validator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// [`Value::Null`].
    Null,
    /// [`Value::Bool`].
    Boolean,
    /// [`Value::Int`] and [`Value::Float`].
    Number,
    /// [`Value::String`].
    Text,
    /// [`Value::DateTime`].
    Temporal,
    /// [`Value::Uuid`].
    Identifier,
    /// [`Value::Json`].
    Structured,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::Text => "text",
            Self::Temporal => "temporal",
            Self::Identifier => "identifier",
            Self::Structured => "structured",
        };
        write!(f, "{name}")
    }
}

impl Value {
    /// Returns the coarse type class of this value.
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Boolean,
            Self::Int(_) | Self::Float(_) => ValueKind::Number,
            Self::String(_) => ValueKind::Text,
            Self::DateTime(_) => ValueKind::Temporal,
            Self::Uuid(_) => ValueKind::Identifier,
            Self::Json(_) => ValueKind::Structured,
        }
    }

    /// Returns `true` if this value is `Null`.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Attempts to extract a boolean value.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to extract an integer value.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to extract a float value.
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Attempts to extract a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to extract a datetime value.
    pub const fn as_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Attempts to extract a UUID value.
    pub const fn as_uuid(&self) -> Option<uuid::Uuid> {
        match self {
            Self::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Attempts to extract a JSON value reference.
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(j) => Some(j),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s}"),
            Self::DateTime(dt) => write!(f, "{dt}"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Json(j) => write!(f, "{j}"),
        }
    }
}

// ── From implementations ───────────────────────────────────────────────

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<chrono::DateTime<chrono::Utc>> for Value {
    fn from(v: chrono::DateTime<chrono::Utc>) -> Self {
        Self::DateTime(v)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Self::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_primitives() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42_i32), Value::Int(42));
        assert_eq!(Value::from(42_i64), Value::Int(42));
        assert_eq!(Value::from(1.5_f64), Value::Float(1.5));
        assert_eq!(Value::from("hi"), Value::String("hi".to_string()));
    }

    #[test]
    fn test_from_option() {
        let some: Option<i64> = Some(7);
        assert_eq!(Value::from(some), Value::Int(7));

        let none: Option<i64> = None;
        assert_eq!(Value::from(none), Value::Null);
    }

    #[test]
    fn test_from_uuid() {
        let u = uuid::Uuid::new_v4();
        assert_eq!(Value::from(u), Value::Uuid(u));
    }

    #[test]
    fn test_from_json() {
        let j = serde_json::json!({"key": "value"});
        assert_eq!(Value::from(j.clone()), Value::Json(j));
    }

    #[test]
    fn test_from_datetime() {
        let dt = chrono::Utc::now();
        assert_eq!(Value::from(dt), Value::DateTime(dt));
    }

    #[test]
    fn test_kind() {
        assert_eq!(Value::Null.kind(), ValueKind::Null);
        assert_eq!(Value::Bool(true).kind(), ValueKind::Boolean);
        assert_eq!(Value::Int(1).kind(), ValueKind::Number);
        assert_eq!(Value::Float(1.0).kind(), ValueKind::Number);
        assert_eq!(Value::String("x".into()).kind(), ValueKind::Text);
        assert_eq!(Value::DateTime(chrono::Utc::now()).kind(), ValueKind::Temporal);
        assert_eq!(Value::Uuid(uuid::Uuid::nil()).kind(), ValueKind::Identifier);
        assert_eq!(
            Value::Json(serde_json::json!([])).kind(),
            ValueKind::Structured
        );
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int(1).as_bool(), None);
        assert_eq!(Value::Int(42).as_int(), Some(42));
        assert_eq!(Value::Float(1.5).as_float(), Some(1.5));
        assert_eq!(Value::String("hi".into()).as_str(), Some("hi"));
        assert!(Value::Null.is_null());
        assert!(!Value::Int(0).is_null());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::String("hello".into()).to_string(), "hello");
        assert_eq!(
            Value::Uuid(uuid::Uuid::nil()).to_string(),
            "00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ValueKind::Text.to_string(), "text");
        assert_eq!(ValueKind::Structured.to_string(), "structured");
    }
}

//! The type registry: canonical field type descriptors.
//!
//! A [`TypeDescriptor`] bundles everything the layer needs to know about one
//! field type: its per-dialect column-type strings, a validator, an optional
//! serializer/deserializer pair converting between application form and
//! storage form, and an optional default (literal or generator).
//!
//! The built-in descriptors are constructed by the free functions at the
//! bottom of this module ([`text`], [`integer`], [`datetime`], [`boolean`],
//! [`unique_id`], [`json`]) and by the parameterized factories ([`varchar`],
//! [`fixed_char`]). Custom descriptors are built with
//! [`TypeDescriptor::new`] and the builder methods.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::backend::Dialect;
use crate::value::{Value, ValueKind};
use estelle_core::{EstelleError, EstelleResult};

/// A field validator: `true` means the value is acceptable.
pub type ValidatorFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Converts an application-form value into its storage form. Infallible;
/// values reach serialization only after validation has accepted them.
pub type SerializeFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Converts a storage-form value back into application form. Malformed
/// stored data yields an error message, never a panic.
pub type DeserializeFn = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// A generator producing a fresh default value per invocation.
pub type GeneratorFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// A field default: a fixed literal, or a generator called once per
/// construction.
#[derive(Clone)]
pub enum DefaultSpec {
    /// The same literal value every time.
    Literal(Value),
    /// A fresh value per entity construction.
    Generator(GeneratorFn),
}

impl DefaultSpec {
    /// Produces the default value, invoking the generator if there is one.
    pub fn produce(&self) -> Value {
        match self {
            Self::Literal(v) => v.clone(),
            Self::Generator(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Self::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

/// An immutable description of one field type.
///
/// Cloning is cheap: the behavioral hooks are shared `Arc`s.
#[derive(Clone)]
pub struct TypeDescriptor {
    name: String,
    kind: Option<ValueKind>,
    column_types: HashMap<Dialect, String>,
    validator: Option<ValidatorFn>,
    serializer: Option<SerializeFn>,
    deserializer: Option<DeserializeFn>,
    default: Option<DefaultSpec>,
}

impl TypeDescriptor {
    /// Creates a bare descriptor with the given name and nothing else.
    ///
    /// A bare descriptor has no validator; any field bound to it fails
    /// validation with a `NoValidator` configuration defect until one is
    /// attached.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            column_types: HashMap::new(),
            validator: None,
            serializer: None,
            deserializer: None,
            default: None,
        }
    }

    /// Declares the coarse type class this descriptor accepts.
    ///
    /// When set, validation rejects values of any other runtime kind with
    /// `UnacceptedType` before the validator runs.
    #[must_use]
    pub fn kind(mut self, kind: ValueKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Maps a column-type string for one dialect.
    #[must_use]
    pub fn column_type_for(mut self, dialect: Dialect, column_type: impl Into<String>) -> Self {
        self.column_types.insert(dialect, column_type.into());
        self
    }

    /// Attaches the validator.
    #[must_use]
    pub fn validator(mut self, f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.validator = Some(Arc::new(f));
        self
    }

    /// Attaches the serializer. Absent means identity.
    #[must_use]
    pub fn serializer(mut self, f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        self.serializer = Some(Arc::new(f));
        self
    }

    /// Attaches the deserializer. Absent means identity.
    #[must_use]
    pub fn deserializer(
        mut self,
        f: impl Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.deserializer = Some(Arc::new(f));
        self
    }

    /// Sets a literal default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultSpec::Literal(value.into()));
        self
    }

    /// Sets a generator producing a fresh default per construction.
    #[must_use]
    pub fn default_generator(mut self, f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = Some(DefaultSpec::Generator(Arc::new(f)));
        self
    }

    // ── accessors ──────────────────────────────────────────────────────

    /// The descriptor name (e.g. "str", "int", "dtime").
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared coarse type class, if any.
    pub const fn declared_kind(&self) -> Option<ValueKind> {
        self.kind
    }

    /// The validator, if any.
    pub const fn validator_fn(&self) -> Option<&ValidatorFn> {
        self.validator.as_ref()
    }

    /// The serializer, if any.
    pub const fn serializer_fn(&self) -> Option<&SerializeFn> {
        self.serializer.as_ref()
    }

    /// The deserializer, if any.
    pub const fn deserializer_fn(&self) -> Option<&DeserializeFn> {
        self.deserializer.as_ref()
    }

    /// The default, if any.
    pub const fn default_spec(&self) -> Option<&DefaultSpec> {
        self.default.as_ref()
    }

    /// Resolves the column-type string for a dialect.
    ///
    /// # Errors
    ///
    /// Returns [`EstelleError::NoColumnType`] when the dialect is unmapped.
    pub fn column_type(&self, dialect: Dialect) -> EstelleResult<&str> {
        self.column_types
            .get(&dialect)
            .map(String::as_str)
            .ok_or_else(|| EstelleError::NoColumnType {
                descriptor: self.name.clone(),
                dialect: dialect.name().to_string(),
            })
    }

    /// Applies the serializer, or identity when none is attached.
    pub fn serialize(&self, value: &Value) -> Value {
        self.serializer
            .as_ref()
            .map_or_else(|| value.clone(), |f| f(value))
    }

    /// Applies the deserializer, or identity when none is attached.
    pub fn deserialize(&self, value: &Value) -> Result<Value, String> {
        self.deserializer
            .as_ref()
            .map_or_else(|| Ok(value.clone()), |f| f(value))
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("column_types", &self.column_types)
            .field("validator", &self.validator.as_ref().map(|_| ".."))
            .field("serializer", &self.serializer.as_ref().map(|_| ".."))
            .field("deserializer", &self.deserializer.as_ref().map(|_| ".."))
            .field("default", &self.default)
            .finish()
    }
}

// ── built-in descriptors ───────────────────────────────────────────────

/// Unbounded text. Identity in both directions.
pub fn text() -> TypeDescriptor {
    TypeDescriptor::new("str")
        .kind(ValueKind::Text)
        .column_type_for(Dialect::Postgres, "TEXT")
        .column_type_for(Dialect::MySql, "TEXT")
        .column_type_for(Dialect::Sqlite, "TEXT")
        .validator(|v| matches!(v, Value::String(_)))
}

/// Integer numbers. Accepts any numeric value.
pub fn integer() -> TypeDescriptor {
    TypeDescriptor::new("int")
        .kind(ValueKind::Number)
        .column_type_for(Dialect::Postgres, "INTEGER")
        .column_type_for(Dialect::MySql, "INTEGER")
        .column_type_for(Dialect::Sqlite, "INTEGER")
        .validator(|v| matches!(v, Value::Int(_) | Value::Float(_)))
}

/// Serializes a datetime value to its RFC 3339 storage string.
fn serialize_datetime(value: &Value) -> Value {
    match value {
        Value::DateTime(dt) => {
            Value::String(dt.to_rfc3339_opts(chrono::SecondsFormat::Micros, true))
        }
        other => other.clone(),
    }
}

/// Parses a stored datetime back into application form.
pub(crate) fn deserialize_datetime(value: &Value) -> Result<Value, String> {
    match value {
        // Backends with native datetime columns may hand back a parsed value.
        Value::DateTime(_) => Ok(value.clone()),
        Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| Value::DateTime(dt.with_timezone(&chrono::Utc)))
            .map_err(|e| format!("malformed datetime '{s}': {e}")),
        other => Err(format!("cannot deserialize {} as datetime", other.kind())),
    }
}

/// Date and time. Only a structured datetime value is valid, never a raw
/// string; storage form is an ISO-8601 (RFC 3339) string.
pub fn datetime() -> TypeDescriptor {
    TypeDescriptor::new("dtime")
        .kind(ValueKind::Temporal)
        .column_type_for(Dialect::Postgres, "TIMESTAMPTZ")
        .column_type_for(Dialect::MySql, "DATETIME")
        .column_type_for(Dialect::Sqlite, "TEXT")
        .validator(|v| matches!(v, Value::DateTime(_)))
        .serializer(serialize_datetime)
        .deserializer(deserialize_datetime)
}

/// Parses a stored boolean back into application form.
///
/// The canonical storage encoding is the serializer's own output (`1`/`0`);
/// textual `"1"`/`"0"`/`"true"`/`"false"` are accepted for text-affinity
/// stores. Anything else is a deserialization error.
pub(crate) fn deserialize_boolean(value: &Value) -> Result<Value, String> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::Int(i) => Ok(Value::Bool(*i != 0)),
        Value::String(s) => match s.as_str() {
            "0" | "false" => Ok(Value::Bool(false)),
            "1" | "true" => Ok(Value::Bool(true)),
            other => Err(format!("malformed boolean '{other}'")),
        },
        other => Err(format!("cannot deserialize {} as boolean", other.kind())),
    }
}

/// Boolean. Stored as `1`/`0`.
pub fn boolean() -> TypeDescriptor {
    TypeDescriptor::new("bool")
        .kind(ValueKind::Boolean)
        .column_type_for(Dialect::Postgres, "BOOLEAN")
        .column_type_for(Dialect::MySql, "TINYINT(1)")
        .column_type_for(Dialect::Sqlite, "INTEGER")
        .validator(|v| matches!(v, Value::Bool(_)))
        .serializer(|v| match v {
            Value::Bool(b) => Value::Int(i64::from(*b)),
            other => other.clone(),
        })
        .deserializer(deserialize_boolean)
}

/// Checks the canonical 36-character version-4 identifier layout:
/// 8-4-4-4-12 hex groups, version nibble `4`, RFC 4122 variant.
fn is_canonical_v4(value: &Value) -> bool {
    let parsed = match value {
        Value::Uuid(u) => Some(*u),
        Value::String(s) if s.len() == 36 => uuid::Uuid::try_parse(s).ok(),
        _ => None,
    };
    parsed.is_some_and(|u| {
        u.get_version_num() == 4 && u.get_variant() == uuid::Variant::RFC4122
    })
}

/// Unique identifier: a canonical version-4 UUID.
///
/// Carries a default generator producing a fresh random identifier on every
/// no-value construction. Accepts either a parsed UUID or its canonical
/// 36-character string form.
pub fn unique_id() -> TypeDescriptor {
    TypeDescriptor::new("uid")
        .column_type_for(Dialect::Postgres, "UUID")
        .column_type_for(Dialect::MySql, "CHAR(36)")
        .column_type_for(Dialect::Sqlite, "TEXT")
        .validator(is_canonical_v4)
        .default_generator(|| Value::Uuid(uuid::Uuid::new_v4()))
}

/// Bounded-length string factory: text with at most `max_length` characters.
///
/// The column type carries the bound.
pub fn varchar(max_length: usize) -> TypeDescriptor {
    TypeDescriptor::new(format!("varchar({max_length})"))
        .kind(ValueKind::Text)
        .column_type_for(Dialect::Postgres, format!("VARCHAR({max_length})"))
        .column_type_for(Dialect::MySql, format!("VARCHAR({max_length})"))
        .column_type_for(Dialect::Sqlite, "TEXT")
        .validator(move |v| match v {
            Value::String(s) => s.chars().count() <= max_length,
            _ => false,
        })
}

/// Fixed-width string factory: text of exactly `length` characters.
pub fn fixed_char(length: usize) -> TypeDescriptor {
    TypeDescriptor::new(format!("char({length})"))
        .kind(ValueKind::Text)
        .column_type_for(Dialect::Postgres, format!("CHAR({length})"))
        .column_type_for(Dialect::MySql, format!("CHAR({length})"))
        .column_type_for(Dialect::Sqlite, "TEXT")
        .validator(move |v| match v {
            Value::String(s) => s.chars().count() == length,
            _ => false,
        })
}

/// Structured JSON data. Accepts objects and arrays; stored as encoded text.
///
/// The deserializer passes an already-structured value through unchanged,
/// covering backends that decode JSON columns themselves.
pub fn json() -> TypeDescriptor {
    TypeDescriptor::new("json")
        .kind(ValueKind::Structured)
        .column_type_for(Dialect::Postgres, "JSONB")
        .column_type_for(Dialect::MySql, "JSON")
        .column_type_for(Dialect::Sqlite, "TEXT")
        .validator(|v| {
            matches!(
                v,
                Value::Json(serde_json::Value::Object(_) | serde_json::Value::Array(_))
            )
        })
        .serializer(|v| match v {
            Value::Json(j) => Value::String(j.to_string()),
            other => other.clone(),
        })
        .deserializer(|v| match v {
            Value::Json(_) => Ok(v.clone()),
            Value::String(s) => serde_json::from_str::<serde_json::Value>(s)
                .map(Value::Json)
                .map_err(|e| format!("malformed JSON text: {e}")),
            other => Err(format!("cannot deserialize {} as JSON", other.kind())),
        })
}

//! Field specifications and the ordered schema.
//!
//! A [`FieldSpec`] binds a [`TypeDescriptor`] to one field together with its
//! modifiers (required, primary key) and optional per-field overrides of the
//! descriptor's validator, serializer, deserializer, or default. Resolution
//! is an explicit two-level lookup: the spec's own override when present,
//! else the descriptor's.
//!
//! A [`Schema`] is the ordered field-name to spec mapping for one model
//! class. Insertion order defines column declaration order; redefining a
//! name overwrites the spec in place, keeping the original position.

use crate::types::{DefaultSpec, DeserializeFn, SerializeFn, TypeDescriptor, ValidatorFn};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// One field's descriptor plus modifiers and overrides.
///
/// Cloning is cheap: the override hooks are shared `Arc`s.
#[derive(Clone)]
pub struct FieldSpec {
    descriptor: TypeDescriptor,
    required: bool,
    primary_key: bool,
    validator: Option<ValidatorFn>,
    serializer: Option<SerializeFn>,
    deserializer: Option<DeserializeFn>,
    default: Option<DefaultSpec>,
}

impl FieldSpec {
    /// Wraps a type descriptor with no modifiers.
    pub const fn new(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor,
            required: false,
            primary_key: false,
            validator: None,
            serializer: None,
            deserializer: None,
            default: None,
        }
    }

    /// Marks the field as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the field as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Overrides the descriptor's validator for this field.
    #[must_use]
    pub fn validator(mut self, f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.validator = Some(Arc::new(f));
        self
    }

    /// Overrides the descriptor's serializer for this field.
    #[must_use]
    pub fn serializer(mut self, f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        self.serializer = Some(Arc::new(f));
        self
    }

    /// Overrides the descriptor's deserializer for this field.
    #[must_use]
    pub fn deserializer(
        mut self,
        f: impl Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.deserializer = Some(Arc::new(f));
        self
    }

    /// Overrides the descriptor's default with a literal value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultSpec::Literal(value.into()));
        self
    }

    /// Overrides the descriptor's default with a generator.
    #[must_use]
    pub fn default_generator(mut self, f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = Some(DefaultSpec::Generator(Arc::new(f)));
        self
    }

    // ── accessors and resolution ───────────────────────────────────────

    /// The underlying type descriptor.
    pub const fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Whether the field is required.
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Whether the field is marked as a primary key.
    pub const fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// The effective validator: the field's own override, else the
    /// descriptor's. `None` is a configuration defect surfaced as
    /// `NoValidator` at validation time.
    pub fn effective_validator(&self) -> Option<&ValidatorFn> {
        self.validator.as_ref().or_else(|| self.descriptor.validator_fn())
    }

    /// The effective default, if either level declares one.
    pub fn effective_default(&self) -> Option<&DefaultSpec> {
        self.default.as_ref().or_else(|| self.descriptor.default_spec())
    }

    /// Serializes a value through the effective serializer (identity when
    /// neither level declares one).
    pub fn serialize(&self, value: &Value) -> Value {
        self.serializer
            .as_ref()
            .map_or_else(|| self.descriptor.serialize(value), |f| f(value))
    }

    /// Deserializes a stored value through the effective deserializer
    /// (identity when neither level declares one).
    pub fn deserialize(&self, value: &Value) -> Result<Value, String> {
        self.deserializer
            .as_ref()
            .map_or_else(|| self.descriptor.deserialize(value), |f| f(value))
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("descriptor", &self.descriptor)
            .field("required", &self.required)
            .field("primary_key", &self.primary_key)
            .field("validator", &self.validator.as_ref().map(|_| ".."))
            .field("serializer", &self.serializer.as_ref().map(|_| ".."))
            .field("deserializer", &self.deserializer.as_ref().map(|_| ".."))
            .field("default", &self.default)
            .finish()
    }
}

impl From<TypeDescriptor> for FieldSpec {
    fn from(descriptor: TypeDescriptor) -> Self {
        Self::new(descriptor)
    }
}

/// The ordered field-name to [`FieldSpec`] mapping for one model class.
///
/// Frozen once a model is registered; iteration yields declaration order.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(String, FieldSpec)>,
}

impl Schema {
    /// Creates an empty schema.
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Inserts a field, or overwrites an existing one in place (last write
    /// wins; the field keeps its original position).
    pub fn define_field(&mut self, name: impl Into<String>, spec: impl Into<FieldSpec>) {
        let name = name.into();
        let spec = spec.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = spec;
        } else {
            self.fields.push((name, spec));
        }
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spec)| spec)
    }

    /// Returns `true` if the schema defines `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    /// Iterates over fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(n, spec)| (n.as_str(), spec))
    }

    /// Returns the field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

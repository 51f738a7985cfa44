//! Entity instances and their persistence lifecycle.
//!
//! An [`Entity`] is one record of a [`Model`]: an insertion-ordered bag of
//! field values plus a handle to its class. It is built on one of two paths
//! with different rules. Fresh construction ([`Model::entity`]) copies the
//! caller's properties and then fills schema defaults. Hydration
//! ([`Model::hydrate`]) converts a storage row back to application form and
//! never applies defaults, so an old row missing a later-added field stays
//! visibly absent.
//!
//! Validation is fail-fast and deterministic: schema fields in declaration
//! order, then non-schema fields in the order they were set, then the
//! required-field check.

use chrono::{SecondsFormat, Utc};

use crate::backend::{Filter, Row, WriteOutcome};
use crate::model::{Model, CREATED_FIELD, DELETED_FIELD, UPDATED_FIELD};
use crate::types;
use crate::value::Value;
use estelle_core::logging::operation_span;
use estelle_core::{EstelleError, EstelleResult};

/// One record of a registered [`Model`].
#[derive(Clone)]
pub struct Entity {
    model: Model,
    values: Vec<(String, Value)>,
}

impl Entity {
    /// Fresh construction: copies `props`, then fills schema defaults for
    /// absent fields (calling the generator when the default is one).
    pub(crate) fn new(model: Model, props: Vec<(&str, Value)>) -> Self {
        let mut values: Vec<(String, Value)> = props
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();

        for (name, spec) in model.schema().iter() {
            if values.iter().any(|(n, _)| n == name) {
                continue;
            }
            if let Some(default) = spec.effective_default() {
                values.push((name.to_string(), default.produce()));
            }
        }

        Self { model, values }
    }

    /// Hydration: converts a storage row to application form.
    ///
    /// Timestamp columns are parsed as datetimes, the soft-delete flag is
    /// kept in its stored form, unknown columns are logged and dropped, and
    /// everything else goes through the field's effective deserializer.
    pub(crate) fn hydrate(model: Model, row: &Row) -> EstelleResult<Self> {
        let mut values = Vec::with_capacity(row.len());
        for (column, stored) in row.iter() {
            if model.options().timestamps
                && (column == CREATED_FIELD || column == UPDATED_FIELD)
            {
                let parsed = types::deserialize_datetime(stored).map_err(|message| {
                    EstelleError::Deserialization {
                        field: column.to_string(),
                        message,
                    }
                })?;
                values.push((column.to_string(), parsed));
                continue;
            }
            if model.options().soft_delete && column == DELETED_FIELD {
                values.push((column.to_string(), stored.clone()));
                continue;
            }
            let Some(spec) = model.schema().get(column) else {
                tracing::debug!(model = %model.name(), column, "ignoring unknown column");
                continue;
            };
            let value = spec.deserialize(stored).map_err(|message| {
                EstelleError::Deserialization {
                    field: column.to_string(),
                    message,
                }
            })?;
            values.push((column.to_string(), value));
        }
        Ok(Self { model, values })
    }

    /// The owning model.
    pub const fn model(&self) -> &Model {
        &self.model
    }

    /// Reads a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(n, _)| n == field)
            .map(|(_, v)| v)
    }

    /// Sets a field value, replacing in place or appending at the end.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        if let Some(slot) = self.values.iter_mut().find(|(n, _)| *n == field) {
            slot.1 = value;
        } else {
            self.values.push((field, value));
        }
    }

    /// Whether the field currently holds a value.
    pub fn contains(&self, field: &str) -> bool {
        self.values.iter().any(|(n, _)| n == field)
    }

    /// Iterates field values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Checks the entity against its schema, failing on the first violation.
    ///
    /// Schema fields are checked in declaration order: a null value passes
    /// (the required check owns null handling), a kind mismatch fails with
    /// `UnacceptedType`, a field whose type resolves no validator fails with
    /// `NoValidator`, and a rejected value fails with `ValidationFailed`.
    /// Then every non-schema, non-lifecycle field fails with
    /// `UnrecognizedKey`, and finally every required field that is absent or
    /// null fails with `MissingRequired`.
    pub fn validate(&self) -> EstelleResult<()> {
        for (name, spec) in self.model.schema().iter() {
            let Some(value) = self.get(name) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            if let Some(expected) = spec.descriptor().declared_kind() {
                if value.kind() != expected {
                    return Err(EstelleError::UnacceptedType {
                        field: name.to_string(),
                        expected: expected.to_string(),
                    });
                }
            }
            let Some(validator) = spec.effective_validator() else {
                return Err(EstelleError::NoValidator(name.to_string()));
            };
            if !validator(value) {
                return Err(EstelleError::ValidationFailed(name.to_string()));
            }
        }

        for (name, _) in &self.values {
            if !self.model.schema().contains(name) && !self.model.is_lifecycle_field(name) {
                return Err(EstelleError::UnrecognizedKey(name.clone()));
            }
        }

        for name in self.model.required_fields() {
            if self.get(name).map_or(true, Value::is_null) {
                return Err(EstelleError::MissingRequired(name.clone()));
            }
        }

        Ok(())
    }

    /// Serializes the present fields to storage form, in insertion order.
    /// Lifecycle and non-schema fields pass through unchanged.
    pub fn serialize(&self) -> Vec<(String, Value)> {
        self.values
            .iter()
            .map(|(name, value)| {
                let stored = self
                    .model
                    .schema()
                    .get(name)
                    .map_or_else(|| value.clone(), |spec| spec.serialize(value));
                (name.clone(), stored)
            })
            .collect()
    }

    /// Inserts this entity as a new row.
    ///
    /// Validates, serializes, stamps `created` and `updated` when timestamps
    /// are on, and hands the payload to the backend.
    pub async fn create(&self) -> EstelleResult<WriteOutcome> {
        let span = operation_span("create", self.model.table_name());
        let _guard = span.enter();

        self.validate()?;
        let mut payload = self.serialize();
        if self.model.options().timestamps {
            let now = timestamp_now();
            upsert_column(&mut payload, CREATED_FIELD, now.clone());
            upsert_column(&mut payload, UPDATED_FIELD, now);
        }
        let backend = self.model.backend()?;
        backend.insert(self.model.table_name(), &payload).await
    }

    /// Updates the stored row(s) this entity's primary fields identify.
    pub async fn update(&self) -> EstelleResult<WriteOutcome> {
        let span = operation_span("update", self.model.table_name());
        let _guard = span.enter();

        self.validate()?;
        let mut payload = self.serialize();
        if self.model.options().timestamps {
            upsert_column(&mut payload, UPDATED_FIELD, timestamp_now());
        }
        let filter = self.primary_filter(&payload);
        let backend = self.model.backend()?;
        backend
            .update(self.model.table_name(), &filter, &payload)
            .await
    }

    /// Deletes the stored row(s) this entity's primary fields identify.
    ///
    /// Under soft delete this is an update that sets the `deleted` flag (and
    /// the `updated` stamp when timestamps are on); otherwise the row is
    /// physically removed. No validation runs on this path.
    pub async fn delete(&self) -> EstelleResult<WriteOutcome> {
        let span = operation_span("delete", self.model.table_name());
        let _guard = span.enter();

        let serialized = self.serialize();
        let filter = self.primary_filter(&serialized);
        let backend = self.model.backend()?;

        if self.model.options().soft_delete {
            // Canonical stored form of the boolean type's `true`.
            let mut payload = vec![(DELETED_FIELD.to_string(), Value::Int(1))];
            if self.model.options().timestamps {
                payload.push((UPDATED_FIELD.to_string(), timestamp_now()));
            }
            backend
                .update(self.model.table_name(), &filter, &payload)
                .await
        } else {
            backend.delete(self.model.table_name(), &filter).await
        }
    }

    /// Inserts the row, or updates it in place on a primary-key conflict.
    ///
    /// Issued as a single `ON CONFLICT` statement; the `created` column is
    /// left alone on the update arm. Dialects without a single-statement
    /// upsert fail with `UnsupportedOperation` before anything is written.
    pub async fn create_or_update(&self) -> EstelleResult<WriteOutcome> {
        let span = operation_span("create_or_update", self.model.table_name());
        let _guard = span.enter();

        self.validate()?;
        let backend = self.model.backend()?;
        let dialect = backend.dialect();
        if !dialect.supports_upsert() {
            return Err(EstelleError::UnsupportedOperation(format!(
                "create_or_update is not available on dialect '{}'",
                dialect.name()
            )));
        }

        let mut payload = self.serialize();
        if self.model.options().timestamps {
            let now = timestamp_now();
            upsert_column(&mut payload, CREATED_FIELD, now.clone());
            upsert_column(&mut payload, UPDATED_FIELD, now);
        }
        let update_columns: Vec<String> = payload
            .iter()
            .map(|(name, _)| name.clone())
            .filter(|name| name != CREATED_FIELD)
            .collect();

        let (sql, params) = dialect.build_upsert(
            self.model.table_name(),
            &payload,
            &update_columns,
            self.model.primary_fields(),
        )?;
        backend.raw_statement(&sql, &params).await
    }

    /// Builds the row-identity filter from the serialized primary-field
    /// values. Absent primary fields are skipped; an entity with none present
    /// yields an empty filter, which matches every row.
    fn primary_filter(&self, serialized: &[(String, Value)]) -> Filter {
        let mut filter = Filter::new();
        for name in self.model.primary_fields() {
            if let Some((_, value)) = serialized.iter().find(|(n, _)| n == name) {
                filter = filter.eq(name.clone(), value.clone());
            }
        }
        if filter.is_empty() {
            tracing::warn!(
                model = %self.model.name(),
                table = %self.model.table_name(),
                "no primary-field values present; statement will match every row"
            );
        }
        filter
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("model", &self.model.name())
            .field("values", &self.values)
            .finish()
    }
}

/// RFC 3339 with microsecond precision, the stored timestamp form.
fn timestamp_now() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn upsert_column(payload: &mut Vec<(String, Value)>, name: &str, value: Value) {
    if let Some(slot) = payload.iter_mut().find(|(n, _)| n == name) {
        slot.1 = value;
    } else {
        payload.push((name.to_string(), value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::schema::FieldSpec;
    use crate::types;
    use crate::value::Value;

    fn user_model() -> Model {
        Model::builder("User")
            .field("id", FieldSpec::new(types::unique_id()).primary_key())
            .field("name", FieldSpec::new(types::text()).required())
            .field("age", types::integer())
            .register()
            .unwrap()
    }

    #[test]
    fn test_defaults_fill_absent_fields_only() {
        let model = user_model();
        let entity = model.entity(vec![("name", Value::from("Ada"))]);
        assert!(matches!(entity.get("id"), Some(Value::Uuid(_))));
        assert_eq!(entity.get("name"), Some(&Value::from("Ada")));
        assert!(entity.get("age").is_none());
    }

    #[test]
    fn test_generator_runs_per_construction() {
        let model = user_model();
        let a = model.entity(vec![]);
        let b = model.entity(vec![]);
        assert_ne!(a.get("id"), b.get("id"));
    }

    #[test]
    fn test_supplied_value_beats_default() {
        let model = user_model();
        let id = uuid::Uuid::new_v4();
        let entity = model.entity(vec![("id", Value::Uuid(id))]);
        assert_eq!(entity.get("id"), Some(&Value::Uuid(id)));
    }

    #[test]
    fn test_validate_accepts_complete_entity() {
        let model = user_model();
        let entity = model.entity(vec![("name", Value::from("Ada")), ("age", Value::Int(36))]);
        entity.validate().unwrap();
    }

    #[test]
    fn test_validate_kind_mismatch() {
        let model = user_model();
        let entity = model.entity(vec![("name", Value::from("Ada")), ("age", Value::from("old"))]);
        let err = entity.validate().unwrap_err();
        assert_eq!(err.code(), "validation.unacceptedType");
    }

    #[test]
    fn test_validate_rejected_value() {
        let model = user_model();
        let entity = model.entity(vec![("name", Value::from("Ada")), ("id", Value::from("nope"))]);
        let err = entity.validate().unwrap_err();
        assert_eq!(err.code(), "validation.validationFailed");
    }

    #[test]
    fn test_validate_unrecognized_key() {
        let model = user_model();
        let entity = model.entity(vec![("name", Value::from("Ada")), ("nickname", Value::from("A"))]);
        let err = entity.validate().unwrap_err();
        assert_eq!(err.code(), "validation.unrecognizedKey");
        assert!(err.to_string().contains("nickname"));
    }

    #[test]
    fn test_validate_lifecycle_fields_tolerated() {
        let model = user_model();
        let mut entity = model.entity(vec![("name", Value::from("Ada"))]);
        entity.set("created", Value::from(chrono::Utc::now()));
        entity.set("deleted", Value::Bool(false));
        entity.validate().unwrap();
    }

    #[test]
    fn test_validate_missing_required() {
        let model = user_model();
        let entity = model.entity(vec![("age", Value::Int(1))]);
        let err = entity.validate().unwrap_err();
        assert_eq!(err.code(), "validation.missingRequired");
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_validate_null_required_is_missing() {
        let model = user_model();
        let entity = model.entity(vec![("name", Value::Null)]);
        let err = entity.validate().unwrap_err();
        assert_eq!(err.code(), "validation.missingRequired");
    }

    #[test]
    fn test_validate_no_validator() {
        let bare = types::TypeDescriptor::new("blob")
            .column_type_for(crate::backend::Dialect::Sqlite, "BLOB");
        let model = Model::builder("Attachment")
            .field("data", bare)
            .register()
            .unwrap();
        let entity = model.entity(vec![("data", Value::from("x"))]);
        let err = entity.validate().unwrap_err();
        assert_eq!(err.code(), "validation.noValidator");
    }

    #[test]
    fn test_validate_order_is_schema_declaration_order() {
        // Both `name` (kind mismatch) and `age` (kind mismatch) are invalid;
        // `name` is declared first so it must be the one reported.
        let model = user_model();
        let entity = model.entity(vec![("age", Value::from("x")), ("name", Value::Int(3))]);
        let err = entity.validate().unwrap_err();
        assert!(err.to_string().contains("name"), "got: {err}");
    }

    #[test]
    fn test_serialize_uses_field_serializers() {
        let model = Model::builder("Event")
            .field("at", types::datetime())
            .field("flag", types::boolean())
            .soft_delete(false)
            .timestamps(false)
            .register()
            .unwrap();
        let when = chrono::Utc::now();
        let entity = model.entity(vec![("at", Value::from(when)), ("flag", Value::Bool(true))]);
        let payload = entity.serialize();
        let at = payload.iter().find(|(n, _)| n == "at").unwrap();
        assert!(matches!(&at.1, Value::String(s) if s.contains('T')));
        let flag = payload.iter().find(|(n, _)| n == "flag").unwrap();
        assert_eq!(flag.1, Value::Int(1));
    }

    #[test]
    fn test_hydrate_skips_unknown_and_never_defaults() {
        let model = user_model();
        let row = Row::from_pairs(vec![
            ("name".to_string(), Value::from("Ada")),
            ("legacy_col".to_string(), Value::Int(9)),
        ]);
        let entity = model.hydrate(&row).unwrap();
        assert_eq!(entity.get("name"), Some(&Value::from("Ada")));
        assert!(!entity.contains("legacy_col"));
        // no id generated on the hydration path
        assert!(!entity.contains("id"));
    }

    #[test]
    fn test_hydrate_parses_timestamps() {
        let model = user_model();
        let row = Row::from_pairs(vec![
            ("name".to_string(), Value::from("Ada")),
            ("created".to_string(), Value::from("2024-05-01T12:00:00.000000Z")),
            ("updated".to_string(), Value::from("2024-05-02T12:00:00.000000Z")),
        ]);
        let entity = model.hydrate(&row).unwrap();
        assert!(matches!(entity.get("created"), Some(Value::DateTime(_))));
        assert!(matches!(entity.get("updated"), Some(Value::DateTime(_))));
    }

    #[test]
    fn test_hydrate_malformed_timestamp_fails() {
        let model = user_model();
        let row = Row::from_pairs(vec![
            ("name".to_string(), Value::from("Ada")),
            ("created".to_string(), Value::from("yesterday")),
        ]);
        let err = model.hydrate(&row).unwrap_err();
        assert_eq!(err.code(), "serialization.deserialization");
    }

    #[test]
    fn test_set_replaces_in_place() {
        let model = user_model();
        let mut entity = model.entity(vec![("name", Value::from("Ada"))]);
        entity.set("name", "Grace");
        assert_eq!(entity.get("name"), Some(&Value::from("Grace")));
        assert_eq!(entity.iter().filter(|(n, _)| *n == "name").count(), 1);
    }
}

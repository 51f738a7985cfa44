//! Model configuration and registration.
//!
//! A [`Model`] is the registered, immutable description of one entity class:
//! its [`Schema`], its persistence options, and the derived sets the entity
//! lifecycle consults on every operation (required fields, primary fields,
//! table name). Derivation happens eagerly inside [`ModelBuilder::register`],
//! so there is no lazily-written per-class cache to race on: after
//! registration the model never changes, and cloning it is an `Arc` bump.
//!
//! The storage backend is bound separately with [`Model::connect`]; it is a
//! set-once slot, and every persistence operation fails with `NoConnection`
//! until it is set.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use crate::backend::{ColumnSpec, Dialect, Filter, Row, StorageBackend, TableSpec};
use crate::entity::Entity;
use crate::schema::{FieldSpec, Schema};
use crate::types;
use crate::value::Value;
use estelle_core::utils::text::default_table_name;
use estelle_core::{EstelleError, EstelleResult};

/// The implicit creation-timestamp field, present when timestamps are on.
pub const CREATED_FIELD: &str = "created";
/// The implicit update-timestamp field, present when timestamps are on.
pub const UPDATED_FIELD: &str = "updated";
/// The implicit soft-delete flag field, present when soft delete is on.
pub const DELETED_FIELD: &str = "deleted";

/// Per-class persistence options.
#[derive(Debug, Clone)]
pub struct ModelOptions {
    /// Mark rows deleted instead of physically removing them.
    pub soft_delete: bool,
    /// Automatically stamp `created` and `updated` fields.
    pub timestamps: bool,
    /// Explicit table name. When `None`, the name is derived from the model
    /// name by pluralizing and lower-casing it.
    pub table_name: Option<String>,
    /// A single primary-key field.
    pub primary_key: Option<String>,
    /// An ordered composite primary key. Mutually exclusive with
    /// `primary_key`.
    pub composite_primary_key: Option<Vec<String>>,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            soft_delete: true,
            timestamps: true,
            table_name: None,
            primary_key: None,
            composite_primary_key: None,
        }
    }
}

struct ModelInner {
    name: String,
    schema: Schema,
    options: ModelOptions,
    table_name: String,
    required_fields: BTreeSet<String>,
    primary_fields: Vec<String>,
    backend: OnceLock<Arc<dyn StorageBackend>>,
}

/// A registered entity class. Cheap to clone; immutable after registration.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

/// Builds a [`Model`]: fields, options, then [`register`](Self::register).
pub struct ModelBuilder {
    name: String,
    schema: Schema,
    options: ModelOptions,
}

impl Model {
    /// Starts building a model class with the given name.
    pub fn builder(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder {
            name: name.into(),
            schema: Schema::new(),
            options: ModelOptions::default(),
        }
    }

    /// The model name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The table name (explicit, or derived at registration).
    pub fn table_name(&self) -> &str {
        &self.inner.table_name
    }

    /// The frozen schema.
    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// The persistence options.
    pub fn options(&self) -> &ModelOptions {
        &self.inner.options
    }

    /// The derived required-field set: fields flagged required, plus every
    /// primary field.
    pub fn required_fields(&self) -> &BTreeSet<String> {
        &self.inner.required_fields
    }

    /// The derived primary fields, in configured order. Empty when the model
    /// has no primary key.
    pub fn primary_fields(&self) -> &[String] {
        &self.inner.primary_fields
    }

    /// Binds the storage backend. May be called once per model.
    pub fn connect(&self, backend: Arc<dyn StorageBackend>) -> EstelleResult<()> {
        self.inner.backend.set(backend).map_err(|_| {
            EstelleError::Configuration(format!(
                "model '{}' already has a storage backend",
                self.inner.name
            ))
        })
    }

    /// Resolves the bound backend, failing with `NoConnection` if unset.
    pub(crate) fn backend(&self) -> EstelleResult<&Arc<dyn StorageBackend>> {
        self.inner.backend.get().ok_or_else(|| {
            tracing::error!(model = %self.inner.name, "no storage backend bound");
            EstelleError::NoConnection
        })
    }

    /// Returns `true` when the named field is one of the implicit lifecycle
    /// fields this model carries (`created`/`updated` under timestamps,
    /// `deleted` under soft delete).
    pub(crate) fn is_lifecycle_field(&self, name: &str) -> bool {
        let opts = &self.inner.options;
        (opts.timestamps && (name == CREATED_FIELD || name == UPDATED_FIELD))
            || (opts.soft_delete && name == DELETED_FIELD)
    }

    /// Prepares the model for use, optionally creating the physical table.
    ///
    /// Derived configuration is already frozen at registration; the only work
    /// left here is the idempotent `CREATE TABLE IF NOT EXISTS` DDL, issued
    /// when `create_table` is set. Re-running never alters an existing
    /// table's shape.
    pub async fn initialize(&self, create_table: bool) -> EstelleResult<()> {
        if !create_table {
            return Ok(());
        }
        let backend = self.backend()?;
        let spec = self.table_spec(backend.dialect())?;
        tracing::debug!(model = %self.inner.name, table = %self.inner.table_name, "creating table if absent");
        backend
            .create_table_if_not_exists(&self.inner.table_name, &spec)
            .await
    }

    /// Builds the DDL shape for this model on the given dialect.
    fn table_spec(&self, dialect: Dialect) -> EstelleResult<TableSpec> {
        let single_pk = (self.inner.primary_fields.len() == 1)
            .then(|| self.inner.primary_fields[0].as_str());

        let mut columns = Vec::with_capacity(self.inner.schema.len() + 3);
        for (name, field) in self.inner.schema.iter() {
            columns.push(ColumnSpec {
                name: name.to_string(),
                column_type: field.descriptor().column_type(dialect)?.to_string(),
                not_null: self.inner.required_fields.contains(name),
                primary_key: single_pk == Some(name),
                default: None,
            });
        }

        if self.inner.options.timestamps {
            let dtime = types::datetime();
            for name in [CREATED_FIELD, UPDATED_FIELD] {
                columns.push(ColumnSpec {
                    name: name.to_string(),
                    column_type: dtime.column_type(dialect)?.to_string(),
                    not_null: false,
                    primary_key: false,
                    default: None,
                });
            }
        }
        if self.inner.options.soft_delete {
            columns.push(ColumnSpec {
                name: DELETED_FIELD.to_string(),
                column_type: types::boolean().column_type(dialect)?.to_string(),
                not_null: true,
                primary_key: false,
                default: Some(Value::Bool(false)),
            });
        }

        let composite_primary_key = if self.inner.primary_fields.len() > 1 {
            self.inner.primary_fields.clone()
        } else {
            Vec::new()
        };

        Ok(TableSpec {
            columns,
            composite_primary_key,
        })
    }

    // ── construction paths ─────────────────────────────────────────────

    /// Constructs a fresh entity from application-side properties.
    ///
    /// Supplied values are copied through unchanged (they are already in
    /// application form); then every schema field with a default and no
    /// supplied value receives one, calling the generator if the default is
    /// one.
    pub fn entity(&self, props: Vec<(&str, Value)>) -> Entity {
        Entity::new(self.clone(), props)
    }

    /// Hydrates an entity from a storage row.
    ///
    /// Timestamp columns are parsed as datetimes, the soft-delete flag is
    /// stored raw, unknown columns are silently ignored, and every other
    /// value goes through its field's deserializer. Defaults are never
    /// applied on this path.
    pub fn hydrate(&self, row: &Row) -> EstelleResult<Entity> {
        Entity::hydrate(self.clone(), row)
    }

    // ── finders ────────────────────────────────────────────────────────

    /// Finds one record by its primary-key value.
    ///
    /// Returns `Ok(None)` when no live row matches; absence is a sentinel,
    /// not an error. Requires a single-field primary key.
    pub async fn find_by_id(&self, id: impl Into<Value> + Send) -> EstelleResult<Option<Entity>> {
        let pk = match self.inner.primary_fields.as_slice() {
            [single] => single.clone(),
            [] => {
                return Err(EstelleError::Configuration(format!(
                    "model '{}' has no primary key to find by",
                    self.inner.name
                )))
            }
            _ => {
                return Err(EstelleError::Configuration(format!(
                    "model '{}' has a composite primary key; use find_where",
                    self.inner.name
                )))
            }
        };
        let id = id.into();
        let stored = self
            .inner
            .schema
            .get(&pk)
            .map_or_else(|| id.clone(), |spec| spec.serialize(&id));

        let mut results = self.find_where(Filter::new().eq(pk, stored)).await?;
        Ok(if results.is_empty() {
            None
        } else {
            Some(results.remove(0))
        })
    }

    /// Finds all live records matching an equality filter.
    pub async fn find_where(&self, filter: Filter) -> EstelleResult<Vec<Entity>> {
        let backend = self.backend()?;
        let rows = backend.select(&self.inner.table_name, &filter).await?;
        self.hydrate_live(rows)
    }

    /// Finds all live records.
    pub async fn find_all(&self) -> EstelleResult<Vec<Entity>> {
        self.find_where(Filter::new()).await
    }

    /// Hydrates rows, excluding soft-deleted ones when soft delete is on.
    fn hydrate_live(&self, rows: Vec<Row>) -> EstelleResult<Vec<Entity>> {
        let mut entities = Vec::with_capacity(rows.len());
        for row in &rows {
            if self.inner.options.soft_delete && !Self::row_is_live(row)? {
                continue;
            }
            entities.push(self.hydrate(row)?);
        }
        Ok(entities)
    }

    /// Evaluates a row's `deleted` flag. Rows without the flag are live.
    fn row_is_live(row: &Row) -> EstelleResult<bool> {
        let Some(flag) = row.get_value(DELETED_FIELD) else {
            return Ok(true);
        };
        if flag.is_null() {
            return Ok(true);
        }
        let deleted = types::deserialize_boolean(flag).map_err(|message| {
            EstelleError::Deserialization {
                field: DELETED_FIELD.to_string(),
                message,
            }
        })?;
        Ok(deleted == Value::Bool(false))
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.inner.name)
            .field("table_name", &self.inner.table_name)
            .field("fields", &self.inner.schema.len())
            .field("primary_fields", &self.inner.primary_fields)
            .finish_non_exhaustive()
    }
}

impl ModelBuilder {
    /// Defines (or redefines) a schema field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, spec: impl Into<FieldSpec>) -> Self {
        self.schema.define_field(name, spec);
        self
    }

    /// Replaces the options wholesale.
    #[must_use]
    pub fn options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }

    /// Enables or disables soft delete (on by default).
    #[must_use]
    pub const fn soft_delete(mut self, on: bool) -> Self {
        self.options.soft_delete = on;
        self
    }

    /// Enables or disables automatic timestamps (on by default).
    #[must_use]
    pub const fn timestamps(mut self, on: bool) -> Self {
        self.options.timestamps = on;
        self
    }

    /// Sets an explicit table name.
    #[must_use]
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.options.table_name = Some(name.into());
        self
    }

    /// Configures a single-field primary key.
    #[must_use]
    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.options.primary_key = Some(field.into());
        self
    }

    /// Configures an ordered composite primary key.
    #[must_use]
    pub fn composite_primary_key(
        mut self,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.options.composite_primary_key =
            Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Finalizes the class: derives the primary fields, the required-field
    /// set, and the table name, and freezes everything.
    ///
    /// # Errors
    ///
    /// Returns [`EstelleError::Configuration`] when both primary-key shapes
    /// are set, or when a configured primary field is absent from the schema.
    pub fn register(self) -> EstelleResult<Model> {
        let Self {
            name,
            schema,
            options,
        } = self;

        if options.primary_key.is_some() && options.composite_primary_key.is_some() {
            return Err(EstelleError::Configuration(format!(
                "model '{name}' sets both a primary key and a composite primary key"
            )));
        }

        // Configured key shapes take precedence; otherwise field-level
        // primary-key flags, in declaration order.
        let primary_fields: Vec<String> = if let Some(pk) = options.primary_key.clone() {
            vec![pk]
        } else if let Some(composite) = options.composite_primary_key.clone() {
            composite
        } else {
            schema
                .iter()
                .filter(|(_, spec)| spec.is_primary_key())
                .map(|(n, _)| n.to_string())
                .collect()
        };

        for field in &primary_fields {
            if !schema.contains(field) {
                return Err(EstelleError::Configuration(format!(
                    "model '{name}' declares primary field '{field}' which is not in the schema"
                )));
            }
        }

        let mut required_fields: BTreeSet<String> = schema
            .iter()
            .filter(|(_, spec)| spec.is_required())
            .map(|(n, _)| n.to_string())
            .collect();
        required_fields.extend(primary_fields.iter().cloned());

        let table_name = options
            .table_name
            .clone()
            .unwrap_or_else(|| default_table_name(&name));

        Ok(Model {
            inner: Arc::new(ModelInner {
                name,
                schema,
                options,
                table_name,
                required_fields,
                primary_fields,
                backend: OnceLock::new(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use crate::types;

    fn sample_model() -> Model {
        Model::builder("User")
            .field("id", FieldSpec::new(types::unique_id()).primary_key())
            .field("name", FieldSpec::new(types::text()).required())
            .field("age", types::integer())
            .register()
            .unwrap()
    }

    #[test]
    fn test_table_name_derived() {
        let m = sample_model();
        assert_eq!(m.table_name(), "users");
    }

    #[test]
    fn test_table_name_explicit() {
        let m = Model::builder("User")
            .field("id", FieldSpec::new(types::unique_id()).primary_key())
            .table_name("accounts")
            .register()
            .unwrap();
        assert_eq!(m.table_name(), "accounts");
    }

    #[test]
    fn test_field_level_primary_key_derivation() {
        let m = sample_model();
        assert_eq!(m.primary_fields(), &["id".to_string()]);
    }

    #[test]
    fn test_configured_primary_key_wins() {
        let m = Model::builder("Thing")
            .field("code", types::text())
            .field("id", FieldSpec::new(types::unique_id()).primary_key())
            .primary_key("code")
            .register()
            .unwrap();
        assert_eq!(m.primary_fields(), &["code".to_string()]);
    }

    #[test]
    fn test_required_fields_include_primary() {
        let m = sample_model();
        assert!(m.required_fields().contains("id"));
        assert!(m.required_fields().contains("name"));
        assert!(!m.required_fields().contains("age"));
    }

    #[test]
    fn test_composite_primary_key_order_kept() {
        let m = Model::builder("Membership")
            .field("user_id", types::unique_id())
            .field("group_id", types::unique_id())
            .composite_primary_key(["group_id", "user_id"])
            .register()
            .unwrap();
        assert_eq!(
            m.primary_fields(),
            &["group_id".to_string(), "user_id".to_string()]
        );
        assert!(m.required_fields().contains("user_id"));
        assert!(m.required_fields().contains("group_id"));
    }

    #[test]
    fn test_both_key_shapes_rejected() {
        let err = Model::builder("Broken")
            .field("a", types::integer())
            .field("b", types::integer())
            .primary_key("a")
            .composite_primary_key(["a", "b"])
            .register()
            .unwrap_err();
        assert_eq!(err.code(), "configuration");
    }

    #[test]
    fn test_unknown_primary_field_rejected() {
        let err = Model::builder("Broken")
            .field("a", types::integer())
            .primary_key("missing")
            .register()
            .unwrap_err();
        assert_eq!(err.code(), "configuration");
    }

    #[test]
    fn test_no_primary_key_is_legal() {
        let m = Model::builder("Log")
            .field("line", types::text())
            .register()
            .unwrap();
        assert!(m.primary_fields().is_empty());
    }

    #[test]
    fn test_lifecycle_fields_follow_options() {
        let m = sample_model();
        assert!(m.is_lifecycle_field("created"));
        assert!(m.is_lifecycle_field("updated"));
        assert!(m.is_lifecycle_field("deleted"));

        let bare = Model::builder("Bare")
            .field("x", types::text())
            .soft_delete(false)
            .timestamps(false)
            .register()
            .unwrap();
        assert!(!bare.is_lifecycle_field("created"));
        assert!(!bare.is_lifecycle_field("deleted"));
    }

    #[test]
    fn test_table_spec_shape() {
        let m = sample_model();
        let spec = m.table_spec(Dialect::Postgres).unwrap();
        let names: Vec<_> = spec.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "age", "created", "updated", "deleted"]);

        let id = &spec.columns[0];
        assert!(id.primary_key);
        assert!(id.not_null);
        assert_eq!(id.column_type, "UUID");

        let age = &spec.columns[2];
        assert!(!age.not_null);

        let deleted = spec.columns.last().unwrap();
        assert!(deleted.not_null);
        assert_eq!(deleted.default, Some(Value::Bool(false)));
        assert!(spec.composite_primary_key.is_empty());
    }

    #[test]
    fn test_table_spec_composite_constraint() {
        let m = Model::builder("Membership")
            .field("user_id", types::unique_id())
            .field("group_id", types::unique_id())
            .composite_primary_key(["user_id", "group_id"])
            .register()
            .unwrap();
        let spec = m.table_spec(Dialect::Sqlite).unwrap();
        assert_eq!(
            spec.composite_primary_key,
            vec!["user_id".to_string(), "group_id".to_string()]
        );
        // no single-column primary-key flag when the key is composite
        assert!(spec.columns.iter().all(|c| !c.primary_key));
    }

    #[test]
    fn test_table_spec_unmapped_dialect_fails() {
        let custom = crate::types::TypeDescriptor::new("point")
            .column_type_for(Dialect::Postgres, "POINT")
            .validator(|_| true);
        let m = Model::builder("Place")
            .field("location", custom)
            .register()
            .unwrap();
        let err = m.table_spec(Dialect::Sqlite).unwrap_err();
        assert_eq!(err.code(), "schema.noColumnType");
    }

    #[test]
    fn test_backend_unset_is_no_connection() {
        let m = sample_model();
        let err = m.backend().map(|_| ()).unwrap_err();
        assert_eq!(err.code(), "no-connection");
    }
}

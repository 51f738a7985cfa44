//! The storage backend capability interface.
//!
//! The mapping layer never speaks a wire protocol itself. Every persistence
//! operation goes through the narrow [`StorageBackend`] trait: an equality
//! filtered select, single-row insert/update/delete, idempotent table
//! creation, and a raw-statement escape hatch used only for upserts.
//!
//! [`Dialect`] identifies the backend's SQL variant. It selects column-type
//! strings in the type registry and gates the upsert syntax; backends without
//! a known upsert form are rejected pre-flight rather than emulated, because
//! a read-then-write emulation would break the one-round-trip contract the
//! rest of the layer assumes.

use crate::value::Value;
use estelle_core::{EstelleError, EstelleResult};

/// The SQL variant of a storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// PostgreSQL (uses `$1, $2, ...` placeholders).
    Postgres,
    /// MySQL (uses `?` placeholders).
    MySql,
    /// SQLite (uses `?` placeholders).
    Sqlite,
}

impl Dialect {
    /// Returns the stable identifier for this dialect.
    ///
    /// These match the client names the layer has always used, so existing
    /// configuration keeps working ("sqlite3", not "sqlite").
    pub const fn name(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite3",
        }
    }

    /// Returns a parameter placeholder for the given 1-based index.
    fn placeholder(self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${index}"),
            Self::MySql | Self::Sqlite => "?".to_string(),
        }
    }

    /// Returns `true` if this dialect has a known single-statement upsert
    /// syntax.
    ///
    /// PostgreSQL and SQLite express it as `INSERT ... ON CONFLICT ... DO
    /// UPDATE`. MySQL is gated off: its `ON DUPLICATE KEY` form conflicts on
    /// any unique index rather than the configured primary fields, so the
    /// layer refuses rather than silently changing semantics.
    pub const fn supports_upsert(self) -> bool {
        matches!(self, Self::Postgres | Self::Sqlite)
    }

    /// Builds a single-statement upsert: insert `row`, and on a conflict in
    /// `conflict_target` update the columns named in `update_columns` from
    /// the attempted insert values.
    ///
    /// # Errors
    ///
    /// Returns [`EstelleError::UnsupportedOperation`] for dialects without an
    /// upsert syntax, and for an empty conflict target (the statement is not
    /// expressible without one).
    pub fn build_upsert(
        self,
        table: &str,
        row: &[(String, Value)],
        update_columns: &[String],
        conflict_target: &[String],
    ) -> EstelleResult<(String, Vec<Value>)> {
        if !self.supports_upsert() {
            return Err(EstelleError::UnsupportedOperation(format!(
                "dialect '{}' has no single-statement upsert",
                self.name()
            )));
        }
        if conflict_target.is_empty() {
            return Err(EstelleError::UnsupportedOperation(
                "upsert requires a primary key as its conflict target".to_string(),
            ));
        }

        let mut params = Vec::with_capacity(row.len());
        let columns: Vec<String> = row.iter().map(|(name, _)| format!("\"{name}\"")).collect();
        let placeholders: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, (_, val))| {
                params.push(val.clone());
                self.placeholder(i + 1)
            })
            .collect();
        let target: Vec<String> = conflict_target.iter().map(|c| format!("\"{c}\"")).collect();

        let mut sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({}) ON CONFLICT ({})",
            table,
            columns.join(", "),
            placeholders.join(", "),
            target.join(", ")
        );

        if update_columns.is_empty() {
            sql.push_str(" DO NOTHING");
        } else {
            let sets: Vec<String> = update_columns
                .iter()
                .map(|c| format!("\"{c}\" = excluded.\"{c}\""))
                .collect();
            sql.push_str(&format!(" DO UPDATE SET {}", sets.join(", ")));
        }

        Ok((sql, params))
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An equality-only conjunction filter: `field = value AND field = value ...`.
///
/// An empty filter matches every row. Write operations with an empty filter
/// therefore apply to the whole table; the entity layer warns but does not
/// mask this (it is inherited from having no configured identity).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Creates an empty filter.
    pub const fn new() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }

    /// Adds an equality condition, builder style.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    /// Adds an equality condition in place.
    pub fn push(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.conditions.push((field.into(), value.into()));
    }

    /// Returns the conditions in insertion order.
    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    /// Returns `true` if the filter has no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Returns the number of conditions.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }
}

/// A flat column-name to raw-value row as returned by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row from column names and values.
    ///
    /// # Panics
    ///
    /// Panics if the number of columns does not match the number of values.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        assert_eq!(
            columns.len(),
            values.len(),
            "Row column count must match value count"
        );
        Self { columns, values }
    }

    /// Creates a row from (column, value) pairs.
    pub fn from_pairs(pairs: Vec<(String, Value)>) -> Self {
        let (columns, values) = pairs.into_iter().unzip();
        Self { columns, values }
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the raw value stored under `column`, if present.
    pub fn get_value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    /// Iterates over (column, value) pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// The backend-defined result of a write operation.
///
/// The mapping layer returns this unmodified; callers that care about
/// affected-row counts or generated identities inspect it themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOutcome {
    /// Number of rows the statement touched.
    pub rows_affected: u64,
    /// The generated identity of an inserted row, when the backend reports one.
    pub last_insert_id: Option<Value>,
}

/// One column of a table-creation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    /// The column name.
    pub name: String,
    /// The dialect-resolved column type string.
    pub column_type: String,
    /// Whether the column carries `NOT NULL`.
    pub not_null: bool,
    /// Whether the column is the single-column primary key.
    pub primary_key: bool,
    /// An optional column default.
    pub default: Option<Value>,
}

/// The full shape of a table-creation request.
///
/// Table creation is idempotent ("create if not exists"); re-running it never
/// alters an existing table's shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSpec {
    /// Columns in declaration order.
    pub columns: Vec<ColumnSpec>,
    /// Fields of a composite primary-key constraint, in configured order.
    /// Empty when the table has no composite key.
    pub composite_primary_key: Vec<String>,
}

/// The capability interface a storage backend exposes to the mapping layer.
///
/// Every method is one round trip. The layer performs no retries and no
/// multi-statement sequences; cancellation and timeouts are the backend's
/// responsibility.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Returns the backend's SQL dialect.
    fn dialect(&self) -> Dialect;

    /// Reads all rows of `table` matching `filter`.
    async fn select(&self, table: &str, filter: &Filter) -> EstelleResult<Vec<Row>>;

    /// Inserts one row.
    async fn insert(&self, table: &str, row: &[(String, Value)]) -> EstelleResult<WriteOutcome>;

    /// Updates the rows matching `filter` with the given column values.
    async fn update(
        &self,
        table: &str,
        filter: &Filter,
        row: &[(String, Value)],
    ) -> EstelleResult<WriteOutcome>;

    /// Physically deletes the rows matching `filter`.
    async fn delete(&self, table: &str, filter: &Filter) -> EstelleResult<WriteOutcome>;

    /// Creates `table` if it does not already exist.
    async fn create_table_if_not_exists(&self, table: &str, spec: &TableSpec)
        -> EstelleResult<()>;

    /// Executes a raw parameterized statement.
    ///
    /// Escape hatch used only for upserts, which the structured interface
    /// cannot express portably.
    async fn raw_statement(&self, sql: &str, params: &[Value]) -> EstelleResult<WriteOutcome>;
}

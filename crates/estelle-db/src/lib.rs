//! # estelle-db
//!
//! Record mapping layer for estelle. Provides the [`Model`](model::Model)
//! class descriptor, the [`Entity`](entity::Entity) record with its
//! validate / serialize / persist lifecycle, a library of reusable
//! [`TypeDescriptor`](types::TypeDescriptor)s, and the
//! [`StorageBackend`](backend::StorageBackend) abstraction the whole crate
//! is written against.
//!
//! ## Architecture
//!
//! A model is configured once through [`ModelBuilder`](model::ModelBuilder)
//! and frozen at registration: table name, primary fields, and the
//! required-field set are all derived eagerly, so every later operation
//! reads immutable state. Entities carry values in application form;
//! serializers and deserializers on the field's type (or per-field
//! overrides) translate to and from the storage representation at the
//! persistence boundary.
//!
//! ## Module Overview
//!
//! - [`value`] - The backend-agnostic [`Value`](value::Value) enum and kinds
//! - [`types`] - [`TypeDescriptor`](types::TypeDescriptor) and the built-ins
//! - [`schema`] - Per-field specs with override resolution, ordered [`Schema`](schema::Schema)
//! - [`model`] - Model options, registration, DDL shape, and finders
//! - [`entity`] - Entity construction, hydration, validation, lifecycle
//! - [`backend`] - [`StorageBackend`](backend::StorageBackend), dialects, rows, filters

// These clippy lints are intentionally allowed for the mapping crate:
// - result_large_err: EstelleError is the library error type and is used consistently
// - needless_pass_by_value: builder signatures take owned values for chaining
// - return_self_not_must_use: builder pattern methods are self-documenting
// - doc_markdown: backtick requirements for documentation items are too strict
#![allow(clippy::result_large_err)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::match_same_arms)]

pub mod backend;
pub mod entity;
pub mod model;
pub mod schema;
pub mod types;
pub mod value;

pub use backend::{
    ColumnSpec, Dialect, Filter, Row, StorageBackend, TableSpec, WriteOutcome,
};
pub use entity::Entity;
pub use model::{Model, ModelBuilder, ModelOptions};
pub use schema::{FieldSpec, Schema};
pub use types::TypeDescriptor;
pub use value::{Value, ValueKind};

pub use estelle_core::{EstelleError, EstelleResult};

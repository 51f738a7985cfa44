//! # estelle
//!
//! Schema-driven record mapping for Rust.
//!
//! This is the meta-crate that re-exports the sub-crates for convenient
//! access. Depend on `estelle` to get the whole library, or on the
//! individual crates for finer-grained control.
//!
//! ```no_run
//! use estelle::prelude::*;
//!
//! # fn demo() -> estelle::core::EstelleResult<Model> {
//! let user = Model::builder("User")
//!     .field("id", FieldSpec::new(types::unique_id()).primary_key())
//!     .field("name", FieldSpec::new(types::text()).required())
//!     .register()?;
//! # Ok(user)
//! # }
//! ```

/// Core error types, logging setup, and text utilities.
pub use estelle_core as core;

/// The mapping layer: models, entities, schemas, types, and backends.
pub use estelle_db as db;

// Third-party re-exports, so downstream code can use the same versions
// the library was built against.
pub use async_trait;
pub use chrono;
pub use serde;
pub use serde_json;
pub use tracing;
pub use tracing_subscriber;
pub use uuid;

/// The names most programs need, in one import.
pub mod prelude {
    pub use estelle_core::{EstelleError, EstelleResult};
    pub use estelle_db::types;
    pub use estelle_db::{
        Dialect, Entity, FieldSpec, Filter, Model, ModelBuilder, ModelOptions, Row, Schema,
        StorageBackend, TableSpec, TypeDescriptor, Value, ValueKind, WriteOutcome,
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_third_party_reexports_resolve() {
        let id = crate::uuid::Uuid::new_v4();
        let value = crate::db::Value::Uuid(id);
        assert_eq!(value, crate::db::Value::Uuid(id));
        let stamped = crate::chrono::Utc::now();
        assert!(stamped.timestamp() > 0);
        let doc = crate::serde_json::json!({"ok": true});
        assert!(doc.is_object());
    }
}

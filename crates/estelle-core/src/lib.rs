//! # estelle-core
//!
//! Foundation types for the estelle mapping layer. This crate has no
//! dependency on the mapping layer itself and provides the pieces every
//! other crate needs:
//!
//! - [`error`] - Error types, stable error codes, and the result alias
//! - [`logging`] - Tracing-based logging integration
//! - [`utils`] - Text helpers (pluralization, table-name derivation)

pub mod error;
pub mod logging;
pub mod utils;

// Re-export the most commonly used types at the crate root.
pub use error::{EstelleError, EstelleResult};

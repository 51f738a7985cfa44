//! Utility helpers shared across the estelle crates.

pub mod text;

//! Data models
//!
//! Snapshots owned by the collaborating subsystems. The floor engine only reads
//! them and replaces them whole.

pub mod dining_table;
pub mod order;

// Re-exports
pub use dining_table::*;
pub use order::*;

//! Shared types for the Crab floor engine
//!
//! Data contracts exchanged with order entry, the kitchen display and floor
//! management: table and order snapshots, status-change events and filters.

pub mod message;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Message re-exports (for convenient access)
pub use message::{StatusUpdateEvent, SubscriptionFilter, UpdateSource};

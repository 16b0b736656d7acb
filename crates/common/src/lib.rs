//! Shared building blocks for the delivery service API crates.
//! - Logging initialisation (`utils::logging`).
//! - Wire types shared by the HTTP layer and its tests (`types`).

pub mod types;
pub mod utils;

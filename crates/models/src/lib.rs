//! sea-orm entities backing the delivery service API.
//!
//! Reference tables (`tenant`, `cdn`, `type`, `topology`, `server`) are read by the
//! rule engine; `deliveryservice` and `deliveryservice_server` are written by it.

pub mod errors;
pub mod db;
pub mod tenant;
pub mod cdn;
pub mod ds_type;
pub mod topology;
pub mod topology_cachegroup;
pub mod server;
pub mod delivery_service;
pub mod deliveryservice_server;

#[cfg(test)]
mod tests;

/// Split a comma separated text column into trimmed, non-empty items.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Inverse of [`split_list`].
pub fn join_list(items: &[String]) -> String {
    items.join(",")
}

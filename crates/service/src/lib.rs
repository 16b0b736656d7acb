//! Delivery service rule engine.
//! - `tenancy`, `conditional`, `pagination` hold the request-independent rules.
//! - `delivery_service` validates, guards and orchestrates around a repository.
//! - Persistence is abstracted by `DeliveryServiceRepository`; sea-orm and in-memory impls ship here.

pub mod errors;
pub mod tenancy;
pub mod conditional;
pub mod pagination;
pub mod delivery_service;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use delivery_service::{DeliveryServiceService, DeliveryServiceRepository};
pub use errors::ServiceError;

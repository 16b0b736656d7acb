//! Delivery service resource: domain types, validation, assignment rules and
//! the service that orchestrates them over a repository.

pub mod domain;
pub mod filter;
pub mod defaults;
pub mod validation;
pub mod assignment_guard;
pub mod repository;
pub mod repo;
pub mod service;

pub use domain::{DeliveryService, DeliveryServiceFields, DeliveryServiceInput};
pub use filter::{DeliveryServiceFilter, ListQuery};
pub use repository::DeliveryServiceRepository;
pub use service::{DeliveryServiceService, ListOutcome};

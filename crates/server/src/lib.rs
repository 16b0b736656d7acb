pub mod auth;
pub mod errors;
pub mod headers;
pub mod metrics;
pub mod routes;
pub mod startup;

pub use startup::run;

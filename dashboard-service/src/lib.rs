pub mod api;
pub mod config;
pub mod import;
pub mod metrics_server;
pub mod narrative;
pub mod observability;
pub mod service;
pub mod validation;

pub use service::{HouseholdService, ServiceError};

//! Rateshop Service
//!
//! The coordination layer over the provider adapters: the [`RateShopper`]
//! fan-out and the [`HealthMonitor`] disable/re-enable state machine.

pub mod errors;
pub mod health_monitor;
pub mod rate_shopper;

pub use errors::{ServiceError, ServiceResult};
pub use health_monitor::{HealthMonitor, SystemHealthReport, SystemStatus};
pub use rate_shopper::RateShopper;

//! Meter application.
//!
//! Orchestrates the meter lifecycle over the overlay:
//! - [`MeterService`]: Create / Increment / Decrement / Refresh
//! - [`MeterRepository`]: ordered, outpoint-keyed view of live meters
//! - [`AppConfig`]: TOML configuration
//! - [`build_service`]: wiring with HTTP overlay clients and a local wallet

pub mod app;
pub mod config;
pub mod error;
pub mod repository;
pub mod service;

pub use app::build_service;
pub use config::AppConfig;
pub use error::{MeterError, MeterResult};
pub use repository::MeterRepository;
pub use service::{MeterService, RefreshReport};

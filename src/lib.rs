//! AgroSense core
//!
//! In-memory monitoring core for IoT agricultural devices: a reactive device
//! store with derived views, a live metrics feed driven by simulated
//! telemetry, and mock device-catalog and user-profile backends.
//!
//! Nothing here talks to real hardware; all data is simulated.

pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod models;
pub mod profile;
pub mod simulation;
pub mod store;
pub mod validation;

pub use crate::dashboard::{Dashboard, DashboardSummary};
pub use crate::error::{AppError, AppResult};
pub use crate::feed::{MetricsFeed, TickerHandle};
pub use crate::store::{DeviceState, DeviceStore};

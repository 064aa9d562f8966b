//! Incident tracking with lifecycle-aware elapsed time.
//!
//! Incidents move between `Open`, `Closed` and `ReOpen`. Each running
//! interval is folded into an accumulated total when the incident closes,
//! so the elapsed time shown on dashboards and in exports never counts the
//! time an incident spent closed.

pub mod analytics;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod state;
pub mod telemetry;

pub use error::{AppError, Result};

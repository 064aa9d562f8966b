//! Incident lifecycle: open → closed → reopened → closed, with elapsed time
//! accumulated across every running interval.
//!
//! - [`engine`] holds the pure transitions (`close`, `reopen`) and the
//!   `current_elapsed` query.
//! - [`format`] renders durations for display and export.
//! - [`clock`] abstracts the time source.
//! - [`service`] performs the read-modify-write against an
//!   [`IncidentStore`](crate::state::IncidentStore), serialized per incident.

pub mod clock;
pub mod engine;
pub mod format;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{close, current_elapsed, interval_elapsed_ms, reopen, CloseOutcome};
pub use format::{format_duration, format_elapsed};
pub use service::{ElapsedView, IncidentService};

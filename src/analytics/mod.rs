//! Dashboard analytics and export
//!
//! - [`ElapsedBucket`]: "< N hours" classes used to filter incident tables
//! - [`IncidentBreakdown`]: counts by status, priority, category and elapsed bucket
//! - [`IncidentExporter`]: CSV export with live elapsed time

mod breakdown;
mod buckets;
mod export;

pub use breakdown::IncidentBreakdown;
pub use buckets::ElapsedBucket;
pub use export::{ExportRow, IncidentExporter};

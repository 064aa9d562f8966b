//! Incident export formats

use crate::analytics::ElapsedBucket;
use crate::error::Result;
use crate::lifecycle::{current_elapsed, format_elapsed};
use crate::models::Incident;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::Path;
use tokio::fs;

/// One exported line; field order is the column order
#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
    pub reference: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub category: String,
    pub sbu: String,
    pub backbone: String,
    pub super_backbone: String,
    pub distribution: String,
    pub access: String,
    pub submitted_at: String,
    pub reopened_at: String,
    pub closed_at: String,
    pub elapsed_ms: u64,
    pub elapsed: String,
}

impl ExportRow {
    /// Header record, in field order
    pub const COLUMNS: [&'static str; 15] = [
        "reference",
        "description",
        "status",
        "priority",
        "category",
        "sbu",
        "backbone",
        "super_backbone",
        "distribution",
        "access",
        "submitted_at",
        "reopened_at",
        "closed_at",
        "elapsed_ms",
        "elapsed",
    ];

    pub fn new(incident: &Incident, now: DateTime<Utc>) -> Self {
        let elapsed_ms = current_elapsed(incident, now);

        Self {
            reference: incident.reference.clone(),
            description: incident.description.clone(),
            status: incident.status.to_string(),
            priority: incident.priority.clone(),
            category: incident.category.clone(),
            sbu: incident.location.sbu.clone(),
            backbone: incident.location.backbone.clone(),
            super_backbone: incident.location.super_backbone.clone(),
            distribution: incident.location.distribution.clone(),
            access: incident.location.access.clone(),
            submitted_at: timestamp(Some(incident.submitted_at)),
            reopened_at: timestamp(incident.reopened_at),
            closed_at: timestamp(incident.closed_at),
            elapsed_ms,
            elapsed: format_elapsed(elapsed_ms),
        }
    }
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// Incident exporter
pub struct IncidentExporter;

impl IncidentExporter {
    /// Render incidents as CSV with their elapsed time as of `now`.
    ///
    /// The header is always written, even when there are no rows.
    pub fn to_csv(incidents: &[Incident], now: DateTime<Utc>) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(ExportRow::COLUMNS)?;

        for incident in incidents {
            writer.serialize(ExportRow::new(incident, now))?;
        }

        writer
            .into_inner()
            .map_err(|e| crate::error::AppError::Serialization(format!("CSV flush failed: {}", e)))
    }

    /// Render only incidents whose elapsed time falls under `bucket`
    pub fn to_csv_within(
        incidents: &[Incident],
        bucket: ElapsedBucket,
        now: DateTime<Utc>,
    ) -> Result<Vec<u8>> {
        let selected: Vec<Incident> = incidents
            .iter()
            .filter(|incident| bucket.contains(current_elapsed(incident, now)))
            .cloned()
            .collect();

        Self::to_csv(&selected, now)
    }

    /// Write CSV to a file and return the bytes written
    pub async fn write_csv(
        incidents: &[Incident],
        now: DateTime<Utc>,
        output_path: &Path,
    ) -> Result<Vec<u8>> {
        let bytes = Self::to_csv(incidents, now)?;
        fs::write(output_path, &bytes).await?;

        tracing::info!(
            path = %output_path.display(),
            rows = incidents.len(),
            "Exported incidents to CSV"
        );

        Ok(bytes)
    }
}

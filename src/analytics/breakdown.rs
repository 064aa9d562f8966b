//! Dashboard breakdowns over a set of incidents

use crate::analytics::ElapsedBucket;
use crate::lifecycle::current_elapsed;
use crate::models::{Incident, IncidentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts that drive the dashboard charts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncidentBreakdown {
    pub generated_at: Option<DateTime<Utc>>,
    pub total: u64,
    /// Incidents with a running interval (Open or ReOpen)
    pub running: u64,
    pub by_status: BTreeMap<String, u64>,
    pub by_priority: BTreeMap<String, u64>,
    pub by_category: BTreeMap<String, u64>,
    pub by_elapsed: BTreeMap<ElapsedBucket, u64>,
    /// Mean accumulated elapsed over Closed incidents
    pub mean_closed_elapsed_ms: Option<u64>,
}

impl IncidentBreakdown {
    pub fn from_incidents(incidents: &[Incident], now: DateTime<Utc>) -> Self {
        let mut breakdown = Self {
            generated_at: Some(now),
            ..Default::default()
        };

        let mut closed_total: u128 = 0;
        let mut closed_count: u64 = 0;

        for incident in incidents {
            breakdown.total += 1;
            if incident.is_active() {
                breakdown.running += 1;
            }

            *breakdown
                .by_status
                .entry(incident.status.to_string())
                .or_default() += 1;
            *breakdown
                .by_priority
                .entry(label(&incident.priority))
                .or_default() += 1;
            *breakdown
                .by_category
                .entry(label(&incident.category))
                .or_default() += 1;

            let elapsed = current_elapsed(incident, now);
            *breakdown
                .by_elapsed
                .entry(ElapsedBucket::classify(elapsed))
                .or_default() += 1;

            if incident.status == IncidentStatus::Closed {
                closed_total += u128::from(elapsed);
                closed_count += 1;
            }
        }

        if closed_count > 0 {
            breakdown.mean_closed_elapsed_ms =
                Some((closed_total / u128::from(closed_count)) as u64);
        }

        breakdown
    }
}

fn label(value: &str) -> String {
    if value.trim().is_empty() {
        "Unknown".to_string()
    } else {
        value.to_string()
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// Represents a tracked incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Unique identifier
    pub id: Uuid,

    /// Human-facing incident number
    pub reference: String,

    /// Detailed description
    pub description: String,

    /// Current lifecycle status
    pub status: IncidentStatus,

    /// When the incident was first submitted; never changes
    pub submitted_at: DateTime<Utc>,

    /// Start of the current interval after the most recent reopen
    pub reopened_at: Option<DateTime<Utc>>,

    /// Most recent close
    pub closed_at: Option<DateTime<Utc>>,

    /// Sum of all completed intervals, frozen at each close
    pub accumulated_elapsed_ms: u64,

    /// Priority label
    pub priority: String,

    /// Category label (e.g. Backbone, Access)
    pub category: String,

    /// Where in the network the incident sits
    #[serde(default)]
    pub location: NetworkLocation,

    /// Timeline of lifecycle events
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,

    /// Optimistic concurrency token
    #[serde(default)]
    pub version: u64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Incident {
    /// Create a new open incident from a validated request
    pub fn new(request: NewIncident, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference: request.reference,
            description: request.description,
            status: IncidentStatus::Open,
            submitted_at: request.submitted_at,
            reopened_at: None,
            closed_at: None,
            accumulated_elapsed_ms: 0,
            priority: request.priority,
            category: request.category,
            location: request.location,
            timeline: vec![TimelineEvent {
                timestamp: now,
                event_type: EventType::Created,
                description: "Incident created".to_string(),
                metadata: HashMap::new(),
            }],
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Start of the interval that is (or was last) running
    pub fn interval_start(&self) -> DateTime<Utc> {
        self.reopened_at.unwrap_or(self.submitted_at)
    }

    /// Check if an interval is currently running
    pub fn is_active(&self) -> bool {
        self.status.is_running()
    }

    /// Add a timeline event
    pub fn add_timeline_event(&mut self, event: TimelineEvent) {
        self.updated_at = event.timestamp;
        self.timeline.push(event);
    }

    /// Apply a patch to the descriptive fields; returns the names of changed fields
    pub fn apply_patch(&mut self, patch: IncidentPatch) -> Vec<&'static str> {
        let mut changed = Vec::new();

        if let Some(reference) = patch.reference {
            if reference != self.reference {
                self.reference = reference;
                changed.push("reference");
            }
        }
        if let Some(description) = patch.description {
            if description != self.description {
                self.description = description;
                changed.push("description");
            }
        }
        if let Some(priority) = patch.priority {
            if priority != self.priority {
                self.priority = priority;
                changed.push("priority");
            }
        }
        if let Some(category) = patch.category {
            if category != self.category {
                self.category = category;
                changed.push("category");
            }
        }
        if let Some(location) = patch.location {
            if location != self.location {
                self.location = location;
                changed.push("location");
            }
        }

        changed
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display)]
pub enum IncidentStatus {
    Open,
    Closed,
    ReOpen,
}

impl IncidentStatus {
    /// Open and ReOpen both have a running interval
    pub fn is_running(&self) -> bool {
        matches!(self, IncidentStatus::Open | IncidentStatus::ReOpen)
    }
}

/// Network hierarchy the incident was reported against
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkLocation {
    #[serde(default)]
    pub sbu: String,
    #[serde(default)]
    pub backbone: String,
    #[serde(default)]
    pub super_backbone: String,
    #[serde(default)]
    pub distribution: String,
    #[serde(default)]
    pub access: String,
}

/// Request to create an incident
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewIncident {
    #[validate(length(min = 1, max = 100))]
    pub reference: String,

    #[validate(length(min = 1, max = 2000))]
    pub description: String,

    pub submitted_at: DateTime<Utc>,

    #[serde(default)]
    pub priority: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub location: NetworkLocation,
}

/// Replacement values for descriptive fields; lifecycle fields are not patchable
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct IncidentPatch {
    #[validate(length(min = 1, max = 100))]
    pub reference: Option<String>,

    #[validate(length(min = 1, max = 2000))]
    pub description: Option<String>,

    pub priority: Option<String>,

    pub category: Option<String>,

    pub location: Option<NetworkLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub description: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
pub enum EventType {
    Created,
    Closed,
    Reopened,
    DetailsUpdated,
}

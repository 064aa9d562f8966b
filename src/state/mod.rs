pub mod store;

pub use store::*;

use crate::error::Result;
use crate::models::{Incident, IncidentStatus};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Trait for incident storage operations
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Insert a new incident; fails with `Conflict` if the id is taken
    async fn save_incident(&self, incident: &Incident) -> Result<()>;

    /// Get an incident by ID
    async fn get_incident(&self, id: &Uuid) -> Result<Option<Incident>>;

    /// Replace an incident if its stored version still equals `expected_version`.
    ///
    /// Returns the stored record, whose version is `expected_version + 1`.
    async fn update_incident(&self, incident: &Incident, expected_version: u64) -> Result<Incident>;

    /// Delete an incident
    async fn delete_incident(&self, id: &Uuid) -> Result<()>;

    /// List incidents with filtering, newest submission first
    async fn list_incidents(
        &self,
        filter: &IncidentFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Incident>>;

    /// Count incidents matching filter
    async fn count_incidents(&self, filter: &IncidentFilter) -> Result<u64>;
}

/// Filter for querying incidents
#[derive(Debug, Clone, Default)]
pub struct IncidentFilter {
    pub statuses: Vec<IncidentStatus>,
    pub priorities: Vec<String>,
    pub categories: Vec<String>,
    pub reference_contains: Option<String>,
}

impl IncidentFilter {
    pub fn matches(&self, incident: &Incident) -> bool {
        let status_match = self.statuses.is_empty() || self.statuses.contains(&incident.status);

        let priority_match =
            self.priorities.is_empty() || self.priorities.iter().any(|p| p == &incident.priority);

        let category_match =
            self.categories.is_empty() || self.categories.iter().any(|c| c == &incident.category);

        let reference_match = self
            .reference_contains
            .as_ref()
            .map_or(true, |needle| incident.reference.contains(needle.as_str()));

        status_match && priority_match && category_match && reference_match
    }
}

/// Create an in-memory store (for testing and development)
pub fn create_in_memory_store() -> Arc<dyn IncidentStore> {
    tracing::info!("Initializing in-memory storage backend");
    Arc::new(InMemoryStore::new())
}

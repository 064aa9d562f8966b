use crate::error::{AppError, Result};
use crate::models::Incident;
use crate::state::{IncidentFilter, IncidentStore};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory incident store
#[derive(Clone)]
pub struct InMemoryStore {
    incidents: Arc<DashMap<Uuid, Incident>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            incidents: Arc::new(DashMap::new()),
        }
    }

    /// Build a store pre-populated with existing records, keeping their versions
    pub fn with_incidents(incidents: impl IntoIterator<Item = Incident>) -> Self {
        let store = Self::new();
        for incident in incidents {
            store.incidents.insert(incident.id, incident);
        }
        store
    }

    /// Snapshot of every stored incident, newest submission first
    pub fn snapshot(&self) -> Vec<Incident> {
        let mut incidents: Vec<Incident> =
            self.incidents.iter().map(|entry| entry.value().clone()).collect();
        incidents.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        incidents
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IncidentStore for InMemoryStore {
    async fn save_incident(&self, incident: &Incident) -> Result<()> {
        match self.incidents.entry(incident.id) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "Incident {} already exists",
                incident.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(incident.clone());
                tracing::debug!(incident_id = %incident.id, "Incident saved");
                Ok(())
            }
        }
    }

    async fn get_incident(&self, id: &Uuid) -> Result<Option<Incident>> {
        Ok(self.incidents.get(id).map(|entry| entry.clone()))
    }

    async fn update_incident(&self, incident: &Incident, expected_version: u64) -> Result<Incident> {
        // The entry guard holds the shard lock across compare and write
        match self.incidents.entry(incident.id) {
            Entry::Vacant(_) => Err(AppError::NotFound(format!(
                "Incident {} not found",
                incident.id
            ))),
            Entry::Occupied(mut slot) => {
                let stored_version = slot.get().version;
                if stored_version != expected_version {
                    tracing::warn!(
                        incident_id = %incident.id,
                        expected_version,
                        stored_version,
                        "Stale incident update rejected"
                    );
                    return Err(AppError::Conflict(format!(
                        "Incident {} is at version {}, update expected {}",
                        incident.id, stored_version, expected_version
                    )));
                }

                let mut updated = incident.clone();
                updated.version = expected_version + 1;
                slot.insert(updated.clone());

                tracing::debug!(incident_id = %incident.id, version = updated.version, "Incident updated");
                Ok(updated)
            }
        }
    }

    async fn delete_incident(&self, id: &Uuid) -> Result<()> {
        if self.incidents.remove(id).is_some() {
            tracing::debug!(incident_id = %id, "Incident deleted");
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Incident {} not found", id)))
        }
    }

    async fn list_incidents(
        &self,
        filter: &IncidentFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Incident>> {
        let mut incidents: Vec<Incident> = self
            .incidents
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        // Sort by submission time (newest first)
        incidents.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));

        // Apply pagination
        let start = page as usize * page_size as usize;

        Ok(incidents
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .collect())
    }

    async fn count_incidents(&self, filter: &IncidentFilter) -> Result<u64> {
        let count = self
            .incidents
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .count();

        Ok(count as u64)
    }
}

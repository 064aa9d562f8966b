use crate::analytics::ElapsedBucket;
use crate::config::LifecycleConfig;
use crate::error::{AppError, Result};
use crate::lifecycle::engine::{self, CloseOutcome};
use crate::lifecycle::{format_elapsed, Clock};
use crate::models::{EventType, Incident, IncidentPatch, IncidentStatus, NewIncident, TimelineEvent};
use crate::state::{IncidentFilter, IncidentStore};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;
use validator::Validate;

/// Live elapsed time of one incident
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElapsedView {
    pub id: Uuid,
    pub reference: String,
    pub status: IncidentStatus,
    pub elapsed_ms: u64,
    pub formatted: String,
}

impl ElapsedView {
    pub fn new(incident: &Incident, now: DateTime<Utc>) -> Self {
        let elapsed_ms = engine::current_elapsed(incident, now);
        Self {
            id: incident.id,
            reference: incident.reference.clone(),
            status: incident.status,
            elapsed_ms,
            formatted: format_elapsed(elapsed_ms),
        }
    }
}

/// Incident lifecycle service: engine + store + clock
pub struct IncidentService {
    store: Arc<dyn IncidentStore>,
    clock: Arc<dyn Clock>,
    config: LifecycleConfig,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl IncidentService {
    pub fn new(store: Arc<dyn IncidentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            config: LifecycleConfig::default(),
            locks: DashMap::new(),
        }
    }

    /// Set lifecycle rules
    pub fn with_config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    /// Get a reference to the incident store
    pub fn store(&self) -> &Arc<dyn IncidentStore> {
        &self.store
    }

    /// Current instant according to the service clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run `op` while holding the lock for `id`.
    ///
    /// The map entry is dropped once no other task holds or waits on it.
    async fn with_lock<T>(&self, id: &Uuid, op: impl Future<Output = Result<T>>) -> Result<T> {
        let lock = self
            .locks
            .entry(*id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            op.await
        };

        drop(lock);
        self.locks.remove_if(id, |_, held| Arc::strong_count(held) == 1);
        result
    }

    fn latest_allowed_submission(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let skew_secs = self.config.max_future_skew_secs;

        i64::try_from(skew_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|skew| now.checked_add_signed(skew))
            .ok_or_else(|| {
                AppError::Configuration(format!(
                    "lifecycle.max_future_skew_secs {} is out of range",
                    skew_secs
                ))
            })
    }

    async fn load(&self, id: &Uuid) -> Result<Incident> {
        self.store
            .get_incident(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Incident {} not found", id)))
    }

    /// Create a new open incident
    pub async fn create_incident(&self, request: NewIncident) -> Result<Incident> {
        request.validate()?;

        let now = self.clock.now();
        if request.submitted_at > self.latest_allowed_submission(now)? {
            return Err(AppError::Validation(format!(
                "submitted_at {} is in the future",
                request.submitted_at.to_rfc3339()
            )));
        }

        let incident = Incident::new(request, now);
        self.store.save_incident(&incident).await?;

        tracing::info!(
            incident_id = %incident.id,
            reference = %incident.reference,
            submitted_at = %incident.submitted_at,
            "Incident created"
        );

        Ok(incident)
    }

    /// Get an incident by ID
    pub async fn get_incident(&self, id: &Uuid) -> Result<Incident> {
        self.load(id).await
    }

    /// Replace descriptive fields; lifecycle fields are left alone
    pub async fn update_details(&self, id: &Uuid, patch: IncidentPatch) -> Result<Incident> {
        patch.validate()?;
        self.with_lock(id, self.update_details_locked(id, patch)).await
    }

    async fn update_details_locked(&self, id: &Uuid, patch: IncidentPatch) -> Result<Incident> {
        let mut incident = self.load(id).await?;
        let expected_version = incident.version;

        let changed = incident.apply_patch(patch);
        if changed.is_empty() {
            return Ok(incident);
        }

        incident.add_timeline_event(TimelineEvent {
            timestamp: self.clock.now(),
            event_type: EventType::DetailsUpdated,
            description: format!("Updated {}", changed.join(", ")),
            metadata: HashMap::from([("fields".to_string(), changed.join(","))]),
        });

        let stored = self.store.update_incident(&incident, expected_version).await?;
        tracing::info!(incident_id = %id, fields = ?changed, "Incident details updated");
        Ok(stored)
    }

    /// Close an incident, folding its running interval into the total
    pub async fn close_incident(&self, id: &Uuid) -> Result<Incident> {
        self.with_lock(id, self.close_locked(id)).await
    }

    async fn close_locked(&self, id: &Uuid) -> Result<Incident> {
        let mut incident = self.load(id).await?;
        let expected_version = incident.version;
        let now = self.clock.now();

        match engine::close(&mut incident, now) {
            CloseOutcome::AlreadyClosed => {
                tracing::debug!(incident_id = %id, "Incident already closed, nothing to do");
                Ok(incident)
            }
            CloseOutcome::Closed {
                interval_ms,
                clock_skew,
            } => {
                if clock_skew {
                    tracing::warn!(
                        incident_id = %id,
                        interval_start = %incident.interval_start(),
                        now = %now,
                        "Clock is behind interval start, counting interval as zero"
                    );
                }

                let stored = self.store.update_incident(&incident, expected_version).await?;
                tracing::info!(
                    incident_id = %id,
                    interval_ms,
                    accumulated_elapsed_ms = stored.accumulated_elapsed_ms,
                    "Incident closed"
                );
                Ok(stored)
            }
        }
    }

    /// Reopen a closed incident
    pub async fn reopen_incident(&self, id: &Uuid) -> Result<Incident> {
        self.with_lock(id, self.reopen_locked(id)).await
    }

    async fn reopen_locked(&self, id: &Uuid) -> Result<Incident> {
        let mut incident = self.load(id).await?;
        let expected_version = incident.version;
        let now = self.clock.now();

        engine::reopen(&mut incident, now)?;

        let stored = self.store.update_incident(&incident, expected_version).await?;
        tracing::info!(
            incident_id = %id,
            accumulated_elapsed_ms = stored.accumulated_elapsed_ms,
            "Incident reopened"
        );
        Ok(stored)
    }

    /// Delete an incident
    pub async fn delete_incident(&self, id: &Uuid) -> Result<()> {
        self.with_lock(id, self.store.delete_incident(id)).await?;

        tracing::info!(incident_id = %id, "Incident deleted");
        Ok(())
    }

    /// Live elapsed time of one incident
    pub async fn elapsed(&self, id: &Uuid) -> Result<ElapsedView> {
        let incident = self.load(id).await?;
        Ok(ElapsedView::new(&incident, self.clock.now()))
    }

    /// List incidents with their live elapsed time, optionally limited to an elapsed bucket.
    ///
    /// The bucket is applied after the store filter, since elapsed time depends on `now`.
    pub async fn list_with_elapsed(
        &self,
        filter: &IncidentFilter,
        bucket: Option<ElapsedBucket>,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<(Incident, ElapsedView)>> {
        let now = self.clock.now();

        let incidents = match bucket {
            None => self.store.list_incidents(filter, page, page_size).await?,
            Some(_) => {
                let total = self.store.count_incidents(filter).await?;
                let all_pages = u32::try_from(total).unwrap_or(u32::MAX).max(1);
                self.store.list_incidents(filter, 0, all_pages).await?
            }
        };

        let views = incidents.into_iter().map(|incident| {
            let view = ElapsedView::new(&incident, now);
            (incident, view)
        });

        Ok(match bucket {
            None => views.collect(),
            Some(bucket) => views
                .filter(|(_, view)| bucket.contains(view.elapsed_ms))
                .skip(page as usize * page_size as usize)
                .take(page_size as usize)
                .collect(),
        })
    }
}

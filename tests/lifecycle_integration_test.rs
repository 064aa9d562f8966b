use chrono::{DateTime, Duration, TimeZone, Utc};
use incident_tracker::{
    error::AppError,
    lifecycle::{current_elapsed, format_duration, Clock, IncidentService, ManualClock},
    models::{IncidentStatus, NewIncident},
    state::{IncidentStore, InMemoryStore},
};
use std::sync::Arc;

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn new_incident(reference: &str, submitted_at: DateTime<Utc>) -> NewIncident {
    NewIncident {
        reference: reference.to_string(),
        description: "Core switch unreachable".to_string(),
        submitted_at,
        priority: "High".to_string(),
        category: "Backbone".to_string(),
        location: Default::default(),
    }
}

fn setup(start: DateTime<Utc>) -> (Arc<IncidentService>, ManualClock, Arc<InMemoryStore>) {
    let clock = ManualClock::new(start);
    let store = Arc::new(InMemoryStore::new());
    let service = IncidentService::new(store.clone(), Arc::new(clock.clone()));
    (Arc::new(service), clock, store)
}

#[tokio::test]
async fn test_close_reopen_close_scenario() {
    let (service, clock, _) = setup(ts("2024-01-01T00:00:00Z"));
    let incident = service
        .create_incident(new_incident("INC-2024-001", ts("2024-01-01T00:00:00Z")))
        .await
        .unwrap();

    clock.set(ts("2024-01-01T01:00:00Z"));
    let closed = service.close_incident(&incident.id).await.unwrap();
    assert_eq!(closed.status, IncidentStatus::Closed);
    assert_eq!(closed.accumulated_elapsed_ms, 3_600_000);

    clock.set(ts("2024-01-02T00:00:00Z"));
    let reopened = service.reopen_incident(&incident.id).await.unwrap();
    assert_eq!(reopened.status, IncidentStatus::ReOpen);
    assert_eq!(reopened.reopened_at, Some(ts("2024-01-02T00:00:00Z")));
    assert_eq!(reopened.submitted_at, ts("2024-01-01T00:00:00Z"));
    assert_eq!(reopened.accumulated_elapsed_ms, 3_600_000);

    clock.set(ts("2024-01-02T00:30:00Z"));
    let closed_again = service.close_incident(&incident.id).await.unwrap();
    assert_eq!(closed_again.accumulated_elapsed_ms, 5_400_000);
    assert_eq!(format_duration(closed_again.accumulated_elapsed_ms as i64), "1h 30m");
}

#[tokio::test]
async fn test_accumulation_excludes_closed_gap() {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let (service, clock, _) = setup(t0);
    let incident = service
        .create_incident(new_incident("INC-2", t0))
        .await
        .unwrap();

    let first_interval = Duration::minutes(47);
    let gap = Duration::days(9);
    let second_interval = Duration::seconds(3_601);

    clock.advance(first_interval);
    service.close_incident(&incident.id).await.unwrap();
    clock.advance(gap);
    service.reopen_incident(&incident.id).await.unwrap();
    clock.advance(second_interval);
    let done = service.close_incident(&incident.id).await.unwrap();

    let expected = (first_interval + second_interval).num_milliseconds() as u64;
    assert_eq!(done.accumulated_elapsed_ms, expected);
}

#[tokio::test]
async fn test_elapsed_is_monotonic_while_running() {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let (service, clock, _) = setup(t0);
    let incident = service
        .create_incident(new_incident("INC-3", t0))
        .await
        .unwrap();

    let mut previous = 0;
    for _ in 0..10 {
        clock.advance(Duration::seconds(7));
        let view = service.elapsed(&incident.id).await.unwrap();
        assert!(view.elapsed_ms >= previous);
        previous = view.elapsed_ms;
    }
    assert_eq!(previous, 70_000);
}

#[tokio::test]
async fn test_elapsed_frozen_after_close() {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let (service, clock, _) = setup(t0);
    let incident = service
        .create_incident(new_incident("INC-4", t0))
        .await
        .unwrap();

    clock.advance(Duration::hours(2));
    let closed = service.close_incident(&incident.id).await.unwrap();
    let at_close = current_elapsed(&closed, clock.now());

    for days in [1, 30, 365] {
        assert_eq!(current_elapsed(&closed, clock.now() + Duration::days(days)), at_close);
    }

    clock.advance(Duration::days(2));
    assert_eq!(service.elapsed(&incident.id).await.unwrap().elapsed_ms, at_close);
}

#[tokio::test]
async fn test_reopen_open_incident_leaves_record_unchanged() {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let (service, clock, store) = setup(t0);
    let incident = service
        .create_incident(new_incident("INC-5", t0))
        .await
        .unwrap();
    let before = serde_json::to_vec(&store.get_incident(&incident.id).await.unwrap()).unwrap();

    clock.advance(Duration::minutes(5));
    let err = service.reopen_incident(&incident.id).await.unwrap_err();

    assert!(matches!(err, AppError::InvalidStateTransition(_)));
    assert_eq!(err.error_code(), "INVALID_STATE_TRANSITION");
    let after = serde_json::to_vec(&store.get_incident(&incident.id).await.unwrap()).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_reopen_twice_is_rejected() {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let (service, clock, _) = setup(t0);
    let incident = service
        .create_incident(new_incident("INC-6", t0))
        .await
        .unwrap();

    clock.advance(Duration::minutes(5));
    service.close_incident(&incident.id).await.unwrap();
    service.reopen_incident(&incident.id).await.unwrap();

    let err = service.reopen_incident(&incident.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidStateTransition(_)));
}

#[tokio::test]
async fn test_clock_skew_close_counts_zero() {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let (service, clock, _) = setup(t0);
    let incident = service
        .create_incident(new_incident("INC-7", t0))
        .await
        .unwrap();

    clock.advance(Duration::minutes(-10));
    let closed = service.close_incident(&incident.id).await.unwrap();

    assert_eq!(closed.status, IncidentStatus::Closed);
    assert_eq!(closed.accumulated_elapsed_ms, 0);
    assert!(closed.closed_at.unwrap() >= closed.submitted_at);
}

#[tokio::test]
async fn test_concurrent_closes_count_interval_once() {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let (service, clock, _) = setup(t0);
    let incident = service
        .create_incident(new_incident("INC-8", t0))
        .await
        .unwrap();

    clock.advance(Duration::hours(1));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let service = service.clone();
            let id = incident.id;
            tokio::spawn(async move { service.close_incident(&id).await })
        })
        .collect();

    for handle in handles {
        let closed = handle.await.unwrap().unwrap();
        assert_eq!(closed.accumulated_elapsed_ms, 3_600_000);
    }

    let stored = service.get_incident(&incident.id).await.unwrap();
    assert_eq!(stored.accumulated_elapsed_ms, 3_600_000);
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn test_stale_writer_gets_conflict() {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let clock = ManualClock::new(t0);
    let store = Arc::new(InMemoryStore::new());
    let service = IncidentService::new(store.clone(), Arc::new(clock.clone()));

    let incident = service
        .create_incident(new_incident("INC-9", t0))
        .await
        .unwrap();
    // A copy read before the close, as a second process would hold it
    let stale_copy = store.get_incident(&incident.id).await.unwrap().unwrap();

    clock.advance(Duration::hours(1));
    service.close_incident(&incident.id).await.unwrap();

    let err = store
        .update_incident(&stale_copy, stale_copy.version)
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    let stored = store.get_incident(&incident.id).await.unwrap().unwrap();
    assert_eq!(stored.status, IncidentStatus::Closed);
    assert_eq!(stored.accumulated_elapsed_ms, 3_600_000);
}

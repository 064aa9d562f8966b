//! State transitions and elapsed-time arithmetic for a single incident.
//!
//! Everything here is synchronous and free of I/O: callers hand in the
//! record and the current instant, and persistence happens elsewhere.

use crate::error::{AppError, Result};
use crate::models::{EventType, Incident, IncidentStatus, TimelineEvent};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Result of a [`close`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// A running interval was stopped and added to the total
    Closed {
        interval_ms: u64,
        /// `now` was earlier than the interval start and the interval was clamped to zero
        clock_skew: bool,
    },
    /// Nothing was running; the record is untouched
    AlreadyClosed,
}

/// Milliseconds between `start` and `now`, clamped at zero
pub fn interval_elapsed_ms(start: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((now - start).num_milliseconds()).unwrap_or(0)
}

/// Elapsed time as of `now`: frozen when closed, growing while open or reopened
pub fn current_elapsed(incident: &Incident, now: DateTime<Utc>) -> u64 {
    if incident.status.is_running() {
        incident
            .accumulated_elapsed_ms
            .saturating_add(interval_elapsed_ms(incident.interval_start(), now))
    } else {
        incident.accumulated_elapsed_ms
    }
}

/// Stop the running interval and fold it into the accumulated total.
pub fn close(incident: &mut Incident, now: DateTime<Utc>) -> CloseOutcome {
    if !incident.status.is_running() {
        return CloseOutcome::AlreadyClosed;
    }

    let start = incident.interval_start();
    let clock_skew = now < start;
    let interval_ms = interval_elapsed_ms(start, now);

    incident.accumulated_elapsed_ms = incident.accumulated_elapsed_ms.saturating_add(interval_ms);
    incident.status = IncidentStatus::Closed;
    // closed_at never precedes the interval it ends
    incident.closed_at = Some(now.max(start));

    incident.add_timeline_event(TimelineEvent {
        timestamp: now,
        event_type: EventType::Closed,
        description: "Incident closed".to_string(),
        metadata: HashMap::from([
            ("interval_ms".to_string(), interval_ms.to_string()),
            (
                "accumulated_elapsed_ms".to_string(),
                incident.accumulated_elapsed_ms.to_string(),
            ),
        ]),
    });

    CloseOutcome::Closed {
        interval_ms,
        clock_skew,
    }
}

/// Start a new interval on a closed incident.
///
/// Fails with `InvalidStateTransition` unless the incident is `Closed`; the
/// record is not touched in that case.
pub fn reopen(incident: &mut Incident, now: DateTime<Utc>) -> Result<()> {
    if incident.status != IncidentStatus::Closed {
        return Err(AppError::InvalidStateTransition(format!(
            "incident {} is {}, only Closed incidents can be reopened",
            incident.id, incident.status
        )));
    }

    let previous = incident.status;
    incident.status = IncidentStatus::ReOpen;
    // reopened_at never precedes submission
    incident.reopened_at = Some(now.max(incident.submitted_at));

    incident.add_timeline_event(TimelineEvent {
        timestamp: now,
        event_type: EventType::Reopened,
        description: format!("State changed from {} to {}", previous, incident.status),
        metadata: HashMap::from([
            ("old_status".to_string(), previous.to_string()),
            ("new_status".to_string(), incident.status.to_string()),
        ]),
    });

    Ok(())
}

//! Human-readable rendering of elapsed durations.

const MS_PER_DAY: u64 = 86_400_000;
const MS_PER_HOUR: u64 = 3_600_000;
const MS_PER_MINUTE: u64 = 60_000;
const MS_PER_SECOND: u64 = 1_000;

/// Render milliseconds as `"{d}d {h}h {m}m {s}s"`.
///
/// Units run from the first non-zero one to the last non-zero one, so zero
/// units in between are kept (`"1h 0m 5s"`) while leading and trailing zero
/// units are dropped (`"1h 30m"`). Anything under one second, and any
/// negative input, renders as `"0s"`.
pub fn format_duration(milliseconds: i64) -> String {
    let ms = milliseconds.max(0) as u64;

    let days = ms / MS_PER_DAY;
    let rem = ms % MS_PER_DAY;
    let hours = rem / MS_PER_HOUR;
    let rem = rem % MS_PER_HOUR;
    let minutes = rem / MS_PER_MINUTE;
    let rem = rem % MS_PER_MINUTE;
    let seconds = rem / MS_PER_SECOND;

    let units = [(days, 'd'), (hours, 'h'), (minutes, 'm'), (seconds, 's')];

    let first = units.iter().position(|(value, _)| *value > 0);
    let last = units.iter().rposition(|(value, _)| *value > 0);

    match (first, last) {
        (Some(first), Some(last)) => units[first..=last]
            .iter()
            .map(|(value, suffix)| format!("{value}{suffix}"))
            .collect::<Vec<_>>()
            .join(" "),
        _ => "0s".to_string(),
    }
}

/// Same as [`format_duration`] for an unsigned value
pub fn format_elapsed(milliseconds: u64) -> String {
    format_duration(i64::try_from(milliseconds).unwrap_or(i64::MAX))
}

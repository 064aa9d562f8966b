//! Elapsed-time classes used by dashboard filters

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

const MS_PER_HOUR: u64 = 3_600_000;

/// Dashboard class of an incident's live elapsed time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum ElapsedBucket {
    #[strum(to_string = "< 4 hours")]
    Under4h,
    #[strum(to_string = "< 8 hours")]
    Under8h,
    #[strum(to_string = "< 12 hours")]
    Under12h,
    #[strum(to_string = "< 24 hours")]
    Under24h,
    #[strum(to_string = ">= 24 hours")]
    Over24h,
}

impl ElapsedBucket {
    /// Exclusive upper bound in hours, `None` for the open-ended bucket
    pub fn max_hours(&self) -> Option<u64> {
        match self {
            ElapsedBucket::Under4h => Some(4),
            ElapsedBucket::Under8h => Some(8),
            ElapsedBucket::Under12h => Some(12),
            ElapsedBucket::Under24h => Some(24),
            ElapsedBucket::Over24h => None,
        }
    }

    /// Smallest bucket the elapsed time fits in
    pub fn classify(elapsed_ms: u64) -> Self {
        Self::iter()
            .find(|bucket| bucket.contains(elapsed_ms))
            .unwrap_or(ElapsedBucket::Over24h)
    }

    /// Whether the elapsed time is below this bucket's bound.
    ///
    /// Buckets are cumulative, so anything under 4 hours is also "< 8 hours".
    pub fn contains(&self, elapsed_ms: u64) -> bool {
        match self.max_hours() {
            Some(hours) => elapsed_ms < hours * MS_PER_HOUR,
            None => elapsed_ms >= 24 * MS_PER_HOUR,
        }
    }

    /// Bucket for a "< N hours" filter value
    pub fn from_max_hours(hours: u64) -> Option<Self> {
        Self::iter().find(|bucket| bucket.max_hours() == Some(hours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(ElapsedBucket::classify(0), ElapsedBucket::Under4h);
        assert_eq!(ElapsedBucket::classify(4 * MS_PER_HOUR - 1), ElapsedBucket::Under4h);
        assert_eq!(ElapsedBucket::classify(4 * MS_PER_HOUR), ElapsedBucket::Under8h);
        assert_eq!(ElapsedBucket::classify(11 * MS_PER_HOUR), ElapsedBucket::Under12h);
        assert_eq!(ElapsedBucket::classify(23 * MS_PER_HOUR), ElapsedBucket::Under24h);
        assert_eq!(ElapsedBucket::classify(24 * MS_PER_HOUR), ElapsedBucket::Over24h);
    }

    #[test]
    fn test_buckets_are_cumulative() {
        let two_hours = 2 * MS_PER_HOUR;
        assert!(ElapsedBucket::Under4h.contains(two_hours));
        assert!(ElapsedBucket::Under24h.contains(two_hours));
        assert!(!ElapsedBucket::Over24h.contains(two_hours));
    }

    #[test]
    fn test_from_max_hours() {
        assert_eq!(ElapsedBucket::from_max_hours(12), Some(ElapsedBucket::Under12h));
        assert_eq!(ElapsedBucket::from_max_hours(5), None);
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(ElapsedBucket::Under8h.to_string(), "< 8 hours");
    }
}

//! Append-only history count snapshots and their time-windowed views.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Total classification count observed right after one mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryStatSnapshot {
    #[serde(rename = "_id")]
    pub id: i64,
    #[serde(rename = "totalHistories")]
    pub total_histories: i64,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Look-back window for the stat endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatRange {
    Day,
    Week,
    Month,
    Year,
}

impl StatRange {
    /// Unknown or missing values fall back to `Day`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("week") => StatRange::Week,
            Some("month") => StatRange::Month,
            Some("year") => StatRange::Year,
            _ => StatRange::Day,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatRange::Day => "day",
            StatRange::Week => "week",
            StatRange::Month => "month",
            StatRange::Year => "year",
        }
    }

    pub fn span(&self) -> Duration {
        match self {
            StatRange::Day => Duration::days(1),
            StatRange::Week => Duration::days(7),
            StatRange::Month => Duration::days(30),
            StatRange::Year => Duration::days(365),
        }
    }

    pub fn bucket_width(&self) -> Duration {
        match self {
            StatRange::Day => Duration::hours(1),
            StatRange::Week => Duration::hours(6),
            StatRange::Month => Duration::days(1),
            StatRange::Year => Duration::days(7),
        }
    }

    /// `[end - span, end]`, anchored at the latest snapshot rather than now.
    pub fn window(&self, end: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (end - self.span(), end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatBucket {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Last total observed inside the bucket.
    #[serde(rename = "totalHistories")]
    pub total_histories: i64,
    pub snapshots: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatSeries {
    pub range: StatRange,
    #[serde(rename = "totalHistories")]
    pub total_histories: i64,
    pub data: Vec<HistoryStatSnapshot>,
    pub buckets: Vec<StatBucket>,
}

impl StatSeries {
    pub fn empty(range: StatRange) -> Self {
        Self {
            range,
            total_histories: 0,
            data: Vec::new(),
            buckets: Vec::new(),
        }
    }
}

/// Groups snapshots (sorted by `created_at` ascending) into fixed-width
/// buckets starting at `start`. Buckets with no snapshot are omitted.
pub fn bucketize(
    snapshots: &[HistoryStatSnapshot],
    start: DateTime<Utc>,
    range: StatRange,
) -> Vec<StatBucket> {
    let width = range.bucket_width();
    let width_ms = width.num_milliseconds().max(1);
    let mut buckets: Vec<(i64, StatBucket)> = Vec::new();

    for snapshot in snapshots {
        let offset = (snapshot.created_at - start).num_milliseconds().max(0);
        let index = offset / width_ms;
        match buckets.last_mut() {
            Some((last, bucket)) if *last == index => {
                bucket.total_histories = snapshot.total_histories;
                bucket.snapshots += 1;
            }
            _ => {
                let bucket_start = start + Duration::milliseconds(index * width_ms);
                buckets.push((
                    index,
                    StatBucket {
                        start: bucket_start,
                        end: bucket_start + width,
                        total_histories: snapshot.total_histories,
                        snapshots: 1,
                    },
                ));
            }
        }
    }

    buckets.into_iter().map(|(_, bucket)| bucket).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snap(id: i64, total: i64, at: DateTime<Utc>) -> HistoryStatSnapshot {
        HistoryStatSnapshot {
            id,
            total_histories: total,
            updated_at: at,
            created_at: at,
        }
    }

    #[test]
    fn unknown_range_defaults_to_day() {
        assert_eq!(StatRange::parse(None), StatRange::Day);
        assert_eq!(StatRange::parse(Some("decade")), StatRange::Day);
        assert_eq!(StatRange::parse(Some("week")), StatRange::Week);
    }

    #[test]
    fn window_is_anchored_at_end() {
        let end = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let (start, stop) = StatRange::Week.window(end);
        assert_eq!(stop, end);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 3, 12, 0, 0).unwrap());
    }

    #[test]
    fn snapshots_group_into_hour_buckets() {
        let start = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let snapshots = vec![
            snap(1, 3, start + Duration::minutes(5)),
            snap(2, 4, start + Duration::minutes(50)),
            snap(3, 3, start + Duration::minutes(130)),
        ];

        let buckets = bucketize(&snapshots, start, StatRange::Day);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].total_histories, 4);
        assert_eq!(buckets[0].snapshots, 2);
        assert_eq!(buckets[1].start, start + Duration::hours(2));
        assert_eq!(buckets[1].end, start + Duration::hours(3));
        assert_eq!(buckets[1].total_histories, 3);
    }
}

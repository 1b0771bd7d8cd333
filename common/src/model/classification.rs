//! Classification history records.
//!
//! A `ClassificationRecord` is the persisted outcome of submitting one leaf
//! image to the predictor. The JSON field names follow the public history API
//! (`_id`, `userName`, `bestpredicted`, ...) so existing clients keep working.
//!
//! The capture-time helpers at the bottom of this module are shared by the
//! history listing (sort order) and the report compositor (printed dates).

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Coordinates used when the uploaded image carries no GPS tags.
pub const DEFAULT_LATITUDE: &str = "18.796143";
pub const DEFAULT_LONGITUDE: &str = "98.979263";

/// Label stored when the predictor returns no usable ranking.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// One class label with its probability in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProbability {
    #[serde(rename = "class")]
    pub label: String,
    pub probability: f64,
}

impl ClassProbability {
    pub fn new(label: impl Into<String>, probability: f64) -> Self {
        Self {
            label: label.into(),
            probability: normalize_probability(probability),
        }
    }
}

/// A candidate label from the attribute-filtered species list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassLabel {
    #[serde(rename = "class")]
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Copied from the submitter at creation time; never refreshed afterwards.
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    #[serde(rename = "allpredicted")]
    pub all_predicted: Vec<ClassProbability>,
    #[serde(rename = "allfilterpredicted")]
    pub all_filter_predicted: Vec<ClassLabel>,
    pub top5: Vec<ClassProbability>,
    #[serde(rename = "bestpredicted")]
    pub best_predicted: String,
    #[serde(rename = "bestfilterpredicted")]
    pub best_filter_predicted: String,
    #[serde(rename = "confidenceScore")]
    pub confidence_score: f64,
    pub latitude: String,
    pub longitude: String,
    /// Raw EXIF capture string as reported by the predictor, possibly empty.
    pub datetime_taken: String,
    /// Predictor processing time in milliseconds.
    pub process_time: f64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl ClassificationRecord {
    /// Capture time if the EXIF string parses, creation time otherwise.
    pub fn captured_at(&self) -> DateTime<Utc> {
        effective_capture_time(&self.datetime_taken, self.created_at)
    }
}

/// Rounds a percentage to two decimals and clamps it into `[0, 100]`.
pub fn normalize_probability(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    ((value * 100.0).round() / 100.0).clamp(0.0, 100.0)
}

/// Sorts `top5` by probability (highest first, ties keep upstream order) and
/// returns the best label and its confidence.
///
/// An empty ranking yields `("Unknown", 0.0)`.
pub fn rank_top5(top5: &mut [ClassProbability]) -> (String, f64) {
    top5.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    top5.first()
        .map(|best| (best.label.clone(), best.probability))
        .unwrap_or_else(|| (UNKNOWN_LABEL.to_string(), 0.0))
}

/// Parses a raw capture string.
///
/// Strings containing a space are read as EXIF `YYYY:MM:DD HH:MM:SS` in local
/// time. Anything else is tried as an ISO-8601 date or date-time. Returns
/// `None` for empty or unparseable input.
pub fn parse_capture_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.contains(' ') {
        let naive = NaiveDateTime::parse_from_str(raw, "%Y:%m:%d %H:%M:%S").ok()?;
        return local_to_utc(naive);
    }
    parse_iso(raw)
}

/// Capture time when `raw` parses, `created_at` otherwise.
pub fn effective_capture_time(raw: &str, created_at: DateTime<Utc>) -> DateTime<Utc> {
    parse_capture_time(raw).unwrap_or(created_at)
}

fn parse_iso(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Date-times without an offset are local, bare dates are UTC midnight.
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return local_to_utc(naive);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn exif_string_parses_as_local_time() {
        let parsed = parse_capture_time("2023:05:10 14:30:00").unwrap();
        let local = parsed.with_timezone(&Local);
        assert_eq!((local.year(), local.month(), local.day()), (2023, 5, 10));
        assert_eq!((local.hour(), local.minute(), local.second()), (14, 30, 0));
    }

    #[test]
    fn empty_capture_falls_back_to_creation() {
        assert_eq!(effective_capture_time("", created()), created());
        assert_eq!(effective_capture_time("   ", created()), created());
    }

    #[test]
    fn garbage_without_space_tries_iso_then_falls_back() {
        assert_eq!(parse_capture_time("not-a-date"), None);
        assert_eq!(effective_capture_time("not-a-date", created()), created());
    }

    #[test]
    fn malformed_exif_with_space_falls_back() {
        assert_eq!(effective_capture_time("2023-05-10 14:30:00", created()), created());
        assert_eq!(effective_capture_time("yesterday at noon", created()), created());
    }

    #[test]
    fn iso_forms_are_accepted() {
        let rfc = parse_capture_time("2023-05-10T14:30:00Z").unwrap();
        assert_eq!(rfc, Utc.with_ymd_and_hms(2023, 5, 10, 14, 30, 0).unwrap());

        let date_only = parse_capture_time("2023-05-10").unwrap();
        assert_eq!(date_only, Utc.with_ymd_and_hms(2023, 5, 10, 0, 0, 0).unwrap());

        let naive = parse_capture_time("2023-05-10T14:30:00").unwrap();
        assert_eq!(naive.with_timezone(&Local).hour(), 14);
    }

    #[test]
    fn ranking_picks_highest_probability() {
        let mut top5 = vec![
            ClassProbability::new("D. Bulbifera", 12.5),
            ClassProbability::new("D. Alata", 80.126),
            ClassProbability::new("D. Villosa", 7.0),
        ];
        let (label, confidence) = rank_top5(&mut top5);
        assert_eq!(label, "D. Alata");
        assert_eq!(confidence, 80.13);
        assert_eq!(top5[0].label, "D. Alata");
    }

    #[test]
    fn empty_ranking_is_unknown() {
        assert_eq!(rank_top5(&mut []), (UNKNOWN_LABEL.to_string(), 0.0));
    }

    #[test]
    fn probabilities_are_clamped() {
        assert_eq!(normalize_probability(104.2), 100.0);
        assert_eq!(normalize_probability(-3.0), 0.0);
        assert_eq!(normalize_probability(f64::NAN), 0.0);
        assert_eq!(normalize_probability(33.3333), 33.33);
    }
}

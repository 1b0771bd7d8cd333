//! Print layout for classification reports.
//!
//! The backend fills a `ReportDocument` from selected history records and
//! hands it to the PDF renderer. Keeping the layout as plain data lets clients
//! preview exactly what will be printed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    pub title: String,
    pub printed_at: String,
    pub pages: Vec<ReportPage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPage {
    /// 1-based.
    pub number: usize,
    pub total_pages: usize,
    pub organization_header: String,
    pub contact: ContactBlock,
    pub entries: Vec<ReportEntry>,
}

/// Requesting user's details, repeated on every page. Blank values are
/// already replaced by `-`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactBlock {
    pub name: String,
    pub position: String,
    pub department: String,
    pub organization: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    /// Running number across the whole report, starting at 1.
    pub index: usize,
    pub record_id: String,
    pub image_url: String,
    pub submitter: String,
    pub best_predicted: String,
    pub confidence_score: f64,
    pub captured_at: String,
    pub latitude: String,
    pub longitude: String,
    pub process_time: f64,
}

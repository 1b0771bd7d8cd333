//! Pure page layout for classification reports.

use chrono::{DateTime, Local, Utc};
use common::model::classification::ClassificationRecord;
use common::model::report::{ContactBlock, ReportDocument, ReportEntry, ReportPage};
use common::model::user::UserProfile;

pub const ITEMS_PER_PAGE: usize = 4;

pub const REPORT_TITLE: &str = "Yam Variety Classification Report from Leaf Images";

pub const ORGANIZATION_HEADER: &str = "Plant Genetic Conservation Project under the Royal \
     Initiative of Her Royal Highness Princess Maha Chakri Sirindhorn (RSPG)";

const DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Local display form of a timestamp.
pub fn display_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format(DISPLAY_FORMAT).to_string()
}

/// Lays out `records` (already in display order) four per page, with the
/// requesting user's contact block repeated on every page.
pub fn compose(
    records: &[ClassificationRecord],
    user: &UserProfile,
    printed_at: DateTime<Utc>,
) -> ReportDocument {
    let contact = ContactBlock {
        name: or_dash(&user.name),
        position: or_dash(&user.position),
        department: or_dash(&user.department),
        organization: or_dash(&user.organization),
        email: or_dash(&user.email),
        phone: or_dash(&user.phone_number),
    };

    let total_pages = records.len().div_ceil(ITEMS_PER_PAGE);
    let pages = records
        .chunks(ITEMS_PER_PAGE)
        .enumerate()
        .map(|(page_index, chunk)| ReportPage {
            number: page_index + 1,
            total_pages,
            organization_header: ORGANIZATION_HEADER.to_string(),
            contact: contact.clone(),
            entries: chunk
                .iter()
                .enumerate()
                .map(|(i, record)| entry(page_index * ITEMS_PER_PAGE + i + 1, record))
                .collect(),
        })
        .collect();

    ReportDocument {
        title: REPORT_TITLE.to_string(),
        printed_at: display_time(printed_at),
        pages,
    }
}

fn entry(index: usize, record: &ClassificationRecord) -> ReportEntry {
    ReportEntry {
        index,
        record_id: record.id.clone(),
        image_url: record.image_url.clone(),
        submitter: or_dash(&record.user_name),
        best_predicted: record.best_predicted.clone(),
        confidence_score: record.confidence_score,
        captured_at: display_time(record.captured_at()),
        latitude: or_dash(&record.latitude),
        longitude: or_dash(&record.longitude),
        process_time: record.process_time,
    }
}

fn or_dash(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

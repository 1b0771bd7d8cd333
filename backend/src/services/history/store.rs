//! SQL for classification records.
//!
//! Every mutation appends a history snapshot inside its own transaction, so
//! snapshot totals always match the committed record count.

use crate::database::{
    from_json_column, from_sql_time, now_millis, to_json_column, to_sql_time, total_pages,
};
use crate::error::AppError;
use crate::stats::append_snapshot;
use common::model::classification::ClassificationRecord;
use common::model::history::{HistoryPage, HISTORY_PAGE_SIZE};
use common::requests::HistoryQuery;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};

const RECORD_COLUMNS: &str = "id, user_id, user_name, image_url, all_predicted, \
     all_filter_predicted, top5, best_predicted, best_filter_predicted, confidence_score, \
     latitude, longitude, datetime_taken, process_time, created_at, updated_at";

/// Capture-or-creation time, newest first.
const RECORD_ORDER: &str = "ORDER BY sort_time DESC, created_at DESC, id ASC";

/// Filters of the paginated history listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    /// Case-insensitive substring of the submitter name.
    pub name: Option<String>,
    /// Accepted best-predicted labels; `None` accepts every label.
    pub species: Option<Vec<String>>,
}

impl HistoryFilter {
    pub fn from_query(query: &HistoryQuery) -> Self {
        let name = query
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        let species = query
            .species
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|label| !label.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|labels| !labels.is_empty());

        Self { name, species }
    }

    fn where_clause(&self) -> (String, Vec<SqlValue>) {
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        if let Some(name) = &self.name {
            values.push(SqlValue::Text(name.clone()));
            conditions.push(format!("instr(fold(user_name), fold(?{})) > 0", values.len()));
        }
        if let Some(labels) = &self.species {
            let mut placeholders = Vec::with_capacity(labels.len());
            for label in labels {
                values.push(SqlValue::Text(label.clone()));
                placeholders.push(format!("?{}", values.len()));
            }
            conditions.push(format!("best_predicted IN ({})", placeholders.join(", ")));
        }

        if conditions.is_empty() {
            (String::new(), values)
        } else {
            (format!("WHERE {}", conditions.join(" AND ")), values)
        }
    }
}

/// Inserts `record` and appends a snapshot in one transaction. Returns the
/// new total.
pub fn insert_with_snapshot(
    conn: &mut Connection,
    record: &ClassificationRecord,
) -> Result<i64, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute(
        &format!(
            "INSERT INTO classifications ({RECORD_COLUMNS}, sort_time) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
        ),
        params![
            record.id,
            record.user_id,
            record.user_name,
            record.image_url,
            to_json_column(&record.all_predicted)?,
            to_json_column(&record.all_filter_predicted)?,
            to_json_column(&record.top5)?,
            record.best_predicted,
            record.best_filter_predicted,
            record.confidence_score,
            record.latitude,
            record.longitude,
            record.datetime_taken,
            record.process_time,
            to_sql_time(record.created_at),
            to_sql_time(record.updated_at),
            to_sql_time(record.captured_at()),
        ],
    )?;
    let total = append_snapshot(&tx, now_millis())?;
    tx.commit()?;
    Ok(total)
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<ClassificationRecord>, AppError> {
    let record = conn
        .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM classifications WHERE id = ?1"),
            [id],
            map_record,
        )
        .optional()?;
    Ok(record)
}

pub fn find_by_ids(conn: &Connection, ids: &[String]) -> Result<Vec<ClassificationRecord>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM classifications WHERE id IN ({}) {RECORD_ORDER}",
        placeholders.join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(ids.iter()), map_record)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn find_by_user(conn: &Connection, user_id: &str) -> Result<Vec<ClassificationRecord>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM classifications WHERE user_id = ?1 {RECORD_ORDER}"
    ))?;
    let rows = stmt.query_map([user_id], map_record)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn find_all(conn: &Connection) -> Result<Vec<ClassificationRecord>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM classifications {RECORD_ORDER}"
    ))?;
    let rows = stmt.query_map([], map_record)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// One page of the filtered listing. `page` is 1-based.
pub fn list_page(
    conn: &Connection,
    filter: &HistoryFilter,
    page: i64,
) -> Result<HistoryPage, AppError> {
    let page = page.max(1);
    let limit = HISTORY_PAGE_SIZE;
    let (where_sql, mut values) = filter.where_clause();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM classifications {where_sql}"),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    values.push(SqlValue::Integer(limit));
    let limit_param = values.len();
    values.push(SqlValue::Integer((page - 1).saturating_mul(limit)));
    let offset_param = values.len();

    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM classifications {where_sql} {RECORD_ORDER} \
         LIMIT ?{limit_param} OFFSET ?{offset_param}"
    ))?;
    let histories = stmt
        .query_map(params_from_iter(values.iter()), map_record)?
        .collect::<Result<Vec<_>, _>>()?;

    if histories.is_empty() {
        return Ok(HistoryPage {
            total_histories: 0,
            total_pages: 1,
            page,
            limit,
            histories,
            message: Some("No history found".to_string()),
        });
    }

    Ok(HistoryPage {
        total_histories: total,
        total_pages: total_pages(total, limit),
        page,
        limit,
        histories,
        message: None,
    })
}

/// Overwrites the non-empty coordinates and appends a snapshot. `None` when
/// the record does not exist.
pub fn update_geolocation(
    conn: &mut Connection,
    id: &str,
    latitude: Option<&str>,
    longitude: Option<&str>,
) -> Result<Option<ClassificationRecord>, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let Some(mut record) = find_by_id(&tx, id)? else {
        return Ok(None);
    };

    if let Some(lat) = latitude.map(str::trim).filter(|v| !v.is_empty()) {
        record.latitude = lat.to_string();
    }
    if let Some(lon) = longitude.map(str::trim).filter(|v| !v.is_empty()) {
        record.longitude = lon.to_string();
    }
    let now = now_millis();
    record.updated_at = now;

    tx.execute(
        "UPDATE classifications SET latitude = ?1, longitude = ?2, updated_at = ?3 WHERE id = ?4",
        params![record.latitude, record.longitude, to_sql_time(now), id],
    )?;
    append_snapshot(&tx, now)?;
    tx.commit()?;
    Ok(Some(record))
}

/// Deletes one record and appends a snapshot. Returns the deleted record.
pub fn delete_by_id(
    conn: &mut Connection,
    id: &str,
) -> Result<Option<ClassificationRecord>, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let Some(record) = find_by_id(&tx, id)? else {
        return Ok(None);
    };
    tx.execute("DELETE FROM classifications WHERE id = ?1", [id])?;
    append_snapshot(&tx, now_millis())?;
    tx.commit()?;
    Ok(Some(record))
}

/// Deletes every record of `user_id` and appends one snapshot. Returns the
/// image names of the deleted records; empty when the user had none.
pub fn delete_by_user(conn: &mut Connection, user_id: &str) -> Result<Vec<String>, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let images = {
        let mut stmt = tx.prepare("SELECT image_url FROM classifications WHERE user_id = ?1")?;
        let rows = stmt.query_map([user_id], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>()?
    };
    if images.is_empty() {
        return Ok(images);
    }
    tx.execute("DELETE FROM classifications WHERE user_id = ?1", [user_id])?;
    append_snapshot(&tx, now_millis())?;
    tx.commit()?;
    Ok(images)
}

fn map_record(row: &Row<'_>) -> Result<ClassificationRecord, rusqlite::Error> {
    let all_predicted: String = row.get(4)?;
    let all_filter_predicted: String = row.get(5)?;
    let top5: String = row.get(6)?;
    let created_at: String = row.get(14)?;
    let updated_at: String = row.get(15)?;

    Ok(ClassificationRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        user_name: row.get(2)?,
        image_url: row.get(3)?,
        all_predicted: from_json_column(4, &all_predicted)?,
        all_filter_predicted: from_json_column(5, &all_filter_predicted)?,
        top5: from_json_column(6, &top5)?,
        best_predicted: row.get(7)?,
        best_filter_predicted: row.get(8)?,
        confidence_score: row.get(9)?,
        latitude: row.get(10)?,
        longitude: row.get(11)?,
        datetime_taken: row.get(12)?,
        process_time: row.get(13)?,
        created_at: from_sql_time(14, &created_at)?,
        updated_at: from_sql_time(15, &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn species_all_means_unfiltered() {
        let query = HistoryQuery {
            species: Some("All".into()),
            ..Default::default()
        };
        assert_eq!(HistoryFilter::from_query(&query), HistoryFilter::default());
    }

    #[test]
    fn species_list_is_split_and_trimmed() {
        let query = HistoryQuery {
            name: Some("  som ".into()),
            species: Some("D. Alata, D. Esculenta,".into()),
            page: None,
        };
        let filter = HistoryFilter::from_query(&query);
        assert_eq!(filter.name.as_deref(), Some("som"));
        assert_eq!(
            filter.species,
            Some(vec!["D. Alata".to_string(), "D. Esculenta".to_string()])
        );

        let (sql, values) = filter.where_clause();
        assert_eq!(
            sql,
            "WHERE instr(fold(user_name), fold(?1)) > 0 AND best_predicted IN (?2, ?3)"
        );
        assert_eq!(values.len(), 3);
    }
}

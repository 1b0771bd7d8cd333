//! Append-only history count snapshots.
//!
//! Writers call [`append_snapshot`] on the same connection (and transaction)
//! as the mutation, so each stored total matches the committed row count.

use crate::database::{from_sql_time, to_sql_time};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use common::model::stats::{bucketize, HistoryStatSnapshot, StatRange, StatSeries};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub fn append_snapshot(conn: &Connection, at: DateTime<Utc>) -> Result<i64, AppError> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM classifications", [], |row| {
        row.get(0)
    })?;
    let stamp = to_sql_time(at);
    conn.execute(
        "INSERT INTO history_stats (total_histories, updated_at, created_at) VALUES (?1, ?2, ?2)",
        params![total, stamp],
    )?;
    log::debug!("History snapshot appended: {total} records");
    Ok(total)
}

pub fn latest_snapshot(conn: &Connection) -> Result<Option<HistoryStatSnapshot>, AppError> {
    let snapshot = conn
        .query_row(
            "SELECT id, total_histories, updated_at, created_at FROM history_stats \
             ORDER BY created_at DESC, id DESC LIMIT 1",
            [],
            map_snapshot,
        )
        .optional()?;
    Ok(snapshot)
}

/// Snapshots with `created_at` in `[start, end]`, oldest first.
pub fn snapshots_between(
    conn: &Connection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<HistoryStatSnapshot>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, total_histories, updated_at, created_at FROM history_stats \
         WHERE created_at >= ?1 AND created_at <= ?2 ORDER BY created_at ASC, id ASC",
    )?;
    let rows = stmt.query_map(params![to_sql_time(start), to_sql_time(end)], map_snapshot)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Snapshot series for `range`, anchored at the most recent snapshot.
pub fn stat_series(conn: &Connection, range: StatRange) -> Result<StatSeries, AppError> {
    let Some(latest) = latest_snapshot(conn)? else {
        return Ok(StatSeries::empty(range));
    };

    let (start, end) = range.window(latest.created_at);
    let data = snapshots_between(conn, start, end)?;
    let buckets = bucketize(&data, start, range);

    Ok(StatSeries {
        range,
        total_histories: latest.total_histories,
        data,
        buckets,
    })
}

fn map_snapshot(row: &Row<'_>) -> Result<HistoryStatSnapshot, rusqlite::Error> {
    let updated_at: String = row.get(2)?;
    let created_at: String = row.get(3)?;
    Ok(HistoryStatSnapshot {
        id: row.get(0)?,
        total_histories: row.get(1)?,
        updated_at: from_sql_time(2, &updated_at)?,
        created_at: from_sql_time(3, &created_at)?,
    })
}

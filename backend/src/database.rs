//! SQLite access.
//!
//! Every operation opens its own connection on the blocking pool, so handlers
//! never hold a connection across an `.await`. SQLite serializes writers; the
//! busy timeout lets concurrent batch items queue up instead of failing.

use crate::error::AppError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS classifications (
    id                    TEXT PRIMARY KEY,
    user_id               TEXT NOT NULL,
    user_name             TEXT NOT NULL,
    image_url             TEXT NOT NULL,
    all_predicted         TEXT NOT NULL,
    all_filter_predicted  TEXT NOT NULL,
    top5                  TEXT NOT NULL,
    best_predicted        TEXT NOT NULL,
    best_filter_predicted TEXT NOT NULL,
    confidence_score      REAL NOT NULL,
    latitude              TEXT NOT NULL,
    longitude             TEXT NOT NULL,
    datetime_taken        TEXT NOT NULL,
    process_time          REAL NOT NULL,
    sort_time             TEXT NOT NULL,
    created_at            TEXT NOT NULL,
    updated_at            TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_classifications_user ON classifications (user_id);
CREATE INDEX IF NOT EXISTS idx_classifications_sort ON classifications (sort_time DESC);

CREATE TABLE IF NOT EXISTS history_stats (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    total_histories INTEGER NOT NULL,
    updated_at      TEXT NOT NULL,
    created_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_history_stats_created ON history_stats (created_at);

CREATE TABLE IF NOT EXISTS species (
    id                TEXT PRIMARY KEY,
    image_url         TEXT NOT NULL,
    common_name       TEXT NOT NULL,
    local_name        TEXT NOT NULL,
    scientific_name   TEXT NOT NULL UNIQUE,
    family_name       TEXT NOT NULL,
    description       TEXT NOT NULL,
    propagation       TEXT NOT NULL DEFAULT '',
    planting_season   TEXT NOT NULL DEFAULT '',
    harvesting_season TEXT NOT NULL DEFAULT '',
    utilization       TEXT NOT NULL DEFAULT '',
    status            TEXT NOT NULL DEFAULT '',
    survey_site       TEXT NOT NULL DEFAULT '',
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL UNIQUE,
    role          TEXT NOT NULL DEFAULT 'USER',
    position      TEXT NOT NULL DEFAULT '',
    department    TEXT NOT NULL DEFAULT '',
    organization  TEXT NOT NULL DEFAULT '',
    work_address  TEXT NOT NULL DEFAULT '',
    phone_number  TEXT NOT NULL DEFAULT '',
    profile_pic   TEXT NOT NULL DEFAULT '',
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);
"#;

/// Handle to the database file. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Database {
    path: Arc<PathBuf>,
}

impl Database {
    /// Creates the schema if needed and returns a handle.
    pub fn init(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let db = Self {
            path: Arc::new(path.as_ref().to_path_buf()),
        };
        let conn = db.open()?;
        conn.execute_batch(SCHEMA)?;
        log::info!("Database ready at {}", db.path.display());
        Ok(db)
    }

    pub fn open(&self) -> Result<Connection, AppError> {
        let conn = Connection::open(self.path.as_ref())?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        register_fold(&conn)?;
        Ok(conn)
    }

    /// Runs `f` with a fresh connection on the blocking thread pool.
    pub async fn run<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Connection) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = db.open()?;
            f(&mut conn)
        })
        .await?
    }
}

/// `fold(text)`: Unicode lowercase. SQLite's own `lower()` only folds ASCII,
/// so name filters compare `fold(column)` against `fold(?)`.
fn register_fold(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "fold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<String>(0)?.to_lowercase()),
    )
}

/// Fixed-width UTC text (`2024-03-10T12:00:00.000Z`) so timestamps compare
/// correctly as strings.
pub fn to_sql_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn from_sql_time(column: usize, raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

/// Current time truncated to the stored millisecond precision.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Reads a JSON-encoded column.
pub fn from_json_column<T: serde::de::DeserializeOwned>(
    column: usize,
    raw: &str,
) -> Result<T, rusqlite::Error> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

pub fn to_json_column<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(|e| AppError::Internal(e.to_string()))
}

/// True when `err` is a UNIQUE constraint violation.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// `ceil(total / limit)`, never less than one.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 1;
    }
    ((total + limit - 1) / limit).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sql_time_is_fixed_width_and_round_trips() {
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let text = to_sql_time(at);
        assert_eq!(text, "2024-03-10T12:00:00.000Z");
        assert_eq!(from_sql_time(0, &text).unwrap(), at);
    }

    #[test]
    fn pages_round_up() {
        assert_eq!(total_pages(0, 8), 1);
        assert_eq!(total_pages(8, 8), 1);
        assert_eq!(total_pages(20, 8), 3);
    }

    #[test]
    fn duplicate_keys_are_detected() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::init(dir.path().join("t.sqlite")).unwrap();
        let conn = db.open().unwrap();
        let insert = "INSERT INTO users (id, name, email, created_at, updated_at) \
                      VALUES (?1, 'a', 'a@x', 't', 't')";
        conn.execute(insert, ["1"]).unwrap();
        let err = conn.execute(insert, ["2"]).unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn fold_lowercases_beyond_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::init(dir.path().join("t.sqlite")).unwrap();
        let conn = db.open().unwrap();
        let folded: String = conn
            .query_row("SELECT fold('ÉLODIE Ñame')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(folded, "élodie ñame");
        let found: i64 = conn
            .query_row("SELECT instr(fold('ÉLODIE Durand'), fold(?1)) > 0", ["élodie"], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(found, 1);
    }
}

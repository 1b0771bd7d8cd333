//! # History Service Module
//!
//! Read, edit and delete stored classification records, plus the count
//! statistics derived from history snapshots.
//!
//! ## Sub-modules:
//! - `store`: SQL for records, shared with the upload and report services.
//! - `list`, `data`, `by_user`, `selected`: the read endpoints.
//! - `update`, `remove`: the mutating endpoints; each appends a snapshot.
//! - `stat`: windowed snapshot series.

mod by_user;
mod data;
mod list;
mod remove;
pub mod selected;
mod stat;
pub mod store;
mod update;

use actix_web::web::{delete, get, put, scope};
use actix_web::Scope;

const API_PATH: &str = "/history";

/// Registered routes:
///
/// * `GET /get-history?name&species&page`: paginated listing, 8 per page.
/// * `GET /data-history`: every record.
/// * `GET /get-history/{userId}`: all records of one user.
/// * `GET /history-selected?dataId=..`: records by id.
/// * `PUT /update-history/{id}`: edit latitude/longitude.
/// * `DELETE /delete-history/{id}`: delete one record and its image.
/// * `DELETE /delete-all-history/{userId}`: delete a user's records.
/// * `GET /stat?range=`: snapshot series for a day, week, month or year.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/get-history", get().to(list::process))
        .route("/data-history", get().to(data::process))
        .route("/get-history/{user_id}", get().to(by_user::process))
        .route("/history-selected", get().to(selected::process))
        .route("/update-history/{id}", put().to(update::process))
        .route("/delete-history/{id}", delete().to(remove::process_one))
        .route("/delete-all-history/{user_id}", delete().to(remove::process_all))
        .route("/stat", get().to(stat::process))
}

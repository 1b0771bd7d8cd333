//! HTTP backend for yam-leaf classification.
//!
//! Images are classified by an external prediction service, the outcome is
//! stored in SQLite together with a running count of records, and selected
//! records can be printed as a PDF report.

pub mod config;
pub mod database;
pub mod error;
pub mod handoff;
pub mod multipart;
pub mod predictor;
pub mod services;
pub mod state;
pub mod stats;
pub mod uploads;

use crate::error::AppError;
use actix_files::Files;
use actix_web::web::{self, scope, ServiceConfig};
use std::path::Path;

pub const API_ROOT: &str = "/api/v1";

/// Registers every API scope plus the static `/uploads` directory.
pub fn configure(cfg: &mut ServiceConfig, uploads_root: &Path) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(10 * 1024 * 1024)
            .error_handler(|err, _| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| AppError::Validation(err.to_string()).into()),
    )
    .service(
        scope(API_ROOT)
            .configure(services::upload::configure_routes)
            .service(services::history::configure_routes())
            .service(services::species::configure_routes())
            .service(services::users::configure_routes())
            .service(services::queue::configure_routes())
            .service(services::report::configure_routes()),
    )
    .service(Files::new("/uploads", uploads_root));
}

//! Shared application state injected into every handler as `web::Data`.

use crate::config::Config;
use crate::database::Database;
use crate::error::AppError;
use crate::handoff::HandoffStore;
use crate::predictor::Predictor;
use crate::services::queue::PendingQueue;
use crate::uploads::UploadDir;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub uploads: UploadDir,
    pub predictor: Arc<dyn Predictor>,
    /// Staged images waiting for per-item submission.
    pub queue: HandoffStore<PendingQueue>,
    /// Record ids picked for a report, keyed by handoff token.
    pub selections: HandoffStore<Vec<String>>,
    pub font_dir: PathBuf,
}

impl AppState {
    pub fn new(config: &Config, predictor: Arc<dyn Predictor>) -> Result<Self, AppError> {
        Ok(Self {
            db: Database::init(&config.database_path)?,
            uploads: UploadDir::new(&config.upload_dir, config.max_upload_bytes)?,
            predictor,
            queue: HandoffStore::new(config.handoff_ttl),
            selections: HandoffStore::new(config.handoff_ttl),
            font_dir: config.font_dir.clone(),
        })
    }
}

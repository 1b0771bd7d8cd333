use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::{error, info};
use std::sync::Arc;
use yamleaf_backend::config::Config;
use yamleaf_backend::handoff::start_sweeper;
use yamleaf_backend::predictor::HttpPredictor;
use yamleaf_backend::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::load().map_err(|e| {
        error!("{}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let predictor = HttpPredictor::new(&config.ml_url, config.predictor_timeout)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let state = AppState::new(&config, Arc::new(predictor))
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    // Expire idle queue sessions and report selections
    tokio::spawn(start_sweeper("queue", state.queue.clone(), config.sweep_interval));
    tokio::spawn(start_sweeper(
        "report selection",
        state.selections.clone(),
        config.sweep_interval,
    ));

    let uploads_root = state.uploads.root().to_path_buf();
    let data = web::Data::new(state);

    info!(
        "Server running at http://{}:{} (predictor {})",
        config.host, config.port, config.ml_url
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(data.clone())
            .configure(|cfg| yamleaf_backend::configure(cfg, &uploads_root))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

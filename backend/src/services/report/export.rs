use super::pdf;
use super::preview::build_document;
use crate::error::AppError;
use crate::state::AppState;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use common::requests::ReportQuery;

pub async fn process(
    token: web::Path<String>,
    query: web::Query<ReportQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let document = build_document(&state, &token, &query.user_id).await?;

    let uploads = state.uploads.clone();
    let font_dir = state.font_dir.clone();
    let bytes = web::block(move || pdf::render(&document, &uploads, &font_dir))
        .await
        .map_err(|e| AppError::Render(e.to_string()))??;

    let file_name = format!("yam-report-{}.pdf", Utc::now().format("%Y%m%d-%H%M%S"));
    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Inline,
            parameters: vec![DispositionParam::Filename(file_name)],
        })
        .body(bytes))
}

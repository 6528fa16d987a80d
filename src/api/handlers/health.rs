// src/api/handlers/health.rs
use actix_web::{HttpResponse, Result, web};
use serde_json::json;

use crate::api::AppState;
use crate::models::Language;

pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "codeforge",
        "judge": state.judge.name(),
        "version": env!("CARGO_PKG_VERSION")
    })))
}

pub async fn list_languages() -> Result<HttpResponse> {
    let languages: Vec<_> = Language::ALL
        .iter()
        .map(|l| json!({ "value": l.as_str(), "judge0_id": l.judge0_id() }))
        .collect();
    Ok(HttpResponse::Ok().json(json!({ "languages": languages })))
}

// src/api/handlers/submissions.rs
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};

use super::authenticate;
use crate::api::AppState;
use crate::errors::{ForgeError, Result};
use crate::identity::Role;
use crate::models::{Language, SubmissionRecord};

#[derive(Deserialize)]
pub struct SaveRequest {
    pub problem_id: String,
    pub language: String,
    pub source_code: String,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub problem_id: Option<String>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub results: Vec<SubmissionRecord>,
}

/// POST /api/v1/submissions - save code without running it
pub async fn save_submission(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<SaveRequest>,
) -> Result<HttpResponse> {
    let identity = authenticate(&state, &req).await?;
    identity.require(Role::Coder)?;

    let language: Language = body.language.parse()?;
    if body.source_code.trim().is_empty() {
        return Err(ForgeError::Validation("There is no code to save.".to_string()));
    }
    let record = SubmissionRecord::saved(
        &identity.user_id,
        &body.problem_id,
        language,
        &body.source_code,
    );
    state.store.save_submission(&record).await?;
    Ok(HttpResponse::Created().json(record))
}

/// GET /api/v1/submissions - the caller's submissions, newest first
pub async fn list_submissions(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse> {
    let identity = authenticate(&state, &req).await?;
    let results = state
        .store
        .submissions_for(&identity.user_id, query.problem_id.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(HistoryResponse { results }))
}

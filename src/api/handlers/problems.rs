// src/api/handlers/problems.rs
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;

use super::authenticate;
use crate::api::AppState;
use crate::errors::Result;
use crate::models::ProblemCase;

#[derive(Serialize)]
pub struct CasesResponse {
    pub problem_id: String,
    pub cases: Vec<ProblemCase>,
}

/// GET /api/v1/problems/{id}/cases - visible cases of a problem
pub async fn list_cases(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    authenticate(&state, &req).await?;
    let problem_id = path.into_inner();
    let cases = state.store.test_cases(&problem_id, false).await?;
    Ok(HttpResponse::Ok().json(CasesResponse { problem_id, cases }))
}

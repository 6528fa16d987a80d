// src/api/handlers/runs.rs
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};

use super::{WsBroker, authenticate, ws::RunUpdate};
use crate::api::AppState;
use crate::errors::{ForgeError, Result};
use crate::identity::Role;
use crate::models::{Language, RunResult, SubmissionRequest};
use crate::runner;

#[derive(Deserialize)]
pub struct RunRequest {
    pub problem_id: String,
    pub language: String,
    pub source_code: String,
}

#[derive(Serialize)]
pub struct RunResponse {
    pub run_id: u64,
    pub passed: usize,
    pub total: usize,
    pub result: RunResult,
}

/// POST /api/v1/runs - grade code against the problem's visible cases
pub async fn create_run(
    state: web::Data<AppState>,
    broker: web::Data<WsBroker>,
    req: HttpRequest,
    body: web::Json<RunRequest>,
) -> Result<HttpResponse> {
    let identity = authenticate(&state, &req).await?;
    identity.require(Role::Coder)?;

    let body = body.into_inner();
    let language: Language = body.language.parse()?;
    let test_cases = state.store.test_cases(&body.problem_id, false).await?;
    let request = SubmissionRequest {
        source_code: body.source_code,
        language,
        test_cases,
    };
    runner::validate(&request)?;

    let tracker = state.runs.tracker_for(&identity.user_id);
    let handle = tracker.begin();
    log::info!(
        "User {} started run {} on problem {}",
        identity.user_id,
        handle.id(),
        body.problem_id
    );

    let result = runner::run_and_record(
        state.judge.as_ref(),
        &state.config.poll,
        state.store.as_ref(),
        &identity.user_id,
        &body.problem_id,
        &request,
        &handle,
    )
    .await?;

    let result = tracker
        .accept(&handle, result)
        .ok_or(ForgeError::Superseded { run_id: handle.id() })?;

    let passed = result.passed_count();
    let total = result.verdicts.len();
    broker
        .broadcast(RunUpdate {
            run_id: handle.id(),
            user_id: identity.user_id,
            problem_id: body.problem_id,
            all_passed: result.all_passed,
            score: result.score,
            passed,
            total,
        })
        .await;

    Ok(HttpResponse::Ok().json(RunResponse {
        run_id: handle.id(),
        passed,
        total,
        result,
    }))
}

/// DELETE /api/v1/runs/current - abandon the caller's in-flight run
pub async fn cancel_run(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let identity = authenticate(&state, &req).await?;
    state.runs.tracker_for(&identity.user_id).cancel();
    Ok(HttpResponse::NoContent().finish())
}

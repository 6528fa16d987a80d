// src/api/handlers/mod.rs
mod health;
mod problems;
mod runs;
mod sessions;
mod submissions;
pub mod ws;

use actix_web::HttpRequest;
use actix_web::http::header::AUTHORIZATION;

use crate::api::AppState;
use crate::errors::Result;
use crate::identity::{Identity, bearer_token};

pub use health::{health_check, list_languages};
pub use problems::list_cases;
pub use runs::{cancel_run, create_run};
pub use sessions::{end_session, send_event, start_session};
pub use submissions::{list_submissions, save_submission};
pub use ws::{WsBroker, ws_handler};

/// Resolve the caller from the `Authorization` header.
pub(crate) async fn authenticate(state: &AppState, req: &HttpRequest) -> Result<Identity> {
    let header = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let token = bearer_token(header)?;
    state.identity.resolve(token).await
}

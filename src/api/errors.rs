// src/api/errors.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;

use crate::errors::ForgeError;

impl ResponseError for ForgeError {
    fn status_code(&self) -> StatusCode {
        match self {
            ForgeError::Auth(_) => StatusCode::UNAUTHORIZED,
            ForgeError::Forbidden(_) => StatusCode::FORBIDDEN,
            ForgeError::Validation(_) => StatusCode::BAD_REQUEST,
            ForgeError::NotFound(_) => StatusCode::NOT_FOUND,
            ForgeError::Superseded { .. } => StatusCode::CONFLICT,
            ForgeError::Network(_) | ForgeError::JudgeApi { .. } | ForgeError::StoreApi { .. } => {
                StatusCode::BAD_GATEWAY
            }
            ForgeError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        } else {
            log::debug!("Request rejected: {}", self);
        }
        HttpResponse::build(status).json(json!({
            "error": self.kind(),
            "message": self.user_message(),
        }))
    }
}

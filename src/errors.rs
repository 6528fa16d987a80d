// src/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Judge request failed with status {status}: {body}")]
    JudgeApi { status: u16, body: String },

    #[error("Data store request failed with status {status}: {body}")]
    StoreApi { status: u16, body: String },

    #[error("Unexpected response structure: {0}")]
    UnexpectedResponse(String),

    #[error("Judge did not finish after {polls} polls")]
    Timeout { polls: u32 },

    #[error("Not authenticated: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Run {run_id} was superseded by a newer run")]
    Superseded { run_id: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ForgeError {
    /// Stable machine-readable code for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            ForgeError::FileRead(_) | ForgeError::TomlParse(_) | ForgeError::Config(_) => {
                "CONFIG_ERROR"
            }
            ForgeError::JsonParse(_) | ForgeError::UnexpectedResponse(_) => "BAD_RESPONSE",
            ForgeError::Network(_) | ForgeError::JudgeApi { .. } | ForgeError::StoreApi { .. } => {
                "NETWORK_ERROR"
            }
            ForgeError::Database(_) => "DATABASE_ERROR",
            ForgeError::Timeout { .. } => "TIMEOUT",
            ForgeError::Auth(_) => "AUTH_ERROR",
            ForgeError::Forbidden(_) => "FORBIDDEN",
            ForgeError::Validation(_) => "VALIDATION_ERROR",
            ForgeError::Superseded { .. } => "SUPERSEDED",
            ForgeError::NotFound(_) => "NOT_FOUND",
        }
    }

    /// Short message safe to show to a user. Never includes a raw error chain.
    pub fn user_message(&self) -> String {
        match self {
            ForgeError::Auth(_) => "Please sign in to continue.".to_string(),
            ForgeError::Forbidden(_) => "You do not have access to this page.".to_string(),
            ForgeError::Validation(msg) => msg.clone(),
            ForgeError::NotFound(what) => format!("{} not found.", what),
            ForgeError::Timeout { .. } => {
                "The judge took too long to respond. Please try again.".to_string()
            }
            ForgeError::Superseded { .. } => {
                "A newer run replaced this one.".to_string()
            }
            ForgeError::Network(_) | ForgeError::JudgeApi { .. } | ForgeError::StoreApi { .. } => {
                "Could not reach the grading service. Please try again.".to_string()
            }
            ForgeError::JsonParse(_) | ForgeError::UnexpectedResponse(_) => {
                "The grading service returned an unexpected response.".to_string()
            }
            ForgeError::Database(_) => "Could not access saved data.".to_string(),
            ForgeError::FileRead(_) | ForgeError::TomlParse(_) | ForgeError::Config(_) => {
                "The server is misconfigured.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_hides_internal_detail() {
        let err = ForgeError::JudgeApi {
            status: 500,
            body: "panic at src/worker.rs:42".to_string(),
        };
        assert_eq!(err.kind(), "NETWORK_ERROR");
        assert!(!err.user_message().contains("worker.rs"));
    }

    #[test]
    fn validation_message_is_passed_through() {
        let err = ForgeError::Validation("No test cases to grade.".to_string());
        assert_eq!(err.user_message(), "No test cases to grade.");
        assert_eq!(err.kind(), "VALIDATION_ERROR");
    }
}

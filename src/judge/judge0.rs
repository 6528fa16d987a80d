// src/judge/judge0.rs

use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::Judge0Config;
use crate::errors::{ForgeError, Result};
use crate::judge::{JudgeClient, JudgeSubmission};
use crate::models::{JudgeStatus, JudgeTicket, VerdictErrorKind};

/// Client for the Judge0 submissions API, self-hosted or through RapidAPI.
pub struct Judge0Client {
    client: Client,
    config: Judge0Config,
}

#[derive(Serialize)]
struct SubmissionBody<'a> {
    source_code: &'a str,
    language_id: u32,
    stdin: &'a str,
    expected_output: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct StatusBody {
    id: u32,
    description: String,
}

#[derive(Deserialize)]
struct SubmissionResponse {
    status: StatusBody,
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    message: Option<String>,
    time: Option<String>,
    memory: Option<u64>,
}

/// Maps a Judge0 status id onto the ticket lifecycle.
///
/// Ids below 3 are in progress. Wrong Answer (4) is reported as a plain finish:
/// pass/fail is decided by comparing output locally.
pub fn map_status(id: u32) -> (JudgeStatus, Option<VerdictErrorKind>) {
    match id {
        1 => (JudgeStatus::Pending, None),
        2 => (JudgeStatus::Running, None),
        3 | 4 => (JudgeStatus::Finished, None),
        6 => (JudgeStatus::Finished, Some(VerdictErrorKind::Compile)),
        5 | 7..=12 => (JudgeStatus::Finished, Some(VerdictErrorKind::Runtime)),
        _ => (JudgeStatus::Error, Some(VerdictErrorKind::Judge)),
    }
}

impl Judge0Client {
    pub fn new(client: Client, config: Judge0Config) -> Self {
        Self { client, config }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.api_base.trim_end_matches('/'), path);
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("X-RapidAPI-Key", key);
        }
        if let Some(host) = &self.config.api_host {
            builder = builder.header("X-RapidAPI-Host", host);
        }
        builder
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "Could not read error body".to_string());
    Err(ForgeError::JudgeApi {
        status: status.as_u16(),
        body,
    })
}

impl JudgeClient for Judge0Client {
    async fn submit(&self, submission: JudgeSubmission<'_>) -> Result<String> {
        let body = SubmissionBody {
            source_code: submission.source_code,
            language_id: submission.language.judge0_id(),
            stdin: submission.stdin,
            expected_output: submission.expected_output,
        };

        let start = Instant::now();
        let resp = self
            .request(Method::POST, "/submissions?base64_encoded=false&wait=false")
            .json(&body)
            .send()
            .await?;
        let resp = check(resp).await?;
        let TokenResponse { token } = resp.json().await?;

        log::debug!(
            "Judge0 accepted submission {} ({}ms)",
            token,
            start.elapsed().as_millis()
        );
        if token.is_empty() {
            return Err(ForgeError::UnexpectedResponse("empty submission token".to_string()));
        }
        Ok(token)
    }

    async fn poll(&self, token: &str) -> Result<JudgeTicket> {
        let resp = self
            .request(Method::GET, &format!("/submissions/{}?base64_encoded=false", token))
            .send()
            .await?;
        let resp = check(resp).await?;
        let body: SubmissionResponse = resp.json().await?;

        let (status, failure) = map_status(body.status.id);
        Ok(JudgeTicket {
            token: token.to_string(),
            status: Some(status),
            description: Some(body.status.description),
            failure,
            stdout: body.stdout,
            stderr: body.stderr,
            compile_output: body.compile_output,
            message: body.message,
            time: body.time,
            memory: body.memory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_progress_ids_are_not_terminal() {
        assert!(!map_status(1).0.is_terminal());
        assert!(!map_status(2).0.is_terminal());
        for id in 3..=14 {
            assert!(map_status(id).0.is_terminal(), "status {} should be terminal", id);
        }
    }

    #[test]
    fn failures_are_classified() {
        assert_eq!(map_status(3).1, None);
        assert_eq!(map_status(4).1, None);
        assert_eq!(map_status(6).1, Some(VerdictErrorKind::Compile));
        assert_eq!(map_status(11).1, Some(VerdictErrorKind::Runtime));
        assert_eq!(map_status(13), (JudgeStatus::Error, Some(VerdictErrorKind::Judge)));
    }

    #[test]
    fn poll_response_parses_with_nulls() {
        let body: SubmissionResponse = serde_json::from_str(
            r#"{"stdout":null,"time":"0.01","memory":3000,"stderr":null,"token":"abc",
                "compile_output":"main.cpp: error","message":null,
                "status":{"id":6,"description":"Compilation Error"}}"#,
        )
        .unwrap();
        assert_eq!(body.status.id, 6);
        assert_eq!(body.compile_output.as_deref(), Some("main.cpp: error"));
        assert!(body.stdout.is_none());
    }
}

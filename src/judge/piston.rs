// src/judge/piston.rs

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use crate::config::PistonConfig;
use crate::errors::{ForgeError, Result};
use crate::judge::{JudgeClient, JudgeSubmission};
use crate::models::{JudgeStatus, JudgeTicket, VerdictErrorKind};

/// Client for the Piston execute API.
///
/// Piston runs programs synchronously, so `submit` executes and parks the finished
/// ticket under a fresh token; the first `poll` hands it out.
pub struct PistonClient {
    client: Client,
    config: PistonConfig,
    finished: Mutex<HashMap<String, JudgeTicket>>,
}

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    language: &'a str,
    version: &'a str,
    files: Vec<SourceFile<'a>>,
    stdin: &'a str,
}

#[derive(Serialize)]
struct SourceFile<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct ExecuteResponse {
    run: Stage,
    compile: Option<Stage>,
}

#[derive(Deserialize)]
struct Stage {
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    #[serde(default)]
    output: String,
    code: Option<i32>,
    signal: Option<String>,
}

impl Stage {
    fn failed(&self) -> bool {
        self.signal.is_some() || self.code.is_some_and(|c| c != 0)
    }

    fn describe(&self) -> String {
        match (&self.signal, self.code) {
            (Some(signal), _) => format!("Killed by {}", signal),
            (None, Some(code)) => format!("Exited with status {}", code),
            (None, None) => "Exited".to_string(),
        }
    }
}

fn into_ticket(token: String, resp: ExecuteResponse) -> JudgeTicket {
    if let Some(compile) = resp.compile.as_ref().filter(|c| c.failed()) {
        let diagnostics = if compile.stderr.is_empty() {
            compile.output.clone()
        } else {
            compile.stderr.clone()
        };
        return JudgeTicket {
            token,
            status: Some(JudgeStatus::Finished),
            description: Some("Compilation Error".to_string()),
            failure: Some(VerdictErrorKind::Compile),
            compile_output: Some(diagnostics),
            message: Some(compile.describe()),
            ..Default::default()
        };
    }

    let run = resp.run;
    let failure = run.failed().then_some(VerdictErrorKind::Runtime);
    JudgeTicket {
        token,
        status: Some(JudgeStatus::Finished),
        description: Some(if failure.is_some() { "Runtime Error" } else { "Finished" }.to_string()),
        failure,
        message: failure.map(|_| run.describe()),
        stdout: Some(run.stdout),
        stderr: Some(run.stderr).filter(|s| !s.is_empty()),
        ..Default::default()
    }
}

impl PistonClient {
    pub fn new(client: Client, config: PistonConfig) -> Self {
        Self {
            client,
            config,
            finished: Mutex::new(HashMap::new()),
        }
    }

    fn tickets(&self) -> Result<MutexGuard<'_, HashMap<String, JudgeTicket>>> {
        self.finished
            .lock()
            .map_err(|_| ForgeError::UnexpectedResponse("piston ticket table poisoned".to_string()))
    }
}

impl JudgeClient for PistonClient {
    async fn submit(&self, submission: JudgeSubmission<'_>) -> Result<String> {
        let url = format!("{}/execute", self.config.api_base.trim_end_matches('/'));
        let body = ExecuteRequest {
            language: submission.language.piston_name(),
            version: "*",
            files: vec![SourceFile {
                content: submission.source_code,
            }],
            stdin: submission.stdin,
        };

        let start = Instant::now();
        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            return Err(ForgeError::JudgeApi {
                status: status.as_u16(),
                body,
            });
        }
        let executed: ExecuteResponse = resp.json().await?;
        log::debug!("Piston executed submission ({}ms)", start.elapsed().as_millis());

        let token = uuid::Uuid::new_v4().to_string();
        let ticket = into_ticket(token.clone(), executed);
        self.tickets()?.insert(token.clone(), ticket);
        Ok(token)
    }

    async fn poll(&self, token: &str) -> Result<JudgeTicket> {
        self.tickets()?
            .remove(token)
            .ok_or_else(|| ForgeError::NotFound(format!("Piston ticket {}", token)))
    }
}

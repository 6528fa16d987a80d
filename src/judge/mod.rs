// src/judge/mod.rs

use crate::config::{JudgeBackendKind, JudgeConfig};
use crate::errors::Result;
use crate::models::{JudgeTicket, Language};

pub mod judge0;
pub mod piston;

use judge0::Judge0Client;
use piston::PistonClient;

/// One program run requested from the judge.
#[derive(Debug, Clone, Copy)]
pub struct JudgeSubmission<'a> {
    pub source_code: &'a str,
    pub language: Language,
    pub stdin: &'a str,
    pub expected_output: &'a str,
}

/// A remote code-execution service.
///
/// `submit` hands the program over and returns a ticket token; `poll` reports the
/// ticket's current state. Callers keep polling until the ticket is terminal.
pub trait JudgeClient: Send + Sync {
    fn submit(
        &self,
        submission: JudgeSubmission<'_>,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    fn poll(&self, token: &str) -> impl std::future::Future<Output = Result<JudgeTicket>> + Send;
}

/// The judge selected by configuration.
pub enum JudgeBackend {
    Judge0(Judge0Client),
    Piston(PistonClient),
}

impl JudgeBackend {
    pub fn from_config(client: reqwest::Client, config: &JudgeConfig) -> Self {
        match config.backend {
            JudgeBackendKind::Judge0 => {
                JudgeBackend::Judge0(Judge0Client::new(client, config.judge0.clone()))
            }
            JudgeBackendKind::Piston => {
                JudgeBackend::Piston(PistonClient::new(client, config.piston.clone()))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            JudgeBackend::Judge0(_) => "judge0",
            JudgeBackend::Piston(_) => "piston",
        }
    }
}

impl JudgeClient for JudgeBackend {
    async fn submit(&self, submission: JudgeSubmission<'_>) -> Result<String> {
        match self {
            JudgeBackend::Judge0(judge) => judge.submit(submission).await,
            JudgeBackend::Piston(judge) => judge.submit(submission).await,
        }
    }

    async fn poll(&self, token: &str) -> Result<JudgeTicket> {
        match self {
            JudgeBackend::Judge0(judge) => judge.poll(token).await,
            JudgeBackend::Piston(judge) => judge.poll(token).await,
        }
    }
}

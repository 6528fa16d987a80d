// src/runner.rs
use crate::config::PollPolicy;
use crate::errors::{ForgeError, Result};
use crate::judge::{JudgeClient, JudgeSubmission};
use crate::models::{
    JudgeStatus, JudgeTicket, ProblemCase, RunResult, SubmissionRecord, SubmissionRequest,
    TestVerdict, VerdictErrorKind,
};
use crate::store::{SubmissionStore, record_best_effort};
use crate::tracker::RunHandle;
use futures::future;
use std::time::Instant;

/// Exact comparison after trimming surrounding whitespace from both sides.
pub fn outputs_match(expected: &str, actual: &str) -> bool {
    expected.trim() == actual.trim()
}

/// Reject requests that cannot be graded before anything is sent to the judge.
pub fn validate(request: &SubmissionRequest) -> Result<()> {
    if request.test_cases.is_empty() {
        return Err(ForgeError::Validation("No test cases to grade.".to_string()));
    }
    if request.source_code.trim().is_empty() {
        return Err(ForgeError::Validation("Write some code before running.".to_string()));
    }
    Ok(())
}

/// Turn a terminal ticket into the verdict for `case`.
pub fn verdict_from_ticket(case: &ProblemCase, ticket: &JudgeTicket) -> TestVerdict {
    let expected = case.expected_output.trim().to_string();
    let actual = ticket.stdout.as_deref().unwrap_or_default().trim().to_string();

    let failure = match ticket.status {
        Some(JudgeStatus::Error) => Some(VerdictErrorKind::Judge),
        _ => ticket.failure,
    };
    let error = failure.map(|_| {
        ticket
            .error_text()
            .or_else(|| ticket.description.clone())
            .unwrap_or_else(|| "Execution failed".to_string())
    });

    TestVerdict {
        case_id: case.id.clone(),
        passed: failure.is_none() && outputs_match(&expected, &actual),
        expected_output: expected,
        actual_output: actual,
        error,
        error_kind: failure,
    }
}

/// Poll `token` until it is terminal, within the bounds of `policy`.
///
/// Failed polls are retried inside the same budget. Running out of attempts is
/// always a `Timeout`, whatever the last poll returned.
pub async fn await_ticket<J: JudgeClient>(
    judge: &J,
    policy: &PollPolicy,
    token: &str,
) -> Result<JudgeTicket> {
    let mut last_error: Option<ForgeError> = None;
    for attempt in 0..policy.max_attempts {
        match judge.poll(token).await {
            Ok(ticket) if ticket.is_terminal() => return Ok(ticket),
            Ok(ticket) => {
                log::debug!(
                    "Ticket {} still {:?} after poll {}",
                    token,
                    ticket.status,
                    attempt + 1
                );
                last_error = None;
            }
            Err(e) => {
                log::warn!("Poll {} for ticket {} failed: {}", attempt + 1, token, e);
                last_error = Some(e);
            }
        }
        if attempt + 1 < policy.max_attempts {
            tokio::time::sleep(policy.delay(attempt)).await;
        }
    }
    match &last_error {
        Some(e) => log::warn!(
            "Ticket {} not finished after {} polls; last poll failed: {}",
            token,
            policy.max_attempts,
            e
        ),
        None => log::warn!(
            "Ticket {} not finished after {} polls",
            token,
            policy.max_attempts
        ),
    }
    Err(ForgeError::Timeout {
        polls: policy.max_attempts,
    })
}

/// Submit one case and wait for its verdict. Never fails: every problem becomes
/// part of the verdict.
pub async fn grade_case<J: JudgeClient>(
    judge: &J,
    policy: &PollPolicy,
    request: &SubmissionRequest,
    case: &ProblemCase,
) -> TestVerdict {
    let submission = JudgeSubmission {
        source_code: &request.source_code,
        language: request.language,
        stdin: &case.input,
        expected_output: &case.expected_output,
    };

    let token = match judge.submit(submission).await {
        Ok(token) => token,
        Err(e) => {
            log::error!("Submitting case {} failed: {}", case.id, e);
            return TestVerdict::failed(case, VerdictErrorKind::Network, e.user_message());
        }
    };

    match await_ticket(judge, policy, &token).await {
        Ok(ticket) => verdict_from_ticket(case, &ticket),
        Err(e @ ForgeError::Timeout { .. }) => TestVerdict::failed(
            case,
            VerdictErrorKind::Timeout,
            format!("Timed out: {}", e),
        ),
        Err(e) => TestVerdict::failed(case, VerdictErrorKind::Network, e.user_message()),
    }
}

/// Grade every case concurrently. Verdicts keep the order of `request.test_cases`.
pub async fn run_submission<J: JudgeClient>(
    judge: &J,
    policy: &PollPolicy,
    request: &SubmissionRequest,
) -> Result<RunResult> {
    validate(request)?;
    let start = Instant::now();
    let total = request.test_cases.len();
    log::info!("Running {} submission against {} case(s)", request.language, total);

    let futures: Vec<_> = request
        .test_cases
        .iter()
        .map(|case| grade_case(judge, policy, request, case))
        .collect();
    let verdicts = future::join_all(futures).await;

    let result = RunResult::from_verdicts(verdicts)?;
    log::info!(
        "Run finished in {}ms: {}/{} passed, score {}",
        start.elapsed().as_millis(),
        result.passed_count(),
        total,
        result.score
    );
    Ok(result)
}

/// Like [`run_submission`], but abandons in-flight polls as soon as a newer run
/// starts on the same tracker.
pub async fn run_tracked<J: JudgeClient>(
    judge: &J,
    policy: &PollPolicy,
    request: &SubmissionRequest,
    handle: &RunHandle,
) -> Result<RunResult> {
    let mut watcher = handle.clone();
    tokio::select! {
        result = run_submission(judge, policy, request) => {
            if handle.is_stale() {
                return Err(ForgeError::Superseded { run_id: handle.id() });
            }
            result
        }
        _ = watcher.superseded() => {
            log::info!("Run {} superseded; abandoning its polls", handle.id());
            Err(ForgeError::Superseded { run_id: handle.id() })
        }
    }
}

/// Run, then hand the result and code to the store as an audit record. A
/// failed write is logged and does not change the returned result.
///
/// Only a run that is still current when grading ends is recorded. A run
/// superseded while its record is being written keeps the record.
pub async fn run_and_record<J: JudgeClient>(
    judge: &J,
    policy: &PollPolicy,
    store: &dyn SubmissionStore,
    user_id: &str,
    problem_id: &str,
    request: &SubmissionRequest,
    handle: &RunHandle,
) -> Result<RunResult> {
    let result = run_tracked(judge, policy, request, handle).await?;
    if handle.is_stale() {
        return Err(ForgeError::Superseded { run_id: handle.id() });
    }
    let record = SubmissionRecord::graded(user_id, problem_id, request, &result);
    record_best_effort(store, &record).await;
    Ok(result)
}

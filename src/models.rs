// src/models.rs
use crate::errors::{ForgeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Languages accepted by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Javascript,
    Python,
    Java,
    Cpp,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Javascript,
        Language::Python,
        Language::Java,
        Language::Cpp,
    ];

    /// Judge0 language id.
    pub fn judge0_id(self) -> u32 {
        match self {
            Language::Javascript => 63,
            Language::Python => 71,
            Language::Java => 62,
            Language::Cpp => 54,
        }
    }

    /// Piston runtime name.
    pub fn piston_name(self) -> &'static str {
        match self {
            Language::Javascript => "javascript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Cpp => "c++",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Javascript => "javascript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Cpp => "cpp",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "javascript" | "js" => Ok(Language::Javascript),
            "python" | "py" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            "cpp" | "c++" => Ok(Language::Cpp),
            other => Err(ForgeError::Validation(format!(
                "Unsupported language '{}'.",
                other
            ))),
        }
    }
}

/// One test case of a problem, as stored in `test_cases`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemCase {
    pub id: String,
    pub input: String,
    pub expected_output: String,
    #[serde(default, alias = "is_hidden")]
    pub hidden: bool,
}

/// One "Run" action: code plus the cases to grade it against.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub source_code: String,
    pub language: Language,
    pub test_cases: Vec<ProblemCase>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JudgeStatus {
    Pending,
    Running,
    Finished,
    Error,
}

impl JudgeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JudgeStatus::Finished | JudgeStatus::Error)
    }
}

/// How a finished submission failed, if the judge says it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictErrorKind {
    Compile,
    Runtime,
    Judge,
    Network,
    Timeout,
}

/// Snapshot of a remote judge submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JudgeTicket {
    pub token: String,
    pub status: Option<JudgeStatus>,
    pub description: Option<String>,
    pub failure: Option<VerdictErrorKind>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub message: Option<String>,
    pub time: Option<String>,
    pub memory: Option<u64>,
}

impl JudgeTicket {
    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(JudgeStatus::is_terminal)
    }

    /// First non-empty diagnostic: stderr, then compiler output, then the judge message.
    pub fn error_text(&self) -> Option<String> {
        [&self.stderr, &self.compile_output, &self.message]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Outcome for one test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestVerdict {
    pub case_id: String,
    pub expected_output: String,
    pub actual_output: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<VerdictErrorKind>,
}

impl TestVerdict {
    /// A verdict for a case that never produced output.
    pub fn failed(case: &ProblemCase, kind: VerdictErrorKind, message: impl Into<String>) -> Self {
        Self {
            case_id: case.id.clone(),
            expected_output: case.expected_output.trim().to_string(),
            actual_output: String::new(),
            passed: false,
            error: Some(message.into()),
            error_kind: Some(kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub verdicts: Vec<TestVerdict>,
    pub all_passed: bool,
    pub score: u8,
}

impl RunResult {
    /// Aggregates verdicts in input order. An empty set is rejected rather than
    /// reported as a pass.
    pub fn from_verdicts(verdicts: Vec<TestVerdict>) -> Result<Self> {
        if verdicts.is_empty() {
            return Err(ForgeError::Validation("No test cases to grade.".to_string()));
        }
        let total = verdicts.len();
        let passed = verdicts.iter().filter(|v| v.passed).count();
        Ok(Self {
            all_passed: passed == total,
            score: percentage(passed, total),
            verdicts,
        })
    }

    pub fn passed_count(&self) -> usize {
        self.verdicts.iter().filter(|v| v.passed).count()
    }

    pub fn status(&self) -> SubmissionStatus {
        if self.all_passed {
            SubmissionStatus::Accepted
        } else {
            SubmissionStatus::WrongAnswer
        }
    }
}

/// `round(100 * passed / total)`, halves rounded up. `total` must be non-zero.
fn percentage(passed: usize, total: usize) -> u8 {
    ((200 * passed + total) / (2 * total)) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Saved,
    Accepted,
    WrongAnswer,
}

impl SubmissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Saved => "saved",
            SubmissionStatus::Accepted => "accepted",
            SubmissionStatus::WrongAnswer => "wrong_answer",
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "saved" => Ok(SubmissionStatus::Saved),
            "accepted" => Ok(SubmissionStatus::Accepted),
            "wrong_answer" => Ok(SubmissionStatus::WrongAnswer),
            other => Err(ForgeError::UnexpectedResponse(format!(
                "unknown submission status '{}'",
                other
            ))),
        }
    }
}

/// Row of the `submissions` table. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: String,
    pub user_id: String,
    pub problem_id: String,
    pub code: String,
    pub language: String,
    pub status: SubmissionStatus,
    pub score: Option<i64>,
    pub created_at: String,
}

impl SubmissionRecord {
    /// Audit record for a graded run.
    pub fn graded(
        user_id: &str,
        problem_id: &str,
        request: &SubmissionRequest,
        result: &RunResult,
    ) -> Self {
        Self::new(
            user_id,
            problem_id,
            request.language,
            &request.source_code,
            result.status(),
            Some(i64::from(result.score)),
        )
    }

    /// Code saved without running it.
    pub fn saved(user_id: &str, problem_id: &str, language: Language, code: &str) -> Self {
        Self::new(user_id, problem_id, language, code, SubmissionStatus::Saved, None)
    }

    fn new(
        user_id: &str,
        problem_id: &str,
        language: Language,
        code: &str,
        status: SubmissionStatus,
        score: Option<i64>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            problem_id: problem_id.to_string(),
            code: code.to_string(),
            language: language.to_string(),
            status,
            score,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(passed: bool) -> TestVerdict {
        TestVerdict {
            case_id: "c".to_string(),
            expected_output: "1".to_string(),
            actual_output: if passed { "1" } else { "2" }.to_string(),
            passed,
            error: None,
            error_kind: None,
        }
    }

    #[test]
    fn score_is_rounded_percentage() {
        let result =
            RunResult::from_verdicts(vec![verdict(true), verdict(false), verdict(false)]).unwrap();
        assert_eq!(result.score, 33);
        assert!(!result.all_passed);

        let result =
            RunResult::from_verdicts(vec![verdict(true), verdict(true), verdict(false)]).unwrap();
        assert_eq!(result.score, 67);

        let result = RunResult::from_verdicts(vec![verdict(true), verdict(false)]).unwrap();
        assert_eq!(result.score, 50);
        assert_eq!(result.status(), SubmissionStatus::WrongAnswer);
    }

    #[test]
    fn all_passed_requires_every_verdict() {
        let result = RunResult::from_verdicts(vec![verdict(true), verdict(true)]).unwrap();
        assert!(result.all_passed);
        assert_eq!(result.score, 100);
        assert_eq!(result.status(), SubmissionStatus::Accepted);

        let result = RunResult::from_verdicts(vec![verdict(false)]).unwrap();
        assert!(!result.all_passed);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn empty_verdicts_are_rejected() {
        let err = RunResult::from_verdicts(Vec::new()).unwrap_err();
        assert!(matches!(err, ForgeError::Validation(_)));
    }

    #[test]
    fn language_parsing_accepts_aliases() {
        assert_eq!("C++".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!(" py ".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("js".parse::<Language>().unwrap().judge0_id(), 63);
        assert!("cobol".parse::<Language>().is_err());
    }

    #[test]
    fn error_text_prefers_stderr_then_compile_output() {
        let mut ticket = JudgeTicket {
            compile_output: Some("main.cpp:1: error".to_string()),
            message: Some("Exited with error status 1".to_string()),
            ..Default::default()
        };
        assert_eq!(ticket.error_text().as_deref(), Some("main.cpp:1: error"));

        ticket.stderr = Some("  \n".to_string());
        assert_eq!(ticket.error_text().as_deref(), Some("main.cpp:1: error"));

        ticket.stderr = Some("Traceback".to_string());
        assert_eq!(ticket.error_text().as_deref(), Some("Traceback"));
    }

    #[test]
    fn problem_case_reads_store_column_names() {
        let case: ProblemCase = serde_json::from_str(
            r#"{"id":"t1","problem_id":"p1","input":"1 2","expected_output":"3",
                "is_hidden":true,"created_at":"x"}"#,
        )
        .unwrap();
        assert!(case.hidden);
        assert_eq!(case.expected_output, "3");
    }
}

//! Shared data model (spec §3) consumed by every component crate: the
//! request/fingerprint/status lifecycle, context matches, findings and the
//! aggregated review payload.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hosted SCM the change request lives on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Github,
    Gitlab,
    Bitbucket,
}

/// Immutable once created; owned by the queue broker from enqueue until ack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub request_id: String,
    pub provider: Provider,
    pub repository_id: String,
    pub change_request_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Deterministic idempotency key: `provider + repositoryId + changeRequestId
/// [+ headSha]`. Identical inputs MUST yield identical fingerprints.
pub fn fingerprint(provider: Provider, repository_id: &str, change_request_id: i64, head_sha: Option<&str>) -> String {
    let provider_tag = match provider {
        Provider::Github => "github",
        Provider::Gitlab => "gitlab",
        Provider::Bitbucket => "bitbucket",
    };
    let mut hasher = Sha256::new();
    hasher.update(provider_tag.as_bytes());
    hasher.update(b"|");
    hasher.update(repository_id.as_bytes());
    hasher.update(b"|");
    hasher.update(change_request_id.to_string().as_bytes());
    if let Some(sha) = head_sha {
        hasher.update(b"|");
        hasher.update(sha.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Monotonic lifecycle: `PENDING -> PROCESSING -> {COMPLETED, FAILED}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReviewStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ReviewStatus {
    /// P6: status transitions are a subset of the monotonic graph.
    pub fn can_transition_to(self, next: ReviewStatus) -> bool {
        use ReviewStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Pending, Failed) | (Processing, Completed) | (Processing, Failed)
        )
    }
}

/// Reason a file was surfaced as related context, with its base confidence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MatchReason {
    FileReference,
    DirectImport,
    SiblingFile,
    GitCochangeHigh,
    GitCochangeMedium,
    SamePackage,
    TestCounterpart,
    TypeReference,
    MethodCall,
    RagSemantic,
}

impl MatchReason {
    pub fn base_confidence(self) -> f64 {
        use MatchReason::*;
        match self {
            FileReference => 0.9,
            DirectImport => 0.9,
            SiblingFile => 0.5,
            GitCochangeHigh => 0.8,
            GitCochangeMedium => 0.5,
            SamePackage => 0.6,
            TestCounterpart => 0.8,
            TypeReference => 0.85,
            MethodCall => 0.7,
            RagSemantic => 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextMatch {
    pub file_path: String,
    pub reason: MatchReason,
    pub confidence: f64,
    pub evidence: String,
}

/// Severity of a finding. `Error` only arises from synthesized test findings
/// (§4.8 step 2); AI findings only ever produce the first four.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Info,
    Error,
}

impl Severity {
    /// `critical > major > minor > info/error`.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 3,
            Severity::Major => 2,
            Severity::Minor => 1,
            Severity::Info | Severity::Error => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewFinding {
    pub file: String,
    pub start_line: u32,
    pub severity: Severity,
    pub title: String,
    pub suggestion: String,
    /// `None` is treated as passing the confidence-threshold filter.
    pub confidence: Option<f64>,
    pub confidence_explanation: String,
    /// Base64-encoded markdown diff block, when present.
    pub suggested_fix: Option<String>,
}

impl ReviewFinding {
    pub fn normalized_title(&self) -> String {
        self.title.trim().to_lowercase()
    }

    /// `(file, startLine, severity, normalizedTitle)` — the dedup/cap key.
    pub fn dedup_key(&self) -> (String, u32, Severity, String) {
        (self.file.clone(), self.start_line, self.severity, self.normalized_title())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonBlockingNote {
    pub file: String,
    pub line: u32,
    pub note: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct SourceCounts {
    pub ai: usize,
    pub tests: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AggregatedCounts {
    pub by_source: SourceCounts,
    pub by_severity: HashMap<Severity, usize>,
}

/// Outcome of one test case, as reported by the sandboxed test run (C6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    Passed,
    Failed,
    Error,
    Skipped,
}

impl TestStatus {
    /// Only `Failed`/`Error` become synthetic findings (§4.8 step 2).
    pub fn counts_as_failure(self) -> bool {
        matches!(self, TestStatus::Failed | TestStatus::Error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Fully qualified class name, e.g. `pkg.Class`.
    pub class_name: String,
    pub status: TestStatus,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExecutionResult {
    pub cases: Vec<TestCase>,
}

impl TestExecutionResult {
    pub fn total(&self) -> usize {
        self.cases.len()
    }

    pub fn failed_count(&self) -> usize {
        self.cases.iter().filter(|c| c.status.counts_as_failure()).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedReview {
    pub summary: String,
    pub findings: Vec<ReviewFinding>,
    pub notes: Vec<NonBlockingNote>,
    pub counts: AggregatedCounts,
    pub overall_confidence: f64,
    pub total_before_dedup: usize,
    pub total_after_dedup: usize,
    pub total_filtered: usize,
    /// Findings that failed §4.9 diff validation; diagnostics only.
    pub invalid_findings: Vec<ReviewFinding>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let a = fingerprint(Provider::Github, "owner/repo", 42, Some("abc123"));
        let b = fingerprint(Provider::Github, "owner/repo", 42, Some("abc123"));
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_differs_without_head_sha() {
        let with_sha = fingerprint(Provider::Github, "owner/repo", 42, Some("abc123"));
        let without_sha = fingerprint(Provider::Github, "owner/repo", 42, None);
        assert_ne!(with_sha, without_sha);
    }

    #[test]
    fn status_transitions_are_monotonic() {
        assert!(ReviewStatus::Pending.can_transition_to(ReviewStatus::Processing));
        assert!(ReviewStatus::Processing.can_transition_to(ReviewStatus::Completed));
        assert!(!ReviewStatus::Completed.can_transition_to(ReviewStatus::Processing));
        assert!(!ReviewStatus::Pending.can_transition_to(ReviewStatus::Completed));
    }

    #[test]
    fn severity_rank_groups_info_and_error() {
        assert_eq!(Severity::Info.rank(), Severity::Error.rank());
        assert!(Severity::Critical.rank() > Severity::Major.rank());
    }
}

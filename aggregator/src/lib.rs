//! C8 Finding Aggregator: the fixed 8-step pipeline of spec §4.8.

pub mod validator;

use std::collections::HashMap;

use llm_driver::ReviewResult;
use review_model::{
    AggregatedCounts, AggregatedReview, ReviewFinding, Severity, SourceCounts, TestExecutionResult, TestStatus,
};
use tracing::debug;

pub use validator::is_line_in_diff;

#[derive(Debug, Clone, Copy)]
pub struct AggregatorConfig {
    pub confidence_threshold: f64,
    /// Reserved for a future fuzzy-dedup pass; the mandatory dedup key in
    /// step 4 is exact-match.
    pub similarity_threshold: f64,
    pub per_file_cap: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self { confidence_threshold: 0.7, similarity_threshold: 0.85, per_file_cap: 10 }
    }
}

fn class_name_to_path(class_name: &str) -> String {
    format!("{}.java", class_name.replace('.', "/"))
}

fn confidence_for_ranking(finding: &ReviewFinding) -> f64 {
    // null confidence passes every filter, so it ranks as the best case too.
    finding.confidence.unwrap_or(1.0)
}

/// Step 1: drop AI issues below the threshold. `None` confidence passes.
fn filter_by_confidence(findings: Vec<ReviewFinding>, threshold: f64) -> Vec<ReviewFinding> {
    findings.into_iter().filter(|f| f.confidence.map(|c| c >= threshold).unwrap_or(true)).collect()
}

/// Step 2: failed/errored tests become synthetic `error`-severity findings.
fn synthesize_test_findings(tests: &TestExecutionResult) -> Vec<ReviewFinding> {
    tests
        .cases
        .iter()
        .filter(|c| c.status.counts_as_failure())
        .map(|c| ReviewFinding {
            file: class_name_to_path(&c.class_name),
            start_line: 1,
            severity: Severity::Error,
            title: format!("Test failure: {}", c.class_name),
            suggestion: c.message.clone().unwrap_or_default(),
            confidence: Some(1.0),
            confidence_explanation: "Synthesized from failed test execution".to_string(),
            suggested_fix: None,
        })
        .collect()
}

/// Step 4: exact-match dedup on `(file, startLine, severity, normalizedTitle)`,
/// keeping the highest-confidence survivor.
fn dedup(findings: Vec<ReviewFinding>) -> (Vec<ReviewFinding>, usize) {
    let mut best: HashMap<(String, u32, Severity, String), ReviewFinding> = HashMap::new();
    let total = findings.len();
    for f in findings {
        let key = f.dedup_key();
        best.entry(key)
            .and_modify(|existing| {
                if confidence_for_ranking(&f) > confidence_for_ranking(existing) {
                    *existing = f.clone();
                }
            })
            .or_insert(f);
    }
    let survivors: Vec<ReviewFinding> = best.into_values().collect();
    let dropped = total - survivors.len();
    (survivors, dropped)
}

/// Step 5: per-file cap, ranked by `(severity rank desc, confidence desc)`.
fn cap_per_file(findings: Vec<ReviewFinding>, cap: usize) -> (Vec<ReviewFinding>, usize) {
    let mut by_file: HashMap<String, Vec<ReviewFinding>> = HashMap::new();
    for f in findings {
        by_file.entry(f.file.clone()).or_default().push(f);
    }

    let mut survivors = Vec::new();
    let mut dropped = 0usize;
    for (_, mut group) in by_file {
        group.sort_by(|a, b| {
            b.severity
                .rank()
                .cmp(&a.severity.rank())
                .then(confidence_for_ranking(b).partial_cmp(&confidence_for_ranking(a)).unwrap_or(std::cmp::Ordering::Equal))
        });
        if group.len() > cap {
            dropped += group.len() - cap;
            group.truncate(cap);
        }
        survivors.extend(group);
    }
    (survivors, dropped)
}

/// Step 7: mean confidence across survivors; `1.0` when there are none;
/// the configured threshold when every survivor's confidence is `null`.
fn overall_confidence(findings: &[ReviewFinding], threshold: f64) -> f64 {
    if findings.is_empty() {
        return 1.0;
    }
    let values: Vec<f64> = findings.iter().filter_map(|f| f.confidence).collect();
    if values.is_empty() {
        return threshold;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn test_clause(tests: &TestExecutionResult) -> String {
    let total = tests.total();
    let failed = tests.failed_count();
    if failed == 0 {
        format!("All {total} tests passed")
    } else {
        format!("{failed} of {total} tests failed")
    }
}

pub fn aggregate(
    ai: Option<&ReviewResult>,
    tests: Option<&TestExecutionResult>,
    cfg: &AggregatorConfig,
) -> AggregatedReview {
    let ai_findings = ai.map(|r| r.findings.clone()).unwrap_or_default();
    let ai_total_before_filter = ai_findings.len();
    let ai_filtered = filter_by_confidence(ai_findings, cfg.confidence_threshold);
    let confidence_filter_drops = ai_total_before_filter - ai_filtered.len();

    let test_findings = tests.map(synthesize_test_findings).unwrap_or_default();
    let test_source_count = test_findings.len();

    let mut concatenated = ai_filtered;
    concatenated.extend(test_findings);
    let total_before_dedup = concatenated.len();

    let (deduped, dedup_drops) = dedup(concatenated);
    let total_after_dedup = deduped.len();

    let (capped, cap_drops) = cap_per_file(deduped, cfg.per_file_cap);

    let mut sorted = capped;
    sorted.sort_by(|a, b| {
        b.severity
            .rank()
            .cmp(&a.severity.rank())
            .then(confidence_for_ranking(b).partial_cmp(&confidence_for_ranking(a)).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut by_severity: HashMap<Severity, usize> = HashMap::new();
    for f in &sorted {
        *by_severity.entry(f.severity).or_insert(0) += 1;
    }
    let ai_survivors = sorted.iter().filter(|f| f.severity != Severity::Error).count();
    let test_survivors = sorted.len() - ai_survivors;

    let overall = overall_confidence(&sorted, cfg.confidence_threshold);

    let mut summary = String::new();
    if let Some(result) = ai {
        summary.push_str(&result.summary);
    }
    if let Some(tests) = tests {
        if !summary.is_empty() {
            summary.push_str(". ");
        }
        summary.push_str(&test_clause(tests));
    }

    let total_filtered = confidence_filter_drops + dedup_drops + cap_drops;

    debug!(
        confidence_filter_drops,
        test_source_count, total_before_dedup, total_after_dedup, dedup_drops, cap_drops, "aggregated findings"
    );

    AggregatedReview {
        summary,
        findings: sorted,
        notes: ai.map(|r| r.notes.clone()).unwrap_or_default(),
        counts: AggregatedCounts {
            by_source: SourceCounts { ai: ai_survivors, tests: test_survivors },
            by_severity,
        },
        overall_confidence: overall,
        total_before_dedup,
        total_after_dedup,
        total_filtered,
        invalid_findings: Vec::new(),
    }
}

/// Step 9 (C9 integration): splits findings into those whose line actually
/// appears in the diff and those that don't (diagnostics only, never
/// published).
pub fn partition_by_diff_validity(
    review: &mut AggregatedReview,
    diff: &diff_core::GitDiffDocument,
) {
    let (valid, invalid): (Vec<_>, Vec<_>) =
        review.findings.drain(..).partition(|f| is_line_in_diff(diff, &f.file, f.start_line));
    review.findings = valid;
    review.invalid_findings = invalid;
}

#[cfg(test)]
mod tests {
    use super::*;
    use review_model::{NonBlockingNote, TestCase};

    fn finding(file: &str, line: u32, severity: Severity, title: &str, confidence: Option<f64>) -> ReviewFinding {
        ReviewFinding {
            file: file.to_string(),
            start_line: line,
            severity,
            title: title.to_string(),
            suggestion: "fix it".to_string(),
            confidence,
            confidence_explanation: "because".to_string(),
            suggested_fix: None,
        }
    }

    #[test]
    fn filters_low_confidence_ai_issues() {
        let ai = ReviewResult {
            summary: "looks ok".to_string(),
            findings: vec![
                finding("a.rs", 1, Severity::Major, "issue a", Some(0.9)),
                finding("b.rs", 1, Severity::Minor, "issue b", Some(0.2)),
                finding("c.rs", 1, Severity::Info, "issue c", None),
            ],
            notes: vec![],
        };
        let report = aggregate(Some(&ai), None, &AggregatorConfig::default());
        assert_eq!(report.findings.len(), 2);
        assert!(report.findings.iter().any(|f| f.file == "a.rs"));
        assert!(report.findings.iter().any(|f| f.file == "c.rs"));
    }

    #[test]
    fn synthesizes_failed_test_findings() {
        let tests = TestExecutionResult {
            cases: vec![
                TestCase { class_name: "pkg.Class".to_string(), status: TestStatus::Failed, message: Some("boom".to_string()) },
                TestCase { class_name: "pkg.Other".to_string(), status: TestStatus::Passed, message: None },
                TestCase { class_name: "pkg.Skipped".to_string(), status: TestStatus::Skipped, message: None },
            ],
        };
        let report = aggregate(None, Some(&tests), &AggregatorConfig::default());
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].file, "pkg/Class.java");
        assert_eq!(report.findings[0].severity, Severity::Error);
        assert!(report.summary.contains("1 of 3 tests failed"));
    }

    #[test]
    fn dedup_keeps_highest_confidence() {
        let ai = ReviewResult {
            summary: String::new(),
            findings: vec![
                finding("a.rs", 1, Severity::Major, "dup", Some(0.75)),
                finding("a.rs", 1, Severity::Major, "DUP", Some(0.95)),
            ],
            notes: vec![],
        };
        let report = aggregate(Some(&ai), None, &AggregatorConfig::default());
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].confidence, Some(0.95));
        assert_eq!(report.total_before_dedup, 2);
        assert_eq!(report.total_after_dedup, 1);
    }

    #[test]
    fn per_file_cap_keeps_highest_severity_first() {
        let mut findings = Vec::new();
        for i in 0..12 {
            findings.push(finding("a.rs", i, Severity::Minor, &format!("issue {i}"), Some(0.8)));
        }
        findings.push(finding("a.rs", 99, Severity::Critical, "critical one", Some(0.9)));
        let ai = ReviewResult { summary: String::new(), findings, notes: vec![] };
        let cfg = AggregatorConfig { per_file_cap: 10, ..Default::default() };
        let report = aggregate(Some(&ai), None, &cfg);
        assert_eq!(report.findings.len(), 10);
        assert_eq!(report.findings[0].severity, Severity::Critical);
    }

    #[test]
    fn overall_confidence_defaults_to_threshold_when_all_null() {
        let ai = ReviewResult {
            summary: String::new(),
            findings: vec![finding("a.rs", 1, Severity::Info, "x", None)],
            notes: vec![],
        };
        let cfg = AggregatorConfig { confidence_threshold: 0.7, ..Default::default() };
        let report = aggregate(Some(&ai), None, &cfg);
        assert_eq!(report.overall_confidence, 0.7);
    }

    #[test]
    fn overall_confidence_averages_only_the_non_null_values() {
        let ai = ReviewResult {
            summary: String::new(),
            findings: vec![
                finding("a.rs", 1, Severity::Info, "x", Some(0.9)),
                finding("b.rs", 2, Severity::Info, "y", None),
                finding("c.rs", 3, Severity::Info, "z", None),
            ],
            notes: vec![],
        };
        let cfg = AggregatorConfig { confidence_threshold: 0.7, ..Default::default() };
        let report = aggregate(Some(&ai), None, &cfg);
        assert_eq!(report.overall_confidence, 0.9);
    }

    #[test]
    fn overall_confidence_is_one_when_no_findings_survive() {
        let report = aggregate(None, None, &AggregatorConfig::default());
        assert_eq!(report.overall_confidence, 1.0);
        assert!(report.notes.is_empty());
    }

    #[test]
    fn partitions_findings_outside_the_diff() {
        use diff_core::{DiffHunk, DiffLine, FileModification, GitDiffDocument};
        let diff = GitDiffDocument {
            files: vec![FileModification {
                old_path: "a.rs".into(),
                new_path: "a.rs".into(),
                hunks: vec![DiffHunk {
                    old_start: 1,
                    old_count: 1,
                    new_start: 1,
                    new_count: 1,
                    lines: vec![DiffLine::Added { new_line: 1, content: "x".into() }],
                }],
            }],
        };
        let ai = ReviewResult {
            summary: String::new(),
            findings: vec![
                finding("a.rs", 1, Severity::Major, "in diff", Some(0.9)),
                finding("a.rs", 50, Severity::Major, "not in diff", Some(0.9)),
            ],
            notes: vec![NonBlockingNote { file: "a.rs".into(), line: 1, note: "fyi".into() }],
        };
        let mut report = aggregate(Some(&ai), None, &AggregatorConfig::default());
        partition_by_diff_validity(&mut report, &diff);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.invalid_findings.len(), 1);
    }
}

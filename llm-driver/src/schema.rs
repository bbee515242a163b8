//! The LLM response schema from spec §6, and its normalization into
//! `review_model`'s shared data types.

use review_model::{NonBlockingNote, ReviewFinding};
use serde::{Deserialize, Deserializer};

/// Wraps a present value in `Some` so `Option<Option<T>>` fields can tell
/// an absent key (outer `None`, via `#[serde(default)]`) apart from a key
/// explicitly set to `null` (`Some(None)`) — plain `Option<T>` collapses
/// both to `None`.
fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct RawReviewResult {
    pub summary: String,
    #[serde(default)]
    pub issues: Vec<RawIssue>,
    #[serde(default)]
    pub non_blocking_notes: Vec<RawNote>,
}

/// Field casing matches the schema from spec §6 verbatim: `start_line` is
/// snake_case but `confidenceScore`/`confidenceExplanation`/`suggestedFix`
/// are camelCase.
#[derive(Debug, Deserialize)]
pub struct RawIssue {
    pub file: String,
    pub start_line: u32,
    pub severity: review_model::Severity,
    pub title: String,
    pub suggestion: String,
    /// Double-`Option` so an absent key and an explicit `null` are
    /// distinguishable: `None` (key absent) defaults to `0.5` in
    /// [`RawIssue::into_finding`], while `Some(None)` (explicit `null`)
    /// stays `None` and always passes the confidence-threshold filter.
    #[serde(default, rename = "confidenceScore", deserialize_with = "deserialize_some")]
    pub confidence_score: Option<Option<f64>>,
    #[serde(default, rename = "confidenceExplanation")]
    pub confidence_explanation: Option<String>,
    #[serde(default, rename = "suggestedFix")]
    pub suggested_fix: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawNote {
    pub file: String,
    pub line: u32,
    pub note: String,
}

/// Base64 alphabet check per spec §6: bytes outside `[A-Za-z0-9+/=]` cause
/// `suggestedFix` to be dropped rather than failing the whole issue.
fn is_valid_base64_diff(s: &str) -> bool {
    s.bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
}

impl RawIssue {
    /// §4.7 step 6: clamp confidence to `[0,1]` (missing → 0.5), default
    /// explanation when empty. An explicit `null` is kept as `None` (§4.8
    /// step 1 treats null confidence as always passing), distinct from a
    /// missing key.
    pub fn into_finding(self) -> ReviewFinding {
        let confidence = match self.confidence_score {
            None => Some(0.5),
            Some(None) => None,
            Some(Some(c)) => Some(c.clamp(0.0, 1.0)),
        };
        let confidence_explanation = match self.confidence_explanation {
            Some(s) if !s.trim().is_empty() => s,
            _ => "No explanation provided".to_string(),
        };
        let suggested_fix = self
            .suggested_fix
            .filter(|fix| is_valid_base64_diff(fix));

        ReviewFinding {
            file: self.file,
            start_line: self.start_line,
            severity: self.severity,
            title: self.title,
            suggestion: self.suggestion,
            confidence,
            confidence_explanation,
            suggested_fix,
        }
    }
}

impl From<RawNote> for NonBlockingNote {
    fn from(n: RawNote) -> Self {
        NonBlockingNote { file: n.file, line: n.line, note: n.note }
    }
}

/// Normalized result of a single LLM invocation.
#[derive(Debug, Clone)]
pub struct ReviewResult {
    pub summary: String,
    pub findings: Vec<ReviewFinding>,
    pub notes: Vec<NonBlockingNote>,
}

impl From<RawReviewResult> for ReviewResult {
    fn from(raw: RawReviewResult) -> Self {
        Self {
            summary: raw.summary,
            findings: raw.issues.into_iter().map(RawIssue::into_finding).collect(),
            notes: raw.non_blocking_notes.into_iter().map(NonBlockingNote::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_suggested_fix_with_invalid_bytes() {
        let issue = RawIssue {
            file: "a.rs".into(),
            start_line: 1,
            severity: review_model::Severity::Minor,
            title: "t".into(),
            suggestion: "s".into(),
            confidence_score: Some(Some(1.5)),
            confidence_explanation: None,
            suggested_fix: Some("not base64!!".into()),
        };
        let finding = issue.into_finding();
        assert!(finding.suggested_fix.is_none());
        assert_eq!(finding.confidence, Some(1.0));
        assert_eq!(finding.confidence_explanation, "No explanation provided");
    }

    #[test]
    fn missing_confidence_key_defaults_to_half() {
        let issue = RawIssue {
            file: "a.rs".into(),
            start_line: 1,
            severity: review_model::Severity::Major,
            title: "t".into(),
            suggestion: "s".into(),
            confidence_score: None,
            confidence_explanation: Some("because".into()),
            suggested_fix: None,
        };
        let finding = issue.into_finding();
        assert_eq!(finding.confidence, Some(0.5));
    }

    #[test]
    fn explicit_null_confidence_stays_none() {
        let issue = RawIssue {
            file: "a.rs".into(),
            start_line: 1,
            severity: review_model::Severity::Major,
            title: "t".into(),
            suggestion: "s".into(),
            confidence_score: Some(None),
            confidence_explanation: None,
            suggested_fix: None,
        };
        let finding = issue.into_finding();
        assert_eq!(finding.confidence, None);
    }

    #[test]
    fn json_distinguishes_absent_key_from_explicit_null() {
        let absent: RawIssue = serde_json::from_str(
            r#"{"file":"a.rs","start_line":1,"severity":"minor","title":"t","suggestion":"s"}"#,
        )
        .unwrap();
        assert_eq!(absent.confidence_score, None);

        let explicit_null: RawIssue = serde_json::from_str(
            r#"{"file":"a.rs","start_line":1,"severity":"minor","title":"t","suggestion":"s","confidenceScore":null}"#,
        )
        .unwrap();
        assert_eq!(explicit_null.confidence_score, Some(None));

        let present: RawIssue = serde_json::from_str(
            r#"{"file":"a.rs","start_line":1,"severity":"minor","title":"t","suggestion":"s","confidenceScore":0.8}"#,
        )
        .unwrap();
        assert_eq!(present.confidence_score, Some(Some(0.8)));
    }
}

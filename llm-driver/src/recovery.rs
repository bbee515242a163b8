//! Recovery from near-JSON model output (spec §4.7, steps 1-6).

use tracing::{debug, warn};

use crate::errors::JsonValidationError;
use crate::schema::{RawReviewResult, ReviewResult};

/// Runs the full six-step pipeline over raw model text.
pub fn recover(raw_output: &str) -> Result<ReviewResult, JsonValidationError> {
    let trimmed = raw_output.trim();
    let unfenced = strip_markdown_fences(trimmed);
    let extracted = extract_braces(unfenced).ok_or(JsonValidationError::NoJsonObject)?;
    let sanitized = sanitize(extracted);
    let stripped = strip_schema_property(&sanitized);

    let raw: RawReviewResult = serde_json::from_str(&stripped).map_err(|e| {
        warn!(error = %e, "failed to parse recovered JSON");
        JsonValidationError::ParseFailed(e.to_string())
    })?;

    debug!(issues = raw.issues.len(), notes = raw.non_blocking_notes.len(), "recovered LLM output");
    Ok(raw.into())
}

/// Step 2: strip a leading ` ```json ` / ` ``` ` fence and a trailing ` ``` `.
fn strip_markdown_fences(s: &str) -> &str {
    let s = s
        .strip_prefix("```json")
        .or_else(|| s.strip_prefix("```"))
        .unwrap_or(s)
        .trim_start();
    s.strip_suffix("```").unwrap_or(s).trim_end()
}

/// Step 3: the substring between the first `{` and the last `}`.
fn extract_braces(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&s[start..=end])
}

/// Step 4: a permissive sanitizer for the common ways models mangle JSON:
/// trailing commas before `}`/`]`, and stray control characters.
fn sanitize(s: &str) -> String {
    let no_control: String = s.chars().filter(|c| !c.is_control() || *c == '\n' || *c == '\t').collect();
    strip_trailing_commas(&no_control)
}

fn strip_trailing_commas(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                i += 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Step 5: remove a top-level `"$schema": ...` property, if present.
fn strip_schema_property(s: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(s) {
        Ok(serde_json::Value::Object(mut map)) => {
            map.remove("$schema");
            serde_json::to_string(&serde_json::Value::Object(map)).unwrap_or_else(|_| s.to_string())
        }
        _ => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_plain_json() {
        let input = r#"{"summary":"ok","issues":[],"non_blocking_notes":[]}"#;
        let result = recover(input).unwrap();
        assert_eq!(result.summary, "ok");
    }

    #[test]
    fn recovers_fenced_json_with_preamble() {
        let input = "Sure, here is the review:\n```json\n{\"summary\":\"ok\",\"issues\":[],\"non_blocking_notes\":[]}\n```\nThanks!";
        let result = recover(input).unwrap();
        assert_eq!(result.summary, "ok");
    }

    #[test]
    fn strips_schema_property_and_trailing_commas() {
        let input = r#"{"$schema":"x","summary":"ok","issues":[],"non_blocking_notes":[],}"#;
        let result = recover(input).unwrap();
        assert_eq!(result.summary, "ok");
    }

    #[test]
    fn rejects_output_with_no_braces() {
        assert!(matches!(recover("no json here"), Err(JsonValidationError::NoJsonObject)));
    }

    #[test]
    fn normalizes_issue_confidence() {
        let input = r#"{"summary":"s","issues":[{"file":"a.rs","start_line":3,"severity":"major","title":"T","suggestion":"S","confidenceScore":2.0,"confidenceExplanation":"","suggestedFix":null}],"non_blocking_notes":[]}"#;
        let result = recover(input).unwrap();
        assert_eq!(result.findings[0].confidence, Some(1.0));
        assert_eq!(result.findings[0].confidence_explanation, "No explanation provided");
    }
}

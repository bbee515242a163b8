//! C3 Prompt Composer: fixed-order sections, hard character budget.

pub mod diff_format;

use diff_core::GitDiffDocument;
use review_model::ContextMatch;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ExpandedFile {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ComposerConfig {
    pub char_budget: usize,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self { char_budget: 64_000 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PromptInputs<'a> {
    pub business_context: Option<&'a str>,
    pub pr_title: Option<&'a str>,
    pub pr_description: Option<&'a str>,
    pub pr_source_branch: Option<&'a str>,
    pub pr_target_branch: Option<&'a str>,
    pub context_matches: Vec<ContextMatch>,
    pub expanded_files: Vec<ExpandedFile>,
    pub policies: Vec<String>,
    pub review_focus: Option<&'a str>,
}

const SCHEMA_FRAGMENT: &str = r#"Return exactly one JSON object with this shape:
{
  "summary": string,
  "issues": [
    { "file": string, "start_line": integer >= 1,
      "severity": "critical" | "major" | "minor" | "info",
      "title": string, "suggestion": string,
      "confidenceScore": number in [0,1] or null,
      "confidenceExplanation": string,
      "suggestedFix": base64-encoded markdown diff block, or null }
  ],
  "non_blocking_notes": [ { "file": string, "line": integer >= 1, "note": string } ]
}"#;

fn system_prompt() -> String {
    format!(
        "You are an automated code reviewer. Review the supplied diff and context, \
         then respond with JSON only, no prose outside the JSON object.\n\n{SCHEMA_FRAGMENT}"
    )
}

/// Returns `(systemPrompt, userPrompt)`, trimming expanded files first and
/// then lowest-confidence context matches until the combined length fits
/// `cfg.char_budget` (spec §4.3).
pub fn compose(diff: &GitDiffDocument, inputs: PromptInputs<'_>, cfg: &ComposerConfig) -> (String, String) {
    let system = system_prompt();
    let mut expanded = inputs.expanded_files;
    let mut context = inputs.context_matches;

    loop {
        let user = render_user_prompt(diff, &inputs, &context, &expanded);
        let total = system.len() + user.len();
        if total <= cfg.char_budget {
            debug!(total_chars = total, budget = cfg.char_budget, "prompt within budget");
            return (system, user);
        }

        if let Some(file) = expanded.last_mut() {
            if file.content.len() > 200 {
                let keep = file.content.len() / 2;
                file.content.truncate(keep);
                file.content.push_str("\n... [truncated]");
                warn!(path = %file.path, "truncated expanded file content to fit char budget");
                continue;
            }
            let dropped = expanded.pop().unwrap();
            warn!(path = %dropped.path, "dropped expanded file to fit char budget");
            continue;
        }

        if !context.is_empty() {
            let (lowest_idx, _) = context
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.confidence.partial_cmp(&b.1.confidence).unwrap_or(std::cmp::Ordering::Equal))
                .unwrap();
            let dropped = context.remove(lowest_idx);
            warn!(path = %dropped.file_path, confidence = dropped.confidence, "dropped lowest-confidence context match to fit char budget");
            continue;
        }

        warn!(total_chars = total, budget = cfg.char_budget, "unable to fit prompt within budget after trimming all trimmable content");
        return (system, render_user_prompt(diff, &inputs, &context, &expanded));
    }
}

fn render_user_prompt(
    diff: &GitDiffDocument,
    inputs: &PromptInputs<'_>,
    context: &[ContextMatch],
    expanded: &[ExpandedFile],
) -> String {
    let mut out = String::new();

    if let Some(bc) = inputs.business_context {
        if !bc.is_empty() {
            out.push_str("## BUSINESS_CONTEXT\n");
            out.push_str(bc);
            out.push_str("\n\n");
        }
    }

    if inputs.pr_title.is_some() || inputs.pr_description.is_some() {
        out.push_str("## PR_METADATA\n");
        if let Some(title) = inputs.pr_title {
            out.push_str(&format!("Title: {title}\n"));
        }
        if let (Some(src), Some(dst)) = (inputs.pr_source_branch, inputs.pr_target_branch) {
            out.push_str(&format!("Branch: {src} -> {dst}\n"));
        }
        if let Some(desc) = inputs.pr_description {
            if !desc.is_empty() {
                out.push_str(&format!("Description:\n{desc}\n"));
            }
        }
        out.push('\n');
    }

    if !diff.is_empty() {
        out.push_str("## DIFF\n");
        out.push_str(&diff_format::format_diff(diff));
        out.push('\n');
    }

    if !context.is_empty() {
        out.push_str("## CONTEXT\n");
        for m in context {
            out.push_str(&format!(
                "- {} (reason={:?}, confidence={:.2}): {}\n",
                m.file_path, m.reason, m.confidence, m.evidence
            ));
        }
        out.push('\n');
    }

    if !expanded.is_empty() {
        out.push_str("## EXPANDED_FILES\n");
        for f in expanded {
            out.push_str(&format!("### {}\n{}\n\n", f.path, f.content));
        }
    }

    if !inputs.policies.is_empty() {
        out.push_str("## POLICIES\n");
        for p in &inputs.policies {
            out.push_str(&format!("- {p}\n"));
        }
        out.push('\n');
    }

    if let Some(focus) = inputs.review_focus {
        if !focus.is_empty() {
            out.push_str("## REVIEW_FOCUS\n");
            out.push_str(focus);
            out.push('\n');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use diff_core::FileModification;
    use review_model::MatchReason;

    fn sample_diff() -> GitDiffDocument {
        GitDiffDocument {
            files: vec![FileModification { old_path: "a.rs".into(), new_path: "a.rs".into(), hunks: vec![] }],
        }
    }

    #[test]
    fn omits_missing_sections() {
        let diff = sample_diff();
        let inputs = PromptInputs { business_context: None, ..Default::default() };
        let (_, user) = compose(&diff, inputs, &ComposerConfig::default());
        assert!(!user.contains("BUSINESS_CONTEXT"));
    }

    #[test]
    fn keeps_fixed_section_order() {
        let diff = sample_diff();
        let inputs = PromptInputs {
            business_context: Some("biz"),
            pr_title: Some("title"),
            policies: vec!["no secrets".to_string()],
            review_focus: Some("security"),
            ..Default::default()
        };
        let (_, user) = compose(&diff, inputs, &ComposerConfig::default());
        let biz = user.find("BUSINESS_CONTEXT").unwrap();
        let meta = user.find("PR_METADATA").unwrap();
        let policies = user.find("POLICIES").unwrap();
        let focus = user.find("REVIEW_FOCUS").unwrap();
        assert!(biz < meta && meta < policies && policies < focus);
    }

    #[test]
    fn truncates_expanded_files_before_dropping_context() {
        let diff = sample_diff();
        let big_content = "x".repeat(10_000);
        let inputs = PromptInputs {
            expanded_files: vec![ExpandedFile { path: "big.rs".into(), content: big_content }],
            context_matches: vec![ContextMatch {
                file_path: "ctx.rs".into(),
                reason: MatchReason::SiblingFile,
                confidence: 0.5,
                evidence: "sibling".into(),
            }],
            ..Default::default()
        };
        let cfg = ComposerConfig { char_budget: 500 };
        let (_, user) = compose(&diff, inputs, &cfg);
        assert!(user.len() <= 600);
    }
}

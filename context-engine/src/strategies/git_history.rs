//! `GitHistoryCoChangeStrategy`: files co-changed in >= k past commits
//! become HIGH (k>=10) or MEDIUM evidence (spec §4.2). No teacher crate
//! mines co-change history; the index is taken as an injected dependency
//! (`CoChangeIndex`) so this strategy stays a pure function of its input,
//! matching the other built-in strategies' shape.

use diff_core::GitDiffDocument;
use review_model::{ContextMatch, MatchReason};

pub const HIGH_THRESHOLD: u32 = 10;
pub const MEDIUM_THRESHOLD: u32 = 3;

/// Supplies co-change counts mined from commit history. Grounded on the
/// `get_commits_for`/`get_commits_since` shape of the SCM collaborator
/// contract (spec §6) — an implementation would walk those commits and
/// tally file co-occurrence per commit.
pub trait CoChangeIndex: Send + Sync {
    /// Files historically changed alongside `path`, with their co-change count.
    fn co_changed_with(&self, path: &str) -> Vec<(String, u32)>;
}

pub fn retrieve(diff: &GitDiffDocument, index: &dyn CoChangeIndex) -> Vec<ContextMatch> {
    let modified: std::collections::HashSet<&str> =
        diff.files.iter().map(|f| f.effective_path()).collect();
    let mut seen = std::collections::HashSet::new();
    let mut matches = Vec::new();

    for file in &diff.files {
        let path = file.effective_path();
        for (candidate, count) in index.co_changed_with(path) {
            if modified.contains(candidate.as_str()) || !seen.insert(candidate.clone()) {
                continue;
            }
            let reason = if count >= HIGH_THRESHOLD {
                MatchReason::GitCochangeHigh
            } else if count >= MEDIUM_THRESHOLD {
                MatchReason::GitCochangeMedium
            } else {
                continue;
            };
            matches.push(ContextMatch {
                file_path: candidate,
                reason,
                confidence: reason.base_confidence(),
                evidence: format!("co-changed with `{path}` in {count} past commits"),
            });
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use diff_core::FileModification;

    struct FakeIndex(Vec<(String, String, u32)>);
    impl CoChangeIndex for FakeIndex {
        fn co_changed_with(&self, path: &str) -> Vec<(String, u32)> {
            self.0
                .iter()
                .filter(|(p, _, _)| p == path)
                .map(|(_, other, count)| (other.clone(), *count))
                .collect()
        }
    }

    #[test]
    fn classifies_by_threshold() {
        let doc = GitDiffDocument {
            files: vec![FileModification { old_path: "a.rs".into(), new_path: "a.rs".into(), hunks: vec![] }],
        };
        let index = FakeIndex(vec![
            ("a.rs".into(), "b.rs".into(), 12),
            ("a.rs".into(), "c.rs".into(), 4),
            ("a.rs".into(), "d.rs".into(), 1),
        ]);
        let matches = retrieve(&doc, &index);
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().any(|m| m.file_path == "b.rs" && matches!(m.reason, MatchReason::GitCochangeHigh)));
        assert!(matches.iter().any(|m| m.file_path == "c.rs" && matches!(m.reason, MatchReason::GitCochangeMedium)));
    }
}

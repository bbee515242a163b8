//! `DiffFileReferenceExtractor`: qualified type names and import-like
//! references from `'+'` lines only (spec §4.2). Grounded on
//! `mr-reviewer::review::context`'s pattern of scanning added lines for
//! symbol-shaped tokens.

use std::collections::HashSet;

use diff_core::{DiffLine, GitDiffDocument};
use review_model::{ContextMatch, MatchReason};

/// A qualified reference looks like `pkg.sub.Type` or `pkg/sub/Type`:
/// at least one separator and every segment capitalized-or-identifier.
fn looks_like_reference(token: &str) -> bool {
    let seps = token.contains('.') || token.contains("::");
    if !seps {
        return false;
    }
    token
        .split(['.', ':'])
        .filter(|s| !s.is_empty())
        .all(|seg| seg.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_'))
}

pub fn retrieve(diff: &GitDiffDocument, repo_files: &[String]) -> Vec<ContextMatch> {
    let mut seen = HashSet::new();
    let mut matches = Vec::new();

    for file in &diff.files {
        for hunk in &file.hunks {
            for line in &hunk.lines {
                let DiffLine::Added { content, .. } = line else { continue };
                for token in content.split(|c: char| c.is_whitespace() || "(),;{}[]".contains(c)) {
                    if !looks_like_reference(token) {
                        continue;
                    }
                    if let Some(candidate) = resolve_against_repo(token, repo_files) {
                        if seen.insert(candidate.clone()) {
                            matches.push(ContextMatch {
                                file_path: candidate,
                                reason: MatchReason::DirectImport,
                                confidence: MatchReason::DirectImport.base_confidence(),
                                evidence: format!("referenced as `{token}` in {}", file.effective_path()),
                            });
                        }
                    }
                }
            }
        }
    }
    matches
}

/// Maps a dotted/namespaced token to a repo file path by suffix match on
/// the last segment, the simplest resolution that needs no symbol index.
fn resolve_against_repo(token: &str, repo_files: &[String]) -> Option<String> {
    let last_segment = token.split(['.', ':']).next_back()?;
    repo_files
        .iter()
        .find(|p| {
            p.rsplit('/')
                .next()
                .map(|fname| fname.starts_with(last_segment))
                .unwrap_or(false)
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use diff_core::{DiffHunk, FileModification};

    #[test]
    fn finds_qualified_reference_in_added_line() {
        let doc = GitDiffDocument {
            files: vec![FileModification {
                old_path: "a.rs".into(),
                new_path: "a.rs".into(),
                hunks: vec![DiffHunk {
                    old_start: 1,
                    old_count: 0,
                    new_start: 1,
                    new_count: 1,
                    lines: vec![DiffLine::Added { new_line: 1, content: "use pkg.sub.Widget;".into() }],
                }],
            }],
        };
        let repo_files = vec!["pkg/sub/Widget.rs".to_string()];
        let matches = retrieve(&doc, &repo_files);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].file_path, "pkg/sub/Widget.rs");
    }

    #[test]
    fn ignores_removed_lines() {
        let doc = GitDiffDocument {
            files: vec![FileModification {
                old_path: "a.rs".into(),
                new_path: "a.rs".into(),
                hunks: vec![DiffHunk {
                    old_start: 1,
                    old_count: 1,
                    new_start: 1,
                    new_count: 0,
                    lines: vec![DiffLine::Removed { old_line: 1, content: "use pkg.sub.Widget;".into() }],
                }],
            }],
        };
        let repo_files = vec!["pkg/sub/Widget.rs".to_string()];
        assert!(retrieve(&doc, &repo_files).is_empty());
    }
}

//! `DirectorySiblingAnalyzer`: lists siblings of each modified file's
//! directory, excluding the modified file itself; boosts confidence for
//! names sharing a prefix with the modified file (spec §4.2).

use std::collections::HashSet;

use diff_core::GitDiffDocument;
use review_model::{ContextMatch, MatchReason};

fn dir_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

fn stem_of(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.split('.').next().unwrap_or(name)
}

pub fn retrieve(diff: &GitDiffDocument, repo_files: &[String]) -> Vec<ContextMatch> {
    let modified: HashSet<&str> = diff.files.iter().map(|f| f.effective_path()).collect();
    let mut seen = HashSet::new();
    let mut matches = Vec::new();

    for file in &diff.files {
        let path = file.effective_path();
        let dir = dir_of(path);
        let stem = stem_of(path);

        for candidate in repo_files {
            if candidate == path || modified.contains(candidate.as_str()) {
                continue;
            }
            if dir_of(candidate) != dir {
                continue;
            }
            if !seen.insert(candidate.clone()) {
                continue;
            }

            let shares_prefix = stem_of(candidate).starts_with(stem) || stem.starts_with(stem_of(candidate));
            let confidence = if shares_prefix {
                (MatchReason::SiblingFile.base_confidence() + 0.2).min(1.0)
            } else {
                MatchReason::SiblingFile.base_confidence()
            };

            matches.push(ContextMatch {
                file_path: candidate.clone(),
                reason: MatchReason::SiblingFile,
                confidence,
                evidence: format!("sibling of `{path}` in `{dir}`"),
            });
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use diff_core::FileModification;

    #[test]
    fn boosts_confidence_for_shared_prefix_siblings() {
        let doc = GitDiffDocument {
            files: vec![FileModification {
                old_path: "src/widget.rs".into(),
                new_path: "src/widget.rs".into(),
                hunks: vec![],
            }],
        };
        let repo_files = vec!["src/widget_test.rs".to_string(), "src/unrelated.rs".to_string()];
        let matches = retrieve(&doc, &repo_files);
        let boosted = matches.iter().find(|m| m.file_path == "src/widget_test.rs").unwrap();
        let plain = matches.iter().find(|m| m.file_path == "src/unrelated.rs").unwrap();
        assert!(boosted.confidence > plain.confidence);
    }

    #[test]
    fn excludes_the_modified_file_itself() {
        let doc = GitDiffDocument {
            files: vec![FileModification {
                old_path: "src/widget.rs".into(),
                new_path: "src/widget.rs".into(),
                hunks: vec![],
            }],
        };
        let repo_files = vec!["src/widget.rs".to_string()];
        assert!(retrieve(&doc, &repo_files).is_empty());
    }
}

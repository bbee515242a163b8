//! `MetadataBasedContextStrategy`: wraps and deduplicates
//! `DiffFileReferenceExtractor` + `DirectorySiblingAnalyzer` (spec §4.2).

use diff_core::GitDiffDocument;
use review_model::ContextMatch;

use super::{diff_reference, directory_sibling};

pub fn retrieve(diff: &GitDiffDocument, repo_files: &[String]) -> Vec<ContextMatch> {
    let mut combined = diff_reference::retrieve(diff, repo_files);
    combined.extend(directory_sibling::retrieve(diff, repo_files));

    let mut best: std::collections::HashMap<String, ContextMatch> = std::collections::HashMap::new();
    for m in combined {
        best.entry(m.file_path.clone())
            .and_modify(|existing| {
                if m.confidence > existing.confidence {
                    *existing = m.clone();
                }
            })
            .or_insert(m);
    }
    best.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use diff_core::{DiffHunk, DiffLine, FileModification};

    #[test]
    fn dedups_overlapping_matches_keeping_highest_confidence() {
        let doc = GitDiffDocument {
            files: vec![FileModification {
                old_path: "src/a.rs".into(),
                new_path: "src/a.rs".into(),
                hunks: vec![DiffHunk {
                    old_start: 1,
                    old_count: 0,
                    new_start: 1,
                    new_count: 1,
                    lines: vec![DiffLine::Added { new_line: 1, content: "use src.b;".into() }],
                }],
            }],
        };
        let repo_files = vec!["src/b.rs".to_string()];
        let matches = retrieve(&doc, &repo_files);
        assert_eq!(matches.iter().filter(|m| m.file_path == "src/b.rs").count(), 1);
    }
}

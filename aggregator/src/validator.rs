//! C9 Diff Validator: confirms a finding's line actually appears in the diff.

use diff_core::GitDiffDocument;

const DEV_NULL: &str = "/dev/null";

/// `true` iff `file`/`line` falls inside a hunk's new-side range of some
/// `FileModification` in `diff`. Deleted files (`newPath == "/dev/null"`)
/// never match.
pub fn is_line_in_diff(diff: &GitDiffDocument, file: &str, line: u32) -> bool {
    diff.files
        .iter()
        .filter(|f| f.new_path == file || f.old_path == file)
        .any(|f| {
            if f.new_path == DEV_NULL {
                return false;
            }
            f.hunks
                .iter()
                .any(|hunk| line >= hunk.new_start && line < hunk.new_start + hunk.new_count)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use diff_core::{DiffHunk, DiffLine, FileModification};

    fn sample_diff() -> GitDiffDocument {
        GitDiffDocument {
            files: vec![
                FileModification {
                    old_path: "a.rs".into(),
                    new_path: "a.rs".into(),
                    hunks: vec![DiffHunk {
                        old_start: 10,
                        old_count: 1,
                        new_start: 10,
                        new_count: 3,
                        lines: vec![DiffLine::Added { new_line: 10, content: "x".into() }],
                    }],
                },
                FileModification { old_path: "b.rs".into(), new_path: DEV_NULL.into(), hunks: vec![] },
            ],
        }
    }

    #[test]
    fn matches_line_within_hunk_range() {
        let diff = sample_diff();
        assert!(is_line_in_diff(&diff, "a.rs", 11));
        assert!(!is_line_in_diff(&diff, "a.rs", 20));
    }

    #[test]
    fn deleted_files_never_match() {
        let diff = sample_diff();
        assert!(!is_line_in_diff(&diff, "b.rs", 1));
    }

    #[test]
    fn unknown_file_does_not_match() {
        let diff = sample_diff();
        assert!(!is_line_in_diff(&diff, "c.rs", 1));
    }
}

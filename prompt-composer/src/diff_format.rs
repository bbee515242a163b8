//! The dedicated diff formatter referenced by spec §4.3: absolute line
//! numbers via `diff_core::absolute_new_line_of`, file status markers.

use diff_core::{DiffLine, FileModification, GitDiffDocument, absolute_new_line_of};

fn file_status(file: &FileModification) -> String {
    if file.is_new_file() {
        "NEW FILE".to_string()
    } else if file.is_deletion() {
        "DELETED".to_string()
    } else if file.is_renamed() {
        format!("RENAMED FROM {}", file.old_path)
    } else {
        "MODIFIED".to_string()
    }
}

pub fn format_diff(diff: &GitDiffDocument) -> String {
    let mut out = String::new();
    for file in &diff.files {
        out.push_str(&format!("--- {} ({}) ---\n", file.effective_path(), file_status(file)));
        for hunk in &file.hunks {
            out.push_str(&format!(
                "@@ -{},{} +{},{} @@\n",
                hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
            ));
            for (idx, line) in hunk.lines.iter().enumerate() {
                let marker = line.marker();
                match line {
                    DiffLine::Removed { old_line, content } => {
                        out.push_str(&format!("{old_line:>6} {marker} {content}\n"));
                    }
                    _ => {
                        let new_line = absolute_new_line_of(hunk, idx);
                        out.push_str(&format!("{new_line:>6} {marker} {}\n", line.content()));
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use diff_core::DiffHunk;

    #[test]
    fn marks_renamed_files() {
        let doc = GitDiffDocument {
            files: vec![FileModification {
                old_path: "old.rs".into(),
                new_path: "new.rs".into(),
                hunks: vec![DiffHunk {
                    old_start: 1,
                    old_count: 1,
                    new_start: 1,
                    new_count: 1,
                    lines: vec![DiffLine::Context { old_line: 1, new_line: 1, content: "fn x() {}".into() }],
                }],
            }],
        };
        let out = format_diff(&doc);
        assert!(out.contains("RENAMED FROM old.rs"));
    }

    #[test]
    fn uses_absolute_new_line_numbers() {
        let doc = GitDiffDocument {
            files: vec![FileModification {
                old_path: "a.rs".into(),
                new_path: "a.rs".into(),
                hunks: vec![DiffHunk {
                    old_start: 5,
                    old_count: 1,
                    new_start: 5,
                    new_count: 2,
                    lines: vec![
                        DiffLine::Context { old_line: 5, new_line: 5, content: "ctx".into() },
                        DiffLine::Added { new_line: 6, content: "added".into() },
                    ],
                }],
            }],
        };
        let out = format_diff(&doc);
        assert!(out.contains("     6 + added"));
    }
}

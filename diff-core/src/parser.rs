//! Parses unified-diff text into a [`GitDiffDocument`].
//!
//! Unlike a line-scanning heuristic that tolerates malformed headers, this
//! parser enforces the invariants of the data model: a hunk whose line
//! counts don't match its declared `oldCount`/`newCount` is a hard
//! [`ParseError`], not a silently-skipped hunk.

use crate::errors::{DiffCoreResult, ParseError};
use crate::model::{DiffHunk, DiffLine, FileModification, GitDiffDocument};

/// Parses unified-diff text into the model of the data model.
pub fn parse(text: &str) -> DiffCoreResult<GitDiffDocument> {
    let mut files = Vec::new();
    let mut cur_old: Option<String> = None;
    let mut cur_new: Option<String> = None;
    let mut cur_hunks: Vec<DiffHunk> = Vec::new();
    let mut cur_hunk: Option<DiffHunk> = None;

    macro_rules! flush_hunk {
        () => {
            if let Some(h) = cur_hunk.take() {
                check_invariant(&h, cur_new.as_deref().unwrap_or("<unknown>"))?;
                cur_hunks.push(h);
            }
        };
    }
    macro_rules! flush_file {
        () => {
            flush_hunk!();
            if cur_old.is_some() || cur_new.is_some() || !cur_hunks.is_empty() {
                files.push(FileModification {
                    old_path: cur_old.take().unwrap_or_else(|| "<unknown>".to_string()),
                    new_path: cur_new.take().unwrap_or_else(|| "<unknown>".to_string()),
                    hunks: std::mem::take(&mut cur_hunks),
                });
            }
        };
    }

    for line in text.lines() {
        if line.starts_with("diff --git ") {
            flush_file!();
            cur_old = None;
            cur_new = None;
        } else if let Some(rest) = line.strip_prefix("--- ") {
            if cur_hunk.is_some() || !cur_hunks.is_empty() {
                flush_file!();
            }
            cur_old = Some(strip_ab_prefix(rest, "a/"));
        } else if let Some(rest) = line.strip_prefix("+++ ") {
            cur_new = Some(strip_ab_prefix(rest, "b/"));
        } else if let Some(rest) = line.strip_prefix("@@") {
            flush_hunk!();
            let header = parse_hunk_header(rest)?;
            cur_hunk = Some(DiffHunk {
                old_start: header.0,
                old_count: header.1,
                new_start: header.2,
                new_count: header.3,
                lines: Vec::new(),
            });
        } else if line.starts_with("\\ No newline") {
            // marker line, not content
        } else if let Some(hunk) = cur_hunk.as_mut() {
            push_hunk_line(hunk, line);
        }
        // other header lines (index, rename from/to, Binary files ... differ) are ignored
    }
    flush_file!();

    Ok(GitDiffDocument { files })
}

fn check_invariant(hunk: &DiffHunk, path: &str) -> DiffCoreResult<()> {
    if !hunk.satisfies_count_invariant() {
        return Err(ParseError::CountMismatch {
            path: path.to_string(),
            old_start: hunk.old_start,
            old_count: hunk.old_count,
            reason: format!(
                "context={} added={} deleted={} newCount={}",
                hunk.context_lines(),
                hunk.added_lines(),
                hunk.deleted_lines(),
                hunk.new_count
            ),
        });
    }
    Ok(())
}

fn strip_ab_prefix(path: &str, prefix: &str) -> String {
    let path = path.split('\t').next().unwrap_or(path).trim();
    path.strip_prefix(prefix).unwrap_or(path).to_string()
}

fn push_hunk_line(hunk: &mut DiffHunk, line: &str) {
    let old_line = hunk.old_start + hunk.lines.iter().filter(|l| !matches!(l, DiffLine::Added { .. })).count() as u32;
    let new_line = hunk.new_start + hunk.lines.iter().filter(|l| !matches!(l, DiffLine::Removed { .. })).count() as u32;

    if let Some(content) = line.strip_prefix('+') {
        hunk.lines.push(DiffLine::Added { new_line, content: content.to_string() });
    } else if let Some(content) = line.strip_prefix('-') {
        hunk.lines.push(DiffLine::Removed { old_line, content: content.to_string() });
    } else {
        let content = line.strip_prefix(' ').unwrap_or(line).to_string();
        hunk.lines.push(DiffLine::Context { old_line, new_line, content });
    }
}

/// `(old_start, old_count, new_start, new_count)`
fn parse_hunk_header(rest: &str) -> DiffCoreResult<(u32, u32, u32, u32)> {
    let s = rest.trim().trim_end_matches('@').trim();
    let parts: Vec<&str> = s.split_whitespace().collect();
    if parts.len() < 2 {
        return Err(ParseError::InvalidHunkHeader(s.to_string()));
    }
    let old_part = parts[0].strip_prefix('-').ok_or_else(|| ParseError::InvalidHunkHeader(s.to_string()))?;
    let new_part = parts[1].strip_prefix('+').ok_or_else(|| ParseError::InvalidHunkHeader(s.to_string()))?;
    let (old_start, old_count) = split_range(old_part)?;
    let (new_start, new_count) = split_range(new_part)?;
    Ok((old_start, old_count, new_start, new_count))
}

fn split_range(s: &str) -> DiffCoreResult<(u32, u32)> {
    let mut it = s.split(',');
    let start = it.next().ok_or_else(|| ParseError::InvalidHunkHeader(s.to_string()))?;
    // unified-diff convention: an omitted count means exactly one line.
    let count = it.next();

    let start_n: i64 = start.parse().map_err(|_| ParseError::InvalidHunkHeader(s.to_string()))?;
    if start_n < 0 {
        return Err(ParseError::NegativeCount(s.to_string()));
    }

    let count_n: i64 = match count {
        Some(c) => c.parse().map_err(|_| ParseError::InvalidHunkHeader(s.to_string()))?,
        None => 1,
    };
    if count_n < 0 {
        return Err(ParseError::NegativeCount(s.to_string()));
    }

    Ok((start_n as u32, count_n as u32))
}

/// Sole source of line-number truth: yields the file's new-side line number
/// for `hunk.lines[line_index]`, counting from `hunk.new_start` and skipping
/// `'-'` lines.
pub fn absolute_new_line_of(hunk: &DiffHunk, line_index: usize) -> u32 {
    let skipped = hunk.lines[..line_index]
        .iter()
        .filter(|l| !matches!(l, DiffLine::Removed { .. }))
        .count() as u32;
    hunk.new_start + skipped
}

/// Renders a [`GitDiffDocument`] back to unified-diff text (R2 round trip).
pub fn to_unified_string(doc: &GitDiffDocument) -> String {
    let mut out = String::new();
    for file in &doc.files {
        out.push_str(&format!("--- {}\n", file.old_path));
        out.push_str(&format!("+++ {}\n", file.new_path));
        for hunk in &file.hunks {
            out.push_str(&format!(
                "@@ -{},{} +{},{} @@\n",
                hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
            ));
            for line in &hunk.lines {
                out.push(line.marker());
                out.push_str(line.content());
                out.push('\n');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "--- a/src/lib.rs\n+++ b/src/lib.rs\n@@ -1,3 +1,4 @@\n fn a() {}\n+fn b() {}\n fn c() {}\n fn d() {}\n";

    #[test]
    fn parses_simple_hunk() {
        let doc = parse(SAMPLE).unwrap();
        assert_eq!(doc.files.len(), 1);
        let hunk = &doc.files[0].hunks[0];
        assert!(hunk.satisfies_count_invariant());
    }

    #[test]
    fn absolute_new_line_of_skips_removed() {
        let mut hunk = DiffHunk { old_start: 10, old_count: 2, new_start: 10, new_count: 1, lines: vec![
            DiffLine::Removed { old_line: 10, content: "x".into() },
            DiffLine::Context { old_line: 11, new_line: 10, content: "y".into() },
        ] };
        hunk.new_count = 1;
        assert_eq!(absolute_new_line_of(&hunk, 1), 10);
    }

    #[test]
    fn rejects_negative_counts() {
        let err = parse_hunk_header(" -1,-5 +1,7 @@").unwrap_err();
        assert!(matches!(err, ParseError::NegativeCount(_)));
    }

    #[test]
    fn round_trips_up_to_reconstruction() {
        let doc = parse(SAMPLE).unwrap();
        let rendered = to_unified_string(&doc);
        let doc2 = parse(&rendered).unwrap();
        assert_eq!(doc.files.len(), doc2.files.len());
        assert_eq!(doc.files[0].hunks.len(), doc2.files[0].hunks.len());
    }

    #[test]
    fn detects_new_and_deleted_files() {
        let diff = "--- /dev/null\n+++ b/new.txt\n@@ -0,0 +1,1 @@\n+hello\n";
        let doc = parse(diff).unwrap();
        assert!(doc.files[0].is_new_file());

        let diff = "--- a/old.txt\n+++ /dev/null\n@@ -1,1 +0,0 @@\n-bye\n";
        let doc = parse(diff).unwrap();
        assert!(doc.files[0].is_deletion());
    }
}

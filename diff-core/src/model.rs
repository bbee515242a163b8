//! Unified-diff data model.
//!
//! A `GitDiffDocument` is the parsed shape of a unified diff: an ordered
//! sequence of per-file modifications, each carrying the hunks that changed
//! it. This is the sole representation every downstream component (context
//! retrieval, prompt composition, diff validation) reads from.

use serde::{Deserialize, Serialize};

/// New-file and deletion markers used by providers that emit unified diffs.
pub const DEV_NULL: &str = "/dev/null";

/// One line inside a hunk, tagged by its role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DiffLine {
    /// `'+'` line; only exists on the new side.
    Added { new_line: u32, content: String },
    /// `'-'` line; only exists on the old side.
    Removed { old_line: u32, content: String },
    /// `' '` line; exists on both sides.
    Context { old_line: u32, new_line: u32, content: String },
}

impl DiffLine {
    pub fn content(&self) -> &str {
        match self {
            DiffLine::Added { content, .. } => content,
            DiffLine::Removed { content, .. } => content,
            DiffLine::Context { content, .. } => content,
        }
    }

    pub fn marker(&self) -> char {
        match self {
            DiffLine::Added { .. } => '+',
            DiffLine::Removed { .. } => '-',
            DiffLine::Context { .. } => ' ',
        }
    }
}

/// A contiguous block of changed lines, with its `@@ -a,b +c,d @@` header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    pub fn context_lines(&self) -> u32 {
        self.lines.iter().filter(|l| matches!(l, DiffLine::Context { .. })).count() as u32
    }

    pub fn added_lines(&self) -> u32 {
        self.lines.iter().filter(|l| matches!(l, DiffLine::Added { .. })).count() as u32
    }

    pub fn deleted_lines(&self) -> u32 {
        self.lines.iter().filter(|l| matches!(l, DiffLine::Removed { .. })).count() as u32
    }

    /// P2: context+deleted == oldCount and context+added == newCount.
    pub fn satisfies_count_invariant(&self) -> bool {
        self.context_lines() + self.deleted_lines() == self.old_count
            && self.context_lines() + self.added_lines() == self.new_count
    }
}

/// A single file touched by the change request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileModification {
    pub old_path: String,
    pub new_path: String,
    pub hunks: Vec<DiffHunk>,
}

impl FileModification {
    pub fn is_new_file(&self) -> bool {
        self.old_path == DEV_NULL
    }

    pub fn is_deletion(&self) -> bool {
        self.new_path == DEV_NULL
    }

    pub fn is_renamed(&self) -> bool {
        !self.is_new_file() && !self.is_deletion() && self.old_path != self.new_path
    }

    /// The path findings and context strategies should key on.
    pub fn effective_path(&self) -> &str {
        if self.is_deletion() {
            &self.old_path
        } else {
            &self.new_path
        }
    }
}

/// The parsed shape of an entire unified diff.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GitDiffDocument {
    pub files: Vec<FileModification>,
}

impl GitDiffDocument {
    pub fn total_lines(&self) -> usize {
        self.files.iter().map(|f| f.hunks.iter().map(|h| h.lines.len()).sum::<usize>()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.iter().all(|f| f.hunks.is_empty())
    }

    pub fn file_by_path(&self, path: &str) -> Option<&FileModification> {
        self.files
            .iter()
            .find(|f| f.new_path == path || f.old_path == path)
    }
}

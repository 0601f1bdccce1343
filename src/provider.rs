//! Data-provider contract between the panels and a git backend

use anyhow::Result;

/// Change kind of a file, as a single status letter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Added,
    Modified,
    Deleted,
    Renamed,
    Untracked,
    Copied,
    TypeChange,
}

impl StatusCode {
    pub fn letter(&self) -> char {
        match self {
            StatusCode::Added => 'A',
            StatusCode::Modified => 'M',
            StatusCode::Deleted => 'D',
            StatusCode::Renamed => 'R',
            StatusCode::Untracked => 'U',
            StatusCode::Copied => 'C',
            StatusCode::TypeChange => 'T',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        Some(match letter {
            'A' => StatusCode::Added,
            'M' => StatusCode::Modified,
            'D' => StatusCode::Deleted,
            'R' => StatusCode::Renamed,
            'U' => StatusCode::Untracked,
            'C' => StatusCode::Copied,
            'T' => StatusCode::TypeChange,
            _ => return None,
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusCode::Added => "Added",
            StatusCode::Modified => "Modified",
            StatusCode::Deleted => "Deleted",
            StatusCode::Renamed => "Renamed",
            StatusCode::Untracked => "Untracked",
            StatusCode::Copied => "Copied",
            StatusCode::TypeChange => "Type changed",
        }
    }
}

/// A changed file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub status: String,
    pub code: StatusCode,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, code: StatusCode) -> Self {
        Self {
            path: path.into(),
            status: code.label().to_string(),
            code,
        }
    }
}

/// Working directory status
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkingDirStatus {
    pub staged: Vec<FileEntry>,
    pub unstaged: Vec<FileEntry>,
}

impl WorkingDirStatus {
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty()
    }

    pub fn total_files(&self) -> usize {
        self.staged.len() + self.unstaged.len()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.staged.iter().chain(&self.unstaged).any(|f| f.path == path)
    }
}

/// Information about a single commit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitEntry {
    pub id: String,
    pub short_id: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp_seconds: i64,
    pub parent_ids: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Addition,
    Deletion,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: LineKind,
    pub content: String,
    pub old_lineno: Option<u32>,
    pub new_lineno: Option<u32>,
}

/// A contiguous block of changed lines
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_lines, self.new_start, self.new_lines
        )
    }
}

/// The diff of one file
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileDiff {
    pub file_path: String,
    pub hunks: Vec<DiffHunk>,
}

impl FileDiff {
    /// (additions, deletions)
    pub fn stats(&self) -> (usize, usize) {
        let lines = self.hunks.iter().flat_map(|h| &h.lines);
        lines.fold((0, 0), |(add, del), line| match line.kind {
            LineKind::Addition => (add + 1, del),
            LineKind::Deletion => (add, del + 1),
            LineKind::Context => (add, del),
        })
    }
}

/// Backend queried by the file-list, commit-list and diff panels.
///
/// Calls run on worker threads, hence `Send + Sync`.
pub trait RepoProvider: Send + Sync {
    fn status(&self, repo_path: &str) -> Result<WorkingDirStatus>;
    fn commits(&self, repo_path: &str, limit: usize, offset: usize) -> Result<Vec<CommitEntry>>;
    /// Working-copy diff of one file
    fn diff(&self, repo_path: &str, file_path: &str) -> Result<FileDiff>;
    /// Diff of one file in a commit against its first parent
    fn commit_file_diff(&self, repo_path: &str, commit_id: &str, file_path: &str)
    -> Result<FileDiff>;
    fn commit_changes(&self, repo_path: &str, commit_id: &str) -> Result<Vec<FileEntry>>;
    fn stage_file(&self, repo_path: &str, file_path: &str) -> Result<()>;
    fn unstage_file(&self, repo_path: &str, file_path: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_letters() {
        for letter in ['A', 'M', 'D', 'R', 'U', 'C', 'T'] {
            let code = StatusCode::from_letter(letter).unwrap();
            assert_eq!(code.letter(), letter);
        }
        assert_eq!(StatusCode::from_letter('?'), None);
        assert_eq!(FileEntry::new("a", StatusCode::Untracked).status, "Untracked");
    }

    #[test]
    fn test_diff_stats_and_header() {
        let line = |kind| DiffLine {
            kind,
            content: String::new(),
            old_lineno: None,
            new_lineno: None,
        };
        let diff = FileDiff {
            file_path: "a.rs".to_string(),
            hunks: vec![DiffHunk {
                old_start: 1,
                old_lines: 7,
                new_start: 1,
                new_lines: 8,
                lines: vec![
                    line(LineKind::Context),
                    line(LineKind::Addition),
                    line(LineKind::Addition),
                    line(LineKind::Deletion),
                ],
            }],
        };
        assert_eq!(diff.stats(), (2, 1));
        assert_eq!(diff.hunks[0].header(), "@@ -1,7 +1,8 @@");
    }
}

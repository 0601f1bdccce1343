use anyhow::{Context, Result};
use git2::{Commit, Delta, Diff, DiffFormat, DiffOptions, Oid, Repository, Status, StatusOptions, Tree};
use std::path::{Path, PathBuf};

use crate::provider::{
    CommitEntry, DiffHunk, DiffLine, FileDiff, FileEntry, LineKind, RepoProvider, StatusCode,
    WorkingDirStatus,
};

/// [`RepoProvider`] backed by libgit2. Each call opens the repository, so the
/// provider itself holds no handles and can be shared across worker threads.
#[derive(Clone, Copy, Debug, Default)]
pub struct GitProvider;

impl GitProvider {
    pub fn new() -> Self {
        Self
    }

    fn open(repo_path: &str) -> Result<Repository> {
        Repository::open(repo_path)
            .with_context(|| format!("Failed to open repository at {:?}", repo_path))
    }
}

/// Find the repository root containing `path`
pub fn discover_root(path: impl AsRef<Path>) -> Result<String> {
    let repo = Repository::discover(path.as_ref())
        .with_context(|| format!("No repository found at {:?}", path.as_ref()))?;
    let root = repo
        .workdir()
        .unwrap_or_else(|| repo.path())
        .to_string_lossy()
        .trim_end_matches('/')
        .to_string();
    Ok(root)
}

/// (working directory, git directory) of the repository at `repo_path`
pub fn repo_dirs(repo_path: &str) -> Result<(PathBuf, PathBuf)> {
    let repo = GitProvider::open(repo_path)?;
    let git_dir = repo.path().to_path_buf();
    let workdir = repo
        .workdir()
        .map(Path::to_path_buf)
        .with_context(|| format!("Repository at {:?} has no working directory", repo_path))?;
    Ok((workdir, git_dir))
}

fn commit_entry(commit: &Commit) -> CommitEntry {
    let id = commit.id().to_string();
    let author = commit.author();
    CommitEntry {
        short_id: id[..7].to_string(),
        id,
        message: commit.message().unwrap_or("").trim_end().to_string(),
        author_name: author.name().unwrap_or("Unknown").to_string(),
        author_email: author.email().unwrap_or("").to_string(),
        timestamp_seconds: commit.time().seconds(),
        parent_ids: commit.parent_ids().map(|p| p.to_string()).collect(),
    }
}

fn index_code(status: Status) -> StatusCode {
    if status.contains(Status::INDEX_NEW) {
        StatusCode::Added
    } else if status.contains(Status::INDEX_MODIFIED) {
        StatusCode::Modified
    } else if status.contains(Status::INDEX_DELETED) {
        StatusCode::Deleted
    } else if status.contains(Status::INDEX_RENAMED) {
        StatusCode::Renamed
    } else {
        StatusCode::TypeChange
    }
}

fn worktree_code(status: Status) -> StatusCode {
    if status.contains(Status::WT_NEW) {
        StatusCode::Untracked
    } else if status.contains(Status::WT_MODIFIED) {
        StatusCode::Modified
    } else if status.contains(Status::WT_DELETED) {
        StatusCode::Deleted
    } else if status.contains(Status::WT_RENAMED) {
        StatusCode::Renamed
    } else {
        StatusCode::TypeChange
    }
}

fn delta_code(delta: Delta) -> Option<StatusCode> {
    Some(match delta {
        Delta::Added => StatusCode::Added,
        Delta::Modified => StatusCode::Modified,
        Delta::Deleted => StatusCode::Deleted,
        Delta::Renamed => StatusCode::Renamed,
        Delta::Copied => StatusCode::Copied,
        Delta::Typechange => StatusCode::TypeChange,
        Delta::Untracked => StatusCode::Untracked,
        _ => return None,
    })
}

/// Tree of the commit's first parent, `None` for a root commit
fn parent_tree<'r>(commit: &Commit<'r>) -> Result<Option<Tree<'r>>> {
    if commit.parent_count() == 0 {
        return Ok(None);
    }
    let parent = commit.parent(0).context("Failed to get parent commit")?;
    Ok(Some(parent.tree().context("Failed to get parent tree")?))
}

fn find_commit<'r>(repo: &'r Repository, commit_id: &str) -> Result<Commit<'r>> {
    let oid = Oid::from_str(commit_id).with_context(|| format!("Invalid commit id {commit_id:?}"))?;
    repo.find_commit(oid)
        .with_context(|| format!("Failed to find commit {commit_id}"))
}

/// Collect the hunks of a patch. File headers and binary markers are skipped.
fn collect_hunks(diff: &Diff) -> Result<Vec<DiffHunk>> {
    let mut hunks: Vec<DiffHunk> = Vec::new();

    diff.print(DiffFormat::Patch, |_delta, hunk, line| {
        let kind = match line.origin() {
            'H' => {
                if let Some(hunk) = hunk {
                    hunks.push(DiffHunk {
                        old_start: hunk.old_start(),
                        old_lines: hunk.old_lines(),
                        new_start: hunk.new_start(),
                        new_lines: hunk.new_lines(),
                        lines: Vec::new(),
                    });
                }
                return true;
            }
            '+' | '>' => LineKind::Addition,
            '-' | '<' => LineKind::Deletion,
            ' ' | '=' => LineKind::Context,
            _ => return true,
        };

        if let Some(last) = hunks.last_mut() {
            last.lines.push(DiffLine {
                kind,
                content: String::from_utf8_lossy(line.content())
                    .trim_end_matches(['\n', '\r'])
                    .to_string(),
                old_lineno: line.old_lineno(),
                new_lineno: line.new_lineno(),
            });
        }
        true
    })
    .context("Failed to print diff")?;

    Ok(hunks)
}

impl RepoProvider for GitProvider {
    fn status(&self, repo_path: &str) -> Result<WorkingDirStatus> {
        let repo = Self::open(repo_path)?;
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);

        let statuses = repo
            .statuses(Some(&mut opts))
            .context("Failed to get status")?;

        let mut staged = Vec::new();
        let mut unstaged = Vec::new();

        for entry in statuses.iter() {
            let path = entry.path().unwrap_or("").to_string();
            let status = entry.status();

            if status.intersects(
                Status::INDEX_NEW
                    | Status::INDEX_MODIFIED
                    | Status::INDEX_DELETED
                    | Status::INDEX_RENAMED
                    | Status::INDEX_TYPECHANGE,
            ) {
                staged.push(FileEntry::new(path.clone(), index_code(status)));
            }

            if status.intersects(
                Status::WT_NEW
                    | Status::WT_MODIFIED
                    | Status::WT_DELETED
                    | Status::WT_RENAMED
                    | Status::WT_TYPECHANGE,
            ) {
                unstaged.push(FileEntry::new(path, worktree_code(status)));
            }
        }

        Ok(WorkingDirStatus { staged, unstaged })
    }

    fn commits(&self, repo_path: &str, limit: usize, offset: usize) -> Result<Vec<CommitEntry>> {
        let repo = Self::open(repo_path)?;
        if repo.head().is_err() {
            // Unborn branch: no history yet
            return Ok(Vec::new());
        }

        let mut revwalk = repo.revwalk().context("Failed to create revwalk")?;
        // Changing the sorting resets the walk, so sort before pushing HEAD
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;
        revwalk.push_head().context("Failed to push HEAD to revwalk")?;

        let commits = revwalk
            .skip(offset)
            .take(limit)
            .filter_map(|oid| {
                let oid = oid.ok()?;
                let commit = repo.find_commit(oid).ok()?;
                Some(commit_entry(&commit))
            })
            .collect();

        Ok(commits)
    }

    fn diff(&self, repo_path: &str, file_path: &str) -> Result<FileDiff> {
        let repo = Self::open(repo_path)?;
        let head_tree = match repo.head() {
            Ok(head) => Some(head.peel_to_tree().context("Failed to get HEAD tree")?),
            Err(_) => None,
        };

        let mut opts = DiffOptions::new();
        opts.pathspec(file_path)
            .disable_pathspec_match(true)
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .show_untracked_content(true);

        let diff = repo
            .diff_tree_to_workdir_with_index(head_tree.as_ref(), Some(&mut opts))
            .context("Failed to diff working copy")?;

        Ok(FileDiff {
            file_path: file_path.to_string(),
            hunks: collect_hunks(&diff)?,
        })
    }

    fn commit_file_diff(
        &self,
        repo_path: &str,
        commit_id: &str,
        file_path: &str,
    ) -> Result<FileDiff> {
        let repo = Self::open(repo_path)?;
        let commit = find_commit(&repo, commit_id)?;
        let tree = commit.tree().context("Failed to get commit tree")?;
        let parent = parent_tree(&commit)?;

        let mut opts = DiffOptions::new();
        opts.pathspec(file_path)
            .disable_pathspec_match(true)
            .include_typechange(true);

        let diff = repo
            .diff_tree_to_tree(parent.as_ref(), Some(&tree), Some(&mut opts))
            .context("Failed to diff commit")?;

        Ok(FileDiff {
            file_path: file_path.to_string(),
            hunks: collect_hunks(&diff)?,
        })
    }

    fn commit_changes(&self, repo_path: &str, commit_id: &str) -> Result<Vec<FileEntry>> {
        let repo = Self::open(repo_path)?;
        let commit = find_commit(&repo, commit_id)?;
        let tree = commit.tree().context("Failed to get commit tree")?;
        let parent = parent_tree(&commit)?;

        let diff = repo
            .diff_tree_to_tree(parent.as_ref(), Some(&tree), None)
            .context("Failed to diff commit")?;

        let files = diff
            .deltas()
            .filter_map(|delta| {
                let code = delta_code(delta.status())?;
                let path = delta.new_file().path().or_else(|| delta.old_file().path())?;
                Some(FileEntry::new(path.to_string_lossy(), code))
            })
            .collect();

        Ok(files)
    }

    fn stage_file(&self, repo_path: &str, file_path: &str) -> Result<()> {
        let repo = Self::open(repo_path)?;
        let mut index = repo.index().context("Failed to get index")?;
        let on_disk = repo
            .workdir()
            .map(|dir| dir.join(file_path).exists())
            .unwrap_or(false);

        if on_disk {
            index.add_path(Path::new(file_path)).context("Failed to stage file")?;
        } else {
            index
                .remove_path(Path::new(file_path))
                .context("Failed to stage deletion")?;
        }
        index.write().context("Failed to write index")?;
        Ok(())
    }

    fn unstage_file(&self, repo_path: &str, file_path: &str) -> Result<()> {
        let repo = Self::open(repo_path)?;
        match repo.head() {
            Ok(head) => {
                let head_commit = head.peel_to_commit().context("Failed to get HEAD commit")?;
                repo.reset_default(Some(head_commit.as_object()), [Path::new(file_path)])
                    .context("Failed to unstage file")?;
            }
            Err(_) => {
                // Nothing committed yet: unstaging means dropping the index entry
                let mut index = repo.index().context("Failed to get index")?;
                index
                    .remove_path(Path::new(file_path))
                    .context("Failed to unstage file")?;
                index.write().context("Failed to write index")?;
            }
        }
        Ok(())
    }
}

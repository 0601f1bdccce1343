//! File-list, diff and commit-list panels
//!
//! Each panel keeps the key of the selection it last fetched for and only
//! refetches when that key changes (or on an explicit refresh after a
//! filesystem change). Results arrive through a [`Fetcher`], so a slow fetch
//! for an earlier selection is dropped instead of displayed.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::fetch::{FetchError, FetchKey, Fetcher};
use crate::layout_state::DiffViewMode;
use crate::provider::{
    CommitEntry, DiffLine, FileDiff, FileEntry, LineKind, RepoProvider, WorkingDirStatus,
};
use crate::view_state::ViewMode;

pub type SharedProvider = Arc<dyn RepoProvider>;

/// What a panel currently displays
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PanelContent<T> {
    /// Nothing selected
    Empty,
    Loading,
    Ready(T),
    /// The provider call failed; shown in place of the content
    Failed(String),
}

impl<T> Default for PanelContent<T> {
    fn default() -> Self {
        PanelContent::Empty
    }
}

impl<T> PanelContent<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, PanelContent::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            PanelContent::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            PanelContent::Failed(message) => Some(message),
            _ => None,
        }
    }

    fn from_result(panel: &str, result: Result<T, FetchError>) -> Self {
        match result {
            Ok(value) => PanelContent::Ready(value),
            Err(e) => {
                tracing::warn!(panel, error = %e, "fetch failed");
                PanelContent::Failed(e.0)
            }
        }
    }
}

/// Files listed for the current mode
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileList {
    WorkingCopy(WorkingDirStatus),
    Commit { id: String, files: Vec<FileEntry> },
}

impl FileList {
    pub fn files(&self) -> Vec<&FileEntry> {
        match self {
            FileList::WorkingCopy(status) => status.staged.iter().chain(&status.unstaged).collect(),
            FileList::Commit { files, .. } => files.iter().collect(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files().iter().any(|f| f.path == path)
    }
}

#[derive(Clone, Copy, Debug)]
enum IndexOp {
    Stage,
    Unstage,
}

impl IndexOp {
    fn verb(self) -> &'static str {
        match self {
            IndexOp::Stage => "stage",
            IndexOp::Unstage => "unstage",
        }
    }
}

/// Changed files: the working-directory status, or a commit's changes
pub struct FileListPanel {
    provider: SharedProvider,
    fetcher: Fetcher<FetchKey, FileList>,
    key: Option<FetchKey>,
    content: PanelContent<FileList>,
}

impl FileListPanel {
    pub fn new(provider: SharedProvider) -> Self {
        Self {
            provider,
            fetcher: Fetcher::new("file-list"),
            key: None,
            content: PanelContent::Empty,
        }
    }

    pub fn content(&self) -> &PanelContent<FileList> {
        &self.content
    }

    pub fn key(&self) -> Option<&FetchKey> {
        self.key.as_ref()
    }

    /// Whether the list shows the working copy, the only mode that allows
    /// staging
    pub fn is_working_copy(&self) -> bool {
        matches!(self.key, Some(FetchKey { mode: ViewMode::WorkingCopy, .. }))
    }

    /// Point the panel at a selection. Returns `true` if a fetch was issued.
    pub fn sync(&mut self, repo_path: &str, mode: Option<ViewMode>) -> bool {
        let key = mode.map(|mode| FetchKey::new(repo_path, mode, None));
        if key == self.key {
            return false;
        }
        self.key = key;
        self.fetch(true);
        self.key.is_some()
    }

    /// Refetch the current selection, keeping the shown content meanwhile.
    pub fn refresh(&mut self) {
        self.fetch(false);
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.fetch(true);
    }

    fn fetch(&mut self, show_loading: bool) {
        let Some(key) = self.key.clone() else {
            self.fetcher.cancel();
            self.content = PanelContent::Empty;
            return;
        };
        if show_loading || self.content.ready().is_none() {
            self.content = PanelContent::Loading;
        }
        let provider = Arc::clone(&self.provider);
        let FetchKey { repo_path, mode, .. } = key.clone();
        self.fetcher.request(key, move || match mode {
            ViewMode::WorkingCopy => provider.status(&repo_path).map(FileList::WorkingCopy),
            ViewMode::Commit(id) => {
                let files = provider.commit_changes(&repo_path, &id)?;
                Ok(FileList::Commit { id, files })
            }
        });
    }

    /// Apply a finished fetch. Returns `true` if the content changed.
    pub fn poll(&mut self) -> bool {
        match self.fetcher.poll() {
            Some((_, result)) => {
                self.content = PanelContent::from_result("file-list", result);
                true
            }
            None => false,
        }
    }

    pub fn wait(&mut self, timeout: Duration) -> bool {
        match self.fetcher.wait(timeout) {
            Some((_, result)) => {
                self.content = PanelContent::from_result("file-list", result);
                true
            }
            None => false,
        }
    }

    /// Stage `file`. Refused (`Ok(false)`) unless showing the working copy.
    pub fn stage(&mut self, file: &str) -> Result<bool> {
        self.apply_index_op(IndexOp::Stage, file)
    }

    /// Unstage `file`. Refused (`Ok(false)`) unless showing the working copy.
    pub fn unstage(&mut self, file: &str) -> Result<bool> {
        self.apply_index_op(IndexOp::Unstage, file)
    }

    fn apply_index_op(&mut self, op: IndexOp, file: &str) -> Result<bool> {
        let Some(key) = self.key.as_ref().filter(|_| self.is_working_copy()) else {
            tracing::debug!(op = op.verb(), file, "index change refused outside the working copy");
            return Ok(false);
        };
        match op {
            IndexOp::Stage => self.provider.stage_file(&key.repo_path, file),
            IndexOp::Unstage => self.provider.unstage_file(&key.repo_path, file),
        }
        .with_context(|| format!("Failed to {} {file}", op.verb()))?;
        self.refresh();
        Ok(true)
    }
}

/// One row of a side-by-side diff
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SplitRow {
    Hunk(String),
    Lines {
        old: Option<DiffLine>,
        new: Option<DiffLine>,
    },
}

/// Pair old and new lines for split display. Within each change block the
/// n-th deletion sits next to the n-th addition; context lines appear on
/// both sides.
pub fn split_rows(diff: &FileDiff) -> Vec<SplitRow> {
    let mut rows = Vec::new();
    for hunk in &diff.hunks {
        rows.push(SplitRow::Hunk(hunk.header()));
        let mut deletions: Vec<&DiffLine> = Vec::new();
        let mut additions: Vec<&DiffLine> = Vec::new();
        for line in &hunk.lines {
            match line.kind {
                LineKind::Deletion => {
                    if !additions.is_empty() {
                        flush_block(&mut rows, &mut deletions, &mut additions);
                    }
                    deletions.push(line);
                }
                LineKind::Addition => additions.push(line),
                LineKind::Context => {
                    flush_block(&mut rows, &mut deletions, &mut additions);
                    rows.push(SplitRow::Lines {
                        old: Some(line.clone()),
                        new: Some(line.clone()),
                    });
                }
            }
        }
        flush_block(&mut rows, &mut deletions, &mut additions);
    }
    rows
}

fn flush_block(rows: &mut Vec<SplitRow>, deletions: &mut Vec<&DiffLine>, additions: &mut Vec<&DiffLine>) {
    let len = deletions.len().max(additions.len());
    for i in 0..len {
        rows.push(SplitRow::Lines {
            old: deletions.get(i).map(|l| (*l).clone()),
            new: additions.get(i).map(|l| (*l).clone()),
        });
    }
    deletions.clear();
    additions.clear();
}

/// Diff of the selected file in the current mode
pub struct DiffPanel {
    provider: SharedProvider,
    fetcher: Fetcher<FetchKey, FileDiff>,
    key: Option<FetchKey>,
    content: PanelContent<FileDiff>,
    view_mode: DiffViewMode,
}

impl DiffPanel {
    pub fn new(provider: SharedProvider, view_mode: DiffViewMode) -> Self {
        Self {
            provider,
            fetcher: Fetcher::new("diff"),
            key: None,
            content: PanelContent::Empty,
            view_mode,
        }
    }

    pub fn content(&self) -> &PanelContent<FileDiff> {
        &self.content
    }

    pub fn key(&self) -> Option<&FetchKey> {
        self.key.as_ref()
    }

    pub fn view_mode(&self) -> DiffViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, view_mode: DiffViewMode) {
        self.view_mode = view_mode;
    }

    /// Rows for split mode, empty unless a diff is loaded
    pub fn split_rows(&self) -> Vec<SplitRow> {
        self.content.ready().map(split_rows).unwrap_or_default()
    }

    /// Point the panel at a selection. No file or no mode shows nothing.
    pub fn sync(&mut self, repo_path: &str, mode: Option<ViewMode>, file: Option<&str>) -> bool {
        let key = match (mode, file) {
            (Some(mode), Some(file)) => Some(FetchKey::new(repo_path, mode, Some(file.to_string()))),
            _ => None,
        };
        if key == self.key {
            return false;
        }
        self.key = key;
        self.fetch(true);
        self.key.is_some()
    }

    pub fn refresh(&mut self) {
        self.fetch(false);
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.fetch(true);
    }

    fn fetch(&mut self, show_loading: bool) {
        let Some(key) = self.key.clone() else {
            self.fetcher.cancel();
            self.content = PanelContent::Empty;
            return;
        };
        if show_loading || self.content.ready().is_none() {
            self.content = PanelContent::Loading;
        }
        let provider = Arc::clone(&self.provider);
        let FetchKey { repo_path, mode, file } = key.clone();
        self.fetcher.request(key, move || {
            let file = file.context("Diff requested without a file")?;
            match mode {
                ViewMode::WorkingCopy => provider.diff(&repo_path, &file),
                ViewMode::Commit(id) => provider.commit_file_diff(&repo_path, &id, &file),
            }
        });
    }

    pub fn poll(&mut self) -> bool {
        match self.fetcher.poll() {
            Some((_, result)) => {
                self.content = PanelContent::from_result("diff", result);
                true
            }
            None => false,
        }
    }

    pub fn wait(&mut self, timeout: Duration) -> bool {
        match self.fetcher.wait(timeout) {
            Some((_, result)) => {
                self.content = PanelContent::from_result("diff", result);
                true
            }
            None => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct PageKey {
    repo_path: String,
    offset: usize,
}

/// A row of the history list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitRow<'a> {
    /// The uncommitted changes, always first
    WorkingCopy,
    Commit(&'a CommitEntry),
}

/// Paged commit history
pub struct CommitListPanel {
    provider: SharedProvider,
    page_size: usize,
    repo_path: Option<String>,
    fetcher: Fetcher<PageKey, Vec<CommitEntry>>,
    content: PanelContent<Vec<CommitEntry>>,
    exhausted: bool,
}

impl CommitListPanel {
    pub fn new(provider: SharedProvider, page_size: usize) -> Self {
        Self {
            provider,
            page_size: page_size.max(1),
            repo_path: None,
            fetcher: Fetcher::new("commit-list"),
            content: PanelContent::Empty,
            exhausted: false,
        }
    }

    pub fn content(&self) -> &PanelContent<Vec<CommitEntry>> {
        &self.content
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn commits(&self) -> &[CommitEntry] {
        self.content.ready().map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether another page may exist
    pub fn has_more(&self) -> bool {
        !self.exhausted
    }

    pub fn is_loading(&self) -> bool {
        self.fetcher.is_loading()
    }

    /// The working-copy row followed by the loaded commits
    pub fn rows(&self) -> Vec<CommitRow<'_>> {
        std::iter::once(CommitRow::WorkingCopy)
            .chain(self.commits().iter().map(CommitRow::Commit))
            .collect()
    }

    /// Show the history of `repo_path`, loading the first page on change
    pub fn sync(&mut self, repo_path: &str) -> bool {
        if self.repo_path.as_deref() == Some(repo_path) {
            return false;
        }
        self.repo_path = Some(repo_path.to_string());
        self.exhausted = false;
        self.content = PanelContent::Loading;
        self.request(0);
        true
    }

    pub fn clear(&mut self) {
        self.repo_path = None;
        self.exhausted = false;
        self.fetcher.cancel();
        self.content = PanelContent::Empty;
    }

    /// Reload the first page, e.g. after new commits appeared
    pub fn refresh(&mut self) {
        self.exhausted = false;
        self.request(0);
    }

    /// Fetch the next page. Returns `false` when there is nothing to do.
    pub fn load_more(&mut self) -> bool {
        if self.exhausted || self.fetcher.is_loading() || self.content.ready().is_none() {
            return false;
        }
        let offset = self.commits().len();
        self.request(offset);
        true
    }

    fn request(&mut self, offset: usize) {
        let Some(repo_path) = self.repo_path.clone() else {
            return;
        };
        let provider = Arc::clone(&self.provider);
        let limit = self.page_size;
        let key = PageKey {
            repo_path: repo_path.clone(),
            offset,
        };
        self.fetcher
            .request(key, move || provider.commits(&repo_path, limit, offset));
    }

    pub fn poll(&mut self) -> bool {
        match self.fetcher.poll() {
            Some((key, result)) => {
                self.apply(key, result);
                true
            }
            None => false,
        }
    }

    pub fn wait(&mut self, timeout: Duration) -> bool {
        match self.fetcher.wait(timeout) {
            Some((key, result)) => {
                self.apply(key, result);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, key: PageKey, result: Result<Vec<CommitEntry>, FetchError>) {
        match result {
            Ok(page) => {
                self.exhausted = page.len() < self.page_size;
                if key.offset == 0 {
                    self.content = PanelContent::Ready(page);
                } else if let PanelContent::Ready(commits) = &mut self.content {
                    commits.truncate(key.offset);
                    commits.extend(page);
                }
            }
            Err(e) if key.offset == 0 => {
                self.content = PanelContent::from_result("commit-list", Err(e));
            }
            Err(e) => {
                // Keep what is already loaded
                tracing::warn!(offset = key.offset, error = %e, "failed to load more commits");
            }
        }
    }
}

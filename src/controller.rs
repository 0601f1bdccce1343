//! Repository view controller
//!
//! Owns everything scoped to one open repository: the persisted
//! [`LayoutStore`], the transient [`ViewState`], the four nested splits and
//! the panels that render file lists, history and diffs. Selection changes
//! flow down into the panels through [`RepositoryView::sync_panels`]; size
//! changes flow up from the splits into the layout record.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::input::{EventResponse, InputEvent};
use crate::layout::{Rect, WorkspaceLayout};
use crate::layout_state::{DiffViewMode, LayoutConfig, LayoutStore, pane_bounds};
use crate::panels::{CommitListPanel, DiffPanel, FileListPanel, SharedProvider};
use crate::split::{Axis, PanelSplit, PointerCapture, SplitAction, SplitConfig};
use crate::store::{SharedStore, pane_key};
use crate::view_state::{SidebarView, ViewState};
use crate::watcher::RepoWatcher;

/// The resizable panes of a repository view, outermost first
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pane {
    Sidebar,
    Commits,
    FileList,
    Staged,
}

impl Pane {
    pub const ALL: [Pane; 4] = [Pane::Sidebar, Pane::Commits, Pane::FileList, Pane::Staged];

    /// Suffix of the pane's storage key
    pub fn name(self) -> &'static str {
        match self {
            Pane::Sidebar => "sidebar",
            Pane::Commits => "commits",
            Pane::FileList => "filelist",
            Pane::Staged => "staged",
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Pane::Sidebar | Pane::FileList => Axis::Horizontal,
            Pane::Commits | Pane::Staged => Axis::Vertical,
        }
    }

    pub fn bounds(self) -> (u32, u32) {
        match self {
            Pane::Sidebar => pane_bounds::SIDEBAR,
            Pane::Commits => pane_bounds::COMMITS,
            Pane::FileList => pane_bounds::FILE_LIST,
            Pane::Staged => pane_bounds::STAGED,
        }
    }

    fn size_in(self, config: &LayoutConfig) -> u32 {
        match self {
            Pane::Sidebar => config.sidebar_width,
            Pane::Commits => config.commits_height,
            Pane::FileList => config.file_list_width,
            Pane::Staged => config.staged_height,
        }
    }

    fn store_size(self, config: &mut LayoutConfig, size: u32) {
        match self {
            Pane::Sidebar => config.sidebar_width = size,
            Pane::Commits => config.commits_height = size,
            Pane::FileList => config.file_list_width = size,
            Pane::Staged => config.staged_height = size,
        }
    }

    /// The rectangle this pane's split divides
    fn container(self, layout: &WorkspaceLayout) -> Rect {
        match self {
            Pane::Sidebar => layout.window,
            Pane::Commits => layout.content,
            Pane::FileList => layout.lower,
            Pane::Staged => layout.file_list,
        }
    }
}

/// User intents a shell can forward to the view
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewMessage {
    SwitchView(SidebarView),
    SelectCommit(String),
    SelectWorkingCopy,
    SelectFile(String),
    ClearFile,
    StageFile(String),
    UnstageFile(String),
    LoadMoreCommits,
    SelectBranch(Option<String>),
    ToggleRemoteBranches,
    SetDiffViewMode(DiffViewMode),
}

struct Splits {
    sidebar: PanelSplit,
    commits: PanelSplit,
    file_list: PanelSplit,
    staged: PanelSplit,
}

impl Splits {
    fn build(
        repo_path: &str,
        config: &LayoutConfig,
        store: &SharedStore,
        capture: &PointerCapture,
    ) -> Result<Self> {
        let make = |pane: Pane| -> Result<PanelSplit> {
            let (min, max) = pane.bounds();
            let split_config = SplitConfig::new(pane.axis())
                .with_initial_size(pane.size_in(config))
                .with_bounds(min, max)
                .with_persistence_key(pane_key(repo_path, pane.name()));
            PanelSplit::new(split_config, store.clone(), capture.clone())
                .with_context(|| format!("Failed to create {} split", pane.name()))
        };
        Ok(Self {
            sidebar: make(Pane::Sidebar)?,
            commits: make(Pane::Commits)?,
            file_list: make(Pane::FileList)?,
            staged: make(Pane::Staged)?,
        })
    }

    fn get(&self, pane: Pane) -> &PanelSplit {
        match pane {
            Pane::Sidebar => &self.sidebar,
            Pane::Commits => &self.commits,
            Pane::FileList => &self.file_list,
            Pane::Staged => &self.staged,
        }
    }

    fn get_mut(&mut self, pane: Pane) -> &mut PanelSplit {
        match pane {
            Pane::Sidebar => &mut self.sidebar,
            Pane::Commits => &mut self.commits,
            Pane::FileList => &mut self.file_list,
            Pane::Staged => &mut self.staged,
        }
    }

    /// Copy the effective (clamped or pane-key) sizes into the layout record
    fn project_sizes(&self, layout: &mut LayoutStore) {
        let changed = layout.reconcile(|config| {
            for pane in Pane::ALL {
                pane.store_size(config, self.get(pane).size());
            }
        });
        if changed {
            tracing::debug!(repo = layout.repo_path(), "layout record adjusted to split sizes");
        }
    }

    fn cancel_drags(&mut self) {
        for pane in Pane::ALL {
            self.get_mut(pane).cancel_drag();
        }
    }
}

/// One open repository
pub struct RepositoryView {
    store: SharedStore,
    provider: SharedProvider,
    layout: LayoutStore,
    state: ViewState,
    capture: PointerCapture,
    splits: Splits,
    file_list: FileListPanel,
    diff: DiffPanel,
    commits: CommitListPanel,
    watcher: Option<RepoWatcher>,
}

impl RepositoryView {
    pub fn open(repo_path: &str, store: SharedStore, provider: SharedProvider) -> Result<Self> {
        Self::open_with_config(repo_path, store, provider, &Config::default())
    }

    /// Mount a view for `repo_path`: load its layout, restore the persisted
    /// sidebar view and issue the initial fetches.
    pub fn open_with_config(
        repo_path: &str,
        store: SharedStore,
        provider: SharedProvider,
        settings: &Config,
    ) -> Result<Self> {
        let mut layout = LayoutStore::load(store.clone(), repo_path);
        let capture = PointerCapture::new();
        let splits = Splits::build(repo_path, layout.config(), &store, &capture)?;
        splits.project_sizes(&mut layout);
        let diff_mode = layout.config().diff_view_mode;

        let mut view = Self {
            file_list: FileListPanel::new(provider.clone()),
            diff: DiffPanel::new(provider.clone(), diff_mode),
            commits: CommitListPanel::new(provider.clone(), settings.commit_page_size),
            store,
            provider,
            layout,
            state: ViewState::new(),
            capture,
            splits,
            watcher: None,
        };
        view.restore_selection();
        tracing::info!(repo = repo_path, view = view.state.sidebar_view().as_str(), "opened repository view");
        Ok(view)
    }

    fn restore_selection(&mut self) {
        self.state.reset();
        self.state.switch_view(self.layout.config().sidebar_view);
        self.sync_panels();
    }

    pub fn repo_path(&self) -> &str {
        self.layout.repo_path()
    }

    pub fn layout_config(&self) -> &LayoutConfig {
        self.layout.config()
    }

    pub fn view_state(&self) -> &ViewState {
        &self.state
    }

    pub fn split(&self, pane: Pane) -> &PanelSplit {
        self.splits.get(pane)
    }

    pub fn pointer_capture(&self) -> &PointerCapture {
        &self.capture
    }

    pub fn file_list(&self) -> &FileListPanel {
        &self.file_list
    }

    pub fn diff(&self) -> &DiffPanel {
        &self.diff
    }

    pub fn commits(&self) -> &CommitListPanel {
        &self.commits
    }

    pub fn provider(&self) -> &SharedProvider {
        &self.provider
    }

    /// The repository identity changed. Reloads the layout, resets the
    /// selection and rebuilds the splits. Returns `false` for the same path.
    pub fn set_repository(&mut self, repo_path: &str) -> Result<bool> {
        if repo_path == self.layout.repo_path() {
            return Ok(false);
        }
        self.splits.cancel_drags();
        self.layout.set_identity(repo_path);
        self.splits = Splits::build(repo_path, self.layout.config(), &self.store, &self.capture)?;
        self.splits.project_sizes(&mut self.layout);
        self.diff.set_view_mode(self.layout.config().diff_view_mode);
        self.commits.clear();

        let watching = self.watcher.take().is_some();
        self.restore_selection();
        if watching {
            self.attach_watcher()?;
        }
        tracing::info!(repo = repo_path, "switched repository");
        Ok(true)
    }

    /// The view was closed. Releases any drag and the watcher; the in-memory
    /// layout is dropped without being rewritten.
    pub fn close(mut self) {
        self.splits.cancel_drags();
        self.file_list.clear();
        self.diff.clear();
        self.commits.clear();
        tracing::debug!(repo = self.layout.repo_path(), "closed repository view");
    }

    /// Start watching the working directory for external changes
    pub fn attach_watcher(&mut self) -> Result<()> {
        let (workdir, git_dir) = crate::git::repo_dirs(self.layout.repo_path())?;
        self.watcher = Some(RepoWatcher::new(&workdir, &git_dir)?);
        Ok(())
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Push the current selection into the panels. Panels whose key is
    /// unchanged do not refetch.
    pub fn sync_panels(&mut self) {
        let repo_path = self.layout.repo_path().to_string();
        tracing::trace!(key = ?self.state.selection_key(&repo_path), "syncing panels");
        let mode = self.state.view_mode();
        self.file_list.sync(&repo_path, mode.clone());
        self.diff.sync(&repo_path, mode, self.state.file());
        if self.state.sidebar_view() == SidebarView::History {
            self.commits.sync(&repo_path);
        }
    }

    pub fn switch_view(&mut self, view: SidebarView) {
        self.state.switch_view(view);
        if self.layout.config().sidebar_view != view {
            self.layout.update(|c| c.sidebar_view = view);
        }
        self.sync_panels();
    }

    pub fn select_commit(&mut self, id: &str) -> bool {
        let accepted = self.state.select_commit(id);
        if accepted {
            self.sync_panels();
        }
        accepted
    }

    pub fn select_working_copy(&mut self) -> bool {
        let accepted = self.state.select_working_copy_row();
        if accepted {
            self.sync_panels();
        }
        accepted
    }

    pub fn select_file(&mut self, path: &str) {
        self.state.select_file(path);
        self.sync_panels();
    }

    pub fn clear_file(&mut self) {
        self.state.clear_file();
        self.sync_panels();
    }

    pub fn select_branch(&mut self, branch: Option<String>) {
        self.layout.update(|c| c.selected_branch = branch);
    }

    pub fn toggle_remote_branches(&mut self) {
        self.layout
            .update(|c| c.show_remote_branches = !c.show_remote_branches);
    }

    pub fn set_diff_view_mode(&mut self, mode: DiffViewMode) {
        self.diff.set_view_mode(mode);
        self.layout.update(|c| c.diff_view_mode = mode);
    }

    /// Stage a file. Refused outside the working copy; provider failures are
    /// logged and reported as `false`.
    pub fn stage_file(&mut self, path: &str) -> bool {
        self.change_index(path, true)
    }

    pub fn unstage_file(&mut self, path: &str) -> bool {
        self.change_index(path, false)
    }

    fn change_index(&mut self, path: &str, stage: bool) -> bool {
        if !self.state.can_mutate() {
            tracing::debug!(file = path, stage, "index change ignored while viewing a commit");
            return false;
        }
        let result = if stage {
            self.file_list.stage(path)
        } else {
            self.file_list.unstage(path)
        };
        match result {
            Ok(changed) => {
                if changed {
                    self.diff.refresh();
                }
                changed
            }
            Err(e) => {
                tracing::warn!(file = path, error = %e, "index change failed");
                false
            }
        }
    }

    pub fn load_more_commits(&mut self) -> bool {
        self.commits.load_more()
    }

    /// Programmatic resize of one pane. Returns the clamped size.
    pub fn resize_pane(&mut self, pane: Pane, size: u32) -> u32 {
        let size = self.splits.get_mut(pane).resize(size);
        self.collect_resizes();
        size
    }

    pub fn handle_message(&mut self, message: ViewMessage) {
        match message {
            ViewMessage::SwitchView(view) => self.switch_view(view),
            ViewMessage::SelectCommit(id) => {
                self.select_commit(&id);
            }
            ViewMessage::SelectWorkingCopy => {
                self.select_working_copy();
            }
            ViewMessage::SelectFile(path) => self.select_file(&path),
            ViewMessage::ClearFile => self.clear_file(),
            ViewMessage::StageFile(path) => {
                self.stage_file(&path);
            }
            ViewMessage::UnstageFile(path) => {
                self.unstage_file(&path);
            }
            ViewMessage::LoadMoreCommits => {
                self.load_more_commits();
            }
            ViewMessage::SelectBranch(branch) => self.select_branch(branch),
            ViewMessage::ToggleRemoteBranches => self.toggle_remote_branches(),
            ViewMessage::SetDiffViewMode(mode) => self.set_diff_view_mode(mode),
        }
    }

    pub fn compute_layout(&self, bounds: Rect) -> WorkspaceLayout {
        WorkspaceLayout::compute(
            bounds,
            &self.splits.sidebar,
            &self.splits.commits,
            &self.splits.file_list,
            &self.splits.staged,
        )
    }

    /// Route a pointer event to the splits. The split holding the pointer
    /// capture sees every event first, wherever it happens.
    pub fn handle_event(&mut self, event: &InputEvent, bounds: Rect) -> EventResponse {
        let layout = self.compute_layout(bounds);

        if let Some(owner) = self.capture.owner() {
            let captured = Pane::ALL
                .into_iter()
                .find(|pane| self.splits.get(*pane).id() == owner);
            if let Some(pane) = captured {
                let response = self
                    .splits
                    .get_mut(pane)
                    .handle_event(event, pane.container(&layout));
                self.collect_resizes();
                return response;
            }
        }

        for pane in Pane::ALL {
            let response = self
                .splits
                .get_mut(pane)
                .handle_event(event, pane.container(&layout));
            if response.is_consumed() {
                self.collect_resizes();
                return response;
            }
        }
        EventResponse::Ignored
    }

    fn collect_resizes(&mut self) {
        for pane in Pane::ALL {
            if let Some(SplitAction::Resized(size)) = self.splits.get_mut(pane).take_action() {
                self.layout.update(|c| pane.store_size(c, size));
            }
        }
    }

    /// Apply finished fetches and react to filesystem changes. Returns `true`
    /// if any panel content changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = self.file_list.poll();
        changed |= self.diff.poll();
        changed |= self.commits.poll();

        if self.watcher.as_ref().is_some_and(RepoWatcher::take_change) {
            tracing::debug!(repo = self.layout.repo_path(), "repository changed on disk");
            self.refresh();
        }
        changed
    }

    /// Refetch what the panels currently show
    pub fn refresh(&mut self) {
        self.file_list.refresh();
        self.diff.refresh();
        if self.state.sidebar_view() == SidebarView::History {
            self.commits.refresh();
        }
    }

    /// Block until outstanding fetches resolve, up to `timeout` per panel
    pub fn wait_idle(&mut self, timeout: Duration) {
        self.file_list.wait(timeout);
        self.diff.wait(timeout);
        self.commits.wait(timeout);
    }
}

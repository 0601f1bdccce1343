//! View state machine - working copy vs. historical commit
//!
//! Tracks the active sidebar view, the active commit reference and the active
//! file. [`is_working_copy`] derives the single mode flag the file-list and
//! diff panels consume.

use serde::{Deserialize, Serialize};

use crate::fetch::FetchKey;

/// Which sidebar view is active
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SidebarView {
    #[default]
    FileStatus,
    History,
    Search,
}

impl SidebarView {
    pub fn as_str(&self) -> &'static str {
        match self {
            SidebarView::FileStatus => "file-status",
            SidebarView::History => "history",
            SidebarView::Search => "search",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file-status" | "status" => Some(SidebarView::FileStatus),
            "history" => Some(SidebarView::History),
            "search" => Some(SidebarView::Search),
            _ => None,
        }
    }
}

/// The commit the history view points at
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum CommitRef {
    /// Nothing chosen yet
    #[default]
    None,
    /// The uncommitted changes row
    WorkingCopy,
    /// A concrete commit id
    Commit(String),
}

/// What the content panels should show
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ViewMode {
    WorkingCopy,
    Commit(String),
}

/// The working-copy derivation: file status always shows the working copy,
/// other views only when the working-copy row is selected.
pub fn is_working_copy(view: SidebarView, commit_ref: &CommitRef) -> bool {
    view == SidebarView::FileStatus || *commit_ref == CommitRef::WorkingCopy
}

/// Transient selection for one repository view
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewState {
    sidebar_view: SidebarView,
    commit_ref: CommitRef,
    file: Option<String>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sidebar_view(&self) -> SidebarView {
        self.sidebar_view
    }

    pub fn commit_ref(&self) -> &CommitRef {
        &self.commit_ref
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn is_working_copy(&self) -> bool {
        is_working_copy(self.sidebar_view, &self.commit_ref)
    }

    /// Stage/unstage is only legal on the working copy
    pub fn can_mutate(&self) -> bool {
        self.is_working_copy()
    }

    /// The content mode, or `None` when nothing is selected to show
    pub fn view_mode(&self) -> Option<ViewMode> {
        if self.is_working_copy() {
            return Some(ViewMode::WorkingCopy);
        }
        match &self.commit_ref {
            CommitRef::Commit(id) => Some(ViewMode::Commit(id.clone())),
            CommitRef::None | CommitRef::WorkingCopy => None,
        }
    }

    /// The tuple content fetches for this selection are tagged with
    pub fn selection_key(&self, repo_path: &str) -> Option<FetchKey> {
        self.view_mode()
            .map(|mode| FetchKey::new(repo_path, mode, self.file.clone()))
    }

    pub fn switch_view(&mut self, view: SidebarView) {
        let previous = self.sidebar_view;
        self.sidebar_view = view;
        match view {
            SidebarView::FileStatus => self.commit_ref = CommitRef::WorkingCopy,
            SidebarView::History => {
                if self.commit_ref == CommitRef::None {
                    self.commit_ref = CommitRef::WorkingCopy;
                }
            }
            SidebarView::Search => {}
        }
        tracing::debug!(
            from = previous.as_str(),
            to = view.as_str(),
            commit = ?self.commit_ref,
            "switched sidebar view"
        );
    }

    /// Point the history view at a commit. Ignored outside history.
    pub fn select_commit(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.sidebar_view != SidebarView::History {
            tracing::debug!(commit = %id, view = self.sidebar_view.as_str(), "ignoring commit selection outside history");
            return false;
        }
        self.commit_ref = CommitRef::Commit(id);
        true
    }

    /// Select the working-copy row of the history list. Ignored outside history.
    pub fn select_working_copy_row(&mut self) -> bool {
        if self.sidebar_view != SidebarView::History {
            tracing::debug!(view = self.sidebar_view.as_str(), "ignoring working-copy row outside history");
            return false;
        }
        self.commit_ref = CommitRef::WorkingCopy;
        true
    }

    pub fn select_file(&mut self, path: impl Into<String>) {
        self.file = Some(path.into());
    }

    pub fn clear_file(&mut self) {
        self.file = None;
    }

    /// Back to (file status, no commit, no file)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = ViewState::new();
        assert_eq!(state.sidebar_view(), SidebarView::FileStatus);
        assert_eq!(state.commit_ref(), &CommitRef::None);
        assert_eq!(state.file(), None);
        assert!(state.is_working_copy());
        assert_eq!(state.view_mode(), Some(ViewMode::WorkingCopy));
    }

    #[test]
    fn test_first_history_entry_defaults_to_working_copy() {
        let mut state = ViewState::new();
        state.switch_view(SidebarView::History);
        assert_eq!(state.commit_ref(), &CommitRef::WorkingCopy);
        assert!(state.is_working_copy());
    }

    #[test]
    fn test_history_round_trip_scenario() {
        let mut state = ViewState::new();
        state.switch_view(SidebarView::FileStatus);
        assert_eq!(state.commit_ref(), &CommitRef::WorkingCopy);

        state.switch_view(SidebarView::History);
        assert_eq!(state.commit_ref(), &CommitRef::WorkingCopy);

        assert!(state.select_commit("abc123"));
        assert_eq!(state.commit_ref(), &CommitRef::Commit("abc123".to_string()));
        assert!(!state.is_working_copy());
        assert!(!state.can_mutate());
        assert_eq!(state.view_mode(), Some(ViewMode::Commit("abc123".to_string())));

        state.switch_view(SidebarView::FileStatus);
        assert_eq!(state.commit_ref(), &CommitRef::WorkingCopy);
        assert!(state.is_working_copy());
    }

    #[test]
    fn test_history_keeps_existing_commit() {
        let mut state = ViewState::new();
        state.switch_view(SidebarView::History);
        state.select_commit("feed");
        state.switch_view(SidebarView::Search);
        state.switch_view(SidebarView::History);
        assert_eq!(state.commit_ref(), &CommitRef::Commit("feed".to_string()));
    }

    #[test]
    fn test_file_status_always_working_copy() {
        for commit_ref in [
            CommitRef::None,
            CommitRef::WorkingCopy,
            CommitRef::Commit("1".to_string()),
        ] {
            assert!(is_working_copy(SidebarView::FileStatus, &commit_ref));
        }
        assert!(!is_working_copy(SidebarView::History, &CommitRef::None));
        assert!(!is_working_copy(
            SidebarView::History,
            &CommitRef::Commit("1".to_string())
        ));
        assert!(is_working_copy(SidebarView::Search, &CommitRef::WorkingCopy));
    }

    #[test]
    fn test_commit_selection_outside_history_is_ignored() {
        let mut state = ViewState::new();
        assert!(!state.select_commit("abc"));
        assert!(!state.select_working_copy_row());
        assert_eq!(state.commit_ref(), &CommitRef::None);

        state.switch_view(SidebarView::Search);
        assert!(!state.select_commit("abc"));
        assert_eq!(state.commit_ref(), &CommitRef::None);
        assert!(!state.is_working_copy());
        assert_eq!(state.view_mode(), None);
    }

    #[test]
    fn test_working_copy_row() {
        let mut state = ViewState::new();
        state.switch_view(SidebarView::History);
        state.select_commit("abc");
        assert!(state.select_working_copy_row());
        assert!(state.can_mutate());
    }

    #[test]
    fn test_select_file_is_independent() {
        let mut state = ViewState::new();
        state.switch_view(SidebarView::History);
        state.select_commit("abc");
        state.select_file("src/main.rs");
        assert_eq!(state.file(), Some("src/main.rs"));
        assert_eq!(state.commit_ref(), &CommitRef::Commit("abc".to_string()));
        assert_eq!(state.sidebar_view(), SidebarView::History);

        state.reset();
        assert_eq!(state, ViewState::new());
    }

    #[test]
    fn test_selection_key_tracks_file_and_commit() {
        let mut state = ViewState::new();
        state.select_file("a.ts");
        let key = state.selection_key("/repo").unwrap();
        assert_eq!(key.mode, ViewMode::WorkingCopy);
        assert_eq!(key.file.as_deref(), Some("a.ts"));

        state.switch_view(SidebarView::History);
        state.select_commit("abc");
        state.select_file("b.ts");
        let next = state.selection_key("/repo").unwrap();
        assert_ne!(key, next);
        assert_eq!(next.mode, ViewMode::Commit("abc".to_string()));

        // Search straight from a fresh state has nothing to show
        state.reset();
        state.switch_view(SidebarView::Search);
        assert_eq!(state.selection_key("/repo"), None);
    }

    #[test]
    fn test_sidebar_view_names() {
        for view in [SidebarView::FileStatus, SidebarView::History, SidebarView::Search] {
            assert_eq!(SidebarView::parse(view.as_str()), Some(view));
        }
        assert_eq!(SidebarView::parse("graph"), None);
        assert_eq!(
            serde_json::to_string(&SidebarView::FileStatus).unwrap(),
            "\"file-status\""
        );
    }
}

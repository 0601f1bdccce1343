//! Per-repository layout record (view mode, pane sizes, diff mode, branch filter)
//!
//! Loaded once per repository identity, merged over [`LayoutConfig::default`],
//! and rewritten whole on every update. Writes are synchronous: `update`
//! returns after the store has written (or failed and logged).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::store::{SharedStore, layout_key};
use crate::view_state::SidebarView;

/// How the diff viewer lays out old and new content
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffViewMode {
    Split,
    #[default]
    Unified,
}

/// Bounds of each pane, in pixels
pub mod pane_bounds {
    pub const SIDEBAR: (u32, u32) = (180, 400);
    pub const COMMITS: (u32, u32) = (100, 500);
    pub const FILE_LIST: (u32, u32) = (200, 500);
    pub const STAGED: (u32, u32) = (80, 400);
}

/// One repository's persisted view geometry and preferences.
///
/// Absent or invalid fields are filled from [`Default`]; unknown fields are
/// ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub sidebar_view: SidebarView,
    pub selected_branch: Option<String>,
    pub sidebar_width: u32,
    pub commits_height: u32,
    pub file_list_width: u32,
    pub staged_height: u32,
    pub diff_view_mode: DiffViewMode,
    pub show_remote_branches: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            sidebar_view: SidebarView::FileStatus,
            selected_branch: None,
            sidebar_width: 220,
            commits_height: 200,
            file_list_width: 280,
            staged_height: 150,
            diff_view_mode: DiffViewMode::Unified,
            show_remote_branches: false,
        }
    }
}

impl LayoutConfig {
    /// Decode a stored record, merging it key by key over the defaults.
    ///
    /// A field with the wrong type keeps its default without affecting the
    /// others. Data that is not a JSON object yields `None`.
    pub fn decode(raw: &str) -> Option<Self> {
        let record = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(record)) => record,
            Ok(other) => {
                tracing::warn!(kind = json_kind(&other), "discarding layout state that is not an object");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding malformed layout state");
                return None;
            }
        };

        let mut config = Self::default();
        merge_field(&record, "sidebarView", &mut config.sidebar_view);
        merge_field(&record, "selectedBranch", &mut config.selected_branch);
        merge_field(&record, "sidebarWidth", &mut config.sidebar_width);
        merge_field(&record, "commitsHeight", &mut config.commits_height);
        merge_field(&record, "fileListWidth", &mut config.file_list_width);
        merge_field(&record, "stagedHeight", &mut config.staged_height);
        merge_field(&record, "diffViewMode", &mut config.diff_view_mode);
        merge_field(&record, "showRemoteBranches", &mut config.show_remote_branches);
        Some(config)
    }
}

fn merge_field<T: DeserializeOwned>(record: &Map<String, Value>, key: &str, slot: &mut T) {
    let Some(value) = record.get(key) else {
        return;
    };
    match T::deserialize(value) {
        Ok(decoded) => *slot = decoded,
        Err(e) => tracing::warn!(key, error = %e, "ignoring invalid layout field"),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Owns the [`LayoutConfig`] of the repository currently shown
pub struct LayoutStore {
    store: SharedStore,
    repo_path: String,
    key: String,
    config: LayoutConfig,
}

impl LayoutStore {
    /// Load the record for `repo_path`. Never fails: any read or decode
    /// problem degrades to defaults.
    pub fn load(store: SharedStore, repo_path: &str) -> Self {
        let key = layout_key(repo_path);
        let config = read_config(&store, &key);
        tracing::debug!(repo = repo_path, key = %key, "loaded layout state");
        Self {
            store,
            repo_path: repo_path.to_string(),
            key,
            config,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn repo_path(&self) -> &str {
        &self.repo_path
    }

    /// Storage key of the current record
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Apply a partial change, then persist the whole record immediately.
    pub fn update(&mut self, apply: impl FnOnce(&mut LayoutConfig)) {
        apply(&mut self.config);
        self.persist();
    }

    /// Adjust the in-memory record without writing it. Used at mount to
    /// project the effective pane sizes into the record; returns `true` if
    /// anything changed.
    pub fn reconcile(&mut self, apply: impl FnOnce(&mut LayoutConfig)) -> bool {
        let before = self.config.clone();
        apply(&mut self.config);
        self.config != before
    }

    /// Switch to another repository. The in-memory record of the previous one
    /// is discarded, not rewritten. Returns `true` if the identity changed.
    pub fn set_identity(&mut self, repo_path: &str) -> bool {
        if repo_path == self.repo_path {
            return false;
        }
        self.repo_path = repo_path.to_string();
        self.key = layout_key(repo_path);
        self.config = read_config(&self.store, &self.key);
        tracing::debug!(repo = repo_path, "reloaded layout state for new repository");
        true
    }

    fn persist(&self) {
        let json = match serde_json::to_string(&self.config) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize layout state");
                return;
            }
        };
        if let Err(e) = self.store.set(&self.key, &json) {
            tracing::warn!(key = %self.key, error = %e, "failed to save layout state");
        }
    }
}

fn read_config(store: &SharedStore, key: &str) -> LayoutConfig {
    match store.get(key) {
        Ok(Some(raw)) => LayoutConfig::decode(&raw).unwrap_or_default(),
        Ok(None) => LayoutConfig::default(),
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to load layout state");
            LayoutConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyValueStore, MemoryStore};
    use std::rc::Rc;

    #[test]
    fn test_partial_record_merges_over_defaults() {
        let store = Rc::new(MemoryStore::new());
        store.insert_raw(&layout_key("/repo"), r#"{"sidebarWidth": 300}"#);

        let layout = LayoutStore::load(store, "/repo");
        let expected = LayoutConfig {
            sidebar_width: 300,
            ..LayoutConfig::default()
        };
        assert_eq!(layout.config(), &expected);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let store = Rc::new(MemoryStore::new());
        store.insert_raw(
            &layout_key("/repo"),
            r#"{"diffViewMode": "split", "theme": "dark", "sidebarView": "history"}"#,
        );
        let layout = LayoutStore::load(store, "/repo");
        assert_eq!(layout.config().diff_view_mode, DiffViewMode::Split);
        assert_eq!(layout.config().sidebar_view, SidebarView::History);
        assert_eq!(layout.config().commits_height, 200);
    }

    #[test]
    fn test_malformed_record_is_defaults() {
        let store = Rc::new(MemoryStore::new());
        store.insert_raw(&layout_key("/repo"), "{\"sidebarWidth\": ");
        let layout = LayoutStore::load(store.clone(), "/repo");
        assert_eq!(layout.config(), &LayoutConfig::default());

        store.insert_raw(&layout_key("/repo"), "[220, 200]");
        let layout = LayoutStore::load(store.clone(), "/repo");
        assert_eq!(layout.config(), &LayoutConfig::default());

        store.insert_raw(&layout_key("/repo"), r#"{"sidebarWidth": "wide"}"#);
        let layout = LayoutStore::load(store, "/repo");
        assert_eq!(layout.config(), &LayoutConfig::default());
    }

    #[test]
    fn test_invalid_field_keeps_the_valid_ones() {
        let store = Rc::new(MemoryStore::new());
        store.insert_raw(
            &layout_key("/repo"),
            r#"{"sidebarWidth": 300, "diffViewMode": "sideways", "stagedHeight": -4,
                "sidebarView": "history", "selectedBranch": null}"#,
        );
        let layout = LayoutStore::load(store, "/repo");
        let expected = LayoutConfig {
            sidebar_width: 300,
            sidebar_view: SidebarView::History,
            ..LayoutConfig::default()
        };
        assert_eq!(layout.config(), &expected);
    }

    #[test]
    fn test_unreadable_store_is_defaults() {
        let store = Rc::new(MemoryStore::new());
        store.set_fail_reads(true);
        let layout = LayoutStore::load(store, "/repo");
        assert_eq!(layout.config(), &LayoutConfig::default());
    }

    #[test]
    fn test_every_update_writes_whole_record() {
        let store = Rc::new(MemoryStore::new());
        let mut layout = LayoutStore::load(store.clone(), "/repo");

        layout.update(|c| c.staged_height = 120);
        layout.update(|c| c.selected_branch = Some("develop".to_string()));
        assert_eq!(store.write_count(), 2);

        let raw = store.get(&layout_key("/repo")).unwrap().unwrap();
        let saved = LayoutConfig::decode(&raw).unwrap();
        assert_eq!(saved.staged_height, 120);
        assert_eq!(saved.selected_branch.as_deref(), Some("develop"));
        assert_eq!(saved.sidebar_width, 220);
    }

    #[test]
    fn test_serialized_keys_are_camel_case() {
        let json = serde_json::to_value(LayoutConfig::default()).unwrap();
        assert_eq!(json["sidebarView"], "file-status");
        assert_eq!(json["diffViewMode"], "unified");
        assert_eq!(json["showRemoteBranches"], false);
        assert!(json["selectedBranch"].is_null());
    }

    #[test]
    fn test_identity_change_reloads_without_rewriting() {
        let store = Rc::new(MemoryStore::new());
        store.insert_raw(&layout_key("/b"), r#"{"fileListWidth": 410}"#);

        let mut layout = LayoutStore::load(store.clone(), "/a");
        layout.update(|c| c.sidebar_width = 390);
        assert_eq!(store.write_count(), 1);

        assert!(layout.set_identity("/b"));
        assert_eq!(layout.config().file_list_width, 410);
        assert_eq!(layout.config().sidebar_width, 220);
        assert_eq!(store.write_count(), 1);
        assert!(!layout.set_identity("/b"));

        assert!(layout.set_identity("/a"));
        assert_eq!(layout.config().sidebar_width, 390);
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let store = Rc::new(MemoryStore::new());
        store.set_fail_writes(true);
        let mut layout = LayoutStore::load(store, "/repo");
        layout.update(|c| c.show_remote_branches = true);
        assert!(layout.config().show_remote_branches);
    }
}

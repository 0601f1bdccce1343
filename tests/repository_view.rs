//! End-to-end: a repository view over a real git repository on disk.

use std::fs;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use git2::{Repository, Signature};
use prism_layout::controller::{Pane, RepositoryView};
use prism_layout::git::GitProvider;
use prism_layout::panels::{FileList, PanelContent};
use prism_layout::provider::{LineKind, StatusCode};
use prism_layout::store::{FileStore, KeyValueStore, MemoryStore, layout_key, pane_key};
use prism_layout::view_state::{CommitRef, SidebarView};
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(10);

struct Fixture {
    dir: TempDir,
    repo: Repository,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        Self { dir, repo }
    }

    fn path(&self) -> String {
        self.dir.path().to_string_lossy().to_string()
    }

    fn write(&self, file: &str, contents: &str) {
        fs::write(self.dir.path().join(file), contents).unwrap();
    }

    fn commit_all(&self, message: &str) -> String {
        let mut index = self.repo.index().unwrap();
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Tester", "tester@example.com").unwrap();
        let parent = self.repo.head().ok().map(|h| h.peel_to_commit().unwrap());
        let parents: Vec<_> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
            .to_string()
    }
}

#[test]
fn history_round_trip_over_git() {
    let fixture = Fixture::new();
    fixture.write("app.ts", "one\n");
    let first = fixture.commit_all("first");
    fixture.write("app.ts", "one\ntwo\n");
    fixture.commit_all("second");
    fixture.write("app.ts", "one\ntwo\nthree\n");

    let store = Rc::new(MemoryStore::new());
    let mut view =
        RepositoryView::open(&fixture.path(), store, Arc::new(GitProvider::new())).unwrap();
    view.select_file("app.ts");
    view.wait_idle(WAIT);

    match view.file_list().content() {
        PanelContent::Ready(FileList::WorkingCopy(status)) => {
            assert_eq!(status.unstaged[0].path, "app.ts");
            assert_eq!(status.unstaged[0].code, StatusCode::Modified);
        }
        other => panic!("unexpected file list {other:?}"),
    }
    let diff = view.diff().content().ready().unwrap();
    assert!(diff.hunks[0]
        .lines
        .iter()
        .any(|l| l.kind == LineKind::Addition && l.content == "three"));

    view.switch_view(SidebarView::History);
    assert_eq!(view.view_state().commit_ref(), &CommitRef::WorkingCopy);
    view.wait_idle(WAIT);
    assert_eq!(view.commits().commits().len(), 2);
    assert_eq!(view.commits().commits()[1].id, first);

    assert!(view.select_commit(&first));
    view.wait_idle(WAIT);
    match view.file_list().content() {
        PanelContent::Ready(FileList::Commit { files, .. }) => {
            assert_eq!(files[0].code, StatusCode::Added);
        }
        other => panic!("unexpected file list {other:?}"),
    }
    assert!(!view.stage_file("app.ts"));

    view.switch_view(SidebarView::FileStatus);
    assert!(view.view_state().is_working_copy());
    view.wait_idle(WAIT);
    assert!(view.stage_file("app.ts"));
    view.wait_idle(WAIT);
    match view.file_list().content() {
        PanelContent::Ready(FileList::WorkingCopy(status)) => {
            assert_eq!(status.staged[0].path, "app.ts");
            assert!(status.unstaged.is_empty());
        }
        other => panic!("unexpected file list {other:?}"),
    }
    view.close();
}

#[test]
fn layout_survives_reopen_through_file_store() {
    let fixture = Fixture::new();
    fixture.write("a.txt", "a\n");
    fixture.commit_all("init");
    let config_dir = tempfile::tempdir().unwrap();
    let store_path = config_dir.path().join("layout.json");

    {
        let store = Rc::new(FileStore::open(&store_path));
        let mut view =
            RepositoryView::open(&fixture.path(), store, Arc::new(GitProvider::new())).unwrap();
        assert_eq!(view.resize_pane(Pane::FileList, 9999), 500);
        assert_eq!(view.resize_pane(Pane::Staged, 120), 120);
        view.switch_view(SidebarView::History);
        view.close();
    }

    let store = Rc::new(FileStore::open(&store_path));
    assert_eq!(
        store
            .get(&pane_key(&fixture.path(), "staged"))
            .unwrap()
            .as_deref(),
        Some("120")
    );
    assert!(store.get(&layout_key(&fixture.path())).unwrap().is_some());

    let view =
        RepositoryView::open(&fixture.path(), store, Arc::new(GitProvider::new())).unwrap();
    assert_eq!(view.split(Pane::FileList).size(), 500);
    assert_eq!(view.split(Pane::Staged).size(), 120);
    assert_eq!(view.layout_config().staged_height, 120);
    assert_eq!(view.view_state().sidebar_view(), SidebarView::History);
    assert_eq!(view.view_state().commit_ref(), &CommitRef::WorkingCopy);
}

#[test]
fn missing_repository_shows_local_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("not-a-repo").to_string_lossy().to_string();
    let store = Rc::new(MemoryStore::new());
    let mut view = RepositoryView::open(&path, store, Arc::new(GitProvider::new())).unwrap();
    view.wait_idle(WAIT);
    assert!(view.file_list().content().error().is_some());
    assert_eq!(view.diff().content(), &PanelContent::Empty);
}

//! Debounced filesystem change notifications for an open repository

use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Quiet period after the last event before a change is reported
pub const DEBOUNCE: Duration = Duration::from_millis(500);

/// Git metadata files whose changes affect what the panels show
const TRACKED_GIT_FILES: &[&str] = &[
    "HEAD",
    "index",
    "MERGE_HEAD",
    "REBASE_HEAD",
    "CHERRY_PICK_HEAD",
];

/// Watches a working directory and its git metadata. Dropping it stops the
/// notify backend, which in turn ends the debounce thread.
pub struct RepoWatcher {
    _watcher: RecommendedWatcher,
    changes: Receiver<()>,
}

impl RepoWatcher {
    pub fn new(workdir: &Path, git_dir: &Path) -> Result<Self> {
        let (raw_tx, raw_rx) = mpsc::channel::<Event>();
        let (out_tx, out_rx) = mpsc::channel::<()>();

        std::thread::Builder::new()
            .name("fs-watcher-debounce".into())
            .spawn(move || debounce_loop(raw_rx, out_tx, DEBOUNCE))
            .context("Failed to spawn fs-watcher-debounce thread")?;

        let filter_dir = git_dir.to_path_buf();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_relevant_event(&event, &filter_dir) => {
                    let _ = raw_tx.send(event);
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "filesystem watch error"),
            },
            notify::Config::default(),
        )
        .context("Failed to create filesystem watcher")?;

        watcher
            .watch(workdir, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", workdir.display()))?;
        // Best effort: a bare or unusual layout may lack these
        if let Err(e) = watcher.watch(git_dir, RecursiveMode::NonRecursive) {
            tracing::debug!(path = %git_dir.display(), error = %e, "not watching git dir");
        }
        let refs_dir = git_dir.join("refs");
        if let Err(e) = watcher.watch(&refs_dir, RecursiveMode::Recursive) {
            tracing::debug!(path = %refs_dir.display(), error = %e, "not watching refs");
        }

        tracing::info!(workdir = %workdir.display(), "watching repository for changes");
        Ok(Self {
            _watcher: watcher,
            changes: out_rx,
        })
    }

    /// Whether at least one debounced change arrived since the last call
    pub fn take_change(&self) -> bool {
        let mut changed = false;
        while self.changes.try_recv().is_ok() {
            changed = true;
        }
        changed
    }
}

/// Create/modify/remove outside `.git`, or touching tracked git metadata.
fn is_relevant_event(event: &Event, git_dir: &Path) -> bool {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return false;
    }
    event.paths.iter().any(|path| is_relevant_path(path, git_dir))
}

fn is_relevant_path(path: &Path, git_dir: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(git_dir) else {
        return true;
    };
    let relative = relative.to_string_lossy();
    relative.starts_with("refs") || TRACKED_GIT_FILES.contains(&relative.as_ref())
}

/// Collapse bursts of raw events into one `()` per quiet period. Returns
/// when either side of the pipe goes away.
fn debounce_loop<T>(raw_rx: Receiver<T>, out_tx: Sender<()>, window: Duration) {
    let mut last_event: Option<Instant> = None;
    loop {
        let timeout = match last_event {
            Some(at) => window.saturating_sub(at.elapsed()),
            None => Duration::from_secs(60),
        };
        match raw_rx.recv_timeout(timeout) {
            Ok(_) => last_event = Some(Instant::now()),
            Err(RecvTimeoutError::Timeout) => {
                if last_event.take().is_some() && out_tx.send(()).is_err() {
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

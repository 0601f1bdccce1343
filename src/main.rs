use anyhow::{Context, Result};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use prism_layout::config::Config;
use prism_layout::controller::RepositoryView;
use prism_layout::git::{self, GitProvider};
use prism_layout::layout::{Rect, WorkspaceLayout};
use prism_layout::layout_state::DiffViewMode;
use prism_layout::panels::{FileList, PanelContent, split_rows};
use prism_layout::store::{FileStore, MemoryStore, SharedStore};
use prism_layout::view_state::SidebarView;

/// How long to wait for each panel's fetch before printing
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// CLI arguments for a headless run
#[derive(Default)]
struct CliArgs {
    /// Repository path to open
    repo: Option<PathBuf>,
    /// Sidebar view to switch to
    view: Option<String>,
    /// Commit to select (implies the history view)
    commit: Option<String>,
    /// File to show the diff of
    file: Option<String>,
    width: Option<f32>,
    height: Option<f32>,
}

fn parse_args() -> Result<CliArgs> {
    let mut args = CliArgs::default();
    let mut iter = std::env::args().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--repo" => {
                args.repo = iter.next().map(PathBuf::from);
            }
            "--view" => {
                args.view = iter.next();
            }
            "--commit" => {
                args.commit = iter.next();
            }
            "--file" => {
                args.file = iter.next();
            }
            "--width" => {
                args.width = iter.next().map(|v| parse_dimension("--width", &v)).transpose()?;
            }
            "--height" => {
                args.height = iter.next().map(|v| parse_dimension("--height", &v)).transpose()?;
            }
            other if !other.starts_with('-') => {
                // Positional arg = repo path
                args.repo = Some(PathBuf::from(other));
            }
            other => {
                tracing::warn!(arg = other, "ignoring unknown argument");
            }
        }
    }

    Ok(args)
}

fn parse_dimension(flag: &str, value: &str) -> Result<f32> {
    value
        .parse::<f32>()
        .with_context(|| format!("{flag} expects a number, got {value:?}"))
}

fn open_store() -> SharedStore {
    match FileStore::default_path() {
        Some(path) => Rc::new(FileStore::open(path)),
        None => {
            tracing::warn!("no config directory, layout will not be remembered");
            Rc::new(MemoryStore::new())
        }
    }
}

fn main() -> Result<()> {
    let config = Config::load();
    if let Err(e) = prism_layout::logging::init(config.log_filter.as_deref()) {
        eprintln!("Failed to initialize logging: {e}");
    }
    let args = parse_args()?;

    let start = args.repo.clone().unwrap_or_else(|| PathBuf::from("."));
    let repo_path = git::discover_root(&start)?;
    let mut view = RepositoryView::open_with_config(
        &repo_path,
        open_store(),
        Arc::new(GitProvider::new()),
        &config,
    )?;
    if config.watch_filesystem {
        if let Err(e) = view.attach_watcher() {
            tracing::warn!("Filesystem watching disabled: {e:#}");
        }
    }

    if let Some(name) = &args.view {
        let sidebar_view = SidebarView::parse(name).with_context(|| {
            format!("Unknown view {name:?} (expected file-status, history or search)")
        })?;
        view.switch_view(sidebar_view);
    }
    if let Some(commit) = &args.commit {
        if view.view_state().sidebar_view() != SidebarView::History {
            view.switch_view(SidebarView::History);
        }
        view.select_commit(commit);
    }
    if let Some(file) = &args.file {
        view.select_file(file);
    }
    view.wait_idle(FETCH_TIMEOUT);

    let bounds = Rect::from_size(args.width.unwrap_or(1280.0), args.height.unwrap_or(800.0));
    println!("repository: {}", view.repo_path());
    println!(
        "view: {} ({})",
        view.view_state().sidebar_view().as_str(),
        if view.view_state().is_working_copy() { "working copy" } else { "commit" }
    );
    print_layout(&view.compute_layout(bounds));
    print_files(&view);
    if view.view_state().sidebar_view() == SidebarView::History {
        print_commits(&view);
    }
    print_diff(&view);

    view.close();
    Ok(())
}

fn print_layout(layout: &WorkspaceLayout) {
    let regions = [
        ("sidebar", layout.sidebar),
        ("commits", layout.commits),
        ("staged", layout.file_list_staged),
        ("unstaged", layout.file_list_unstaged),
        ("diff", layout.diff),
    ];
    println!("\nlayout:");
    for (name, rect) in regions {
        println!(
            "  {name:<9} x={:<6} y={:<6} w={:<6} h={}",
            rect.x, rect.y, rect.width, rect.height
        );
    }
}

fn print_files(view: &RepositoryView) {
    println!("\nfiles:");
    match view.file_list().content() {
        PanelContent::Ready(FileList::WorkingCopy(status)) => {
            if status.is_clean() {
                println!("  (clean)");
            }
            for file in &status.staged {
                println!("  [staged]   {} {}", file.code.letter(), file.path);
            }
            for file in &status.unstaged {
                println!("  [unstaged] {} {}", file.code.letter(), file.path);
            }
        }
        PanelContent::Ready(FileList::Commit { id, files }) => {
            println!("  commit {}", &id[..id.len().min(7)]);
            for file in files {
                println!("  {} {}", file.code.letter(), file.path);
            }
        }
        PanelContent::Failed(message) => println!("  error: {message}"),
        PanelContent::Loading => println!("  (still loading)"),
        PanelContent::Empty => println!("  (nothing selected)"),
    }
}

fn print_commits(view: &RepositoryView) {
    println!("\nhistory:");
    println!("  * uncommitted changes");
    for commit in view.commits().commits() {
        let summary = commit.message.lines().next().unwrap_or("");
        println!("  {} {} ({})", commit.short_id, summary, commit.author_name);
    }
    if view.commits().has_more() {
        println!("  ...");
    }
}

fn print_diff(view: &RepositoryView) {
    println!("\ndiff:");
    match view.diff().content() {
        PanelContent::Ready(diff) => {
            let (additions, deletions) = diff.stats();
            println!(
                "  {} +{additions} -{deletions} in {} hunk(s)",
                diff.file_path,
                diff.hunks.len()
            );
            if view.diff().view_mode() == DiffViewMode::Split {
                println!("  {} split row(s)", split_rows(diff).len());
            }
        }
        PanelContent::Failed(message) => println!("  error: {message}"),
        PanelContent::Loading => println!("  (still loading)"),
        PanelContent::Empty => println!("  (no file selected)"),
    }
}

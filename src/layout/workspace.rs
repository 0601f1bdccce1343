//! Workspace layout builder - nests the four splits of a repository view

use super::Rect;
use crate::split::PanelSplit;

/// The computed regions of a repository view
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkspaceLayout {
    /// Whole window; container of the sidebar split
    pub window: Rect,
    /// Branch/view sidebar (left)
    pub sidebar: Rect,
    pub sidebar_divider: Rect,
    /// Everything right of the sidebar; container of the commits split
    pub content: Rect,
    /// Commit list (top of content)
    pub commits: Rect,
    pub commits_divider: Rect,
    /// Below the commit list; container of the file-list split
    pub lower: Rect,
    /// File list column; container of the staged split
    pub file_list: Rect,
    pub file_list_divider: Rect,
    /// Staged section (top of the file list)
    pub file_list_staged: Rect,
    pub staged_divider: Rect,
    /// Unstaged section (bottom of the file list)
    pub file_list_unstaged: Rect,
    /// Diff viewer (right of the file list)
    pub diff: Rect,
}

impl WorkspaceLayout {
    /// Lay out the window using the current split sizes
    ///
    /// ```text
    /// +--------+----------------------------------------+
    /// |        |              COMMITS                   |
    /// |  SIDE  +-------------+--------------------------+
    /// |  BAR   |   STAGED    |                          |
    /// |        +-------------+          DIFF            |
    /// |        |  UNSTAGED   |                          |
    /// +--------+-------------+--------------------------+
    /// ```
    pub fn compute(
        bounds: Rect,
        sidebar: &PanelSplit,
        commits: &PanelSplit,
        file_list: &PanelSplit,
        staged: &PanelSplit,
    ) -> Self {
        let (sidebar_rect, sidebar_divider, content) = sidebar.regions(bounds);
        let (commits_rect, commits_divider, lower) = commits.regions(content);
        let (file_list_rect, file_list_divider, diff) = file_list.regions(lower);
        let (file_list_staged, staged_divider, file_list_unstaged) =
            staged.regions(file_list_rect);

        Self {
            window: bounds,
            sidebar: sidebar_rect,
            sidebar_divider,
            content,
            commits: commits_rect,
            commits_divider,
            lower,
            file_list: file_list_rect,
            file_list_divider,
            file_list_staged,
            staged_divider,
            file_list_unstaged,
            diff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::{Axis, DIVIDER_THICKNESS, PointerCapture, SplitConfig};
    use crate::store::{MemoryStore, SharedStore};
    use std::rc::Rc;

    fn split(axis: Axis, size: u32) -> PanelSplit {
        let store: SharedStore = Rc::new(MemoryStore::new());
        PanelSplit::new(
            SplitConfig::new(axis).with_initial_size(size).with_bounds(0, 2000),
            store,
            PointerCapture::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_workspace_layout() {
        let bounds = Rect::from_size(1280.0, 720.0);
        let layout = WorkspaceLayout::compute(
            bounds,
            &split(Axis::Horizontal, 220),
            &split(Axis::Vertical, 200),
            &split(Axis::Horizontal, 280),
            &split(Axis::Vertical, 150),
        );

        assert_eq!(layout.sidebar.width, 220.0);
        assert_eq!(layout.content.x, 220.0 + DIVIDER_THICKNESS);
        assert_eq!(layout.commits.height, 200.0);
        assert_eq!(layout.lower.y, 200.0 + DIVIDER_THICKNESS);
        assert_eq!(layout.file_list.width, 280.0);
        assert_eq!(layout.file_list_staged.height, 150.0);
        assert_eq!(
            layout.file_list_unstaged.height,
            layout.lower.height - 150.0 - DIVIDER_THICKNESS
        );
        assert_eq!(layout.diff.right(), 1280.0);
        assert_eq!(layout.diff.bottom(), 720.0);
    }

    #[test]
    fn test_small_window_never_overflows() {
        let bounds = Rect::from_size(300.0, 200.0);
        let layout = WorkspaceLayout::compute(
            bounds,
            &split(Axis::Horizontal, 400),
            &split(Axis::Vertical, 500),
            &split(Axis::Horizontal, 280),
            &split(Axis::Vertical, 150),
        );
        assert!(layout.sidebar.right() <= bounds.right());
        assert!(layout.diff.width >= 0.0);
        assert!(layout.commits.bottom() <= bounds.bottom());
    }
}

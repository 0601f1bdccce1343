//! Panel layout engine - a resizable two-region split with a draggable divider
//!
//! A [`PanelSplit`] owns the size of its first region. The size is clamped to
//! `[min_size, max_size]` at construction and after every change, and is
//! written to the [`KeyValueStore`](crate::store::KeyValueStore) whenever it
//! changes.
//!
//! Dragging goes through a window-wide [`PointerCapture`]: while a split holds
//! the capture it receives every pointer move, even outside its bounds. The
//! capture is held by a [`CaptureGuard`] inside the drag session, so ending,
//! cancelling or dropping the split always releases it.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::input::{EventResponse, InputEvent, MouseButton};
use crate::layout::Rect;
use crate::store::SharedStore;

/// Thickness of the draggable divider in pixels
pub const DIVIDER_THICKNESS: f32 = 4.0;

/// Which dimension of the first region the split controls
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// Regions side by side; the split sizes the first region's width
    Horizontal,
    /// Regions stacked; the split sizes the first region's height
    Vertical,
}

impl Axis {
    /// The pointer component that moves the divider
    pub fn component(self, x: f32, y: f32) -> f32 {
        match self {
            Axis::Horizontal => x,
            Axis::Vertical => y,
        }
    }

    fn extent(self, bounds: &Rect) -> f32 {
        match self {
            Axis::Horizontal => bounds.width,
            Axis::Vertical => bounds.height,
        }
    }
}

/// Unique identifier for a split
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SplitId(pub u64);

impl SplitId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        SplitId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SplitId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("min size {min} exceeds max size {max}")]
    InvalidBounds { min: u32, max: u32 },
}

/// Construction parameters for a [`PanelSplit`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitConfig {
    pub axis: Axis,
    pub initial_size: u32,
    pub min_size: u32,
    pub max_size: u32,
    /// Storage key; `None` disables persistence
    pub persistence_key: Option<String>,
}

impl SplitConfig {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            initial_size: 250,
            min_size: 100,
            max_size: 800,
            persistence_key: None,
        }
    }

    pub fn with_initial_size(mut self, size: u32) -> Self {
        self.initial_size = size;
        self
    }

    pub fn with_bounds(mut self, min_size: u32, max_size: u32) -> Self {
        self.min_size = min_size;
        self.max_size = max_size;
        self
    }

    pub fn with_persistence_key(mut self, key: impl Into<String>) -> Self {
        self.persistence_key = Some(key.into());
        self
    }
}

/// Window-wide pointer tracking. At most one split holds it at a time.
///
/// Clones share the same slot, so every split of a window is handed a clone
/// of one capture.
#[derive(Clone, Debug, Default)]
pub struct PointerCapture {
    owner: Rc<Cell<Option<SplitId>>>,
}

impl PointerCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// The split currently receiving global pointer events
    pub fn owner(&self) -> Option<SplitId> {
        self.owner.get()
    }

    pub fn is_captured(&self) -> bool {
        self.owner.get().is_some()
    }

    /// Acquire the capture for `id`. Fails if anyone already holds it.
    pub fn acquire(&self, id: SplitId) -> Option<CaptureGuard> {
        if self.owner.get().is_some() {
            return None;
        }
        self.owner.set(Some(id));
        Some(CaptureGuard {
            owner: id,
            slot: Rc::clone(&self.owner),
        })
    }
}

/// Releases the pointer capture when dropped
#[derive(Debug)]
pub struct CaptureGuard {
    owner: SplitId,
    slot: Rc<Cell<Option<SplitId>>>,
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        if self.slot.get() == Some(self.owner) {
            self.slot.set(None);
        }
    }
}

/// An active drag. Dropping it releases the pointer capture.
#[derive(Debug)]
struct DragSession {
    start_position: f32,
    start_size: u32,
    moved: bool,
    _capture: CaptureGuard,
}

/// Actions produced by a split
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitAction {
    /// The first region's size changed
    Resized(u32),
}

/// A resizable boundary between two regions
pub struct PanelSplit {
    id: SplitId,
    axis: Axis,
    size: u32,
    min_size: u32,
    max_size: u32,
    persistence_key: Option<String>,
    store: SharedStore,
    capture: PointerCapture,
    session: Option<DragSession>,
    pending_action: Option<SplitAction>,
}

impl PanelSplit {
    /// Create a split. The size is the persisted value when present and
    /// numeric, otherwise `initial_size`, clamped either way.
    pub fn new(
        config: SplitConfig,
        store: SharedStore,
        capture: PointerCapture,
    ) -> Result<Self, SplitError> {
        if config.min_size > config.max_size {
            return Err(SplitError::InvalidBounds {
                min: config.min_size,
                max: config.max_size,
            });
        }

        let persisted = config
            .persistence_key
            .as_deref()
            .and_then(|key| read_persisted_size(&store, key));
        let raw = persisted.unwrap_or(i64::from(config.initial_size));
        let size = clamp_size(raw, config.min_size, config.max_size);

        Ok(Self {
            id: SplitId::new(),
            axis: config.axis,
            size,
            min_size: config.min_size,
            max_size: config.max_size,
            persistence_key: config.persistence_key,
            store,
            capture,
            session: None,
            pending_action: None,
        })
    }

    pub fn id(&self) -> SplitId {
        self.id
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn min_size(&self) -> u32 {
        self.min_size
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    pub fn persistence_key(&self) -> Option<&str> {
        self.persistence_key.as_deref()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// Take the pending action
    pub fn take_action(&mut self) -> Option<SplitAction> {
        self.pending_action.take()
    }

    /// Start a drag at the given pointer position.
    ///
    /// Returns `false` if this split is already dragging or another split
    /// holds the pointer capture.
    pub fn begin_drag(&mut self, x: f32, y: f32) -> bool {
        if self.session.is_some() {
            return false;
        }
        self.begin_drag_from(x, y, self.size)
    }

    /// Start a drag whose origin is the size currently on screen, which is
    /// smaller than `size` when the container is too narrow to show it.
    fn begin_drag_from(&mut self, x: f32, y: f32, start_size: u32) -> bool {
        if self.session.is_some() {
            return false;
        }
        let Some(capture) = self.capture.acquire(self.id) else {
            tracing::debug!(split = self.id.0, "pointer already captured, drag refused");
            return false;
        };
        self.session = Some(DragSession {
            start_position: self.axis.component(x, y),
            start_size,
            moved: false,
            _capture: capture,
        });
        true
    }

    /// Follow the pointer. Returns the new size when it changed; no-op
    /// without an active session.
    pub fn update_drag(&mut self, x: f32, y: f32) -> Option<u32> {
        let session = self.session.as_mut()?;
        let delta = self.axis.component(x, y) - session.start_position;
        // A press and release in place is a click, not a resize
        if !session.moved && delta.round() == 0.0 {
            return None;
        }
        session.moved = true;
        let candidate = i64::from(session.start_size) + delta.round() as i64;
        let size = clamp_size(candidate, self.min_size, self.max_size);
        tracing::trace!(split = self.id.0, candidate, size, "drag update");
        self.apply_size(size)
    }

    /// Finish the drag, releasing the capture. The size already holds the
    /// last clamped value.
    pub fn end_drag(&mut self) -> Option<u32> {
        self.session.take().map(|_| self.size)
    }

    /// Abort the drag (pointer left the window). Keeps the current size.
    pub fn cancel_drag(&mut self) {
        if self.session.take().is_some() {
            tracing::debug!(split = self.id.0, size = self.size, "drag cancelled");
        }
    }

    /// Programmatic resize. Returns the clamped size.
    pub fn resize(&mut self, size: u32) -> u32 {
        let size = clamp_size(i64::from(size), self.min_size, self.max_size);
        self.apply_size(size);
        self.size
    }

    /// Change the bounds, re-clamping the current size.
    pub fn set_bounds(&mut self, min_size: u32, max_size: u32) -> Result<(), SplitError> {
        if min_size > max_size {
            return Err(SplitError::InvalidBounds {
                min: min_size,
                max: max_size,
            });
        }
        self.min_size = min_size;
        self.max_size = max_size;
        let size = clamp_size(i64::from(self.size), min_size, max_size);
        self.apply_size(size);
        Ok(())
    }

    /// Write the current size under the persistence key. Failures are logged
    /// and dropped.
    pub fn persist(&self) {
        let Some(key) = self.persistence_key.as_deref() else {
            return;
        };
        if let Err(e) = self.store.set(key, &self.size.to_string()) {
            tracing::warn!(key, error = %e, "failed to persist pane size");
        }
    }

    fn apply_size(&mut self, size: u32) -> Option<u32> {
        if size == self.size {
            return None;
        }
        self.size = size;
        self.persist();
        self.pending_action = Some(SplitAction::Resized(size));
        Some(size)
    }

    /// Split `bounds` into (first region, divider, second region)
    pub fn regions(&self, bounds: Rect) -> (Rect, Rect, Rect) {
        let extent = self.axis.extent(&bounds);
        let first = (self.size as f32).min((extent - DIVIDER_THICKNESS).max(0.0));
        match self.axis {
            Axis::Horizontal => {
                let (first_rect, rest) = bounds.take_left(first);
                let (divider, second) = rest.take_left(DIVIDER_THICKNESS);
                (first_rect, divider, second)
            }
            Axis::Vertical => {
                let (first_rect, rest) = bounds.take_top(first);
                let (divider, second) = rest.take_top(DIVIDER_THICKNESS);
                (first_rect, divider, second)
            }
        }
    }

    /// Route a pointer event. While dragging, moves and releases are
    /// consumed wherever they happen.
    pub fn handle_event(&mut self, event: &InputEvent, bounds: Rect) -> EventResponse {
        match event {
            InputEvent::MouseDown { button: MouseButton::Left, x, y } => {
                let (first, divider, _) = self.regions(bounds);
                let shown = self.axis.extent(&first).round() as u32;
                if event.is_within(&divider) && self.begin_drag_from(*x, *y, shown) {
                    return EventResponse::Consumed;
                }
            }
            InputEvent::MouseMove { x, y } => {
                if self.is_dragging() {
                    self.update_drag(*x, *y);
                    return EventResponse::Consumed;
                }
            }
            InputEvent::MouseUp { button: MouseButton::Left, x, y } => {
                if self.is_dragging() {
                    self.update_drag(*x, *y);
                    self.end_drag();
                    return EventResponse::Consumed;
                }
            }
            InputEvent::CursorLeft => {
                if self.is_dragging() {
                    self.cancel_drag();
                    return EventResponse::Consumed;
                }
            }
            _ => {}
        }
        EventResponse::Ignored
    }
}

impl Drop for PanelSplit {
    fn drop(&mut self) {
        if self.session.take().is_some() {
            tracing::debug!(split = self.id.0, "split dropped mid-drag, capture released");
        }
    }
}

fn clamp_size(size: i64, min_size: u32, max_size: u32) -> u32 {
    size.clamp(i64::from(min_size), i64::from(max_size)) as u32
}

/// Read a persisted size. Missing, unreadable or non-numeric values are `None`.
fn read_persisted_size(store: &SharedStore, key: &str) -> Option<i64> {
    match store.get(key) {
        Ok(Some(raw)) => {
            let parsed = raw.trim().parse::<i64>().ok();
            if parsed.is_none() {
                tracing::debug!(key, raw = %raw, "ignoring non-numeric pane size");
            }
            parsed
        }
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read pane size");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyValueStore, MemoryStore};

    fn split_with(config: SplitConfig) -> (PanelSplit, Rc<MemoryStore>, PointerCapture) {
        let store = Rc::new(MemoryStore::new());
        let capture = PointerCapture::new();
        let split = PanelSplit::new(config, store.clone(), capture.clone()).unwrap();
        (split, store, capture)
    }

    #[test]
    fn test_drag_clamps_to_min() {
        let config = SplitConfig::new(Axis::Vertical)
            .with_initial_size(250)
            .with_bounds(100, 500);
        let (mut split, _, _) = split_with(config);

        assert!(split.begin_drag(0.0, 250.0));
        split.update_drag(0.0, 10.0);
        assert_eq!(split.end_drag(), Some(100));
        assert_eq!(split.size(), 100);
    }

    #[test]
    fn test_drag_uses_axis_component() {
        let config = SplitConfig::new(Axis::Horizontal).with_initial_size(200);
        let (mut split, _, _) = split_with(config);

        split.begin_drag(200.0, 50.0);
        // Vertical movement is irrelevant for a horizontal split
        assert_eq!(split.update_drag(200.0, 400.0), None);
        assert_eq!(split.update_drag(260.0, 400.0), Some(260));
        // Delta is relative to the drag start, not the previous update
        assert_eq!(split.update_drag(230.0, 0.0), Some(230));
    }

    #[test]
    fn test_drag_starts_from_visible_size_in_narrow_window() {
        let (mut split, _, capture) = split_with(
            SplitConfig::new(Axis::Horizontal).with_initial_size(500),
        );
        let bounds = Rect::from_size(304.0, 100.0);
        let (first, divider, _) = split.regions(bounds);
        assert_eq!(first.width, 300.0);
        assert_eq!(divider.x, 300.0);

        let down = InputEvent::MouseDown { button: MouseButton::Left, x: 301.0, y: 50.0 };
        let up = InputEvent::MouseUp { button: MouseButton::Left, x: 301.0, y: 50.0 };
        // A click on the divider leaves the stored size alone
        assert!(split.handle_event(&down, bounds).is_consumed());
        assert!(split.handle_event(&up, bounds).is_consumed());
        assert_eq!(split.size(), 500);

        split.handle_event(&down, bounds);
        split.handle_event(&InputEvent::MouseMove { x: 291.0, y: 50.0 }, bounds);
        assert_eq!(split.size(), 290);
        split.handle_event(&InputEvent::MouseUp { button: MouseButton::Left, x: 291.0, y: 50.0 }, bounds);
        assert!(!capture.is_captured());
    }

    #[test]
    fn test_update_without_session_is_noop() {
        let (mut split, store, _) = split_with(
            SplitConfig::new(Axis::Vertical).with_persistence_key("k"),
        );
        assert_eq!(split.update_drag(0.0, 999.0), None);
        assert_eq!(split.size(), 250);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_persisted_size_wins_and_is_clamped() {
        let store = Rc::new(MemoryStore::new());
        store.insert_raw("pane", "300");
        let config = SplitConfig::new(Axis::Horizontal)
            .with_initial_size(220)
            .with_bounds(180, 400)
            .with_persistence_key("pane");
        let split = PanelSplit::new(config.clone(), store.clone(), PointerCapture::new()).unwrap();
        assert_eq!(split.size(), 300);

        store.insert_raw("pane", "9000");
        let split = PanelSplit::new(config.clone(), store.clone(), PointerCapture::new()).unwrap();
        assert_eq!(split.size(), 400);

        store.insert_raw("pane", "wide");
        let split = PanelSplit::new(config, store, PointerCapture::new()).unwrap();
        assert_eq!(split.size(), 220);
    }

    #[test]
    fn test_initial_size_is_clamped() {
        let (split, _, _) =
            split_with(SplitConfig::new(Axis::Vertical).with_initial_size(20).with_bounds(80, 400));
        assert_eq!(split.size(), 80);
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let store: SharedStore = Rc::new(MemoryStore::new());
        let result = PanelSplit::new(
            SplitConfig::new(Axis::Vertical).with_bounds(500, 100),
            store,
            PointerCapture::new(),
        );
        assert_eq!(
            result.err(),
            Some(SplitError::InvalidBounds { min: 500, max: 100 })
        );
    }

    #[test]
    fn test_resize_persists_and_reloads() {
        let config = SplitConfig::new(Axis::Horizontal).with_persistence_key("pane");
        let (mut split, store, _) = split_with(config.clone());

        assert_eq!(split.resize(333), 333);
        assert_eq!(store.get("pane").unwrap().as_deref(), Some("333"));
        assert_eq!(split.take_action(), Some(SplitAction::Resized(333)));

        let reloaded = PanelSplit::new(config, store, PointerCapture::new()).unwrap();
        assert_eq!(reloaded.size(), 333);
    }

    #[test]
    fn test_persist_failure_is_not_fatal() {
        let config = SplitConfig::new(Axis::Horizontal).with_persistence_key("pane");
        let (mut split, store, _) = split_with(config);
        store.set_fail_writes(true);
        assert_eq!(split.resize(300), 300);
        assert_eq!(split.size(), 300);
    }

    #[test]
    fn test_unreadable_store_falls_back() {
        let store = Rc::new(MemoryStore::new());
        store.insert_raw("pane", "300");
        store.set_fail_reads(true);
        let split = PanelSplit::new(
            SplitConfig::new(Axis::Horizontal).with_persistence_key("pane"),
            store,
            PointerCapture::new(),
        )
        .unwrap();
        assert_eq!(split.size(), 250);
    }

    #[test]
    fn test_capture_is_exclusive_and_released() {
        let store: SharedStore = Rc::new(MemoryStore::new());
        let capture = PointerCapture::new();
        let mut a =
            PanelSplit::new(SplitConfig::new(Axis::Horizontal), store.clone(), capture.clone())
                .unwrap();
        let mut b =
            PanelSplit::new(SplitConfig::new(Axis::Vertical), store, capture.clone()).unwrap();

        assert!(a.begin_drag(0.0, 0.0));
        assert!(!a.begin_drag(0.0, 0.0));
        assert!(!b.begin_drag(0.0, 0.0));
        assert_eq!(capture.owner(), Some(a.id()));

        a.end_drag();
        assert!(!capture.is_captured());
        assert!(b.begin_drag(0.0, 0.0));
        b.cancel_drag();
        assert!(!capture.is_captured());
    }

    #[test]
    fn test_teardown_releases_capture() {
        let (mut split, _, capture) = split_with(SplitConfig::new(Axis::Vertical));
        split.begin_drag(0.0, 0.0);
        assert!(capture.is_captured());
        drop(split);
        assert!(!capture.is_captured());
    }

    #[test]
    fn test_set_bounds_reclamps() {
        let (mut split, _, _) = split_with(SplitConfig::new(Axis::Vertical).with_initial_size(450));
        split.set_bounds(100, 300).unwrap();
        assert_eq!(split.size(), 300);
        assert!(split.set_bounds(10, 5).is_err());
        assert_eq!(split.max_size(), 300);
    }

    #[test]
    fn test_handle_event_drag_on_divider() {
        let (mut split, _, capture) =
            split_with(SplitConfig::new(Axis::Horizontal).with_initial_size(200));
        let bounds = Rect::from_size(1000.0, 600.0);

        // Pressing inside the first region does nothing
        let miss = InputEvent::MouseDown { button: MouseButton::Left, x: 50.0, y: 10.0 };
        assert_eq!(split.handle_event(&miss, bounds), EventResponse::Ignored);

        let down = InputEvent::MouseDown { button: MouseButton::Left, x: 201.0, y: 10.0 };
        assert!(split.handle_event(&down, bounds).is_consumed());
        assert!(capture.is_captured());

        // Moves far outside the bounds still track
        let far = InputEvent::MouseMove { x: 5000.0, y: -40.0 };
        assert!(split.handle_event(&far, bounds).is_consumed());
        assert_eq!(split.size(), 800);

        let up = InputEvent::MouseUp { button: MouseButton::Left, x: 301.0, y: 10.0 };
        assert!(split.handle_event(&up, bounds).is_consumed());
        assert_eq!(split.size(), 300);
        assert!(!split.is_dragging());
        assert!(!capture.is_captured());
    }

    #[test]
    fn test_cursor_left_cancels() {
        let (mut split, _, capture) = split_with(SplitConfig::new(Axis::Vertical));
        split.begin_drag(0.0, 250.0);
        split.update_drag(0.0, 300.0);
        let response = split.handle_event(&InputEvent::CursorLeft, Rect::from_size(500.0, 900.0));
        assert!(response.is_consumed());
        assert_eq!(split.size(), 300);
        assert!(!capture.is_captured());
    }

    #[test]
    fn test_regions_vertical() {
        let (split, _, _) = split_with(SplitConfig::new(Axis::Vertical).with_initial_size(200));
        let (top, divider, bottom) = split.regions(Rect::new(0.0, 100.0, 400.0, 600.0));
        assert_eq!(top, Rect::new(0.0, 100.0, 400.0, 200.0));
        assert_eq!(divider, Rect::new(0.0, 300.0, 400.0, DIVIDER_THICKNESS));
        assert_eq!(bottom.y, 304.0);
        assert_eq!(bottom.height, 396.0);
    }
}

//! Pointer input for the workspace
//!
//! The shell translates native window events into [`InputEvent`]s; the
//! layout engine only ever sees these.

use crate::layout::Rect;

/// Mouse buttons
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

/// A pointer event in window coordinates
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    /// Mouse button pressed
    MouseDown { button: MouseButton, x: f32, y: f32 },

    /// Mouse button released
    MouseUp { button: MouseButton, x: f32, y: f32 },

    /// Mouse moved
    MouseMove { x: f32, y: f32 },

    /// Pointer left the window (or the platform cancelled the gesture)
    CursorLeft,
}

impl InputEvent {
    /// Get the position of a mouse event, if applicable
    pub fn position(&self) -> Option<(f32, f32)> {
        match self {
            InputEvent::MouseDown { x, y, .. }
            | InputEvent::MouseUp { x, y, .. }
            | InputEvent::MouseMove { x, y } => Some((*x, *y)),
            InputEvent::CursorLeft => None,
        }
    }

    /// Check if this event is within a given rect
    pub fn is_within(&self, rect: &Rect) -> bool {
        if let Some((x, y)) = self.position() {
            rect.contains(x, y)
        } else {
            false
        }
    }
}

/// Response from handling an input event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EventResponse {
    /// Event was not handled, should bubble up
    #[default]
    Ignored,
    /// Event was handled, stop propagation
    Consumed,
}

impl EventResponse {
    pub fn is_consumed(&self) -> bool {
        matches!(self, EventResponse::Consumed)
    }
}

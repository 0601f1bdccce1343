//! Layout module - rectangle math and workspace layout

mod workspace;

pub use workspace::WorkspaceLayout;

/// A rectangle in window coordinates (pixels, origin top-left)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_size(width: f32, height: f32) -> Self {
        Self { x: 0.0, y: 0.0, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Take a fixed height from the top
    pub fn take_top(&self, height: f32) -> (Rect, Rect) {
        let height = height.clamp(0.0, self.height);
        let top = Rect::new(self.x, self.y, self.width, height);
        let bottom = Rect::new(self.x, self.y + height, self.width, self.height - height);
        (top, bottom)
    }

    /// Take a fixed width from the left
    pub fn take_left(&self, width: f32) -> (Rect, Rect) {
        let width = width.clamp(0.0, self.width);
        let left = Rect::new(self.x, self.y, width, self.height);
        let right = Rect::new(self.x + width, self.y, self.width - width, self.height);
        (left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_left_clamps_to_width() {
        let bounds = Rect::from_size(100.0, 50.0);
        let (left, right) = bounds.take_left(150.0);
        assert_eq!(left.width, 100.0);
        assert_eq!(right.width, 0.0);
        assert_eq!(right.x, 100.0);
    }

    #[test]
    fn test_take_top_and_contains() {
        let bounds = Rect::new(10.0, 10.0, 100.0, 100.0);
        let (top, bottom) = bounds.take_top(30.0);
        assert!(top.contains(10.0, 39.0));
        assert!(!top.contains(10.0, 40.0));
        assert!(bottom.contains(10.0, 40.0));
        assert_eq!(bottom.height, 70.0);
    }
}

use super::scene::Vec2;

/// Axis-aligned rectangle in world units, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// Placeholder hitbox for characters that must not collide (the dead).
pub const DEGENERATE_RECT: Rect = Rect {
    x: -1000.0,
    y: -1000.0,
    w: 1.0,
    h: 1.0,
};

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    /// Strict overlap test. Rectangles that only share an edge do not
    /// intersect, and empty rectangles never intersect anything.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.w, self.h)
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }
}

/// Returns the key of the first candidate overlapping `rect`, in the
/// iteration order of `candidates`. Never picks the nearest match.
pub fn first_colliding<'a, K, I>(rect: &Rect, candidates: I) -> Option<K>
where
    I: IntoIterator<Item = (K, &'a Rect)>,
{
    candidates
        .into_iter()
        .find(|(_, candidate)| rect.intersects(candidate))
        .map(|(key, _)| key)
}

use super::geometry::Rect;
use super::scene::Vec2;

/// Draw pass an item belongs to. Items in the same pass are ordered by
/// their y-sort key; passes are drawn in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DrawKind {
    Ground,
    Bridge,
    Sorted,
    Above,
}

/// One cell of a sprite sheet: the row is the animation state/facing, the
/// column the animation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteCell {
    pub row: u32,
    pub column: u32,
    pub size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowDesc {
    pub length: f32,
    pub alpha: u8,
    pub flattened: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawColor {
    White,
    Grey,
    Black,
    Red,
    Green,
    Blue,
    Yellow,
    Water,
    Terrain,
}

impl DrawColor {
    pub fn rgba(self) -> [u8; 4] {
        match self {
            DrawColor::White => [255, 255, 255, 255],
            DrawColor::Grey => [150, 150, 150, 255],
            DrawColor::Black => [0, 0, 0, 255],
            DrawColor::Red => [255, 0, 0, 255],
            DrawColor::Green => [0, 255, 0, 255],
            DrawColor::Blue => [0, 0, 255, 255],
            DrawColor::Yellow => [255, 220, 60, 255],
            DrawColor::Water => [40, 90, 160, 255],
            DrawColor::Terrain => [74, 112, 56, 255],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub kind: DrawKind,
    pub sprite: String,
    pub position: Vec2,
    pub size: Vec2,
    pub cell: Option<SpriteCell>,
    pub y_sort: f32,
    pub y_shift: f32,
    pub shadow: Option<ShadowDesc>,
    pub color: DrawColor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRect {
    pub rect: Rect,
    pub color: DrawColor,
    pub filled: bool,
    pub screen_space: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub position_px: Vec2,
    pub color: DrawColor,
}

/// Everything the render sink needs for one presented frame.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    camera: Vec2,
    darkness: u8,
    items: Vec<DrawItem>,
    rects: Vec<DrawRect>,
    text: Vec<TextLine>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.camera = Vec2::ZERO;
        self.darkness = 0;
        self.items.clear();
        self.rects.clear();
        self.text.clear();
    }

    pub fn set_camera(&mut self, camera: Vec2) {
        self.camera = camera;
    }

    pub fn camera(&self) -> Vec2 {
        self.camera
    }

    pub fn set_darkness(&mut self, darkness: u8) {
        self.darkness = darkness;
    }

    pub fn darkness(&self) -> u8 {
        self.darkness
    }

    pub fn push_item(&mut self, item: DrawItem) {
        self.items.push(item);
    }

    pub fn push_rect(&mut self, rect: DrawRect) {
        self.rects.push(rect);
    }

    pub fn push_text(&mut self, text: impl Into<String>, position_px: Vec2, color: DrawColor) {
        self.text.push(TextLine {
            text: text.into(),
            position_px,
            color,
        });
    }

    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    pub fn rects(&self) -> &[DrawRect] {
        &self.rects
    }

    pub fn text(&self) -> &[TextLine] {
        &self.text
    }

    /// Items in presentation order: by pass, then by y-sort key. Equal keys
    /// keep push order.
    pub fn sorted_items(&self) -> Vec<&DrawItem> {
        let mut sorted = self.items.iter().collect::<Vec<_>>();
        sorted.sort_by(|a, b| {
            a.kind
                .cmp(&b.kind)
                .then_with(|| a.y_sort.total_cmp(&b.y_sort))
        });
        sorted
    }
}

use crate::app::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn contains_span(&self, left: i32, top: i32, right: i32, bottom: i32) -> bool {
        right >= 0 && bottom >= 0 && left < self.width as i32 && top < self.height as i32
    }
}

/// Maps a world position to window pixels. The camera is the world position
/// of the window's top-left corner, so both spaces grow downward.
pub fn world_to_screen(world: Vec2, camera: Vec2) -> (i32, i32) {
    let x = world.x - camera.x;
    let y = world.y - camera.y;
    (x.round() as i32, y.round() as i32)
}

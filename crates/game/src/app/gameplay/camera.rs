use engine::Vec2;

pub(crate) const VIEWPORT_WIDTH: f32 = 1280.0;
pub(crate) const VIEWPORT_HEIGHT: f32 = 800.0;
const FOLLOW_MARGIN: f32 = 200.0;

/// Top-left of the visible world area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Camera {
    position: Vec2,
}

impl Camera {
    pub(crate) fn new(position: Vec2) -> Self {
        Self { position }
    }

    pub(crate) fn position(&self) -> Vec2 {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Keeps `target` inside the margin band; outdoors the view stays on the map.
    pub(crate) fn follow(&mut self, target: Vec2, map_size: Vec2, clamp_to_map: bool) {
        let screen_x = target.x - self.position.x;
        let screen_y = target.y - self.position.y;

        if screen_x < FOLLOW_MARGIN {
            self.position.x = target.x - FOLLOW_MARGIN;
        } else if screen_x > VIEWPORT_WIDTH - FOLLOW_MARGIN {
            self.position.x = target.x - (VIEWPORT_WIDTH - FOLLOW_MARGIN);
        }
        if screen_y < FOLLOW_MARGIN {
            self.position.y = target.y - FOLLOW_MARGIN;
        } else if screen_y > VIEWPORT_HEIGHT - FOLLOW_MARGIN {
            self.position.y = target.y - (VIEWPORT_HEIGHT - FOLLOW_MARGIN);
        }

        if clamp_to_map {
            let max_x = (map_size.x - VIEWPORT_WIDTH).max(0.0);
            let max_y = (map_size.y - VIEWPORT_HEIGHT).max(0.0);
            self.position.x = self.position.x.clamp(0.0, max_x);
            self.position.y = self.position.y.clamp(0.0, max_y);
        }
    }
}

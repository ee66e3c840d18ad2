use engine::{Rect, SpriteCell, Vec2};

use super::character::{CharacterId, Facing, ProjectileSpawn, SPRITE_SIZE};
use super::items::ProjectileKind;

pub(crate) const PROJECTILE_GRACE_FRAMES: u32 = 5;
pub(crate) const PROJECTILE_MAX_AGE_FRAMES: u32 = 200;

const SHAFT_LENGTH: f32 = 16.0;
const SHAFT_WIDTH: f32 = 4.0;
const RELEASE_HEIGHT: f32 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Projectile {
    owner: CharacterId,
    kind: ProjectileKind,
    position: Vec2,
    facing: Facing,
    speed: f32,
    damage: i32,
    age: u32,
}

impl Projectile {
    pub(crate) fn spawn(owner: CharacterId, spawn: &ProjectileSpawn) -> Self {
        Self {
            owner,
            kind: spawn.kind,
            position: Vec2::new(spawn.origin.x, spawn.origin.y + RELEASE_HEIGHT),
            facing: spawn.facing,
            speed: spawn.kind.speed(),
            damage: spawn.damage,
            age: 0,
        }
    }

    pub(crate) fn owner(&self) -> CharacterId {
        self.owner
    }

    pub(crate) fn position(&self) -> Vec2 {
        self.position
    }

    pub(crate) fn facing(&self) -> Facing {
        self.facing
    }

    pub(crate) fn damage(&self) -> i32 {
        self.damage
    }

    #[cfg(test)]
    pub(crate) fn age(&self) -> u32 {
        self.age
    }

    pub(crate) fn sprite(&self) -> &'static str {
        self.kind.sprite()
    }

    pub(crate) fn advance(&mut self) {
        self.position += self.facing.unit() * self.speed;
        self.age = self.age.saturating_add(1);
    }

    /// Freshly fired projectiles skip hit detection for a few frames.
    pub(crate) fn is_active(&self) -> bool {
        self.age >= PROJECTILE_GRACE_FRAMES
    }

    pub(crate) fn is_expired(&self) -> bool {
        self.age > PROJECTILE_MAX_AGE_FRAMES
    }

    /// Shaft-shaped box along the flight direction, tip at the position.
    pub(crate) fn hitbox(&self) -> Rect {
        let Vec2 { x, y } = self.position;
        match self.facing {
            Facing::Up => Rect::new(x - SHAFT_WIDTH / 2.0, y, SHAFT_WIDTH, SHAFT_LENGTH),
            Facing::Down => Rect::new(
                x - SHAFT_WIDTH / 2.0,
                y - SHAFT_LENGTH,
                SHAFT_WIDTH,
                SHAFT_LENGTH,
            ),
            Facing::Left => Rect::new(x, y - SHAFT_WIDTH / 2.0, SHAFT_LENGTH, SHAFT_WIDTH),
            Facing::Right => Rect::new(
                x - SHAFT_LENGTH,
                y - SHAFT_WIDTH / 2.0,
                SHAFT_LENGTH,
                SHAFT_WIDTH,
            ),
        }
    }

    pub(crate) fn sprite_cell(&self) -> SpriteCell {
        SpriteCell {
            row: self.facing.sprite_row(),
            column: 0,
            size: SPRITE_SIZE,
        }
    }
}

mod camera;
mod character;
mod clock;
mod compactor;
mod content;
mod items;
mod loot;
mod map;
mod menu;
mod messages;
mod overlay;
mod projectile;
mod scene_impl;
mod scripts;
mod shadow;
mod trigger;
mod world;

use engine::{Scene, Vec2};
use rand::Rng;

pub(crate) use map::{MapCache, MapCacheError, MapSource, TmxDirectory};
pub(crate) use scene_impl::GameScene;
pub(crate) use scripts::{ScriptRegistry, ScriptRegistryError};
pub(crate) use world::World;

pub(crate) const PLAYER_SPAWN: Vec2 = Vec2::new(300.0, 300.0);

/// Loads `start_map`, places the player and the demo population, and wraps
/// the world in the playable scene.
pub(crate) fn build_scene(
    source: Box<dyn MapSource>,
    registry: ScriptRegistry,
    start_map: &str,
    draw_hitboxes: bool,
    rng: &mut impl Rng,
) -> Result<Box<dyn Scene>, MapCacheError> {
    let mut world = World::new(MapCache::new(source), registry, start_map, PLAYER_SPAWN)?;
    content::populate_demo(&mut world, rng);
    Ok(Box::new(GameScene::new(world, draw_hitboxes)))
}

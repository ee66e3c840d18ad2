use std::collections::HashMap;

use engine::Vec2;

use super::character::Character;
use super::loot::Loot;

/// What a map looked like when the player last left it.
#[derive(Debug, Clone)]
pub(crate) struct MapOverlay {
    pub(crate) npcs: Vec<Character>,
    pub(crate) loot: Vec<Loot>,
    pub(crate) player_position: Vec2,
    pub(crate) camera_position: Vec2,
}

#[derive(Debug, Default)]
pub(crate) struct OverlayStore {
    overlays: HashMap<String, MapOverlay>,
}

impl OverlayStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn store(&mut self, map: &str, overlay: MapOverlay) {
        self.overlays.insert(map.to_string(), overlay);
    }

    /// Removes and returns the stored overlay; the map's live state takes
    /// over until the next store.
    pub(crate) fn take(&mut self, map: &str) -> Option<MapOverlay> {
        self.overlays.remove(map)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, map: &str) -> bool {
        self.overlays.contains_key(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay(x: f32) -> MapOverlay {
        MapOverlay {
            npcs: Vec::new(),
            loot: Vec::new(),
            player_position: Vec2::new(x, 0.0),
            camera_position: Vec2::ZERO,
        }
    }

    #[test]
    fn take_returns_what_was_stored_once() {
        let mut store = OverlayStore::new();
        store.store("start.tmx", overlay(5.0));
        assert!(store.contains("start.tmx"));

        let restored = store.take("start.tmx").expect("overlay");
        assert_eq!(restored.player_position, Vec2::new(5.0, 0.0));
        assert!(store.take("start.tmx").is_none());
    }

    #[test]
    fn storing_again_replaces_previous_overlay() {
        let mut store = OverlayStore::new();
        store.store("house.tmx", overlay(1.0));
        store.store("house.tmx", overlay(2.0));
        assert_eq!(
            store.take("house.tmx").map(|overlay| overlay.player_position),
            Some(Vec2::new(2.0, 0.0))
        );
    }
}

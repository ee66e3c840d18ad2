use engine::Vec2;

use super::items::Item;

pub(crate) const PICKUP_RADIUS: f32 = 32.0;

/// An item lying on the map. A zero duration never expires.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Loot {
    position: Vec2,
    item: Item,
    icon: String,
    duration_seconds: f32,
    spawned_at: f32,
}

impl Loot {
    pub(crate) fn new(position: Vec2, item: Item, duration_seconds: f32, now: f32) -> Self {
        let icon = item.icon().to_string();
        Self {
            position,
            item,
            icon,
            duration_seconds: duration_seconds.max(0.0),
            spawned_at: now,
        }
    }

    pub(crate) fn position(&self) -> Vec2 {
        self.position
    }

    pub(crate) fn icon(&self) -> &str {
        &self.icon
    }

    pub(crate) fn into_item(self) -> Item {
        self.item
    }

    pub(crate) fn is_expired(&self, now: f32) -> bool {
        self.duration_seconds > 0.0 && now - self.spawned_at >= self.duration_seconds
    }

    pub(crate) fn within_reach(&self, point: Vec2) -> bool {
        self.position.distance(point) <= PICKUP_RADIUS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::gameplay::items::ExtraItem;

    fn trinket() -> Item {
        Item::Extra(ExtraItem {
            name: "Trinket".to_string(),
            icon: "trinket".to_string(),
        })
    }

    #[test]
    fn zero_duration_never_expires() {
        let loot = Loot::new(Vec2::new(10.0, 10.0), trinket(), 0.0, 5.0);
        assert!(!loot.is_expired(10_000.0));
        assert_eq!(loot.icon(), "trinket");
    }

    #[test]
    fn timed_loot_expires_after_duration() {
        let loot = Loot::new(Vec2::new(10.0, 10.0), trinket(), 3.0, 5.0);
        assert!(!loot.is_expired(7.9));
        assert!(loot.is_expired(8.0));
    }

    #[test]
    fn reach_is_a_radius_check() {
        let loot = Loot::new(Vec2::new(0.0, 0.0), trinket(), 0.0, 0.0);
        assert!(loot.within_reach(Vec2::new(32.0, 0.0)));
        assert!(!loot.within_reach(Vec2::new(23.0, 23.0)));
    }
}

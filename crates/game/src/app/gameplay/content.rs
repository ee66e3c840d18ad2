use engine::Vec2;
use rand::Rng;

use super::character::{Character, CharacterId};
use super::items::{Ammo, AttackKind, ExtraItem, Food, Item, Outfit, ProjectileKind, Weapon};
use super::scripts::NpcKind;
use super::world::World;

const DUMMY_ANCHOR: Vec2 = Vec2::new(700.0, 60.0);
const RANDOM_DUMMY_COUNT: usize = 9;

fn weapon(name: &str, attack: AttackKind, damage: i32, range: f32, durability_hit: f32) -> Weapon {
    Weapon {
        name: name.to_string(),
        icon: name.to_ascii_lowercase(),
        attack,
        damage,
        range,
        ranged: false,
        projectile: None,
        durability: 100.0,
        durability_hit,
    }
}

pub(crate) fn hands() -> Weapon {
    weapon("Hands", AttackKind::Slash, 2, 20.0, 0.0)
}

pub(crate) fn dagger() -> Weapon {
    weapon("Dagger", AttackKind::Slash, 10, 20.0, 0.5)
}

pub(crate) fn spear() -> Weapon {
    weapon("Spear", AttackKind::Thrust, 20, 30.0, 1.0)
}

pub(crate) fn bow() -> Weapon {
    Weapon {
        ranged: true,
        projectile: Some(ProjectileKind::Arrow),
        ..weapon("Bow", AttackKind::Bow, 2, 10.0, 0.2)
    }
}

pub(crate) fn arrows(count: u32) -> Ammo {
    Ammo {
        name: "Arrows".to_string(),
        icon: "arrows".to_string(),
        count,
        projectile: ProjectileKind::Arrow,
        damage: 15,
    }
}

fn outfit(name: &str, icon: &str, armor: i32, has_hood: bool) -> Outfit {
    Outfit {
        name: name.to_string(),
        icon: icon.to_string(),
        armor,
        has_hood,
        durability: 100.0,
    }
}

pub(crate) fn unhooded_robe() -> Outfit {
    outfit("Unhooded robe", "robe", 1, false)
}

pub(crate) fn plate_armor() -> Outfit {
    outfit("Plate armor", "platearmor", 5, true)
}

fn leather_armor() -> Outfit {
    outfit("Leather armor", "leather", 2, false)
}

fn burlap() -> Outfit {
    outfit("Burlap", "burlap", 0, false)
}

pub(crate) fn apple() -> Food {
    Food {
        name: "Apple".to_string(),
        icon: "apple".to_string(),
        health_add: 20,
        stamina_add: 10.0,
    }
}

/// Cosmetic back item; worn in place of the quiver.
pub(crate) fn satchel() -> ExtraItem {
    ExtraItem {
        name: "Satchel".to_string(),
        icon: "satchel".to_string(),
    }
}

pub(crate) fn new_player(id: CharacterId, position: Vec2) -> Character {
    let mut player = Character::player(id, position, hands(), unhooded_robe());
    player.add_outfit(plate_armor());
    for item in [
        Item::Weapon(dagger()),
        Item::Weapon(spear()),
        Item::Weapon(bow()),
        Item::Food(apple()),
    ] {
        player.add_item(item);
    }
    player
}

pub(crate) fn new_npc(kind: NpcKind, id: CharacterId, position: Vec2) -> Character {
    match kind {
        NpcKind::Bandit => Character::bandit(id, position, hands(), dagger(), leather_armor()),
        NpcKind::CombatDummy => Character::combat_dummy(id, position, burlap()),
    }
}

/// Training dummies and a few pickups around the starting area.
pub(crate) fn populate_demo(world: &mut World, rng: &mut impl Rng) {
    world.spawn_npc(NpcKind::CombatDummy, DUMMY_ANCHOR);
    for _ in 0..RANDOM_DUMMY_COUNT {
        let x = rng.gen_range(350.0..900.0);
        let y = rng.gen_range(0.0..700.0);
        world.spawn_npc(NpcKind::CombatDummy, Vec2::new(x, y));
    }
    world.drop_loot(Item::Ammo(arrows(10)), Vec2::new(420.0, 420.0), 0.0);
    world.drop_loot(Item::Food(apple()), Vec2::new(470.0, 420.0), 120.0);
    world.drop_loot(Item::Extra(satchel()), Vec2::new(520.0, 420.0), 0.0);
}

use std::rc::Rc;

use engine::{DrawKind, DrawList, InputAction, InputSnapshot, Rect, Scene, SceneCommand, Vec2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::character::{AnimState, CharacterId, Facing, Intent};
use super::content;
use super::items::Item;
use super::map::test_support::{layer_from_rows, model, trigger_layer, trigger_object, MemoryMaps};
use super::map::MapCache;
use super::scene_impl::GameScene;
use super::scripts::{
    MapTransition, NpcKind, ScriptMessage, ScriptRegistry, TriggerScript,
};
use super::world::{FrameError, FrameOutcome, World};
use super::PLAYER_SPAWN;

const DT: f32 = 1.0 / 30.0;

fn idle() -> Intent {
    Intent::default()
}

fn attack() -> Intent {
    Intent::from_keys(false, false, false, false, true, false)
}

fn walk(facing: Facing) -> Intent {
    Intent::from_keys(
        facing == Facing::Up,
        facing == Facing::Left,
        facing == Facing::Down,
        facing == Facing::Right,
        false,
        false,
    )
}

fn empty_rows(width: usize, height: usize) -> Vec<String> {
    vec![".".repeat(width); height]
}

fn column_rows(width: usize, height: usize, column: usize) -> Vec<String> {
    (0..height)
        .map(|_| {
            (0..width)
                .map(|x| if x == column { '#' } else { '.' })
                .collect()
        })
        .collect()
}

fn as_strs(rows: &[String]) -> Vec<&str> {
    rows.iter().map(String::as_str).collect()
}

fn arena() -> engine::TileLayerModel {
    model(40, 30, false, Vec::new())
}

fn script(name: &str, movement_req: Option<Facing>) -> TriggerScript {
    TriggerScript {
        name: name.to_string(),
        movement_req,
        messages: Vec::new(),
        npc_spawns: Vec::new(),
        transition: None,
    }
}

fn registry(scripts: Vec<TriggerScript>) -> ScriptRegistry {
    ScriptRegistry::from_scripts(scripts).expect("registry")
}

fn world_with(maps: MemoryMaps, registry: ScriptRegistry, start: &str) -> World {
    World::new(MapCache::new(Box::new(maps)), registry, start, PLAYER_SPAWN).expect("world")
}

fn single_map(name: &str, layer_model: engine::TileLayerModel) -> MemoryMaps {
    let mut maps = MemoryMaps::default();
    maps.maps.insert(name.to_string(), layer_model);
    maps
}

fn step(world: &mut World, intent: Intent) -> FrameOutcome {
    world.step(&intent, DT).expect("frame")
}

fn npc_state(world: &World, id: CharacterId) -> (AnimState, i32) {
    let npc = world
        .npcs()
        .iter()
        .find(|npc| npc.id() == id)
        .expect("npc");
    (npc.state(), npc.health())
}

fn equip_bow_with_arrows(world: &mut World, count: u32) {
    let player = world.player_mut();
    let bow = player.inventory().find_by_display_name("Bow").expect("bow");
    assert!(player.equip_weapon(bow));
    let arrows = player
        .add_item(Item::Ammo(content::arrows(count)));
    assert!(player.equip_ammo(arrows));
}

#[test]
fn three_dagger_swings_leave_dummy_at_270_and_cycle_stagger() {
    let mut world = world_with(single_map("arena.tmx", arena()), ScriptRegistry::default(), "arena.tmx");
    let dagger = world
        .player()
        .inventory()
        .find_by_display_name("Dagger")
        .expect("dagger");
    assert!(world.player_mut().equip_weapon(dagger));
    let dummy = world.spawn_npc(NpcKind::CombatDummy, Vec2::new(335.0, 300.0));

    let mut states = vec![npc_state(&world, dummy).0];
    for _ in 0..3 {
        step(&mut world, attack());
        for _ in 0..40 {
            step(&mut world, idle());
            let (state, _) = npc_state(&world, dummy);
            if states.last() != Some(&state) {
                states.push(state);
            }
        }
    }

    assert_eq!(npc_state(&world, dummy).1, 270);
    assert_eq!(
        states,
        vec![
            AnimState::Idle,
            AnimState::Hit,
            AnimState::Idle,
            AnimState::Hit,
            AnimState::Idle,
            AnimState::Hit,
            AnimState::Idle,
        ]
    );
    let dummy_position = world
        .npcs()
        .iter()
        .find(|npc| npc.id() == dummy)
        .map(|npc| npc.position());
    assert_eq!(dummy_position, Some(Vec2::new(335.0, 300.0)));
}

#[test]
fn single_arrow_shot_empties_ammo_on_next_check() {
    let mut world = world_with(single_map("arena.tmx", arena()), ScriptRegistry::default(), "arena.tmx");
    equip_bow_with_arrows(&mut world, 1);

    step(&mut world, attack());
    let mut frames = 0;
    while world.projectiles().is_empty() {
        step(&mut world, idle());
        frames += 1;
        assert!(frames < 40, "bow never released");
    }
    assert_eq!(world.player().equipped_ammo_count(), Some(0));

    step(&mut world, idle());
    assert_eq!(world.player().equipped_ammo_handle(), None);
    assert!(world.player().inventory().find_by_display_name("Arrows").is_none());
    assert!(world.player().extra_item().is_none());
}

#[test]
fn spare_stack_takes_over_when_equipped_ammo_runs_out() {
    let mut world = world_with(single_map("arena.tmx", arena()), ScriptRegistry::default(), "arena.tmx");
    equip_bow_with_arrows(&mut world, 1);
    world
        .player_mut()
        .add_item(Item::Ammo(content::arrows(5)));

    step(&mut world, attack());
    while world.projectiles().is_empty() {
        step(&mut world, idle());
    }
    step(&mut world, idle());

    assert_eq!(world.player().equipped_ammo_count(), Some(5));
    assert!(world.player().extra_item().is_some());
}

#[test]
fn walking_into_a_wall_never_tunnels_and_slides_along_it() {
    let rows = column_rows(20, 20, 12);
    let walls = model(20, 20, false, vec![layer_from_rows("C-Objects", &as_strs(&rows))]);
    let mut world = world_with(single_map("walls.tmx", walls), ScriptRegistry::default(), "walls.tmx");
    let wall = Rect::new(384.0, 0.0, 32.0, 640.0);
    assert_eq!(world.current_map().map(|map| map.colliders().to_vec()), Some(vec![wall]));

    let sprint_right = Intent::from_keys(false, false, false, true, false, true);
    for _ in 0..120 {
        step(&mut world, sprint_right);
        assert!(!world.player().hitbox().intersects(&wall));
    }
    let stopped = world.player().position();
    assert!(world.player().hitbox().right() <= wall.left());
    assert!(stopped.x > 340.0);

    let up_right = Intent::from_keys(true, false, false, true, false, false);
    for _ in 0..20 {
        step(&mut world, up_right);
        assert!(!world.player().hitbox().intersects(&wall));
    }
    assert!(world.player().hitbox().right() <= wall.left());
    assert!(world.player().position().y < stopped.y - 20.0);
}

#[test]
fn identical_inputs_and_seed_replay_identically() {
    fn run() -> Vec<(u32, f32, f32, i32)> {
        let mut world = world_with(single_map("arena.tmx", arena()), ScriptRegistry::default(), "arena.tmx");
        let mut rng = StdRng::seed_from_u64(7);
        content::populate_demo(&mut world, &mut rng);
        world.spawn_npc(NpcKind::Bandit, Vec2::new(500.0, 320.0));
        for frame in 0..300 {
            let intent = match frame % 90 {
                0..=29 => walk(Facing::Right),
                30..=44 => attack(),
                45..=79 => Intent::from_keys(false, false, true, false, false, true),
                _ => idle(),
            };
            step(&mut world, intent);
        }
        std::iter::once(world.player())
            .chain(world.npcs())
            .map(|character| {
                let position = character.position();
                (character.id().0, position.x, position.y, character.health())
            })
            .collect()
    }

    assert_eq!(run(), run());
}

#[test]
fn trigger_direction_gate_and_cooldown() {
    let mut layer_model = arena();
    layer_model.object_layers.push(trigger_layer(vec![trigger_object(
        "gate",
        150.0,
        100.0,
        300.0,
        300.0,
        Some(1.0),
    )]));
    let mut gate = script("gate", Some(Facing::Up));
    gate.messages.push(ScriptMessage {
        text: "Gate".to_string(),
        duration: 10.0,
    });
    let mut world = world_with(single_map("gate.tmx", layer_model), registry(vec![gate]), "gate.tmx");
    let fire_count = |world: &World| {
        world
            .current_cached_map()
            .map(|cached| cached.triggers[0].fire_count())
            .expect("map")
    };

    for _ in 0..10 {
        step(&mut world, idle());
    }
    assert_eq!(fire_count(&world), 0);
    for facing in [Facing::Down, Facing::Left, Facing::Right] {
        for _ in 0..10 {
            step(&mut world, walk(facing));
        }
        assert_eq!(fire_count(&world), 0, "fired while walking {facing:?}");
    }
    assert!(world.messages().active().is_empty());

    step(&mut world, walk(Facing::Up));
    assert_eq!(fire_count(&world), 1);
    assert_eq!(world.messages().active()[0].text, "Gate");

    for _ in 0..20 {
        step(&mut world, walk(Facing::Up));
    }
    assert_eq!(fire_count(&world), 1);

    for _ in 0..20 {
        step(&mut world, walk(Facing::Up));
    }
    assert_eq!(fire_count(&world), 2);
}

#[test]
fn limited_trigger_is_retired_after_its_last_fire() {
    let mut layer_model = arena();
    let mut object = trigger_object("once", 150.0, 100.0, 300.0, 300.0, Some(0.5));
    object
        .properties
        .insert("max_num_triggers".to_string(), "1".to_string());
    layer_model.object_layers.push(trigger_layer(vec![object]));
    let mut once = script("once", None);
    once.messages.push(ScriptMessage {
        text: "Once".to_string(),
        duration: 1.0,
    });
    let mut world = world_with(single_map("once.tmx", layer_model), registry(vec![once]), "once.tmx");

    step(&mut world, idle());
    assert_eq!(world.messages().active().len(), 1);
    for _ in 0..60 {
        step(&mut world, idle());
    }
    let remaining = world
        .current_cached_map()
        .map(|cached| cached.triggers.len())
        .expect("map");
    assert_eq!(remaining, 0);
    assert!(world.messages().active().is_empty());
}

#[test]
fn unknown_trigger_name_is_logged_and_skipped() {
    let mut layer_model = arena();
    let mut ghost = trigger_object("ghost", 150.0, 100.0, 300.0, 300.0, Some(0.1));
    ghost
        .properties
        .insert("max_num_triggers".to_string(), "1".to_string());
    layer_model.object_layers.push(trigger_layer(vec![ghost]));
    let mut world = world_with(
        single_map("ghost.tmx", layer_model),
        ScriptRegistry::default(),
        "ghost.tmx",
    );

    for _ in 0..30 {
        assert_eq!(step(&mut world, idle()), FrameOutcome::Continued);
    }
    assert!(world.messages().active().is_empty());
    assert_eq!(world.current_map_name(), "ghost.tmx");
    let cached = world.current_cached_map().expect("map");
    assert_eq!(cached.triggers.len(), 1);
    assert_eq!(cached.triggers[0].fire_count(), 0);
    assert!(!cached.triggers[0].is_disabled());
}

#[test]
fn leaving_and_returning_restores_map_state() {
    let mut outside = arena();
    outside.object_layers.push(trigger_layer(vec![trigger_object(
        "door", 250.0, 250.0, 100.0, 100.0, None,
    )]));
    let mut inside = model(10, 10, false, Vec::new());
    inside.object_layers.push(trigger_layer(vec![trigger_object(
        "back", 50.0, 50.0, 100.0, 100.0, None,
    )]));
    let mut maps = MemoryMaps::default();
    maps.maps.insert("outside.tmx".to_string(), outside);
    maps.maps.insert("inside.tmx".to_string(), inside);
    let loads = Rc::clone(&maps.loads);

    let mut door = script("door", None);
    door.transition = Some(MapTransition {
        map: "inside.tmx".to_string(),
        player_position: Some(Vec2::new(100.0, 100.0)),
        camera_position: None,
    });
    let mut back = script("back", Some(Facing::Down));
    back.transition = Some(MapTransition {
        map: "outside.tmx".to_string(),
        player_position: None,
        camera_position: None,
    });

    let mut world = world_with(maps, registry(vec![door, back]), "outside.tmx");
    world.spawn_npc(NpcKind::CombatDummy, Vec2::new(600.0, 300.0));
    world.drop_loot(Item::Food(content::apple()), Vec2::new(600.0, 600.0), 0.0);

    assert_eq!(
        step(&mut world, idle()),
        FrameOutcome::Transitioned {
            map: "inside.tmx".to_string()
        }
    );
    assert!(world.is_transitioning());
    assert!(world.npcs().is_empty());
    assert!(world.loot().is_empty());
    assert_eq!(world.player().position(), Vec2::new(100.0, 100.0));

    step(&mut world, idle());
    assert_eq!(world.current_map_name(), "inside.tmx");
    assert_eq!(
        step(&mut world, walk(Facing::Down)),
        FrameOutcome::Transitioned {
            map: "outside.tmx".to_string()
        }
    );
    assert_eq!(world.npcs().len(), 1);
    assert_eq!(world.loot().len(), 1);
    assert_eq!(world.player().position(), PLAYER_SPAWN);
    assert_eq!(loads.get(), 2);

    for _ in 0..10 {
        assert_eq!(step(&mut world, idle()), FrameOutcome::Continued);
    }
}

#[test]
fn script_spawns_npcs_and_shows_messages() {
    let mut layer_model = arena();
    layer_model.object_layers.push(trigger_layer(vec![trigger_object(
        "bandits", 150.0, 100.0, 300.0, 300.0, None,
    )]));
    let mut world = world_with(
        single_map("camp.tmx", layer_model),
        ScriptRegistry::builtin(),
        "camp.tmx",
    );
    assert!(world.npcs().is_empty());

    step(&mut world, idle());
    let positions: Vec<Vec2> = world.npcs().iter().map(|npc| npc.position()).collect();
    assert_eq!(positions.len(), 2);
    assert_eq!(positions[0], Vec2::new(1100.0, 900.0));
    assert_eq!(
        world.messages().active()[0].text,
        "Bandits! They don't look friendly."
    );
}

#[test]
fn nearby_loot_is_picked_up_and_stale_loot_expires() {
    let mut world = world_with(single_map("arena.tmx", arena()), ScriptRegistry::default(), "arena.tmx");
    world.drop_loot(
        Item::Ammo(content::arrows(3)),
        PLAYER_SPAWN + Vec2::new(10.0, 0.0),
        0.0,
    );
    world.drop_loot(Item::Food(content::apple()), Vec2::new(900.0, 700.0), 0.5);

    step(&mut world, idle());
    assert!(world.player().inventory().find_by_display_name("Arrows").is_some());
    assert_eq!(world.player().equipped_ammo_count(), Some(3));
    assert!(world.player().extra_item().is_some());
    assert_eq!(world.messages().active()[0].text, "Picked up Arrows");
    assert_eq!(world.loot().len(), 1);

    for _ in 0..20 {
        step(&mut world, idle());
    }
    assert!(world.loot().is_empty());
}

#[test]
fn duplicate_loot_lands_in_the_inventory_as_separate_items() {
    let mut world = world_with(single_map("arena.tmx", arena()), ScriptRegistry::default(), "arena.tmx");
    let count = |world: &World, name: &str| {
        world
            .player()
            .inventory()
            .iter()
            .filter(|(_, item)| item.name() == name)
            .count()
    };
    assert_eq!(count(&world, "Apple"), 1);

    let near = PLAYER_SPAWN + Vec2::new(8.0, 0.0);
    world.drop_loot(Item::Food(content::apple()), near, 0.0);
    world.drop_loot(Item::Ammo(content::arrows(10)), near, 0.0);
    world.drop_loot(Item::Ammo(content::arrows(10)), near, 0.0);
    step(&mut world, idle());

    assert!(world.loot().is_empty());
    assert_eq!(count(&world, "Apple"), 2);
    assert_eq!(count(&world, "Arrows"), 2);
    let inventory = world.player().inventory();
    assert!(inventory.find_by_display_name("Apple 2").is_some());
    assert!(inventory.find_by_display_name("Arrows 2").is_some());
    assert_eq!(world.player().equipped_ammo_count(), Some(10));
}

#[test]
fn arrows_pass_over_water_and_stop_at_colliders() {
    let water = column_rows(24, 20, 12);
    let wall = column_rows(24, 20, 18);
    let layer_model = model(
        24,
        20,
        false,
        vec![
            layer_from_rows("Water", &as_strs(&water)),
            layer_from_rows("C-Objects", &as_strs(&wall)),
        ],
    );
    let mut world = world_with(single_map("river.tmx", layer_model), ScriptRegistry::default(), "river.tmx");
    equip_bow_with_arrows(&mut world, 1);

    step(&mut world, attack());
    let mut furthest: f32 = 0.0;
    let mut seen = false;
    for _ in 0..150 {
        step(&mut world, idle());
        match world.projectiles().first() {
            Some(arrow) => {
                seen = true;
                furthest = furthest.max(arrow.position().x);
            }
            None if seen => break,
            None => {}
        }
    }

    assert!(seen);
    assert!(world.projectiles().is_empty());
    assert!(furthest > 416.0, "arrow stopped at the water: {furthest}");
    assert!(furthest < 576.0 + 16.0, "arrow went through the wall: {furthest}");
}

#[test]
fn non_finite_position_fails_the_frame() {
    let mut world = world_with(single_map("arena.tmx", arena()), ScriptRegistry::default(), "arena.tmx");
    world.player_mut().set_position(Vec2::new(f32::NAN, 10.0));
    assert!(matches!(
        world.step(&idle(), DT),
        Err(FrameError::NonFinitePosition { id: 0, .. })
    ));
}

#[test]
fn missing_start_map_fails_world_creation() {
    let result = World::new(
        MapCache::new(Box::new(MemoryMaps::default())),
        ScriptRegistry::default(),
        "nowhere.tmx",
        PLAYER_SPAWN,
    );
    assert!(result.is_err());
}

fn field_scene() -> GameScene {
    let ground = empty_rows(40, 30)
        .into_iter()
        .map(|row| row.replace('.', "#"))
        .collect::<Vec<_>>();
    let layer_model = model(40, 30, true, vec![layer_from_rows("Ground", &as_strs(&ground))]);
    let world = world_with(single_map("field.tmx", layer_model), ScriptRegistry::default(), "field.tmx");
    GameScene::new(world, true)
}

#[test]
fn menu_toggle_pauses_and_clicks_equip() {
    let mut scene = field_scene();
    let toggle = InputSnapshot::empty().with_menu_toggle_pressed(true);
    assert_eq!(scene.update(DT, &toggle), SceneCommand::None);
    assert!(scene.is_paused());

    let frame = scene.world().frame();
    let spear_index = scene
        .world()
        .player()
        .inventory()
        .iter()
        .position(|(_, item)| item.name() == "Spear")
        .expect("spear");
    let cursor = Vec2::new(
        32.0 + (spear_index % 6) as f32 * 64.0 + 10.0,
        64.0 + (spear_index / 6) as f32 * 64.0 + 10.0,
    );
    let click = InputSnapshot::empty()
        .with_cursor_position_px(Some(cursor))
        .with_left_click_pressed(true);
    scene.update(DT, &click);

    assert_eq!(scene.world().frame(), frame);
    let equipped = scene
        .world()
        .player()
        .equipped_weapon()
        .map(|weapon| weapon.name.clone());
    assert_eq!(equipped.as_deref(), Some("Spear"));

    let mut list = DrawList::new();
    scene.render(&mut list);
    assert!(list.text().iter().any(|line| line.text == "Spear"));

    scene.update(DT, &toggle);
    assert!(!scene.is_paused());
    scene.update(DT, &InputSnapshot::empty().with_action_down(InputAction::MoveRight, true));
    assert_eq!(scene.world().frame(), frame + 2);
}

#[test]
fn render_emits_map_characters_and_hitboxes() {
    let mut scene = field_scene();
    scene.update(DT, &InputSnapshot::empty());
    let mut list = DrawList::new();
    scene.render(&mut list);

    assert_eq!(
        list.items().iter().filter(|item| item.kind == DrawKind::Ground).count(),
        40 * 30
    );
    let player = list
        .items()
        .iter()
        .find(|item| item.sprite == "player/walkcycle")
        .expect("player sprite");
    assert_eq!(player.y_sort, PLAYER_SPAWN.y + 27.0);
    assert!(!list.rects().is_empty());
    assert!(list.text().iter().any(|line| line.text.starts_with("Health:")));
    assert!(scene.debug_title().is_some_and(|title| title.starts_with("field.tmx")));
}

#[test]
fn quit_and_frame_failure_stop_the_scene() {
    let mut scene = field_scene();
    assert_eq!(scene.update(DT, &InputSnapshot::empty()), SceneCommand::None);
    let quit = InputSnapshot::empty().with_quit_requested(true);
    assert_eq!(scene.update(DT, &quit), SceneCommand::Quit);

    let mut scene = field_scene();
    scene
        .world_mut()
        .player_mut()
        .set_position(Vec2::new(0.0, f32::INFINITY));
    assert_eq!(scene.update(DT, &InputSnapshot::empty()), SceneCommand::Quit);
}

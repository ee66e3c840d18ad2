use engine::{
    DrawColor, DrawItem, DrawKind, DrawList, DrawRect, InputAction, InputSnapshot, Rect, Scene,
    SceneCommand, Vec2,
};
use tracing::{debug, error, info};

use super::character::{Character, CharacterKind, Intent, SPRITE_SIZE};
use super::menu::{self, MenuSlot, MenuTarget, MENU_CELL_PX};
use super::world::{FrameOutcome, World};

const CHARACTER_Y_SORT_OFFSET: f32 = 27.0;
const HEALTHBAR_WIDTH: f32 = 32.0;
const HEALTHBAR_HEIGHT: f32 = 5.0;
const HEALTHBAR_RISE: f32 = 32.0;
const LOOT_ICON_SIZE: f32 = 32.0;
const TRANSITION_DARKNESS: u8 = 255;
const HUD_ORIGIN_PX: Vec2 = Vec2::new(16.0, 16.0);
const MESSAGE_ORIGIN_PX: Vec2 = Vec2::new(440.0, 600.0);
const LINE_HEIGHT_PX: f32 = 18.0;
const HOVER_PANEL_ORIGIN_PX: Vec2 = Vec2::new(448.0, 64.0);

/// The playable scene: one world, the pause menu on top of it.
pub(crate) struct GameScene {
    world: World,
    draw_hitboxes: bool,
    paused: bool,
    hovered: Option<(MenuSlot, MenuTarget)>,
}

impl GameScene {
    pub(crate) fn new(world: World, draw_hitboxes: bool) -> Self {
        Self {
            world,
            draw_hitboxes,
            paused: false,
            hovered: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    #[cfg(test)]
    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    #[cfg(test)]
    pub(crate) fn is_paused(&self) -> bool {
        self.paused
    }

    fn update_menu(&mut self, input: &InputSnapshot) {
        let player = self.world.player_mut();
        self.hovered = input
            .cursor_position_px()
            .and_then(menu::slot_at)
            .and_then(|slot| menu::resolve(player, slot).map(|target| (slot, target)));

        let Some((_, target)) = self.hovered else {
            return;
        };
        if input.left_click_pressed() && menu::primary_click(player, target) {
            info!(target = ?target, "menu_item_equipped");
        }
        if input.right_click_pressed() && menu::secondary_click(player, target) {
            info!(target = ?target, "menu_item_consumed");
        }
        // Consuming shifts later slots; resolve the cell again.
        self.hovered = self
            .hovered
            .and_then(|(slot, _)| menu::resolve(player, slot).map(|target| (slot, target)));
    }

    fn push_characters(&self, frame: &mut DrawList) {
        let half = SPRITE_SIZE as f32 / 2.0;
        for character in std::iter::once(self.world.player()).chain(self.world.npcs()) {
            let position = character.position();
            frame.push_item(DrawItem {
                kind: DrawKind::Sorted,
                sprite: character.sprite_sheet(),
                position: position - Vec2::new(half, half),
                size: Vec2::new(SPRITE_SIZE as f32, SPRITE_SIZE as f32),
                cell: Some(character.sprite_cell()),
                y_sort: position.y + CHARACTER_Y_SORT_OFFSET,
                y_shift: character.y_shift(),
                shadow: character.shadow(),
                color: character_color(character),
            });
            if character.healthbar_visible() {
                push_healthbar(frame, character);
            }
        }
    }

    fn push_pickups_and_projectiles(&self, frame: &mut DrawList) {
        for loot in self.world.loot() {
            let position = loot.position();
            frame.push_item(DrawItem {
                kind: DrawKind::Sorted,
                sprite: format!("icon/{}", loot.icon()),
                position: position - Vec2::new(LOOT_ICON_SIZE / 2.0, LOOT_ICON_SIZE / 2.0),
                size: Vec2::new(LOOT_ICON_SIZE, LOOT_ICON_SIZE),
                cell: None,
                y_sort: position.y,
                y_shift: 0.0,
                shadow: None,
                color: DrawColor::Yellow,
            });
        }
        let half = SPRITE_SIZE as f32 / 2.0;
        for projectile in self.world.projectiles() {
            let position = projectile.position();
            frame.push_item(DrawItem {
                kind: DrawKind::Sorted,
                sprite: projectile.sprite().to_string(),
                position: position - Vec2::new(half, half),
                size: Vec2::new(SPRITE_SIZE as f32, SPRITE_SIZE as f32),
                cell: Some(projectile.sprite_cell()),
                y_sort: position.y,
                y_shift: 0.0,
                shadow: None,
                color: DrawColor::White,
            });
        }
    }

    fn push_hitboxes(&self, frame: &mut DrawList) {
        let mut outline = |rect: Rect, color: DrawColor| {
            frame.push_rect(DrawRect {
                rect,
                color,
                filled: false,
                screen_space: false,
            });
        };
        if let Some(cached) = self.world.current_cached_map() {
            for rect in cached.map.colliders() {
                outline(*rect, DrawColor::Red);
            }
            for rect in cached.map.water() {
                outline(*rect, DrawColor::Blue);
            }
            for trigger in &cached.triggers {
                outline(trigger.region(), DrawColor::Yellow);
            }
        }
        for character in std::iter::once(self.world.player()).chain(self.world.npcs()) {
            outline(character.hitbox(), DrawColor::Green);
        }
        for projectile in self.world.projectiles() {
            outline(projectile.hitbox(), DrawColor::White);
        }
    }

    fn push_hud(&self, frame: &mut DrawList) {
        let player = self.world.player();
        let weapon = player
            .equipped_weapon()
            .map(|weapon| weapon.name.as_str())
            .unwrap_or("-");
        let mut lines = vec![
            format!("Health: {}/{}", player.health(), player.max_health()),
            format!("Stamina: {:.0}/{:.0}", player.stamina(), player.max_stamina()),
            format!("Weapon: {weapon}"),
        ];
        if let Some(count) = player.equipped_ammo_count() {
            lines.push(format!("Ammo: {count}"));
        }
        push_lines(frame, HUD_ORIGIN_PX, &lines, DrawColor::White);

        let messages: Vec<String> = self
            .world
            .messages()
            .active()
            .iter()
            .map(|message| message.text.clone())
            .collect();
        push_lines(frame, MESSAGE_ORIGIN_PX, &messages, DrawColor::Yellow);
    }

    fn push_menu(&self, frame: &mut DrawList) {
        let player = self.world.player();
        let cells = (0..player.inventory().len())
            .map(MenuSlot::Item)
            .chain((0..player.outfits().len()).map(MenuSlot::Outfit));
        for slot in cells {
            let origin = menu::slot_origin_px(slot);
            let selected = self.hovered.map(|(hovered, _)| hovered) == Some(slot);
            frame.push_rect(DrawRect {
                rect: Rect::new(origin.x, origin.y, MENU_CELL_PX, MENU_CELL_PX),
                color: if selected { DrawColor::Yellow } else { DrawColor::Grey },
                filled: false,
                screen_space: true,
            });
            let label = match slot {
                MenuSlot::Item(index) => player
                    .inventory()
                    .handle_at(index)
                    .and_then(|handle| player.inventory().display_name(handle))
                    .unwrap_or_default()
                    .to_string(),
                MenuSlot::Outfit(index) => player
                    .outfits()
                    .get(index)
                    .map(|outfit| outfit.name.clone())
                    .unwrap_or_default(),
            };
            frame.push_text(label, Vec2::new(origin.x + 4.0, origin.y + 4.0), DrawColor::White);
        }
        if let Some((_, target)) = self.hovered {
            let lines = menu::hover_lines(player, target);
            push_lines(frame, HOVER_PANEL_ORIGIN_PX, &lines, DrawColor::White);
        }
    }
}

fn intent_from_input(input: &InputSnapshot) -> Intent {
    Intent::from_keys(
        input.is_down(InputAction::MoveUp),
        input.is_down(InputAction::MoveLeft),
        input.is_down(InputAction::MoveDown),
        input.is_down(InputAction::MoveRight),
        input.is_down(InputAction::Attack),
        input.is_down(InputAction::Sprint),
    )
}

fn character_color(character: &Character) -> DrawColor {
    match character.kind() {
        CharacterKind::Player => DrawColor::Blue,
        CharacterKind::Bandit => DrawColor::Red,
        CharacterKind::CombatDummy => DrawColor::Yellow,
    }
}

fn push_healthbar(frame: &mut DrawList, character: &Character) {
    let position = character.position();
    let fraction = if character.max_health() > 0 {
        character.health() as f32 / character.max_health() as f32
    } else {
        0.0
    };
    let x = position.x - HEALTHBAR_WIDTH / 2.0;
    let y = position.y - HEALTHBAR_RISE;
    frame.push_rect(DrawRect {
        rect: Rect::new(x, y, HEALTHBAR_WIDTH, HEALTHBAR_HEIGHT),
        color: DrawColor::Black,
        filled: true,
        screen_space: false,
    });
    frame.push_rect(DrawRect {
        rect: Rect::new(x, y, fraction * HEALTHBAR_WIDTH, HEALTHBAR_HEIGHT),
        color: DrawColor::Red,
        filled: true,
        screen_space: false,
    });
}

fn push_lines(frame: &mut DrawList, origin: Vec2, lines: &[String], color: DrawColor) {
    for (index, line) in lines.iter().enumerate() {
        frame.push_text(
            line.as_str(),
            Vec2::new(origin.x, origin.y + index as f32 * LINE_HEIGHT_PX),
            color,
        );
    }
}

impl Scene for GameScene {
    fn load(&mut self) {
        info!(
            map = %self.world.current_map_name(),
            npc_count = self.world.npcs().len(),
            loot_count = self.world.loot().len(),
            draw_hitboxes = self.draw_hitboxes,
            "scene_loaded"
        );
    }

    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        if input.quit_requested() {
            info!(frame = self.world.frame(), "quit_requested");
            return SceneCommand::Quit;
        }
        if input.menu_toggle_pressed() {
            self.paused = !self.paused;
            self.hovered = None;
            debug!(paused = self.paused, "menu_toggled");
        }
        if self.paused {
            self.update_menu(input);
            return SceneCommand::None;
        }

        match self.world.step(&intent_from_input(input), fixed_dt_seconds) {
            Ok(FrameOutcome::Continued) => SceneCommand::None,
            Ok(FrameOutcome::Transitioned { map }) => {
                debug!(map = %map, frame = self.world.frame(), "scene_map_changed");
                SceneCommand::None
            }
            Err(err) => {
                error!(error = %err, frame = self.world.frame(), "frame_failed");
                SceneCommand::Quit
            }
        }
    }

    fn render(&mut self, frame: &mut DrawList) {
        frame.set_camera(self.world.camera().position());
        let outdoors = self.world.current_map().map(|map| map.outdoors()).unwrap_or(false);
        let darkness = if self.world.is_transitioning() {
            TRANSITION_DARKNESS
        } else if outdoors {
            self.world.clock().darkness()
        } else {
            0
        };
        frame.set_darkness(darkness);

        if let Some(map) = self.world.current_map() {
            map.push_draw_items(frame);
        }
        self.push_pickups_and_projectiles(frame);
        self.push_characters(frame);
        if self.draw_hitboxes {
            self.push_hitboxes(frame);
        }
        self.push_hud(frame);
        if self.paused {
            self.push_menu(frame);
        }
    }

    fn unload(&mut self) {
        info!(
            map = %self.world.current_map_name(),
            frame = self.world.frame(),
            "scene_unloaded"
        );
    }

    fn debug_title(&self) -> Option<String> {
        Some(format!(
            "{} | day {:.0}{}",
            self.world.current_map_name(),
            self.world.clock().day_time(),
            if self.paused { " | paused" } else { "" }
        ))
    }
}

use engine::Vec2;

use super::character::Character;
use super::items::{Item, ItemHandle};

pub(crate) const MENU_COLUMNS: usize = 6;
pub(crate) const MENU_CELL_PX: f32 = 64.0;
pub(crate) const MENU_ORIGIN_PX: Vec2 = Vec2::new(32.0, 64.0);
const ITEM_ROWS: usize = 9;
const OUTFIT_ROWS: usize = 2;

/// A cell of the inventory grid. Items fill the first rows in insertion
/// order, owned outfits the two rows below them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MenuSlot {
    Item(usize),
    Outfit(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MenuTarget {
    Item(ItemHandle),
    Outfit(usize),
}

pub(crate) fn slot_at(cursor_px: Vec2) -> Option<MenuSlot> {
    let local_x = cursor_px.x - MENU_ORIGIN_PX.x;
    let local_y = cursor_px.y - MENU_ORIGIN_PX.y;
    if local_x < 0.0 || local_y < 0.0 || !local_x.is_finite() || !local_y.is_finite() {
        return None;
    }
    let column = (local_x / MENU_CELL_PX).floor() as usize;
    let row = (local_y / MENU_CELL_PX).floor() as usize;
    if column >= MENU_COLUMNS {
        return None;
    }
    if row < ITEM_ROWS {
        Some(MenuSlot::Item(row * MENU_COLUMNS + column))
    } else if row < ITEM_ROWS + OUTFIT_ROWS {
        Some(MenuSlot::Outfit((row - ITEM_ROWS) * MENU_COLUMNS + column))
    } else {
        None
    }
}

pub(crate) fn slot_origin_px(slot: MenuSlot) -> Vec2 {
    let (row, column) = match slot {
        MenuSlot::Item(index) => (index / MENU_COLUMNS, index % MENU_COLUMNS),
        MenuSlot::Outfit(index) => (ITEM_ROWS + index / MENU_COLUMNS, index % MENU_COLUMNS),
    };
    Vec2::new(
        MENU_ORIGIN_PX.x + column as f32 * MENU_CELL_PX,
        MENU_ORIGIN_PX.y + row as f32 * MENU_CELL_PX,
    )
}

/// What the slot holds for `player`; empty cells resolve to nothing.
pub(crate) fn resolve(player: &Character, slot: MenuSlot) -> Option<MenuTarget> {
    match slot {
        MenuSlot::Item(index) => player.inventory().handle_at(index).map(MenuTarget::Item),
        MenuSlot::Outfit(index) => (index < player.outfits().len()).then_some(MenuTarget::Outfit(index)),
    }
}

/// Primary click equips or wears the hovered item. Food is left to the
/// secondary click.
pub(crate) fn primary_click(player: &mut Character, target: MenuTarget) -> bool {
    match target {
        MenuTarget::Item(handle) => match player.inventory().get(handle) {
            Some(Item::Weapon(_) | Item::Ammo(_) | Item::Outfit(_) | Item::Extra(_)) => {
                player.use_item(handle)
            }
            _ => false,
        },
        MenuTarget::Outfit(index) => player.equip_outfit(index),
    }
}

/// Secondary click consumes food.
pub(crate) fn secondary_click(player: &mut Character, target: MenuTarget) -> bool {
    match target {
        MenuTarget::Item(handle) => player.consume(handle),
        MenuTarget::Outfit(_) => false,
    }
}

pub(crate) fn hover_lines(player: &Character, target: MenuTarget) -> Vec<String> {
    match target {
        MenuTarget::Item(handle) => {
            let Some(item) = player.inventory().get(handle) else {
                return Vec::new();
            };
            let name = player
                .inventory()
                .display_name(handle)
                .unwrap_or_else(|| item.name());
            let mut lines = vec![name.to_string()];
            lines.extend(item.detail_lines());
            lines
        }
        MenuTarget::Outfit(index) => match player.outfits().get(index) {
            Some(outfit) => {
                let mut lines = vec![outfit.name.clone()];
                lines.extend(Item::Outfit(outfit.clone()).detail_lines());
                lines
            }
            None => Vec::new(),
        },
    }
}

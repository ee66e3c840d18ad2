use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum AttackKind {
    Slash,
    Thrust,
    Bow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ProjectileKind {
    Arrow,
}

impl ProjectileKind {
    pub(crate) fn speed(self) -> f32 {
        match self {
            ProjectileKind::Arrow => 8.0,
        }
    }

    pub(crate) fn sprite(self) -> &'static str {
        match self {
            ProjectileKind::Arrow => "projectile/arrow",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Weapon {
    pub(crate) name: String,
    pub(crate) icon: String,
    pub(crate) attack: AttackKind,
    pub(crate) damage: i32,
    pub(crate) range: f32,
    pub(crate) ranged: bool,
    pub(crate) projectile: Option<ProjectileKind>,
    pub(crate) durability: f32,
    pub(crate) durability_hit: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Outfit {
    pub(crate) name: String,
    pub(crate) icon: String,
    pub(crate) armor: i32,
    pub(crate) has_hood: bool,
    pub(crate) durability: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Ammo {
    pub(crate) name: String,
    pub(crate) icon: String,
    pub(crate) count: u32,
    pub(crate) projectile: ProjectileKind,
    pub(crate) damage: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExtraItem {
    pub(crate) name: String,
    pub(crate) icon: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Food {
    pub(crate) name: String,
    pub(crate) icon: String,
    pub(crate) health_add: i32,
    pub(crate) stamina_add: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Item {
    Weapon(Weapon),
    Outfit(Outfit),
    Ammo(Ammo),
    Extra(ExtraItem),
    Food(Food),
}

impl Item {
    pub(crate) fn name(&self) -> &str {
        match self {
            Item::Weapon(weapon) => &weapon.name,
            Item::Outfit(outfit) => &outfit.name,
            Item::Ammo(ammo) => &ammo.name,
            Item::Extra(extra) => &extra.name,
            Item::Food(food) => &food.name,
        }
    }

    pub(crate) fn icon(&self) -> &str {
        match self {
            Item::Weapon(weapon) => &weapon.icon,
            Item::Outfit(outfit) => &outfit.icon,
            Item::Ammo(ammo) => &ammo.icon,
            Item::Extra(extra) => &extra.icon,
            Item::Food(food) => &food.icon,
        }
    }

    /// Lines shown in the inventory hover panel.
    pub(crate) fn detail_lines(&self) -> Vec<String> {
        match self {
            Item::Weapon(weapon) => vec![
                format!("Damage: {}", weapon.damage),
                format!("Range: {}", weapon.range),
                format!("Durability: {:.0}", weapon.durability),
            ],
            Item::Outfit(outfit) => vec![
                format!("Armor: {}", outfit.armor),
                format!("Durability: {:.0}", outfit.durability),
            ],
            Item::Ammo(ammo) => vec![
                format!("Count: {}", ammo.count),
                format!("Damage: {}", ammo.damage),
            ],
            Item::Extra(_) => Vec::new(),
            Item::Food(food) => vec![
                format!("Health: +{}", food.health_add),
                format!("Stamina: +{:.0}", food.stamina_add),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct ItemHandle(u32);

#[derive(Debug, Clone)]
struct Slot {
    handle: ItemHandle,
    display_name: String,
    pinned: bool,
    item: Item,
}

/// Arena of owned items. Handles stay valid until their item is removed and
/// are never reused. Display names get a numeric suffix per base name that
/// only grows within the inventory's lifetime.
#[derive(Debug, Clone, Default)]
pub(crate) struct Inventory {
    slots: Vec<Slot>,
    next_handle: u32,
    name_counters: HashMap<String, u32>,
}

impl Inventory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds `item` under a fresh handle. Identical items are kept apart.
    pub(crate) fn add(&mut self, item: Item) -> ItemHandle {
        self.insert(item, false)
    }

    /// Adds an item that [`Inventory::remove`] refuses to take out.
    pub(crate) fn add_pinned(&mut self, item: Item) -> ItemHandle {
        self.insert(item, true)
    }

    fn insert(&mut self, item: Item, pinned: bool) -> ItemHandle {
        let base = item.name().to_string();
        let counter = self.name_counters.entry(base.clone()).or_insert(0);
        *counter = counter.saturating_add(1);
        let display_name = if *counter == 1 {
            base
        } else {
            format!("{base} {counter}")
        };

        let handle = ItemHandle(self.next_handle);
        self.next_handle = self.next_handle.saturating_add(1);
        self.slots.push(Slot {
            handle,
            display_name,
            pinned,
            item,
        });
        handle
    }

    pub(crate) fn remove(&mut self, handle: ItemHandle) -> Option<Item> {
        let index = self.index_of(handle)?;
        if self.slots[index].pinned {
            return None;
        }
        Some(self.slots.remove(index).item)
    }

    pub(crate) fn get(&self, handle: ItemHandle) -> Option<&Item> {
        self.index_of(handle).map(|index| &self.slots[index].item)
    }

    pub(crate) fn get_mut(&mut self, handle: ItemHandle) -> Option<&mut Item> {
        let index = self.index_of(handle)?;
        Some(&mut self.slots[index].item)
    }

    pub(crate) fn display_name(&self, handle: ItemHandle) -> Option<&str> {
        self.index_of(handle)
            .map(|index| self.slots[index].display_name.as_str())
    }

    #[cfg(test)]
    pub(crate) fn is_pinned(&self, handle: ItemHandle) -> bool {
        self.index_of(handle)
            .map(|index| self.slots[index].pinned)
            .unwrap_or(false)
    }

    /// Handle of the `index`-th item in insertion order.
    pub(crate) fn handle_at(&self, index: usize) -> Option<ItemHandle> {
        self.slots.get(index).map(|slot| slot.handle)
    }

    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = (ItemHandle, &Item)> + '_ {
        self.slots.iter().map(|slot| (slot.handle, &slot.item))
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub(crate) fn find_by_display_name(&self, name: &str) -> Option<ItemHandle> {
        self.slots
            .iter()
            .find(|slot| slot.display_name == name)
            .map(|slot| slot.handle)
    }

    pub(crate) fn first_ammo(&self) -> Option<ItemHandle> {
        self.slots
            .iter()
            .find(|slot| matches!(&slot.item, Item::Ammo(ammo) if ammo.count > 0))
            .map(|slot| slot.handle)
    }

    pub(crate) fn has_ammo(&self) -> bool {
        self.first_ammo().is_some()
    }

    fn index_of(&self, handle: ItemHandle) -> Option<usize> {
        self.slots.iter().position(|slot| slot.handle == handle)
    }
}

use engine::{Rect, ShadowDesc, SpriteCell, Vec2, DEGENERATE_RECT};
use tracing::{debug, info};

use super::items::{AttackKind, ExtraItem, Inventory, Item, ItemHandle, Outfit, ProjectileKind, Weapon};
use super::shadow::ShadowCache;

pub(crate) const SPRITE_SIZE: u32 = 64;
pub(crate) const HEALTHBAR_VISIBLE_FRAMES: u32 = 60;
pub(crate) const PURSUIT_STOP_RADIUS: f32 = 32.0;
pub(crate) const QUIVER_NAME: &str = "Quiver";

const WALK_SPEED: f32 = 2.0;
const SPRINT_SPEED: f32 = 5.0;
const WALK_ANIM_SPEED: f32 = 0.5;
const SPRINT_ANIM_SPEED: f32 = 1.0;
const NPC_SPEED: f32 = 1.5;
const WALK_LAST_STEP: f32 = 8.0;
const SLASH_HIT_STEP: f32 = 4.0;
const SLASH_LAST_STEP: f32 = 5.0;
const THRUST_HIT_STEP: f32 = 6.0;
const THRUST_LAST_STEP: f32 = 7.0;
const BOW_HIT_STEP: f32 = 10.0;
const BOW_LAST_STEP: f32 = 11.0;
const BOW_LOOP_STEP: f32 = 4.0;
const HIT_LAST_STEP: f32 = 7.0;
const DEAD_LAST_STEP: f32 = 5.0;
const FACING_CHANGE_INTERVAL_SECONDS: f32 = 0.3;
const MAX_STAMINA: f32 = 100.0;
const SPRINT_STAMINA_COST: f32 = 1.0;
const STAMINA_REGEN_RAMP: f32 = 0.5;
const STAMINA_REGEN_CAP: f32 = 1.0;
const PLAYER_MAX_HEALTH: i32 = 100;
const DUMMY_MAX_HEALTH: i32 = 300;
const BANDIT_MAX_HEALTH: i32 = 60;
const DUMMY_Y_SHIFT: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct CharacterId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Facing {
    Up,
    Left,
    Down,
    Right,
}

impl Facing {
    pub(crate) fn sprite_row(self) -> u32 {
        match self {
            Facing::Up => 0,
            Facing::Left => 1,
            Facing::Down => 2,
            Facing::Right => 3,
        }
    }

    pub(crate) fn unit(self) -> Vec2 {
        match self {
            Facing::Up => Vec2::new(0.0, -1.0),
            Facing::Left => Vec2::new(-1.0, 0.0),
            Facing::Down => Vec2::new(0.0, 1.0),
            Facing::Right => Vec2::new(1.0, 0.0),
        }
    }

    /// Cardinal direction of the dominant axis. Ties go to the horizontal.
    pub(crate) fn from_vector(vector: Vec2) -> Facing {
        if vector.x.abs() >= vector.y.abs() {
            if vector.x < 0.0 {
                Facing::Left
            } else {
                Facing::Right
            }
        } else if vector.y < 0.0 {
            Facing::Up
        } else {
            Facing::Down
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum AnimState {
    Idle,
    Walk,
    Slash,
    Thrust,
    Bow,
    Dead,
    Hit,
}

impl AnimState {
    fn sheet_name(self) -> &'static str {
        match self {
            AnimState::Idle | AnimState::Walk => "walkcycle",
            AnimState::Slash => "slash",
            AnimState::Thrust => "thrust",
            AnimState::Bow => "bow",
            AnimState::Dead => "death",
            AnimState::Hit => "hurt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Controller {
    PlayerInput,
    PursueTarget,
    Stationary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum CharacterKind {
    Player,
    CombatDummy,
    Bandit,
}

impl CharacterKind {
    fn sprite_base(self) -> &'static str {
        match self {
            CharacterKind::Player => "player",
            CharacterKind::CombatDummy => "combat_dummy",
            CharacterKind::Bandit => "bandit",
        }
    }
}

/// Body hitbox relative to the character position.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BodyShape {
    dx: f32,
    dy: f32,
    w: f32,
    h: f32,
}

const HUMAN_BODY: BodyShape = BodyShape {
    dx: -12.0,
    dy: -5.0,
    w: 24.0,
    h: 32.0,
};

const DUMMY_BODY: BodyShape = BodyShape {
    dx: -12.0,
    dy: -8.0 + DUMMY_Y_SHIFT,
    w: 24.0,
    h: 32.0,
};

/// What a controller asks of a character for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Intent {
    pub(crate) face: Option<Facing>,
    pub(crate) direction: Vec2,
    pub(crate) attack: bool,
    pub(crate) attack_held: bool,
    pub(crate) sprint: bool,
}

impl Intent {
    /// Keyboard mapping. Attack only counts when no direction is held, and
    /// among directions the last of up/left/down/right wins the facing.
    pub(crate) fn from_keys(
        up: bool,
        left: bool,
        down: bool,
        right: bool,
        attack: bool,
        sprint: bool,
    ) -> Self {
        let face = [
            (up, Facing::Up),
            (left, Facing::Left),
            (down, Facing::Down),
            (right, Facing::Right),
        ]
        .into_iter()
        .filter(|(held, _)| *held)
        .map(|(_, facing)| facing)
        .last();

        let direction_y = if up {
            -1.0
        } else if down {
            1.0
        } else {
            0.0
        };
        let direction_x = if left {
            -1.0
        } else if right {
            1.0
        } else {
            0.0
        };

        Self {
            face,
            direction: Vec2::new(direction_x, direction_y),
            attack: attack && face.is_none(),
            attack_held: attack,
            sprint,
        }
    }

    /// Whether this intent moves along `facing`.
    pub(crate) fn moves_toward(&self, facing: Facing) -> bool {
        let unit = facing.unit();
        self.direction.x * unit.x + self.direction.y * unit.y > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct StepContext {
    pub(crate) now: f32,
    pub(crate) day_time: f32,
    pub(crate) outdoors: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ProjectileSpawn {
    pub(crate) kind: ProjectileKind,
    pub(crate) damage: i32,
    pub(crate) facing: Facing,
    pub(crate) origin: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AttackIntent {
    pub(crate) kind: AttackKind,
    pub(crate) rect: Rect,
    pub(crate) damage: i32,
    pub(crate) projectile: Option<ProjectileSpawn>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct StepOutput {
    pub(crate) movement: Vec2,
    pub(crate) attack: Option<AttackIntent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DamageOutcome {
    Ignored,
    Damaged,
    Killed,
}

#[derive(Debug, Clone)]
pub(crate) struct Character {
    id: CharacterId,
    kind: CharacterKind,
    controller: Controller,
    position: Vec2,
    facing: Facing,
    state: AnimState,
    anim_step: f32,
    anim_speed: f32,
    base_speed: f32,
    speed: f32,
    health: i32,
    max_health: i32,
    stamina: f32,
    max_stamina: f32,
    last_sprint_at: f32,
    last_facing_change_at: f32,
    inventory: Inventory,
    hands: Option<ItemHandle>,
    equipped_weapon: Option<ItemHandle>,
    equipped_ammo: Option<ItemHandle>,
    outfits: Vec<Outfit>,
    equipped_outfit: usize,
    extra_item: Option<ExtraItem>,
    shadow: ShadowCache,
    can_move: bool,
    staggers: bool,
    y_shift: f32,
    body: BodyShape,
    frames_since_hit: u32,
}

impl Character {
    fn base(
        id: CharacterId,
        kind: CharacterKind,
        controller: Controller,
        position: Vec2,
        outfit: Outfit,
    ) -> Self {
        Self {
            id,
            kind,
            controller,
            position,
            facing: Facing::Right,
            state: AnimState::Idle,
            anim_step: 0.0,
            anim_speed: WALK_ANIM_SPEED,
            base_speed: WALK_SPEED,
            speed: WALK_SPEED,
            health: PLAYER_MAX_HEALTH,
            max_health: PLAYER_MAX_HEALTH,
            stamina: 0.0,
            max_stamina: 0.0,
            last_sprint_at: 0.0,
            last_facing_change_at: f32::NEG_INFINITY,
            inventory: Inventory::new(),
            hands: None,
            equipped_weapon: None,
            equipped_ammo: None,
            outfits: vec![outfit],
            equipped_outfit: 0,
            extra_item: None,
            shadow: ShadowCache::default(),
            can_move: true,
            staggers: false,
            y_shift: 0.0,
            body: HUMAN_BODY,
            frames_since_hit: HEALTHBAR_VISIBLE_FRAMES,
        }
    }

    fn with_hands(mut self, hands: Weapon) -> Self {
        let handle = self.inventory.add_pinned(Item::Weapon(hands));
        self.hands = Some(handle);
        self.equipped_weapon = Some(handle);
        self
    }

    pub(crate) fn player(id: CharacterId, position: Vec2, hands: Weapon, outfit: Outfit) -> Self {
        let mut player = Self::base(id, CharacterKind::Player, Controller::PlayerInput, position, outfit)
            .with_hands(hands);
        player.stamina = MAX_STAMINA;
        player.max_stamina = MAX_STAMINA;
        player
    }

    pub(crate) fn combat_dummy(id: CharacterId, position: Vec2, outfit: Outfit) -> Self {
        let mut dummy = Self::base(
            id,
            CharacterKind::CombatDummy,
            Controller::Stationary,
            position,
            outfit,
        );
        dummy.health = DUMMY_MAX_HEALTH;
        dummy.max_health = DUMMY_MAX_HEALTH;
        dummy.can_move = false;
        dummy.staggers = true;
        dummy.y_shift = DUMMY_Y_SHIFT;
        dummy.body = DUMMY_BODY;
        dummy.base_speed = 0.0;
        dummy.speed = 0.0;
        dummy
    }

    pub(crate) fn bandit(
        id: CharacterId,
        position: Vec2,
        hands: Weapon,
        weapon: Weapon,
        outfit: Outfit,
    ) -> Self {
        let mut bandit = Self::base(
            id,
            CharacterKind::Bandit,
            Controller::PursueTarget,
            position,
            outfit,
        )
        .with_hands(hands);
        bandit.health = BANDIT_MAX_HEALTH;
        bandit.max_health = BANDIT_MAX_HEALTH;
        bandit.base_speed = NPC_SPEED;
        bandit.speed = NPC_SPEED;
        bandit.equipped_weapon = Some(bandit.inventory.add(Item::Weapon(weapon)));
        bandit
    }

    pub(crate) fn id(&self) -> CharacterId {
        self.id
    }

    pub(crate) fn kind(&self) -> CharacterKind {
        self.kind
    }

    pub(crate) fn controller(&self) -> Controller {
        self.controller
    }

    pub(crate) fn position(&self) -> Vec2 {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    #[cfg(test)]
    pub(crate) fn facing(&self) -> Facing {
        self.facing
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> AnimState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn anim_step(&self) -> f32 {
        self.anim_step
    }

    pub(crate) fn health(&self) -> i32 {
        self.health
    }

    pub(crate) fn max_health(&self) -> i32 {
        self.max_health
    }

    pub(crate) fn stamina(&self) -> f32 {
        self.stamina
    }

    pub(crate) fn max_stamina(&self) -> f32 {
        self.max_stamina
    }

    pub(crate) fn can_move(&self) -> bool {
        self.can_move
    }

    pub(crate) fn is_dead(&self) -> bool {
        self.state == AnimState::Dead
    }

    pub(crate) fn y_shift(&self) -> f32 {
        self.y_shift
    }

    pub(crate) fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub(crate) fn outfits(&self) -> &[Outfit] {
        &self.outfits
    }

    #[cfg(test)]
    pub(crate) fn equipped_outfit(&self) -> &Outfit {
        &self.outfits[self.equipped_outfit]
    }

    #[cfg(test)]
    pub(crate) fn equipped_weapon_handle(&self) -> Option<ItemHandle> {
        self.equipped_weapon
    }

    pub(crate) fn equipped_ammo_handle(&self) -> Option<ItemHandle> {
        self.equipped_ammo
    }

    #[cfg(test)]
    pub(crate) fn extra_item(&self) -> Option<&ExtraItem> {
        self.extra_item.as_ref()
    }

    pub(crate) fn shadow(&self) -> Option<ShadowDesc> {
        self.shadow.current()
    }

    pub(crate) fn equipped_weapon(&self) -> Option<&Weapon> {
        match self.inventory.get(self.equipped_weapon?) {
            Some(Item::Weapon(weapon)) => Some(weapon),
            _ => None,
        }
    }

    pub(crate) fn equipped_ammo_count(&self) -> Option<u32> {
        match self.inventory.get(self.equipped_ammo?) {
            Some(Item::Ammo(ammo)) => Some(ammo.count),
            _ => None,
        }
    }

    pub(crate) fn healthbar_visible(&self) -> bool {
        self.controller != Controller::PlayerInput
            && self.frames_since_hit < HEALTHBAR_VISIBLE_FRAMES
    }

    /// Body hitbox; the dead get the non-colliding placeholder.
    pub(crate) fn hitbox(&self) -> Rect {
        if self.is_dead() {
            return DEGENERATE_RECT;
        }
        Rect::new(
            self.position.x + self.body.dx,
            self.position.y + self.body.dy,
            self.body.w,
            self.body.h,
        )
    }

    pub(crate) fn sprite_sheet(&self) -> String {
        format!("{}/{}", self.kind.sprite_base(), self.state.sheet_name())
    }

    pub(crate) fn sprite_cell(&self) -> SpriteCell {
        let row = match (self.kind, self.state) {
            (CharacterKind::CombatDummy, _) | (_, AnimState::Dead) => 0,
            _ => self.facing.sprite_row(),
        };
        SpriteCell {
            row,
            column: self.anim_step.max(0.0) as u32,
            size: SPRITE_SIZE,
        }
    }

    /// Controller for NPCs that chase `target`: walk toward it while farther
    /// than the stop radius, attack once close.
    pub(crate) fn pursuit_intent(&self, target: Option<Vec2>) -> Intent {
        let Some(target) = target else {
            return Intent::default();
        };
        let delta = target - self.position;
        let face = Some(Facing::from_vector(delta));
        if delta.length() > PURSUIT_STOP_RADIUS {
            Intent {
                face,
                direction: delta.normalized().unwrap_or(Vec2::ZERO),
                ..Intent::default()
            }
        } else {
            Intent {
                face,
                attack: true,
                attack_held: true,
                ..Intent::default()
            }
        }
    }

    /// Advances one simulation frame.
    pub(crate) fn step(&mut self, intent: &Intent, ctx: &StepContext) -> StepOutput {
        self.check_ammo();
        self.frames_since_hit = self.frames_since_hit.saturating_add(1);

        if self.is_dead() {
            self.anim_step = (self.anim_step + self.anim_speed).min(DEAD_LAST_STEP);
            self.refresh_shadow(ctx);
            return StepOutput::default();
        }

        let attack = self.advance_animation(intent);
        self.apply_speed(intent, ctx.now);

        let movement = if self.state == AnimState::Walk && self.can_move {
            Vec2::new(
                intent.direction.x * self.speed,
                intent.direction.y * self.speed,
            )
        } else {
            Vec2::ZERO
        };

        if let Some(face) = intent.face {
            self.turn_to(face, ctx.now);
        }
        if intent.attack {
            let ready = self.state == AnimState::Idle
                || (self.state == AnimState::Walk && self.anim_step == WALK_LAST_STEP);
            if ready {
                self.begin_attack();
            }
        } else if intent.face.is_some() {
            if self.state == AnimState::Idle {
                self.set_state(AnimState::Walk);
            }
        } else if self.state == AnimState::Walk {
            self.set_state(AnimState::Idle);
        }

        self.refresh_shadow(ctx);
        StepOutput { movement, attack }
    }

    fn advance_animation(&mut self, intent: &Intent) -> Option<AttackIntent> {
        let previous = self.anim_step;
        let mut attack = None;
        match self.state {
            AnimState::Idle => self.anim_step = 0.0,
            AnimState::Walk => {
                self.anim_step += self.anim_speed;
                if self.anim_step > WALK_LAST_STEP {
                    self.anim_step = 0.0;
                }
            }
            AnimState::Slash => {
                self.anim_step += self.anim_speed;
                if crossed(previous, self.anim_step, SLASH_HIT_STEP) {
                    attack = self.attack_intent();
                }
                if self.anim_step > SLASH_LAST_STEP {
                    self.set_state(AnimState::Idle);
                }
            }
            AnimState::Thrust => {
                self.anim_step += self.anim_speed;
                if crossed(previous, self.anim_step, THRUST_HIT_STEP) {
                    attack = self.attack_intent();
                }
                if self.anim_step > THRUST_LAST_STEP {
                    self.set_state(AnimState::Idle);
                }
            }
            AnimState::Bow => {
                self.anim_step += self.anim_speed;
                if crossed(previous, self.anim_step, BOW_HIT_STEP) {
                    attack = self.attack_intent();
                }
                if self.anim_step > BOW_LAST_STEP {
                    if intent.attack_held {
                        self.anim_step = BOW_LOOP_STEP;
                    } else {
                        self.set_state(AnimState::Idle);
                    }
                }
            }
            AnimState::Hit => {
                if self.anim_step < WALK_LAST_STEP {
                    self.anim_step += self.anim_speed;
                }
                if self.anim_step > HIT_LAST_STEP {
                    self.set_state(AnimState::Idle);
                }
            }
            AnimState::Dead => {}
        }
        attack
    }

    fn apply_speed(&mut self, intent: &Intent, now: f32) {
        let sprinting = intent.sprint
            && self.state == AnimState::Walk
            && self.max_stamina > 0.0
            && self.stamina > 0.0;
        if sprinting {
            self.speed = SPRINT_SPEED;
            self.anim_speed = SPRINT_ANIM_SPEED;
            self.stamina -= SPRINT_STAMINA_COST;
            self.last_sprint_at = now;
        } else {
            self.speed = self.base_speed;
            self.anim_speed = WALK_ANIM_SPEED;
            let since_sprint = (now - self.last_sprint_at).max(0.0);
            let regen = (STAMINA_REGEN_RAMP * since_sprint * since_sprint).min(STAMINA_REGEN_CAP);
            self.stamina += regen;
        }
        self.stamina = self.stamina.clamp(0.0, self.max_stamina);
    }

    fn turn_to(&mut self, facing: Facing, now: f32) {
        if facing == self.facing {
            return;
        }
        if self.controller == Controller::PursueTarget
            && now - self.last_facing_change_at < FACING_CHANGE_INTERVAL_SECONDS
        {
            return;
        }
        self.facing = facing;
        self.last_facing_change_at = now;
    }

    fn begin_attack(&mut self) {
        let Some(kind) = self.equipped_weapon().map(|weapon| weapon.attack) else {
            return;
        };
        let state = match kind {
            AttackKind::Slash => AnimState::Slash,
            AttackKind::Thrust => AnimState::Thrust,
            AttackKind::Bow => AnimState::Bow,
        };
        self.set_state(state);
    }

    fn set_state(&mut self, state: AnimState) {
        self.state = state;
        self.anim_step = 0.0;
    }

    fn refresh_shadow(&mut self, ctx: &StepContext) {
        self.shadow.update(
            self.state,
            self.anim_step.max(0.0) as u32,
            ctx.day_time,
            ctx.outdoors,
        );
    }

    fn attack_intent(&self) -> Option<AttackIntent> {
        let weapon = self.equipped_weapon()?;
        let projectile = match (weapon.ranged, weapon.projectile, self.equipped_ammo_stack()) {
            (true, Some(kind), Some((ammo_kind, count, damage))) if ammo_kind == kind && count > 0 => {
                Some(ProjectileSpawn {
                    kind,
                    damage,
                    facing: self.facing,
                    origin: self.position,
                })
            }
            _ => None,
        };
        Some(AttackIntent {
            kind: weapon.attack,
            rect: weapon_hit_rect(self.position, self.facing, weapon.range),
            damage: weapon.damage,
            projectile,
        })
    }

    fn equipped_ammo_stack(&self) -> Option<(ProjectileKind, u32, i32)> {
        match self.inventory.get(self.equipped_ammo?) {
            Some(Item::Ammo(ammo)) => Some((ammo.projectile, ammo.count, ammo.damage)),
            _ => None,
        }
    }

    /// Per-frame ammo bookkeeping: an exhausted equipped stack is removed
    /// and replaced by a spare if one exists; the quiver follows possession.
    fn check_ammo(&mut self) {
        if let Some(handle) = self.equipped_ammo {
            let exhausted = match self.inventory.get(handle) {
                Some(Item::Ammo(ammo)) => ammo.count == 0,
                _ => true,
            };
            if exhausted {
                self.inventory.remove(handle);
                self.equipped_ammo = self.inventory.first_ammo();
                debug!(
                    character = self.id.0,
                    spare = self.equipped_ammo.is_some(),
                    "ammo_exhausted"
                );
            }
        }

        let has_ammo = self.inventory.has_ammo();
        match &self.extra_item {
            None if has_ammo => self.extra_item = Some(quiver()),
            Some(extra) if !has_ammo && extra.name == QUIVER_NAME => self.extra_item = None,
            _ => {}
        }
    }

    pub(crate) fn grant_quiver_if_missing(&mut self) {
        if self.extra_item.is_none() {
            self.extra_item = Some(quiver());
        }
    }

    /// Spends one unit of the equipped ammo. Returns false without ammo.
    pub(crate) fn spend_ammo(&mut self) -> bool {
        let Some(handle) = self.equipped_ammo else {
            return false;
        };
        match self.inventory.get_mut(handle) {
            Some(Item::Ammo(ammo)) if ammo.count > 0 => {
                ammo.count -= 1;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn wear_weapon(&mut self) {
        let Some(handle) = self.equipped_weapon else {
            return;
        };
        if let Some(Item::Weapon(weapon)) = self.inventory.get_mut(handle) {
            weapon.durability = (weapon.durability - weapon.durability_hit).max(0.0);
        }
    }

    pub(crate) fn take_damage(&mut self, damage: i32) -> DamageOutcome {
        if self.is_dead() {
            return DamageOutcome::Ignored;
        }
        self.health = (self.health - damage.max(0)).clamp(0, self.max_health);
        self.frames_since_hit = 0;
        if self.health == 0 {
            self.die();
            return DamageOutcome::Killed;
        }
        if self.staggers {
            self.set_state(AnimState::Hit);
        }
        DamageOutcome::Damaged
    }

    fn die(&mut self) {
        self.set_state(AnimState::Dead);
        self.health = 0;
        self.can_move = false;
        self.facing = Facing::Up;
        info!(character = self.id.0, kind = ?self.kind, "character_died");
    }

    pub(crate) fn add_item(&mut self, item: Item) -> ItemHandle {
        self.inventory.add(item)
    }

    /// Removes an item; the innate hands stay. Removing the active weapon
    /// falls back to the hands.
    pub(crate) fn remove_item(&mut self, handle: ItemHandle) -> Option<Item> {
        let removed = self.inventory.remove(handle)?;
        if self.equipped_weapon == Some(handle) {
            self.equipped_weapon = self.hands;
        }
        if self.equipped_ammo == Some(handle) {
            self.equipped_ammo = None;
        }
        Some(removed)
    }

    pub(crate) fn equip_weapon(&mut self, handle: ItemHandle) -> bool {
        if matches!(self.inventory.get(handle), Some(Item::Weapon(_))) {
            self.equipped_weapon = Some(handle);
            return true;
        }
        false
    }

    pub(crate) fn equip_ammo(&mut self, handle: ItemHandle) -> bool {
        if matches!(self.inventory.get(handle), Some(Item::Ammo(ammo)) if ammo.count > 0) {
            self.equipped_ammo = Some(handle);
            return true;
        }
        false
    }

    /// Equips whatever `handle` refers to, or consumes it if it is food.
    pub(crate) fn use_item(&mut self, handle: ItemHandle) -> bool {
        match self.inventory.get(handle) {
            Some(Item::Weapon(_)) => self.equip_weapon(handle),
            Some(Item::Ammo(_)) => self.equip_ammo(handle),
            Some(Item::Food(_)) => self.consume(handle),
            Some(Item::Outfit(_)) => {
                if self.is_dead() {
                    return false;
                }
                let Some(Item::Outfit(outfit)) = self.remove_item(handle) else {
                    return false;
                };
                let index = self.add_outfit(outfit);
                self.equip_outfit(index)
            }
            Some(Item::Extra(_)) => {
                let Some(Item::Extra(extra)) = self.remove_item(handle) else {
                    return false;
                };
                if let Some(previous) = self.extra_item.replace(extra) {
                    if previous.name != QUIVER_NAME {
                        self.inventory.add(Item::Extra(previous));
                    }
                }
                true
            }
            None => false,
        }
    }

    pub(crate) fn consume(&mut self, handle: ItemHandle) -> bool {
        let (health_add, stamina_add) = match self.inventory.get(handle) {
            Some(Item::Food(food)) => (food.health_add, food.stamina_add),
            _ => return false,
        };
        if self.is_dead() || self.remove_item(handle).is_none() {
            return false;
        }
        self.health = (self.health + health_add).clamp(0, self.max_health);
        self.stamina = (self.stamina + stamina_add).clamp(0.0, self.max_stamina);
        true
    }

    /// Takes ownership of `outfit` and returns its index in the owned list.
    pub(crate) fn add_outfit(&mut self, outfit: Outfit) -> usize {
        self.outfits.push(outfit);
        self.outfits.len() - 1
    }

    pub(crate) fn equip_outfit(&mut self, index: usize) -> bool {
        if index >= self.outfits.len() || self.is_dead() {
            return false;
        }
        self.equipped_outfit = index;
        self.set_state(AnimState::Idle);
        true
    }

    pub(crate) fn toggle_outfit(&mut self) {
        if self.state != AnimState::Idle || self.outfits.is_empty() {
            return;
        }
        let next = (self.equipped_outfit + 1) % self.outfits.len();
        self.equip_outfit(next);
    }

    /// Removes an owned outfit other than the equipped one.
    pub(crate) fn remove_outfit(&mut self, index: usize) -> Option<Outfit> {
        if index >= self.outfits.len() || index == self.equipped_outfit {
            return None;
        }
        let removed = self.outfits.remove(index);
        if index < self.equipped_outfit {
            self.equipped_outfit -= 1;
        }
        Some(removed)
    }
}

pub(crate) fn quiver() -> ExtraItem {
    ExtraItem {
        name: QUIVER_NAME.to_string(),
        icon: "quiver".to_string(),
    }
}

/// Directional hit rectangle on the facing side, sized by weapon range.
pub(crate) fn weapon_hit_rect(position: Vec2, facing: Facing, range: f32) -> Rect {
    let Vec2 { x, y } = position;
    match facing {
        Facing::Up => Rect::new(x - 5.0, y - range - 10.0, 10.0, range),
        Facing::Down => Rect::new(x - 5.0, y + 30.0, 10.0, range),
        Facing::Left => Rect::new(x - range - 10.0, y + 5.0, range, 10.0),
        Facing::Right => Rect::new(x + 10.0, y + 5.0, range, 10.0),
    }
}

fn crossed(previous: f32, current: f32, threshold: f32) -> bool {
    previous < threshold && current >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::gameplay::items::{Ammo, Food};

    fn hands() -> Weapon {
        Weapon {
            name: "Hands".to_string(),
            icon: "hands".to_string(),
            attack: AttackKind::Slash,
            damage: 2,
            range: 20.0,
            ranged: false,
            projectile: None,
            durability: 100.0,
            durability_hit: 0.0,
        }
    }

    fn spear() -> Weapon {
        Weapon {
            name: "Spear".to_string(),
            icon: "spear".to_string(),
            attack: AttackKind::Thrust,
            damage: 20,
            range: 30.0,
            ranged: false,
            projectile: None,
            durability: 100.0,
            durability_hit: 1.5,
        }
    }

    fn bow() -> Weapon {
        Weapon {
            name: "Bow".to_string(),
            icon: "bow".to_string(),
            attack: AttackKind::Bow,
            damage: 1,
            range: 10.0,
            ranged: true,
            projectile: Some(ProjectileKind::Arrow),
            durability: 100.0,
            durability_hit: 0.0,
        }
    }

    fn arrows(count: u32) -> Item {
        Item::Ammo(Ammo {
            name: "Arrows".to_string(),
            icon: "arrows".to_string(),
            count,
            projectile: ProjectileKind::Arrow,
            damage: 15,
        })
    }

    fn robe() -> Outfit {
        Outfit {
            name: "Unhooded robe".to_string(),
            icon: "robe".to_string(),
            armor: 1,
            has_hood: false,
            durability: 100.0,
        }
    }

    fn plate() -> Outfit {
        Outfit {
            name: "Plate armor".to_string(),
            icon: "platearmor".to_string(),
            armor: 5,
            has_hood: true,
            durability: 100.0,
        }
    }

    fn ctx(now: f32) -> StepContext {
        StepContext {
            now,
            day_time: 50.0,
            outdoors: true,
        }
    }

    fn player() -> Character {
        Character::player(CharacterId(1), Vec2::new(300.0, 300.0), hands(), robe())
    }

    fn attack_press() -> Intent {
        Intent::from_keys(false, false, false, false, true, false)
    }

    fn run_until_idle(character: &mut Character, intent: Intent) -> Vec<AttackIntent> {
        let mut attacks = Vec::new();
        for frame in 0..64 {
            let output = character.step(&intent, &ctx(frame as f32 / 30.0));
            attacks.extend(output.attack);
            if character.state() == AnimState::Idle && frame > 0 {
                break;
            }
        }
        attacks
    }

    #[test]
    fn key_priority_lets_later_directions_win_and_blocks_attack() {
        let intent = Intent::from_keys(true, false, false, true, true, false);
        assert_eq!(intent.face, Some(Facing::Right));
        assert!(!intent.attack);
        assert!(intent.attack_held);
        assert_eq!(intent.direction, Vec2::new(1.0, -1.0));
        assert!(intent.moves_toward(Facing::Up));
        assert!(!intent.moves_toward(Facing::Down));
    }

    #[test]
    fn idle_to_walk_then_moves_at_walk_speed() {
        let mut player = player();
        let right = Intent::from_keys(false, false, false, true, false, false);

        let first = player.step(&right, &ctx(0.0));
        assert_eq!(player.state(), AnimState::Walk);
        assert_eq!(first.movement, Vec2::ZERO);

        let second = player.step(&right, &ctx(1.0 / 30.0));
        assert_eq!(second.movement, Vec2::new(WALK_SPEED, 0.0));
        assert_eq!(player.facing(), Facing::Right);

        player.step(&Intent::default(), &ctx(2.0 / 30.0));
        assert_eq!(player.state(), AnimState::Idle);
        assert_eq!(player.anim_step(), 0.0);
    }

    #[test]
    fn walk_cycle_wraps_after_step_eight() {
        let mut player = player();
        let down = Intent::from_keys(false, false, true, false, false, false);
        let mut max_step = 0.0f32;
        for frame in 0..40 {
            player.step(&down, &ctx(frame as f32 / 30.0));
            max_step = max_step.max(player.anim_step());
            assert!(player.anim_step() <= WALK_LAST_STEP);
        }
        assert_eq!(max_step, WALK_LAST_STEP);
    }

    #[test]
    fn slash_emits_exactly_one_attack_then_returns_to_idle() {
        let mut player = player();
        player.step(&attack_press(), &ctx(0.0));
        assert_eq!(player.state(), AnimState::Slash);

        let attacks = run_until_idle(&mut player, Intent::default());
        assert_eq!(attacks.len(), 1);
        let attack = attacks[0];
        assert_eq!(attack.damage, 2);
        assert_eq!(attack.rect, Rect::new(310.0, 305.0, 20.0, 10.0));
        assert!(attack.projectile.is_none());
    }

    #[test]
    fn thrust_attack_uses_weapon_range_and_facing() {
        let mut player = player();
        let handle = player.add_item(Item::Weapon(spear()));
        assert!(player.equip_weapon(handle));
        player.step(&Intent::from_keys(true, false, false, false, false, false), &ctx(0.0));
        player.step(&Intent::default(), &ctx(0.1));
        assert_eq!(player.state(), AnimState::Idle);
        assert_eq!(player.facing(), Facing::Up);

        player.step(&attack_press(), &ctx(0.2));
        assert_eq!(player.state(), AnimState::Thrust);
        let attacks = run_until_idle(&mut player, Intent::default());
        assert_eq!(attacks.len(), 1);
        assert_eq!(attacks[0].rect, Rect::new(295.0, 260.0, 10.0, 30.0));
        assert_eq!(attacks[0].damage, 20);
    }

    #[test]
    fn bow_loops_while_attack_is_held() {
        let mut player = player();
        let bow = player.add_item(Item::Weapon(bow()));
        player.equip_weapon(bow);
        let held = attack_press();

        player.step(&held, &ctx(0.0));
        assert_eq!(player.state(), AnimState::Bow);
        let mut attacks = 0;
        for frame in 1..60 {
            if player.step(&held, &ctx(frame as f32 / 30.0)).attack.is_some() {
                attacks += 1;
            }
            assert_eq!(player.state(), AnimState::Bow);
        }
        assert!(attacks >= 2);

        let mut released_frames = 0;
        while player.state() == AnimState::Bow && released_frames < 40 {
            player.step(&Intent::default(), &ctx(3.0));
            released_frames += 1;
        }
        assert_eq!(player.state(), AnimState::Idle);
    }

    #[test]
    fn bow_shot_carries_projectile_only_with_matching_ammo() {
        let mut player = player();
        let bow = player.add_item(Item::Weapon(bow()));
        player.equip_weapon(bow);
        player.step(&attack_press(), &ctx(0.0));
        let dry = run_until_idle(&mut player, Intent::default());
        assert_eq!(dry.len(), 1);
        assert!(dry[0].projectile.is_none());

        let ammo = player.add_item(arrows(3));
        assert!(player.equip_ammo(ammo));
        player.step(&attack_press(), &ctx(1.0));
        let loaded = run_until_idle(&mut player, Intent::default());
        let spawn = loaded[0].projectile.expect("projectile");
        assert_eq!(spawn.damage, 15);
        assert_eq!(spawn.facing, Facing::Right);
    }

    #[test]
    fn state_machine_is_deterministic() {
        let script = [
            Intent::from_keys(false, false, false, true, false, true),
            Intent::from_keys(true, false, false, false, false, false),
            Intent::default(),
            attack_press(),
            Intent::from_keys(false, true, false, false, false, true),
        ];
        let run = || {
            let mut player = player();
            let mut trace = Vec::new();
            for frame in 0..150 {
                let intent = script[(frame / 7) % script.len()];
                let output = player.step(&intent, &ctx(frame as f32 / 30.0));
                trace.push((
                    player.state(),
                    player.anim_step(),
                    player.facing(),
                    output.movement,
                    output.attack.map(|attack| attack.rect),
                    player.stamina(),
                ));
            }
            trace
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn dummy_takes_three_dagger_hits_and_cycles_through_hit() {
        let mut dummy = Character::combat_dummy(CharacterId(2), Vec2::new(700.0, 60.0), robe());
        let mut seen = vec![dummy.state()];
        for hit in 0..3 {
            assert_eq!(dummy.take_damage(10), DamageOutcome::Damaged);
            seen.push(dummy.state());
            for frame in 0..20 {
                dummy.step(&Intent::default(), &ctx(hit as f32 + frame as f32 / 30.0));
            }
            seen.push(dummy.state());
        }
        assert_eq!(dummy.health(), 270);
        assert_eq!(
            &seen[..3],
            &[AnimState::Idle, AnimState::Hit, AnimState::Idle]
        );
        assert!(dummy.healthbar_visible());
    }

    #[test]
    fn death_is_terminal_and_clears_collision() {
        let mut dummy = Character::combat_dummy(CharacterId(2), Vec2::new(700.0, 60.0), robe());
        assert_eq!(dummy.take_damage(1000), DamageOutcome::Killed);
        assert_eq!(dummy.health(), 0);
        assert!(dummy.is_dead());
        assert!(!dummy.can_move());
        assert_eq!(dummy.facing(), Facing::Up);
        assert_eq!(dummy.hitbox(), DEGENERATE_RECT);
        assert_eq!(dummy.take_damage(10), DamageOutcome::Ignored);

        for frame in 0..30 {
            let output = dummy.step(&attack_press(), &ctx(frame as f32));
            assert_eq!(output, StepOutput::default());
        }
        assert_eq!(dummy.state(), AnimState::Dead);
        assert_eq!(dummy.anim_step(), DEAD_LAST_STEP);
        assert!(dummy.shadow().expect("shadow").flattened);
    }

    #[test]
    fn health_never_leaves_bounds() {
        let mut player = player();
        let apple = player
            .add_item(Item::Food(Food {
                name: "Apple".to_string(),
                icon: "apple".to_string(),
                health_add: 50,
                stamina_add: 10.0,
            }));
        player.take_damage(-20);
        assert_eq!(player.health(), PLAYER_MAX_HEALTH);
        player.take_damage(30);
        assert!(player.consume(apple));
        assert_eq!(player.health(), PLAYER_MAX_HEALTH);
        assert!(player.inventory().get(apple).is_none());
        assert!(!player.consume(apple));
    }

    #[test]
    fn exhausted_ammo_is_removed_on_next_check() {
        let mut player = player();
        let ammo = player.add_item(arrows(1));
        player.equip_ammo(ammo);
        player.step(&Intent::default(), &ctx(0.0));
        assert_eq!(player.extra_item().map(|extra| extra.name.as_str()), Some(QUIVER_NAME));

        assert!(player.spend_ammo());
        assert!(!player.spend_ammo());
        player.step(&Intent::default(), &ctx(0.1));

        assert!(player.inventory().get(ammo).is_none());
        assert_eq!(player.equipped_ammo_handle(), None);
        assert!(player.extra_item().is_none());
    }

    #[test]
    fn exhausted_ammo_falls_back_to_spare_stack() {
        let mut player = player();
        let first = player.add_item(arrows(1));
        let spare = player.add_item(arrows(4));
        player.equip_ammo(first);
        player.spend_ammo();
        player.step(&Intent::default(), &ctx(0.0));

        assert_eq!(player.equipped_ammo_handle(), Some(spare));
        assert_eq!(player.equipped_ammo_count(), Some(4));
        assert!(player.extra_item().is_some());
    }

    #[test]
    fn hands_cannot_be_removed_and_are_the_fallback_weapon() {
        let mut player = player();
        let hands = player.equipped_weapon_handle().expect("hands");
        assert!(player.remove_item(hands).is_none());

        let spear = player.add_item(Item::Weapon(spear()));
        player.equip_weapon(spear);
        player.remove_item(spear).expect("removed");
        assert_eq!(player.equipped_weapon_handle(), Some(hands));
        assert_eq!(player.equipped_weapon().map(|w| w.name.as_str()), Some("Hands"));
    }

    #[test]
    fn sprint_spends_stamina_and_regenerates_after() {
        let mut player = player();
        let sprint_right = Intent::from_keys(false, false, false, true, false, true);
        player.step(&sprint_right, &ctx(0.0));
        let output = player.step(&sprint_right, &ctx(1.0 / 30.0));
        assert_eq!(output.movement, Vec2::new(SPRINT_SPEED, 0.0));
        for frame in 2..40 {
            player.step(&sprint_right, &ctx(frame as f32 / 30.0));
        }
        let tired = player.stamina();
        assert!(tired < MAX_STAMINA);

        let mut previous = tired;
        for frame in 40..400 {
            player.step(&Intent::default(), &ctx(frame as f32 / 30.0));
            assert!(player.stamina() >= previous);
            assert!(player.stamina() <= MAX_STAMINA);
            previous = player.stamina();
        }
        assert_eq!(player.stamina(), MAX_STAMINA);
    }

    #[test]
    fn exhausted_stamina_falls_back_to_walk_speed() {
        let mut player = player();
        player.stamina = 0.0;
        player.last_sprint_at = 10.0;
        let sprint_right = Intent::from_keys(false, false, false, true, false, true);
        player.step(&sprint_right, &ctx(10.0));
        let output = player.step(&sprint_right, &ctx(10.0));
        assert_eq!(output.movement, Vec2::new(WALK_SPEED, 0.0));
    }

    #[test]
    fn npc_pursues_until_stop_radius_then_attacks() {
        let bandit = Character::bandit(
            CharacterId(3),
            Vec2::new(0.0, 0.0),
            hands(),
            spear(),
            robe(),
        );
        let far = bandit.pursuit_intent(Some(Vec2::new(300.0, 400.0)));
        assert!(!far.attack);
        assert!((far.direction.length() - 1.0).abs() < 1e-5);
        assert_eq!(far.face, Some(Facing::Down));

        let near = bandit.pursuit_intent(Some(Vec2::new(20.0, 0.0)));
        assert!(near.attack);
        assert_eq!(near.direction, Vec2::ZERO);
        assert_eq!(near.face, Some(Facing::Right));

        assert_eq!(bandit.pursuit_intent(None), Intent::default());
    }

    #[test]
    fn npc_facing_changes_are_rate_limited() {
        let mut bandit = Character::bandit(
            CharacterId(3),
            Vec2::new(0.0, 0.0),
            hands(),
            spear(),
            robe(),
        );
        let up = Intent {
            face: Some(Facing::Up),
            ..Intent::default()
        };
        let left = Intent {
            face: Some(Facing::Left),
            ..Intent::default()
        };
        bandit.step(&up, &ctx(1.0));
        assert_eq!(bandit.facing(), Facing::Up);
        bandit.step(&left, &ctx(1.1));
        assert_eq!(bandit.facing(), Facing::Up);
        bandit.step(&left, &ctx(1.31));
        assert_eq!(bandit.facing(), Facing::Left);
    }

    #[test]
    fn outfits_equip_toggle_and_protect_equipped() {
        let mut player = player();
        assert_eq!(player.add_outfit(plate()), 1);
        assert_eq!(player.outfits().len(), 2);

        player.toggle_outfit();
        assert_eq!(player.equipped_outfit().name, "Plate armor");
        assert!(player.remove_outfit(1).is_none());
        assert!(player.remove_outfit(0).is_some());
        assert_eq!(player.equipped_outfit().name, "Plate armor");
        assert!(!player.equip_outfit(5));
    }

    #[test]
    fn using_an_outfit_moves_it_out_of_the_inventory() {
        let mut player = player();
        let armor = player.add_item(Item::Outfit(plate()));
        let items_before = player.inventory().len();

        assert!(player.use_item(armor));
        assert!(player.inventory().get(armor).is_none());
        assert_eq!(player.inventory().len(), items_before - 1);
        assert_eq!(player.outfits().len(), 2);
        assert_eq!(player.equipped_outfit().name, "Plate armor");
    }

    #[test]
    fn worn_extra_items_swap_back_into_the_inventory() {
        let mut player = player();
        let cloak = |name: &str| {
            Item::Extra(ExtraItem {
                name: name.to_string(),
                icon: name.to_ascii_lowercase(),
            })
        };
        let first = player.add_item(cloak("Cape"));
        let second = player.add_item(cloak("Satchel"));

        assert!(player.use_item(first));
        assert_eq!(player.extra_item().map(|extra| extra.name.as_str()), Some("Cape"));
        assert!(player.use_item(second));
        assert_eq!(player.extra_item().map(|extra| extra.name.as_str()), Some("Satchel"));
        assert!(player.inventory().find_by_display_name("Cape").is_some());
        assert!(player.inventory().find_by_display_name("Satchel").is_none());
    }

    #[test]
    fn melee_wear_reduces_durability_to_zero_floor() {
        let mut player = player();
        let spear = player.add_item(Item::Weapon(spear()));
        player.equip_weapon(spear);
        for _ in 0..100 {
            player.wear_weapon();
        }
        assert_eq!(player.equipped_weapon().map(|w| w.durability), Some(0.0));
    }
}

use engine::{first_colliding, Rect, Vec2};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::camera::Camera;
use super::character::{
    AttackIntent, Character, CharacterId, Controller, DamageOutcome, Intent, StepContext,
    StepOutput,
};
use super::clock::DayClock;
use super::content::{new_npc, new_player};
use super::items::Item;
use super::loot::Loot;
use super::map::{CachedMap, GameMap, MapCache, MapCacheError};
use super::messages::{MessageBoard, NOTIFICATION_SECONDS};
use super::overlay::{MapOverlay, OverlayStore};
use super::projectile::Projectile;
use super::scripts::{MapTransition, NpcKind, ScriptRegistry, TriggerScript};

pub(crate) const KNOCKBACK_DISTANCE: f32 = 8.0;
pub(crate) const TRANSITION_FLOOR_SECONDS: f32 = 0.3;
const STARTING_DAY_TIME: f32 = 20.0;

/// Owner of an entry in the frame's hitbox set. Characters take damage; map
/// colliders block movement and projectiles; water blocks movement only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HitboxOwner {
    Character(CharacterId),
    MapCollider(usize),
    Water(usize),
}

#[derive(Debug, Error)]
pub(crate) enum FrameError {
    #[error("character {id} has a non-finite position ({x}, {y})")]
    NonFinitePosition { id: u32, x: f32, y: f32 },
    #[error("current map '{0}' is not loaded")]
    MapMissing(String),
    #[error(transparent)]
    Transition(#[from] MapCacheError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FrameOutcome {
    Continued,
    Transitioned { map: String },
}

struct MeleeStrike {
    attacker: CharacterId,
    rect: Rect,
    damage: i32,
    origin: Vec2,
}

/// All simulation state: the current map, its live characters and items,
/// and what is remembered about other maps.
pub(crate) struct World {
    maps: MapCache,
    registry: ScriptRegistry,
    overlays: OverlayStore,
    current_map: String,
    player: Character,
    npcs: Vec<Character>,
    projectiles: Vec<Projectile>,
    loot: Vec<Loot>,
    messages: MessageBoard,
    clock: DayClock,
    camera: Camera,
    now: f32,
    frame: u64,
    next_character_id: u32,
    transition_until: f32,
}

impl World {
    pub(crate) fn new(
        mut maps: MapCache,
        registry: ScriptRegistry,
        start_map: &str,
        player_spawn: Vec2,
    ) -> Result<Self, MapCacheError> {
        maps.ensure_loaded(start_map, 0.0)?;
        let player = new_player(CharacterId(0), player_spawn);
        let mut world = Self {
            maps,
            registry,
            overlays: OverlayStore::new(),
            current_map: start_map.to_string(),
            player,
            npcs: Vec::new(),
            projectiles: Vec::new(),
            loot: Vec::new(),
            messages: MessageBoard::new(),
            clock: DayClock::new(STARTING_DAY_TIME),
            camera: Camera::new(Vec2::ZERO),
            now: 0.0,
            frame: 0,
            next_character_id: 1,
            transition_until: 0.0,
        };
        world.follow_player();
        info!(map = start_map, x = player_spawn.x, y = player_spawn.y, "world_created");
        Ok(world)
    }

    pub(crate) fn player(&self) -> &Character {
        &self.player
    }

    pub(crate) fn player_mut(&mut self) -> &mut Character {
        &mut self.player
    }

    pub(crate) fn npcs(&self) -> &[Character] {
        &self.npcs
    }

    pub(crate) fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub(crate) fn loot(&self) -> &[Loot] {
        &self.loot
    }

    pub(crate) fn messages(&self) -> &MessageBoard {
        &self.messages
    }

    pub(crate) fn clock(&self) -> &DayClock {
        &self.clock
    }

    pub(crate) fn camera(&self) -> &Camera {
        &self.camera
    }

    pub(crate) fn frame(&self) -> u64 {
        self.frame
    }

    pub(crate) fn current_map_name(&self) -> &str {
        &self.current_map
    }

    pub(crate) fn current_map(&self) -> Option<&GameMap> {
        self.maps.get(&self.current_map).map(|cached| &cached.map)
    }

    pub(crate) fn current_cached_map(&self) -> Option<&CachedMap> {
        self.maps.get(&self.current_map)
    }

    /// True while the minimum transition presentation time has not passed.
    pub(crate) fn is_transitioning(&self) -> bool {
        self.now < self.transition_until
    }

    pub(crate) fn spawn_npc(&mut self, kind: NpcKind, position: Vec2) -> CharacterId {
        let id = CharacterId(self.next_character_id);
        self.next_character_id = self.next_character_id.saturating_add(1);
        self.npcs.push(new_npc(kind, id, position));
        debug!(npc = id.0, kind = ?kind, x = position.x, y = position.y, "npc_spawned");
        id
    }

    pub(crate) fn drop_loot(&mut self, item: Item, position: Vec2, duration_seconds: f32) {
        self.loot
            .push(Loot::new(position, item, duration_seconds, self.now));
    }

    /// Every hitbox that can block or be struck this frame, in a fixed order:
    /// player, NPCs in spawn order, map colliders, water.
    pub(crate) fn hitbox_set(&self) -> Vec<(HitboxOwner, Rect)> {
        let mut hitboxes = Vec::with_capacity(1 + self.npcs.len());
        hitboxes.push((HitboxOwner::Character(self.player.id()), self.player.hitbox()));
        hitboxes.extend(
            self.npcs
                .iter()
                .map(|npc| (HitboxOwner::Character(npc.id()), npc.hitbox())),
        );
        if let Some(map) = self.current_map() {
            hitboxes.extend(
                map.colliders()
                    .iter()
                    .enumerate()
                    .map(|(index, rect)| (HitboxOwner::MapCollider(index), *rect)),
            );
            hitboxes.extend(
                map.water()
                    .iter()
                    .enumerate()
                    .map(|(index, rect)| (HitboxOwner::Water(index), *rect)),
            );
        }
        hitboxes
    }

    fn character(&self, id: CharacterId) -> Option<&Character> {
        if self.player.id() == id {
            return Some(&self.player);
        }
        self.npcs.iter().find(|npc| npc.id() == id)
    }

    fn character_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        if self.player.id() == id {
            return Some(&mut self.player);
        }
        self.npcs.iter_mut().find(|npc| npc.id() == id)
    }

    /// Runs one simulation frame.
    pub(crate) fn step(&mut self, intent: &Intent, dt_seconds: f32) -> Result<FrameOutcome, FrameError> {
        self.now += dt_seconds;
        self.frame = self.frame.saturating_add(1);
        let outdoors = self
            .current_map()
            .map(GameMap::outdoors)
            .ok_or_else(|| FrameError::MapMissing(self.current_map.clone()))?;
        let ctx = StepContext {
            now: self.now,
            day_time: self.clock.day_time(),
            outdoors,
        };

        let outputs = self.advance_characters(intent, &ctx);
        let strikes = self.collect_attacks(&outputs);
        self.advance_projectiles();
        self.resolve_strikes(&strikes);
        self.resolve_projectile_hits();
        for (id, output) in &outputs {
            if output.movement != Vec2::ZERO {
                self.move_character(*id, output.movement);
            }
        }
        self.pick_up_loot();

        if let Some(transition) = self.evaluate_triggers(intent) {
            self.transition_to(&transition)?;
            return Ok(FrameOutcome::Transitioned {
                map: self.current_map.clone(),
            });
        }

        self.follow_player();
        if let Some(event) = self.clock.advance(dt_seconds) {
            info!(event = ?event, day_time = self.clock.day_time(), "day_event");
            self.messages
                .show(event.message(), NOTIFICATION_SECONDS, self.now);
        }
        self.messages.expire(self.now);
        self.check_positions()?;
        Ok(FrameOutcome::Continued)
    }

    fn advance_characters(&mut self, intent: &Intent, ctx: &StepContext) -> Vec<(CharacterId, StepOutput)> {
        let mut outputs = Vec::with_capacity(1 + self.npcs.len());
        outputs.push((self.player.id(), self.player.step(intent, ctx)));

        let target = (!self.player.is_dead()).then(|| self.player.position());
        for npc in &mut self.npcs {
            let npc_intent = match npc.controller() {
                Controller::PursueTarget => npc.pursuit_intent(target),
                Controller::PlayerInput | Controller::Stationary => Intent::default(),
            };
            outputs.push((npc.id(), npc.step(&npc_intent, ctx)));
        }
        outputs
    }

    /// Spawns projectiles for shots with ammo and returns this frame's melee
    /// strikes.
    fn collect_attacks(&mut self, outputs: &[(CharacterId, StepOutput)]) -> Vec<MeleeStrike> {
        let mut strikes = Vec::new();
        for (id, output) in outputs {
            let Some(AttackIntent {
                rect,
                damage,
                projectile,
                ..
            }) = output.attack
            else {
                continue;
            };
            let Some(character) = self.character_mut(*id) else {
                continue;
            };
            let origin = character.position();
            if let Some(spawn) = projectile {
                if character.spend_ammo() {
                    self.projectiles.push(Projectile::spawn(*id, &spawn));
                    debug!(owner = id.0, facing = ?spawn.facing, "projectile_spawned");
                }
            }
            strikes.push(MeleeStrike {
                attacker: *id,
                rect,
                damage,
                origin,
            });
        }
        strikes
    }

    fn advance_projectiles(&mut self) {
        for projectile in &mut self.projectiles {
            projectile.advance();
        }
        self.projectiles.retain(|projectile| !projectile.is_expired());
    }

    fn resolve_strikes(&mut self, strikes: &[MeleeStrike]) {
        for strike in strikes {
            let targets: Vec<CharacterId> = self
                .hitbox_set()
                .into_iter()
                .filter_map(|(owner, hitbox)| match owner {
                    HitboxOwner::Character(id)
                        if id != strike.attacker && strike.rect.intersects(&hitbox) =>
                    {
                        Some(id)
                    }
                    _ => None,
                })
                .collect();
            for target in targets {
                let landed = self.damage_character(target, strike.damage, strike.attacker);
                let push = self
                    .character(target)
                    .map(|victim| victim.position() - strike.origin);
                if landed {
                    if let Some(attacker) = self.character_mut(strike.attacker) {
                        attacker.wear_weapon();
                    }
                    if let Some(push) = push {
                        self.knock_back(target, push);
                    }
                }
            }
        }
    }

    fn resolve_projectile_hits(&mut self) {
        let mut index = 0;
        while index < self.projectiles.len() {
            let projectile = &self.projectiles[index];
            if !projectile.is_active() {
                index += 1;
                continue;
            }
            let owner = projectile.owner();
            let rect = projectile.hitbox();
            let damage = projectile.damage();
            let push = projectile.facing().unit();

            let hitboxes = self.hitbox_set();
            let candidates = hitboxes.iter().filter_map(|(hitbox_owner, hitbox)| match hitbox_owner {
                HitboxOwner::Character(id) if *id == owner => None,
                HitboxOwner::Water(_) => None,
                _ => Some((*hitbox_owner, hitbox)),
            });
            match first_colliding(&rect, candidates) {
                Some(HitboxOwner::Character(target)) => {
                    self.projectiles.remove(index);
                    if self.damage_character(target, damage, owner) {
                        self.knock_back(target, push);
                    }
                }
                Some(HitboxOwner::MapCollider(_)) => {
                    self.projectiles.remove(index);
                }
                Some(HitboxOwner::Water(_)) | None => index += 1,
            }
        }
    }

    /// Returns whether the hit landed on a living character.
    fn damage_character(&mut self, target: CharacterId, damage: i32, attacker: CharacterId) -> bool {
        let Some(victim) = self.character_mut(target) else {
            return false;
        };
        let outcome = victim.take_damage(damage);
        let health = victim.health();
        match outcome {
            DamageOutcome::Ignored => false,
            DamageOutcome::Damaged | DamageOutcome::Killed => {
                debug!(
                    attacker = attacker.0,
                    target = target.0,
                    damage,
                    health,
                    "character_hit"
                );
                true
            }
        }
    }

    fn knock_back(&mut self, target: CharacterId, direction: Vec2) {
        let Some(unit) = direction.normalized() else {
            return;
        };
        self.move_character(target, unit * KNOCKBACK_DISTANCE);
    }

    /// Axis-separated move: X first, then Y from the X-resolved box. Each
    /// axis is tested one unit past its displacement and dropped on contact.
    pub(crate) fn move_character(&mut self, id: CharacterId, delta: Vec2) {
        let Some(character) = self.character(id) else {
            return;
        };
        if !character.can_move() {
            return;
        }
        let body = character.hitbox();
        let obstacles: Vec<Rect> = self
            .hitbox_set()
            .into_iter()
            .filter(|(owner, _)| *owner != HitboxOwner::Character(id))
            .map(|(_, rect)| rect)
            .collect();
        let (dx, dy) = resolve_axis_movement(&body, delta, &obstacles);

        if let Some(character) = self.character_mut(id) {
            let position = character.position();
            character.set_position(Vec2::new(position.x + dx, position.y + dy));
        }
    }

    fn pick_up_loot(&mut self) {
        let now = self.now;
        self.loot.retain(|loot| !loot.is_expired(now));
        if self.player.is_dead() {
            return;
        }
        let reach_from = self.player.position();
        let mut index = 0;
        while index < self.loot.len() {
            if !self.loot[index].within_reach(reach_from) {
                index += 1;
                continue;
            }
            let item = self.loot.remove(index).into_item();
            let name = item.name().to_string();
            let is_ammo = matches!(item, Item::Ammo(_));
            let handle = self.player.add_item(item);
            if is_ammo {
                self.player.grant_quiver_if_missing();
                if self.player.equipped_ammo_handle().is_none() {
                    self.player.equip_ammo(handle);
                }
            }
            info!(item = %name, "loot_picked_up");
            self.messages
                .show(&format!("Picked up {name}"), NOTIFICATION_SECONDS, now);
        }
    }

    /// Fires overlapping triggers and applies their scripts. Returns the first
    /// map change requested, which ends the frame.
    fn evaluate_triggers(&mut self, intent: &Intent) -> Option<MapTransition> {
        if self.player.is_dead() {
            return None;
        }
        let body = self.player.hitbox();
        let now = self.now;
        let registry = &self.registry;
        let cached = self.maps.get_mut(&self.current_map)?;

        let mut fired: Vec<TriggerScript> = Vec::new();
        let mut index = 0;
        while index < cached.triggers.len() {
            let trigger = &mut cached.triggers[index];
            if !trigger.region().intersects(&body) {
                index += 1;
                continue;
            }
            if trigger.is_disabled() {
                debug!(trigger = trigger.name(), "trigger_retired");
                cached.triggers.remove(index);
                continue;
            }
            index += 1;
            if !trigger.is_ready(now) {
                continue;
            }
            let Some(script) = registry.get(trigger.name()) else {
                warn!(trigger = trigger.name(), "trigger_script_missing");
                trigger.defer(now);
                continue;
            };
            if script
                .movement_req
                .is_some_and(|required| !intent.moves_toward(required))
            {
                continue;
            }
            if trigger.try_fire(now).is_some() {
                info!(trigger = %script.name, "trigger_fired");
                fired.push(script.clone());
            }
        }

        let mut transition = None;
        for script in fired {
            for message in &script.messages {
                self.messages.show(&message.text, message.duration, now);
            }
            for spawn in &script.npc_spawns {
                self.spawn_npc(spawn.kind, spawn.position);
            }
            if transition.is_none() {
                transition = script.transition;
            }
        }
        transition
    }

    fn transition_to(&mut self, transition: &MapTransition) -> Result<(), FrameError> {
        self.maps.ensure_loaded(&transition.map, self.now)?;
        let from = std::mem::replace(&mut self.current_map, transition.map.clone());
        self.overlays.store(
            &from,
            MapOverlay {
                npcs: std::mem::take(&mut self.npcs),
                loot: std::mem::take(&mut self.loot),
                player_position: self.player.position(),
                camera_position: self.camera.position(),
            },
        );
        self.projectiles.clear();

        let restored = self.overlays.take(&transition.map);
        let (stored_player, stored_camera) = match restored {
            Some(overlay) => {
                self.npcs = overlay.npcs;
                self.loot = overlay.loot;
                (Some(overlay.player_position), Some(overlay.camera_position))
            }
            None => (None, None),
        };
        let fallback = self
            .current_map()
            .map(|map| map.pixel_size() * 0.5)
            .unwrap_or(Vec2::ZERO);
        let player_position = transition
            .player_position
            .or(stored_player)
            .unwrap_or(fallback);
        self.player.set_position(player_position);
        match transition.camera_position.or(stored_camera) {
            Some(camera) => self.camera.set_position(camera),
            None => self.follow_player(),
        }
        self.transition_until = self.now + TRANSITION_FLOOR_SECONDS;
        info!(
            from = %from,
            to = %self.current_map,
            npcs = self.npcs.len(),
            loot = self.loot.len(),
            "map_transition"
        );
        Ok(())
    }

    fn follow_player(&mut self) {
        let Some(map) = self.maps.get(&self.current_map).map(|cached| &cached.map) else {
            return;
        };
        self.camera
            .follow(self.player.position(), map.pixel_size(), map.outdoors());
    }

    fn check_positions(&self) -> Result<(), FrameError> {
        for character in std::iter::once(&self.player).chain(self.npcs.iter()) {
            let position = character.position();
            if !position.is_finite() {
                return Err(FrameError::NonFinitePosition {
                    id: character.id().0,
                    x: position.x,
                    y: position.y,
                });
            }
        }
        Ok(())
    }
}

/// Per-axis displacement allowed for `body` moving by `delta` among
/// `obstacles`.
pub(crate) fn resolve_axis_movement(body: &Rect, delta: Vec2, obstacles: &[Rect]) -> (f32, f32) {
    let blocked = |reach: Rect| obstacles.iter().any(|obstacle| reach.intersects(obstacle));

    let mut dx = delta.x;
    if dx != 0.0 && blocked(body.translated(dx + dx.signum(), 0.0)) {
        dx = 0.0;
    }
    let moved = body.translated(dx, 0.0);
    let mut dy = delta.y;
    if dy != 0.0 && blocked(moved.translated(0.0, dy + dy.signum())) {
        dy = 0.0;
    }
    (dx, dy)
}

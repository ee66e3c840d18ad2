use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use engine::Vec2;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::character::Facing;
use super::messages::SCRIPT_MESSAGE_SECONDS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum NpcKind {
    Bandit,
    CombatDummy,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScriptMessage {
    pub(crate) text: String,
    pub(crate) duration: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct NpcSpawn {
    pub(crate) kind: NpcKind,
    pub(crate) position: Vec2,
}

/// Map change performed by a script. Missing positions fall back to where
/// the player last left that map.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MapTransition {
    pub(crate) map: String,
    pub(crate) player_position: Option<Vec2>,
    pub(crate) camera_position: Option<Vec2>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TriggerScript {
    pub(crate) name: String,
    pub(crate) movement_req: Option<Facing>,
    pub(crate) messages: Vec<ScriptMessage>,
    pub(crate) npc_spawns: Vec<NpcSpawn>,
    pub(crate) transition: Option<MapTransition>,
}

impl TriggerScript {
    fn new(name: &str, movement_req: Option<Facing>) -> Self {
        Self {
            name: name.to_string(),
            movement_req,
            messages: Vec::new(),
            npc_spawns: Vec::new(),
            transition: None,
        }
    }

    fn with_message(mut self, text: &str) -> Self {
        self.messages.push(ScriptMessage {
            text: text.to_string(),
            duration: SCRIPT_MESSAGE_SECONDS,
        });
        self
    }

    fn with_spawn(mut self, kind: NpcKind, x: f32, y: f32) -> Self {
        self.npc_spawns.push(NpcSpawn {
            kind,
            position: Vec2::new(x, y),
        });
        self
    }

    fn with_transition(mut self, map: &str, player: Vec2, camera: Vec2) -> Self {
        self.transition = Some(MapTransition {
            map: map.to_string(),
            player_position: Some(player),
            camera_position: Some(camera),
        });
        self
    }
}

#[derive(Debug, Error)]
pub(crate) enum ScriptRegistryError {
    #[error("failed to read trigger scripts {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse trigger scripts {path} at '{json_path}': {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("trigger script '{script}' has unknown movement direction '{value}'")]
    BadDirection { script: String, value: String },
    #[error("trigger script '{script}' transitions to unknown map '{map}'")]
    UnknownMap { script: String, map: String },
    #[error("trigger script '{0}' is defined more than once")]
    Duplicate(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptFile {
    scripts: Vec<ScriptEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptEntry {
    name: String,
    #[serde(default)]
    movement_req: Option<String>,
    #[serde(default)]
    messages: Vec<MessageEntry>,
    #[serde(default)]
    npc_spawns: Vec<SpawnEntry>,
    #[serde(default)]
    transition: Option<TransitionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MessageEntry {
    text: String,
    #[serde(default = "default_message_duration")]
    duration: f32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SpawnEntry {
    kind: NpcKind,
    position: [f32; 2],
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TransitionEntry {
    map: String,
    #[serde(default)]
    player_position: Option<[f32; 2]>,
    #[serde(default)]
    camera_position: Option<[f32; 2]>,
}

fn default_message_duration() -> f32 {
    SCRIPT_MESSAGE_SECONDS
}

fn parse_direction(script: &str, value: &str) -> Result<Facing, ScriptRegistryError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "up" | "0" => Ok(Facing::Up),
        "left" | "1" => Ok(Facing::Left),
        "down" | "2" => Ok(Facing::Down),
        "right" | "3" => Ok(Facing::Right),
        _ => Err(ScriptRegistryError::BadDirection {
            script: script.to_string(),
            value: value.to_string(),
        }),
    }
}

fn to_vec2(value: [f32; 2]) -> Vec2 {
    Vec2::new(value[0], value[1])
}

/// Immutable table from trigger name to its effect. Built once at startup.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptRegistry {
    scripts: HashMap<String, TriggerScript>,
}

impl ScriptRegistry {
    pub(crate) fn from_scripts(
        scripts: impl IntoIterator<Item = TriggerScript>,
    ) -> Result<Self, ScriptRegistryError> {
        let mut table = HashMap::new();
        for script in scripts {
            if table.contains_key(&script.name) {
                return Err(ScriptRegistryError::Duplicate(script.name));
            }
            table.insert(script.name.clone(), script);
        }
        Ok(Self { scripts: table })
    }

    /// Scripts for the maps shipped with the game.
    pub(crate) fn builtin() -> Self {
        let locked = "The door won't open. It's locked.";
        let scripts = [
            TriggerScript::new("cave1", Some(Facing::Up))
                .with_message("You don't feel like going in there right now."),
            TriggerScript::new("villa1", Some(Facing::Up)).with_message(locked),
            TriggerScript::new("villa2", Some(Facing::Up)).with_message(locked),
            TriggerScript::new("house_door", Some(Facing::Up)).with_transition(
                "house.tmx",
                Vec2::new(160.0, 200.0),
                Vec2::new(-480.0, -280.0),
            ),
            TriggerScript::new("house_exit", Some(Facing::Down)).with_transition(
                "start.tmx",
                Vec2::new(528.0, 470.0),
                Vec2::new(0.0, 0.0),
            ),
            TriggerScript::new("bandits", None)
                .with_message("Bandits! They don't look friendly.")
                .with_spawn(NpcKind::Bandit, 1100.0, 900.0)
                .with_spawn(NpcKind::Bandit, 1150.0, 960.0),
        ];
        let mut table = HashMap::new();
        for script in scripts {
            table.insert(script.name.clone(), script);
        }
        Self { scripts: table }
    }

    pub(crate) fn load_file(path: &Path) -> Result<Self, ScriptRegistryError> {
        let raw = fs::read_to_string(path).map_err(|source| ScriptRegistryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_json_str(&raw, path)?;
        info!(path = %path.display(), scripts = registry.len(), "trigger_scripts_loaded");
        Ok(registry)
    }

    pub(crate) fn from_json_str(raw: &str, path: &Path) -> Result<Self, ScriptRegistryError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let file = match serde_path_to_error::deserialize::<_, ScriptFile>(&mut deserializer) {
            Ok(file) => file,
            Err(error) => {
                let json_path = error.path().to_string();
                let source = error.into_inner();
                return Err(ScriptRegistryError::Parse {
                    path: path.to_path_buf(),
                    json_path,
                    source,
                });
            }
        };

        let mut scripts = Vec::with_capacity(file.scripts.len());
        for entry in file.scripts {
            let movement_req = entry
                .movement_req
                .as_deref()
                .map(|value| parse_direction(&entry.name, value))
                .transpose()?;
            scripts.push(TriggerScript {
                movement_req,
                messages: entry
                    .messages
                    .into_iter()
                    .map(|message| ScriptMessage {
                        text: message.text,
                        duration: message.duration,
                    })
                    .collect(),
                npc_spawns: entry
                    .npc_spawns
                    .into_iter()
                    .map(|spawn| NpcSpawn {
                        kind: spawn.kind,
                        position: to_vec2(spawn.position),
                    })
                    .collect(),
                transition: entry.transition.map(|transition| MapTransition {
                    map: transition.map,
                    player_position: transition.player_position.map(to_vec2),
                    camera_position: transition.camera_position.map(to_vec2),
                }),
                name: entry.name,
            });
        }
        Self::from_scripts(scripts)
    }

    /// Fails on the first transition whose target `map_exists` rejects.
    pub(crate) fn validate_targets(
        &self,
        map_exists: impl Fn(&str) -> bool,
    ) -> Result<(), ScriptRegistryError> {
        let mut names: Vec<&String> = self.scripts.keys().collect();
        names.sort();
        for name in names {
            if let Some(transition) = self.scripts[name].transition.as_ref() {
                if !map_exists(&transition.map) {
                    return Err(ScriptRegistryError::UnknownMap {
                        script: name.clone(),
                        map: transition.map.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub(crate) fn get(&self, name: &str) -> Option<&TriggerScript> {
        self.scripts.get(name)
    }

    pub(crate) fn len(&self) -> usize {
        self.scripts.len()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn builtin_scripts_gate_doors_upward() {
        let registry = ScriptRegistry::builtin();
        for name in ["cave1", "villa1", "villa2", "house_door"] {
            let script = registry.get(name).expect("script");
            assert_eq!(script.movement_req, Some(Facing::Up), "{name}");
        }
        assert_eq!(
            registry.get("villa1").expect("villa1").messages[0].text,
            "The door won't open. It's locked."
        );
        assert_eq!(registry.get("cave1").expect("cave1").messages[0].duration, 10.0);
        assert_eq!(registry.get("bandits").expect("bandits").npc_spawns.len(), 2);
        assert!(registry.get("nowhere").is_none());
    }

    #[test]
    fn parses_json_registry() {
        let raw = r#"{
            "scripts": [
                {
                    "name": "gate",
                    "movement_req": "left",
                    "messages": [{ "text": "Halt!" }],
                    "npc_spawns": [{ "kind": "bandit", "position": [10.0, 20.0] }],
                    "transition": { "map": "house.tmx", "player_position": [1.0, 2.0] }
                },
                { "name": "sign", "messages": [{ "text": "West", "duration": 3.0 }] }
            ]
        }"#;
        let registry = ScriptRegistry::from_json_str(raw, Path::new("scripts.json")).expect("parse");

        let gate = registry.get("gate").expect("gate");
        assert_eq!(gate.movement_req, Some(Facing::Left));
        assert_eq!(gate.messages[0].duration, SCRIPT_MESSAGE_SECONDS);
        assert_eq!(gate.npc_spawns[0].position, Vec2::new(10.0, 20.0));
        let transition = gate.transition.as_ref().expect("transition");
        assert_eq!(transition.player_position, Some(Vec2::new(1.0, 2.0)));
        assert_eq!(transition.camera_position, None);

        let sign = registry.get("sign").expect("sign");
        assert_eq!(sign.movement_req, None);
        assert_eq!(sign.messages[0].duration, 3.0);
    }

    #[test]
    fn parse_errors_carry_json_path() {
        let raw = r#"{ "scripts": [ { "name": "gate", "npc_spawns": [ { "kind": "dragon", "position": [0, 0] } ] } ] }"#;
        let error = ScriptRegistry::from_json_str(raw, Path::new("scripts.json"))
            .expect_err("unknown kind");
        match error {
            ScriptRegistryError::Parse { json_path, .. } => {
                assert_eq!(json_path, "scripts[0].npc_spawns[0].kind");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_bad_direction_and_duplicates() {
        let bad = r#"{ "scripts": [ { "name": "gate", "movement_req": "sideways" } ] }"#;
        assert!(matches!(
            ScriptRegistry::from_json_str(bad, Path::new("s.json")),
            Err(ScriptRegistryError::BadDirection { .. })
        ));

        let duplicate = r#"{ "scripts": [ { "name": "a" }, { "name": "a" } ] }"#;
        assert!(matches!(
            ScriptRegistry::from_json_str(duplicate, Path::new("s.json")),
            Err(ScriptRegistryError::Duplicate(name)) if name == "a"
        ));
    }

    #[test]
    fn validates_transition_targets() {
        let registry = ScriptRegistry::builtin();
        assert!(registry
            .validate_targets(|map| map == "house.tmx" || map == "start.tmx")
            .is_ok());
        assert!(matches!(
            registry.validate_targets(|map| map == "start.tmx"),
            Err(ScriptRegistryError::UnknownMap { map, .. }) if map == "house.tmx"
        ));
    }

    #[test]
    fn loads_registry_file_from_disk() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("scripts.json");
        fs::write(&path, r#"{ "scripts": [ { "name": "cave1", "movement_req": "0" } ] }"#)
            .expect("write");

        let registry = ScriptRegistry::load_file(&path).expect("load");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("cave1").expect("cave1").movement_req, Some(Facing::Up));

        let missing = ScriptRegistry::load_file(&temp.path().join("missing.json"));
        assert!(matches!(missing, Err(ScriptRegistryError::Read { .. })));
    }

    #[test]
    fn shipped_registry_file_matches_builtin_table() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scripts/triggers.json");
        let shipped = ScriptRegistry::load_file(&path).expect("shipped scripts");
        let builtin = ScriptRegistry::builtin();
        assert_eq!(shipped.len(), builtin.len());
        for name in ["cave1", "villa1", "villa2", "house_door", "house_exit", "bandits"] {
            assert_eq!(shipped.get(name), builtin.get(name), "{name}");
        }
    }
}

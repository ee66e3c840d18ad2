use std::path::PathBuf;

use tracing::warn;

const START_MAP_ENV_VAR: &str = "WAYFARER_START_MAP";
const TRIGGER_SCRIPTS_ENV_VAR: &str = "WAYFARER_TRIGGER_SCRIPTS";
const DRAW_HITBOXES_ENV_VAR: &str = "WAYFARER_DRAW_HITBOXES";
const SEED_ENV_VAR: &str = "WAYFARER_SEED";

pub(crate) const DEFAULT_START_MAP: &str = "start.tmx";
pub(crate) const DEFAULT_SEED: u64 = 0x5eed;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GameConfig {
    pub(crate) start_map: String,
    pub(crate) trigger_scripts: Option<PathBuf>,
    pub(crate) draw_hitboxes: bool,
    pub(crate) seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_map: DEFAULT_START_MAP.to_string(),
            trigger_scripts: None,
            draw_hitboxes: false,
            seed: DEFAULT_SEED,
        }
    }
}

impl GameConfig {
    pub(crate) fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from `lookup`; malformed values are logged and
    /// replaced by their defaults.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let read = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let start_map = read(START_MAP_ENV_VAR).unwrap_or(defaults.start_map);
        let trigger_scripts = read(TRIGGER_SCRIPTS_ENV_VAR).map(PathBuf::from);
        let draw_hitboxes = read(DRAW_HITBOXES_ENV_VAR)
            .map(|raw| match parse_bool(&raw) {
                Some(value) => value,
                None => {
                    warn!(var = DRAW_HITBOXES_ENV_VAR, value = %raw, "config_value_invalid");
                    defaults.draw_hitboxes
                }
            })
            .unwrap_or(defaults.draw_hitboxes);
        let seed = read(SEED_ENV_VAR)
            .map(|raw| match raw.parse::<u64>() {
                Ok(seed) => seed,
                Err(_) => {
                    warn!(var = SEED_ENV_VAR, value = %raw, "config_value_invalid");
                    defaults.seed
                }
            })
            .unwrap_or(defaults.seed);

        Self {
            start_map,
            trigger_scripts,
            draw_hitboxes,
            seed,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

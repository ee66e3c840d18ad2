use engine::{resolve_app_paths, LoopConfig, Scene, StartupError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::GameConfig;
use super::gameplay::{self, MapCacheError, ScriptRegistry, ScriptRegistryError, TmxDirectory};

const SHIPPED_SCRIPTS_FILE: &str = "triggers.json";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Paths(#[from] StartupError),
    #[error(transparent)]
    Scripts(#[from] ScriptRegistryError),
    #[error(transparent)]
    StartMap(#[from] MapCacheError),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Wayfarer Startup ===");

    let game_config = GameConfig::from_env();
    let paths = resolve_app_paths()?;
    info!(
        root = %paths.root.display(),
        maps = %paths.maps_dir.display(),
        start_map = %game_config.start_map,
        seed = game_config.seed,
        "startup_paths"
    );

    let shipped_scripts = paths.scripts_dir.join(SHIPPED_SCRIPTS_FILE);
    let registry = match &game_config.trigger_scripts {
        Some(path) => ScriptRegistry::load_file(&paths.root.join(path))?,
        None if shipped_scripts.is_file() => ScriptRegistry::load_file(&shipped_scripts)?,
        None => {
            info!("trigger_scripts_builtin");
            ScriptRegistry::builtin()
        }
    };
    let maps_dir = paths.maps_dir.clone();
    registry.validate_targets(|map| maps_dir.join(map).is_file())?;

    let mut rng = StdRng::seed_from_u64(game_config.seed);
    let scene = gameplay::build_scene(
        Box::new(TmxDirectory::new(paths.maps_dir)),
        registry,
        &game_config.start_map,
        game_config.draw_hitboxes,
        &mut rng,
    )?;

    let config = LoopConfig::default();
    info!(
        title = %config.window_title,
        width = config.window_width,
        height = config.window_height,
        target_tps = config.target_tps,
        "loop_configured"
    );
    Ok(AppWiring { config, scene })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;

pub use app::{
    first_colliding, run_app, world_to_screen, AppError, DrawColor, DrawItem, DrawKind, DrawList,
    DrawRect, InputAction, InputSnapshot, LoopConfig, LoopMetricsSnapshot, Rect, Renderer, Scene,
    SceneCommand, ShadowDesc, SpriteCell, TextLine, Vec2, Viewport, DEGENERATE_RECT,
};
pub use content::{
    load_tmx_file, parse_tmx, LayerKind, MapErrorCode, MapLoadError, MapObject, ObjectLayer,
    SourceLocation, TileCell, TileGrid, TileLayer, TileLayerModel,
};

pub const ROOT_ENV_VAR: &str = "WAYFARER_ROOT";

const MAPS_DIR: &str = "maps";
const SCRIPTS_DIR: &str = "scripts";

/// Where the game's data lives on disk.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub maps_dir: PathBuf,
    pub scripts_dir: PathBuf,
}

impl AppPaths {
    pub fn under(root: PathBuf) -> Self {
        Self {
            maps_dir: root.join(MAPS_DIR),
            scripts_dir: root.join(SCRIPTS_DIR),
            root,
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{var} is not valid unicode: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("could not locate the running executable: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("{var} points at {path}, which has no maps/ directory")]
    InvalidEnvRoot { var: &'static str, path: PathBuf },
    #[error(
        "no game data found above {searched_from}; expected a directory with Cargo.toml \
and maps/ (or set {var})"
    )]
    RootNotFound {
        searched_from: PathBuf,
        var: &'static str,
    },
}

/// Resolves the data root from `WAYFARER_ROOT`, falling back to the nearest
/// ancestor of the executable that holds the game's maps.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let path = canonical(Path::new(&value));
            if !holds_game_data(&path) {
                return Err(StartupError::InvalidEnvRoot {
                    var: ROOT_ENV_VAR,
                    path,
                });
            }
            path
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            find_root_above(&exe)?
        }
        Err(source) => {
            return Err(StartupError::EnvVar {
                var: ROOT_ENV_VAR,
                source,
            })
        }
    };
    Ok(AppPaths::under(root))
}

fn find_root_above(start: &Path) -> Result<PathBuf, StartupError> {
    start
        .ancestors()
        .skip(1)
        .find(|dir| holds_game_data(dir))
        .map(canonical)
        .ok_or_else(|| StartupError::RootNotFound {
            searched_from: canonical(start.parent().unwrap_or(start)),
            var: ROOT_ENV_VAR,
        })
}

fn holds_game_data(dir: &Path) -> bool {
    dir.join("Cargo.toml").is_file() && dir.join(MAPS_DIR).is_dir()
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

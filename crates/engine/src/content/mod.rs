mod layers;
mod tmx;

pub use layers::{
    LayerKind, MapObject, ObjectLayer, TileCell, TileGrid, TileLayer, TileLayerModel,
};
pub use tmx::{load_tmx_file, parse_tmx, MapErrorCode, MapLoadError, SourceLocation};

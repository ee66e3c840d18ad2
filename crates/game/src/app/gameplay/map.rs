use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use engine::{
    load_tmx_file, DrawColor, DrawItem, DrawKind, DrawList, LayerKind, MapLoadError, Rect,
    TileLayer, TileLayerModel, Vec2,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::compactor::{compact_regions, TileMask};
use super::trigger::{Trigger, DEFAULT_TRIGGER_DELAY_SECONDS};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TileSprite {
    pub(crate) gid: u32,
    pub(crate) position: Vec2,
    pub(crate) color: DrawColor,
}

/// Collision and non-collision object tiles of one map row, drawn together
/// and y-sorted with characters. Non-collision tiles come last so they draw
/// above collision tiles of the same row.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ObjectRow {
    pub(crate) y: f32,
    pub(crate) tiles: Vec<TileSprite>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TriggerRegion {
    pub(crate) name: String,
    pub(crate) region: Rect,
    pub(crate) delay: f32,
    pub(crate) max_fires: u32,
}

/// Static geometry of a loaded map. Mutable per-visit state lives elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GameMap {
    tile_size: f32,
    pixel_size: Vec2,
    outdoors: bool,
    ground: Vec<TileSprite>,
    bridges: Vec<TileSprite>,
    object_rows: Vec<ObjectRow>,
    above: Vec<TileSprite>,
    colliders: Vec<Rect>,
    water: Vec<Rect>,
    triggers: Vec<TriggerRegion>,
}

impl GameMap {
    pub(crate) fn from_layers(name: &str, model: &TileLayerModel) -> Self {
        let tile_size = model.tile_width.max(1) as f32;
        let width = model.width as usize;
        let height = model.height as usize;
        let (pixel_width, pixel_height) = model.pixel_size();

        let mut ground = Vec::new();
        let mut bridges = Vec::new();
        let mut above = Vec::new();
        let mut collision_rows: BTreeMap<u32, Vec<TileSprite>> = BTreeMap::new();
        let mut decoration_rows: BTreeMap<u32, Vec<TileSprite>> = BTreeMap::new();
        let mut colliders = Vec::new();
        let mut collision_mask = TileMask::new(width, height);
        let mut water_mask = TileMask::new(width, height);
        let mut bridge_mask = TileMask::new(width, height);

        for layer in &model.tile_layers {
            debug!(
                map = name,
                layer = %layer.name,
                kind = ?layer.kind,
                tiles = layer.tiles.occupied().count(),
                "map_layer_loaded"
            );
            match layer.kind {
                LayerKind::Ground => push_sprites(&mut ground, layer, tile_size, DrawColor::Terrain),
                LayerKind::Water => {
                    push_sprites(&mut ground, layer, tile_size, DrawColor::Water);
                    mark_mask(&mut water_mask, layer);
                }
                LayerKind::Bridges => {
                    push_sprites(&mut bridges, layer, tile_size, DrawColor::Grey);
                    mark_mask(&mut bridge_mask, layer);
                }
                LayerKind::CollisionObjects => {
                    for (x, y, cell) in layer.tiles.occupied() {
                        collision_rows.entry(y).or_default().push(TileSprite {
                            gid: cell.gid,
                            position: tile_position(x, y, tile_size),
                            color: DrawColor::Grey,
                        });
                    }
                    mark_mask(&mut collision_mask, layer);
                }
                LayerKind::NonCollisionObjects => {
                    for (x, y, cell) in layer.tiles.occupied() {
                        decoration_rows.entry(y).or_default().push(TileSprite {
                            gid: cell.gid,
                            position: tile_position(x, y, tile_size),
                            color: DrawColor::Green,
                        });
                    }
                }
                LayerKind::AboveObjects => push_sprites(&mut above, layer, tile_size, DrawColor::Green),
                LayerKind::Colliders => push_collider_shapes(&mut colliders, name, layer, tile_size),
                LayerKind::Triggers | LayerKind::Unknown => {
                    warn!(map = name, layer = %layer.name, "map_layer_ignored");
                }
            }
        }

        let mut object_rows: BTreeMap<u32, Vec<TileSprite>> = collision_rows;
        for (y, tiles) in decoration_rows {
            object_rows.entry(y).or_default().extend(tiles);
        }
        let object_rows = object_rows
            .into_iter()
            .map(|(y, tiles)| ObjectRow {
                y: y as f32 * tile_size,
                tiles,
            })
            .collect();

        let shape_count = colliders.len();
        colliders.extend(
            compact_regions(&collision_mask)
                .into_iter()
                .map(|block| block.to_rect(tile_size, 0.0, 0.0)),
        );
        let water: Vec<Rect> = compact_regions(&water_mask.minus(&bridge_mask))
            .into_iter()
            .map(|block| block.to_rect(tile_size, 0.0, 0.0))
            .collect();
        info!(
            map = name,
            collision_tiles = collision_mask.count(),
            collider_shapes = shape_count,
            collision_rects = colliders.len() - shape_count,
            water_rects = water.len(),
            "regions_compacted"
        );

        let triggers = model
            .object_layers
            .iter()
            .filter(|layer| layer.kind == LayerKind::Triggers)
            .flat_map(|layer| layer.objects.iter())
            .map(|object| TriggerRegion {
                name: object.name.clone(),
                region: Rect::new(object.x, object.y, object.width, object.height),
                delay: object
                    .property_f32("delay")
                    .unwrap_or(DEFAULT_TRIGGER_DELAY_SECONDS),
                max_fires: object.property_u32("max_num_triggers").unwrap_or(0),
            })
            .collect();

        Self {
            tile_size,
            pixel_size: Vec2::new(pixel_width as f32, pixel_height as f32),
            outdoors: model.outdoors(),
            ground,
            bridges,
            object_rows,
            above,
            colliders,
            water,
            triggers,
        }
    }

    pub(crate) fn pixel_size(&self) -> Vec2 {
        self.pixel_size
    }

    pub(crate) fn outdoors(&self) -> bool {
        self.outdoors
    }

    pub(crate) fn colliders(&self) -> &[Rect] {
        &self.colliders
    }

    pub(crate) fn water(&self) -> &[Rect] {
        &self.water
    }

    #[cfg(test)]
    pub(crate) fn object_rows(&self) -> &[ObjectRow] {
        &self.object_rows
    }

    #[cfg(test)]
    pub(crate) fn trigger_regions(&self) -> &[TriggerRegion] {
        &self.triggers
    }

    pub(crate) fn instantiate_triggers(&self, now: f32) -> Vec<Trigger> {
        self.triggers
            .iter()
            .map(|region| {
                Trigger::new(
                    region.name.clone(),
                    region.region,
                    region.delay,
                    region.max_fires,
                    now,
                )
            })
            .collect()
    }

    pub(crate) fn push_draw_items(&self, frame: &mut DrawList) {
        let size = Vec2::new(self.tile_size, self.tile_size);
        let tile_item = |kind: DrawKind, sprite: &TileSprite, y_sort: f32| DrawItem {
            kind,
            sprite: format!("tile/{}", sprite.gid),
            position: sprite.position,
            size,
            cell: None,
            y_sort,
            y_shift: 0.0,
            shadow: None,
            color: sprite.color,
        };

        for sprite in &self.ground {
            frame.push_item(tile_item(DrawKind::Ground, sprite, sprite.position.y));
        }
        for sprite in &self.bridges {
            frame.push_item(tile_item(DrawKind::Bridge, sprite, sprite.position.y));
        }
        for row in &self.object_rows {
            let y_sort = row.y + self.tile_size;
            for sprite in &row.tiles {
                frame.push_item(tile_item(DrawKind::Sorted, sprite, y_sort));
            }
        }
        for sprite in &self.above {
            frame.push_item(tile_item(DrawKind::Above, sprite, sprite.position.y));
        }
    }
}

fn tile_position(x: u32, y: u32, tile_size: f32) -> Vec2 {
    Vec2::new(x as f32 * tile_size, y as f32 * tile_size)
}

fn push_sprites(out: &mut Vec<TileSprite>, layer: &TileLayer, tile_size: f32, color: DrawColor) {
    for (x, y, cell) in layer.tiles.occupied() {
        let position = tile_position(x, y, tile_size);
        out.push(TileSprite {
            gid: cell.gid,
            position: Vec2::new(position.x + layer.offset_x, position.y + layer.offset_y),
            color,
        });
    }
}

fn mark_mask(mask: &mut TileMask, layer: &TileLayer) {
    for (x, y, _) in layer.tiles.occupied() {
        mask.set(x as usize, y as usize, true);
    }
}

fn push_collider_shapes(out: &mut Vec<Rect>, map: &str, layer: &TileLayer, tile_size: f32) {
    for (x, y, cell) in layer.tiles.occupied() {
        let Some(shape) = cell.tile_type.as_deref() else {
            continue;
        };
        let origin_x = x as f32 * tile_size + layer.offset_x;
        let origin_y = y as f32 * tile_size + layer.offset_y;
        match collider_shape(shape) {
            Some(parts) => out.extend(
                parts
                    .iter()
                    .map(|part| part.translated(origin_x, origin_y)),
            ),
            None => warn!(map, shape, x, y, "unknown_collider_shape"),
        }
    }
}

/// Rectangles approximating a collider shape inside a 32x32 cell.
pub(crate) fn collider_shape(shape: &str) -> Option<&'static [Rect]> {
    const TOP: [Rect; 1] = [Rect::new(0.0, 0.0, 32.0, 4.0)];
    const LEFT: [Rect; 1] = [Rect::new(0.0, 0.0, 4.0, 32.0)];
    const BOTTOM: [Rect; 1] = [Rect::new(0.0, 28.0, 32.0, 4.0)];
    const RIGHT: [Rect; 1] = [Rect::new(28.0, 0.0, 4.0, 32.0)];
    const TLRM: [Rect; 2] = [
        Rect::new(0.0, 0.0, 16.0, 8.0),
        Rect::new(16.0, 8.0, 16.0, 8.0),
    ];
    const LMRB: [Rect; 3] = [
        Rect::new(0.0, 12.0, 8.0, 8.0),
        Rect::new(8.0, 16.0, 12.0, 8.0),
        Rect::new(20.0, 24.0, 12.0, 8.0),
    ];
    const LMRT: [Rect; 2] = [
        Rect::new(0.0, 8.0, 12.0, 8.0),
        Rect::new(12.0, 0.0, 20.0, 8.0),
    ];
    const LBRM: [Rect; 3] = [
        Rect::new(0.0, 24.0, 8.0, 8.0),
        Rect::new(8.0, 20.0, 12.0, 8.0),
        Rect::new(20.0, 12.0, 12.0, 8.0),
    ];
    const LTRB: [Rect; 3] = [
        Rect::new(0.0, 0.0, 16.0, 8.0),
        Rect::new(12.0, 8.0, 8.0, 8.0),
        Rect::new(20.0, 16.0, 12.0, 12.0),
    ];
    const LB: [Rect; 1] = [Rect::new(0.0, 24.0, 8.0, 8.0)];
    const LBRT: [Rect; 3] = [
        Rect::new(0.0, 20.0, 8.0, 12.0),
        Rect::new(8.0, 12.0, 12.0, 8.0),
        Rect::new(16.0, 0.0, 16.0, 12.0),
    ];
    const RB: [Rect; 1] = [Rect::new(24.0, 24.0, 8.0, 8.0)];

    let parts: &'static [Rect] = match shape {
        "Top" => &TOP,
        "Left" => &LEFT,
        "Bottom" => &BOTTOM,
        "Right" => &RIGHT,
        "TLRM" => &TLRM,
        "LMRB" => &LMRB,
        "LMRT" => &LMRT,
        "LBRM" => &LBRM,
        "LTRB" => &LTRB,
        "LB" => &LB,
        "LBRT" => &LBRT,
        "RB" => &RB,
        _ => return None,
    };
    Some(parts)
}

/// Where map layer models come from.
pub(crate) trait MapSource {
    fn load(&self, name: &str) -> Result<TileLayerModel, MapLoadError>;
}

/// TMX files in one directory, addressed by file name.
#[derive(Debug, Clone)]
pub(crate) struct TmxDirectory {
    dir: PathBuf,
}

impl TmxDirectory {
    pub(crate) fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl MapSource for TmxDirectory {
    fn load(&self, name: &str) -> Result<TileLayerModel, MapLoadError> {
        load_tmx_file(&self.dir.join(name))
    }
}

#[derive(Debug, Error)]
pub(crate) enum MapCacheError {
    #[error("failed to load map '{name}': {source}")]
    Load {
        name: String,
        #[source]
        source: MapLoadError,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct CachedMap {
    pub(crate) map: GameMap,
    pub(crate) triggers: Vec<Trigger>,
}

/// Maps loaded so far, keyed by file name. Trigger state stays with the
/// cached map across visits.
pub(crate) struct MapCache {
    source: Box<dyn MapSource>,
    maps: HashMap<String, CachedMap>,
}

impl MapCache {
    pub(crate) fn new(source: Box<dyn MapSource>) -> Self {
        Self {
            source,
            maps: HashMap::new(),
        }
    }

    pub(crate) fn ensure_loaded(&mut self, name: &str, now: f32) -> Result<(), MapCacheError> {
        if self.maps.contains_key(name) {
            debug!(map = name, "map_cache_hit");
            return Ok(());
        }
        let model = self.source.load(name).map_err(|source| MapCacheError::Load {
            name: name.to_string(),
            source,
        })?;
        let map = GameMap::from_layers(name, &model);
        let triggers = map.instantiate_triggers(now);
        info!(
            map = name,
            outdoors = map.outdoors(),
            triggers = triggers.len(),
            "map_loaded"
        );
        self.maps
            .insert(name.to_string(), CachedMap { map, triggers });
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn is_cached(&self, name: &str) -> bool {
        self.maps.contains_key(name)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&CachedMap> {
        self.maps.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut CachedMap> {
        self.maps.get_mut(name)
    }
}

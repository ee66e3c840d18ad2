use std::collections::BTreeMap;

/// Role of a map layer, derived from a case-insensitive substring of its
/// name so that "Ground 2" or "House C-Objects" classify as expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Ground,
    Water,
    CollisionObjects,
    NonCollisionObjects,
    AboveObjects,
    Bridges,
    Colliders,
    Triggers,
    Unknown,
}

impl LayerKind {
    pub fn classify(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.contains("c-objects") {
            LayerKind::CollisionObjects
        } else if lower.contains("m-objects") {
            LayerKind::NonCollisionObjects
        } else if lower.contains("n-objects") {
            LayerKind::AboveObjects
        } else if lower.contains("bridges") {
            LayerKind::Bridges
        } else if lower.contains("colliders") {
            LayerKind::Colliders
        } else if lower.contains("triggers") {
            LayerKind::Triggers
        } else if lower.contains("water") {
            LayerKind::Water
        } else if lower.contains("ground") {
            LayerKind::Ground
        } else {
            LayerKind::Unknown
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileCell {
    pub gid: u32,
    /// The tileset "type" of this tile, if any (collider shape names live here).
    pub tile_type: Option<String>,
}

/// Row-major grid of optional tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    width: u32,
    height: u32,
    cells: Vec<Option<TileCell>>,
}

impl TileGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<&TileCell> {
        self.index_of(x, y)
            .and_then(|index| self.cells.get(index))
            .and_then(Option::as_ref)
    }

    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.get(x, y).is_some()
    }

    pub fn set(&mut self, x: u32, y: u32, cell: Option<TileCell>) {
        if let Some(index) = self.index_of(x, y) {
            self.cells[index] = cell;
        }
    }

    /// Occupied cells as `(x, y, cell)` in row-major order.
    pub fn occupied(&self) -> impl Iterator<Item = (u32, u32, &TileCell)> + '_ {
        let width = self.width.max(1);
        self.cells.iter().enumerate().filter_map(move |(index, cell)| {
            cell.as_ref()
                .map(|cell| (index as u32 % width, index as u32 / width, cell))
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub name: String,
    pub kind: LayerKind,
    pub offset_x: f32,
    pub offset_y: f32,
    pub tiles: TileGrid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapObject {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub properties: BTreeMap<String, String>,
}

impl MapObject {
    pub fn property_f32(&self, name: &str) -> Option<f32> {
        self.properties.get(name)?.trim().parse().ok()
    }

    pub fn property_u32(&self, name: &str) -> Option<u32> {
        self.properties.get(name)?.trim().parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectLayer {
    pub name: String,
    pub kind: LayerKind,
    pub objects: Vec<MapObject>,
}

/// Format-neutral description of a tile map: what the loader needs, nothing
/// about how tiles look.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayerModel {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub properties: BTreeMap<String, String>,
    pub tile_layers: Vec<TileLayer>,
    pub object_layers: Vec<ObjectLayer>,
}

impl TileLayerModel {
    pub fn new(width: u32, height: u32, tile_width: u32, tile_height: u32) -> Self {
        Self {
            width,
            height,
            tile_width,
            tile_height,
            properties: BTreeMap::new(),
            tile_layers: Vec::new(),
            object_layers: Vec::new(),
        }
    }

    pub fn outdoors(&self) -> bool {
        self.properties
            .get("outdoors")
            .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false)
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width.saturating_mul(self.tile_width),
            self.height.saturating_mul(self.tile_height),
        )
    }
}

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::debug;

use super::layers::{
    LayerKind, MapObject, ObjectLayer, TileCell, TileGrid, TileLayer, TileLayerModel,
};

const GID_FLIP_MASK: u32 = 0x1FFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    MissingAttribute,
    InvalidValue,
    UnsupportedEncoding,
    DataSizeMismatch,
}

#[derive(Debug, Clone)]
pub struct MapLoadError {
    pub code: MapErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for MapLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for MapLoadError {}

pub fn load_tmx_file(path: &Path) -> Result<TileLayerModel, MapLoadError> {
    let raw = fs::read_to_string(path).map_err(|error| read_error(path, &error))?;
    parse_tmx(&raw, path)
}

/// Parses the Tiled TMX subset used by the game's maps. `file_path` is used
/// for error reports and to resolve external tilesets.
pub fn parse_tmx(raw: &str, file_path: &Path) -> Result<TileLayerModel, MapLoadError> {
    let doc = parse_document(raw, file_path)?;
    let root = doc.root_element();
    if !root.has_tag_name("map") {
        return Err(error_at_node(
            MapErrorCode::InvalidRoot,
            format!("expected <map> root, found <{}>", root.tag_name().name()),
            file_path,
            &doc,
            root,
        ));
    }

    let width = required_u32(file_path, &doc, root, "width")?;
    let height = required_u32(file_path, &doc, root, "height")?;
    let tile_width = required_u32(file_path, &doc, root, "tilewidth")?;
    let tile_height = required_u32(file_path, &doc, root, "tileheight")?;
    let mut model = TileLayerModel::new(width, height, tile_width, tile_height);
    let mut tile_types = HashMap::<u32, String>::new();

    for child in root.children().filter(|child| child.is_element()) {
        match child.tag_name().name() {
            "properties" => model.properties = parse_properties(child),
            "tileset" => collect_tileset_types(file_path, &doc, child, &mut tile_types)?,
            "layer" => {
                let layer = parse_tile_layer(file_path, &doc, child, width, height, &tile_types)?;
                debug!(layer = %layer.name, kind = ?layer.kind, "tmx_tile_layer_parsed");
                model.tile_layers.push(layer);
            }
            "objectgroup" => {
                let layer = parse_object_layer(file_path, &doc, child)?;
                debug!(layer = %layer.name, objects = layer.objects.len(), "tmx_object_layer_parsed");
                model.object_layers.push(layer);
            }
            _ => {}
        }
    }

    Ok(model)
}

fn parse_document<'a>(raw: &'a str, file_path: &Path) -> Result<Document<'a>, MapLoadError> {
    Document::parse(raw).map_err(|error| MapLoadError {
        code: MapErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })
}

fn collect_tileset_types(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    tile_types: &mut HashMap<u32, String>,
) -> Result<(), MapLoadError> {
    let first_gid = required_u32(file_path, doc, node, "firstgid")?;
    match node.attribute("source") {
        Some(source) => {
            let tileset_path = file_path
                .parent()
                .map(|dir| dir.join(source))
                .unwrap_or_else(|| PathBuf::from(source));
            let raw = fs::read_to_string(&tileset_path)
                .map_err(|error| read_error(&tileset_path, &error))?;
            let tileset_doc = parse_document(&raw, &tileset_path)?;
            let tileset_root = tileset_doc.root_element();
            if !tileset_root.has_tag_name("tileset") {
                return Err(error_at_node(
                    MapErrorCode::InvalidRoot,
                    format!(
                        "expected <tileset> root, found <{}>",
                        tileset_root.tag_name().name()
                    ),
                    &tileset_path,
                    &tileset_doc,
                    tileset_root,
                ));
            }
            insert_tile_types(&tileset_path, &tileset_doc, tileset_root, first_gid, tile_types)
        }
        None => insert_tile_types(file_path, doc, node, first_gid, tile_types),
    }
}

fn insert_tile_types(
    file_path: &Path,
    doc: &Document<'_>,
    tileset: Node<'_, '_>,
    first_gid: u32,
    tile_types: &mut HashMap<u32, String>,
) -> Result<(), MapLoadError> {
    for tile in tileset.children().filter(|child| child.has_tag_name("tile")) {
        let id = required_u32(file_path, doc, tile, "id")?;
        let from_properties = tile
            .children()
            .find(|child| child.has_tag_name("properties"))
            .and_then(|properties| parse_properties(properties).remove("type"));
        let tile_type = from_properties
            .or_else(|| tile.attribute("type").map(str::to_string))
            .or_else(|| tile.attribute("class").map(str::to_string));
        if let Some(tile_type) = tile_type {
            tile_types.insert(first_gid.saturating_add(id), tile_type);
        }
    }
    Ok(())
}

fn parse_tile_layer(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    width: u32,
    height: u32,
    tile_types: &HashMap<u32, String>,
) -> Result<TileLayer, MapLoadError> {
    let name = node.attribute("name").unwrap_or_default().to_string();
    let offset_x = optional_f32(file_path, doc, node, "offsetx")?.unwrap_or(0.0);
    let offset_y = optional_f32(file_path, doc, node, "offsety")?.unwrap_or(0.0);
    let data = node
        .children()
        .find(|child| child.has_tag_name("data"))
        .ok_or_else(|| {
            error_at_node(
                MapErrorCode::MissingAttribute,
                format!("layer '{name}' has no <data> element"),
                file_path,
                doc,
                node,
            )
        })?;

    let gids = match data.attribute("encoding") {
        Some("csv") => parse_csv_gids(file_path, doc, data)?,
        None => data
            .children()
            .filter(|child| child.has_tag_name("tile"))
            .map(|tile| optional_u32(file_path, doc, tile, "gid").map(Option::unwrap_or_default))
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(error_at_node(
                MapErrorCode::UnsupportedEncoding,
                format!("layer '{name}' uses unsupported encoding '{other}'; export as CSV"),
                file_path,
                doc,
                data,
            ))
        }
    };

    let expected = width as usize * height as usize;
    if gids.len() != expected {
        return Err(error_at_node(
            MapErrorCode::DataSizeMismatch,
            format!(
                "layer '{name}' has {} tiles, expected {expected}",
                gids.len()
            ),
            file_path,
            doc,
            data,
        ));
    }

    let mut tiles = TileGrid::new(width, height);
    for (index, raw_gid) in gids.into_iter().enumerate() {
        let gid = raw_gid & GID_FLIP_MASK;
        if gid == 0 {
            continue;
        }
        let x = (index % width as usize) as u32;
        let y = (index / width as usize) as u32;
        tiles.set(
            x,
            y,
            Some(TileCell {
                gid,
                tile_type: tile_types.get(&gid).cloned(),
            }),
        );
    }

    Ok(TileLayer {
        kind: LayerKind::classify(&name),
        name,
        offset_x,
        offset_y,
        tiles,
    })
}

fn parse_csv_gids(
    file_path: &Path,
    doc: &Document<'_>,
    data: Node<'_, '_>,
) -> Result<Vec<u32>, MapLoadError> {
    data.text()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry.parse::<u32>().map_err(|_| {
                error_at_node(
                    MapErrorCode::InvalidValue,
                    format!("invalid tile gid '{entry}' in CSV data"),
                    file_path,
                    doc,
                    data,
                )
            })
        })
        .collect()
}

fn parse_object_layer(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<ObjectLayer, MapLoadError> {
    let name = node.attribute("name").unwrap_or_default().to_string();
    let mut objects = Vec::new();
    for object in node.children().filter(|child| child.has_tag_name("object")) {
        let properties = object
            .children()
            .find(|child| child.has_tag_name("properties"))
            .map(parse_properties)
            .unwrap_or_default();
        objects.push(MapObject {
            name: object.attribute("name").unwrap_or_default().to_string(),
            x: optional_f32(file_path, doc, object, "x")?.unwrap_or(0.0),
            y: optional_f32(file_path, doc, object, "y")?.unwrap_or(0.0),
            width: optional_f32(file_path, doc, object, "width")?.unwrap_or(0.0),
            height: optional_f32(file_path, doc, object, "height")?.unwrap_or(0.0),
            properties,
        });
    }
    Ok(ObjectLayer {
        kind: LayerKind::classify(&name),
        name,
        objects,
    })
}

fn parse_properties(node: Node<'_, '_>) -> BTreeMap<String, String> {
    node.children()
        .filter(|child| child.has_tag_name("property"))
        .filter_map(|property| {
            let name = property.attribute("name")?;
            let value = property
                .attribute("value")
                .or_else(|| property.text())
                .unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

fn required_u32(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    attribute: &str,
) -> Result<u32, MapLoadError> {
    optional_u32(file_path, doc, node, attribute)?.ok_or_else(|| {
        error_at_node(
            MapErrorCode::MissingAttribute,
            format!(
                "<{}> is missing required attribute '{attribute}'",
                node.tag_name().name()
            ),
            file_path,
            doc,
            node,
        )
    })
}

fn optional_u32(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    attribute: &str,
) -> Result<Option<u32>, MapLoadError> {
    node.attribute(attribute)
        .map(|raw| {
            raw.trim().parse::<u32>().map_err(|_| {
                invalid_attribute(file_path, doc, node, attribute, raw, "a non-negative integer")
            })
        })
        .transpose()
}

fn optional_f32(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    attribute: &str,
) -> Result<Option<f32>, MapLoadError> {
    node.attribute(attribute)
        .map(|raw| match raw.trim().parse::<f32>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(invalid_attribute(file_path, doc, node, attribute, raw, "a finite number")),
        })
        .transpose()
}

fn invalid_attribute(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    attribute: &str,
    raw: &str,
    expected: &str,
) -> MapLoadError {
    error_at_node(
        MapErrorCode::InvalidValue,
        format!(
            "<{}> attribute '{attribute}' must be {expected}, got '{raw}'",
            node.tag_name().name()
        ),
        file_path,
        doc,
        node,
    )
}

fn read_error(path: &Path, error: &std::io::Error) -> MapLoadError {
    MapLoadError {
        code: MapErrorCode::ReadFile,
        message: format!("failed to read file: {error}"),
        file_path: path.to_path_buf(),
        location: None,
    }
}

fn error_at_node(
    code: MapErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> MapLoadError {
    let pos = doc.text_pos_at(node.range().start);
    MapLoadError {
        code,
        message,
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}

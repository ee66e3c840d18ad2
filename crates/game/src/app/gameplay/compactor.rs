use engine::Rect;

/// Row-major boolean tile mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TileMask {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl TileMask {
    pub(crate) fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width * height],
        }
    }

    pub(crate) fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.cells[y * self.width + x]
    }

    pub(crate) fn set(&mut self, x: usize, y: usize, value: bool) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = value;
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.cells.iter().filter(|cell| **cell).count()
    }

    /// Cells set here and not in `other`.
    pub(crate) fn minus(&self, other: &TileMask) -> TileMask {
        let mut result = self.clone();
        for y in 0..self.height {
            for x in 0..self.width {
                if other.get(x, y) {
                    result.set(x, y, false);
                }
            }
        }
        result
    }
}

/// A compacted block in tile units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TileBlock {
    pub(crate) x: usize,
    pub(crate) y: usize,
    pub(crate) width: usize,
    pub(crate) height: usize,
}

impl TileBlock {
    pub(crate) fn to_rect(self, tile_size: f32, offset_x: f32, offset_y: f32) -> Rect {
        Rect::new(
            self.x as f32 * tile_size + offset_x,
            self.y as f32 * tile_size + offset_y,
            self.width as f32 * tile_size,
            self.height as f32 * tile_size,
        )
    }
}

/// Greedy exact cover of the set cells with non-overlapping blocks.
///
/// Scans row-major; from each uncovered set cell it grows a block one column
/// then one row at a time, each only while the new strip is fully set,
/// uncovered and in bounds, until neither direction grows.
pub(crate) fn compact_regions(mask: &TileMask) -> Vec<TileBlock> {
    let mut covered = TileMask::new(mask.width, mask.height);
    let mut blocks = Vec::new();
    let free = |covered: &TileMask, x: usize, y: usize| mask.get(x, y) && !covered.get(x, y);

    for y in 0..mask.height {
        for x in 0..mask.width {
            if !free(&covered, x, y) {
                continue;
            }
            let mut width = 1;
            let mut height = 1;
            loop {
                let grow_x = x + width < mask.width
                    && (y..y + height).all(|row| free(&covered, x + width, row));
                if grow_x {
                    width += 1;
                }
                let grow_y = y + height < mask.height
                    && (x..x + width).all(|column| free(&covered, column, y + height));
                if grow_y {
                    height += 1;
                }
                if !grow_x && !grow_y {
                    break;
                }
            }

            for row in y..y + height {
                for column in x..x + width {
                    covered.set(column, row, true);
                }
            }
            blocks.push(TileBlock {
                x,
                y,
                width,
                height,
            });
        }
    }
    blocks
}

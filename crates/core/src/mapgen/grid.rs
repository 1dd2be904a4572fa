//! Logical cell grid: zone bands stacked top to bottom with connector rows between them.

use std::collections::BTreeMap;

use crate::catalog::ZoneDef;
use crate::types::{Pos, ZoneId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub pos: Pos,
    /// `None` marks a connector cell.
    pub zone: Option<ZoneId>,
    pub occupied: bool,
    pub is_connector: bool,
}

/// The block of rows owned by one zone, plus the connector row that follows it if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZoneBand {
    pub zone: ZoneId,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    /// Row-major cell list.
    pub cells: Vec<Pos>,
    pub connector_row: Option<i32>,
}

impl ZoneBand {
    pub fn contains(&self, pos: Pos) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= self.top && pos.y < self.top + self.height
    }

    pub fn bottom_row(&self) -> i32 {
        self.top + self.height - 1
    }

    /// Converts a zone-relative cell into grid coordinates.
    pub fn to_grid(&self, x: u32, y: u32) -> Pos {
        Pos { y: self.top + y as i32, x: x as i32 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridIndex {
    cells: BTreeMap<Pos, Cell>,
    bands: Vec<ZoneBand>,
}

impl GridIndex {
    /// Lookup of a coordinate that was never allocated returns `None`.
    pub fn cell(&self, pos: Pos) -> Option<&Cell> {
        self.cells.get(&pos)
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    pub fn bands(&self) -> &[ZoneBand] {
        &self.bands
    }

    pub fn band(&self, zone: ZoneId) -> Option<&ZoneBand> {
        self.bands.iter().find(|band| band.zone == zone)
    }

    pub fn connector_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values().filter(|cell| cell.is_connector)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of rows including connector rows.
    pub fn height(&self) -> i32 {
        self.cells.keys().next_back().map_or(0, |pos| pos.y + 1)
    }

    pub fn width(&self) -> i32 {
        self.bands.iter().map(|band| band.width).max().unwrap_or(0)
    }

    /// Sets `occupied` on zone cells; connector cells are left untouched.
    pub fn mark_occupied(&mut self, positions: impl IntoIterator<Item = Pos>) {
        for pos in positions {
            if let Some(cell) = self.cells.get_mut(&pos)
                && !cell.is_connector
            {
                cell.occupied = true;
            }
        }
    }
}

/// Lays the zones out top to bottom. Zone sizes are expected to come from a validated
/// [`Catalog`](crate::catalog::Catalog), which keeps every coordinate inside `i32`.
pub fn build_grid(zones: &[ZoneDef]) -> GridIndex {
    let mut cells = BTreeMap::new();
    let mut bands = Vec::with_capacity(zones.len());
    let mut current_y = 0_i32;

    for zone in zones {
        let width = zone.width as i32;
        let height = zone.height as i32;
        let mut zone_cells = Vec::with_capacity(zone.cell_count());
        for y in current_y..current_y + height {
            for x in 0..width {
                let pos = Pos { y, x };
                cells.insert(
                    pos,
                    Cell { pos, zone: Some(zone.id), occupied: false, is_connector: false },
                );
                zone_cells.push(pos);
            }
        }
        let top = current_y;
        current_y += height;

        let connector_row = zone.connects_onward().then(|| {
            let row = current_y;
            for x in 0..width {
                let pos = Pos { y: row, x };
                cells.insert(pos, Cell { pos, zone: None, occupied: false, is_connector: true });
            }
            current_y += 1;
            row
        });

        bands.push(ZoneBand {
            zone: zone.id,
            top,
            width,
            height,
            cells: zone_cells,
            connector_row,
        });
    }

    GridIndex { cells, bands }
}

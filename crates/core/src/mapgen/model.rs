//! Public data model for a finished placement.

use std::collections::BTreeMap;

use serde::Serialize;
use xxhash_rust::xxh3::xxh3_64;

use super::grid::GridIndex;
use crate::types::{AssetId, Entrances, Pos, RoomId, Rotation, ZoneId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlacedRoom {
    pub room: RoomId,
    pub zone: ZoneId,
    pub base: Pos,
    pub rotation: Rotation,
    /// Base cell first, then extension cells of a large room.
    pub footprint: Vec<Pos>,
}

/// Which placed room covers a cell and the sides that cell opens on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellOccupant {
    pub room: usize,
    pub entrances: Entrances,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeTarget {
    Zone(ZoneId),
    Surface,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConnectorBridge {
    pub pos: Pos,
    pub upper: ZoneId,
    pub lower: BridgeTarget,
    /// Door content when this cell is a doorway.
    pub door: Option<AssetId>,
}

impl ConnectorBridge {
    pub fn is_doorway(&self) -> bool {
        self.door.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Placement {
    rooms: Vec<PlacedRoom>,
    #[serde(skip)]
    cells: BTreeMap<Pos, CellOccupant>,
    connectors: Vec<ConnectorBridge>,
    start: Pos,
}

impl Placement {
    pub(super) fn new(
        rooms: Vec<PlacedRoom>,
        cells: BTreeMap<Pos, CellOccupant>,
        connectors: Vec<ConnectorBridge>,
        start: Pos,
    ) -> Self {
        Self { rooms, cells, connectors, start }
    }

    /// Rooms in placement order (zone by zone, row-major by base cell).
    pub fn rooms(&self) -> &[PlacedRoom] {
        &self.rooms
    }

    pub fn room_at(&self, pos: Pos) -> Option<&PlacedRoom> {
        self.cells.get(&pos).map(|occupant| &self.rooms[occupant.room])
    }

    pub fn occupant(&self, pos: Pos) -> Option<CellOccupant> {
        self.cells.get(&pos).copied()
    }

    pub fn occupied_cells(&self) -> impl Iterator<Item = (Pos, CellOccupant)> + '_ {
        self.cells.iter().map(|(&pos, &occupant)| (pos, occupant))
    }

    pub fn connectors(&self) -> &[ConnectorBridge] {
        &self.connectors
    }

    pub fn connector(&self, pos: Pos) -> Option<&ConnectorBridge> {
        self.connectors.iter().find(|bridge| bridge.pos == pos)
    }

    pub fn doorways(&self) -> impl Iterator<Item = &ConnectorBridge> {
        self.connectors.iter().filter(|bridge| bridge.is_doorway())
    }

    pub fn rooms_in_zone(&self, zone: ZoneId) -> impl Iterator<Item = &PlacedRoom> {
        self.rooms.iter().filter(move |room| room.zone == zone)
    }

    pub fn start(&self) -> Pos {
        self.start
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend(self.start.y.to_le_bytes());
        bytes.extend(self.start.x.to_le_bytes());

        bytes.extend((self.rooms.len() as u32).to_le_bytes());
        for room in &self.rooms {
            bytes.extend((room.room.as_str().len() as u32).to_le_bytes());
            bytes.extend(room.room.as_str().as_bytes());
            bytes.extend(room.zone.0.to_le_bytes());
            bytes.push(room.rotation.quarter_turns() as u8);
            bytes.extend((room.footprint.len() as u32).to_le_bytes());
            for pos in &room.footprint {
                bytes.extend(pos.y.to_le_bytes());
                bytes.extend(pos.x.to_le_bytes());
            }
        }

        for (pos, occupant) in &self.cells {
            bytes.extend(pos.y.to_le_bytes());
            bytes.extend(pos.x.to_le_bytes());
            bytes.push(occupant.entrances.bits());
        }

        bytes.extend((self.connectors.len() as u32).to_le_bytes());
        for bridge in &self.connectors {
            bytes.extend(bridge.pos.y.to_le_bytes());
            bytes.extend(bridge.pos.x.to_le_bytes());
            match &bridge.door {
                Some(door) => {
                    bytes.push(1);
                    bytes.extend(door.as_str().as_bytes());
                    bytes.push(0);
                }
                None => bytes.push(0),
            }
        }

        bytes
    }

    /// Stable 64-bit digest of [`Placement::canonical_bytes`].
    pub fn fingerprint(&self) -> u64 {
        xxh3_64(&self.canonical_bytes())
    }

    /// One character per grid cell: box-drawing glyphs for rooms, `=` for connector
    /// walls, `D` for doorways, `.` for empty cells.
    pub fn render_ascii(&self, grid: &GridIndex) -> String {
        let width = grid.width();
        let mut out = String::new();
        for y in 0..grid.height() {
            for x in 0..width {
                let pos = Pos { y, x };
                let glyph = match (grid.cell(pos), self.cells.get(&pos)) {
                    (None, _) => ' ',
                    (Some(_), Some(occupant)) => entrance_glyph(occupant.entrances),
                    (Some(cell), None) if cell.is_connector => {
                        if self.connector(pos).is_some_and(ConnectorBridge::is_doorway) {
                            'D'
                        } else {
                            '='
                        }
                    }
                    (Some(_), None) => '.',
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}

fn entrance_glyph(entrances: Entrances) -> char {
    const GLYPHS: [char; 16] = [
        '·', '╵', '╶', '└', '╷', '│', '┌', '├', '╴', '┘', '─', '┴', '┐', '┤', '┬', '┼',
    ];
    GLYPHS[entrances.bits() as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    #[test]
    fn glyphs_follow_entrance_bits() {
        assert_eq!(entrance_glyph(Entrances::NONE), '·');
        assert_eq!(
            entrance_glyph(Entrances::from_directions(&[Direction::North, Direction::South])),
            '│'
        );
        assert_eq!(
            entrance_glyph(Entrances::from_directions(&[Direction::East, Direction::South])),
            '┌'
        );
        assert_eq!(
            entrance_glyph(Entrances::from_directions(&[
                Direction::North,
                Direction::East,
                Direction::South,
                Direction::West
            ])),
            '┼'
        );
    }
}

//! Structural checks over a finished placement, shared by tests and the fuzz sweep.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use super::grid::GridIndex;
use super::model::Placement;
use super::solver::first_unreachable;
use crate::catalog::Catalog;
use crate::types::{Direction, Pos, RoomId, ZoneId};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Violation {
    #[error("zone cell {cell} holds no room")]
    Uncovered { cell: Pos },
    #[error("cell {cell} is covered by {count} rooms")]
    Overlap { cell: Pos, count: usize },
    #[error("room covers {cell}, which is not a zone cell")]
    OutsideZone { cell: Pos },
    #[error("{cell} and its {side:?} neighbor disagree about their shared side")]
    EntranceMismatch { cell: Pos, side: Direction },
    #[error("{cell} opens {side:?} onto nothing")]
    OpensOutward { cell: Pos, side: Direction },
    #[error("{cell} does not open onto the doorway to its {side:?}")]
    ClosedDoorway { cell: Pos, side: Direction },
    #[error("{zone}: required room `{room}` placed {count} times")]
    RequiredCount { zone: ZoneId, room: RoomId, count: usize },
    #[error("room at {base} has {found} cells, expected {expected}")]
    Footprint { base: Pos, found: usize, expected: usize },
    #[error("{zone}: {found} doorways, expected {expected}")]
    DoorwayCount { zone: ZoneId, found: usize, expected: usize },
    #[error("cell {cell} is unreachable from the start")]
    Unreachable { cell: Pos },
}

/// Every violated invariant of `placement`, in a stable order. Empty means sound.
pub fn audit_placement(
    catalog: &Catalog,
    grid: &GridIndex,
    placement: &Placement,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    check_coverage(grid, placement, &mut violations);
    check_entrances(grid, placement, &mut violations);
    check_rooms(catalog, placement, &mut violations);
    check_doorways(catalog, placement, &mut violations);

    let cells: BTreeMap<_, _> = placement.occupied_cells().collect();
    if let Some(cell) = first_unreachable(&cells, placement.connectors(), placement.start()) {
        violations.push(Violation::Unreachable { cell });
    }
    violations
}

fn check_coverage(grid: &GridIndex, placement: &Placement, violations: &mut Vec<Violation>) {
    let mut counts: BTreeMap<Pos, usize> = BTreeMap::new();
    for room in placement.rooms() {
        for &cell in &room.footprint {
            *counts.entry(cell).or_default() += 1;
        }
    }
    for cell in grid.cells() {
        let count = counts.remove(&cell.pos).unwrap_or(0);
        if cell.is_connector {
            if count > 0 {
                violations.push(Violation::OutsideZone { cell: cell.pos });
            }
        } else if count == 0 {
            violations.push(Violation::Uncovered { cell: cell.pos });
        } else if count > 1 {
            violations.push(Violation::Overlap { cell: cell.pos, count });
        }
    }
    violations.extend(counts.into_keys().map(|cell| Violation::OutsideZone { cell }));
}

fn check_entrances(grid: &GridIndex, placement: &Placement, violations: &mut Vec<Violation>) {
    let doorways: BTreeSet<Pos> = placement.doorways().map(|bridge| bridge.pos).collect();
    for (cell, occupant) in placement.occupied_cells() {
        for side in Direction::ALL {
            let opens = occupant.entrances.has(side);
            let neighbor = cell.step(side);
            if doorways.contains(&neighbor) {
                if !opens {
                    violations.push(Violation::ClosedDoorway { cell, side });
                }
            } else if let Some(other) = placement.occupant(neighbor) {
                if opens != other.entrances.has(side.opposite()) {
                    violations.push(Violation::EntranceMismatch { cell, side });
                }
            } else if opens && grid.cell(neighbor).is_none() {
                violations.push(Violation::OpensOutward { cell, side });
            }
        }
    }
}

fn check_rooms(catalog: &Catalog, placement: &Placement, violations: &mut Vec<Violation>) {
    for room in placement.rooms() {
        let expected = catalog.room(&room.room).map_or(1, |def| 1 + def.extensions.count());
        if room.footprint.len() != expected {
            violations.push(Violation::Footprint {
                base: room.base,
                found: room.footprint.len(),
                expected,
            });
        }
    }

    for zone in catalog.zones() {
        for required in &zone.required_rooms {
            let count =
                placement.rooms_in_zone(zone.id).filter(|room| &room.room == required).count();
            if count != 1 {
                violations.push(Violation::RequiredCount {
                    zone: zone.id,
                    room: required.clone(),
                    count,
                });
            }
        }
    }
}

fn check_doorways(catalog: &Catalog, placement: &Placement, violations: &mut Vec<Violation>) {
    for zone in catalog.zones() {
        let found = placement.doorways().filter(|bridge| bridge.upper == zone.id).count();
        let expected = if zone.connects_onward() { zone.doorway_count() } else { 0 };
        if found != expected {
            violations.push(Violation::DoorwayCount { zone: zone.id, found, expected });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RoomDef, RoomKind, RoomShape, ZoneDef, default_entrances};
    use crate::mapgen::grid::build_grid;
    use crate::mapgen::model::{CellOccupant, PlacedRoom};
    use crate::types::{AssetId, Entrances, Rotation};

    fn catalog() -> Catalog {
        let end = RoomDef {
            id: AssetId::new("end"),
            shape: RoomShape::EndRoom,
            kind: RoomKind::Normal,
            entrances: default_entrances(RoomShape::EndRoom),
            large: false,
            extensions: Entrances::NONE,
            valid_for_starting_room: false,
            chance: 1.0,
            anchor: None,
        };
        let zone = ZoneDef {
            id: ZoneId(0),
            name: String::new(),
            width: 2,
            height: 1,
            normal_rooms: vec![AssetId::new("end")],
            required_rooms: Vec::new(),
            starting_room: None,
            connection: None,
            surface_exits: Vec::new(),
        };
        Catalog::new(vec![end], vec![zone]).expect("fixture catalog is valid")
    }

    fn end_room(x: i32, rotation: Rotation) -> PlacedRoom {
        PlacedRoom {
            room: AssetId::new("end"),
            zone: ZoneId(0),
            base: Pos { y: 0, x },
            rotation,
            footprint: vec![Pos { y: 0, x }],
        }
    }

    fn placement(left: Direction, right: Direction) -> Placement {
        let mut cells = BTreeMap::new();
        cells.insert(
            Pos { y: 0, x: 0 },
            CellOccupant { room: 0, entrances: Entrances::from_directions(&[left]) },
        );
        cells.insert(
            Pos { y: 0, x: 1 },
            CellOccupant { room: 1, entrances: Entrances::from_directions(&[right]) },
        );
        Placement::new(
            vec![end_room(0, Rotation::R270), end_room(1, Rotation::R90)],
            cells,
            Vec::new(),
            Pos { y: 0, x: 0 },
        )
    }

    #[test]
    fn facing_end_rooms_are_sound() {
        let catalog = catalog();
        let grid = build_grid(catalog.zones());
        let audit = audit_placement(&catalog, &grid, &placement(Direction::East, Direction::West));
        assert!(audit.is_empty(), "unexpected violations: {audit:?}");
    }

    #[test]
    fn outward_entrances_are_reported() {
        let catalog = catalog();
        let grid = build_grid(catalog.zones());
        let audit = audit_placement(&catalog, &grid, &placement(Direction::North, Direction::West));

        assert!(audit.contains(&Violation::OpensOutward {
            cell: Pos { y: 0, x: 0 },
            side: Direction::North,
        }));
        assert!(audit.contains(&Violation::EntranceMismatch {
            cell: Pos { y: 0, x: 1 },
            side: Direction::West,
        }));
        assert!(audit.contains(&Violation::Unreachable { cell: Pos { y: 0, x: 1 } }));
    }
}

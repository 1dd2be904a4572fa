//! Constrained room placement over the zone bands of a grid.

mod connectivity;
mod draw;
mod search;
mod zone;

use std::collections::BTreeMap;

use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info};

pub(super) use self::connectivity::first_unreachable;
use self::draw::{choose_distinct, index_below};
use self::search::{FillOutcome, StepBudget, fill};
use self::zone::{DoorwayLinks, Orientation, ZoneWork, distinct_rotations};
use super::grid::{GridIndex, ZoneBand};
use super::model::{BridgeTarget, CellOccupant, ConnectorBridge, PlacedRoom, Placement};
use crate::catalog::{Anchor, Catalog, ZoneDef};
use crate::config::GeneratorConfig;
use crate::types::{Entrances, Pos, RoomId, ZoneId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlacementError {
    #[error("{zone} has no normal rooms to fill its cells")]
    EmptyPool { zone: ZoneId },
    #[error("{zone}: no starting room fits at {cell}")]
    StartingRoomUnplaceable { zone: ZoneId, cell: Pos },
    #[error("{zone}: required room `{room}` fits nowhere")]
    RequiredRoomUnplaceable { zone: ZoneId, room: RoomId },
    #[error("{zone}: gave up after {steps} backtracking steps")]
    BudgetExhausted { zone: ZoneId, cell: Option<Pos>, steps: u64 },
    #[error("{zone}: cell {cell} is unreachable from the start")]
    Disconnected { zone: ZoneId, cell: Pos },
}

impl PlacementError {
    pub fn zone(&self) -> ZoneId {
        match self {
            Self::EmptyPool { zone }
            | Self::StartingRoomUnplaceable { zone, .. }
            | Self::RequiredRoomUnplaceable { zone, .. }
            | Self::BudgetExhausted { zone, .. }
            | Self::Disconnected { zone, .. } => *zone,
        }
    }

    pub fn cell(&self) -> Option<Pos> {
        match self {
            Self::StartingRoomUnplaceable { cell, .. } | Self::Disconnected { cell, .. } => {
                Some(*cell)
            }
            Self::BudgetExhausted { cell, .. } => *cell,
            Self::EmptyPool { .. } | Self::RequiredRoomUnplaceable { .. } => None,
        }
    }
}

/// Why a single zone attempt was abandoned.
#[derive(Clone, Debug)]
enum AttemptFailure {
    StartingRoom { cell: Pos },
    RequiredRoom { room: RoomId },
    Fill { cell: Option<Pos> },
}

impl AttemptFailure {
    fn into_error(self, zone: ZoneId, steps: u64) -> PlacementError {
        match self {
            Self::StartingRoom { cell } => PlacementError::StartingRoomUnplaceable { zone, cell },
            Self::RequiredRoom { room } => PlacementError::RequiredRoomUnplaceable { zone, room },
            Self::Fill { cell } => PlacementError::BudgetExhausted { zone, cell, steps },
        }
    }
}

/// Room layout of one zone after a successful attempt.
struct ZoneLayout {
    rooms: Vec<(Orientation, Vec<(Pos, Entrances)>)>,
    doorways: Vec<i32>,
    /// Doorway columns tagged by the group of the zone that reaches them.
    links: DoorwayLinks,
}

/// Fills every zone of `grid` with rooms from `catalog`, zone by zone in grid order.
pub fn place_rooms(
    grid: &GridIndex,
    catalog: &Catalog,
    config: &GeneratorConfig,
    rng: &mut ChaCha8Rng,
) -> Result<Placement, PlacementError> {
    let mut rooms = Vec::new();
    let mut cells = BTreeMap::new();
    let mut connectors = Vec::new();
    let mut incoming = DoorwayLinks::new();
    let mut previous: Option<&ZoneBand> = None;

    for (zone, band) in catalog.zones().iter().zip(grid.bands()) {
        debug_assert_eq!(zone.id, band.zone);
        if let Some(above) = previous {
            debug_assert_eq!(above.connector_row.map(|row| row + 1), Some(band.top));
        }

        let layout = place_zone(grid, catalog, config, zone, band, incoming, rng)?;

        let mut placed = layout.rooms;
        placed.sort_by_key(|(_, footprint)| footprint[0].0);
        for (orientation, footprint) in placed {
            let index = rooms.len();
            for &(pos, entrances) in &footprint {
                cells.insert(pos, CellOccupant { room: index, entrances });
            }
            rooms.push(PlacedRoom {
                room: catalog.rooms()[orientation.slot].id.clone(),
                zone: zone.id,
                base: footprint[0].0,
                rotation: orientation.rotation,
                footprint: footprint.into_iter().map(|(pos, _)| pos).collect(),
            });
        }

        connectors.extend(bridges(zone, band, &layout.doorways));
        incoming = layout.links;
        previous = Some(band);
    }

    let start = start_cell(catalog, grid);
    if let Some(cell) = first_unreachable(&cells, &connectors, start) {
        let zone = grid.cell(cell).and_then(|cell| cell.zone).unwrap_or(ZoneId(0));
        return Err(PlacementError::Disconnected { zone, cell });
    }

    Ok(Placement::new(rooms, cells, connectors, start))
}

fn place_zone(
    grid: &GridIndex,
    catalog: &Catalog,
    config: &GeneratorConfig,
    zone: &ZoneDef,
    band: &ZoneBand,
    incoming: DoorwayLinks,
    rng: &mut ChaCha8Rng,
) -> Result<ZoneLayout, PlacementError> {
    let mut work = ZoneWork::new(zone, band, grid, catalog, config.connector_policy, incoming);
    if work.normal_pool.is_empty() {
        return Err(PlacementError::EmptyPool { zone: zone.id });
    }

    let cell_count = band.cells.len() as u64;
    let mut budget = StepBudget::new(config.backtrack_budget_per_cell as u64 * cell_count);
    let doorway_limit = doorway_limit(catalog, zone);
    let mut attempt = 0_u32;

    loop {
        attempt += 1;
        work.reset();
        work.outgoing = choose_distinct(rng, doorway_limit, zone.doorway_count())
            .into_iter()
            .map(|column| column as i32)
            .collect();

        let failure = match pin_rooms(&mut work, rng) {
            Err(failure) => failure,
            Ok(()) => match fill(&mut work, rng, &mut budget) {
                FillOutcome::Complete => {
                    info!(
                        zone = %zone.id,
                        rooms = work.placed.len(),
                        attempts = attempt,
                        steps = budget.spent,
                        "zone_placed"
                    );
                    let links = connectivity::exit_links(&work);
                    return Ok(ZoneLayout {
                        rooms: work
                            .placed
                            .drain(..)
                            .map(|room| (room.orientation, room.cells))
                            .collect(),
                        doorways: work.outgoing,
                        links,
                    });
                }
                FillOutcome::Exhausted { cell } => {
                    return Err(AttemptFailure::Fill { cell }.into_error(zone.id, budget.spent));
                }
                FillOutcome::Restart { cell } => AttemptFailure::Fill { cell },
            },
        };

        debug!(
            zone = %zone.id,
            attempt,
            steps = budget.spent,
            reason = ?failure,
            "placement_restart"
        );
        // Fill restarts were already charged per backtrack.
        let within_budget = match failure {
            AttemptFailure::Fill { .. } => true,
            AttemptFailure::StartingRoom { .. } | AttemptFailure::RequiredRoom { .. } => {
                budget.charge()
            }
        };
        if !within_budget {
            return Err(failure.into_error(zone.id, budget.spent));
        }
    }
}

/// Doorway columns must exist on both sides of the connector row.
fn doorway_limit(catalog: &Catalog, zone: &ZoneDef) -> usize {
    let below = zone
        .connection
        .as_ref()
        .and_then(|connection| catalog.zone(connection.next_zone))
        .map_or(zone.width, |next| next.width);
    zone.width.min(below) as usize
}

fn pin_rooms(work: &mut ZoneWork<'_>, rng: &mut ChaCha8Rng) -> Result<(), AttemptFailure> {
    pin_starting_room(work, rng)?;
    let zone = work.zone;
    for room in &zone.required_rooms {
        pin_required_room(work, room, rng)?;
    }
    Ok(())
}

fn pin_starting_room(work: &mut ZoneWork<'_>, rng: &mut ChaCha8Rng) -> Result<(), AttemptFailure> {
    let Some(local) = work.zone.starting_room else {
        return Ok(());
    };
    let cell = work.band.to_grid(local.x, local.y);
    let slots: Vec<usize> = work
        .normal_pool
        .iter()
        .copied()
        .filter(|&slot| work.room(slot).valid_for_starting_room)
        .collect();

    for orientation in work.ordered_candidates(cell, &slots, rng) {
        let footprint = work.footprint(cell, orientation);
        work.place(orientation, footprint);
        if !connectivity::has_dead_end(work) {
            return Ok(());
        }
        work.unplace_last();
    }
    Err(AttemptFailure::StartingRoom { cell })
}

fn pin_required_room(
    work: &mut ZoneWork<'_>,
    room: &RoomId,
    rng: &mut ChaCha8Rng,
) -> Result<(), AttemptFailure> {
    let failure = || AttemptFailure::RequiredRoom { room: room.clone() };
    let slot = work.catalog_slot(room).ok_or_else(failure)?;
    let cells = match work.room(slot).anchor {
        None => work.band.cells.clone(),
        Some(Anchor::ZoneEntry) => work.entry_cells(),
        Some(Anchor::ZoneExit) => work.exit_cells(),
    };

    let mut options: Vec<(Pos, Orientation)> = Vec::new();
    for cell in cells {
        for rotation in distinct_rotations(work.room(slot)) {
            let orientation = Orientation { slot, rotation };
            if work.fits(&work.footprint(cell, orientation)) {
                options.push((cell, orientation));
            }
        }
    }

    while !options.is_empty() {
        let (cell, orientation) = options.swap_remove(index_below(rng, options.len()));
        let footprint = work.footprint(cell, orientation);
        work.place(orientation, footprint);
        if !connectivity::has_dead_end(work) {
            return Ok(());
        }
        work.unplace_last();
    }
    Err(failure())
}

fn bridges(zone: &ZoneDef, band: &ZoneBand, doorways: &[i32]) -> Vec<ConnectorBridge> {
    let Some(row) = band.connector_row else {
        return Vec::new();
    };
    let lower = match &zone.connection {
        Some(connection) => BridgeTarget::Zone(connection.next_zone),
        None => BridgeTarget::Surface,
    };
    (0..band.width)
        .map(|x| {
            let door = doorways.iter().position(|&column| column == x).and_then(|rank| {
                match &zone.connection {
                    Some(connection) => Some(connection.door.clone()),
                    None => zone.surface_exits.get(rank).cloned(),
                }
            });
            ConnectorBridge { pos: Pos { y: row, x }, upper: zone.id, lower, door }
        })
        .collect()
}

/// The declared starting cell of the first zone that has one, else the grid origin.
fn start_cell(catalog: &Catalog, grid: &GridIndex) -> Pos {
    catalog
        .zones()
        .iter()
        .zip(grid.bands())
        .find_map(|(zone, band)| zone.starting_room.map(|local| band.to_grid(local.x, local.y)))
        .or_else(|| grid.bands().first().and_then(|band| band.cells.first().copied()))
        .unwrap_or_default()
}

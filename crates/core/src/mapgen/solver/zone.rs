//! Per-zone working state: occupancy, side rules and footprint fitting.

use std::collections::{BTreeMap, BTreeSet};

use rand_chacha::ChaCha8Rng;

use super::draw::{shuffle, weighted_order};
use crate::catalog::{Catalog, RoomDef, ZoneDef};
use crate::config::ConnectorPolicy;
use crate::mapgen::grid::{GridIndex, ZoneBand};
use crate::types::{Direction, Entrances, Pos, RoomId, Rotation};

/// Doorway column to the link class of the component it leads to.
pub(super) type DoorwayLinks = BTreeMap<i32, usize>;

/// A catalog room turned to face one way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct Orientation {
    pub(super) slot: usize,
    pub(super) rotation: Rotation,
}

/// A room placed during the search, with the effective entrances of every covered cell.
#[derive(Clone, Debug)]
pub(super) struct WorkRoom {
    pub(super) orientation: Orientation,
    pub(super) cells: Vec<(Pos, Entrances)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SideRule {
    Open,
    Closed,
    Either,
}

pub(super) struct ZoneWork<'a> {
    pub(super) zone: &'a ZoneDef,
    pub(super) band: &'a ZoneBand,
    grid: &'a GridIndex,
    catalog: &'a Catalog,
    policy: ConnectorPolicy,
    /// Doorway columns of the connector row above the zone, each tagged with the
    /// connected component of the zones above that it leads to.
    pub(super) incoming: DoorwayLinks,
    /// Doorway columns of the connector row below the zone, ascending.
    pub(super) outgoing: Vec<i32>,
    pub(super) occupied: BTreeMap<Pos, Entrances>,
    pub(super) placed: Vec<WorkRoom>,
    pub(super) normal_pool: Vec<usize>,
}

impl<'a> ZoneWork<'a> {
    pub(super) fn new(
        zone: &'a ZoneDef,
        band: &'a ZoneBand,
        grid: &'a GridIndex,
        catalog: &'a Catalog,
        policy: ConnectorPolicy,
        incoming: DoorwayLinks,
    ) -> Self {
        let normal_pool = zone.normal_rooms.iter().filter_map(|id| catalog.room_slot(id)).collect();
        Self {
            zone,
            band,
            grid,
            catalog,
            policy,
            incoming,
            outgoing: Vec::new(),
            occupied: BTreeMap::new(),
            placed: Vec::new(),
            normal_pool,
        }
    }

    pub(super) fn room(&self, slot: usize) -> &'a RoomDef {
        &self.catalog.rooms()[slot]
    }

    pub(super) fn catalog_slot(&self, id: &RoomId) -> Option<usize> {
        self.catalog.room_slot(id)
    }

    pub(super) fn reset(&mut self) {
        self.occupied.clear();
        self.placed.clear();
        self.outgoing.clear();
    }

    pub(super) fn is_free(&self, pos: Pos) -> bool {
        self.band.contains(pos) && !self.occupied.contains_key(&pos)
    }

    pub(super) fn free_cell_count(&self) -> usize {
        self.band.cells.len() - self.occupied.len()
    }

    /// Zone cells directly below a doorway of the row above.
    pub(super) fn entry_cells(&self) -> Vec<Pos> {
        self.incoming.keys().map(|&x| Pos { y: self.band.top, x }).collect()
    }

    /// Zone cells directly above a doorway of the row below.
    pub(super) fn exit_cells(&self) -> Vec<Pos> {
        self.outgoing.iter().map(|&x| Pos { y: self.band.bottom_row(), x }).collect()
    }

    /// Whether the outgoing doorways lead into another zone rather than to the surface.
    pub(super) fn links_onward(&self) -> bool {
        self.zone.connection.is_some()
    }

    fn is_doorway(&self, pos: Pos) -> bool {
        if pos.y == self.band.top - 1 {
            return self.incoming.contains_key(&pos.x);
        }
        self.band.connector_row == Some(pos.y) && self.outgoing.contains(&pos.x)
    }

    fn side_rule(&self, pos: Pos, side: Direction) -> SideRule {
        let neighbor = pos.step(side);
        let Some(cell) = self.grid.cell(neighbor) else {
            return SideRule::Closed;
        };
        if cell.is_connector {
            if self.is_doorway(neighbor) {
                return SideRule::Open;
            }
            return match self.policy {
                ConnectorPolicy::Permissive => SideRule::Either,
                ConnectorPolicy::Sealed => SideRule::Closed,
            };
        }
        if cell.zone != Some(self.zone.id) {
            return SideRule::Closed;
        }
        match self.occupied.get(&neighbor) {
            Some(entrances) if entrances.has(side.opposite()) => SideRule::Open,
            Some(_) => SideRule::Closed,
            None => SideRule::Either,
        }
    }

    /// Cells a room would cover at `base`, each with the sides it opens on.
    pub(super) fn footprint(&self, base: Pos, orientation: Orientation) -> Vec<(Pos, Entrances)> {
        let room = self.room(orientation.slot);
        let entrances = room.entrances.rotated(orientation.rotation);
        let extensions = room.extensions.rotated(orientation.rotation);
        let mut cells = Vec::with_capacity(1 + extensions.count());
        cells.push((base, entrances.union(extensions)));
        for side in extensions.directions() {
            // An entrance on the extended side opens out of the extension instead.
            let mut outer = Entrances::from_directions(&[side.opposite()]);
            outer.set(side, entrances.has(side));
            cells.push((base.step(side), outer));
        }
        cells
    }

    pub(super) fn fits(&self, footprint: &[(Pos, Entrances)]) -> bool {
        footprint.iter().all(|&(pos, entrances)| {
            self.is_free(pos)
                && Direction::ALL.into_iter().all(|side| {
                    let neighbor = pos.step(side);
                    if footprint.iter().any(|&(other, _)| other == neighbor) {
                        return true;
                    }
                    match self.side_rule(pos, side) {
                        SideRule::Open => entrances.has(side),
                        SideRule::Closed => !entrances.has(side),
                        SideRule::Either => true,
                    }
                })
        })
    }

    pub(super) fn place(&mut self, orientation: Orientation, footprint: Vec<(Pos, Entrances)>) {
        for &(pos, entrances) in &footprint {
            self.occupied.insert(pos, entrances);
        }
        self.placed.push(WorkRoom { orientation, cells: footprint });
    }

    pub(super) fn unplace_last(&mut self) {
        if let Some(room) = self.placed.pop() {
            for (pos, _) in room.cells {
                self.occupied.remove(&pos);
            }
        }
    }

    /// Every orientation of the given rooms that fits at `base`, grouped by room.
    pub(super) fn fitting_orientations(&self, base: Pos, slots: &[usize]) -> Vec<Vec<Orientation>> {
        slots
            .iter()
            .map(|&slot| {
                distinct_rotations(self.room(slot))
                    .into_iter()
                    .map(|rotation| Orientation { slot, rotation })
                    .filter(|&orientation| self.fits(&self.footprint(base, orientation)))
                    .collect::<Vec<_>>()
            })
            .filter(|group| !group.is_empty())
            .collect()
    }

    /// Fitting orientations ordered by weighted draws over room chance; the rotations of
    /// one room stay together in shuffled order.
    pub(super) fn ordered_candidates(
        &self,
        base: Pos,
        slots: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Vec<Orientation> {
        let groups = self.fitting_orientations(base, slots);
        let weights: Vec<f64> =
            groups.iter().map(|group| self.room(group[0].slot).chance).collect();
        let mut ordered = Vec::new();
        for index in weighted_order(rng, &weights) {
            let mut group = groups[index].clone();
            shuffle(rng, &mut group);
            ordered.extend(group);
        }
        ordered
    }
}

/// Rotations that give a room a distinct entrance/extension layout.
pub(super) fn distinct_rotations(room: &RoomDef) -> Vec<Rotation> {
    let mut seen = BTreeSet::new();
    Rotation::ALL
        .into_iter()
        .filter(|&rotation| {
            seen.insert((room.entrances.rotated(rotation), room.extensions.rotated(rotation)))
        })
        .collect()
}

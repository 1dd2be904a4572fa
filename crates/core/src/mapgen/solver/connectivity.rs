//! Reachability checks: dead-end pruning inside one zone and the final whole-map walk.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::zone::{DoorwayLinks, ZoneWork};
use crate::mapgen::model::{CellOccupant, ConnectorBridge};
use crate::types::{Direction, Pos};

/// Placed cells of one zone joined inside the zone or through the zones above it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(super) struct ZoneGroup {
    /// Some cell still opens toward an unplaced cell of the zone.
    pub(super) open: bool,
    /// A doorway the group enters through has another, still unplaced, cell of its link.
    pub(super) waiting: bool,
    /// Columns of occupied cells above doorways into the next zone.
    pub(super) exits: Vec<i32>,
}

impl ZoneGroup {
    fn can_grow(&self) -> bool {
        self.open || self.waiting || !self.exits.is_empty()
    }
}

/// True when some placed group of the zone can no longer reach the rest of the map.
///
/// A group may still grow into unplaced cells, through an incoming link whose other
/// entry cells are unplaced, or through a doorway into the next zone.
pub(super) fn has_dead_end(work: &ZoneWork<'_>) -> bool {
    let groups = zone_groups(work);
    groups.iter().any(|group| !group.can_grow())
        && (work.free_cell_count() > 0 || groups.len() > 1)
}

/// Link class of every outgoing doorway column, one class per group that reaches it.
pub(super) fn exit_links(work: &ZoneWork<'_>) -> DoorwayLinks {
    zone_groups(work)
        .into_iter()
        .filter(|group| !group.exits.is_empty())
        .enumerate()
        .flat_map(|(link, group)| group.exits.into_iter().map(move |column| (column, link)))
        .collect()
}

/// Components of the placed cells, merged where they enter through the same link.
pub(super) fn zone_groups(work: &ZoneWork<'_>) -> Vec<ZoneGroup> {
    let entries: BTreeMap<Pos, usize> =
        work.entry_cells().into_iter().zip(work.incoming.values().copied()).collect();
    let exits: BTreeSet<Pos> = if work.links_onward() {
        work.exit_cells().into_iter().collect()
    } else {
        BTreeSet::new()
    };

    let mut seen = BTreeSet::new();
    let mut components = Vec::new();
    for &origin in work.occupied.keys() {
        if !seen.contains(&origin) {
            components.push(flood_zone_component(work, origin, &mut seen, &entries, &exits));
        }
    }

    let mut parent: Vec<usize> = (0..components.len()).collect();
    let mut owners: BTreeMap<usize, usize> = BTreeMap::new();
    for (index, component) in components.iter().enumerate() {
        for &link in &component.links {
            match owners.get(&link) {
                Some(&owner) => join(&mut parent, owner, index),
                None => {
                    owners.insert(link, index);
                }
            }
        }
    }

    let unplaced: BTreeSet<usize> = entries
        .iter()
        .filter(|(pos, _)| !work.occupied.contains_key(pos))
        .map(|(_, &link)| link)
        .collect();
    let mut groups: BTreeMap<usize, ZoneGroup> = BTreeMap::new();
    for (index, component) in components.into_iter().enumerate() {
        let group = groups.entry(find(&mut parent, index)).or_default();
        group.open |= component.open;
        group.waiting |= component.links.iter().any(|link| unplaced.contains(link));
        group.exits.extend(component.exits);
    }
    groups
        .into_values()
        .map(|mut group| {
            group.exits.sort_unstable();
            group
        })
        .collect()
}

fn find(parent: &mut [usize], index: usize) -> usize {
    let mut root = index;
    while parent[root] != root {
        root = parent[root];
    }
    parent[index] = root;
    root
}

fn join(parent: &mut [usize], left: usize, right: usize) {
    let (left, right) = (find(parent, left), find(parent, right));
    parent[left.max(right)] = left.min(right);
}

#[derive(Default)]
struct Component {
    open: bool,
    links: BTreeSet<usize>,
    exits: Vec<i32>,
}

fn flood_zone_component(
    work: &ZoneWork<'_>,
    origin: Pos,
    seen: &mut BTreeSet<Pos>,
    entries: &BTreeMap<Pos, usize>,
    exits: &BTreeSet<Pos>,
) -> Component {
    let mut component = Component::default();
    let mut queue = VecDeque::from([origin]);
    seen.insert(origin);

    while let Some(pos) = queue.pop_front() {
        if let Some(&link) = entries.get(&pos) {
            component.links.insert(link);
        }
        if exits.contains(&pos) {
            component.exits.push(pos.x);
        }
        let Some(&entrances) = work.occupied.get(&pos) else {
            continue;
        };
        for side in entrances.directions() {
            let neighbor = pos.step(side);
            if work.is_free(neighbor) {
                component.open = true;
                continue;
            }
            let joined = work
                .occupied
                .get(&neighbor)
                .is_some_and(|other| other.has(side.opposite()));
            if joined && seen.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }
    component
}

/// First occupied cell, row-major, that cannot be reached from `start`.
///
/// Edges join cells whose facing entrances match; a doorway joins the cells directly
/// above and below it.
pub(in crate::mapgen) fn first_unreachable(
    cells: &BTreeMap<Pos, CellOccupant>,
    connectors: &[ConnectorBridge],
    start: Pos,
) -> Option<Pos> {
    let doorways: BTreeSet<Pos> =
        connectors.iter().filter(|bridge| bridge.is_doorway()).map(|bridge| bridge.pos).collect();

    let mut reached = BTreeSet::new();
    let mut queue = VecDeque::new();
    if cells.contains_key(&start) {
        reached.insert(start);
        queue.push_back(start);
    }

    while let Some(pos) = queue.pop_front() {
        let entrances = cells[&pos].entrances;
        for side in entrances.directions() {
            let mut neighbor = pos.step(side);
            if doorways.contains(&neighbor) {
                neighbor = neighbor.step(side);
            }
            if opens_toward(cells, neighbor, side.opposite()) && reached.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }

    cells.keys().copied().find(|pos| !reached.contains(pos))
}

fn opens_toward(cells: &BTreeMap<Pos, CellOccupant>, pos: Pos, side: Direction) -> bool {
    cells.get(&pos).is_some_and(|occupant| occupant.entrances.has(side))
}

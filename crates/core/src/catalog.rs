//! Static room and zone definitions consumed read-only by generation.
//!
//! A [`Catalog`] is validated once when it is built; every later stage relies on the
//! invariants checked here (unique ids, shape-consistent entrances, chained zones).

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AssetId, Direction, Entrances, RoomId, ZoneId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomShape {
    TwoWay,
    ThreeWay,
    FourWay,
    Corner,
    EndRoom,
}

impl RoomShape {
    /// Whether an authored entrance set is geometrically consistent with this shape.
    pub fn accepts(self, entrances: Entrances) -> bool {
        match self {
            Self::EndRoom => entrances.count() == 1,
            Self::ThreeWay => entrances.count() == 3,
            Self::FourWay => entrances.count() == 4,
            Self::TwoWay => {
                entrances.count() == 2
                    && entrances.directions().all(|side| entrances.has(side.opposite()))
            }
            Self::Corner => {
                entrances.count() == 2
                    && entrances.directions().all(|side| !entrances.has(side.opposite()))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    #[default]
    Normal,
    Required,
    Checkpoint,
}

/// Where a required room has to sit relative to the zone's doorways.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// Next to a doorway of the connector row above the zone.
    ZoneEntry,
    /// Next to a doorway of the connector row below the zone.
    ZoneExit,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomDef {
    pub id: RoomId,
    pub shape: RoomShape,
    #[serde(default)]
    pub kind: RoomKind,
    pub entrances: Entrances,
    #[serde(default)]
    pub large: bool,
    #[serde(default)]
    pub extensions: Entrances,
    #[serde(default)]
    pub valid_for_starting_room: bool,
    #[serde(default = "default_chance")]
    pub chance: f64,
    #[serde(default)]
    pub anchor: Option<Anchor>,
}

fn default_chance() -> f64 {
    1.0
}

fn default_door_count() -> usize {
    1
}

/// Cell position relative to a zone's top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalPos {
    pub x: u32,
    pub y: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConnection {
    pub next_zone: ZoneId,
    #[serde(default = "default_door_count")]
    pub door_count: usize,
    pub door: AssetId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDef {
    pub id: ZoneId,
    #[serde(default)]
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub normal_rooms: Vec<RoomId>,
    #[serde(default)]
    pub required_rooms: Vec<RoomId>,
    #[serde(default)]
    pub starting_room: Option<LocalPos>,
    #[serde(default)]
    pub connection: Option<ZoneConnection>,
    #[serde(default)]
    pub surface_exits: Vec<AssetId>,
}

impl ZoneDef {
    /// Whether a connector row follows this zone in the grid.
    pub fn connects_onward(&self) -> bool {
        self.connection.is_some() || !self.surface_exits.is_empty()
    }

    /// Number of doorways in the connector row below this zone.
    pub fn doorway_count(&self) -> usize {
        match &self.connection {
            Some(connection) => connection.door_count,
            None => self.surface_exits.len(),
        }
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Serialized catalog layout; [`Catalog`] is its validated form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogData {
    pub rooms: Vec<RoomDef>,
    pub zones: Vec<ZoneDef>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog declares no zones")]
    NoZones,
    #[error("room id {room} is declared more than once")]
    DuplicateRoom { room: RoomId },
    #[error("{zone} is declared more than once")]
    DuplicateZone { zone: ZoneId },
    #[error("room {room} entrances do not match its {shape:?} shape")]
    ShapeMismatch { room: RoomId, shape: RoomShape },
    #[error("room {room} chance {chance} is outside (0, 1]")]
    InvalidChance { room: RoomId, chance: f64 },
    #[error("room {room} must declare extensions exactly when it is large")]
    LargeRoomExtensions { room: RoomId },
    #[error("{zone} has an empty grid")]
    EmptyZone { zone: ZoneId },
    #[error("{zone} does not fit the grid's coordinate range")]
    ZoneTooLarge { zone: ZoneId },
    #[error("{zone} references unknown room {room}")]
    UnknownRoom { zone: ZoneId, room: RoomId },
    #[error("{zone} lists room {room} more than once")]
    DuplicatePoolEntry { zone: ZoneId, room: RoomId },
    #[error("{zone} lists room {room} in both its normal and required pools")]
    RoomInBothPools { zone: ZoneId, room: RoomId },
    #[error("{zone} pools room {room} whose kind does not fit that pool")]
    PoolKindMismatch { zone: ZoneId, room: RoomId },
    #[error("{zone} starting room cell lies outside the zone")]
    StartingRoomOutOfBounds { zone: ZoneId },
    #[error("{zone} declares a starting room but no pooled room is valid for it")]
    NoStartingCandidates { zone: ZoneId },
    #[error("{zone} must connect onward to {expected}")]
    MissingConnection { zone: ZoneId, expected: ZoneId },
    #[error("{zone} connects to {found} but the next zone is {expected}")]
    NextZoneMismatch { zone: ZoneId, expected: ZoneId, found: ZoneId },
    #[error("terminal {zone} cannot connect to another zone")]
    TerminalZoneConnects { zone: ZoneId },
    #[error("{zone} declares surface exits but is not the terminal zone")]
    SurfaceExitsOnInnerZone { zone: ZoneId },
    #[error("{zone} asks for {door_count} doorways but at most {max} fit")]
    InvalidDoorCount { zone: ZoneId, door_count: usize, max: usize },
    #[error("{zone} anchors room {room} to a doorway that does not exist")]
    AnchorWithoutDoorway { zone: ZoneId, room: RoomId },
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "CatalogData", into = "CatalogData")]
pub struct Catalog {
    rooms: Vec<RoomDef>,
    zones: Vec<ZoneDef>,
    room_index: BTreeMap<RoomId, usize>,
}

impl TryFrom<CatalogData> for Catalog {
    type Error = CatalogError;

    fn try_from(data: CatalogData) -> Result<Self, Self::Error> {
        Self::new(data.rooms, data.zones)
    }
}

impl From<Catalog> for CatalogData {
    fn from(catalog: Catalog) -> Self {
        Self { rooms: catalog.rooms, zones: catalog.zones }
    }
}

impl Catalog {
    pub fn new(rooms: Vec<RoomDef>, zones: Vec<ZoneDef>) -> Result<Self, CatalogError> {
        let mut room_index = BTreeMap::new();
        for (index, room) in rooms.iter().enumerate() {
            validate_room(room)?;
            if room_index.insert(room.id.clone(), index).is_some() {
                return Err(CatalogError::DuplicateRoom { room: room.id.clone() });
            }
        }

        let catalog = Self { rooms, zones, room_index };
        catalog.validate_zones()?;
        Ok(catalog)
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let data: CatalogData = serde_json::from_str(json)?;
        Self::new(data.rooms, data.zones)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path)
            .map_err(|source| CatalogError::Io { path: path.to_path_buf(), source })?;
        Self::from_json_str(&json)
    }

    pub fn rooms(&self) -> &[RoomDef] {
        &self.rooms
    }

    pub fn zones(&self) -> &[ZoneDef] {
        &self.zones
    }

    pub fn room(&self, id: &RoomId) -> Option<&RoomDef> {
        self.room_index.get(id).map(|&index| &self.rooms[index])
    }

    pub fn zone(&self, id: ZoneId) -> Option<&ZoneDef> {
        self.zones.iter().find(|zone| zone.id == id)
    }

    /// Index of a room inside [`Catalog::rooms`].
    pub fn room_slot(&self, id: &RoomId) -> Option<usize> {
        self.room_index.get(id).copied()
    }

    fn validate_zones(&self) -> Result<(), CatalogError> {
        if self.zones.is_empty() {
            return Err(CatalogError::NoZones);
        }

        let mut seen = BTreeSet::new();
        let mut rows = 0_i64;
        for (position, zone) in self.zones.iter().enumerate() {
            if !seen.insert(zone.id) {
                return Err(CatalogError::DuplicateZone { zone: zone.id });
            }
            if zone.width == 0 || zone.height == 0 {
                return Err(CatalogError::EmptyZone { zone: zone.id });
            }
            rows += i64::from(zone.height) + i64::from(zone.connects_onward());
            if i32::try_from(zone.width).is_err() || rows > i64::from(i32::MAX) {
                return Err(CatalogError::ZoneTooLarge { zone: zone.id });
            }

            self.validate_pools(zone)?;

            let previous = position.checked_sub(1).map(|index| &self.zones[index]);
            let next = self.zones.get(position + 1);
            validate_chaining(zone, next)?;
            self.validate_anchors(zone, previous)?;

            if let Some(start) = zone.starting_room {
                if start.x >= zone.width || start.y >= zone.height {
                    return Err(CatalogError::StartingRoomOutOfBounds { zone: zone.id });
                }
                let has_candidate = zone
                    .normal_rooms
                    .iter()
                    .filter_map(|id| self.room(id))
                    .any(|room| room.valid_for_starting_room);
                if !has_candidate {
                    return Err(CatalogError::NoStartingCandidates { zone: zone.id });
                }
            }
        }
        Ok(())
    }

    fn validate_pools(&self, zone: &ZoneDef) -> Result<(), CatalogError> {
        let mut normal = BTreeSet::new();
        for id in &zone.normal_rooms {
            let room = self
                .room(id)
                .ok_or_else(|| CatalogError::UnknownRoom { zone: zone.id, room: id.clone() })?;
            if room.kind != RoomKind::Normal || room.anchor.is_some() {
                return Err(CatalogError::PoolKindMismatch { zone: zone.id, room: id.clone() });
            }
            if !normal.insert(id) {
                return Err(CatalogError::DuplicatePoolEntry { zone: zone.id, room: id.clone() });
            }
        }

        let mut required = BTreeSet::new();
        for id in &zone.required_rooms {
            let room = self
                .room(id)
                .ok_or_else(|| CatalogError::UnknownRoom { zone: zone.id, room: id.clone() })?;
            if room.kind == RoomKind::Normal {
                return Err(CatalogError::PoolKindMismatch { zone: zone.id, room: id.clone() });
            }
            if normal.contains(id) {
                return Err(CatalogError::RoomInBothPools { zone: zone.id, room: id.clone() });
            }
            if !required.insert(id) {
                return Err(CatalogError::DuplicatePoolEntry { zone: zone.id, room: id.clone() });
            }
        }
        Ok(())
    }

    fn validate_anchors(
        &self,
        zone: &ZoneDef,
        previous: Option<&ZoneDef>,
    ) -> Result<(), CatalogError> {
        for id in &zone.required_rooms {
            let Some(anchor) = self.room(id).and_then(|room| room.anchor) else {
                continue;
            };
            let has_doorway = match anchor {
                Anchor::ZoneEntry => previous.is_some(),
                Anchor::ZoneExit => zone.connects_onward(),
            };
            if !has_doorway {
                return Err(CatalogError::AnchorWithoutDoorway { zone: zone.id, room: id.clone() });
            }
        }
        Ok(())
    }
}

fn validate_room(room: &RoomDef) -> Result<(), CatalogError> {
    if !room.shape.accepts(room.entrances) {
        return Err(CatalogError::ShapeMismatch { room: room.id.clone(), shape: room.shape });
    }
    if !(room.chance > 0.0 && room.chance <= 1.0) {
        return Err(CatalogError::InvalidChance { room: room.id.clone(), chance: room.chance });
    }
    if room.large == room.extensions.is_empty() {
        return Err(CatalogError::LargeRoomExtensions { room: room.id.clone() });
    }
    Ok(())
}

fn validate_chaining(zone: &ZoneDef, next: Option<&ZoneDef>) -> Result<(), CatalogError> {
    match (next, &zone.connection) {
        (Some(next), None) => {
            return Err(CatalogError::MissingConnection { zone: zone.id, expected: next.id });
        }
        (Some(next), Some(connection)) if connection.next_zone != next.id => {
            return Err(CatalogError::NextZoneMismatch {
                zone: zone.id,
                expected: next.id,
                found: connection.next_zone,
            });
        }
        (None, Some(_)) => return Err(CatalogError::TerminalZoneConnects { zone: zone.id }),
        _ => {}
    }
    if next.is_some() && !zone.surface_exits.is_empty() {
        return Err(CatalogError::SurfaceExitsOnInnerZone { zone: zone.id });
    }

    if zone.connects_onward() {
        let max = match next {
            Some(next) => zone.width.min(next.width) as usize,
            None => zone.width as usize,
        };
        let door_count = zone.doorway_count();
        if door_count == 0 || door_count > max {
            return Err(CatalogError::InvalidDoorCount { zone: zone.id, door_count, max });
        }
    }
    Ok(())
}

/// Authored entrances for a shape facing its default orientation.
pub fn default_entrances(shape: RoomShape) -> Entrances {
    use Direction::{East, North, South, West};
    match shape {
        RoomShape::EndRoom => Entrances::from_directions(&[South]),
        RoomShape::Corner => Entrances::from_directions(&[North, East]),
        RoomShape::TwoWay => Entrances::from_directions(&[North, South]),
        RoomShape::ThreeWay => Entrances::from_directions(&[North, East, South]),
        RoomShape::FourWay => Entrances::from_directions(&[North, East, South, West]),
    }
}

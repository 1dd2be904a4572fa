use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Pos {
    pub y: i32,
    pub x: i32,
}

impl Pos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { y, x }
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self { y: self.y + dy, x: self.x + dx }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cardinal side of a grid cell. North is toward lower `y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] =
        [Direction::North, Direction::East, Direction::South, Direction::West];

    pub fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    pub fn rotated(self, rotation: Rotation) -> Self {
        let index = (self.index() + rotation.quarter_turns()) % 4;
        Self::ALL[index]
    }

    fn index(self) -> usize {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }
}

/// Set of open sides, authored per room and derived per placed cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Entrances {
    pub north: bool,
    pub east: bool,
    pub south: bool,
    pub west: bool,
}

impl Entrances {
    pub const NONE: Entrances = Entrances { north: false, east: false, south: false, west: false };

    pub fn from_directions(directions: &[Direction]) -> Self {
        let mut entrances = Self::NONE;
        for &direction in directions {
            entrances.set(direction, true);
        }
        entrances
    }

    pub fn has(self, direction: Direction) -> bool {
        match direction {
            Direction::North => self.north,
            Direction::East => self.east,
            Direction::South => self.south,
            Direction::West => self.west,
        }
    }

    pub fn set(&mut self, direction: Direction, open: bool) {
        match direction {
            Direction::North => self.north = open,
            Direction::East => self.east = open,
            Direction::South => self.south = open,
            Direction::West => self.west = open,
        }
    }

    pub fn count(self) -> usize {
        Direction::ALL.iter().filter(|&&direction| self.has(direction)).count()
    }

    pub fn is_empty(self) -> bool {
        self.count() == 0
    }

    pub fn directions(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |&direction| self.has(direction))
    }

    pub fn rotated(self, rotation: Rotation) -> Self {
        let mut rotated = Self::NONE;
        for direction in self.directions() {
            rotated.set(direction.rotated(rotation), true);
        }
        rotated
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            north: self.north || other.north,
            east: self.east || other.east,
            south: self.south || other.south,
            west: self.west || other.west,
        }
    }

    pub(crate) fn bits(self) -> u8 {
        u8::from(self.north)
            | (u8::from(self.east) << 1)
            | (u8::from(self.south) << 2)
            | (u8::from(self.west) << 3)
    }
}

/// Clockwise quarter turns applied to a room's authored orientation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

    pub fn quarter_turns(self) -> usize {
        match self {
            Self::R0 => 0,
            Self::R90 => 1,
            Self::R180 => 2,
            Self::R270 => 3,
        }
    }

    pub fn degrees(self) -> f32 {
        self.quarter_turns() as f32 * 90.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub u32);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zone {}", self.0)
    }
}

/// Abstract content identifier resolved by an asset provider. Room ids double as asset ids.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type RoomId = AssetId;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pos_is_the_origin() {
        assert_eq!(Pos::default(), Pos::new(0, 0));
    }

    #[test]
    fn quarter_turn_maps_north_to_east() {
        assert_eq!(Direction::North.rotated(Rotation::R90), Direction::East);
        assert_eq!(Direction::West.rotated(Rotation::R90), Direction::North);
        assert_eq!(Direction::South.rotated(Rotation::R180), Direction::North);
        assert_eq!(Direction::East.rotated(Rotation::R270), Direction::North);
    }

    #[test]
    fn rotating_a_corner_keeps_its_sides_adjacent() {
        let corner = Entrances::from_directions(&[Direction::North, Direction::East]);
        assert_eq!(
            corner.rotated(Rotation::R90),
            Entrances::from_directions(&[Direction::East, Direction::South])
        );
        assert_eq!(
            corner.rotated(Rotation::R270),
            Entrances::from_directions(&[Direction::West, Direction::North])
        );
    }

    #[test]
    fn step_moves_one_cell_per_direction() {
        let origin = Pos::new(3, 3);
        assert_eq!(origin.step(Direction::North), Pos::new(3, 2));
        assert_eq!(origin.step(Direction::East), Pos::new(4, 3));
        assert_eq!(origin.step(Direction::South), Pos::new(3, 4));
        assert_eq!(origin.step(Direction::West), Pos::new(2, 3));
    }

    #[test]
    fn positions_order_row_major() {
        let mut cells = vec![Pos::new(1, 1), Pos::new(0, 2), Pos::new(2, 0), Pos::new(0, 1)];
        cells.sort();
        assert_eq!(cells, vec![Pos::new(2, 0), Pos::new(0, 1), Pos::new(1, 1), Pos::new(0, 2)]);
    }
}

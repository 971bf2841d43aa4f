//! Board positions and movement directions.
//!
//! Positions are plain integer (x, y) coordinates. Distances are Manhattan
//! (grid) distances; the only movement primitives are the four cardinal
//! directions plus `Center` for staying in place.

use serde::{Deserialize, Serialize};

/// A movement direction as used by the engine command grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
    Center,
}

/// The four directions that actually move a unit.
pub const CARDINAL_DIRECTIONS: [Direction; 4] = [
    Direction::North,
    Direction::East,
    Direction::South,
    Direction::West,
];

impl Direction {
    /// Returns the single-character wire abbreviation.
    pub const fn wire_char(self) -> char {
        match self {
            Direction::North => 'n',
            Direction::East => 'e',
            Direction::South => 's',
            Direction::West => 'w',
            Direction::Center => 'c',
        }
    }

    /// Parses a direction from its single-character wire abbreviation.
    pub fn from_wire_char(c: char) -> Option<Direction> {
        match c {
            'n' => Some(Direction::North),
            'e' => Some(Direction::East),
            's' => Some(Direction::South),
            'w' => Some(Direction::West),
            'c' => Some(Direction::Center),
            _ => None,
        }
    }

    /// Returns the (dx, dy) unit vector. North is negative y.
    pub const fn vector(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
            Direction::Center => (0, 0),
        }
    }
}

/// Integer (x, y) coordinates on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Position {
        Position { x, y }
    }

    /// Manhattan (L1/grid) distance to another position.
    pub fn distance_to(self, other: Position) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Two positions are adjacent when at most one step apart.
    pub fn is_adjacent(self, other: Position) -> bool {
        self.distance_to(other) <= 1
    }

    /// Returns the position one step in the given direction.
    pub fn translate(self, direction: Direction) -> Position {
        let (dx, dy) = direction.vector();
        Position::new(self.x + dx, self.y + dy)
    }
}

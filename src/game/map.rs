//! The board grid: cells, raw resources, and road levels.

use super::objects::CityTile;
use super::position::Position;

/// The three collectable resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Wood,
    Coal,
    Uranium,
}

pub const ALL_RESOURCE_KINDS: [ResourceKind; 3] = [
    ResourceKind::Wood,
    ResourceKind::Coal,
    ResourceKind::Uranium,
];

impl ResourceKind {
    /// Returns the wire name used by both grammars.
    pub const fn wire_name(self) -> &'static str {
        match self {
            ResourceKind::Wood => "wood",
            ResourceKind::Coal => "coal",
            ResourceKind::Uranium => "uranium",
        }
    }

    /// Parses a resource kind from its wire name.
    pub fn from_wire_name(s: &str) -> Option<ResourceKind> {
        match s {
            "wood" => Some(ResourceKind::Wood),
            "coal" => Some(ResourceKind::Coal),
            "uranium" => Some(ResourceKind::Uranium),
            _ => None,
        }
    }
}

/// A resource pile on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    pub kind: ResourceKind,
    pub amount: u32,
}

/// One board square.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    pub resource: Option<Resource>,
    pub citytile: Option<CityTile>,
    pub road: u32,
}

impl Cell {
    /// A depleted pile does not count as a resource.
    pub fn has_resource(&self) -> bool {
        matches!(self.resource, Some(r) if r.amount > 0)
    }

    pub fn has_citytile(&self) -> bool {
        self.citytile.is_some()
    }
}

/// Width x height grid of cells. Dimensions are fixed for a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameMap {
    pub width: usize,
    pub height: usize,
    cells: Vec<Cell>,
}

impl GameMap {
    /// Allocates an all-empty grid.
    pub fn new(width: usize, height: usize) -> GameMap {
        GameMap {
            width,
            height,
            cells: vec![Cell::default(); width * height],
        }
    }

    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    pub fn cell(&self, x: usize, y: usize) -> &Cell {
        &self.cells[y * self.width + x]
    }

    pub fn cell_mut(&mut self, x: usize, y: usize) -> &mut Cell {
        &mut self.cells[y * self.width + x]
    }

    pub fn cell_at(&self, pos: Position) -> &Cell {
        self.cell(pos.x as usize, pos.y as usize)
    }
}

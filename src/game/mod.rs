//! Spatial grid model: the board, its cells, and the two players' entities.
//!
//! One `GameState` describes one turn of game truth; the update lifecycle
//! in `state` advances it turn by turn from the engine's delta lines.

pub mod constants;
pub mod map;
pub mod objects;
pub mod position;
pub mod state;

pub use constants::{MAP_HEIGHT_MAX, MAP_WIDTH_MAX};
pub use map::{Cell, GameMap, Resource, ResourceKind, ALL_RESOURCE_KINDS};
pub use objects::{
    cooldown_in_range, Cargo, City, CityTile, Player, Team, Unit, UnitKind, ALL_TEAMS,
};
pub use position::{Direction, Position, CARDINAL_DIRECTIONS};
pub use state::GameState;

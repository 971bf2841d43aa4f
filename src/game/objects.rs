//! Players and the entities they own: units, cities, city tiles.

use std::collections::HashMap;

use super::constants::{
    CART_CARGO_CAPACITY, MAX_ACTION_COOLDOWN, RESEARCH_COAL, RESEARCH_URANIUM,
    WORKER_CARGO_CAPACITY,
};
use super::position::Position;

/// One of the two players in a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    P0 = 0,
    P1 = 1,
}

pub const ALL_TEAMS: [Team; 2] = [Team::P0, Team::P1];

impl Team {
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn opponent(self) -> Team {
        match self {
            Team::P0 => Team::P1,
            Team::P1 => Team::P0,
        }
    }

    /// Parses a team from its wire integer.
    pub fn from_index(i: i64) -> Option<Team> {
        match i {
            0 => Some(Team::P0),
            1 => Some(Team::P1),
            _ => None,
        }
    }
}

/// The kind of a mobile unit. Discriminants match the wire integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Worker = 0,
    Cart = 1,
}

impl UnitKind {
    /// Parses a unit kind from its wire integer.
    pub fn from_wire(i: i64) -> Option<UnitKind> {
        match i {
            0 => Some(UnitKind::Worker),
            1 => Some(UnitKind::Cart),
            _ => None,
        }
    }

    /// Total cargo a unit of this kind can carry.
    pub const fn cargo_capacity(self) -> u32 {
        match self {
            UnitKind::Worker => WORKER_CARGO_CAPACITY,
            UnitKind::Cart => CART_CARGO_CAPACITY,
        }
    }
}

/// Resources held by a unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cargo {
    pub wood: u32,
    pub coal: u32,
    pub uranium: u32,
}

impl Cargo {
    pub const fn new(wood: u32, coal: u32, uranium: u32) -> Cargo {
        Cargo {
            wood,
            coal,
            uranium,
        }
    }

    pub const fn total(self) -> u32 {
        self.wood + self.coal + self.uranium
    }
}

/// A mobile unit: worker or cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub team: Team,
    pub kind: UnitKind,
    pub id: String,
    pub pos: Position,
    pub cooldown: i32,
    pub cargo: Cargo,
}

impl Unit {
    /// Whether the unit may act this turn.
    pub fn can_act(&self) -> bool {
        self.cooldown < 1
    }

    /// Remaining cargo capacity.
    pub fn cargo_space_left(&self) -> u32 {
        self.kind.cargo_capacity().saturating_sub(self.cargo.total())
    }
}

/// One square of a city. Cities act through their tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityTile {
    pub team: Team,
    pub city_id: String,
    pub pos: Position,
    pub cooldown: i32,
}

impl CityTile {
    /// Whether the tile may research or build this turn.
    pub fn can_act(&self) -> bool {
        self.cooldown <= 0
    }
}

/// A city: adjacent tiles sharing one fuel reserve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct City {
    pub team: Team,
    pub id: String,
    /// Shared fuel reserve of all tiles.
    pub fuel: i64,
    /// Total light upkeep; grows with tile count, shrinks with adjacency.
    pub light_upkeep: i64,
    pub tiles: Vec<CityTile>,
}

impl City {
    pub fn new(team: Team, id: String, fuel: i64, light_upkeep: i64) -> City {
        City {
            team,
            id,
            fuel,
            light_upkeep,
            tiles: Vec::new(),
        }
    }

    /// Appends a tile to the city and returns a copy for the map cell.
    pub fn add_tile(&mut self, pos: Position, cooldown: i32) -> CityTile {
        let tile = CityTile {
            team: self.team,
            city_id: self.id.clone(),
            pos,
            cooldown,
        };
        self.tiles.push(tile.clone());
        tile
    }
}

/// Everything one player owns at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub team: Team,
    pub research_points: u32,
    pub units: Vec<Unit>,
    pub cities: HashMap<String, City>,
    pub city_tile_count: u32,
}

impl Player {
    pub fn new(team: Team) -> Player {
        Player {
            team,
            research_points: 0,
            units: Vec::new(),
            cities: HashMap::new(),
            city_tile_count: 0,
        }
    }

    /// Clears per-turn entities. Research points persist across updates.
    pub fn reset_entities(&mut self) {
        self.units.clear();
        self.cities.clear();
        self.city_tile_count = 0;
    }

    pub fn researched_coal(&self) -> bool {
        self.research_points >= RESEARCH_COAL
    }

    pub fn researched_uranium(&self) -> bool {
        self.research_points >= RESEARCH_URANIUM
    }
}

/// Whether a cooldown value is inside the engine's legal range.
pub fn cooldown_in_range(cooldown: i32) -> bool {
    (0..=MAX_ACTION_COOLDOWN).contains(&cooldown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_opponent_and_index() {
        assert_eq!(Team::P0.opponent(), Team::P1);
        assert_eq!(Team::P1.opponent(), Team::P0);
        assert_eq!(Team::from_index(0), Some(Team::P0));
        assert_eq!(Team::from_index(1), Some(Team::P1));
        assert_eq!(Team::from_index(2), None);
        assert_eq!(Team::P1.index(), 1);
    }

    #[test]
    fn unit_kind_wire_and_capacity() {
        assert_eq!(UnitKind::from_wire(0), Some(UnitKind::Worker));
        assert_eq!(UnitKind::from_wire(1), Some(UnitKind::Cart));
        assert_eq!(UnitKind::from_wire(7), None);
        assert_eq!(UnitKind::Worker.cargo_capacity(), 100);
        assert_eq!(UnitKind::Cart.cargo_capacity(), 2000);
    }

    #[test]
    fn cargo_totals_and_space() {
        let unit = Unit {
            team: Team::P0,
            kind: UnitKind::Worker,
            id: "u_1".to_string(),
            pos: Position::new(0, 0),
            cooldown: 0,
            cargo: Cargo::new(40, 10, 0),
        };
        assert_eq!(unit.cargo.total(), 50);
        assert_eq!(unit.cargo_space_left(), 50);
        assert!(unit.can_act());
    }

    #[test]
    fn unit_on_cooldown_cannot_act() {
        let unit = Unit {
            team: Team::P0,
            kind: UnitKind::Cart,
            id: "u_2".to_string(),
            pos: Position::new(0, 0),
            cooldown: 3,
            cargo: Cargo::default(),
        };
        assert!(!unit.can_act());
    }

    #[test]
    fn city_add_tile_shares_identity() {
        let mut city = City::new(Team::P1, "c_3".to_string(), 120, 23);
        let tile = city.add_tile(Position::new(4, 5), 6);
        assert_eq!(tile.team, Team::P1);
        assert_eq!(tile.city_id, "c_3");
        assert!(!tile.can_act());
        assert_eq!(city.tiles.len(), 1);
    }

    #[test]
    fn research_milestones() {
        let mut player = Player::new(Team::P0);
        assert!(!player.researched_coal());
        player.research_points = 50;
        assert!(player.researched_coal());
        assert!(!player.researched_uranium());
        player.research_points = 200;
        assert!(player.researched_uranium());
    }

    #[test]
    fn reset_keeps_research() {
        let mut player = Player::new(Team::P0);
        player.research_points = 75;
        player.city_tile_count = 4;
        player.reset_entities();
        assert_eq!(player.research_points, 75);
        assert_eq!(player.city_tile_count, 0);
        assert!(player.units.is_empty());
        assert!(player.cities.is_empty());
    }

    #[test]
    fn cooldown_range() {
        assert!(cooldown_in_range(0));
        assert!(cooldown_in_range(10));
        assert!(!cooldown_in_range(-1));
        assert!(!cooldown_in_range(11));
    }
}

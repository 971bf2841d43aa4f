//! Complete game state and the incremental update lifecycle.
//!
//! The engine never resends the full board: after the one-time bootstrap,
//! each turn arrives as a delta applied on top of a freshly cleared grid.
//! `GameState` is the single live instance during replay processing;
//! consumers that need a past turn clone it before the next update.

use crate::protocol::delta::{parse_delta_line, DeltaError, DeltaLine};

use super::map::{GameMap, Resource};
use super::objects::{City, Player, Team, Unit, ALL_TEAMS};
use super::position::Position;

/// One turn's complete game truth.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    /// The player this agent controls; relevant for the live loop only.
    pub assigned: Team,
    /// Turn index. `-1` after bootstrap, incremented by each update.
    pub turn: i32,
    pub width: usize,
    pub height: usize,
    pub map: GameMap,
    pub players: [Player; 2],
}

impl GameState {
    /// Builds the initial state from the two bootstrap lines: the assigned
    /// player index and `"<width> <height>"`. Dimensions are fixed for the
    /// rest of the match.
    pub fn from_bootstrap<S: AsRef<str>>(lines: &[S]) -> Result<GameState, DeltaError> {
        if lines.len() < 2 {
            return Err(DeltaError::TruncatedBootstrap);
        }

        let id_line = lines[0].as_ref().trim();
        let idx = id_line
            .parse::<f64>()
            .map(|v| v as i64)
            .map_err(|_| DeltaError::BadField {
                field: "player id",
                value: id_line.to_string(),
                line: id_line.to_string(),
            })?;
        let assigned = Team::from_index(idx).ok_or_else(|| DeltaError::UnknownTeam {
            team: idx,
            line: id_line.to_string(),
        })?;

        let size_line = lines[1].as_ref();
        let dims: Vec<&str> = size_line.split_whitespace().collect();
        if dims.len() != 2 {
            return Err(DeltaError::TruncatedBootstrap);
        }
        let width = dim_field("width", dims[0], size_line)?;
        let height = dim_field("height", dims[1], size_line)?;

        Ok(GameState {
            assigned,
            turn: -1,
            width,
            height,
            map: GameMap::new(width, height),
            players: [Player::new(Team::P0), Player::new(Team::P1)],
        })
    }

    pub fn player(&self, team: Team) -> &Player {
        &self.players[team.index()]
    }

    /// Applies one turn's update lines. The grid is rebuilt from scratch and
    /// both players' entities are cleared first; research points persist
    /// until overwritten. The turn counter advances by exactly one.
    ///
    /// A malformed line aborts the call, leaving the state partially
    /// rebuilt; the caller decides whether to drop the replay.
    pub fn apply_delta<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<(), DeltaError> {
        self.map = GameMap::new(self.width, self.height);
        for team in ALL_TEAMS {
            self.players[team.index()].reset_entities();
        }
        self.turn += 1;

        for line in lines {
            match parse_delta_line(line.as_ref())? {
                DeltaLine::Done => break,
                DeltaLine::ResearchPoints { team, points } => {
                    self.players[team.index()].research_points = points;
                }
                DeltaLine::SetResource { kind, x, y, amount } => {
                    let (x, y) = self.checked_coords(x, y)?;
                    self.map.cell_mut(x, y).resource = Some(Resource { kind, amount });
                }
                DeltaLine::AddUnit {
                    kind,
                    team,
                    id,
                    x,
                    y,
                    cooldown,
                    cargo,
                } => {
                    let (x, y) = self.checked_coords(x, y)?;
                    self.players[team.index()].units.push(Unit {
                        team,
                        kind,
                        id,
                        pos: Position::new(x as i32, y as i32),
                        cooldown,
                        cargo,
                    });
                }
                DeltaLine::AddCity {
                    team,
                    id,
                    fuel,
                    light_upkeep,
                } => {
                    self.players[team.index()]
                        .cities
                        .insert(id.clone(), City::new(team, id, fuel, light_upkeep));
                }
                DeltaLine::AddCityTile {
                    team,
                    city_id,
                    x,
                    y,
                    cooldown,
                } => {
                    let (x, y) = self.checked_coords(x, y)?;
                    let player = &mut self.players[team.index()];
                    let city = player.cities.get_mut(&city_id).ok_or_else(|| {
                        DeltaError::UnknownCity {
                            city_id: city_id.clone(),
                        }
                    })?;
                    let tile = city.add_tile(Position::new(x as i32, y as i32), cooldown);
                    self.map.cell_mut(x, y).citytile = Some(tile);
                    player.city_tile_count += 1;
                }
                DeltaLine::SetRoad { x, y, level } => {
                    let (x, y) = self.checked_coords(x, y)?;
                    self.map.cell_mut(x, y).road = level;
                }
            }
        }

        Ok(())
    }

    fn checked_coords(&self, x: i64, y: i64) -> Result<(usize, usize), DeltaError> {
        if !self.map.in_bounds(x, y) {
            return Err(DeltaError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok((x as usize, y as usize))
    }
}

fn dim_field(field: &'static str, value: &str, line: &str) -> Result<usize, DeltaError> {
    match value.parse::<usize>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(DeltaError::BadField {
            field,
            value: value.to_string(),
            line: line.to_string(),
        }),
    }
}

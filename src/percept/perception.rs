//! Game state -> fixed-shape input tensor encoding.
//!
//! Produces an 8-scalar status vector and an 8-channel stack of 32x32 f32
//! matrices from one `GameState`, always from one player's perspective.
//! Boards smaller than the maximum are centered with zero padding. Own and
//! enemy entities share each channel through a signed offset: own cells
//! hold `offset + quantity`, enemy cells `-offset - quantity`, empty cells
//! exactly zero, so a single scalar distinguishes absent / own-zero /
//! enemy-zero. The channel layout and offsets are a wire-level contract
//! with trained consumers; changing them invalidates every saved model.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::constants::{MAP_HEIGHT_MAX, MAP_WIDTH_MAX};
use crate::game::map::ResourceKind;
use crate::game::objects::{cooldown_in_range, Player, Team, UnitKind};
use crate::game::position::Position;
use crate::game::state::GameState;

use super::{axis_shift, shifted_cell};

/// Number of scalars in the status vector.
pub const STATUS_LEN: usize = 8;

/// Number of spatial input channels.
pub const PERCEPTION_CHANNELS: usize = 8;

/// Cells per channel in the fixed grid.
pub const PERCEPTION_CELLS: usize = MAP_WIDTH_MAX * MAP_HEIGHT_MAX;

/// Signed offset applied to city-tile fuel values.
pub const CITY_FUEL_OFFSET: f32 = 1.0;

/// Signed offset applied to unit cargo totals.
pub const UNIT_CARGO_OFFSET: f32 = 1.0;

/// Signed offset applied to cooldown values.
pub const COOLDOWN_OFFSET: f32 = 1.0;

/// Status vector slots. Discriminants are the vector indices and are part
/// of the schema contract; never renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum StatusField {
    MapSize = 0,
    Turn = 1,
    OwnResearch = 2,
    OwnResearchedCoal = 3,
    OwnResearchedUranium = 4,
    EnemyResearch = 5,
    EnemyResearchedCoal = 6,
    EnemyResearchedUranium = 7,
}

impl StatusField {
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Spatial input channels. Discriminants are the stack indices and are part
/// of the schema contract; never renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum PerceptionChannel {
    /// Combined own/enemy city-tile fuel (signed offset).
    CityFuel = 0,
    /// Combined own/enemy worker cargo (signed offset, accumulating).
    WorkerCargo = 1,
    /// Combined own/enemy cart cargo (signed offset, accumulating).
    CartCargo = 2,
    /// Raw wood amounts, unsigned.
    RawWood = 3,
    /// Raw coal amounts, unsigned.
    RawCoal = 4,
    /// Raw uranium amounts, unsigned.
    RawUranium = 5,
    /// Road levels, unsigned.
    Road = 6,
    /// Combined own/enemy unit and city-tile cooldowns (signed offset,
    /// accumulating).
    Cooldown = 7,
}

impl PerceptionChannel {
    pub const ALL: [PerceptionChannel; PERCEPTION_CHANNELS] = [
        PerceptionChannel::CityFuel,
        PerceptionChannel::WorkerCargo,
        PerceptionChannel::CartCargo,
        PerceptionChannel::RawWood,
        PerceptionChannel::RawCoal,
        PerceptionChannel::RawUranium,
        PerceptionChannel::Road,
        PerceptionChannel::Cooldown,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Errors raised while encoding a perception.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error(
        "position ({x}, {y}) shifted by ({w_shift}, {h_shift}) leaves the \
         {max_w}x{max_h} grid"
    )]
    OutOfBounds {
        x: i32,
        y: i32,
        w_shift: i32,
        h_shift: i32,
        max_w: usize,
        max_h: usize,
    },

    #[error("cooldown {cooldown} at ({x}, {y}) outside the legal range")]
    CooldownOutOfRange { cooldown: i32, x: i32, y: i32 },
}

/// One turn's fixed-shape encoding, plus the unit-id position map the
/// action codec needs to resolve commands back onto the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perception {
    /// Real board dimensions; the grid itself is always 32x32.
    pub width: usize,
    pub height: usize,
    pub status: [f32; STATUS_LEN],
    /// Channel-major flat buffer, `[channel][x][y]` order.
    pub mats: Vec<f32>,
    /// Unit id -> true board position, both players.
    pub units: HashMap<String, Position>,
}

impl Perception {
    /// Encodes `state` from `own`'s perspective. Pure read; encoding the
    /// same state twice yields bit-identical buffers.
    pub fn from_state(state: &GameState, own: Team) -> Result<Perception, EncodeError> {
        let w_shift = axis_shift(MAP_WIDTH_MAX, state.width);
        let h_shift = axis_shift(MAP_HEIGHT_MAX, state.height);

        let mut perception = Perception {
            width: state.width,
            height: state.height,
            status: [0.0; STATUS_LEN],
            mats: vec![0.0; PERCEPTION_CHANNELS * PERCEPTION_CELLS],
            units: HashMap::new(),
        };

        let own_player = state.player(own);
        let enemy_player = state.player(own.opponent());

        perception.fill_status(state, own_player, enemy_player);
        for (player, enemy) in [(own_player, false), (enemy_player, true)] {
            perception.fill_cities(player, enemy, w_shift, h_shift)?;
            perception.fill_units(player, enemy, w_shift, h_shift)?;
            perception.fill_cooldowns(player, enemy, w_shift, h_shift)?;
        }
        perception.fill_ground(state, w_shift, h_shift)?;
        perception.fill_unit_map(own_player, enemy_player);

        Ok(perception)
    }

    /// Reads one grid value by true board coordinates.
    pub fn value(&self, channel: PerceptionChannel, x: i32, y: i32) -> f32 {
        let w_shift = axis_shift(MAP_WIDTH_MAX, self.width);
        let h_shift = axis_shift(MAP_HEIGHT_MAX, self.height);
        let (gx, gy) = shifted_cell(Position::new(x, y), w_shift, h_shift)
            .expect("coordinate outside the encoded grid");
        self.mats[mat_index(channel, gx, gy)]
    }

    pub fn status_value(&self, field: StatusField) -> f32 {
        self.status[field.index()]
    }

    fn fill_status(&mut self, state: &GameState, own: &Player, enemy: &Player) {
        let status = &mut self.status;
        status[StatusField::MapSize.index()] = state.width as f32;
        status[StatusField::Turn.index()] = state.turn as f32;
        status[StatusField::OwnResearch.index()] = own.research_points as f32;
        status[StatusField::OwnResearchedCoal.index()] = flag(own.researched_coal());
        status[StatusField::OwnResearchedUranium.index()] = flag(own.researched_uranium());
        status[StatusField::EnemyResearch.index()] = enemy.research_points as f32;
        status[StatusField::EnemyResearchedCoal.index()] = flag(enemy.researched_coal());
        status[StatusField::EnemyResearchedUranium.index()] = flag(enemy.researched_uranium());
    }

    /// City tiles carry their city's shared fuel reserve.
    fn fill_cities(
        &mut self,
        player: &Player,
        enemy: bool,
        w_shift: i32,
        h_shift: i32,
    ) -> Result<(), EncodeError> {
        for city in player.cities.values() {
            for tile in &city.tiles {
                let (x, y) = checked_cell(tile.pos, w_shift, h_shift)?;
                self.mats[mat_index(PerceptionChannel::CityFuel, x, y)] =
                    signed(CITY_FUEL_OFFSET, city.fuel as f32, enemy);
            }
        }
        Ok(())
    }

    /// Units accumulate; several units sharing a cell sum their values.
    fn fill_units(
        &mut self,
        player: &Player,
        enemy: bool,
        w_shift: i32,
        h_shift: i32,
    ) -> Result<(), EncodeError> {
        for unit in &player.units {
            let (x, y) = checked_cell(unit.pos, w_shift, h_shift)?;
            let channel = match unit.kind {
                UnitKind::Worker => PerceptionChannel::WorkerCargo,
                UnitKind::Cart => PerceptionChannel::CartCargo,
            };
            self.mats[mat_index(channel, x, y)] +=
                signed(UNIT_CARGO_OFFSET, unit.cargo.total() as f32, enemy);
        }
        Ok(())
    }

    fn fill_cooldowns(
        &mut self,
        player: &Player,
        enemy: bool,
        w_shift: i32,
        h_shift: i32,
    ) -> Result<(), EncodeError> {
        for unit in &player.units {
            self.add_cooldown(unit.pos, unit.cooldown, enemy, w_shift, h_shift)?;
        }
        for city in player.cities.values() {
            for tile in &city.tiles {
                self.add_cooldown(tile.pos, tile.cooldown, enemy, w_shift, h_shift)?;
            }
        }
        Ok(())
    }

    fn add_cooldown(
        &mut self,
        pos: Position,
        cooldown: i32,
        enemy: bool,
        w_shift: i32,
        h_shift: i32,
    ) -> Result<(), EncodeError> {
        if !cooldown_in_range(cooldown) {
            return Err(EncodeError::CooldownOutOfRange {
                cooldown,
                x: pos.x,
                y: pos.y,
            });
        }
        let (x, y) = checked_cell(pos, w_shift, h_shift)?;
        self.mats[mat_index(PerceptionChannel::Cooldown, x, y)] +=
            signed(COOLDOWN_OFFSET, cooldown as f32, enemy);
        Ok(())
    }

    /// Raw resources and roads; neither is owned, so no signed offset.
    fn fill_ground(
        &mut self,
        state: &GameState,
        w_shift: i32,
        h_shift: i32,
    ) -> Result<(), EncodeError> {
        for by in 0..state.height {
            for bx in 0..state.width {
                let cell = state.map.cell(bx, by);
                let pos = Position::new(bx as i32, by as i32);
                let (x, y) = checked_cell(pos, w_shift, h_shift)?;
                // A depleted pile counts as no resource.
                if let Some(resource) = cell.resource.filter(|r| r.amount > 0) {
                    let channel = match resource.kind {
                        ResourceKind::Wood => PerceptionChannel::RawWood,
                        ResourceKind::Coal => PerceptionChannel::RawCoal,
                        ResourceKind::Uranium => PerceptionChannel::RawUranium,
                    };
                    self.mats[mat_index(channel, x, y)] = resource.amount as f32;
                }
                self.mats[mat_index(PerceptionChannel::Road, x, y)] = cell.road as f32;
            }
        }
        Ok(())
    }

    fn fill_unit_map(&mut self, own: &Player, enemy: &Player) {
        for unit in own.units.iter().chain(enemy.units.iter()) {
            self.units.insert(unit.id.clone(), unit.pos);
        }
    }
}

/// Flat index into the channel-major `[channel][x][y]` buffer.
pub(crate) fn mat_index(channel: PerceptionChannel, x: usize, y: usize) -> usize {
    (channel.index() * MAP_WIDTH_MAX + x) * MAP_HEIGHT_MAX + y
}

/// Own values sit above `offset`, enemy values below `-offset`.
fn signed(offset: f32, amount: f32, enemy: bool) -> f32 {
    if enemy {
        -offset - amount
    } else {
        offset + amount
    }
}

fn flag(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn checked_cell(pos: Position, w_shift: i32, h_shift: i32) -> Result<(usize, usize), EncodeError> {
    shifted_cell(pos, w_shift, h_shift).ok_or(EncodeError::OutOfBounds {
        x: pos.x,
        y: pos.y,
        w_shift,
        h_shift,
        max_w: MAP_WIDTH_MAX,
        max_h: MAP_HEIGHT_MAX,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 12x12 board: shifts are (10, 10).
    fn state_12x12(lines: &[&str]) -> GameState {
        let mut state = GameState::from_bootstrap(&["0", "12 12"]).unwrap();
        state.apply_delta(lines).unwrap();
        state
    }

    #[test]
    fn status_vector_fields() {
        let state = state_12x12(&["rp 0 150", "rp 1 60"]);
        let p = Perception::from_state(&state, Team::P0).unwrap();

        assert_eq!(p.status_value(StatusField::MapSize), 12.0);
        assert_eq!(p.status_value(StatusField::Turn), 0.0);
        assert_eq!(p.status_value(StatusField::OwnResearch), 150.0);
        assert_eq!(p.status_value(StatusField::OwnResearchedCoal), 1.0);
        assert_eq!(p.status_value(StatusField::OwnResearchedUranium), 0.0);
        assert_eq!(p.status_value(StatusField::EnemyResearch), 60.0);
        assert_eq!(p.status_value(StatusField::EnemyResearchedCoal), 1.0);
        assert_eq!(p.status_value(StatusField::EnemyResearchedUranium), 0.0);
    }

    #[test]
    fn perspective_swaps_own_and_enemy() {
        let state = state_12x12(&["rp 0 150"]);
        let p = Perception::from_state(&state, Team::P1).unwrap();
        assert_eq!(p.status_value(StatusField::OwnResearch), 0.0);
        assert_eq!(p.status_value(StatusField::EnemyResearch), 150.0);
    }

    #[test]
    fn worker_cargo_cell_and_unit_map() {
        let state = state_12x12(&["u 0 0 u_1 3 4 0 5 0 0"]);
        let p = Perception::from_state(&state, Team::P0).unwrap();

        assert_eq!(
            p.value(PerceptionChannel::WorkerCargo, 3, 4),
            UNIT_CARGO_OFFSET + 5.0
        );
        // The raw buffer cell sits at the shifted coordinates.
        assert_eq!(
            p.mats[mat_index(PerceptionChannel::WorkerCargo, 13, 14)],
            UNIT_CARGO_OFFSET + 5.0
        );
        assert_eq!(p.units["u_1"], Position::new(3, 4));
    }

    #[test]
    fn enemy_unit_is_negative() {
        let state = state_12x12(&["u 1 1 u_2 3 4 0 7 0 0"]);
        let p = Perception::from_state(&state, Team::P0).unwrap();
        assert_eq!(
            p.value(PerceptionChannel::CartCargo, 3, 4),
            -UNIT_CARGO_OFFSET - 7.0
        );
    }

    #[test]
    fn stacked_units_accumulate() {
        let state = state_12x12(&["u 0 0 u_1 3 4 0 5 0 0", "u 0 0 u_2 3 4 0 3 0 0"]);
        let p = Perception::from_state(&state, Team::P0).unwrap();
        assert_eq!(
            p.value(PerceptionChannel::WorkerCargo, 3, 4),
            2.0 * UNIT_CARGO_OFFSET + 8.0
        );
    }

    #[test]
    fn city_fuel_roundtrip() {
        for fuel in [0i64, 100_000] {
            let city = format!("c 0 c_1 {} 18", fuel);
            let enemy_city = format!("c 1 c_2 {} 18", fuel);
            let state = state_12x12(&[
                city.as_str(),
                "ct 0 c_1 2 2 0",
                enemy_city.as_str(),
                "ct 1 c_2 5 5 0",
            ]);
            let p = Perception::from_state(&state, Team::P0).unwrap();

            let own = p.value(PerceptionChannel::CityFuel, 2, 2);
            let enemy = p.value(PerceptionChannel::CityFuel, 5, 5);
            assert_eq!(own, CITY_FUEL_OFFSET + fuel as f32);
            assert_eq!(enemy, -CITY_FUEL_OFFSET - fuel as f32);
            // Decoding recovers the fuel exactly.
            assert_eq!(own - CITY_FUEL_OFFSET, fuel as f32);
            assert_eq!(-enemy - CITY_FUEL_OFFSET, fuel as f32);
        }
    }

    #[test]
    fn ground_channels_are_unsigned() {
        let state = state_12x12(&[
            "r wood 1 1 400",
            "r coal 2 2 50",
            "r uranium 3 3 30",
            "ccd 4 4 6",
        ]);
        let p = Perception::from_state(&state, Team::P1).unwrap();
        assert_eq!(p.value(PerceptionChannel::RawWood, 1, 1), 400.0);
        assert_eq!(p.value(PerceptionChannel::RawCoal, 2, 2), 50.0);
        assert_eq!(p.value(PerceptionChannel::RawUranium, 3, 3), 30.0);
        assert_eq!(p.value(PerceptionChannel::Road, 4, 4), 6.0);
    }

    #[test]
    fn depleted_resource_is_absent() {
        let state = state_12x12(&["r wood 1 1 0"]);
        let p = Perception::from_state(&state, Team::P0).unwrap();
        assert_eq!(p.value(PerceptionChannel::RawWood, 1, 1), 0.0);
    }

    #[test]
    fn cooldown_accumulates_units_and_tiles() {
        let state = state_12x12(&[
            "u 0 0 u_1 2 2 2 0 0 0",
            "c 0 c_1 10 5",
            "ct 0 c_1 2 2 4",
            "u 1 1 u_9 7 7 3 0 0 0",
        ]);
        let p = Perception::from_state(&state, Team::P0).unwrap();
        // Own unit (offset+2) stacked with own city tile (offset+4).
        assert_eq!(
            p.value(PerceptionChannel::Cooldown, 2, 2),
            2.0 * COOLDOWN_OFFSET + 6.0
        );
        assert_eq!(
            p.value(PerceptionChannel::Cooldown, 7, 7),
            -COOLDOWN_OFFSET - 3.0
        );
    }

    #[test]
    fn cooldown_out_of_range_fails() {
        let state = state_12x12(&["u 0 0 u_1 2 2 11 0 0 0"]);
        let err = Perception::from_state(&state, Team::P0).unwrap_err();
        assert_eq!(
            err,
            EncodeError::CooldownOutOfRange {
                cooldown: 11,
                x: 2,
                y: 2,
            }
        );
    }

    #[test]
    fn oversized_board_fails() {
        let mut state = GameState::from_bootstrap(&["0", "33 33"]).unwrap();
        state.apply_delta(&["u 0 0 u_1 32 0 0 0 0 0"]).unwrap();
        let err = Perception::from_state(&state, Team::P0).unwrap_err();
        assert!(matches!(err, EncodeError::OutOfBounds { x: 32, .. }));
    }

    #[test]
    fn all_writes_stay_in_bounds_for_legal_sizes() {
        for size in [12usize, 16, 24, 32] {
            let boot = format!("{} {}", size, size);
            let mut state = GameState::from_bootstrap(&["0", boot.as_str()]).unwrap();
            let corner = size as i64 - 1;
            state
                .apply_delta(&[
                    format!("u 0 0 u_1 {} {} 0 0 0 0", corner, corner),
                    "u 1 0 u_2 0 0 0 0 0 0".to_string(),
                    format!("r wood {} 0 100", corner),
                ])
                .unwrap();
            assert!(Perception::from_state(&state, Team::P0).is_ok());
        }
    }

    #[test]
    fn empty_cells_are_exactly_zero() {
        let state = state_12x12(&["u 0 0 u_1 3 4 0 5 0 0"]);
        let p = Perception::from_state(&state, Team::P0).unwrap();
        // The unit touches its cargo cell and its cooldown cell.
        let touched = [
            mat_index(PerceptionChannel::WorkerCargo, 13, 14),
            mat_index(PerceptionChannel::Cooldown, 13, 14),
        ];
        assert_eq!(p.mats[touched[1]], COOLDOWN_OFFSET);
        for (i, v) in p.mats.iter().enumerate() {
            if !touched.contains(&i) {
                assert_eq!(*v, 0.0, "cell {} should be zero", i);
            }
        }
    }

    #[test]
    fn encoding_is_idempotent() {
        let state = state_12x12(&[
            "rp 0 55",
            "u 0 0 u_1 3 4 1 5 0 0",
            "c 1 c_2 321 18",
            "ct 1 c_2 9 9 6",
            "r uranium 6 6 42",
            "ccd 3 4 2",
        ]);
        let a = Perception::from_state(&state, Team::P0).unwrap();
        let b = Perception::from_state(&state, Team::P0).unwrap();
        assert_eq!(a, b);
    }
}

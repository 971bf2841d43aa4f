//! Engine commands <-> fixed-shape output tensor codec.
//!
//! One turn of one player's commands becomes a 10-channel stack of 32x32
//! f32 matrices, spatially aligned with the perception grid (same centering
//! shift). Each cell of each channel counts how often an entity at that
//! position issued that action. Decoding picks at most one city-tile and
//! one unit action per cell by argmax, with a fixed channel-priority
//! tie-break, and resolves unit actions back to ids through a reverse
//! position lookup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::constants::{MAP_HEIGHT_MAX, MAP_WIDTH_MAX};
use crate::game::position::{Direction, Position};
use crate::protocol::command::{parse_command, Command, CommandError};

use super::{axis_shift, shifted_cell};

/// Number of spatial output channels.
pub const ACTION_CHANNELS: usize = 10;

/// Cells per channel in the fixed grid.
pub const ACTION_CELLS: usize = MAP_WIDTH_MAX * MAP_HEIGHT_MAX;

/// Minimum argmax score for a cell to emit a command when decoding.
/// Recorded counts are 0 or 1; a winner must clearly beat an empty cell.
pub const MIN_SCORE: f32 = 0.5;

/// Spatial output channels. Discriminants are the stack indices and are
/// part of the schema contract; never renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum ActionChannel {
    CityResearch = 0,
    CityBuildWorker = 1,
    CityBuildCart = 2,
    UnitMoveNorth = 3,
    UnitMoveEast = 4,
    UnitMoveSouth = 5,
    UnitMoveWest = 6,
    UnitTransfer = 7,
    UnitBuildCity = 8,
    UnitPillage = 9,
}

impl ActionChannel {
    pub const ALL: [ActionChannel; ACTION_CHANNELS] = [
        ActionChannel::CityResearch,
        ActionChannel::CityBuildWorker,
        ActionChannel::CityBuildCart,
        ActionChannel::UnitMoveNorth,
        ActionChannel::UnitMoveEast,
        ActionChannel::UnitMoveSouth,
        ActionChannel::UnitMoveWest,
        ActionChannel::UnitTransfer,
        ActionChannel::UnitBuildCity,
        ActionChannel::UnitPillage,
    ];

    /// City-tile channels in decode priority order.
    pub const CITY: [ActionChannel; 3] = [
        ActionChannel::CityResearch,
        ActionChannel::CityBuildWorker,
        ActionChannel::CityBuildCart,
    ];

    /// Unit channels in decode priority order.
    pub const UNIT: [ActionChannel; 7] = [
        ActionChannel::UnitMoveNorth,
        ActionChannel::UnitMoveEast,
        ActionChannel::UnitMoveSouth,
        ActionChannel::UnitMoveWest,
        ActionChannel::UnitTransfer,
        ActionChannel::UnitBuildCity,
        ActionChannel::UnitPillage,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Errors raised by the command <-> tensor codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("board {width}x{height} exceeds the {max_w}x{max_h} grid")]
    BoardTooLarge {
        width: usize,
        height: usize,
        max_w: usize,
        max_h: usize,
    },

    #[error("command references unit '{unit}' missing from the position map")]
    UnknownUnit { unit: String },

    #[error("transfer from '{src}' to '{dst}' is not representable in the channel set")]
    UnsupportedTransfer { src: String, dst: String },

    #[error("winning transfer score at ({x}, {y}) cannot be decoded into a command")]
    UndecodableTransfer { x: i32, y: i32 },

    #[error("winning {channel:?} score at ({x}, {y}) has no resident unit")]
    NoUnitAtCell {
        channel: ActionChannel,
        x: i32,
        y: i32,
    },

    #[error("position ({x}, {y}) shifted by ({w_shift}, {h_shift}) leaves the grid")]
    OutOfBounds {
        x: i32,
        y: i32,
        w_shift: i32,
        h_shift: i32,
    },
}

/// One turn of one player's actions in tensor form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Real board dimensions; the grid itself is always 32x32.
    pub width: usize,
    pub height: usize,
    /// Channel-major flat buffer, `[channel][x][y]` order.
    pub mats: Vec<f32>,
}

impl Action {
    /// An all-zero action grid for a board of the given size.
    pub fn new(width: usize, height: usize) -> Result<Action, ActionError> {
        if width > MAP_WIDTH_MAX || height > MAP_HEIGHT_MAX {
            return Err(ActionError::BoardTooLarge {
                width,
                height,
                max_w: MAP_WIDTH_MAX,
                max_h: MAP_HEIGHT_MAX,
            });
        }
        Ok(Action {
            width,
            height,
            mats: vec![0.0; ACTION_CHANNELS * ACTION_CELLS],
        })
    }

    /// Parses one turn's command lines into a fresh grid. `units` maps unit
    /// ids to true board positions (the perception side output for the same
    /// turn). A dangling unit id is fatal for the turn: it signals an
    /// upstream alignment bug, never something to absorb silently.
    pub fn from_commands<S: AsRef<str>>(
        width: usize,
        height: usize,
        units: &HashMap<String, Position>,
        lines: &[S],
    ) -> Result<Action, ActionError> {
        let mut action = Action::new(width, height)?;
        for line in lines {
            if let Some(command) = parse_command(line.as_ref())? {
                action.record(units, &command)?;
            }
        }
        Ok(action)
    }

    /// Accumulates a single command into the grid.
    pub fn record(
        &mut self,
        units: &HashMap<String, Position>,
        command: &Command,
    ) -> Result<(), ActionError> {
        match command {
            Command::Research { x, y } => self.add(ActionChannel::CityResearch, *x, *y),
            Command::BuildWorker { x, y } => self.add(ActionChannel::CityBuildWorker, *x, *y),
            Command::BuildCart { x, y } => self.add(ActionChannel::CityBuildCart, *x, *y),
            Command::Move { unit, direction } => {
                let pos = self.resolve(units, unit)?;
                match move_channel(*direction) {
                    Some(channel) => self.add(channel, pos.x, pos.y),
                    // A centering move is a legal stand-still, not an error.
                    None => Ok(()),
                }
            }
            Command::Transfer { src, dst, .. } => Err(ActionError::UnsupportedTransfer {
                src: src.clone(),
                dst: dst.clone(),
            }),
            Command::BuildCity { unit } => {
                let pos = self.resolve(units, unit)?;
                self.add(ActionChannel::UnitBuildCity, pos.x, pos.y)
            }
            Command::Pillage { unit } => {
                let pos = self.resolve(units, unit)?;
                self.add(ActionChannel::UnitPillage, pos.x, pos.y)
            }
        }
    }

    /// Decodes the grid back into commands. For every board cell, the
    /// city-tile channels and the unit channels each contribute at most one
    /// command: the argmax channel, if its score clears `MIN_SCORE`. Equal
    /// scores resolve to the earlier channel in the fixed priority order.
    /// Unit actions are resolved through a reverse position lookup built
    /// from `units`; when several units share a cell the smallest id wins.
    pub fn translate(
        &self,
        units: &HashMap<String, Position>,
    ) -> Result<Vec<Command>, ActionError> {
        let mut by_pos: HashMap<Position, &String> = HashMap::new();
        let mut sorted: Vec<(&String, &Position)> = units.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        for (id, pos) in sorted {
            by_pos.entry(*pos).or_insert(id);
        }

        let mut commands = Vec::new();
        for x in 0..self.width as i32 {
            for y in 0..self.height as i32 {
                let (city_channel, city_score) = self.argmax(&ActionChannel::CITY, x, y);
                if city_score > MIN_SCORE {
                    commands.push(match city_channel {
                        ActionChannel::CityResearch => Command::Research { x, y },
                        ActionChannel::CityBuildWorker => Command::BuildWorker { x, y },
                        _ => Command::BuildCart { x, y },
                    });
                }

                let (unit_channel, unit_score) = self.argmax(&ActionChannel::UNIT, x, y);
                if unit_score > MIN_SCORE {
                    let unit = by_pos.get(&Position::new(x, y)).copied().ok_or(
                        ActionError::NoUnitAtCell {
                            channel: unit_channel,
                            x,
                            y,
                        },
                    )?;
                    commands.push(self.unit_command(unit_channel, unit, x, y)?);
                }
            }
        }
        Ok(commands)
    }

    /// Reads one grid value by true board coordinates.
    pub fn value(&self, channel: ActionChannel, x: i32, y: i32) -> f32 {
        let (gx, gy) = self
            .shifted(x, y)
            .expect("coordinate outside the encoded grid");
        self.mats[mat_index(channel, gx, gy)]
    }

    /// Per-channel sums over the whole grid; the diagnostic tally input.
    pub fn channel_totals(&self) -> [f32; ACTION_CHANNELS] {
        let mut totals = [0.0; ACTION_CHANNELS];
        for channel in ActionChannel::ALL {
            let base = channel.index() * ACTION_CELLS;
            totals[channel.index()] = self.mats[base..base + ACTION_CELLS].iter().sum();
        }
        totals
    }

    fn resolve<'a>(
        &self,
        units: &'a HashMap<String, Position>,
        unit: &str,
    ) -> Result<&'a Position, ActionError> {
        units.get(unit).ok_or_else(|| ActionError::UnknownUnit {
            unit: unit.to_string(),
        })
    }

    fn add(&mut self, channel: ActionChannel, x: i32, y: i32) -> Result<(), ActionError> {
        let (gx, gy) = self.shifted(x, y).ok_or(ActionError::OutOfBounds {
            x,
            y,
            w_shift: self.w_shift(),
            h_shift: self.h_shift(),
        })?;
        self.mats[mat_index(channel, gx, gy)] += 1.0;
        Ok(())
    }

    /// First-seen-wins argmax over the given channels at a cell.
    fn argmax(&self, channels: &[ActionChannel], x: i32, y: i32) -> (ActionChannel, f32) {
        let mut best = channels[0];
        let mut best_score = self.value(best, x, y);
        for &channel in &channels[1..] {
            let score = self.value(channel, x, y);
            if score > best_score {
                best = channel;
                best_score = score;
            }
        }
        (best, best_score)
    }

    fn unit_command(
        &self,
        channel: ActionChannel,
        unit: &str,
        x: i32,
        y: i32,
    ) -> Result<Command, ActionError> {
        let unit = unit.to_string();
        let command = match channel {
            ActionChannel::UnitMoveNorth => Command::Move {
                unit,
                direction: Direction::North,
            },
            ActionChannel::UnitMoveEast => Command::Move {
                unit,
                direction: Direction::East,
            },
            ActionChannel::UnitMoveSouth => Command::Move {
                unit,
                direction: Direction::South,
            },
            ActionChannel::UnitMoveWest => Command::Move {
                unit,
                direction: Direction::West,
            },
            ActionChannel::UnitBuildCity => Command::BuildCity { unit },
            ActionChannel::UnitPillage => Command::Pillage { unit },
            _ => return Err(ActionError::UndecodableTransfer { x, y }),
        };
        Ok(command)
    }

    fn w_shift(&self) -> i32 {
        axis_shift(MAP_WIDTH_MAX, self.width)
    }

    fn h_shift(&self) -> i32 {
        axis_shift(MAP_HEIGHT_MAX, self.height)
    }

    fn shifted(&self, x: i32, y: i32) -> Option<(usize, usize)> {
        shifted_cell(Position::new(x, y), self.w_shift(), self.h_shift())
    }
}

/// Flat index into the channel-major `[channel][x][y]` buffer.
fn mat_index(channel: ActionChannel, x: usize, y: usize) -> usize {
    (channel.index() * MAP_WIDTH_MAX + x) * MAP_HEIGHT_MAX + y
}

/// Maps a movement direction to its channel; `Center` has none.
fn move_channel(direction: Direction) -> Option<ActionChannel> {
    match direction {
        Direction::North => Some(ActionChannel::UnitMoveNorth),
        Direction::East => Some(ActionChannel::UnitMoveEast),
        Direction::South => Some(ActionChannel::UnitMoveSouth),
        Direction::West => Some(ActionChannel::UnitMoveWest),
        Direction::Center => None,
    }
}

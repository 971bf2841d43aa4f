//! Fixed-shape tensor codecs for learned consumers.
//!
//! `perception` encodes one turn of game truth into the 8-channel input
//! stack plus status vector; `action` maps engine commands to and from the
//! 10-channel output stack. Both center the real board inside the maximum
//! 32x32 grid with the same padding shift, so input and output stay
//! spatially aligned.

pub mod action;
pub mod perception;

pub use action::{Action, ActionChannel, ActionError, ACTION_CHANNELS, MIN_SCORE};
pub use perception::{
    EncodeError, Perception, PerceptionChannel, StatusField, CITY_FUEL_OFFSET, COOLDOWN_OFFSET,
    PERCEPTION_CHANNELS, STATUS_LEN, UNIT_CARGO_OFFSET,
};

use crate::game::constants::{MAP_HEIGHT_MAX, MAP_WIDTH_MAX};
use crate::game::position::Position;

/// Padding shift that centers an `actual`-wide axis inside the `max` grid.
/// Truncating division biases odd padding toward the low-index side; this
/// matches the reference encoding and must not change.
pub(crate) fn axis_shift(max: usize, actual: usize) -> i32 {
    (max as i32 - actual as i32) / 2
}

/// Applies the centering shift, returning grid indices or `None` when the
/// shifted coordinate leaves the maximum grid.
pub(crate) fn shifted_cell(pos: Position, w_shift: i32, h_shift: i32) -> Option<(usize, usize)> {
    let x = pos.x + w_shift;
    let y = pos.y + h_shift;
    if x < 0 || y < 0 || x >= MAP_WIDTH_MAX as i32 || y >= MAP_HEIGHT_MAX as i32 {
        return None;
    }
    Some((x as usize, y as usize))
}

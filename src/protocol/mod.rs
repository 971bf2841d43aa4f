//! Wire grammars shared with the game engine.
//!
//! `delta` is the engine-to-agent half (state updates), `command` the
//! agent-to-engine half (actions). Both are closed token grammars with
//! strict errors; the live stdin/stdout loop that carries them is outside
//! this crate.

pub mod command;
pub mod delta;

pub use command::{
    format_command, format_commands, parse_command, Command, CommandError, COMMAND_SEPARATOR,
    TURN_TERMINATOR,
};
pub use delta::{parse_delta_line, DeltaError, DeltaLine, DELTA_TERMINATOR};

//! Engine action ("command") line grammar.
//!
//! Commands are the agent-to-engine half of the wire protocol: one
//! space-tokenized line per action, joined with `,` on emission and closed
//! with the end-of-turn sentinel. `parse_command` and `format_command` are
//! exact inverses for every valid command.

use std::fmt;

use thiserror::Error;

use crate::game::map::ResourceKind;
use crate::game::position::Direction;

/// Line that signals the end of the agent's turn to the engine.
pub const TURN_TERMINATOR: &str = "D_FINISH";

/// Separator used when emitting several commands as one message.
pub const COMMAND_SEPARATOR: &str = ",";

const HEADER_RESEARCH: &str = "r";
const HEADER_BUILD_WORKER: &str = "bw";
const HEADER_BUILD_CART: &str = "bc";
const HEADER_MOVE: &str = "m";
const HEADER_TRANSFER: &str = "t";
const HEADER_BUILD_CITY: &str = "bcity";
const HEADER_PILLAGE: &str = "p";

/// Errors raised while parsing a command line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{header}' in line '{line}'")]
    UnknownCommand { header: String, line: String },

    #[error("'{header}' takes {expected} fields, got {got}: '{line}'")]
    WrongArity {
        header: &'static str,
        expected: usize,
        got: usize,
        line: String,
    },

    #[error("invalid {field} '{value}' in line '{line}'")]
    BadField {
        field: &'static str,
        value: String,
        line: String,
    },

    #[error("unknown direction '{value}' in line '{line}'")]
    UnknownDirection { value: String, line: String },

    #[error("unknown resource kind '{value}' in line '{line}'")]
    UnknownResource { value: String, line: String },
}

/// One parsed engine command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// City tile at (x, y) researches.
    Research { x: i32, y: i32 },
    /// City tile at (x, y) builds a worker.
    BuildWorker { x: i32, y: i32 },
    /// City tile at (x, y) builds a cart.
    BuildCart { x: i32, y: i32 },
    /// Unit moves one step; `Center` is a stand-still.
    Move { unit: String, direction: Direction },
    /// Unit hands resources to an adjacent unit.
    Transfer {
        src: String,
        dst: String,
        kind: ResourceKind,
        amount: u32,
    },
    /// Worker builds a city tile underneath itself.
    BuildCity { unit: String },
    /// Worker pillages the road underneath itself.
    Pillage { unit: String },
}

/// Parses a single command line. Empty lines are a valid no-op (`None`).
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let header = match tokens.first() {
        Some(h) => *h,
        None => return Ok(None),
    };

    let command = match header {
        HEADER_RESEARCH => {
            check_arity(HEADER_RESEARCH, 2, &tokens, line)?;
            Command::Research {
                x: coord_field("x", tokens[1], line)?,
                y: coord_field("y", tokens[2], line)?,
            }
        }
        HEADER_BUILD_WORKER => {
            check_arity(HEADER_BUILD_WORKER, 2, &tokens, line)?;
            Command::BuildWorker {
                x: coord_field("x", tokens[1], line)?,
                y: coord_field("y", tokens[2], line)?,
            }
        }
        HEADER_BUILD_CART => {
            check_arity(HEADER_BUILD_CART, 2, &tokens, line)?;
            Command::BuildCart {
                x: coord_field("x", tokens[1], line)?,
                y: coord_field("y", tokens[2], line)?,
            }
        }
        HEADER_MOVE => {
            check_arity(HEADER_MOVE, 2, &tokens, line)?;
            let direction = parse_direction(tokens[2], line)?;
            Command::Move {
                unit: tokens[1].to_string(),
                direction,
            }
        }
        HEADER_TRANSFER => {
            check_arity(HEADER_TRANSFER, 4, &tokens, line)?;
            let kind = ResourceKind::from_wire_name(tokens[3]).ok_or_else(|| {
                CommandError::UnknownResource {
                    value: tokens[3].to_string(),
                    line: line.to_string(),
                }
            })?;
            let amount = tokens[4]
                .parse::<u32>()
                .map_err(|_| CommandError::BadField {
                    field: "amount",
                    value: tokens[4].to_string(),
                    line: line.to_string(),
                })?;
            Command::Transfer {
                src: tokens[1].to_string(),
                dst: tokens[2].to_string(),
                kind,
                amount,
            }
        }
        HEADER_BUILD_CITY => {
            check_arity(HEADER_BUILD_CITY, 1, &tokens, line)?;
            Command::BuildCity {
                unit: tokens[1].to_string(),
            }
        }
        HEADER_PILLAGE => {
            check_arity(HEADER_PILLAGE, 1, &tokens, line)?;
            Command::Pillage {
                unit: tokens[1].to_string(),
            }
        }
        other => {
            return Err(CommandError::UnknownCommand {
                header: other.to_string(),
                line: line.to_string(),
            })
        }
    };

    Ok(Some(command))
}

/// Formats a command as its canonical wire line.
pub fn format_command(command: &Command) -> String {
    match command {
        Command::Research { x, y } => format!("{} {} {}", HEADER_RESEARCH, x, y),
        Command::BuildWorker { x, y } => format!("{} {} {}", HEADER_BUILD_WORKER, x, y),
        Command::BuildCart { x, y } => format!("{} {} {}", HEADER_BUILD_CART, x, y),
        Command::Move { unit, direction } => {
            format!("{} {} {}", HEADER_MOVE, unit, direction.wire_char())
        }
        Command::Transfer {
            src,
            dst,
            kind,
            amount,
        } => format!(
            "{} {} {} {} {}",
            HEADER_TRANSFER,
            src,
            dst,
            kind.wire_name(),
            amount
        ),
        Command::BuildCity { unit } => format!("{} {}", HEADER_BUILD_CITY, unit),
        Command::Pillage { unit } => format!("{} {}", HEADER_PILLAGE, unit),
    }
}

/// Joins commands into the single message emitted to the engine.
pub fn format_commands(commands: &[Command]) -> String {
    commands
        .iter()
        .map(format_command)
        .collect::<Vec<_>>()
        .join(COMMAND_SEPARATOR)
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_command(self))
    }
}

fn check_arity(
    header: &'static str,
    expected: usize,
    tokens: &[&str],
    line: &str,
) -> Result<(), CommandError> {
    let got = tokens.len() - 1;
    if got != expected {
        return Err(CommandError::WrongArity {
            header,
            expected,
            got,
            line: line.to_string(),
        });
    }
    Ok(())
}

fn coord_field(field: &'static str, value: &str, line: &str) -> Result<i32, CommandError> {
    value.parse::<i32>().map_err(|_| CommandError::BadField {
        field,
        value: value.to_string(),
        line: line.to_string(),
    })
}

fn parse_direction(value: &str, line: &str) -> Result<Direction, CommandError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => {
            Direction::from_wire_char(c).ok_or_else(|| CommandError::UnknownDirection {
                value: value.to_string(),
                line: line.to_string(),
            })
        }
        _ => Err(CommandError::UnknownDirection {
            value: value.to_string(),
            line: line.to_string(),
        }),
    }
}

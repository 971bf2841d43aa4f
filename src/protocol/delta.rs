//! Engine state-update ("delta") line grammar.
//!
//! Each turn the engine describes the new board as a list of space-tokenized
//! lines, each a delta entry applied on top of a freshly cleared grid. The
//! grammar is a closed set of headers; anything else is a parse error. The
//! terminator line ends an update early without error.
//!
//! Numeric wire fields are decimal floats (the engine emits fractional
//! cooldowns and road levels) truncated toward zero, matching how amounts
//! are interpreted upstream.

use thiserror::Error;

use crate::game::map::ResourceKind;
use crate::game::objects::{Cargo, Team, UnitKind};

/// Line that signals the end of a state update.
pub const DELTA_TERMINATOR: &str = "D_DONE";

const HEADER_RESEARCH_POINTS: &str = "rp";
const HEADER_RESOURCE: &str = "r";
const HEADER_UNIT: &str = "u";
const HEADER_CITY: &str = "c";
const HEADER_CITY_TILE: &str = "ct";
const HEADER_ROAD: &str = "ccd";

/// Errors raised while parsing or applying a state update.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeltaError {
    #[error("unknown update header '{header}' in line '{line}'")]
    UnknownHeader { header: String, line: String },

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

    #[error("unknown team index {team} in line '{line}'")]
    UnknownTeam { team: i64, line: String },

    #[error("unknown resource kind '{kind}' in line '{line}'")]
    UnknownResource { kind: String, line: String },

    #[error("unknown unit kind {kind} in line '{line}'")]
    UnknownUnitKind { kind: i64, line: String },

    #[error("city tile references city '{city_id}' absent from this update")]
    UnknownCity { city_id: String },

    #[error("coordinate ({x}, {y}) outside the {width}x{height} board")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },

    #[error("bootstrap needs a player line and a '<width> <height>' line")]
    TruncatedBootstrap,
}

/// One parsed state-update line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaLine {
    ResearchPoints {
        team: Team,
        points: u32,
    },
    SetResource {
        kind: ResourceKind,
        x: i64,
        y: i64,
        amount: u32,
    },
    AddUnit {
        kind: UnitKind,
        team: Team,
        id: String,
        x: i64,
        y: i64,
        cooldown: i32,
        cargo: Cargo,
    },
    AddCity {
        team: Team,
        id: String,
        fuel: i64,
        light_upkeep: i64,
    },
    AddCityTile {
        team: Team,
        city_id: String,
        x: i64,
        y: i64,
        cooldown: i32,
    },
    SetRoad {
        x: i64,
        y: i64,
        level: u32,
    },
    /// The terminator; processing of the update stops here.
    Done,
}

/// Parses a single state-update line.
pub fn parse_delta_line(line: &str) -> Result<DeltaLine, DeltaError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let header = tokens.first().copied().unwrap_or("");

    if header == DELTA_TERMINATOR {
        return Ok(DeltaLine::Done);
    }

    match header {
        HEADER_RESEARCH_POINTS => {
            check_arity(HEADER_RESEARCH_POINTS, 2, &tokens, line)?;
            Ok(DeltaLine::ResearchPoints {
                team: team_field(tokens[1], line)?,
                points: uint_field("research points", tokens[2], line)?,
            })
        }
        HEADER_RESOURCE => {
            check_arity(HEADER_RESOURCE, 4, &tokens, line)?;
            let kind = ResourceKind::from_wire_name(tokens[1]).ok_or_else(|| {
                DeltaError::UnknownResource {
                    kind: tokens[1].to_string(),
                    line: line.to_string(),
                }
            })?;
            Ok(DeltaLine::SetResource {
                kind,
                x: int_field("x", tokens[2], line)?,
                y: int_field("y", tokens[3], line)?,
                amount: uint_field("amount", tokens[4], line)?,
            })
        }
        HEADER_UNIT => {
            check_arity(HEADER_UNIT, 9, &tokens, line)?;
            let kind_id = int_field("unit kind", tokens[1], line)?;
            let kind =
                UnitKind::from_wire(kind_id).ok_or_else(|| DeltaError::UnknownUnitKind {
                    kind: kind_id,
                    line: line.to_string(),
                })?;
            Ok(DeltaLine::AddUnit {
                kind,
                team: team_field(tokens[2], line)?,
                id: tokens[3].to_string(),
                x: int_field("x", tokens[4], line)?,
                y: int_field("y", tokens[5], line)?,
                cooldown: int_field("cooldown", tokens[6], line)? as i32,
                cargo: Cargo::new(
                    uint_field("wood", tokens[7], line)?,
                    uint_field("coal", tokens[8], line)?,
                    uint_field("uranium", tokens[9], line)?,
                ),
            })
        }
        HEADER_CITY => {
            check_arity(HEADER_CITY, 4, &tokens, line)?;
            Ok(DeltaLine::AddCity {
                team: team_field(tokens[1], line)?,
                id: tokens[2].to_string(),
                fuel: int_field("fuel", tokens[3], line)?,
                light_upkeep: int_field("light upkeep", tokens[4], line)?,
            })
        }
        HEADER_CITY_TILE => {
            check_arity(HEADER_CITY_TILE, 5, &tokens, line)?;
            Ok(DeltaLine::AddCityTile {
                team: team_field(tokens[1], line)?,
                city_id: tokens[2].to_string(),
                x: int_field("x", tokens[3], line)?,
                y: int_field("y", tokens[4], line)?,
                cooldown: int_field("cooldown", tokens[5], line)? as i32,
            })
        }
        HEADER_ROAD => {
            check_arity(HEADER_ROAD, 3, &tokens, line)?;
            Ok(DeltaLine::SetRoad {
                x: int_field("x", tokens[1], line)?,
                y: int_field("y", tokens[2], line)?,
                level: uint_field("road level", tokens[3], line)?,
            })
        }
        other => Err(DeltaError::UnknownHeader {
            header: other.to_string(),
            line: line.to_string(),
        }),
    }
}

fn check_arity(
    header: &'static str,
    expected: usize,
    tokens: &[&str],
    line: &str,
) -> Result<(), DeltaError> {
    let got = tokens.len() - 1;
    if got != expected {
        return Err(DeltaError::WrongArity {
            header,
            expected,
            got,
            line: line.to_string(),
        });
    }
    Ok(())
}

/// Parses a decimal field, truncating any fractional part toward zero.
fn int_field(field: &'static str, value: &str, line: &str) -> Result<i64, DeltaError> {
    value
        .parse::<f64>()
        .map(|v| v as i64)
        .map_err(|_| DeltaError::BadField {
            field,
            value: value.to_string(),
            line: line.to_string(),
        })
}

/// Like `int_field`, but rejects negative values.
fn uint_field(field: &'static str, value: &str, line: &str) -> Result<u32, DeltaError> {
    let v = int_field(field, value, line)?;
    u32::try_from(v).map_err(|_| DeltaError::BadField {
        field,
        value: value.to_string(),
        line: line.to_string(),
    })
}

fn team_field(value: &str, line: &str) -> Result<Team, DeltaError> {
    let idx = int_field("team", value, line)?;
    Team::from_index(idx).ok_or_else(|| DeltaError::UnknownTeam {
        team: idx,
        line: line.to_string(),
    })
}

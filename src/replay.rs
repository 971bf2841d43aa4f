//! Match-log loading and replay-to-training-data extraction.
//!
//! A recorded match is a JSON log with one entry per step and player:
//! status, observation (the raw delta lines live in player 0's entry), and
//! the command lines the player issued. Extraction replays the deltas
//! through a single live `GameState`, snapshots every turn, encodes each
//! snapshot as a `Perception`, and pairs it with the commands that were
//! issued *after* observing it: the commands recorded at step T are the
//! ones that produced step T, so the first recorded command list is
//! discarded and `actions[team][i]` transforms `perceptions[i]` into
//! `perceptions[i + 1]`. Any count that disagrees with the step count is a
//! fatal inconsistency for the whole replay.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::objects::Team;
use crate::game::state::GameState;
use crate::percept::action::{Action, ActionError, ACTION_CHANNELS};
use crate::percept::perception::{EncodeError, Perception};
use crate::protocol::delta::DeltaError;

/// Step status of a player still playing.
pub const STATUS_ACTIVE: &str = "ACTIVE";

/// Step status of a player whose game just ended.
pub const STATUS_DONE: &str = "DONE";

/// Errors raised while loading or extracting a replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read {path}: {source}")]
    Storage {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse replay JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("replay contains no steps")]
    EmptyReplay,

    #[error("step {step} has no record for player {team}")]
    MissingRecord { team: usize, step: usize },

    #[error("first active observation is step {step}, expected the bootstrap step 0")]
    MissingBootstrap { step: i64 },

    #[error("turn {turn}: {source}")]
    Delta { turn: usize, source: DeltaError },

    #[error("turn {turn}: {source}")]
    Encode { turn: usize, source: EncodeError },

    #[error("team {team} turn {turn}: {source}")]
    Action {
        team: usize,
        turn: usize,
        source: ActionError,
    },

    #[error("team {team}: expected {expected} command lists, parsed {got}")]
    TurnMisalignment {
        team: usize,
        expected: usize,
        got: usize,
    },

    #[error("expected {expected} perceptions, built {got}")]
    PerceptionCount { expected: usize, got: usize },
}

/// Optional descriptive metadata carried by the log.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplayInfo {
    #[serde(rename = "EpisodeId", default)]
    pub episode_id: Option<i64>,
    #[serde(rename = "TeamNames", default)]
    pub team_names: Vec<String>,
}

/// One player's view of one step.
#[derive(Debug, Clone, Deserialize)]
pub struct Observation {
    #[serde(default)]
    pub player: usize,
    #[serde(default)]
    pub step: i64,
    /// Delta lines; populated on player 0's record only.
    #[serde(default)]
    pub updates: Vec<String>,
}

/// One player's record for one step.
#[derive(Debug, Clone, Deserialize)]
pub struct StepRecord {
    pub status: String,
    pub observation: Observation,
    /// Commands this player issued; these produced *this* step's state.
    #[serde(default)]
    pub action: Option<Vec<String>>,
}

/// A loaded match log.
#[derive(Debug, Clone, Deserialize)]
pub struct Replay {
    #[serde(default)]
    pub rewards: Vec<Option<f64>>,
    pub steps: Vec<Vec<StepRecord>>,
    #[serde(default)]
    pub info: ReplayInfo,
}

/// The aligned output of one replay: perceptions from the canonical
/// player's perspective, per-team action grids, and per-team channel
/// tallies (diagnostics only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSequence {
    pub perceptions: Vec<Perception>,
    pub actions: [Vec<Action>; 2],
    pub tallies: [[f32; ACTION_CHANNELS]; 2],
}

impl Replay {
    /// Loads and parses a replay log from disk.
    pub fn load(path: &Path) -> Result<Replay, ReplayError> {
        let data = fs::read_to_string(path).map_err(|source| ReplayError::Storage {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Parses a replay log from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Replay, ReplayError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The player whose perspective the perception sequence uses: the one
    /// with the highest recorded reward (missing rewards count as zero,
    /// ties go to player 0).
    pub fn canonical_team(&self) -> Team {
        let p0 = self.reward(0);
        let p1 = self.reward(1);
        if p1 > p0 {
            Team::P1
        } else {
            Team::P0
        }
    }

    fn reward(&self, team: usize) -> f64 {
        self.rewards
            .get(team)
            .copied()
            .flatten()
            .unwrap_or(0.0)
    }

    /// Rebuilds the per-turn board snapshots by replaying the delta lines
    /// through one live state, cloning after every update so earlier
    /// snapshots can never observe later mutation.
    pub fn game_states(&self) -> Result<Vec<GameState>, ReplayError> {
        if self.steps.is_empty() {
            return Err(ReplayError::EmptyReplay);
        }
        let canonical = self.canonical_team();

        let mut states: Vec<GameState> = Vec::new();
        let mut live: Option<GameState> = None;
        for observation in self.observations(canonical.index())? {
            let state = match live.take() {
                None => {
                    if observation.step != 0 {
                        return Err(ReplayError::MissingBootstrap {
                            step: observation.step,
                        });
                    }
                    if observation.updates.len() < 2 {
                        return Err(ReplayError::Delta {
                            turn: 0,
                            source: DeltaError::TruncatedBootstrap,
                        });
                    }
                    let mut state = GameState::from_bootstrap(&observation.updates[..2])
                        .map_err(|source| ReplayError::Delta { turn: 0, source })?;
                    state
                        .apply_delta(&observation.updates[2..])
                        .map_err(|source| ReplayError::Delta { turn: 0, source })?;
                    state
                }
                Some(mut state) => {
                    state
                        .apply_delta(&observation.updates)
                        .map_err(|source| ReplayError::Delta {
                            turn: states.len(),
                            source,
                        })?;
                    state
                }
            };
            states.push(state.clone());
            live = Some(state);
        }
        Ok(states)
    }

    /// Extracts the full aligned training sequence.
    pub fn to_training(&self) -> Result<TrainingSequence, ReplayError> {
        let canonical = self.canonical_team();
        let states = self.game_states()?;

        let expected = self.steps.len() - 1;
        if states.len() != expected {
            return Err(ReplayError::PerceptionCount {
                expected,
                got: states.len(),
            });
        }

        let mut perceptions = Vec::with_capacity(states.len());
        for (turn, state) in states.iter().enumerate() {
            let perception = Perception::from_state(state, canonical)
                .map_err(|source| ReplayError::Encode { turn, source })?;
            perceptions.push(perception);
        }

        let mut actions: [Vec<Action>; 2] = [Vec::new(), Vec::new()];
        let mut tallies = [[0.0f32; ACTION_CHANNELS]; 2];
        for team in 0..2 {
            let mut command_lists = self.team_commands(team)?;
            if command_lists.len() != self.steps.len() {
                return Err(ReplayError::TurnMisalignment {
                    team,
                    expected: self.steps.len(),
                    got: command_lists.len(),
                });
            }
            // The step-0 commands produced the bootstrap state itself.
            command_lists.remove(0);
            if command_lists.len() != perceptions.len() {
                return Err(ReplayError::TurnMisalignment {
                    team,
                    expected: perceptions.len(),
                    got: command_lists.len(),
                });
            }

            for (turn, (perception, lines)) in
                perceptions.iter().zip(&command_lists).enumerate()
            {
                let action = Action::from_commands(
                    perception.width,
                    perception.height,
                    &perception.units,
                    lines,
                )
                .map_err(|source| ReplayError::Action { team, turn, source })?;
                for (total, value) in tallies[team].iter_mut().zip(action.channel_totals()) {
                    *total += value;
                }
                actions[team].push(action);
            }
        }

        Ok(TrainingSequence {
            perceptions,
            actions,
            tallies,
        })
    }

    /// Observations to replay, gated on the canonical player staying
    /// active. The last step carries no successor and is never observed.
    fn observations(&self, canonical: usize) -> Result<Vec<&Observation>, ReplayError> {
        let mut observations = Vec::new();
        for step in 0..self.steps.len().saturating_sub(1) {
            if self.record(step, canonical)?.status == STATUS_ACTIVE {
                observations.push(&self.record(step, 0)?.observation);
            }
        }
        Ok(observations)
    }

    /// One command list per step in which `team` was still playing.
    fn team_commands(&self, team: usize) -> Result<Vec<Vec<String>>, ReplayError> {
        let mut lists = Vec::new();
        for step in 0..self.steps.len() {
            let record = self.record(step, team)?;
            if record.status == STATUS_ACTIVE || record.status == STATUS_DONE {
                lists.push(record.action.clone().unwrap_or_default());
            }
        }
        Ok(lists)
    }

    fn record(&self, step: usize, team: usize) -> Result<&StepRecord, ReplayError> {
        self.steps[step]
            .get(team)
            .ok_or(ReplayError::MissingRecord { team, step })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::percept::action::ActionChannel;
    use crate::percept::perception::{StatusField, UNIT_CARGO_OFFSET};
    use crate::percept::PerceptionChannel;

    /// Three-step log on a 12x12 board: bootstrap, one mid turn, one final
    /// turn. Player 0 wins on rewards.
    fn three_step_log() -> String {
        r#"{
  "rewards": [40, 12],
  "info": { "EpisodeId": 27879876, "TeamNames": ["alpha", "beta"] },
  "steps": [
    [
      { "status": "ACTIVE", "action": null, "observation": {
          "player": 0, "step": 0,
          "updates": ["0", "12 12", "rp 0 0", "u 0 0 u_1 3 4 0 0 0 0", "r wood 5 5 400", "D_DONE"] } },
      { "status": "ACTIVE", "observation": { "player": 1 } }
    ],
    [
      { "status": "ACTIVE", "action": ["m u_1 n"], "observation": {
          "player": 0, "step": 1,
          "updates": ["rp 0 2", "u 0 0 u_1 3 4 1 5 0 0", "r wood 5 5 380", "D_DONE"] } },
      { "status": "ACTIVE", "action": ["r 6 6"], "observation": { "player": 1 } }
    ],
    [
      { "status": "DONE", "action": ["m u_1 c"], "observation": {
          "player": 0, "step": 2,
          "updates": ["rp 0 4", "u 0 0 u_1 3 3 2 5 0 0", "D_DONE"] } },
      { "status": "DONE", "action": [], "observation": { "player": 1 } }
    ]
  ]
}"#
        .to_string()
    }

    #[test]
    fn canonical_team_follows_rewards() {
        let replay = Replay::from_json_str(&three_step_log()).unwrap();
        assert_eq!(replay.canonical_team(), Team::P0);

        let mut flipped = replay.clone();
        flipped.rewards = vec![Some(5.0), Some(9.0)];
        assert_eq!(flipped.canonical_team(), Team::P1);

        // Missing rewards count as zero; ties go to player 0.
        flipped.rewards = vec![None, None];
        assert_eq!(flipped.canonical_team(), Team::P0);
    }

    #[test]
    fn game_states_replay_the_deltas() {
        let replay = Replay::from_json_str(&three_step_log()).unwrap();
        let states = replay.game_states().unwrap();
        assert_eq!(states.len(), 2);

        assert_eq!(states[0].turn, 0);
        assert_eq!(states[0].player(Team::P0).units[0].cargo.total(), 0);
        assert_eq!(states[1].turn, 1);
        assert_eq!(states[1].player(Team::P0).units[0].cargo.total(), 5);
        // Earlier snapshots are unaffected by later deltas.
        assert_eq!(states[0].map.cell(5, 5).resource.unwrap().amount, 400);
        assert_eq!(states[1].map.cell(5, 5).resource.unwrap().amount, 380);
    }

    #[test]
    fn training_sequence_is_turn_aligned() {
        let replay = Replay::from_json_str(&three_step_log()).unwrap();
        let sequence = replay.to_training().unwrap();

        // N steps yield N-1 perceptions and as many actions per player.
        assert_eq!(sequence.perceptions.len(), 2);
        assert_eq!(sequence.actions[0].len(), 2);
        assert_eq!(sequence.actions[1].len(), 2);

        // actions[team][0] holds the commands recorded at raw step 1.
        assert_eq!(
            sequence.actions[0][0].value(ActionChannel::UnitMoveNorth, 3, 4),
            1.0
        );
        assert_eq!(
            sequence.actions[1][0].value(ActionChannel::CityResearch, 6, 6),
            1.0
        );
        // The step-2 center move leaves the final grids empty.
        assert!(sequence.actions[0][1].mats.iter().all(|v| *v == 0.0));

        // Perceptions carry the canonical (player 0) perspective.
        assert_eq!(
            sequence.perceptions[0].status_value(StatusField::OwnResearch),
            0.0
        );
        assert_eq!(
            sequence.perceptions[1].status_value(StatusField::OwnResearch),
            2.0
        );
        assert_eq!(
            sequence.perceptions[1].value(PerceptionChannel::WorkerCargo, 3, 4),
            UNIT_CARGO_OFFSET + 5.0
        );

        // Tallies sum each channel across the match.
        assert_eq!(
            sequence.tallies[0][ActionChannel::UnitMoveNorth.index()],
            1.0
        );
        assert_eq!(sequence.tallies[1][ActionChannel::CityResearch.index()], 1.0);
        assert_eq!(sequence.tallies[0].iter().sum::<f32>(), 1.0);
    }

    #[test]
    fn dangling_unit_id_fails_extraction() {
        let log = three_step_log().replace("m u_1 n", "m u_404 n");
        let replay = Replay::from_json_str(&log).unwrap();
        let err = replay.to_training().unwrap_err();
        match err {
            ReplayError::Action { team, turn, source } => {
                assert_eq!(team, 0);
                assert_eq!(turn, 0);
                assert!(matches!(source, ActionError::UnknownUnit { ref unit } if unit == "u_404"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn malformed_delta_fails_extraction() {
        let log = three_step_log().replace("rp 0 2", "rp zero 2");
        let replay = Replay::from_json_str(&log).unwrap();
        let err = replay.game_states().unwrap_err();
        assert!(matches!(err, ReplayError::Delta { turn: 1, .. }));
    }

    #[test]
    fn eliminated_player_breaks_alignment() {
        let log = three_step_log().replace(
            r#"{ "status": "DONE", "action": [], "observation": { "player": 1 } }"#,
            r#"{ "status": "INACTIVE", "observation": { "player": 1 } }"#,
        );
        let replay = Replay::from_json_str(&log).unwrap();
        let err = replay.to_training().unwrap_err();
        assert!(matches!(
            err,
            ReplayError::TurnMisalignment {
                team: 1,
                expected: 3,
                got: 2,
            }
        ));
    }

    #[test]
    fn empty_replay_is_rejected() {
        let replay = Replay::from_json_str(r#"{ "steps": [] }"#).unwrap();
        assert!(matches!(
            replay.game_states().unwrap_err(),
            ReplayError::EmptyReplay
        ));
    }

    #[test]
    fn bootstrap_must_be_step_zero() {
        // Drop the first step so the sequence starts mid-match.
        let mut replay = Replay::from_json_str(&three_step_log()).unwrap();
        replay.steps.remove(0);
        let err = replay.game_states().unwrap_err();
        assert!(matches!(err, ReplayError::MissingBootstrap { step: 1 }));
    }

    #[test]
    fn missing_file_is_a_storage_error() {
        let err = Replay::load(Path::new("/nonexistent/replay.json")).unwrap_err();
        assert!(matches!(err, ReplayError::Storage { .. }));
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = Replay::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ReplayError::Json(_)));
    }
}

//! Luxbrain agent core library.
//!
//! Exposes the spatial grid model, the engine wire grammars, the fixed-shape
//! perception/action tensor codecs, and the replay-to-training-data pipeline
//! for use by agents, trainers, and integration tests.

pub mod dataset;
pub mod game;
pub mod percept;
pub mod protocol;
pub mod replay;

//! Batch conversion of replay logs and persisted training data.
//!
//! Each replay converts independently; a failed one is reported to stderr
//! and skipped so the rest of the batch still lands. Converted sequences
//! persist as opaque bincode blobs whose only contract is an exact
//! round-trip of the in-memory values.

use std::fs;
use std::path::Path;

use rayon::prelude::*;
use thiserror::Error;

use crate::replay::{Replay, ReplayError, TrainingSequence};

/// Errors raised while persisting or restoring converted sequences.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to encode dataset: {0}")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode dataset: {0}")]
    Decode(#[source] bincode::Error),
}

/// Converts one replay file into its training sequence.
pub fn convert_replay(path: &Path) -> Result<TrainingSequence, ReplayError> {
    Replay::load(path)?.to_training()
}

/// Converts a batch of replay files, skipping the ones that fail.
pub fn convert_replays<P: AsRef<Path>>(paths: &[P]) -> Vec<TrainingSequence> {
    let mut sequences = Vec::with_capacity(paths.len());
    for path in paths {
        match convert_replay(path.as_ref()) {
            Ok(sequence) => sequences.push(sequence),
            Err(err) => eprintln!("skipping replay {}: {}", path.as_ref().display(), err),
        }
    }
    sequences
}

/// Like [`convert_replays`], but spreads the files over a rayon pool.
/// Results keep the input order; failed replays are skipped the same way.
pub fn convert_replays_parallel<P: AsRef<Path> + Sync>(
    paths: &[P],
    threads: usize,
) -> Vec<TrainingSequence> {
    if threads <= 1 {
        return convert_replays(paths);
    }

    let pool = match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("falling back to sequential conversion: {}", err);
            return convert_replays(paths);
        }
    };

    pool.install(|| {
        paths
            .par_iter()
            .filter_map(|path| match convert_replay(path.as_ref()) {
                Ok(sequence) => Some(sequence),
                Err(err) => {
                    eprintln!("skipping replay {}: {}", path.as_ref().display(), err);
                    None
                }
            })
            .collect()
    })
}

/// Persists converted sequences as one opaque blob.
pub fn save_sequences(path: &Path, sequences: &[TrainingSequence]) -> Result<(), DatasetError> {
    let bytes = bincode::serialize(sequences).map_err(DatasetError::Encode)?;
    fs::write(path, bytes).map_err(|source| DatasetError::Write {
        path: path.display().to_string(),
        source,
    })
}

/// Restores sequences persisted by [`save_sequences`].
pub fn load_sequences(path: &Path) -> Result<Vec<TrainingSequence>, DatasetError> {
    let bytes = fs::read(path).map_err(|source| DatasetError::Read {
        path: path.display().to_string(),
        source,
    })?;
    bincode::deserialize(&bytes).map_err(DatasetError::Decode)
}

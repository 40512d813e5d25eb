use burrowdb::{
    db::{Generation, StoreError},
    error::Error,
};
use std::io;
use thiserror::Error as ThisError;

///
/// MigrateError
///

#[derive(Debug, ThisError)]
pub enum MigrateError {
    #[error(transparent)]
    Db(#[from] Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("i/o failure on '{path}': {source}")]
    Io { path: String, source: io::Error },

    #[error("destination '{0}' already exists")]
    DestinationExists(String),

    #[error("transition from generation {0} did not advance the marker")]
    Stalled(Generation),

    #[error("no key candidate accepts key {key:?} in bucket '{bucket}'")]
    KeyCandidatesExhausted { bucket: String, key: Vec<u8> },
}

impl MigrateError {
    pub(crate) fn io(path: &std::path::Path, source: io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

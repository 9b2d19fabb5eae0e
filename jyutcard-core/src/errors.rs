use crate::ReviewUpdate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(&'static str),
    #[error("invalid input: {0}")]
    Invalid(&'static str),
    #[error("conflict: {0}")]
    Conflict(&'static str),
    #[error("storage error: {0}")]
    Storage(&'static str),
}

/// Failures at the repository boundary of a review session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The snapshot could not be read. This is not the same as "nothing due".
    #[error("cannot determine due cards: {0}")]
    SnapshotUnavailable(#[source] CoreError),
    /// The computed update is kept so the caller can retry the write.
    #[error("review not saved for card {}: {source}", update.id)]
    NotSaved {
        update: ReviewUpdate,
        #[source]
        source: CoreError,
    },
}

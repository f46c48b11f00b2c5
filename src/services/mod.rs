pub mod locks;
pub mod problems;
pub mod progress;
pub mod reviews;
pub mod stats;

use thiserror::Error;

use crate::db::StoreError;
use crate::tracker::schedule::IntervalError;
use crate::tracker::TransitionError;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("review {0} is already completed")]
    AlreadyCompleted(i64),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Schedule(#[from] IntervalError),
}

impl From<StoreError> for TrackerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => TrackerError::Conflict(message),
            StoreError::Missing(message) => TrackerError::NotFound(message),
            other => TrackerError::Store(other),
        }
    }
}

impl From<TransitionError> for TrackerError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::MasteryOutOfRange { .. } => TrackerError::Validation(err.to_string()),
            TransitionError::AlreadyCompleted(review_id) => TrackerError::AlreadyCompleted(review_id),
            TransitionError::ReviewsExhausted { .. } => TrackerError::Conflict(err.to_string()),
        }
    }
}

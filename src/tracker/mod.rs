//! Progress and spaced-repetition model.
//!
//! Everything in here is pure: transitions take the current snapshot plus an
//! event and return the next snapshot. Persistence and locking live in
//! `crate::db` and `crate::services`.

pub mod record;
pub mod schedule;

use thiserror::Error;

pub use record::{apply, MasteryRange, ProgressEvent, ProgressRecord, ProgressStatus};
pub use schedule::{
    bucket_pending, classify, plan_reviews, review_order, PlannedReview, ReviewBucket,
    ReviewBuckets, ReviewIntervals, ReviewSchedule, DEFAULT_REVIEW_INTERVALS,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("mastery level {level} is outside 0..={max}")]
    MasteryOutOfRange { level: i64, max: i64 },
    #[error("review {0} is already completed")]
    AlreadyCompleted(i64),
    #[error("all {total} reviews are already completed")]
    ReviewsExhausted { total: i64 },
}

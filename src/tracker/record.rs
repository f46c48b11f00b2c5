use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TransitionError;

pub const DEFAULT_MASTERY_MAX: i64 = 5;

/// Study status of a single problem. Ordered by how far along it is, but a
/// record may move backwards after a failed re-attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
    Mastered,
}

impl ProgressStatus {
    pub const ALL: [ProgressStatus; 4] = [
        ProgressStatus::NotStarted,
        ProgressStatus::InProgress,
        ProgressStatus::Completed,
        ProgressStatus::Mastered,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "not_started",
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Completed => "completed",
            ProgressStatus::Mastered => "mastered",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
    }

    pub fn is_started(self) -> bool {
        self != ProgressStatus::NotStarted
    }
}

impl Default for ProgressStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

/// Inclusive `0..=max` bound for self-assessed mastery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasteryRange {
    max: i64,
}

impl MasteryRange {
    pub fn new(max: i64) -> Self {
        Self { max: max.max(0) }
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn contains(&self, level: i64) -> bool {
        (0..=self.max).contains(&level)
    }

    pub fn check(&self, level: i64) -> Result<i64, TransitionError> {
        if self.contains(level) {
            Ok(level)
        } else {
            Err(TransitionError::MasteryOutOfRange {
                level,
                max: self.max,
            })
        }
    }
}

impl Default for MasteryRange {
    fn default() -> Self {
        Self::new(DEFAULT_MASTERY_MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Store-assigned id, `None` until the record has been persisted.
    pub id: Option<i64>,
    pub problem_id: i64,
    pub status: ProgressStatus,
    pub attempt_count: i64,
    pub mastery_level: i64,
    pub completed_reviews: i64,
    pub total_reviews: i64,
    pub first_solved: Option<DateTime<Utc>>,
    pub last_attempt: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// The implicit record of a problem nobody has touched yet.
    pub fn not_started(problem_id: i64, plan_len: i64) -> Self {
        Self {
            id: None,
            problem_id,
            status: ProgressStatus::NotStarted,
            attempt_count: 0,
            mastery_level: 0,
            completed_reviews: 0,
            total_reviews: plan_len,
            first_solved: None,
            last_attempt: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// One-step "I solved it" action.
    MarkedComplete,
    /// Manual status/mastery override. The mastery level must already be
    /// range-checked by the caller.
    ManualUpdate {
        status: ProgressStatus,
        mastery_level: i64,
    },
    /// A fresh review plan of `total_reviews` rounds was created.
    PlanMaterialized { total_reviews: i64 },
    /// One review round was resolved. With `promote_when_done` the record
    /// becomes mastered once every round is complete.
    ReviewCompleted { promote_when_done: bool },
}

/// Produces the next snapshot of `record` for `event`. Never mutates the input.
pub fn apply(
    record: &ProgressRecord,
    event: ProgressEvent,
    now: DateTime<Utc>,
) -> Result<ProgressRecord, TransitionError> {
    let mut next = record.clone();

    match event {
        ProgressEvent::MarkedComplete => {
            set_status(&mut next, ProgressStatus::Completed, now);
            next.attempt_count += 1;
            next.last_attempt = Some(now);
        }
        ProgressEvent::ManualUpdate {
            status,
            mastery_level,
        } => {
            set_status(&mut next, status, now);
            next.mastery_level = mastery_level;
            next.attempt_count += 1;
            next.last_attempt = Some(now);
        }
        ProgressEvent::PlanMaterialized { total_reviews } => {
            next.total_reviews = total_reviews;
            next.completed_reviews = 0;
        }
        ProgressEvent::ReviewCompleted { promote_when_done } => {
            if next.completed_reviews >= next.total_reviews {
                return Err(TransitionError::ReviewsExhausted {
                    total: next.total_reviews,
                });
            }
            next.completed_reviews += 1;

            let finished = next.completed_reviews == next.total_reviews;
            if promote_when_done && finished && next.status != ProgressStatus::Mastered {
                set_status(&mut next, ProgressStatus::Mastered, now);
                next.attempt_count += 1;
            }
        }
    }

    Ok(next)
}

fn set_status(record: &mut ProgressRecord, status: ProgressStatus, now: DateTime<Utc>) {
    if status.is_started() && record.first_solved.is_none() {
        record.first_solved = Some(now);
    }
    record.status = status;
}

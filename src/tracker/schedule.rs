use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::TransitionError;

/// Ebbinghaus-style review offsets, in days after the problem was completed.
pub const DEFAULT_REVIEW_INTERVALS: [u32; 5] = [1, 2, 4, 7, 15];

/// Longest allowed offset, roughly a century.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalError {
    #[error("review intervals must not be empty")]
    Empty,
    #[error("review interval at position {position} must be at least one day")]
    Zero { position: usize },
    #[error("review intervals must be strictly increasing ({previous} then {next})")]
    NotIncreasing { previous: u32, next: u32 },
    #[error("review interval {days} exceeds the maximum of {max} days")]
    TooLong { days: u32, max: u32 },
    #[error("invalid review interval {0:?}")]
    Unparsable(String),
    #[error("review {days} days after {from} is outside the calendar")]
    OutOfCalendar { from: NaiveDate, days: u32 },
}

/// A validated spaced-repetition curve: non-empty, positive, strictly
/// increasing and at most [`MAX_INTERVAL_DAYS`]. Those guarantees make every
/// generated plan have strictly increasing dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewIntervals(Vec<u32>);

impl ReviewIntervals {
    pub fn new(days: Vec<u32>) -> Result<Self, IntervalError> {
        if days.is_empty() {
            return Err(IntervalError::Empty);
        }
        if let Some(position) = days.iter().position(|&d| d == 0) {
            return Err(IntervalError::Zero { position });
        }
        if let Some(&days) = days.iter().find(|&&d| d > MAX_INTERVAL_DAYS) {
            return Err(IntervalError::TooLong {
                days,
                max: MAX_INTERVAL_DAYS,
            });
        }
        if let Some(pair) = days.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(IntervalError::NotIncreasing {
                previous: pair[0],
                next: pair[1],
            });
        }
        Ok(Self(days))
    }

    pub fn days(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn plan_len(&self) -> i64 {
        self.0.len() as i64
    }
}

impl Default for ReviewIntervals {
    fn default() -> Self {
        Self(DEFAULT_REVIEW_INTERVALS.to_vec())
    }
}

impl FromStr for ReviewIntervals {
    type Err = IntervalError;

    /// Parses a comma separated list such as `1,2,4,7,15`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let days = raw
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| IntervalError::Unparsable(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(days)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSchedule {
    pub id: i64,
    pub progress_id: i64,
    pub scheduled_date: NaiveDate,
    pub review_round: i64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ReviewSchedule {
    pub fn is_pending(&self) -> bool {
        !self.completed
    }

    /// The completed version of this instance. Completing twice is an error so
    /// the owner's counter is never bumped twice for the same round.
    pub fn complete(&self, now: DateTime<Utc>) -> Result<ReviewSchedule, TransitionError> {
        if self.completed {
            return Err(TransitionError::AlreadyCompleted(self.id));
        }
        Ok(ReviewSchedule {
            completed: true,
            completed_at: Some(now),
            ..self.clone()
        })
    }
}

/// A plan entry that has not been stored yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedReview {
    pub review_round: i64,
    pub scheduled_date: NaiveDate,
}

/// Materializes the whole plan for a problem completed on `completed_on`.
pub fn plan_reviews(
    intervals: &ReviewIntervals,
    completed_on: NaiveDate,
) -> Result<Vec<PlannedReview>, IntervalError> {
    intervals
        .days()
        .iter()
        .enumerate()
        .map(|(index, &days)| {
            let scheduled_date = completed_on
                .checked_add_signed(Duration::days(i64::from(days)))
                .ok_or(IntervalError::OutOfCalendar {
                    from: completed_on,
                    days,
                })?;
            Ok(PlannedReview {
                review_round: index as i64 + 1,
                scheduled_date,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewBucket {
    Overdue,
    Today,
    Upcoming,
}

pub fn classify(scheduled_date: NaiveDate, today: NaiveDate) -> ReviewBucket {
    match scheduled_date.cmp(&today) {
        Ordering::Less => ReviewBucket::Overdue,
        Ordering::Equal => ReviewBucket::Today,
        Ordering::Greater => ReviewBucket::Upcoming,
    }
}

/// Date, then round, then id.
pub fn review_order(a: &ReviewSchedule, b: &ReviewSchedule) -> Ordering {
    a.scheduled_date
        .cmp(&b.scheduled_date)
        .then(a.review_round.cmp(&b.review_round))
        .then(a.id.cmp(&b.id))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewBuckets<T> {
    pub overdue: Vec<T>,
    pub today: Vec<T>,
    pub upcoming: Vec<T>,
}

impl<T> Default for ReviewBuckets<T> {
    fn default() -> Self {
        Self {
            overdue: Vec::new(),
            today: Vec::new(),
            upcoming: Vec::new(),
        }
    }
}

impl<T> ReviewBuckets<T> {
    pub fn len(&self) -> usize {
        self.overdue.len() + self.today.len() + self.upcoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> ReviewBuckets<U> {
        ReviewBuckets {
            overdue: self.overdue.into_iter().map(&mut f).collect(),
            today: self.today.into_iter().map(&mut f).collect(),
            upcoming: self.upcoming.into_iter().map(&mut f).collect(),
        }
    }
}

/// Splits the pending instances around `today`. Completed instances are
/// dropped. `upcoming_days` caps how far ahead the upcoming bucket looks; a
/// cap past the end of the calendar is no cap.
pub fn bucket_pending(
    reviews: impl IntoIterator<Item = ReviewSchedule>,
    today: NaiveDate,
    upcoming_days: Option<u32>,
) -> ReviewBuckets<ReviewSchedule> {
    let horizon = upcoming_days
        .and_then(|days| today.checked_add_signed(Duration::days(i64::from(days))));
    let mut buckets = ReviewBuckets::default();

    for review in reviews.into_iter().filter(ReviewSchedule::is_pending) {
        match classify(review.scheduled_date, today) {
            ReviewBucket::Overdue => buckets.overdue.push(review),
            ReviewBucket::Today => buckets.today.push(review),
            ReviewBucket::Upcoming => {
                if horizon.map_or(true, |limit| review.scheduled_date <= limit) {
                    buckets.upcoming.push(review);
                }
            }
        }
    }

    buckets.overdue.sort_by(review_order);
    buckets.today.sort_by(review_order);
    buckets.upcoming.sort_by(review_order);
    buckets
}

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::db::{ProblemCatalog, ProblemMetadata, ProgressStore, StoreError};
use crate::services::locks::RecordLocks;
use crate::services::TrackerError;
use crate::tracker::{
    apply, bucket_pending, review_order, ProgressEvent, ProgressRecord, ReviewBuckets,
    ReviewSchedule,
};

/// A review instance together with the problem it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewPlan {
    #[serde(flatten)]
    pub review: ReviewSchedule,
    pub problem: Option<ProblemMetadata>,
}

pub type TodayReviews = ReviewBuckets<ReviewPlan>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ReviewQuery {
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Clone)]
pub struct ReviewService {
    catalog: Arc<dyn ProblemCatalog>,
    store: Arc<dyn ProgressStore>,
    settings: Arc<TrackerConfig>,
    locks: RecordLocks,
}

impl ReviewService {
    pub fn new(
        catalog: Arc<dyn ProblemCatalog>,
        store: Arc<dyn ProgressStore>,
        settings: Arc<TrackerConfig>,
        locks: RecordLocks,
    ) -> Self {
        Self {
            catalog,
            store,
            settings,
            locks,
        }
    }

    /// Pending reviews split into overdue, today and upcoming around `today`.
    pub async fn get_reviews(&self, today: NaiveDate) -> Result<TodayReviews, TrackerError> {
        let pending = self.store.list_reviews(Some(false)).await?;
        let buckets = bucket_pending(pending, today, self.settings.upcoming_days);
        let owners = self.owners().await?;
        Ok(buckets.map(|review| owners.attach(review)))
    }

    pub async fn get_all_reviews(&self, query: ReviewQuery) -> Result<Vec<ReviewPlan>, TrackerError> {
        let mut reviews = self.store.list_reviews(query.completed).await?;
        reviews.sort_by(review_order);
        let owners = self.owners().await?;
        Ok(reviews
            .into_iter()
            .map(|review| owners.attach(review))
            .collect())
    }

    /// Resolves one review round and bumps its owner's counter, once.
    pub async fn complete_review(
        &self,
        review_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ReviewPlan, TrackerError> {
        let review = self.load_review(review_id).await?;
        let owner = self.load_owner(&review).await?;

        let _guard = self.locks.acquire(owner.problem_id).await;

        // Re-read under the lock; another request may have completed it.
        let review = self.load_review(review_id).await?;
        let owner = self.load_owner(&review).await?;

        let done = review.complete(now)?;
        let next = apply(
            &owner,
            ProgressEvent::ReviewCompleted {
                promote_when_done: self.settings.master_on_full_reviews,
            },
            now,
        )?;

        self.store
            .update_review_instance(&done, &next)
            .await
            .map_err(|err| match err {
                StoreError::Conflict(_) => TrackerError::AlreadyCompleted(review_id),
                other => TrackerError::from(other),
            })?;

        tracing::info!(
            review_id,
            problem_id = next.problem_id,
            round = done.review_round,
            completed_reviews = next.completed_reviews,
            "review completed"
        );

        let problem = self.catalog.get_metadata(next.problem_id).await?;
        Ok(ReviewPlan {
            review: done,
            problem,
        })
    }

    async fn load_review(&self, review_id: i64) -> Result<ReviewSchedule, TrackerError> {
        self.store
            .load_review(review_id)
            .await?
            .ok_or_else(|| TrackerError::NotFound(format!("review {review_id} not found")))
    }

    async fn load_owner(
        &self,
        review: &ReviewSchedule,
    ) -> Result<ProgressRecord, TrackerError> {
        self.store
            .load_progress_by_id(review.progress_id)
            .await?
            .ok_or_else(|| {
                TrackerError::Store(StoreError::Corrupt(format!(
                    "review {} points at missing progress {}",
                    review.id, review.progress_id
                )))
            })
    }

    async fn owners(&self) -> Result<Owners, TrackerError> {
        let problem_of_progress = self
            .store
            .list_progress()
            .await?
            .into_iter()
            .filter_map(|record| record.id.map(|id| (id, record.problem_id)))
            .collect();
        let problems = self
            .catalog
            .list_problems()
            .await?
            .into_iter()
            .map(|problem| (problem.id, problem.metadata()))
            .collect();
        Ok(Owners {
            problem_of_progress,
            problems,
        })
    }
}

struct Owners {
    problem_of_progress: HashMap<i64, i64>,
    problems: HashMap<i64, ProblemMetadata>,
}

impl Owners {
    fn attach(&self, review: ReviewSchedule) -> ReviewPlan {
        let problem = self
            .problem_of_progress
            .get(&review.progress_id)
            .and_then(|problem_id| self.problems.get(problem_id))
            .cloned();
        ReviewPlan { review, problem }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::seed::seed_catalog;
    use crate::services::progress::ProgressService;
    use crate::tracker::ProgressStatus;
    use chrono::{Duration, TimeZone};

    struct Fixture {
        progress: ProgressService,
        reviews: ReviewService,
        store: Arc<MemoryStore>,
    }

    async fn fixture(settings: TrackerConfig) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        seed_catalog(&*store).await.unwrap();
        let settings = Arc::new(settings);
        let locks = RecordLocks::new();
        Fixture {
            progress: ProgressService::new(
                store.clone(),
                store.clone(),
                settings.clone(),
                locks.clone(),
            ),
            reviews: ReviewService::new(store.clone(), store.clone(), settings, locks),
            store,
        }
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, day, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn buckets_carry_problem_metadata() {
        let f = fixture(TrackerConfig::default()).await;
        f.progress.mark_complete(1, at(1)).await.unwrap();

        // Plan for 2024-04-01: 02, 03, 05, 08, 16.
        let today = NaiveDate::from_ymd_opt(2024, 4, 3).unwrap();
        let buckets = f.reviews.get_reviews(today).await.unwrap();

        assert_eq!(buckets.overdue.len(), 1);
        assert_eq!(buckets.today.len(), 1);
        assert_eq!(buckets.upcoming.len(), 3);
        let problem = buckets.today[0].problem.as_ref().unwrap();
        assert_eq!(problem.leetcode_id, 1);
        assert_eq!(problem.title, "Two Sum");
    }

    #[tokio::test]
    async fn reading_reviews_has_no_side_effects() {
        let f = fixture(TrackerConfig::default()).await;
        f.progress.mark_complete(1, at(1)).await.unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 4, 10).unwrap();

        let before = f.store.list_reviews(None).await.unwrap();
        let first = f.reviews.get_reviews(today).await.unwrap();
        let second = f.reviews.get_reviews(today).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(before, f.store.list_reviews(None).await.unwrap());
    }

    #[tokio::test]
    async fn completing_twice_is_rejected() {
        let f = fixture(TrackerConfig::default()).await;
        let record = f.progress.mark_complete(1, at(1)).await.unwrap();
        let first = f
            .store
            .load_review_instances(record.id.unwrap())
            .await
            .unwrap()[0]
            .clone();

        let done = f.reviews.complete_review(first.id, at(2)).await.unwrap();
        assert!(done.review.completed);
        assert_eq!(done.review.completed_at, Some(at(2)));

        let err = f.reviews.complete_review(first.id, at(2)).await.unwrap_err();
        assert!(matches!(err, TrackerError::AlreadyCompleted(id) if id == first.id));

        let owner = f.store.load_progress(1).await.unwrap().unwrap();
        assert_eq!(owner.completed_reviews, 1);
    }

    #[tokio::test]
    async fn unknown_review_is_not_found() {
        let f = fixture(TrackerConfig::default()).await;
        let err = f.reviews.complete_review(42, at(2)).await.unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(_)));
    }

    #[tokio::test]
    async fn finishing_every_round_can_promote() {
        let settings = TrackerConfig {
            master_on_full_reviews: true,
            ..TrackerConfig::default()
        };
        let f = fixture(settings).await;
        let record = f.progress.mark_complete(3, at(1)).await.unwrap();

        let reviews = f
            .store
            .load_review_instances(record.id.unwrap())
            .await
            .unwrap();
        for review in &reviews {
            f.reviews.complete_review(review.id, at(20)).await.unwrap();
        }

        let owner = f.store.load_progress(3).await.unwrap().unwrap();
        assert_eq!(owner.completed_reviews, 5);
        assert_eq!(owner.status, ProgressStatus::Mastered);
        assert_eq!(owner.attempt_count, 2);

        let pending = f
            .reviews
            .get_reviews(at(1).date_naive() + Duration::days(30))
            .await
            .unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn all_reviews_filter_by_completion() {
        let f = fixture(TrackerConfig::default()).await;
        let record = f.progress.mark_complete(2, at(1)).await.unwrap();
        let reviews = f
            .store
            .load_review_instances(record.id.unwrap())
            .await
            .unwrap();
        f.reviews.complete_review(reviews[1].id, at(3)).await.unwrap();

        let all = f.reviews.get_all_reviews(ReviewQuery::default()).await.unwrap();
        let done = f
            .reviews
            .get_all_reviews(ReviewQuery {
                completed: Some(true),
            })
            .await
            .unwrap();
        let open = f
            .reviews
            .get_all_reviews(ReviewQuery {
                completed: Some(false),
            })
            .await
            .unwrap();

        assert_eq!(all.len(), 5);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].review.review_round, 2);
        assert_eq!(open.len(), 4);
        let rounds: Vec<i64> = all.iter().map(|plan| plan.review.review_round).collect();
        assert_eq!(rounds, vec![1, 2, 3, 4, 5]);
    }
}

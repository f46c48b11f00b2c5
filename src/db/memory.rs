use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::db::{NewProblem, Problem, ProblemCatalog, ProgressStore, StoreError};
use crate::tracker::{PlannedReview, ProgressRecord, ReviewSchedule};

#[derive(Debug, Default)]
struct Tables {
    problems: BTreeMap<i64, Problem>,
    progress: BTreeMap<i64, ProgressRecord>,
    progress_by_problem: HashMap<i64, i64>,
    reviews: BTreeMap<i64, ReviewSchedule>,
    next_problem_id: i64,
    next_progress_id: i64,
    next_review_id: i64,
}

impl Tables {
    fn upsert_progress(&mut self, record: &ProgressRecord) -> Result<ProgressRecord, StoreError> {
        let mut stored = record.clone();
        match record.id {
            Some(id) => {
                if !self.progress.contains_key(&id) {
                    return Err(StoreError::Missing(format!("progress {id}")));
                }
            }
            None => {
                if self.progress_by_problem.contains_key(&record.problem_id) {
                    return Err(StoreError::Conflict(format!(
                        "problem {} already has a progress record",
                        record.problem_id
                    )));
                }
                self.next_progress_id += 1;
                stored.id = Some(self.next_progress_id);
                self.progress_by_problem
                    .insert(record.problem_id, self.next_progress_id);
            }
        }

        if let Some(id) = stored.id {
            self.progress.insert(id, stored.clone());
        }
        Ok(stored)
    }

    fn reviews_of(&self, progress_id: i64) -> Vec<ReviewSchedule> {
        self.reviews
            .values()
            .filter(|review| review.progress_id == progress_id)
            .cloned()
            .collect()
    }
}

/// Process-local store. One lock guards all tables, which makes every
/// multi-row write atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProblemCatalog for MemoryStore {
    async fn get_problem(&self, problem_id: i64) -> Result<Option<Problem>, StoreError> {
        Ok(self.tables.read().await.problems.get(&problem_id).cloned())
    }

    async fn list_problems(&self) -> Result<Vec<Problem>, StoreError> {
        Ok(self.tables.read().await.problems.values().cloned().collect())
    }

    async fn seed_problems(&self, problems: &[NewProblem]) -> Result<usize, StoreError> {
        let mut tables = self.tables.write().await;
        let mut inserted = 0;

        for problem in problems {
            let known = tables
                .problems
                .values()
                .any(|existing| existing.leetcode_id == problem.leetcode_id);
            if known {
                continue;
            }

            tables.next_problem_id += 1;
            let id = tables.next_problem_id;
            tables.problems.insert(
                id,
                Problem {
                    id,
                    leetcode_id: problem.leetcode_id,
                    title: problem.title.clone(),
                    title_cn: problem.title_cn.clone(),
                    difficulty: problem.difficulty.clone(),
                    category: problem.category.clone(),
                    url: problem.url.clone(),
                },
            );
            inserted += 1;
        }

        Ok(inserted)
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn load_progress(&self, problem_id: i64) -> Result<Option<ProgressRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .progress_by_problem
            .get(&problem_id)
            .and_then(|id| tables.progress.get(id))
            .cloned())
    }

    async fn load_progress_by_id(
        &self,
        progress_id: i64,
    ) -> Result<Option<ProgressRecord>, StoreError> {
        Ok(self.tables.read().await.progress.get(&progress_id).cloned())
    }

    async fn list_progress(&self) -> Result<Vec<ProgressRecord>, StoreError> {
        Ok(self.tables.read().await.progress.values().cloned().collect())
    }

    async fn save_progress(&self, record: &ProgressRecord) -> Result<ProgressRecord, StoreError> {
        self.tables.write().await.upsert_progress(record)
    }

    async fn load_review_instances(
        &self,
        progress_id: i64,
    ) -> Result<Vec<ReviewSchedule>, StoreError> {
        Ok(self.tables.read().await.reviews_of(progress_id))
    }

    async fn save_review_instances(
        &self,
        record: &ProgressRecord,
        plan: &[PlannedReview],
    ) -> Result<(ProgressRecord, Vec<ReviewSchedule>), StoreError> {
        let mut tables = self.tables.write().await;

        if let Some(id) = record.id {
            if !tables.reviews_of(id).is_empty() {
                return Err(StoreError::Conflict(format!(
                    "progress {id} already has a review plan"
                )));
            }
        }

        let stored = tables.upsert_progress(record)?;
        let progress_id = stored
            .id
            .ok_or_else(|| StoreError::Corrupt("progress saved without id".to_string()))?;

        let mut created = Vec::with_capacity(plan.len());
        for planned in plan {
            tables.next_review_id += 1;
            let review = ReviewSchedule {
                id: tables.next_review_id,
                progress_id,
                scheduled_date: planned.scheduled_date,
                review_round: planned.review_round,
                completed: false,
                completed_at: None,
            };
            tables.reviews.insert(review.id, review.clone());
            created.push(review);
        }

        Ok((stored, created))
    }

    async fn load_review(&self, review_id: i64) -> Result<Option<ReviewSchedule>, StoreError> {
        Ok(self.tables.read().await.reviews.get(&review_id).cloned())
    }

    async fn update_review_instance(
        &self,
        review: &ReviewSchedule,
        owner: &ProgressRecord,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        match tables.reviews.get(&review.id) {
            None => return Err(StoreError::Missing(format!("review {}", review.id))),
            Some(stored) if stored.completed => {
                return Err(StoreError::Conflict(format!(
                    "review {} already completed",
                    review.id
                )))
            }
            Some(_) => {}
        }
        if owner.id.is_none() {
            return Err(StoreError::Missing(format!(
                "progress for problem {}",
                owner.problem_id
            )));
        }

        tables.upsert_progress(owner)?;
        tables.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn list_reviews(&self, completed: Option<bool>) -> Result<Vec<ReviewSchedule>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .values()
            .filter(|review| completed.map_or(true, |flag| review.completed == flag))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn plan() -> Vec<PlannedReview> {
        (1..=3)
            .map(|round| PlannedReview {
                review_round: round,
                scheduled_date: NaiveDate::from_ymd_opt(2024, 5, round as u32).unwrap(),
            })
            .collect()
    }

    #[tokio::test]
    async fn second_record_for_problem_conflicts() {
        let store = MemoryStore::new();
        let first = store
            .save_progress(&ProgressRecord::not_started(1, 5))
            .await
            .unwrap();
        assert_eq!(first.id, Some(1));

        let err = store
            .save_progress(&ProgressRecord::not_started(1, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn plan_is_written_once() {
        let store = MemoryStore::new();
        let (record, reviews) = store
            .save_review_instances(&ProgressRecord::not_started(2, 3), &plan())
            .await
            .unwrap();
        assert_eq!(reviews.len(), 3);
        assert!(reviews.iter().all(|r| Some(r.progress_id) == record.id));

        let err = store
            .save_review_instances(&record, &plan())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.list_reviews(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn completed_review_cannot_be_written_again() {
        let store = MemoryStore::new();
        let (mut record, reviews) = store
            .save_review_instances(&ProgressRecord::not_started(2, 3), &plan())
            .await
            .unwrap();

        let mut done = reviews[0].clone();
        done.completed = true;
        record.completed_reviews = 1;
        store.update_review_instance(&done, &record).await.unwrap();

        let err = store
            .update_review_instance(&done, &record)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.list_reviews(Some(true)).await.unwrap().len(), 1);
        assert_eq!(store.list_reviews(Some(false)).await.unwrap().len(), 2);
    }
}

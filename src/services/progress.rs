use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::TrackerConfig;
use crate::db::{ProblemCatalog, ProgressStore};
use crate::services::locks::RecordLocks;
use crate::services::TrackerError;
use crate::tracker::{apply, plan_reviews, ProgressEvent, ProgressRecord, ProgressStatus};

/// Drives the two user actions that change a problem's record: the one-step
/// "mark complete" and the manual status/mastery override.
#[derive(Clone)]
pub struct ProgressService {
    catalog: Arc<dyn ProblemCatalog>,
    store: Arc<dyn ProgressStore>,
    settings: Arc<TrackerConfig>,
    locks: RecordLocks,
}

impl ProgressService {
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

    /// Marks the problem completed. The review plan is created only the first
    /// time; later calls count an attempt and leave the plan alone.
    pub async fn mark_complete(
        &self,
        problem_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ProgressRecord, TrackerError> {
        self.ensure_problem(problem_id).await?;
        let _guard = self.locks.acquire(problem_id).await;

        let current = self.load_or_default(problem_id).await?;
        let next = apply(&current, ProgressEvent::MarkedComplete, now)?;

        let has_plan = match current.id {
            Some(progress_id) => !self
                .store
                .load_review_instances(progress_id)
                .await?
                .is_empty(),
            None => false,
        };

        if has_plan {
            let saved = self.store.save_progress(&next).await?;
            tracing::info!(problem_id, attempts = saved.attempt_count, "problem re-completed");
            return Ok(saved);
        }

        let plan = plan_reviews(&self.settings.intervals, now.date_naive())?;
        let next = apply(
            &next,
            ProgressEvent::PlanMaterialized {
                total_reviews: plan.len() as i64,
            },
            now,
        )?;
        let (saved, reviews) = self.store.save_review_instances(&next, &plan).await?;

        tracing::info!(
            problem_id,
            progress_id = saved.id,
            reviews = reviews.len(),
            "problem completed, review plan created"
        );
        Ok(saved)
    }

    /// Manual override. Always counts as an attempt and never touches the plan.
    pub async fn update_progress(
        &self,
        problem_id: i64,
        status: &str,
        mastery_level: i64,
        now: DateTime<Utc>,
    ) -> Result<ProgressRecord, TrackerError> {
        let status = ProgressStatus::parse(status).ok_or_else(|| {
            TrackerError::Validation(format!(
                "invalid status {status:?}, expected one of not_started, in_progress, completed, mastered"
            ))
        })?;
        let mastery_level = self.settings.mastery.check(mastery_level)?;

        self.ensure_problem(problem_id).await?;
        let _guard = self.locks.acquire(problem_id).await;

        let current = self.load_or_default(problem_id).await?;
        let next = apply(
            &current,
            ProgressEvent::ManualUpdate {
                status,
                mastery_level,
            },
            now,
        )?;
        let saved = self.store.save_progress(&next).await?;

        tracing::info!(
            problem_id,
            status = status.as_str(),
            mastery_level,
            "progress updated"
        );
        Ok(saved)
    }

    /// The stored record, or the not-started snapshot. Never writes.
    pub async fn get_progress(&self, problem_id: i64) -> Result<ProgressRecord, TrackerError> {
        self.ensure_problem(problem_id).await?;
        self.load_or_default(problem_id).await
    }

    async fn ensure_problem(&self, problem_id: i64) -> Result<(), TrackerError> {
        if self.catalog.exists(problem_id).await? {
            Ok(())
        } else {
            Err(TrackerError::NotFound(format!("problem {problem_id} not found")))
        }
    }

    async fn load_or_default(&self, problem_id: i64) -> Result<ProgressRecord, TrackerError> {
        Ok(self
            .store
            .load_progress(problem_id)
            .await?
            .unwrap_or_else(|| {
                ProgressRecord::not_started(problem_id, self.settings.intervals.plan_len())
            }))
    }
}

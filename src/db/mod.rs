pub mod config;
pub mod memory;
pub mod schema;
pub mod seed;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::config::DbConfig;
use crate::db::memory::MemoryStore;
use crate::db::sqlite::SqliteStore;
use crate::tracker::{PlannedReview, ProgressRecord, ReviewSchedule};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A concurrent writer got there first, or the write would break a
    /// uniqueness rule (one record per problem, one plan per record).
    #[error("conflicting write: {0}")]
    Conflict(String),
    #[error("missing row: {0}")]
    Missing(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("io error: {0}")]
    Io(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: i64,
    pub leetcode_id: i64,
    pub title: String,
    pub title_cn: String,
    pub difficulty: String,
    pub category: String,
    pub url: Option<String>,
}

impl Problem {
    pub fn metadata(&self) -> ProblemMetadata {
        ProblemMetadata {
            id: self.id,
            leetcode_id: self.leetcode_id,
            title: self.title.clone(),
            title_cn: self.title_cn.clone(),
            difficulty: self.difficulty.clone(),
            category: self.category.clone(),
        }
    }
}

/// The slice of a problem that review listings carry around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemMetadata {
    pub id: i64,
    pub leetcode_id: i64,
    pub title: String,
    pub title_cn: String,
    pub difficulty: String,
    pub category: String,
}

/// A catalog entry before it has been given an id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewProblem {
    pub leetcode_id: i64,
    pub title: String,
    pub title_cn: String,
    pub difficulty: String,
    pub category: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Read-mostly problem catalog. The tracker only asks it whether a problem
/// exists and what it looks like.
#[async_trait]
pub trait ProblemCatalog: Send + Sync {
    async fn get_problem(&self, problem_id: i64) -> Result<Option<Problem>, StoreError>;

    /// All problems in catalog order.
    async fn list_problems(&self) -> Result<Vec<Problem>, StoreError>;

    /// Inserts problems whose `leetcode_id` is unknown. Returns how many were added.
    async fn seed_problems(&self, problems: &[NewProblem]) -> Result<usize, StoreError>;

    async fn exists(&self, problem_id: i64) -> Result<bool, StoreError> {
        Ok(self.get_problem(problem_id).await?.is_some())
    }

    async fn get_metadata(&self, problem_id: i64) -> Result<Option<ProblemMetadata>, StoreError> {
        Ok(self
            .get_problem(problem_id)
            .await?
            .map(|problem| problem.metadata()))
    }
}

/// Persistence for progress records and their review instances. Every
/// method that writes more than one row does so atomically.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn load_progress(&self, problem_id: i64) -> Result<Option<ProgressRecord>, StoreError>;

    async fn load_progress_by_id(
        &self,
        progress_id: i64,
    ) -> Result<Option<ProgressRecord>, StoreError>;

    async fn list_progress(&self) -> Result<Vec<ProgressRecord>, StoreError>;

    /// Inserts the record when `record.id` is `None`, updates it otherwise.
    /// Inserting a second record for the same problem is a `Conflict`.
    async fn save_progress(&self, record: &ProgressRecord) -> Result<ProgressRecord, StoreError>;

    async fn load_review_instances(
        &self,
        progress_id: i64,
    ) -> Result<Vec<ReviewSchedule>, StoreError>;

    /// Saves `record` together with a brand new plan. Fails with `Conflict`
    /// and writes nothing if the record already owns review instances.
    async fn save_review_instances(
        &self,
        record: &ProgressRecord,
        plan: &[PlannedReview],
    ) -> Result<(ProgressRecord, Vec<ReviewSchedule>), StoreError>;

    async fn load_review(&self, review_id: i64) -> Result<Option<ReviewSchedule>, StoreError>;

    /// Stores a completed instance and its owner's counters together. Fails
    /// with `Conflict` if the stored instance is already completed.
    async fn update_review_instance(
        &self,
        review: &ReviewSchedule,
        owner: &ProgressRecord,
    ) -> Result<(), StoreError>;

    async fn list_reviews(&self, completed: Option<bool>) -> Result<Vec<ReviewSchedule>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn ProblemCatalog>,
    pub progress: Arc<dyn ProgressStore>,
}

impl Stores {
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            catalog: store.clone(),
            progress: store,
        }
    }

    pub async fn open(config: &DbConfig) -> Result<Self, StoreError> {
        if config.is_memory() {
            tracing::info!("using in-memory store");
            return Ok(Self::memory());
        }

        let store = Arc::new(SqliteStore::connect(config).await?);
        tracing::info!(url = %config.url, "sqlite store ready");
        Ok(Self {
            catalog: store.clone(),
            progress: store,
        })
    }
}

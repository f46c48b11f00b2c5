use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::db::{Problem, ProblemCatalog, ProgressStore};
use crate::services::TrackerError;
use crate::tracker::{ProgressRecord, ProgressStatus};

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemSort {
    /// Official study order.
    #[default]
    Default,
    LeetcodeId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProblemQuery {
    pub difficulty: Option<String>,
    pub category: Option<String>,
    pub status: Option<ProgressStatus>,
    #[serde(default)]
    pub sort: ProblemSort,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ProblemQuery {
    fn page(&self) -> Result<(usize, usize), TrackerError> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(TrackerError::Validation("page must be at least 1".to_string()));
        }
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(TrackerError::Validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok((page as usize, page_size as usize))
    }
}

/// Progress as it appears inside a problem listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSummary {
    pub status: ProgressStatus,
    pub attempt_count: i64,
    pub mastery_level: i64,
    pub completed_reviews: i64,
    pub total_reviews: i64,
}

impl From<&ProgressRecord> for ProgressSummary {
    fn from(record: &ProgressRecord) -> Self {
        Self {
            status: record.status,
            attempt_count: record.attempt_count,
            mastery_level: record.mastery_level,
            completed_reviews: record.completed_reviews,
            total_reviews: record.total_reviews,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProblemView {
    #[serde(flatten)]
    pub problem: Problem,
    pub progress: Option<ProgressSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProblemPage {
    pub total: usize,
    pub items: Vec<ProblemView>,
}

#[derive(Clone)]
pub struct ProblemService {
    catalog: Arc<dyn ProblemCatalog>,
    store: Arc<dyn ProgressStore>,
}

impl ProblemService {
    pub fn new(catalog: Arc<dyn ProblemCatalog>, store: Arc<dyn ProgressStore>) -> Self {
        Self { catalog, store }
    }

    pub async fn list(&self, query: &ProblemQuery) -> Result<ProblemPage, TrackerError> {
        let (page, page_size) = query.page()?;
        let progress = self.progress_by_problem().await?;

        let mut matching: Vec<Problem> = self
            .catalog
            .list_problems()
            .await?
            .into_iter()
            .filter(|problem| {
                query
                    .difficulty
                    .as_deref()
                    .map_or(true, |d| problem.difficulty.eq_ignore_ascii_case(d))
            })
            .filter(|problem| {
                query
                    .category
                    .as_deref()
                    .map_or(true, |c| problem.category == c)
            })
            .filter(|problem| {
                query.status.map_or(true, |status| {
                    let current = progress
                        .get(&problem.id)
                        .map_or(ProgressStatus::NotStarted, |record| record.status);
                    current == status
                })
            })
            .collect();

        if query.sort == ProblemSort::LeetcodeId {
            matching.sort_by_key(|problem| problem.leetcode_id);
        }

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .map(|problem| ProblemView {
                progress: progress.get(&problem.id).map(ProgressSummary::from),
                problem,
            })
            .collect();

        Ok(ProblemPage { total, items })
    }

    pub async fn get(&self, problem_id: i64) -> Result<ProblemView, TrackerError> {
        let problem = self
            .catalog
            .get_problem(problem_id)
            .await?
            .ok_or_else(|| TrackerError::NotFound(format!("problem {problem_id} not found")))?;
        let progress = self.store.load_progress(problem_id).await?;
        Ok(ProblemView {
            problem,
            progress: progress.as_ref().map(ProgressSummary::from),
        })
    }

    /// Distinct categories, sorted.
    pub async fn categories(&self) -> Result<Vec<String>, TrackerError> {
        let categories: BTreeSet<String> = self
            .catalog
            .list_problems()
            .await?
            .into_iter()
            .map(|problem| problem.category)
            .collect();
        Ok(categories.into_iter().collect())
    }

    async fn progress_by_problem(&self) -> Result<HashMap<i64, ProgressRecord>, TrackerError> {
        Ok(self
            .store
            .list_progress()
            .await?
            .into_iter()
            .map(|record| (record.problem_id, record))
            .collect())
    }
}

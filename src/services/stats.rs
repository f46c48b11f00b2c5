use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::db::{ProblemCatalog, ProgressStore};
use crate::services::TrackerError;
use crate::tracker::{classify, ProgressStatus, ReviewBucket};

const DAILY_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusStats {
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub mastered: usize,
}

impl StatusStats {
    fn bump(&mut self, status: ProgressStatus) {
        match status {
            ProgressStatus::NotStarted => self.not_started += 1,
            ProgressStatus::InProgress => self.in_progress += 1,
            ProgressStatus::Completed => self.completed += 1,
            ProgressStatus::Mastered => self.mastered += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DifficultyStats {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub total: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsOverview {
    pub total_problems: usize,
    pub completed_count: usize,
    /// Percentage, one decimal.
    pub completion_rate: f64,
    pub status_stats: StatusStats,
    pub difficulty_stats: DifficultyStats,
    pub category_stats: Vec<CategoryStats>,
    pub daily_stats: Vec<DailyStats>,
    pub pending_reviews: usize,
    pub overdue_reviews: usize,
}

#[derive(Clone)]
pub struct StatsService {
    catalog: Arc<dyn ProblemCatalog>,
    store: Arc<dyn ProgressStore>,
}

impl StatsService {
    pub fn new(catalog: Arc<dyn ProblemCatalog>, store: Arc<dyn ProgressStore>) -> Self {
        Self { catalog, store }
    }

    pub async fn overview(&self, today: NaiveDate) -> Result<StatsOverview, TrackerError> {
        let problems = self.catalog.list_problems().await?;
        let records: HashMap<i64, ProgressStatus> = self
            .store
            .list_progress()
            .await?
            .into_iter()
            .map(|record| (record.problem_id, record.status))
            .collect();

        let mut status_stats = StatusStats::default();
        let mut difficulty_stats = DifficultyStats::default();
        let mut categories: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        let mut completed_count = 0;

        for problem in &problems {
            let status = records
                .get(&problem.id)
                .copied()
                .unwrap_or(ProgressStatus::NotStarted);
            status_stats.bump(status);

            match problem.difficulty.to_ascii_lowercase().as_str() {
                "easy" => difficulty_stats.easy += 1,
                "medium" => difficulty_stats.medium += 1,
                "hard" => difficulty_stats.hard += 1,
                _ => {}
            }

            let entry = categories.entry(problem.category.clone()).or_default();
            entry.0 += 1;
            if status.is_started() {
                entry.1 += 1;
                completed_count += 1;
            }
        }

        let total_problems = problems.len();
        let completion_rate = if total_problems == 0 {
            0.0
        } else {
            (completed_count as f64 / total_problems as f64 * 1000.0).round() / 10.0
        };

        let pending = self.store.list_reviews(Some(false)).await?;
        let overdue_reviews = pending
            .iter()
            .filter(|review| classify(review.scheduled_date, today) == ReviewBucket::Overdue)
            .count();

        Ok(StatsOverview {
            total_problems,
            completed_count,
            completion_rate,
            status_stats,
            difficulty_stats,
            category_stats: categories
                .into_iter()
                .map(|(category, (total, completed))| CategoryStats {
                    category,
                    total,
                    completed,
                })
                .collect(),
            daily_stats: self.daily_activity(today).await?,
            pending_reviews: pending.len(),
            overdue_reviews,
        })
    }

    /// Problems last touched on each day of the trailing window.
    async fn daily_activity(&self, today: NaiveDate) -> Result<Vec<DailyStats>, TrackerError> {
        let since = today - Duration::days(DAILY_WINDOW_DAYS);
        let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();

        for record in self.store.list_progress().await? {
            if let Some(at) = record.last_attempt {
                let day = at.date_naive();
                if day >= since && day <= today {
                    *per_day.entry(day).or_default() += 1;
                }
            }
        }

        Ok(per_day
            .into_iter()
            .map(|(date, count)| DailyStats { date, count })
            .collect())
    }
}

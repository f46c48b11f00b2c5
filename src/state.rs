use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::config::TrackerConfig;
use crate::db::{ProblemCatalog, ProgressStore, Stores};
use crate::services::locks::RecordLocks;
use crate::services::problems::ProblemService;
use crate::services::progress::ProgressService;
use crate::services::reviews::ReviewService;
use crate::services::stats::StatsService;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    stores: Stores,
    settings: Arc<TrackerConfig>,
    locks: RecordLocks,
}

impl AppState {
    pub fn new(stores: Stores, settings: TrackerConfig) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            stores,
            settings: Arc::new(settings),
            locks: RecordLocks::new(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn catalog(&self) -> Arc<dyn ProblemCatalog> {
        Arc::clone(&self.stores.catalog)
    }

    pub fn store(&self) -> Arc<dyn ProgressStore> {
        Arc::clone(&self.stores.progress)
    }

    pub fn settings(&self) -> Arc<TrackerConfig> {
        Arc::clone(&self.settings)
    }

    pub fn progress_service(&self) -> ProgressService {
        ProgressService::new(
            self.catalog(),
            self.store(),
            self.settings(),
            self.locks.clone(),
        )
    }

    pub fn review_service(&self) -> ReviewService {
        ReviewService::new(
            self.catalog(),
            self.store(),
            self.settings(),
            self.locks.clone(),
        )
    }

    pub fn problem_service(&self) -> ProblemService {
        ProblemService::new(self.catalog(), self.store())
    }

    pub fn stats_service(&self) -> StatsService {
        StatsService::new(self.catalog(), self.store())
    }
}

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::db::config::DbConfig;
use crate::db::schema::{split_sql_statements, SCHEMA_SQL, SCHEMA_VERSION};
use crate::db::{NewProblem, Problem, ProblemCatalog, ProgressStore, StoreError};
use crate::tracker::{PlannedReview, ProgressRecord, ProgressStatus, ReviewSchedule};

const PROGRESS_COLUMNS: &str = r#""id", "problem_id", "status", "attempt_count", "mastery_level",
    "completed_reviews", "total_reviews", "first_solved", "last_attempt""#;

const REVIEW_COLUMNS: &str =
    r#""id", "progress_id", "scheduled_date", "review_round", "completed", "completed_at""#;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(config: &DbConfig) -> Result<Self, StoreError> {
        if let Some(path) = config.sqlite_path() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }

        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(config.journal_mode.to_sqlx())
            .synchronous(config.synchronous.to_sqlx())
            .busy_timeout(config.busy_timeout)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);
        if config.is_sqlite_in_memory() {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        let version: Option<String> = sqlx::query_scalar(
            r#"SELECT "value" FROM "_db_metadata" WHERE "key" = 'schema_version'"#,
        )
        .fetch_optional(&self.pool)
        .await
        .unwrap_or(None);

        if let Some(version) = version {
            tracing::debug!(%version, "schema up to date");
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for stmt in split_sql_statements(SCHEMA_SQL) {
            sqlx::query(&stmt).execute(&mut *tx).await?;
        }
        sqlx::query(
            r#"INSERT OR REPLACE INTO "_db_metadata" ("key", "value") VALUES ('schema_version', ?)"#,
        )
        .bind(SCHEMA_VERSION)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(version = SCHEMA_VERSION, "sqlite schema created");
        Ok(())
    }

    async fn count_reviews(
        tx: &mut Transaction<'_, Sqlite>,
        progress_id: i64,
    ) -> Result<i64, StoreError> {
        let count: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM "review_plans" WHERE "progress_id" = ?"#)
                .bind(progress_id)
                .fetch_one(&mut **tx)
                .await?;
        Ok(count)
    }

    async fn write_progress(
        tx: &mut Transaction<'_, Sqlite>,
        record: &ProgressRecord,
    ) -> Result<ProgressRecord, StoreError> {
        match record.id {
            None => {
                let result = sqlx::query(
                    r#"INSERT INTO "progress"
                       ("problem_id", "status", "attempt_count", "mastery_level",
                        "completed_reviews", "total_reviews", "first_solved", "last_attempt")
                       VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
                )
                .bind(record.problem_id)
                .bind(record.status.as_str())
                .bind(record.attempt_count)
                .bind(record.mastery_level)
                .bind(record.completed_reviews)
                .bind(record.total_reviews)
                .bind(record.first_solved)
                .bind(record.last_attempt)
                .execute(&mut **tx)
                .await
                .map_err(|err| unique_to_conflict(err, record.problem_id))?;

                Ok(ProgressRecord {
                    id: Some(result.last_insert_rowid()),
                    ..record.clone()
                })
            }
            Some(id) => {
                let result = sqlx::query(
                    r#"UPDATE "progress" SET
                       "status" = ?, "attempt_count" = ?, "mastery_level" = ?,
                       "completed_reviews" = ?, "total_reviews" = ?,
                       "first_solved" = ?, "last_attempt" = ?
                       WHERE "id" = ?"#,
                )
                .bind(record.status.as_str())
                .bind(record.attempt_count)
                .bind(record.mastery_level)
                .bind(record.completed_reviews)
                .bind(record.total_reviews)
                .bind(record.first_solved)
                .bind(record.last_attempt)
                .bind(id)
                .execute(&mut **tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(StoreError::Missing(format!("progress {id}")));
                }
                Ok(record.clone())
            }
        }
    }
}

fn unique_to_conflict(err: sqlx::Error, problem_id: i64) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(format!(
            "problem {problem_id} already has a progress record"
        )),
        _ => StoreError::Sqlx(err),
    }
}

fn map_problem(row: &SqliteRow) -> Result<Problem, StoreError> {
    Ok(Problem {
        id: row.try_get("id")?,
        leetcode_id: row.try_get("leetcode_id")?,
        title: row.try_get("title")?,
        title_cn: row.try_get("title_cn")?,
        difficulty: row.try_get("difficulty")?,
        category: row.try_get("category")?,
        url: row.try_get::<Option<String>, _>("url")?,
    })
}

fn map_progress(row: &SqliteRow) -> Result<ProgressRecord, StoreError> {
    let raw_status: String = row.try_get("status")?;
    let status = ProgressStatus::parse(&raw_status)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown progress status {raw_status:?}")))?;

    Ok(ProgressRecord {
        id: Some(row.try_get("id")?),
        problem_id: row.try_get("problem_id")?,
        status,
        attempt_count: row.try_get("attempt_count")?,
        mastery_level: row.try_get("mastery_level")?,
        completed_reviews: row.try_get("completed_reviews")?,
        total_reviews: row.try_get("total_reviews")?,
        first_solved: row.try_get("first_solved")?,
        last_attempt: row.try_get("last_attempt")?,
    })
}

fn map_review(row: &SqliteRow) -> Result<ReviewSchedule, StoreError> {
    Ok(ReviewSchedule {
        id: row.try_get("id")?,
        progress_id: row.try_get("progress_id")?,
        scheduled_date: row.try_get("scheduled_date")?,
        review_round: row.try_get("review_round")?,
        completed: row.try_get::<i64, _>("completed")? != 0,
        completed_at: row.try_get("completed_at")?,
    })
}

#[async_trait]
impl ProblemCatalog for SqliteStore {
    async fn get_problem(&self, problem_id: i64) -> Result<Option<Problem>, StoreError> {
        let row = sqlx::query(
            r#"SELECT "id", "leetcode_id", "title", "title_cn", "difficulty", "category", "url"
               FROM "problems" WHERE "id" = ?"#,
        )
        .bind(problem_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_problem).transpose()
    }

    async fn list_problems(&self) -> Result<Vec<Problem>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT "id", "leetcode_id", "title", "title_cn", "difficulty", "category", "url"
               FROM "problems" ORDER BY "id" ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_problem).collect()
    }

    async fn seed_problems(&self, problems: &[NewProblem]) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for problem in problems {
            let result = sqlx::query(
                r#"INSERT OR IGNORE INTO "problems"
                   ("leetcode_id", "title", "title_cn", "difficulty", "category", "url")
                   VALUES (?, ?, ?, ?, ?, ?)"#,
            )
            .bind(problem.leetcode_id)
            .bind(&problem.title)
            .bind(&problem.title_cn)
            .bind(&problem.difficulty)
            .bind(&problem.category)
            .bind(&problem.url)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(inserted)
    }
}

#[async_trait]
impl ProgressStore for SqliteStore {
    async fn load_progress(&self, problem_id: i64) -> Result<Option<ProgressRecord>, StoreError> {
        let sql = format!(r#"SELECT {PROGRESS_COLUMNS} FROM "progress" WHERE "problem_id" = ?"#);
        let row = sqlx::query(&sql)
            .bind(problem_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_progress).transpose()
    }

    async fn load_progress_by_id(
        &self,
        progress_id: i64,
    ) -> Result<Option<ProgressRecord>, StoreError> {
        let sql = format!(r#"SELECT {PROGRESS_COLUMNS} FROM "progress" WHERE "id" = ?"#);
        let row = sqlx::query(&sql)
            .bind(progress_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_progress).transpose()
    }

    async fn list_progress(&self) -> Result<Vec<ProgressRecord>, StoreError> {
        let sql = format!(r#"SELECT {PROGRESS_COLUMNS} FROM "progress" ORDER BY "id" ASC"#);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(map_progress).collect()
    }

    async fn save_progress(&self, record: &ProgressRecord) -> Result<ProgressRecord, StoreError> {
        let mut tx = self.pool.begin().await?;
        let stored = Self::write_progress(&mut tx, record).await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn load_review_instances(
        &self,
        progress_id: i64,
    ) -> Result<Vec<ReviewSchedule>, StoreError> {
        let sql = format!(
            r#"SELECT {REVIEW_COLUMNS} FROM "review_plans"
               WHERE "progress_id" = ? ORDER BY "review_round" ASC"#
        );
        let rows = sqlx::query(&sql)
            .bind(progress_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(map_review).collect()
    }

    async fn save_review_instances(
        &self,
        record: &ProgressRecord,
        plan: &[PlannedReview],
    ) -> Result<(ProgressRecord, Vec<ReviewSchedule>), StoreError> {
        let mut tx = self.pool.begin().await?;

        if let Some(id) = record.id {
            if Self::count_reviews(&mut tx, id).await? > 0 {
                return Err(StoreError::Conflict(format!(
                    "progress {id} already has a review plan"
                )));
            }
        }

        let stored = Self::write_progress(&mut tx, record).await?;
        let progress_id = stored
            .id
            .ok_or_else(|| StoreError::Corrupt("progress saved without id".to_string()))?;

        let mut created = Vec::with_capacity(plan.len());
        for planned in plan {
            let result = sqlx::query(
                r#"INSERT INTO "review_plans"
                   ("progress_id", "scheduled_date", "review_round", "completed")
                   VALUES (?, ?, ?, 0)"#,
            )
            .bind(progress_id)
            .bind(planned.scheduled_date)
            .bind(planned.review_round)
            .execute(&mut *tx)
            .await
            .map_err(|err| match &err {
                sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(
                    format!("progress {progress_id} already has a review plan"),
                ),
                _ => StoreError::Sqlx(err),
            })?;

            created.push(ReviewSchedule {
                id: result.last_insert_rowid(),
                progress_id,
                scheduled_date: planned.scheduled_date,
                review_round: planned.review_round,
                completed: false,
                completed_at: None,
            });
        }

        tx.commit().await?;
        Ok((stored, created))
    }

    async fn load_review(&self, review_id: i64) -> Result<Option<ReviewSchedule>, StoreError> {
        let sql = format!(r#"SELECT {REVIEW_COLUMNS} FROM "review_plans" WHERE "id" = ?"#);
        let row = sqlx::query(&sql)
            .bind(review_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_review).transpose()
    }

    async fn update_review_instance(
        &self,
        review: &ReviewSchedule,
        owner: &ProgressRecord,
    ) -> Result<(), StoreError> {
        if owner.id.is_none() {
            return Err(StoreError::Missing(format!(
                "progress for problem {}",
                owner.problem_id
            )));
        }

        let mut tx = self.pool.begin().await?;

        // Only a pending row may flip; a concurrent completion leaves 0 rows.
        let result = sqlx::query(
            r#"UPDATE "review_plans" SET "completed" = ?, "completed_at" = ?
               WHERE "id" = ? AND "completed" = 0"#,
        )
        .bind(i64::from(review.completed))
        .bind(review.completed_at)
        .bind(review.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<i64> =
                sqlx::query_scalar(r#"SELECT "id" FROM "review_plans" WHERE "id" = ?"#)
                    .bind(review.id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(match exists {
                Some(_) => StoreError::Conflict(format!("review {} already completed", review.id)),
                None => StoreError::Missing(format!("review {}", review.id)),
            });
        }

        Self::write_progress(&mut tx, owner).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_reviews(&self, completed: Option<bool>) -> Result<Vec<ReviewSchedule>, StoreError> {
        let rows = match completed {
            Some(flag) => {
                let sql = format!(
                    r#"SELECT {REVIEW_COLUMNS} FROM "review_plans"
                       WHERE "completed" = ? ORDER BY "scheduled_date" ASC, "id" ASC"#
                );
                sqlx::query(&sql)
                    .bind(i64::from(flag))
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    r#"SELECT {REVIEW_COLUMNS} FROM "review_plans"
                       ORDER BY "scheduled_date" ASC, "id" ASC"#
                );
                sqlx::query(&sql).fetch_all(&self.pool).await?
            }
        };
        rows.iter().map(map_review).collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

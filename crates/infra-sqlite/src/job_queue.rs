// SQLite JobQueue Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use confpush_core::domain::{
    ActiveJob, ActiveJobSnapshot, EnqueueOutcome, JobId, JobKind, JobState, QueuedJob,
};
use confpush_core::error::{AppError, Result};
use confpush_core::port::{IdProvider, JobQueue, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, warn};

/// Worker name reported for active rows that lost their worker id
const UNKNOWN_WORKER: &str = "unknown";

/// Job queue backed by the `jobs` table
///
/// External workers claim and finish jobs through the inherent methods;
/// the dispatcher only uses the `JobQueue` port. Pending jobs carry a
/// dedup key with a partial unique index, so enqueueing a job whose twin is
/// still pending coalesces instead of duplicating.
pub struct SqliteJobQueue {
    pool: SqlitePool,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteJobQueue {
    pub fn new(
        pool: SqlitePool,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            pool,
            id_provider,
            time_provider,
        }
    }

    /// Atomically move the oldest pending job to ACTIVE for `worker_id`
    pub async fn claim_next(&self, worker_id: &str) -> Result<Option<QueuedJob>> {
        let now = self.time_provider.now_millis();

        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs
            SET state = ?, worker_id = ?, started_at = ?
            WHERE id = (
                SELECT id FROM jobs
                WHERE state = ?
                ORDER BY created_at ASC, rowid ASC
                LIMIT 1
            )
            RETURNING id, name, args, state, worker_id, created_at, started_at, finished_at
            "#,
        )
        .bind(JobState::Active.to_string())
        .bind(worker_id)
        .bind(now)
        .bind(JobState::Pending.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let job = row.map(JobRow::into_job).transpose()?;
        if let Some(job) = &job {
            debug!(job_id = %job.id, worker = %worker_id, "Job claimed");
        }
        Ok(job)
    }

    /// Mark an active job as done
    pub async fn complete(&self, job_id: &str) -> Result<()> {
        self.finish(job_id, JobState::Done).await
    }

    /// Mark an active job as failed
    pub async fn fail(&self, job_id: &str) -> Result<()> {
        self.finish(job_id, JobState::Failed).await
    }

    async fn finish(&self, job_id: &str, state: JobState) -> Result<()> {
        let result = sqlx::query(
            "UPDATE jobs SET state = ?, finished_at = ? WHERE id = ? AND state = ?",
        )
        .bind(state.to_string())
        .bind(self.time_provider.now_millis())
        .bind(job_id)
        .bind(JobState::Active.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("active job {}", job_id)));
        }
        Ok(())
    }

    /// Find a job by id
    pub async fn find_by_id(&self, job_id: &str) -> Result<Option<QueuedJob>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, name, args, state, worker_id, created_at, started_at, finished_at
            FROM jobs WHERE id = ?
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(JobRow::into_job).transpose()
    }

    /// Count jobs in a state
    pub async fn count_by_state(&self, state: JobState) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE state = ?")
            .bind(state.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn pending_twin(&self, dedup_key: &str) -> Result<Option<JobId>> {
        sqlx::query_scalar("SELECT id FROM jobs WHERE dedup_key = ? AND state = ?")
            .bind(dedup_key)
            .bind(JobState::Pending.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl JobQueue for SqliteJobQueue {
    async fn inspect_active(&self) -> Result<ActiveJobSnapshot> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, name, args, state, worker_id, created_at, started_at, finished_at
            FROM jobs WHERE state = ?
            ORDER BY started_at ASC, rowid ASC
            "#,
        )
        .bind(JobState::Active.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut snapshot = ActiveJobSnapshot::new();
        for row in rows {
            let args: Vec<serde_json::Value> = serde_json::from_str(&row.args)?;
            let worker = row
                .worker_id
                .unwrap_or_else(|| UNKNOWN_WORKER.to_string());
            snapshot.insert(worker, ActiveJob::new(row.id, row.name, args));
        }
        Ok(snapshot)
    }

    async fn enqueue(&self, job: &JobKind) -> Result<EnqueueOutcome> {
        let dedup_key = job.dedup_key();
        let args = serde_json::to_string(&job.args())?;

        // The pending twin can be claimed between the ignored insert and the
        // lookup; one more insert attempt covers that window.
        for _ in 0..2 {
            let job_id = self.id_provider.generate_id();
            let inserted = sqlx::query(
                r#"
                INSERT OR IGNORE INTO jobs (id, name, args, dedup_key, state, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&job_id)
            .bind(job.name())
            .bind(&args)
            .bind(&dedup_key)
            .bind(JobState::Pending.to_string())
            .bind(self.time_provider.now_millis())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

            if inserted == 1 {
                return Ok(EnqueueOutcome::Enqueued(job_id));
            }
            if let Some(existing) = self.pending_twin(&dedup_key).await? {
                return Ok(EnqueueOutcome::Coalesced(existing));
            }
        }

        warn!(dedup_key = %dedup_key, "Enqueue kept colliding with a vanishing pending job");
        Err(AppError::Queue(format!("could not enqueue {}", dedup_key)))
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    name: String,
    args: String,
    state: String,
    worker_id: Option<String>,
    created_at: i64,
    started_at: Option<i64>,
    finished_at: Option<i64>,
}

impl JobRow {
    fn into_job(self) -> Result<QueuedJob> {
        let args: Vec<serde_json::Value> = serde_json::from_str(&self.args)?;
        Ok(QueuedJob {
            kind: JobKind::from_parts(&self.name, &args)?,
            state: self.state.parse()?,
            id: self.id,
            worker_id: self.worker_id,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
        })
    }
}

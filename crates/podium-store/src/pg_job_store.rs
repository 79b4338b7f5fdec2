//! `PostgreSQL` implementation of the `JobStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use podium_core::error::DomainError;
use podium_core::job::{DeadLetter, InsertOutcome, JobStore, ScheduledJob};

use crate::db_error;

/// PostgreSQL-backed durable job table.
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    /// Creates a new `PgJobStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_job(row: &PgRow) -> Result<ScheduledJob, sqlx::Error> {
    Ok(ScheduledJob {
        job_id: row.try_get("job_id")?,
        job_type: row.try_get("job_type")?,
        payload: row.try_get("payload")?,
        run_at: row.try_get("run_at")?,
        unique_key: row.try_get("unique_key")?,
    })
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert(&self, job: &ScheduledJob) -> Result<InsertOutcome, DomainError> {
        // The partial unique index on unique_key makes the check and the
        // insert a single atomic statement.
        let result = sqlx::query(
            r"
            INSERT INTO scheduled_jobs (job_id, job_type, payload, run_at, unique_key)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(job.job_id)
        .bind(&job.job_type)
        .bind(&job.payload)
        .bind(job.run_at)
        .bind(job.unique_key.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(&e))?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::Duplicate)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn complete(&self, job_id: Uuid) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM scheduled_jobs WHERE job_id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error(&e))?;
        Ok(())
    }

    async fn dead_letter(
        &self,
        job_id: Uuid,
        reason: &str,
        failed_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error(&e))?;

        let row = sqlx::query(
            r"
            DELETE FROM scheduled_jobs WHERE job_id = $1
            RETURNING job_id, job_type, payload, run_at, unique_key
            ",
        )
        .bind(job_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error(&e))?;

        if let Some(row) = row {
            let job = row_to_job(&row).map_err(|e| db_error(&e))?;
            sqlx::query(
                r"
                INSERT INTO dead_letter_jobs
                    (job_id, job_type, payload, run_at, unique_key, reason, failed_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (job_id) DO NOTHING
                ",
            )
            .bind(job.job_id)
            .bind(&job.job_type)
            .bind(&job.payload)
            .bind(job.run_at)
            .bind(job.unique_key.as_deref())
            .bind(reason)
            .bind(failed_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error(&e))?;
        }

        tx.commit().await.map_err(|e| db_error(&e))?;
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<ScheduledJob>, DomainError> {
        let rows = sqlx::query(
            r"
            SELECT job_id, job_type, payload, run_at, unique_key
            FROM scheduled_jobs
            ORDER BY run_at ASC, job_id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(&e))?;

        rows.iter()
            .map(row_to_job)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| db_error(&e))
    }

    async fn dead_letters(&self) -> Result<Vec<DeadLetter>, DomainError> {
        let rows = sqlx::query(
            r"
            SELECT job_id, job_type, payload, run_at, unique_key, reason, failed_at
            FROM dead_letter_jobs
            ORDER BY failed_at ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(&e))?;

        rows.iter()
            .map(|row| {
                Ok(DeadLetter {
                    job: row_to_job(row)?,
                    reason: row.try_get("reason")?,
                    failed_at: row.try_get("failed_at")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| db_error(&e))
    }
}

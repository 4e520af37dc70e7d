use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;

use modelfleet_core::JobStatus;

use crate::{
    models::TrainingJob,
    persistence::{Persistence, TrainingJobPersistence},
};

#[derive(Debug)]
pub struct TrainingJobRelationalPersistence {
    pub db: Arc<PgPool>,
}

#[derive(sqlx::FromRow)]
struct TrainingJobRow {
    id: String,
    organization_id: String,
    name: String,
    description: Option<String>,
    ai_module: String,
    dataset_id: String,
    base_model_version: Option<String>,
    hyperparameters: serde_json::Value,

    status: String,
    progress_percent: i32,
    current_epoch: Option<i32>,
    total_epochs: Option<i32>,
    metrics: Option<serde_json::Value>,
    training_logs: Option<String>,
    error_message: Option<String>,
    estimated_completion: Option<DateTime<Utc>>,
    annotations: serde_json::Value,

    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,

    sequence: i64,
}

impl TryFrom<TrainingJobRow> for TrainingJob {
    type Error = anyhow::Error;

    fn try_from(row: TrainingJobRow) -> anyhow::Result<Self> {
        Ok(Self {
            id: row.id,
            organization_id: row.organization_id,
            name: row.name,
            description: row.description,
            ai_module: row.ai_module,
            dataset_id: row.dataset_id,
            base_model_version: row.base_model_version,
            hyperparameters: row.hyperparameters,
            status: JobStatus::from_str(&row.status)?,
            progress_percent: row.progress_percent,
            current_epoch: row.current_epoch,
            total_epochs: row.total_epochs,
            metrics: row.metrics.map(serde_json::from_value).transpose()?,
            training_logs: row.training_logs,
            error_message: row.error_message,
            estimated_completion: row.estimated_completion,
            annotations: row.annotations,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            sequence: row.sequence,
        })
    }
}

#[async_trait]
impl Persistence<TrainingJob> for TrainingJobRelationalPersistence {
    #[tracing::instrument(name = "relational::training_job::create")]
    async fn create(&self, job: &TrainingJob) -> anyhow::Result<String> {
        sqlx::query(
            r#"
            INSERT INTO training_jobs
                (id, organization_id, name, description, ai_module, dataset_id,
                 base_model_version, hyperparameters, status, progress_percent,
                 current_epoch, total_epochs, metrics, training_logs, error_message,
                 estimated_completion, annotations, created_at, started_at,
                 completed_at, sequence)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                    $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            "#,
        )
        .bind(&job.id)
        .bind(&job.organization_id)
        .bind(&job.name)
        .bind(&job.description)
        .bind(&job.ai_module)
        .bind(&job.dataset_id)
        .bind(&job.base_model_version)
        .bind(&job.hyperparameters)
        .bind(job.status.as_str())
        .bind(job.progress_percent)
        .bind(job.current_epoch)
        .bind(job.total_epochs)
        .bind(job.metrics.as_ref().map(serde_json::to_value).transpose()?)
        .bind(&job.training_logs)
        .bind(&job.error_message)
        .bind(job.estimated_completion)
        .bind(&job.annotations)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(job.sequence)
        .execute(&*self.db)
        .await?;

        Ok(job.id.clone())
    }

    #[tracing::instrument(name = "relational::training_job::update")]
    async fn update(&self, job: &TrainingJob) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE training_jobs
            SET status = $1, progress_percent = $2, current_epoch = $3,
                total_epochs = $4, metrics = $5, training_logs = $6,
                error_message = $7, estimated_completion = $8, annotations = $9,
                started_at = $10, completed_at = $11, sequence = sequence + 1
            WHERE id = $12 AND sequence = $13
            "#,
        )
        .bind(job.status.as_str())
        .bind(job.progress_percent)
        .bind(job.current_epoch)
        .bind(job.total_epochs)
        .bind(job.metrics.as_ref().map(serde_json::to_value).transpose()?)
        .bind(&job.training_logs)
        .bind(&job.error_message)
        .bind(job.estimated_completion)
        .bind(&job.annotations)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(&job.id)
        .bind(job.sequence)
        .execute(&*self.db)
        .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(name = "relational::training_job::get_by_id")]
    async fn get_by_id(&self, job_id: &str) -> anyhow::Result<Option<TrainingJob>> {
        let row = sqlx::query_as::<_, TrainingJobRow>("SELECT * FROM training_jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&*self.db)
            .await?;

        row.map(TrainingJob::try_from).transpose()
    }

    #[tracing::instrument(name = "relational::training_job::list")]
    async fn list(&self) -> anyhow::Result<Vec<TrainingJob>> {
        let rows =
            sqlx::query_as::<_, TrainingJobRow>("SELECT * FROM training_jobs ORDER BY created_at")
                .fetch_all(&*self.db)
                .await?;

        rows.into_iter().map(TrainingJob::try_from).collect()
    }
}

#[async_trait]
impl TrainingJobPersistence for TrainingJobRelationalPersistence {
    #[tracing::instrument(name = "relational::training_job::get_by_organization_id")]
    async fn get_by_organization_id(
        &self,
        organization_id: &str,
    ) -> anyhow::Result<Vec<TrainingJob>> {
        let rows = sqlx::query_as::<_, TrainingJobRow>(
            "SELECT * FROM training_jobs WHERE organization_id = $1 ORDER BY created_at",
        )
        .bind(organization_id)
        .fetch_all(&*self.db)
        .await?;

        rows.into_iter().map(TrainingJob::try_from).collect()
    }

    #[tracing::instrument(name = "relational::training_job::get_by_status")]
    async fn get_by_status(&self, status: JobStatus) -> anyhow::Result<Vec<TrainingJob>> {
        let rows = sqlx::query_as::<_, TrainingJobRow>(
            "SELECT * FROM training_jobs WHERE status = $1 ORDER BY created_at",
        )
        .bind(status.as_str())
        .fetch_all(&*self.db)
        .await?;

        rows.into_iter().map(TrainingJob::try_from).collect()
    }
}

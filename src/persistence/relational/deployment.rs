use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;

use modelfleet_core::{DeploymentStatus, FailureKind};

use crate::{
    models::Deployment,
    persistence::{DeploymentPersistence, Persistence},
};

#[derive(Debug)]
pub struct DeploymentRelationalPersistence {
    pub db: Arc<PgPool>,
}

#[derive(sqlx::FromRow)]
struct DeploymentRow {
    id: String,
    model_version_id: String,
    target_id: String,

    status: String,
    progress_percent: i32,
    retry_count: i32,
    error_message: Option<String>,
    failure_kind: Option<String>,

    scheduled_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,

    sequence: i64,
}

impl TryFrom<DeploymentRow> for Deployment {
    type Error = anyhow::Error;

    fn try_from(row: DeploymentRow) -> anyhow::Result<Self> {
        Ok(Self {
            id: row.id,
            model_version_id: row.model_version_id,
            target_id: row.target_id,
            status: DeploymentStatus::from_str(&row.status)?,
            progress_percent: row.progress_percent,
            retry_count: row.retry_count,
            error_message: row.error_message,
            failure_kind: row
                .failure_kind
                .as_deref()
                .map(FailureKind::from_str)
                .transpose()?,
            scheduled_at: row.scheduled_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            sequence: row.sequence,
        })
    }
}

#[async_trait]
impl Persistence<Deployment> for DeploymentRelationalPersistence {
    #[tracing::instrument(name = "relational::deployment::create")]
    async fn create(&self, deployment: &Deployment) -> anyhow::Result<String> {
        sqlx::query(
            r#"
            INSERT INTO deployments
                (id, model_version_id, target_id, status, progress_percent,
                 retry_count, error_message, failure_kind, scheduled_at,
                 started_at, completed_at, sequence)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&deployment.id)
        .bind(&deployment.model_version_id)
        .bind(&deployment.target_id)
        .bind(deployment.status.as_str())
        .bind(deployment.progress_percent)
        .bind(deployment.retry_count)
        .bind(&deployment.error_message)
        .bind(deployment.failure_kind.map(|kind| kind.as_str()))
        .bind(deployment.scheduled_at)
        .bind(deployment.started_at)
        .bind(deployment.completed_at)
        .bind(deployment.sequence)
        .execute(&*self.db)
        .await?;

        Ok(deployment.id.clone())
    }

    #[tracing::instrument(name = "relational::deployment::update")]
    async fn update(&self, deployment: &Deployment) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE deployments
            SET status = $1, progress_percent = $2, retry_count = $3,
                error_message = $4, failure_kind = $5, scheduled_at = $6,
                started_at = $7, completed_at = $8, sequence = sequence + 1
            WHERE id = $9 AND sequence = $10
            "#,
        )
        .bind(deployment.status.as_str())
        .bind(deployment.progress_percent)
        .bind(deployment.retry_count)
        .bind(&deployment.error_message)
        .bind(deployment.failure_kind.map(|kind| kind.as_str()))
        .bind(deployment.scheduled_at)
        .bind(deployment.started_at)
        .bind(deployment.completed_at)
        .bind(&deployment.id)
        .bind(deployment.sequence)
        .execute(&*self.db)
        .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(name = "relational::deployment::get_by_id")]
    async fn get_by_id(&self, deployment_id: &str) -> anyhow::Result<Option<Deployment>> {
        let row = sqlx::query_as::<_, DeploymentRow>("SELECT * FROM deployments WHERE id = $1")
            .bind(deployment_id)
            .fetch_optional(&*self.db)
            .await?;

        row.map(Deployment::try_from).transpose()
    }

    #[tracing::instrument(name = "relational::deployment::list")]
    async fn list(&self) -> anyhow::Result<Vec<Deployment>> {
        let rows =
            sqlx::query_as::<_, DeploymentRow>("SELECT * FROM deployments ORDER BY scheduled_at")
                .fetch_all(&*self.db)
                .await?;

        rows.into_iter().map(Deployment::try_from).collect()
    }
}

#[async_trait]
impl DeploymentPersistence for DeploymentRelationalPersistence {
    #[tracing::instrument(name = "relational::deployment::get_by_model_version_id")]
    async fn get_by_model_version_id(
        &self,
        model_version_id: &str,
    ) -> anyhow::Result<Vec<Deployment>> {
        let rows = sqlx::query_as::<_, DeploymentRow>(
            "SELECT * FROM deployments WHERE model_version_id = $1 ORDER BY scheduled_at",
        )
        .bind(model_version_id)
        .fetch_all(&*self.db)
        .await?;

        rows.into_iter().map(Deployment::try_from).collect()
    }

    #[tracing::instrument(name = "relational::deployment::get_by_target_id")]
    async fn get_by_target_id(&self, target_id: &str) -> anyhow::Result<Vec<Deployment>> {
        let rows = sqlx::query_as::<_, DeploymentRow>(
            "SELECT * FROM deployments WHERE target_id = $1 ORDER BY scheduled_at",
        )
        .bind(target_id)
        .fetch_all(&*self.db)
        .await?;

        rows.into_iter().map(Deployment::try_from).collect()
    }

    #[tracing::instrument(name = "relational::deployment::get_by_status")]
    async fn get_by_status(&self, status: DeploymentStatus) -> anyhow::Result<Vec<Deployment>> {
        let rows = sqlx::query_as::<_, DeploymentRow>(
            "SELECT * FROM deployments WHERE status = $1 ORDER BY scheduled_at",
        )
        .bind(status.as_str())
        .fetch_all(&*self.db)
        .await?;

        rows.into_iter().map(Deployment::try_from).collect()
    }

    #[tracing::instrument(name = "relational::deployment::get_active_by_version_and_target")]
    async fn get_active_by_version_and_target(
        &self,
        model_version_id: &str,
        target_id: &str,
    ) -> anyhow::Result<Option<Deployment>> {
        let row = sqlx::query_as::<_, DeploymentRow>(
            r#"
            SELECT * FROM deployments
            WHERE model_version_id = $1 AND target_id = $2
              AND status NOT IN ('completed', 'failed')
            LIMIT 1
            "#,
        )
        .bind(model_version_id)
        .bind(target_id)
        .fetch_optional(&*self.db)
        .await?;

        row.map(Deployment::try_from).transpose()
    }
}

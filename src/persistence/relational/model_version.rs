use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;

use modelfleet_core::VersionStatus;

use crate::{
    models::ModelVersion,
    persistence::{ModelVersionPersistence, Persistence},
};

#[derive(Debug)]
pub struct ModelVersionRelationalPersistence {
    pub db: Arc<PgPool>,
}

#[derive(sqlx::FromRow)]
struct ModelVersionRow {
    id: String,
    ai_module: String,
    version: String,
    name: Option<String>,
    description: Option<String>,
    training_job_id: Option<String>,
    base_version_id: Option<String>,

    model_file_url: Option<String>,
    model_file_size: Option<i64>,
    config_file_url: Option<String>,

    accuracy: Option<f64>,
    precision_score: Option<f64>,
    recall_score: Option<f64>,
    f1_score: Option<f64>,
    inference_time_ms: Option<f64>,

    min_edge_version: Option<String>,
    supported_platforms: Option<Vec<String>>,

    status: String,
    is_approved: bool,
    approved_by: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    is_released: bool,
    released_by: Option<String>,
    released_at: Option<DateTime<Utc>>,
    release_notes: Option<String>,

    created_at: DateTime<Utc>,

    sequence: i64,
}

impl TryFrom<ModelVersionRow> for ModelVersion {
    type Error = anyhow::Error;

    fn try_from(row: ModelVersionRow) -> anyhow::Result<Self> {
        Ok(Self {
            id: row.id,
            ai_module: row.ai_module,
            version: row.version,
            name: row.name,
            description: row.description,
            training_job_id: row.training_job_id,
            base_version_id: row.base_version_id,
            model_file_url: row.model_file_url,
            model_file_size: row.model_file_size,
            config_file_url: row.config_file_url,
            accuracy: row.accuracy,
            precision_score: row.precision_score,
            recall_score: row.recall_score,
            f1_score: row.f1_score,
            inference_time_ms: row.inference_time_ms,
            min_edge_version: row.min_edge_version,
            supported_platforms: row.supported_platforms,
            status: VersionStatus::from_str(&row.status)?,
            is_approved: row.is_approved,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            is_released: row.is_released,
            released_by: row.released_by,
            released_at: row.released_at,
            release_notes: row.release_notes,
            created_at: row.created_at,
            sequence: row.sequence,
        })
    }
}

#[async_trait]
impl Persistence<ModelVersion> for ModelVersionRelationalPersistence {
    #[tracing::instrument(name = "relational::model_version::create")]
    async fn create(&self, version: &ModelVersion) -> anyhow::Result<String> {
        sqlx::query(
            r#"
            INSERT INTO model_versions
                (id, ai_module, version, name, description, training_job_id,
                 base_version_id, model_file_url, model_file_size, config_file_url,
                 accuracy, precision_score, recall_score, f1_score, inference_time_ms,
                 min_edge_version, supported_platforms, status, is_approved,
                 approved_by, approved_at, is_released, released_by, released_at,
                 release_notes, created_at, sequence)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27)
            "#,
        )
        .bind(&version.id)
        .bind(&version.ai_module)
        .bind(&version.version)
        .bind(&version.name)
        .bind(&version.description)
        .bind(&version.training_job_id)
        .bind(&version.base_version_id)
        .bind(&version.model_file_url)
        .bind(version.model_file_size)
        .bind(&version.config_file_url)
        .bind(version.accuracy)
        .bind(version.precision_score)
        .bind(version.recall_score)
        .bind(version.f1_score)
        .bind(version.inference_time_ms)
        .bind(&version.min_edge_version)
        .bind(&version.supported_platforms)
        .bind(version.status.as_str())
        .bind(version.is_approved)
        .bind(&version.approved_by)
        .bind(version.approved_at)
        .bind(version.is_released)
        .bind(&version.released_by)
        .bind(version.released_at)
        .bind(&version.release_notes)
        .bind(version.created_at)
        .bind(version.sequence)
        .execute(&*self.db)
        .await?;

        Ok(version.id.clone())
    }

    #[tracing::instrument(name = "relational::model_version::update")]
    async fn update(&self, version: &ModelVersion) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE model_versions
            SET name = $1, description = $2, status = $3, is_approved = $4,
                approved_by = $5, approved_at = $6, is_released = $7,
                released_by = $8, released_at = $9, release_notes = $10,
                sequence = sequence + 1
            WHERE id = $11 AND sequence = $12
            "#,
        )
        .bind(&version.name)
        .bind(&version.description)
        .bind(version.status.as_str())
        .bind(version.is_approved)
        .bind(&version.approved_by)
        .bind(version.approved_at)
        .bind(version.is_released)
        .bind(&version.released_by)
        .bind(version.released_at)
        .bind(&version.release_notes)
        .bind(&version.id)
        .bind(version.sequence)
        .execute(&*self.db)
        .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(name = "relational::model_version::get_by_id")]
    async fn get_by_id(&self, version_id: &str) -> anyhow::Result<Option<ModelVersion>> {
        let row =
            sqlx::query_as::<_, ModelVersionRow>("SELECT * FROM model_versions WHERE id = $1")
                .bind(version_id)
                .fetch_optional(&*self.db)
                .await?;

        row.map(ModelVersion::try_from).transpose()
    }

    #[tracing::instrument(name = "relational::model_version::list")]
    async fn list(&self) -> anyhow::Result<Vec<ModelVersion>> {
        let rows = sqlx::query_as::<_, ModelVersionRow>(
            "SELECT * FROM model_versions ORDER BY created_at",
        )
        .fetch_all(&*self.db)
        .await?;

        rows.into_iter().map(ModelVersion::try_from).collect()
    }
}

#[async_trait]
impl ModelVersionPersistence for ModelVersionRelationalPersistence {
    #[tracing::instrument(name = "relational::model_version::get_by_module")]
    async fn get_by_module(&self, ai_module: &str) -> anyhow::Result<Vec<ModelVersion>> {
        let rows = sqlx::query_as::<_, ModelVersionRow>(
            "SELECT * FROM model_versions WHERE ai_module = $1 ORDER BY created_at",
        )
        .bind(ai_module)
        .fetch_all(&*self.db)
        .await?;

        rows.into_iter().map(ModelVersion::try_from).collect()
    }

    #[tracing::instrument(name = "relational::model_version::get_by_module_and_version")]
    async fn get_by_module_and_version(
        &self,
        ai_module: &str,
        version: &str,
    ) -> anyhow::Result<Option<ModelVersion>> {
        let row = sqlx::query_as::<_, ModelVersionRow>(
            "SELECT * FROM model_versions WHERE ai_module = $1 AND version = $2",
        )
        .bind(ai_module)
        .bind(version)
        .fetch_optional(&*self.db)
        .await?;

        row.map(ModelVersion::try_from).transpose()
    }
}

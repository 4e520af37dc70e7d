use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;

use modelfleet_core::EdgeTargetMessage;

use crate::{
    models::EdgeTarget,
    persistence::{EdgeTargetPersistence, Persistence},
};

#[derive(Debug)]
pub struct EdgeTargetRelationalPersistence {
    pub db: Arc<PgPool>,
}

#[derive(sqlx::FromRow)]
struct EdgeTargetRow {
    id: String,
    name: String,
    labels: Vec<String>,
    edge_version: Option<String>,

    created_at: DateTime<Utc>,

    sequence: i64,
}

impl From<EdgeTargetRow> for EdgeTarget {
    fn from(row: EdgeTargetRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            labels: row.labels,
            edge_version: row.edge_version,
            created_at: row.created_at,
            sequence: row.sequence,
        }
    }
}

#[async_trait]
impl Persistence<EdgeTarget> for EdgeTargetRelationalPersistence {
    #[tracing::instrument(name = "relational::edge_target::create")]
    async fn create(&self, target: &EdgeTarget) -> anyhow::Result<String> {
        sqlx::query(
            r#"
            INSERT INTO edge_targets (id, name, labels, edge_version, created_at, sequence)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&target.id)
        .bind(&target.name)
        .bind(&target.labels)
        .bind(&target.edge_version)
        .bind(target.created_at)
        .bind(target.sequence)
        .execute(&*self.db)
        .await?;

        Ok(target.id.clone())
    }

    #[tracing::instrument(name = "relational::edge_target::update")]
    async fn update(&self, target: &EdgeTarget) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE edge_targets
            SET name = $1, labels = $2, edge_version = $3, sequence = sequence + 1
            WHERE id = $4 AND sequence = $5
            "#,
        )
        .bind(&target.name)
        .bind(&target.labels)
        .bind(&target.edge_version)
        .bind(&target.id)
        .bind(target.sequence)
        .execute(&*self.db)
        .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(name = "relational::edge_target::get_by_id")]
    async fn get_by_id(&self, target_id: &str) -> anyhow::Result<Option<EdgeTarget>> {
        let row = sqlx::query_as::<_, EdgeTargetRow>("SELECT * FROM edge_targets WHERE id = $1")
            .bind(target_id)
            .fetch_optional(&*self.db)
            .await?;

        Ok(row.map(EdgeTarget::from))
    }

    #[tracing::instrument(name = "relational::edge_target::list")]
    async fn list(&self) -> anyhow::Result<Vec<EdgeTarget>> {
        let rows = sqlx::query_as::<_, EdgeTargetRow>("SELECT * FROM edge_targets ORDER BY id")
            .fetch_all(&*self.db)
            .await?;

        Ok(rows.into_iter().map(EdgeTarget::from).collect())
    }
}

#[async_trait]
impl EdgeTargetPersistence for EdgeTargetRelationalPersistence {
    #[tracing::instrument(name = "relational::edge_target::upsert")]
    async fn upsert(&self, target: &EdgeTarget) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO edge_targets (id, name, labels, edge_version, created_at, sequence)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET name = excluded.name, labels = excluded.labels,
                edge_version = excluded.edge_version,
                sequence = edge_targets.sequence + 1
            "#,
        )
        .bind(&target.id)
        .bind(&target.name)
        .bind(&target.labels)
        .bind(&target.edge_version)
        .bind(target.created_at)
        .bind(target.sequence)
        .execute(&*self.db)
        .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(name = "relational::edge_target::get_matching_module")]
    async fn get_matching_module(&self, ai_module: &str) -> anyhow::Result<Vec<EdgeTarget>> {
        let rows = sqlx::query_as::<_, EdgeTargetRow>(
            "SELECT * FROM edge_targets WHERE $1 = ANY(labels) ORDER BY id",
        )
        .bind(EdgeTargetMessage::module_label(ai_module))
        .fetch_all(&*self.db)
        .await?;

        Ok(rows.into_iter().map(EdgeTarget::from).collect())
    }
}

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;

use modelfleet_core::{Event, EventStream, EventType, ModelType, OperationId};

// Events are fanned out into one row per configured subscriber; a consumer
// deletes its row once the event is processed.
#[derive(Debug)]
pub struct PostgresqlEventStream {
    pub db: Arc<PgPool>,
    pub subscribers: Vec<String>,
}

impl PostgresqlEventStream {
    fn make_id(operation_id: &str, consumer_id: &str) -> String {
        format!("{}-{}", operation_id, consumer_id)
    }

    fn event_from_row(row: &sqlx::postgres::PgRow) -> anyhow::Result<Event> {
        let operation_id: String = row.try_get("operation_id")?;
        let model_type: String = row.try_get("model_type")?;
        let event_type: String = row.try_get("event_type")?;
        let timestamp: DateTime<Utc> = row.try_get("event_timestamp")?;

        Ok(Event {
            operation_id: OperationId { id: operation_id },
            model_type: ModelType::from_str(&model_type)?,
            event_type: EventType::from_str(&event_type)?,
            serialized_previous_model: row.try_get("serialized_previous_model")?,
            serialized_current_model: row.try_get("serialized_current_model")?,
            timestamp,
        })
    }
}

#[async_trait]
impl EventStream for PostgresqlEventStream {
    #[tracing::instrument(name = "postgresql_stream::send")]
    async fn send(&self, event: &Event) -> anyhow::Result<()> {
        for consumer_id in self.subscribers.iter() {
            sqlx::query(
                r#"
                INSERT INTO event_queue
                    (id, consumer_id, operation_id, model_type, event_type,
                     serialized_previous_model, serialized_current_model, event_timestamp)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(Self::make_id(&event.operation_id.id, consumer_id))
            .bind(consumer_id)
            .bind(&event.operation_id.id)
            .bind(event.model_type.as_str())
            .bind(event.event_type.as_str())
            .bind(&event.serialized_previous_model)
            .bind(&event.serialized_current_model)
            .bind(event.timestamp)
            .execute(&*self.db)
            .await?;
        }

        Ok(())
    }

    #[tracing::instrument(name = "postgresql_stream::send_many")]
    async fn send_many(&self, events: &[Event]) -> anyhow::Result<()> {
        for event in events {
            self.send(event).await?;
        }

        Ok(())
    }

    #[tracing::instrument(name = "postgresql_stream::receive")]
    async fn receive(&self, consumer_id: &str) -> anyhow::Result<Vec<Event>> {
        let rows = sqlx::query(
            "SELECT * FROM event_queue WHERE consumer_id = $1 ORDER BY event_timestamp",
        )
        .bind(consumer_id)
        .fetch_all(&*self.db)
        .await?;

        rows.iter().map(Self::event_from_row).collect()
    }

    #[tracing::instrument(name = "postgresql_stream::delete")]
    async fn delete(&self, event: &Event, consumer_id: &str) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM event_queue WHERE id = $1")
            .bind(Self::make_id(&event.operation_id.id, consumer_id))
            .execute(&*self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

use std::sync::Arc;

use async_trait::async_trait;

use modelfleet_core::{
    create_event, EdgeTargetMessage, EventStream, EventType, FleetRegistry, ModelType, OperationId,
    OrchestratorError,
};

use crate::{models::EdgeTarget, persistence::EdgeTargetPersistence};

// Mirrored roster of the edge fleet registry; kept in sync through upserts
// from the registry and consumed as the FleetRegistry view by fleet rollouts.
#[derive(Debug)]
pub struct EdgeTargetService {
    pub persistence: Box<dyn EdgeTargetPersistence>,
    pub event_stream: Arc<dyn EventStream>,
}

impl EdgeTargetService {
    #[tracing::instrument(name = "service::edge_target::upsert")]
    pub async fn upsert(
        &self,
        target: &EdgeTarget,
        operation_id: &Option<OperationId>,
    ) -> Result<EdgeTarget, OrchestratorError> {
        let previous_target = self.persistence.get_by_id(&target.id).await?;

        self.persistence.upsert(target).await?;

        let stored_target = self
            .persistence
            .get_by_id(&target.id)
            .await?
            .ok_or_else(|| {
                OrchestratorError::Internal(anyhow::anyhow!(
                    "edge target {} missing immediately after upsert",
                    target.id
                ))
            })?;

        let event_type = if previous_target.is_some() {
            EventType::Updated
        } else {
            EventType::Created
        };

        let operation_id = OperationId::unwrap_or_create(operation_id);
        let target_event = create_event::<EdgeTargetMessage>(
            &previous_target.map(Into::into),
            &Some(stored_target.clone().into()),
            event_type,
            ModelType::EdgeTarget,
            &operation_id,
        )?;
        self.event_stream.send(&target_event).await?;

        tracing::info!("edge target {} upserted", stored_target.id);

        Ok(stored_target)
    }

    #[tracing::instrument(name = "service::edge_target::get_by_id")]
    pub async fn get_by_id(&self, target_id: &str) -> Result<Option<EdgeTarget>, OrchestratorError> {
        Ok(self.persistence.get_by_id(target_id).await?)
    }

    #[tracing::instrument(name = "service::edge_target::get_matching_module")]
    pub async fn get_matching_module(
        &self,
        ai_module: &str,
    ) -> Result<Vec<EdgeTarget>, OrchestratorError> {
        Ok(self.persistence.get_matching_module(ai_module).await?)
    }

    #[tracing::instrument(name = "service::edge_target::list")]
    pub async fn list(&self) -> Result<Vec<EdgeTarget>, OrchestratorError> {
        Ok(self.persistence.list().await?)
    }
}

#[async_trait]
impl FleetRegistry for EdgeTargetService {
    async fn list_targets(&self, ai_module: &str) -> anyhow::Result<Vec<String>> {
        let mut targets = self.persistence.get_matching_module(ai_module).await?;
        targets.sort_by(|left, right| left.id.cmp(&right.id));

        Ok(targets.into_iter().map(|target| target.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::memory::EdgeTargetMemoryPersistence;
    use modelfleet_core::test::get_target_fixture;
    use modelfleet_memory_stream::MemoryEventStream;

    #[tokio::test]
    async fn test_upsert_and_fleet_view() {
        let event_stream: Arc<dyn EventStream> = Arc::new(MemoryEventStream::new().unwrap());

        let target_service = EdgeTargetService {
            persistence: Box::<EdgeTargetMemoryPersistence>::default(),
            event_stream: Arc::clone(&event_stream),
        };

        let target: EdgeTarget = get_target_fixture(Some("target-b")).into();
        target_service.upsert(&target, &None).await.unwrap();

        let other_target: EdgeTarget = get_target_fixture(Some("target-a")).into();
        target_service.upsert(&other_target, &None).await.unwrap();

        let fetched_target = target_service
            .get_by_id("target-b")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched_target.name, target.name);

        let target_ids = target_service.list_targets("object-detection").await.unwrap();
        assert_eq!(target_ids, vec!["target-a", "target-b"]);

        let target_ids = target_service.list_targets("face-recognition").await.unwrap();
        assert!(target_ids.is_empty());

        // upserting again updates rather than duplicates
        target_service.upsert(&target, &None).await.unwrap();
        assert_eq!(target_service.list().await.unwrap().len(), 2);
    }
}

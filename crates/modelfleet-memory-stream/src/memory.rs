use async_trait::async_trait;
use std::sync::Arc;
use std::{collections::VecDeque, sync::Mutex};

use modelfleet_core::{Event, EventStream};

#[derive(Debug)]
pub struct MemoryEventStream {
    events: Arc<Mutex<VecDeque<Event>>>,
}

impl MemoryEventStream {
    pub fn new() -> anyhow::Result<Self> {
        let event_stream = MemoryEventStream {
            events: Arc::new(Mutex::new(VecDeque::new())),
        };

        Ok(event_stream)
    }
}

#[async_trait]
impl EventStream for MemoryEventStream {
    async fn send(&self, event: &Event) -> anyhow::Result<()> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| anyhow::anyhow!("failed to acquire lock"))?;

        events.push_back(event.clone());

        Ok(())
    }

    async fn send_many(&self, events: &[Event]) -> anyhow::Result<()> {
        for event in events.iter() {
            self.send(event).await?;
        }

        Ok(())
    }

    async fn receive(&self, _consumer_id: &str) -> anyhow::Result<Vec<Event>> {
        let events = self
            .events
            .lock()
            .map_err(|_| anyhow::anyhow!("failed to acquire lock"))?;

        Ok(events.iter().cloned().collect())
    }

    async fn delete(&self, event: &Event, _consumer_id: &str) -> anyhow::Result<u64> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| anyhow::anyhow!("failed to acquire lock"))?;

        let starting_len = events.len();
        events.retain(|candidate| candidate.operation_id != event.operation_id);
        let deleted_count = starting_len - events.len();

        Ok(deleted_count as u64)
    }
}

#[cfg(test)]
mod tests {
    use modelfleet_core::{
        create_event, decode_event_model, test::get_target_fixture, EdgeTargetMessage, EventType,
        ModelType, OperationId,
    };

    use super::*;

    #[tokio::test]
    async fn test_send_receive_delete() {
        let target = get_target_fixture(None);

        let event_stream = MemoryEventStream::new().unwrap();
        let operation_id = OperationId::create();

        let create_target_event = create_event::<EdgeTargetMessage>(
            &None,
            &Some(target.clone()),
            EventType::Created,
            ModelType::EdgeTarget,
            &operation_id,
        )
        .unwrap();

        event_stream.send(&create_target_event).await.unwrap();

        let received_events = event_stream.receive("rollout").await.unwrap();
        assert_eq!(received_events.len(), 1);

        let received_event = received_events.first().unwrap();
        assert_eq!(received_event.event_type, EventType::Created);
        assert_eq!(received_event.model_type, ModelType::EdgeTarget);

        let decoded_target: EdgeTargetMessage = decode_event_model(received_event).unwrap();
        assert_eq!(decoded_target.id, target.id);

        let deleted_count = event_stream
            .delete(received_event, "rollout")
            .await
            .unwrap();
        assert_eq!(deleted_count, 1);

        let received_events = event_stream.receive("rollout").await.unwrap();
        assert_eq!(received_events.len(), 0);
    }
}

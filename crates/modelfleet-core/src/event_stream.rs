use std::fmt::Debug;

use async_trait::async_trait;

use super::Event;

#[async_trait]
pub trait EventStream: Debug + Send + Sync {
    async fn send(&self, event: &Event) -> anyhow::Result<()>;
    async fn send_many(&self, events: &[Event]) -> anyhow::Result<()>;
    async fn receive(&self, consumer_id: &str) -> anyhow::Result<Vec<Event>>;
    async fn delete(&self, event: &Event, consumer_id: &str) -> anyhow::Result<u64>;
}

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct OperationId {
    pub id: String,
}

impl OperationId {
    pub fn create() -> Self {
        OperationId {
            id: Uuid::new_v4().to_string(),
        }
    }

    pub fn unwrap_or_create(current_operation_id: &Option<OperationId>) -> OperationId {
        match current_operation_id {
            Some(current_operation_id) => current_operation_id.clone(),
            None => OperationId::create(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Created,
    Updated,
    Deleted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Created => "created",
            EventType::Updated => "updated",
            EventType::Deleted => "deleted",
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "created" => Ok(EventType::Created),
            "updated" => Ok(EventType::Updated),
            "deleted" => Ok(EventType::Deleted),
            _ => Err(anyhow::anyhow!("unknown event type: {}", value)),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    TrainingJob,
    ModelVersion,
    Deployment,
    EdgeTarget,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::TrainingJob => "training_job",
            ModelType::ModelVersion => "model_version",
            ModelType::Deployment => "deployment",
            ModelType::EdgeTarget => "edge_target",
        }
    }
}

impl std::str::FromStr for ModelType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "training_job" => Ok(ModelType::TrainingJob),
            "model_version" => Ok(ModelType::ModelVersion),
            "deployment" => Ok(ModelType::Deployment),
            "edge_target" => Ok(ModelType::EdgeTarget),
            _ => Err(anyhow::anyhow!("unknown model type: {}", value)),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Event {
    pub operation_id: OperationId,
    pub model_type: ModelType,
    pub event_type: EventType,

    pub serialized_previous_model: Option<Vec<u8>>,
    pub serialized_current_model: Option<Vec<u8>>,

    pub timestamp: DateTime<Utc>,
}

pub fn serialize_model_option<Model: Serialize>(
    model_option: &Option<Model>,
) -> anyhow::Result<Option<Vec<u8>>> {
    match model_option {
        Some(model) => Ok(Some(serde_json::to_vec(model)?)),
        None => Ok(None),
    }
}

pub fn create_event<Model: Serialize>(
    previous_model: &Option<Model>,
    current_model: &Option<Model>,
    event_type: EventType,
    model_type: ModelType,
    operation_id: &OperationId,
) -> anyhow::Result<Event> {
    let serialized_previous_model = serialize_model_option(previous_model)?;
    let serialized_current_model = serialize_model_option(current_model)?;

    Ok(Event {
        operation_id: operation_id.clone(),
        model_type,
        event_type,
        serialized_previous_model,
        serialized_current_model,
        timestamp: Utc::now(),
    })
}

// current model if the event carries one, previous model otherwise
pub fn decode_event_model<Model: DeserializeOwned>(event: &Event) -> anyhow::Result<Model> {
    let serialized_model = event
        .serialized_current_model
        .as_ref()
        .or(event.serialized_previous_model.as_ref())
        .ok_or_else(|| anyhow::anyhow!("event carries no previous or current model"))?;

    Ok(serde_json::from_slice(serialized_model)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::get_target_fixture;
    use crate::EdgeTargetMessage;

    #[test]
    fn test_create_and_decode_event() {
        let target = get_target_fixture(None);
        let operation_id = OperationId::create();

        let event = create_event::<EdgeTargetMessage>(
            &None,
            &Some(target.clone()),
            EventType::Created,
            ModelType::EdgeTarget,
            &operation_id,
        )
        .unwrap();

        assert_eq!(event.event_type, EventType::Created);
        assert_eq!(event.model_type, ModelType::EdgeTarget);
        assert!(event.serialized_previous_model.is_none());

        let decoded: EdgeTargetMessage = decode_event_model(&event).unwrap();
        assert_eq!(decoded.id, target.id);
    }

    #[test]
    fn test_operation_id_unwrap_or_create() {
        let operation_id = OperationId::create();
        assert_eq!(operation_id.id.len(), 36);

        let unwrapped = OperationId::unwrap_or_create(&Some(operation_id.clone()));
        assert_eq!(unwrapped, operation_id);

        let created = OperationId::unwrap_or_create(&None);
        assert_ne!(created, operation_id);
    }
}

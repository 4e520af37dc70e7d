use chrono::{DateTime, Utc};

use modelfleet_core::EdgeTargetMessage;

use crate::persistence::PersistableModel;

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeTarget {
    pub id: String,
    pub name: String,
    pub labels: Vec<String>,
    pub edge_version: Option<String>,

    pub created_at: DateTime<Utc>,

    pub sequence: i64,
}

impl EdgeTarget {
    pub fn supports_module(&self, ai_module: &str) -> bool {
        let label = EdgeTargetMessage::module_label(ai_module);
        self.labels.iter().any(|candidate| candidate == &label)
    }
}

impl PersistableModel for EdgeTarget {
    fn get_id(&self) -> String {
        self.id.clone()
    }

    fn get_sequence(&self) -> i64 {
        self.sequence
    }

    fn set_sequence(&mut self, sequence: i64) {
        self.sequence = sequence;
    }
}

impl From<EdgeTarget> for EdgeTargetMessage {
    fn from(target: EdgeTarget) -> Self {
        Self {
            id: target.id,
            name: target.name,
            labels: target.labels,
            edge_version: target.edge_version,
            created_at: target.created_at,
            sequence: target.sequence,
        }
    }
}

impl From<EdgeTargetMessage> for EdgeTarget {
    fn from(message: EdgeTargetMessage) -> Self {
        Self {
            id: message.id,
            name: message.name,
            labels: message.labels,
            edge_version: message.edge_version,
            created_at: message.created_at,
            sequence: message.sequence,
        }
    }
}

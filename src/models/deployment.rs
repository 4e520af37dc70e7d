use chrono::{DateTime, Utc};

use modelfleet_core::{DeploymentMessage, DeploymentStatus, FailureKind};

use crate::persistence::PersistableModel;

#[derive(Clone, Debug, PartialEq)]
pub struct Deployment {
    pub id: String,
    pub model_version_id: String,
    pub target_id: String,

    pub status: DeploymentStatus,
    pub progress_percent: i32,
    pub retry_count: i32,
    pub error_message: Option<String>,
    pub failure_kind: Option<FailureKind>,

    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    pub sequence: i64,
}

impl Deployment {
    // at most one non-terminal deployment per (version, target) pair
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

impl PersistableModel for Deployment {
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

impl From<Deployment> for DeploymentMessage {
    fn from(deployment: Deployment) -> Self {
        Self {
            id: deployment.id,
            model_version_id: deployment.model_version_id,
            target_id: deployment.target_id,
            status: deployment.status,
            progress_percent: deployment.progress_percent,
            retry_count: deployment.retry_count,
            error_message: deployment.error_message,
            failure_kind: deployment.failure_kind,
            scheduled_at: deployment.scheduled_at,
            started_at: deployment.started_at,
            completed_at: deployment.completed_at,
            sequence: deployment.sequence,
        }
    }
}

impl From<DeploymentMessage> for Deployment {
    fn from(message: DeploymentMessage) -> Self {
        Self {
            id: message.id,
            model_version_id: message.model_version_id,
            target_id: message.target_id,
            status: message.status,
            progress_percent: message.progress_percent,
            retry_count: message.retry_count,
            error_message: message.error_message,
            failure_kind: message.failure_kind,
            scheduled_at: message.scheduled_at,
            started_at: message.started_at,
            completed_at: message.completed_at,
            sequence: message.sequence,
        }
    }
}

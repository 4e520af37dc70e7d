use chrono::{DateTime, Utc};

use modelfleet_core::{JobStatus, TrainingJobMessage, TrainingMetrics};

use crate::persistence::PersistableModel;

#[derive(Clone, Debug, PartialEq)]
pub struct TrainingJob {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub description: Option<String>,
    pub ai_module: String,
    pub dataset_id: String,
    pub base_model_version: Option<String>,
    pub hyperparameters: serde_json::Value,

    pub status: JobStatus,
    pub progress_percent: i32,
    pub current_epoch: Option<i32>,
    pub total_epochs: Option<i32>,
    pub metrics: Option<TrainingMetrics>,
    pub training_logs: Option<String>,
    pub error_message: Option<String>,
    pub estimated_completion: Option<DateTime<Utc>>,
    pub annotations: serde_json::Value,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    pub sequence: i64,
}

impl TrainingJob {
    // pending / queued / running jobs count against the organization quota
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

impl PersistableModel for TrainingJob {
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

impl From<TrainingJob> for TrainingJobMessage {
    fn from(job: TrainingJob) -> Self {
        Self {
            id: job.id,
            organization_id: job.organization_id,
            name: job.name,
            description: job.description,
            ai_module: job.ai_module,
            dataset_id: job.dataset_id,
            base_model_version: job.base_model_version,
            hyperparameters: job.hyperparameters,
            status: job.status,
            progress_percent: job.progress_percent,
            current_epoch: job.current_epoch,
            total_epochs: job.total_epochs,
            metrics: job.metrics,
            training_logs: job.training_logs,
            error_message: job.error_message,
            estimated_completion: job.estimated_completion,
            annotations: job.annotations,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            sequence: job.sequence,
        }
    }
}

impl From<TrainingJobMessage> for TrainingJob {
    fn from(message: TrainingJobMessage) -> Self {
        Self {
            id: message.id,
            organization_id: message.organization_id,
            name: message.name,
            description: message.description,
            ai_module: message.ai_module,
            dataset_id: message.dataset_id,
            base_model_version: message.base_model_version,
            hyperparameters: message.hyperparameters,
            status: message.status,
            progress_percent: message.progress_percent,
            current_epoch: message.current_epoch,
            total_epochs: message.total_epochs,
            metrics: message.metrics,
            training_logs: message.training_logs,
            error_message: message.error_message,
            estimated_completion: message.estimated_completion,
            annotations: message.annotations,
            created_at: message.created_at,
            started_at: message.started_at,
            completed_at: message.completed_at,
            sequence: message.sequence,
        }
    }
}

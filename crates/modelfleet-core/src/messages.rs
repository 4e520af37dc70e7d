use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::{DeploymentStatus, FailureKind, JobStatus, RolloutStatus, VersionStatus};

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct TrainingMetrics {
    pub accuracy: Option<f64>,
    pub loss: Option<f64>,
    pub val_accuracy: Option<f64>,
    pub val_loss: Option<f64>,
}

impl TrainingMetrics {
    // later callbacks only ever add detail, absent fields keep prior values
    pub fn merge(&mut self, other: &TrainingMetrics) {
        self.accuracy = other.accuracy.or(self.accuracy);
        self.loss = other.loss.or(self.loss);
        self.val_accuracy = other.val_accuracy.or(self.val_accuracy);
        self.val_loss = other.val_loss.or(self.val_loss);
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TrainingJobMessage {
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

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SubmitJobRequest {
    pub organization_id: String,
    pub name: String,
    pub description: Option<String>,
    pub ai_module: String,
    pub dataset_id: String,
    pub base_model_version: Option<String>,
    pub hyperparameters: Option<serde_json::Value>,
    pub total_epochs: Option<i32>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct JobProgressMessage {
    #[serde(default)]
    pub job_id: String,
    pub progress_percent: i32,
    pub current_epoch: Option<i32>,
    pub metrics: Option<TrainingMetrics>,
    pub log_line: Option<String>,
    pub estimated_completion: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct JobTerminalMessage {
    #[serde(default)]
    pub job_id: String,
    pub status: JobStatus,
    pub metrics: Option<TrainingMetrics>,
    pub error_message: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AnnotateJobRequest {
    pub key: String,
    pub value: serde_json::Value,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ModelVersionMessage {
    pub id: String,
    pub ai_module: String,
    pub version: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub training_job_id: Option<String>,
    pub base_version_id: Option<String>,

    pub model_file_url: Option<String>,
    pub model_file_size: Option<i64>,
    pub config_file_url: Option<String>,

    pub accuracy: Option<f64>,
    pub precision_score: Option<f64>,
    pub recall_score: Option<f64>,
    pub f1_score: Option<f64>,
    pub inference_time_ms: Option<f64>,

    pub min_edge_version: Option<String>,
    pub supported_platforms: Option<Vec<String>>,

    pub status: VersionStatus,
    pub is_approved: bool,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub is_released: bool,
    pub released_by: Option<String>,
    pub released_at: Option<DateTime<Utc>>,
    pub release_notes: Option<String>,

    pub created_at: DateTime<Utc>,

    pub sequence: i64,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RegisterVersionRequest {
    // from a completed training job, or a direct import when absent
    pub training_job_id: Option<String>,
    pub ai_module: Option<String>,
    pub version: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_version_id: Option<String>,
    pub model_file_url: Option<String>,
    pub model_file_size: Option<i64>,
    pub config_file_url: Option<String>,
    pub accuracy: Option<f64>,
    pub precision_score: Option<f64>,
    pub recall_score: Option<f64>,
    pub f1_score: Option<f64>,
    pub inference_time_ms: Option<f64>,
    pub min_edge_version: Option<String>,
    pub supported_platforms: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct UpdateVersionMetadataRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ApproveVersionRequest {
    pub approved_by: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ReleaseVersionRequest {
    pub released_by: Option<String>,
    pub release_notes: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DeploymentMessage {
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

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DeployRequest {
    pub target_id: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DeploymentProgressMessage {
    #[serde(default)]
    pub deployment_id: String,
    pub status: DeploymentStatus,
    pub progress_percent: i32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DeploymentTerminalMessage {
    #[serde(default)]
    pub deployment_id: String,
    pub status: DeploymentStatus,
    pub error_message: Option<String>,
    pub failure_kind: Option<FailureKind>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RolloutStatusRequest {
    pub deployment_ids: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RolloutStatusResponse {
    pub status: RolloutStatus,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub active: usize,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct EdgeTargetMessage {
    pub id: String,
    pub name: String,
    pub labels: Vec<String>,
    pub edge_version: Option<String>,

    pub created_at: DateTime<Utc>,

    pub sequence: i64,
}

impl EdgeTargetMessage {
    pub fn module_label(ai_module: &str) -> String {
        format!("module:{}", ai_module)
    }

    pub fn supports_module(&self, ai_module: &str) -> bool {
        let label = Self::module_label(ai_module);
        self.labels.iter().any(|candidate| candidate == &label)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UpsertTargetRequest {
    pub name: String,
    pub labels: Vec<String>,
    pub edge_version: Option<String>,
}

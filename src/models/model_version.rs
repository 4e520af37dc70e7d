use chrono::{DateTime, Utc};

use modelfleet_core::{ModelVersionMessage, VersionStatus};

use crate::persistence::PersistableModel;

#[derive(Clone, Debug, PartialEq)]
pub struct ModelVersion {
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

impl PersistableModel for ModelVersion {
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

impl From<ModelVersion> for ModelVersionMessage {
    fn from(version: ModelVersion) -> Self {
        Self {
            id: version.id,
            ai_module: version.ai_module,
            version: version.version,
            name: version.name,
            description: version.description,
            training_job_id: version.training_job_id,
            base_version_id: version.base_version_id,
            model_file_url: version.model_file_url,
            model_file_size: version.model_file_size,
            config_file_url: version.config_file_url,
            accuracy: version.accuracy,
            precision_score: version.precision_score,
            recall_score: version.recall_score,
            f1_score: version.f1_score,
            inference_time_ms: version.inference_time_ms,
            min_edge_version: version.min_edge_version,
            supported_platforms: version.supported_platforms,
            status: version.status,
            is_approved: version.is_approved,
            approved_by: version.approved_by,
            approved_at: version.approved_at,
            is_released: version.is_released,
            released_by: version.released_by,
            released_at: version.released_at,
            release_notes: version.release_notes,
            created_at: version.created_at,
            sequence: version.sequence,
        }
    }
}

impl From<ModelVersionMessage> for ModelVersion {
    fn from(message: ModelVersionMessage) -> Self {
        Self {
            id: message.id,
            ai_module: message.ai_module,
            version: message.version,
            name: message.name,
            description: message.description,
            training_job_id: message.training_job_id,
            base_version_id: message.base_version_id,
            model_file_url: message.model_file_url,
            model_file_size: message.model_file_size,
            config_file_url: message.config_file_url,
            accuracy: message.accuracy,
            precision_score: message.precision_score,
            recall_score: message.recall_score,
            f1_score: message.f1_score,
            inference_time_ms: message.inference_time_ms,
            min_edge_version: message.min_edge_version,
            supported_platforms: message.supported_platforms,
            status: message.status,
            is_approved: message.is_approved,
            approved_by: message.approved_by,
            approved_at: message.approved_at,
            is_released: message.is_released,
            released_by: message.released_by,
            released_at: message.released_at,
            release_notes: message.release_notes,
            created_at: message.created_at,
            sequence: message.sequence,
        }
    }
}

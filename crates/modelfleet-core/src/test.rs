use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::external::{DatasetDirectory, InstallAgent, TrainingExecutor};
use crate::messages::{
    DeploymentMessage, EdgeTargetMessage, ModelVersionMessage, TrainingJobMessage,
};
use crate::status::{DeploymentStatus, JobStatus, VersionStatus};

pub fn get_job_fixture(id: Option<&str>) -> TrainingJobMessage {
    let id = id.unwrap_or("job-fixture").to_string();

    TrainingJobMessage {
        id,
        organization_id: "org-fixture".to_owned(),
        name: "nightly retrain".to_owned(),
        description: None,
        ai_module: "object-detection".to_owned(),
        dataset_id: "dataset-fixture".to_owned(),
        base_model_version: None,
        hyperparameters: serde_json::json!({ "learning_rate": 0.001, "batch_size": 16 }),

        status: JobStatus::Pending,
        progress_percent: 0,
        current_epoch: None,
        total_epochs: Some(20),
        metrics: None,
        training_logs: None,
        error_message: None,
        estimated_completion: None,
        annotations: serde_json::json!({}),

        created_at: Utc::now(),
        started_at: None,
        completed_at: None,

        sequence: 0,
    }
}

pub fn get_model_version_fixture(id: Option<&str>) -> ModelVersionMessage {
    let id = id.unwrap_or("version-fixture").to_string();

    ModelVersionMessage {
        id,
        ai_module: "object-detection".to_owned(),
        version: "1.2.0".to_owned(),
        name: Some("object detection v1.2.0".to_owned()),
        description: None,
        training_job_id: Some("job-fixture".to_owned()),
        base_version_id: None,

        model_file_url: Some("https://artifacts.example.com/object-detection/1.2.0.onnx".to_owned()),
        model_file_size: Some(48_000_000),
        config_file_url: None,

        accuracy: Some(0.93),
        precision_score: Some(0.91),
        recall_score: Some(0.9),
        f1_score: Some(0.9),
        inference_time_ms: Some(28.0),

        min_edge_version: None,
        supported_platforms: Some(vec!["linux-arm64".to_owned()]),

        status: VersionStatus::Draft,
        is_approved: false,
        approved_by: None,
        approved_at: None,
        is_released: false,
        released_by: None,
        released_at: None,
        release_notes: None,

        created_at: Utc::now(),

        sequence: 0,
    }
}

pub fn get_deployment_fixture(id: Option<&str>) -> DeploymentMessage {
    let id = id.unwrap_or("deployment-fixture").to_string();

    DeploymentMessage {
        id,
        model_version_id: "version-fixture".to_owned(),
        target_id: "target-fixture".to_owned(),

        status: DeploymentStatus::Pending,
        progress_percent: 0,
        retry_count: 0,
        error_message: None,
        failure_kind: None,

        scheduled_at: Utc::now(),
        started_at: None,
        completed_at: None,

        sequence: 0,
    }
}

pub fn get_target_fixture(id: Option<&str>) -> EdgeTargetMessage {
    let id = id.unwrap_or("target-fixture").to_string();

    EdgeTargetMessage {
        id,
        name: "dock-camera-1".to_owned(),
        labels: vec![
            "region:eastus2".to_owned(),
            "module:object-detection".to_owned(),
        ],
        edge_version: Some("2.4.1".to_owned()),

        created_at: Utc::now(),

        sequence: 0,
    }
}

#[derive(Debug)]
pub struct StaticDatasetDirectory {
    pub ready: bool,
}

impl Default for StaticDatasetDirectory {
    fn default() -> Self {
        Self { ready: true }
    }
}

#[async_trait]
impl DatasetDirectory for StaticDatasetDirectory {
    async fn dataset_ready(&self, _dataset_id: &str) -> anyhow::Result<bool> {
        Ok(self.ready)
    }
}

#[derive(Debug, Default)]
pub struct MockTrainingExecutor {
    pub dispatched: Mutex<Vec<String>>,
    pub cancelled: Mutex<Vec<String>>,
}

#[async_trait]
impl TrainingExecutor for MockTrainingExecutor {
    async fn dispatch(&self, job: &TrainingJobMessage) -> anyhow::Result<()> {
        self.dispatched.lock().unwrap().push(job.id.clone());

        Ok(())
    }

    async fn cancel(&self, job_id: &str) -> anyhow::Result<()> {
        self.cancelled.lock().unwrap().push(job_id.to_string());

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingInstallAgent {
    pub installs: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl InstallAgent for RecordingInstallAgent {
    async fn begin_install(
        &self,
        deployment: &DeploymentMessage,
        _model_file_url: &str,
    ) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("edge target unreachable"));
        }

        self.installs.lock().unwrap().push(deployment.id.clone());

        Ok(())
    }
}

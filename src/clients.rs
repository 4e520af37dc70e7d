use async_trait::async_trait;
use serde::Deserialize;

use modelfleet_core::{DatasetDirectory, DeploymentMessage, InstallAgent, TrainingExecutor, TrainingJobMessage};

// HTTP implementations of the collaborator contracts. Each collaborator
// reports back asynchronously through the callback routes in `api`.

#[derive(Debug)]
pub struct HttpDatasetDirectory {
    pub client: reqwest::Client,
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
struct DatasetStatusResponse {
    status: String,
}

#[async_trait]
impl DatasetDirectory for HttpDatasetDirectory {
    #[tracing::instrument(name = "clients::dataset_directory::dataset_ready")]
    async fn dataset_ready(&self, dataset_id: &str) -> anyhow::Result<bool> {
        let url = format!("{}/api/v1/datasets/{}", self.base_url, dataset_id);

        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }

        let dataset: DatasetStatusResponse = response.error_for_status()?.json().await?;

        Ok(dataset.status == "ready")
    }
}

#[derive(Debug)]
pub struct HttpTrainingExecutor {
    pub client: reqwest::Client,
    pub base_url: String,
}

#[async_trait]
impl TrainingExecutor for HttpTrainingExecutor {
    #[tracing::instrument(name = "clients::training_executor::dispatch")]
    async fn dispatch(&self, job: &TrainingJobMessage) -> anyhow::Result<()> {
        let url = format!("{}/api/v1/train", self.base_url);

        self.client
            .post(&url)
            .json(&serde_json::json!({
                "job_id": job.id,
                "ai_module": job.ai_module,
                "dataset_id": job.dataset_id,
                "base_model_version": job.base_model_version,
                "hyperparameters": job.hyperparameters,
                "total_epochs": job.total_epochs,
            }))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    #[tracing::instrument(name = "clients::training_executor::cancel")]
    async fn cancel(&self, job_id: &str) -> anyhow::Result<()> {
        let url = format!("{}/api/v1/train/{}/cancel", self.base_url, job_id);

        self.client.post(&url).send().await?.error_for_status()?;

        Ok(())
    }
}

#[derive(Debug)]
pub struct HttpInstallAgent {
    pub client: reqwest::Client,
    pub base_url: String,
}

#[async_trait]
impl InstallAgent for HttpInstallAgent {
    // idempotent on the edge side: redelivering the same deployment id is safe
    #[tracing::instrument(name = "clients::install_agent::begin_install")]
    async fn begin_install(
        &self,
        deployment: &DeploymentMessage,
        model_file_url: &str,
    ) -> anyhow::Result<()> {
        let url = format!(
            "{}/api/v1/targets/{}/install",
            self.base_url, deployment.target_id
        );

        self.client
            .post(&url)
            .json(&serde_json::json!({
                "deployment_id": deployment.id,
                "model_version_id": deployment.model_version_id,
                "model_file_url": model_file_url,
            }))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

use std::fmt::Debug;

use async_trait::async_trait;

use crate::messages::{DeploymentMessage, ModelVersionMessage, TrainingJobMessage};

// Collaborator contracts. The control plane only ever sees these surfaces;
// the numerical training run and the on-node install live elsewhere.

#[async_trait]
pub trait DatasetDirectory: Debug + Send + Sync {
    async fn dataset_ready(&self, dataset_id: &str) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait TrainingExecutor: Debug + Send + Sync {
    async fn dispatch(&self, job: &TrainingJobMessage) -> anyhow::Result<()>;

    // best-effort: the executor may still report a late terminal status
    async fn cancel(&self, job_id: &str) -> anyhow::Result<()>;
}

#[async_trait]
pub trait FleetRegistry: Debug + Send + Sync {
    async fn list_targets(&self, ai_module: &str) -> anyhow::Result<Vec<String>>;
}

#[async_trait]
pub trait InstallAgent: Debug + Send + Sync {
    // must be idempotent under redelivery of the same deployment id
    async fn begin_install(
        &self,
        deployment: &DeploymentMessage,
        model_file_url: &str,
    ) -> anyhow::Result<()>;
}

pub trait QualityGate: Debug + Send + Sync {
    fn evaluate(&self, version: &ModelVersionMessage) -> Result<(), String>;
}

#[derive(Debug)]
pub struct MinimumAccuracyGate {
    pub min_accuracy: f64,
}

impl QualityGate for MinimumAccuracyGate {
    fn evaluate(&self, version: &ModelVersionMessage) -> Result<(), String> {
        if self.min_accuracy <= 0.0 {
            return Ok(());
        }

        match version.accuracy {
            Some(accuracy) if accuracy >= self.min_accuracy => Ok(()),
            Some(accuracy) => Err(format!(
                "accuracy {} below required minimum {}",
                accuracy, self.min_accuracy
            )),
            None => Err(format!(
                "version has no accuracy metric, required minimum is {}",
                self.min_accuracy
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::get_model_version_fixture;

    #[test]
    fn test_minimum_accuracy_gate() {
        let mut version = get_model_version_fixture(None);
        version.accuracy = Some(0.91);

        let gate = MinimumAccuracyGate { min_accuracy: 0.9 };
        assert!(gate.evaluate(&version).is_ok());

        let strict_gate = MinimumAccuracyGate { min_accuracy: 0.95 };
        assert!(strict_gate.evaluate(&version).is_err());

        version.accuracy = None;
        assert!(strict_gate.evaluate(&version).is_err());

        let disabled_gate = MinimumAccuracyGate { min_accuracy: 0.0 };
        assert!(disabled_gate.evaluate(&version).is_ok());
    }
}

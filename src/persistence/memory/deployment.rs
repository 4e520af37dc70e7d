use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use modelfleet_core::DeploymentStatus;

use crate::{
    models::Deployment,
    persistence::{DeploymentPersistence, PersistableModel, Persistence},
};

#[derive(Debug)]
pub struct DeploymentMemoryPersistence {
    models: Arc<Mutex<HashMap<String, Deployment>>>,
}

#[async_trait]
impl Persistence<Deployment> for DeploymentMemoryPersistence {
    async fn create(&self, deployment: &Deployment) -> anyhow::Result<String> {
        let mut locked_deployments = self.get_models_locked()?;

        locked_deployments.insert(deployment.get_id(), deployment.clone());

        Ok(deployment.get_id())
    }

    async fn update(&self, deployment: &Deployment) -> anyhow::Result<u64> {
        let mut locked_deployments = self.get_models_locked()?;

        match locked_deployments.get(&deployment.get_id()) {
            Some(existing) if existing.get_sequence() == deployment.get_sequence() => {
                let mut updated_deployment = deployment.clone();
                updated_deployment.set_sequence(deployment.get_sequence() + 1);
                locked_deployments.insert(updated_deployment.get_id(), updated_deployment);

                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn get_by_id(&self, deployment_id: &str) -> anyhow::Result<Option<Deployment>> {
        let locked_deployments = self.get_models_locked()?;

        match locked_deployments.get(deployment_id) {
            Some(fetched_deployment) => Ok(Some(fetched_deployment.clone())),
            None => Ok(None),
        }
    }

    async fn list(&self) -> anyhow::Result<Vec<Deployment>> {
        let locked_deployments = self.get_models_locked()?;

        let deployments = locked_deployments.values().cloned().collect();

        Ok(deployments)
    }
}

#[async_trait]
impl DeploymentPersistence for DeploymentMemoryPersistence {
    async fn get_by_model_version_id(
        &self,
        model_version_id: &str,
    ) -> anyhow::Result<Vec<Deployment>> {
        let locked_deployments = self.get_models_locked()?;

        let mut deployments_for_version = Vec::new();
        for deployment in locked_deployments.values() {
            if deployment.model_version_id == model_version_id {
                deployments_for_version.push(deployment.clone());
            }
        }

        Ok(deployments_for_version)
    }

    async fn get_by_target_id(&self, target_id: &str) -> anyhow::Result<Vec<Deployment>> {
        let locked_deployments = self.get_models_locked()?;

        let mut deployments_for_target = Vec::new();
        for deployment in locked_deployments.values() {
            if deployment.target_id == target_id {
                deployments_for_target.push(deployment.clone());
            }
        }

        Ok(deployments_for_target)
    }

    async fn get_by_status(&self, status: DeploymentStatus) -> anyhow::Result<Vec<Deployment>> {
        let locked_deployments = self.get_models_locked()?;

        let mut deployments_with_status = Vec::new();
        for deployment in locked_deployments.values() {
            if deployment.status == status {
                deployments_with_status.push(deployment.clone());
            }
        }

        Ok(deployments_with_status)
    }

    async fn get_active_by_version_and_target(
        &self,
        model_version_id: &str,
        target_id: &str,
    ) -> anyhow::Result<Option<Deployment>> {
        let locked_deployments = self.get_models_locked()?;

        for deployment in locked_deployments.values() {
            if deployment.model_version_id == model_version_id
                && deployment.target_id == target_id
                && deployment.is_active()
            {
                return Ok(Some(deployment.clone()));
            }
        }

        Ok(None)
    }
}

impl DeploymentMemoryPersistence {
    fn get_models_locked(&self) -> anyhow::Result<MutexGuard<HashMap<String, Deployment>>> {
        match self.models.lock() {
            Ok(locked_deployments) => Ok(locked_deployments),
            Err(_) => Err(anyhow::anyhow!("failed to acquire lock")),
        }
    }
}

impl Default for DeploymentMemoryPersistence {
    fn default() -> Self {
        Self {
            models: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use modelfleet_core::test::get_deployment_fixture;

    use super::*;

    #[tokio::test]
    async fn test_active_lookup() {
        let deployment_persistence = DeploymentMemoryPersistence::default();
        let deployment: Deployment = get_deployment_fixture(None).into();

        deployment_persistence.create(&deployment).await.unwrap();

        let active_deployment = deployment_persistence
            .get_active_by_version_and_target(&deployment.model_version_id, &deployment.target_id)
            .await
            .unwrap();
        assert!(active_deployment.is_some());

        let mut completed_deployment = deployment.clone();
        completed_deployment.status = DeploymentStatus::Completed;
        deployment_persistence
            .update(&completed_deployment)
            .await
            .unwrap();

        let active_deployment = deployment_persistence
            .get_active_by_version_and_target(&deployment.model_version_id, &deployment.target_id)
            .await
            .unwrap();
        assert!(active_deployment.is_none());
    }

    #[tokio::test]
    async fn test_get_by_status() {
        let deployment_persistence = DeploymentMemoryPersistence::default();

        let deployment: Deployment = get_deployment_fixture(Some("deployment-one")).into();
        deployment_persistence.create(&deployment).await.unwrap();

        let mut failed_deployment: Deployment = get_deployment_fixture(Some("deployment-two")).into();
        failed_deployment.status = DeploymentStatus::Failed;
        deployment_persistence
            .create(&failed_deployment)
            .await
            .unwrap();

        let pending_deployments = deployment_persistence
            .get_by_status(DeploymentStatus::Pending)
            .await
            .unwrap();
        assert_eq!(pending_deployments.len(), 1);
        assert_eq!(pending_deployments[0].id, "deployment-one");

        let failed_deployments = deployment_persistence
            .get_by_status(DeploymentStatus::Failed)
            .await
            .unwrap();
        assert_eq!(failed_deployments.len(), 1);
        assert_eq!(failed_deployments[0].id, "deployment-two");
    }
}

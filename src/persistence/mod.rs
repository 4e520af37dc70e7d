use std::fmt::Debug;

use async_trait::async_trait;

use modelfleet_core::{DeploymentStatus, JobStatus};

use crate::models::{Deployment, EdgeTarget, ModelVersion, TrainingJob};

pub mod memory;
pub mod relational;

pub trait PersistableModel: Clone + Debug + Send + Sync {
    fn get_id(&self) -> String;
    fn get_sequence(&self) -> i64;
    fn set_sequence(&mut self, sequence: i64);
}

#[async_trait]
pub trait Persistence<Model>: Debug + Send + Sync {
    async fn create(&self, model: &Model) -> anyhow::Result<String>;

    // compare-and-swap on (id, sequence): 0 rows affected means the caller
    // lost the race and must re-read before re-applying its transition
    async fn update(&self, model: &Model) -> anyhow::Result<u64>;

    async fn get_by_id(&self, id: &str) -> anyhow::Result<Option<Model>>;
    async fn list(&self) -> anyhow::Result<Vec<Model>>;
}

#[async_trait]
pub trait TrainingJobPersistence: Persistence<TrainingJob> {
    async fn get_by_organization_id(
        &self,
        organization_id: &str,
    ) -> anyhow::Result<Vec<TrainingJob>>;
    async fn get_by_status(&self, status: JobStatus) -> anyhow::Result<Vec<TrainingJob>>;
}

#[async_trait]
pub trait ModelVersionPersistence: Persistence<ModelVersion> {
    async fn get_by_module(&self, ai_module: &str) -> anyhow::Result<Vec<ModelVersion>>;
    async fn get_by_module_and_version(
        &self,
        ai_module: &str,
        version: &str,
    ) -> anyhow::Result<Option<ModelVersion>>;
}

#[async_trait]
pub trait DeploymentPersistence: Persistence<Deployment> {
    async fn get_by_model_version_id(
        &self,
        model_version_id: &str,
    ) -> anyhow::Result<Vec<Deployment>>;
    async fn get_by_target_id(&self, target_id: &str) -> anyhow::Result<Vec<Deployment>>;
    async fn get_by_status(&self, status: DeploymentStatus) -> anyhow::Result<Vec<Deployment>>;
    async fn get_active_by_version_and_target(
        &self,
        model_version_id: &str,
        target_id: &str,
    ) -> anyhow::Result<Option<Deployment>>;
}

#[async_trait]
pub trait EdgeTargetPersistence: Persistence<EdgeTarget> {
    // registry sync surface: the roster is replaced wholesale, not CAS-updated
    async fn upsert(&self, target: &EdgeTarget) -> anyhow::Result<u64>;
    async fn get_matching_module(&self, ai_module: &str) -> anyhow::Result<Vec<EdgeTarget>>;
}

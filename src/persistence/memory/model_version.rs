use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    models::ModelVersion,
    persistence::{ModelVersionPersistence, PersistableModel, Persistence},
};

#[derive(Debug)]
pub struct ModelVersionMemoryPersistence {
    models: Arc<Mutex<HashMap<String, ModelVersion>>>,
}

#[async_trait]
impl Persistence<ModelVersion> for ModelVersionMemoryPersistence {
    async fn create(&self, version: &ModelVersion) -> anyhow::Result<String> {
        let mut locked_versions = self.get_models_locked()?;

        locked_versions.insert(version.get_id(), version.clone());

        Ok(version.get_id())
    }

    async fn update(&self, version: &ModelVersion) -> anyhow::Result<u64> {
        let mut locked_versions = self.get_models_locked()?;

        match locked_versions.get(&version.get_id()) {
            Some(existing) if existing.get_sequence() == version.get_sequence() => {
                let mut updated_version = version.clone();
                updated_version.set_sequence(version.get_sequence() + 1);
                locked_versions.insert(updated_version.get_id(), updated_version);

                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn get_by_id(&self, version_id: &str) -> anyhow::Result<Option<ModelVersion>> {
        let locked_versions = self.get_models_locked()?;

        match locked_versions.get(version_id) {
            Some(fetched_version) => Ok(Some(fetched_version.clone())),
            None => Ok(None),
        }
    }

    async fn list(&self) -> anyhow::Result<Vec<ModelVersion>> {
        let locked_versions = self.get_models_locked()?;

        let versions = locked_versions.values().cloned().collect();

        Ok(versions)
    }
}

#[async_trait]
impl ModelVersionPersistence for ModelVersionMemoryPersistence {
    async fn get_by_module(&self, ai_module: &str) -> anyhow::Result<Vec<ModelVersion>> {
        let locked_versions = self.get_models_locked()?;

        let mut versions_for_module = Vec::new();
        for version in locked_versions.values() {
            if version.ai_module == ai_module {
                versions_for_module.push(version.clone());
            }
        }

        Ok(versions_for_module)
    }

    async fn get_by_module_and_version(
        &self,
        ai_module: &str,
        version: &str,
    ) -> anyhow::Result<Option<ModelVersion>> {
        let locked_versions = self.get_models_locked()?;

        for candidate in locked_versions.values() {
            if candidate.ai_module == ai_module && candidate.version == version {
                return Ok(Some(candidate.clone()));
            }
        }

        Ok(None)
    }
}

impl ModelVersionMemoryPersistence {
    fn get_models_locked(&self) -> anyhow::Result<MutexGuard<HashMap<String, ModelVersion>>> {
        match self.models.lock() {
            Ok(locked_versions) => Ok(locked_versions),
            Err(_) => Err(anyhow::anyhow!("failed to acquire lock")),
        }
    }
}

impl Default for ModelVersionMemoryPersistence {
    fn default() -> Self {
        Self {
            models: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

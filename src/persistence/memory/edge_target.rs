use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    models::EdgeTarget,
    persistence::{EdgeTargetPersistence, PersistableModel, Persistence},
};

#[derive(Debug)]
pub struct EdgeTargetMemoryPersistence {
    models: Arc<Mutex<HashMap<String, EdgeTarget>>>,
}

#[async_trait]
impl Persistence<EdgeTarget> for EdgeTargetMemoryPersistence {
    async fn create(&self, target: &EdgeTarget) -> anyhow::Result<String> {
        let mut locked_targets = self.get_models_locked()?;

        locked_targets.insert(target.get_id(), target.clone());

        Ok(target.get_id())
    }

    async fn update(&self, target: &EdgeTarget) -> anyhow::Result<u64> {
        let mut locked_targets = self.get_models_locked()?;

        match locked_targets.get(&target.get_id()) {
            Some(existing) if existing.get_sequence() == target.get_sequence() => {
                let mut updated_target = target.clone();
                updated_target.set_sequence(target.get_sequence() + 1);
                locked_targets.insert(updated_target.get_id(), updated_target);

                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn get_by_id(&self, target_id: &str) -> anyhow::Result<Option<EdgeTarget>> {
        let locked_targets = self.get_models_locked()?;

        match locked_targets.get(target_id) {
            Some(fetched_target) => Ok(Some(fetched_target.clone())),
            None => Ok(None),
        }
    }

    async fn list(&self) -> anyhow::Result<Vec<EdgeTarget>> {
        let locked_targets = self.get_models_locked()?;

        let targets = locked_targets.values().cloned().collect();

        Ok(targets)
    }
}

#[async_trait]
impl EdgeTargetPersistence for EdgeTargetMemoryPersistence {
    async fn upsert(&self, target: &EdgeTarget) -> anyhow::Result<u64> {
        let mut locked_targets = self.get_models_locked()?;

        locked_targets.insert(target.get_id(), target.clone());

        Ok(1)
    }

    async fn get_matching_module(&self, ai_module: &str) -> anyhow::Result<Vec<EdgeTarget>> {
        let locked_targets = self.get_models_locked()?;

        let mut matching_targets = Vec::new();
        for target in locked_targets.values() {
            if target.supports_module(ai_module) {
                matching_targets.push(target.clone());
            }
        }

        Ok(matching_targets)
    }
}

impl EdgeTargetMemoryPersistence {
    fn get_models_locked(&self) -> anyhow::Result<MutexGuard<HashMap<String, EdgeTarget>>> {
        match self.models.lock() {
            Ok(locked_targets) => Ok(locked_targets),
            Err(_) => Err(anyhow::anyhow!("failed to acquire lock")),
        }
    }
}

impl Default for EdgeTargetMemoryPersistence {
    fn default() -> Self {
        Self {
            models: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

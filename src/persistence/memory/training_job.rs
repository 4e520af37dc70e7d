use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use modelfleet_core::JobStatus;

use crate::{
    models::TrainingJob,
    persistence::{PersistableModel, Persistence, TrainingJobPersistence},
};

#[derive(Debug)]
pub struct TrainingJobMemoryPersistence {
    models: Arc<Mutex<HashMap<String, TrainingJob>>>,
}

#[async_trait]
impl Persistence<TrainingJob> for TrainingJobMemoryPersistence {
    async fn create(&self, job: &TrainingJob) -> anyhow::Result<String> {
        let mut locked_jobs = self.get_models_locked()?;

        locked_jobs.insert(job.get_id(), job.clone());

        Ok(job.get_id())
    }

    async fn update(&self, job: &TrainingJob) -> anyhow::Result<u64> {
        let mut locked_jobs = self.get_models_locked()?;

        match locked_jobs.get(&job.get_id()) {
            Some(existing) if existing.get_sequence() == job.get_sequence() => {
                let mut updated_job = job.clone();
                updated_job.set_sequence(job.get_sequence() + 1);
                locked_jobs.insert(updated_job.get_id(), updated_job);

                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn get_by_id(&self, job_id: &str) -> anyhow::Result<Option<TrainingJob>> {
        let locked_jobs = self.get_models_locked()?;

        match locked_jobs.get(job_id) {
            Some(fetched_job) => Ok(Some(fetched_job.clone())),
            None => Ok(None),
        }
    }

    async fn list(&self) -> anyhow::Result<Vec<TrainingJob>> {
        let locked_jobs = self.get_models_locked()?;

        let jobs = locked_jobs.values().cloned().collect();

        Ok(jobs)
    }
}

#[async_trait]
impl TrainingJobPersistence for TrainingJobMemoryPersistence {
    async fn get_by_organization_id(
        &self,
        organization_id: &str,
    ) -> anyhow::Result<Vec<TrainingJob>> {
        let locked_jobs = self.get_models_locked()?;

        let mut jobs_for_organization = Vec::new();
        for job in locked_jobs.values() {
            if job.organization_id == organization_id {
                jobs_for_organization.push(job.clone());
            }
        }

        Ok(jobs_for_organization)
    }

    async fn get_by_status(&self, status: JobStatus) -> anyhow::Result<Vec<TrainingJob>> {
        let locked_jobs = self.get_models_locked()?;

        let mut jobs_with_status = Vec::new();
        for job in locked_jobs.values() {
            if job.status == status {
                jobs_with_status.push(job.clone());
            }
        }

        Ok(jobs_with_status)
    }
}

impl TrainingJobMemoryPersistence {
    fn get_models_locked(&self) -> anyhow::Result<MutexGuard<HashMap<String, TrainingJob>>> {
        match self.models.lock() {
            Ok(locked_jobs) => Ok(locked_jobs),
            Err(_) => Err(anyhow::anyhow!("failed to acquire lock")),
        }
    }
}

impl Default for TrainingJobMemoryPersistence {
    fn default() -> Self {
        Self {
            models: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use modelfleet_core::test::get_job_fixture;

    use super::*;

    #[tokio::test]
    async fn test_create_get_update() {
        let job_persistence = TrainingJobMemoryPersistence::default();
        let job: TrainingJob = get_job_fixture(None).into();

        job_persistence.create(&job).await.unwrap();

        let fetched_job = job_persistence.get_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(fetched_job.id, job.id);
        assert_eq!(fetched_job.sequence, 0);

        let mut updated_job = fetched_job.clone();
        updated_job.status = JobStatus::Running;

        let updated_count = job_persistence.update(&updated_job).await.unwrap();
        assert_eq!(updated_count, 1);

        let fetched_job = job_persistence.get_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(fetched_job.status, JobStatus::Running);
        assert_eq!(fetched_job.sequence, 1);
    }

    #[tokio::test]
    async fn test_update_rejects_stale_sequence() {
        let job_persistence = TrainingJobMemoryPersistence::default();
        let job: TrainingJob = get_job_fixture(None).into();

        job_persistence.create(&job).await.unwrap();

        let mut first_writer = job.clone();
        first_writer.status = JobStatus::Running;
        assert_eq!(job_persistence.update(&first_writer).await.unwrap(), 1);

        // second writer still holds sequence 0 and must lose the race
        let mut second_writer = job.clone();
        second_writer.status = JobStatus::Cancelled;
        assert_eq!(job_persistence.update(&second_writer).await.unwrap(), 0);

        let fetched_job = job_persistence.get_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(fetched_job.status, JobStatus::Running);
    }

    #[tokio::test]
    async fn test_get_by_organization_and_status() {
        let job_persistence = TrainingJobMemoryPersistence::default();

        let job: TrainingJob = get_job_fixture(Some("job-one")).into();
        job_persistence.create(&job).await.unwrap();

        let mut other_org_job: TrainingJob = get_job_fixture(Some("job-two")).into();
        other_org_job.organization_id = "another-org".to_string();
        job_persistence.create(&other_org_job).await.unwrap();

        let jobs = job_persistence
            .get_by_organization_id(&job.organization_id)
            .await
            .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "job-one");

        let pending_jobs = job_persistence
            .get_by_status(JobStatus::Pending)
            .await
            .unwrap();
        assert_eq!(pending_jobs.len(), 2);
    }
}

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use modelfleet_core::{
    create_event, DatasetDirectory, EventStream, EventType, JobProgressMessage, JobStatus,
    JobTerminalMessage, ModelType, OperationId, OrchestratorError, SubmitJobRequest,
    TrainingExecutor, TrainingJobMessage,
};

use crate::{config::SchedulerConfig, models::TrainingJob, persistence::TrainingJobPersistence};

#[derive(Debug)]
pub struct TrainingJobService {
    pub persistence: Box<dyn TrainingJobPersistence>,
    pub event_stream: Arc<dyn EventStream>,

    pub datasets: Arc<dyn DatasetDirectory>,
    pub executor: Arc<dyn TrainingExecutor>,

    pub config: SchedulerConfig,
}

impl TrainingJobService {
    #[tracing::instrument(name = "service::training_job::submit")]
    pub async fn submit(
        &self,
        request: SubmitJobRequest,
        operation_id: &Option<OperationId>,
    ) -> Result<TrainingJob, OrchestratorError> {
        if request.ai_module.trim().is_empty() {
            return Err(OrchestratorError::Validation(
                "ai_module is required".to_string(),
            ));
        }

        if request.dataset_id.trim().is_empty() {
            return Err(OrchestratorError::Validation(
                "dataset_id is required".to_string(),
            ));
        }

        let dataset_ready = self.datasets.dataset_ready(&request.dataset_id).await?;
        if !dataset_ready {
            return Err(OrchestratorError::Validation(format!(
                "dataset {} does not exist or is not ready",
                request.dataset_id
            )));
        }

        let organization_jobs = self
            .persistence
            .get_by_organization_id(&request.organization_id)
            .await?;
        let active_count = organization_jobs.iter().filter(|job| job.is_active()).count();

        // over quota is backpressure, not failure: the job lands in queued and
        // the admission loop promotes it once capacity frees up
        let status = if active_count < self.config.max_concurrent_jobs {
            JobStatus::Pending
        } else {
            JobStatus::Queued
        };

        let job = TrainingJob {
            id: Uuid::new_v4().to_string(),
            organization_id: request.organization_id,
            name: request.name,
            description: request.description,
            ai_module: request.ai_module,
            dataset_id: request.dataset_id,
            base_model_version: request.base_model_version,
            hyperparameters: request.hyperparameters.unwrap_or_else(|| serde_json::json!({})),

            status,
            progress_percent: 0,
            current_epoch: None,
            total_epochs: request.total_epochs,
            metrics: None,
            training_logs: None,
            error_message: None,
            estimated_completion: None,
            annotations: serde_json::json!({}),

            created_at: Utc::now(),
            started_at: None,
            completed_at: None,

            sequence: 0,
        };

        self.persistence.create(&job).await?;

        let operation_id = OperationId::unwrap_or_create(operation_id);
        let job_created_event = create_event::<TrainingJobMessage>(
            &None,
            &Some(job.clone().into()),
            EventType::Created,
            ModelType::TrainingJob,
            &operation_id,
        )?;
        self.event_stream.send(&job_created_event).await?;

        tracing::info!("training job {} submitted as {}", job.id, job.status);

        Ok(job)
    }

    #[tracing::instrument(name = "service::training_job::cancel")]
    pub async fn cancel(
        &self,
        job_id: &str,
        operation_id: &Option<OperationId>,
    ) -> Result<TrainingJob, OrchestratorError> {
        let (previous_job, cancelled_job) = loop {
            let job = self.get_required(job_id).await?;

            if job.status.is_terminal() {
                return Err(OrchestratorError::InvalidState(format!(
                    "job {} is already {} and cannot be cancelled",
                    job_id, job.status
                )));
            }

            let mut cancelled_job = job.clone();
            cancelled_job.status = JobStatus::Cancelled;
            cancelled_job.completed_at = Some(Utc::now());

            if self.persistence.update(&cancelled_job).await? == 1 {
                cancelled_job.sequence += 1;
                break (job, cancelled_job);
            }
        };

        // best-effort: the executor may still deliver a late terminal callback,
        // which report_terminal drops once the job is cancelled
        if let Err(error) = self.executor.cancel(job_id).await {
            tracing::warn!("executor cancel for job {} failed: {}", job_id, error);
        }

        self.send_updated_event(&previous_job, &cancelled_job, operation_id)
            .await?;

        tracing::info!("training job {} cancelled", job_id);

        Ok(cancelled_job)
    }

    #[tracing::instrument(name = "service::training_job::report_progress")]
    pub async fn report_progress(
        &self,
        message: JobProgressMessage,
        operation_id: &Option<OperationId>,
    ) -> Result<(), OrchestratorError> {
        loop {
            let job = self.get_required(&message.job_id).await?;

            // duplicate or out-of-order callbacks after a terminal status are
            // dropped; progress is frozen from that point on
            if job.status.is_terminal() {
                return Ok(());
            }

            if job.status != JobStatus::Running {
                tracing::warn!(
                    "dropping progress callback for job {} in status {}",
                    job.id,
                    job.status
                );
                return Ok(());
            }

            let mut updated_job = job.clone();

            updated_job.progress_percent = job
                .progress_percent
                .max(message.progress_percent.clamp(0, 100));

            if let Some(epoch) = message.current_epoch {
                updated_job.current_epoch = Some(job.current_epoch.unwrap_or(0).max(epoch));
            }

            if let Some(reported_metrics) = &message.metrics {
                let mut metrics = job.metrics.unwrap_or_default();
                metrics.merge(reported_metrics);
                updated_job.metrics = Some(metrics);
            }

            if let Some(log_line) = &message.log_line {
                let mut training_logs = job.training_logs.clone().unwrap_or_default();
                if !training_logs.is_empty() {
                    training_logs.push('\n');
                }
                training_logs.push_str(log_line);
                updated_job.training_logs = Some(training_logs);
            }

            if message.estimated_completion.is_some() {
                updated_job.estimated_completion = message.estimated_completion;
            }

            if self.persistence.update(&updated_job).await? == 1 {
                updated_job.sequence += 1;
                self.send_updated_event(&job, &updated_job, operation_id)
                    .await?;
                return Ok(());
            }
        }
    }

    #[tracing::instrument(name = "service::training_job::report_terminal")]
    pub async fn report_terminal(
        &self,
        message: JobTerminalMessage,
        operation_id: &Option<OperationId>,
    ) -> Result<(), OrchestratorError> {
        if !matches!(message.status, JobStatus::Completed | JobStatus::Failed) {
            return Err(OrchestratorError::Validation(format!(
                "executor may only report completed or failed, got {}",
                message.status
            )));
        }

        loop {
            let job = self.get_required(&message.job_id).await?;

            // late callbacks for a job that is already terminal (including one
            // cancelled while the executor was still running) are dropped
            if job.status.is_terminal() {
                return Ok(());
            }

            if job.status != JobStatus::Running {
                tracing::warn!(
                    "dropping terminal callback for job {} in status {}",
                    job.id,
                    job.status
                );
                return Ok(());
            }

            let mut terminal_job = job.clone();
            terminal_job.status = message.status;
            terminal_job.completed_at = Some(Utc::now());

            if let Some(reported_metrics) = &message.metrics {
                let mut metrics = job.metrics.unwrap_or_default();
                metrics.merge(reported_metrics);
                terminal_job.metrics = Some(metrics);
            }

            match message.status {
                JobStatus::Completed => {
                    terminal_job.progress_percent = 100;
                }
                _ => {
                    terminal_job.error_message = Some(
                        message
                            .error_message
                            .clone()
                            .unwrap_or_else(|| "training executor reported failure".to_string()),
                    );
                }
            }

            if self.persistence.update(&terminal_job).await? == 1 {
                terminal_job.sequence += 1;
                self.send_updated_event(&job, &terminal_job, operation_id)
                    .await?;

                tracing::info!("training job {} reported {}", job.id, terminal_job.status);
                return Ok(());
            }
        }
    }

    // one admission tick: dispatch jobs admitted at submit time, then promote
    // queued jobs oldest-first while their organization has spare quota
    #[tracing::instrument(name = "service::training_job::admit_queued")]
    pub async fn admit_queued(
        &self,
        operation_id: &Option<OperationId>,
    ) -> Result<Vec<TrainingJob>, OrchestratorError> {
        let mut started_jobs = Vec::new();

        let mut pending_jobs = self.persistence.get_by_status(JobStatus::Pending).await?;
        pending_jobs.sort_by(|left, right| left.created_at.cmp(&right.created_at));

        for job in pending_jobs {
            if let Some(started_job) = self.start_job(job, operation_id).await? {
                started_jobs.push(started_job);
            }
        }

        let mut queued_jobs = self.persistence.get_by_status(JobStatus::Queued).await?;
        queued_jobs.sort_by(|left, right| left.created_at.cmp(&right.created_at));

        for job in queued_jobs {
            // quota is recomputed from the store on every decision
            let organization_jobs = self
                .persistence
                .get_by_organization_id(&job.organization_id)
                .await?;
            let occupied = organization_jobs
                .iter()
                .filter(|candidate| {
                    matches!(candidate.status, JobStatus::Pending | JobStatus::Running)
                })
                .count();

            if occupied >= self.config.max_concurrent_jobs {
                continue;
            }

            if let Some(started_job) = self.start_job(job, operation_id).await? {
                started_jobs.push(started_job);
            }
        }

        Ok(started_jobs)
    }

    #[tracing::instrument(name = "service::training_job::annotate")]
    pub async fn annotate(
        &self,
        job_id: &str,
        key: &str,
        value: serde_json::Value,
        operation_id: &Option<OperationId>,
    ) -> Result<TrainingJob, OrchestratorError> {
        if key.trim().is_empty() {
            return Err(OrchestratorError::Validation(
                "annotation key is required".to_string(),
            ));
        }

        loop {
            let job = self.get_required(job_id).await?;

            let mut annotated_job = job.clone();
            if !annotated_job.annotations.is_object() {
                annotated_job.annotations = serde_json::json!({});
            }
            if let Some(annotations) = annotated_job.annotations.as_object_mut() {
                annotations.insert(key.to_string(), value.clone());
            }

            if self.persistence.update(&annotated_job).await? == 1 {
                annotated_job.sequence += 1;
                self.send_updated_event(&job, &annotated_job, operation_id)
                    .await?;
                return Ok(annotated_job);
            }
        }
    }

    #[tracing::instrument(name = "service::training_job::get_by_id")]
    pub async fn get_by_id(&self, job_id: &str) -> Result<Option<TrainingJob>, OrchestratorError> {
        Ok(self.persistence.get_by_id(job_id).await?)
    }

    #[tracing::instrument(name = "service::training_job::get_by_organization_id")]
    pub async fn get_by_organization_id(
        &self,
        organization_id: &str,
    ) -> Result<Vec<TrainingJob>, OrchestratorError> {
        Ok(self
            .persistence
            .get_by_organization_id(organization_id)
            .await?)
    }

    #[tracing::instrument(name = "service::training_job::list")]
    pub async fn list(&self) -> Result<Vec<TrainingJob>, OrchestratorError> {
        Ok(self.persistence.list().await?)
    }

    async fn start_job(
        &self,
        job: TrainingJob,
        operation_id: &Option<OperationId>,
    ) -> Result<Option<TrainingJob>, OrchestratorError> {
        if let Err(error) = self.executor.dispatch(&job.clone().into()).await {
            tracing::warn!(
                "dispatch of job {} failed, retrying next tick: {}",
                job.id,
                error
            );
            return Ok(None);
        }

        let mut running_job = job.clone();
        running_job.status = JobStatus::Running;
        running_job.started_at = Some(Utc::now());

        if self.persistence.update(&running_job).await? == 0 {
            // lost a race with a concurrent cancel; the executor's eventual
            // terminal report will be dropped
            return Ok(None);
        }
        running_job.sequence += 1;

        self.send_updated_event(&job, &running_job, operation_id)
            .await?;

        tracing::info!("training job {} promoted to running", running_job.id);

        Ok(Some(running_job))
    }

    async fn get_required(&self, job_id: &str) -> Result<TrainingJob, OrchestratorError> {
        self.persistence
            .get_by_id(job_id)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(format!("training job {} not found", job_id)))
    }

    async fn send_updated_event(
        &self,
        previous_job: &TrainingJob,
        current_job: &TrainingJob,
        operation_id: &Option<OperationId>,
    ) -> Result<(), OrchestratorError> {
        let operation_id = OperationId::unwrap_or_create(operation_id);
        let job_updated_event = create_event::<TrainingJobMessage>(
            &Some(previous_job.clone().into()),
            &Some(current_job.clone().into()),
            EventType::Updated,
            ModelType::TrainingJob,
            &operation_id,
        )?;
        self.event_stream.send(&job_updated_event).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::memory::TrainingJobMemoryPersistence;
    use modelfleet_core::test::{MockTrainingExecutor, StaticDatasetDirectory};
    use modelfleet_memory_stream::MemoryEventStream;

    fn create_job_service_fixture(
        max_concurrent_jobs: usize,
    ) -> (TrainingJobService, Arc<MockTrainingExecutor>) {
        let event_stream: Arc<dyn EventStream> = Arc::new(MemoryEventStream::new().unwrap());
        let executor = Arc::new(MockTrainingExecutor::default());

        let job_service = TrainingJobService {
            persistence: Box::<TrainingJobMemoryPersistence>::default(),
            event_stream,
            datasets: Arc::new(StaticDatasetDirectory::default()),
            executor: Arc::clone(&executor) as Arc<dyn TrainingExecutor>,
            config: SchedulerConfig {
                max_concurrent_jobs,
                ..SchedulerConfig::default()
            },
        };

        (job_service, executor)
    }

    fn submit_request(name: &str) -> SubmitJobRequest {
        SubmitJobRequest {
            organization_id: "org-fixture".to_string(),
            name: name.to_string(),
            description: None,
            ai_module: "object-detection".to_string(),
            dataset_id: "dataset-fixture".to_string(),
            base_model_version: None,
            hyperparameters: None,
            total_epochs: Some(10),
        }
    }

    #[tokio::test]
    async fn test_submit_validates_input() {
        let (job_service, _executor) = create_job_service_fixture(2);

        let mut request = submit_request("missing module");
        request.ai_module = "".to_string();

        let error = job_service.submit(request, &None).await.unwrap_err();
        assert!(matches!(error, OrchestratorError::Validation(_)));

        let mut request = submit_request("missing dataset");
        request.dataset_id = " ".to_string();

        let error = job_service.submit(request, &None).await.unwrap_err();
        assert!(matches!(error, OrchestratorError::Validation(_)));
    }

    #[tokio::test]
    async fn test_submit_rejects_unready_dataset() {
        let (mut job_service, _executor) = create_job_service_fixture(2);
        job_service.datasets = Arc::new(StaticDatasetDirectory { ready: false });

        let error = job_service
            .submit(submit_request("unready dataset"), &None)
            .await
            .unwrap_err();
        assert!(matches!(error, OrchestratorError::Validation(_)));

        assert!(job_service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_queues_over_quota() {
        let (job_service, _executor) = create_job_service_fixture(1);

        let first_job = job_service
            .submit(submit_request("first"), &None)
            .await
            .unwrap();
        assert_eq!(first_job.status, JobStatus::Pending);

        let second_job = job_service
            .submit(submit_request("second"), &None)
            .await
            .unwrap();
        assert_eq!(second_job.status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn test_queued_job_promotes_when_quota_frees() {
        let (job_service, _executor) = create_job_service_fixture(1);

        let first_job = job_service
            .submit(submit_request("first"), &None)
            .await
            .unwrap();
        let second_job = job_service
            .submit(submit_request("second"), &None)
            .await
            .unwrap();
        assert_eq!(second_job.status, JobStatus::Queued);

        let started_jobs = job_service.admit_queued(&None).await.unwrap();
        assert_eq!(started_jobs.len(), 1);
        assert_eq!(started_jobs[0].id, first_job.id);

        // quota still saturated, the queued job stays queued
        let second_job = job_service
            .get_by_id(&second_job.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second_job.status, JobStatus::Queued);

        job_service
            .report_terminal(
                JobTerminalMessage {
                    job_id: first_job.id.clone(),
                    status: JobStatus::Completed,
                    metrics: None,
                    error_message: None,
                },
                &None,
            )
            .await
            .unwrap();

        // one tick later the queued job is running
        let started_jobs = job_service.admit_queued(&None).await.unwrap();
        assert_eq!(started_jobs.len(), 1);
        assert_eq!(started_jobs[0].id, second_job.id);
        assert_eq!(started_jobs[0].status, JobStatus::Running);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_freezes_at_terminal() {
        let (job_service, _executor) = create_job_service_fixture(2);

        let job = job_service
            .submit(submit_request("progress"), &None)
            .await
            .unwrap();
        job_service.admit_queued(&None).await.unwrap();

        // deliberately out-of-order delivery
        let mut last_observed = 0;
        for (percent, epoch) in [(10, 1), (40, 4), (30, 2), (20, 3), (60, 6), (50, 5)] {
            job_service
                .report_progress(
                    JobProgressMessage {
                        job_id: job.id.clone(),
                        progress_percent: percent,
                        current_epoch: Some(epoch),
                        metrics: None,
                        log_line: None,
                        estimated_completion: None,
                    },
                    &None,
                )
                .await
                .unwrap();

            let observed = job_service.get_by_id(&job.id).await.unwrap().unwrap();
            assert!(observed.progress_percent >= last_observed);
            last_observed = observed.progress_percent;
        }

        let observed = job_service.get_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(observed.progress_percent, 60);
        assert_eq!(observed.current_epoch, Some(6));

        job_service
            .report_terminal(
                JobTerminalMessage {
                    job_id: job.id.clone(),
                    status: JobStatus::Failed,
                    metrics: None,
                    error_message: Some("out of memory".to_string()),
                },
                &None,
            )
            .await
            .unwrap();

        // progress frozen after the terminal status
        job_service
            .report_progress(
                JobProgressMessage {
                    job_id: job.id.clone(),
                    progress_percent: 99,
                    current_epoch: Some(19),
                    metrics: None,
                    log_line: None,
                    estimated_completion: None,
                },
                &None,
            )
            .await
            .unwrap();

        let observed = job_service.get_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(observed.progress_percent, 60);
        assert_eq!(observed.status, JobStatus::Failed);
        assert_eq!(observed.error_message, Some("out of memory".to_string()));
    }

    #[tokio::test]
    async fn test_cancelled_job_ignores_late_terminal_callback() {
        let (job_service, executor) = create_job_service_fixture(2);

        let job = job_service
            .submit(submit_request("cancel"), &None)
            .await
            .unwrap();
        job_service.admit_queued(&None).await.unwrap();

        job_service.cancel(&job.id, &None).await.unwrap();
        assert_eq!(executor.cancelled.lock().unwrap().as_slice(), [job.id.clone()]);

        // the executor did not stop in time and reports completion anyway
        job_service
            .report_terminal(
                JobTerminalMessage {
                    job_id: job.id.clone(),
                    status: JobStatus::Completed,
                    metrics: None,
                    error_message: None,
                },
                &None,
            )
            .await
            .unwrap();

        let observed = job_service.get_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(observed.status, JobStatus::Cancelled);

        // and cancelling twice is an invalid state transition
        let error = job_service.cancel(&job.id, &None).await.unwrap_err();
        assert!(matches!(error, OrchestratorError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_admission_dispatches_to_executor() {
        let (job_service, executor) = create_job_service_fixture(2);

        let job = job_service
            .submit(submit_request("dispatch"), &None)
            .await
            .unwrap();

        assert!(executor.dispatched.lock().unwrap().is_empty());

        job_service.admit_queued(&None).await.unwrap();

        assert_eq!(executor.dispatched.lock().unwrap().as_slice(), [job.id.clone()]);

        // a second tick must not re-dispatch a running job
        job_service.admit_queued(&None).await.unwrap();
        assert_eq!(executor.dispatched.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_annotate_allowed_after_terminal() {
        let (job_service, _executor) = create_job_service_fixture(2);

        let job = job_service
            .submit(submit_request("annotate"), &None)
            .await
            .unwrap();
        job_service.admit_queued(&None).await.unwrap();

        job_service
            .report_terminal(
                JobTerminalMessage {
                    job_id: job.id.clone(),
                    status: JobStatus::Completed,
                    metrics: None,
                    error_message: None,
                },
                &None,
            )
            .await
            .unwrap();

        let annotated = job_service
            .annotate(
                &job.id,
                "reviewed_by",
                serde_json::json!("ops-team"),
                &None,
            )
            .await
            .unwrap();

        assert_eq!(annotated.annotations["reviewed_by"], "ops-team");
        assert_eq!(annotated.status, JobStatus::Completed);
    }
}

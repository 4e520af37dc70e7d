use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use modelfleet_core::{
    create_event, ApproveVersionRequest, EventStream, EventType, JobStatus, ModelType,
    ModelVersionMessage, OperationId, OrchestratorError, QualityGate, RegisterVersionRequest,
    ReleaseVersionRequest, UpdateVersionMetadataRequest, VersionStatus,
};

use crate::{
    models::ModelVersion, persistence::ModelVersionPersistence, services::TrainingJobService,
};

#[derive(Debug)]
pub struct ModelVersionService {
    pub persistence: Box<dyn ModelVersionPersistence>,
    pub event_stream: Arc<dyn EventStream>,

    pub job_service: Arc<TrainingJobService>,
    pub quality_gate: Box<dyn QualityGate>,
}

impl ModelVersionService {
    #[tracing::instrument(name = "service::model_version::register")]
    pub async fn register(
        &self,
        request: RegisterVersionRequest,
        operation_id: &Option<OperationId>,
    ) -> Result<ModelVersion, OrchestratorError> {
        if request.version.trim().is_empty() {
            return Err(OrchestratorError::Validation(
                "version is required".to_string(),
            ));
        }

        let (ai_module, training_job_id, job_metrics) = match &request.training_job_id {
            Some(job_id) => {
                let job = self
                    .job_service
                    .get_by_id(job_id)
                    .await?
                    .ok_or_else(|| {
                        OrchestratorError::NotFound(format!("training job {} not found", job_id))
                    })?;

                if job.status != JobStatus::Completed {
                    return Err(OrchestratorError::PrecursorNotReady(format!(
                        "training job {} is {}, not completed",
                        job_id, job.status
                    )));
                }

                (job.ai_module.clone(), Some(job_id.clone()), job.metrics)
            }
            None => {
                let ai_module = request
                    .ai_module
                    .clone()
                    .filter(|module| !module.trim().is_empty())
                    .ok_or_else(|| {
                        OrchestratorError::Validation(
                            "ai_module is required for imported versions".to_string(),
                        )
                    })?;

                if request.model_file_url.is_none() {
                    return Err(OrchestratorError::Validation(
                        "model_file_url is required for imported versions".to_string(),
                    ));
                }

                (ai_module, None, None)
            }
        };

        if self
            .persistence
            .get_by_module_and_version(&ai_module, &request.version)
            .await?
            .is_some()
        {
            return Err(OrchestratorError::Validation(format!(
                "version {} already exists for module {}",
                request.version, ai_module
            )));
        }

        let version = ModelVersion {
            id: Uuid::new_v4().to_string(),
            ai_module,
            version: request.version,
            name: request.name,
            description: request.description,
            training_job_id,
            base_version_id: request.base_version_id,

            model_file_url: request.model_file_url,
            model_file_size: request.model_file_size,
            config_file_url: request.config_file_url,

            accuracy: request
                .accuracy
                .or_else(|| job_metrics.as_ref().and_then(|metrics| metrics.accuracy)),
            precision_score: request.precision_score,
            recall_score: request.recall_score,
            f1_score: request.f1_score,
            inference_time_ms: request.inference_time_ms,

            min_edge_version: request.min_edge_version,
            supported_platforms: request.supported_platforms,

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
        };

        self.persistence.create(&version).await?;

        let operation_id = OperationId::unwrap_or_create(operation_id);
        let version_created_event = create_event::<ModelVersionMessage>(
            &None,
            &Some(version.clone().into()),
            EventType::Created,
            ModelType::ModelVersion,
            &operation_id,
        )?;
        self.event_stream.send(&version_created_event).await?;

        tracing::info!(
            "model version {} registered for module {} as {}",
            version.version,
            version.ai_module,
            version.id
        );

        Ok(version)
    }

    #[tracing::instrument(name = "service::model_version::mark_testing")]
    pub async fn mark_testing(
        &self,
        version_id: &str,
        operation_id: &Option<OperationId>,
    ) -> Result<ModelVersion, OrchestratorError> {
        loop {
            let version = self.get_required(version_id).await?;

            if !version.status.can_transition_to(VersionStatus::Testing) {
                return Err(OrchestratorError::InvalidState(format!(
                    "version {} is {} and cannot enter testing",
                    version_id, version.status
                )));
            }

            let mut testing_version = version.clone();
            testing_version.status = VersionStatus::Testing;

            if self.persistence.update(&testing_version).await? == 1 {
                testing_version.sequence += 1;
                self.send_updated_event(&version, &testing_version, operation_id)
                    .await?;
                return Ok(testing_version);
            }
        }
    }

    #[tracing::instrument(name = "service::model_version::approve")]
    pub async fn approve(
        &self,
        version_id: &str,
        request: ApproveVersionRequest,
        operation_id: &Option<OperationId>,
    ) -> Result<ModelVersion, OrchestratorError> {
        loop {
            let version = self.get_required(version_id).await?;

            if !version.status.can_transition_to(VersionStatus::Approved) {
                return Err(OrchestratorError::InvalidState(format!(
                    "version {} is {} and cannot be approved",
                    version_id, version.status
                )));
            }

            // policy hook: the default gate enforces a minimum accuracy
            if let Err(reason) = self.quality_gate.evaluate(&version.clone().into()) {
                return Err(OrchestratorError::InvalidState(format!(
                    "quality gate rejected version {}: {}",
                    version_id, reason
                )));
            }

            let mut approved_version = version.clone();
            approved_version.status = VersionStatus::Approved;
            approved_version.is_approved = true;
            approved_version.approved_by = request.approved_by.clone();
            approved_version.approved_at = Some(Utc::now());

            if self.persistence.update(&approved_version).await? == 1 {
                approved_version.sequence += 1;
                self.send_updated_event(&version, &approved_version, operation_id)
                    .await?;

                tracing::info!("model version {} approved", version_id);
                return Ok(approved_version);
            }
        }
    }

    #[tracing::instrument(name = "service::model_version::release")]
    pub async fn release(
        &self,
        version_id: &str,
        request: ReleaseVersionRequest,
        operation_id: &Option<OperationId>,
    ) -> Result<ModelVersion, OrchestratorError> {
        loop {
            let version = self.get_required(version_id).await?;

            if !version.status.can_transition_to(VersionStatus::Released) {
                return Err(OrchestratorError::InvalidState(format!(
                    "version {} is {}, only approved versions can be released",
                    version_id, version.status
                )));
            }

            let mut released_version = version.clone();
            released_version.status = VersionStatus::Released;
            released_version.is_released = true;
            released_version.released_by = request.released_by.clone();
            released_version.released_at = Some(Utc::now());
            released_version.release_notes = request.release_notes.clone();

            if self.persistence.update(&released_version).await? == 1 {
                released_version.sequence += 1;
                self.send_updated_event(&version, &released_version, operation_id)
                    .await?;

                tracing::info!(
                    "model version {} ({}) released",
                    version_id,
                    released_version.version
                );
                return Ok(released_version);
            }
        }
    }

    // terminal and irreversible; history is preserved, never rewritten
    #[tracing::instrument(name = "service::model_version::deprecate")]
    pub async fn deprecate(
        &self,
        version_id: &str,
        operation_id: &Option<OperationId>,
    ) -> Result<ModelVersion, OrchestratorError> {
        loop {
            let version = self.get_required(version_id).await?;

            if !version.status.can_transition_to(VersionStatus::Deprecated) {
                return Err(OrchestratorError::InvalidState(format!(
                    "version {} is already deprecated",
                    version_id
                )));
            }

            let mut deprecated_version = version.clone();
            deprecated_version.status = VersionStatus::Deprecated;

            if self.persistence.update(&deprecated_version).await? == 1 {
                deprecated_version.sequence += 1;
                self.send_updated_event(&version, &deprecated_version, operation_id)
                    .await?;

                tracing::info!("model version {} deprecated", version_id);
                return Ok(deprecated_version);
            }
        }
    }

    #[tracing::instrument(name = "service::model_version::update_metadata")]
    pub async fn update_metadata(
        &self,
        version_id: &str,
        request: UpdateVersionMetadataRequest,
        operation_id: &Option<OperationId>,
    ) -> Result<ModelVersion, OrchestratorError> {
        loop {
            let version = self.get_required(version_id).await?;

            let mut updated_version = version.clone();
            if request.name.is_some() {
                updated_version.name = request.name.clone();
            }
            if request.description.is_some() {
                updated_version.description = request.description.clone();
            }

            if self.persistence.update(&updated_version).await? == 1 {
                updated_version.sequence += 1;
                self.send_updated_event(&version, &updated_version, operation_id)
                    .await?;
                return Ok(updated_version);
            }
        }
    }

    #[tracing::instrument(name = "service::model_version::get_by_id")]
    pub async fn get_by_id(
        &self,
        version_id: &str,
    ) -> Result<Option<ModelVersion>, OrchestratorError> {
        Ok(self.persistence.get_by_id(version_id).await?)
    }

    #[tracing::instrument(name = "service::model_version::get_by_module")]
    pub async fn get_by_module(
        &self,
        ai_module: &str,
    ) -> Result<Vec<ModelVersion>, OrchestratorError> {
        Ok(self.persistence.get_by_module(ai_module).await?)
    }

    #[tracing::instrument(name = "service::model_version::list")]
    pub async fn list(&self) -> Result<Vec<ModelVersion>, OrchestratorError> {
        Ok(self.persistence.list().await?)
    }

    async fn get_required(&self, version_id: &str) -> Result<ModelVersion, OrchestratorError> {
        self.persistence.get_by_id(version_id).await?.ok_or_else(|| {
            OrchestratorError::NotFound(format!("model version {} not found", version_id))
        })
    }

    async fn send_updated_event(
        &self,
        previous_version: &ModelVersion,
        current_version: &ModelVersion,
        operation_id: &Option<OperationId>,
    ) -> Result<(), OrchestratorError> {
        let operation_id = OperationId::unwrap_or_create(operation_id);
        let version_updated_event = create_event::<ModelVersionMessage>(
            &Some(previous_version.clone().into()),
            &Some(current_version.clone().into()),
            EventType::Updated,
            ModelType::ModelVersion,
            &operation_id,
        )?;
        self.event_stream.send(&version_updated_event).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::persistence::memory::{ModelVersionMemoryPersistence, TrainingJobMemoryPersistence};
    use modelfleet_core::test::{MockTrainingExecutor, StaticDatasetDirectory};
    use modelfleet_core::{JobTerminalMessage, MinimumAccuracyGate, SubmitJobRequest, TrainingMetrics};
    use modelfleet_memory_stream::MemoryEventStream;

    fn create_version_service_fixture(min_accuracy: f64) -> ModelVersionService {
        let event_stream: Arc<dyn EventStream> = Arc::new(MemoryEventStream::new().unwrap());

        let job_service = Arc::new(TrainingJobService {
            persistence: Box::<TrainingJobMemoryPersistence>::default(),
            event_stream: Arc::clone(&event_stream),
            datasets: Arc::new(StaticDatasetDirectory::default()),
            executor: Arc::new(MockTrainingExecutor::default()),
            config: SchedulerConfig::default(),
        });

        ModelVersionService {
            persistence: Box::<ModelVersionMemoryPersistence>::default(),
            event_stream,
            job_service,
            quality_gate: Box::new(MinimumAccuracyGate { min_accuracy }),
        }
    }

    fn import_request(version: &str) -> RegisterVersionRequest {
        RegisterVersionRequest {
            training_job_id: None,
            ai_module: Some("object-detection".to_string()),
            version: version.to_string(),
            model_file_url: Some("https://artifacts.example.com/od.onnx".to_string()),
            accuracy: Some(0.92),
            ..RegisterVersionRequest::default()
        }
    }

    async fn complete_job(service: &ModelVersionService) -> String {
        let job = service
            .job_service
            .submit(
                SubmitJobRequest {
                    organization_id: "org-fixture".to_string(),
                    name: "retrain".to_string(),
                    description: None,
                    ai_module: "object-detection".to_string(),
                    dataset_id: "dataset-fixture".to_string(),
                    base_model_version: None,
                    hyperparameters: None,
                    total_epochs: Some(5),
                },
                &None,
            )
            .await
            .unwrap();

        service.job_service.admit_queued(&None).await.unwrap();
        service
            .job_service
            .report_terminal(
                JobTerminalMessage {
                    job_id: job.id.clone(),
                    status: JobStatus::Completed,
                    metrics: Some(TrainingMetrics {
                        accuracy: Some(0.94),
                        loss: Some(0.1),
                        val_accuracy: None,
                        val_loss: None,
                    }),
                    error_message: None,
                },
                &None,
            )
            .await
            .unwrap();

        job.id
    }

    #[tokio::test]
    async fn test_register_requires_completed_job() {
        let version_service = create_version_service_fixture(0.0);

        let job = version_service
            .job_service
            .submit(
                SubmitJobRequest {
                    organization_id: "org-fixture".to_string(),
                    name: "still running".to_string(),
                    description: None,
                    ai_module: "object-detection".to_string(),
                    dataset_id: "dataset-fixture".to_string(),
                    base_model_version: None,
                    hyperparameters: None,
                    total_epochs: None,
                },
                &None,
            )
            .await
            .unwrap();

        let error = version_service
            .register(
                RegisterVersionRequest {
                    training_job_id: Some(job.id),
                    version: "1.0.0".to_string(),
                    ..RegisterVersionRequest::default()
                },
                &None,
            )
            .await
            .unwrap_err();

        assert!(matches!(error, OrchestratorError::PrecursorNotReady(_)));
        assert!(version_service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_inherits_job_metrics() {
        let version_service = create_version_service_fixture(0.0);
        let job_id = complete_job(&version_service).await;

        let version = version_service
            .register(
                RegisterVersionRequest {
                    training_job_id: Some(job_id.clone()),
                    version: "1.0.0".to_string(),
                    ..RegisterVersionRequest::default()
                },
                &None,
            )
            .await
            .unwrap();

        assert_eq!(version.status, VersionStatus::Draft);
        assert_eq!(version.ai_module, "object-detection");
        assert_eq!(version.training_job_id, Some(job_id));
        assert_eq!(version.accuracy, Some(0.94));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_version() {
        let version_service = create_version_service_fixture(0.0);

        version_service
            .register(import_request("1.0.0"), &None)
            .await
            .unwrap();

        let error = version_service
            .register(import_request("1.0.0"), &None)
            .await
            .unwrap_err();
        assert!(matches!(error, OrchestratorError::Validation(_)));
    }

    #[tokio::test]
    async fn test_release_only_reachable_through_approve() {
        let version_service = create_version_service_fixture(0.0);

        let version = version_service
            .register(import_request("1.2.0"), &None)
            .await
            .unwrap();

        let error = version_service
            .release(&version.id, ReleaseVersionRequest::default(), &None)
            .await
            .unwrap_err();
        assert!(matches!(error, OrchestratorError::InvalidState(_)));

        let approved = version_service
            .approve(&version.id, ApproveVersionRequest::default(), &None)
            .await
            .unwrap();
        assert!(approved.is_approved);
        assert!(!approved.is_released);

        let released = version_service
            .release(
                &version.id,
                ReleaseVersionRequest {
                    released_by: Some("release-manager".to_string()),
                    release_notes: Some("improved small object recall".to_string()),
                },
                &None,
            )
            .await
            .unwrap();

        // is_released implies is_approved at every observed snapshot
        assert!(released.is_released);
        assert!(released.is_approved);
        assert_eq!(released.status, VersionStatus::Released);

        // approving a released version is illegal
        let error = version_service
            .approve(&version.id, ApproveVersionRequest::default(), &None)
            .await
            .unwrap_err();
        assert!(matches!(error, OrchestratorError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_quality_gate_vetoes_approval() {
        let version_service = create_version_service_fixture(0.95);

        let version = version_service
            .register(import_request("1.3.0"), &None)
            .await
            .unwrap();

        let error = version_service
            .approve(&version.id, ApproveVersionRequest::default(), &None)
            .await
            .unwrap_err();
        assert!(matches!(error, OrchestratorError::InvalidState(_)));

        let observed = version_service
            .get_by_id(&version.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(observed.status, VersionStatus::Draft);
        assert!(!observed.is_approved);
    }

    #[tokio::test]
    async fn test_deprecate_is_terminal() {
        let version_service = create_version_service_fixture(0.0);

        let version = version_service
            .register(import_request("1.4.0"), &None)
            .await
            .unwrap();

        version_service.deprecate(&version.id, &None).await.unwrap();

        let error = version_service
            .deprecate(&version.id, &None)
            .await
            .unwrap_err();
        assert!(matches!(error, OrchestratorError::InvalidState(_)));

        let error = version_service
            .approve(&version.id, ApproveVersionRequest::default(), &None)
            .await
            .unwrap_err();
        assert!(matches!(error, OrchestratorError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_optional_testing_phase() {
        let version_service = create_version_service_fixture(0.0);

        let version = version_service
            .register(import_request("1.5.0"), &None)
            .await
            .unwrap();

        let testing = version_service
            .mark_testing(&version.id, &None)
            .await
            .unwrap();
        assert_eq!(testing.status, VersionStatus::Testing);

        let approved = version_service
            .approve(&version.id, ApproveVersionRequest::default(), &None)
            .await
            .unwrap();
        assert_eq!(approved.status, VersionStatus::Approved);
    }
}

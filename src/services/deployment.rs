use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use modelfleet_core::{
    create_event, DeploymentMessage, DeploymentProgressMessage, DeploymentStatus,
    DeploymentTerminalMessage, EventStream, EventType, FailureKind, FleetRegistry, ModelType,
    OperationId, OrchestratorError, RolloutStatus, RolloutStatusResponse, VersionStatus,
};

use crate::{
    config::RolloutConfig,
    models::{Deployment, ModelVersion},
    persistence::DeploymentPersistence,
    services::{EdgeTargetService, ModelVersionService},
};

#[derive(Debug)]
pub struct DeploymentService {
    pub persistence: Box<dyn DeploymentPersistence>,
    pub event_stream: Arc<dyn EventStream>,

    pub model_version_service: Arc<ModelVersionService>,
    pub target_service: Arc<EdgeTargetService>,

    pub config: RolloutConfig,
}

impl DeploymentService {
    #[tracing::instrument(name = "service::deployment::deploy_to_target")]
    pub async fn deploy_to_target(
        &self,
        version_id: &str,
        target_id: &str,
        operation_id: &Option<OperationId>,
    ) -> Result<Deployment, OrchestratorError> {
        let version = self.get_released_version(version_id).await?;

        if self.target_service.get_by_id(target_id).await?.is_none() {
            return Err(OrchestratorError::NotFound(format!(
                "edge target {} is not in the fleet roster",
                target_id
            )));
        }

        self.create_for_target(&version, target_id, operation_id)
            .await
    }

    // one bad target never fails the batch: targets already mid-deployment are
    // folded into the result so callers can poll the whole rollout
    #[tracing::instrument(name = "service::deployment::deploy_to_fleet")]
    pub async fn deploy_to_fleet(
        &self,
        version_id: &str,
        operation_id: &Option<OperationId>,
    ) -> Result<Vec<Deployment>, OrchestratorError> {
        let version = self.get_released_version(version_id).await?;

        let target_ids = self
            .target_service
            .list_targets(&version.ai_module)
            .await?;

        let mut deployments = Vec::new();
        for target_id in target_ids {
            match self
                .create_for_target(&version, &target_id, operation_id)
                .await
            {
                Ok(deployment) => deployments.push(deployment),
                Err(OrchestratorError::AlreadyDeploying(_)) => {
                    if let Some(active_deployment) = self
                        .persistence
                        .get_active_by_version_and_target(&version.id, &target_id)
                        .await?
                    {
                        deployments.push(active_deployment);
                    }
                }
                Err(error) => return Err(error),
            }
        }

        tracing::info!(
            "fleet rollout of version {} spans {} targets",
            version_id,
            deployments.len()
        );

        Ok(deployments)
    }

    #[tracing::instrument(name = "service::deployment::retry")]
    pub async fn retry(
        &self,
        deployment_id: &str,
        operation_id: &Option<OperationId>,
    ) -> Result<Deployment, OrchestratorError> {
        loop {
            let deployment = self.get_required(deployment_id).await?;

            if deployment.status != DeploymentStatus::Failed {
                return Err(OrchestratorError::InvalidState(format!(
                    "deployment {} is {}, only failed deployments can be retried",
                    deployment_id, deployment.status
                )));
            }

            if deployment.retry_count >= self.config.retry_limit {
                return Err(OrchestratorError::RetryLimitExceeded(format!(
                    "deployment {} has already been retried {} times",
                    deployment_id, deployment.retry_count
                )));
            }

            // transient failures are retried internally first; manual retry
            // only takes over once the automatic budget is spent
            if deployment.failure_kind == Some(FailureKind::Transient)
                && deployment.retry_count < self.config.auto_retry_limit
            {
                return Err(OrchestratorError::TransientInfra(format!(
                    "deployment {} is awaiting an automatic retry",
                    deployment_id
                )));
            }

            let requeued = self.requeue(&deployment, operation_id).await?;
            if let Some(requeued_deployment) = requeued {
                tracing::info!(
                    "deployment {} manually requeued (retry {})",
                    deployment_id,
                    requeued_deployment.retry_count
                );
                return Ok(requeued_deployment);
            }
        }
    }

    // automatic retry path: only transient failures under the automatic
    // budget are requeued, everything else waits for manual intervention
    pub(crate) async fn requeue_transient(
        &self,
        deployment_id: &str,
        operation_id: &Option<OperationId>,
    ) -> Result<Option<Deployment>, OrchestratorError> {
        loop {
            let deployment = match self.persistence.get_by_id(deployment_id).await? {
                Some(deployment) => deployment,
                None => return Ok(None),
            };

            if deployment.status != DeploymentStatus::Failed
                || deployment.failure_kind != Some(FailureKind::Transient)
                || deployment.retry_count >= self.config.auto_retry_limit
            {
                return Ok(None);
            }

            if let Some(requeued_deployment) = self.requeue(&deployment, operation_id).await? {
                return Ok(Some(requeued_deployment));
            }
        }
    }

    #[tracing::instrument(name = "service::deployment::report_progress")]
    pub async fn report_progress(
        &self,
        message: DeploymentProgressMessage,
        operation_id: &Option<OperationId>,
    ) -> Result<(), OrchestratorError> {
        if !matches!(
            message.status,
            DeploymentStatus::Downloading | DeploymentStatus::Installing
        ) {
            return Err(OrchestratorError::Validation(format!(
                "edge agents may only report downloading or installing progress, got {}",
                message.status
            )));
        }

        loop {
            let deployment = self.get_required(&message.deployment_id).await?;

            if deployment.status.is_terminal() {
                return Ok(());
            }

            let mut updated_deployment = deployment.clone();

            if deployment.status != message.status {
                // a downloading report arriving after installing is stale
                if !deployment.status.can_transition_to(message.status) {
                    return Ok(());
                }
                updated_deployment.status = message.status;
            }

            if updated_deployment.started_at.is_none() {
                updated_deployment.started_at = Some(Utc::now());
            }

            // progress mirrors the most recent accepted callback
            updated_deployment.progress_percent = message.progress_percent.clamp(0, 100);

            if self.persistence.update(&updated_deployment).await? == 1 {
                updated_deployment.sequence += 1;
                self.send_updated_event(&deployment, &updated_deployment, operation_id)
                    .await?;
                return Ok(());
            }
        }
    }

    #[tracing::instrument(name = "service::deployment::report_terminal")]
    pub async fn report_terminal(
        &self,
        message: DeploymentTerminalMessage,
        operation_id: &Option<OperationId>,
    ) -> Result<(), OrchestratorError> {
        if !matches!(
            message.status,
            DeploymentStatus::Completed | DeploymentStatus::Failed
        ) {
            return Err(OrchestratorError::Validation(format!(
                "edge agents may only report completed or failed, got {}",
                message.status
            )));
        }

        loop {
            let deployment = self.get_required(&message.deployment_id).await?;

            // a completed deployment never regresses; duplicates are dropped
            if deployment.status.is_terminal() {
                return Ok(());
            }

            let mut terminal_deployment = deployment.clone();
            terminal_deployment.status = message.status;
            terminal_deployment.completed_at = Some(Utc::now());

            match message.status {
                DeploymentStatus::Completed => {
                    terminal_deployment.progress_percent = 100;
                    terminal_deployment.error_message = None;
                    terminal_deployment.failure_kind = None;
                }
                _ => {
                    terminal_deployment.error_message = Some(
                        message
                            .error_message
                            .clone()
                            .unwrap_or_else(|| "edge target reported install failure".to_string()),
                    );
                    terminal_deployment.failure_kind = message.failure_kind;
                }
            }

            if self.persistence.update(&terminal_deployment).await? == 1 {
                terminal_deployment.sequence += 1;
                self.send_updated_event(&deployment, &terminal_deployment, operation_id)
                    .await?;

                tracing::info!(
                    "deployment {} reported {}",
                    deployment.id,
                    terminal_deployment.status
                );
                return Ok(());
            }
        }
    }

    #[tracing::instrument(name = "service::deployment::rollout_status")]
    pub async fn rollout_status(
        &self,
        deployment_ids: &[String],
    ) -> Result<RolloutStatusResponse, OrchestratorError> {
        let mut completed = 0;
        let mut failed = 0;
        let mut active = 0;

        for deployment_id in deployment_ids {
            let deployment = self.get_required(deployment_id).await?;
            match deployment.status {
                DeploymentStatus::Completed => completed += 1,
                DeploymentStatus::Failed => failed += 1,
                _ => active += 1,
            }
        }

        let status = if active > 0 {
            RolloutStatus::InProgress
        } else if failed > 0 {
            RolloutStatus::PartiallyFailed
        } else {
            RolloutStatus::Succeeded
        };

        Ok(RolloutStatusResponse {
            status,
            total: deployment_ids.len(),
            completed,
            failed,
            active,
        })
    }

    #[tracing::instrument(name = "service::deployment::get_by_id")]
    pub async fn get_by_id(
        &self,
        deployment_id: &str,
    ) -> Result<Option<Deployment>, OrchestratorError> {
        Ok(self.persistence.get_by_id(deployment_id).await?)
    }

    #[tracing::instrument(name = "service::deployment::get_by_model_version_id")]
    pub async fn get_by_model_version_id(
        &self,
        model_version_id: &str,
    ) -> Result<Vec<Deployment>, OrchestratorError> {
        Ok(self
            .persistence
            .get_by_model_version_id(model_version_id)
            .await?)
    }

    #[tracing::instrument(name = "service::deployment::get_by_status")]
    pub async fn get_by_status(
        &self,
        status: DeploymentStatus,
    ) -> Result<Vec<Deployment>, OrchestratorError> {
        Ok(self.persistence.get_by_status(status).await?)
    }

    #[tracing::instrument(name = "service::deployment::list")]
    pub async fn list(&self) -> Result<Vec<Deployment>, OrchestratorError> {
        Ok(self.persistence.list().await?)
    }

    // read-time cross-component invariant: only released versions deploy;
    // deprecated (or never-released) versions are rejected here
    async fn get_released_version(
        &self,
        version_id: &str,
    ) -> Result<ModelVersion, OrchestratorError> {
        let version = self
            .model_version_service
            .get_by_id(version_id)
            .await?
            .ok_or_else(|| {
                OrchestratorError::NotFound(format!("model version {} not found", version_id))
            })?;

        if version.status != VersionStatus::Released {
            return Err(OrchestratorError::NotReleased(format!(
                "model version {} is {}",
                version_id, version.status
            )));
        }

        Ok(version)
    }

    async fn create_for_target(
        &self,
        version: &ModelVersion,
        target_id: &str,
        operation_id: &Option<OperationId>,
    ) -> Result<Deployment, OrchestratorError> {
        if let Some(active_deployment) = self
            .persistence
            .get_active_by_version_and_target(&version.id, target_id)
            .await?
        {
            return Err(OrchestratorError::AlreadyDeploying(format!(
                "deployment {} for version {} on target {} is still {}",
                active_deployment.id, version.id, target_id, active_deployment.status
            )));
        }

        let deployment = Deployment {
            id: Uuid::new_v4().to_string(),
            model_version_id: version.id.clone(),
            target_id: target_id.to_string(),

            status: DeploymentStatus::Pending,
            progress_percent: 0,
            retry_count: 0,
            error_message: None,
            failure_kind: None,

            scheduled_at: Utc::now(),
            started_at: None,
            completed_at: None,

            sequence: 0,
        };

        self.persistence.create(&deployment).await?;

        let operation_id = OperationId::unwrap_or_create(operation_id);
        let deployment_created_event = create_event::<DeploymentMessage>(
            &None,
            &Some(deployment.clone().into()),
            EventType::Created,
            ModelType::Deployment,
            &operation_id,
        )?;
        self.event_stream.send(&deployment_created_event).await?;

        tracing::info!(
            "deployment {} scheduled for version {} on target {}",
            deployment.id,
            version.id,
            target_id
        );

        Ok(deployment)
    }

    // failed -> pending reset, shared by the manual and automatic paths;
    // None means the CAS lost and the caller should re-read
    async fn requeue(
        &self,
        deployment: &Deployment,
        operation_id: &Option<OperationId>,
    ) -> Result<Option<Deployment>, OrchestratorError> {
        let mut requeued_deployment = deployment.clone();
        requeued_deployment.status = DeploymentStatus::Pending;
        requeued_deployment.retry_count += 1;
        requeued_deployment.progress_percent = 0;
        requeued_deployment.error_message = None;
        requeued_deployment.failure_kind = None;
        requeued_deployment.scheduled_at = Utc::now();
        requeued_deployment.started_at = None;
        requeued_deployment.completed_at = None;

        if self.persistence.update(&requeued_deployment).await? == 0 {
            return Ok(None);
        }
        requeued_deployment.sequence += 1;

        self.send_updated_event(deployment, &requeued_deployment, operation_id)
            .await?;

        Ok(Some(requeued_deployment))
    }

    async fn get_required(&self, deployment_id: &str) -> Result<Deployment, OrchestratorError> {
        self.persistence
            .get_by_id(deployment_id)
            .await?
            .ok_or_else(|| {
                OrchestratorError::NotFound(format!("deployment {} not found", deployment_id))
            })
    }

    async fn send_updated_event(
        &self,
        previous_deployment: &Deployment,
        current_deployment: &Deployment,
        operation_id: &Option<OperationId>,
    ) -> Result<(), OrchestratorError> {
        let operation_id = OperationId::unwrap_or_create(operation_id);
        let deployment_updated_event = create_event::<DeploymentMessage>(
            &Some(previous_deployment.clone().into()),
            &Some(current_deployment.clone().into()),
            EventType::Updated,
            ModelType::Deployment,
            &operation_id,
        )?;
        self.event_stream.send(&deployment_updated_event).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::models::EdgeTarget;
    use crate::persistence::memory::{
        DeploymentMemoryPersistence, EdgeTargetMemoryPersistence, ModelVersionMemoryPersistence,
        TrainingJobMemoryPersistence,
    };
    use crate::services::TrainingJobService;
    use modelfleet_core::test::{get_target_fixture, MockTrainingExecutor, StaticDatasetDirectory};
    use modelfleet_core::{
        ApproveVersionRequest, MinimumAccuracyGate, RegisterVersionRequest, ReleaseVersionRequest,
    };
    use modelfleet_memory_stream::MemoryEventStream;

    async fn create_deployment_service_fixture(target_ids: &[&str]) -> DeploymentService {
        let event_stream: Arc<dyn EventStream> = Arc::new(MemoryEventStream::new().unwrap());

        let job_service = Arc::new(TrainingJobService {
            persistence: Box::<TrainingJobMemoryPersistence>::default(),
            event_stream: Arc::clone(&event_stream),
            datasets: Arc::new(StaticDatasetDirectory::default()),
            executor: Arc::new(MockTrainingExecutor::default()),
            config: SchedulerConfig::default(),
        });

        let model_version_service = Arc::new(ModelVersionService {
            persistence: Box::<ModelVersionMemoryPersistence>::default(),
            event_stream: Arc::clone(&event_stream),
            job_service,
            quality_gate: Box::new(MinimumAccuracyGate { min_accuracy: 0.0 }),
        });

        let target_service = Arc::new(EdgeTargetService {
            persistence: Box::<EdgeTargetMemoryPersistence>::default(),
            event_stream: Arc::clone(&event_stream),
        });

        for target_id in target_ids {
            let target: EdgeTarget = get_target_fixture(Some(target_id)).into();
            target_service.upsert(&target, &None).await.unwrap();
        }

        DeploymentService {
            persistence: Box::<DeploymentMemoryPersistence>::default(),
            event_stream,
            model_version_service,
            target_service,
            config: RolloutConfig::default(),
        }
    }

    async fn released_version(deployment_service: &DeploymentService) -> ModelVersion {
        let version = deployment_service
            .model_version_service
            .register(
                RegisterVersionRequest {
                    training_job_id: None,
                    ai_module: Some("object-detection".to_string()),
                    version: "2.0.0".to_string(),
                    model_file_url: Some("https://artifacts.example.com/od-2.0.0.onnx".to_string()),
                    accuracy: Some(0.95),
                    ..RegisterVersionRequest::default()
                },
                &None,
            )
            .await
            .unwrap();

        deployment_service
            .model_version_service
            .approve(&version.id, ApproveVersionRequest::default(), &None)
            .await
            .unwrap();

        deployment_service
            .model_version_service
            .release(&version.id, ReleaseVersionRequest::default(), &None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_deploy_requires_released_version() {
        let deployment_service = create_deployment_service_fixture(&["target-1"]).await;

        let draft_version = deployment_service
            .model_version_service
            .register(
                RegisterVersionRequest {
                    training_job_id: None,
                    ai_module: Some("object-detection".to_string()),
                    version: "0.1.0".to_string(),
                    model_file_url: Some("https://artifacts.example.com/od-0.1.0.onnx".to_string()),
                    ..RegisterVersionRequest::default()
                },
                &None,
            )
            .await
            .unwrap();

        let error = deployment_service
            .deploy_to_target(&draft_version.id, "target-1", &None)
            .await
            .unwrap_err();
        assert!(matches!(error, OrchestratorError::NotReleased(_)));

        // no partial side effects
        assert!(deployment_service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deploy_rejects_deprecated_version() {
        let deployment_service = create_deployment_service_fixture(&["target-1"]).await;
        let version = released_version(&deployment_service).await;

        deployment_service
            .model_version_service
            .deprecate(&version.id, &None)
            .await
            .unwrap();

        let error = deployment_service
            .deploy_to_target(&version.id, "target-1", &None)
            .await
            .unwrap_err();
        assert!(matches!(error, OrchestratorError::NotReleased(_)));
    }

    #[tokio::test]
    async fn test_at_most_one_in_flight_per_target() {
        let deployment_service = create_deployment_service_fixture(&["target-1"]).await;
        let version = released_version(&deployment_service).await;

        deployment_service
            .deploy_to_target(&version.id, "target-1", &None)
            .await
            .unwrap();

        let error = deployment_service
            .deploy_to_target(&version.id, "target-1", &None)
            .await
            .unwrap_err();
        assert!(matches!(error, OrchestratorError::AlreadyDeploying(_)));
    }

    #[tokio::test]
    async fn test_fleet_fan_out_skips_active_deployments() {
        let deployment_service =
            create_deployment_service_fixture(&["target-1", "target-2", "target-3", "target-4", "target-5"])
                .await;
        let version = released_version(&deployment_service).await;

        // two targets are already mid-deployment
        let first = deployment_service
            .deploy_to_target(&version.id, "target-2", &None)
            .await
            .unwrap();
        let second = deployment_service
            .deploy_to_target(&version.id, "target-4", &None)
            .await
            .unwrap();

        let deployments = deployment_service
            .deploy_to_fleet(&version.id, &None)
            .await
            .unwrap();

        // N ids total, N - M fresh rows
        assert_eq!(deployments.len(), 5);
        assert_eq!(deployment_service.list().await.unwrap().len(), 5);

        let returned_ids: Vec<&str> = deployments
            .iter()
            .map(|deployment| deployment.id.as_str())
            .collect();
        assert!(returned_ids.contains(&first.id.as_str()));
        assert!(returned_ids.contains(&second.id.as_str()));
    }

    #[tokio::test]
    async fn test_manual_retry_accounting() {
        let deployment_service = create_deployment_service_fixture(&["target-1"]).await;
        let version = released_version(&deployment_service).await;

        let deployment = deployment_service
            .deploy_to_target(&version.id, "target-1", &None)
            .await
            .unwrap();

        // perpetually failing target
        for expected_retry in 1..=deployment_service.config.retry_limit {
            deployment_service
                .report_terminal(
                    DeploymentTerminalMessage {
                        deployment_id: deployment.id.clone(),
                        status: DeploymentStatus::Failed,
                        error_message: Some("firmware incompatible".to_string()),
                        failure_kind: Some(FailureKind::Permanent),
                    },
                    &None,
                )
                .await
                .unwrap();

            let retried = deployment_service
                .retry(&deployment.id, &None)
                .await
                .unwrap();
            assert_eq!(retried.retry_count, expected_retry);
            assert_eq!(retried.status, DeploymentStatus::Pending);
        }

        deployment_service
            .report_terminal(
                DeploymentTerminalMessage {
                    deployment_id: deployment.id.clone(),
                    status: DeploymentStatus::Failed,
                    error_message: Some("firmware incompatible".to_string()),
                    failure_kind: Some(FailureKind::Permanent),
                },
                &None,
            )
            .await
            .unwrap();

        let error = deployment_service
            .retry(&deployment.id, &None)
            .await
            .unwrap_err();
        assert!(matches!(error, OrchestratorError::RetryLimitExceeded(_)));

        // the counter stops incrementing
        let observed = deployment_service
            .get_by_id(&deployment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(observed.retry_count, deployment_service.config.retry_limit);
    }

    #[tokio::test]
    async fn test_manual_retry_defers_to_automatic_budget() {
        let deployment_service = create_deployment_service_fixture(&["target-1"]).await;
        let version = released_version(&deployment_service).await;

        let deployment = deployment_service
            .deploy_to_target(&version.id, "target-1", &None)
            .await
            .unwrap();

        deployment_service
            .report_terminal(
                DeploymentTerminalMessage {
                    deployment_id: deployment.id.clone(),
                    status: DeploymentStatus::Failed,
                    error_message: Some("target temporarily unreachable".to_string()),
                    failure_kind: Some(FailureKind::Transient),
                },
                &None,
            )
            .await
            .unwrap();

        let error = deployment_service
            .retry(&deployment.id, &None)
            .await
            .unwrap_err();
        assert!(matches!(error, OrchestratorError::TransientInfra(_)));
    }

    #[tokio::test]
    async fn test_retry_requires_failed_status() {
        let deployment_service = create_deployment_service_fixture(&["target-1"]).await;
        let version = released_version(&deployment_service).await;

        let deployment = deployment_service
            .deploy_to_target(&version.id, "target-1", &None)
            .await
            .unwrap();

        let error = deployment_service
            .retry(&deployment.id, &None)
            .await
            .unwrap_err();
        assert!(matches!(error, OrchestratorError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_progress_phases_and_terminal_idempotency() {
        let deployment_service = create_deployment_service_fixture(&["target-1"]).await;
        let version = released_version(&deployment_service).await;

        let deployment = deployment_service
            .deploy_to_target(&version.id, "target-1", &None)
            .await
            .unwrap();

        deployment_service
            .report_progress(
                DeploymentProgressMessage {
                    deployment_id: deployment.id.clone(),
                    status: DeploymentStatus::Downloading,
                    progress_percent: 40,
                },
                &None,
            )
            .await
            .unwrap();

        deployment_service
            .report_progress(
                DeploymentProgressMessage {
                    deployment_id: deployment.id.clone(),
                    status: DeploymentStatus::Installing,
                    progress_percent: 10,
                },
                &None,
            )
            .await
            .unwrap();

        // stale downloading callback after installing is dropped
        deployment_service
            .report_progress(
                DeploymentProgressMessage {
                    deployment_id: deployment.id.clone(),
                    status: DeploymentStatus::Downloading,
                    progress_percent: 90,
                },
                &None,
            )
            .await
            .unwrap();

        let observed = deployment_service
            .get_by_id(&deployment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(observed.status, DeploymentStatus::Installing);
        assert_eq!(observed.progress_percent, 10);

        deployment_service
            .report_terminal(
                DeploymentTerminalMessage {
                    deployment_id: deployment.id.clone(),
                    status: DeploymentStatus::Completed,
                    error_message: None,
                    failure_kind: None,
                },
                &None,
            )
            .await
            .unwrap();

        // completed never regresses, even if a late failure report arrives
        deployment_service
            .report_terminal(
                DeploymentTerminalMessage {
                    deployment_id: deployment.id.clone(),
                    status: DeploymentStatus::Failed,
                    error_message: Some("late duplicate".to_string()),
                    failure_kind: Some(FailureKind::Transient),
                },
                &None,
            )
            .await
            .unwrap();

        let observed = deployment_service
            .get_by_id(&deployment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(observed.status, DeploymentStatus::Completed);
        assert_eq!(observed.progress_percent, 100);
    }

    #[tokio::test]
    async fn test_rollout_status_aggregation() {
        let deployment_service =
            create_deployment_service_fixture(&["target-1", "target-2", "target-3"]).await;
        let version = released_version(&deployment_service).await;

        let deployments = deployment_service
            .deploy_to_fleet(&version.id, &None)
            .await
            .unwrap();
        let deployment_ids: Vec<String> = deployments
            .iter()
            .map(|deployment| deployment.id.clone())
            .collect();

        let status = deployment_service
            .rollout_status(&deployment_ids)
            .await
            .unwrap();
        assert_eq!(status.status, RolloutStatus::InProgress);
        assert_eq!(status.total, 3);
        assert_eq!(status.active, 3);

        for deployment_id in &deployment_ids[..2] {
            deployment_service
                .report_terminal(
                    DeploymentTerminalMessage {
                        deployment_id: deployment_id.clone(),
                        status: DeploymentStatus::Completed,
                        error_message: None,
                        failure_kind: None,
                    },
                    &None,
                )
                .await
                .unwrap();
        }

        deployment_service
            .report_terminal(
                DeploymentTerminalMessage {
                    deployment_id: deployment_ids[2].clone(),
                    status: DeploymentStatus::Failed,
                    error_message: Some("checksum mismatch".to_string()),
                    failure_kind: Some(FailureKind::Permanent),
                },
                &None,
            )
            .await
            .unwrap();

        let status = deployment_service
            .rollout_status(&deployment_ids)
            .await
            .unwrap();
        assert_eq!(status.status, RolloutStatus::PartiallyFailed);
        assert_eq!(status.completed, 2);
        assert_eq!(status.failed, 1);
        assert_eq!(status.active, 0);
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep, Instant};

use modelfleet_core::{
    DeploymentStatus, DeploymentTerminalMessage, FailureKind, InstallAgent, VersionStatus,
};

use crate::{
    config::RolloutConfig,
    models::Deployment,
    services::{DeploymentService, ModelVersionService},
};

// Drives all active deployments: dispatches pending installs under a
// fleet-wide concurrency cap and requeues transient failures with backoff.
// Install permits are held from dispatch until the edge target's terminal
// callback is observed.
#[derive(Debug)]
pub struct RolloutProcessor {
    pub deployment_service: Arc<DeploymentService>,
    pub model_version_service: Arc<ModelVersionService>,
    pub install_agent: Arc<dyn InstallAgent>,
    pub config: RolloutConfig,

    semaphore: Arc<Semaphore>,
    in_flight: Mutex<HashMap<String, InFlightInstall>>,
    backoff_until: Mutex<HashMap<String, Instant>>,
}

// sequence is the row sequence at dispatch time: a pending deployment whose
// sequence moved was requeued behind our back and the old attempt is over
#[derive(Debug)]
struct InFlightInstall {
    sequence: i64,
    _permit: OwnedSemaphorePermit,
}

impl RolloutProcessor {
    pub fn new(
        deployment_service: Arc<DeploymentService>,
        model_version_service: Arc<ModelVersionService>,
        install_agent: Arc<dyn InstallAgent>,
        config: RolloutConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_installs));

        Self {
            deployment_service,
            model_version_service,
            install_agent,
            config,
            semaphore,
            in_flight: Mutex::new(HashMap::new()),
            backoff_until: Mutex::new(HashMap::new()),
        }
    }

    pub async fn run(&self) {
        loop {
            if let Err(error) = self.tick().await {
                tracing::error!("rollout tick failed: {}", error);
            }

            sleep(self.config.rollout_tick).await;
        }
    }

    #[tracing::instrument(name = "processor::rollout::tick", skip(self))]
    pub async fn tick(&self) -> anyhow::Result<()> {
        self.release_finished().await?;
        self.schedule_automatic_retries().await?;
        self.requeue_elapsed_backoffs().await?;
        self.dispatch_pending().await?;

        Ok(())
    }

    // drop the install permit of every in-flight deployment whose attempt
    // ended since the last tick: terminal status, or requeued to pending
    // (manual retry between ticks) with a new sequence
    async fn release_finished(&self) -> anyhow::Result<()> {
        let tracked_installs: Vec<(String, i64)> = self
            .in_flight_locked()?
            .iter()
            .map(|(deployment_id, install)| (deployment_id.clone(), install.sequence))
            .collect();

        for (deployment_id, dispatched_sequence) in tracked_installs {
            let deployment = self.deployment_service.get_by_id(&deployment_id).await?;

            let finished = match &deployment {
                Some(deployment) => {
                    !deployment.is_active()
                        || (deployment.status == DeploymentStatus::Pending
                            && deployment.sequence != dispatched_sequence)
                }
                None => true,
            };

            if finished {
                self.in_flight_locked()?.remove(&deployment_id);
            }
        }

        Ok(())
    }

    async fn schedule_automatic_retries(&self) -> anyhow::Result<()> {
        let failed_deployments = self
            .deployment_service
            .get_by_status(DeploymentStatus::Failed)
            .await?;

        for deployment in failed_deployments {
            if deployment.failure_kind != Some(FailureKind::Transient) {
                continue;
            }

            if deployment.retry_count >= self.config.auto_retry_limit {
                continue;
            }

            let mut backoffs = self.backoff_locked()?;
            if backoffs.contains_key(&deployment.id) {
                continue;
            }

            let backoff_index = deployment.retry_count.max(0) as usize;
            let delay = self
                .config
                .auto_retry_backoff
                .get(backoff_index)
                .or_else(|| self.config.auto_retry_backoff.last())
                .copied()
                .unwrap_or(Duration::ZERO);

            backoffs.insert(deployment.id.clone(), Instant::now() + delay);

            tracing::info!(
                "deployment {} failed transiently, automatic retry {} in {:?}",
                deployment.id,
                deployment.retry_count + 1,
                delay
            );
        }

        Ok(())
    }

    async fn requeue_elapsed_backoffs(&self) -> anyhow::Result<()> {
        let now = Instant::now();
        let elapsed_ids: Vec<String> = self
            .backoff_locked()?
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(deployment_id, _)| deployment_id.clone())
            .collect();

        for deployment_id in elapsed_ids {
            self.backoff_locked()?.remove(&deployment_id);

            match self
                .deployment_service
                .requeue_transient(&deployment_id, &None)
                .await
            {
                Ok(Some(deployment)) => {
                    tracing::info!(
                        "deployment {} automatically requeued (retry {})",
                        deployment.id,
                        deployment.retry_count
                    );
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::error!(
                        "automatic requeue of deployment {} failed: {}",
                        deployment_id,
                        error
                    );
                }
            }
        }

        Ok(())
    }

    async fn dispatch_pending(&self) -> anyhow::Result<()> {
        let mut pending_deployments = self
            .deployment_service
            .get_by_status(DeploymentStatus::Pending)
            .await?;
        pending_deployments.sort_by(|left, right| left.scheduled_at.cmp(&right.scheduled_at));

        for deployment in pending_deployments {
            if self.in_flight_locked()?.contains_key(&deployment.id) {
                continue;
            }

            let permit = match Arc::clone(&self.semaphore).try_acquire_owned() {
                Ok(permit) => permit,
                // fleet-wide install capacity exhausted, try again next tick
                Err(_) => break,
            };

            if self.begin_install(&deployment).await? {
                self.in_flight_locked()?.insert(
                    deployment.id.clone(),
                    InFlightInstall {
                        sequence: deployment.sequence,
                        _permit: permit,
                    },
                );
            }
        }

        Ok(())
    }

    // true when the install command was handed to the edge agent and the
    // permit must be held until the terminal callback
    async fn begin_install(&self, deployment: &Deployment) -> anyhow::Result<bool> {
        let version = self
            .model_version_service
            .get_by_id(&deployment.model_version_id)
            .await?;

        let version = match version {
            Some(version) => version,
            None => {
                self.fail_deployment(
                    deployment,
                    "model version no longer exists",
                    FailureKind::Permanent,
                )
                .await?;
                return Ok(false);
            }
        };

        // re-checked at dispatch time: a version deprecated after scheduling
        // must not reach the fleet
        if version.status != VersionStatus::Released {
            self.fail_deployment(
                deployment,
                &format!(
                    "model version {} is {}, not released",
                    version.id, version.status
                ),
                FailureKind::Permanent,
            )
            .await?;
            return Ok(false);
        }

        let model_file_url = match &version.model_file_url {
            Some(model_file_url) => model_file_url.clone(),
            None => {
                self.fail_deployment(
                    deployment,
                    &format!("model version {} has no artifact", version.id),
                    FailureKind::Permanent,
                )
                .await?;
                return Ok(false);
            }
        };

        match self
            .install_agent
            .begin_install(&deployment.clone().into(), &model_file_url)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    "install of version {} dispatched to target {} (deployment {})",
                    version.id,
                    deployment.target_id,
                    deployment.id
                );
                Ok(true)
            }
            Err(error) => {
                // unreachable target: transient, handled by the automatic
                // retry path
                self.fail_deployment(
                    deployment,
                    &format!("install dispatch failed: {}", error),
                    FailureKind::Transient,
                )
                .await?;
                Ok(false)
            }
        }
    }

    async fn fail_deployment(
        &self,
        deployment: &Deployment,
        message: &str,
        failure_kind: FailureKind,
    ) -> anyhow::Result<()> {
        tracing::warn!("deployment {} failed: {}", deployment.id, message);

        self.deployment_service
            .report_terminal(
                DeploymentTerminalMessage {
                    deployment_id: deployment.id.clone(),
                    status: DeploymentStatus::Failed,
                    error_message: Some(message.to_string()),
                    failure_kind: Some(failure_kind),
                },
                &None,
            )
            .await?;

        Ok(())
    }

    fn in_flight_locked(&self) -> anyhow::Result<MutexGuard<HashMap<String, InFlightInstall>>> {
        match self.in_flight.lock() {
            Ok(locked_in_flight) => Ok(locked_in_flight),
            Err(_) => Err(anyhow::anyhow!("failed to acquire lock")),
        }
    }

    fn backoff_locked(&self) -> anyhow::Result<MutexGuard<HashMap<String, Instant>>> {
        match self.backoff_until.lock() {
            Ok(locked_backoffs) => Ok(locked_backoffs),
            Err(_) => Err(anyhow::anyhow!("failed to acquire lock")),
        }
    }
}

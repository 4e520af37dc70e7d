use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};

use modelfleet_core::OrchestratorError;

use crate::services::{
    DeploymentService, EdgeTargetService, ModelVersionService, TrainingJobService,
};

mod deployments;
mod jobs;
mod models;
mod targets;

#[derive(Debug)]
pub struct ApiContext {
    pub job_service: Arc<TrainingJobService>,
    pub model_version_service: Arc<ModelVersionService>,
    pub deployment_service: Arc<DeploymentService>,
    pub target_service: Arc<EdgeTargetService>,
}

pub fn api_router(context: Arc<ApiContext>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/training/jobs", post(jobs::submit).get(jobs::list))
        .route("/api/v1/training/jobs/:id", get(jobs::get_by_id))
        .route("/api/v1/training/jobs/:id/cancel", post(jobs::cancel))
        .route("/api/v1/training/jobs/:id/annotate", post(jobs::annotate))
        .route("/api/v1/training/jobs/:id/progress", post(jobs::report_progress))
        .route("/api/v1/training/jobs/:id/complete", post(jobs::report_terminal))
        .route(
            "/api/v1/training/models",
            post(models::register).get(models::list),
        )
        .route(
            "/api/v1/training/models/:id",
            get(models::get_by_id).put(models::update_metadata),
        )
        .route("/api/v1/training/models/:id/testing", post(models::mark_testing))
        .route("/api/v1/training/models/:id/approve", post(models::approve))
        .route("/api/v1/training/models/:id/release", post(models::release))
        .route("/api/v1/training/models/:id/deprecate", post(models::deprecate))
        .route(
            "/api/v1/training/models/:id/deployments",
            get(deployments::list_for_version),
        )
        .route(
            "/api/v1/training/models/:id/deploy",
            post(deployments::deploy_to_target),
        )
        .route(
            "/api/v1/training/models/:id/deploy-all",
            post(deployments::deploy_to_fleet),
        )
        .route(
            "/api/v1/training/deployments/:id/retry",
            post(deployments::retry),
        )
        .route(
            "/api/v1/training/deployments/:id/progress",
            post(deployments::report_progress),
        )
        .route(
            "/api/v1/training/deployments/:id/complete",
            post(deployments::report_terminal),
        )
        .route(
            "/api/v1/training/rollouts/status",
            post(deployments::rollout_status),
        )
        .route("/api/v1/targets", get(targets::list))
        .route("/api/v1/targets/:id", put(targets::upsert))
        .layer(Extension(context))
}

#[tracing::instrument(name = "api::health")]
async fn health() -> Html<&'static str> {
    Html("ok")
}

#[derive(Debug)]
pub struct ApiError(OrchestratorError);

impl From<OrchestratorError> for ApiError {
    fn from(error: OrchestratorError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            OrchestratorError::Validation(_) => StatusCode::BAD_REQUEST,
            OrchestratorError::NotFound(_) => StatusCode::NOT_FOUND,
            OrchestratorError::InvalidState(_)
            | OrchestratorError::AlreadyDeploying(_)
            | OrchestratorError::RetryLimitExceeded(_) => StatusCode::CONFLICT,
            OrchestratorError::PrecursorNotReady(_) | OrchestratorError::NotReleased(_) => {
                StatusCode::PRECONDITION_FAILED
            }
            OrchestratorError::TransientInfra(_) => StatusCode::SERVICE_UNAVAILABLE,
            OrchestratorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error serving request: {}", self.0);
        }

        let body = Json(serde_json::json!({
            "code": self.0.code(),
            "message": self.0.to_string(),
        }));

        (status, body).into_response()
    }
}

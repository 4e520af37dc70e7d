use std::sync::Arc;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};

use modelfleet_core::{
    DeployRequest, DeploymentMessage, DeploymentProgressMessage, DeploymentTerminalMessage,
    RolloutStatusRequest, RolloutStatusResponse,
};

use super::{ApiContext, ApiError};

#[tracing::instrument(name = "api::deployments::deploy_to_target", skip(context))]
pub async fn deploy_to_target(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(version_id): Path<String>,
    Json(request): Json<DeployRequest>,
) -> Result<(StatusCode, Json<DeploymentMessage>), ApiError> {
    let deployment = context
        .deployment_service
        .deploy_to_target(&version_id, &request.target_id, &None)
        .await?;

    Ok((StatusCode::CREATED, Json(deployment.into())))
}

#[tracing::instrument(name = "api::deployments::deploy_to_fleet", skip(context))]
pub async fn deploy_to_fleet(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(version_id): Path<String>,
) -> Result<(StatusCode, Json<Vec<DeploymentMessage>>), ApiError> {
    let deployments = context
        .deployment_service
        .deploy_to_fleet(&version_id, &None)
        .await?;

    let deployment_messages = deployments.into_iter().map(Into::into).collect();

    Ok((StatusCode::CREATED, Json(deployment_messages)))
}

#[tracing::instrument(name = "api::deployments::list_for_version", skip(context))]
pub async fn list_for_version(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(version_id): Path<String>,
) -> Result<Json<Vec<DeploymentMessage>>, ApiError> {
    let deployments = context
        .deployment_service
        .get_by_model_version_id(&version_id)
        .await?;

    Ok(Json(deployments.into_iter().map(Into::into).collect()))
}

#[tracing::instrument(name = "api::deployments::retry", skip(context))]
pub async fn retry(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(deployment_id): Path<String>,
) -> Result<Json<DeploymentMessage>, ApiError> {
    let deployment = context
        .deployment_service
        .retry(&deployment_id, &None)
        .await?;

    Ok(Json(deployment.into()))
}

// edge install agent callback surface
#[tracing::instrument(name = "api::deployments::report_progress", skip(context))]
pub async fn report_progress(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(deployment_id): Path<String>,
    Json(mut message): Json<DeploymentProgressMessage>,
) -> Result<StatusCode, ApiError> {
    message.deployment_id = deployment_id;
    context
        .deployment_service
        .report_progress(message, &None)
        .await?;

    Ok(StatusCode::ACCEPTED)
}

#[tracing::instrument(name = "api::deployments::report_terminal", skip(context))]
pub async fn report_terminal(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(deployment_id): Path<String>,
    Json(mut message): Json<DeploymentTerminalMessage>,
) -> Result<StatusCode, ApiError> {
    message.deployment_id = deployment_id;
    context
        .deployment_service
        .report_terminal(message, &None)
        .await?;

    Ok(StatusCode::ACCEPTED)
}

#[tracing::instrument(name = "api::deployments::rollout_status", skip(context))]
pub async fn rollout_status(
    Extension(context): Extension<Arc<ApiContext>>,
    Json(request): Json<RolloutStatusRequest>,
) -> Result<Json<RolloutStatusResponse>, ApiError> {
    let status = context
        .deployment_service
        .rollout_status(&request.deployment_ids)
        .await?;

    Ok(Json(status))
}

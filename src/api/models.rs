use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use modelfleet_core::{
    ApproveVersionRequest, ModelVersionMessage, OrchestratorError, RegisterVersionRequest,
    ReleaseVersionRequest, UpdateVersionMetadataRequest, VersionStatus,
};

use super::{ApiContext, ApiError};

#[derive(Debug, Deserialize)]
pub struct ListVersionsQuery {
    pub ai_module: Option<String>,
    pub status: Option<VersionStatus>,
}

#[tracing::instrument(name = "api::models::register", skip(context))]
pub async fn register(
    Extension(context): Extension<Arc<ApiContext>>,
    Json(request): Json<RegisterVersionRequest>,
) -> Result<(StatusCode, Json<ModelVersionMessage>), ApiError> {
    let version = context
        .model_version_service
        .register(request, &None)
        .await?;

    Ok((StatusCode::CREATED, Json(version.into())))
}

#[tracing::instrument(name = "api::models::list", skip(context))]
pub async fn list(
    Extension(context): Extension<Arc<ApiContext>>,
    Query(query): Query<ListVersionsQuery>,
) -> Result<Json<Vec<ModelVersionMessage>>, ApiError> {
    let versions = match &query.ai_module {
        Some(ai_module) => context.model_version_service.get_by_module(ai_module).await?,
        None => context.model_version_service.list().await?,
    };

    let version_messages = versions
        .into_iter()
        .filter(|version| query.status.map_or(true, |status| version.status == status))
        .map(Into::into)
        .collect();

    Ok(Json(version_messages))
}

#[tracing::instrument(name = "api::models::get_by_id", skip(context))]
pub async fn get_by_id(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(version_id): Path<String>,
) -> Result<Json<ModelVersionMessage>, ApiError> {
    let version = context
        .model_version_service
        .get_by_id(&version_id)
        .await?
        .ok_or_else(|| {
            OrchestratorError::NotFound(format!("model version {} not found", version_id))
        })?;

    Ok(Json(version.into()))
}

#[tracing::instrument(name = "api::models::update_metadata", skip(context))]
pub async fn update_metadata(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(version_id): Path<String>,
    Json(request): Json<UpdateVersionMetadataRequest>,
) -> Result<Json<ModelVersionMessage>, ApiError> {
    let version = context
        .model_version_service
        .update_metadata(&version_id, request, &None)
        .await?;

    Ok(Json(version.into()))
}

#[tracing::instrument(name = "api::models::mark_testing", skip(context))]
pub async fn mark_testing(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(version_id): Path<String>,
) -> Result<Json<ModelVersionMessage>, ApiError> {
    let version = context
        .model_version_service
        .mark_testing(&version_id, &None)
        .await?;

    Ok(Json(version.into()))
}

#[tracing::instrument(name = "api::models::approve", skip(context))]
pub async fn approve(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(version_id): Path<String>,
    Json(request): Json<ApproveVersionRequest>,
) -> Result<Json<ModelVersionMessage>, ApiError> {
    let version = context
        .model_version_service
        .approve(&version_id, request, &None)
        .await?;

    Ok(Json(version.into()))
}

#[tracing::instrument(name = "api::models::release", skip(context))]
pub async fn release(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(version_id): Path<String>,
    Json(request): Json<ReleaseVersionRequest>,
) -> Result<Json<ModelVersionMessage>, ApiError> {
    let version = context
        .model_version_service
        .release(&version_id, request, &None)
        .await?;

    Ok(Json(version.into()))
}

#[tracing::instrument(name = "api::models::deprecate", skip(context))]
pub async fn deprecate(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(version_id): Path<String>,
) -> Result<Json<ModelVersionMessage>, ApiError> {
    let version = context
        .model_version_service
        .deprecate(&version_id, &None)
        .await?;

    Ok(Json(version.into()))
}

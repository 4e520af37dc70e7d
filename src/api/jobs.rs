use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use modelfleet_core::{
    AnnotateJobRequest, JobProgressMessage, JobStatus, JobTerminalMessage, SubmitJobRequest,
    TrainingJobMessage,
};

use super::{ApiContext, ApiError};

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub organization_id: Option<String>,
    pub status: Option<JobStatus>,
    pub ai_module: Option<String>,
}

#[tracing::instrument(name = "api::jobs::submit", skip(context))]
pub async fn submit(
    Extension(context): Extension<Arc<ApiContext>>,
    Json(request): Json<SubmitJobRequest>,
) -> Result<(StatusCode, Json<TrainingJobMessage>), ApiError> {
    let job = context.job_service.submit(request, &None).await?;

    Ok((StatusCode::CREATED, Json(job.into())))
}

#[tracing::instrument(name = "api::jobs::list", skip(context))]
pub async fn list(
    Extension(context): Extension<Arc<ApiContext>>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<Vec<TrainingJobMessage>>, ApiError> {
    let jobs = match &query.organization_id {
        Some(organization_id) => {
            context
                .job_service
                .get_by_organization_id(organization_id)
                .await?
        }
        None => context.job_service.list().await?,
    };

    let job_messages = jobs
        .into_iter()
        .filter(|job| query.status.map_or(true, |status| job.status == status))
        .filter(|job| {
            query
                .ai_module
                .as_ref()
                .map_or(true, |ai_module| &job.ai_module == ai_module)
        })
        .map(Into::into)
        .collect();

    Ok(Json(job_messages))
}

#[tracing::instrument(name = "api::jobs::get_by_id", skip(context))]
pub async fn get_by_id(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(job_id): Path<String>,
) -> Result<Json<TrainingJobMessage>, ApiError> {
    let job = context
        .job_service
        .get_by_id(&job_id)
        .await?
        .ok_or_else(|| {
            modelfleet_core::OrchestratorError::NotFound(format!(
                "training job {} not found",
                job_id
            ))
        })?;

    Ok(Json(job.into()))
}

#[tracing::instrument(name = "api::jobs::cancel", skip(context))]
pub async fn cancel(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(job_id): Path<String>,
) -> Result<Json<TrainingJobMessage>, ApiError> {
    let job = context.job_service.cancel(&job_id, &None).await?;

    Ok(Json(job.into()))
}

#[tracing::instrument(name = "api::jobs::annotate", skip(context))]
pub async fn annotate(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(job_id): Path<String>,
    Json(request): Json<AnnotateJobRequest>,
) -> Result<Json<TrainingJobMessage>, ApiError> {
    let job = context
        .job_service
        .annotate(&job_id, &request.key, request.value, &None)
        .await?;

    Ok(Json(job.into()))
}

// training executor callback surface
#[tracing::instrument(name = "api::jobs::report_progress", skip(context))]
pub async fn report_progress(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(job_id): Path<String>,
    Json(mut message): Json<JobProgressMessage>,
) -> Result<StatusCode, ApiError> {
    message.job_id = job_id;
    context.job_service.report_progress(message, &None).await?;

    Ok(StatusCode::ACCEPTED)
}

#[tracing::instrument(name = "api::jobs::report_terminal", skip(context))]
pub async fn report_terminal(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(job_id): Path<String>,
    Json(mut message): Json<JobTerminalMessage>,
) -> Result<StatusCode, ApiError> {
    message.job_id = job_id;
    context.job_service.report_terminal(message, &None).await?;

    Ok(StatusCode::ACCEPTED)
}

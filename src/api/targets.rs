use std::sync::Arc;

use axum::extract::Path;
use axum::{Extension, Json};
use chrono::Utc;

use modelfleet_core::{EdgeTargetMessage, UpsertTargetRequest};

use crate::models::EdgeTarget;

use super::{ApiContext, ApiError};

// fleet registry sync surface
#[tracing::instrument(name = "api::targets::upsert", skip(context))]
pub async fn upsert(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(target_id): Path<String>,
    Json(request): Json<UpsertTargetRequest>,
) -> Result<Json<EdgeTargetMessage>, ApiError> {
    let target = EdgeTarget {
        id: target_id,
        name: request.name,
        labels: request.labels,
        edge_version: request.edge_version,
        created_at: Utc::now(),
        sequence: 0,
    };

    let stored_target = context.target_service.upsert(&target, &None).await?;

    Ok(Json(stored_target.into()))
}

#[tracing::instrument(name = "api::targets::list", skip(context))]
pub async fn list(
    Extension(context): Extension<Arc<ApiContext>>,
) -> Result<Json<Vec<EdgeTargetMessage>>, ApiError> {
    let targets = context.target_service.list().await?;

    Ok(Json(targets.into_iter().map(Into::into).collect()))
}

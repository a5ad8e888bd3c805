//! Listing handlers. Reads are public; writes sit behind the admin layer.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use propdb_core::{Property, PropertyPage, PropertySubmission, PropertyUpdate, RawListQuery};
use serde::Serialize;

use crate::middleware::{Caller, RequestId};

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct DeletedProperty {
    id: String,
    deleted: bool,
}

/// GET /api/v1/properties
pub(super) async fn list_properties(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(raw): Query<RawListQuery>,
) -> Result<Json<ApiResponse<PropertyPage>>, ApiError> {
    let query = raw
        .normalize()
        .map_err(|errors| ApiError::validation(req_id.0.clone(), errors))?;
    let limit = normalize_limit(query.limit);
    let offset = query.cursor.unwrap_or(0);

    let page = propdb_db::list_properties(&state.pool, &query.criteria, query.sort, offset, limit)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::debug!(
        returned = page.items.len(),
        offset,
        limit,
        sort = query.sort.as_str(),
        "listed properties"
    );
    Ok(ApiResponse::new(req_id.0, page))
}

/// GET /api/v1/properties/{id}
pub(super) async fn get_property(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Property>>, ApiError> {
    let property = propdb_db::get_property(&state.pool, &id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(req_id.0, property))
}

/// POST /api/v1/properties
pub(super) async fn create_property(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<PropertySubmission>,
) -> Result<(StatusCode, Json<ApiResponse<Property>>), ApiError> {
    let new = body
        .validate()
        .map_err(|errors| ApiError::validation(req_id.0.clone(), errors))?;

    let property = propdb_db::create_property(&state.pool, &new)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(id = %property.id, user_id = %caller.0.id, "property created");
    Ok((StatusCode::CREATED, ApiResponse::new(req_id.0, property)))
}

/// PATCH /api/v1/properties/{id}
pub(super) async fn update_property(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(body): Json<PropertyUpdate>,
) -> Result<Json<ApiResponse<Property>>, ApiError> {
    let changes = body
        .validate()
        .map_err(|errors| ApiError::validation(req_id.0.clone(), errors))?;

    let property = propdb_db::update_property(&state.pool, &id, &changes)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(id = %property.id, user_id = %caller.0.id, "property updated");
    Ok(ApiResponse::new(req_id.0, property))
}

/// DELETE /api/v1/properties/{id}
pub(super) async fn delete_property(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeletedProperty>>, ApiError> {
    propdb_db::delete_property(&state.pool, &id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(id = %id, user_id = %caller.0.id, "property deleted");
    Ok(ApiResponse::new(
        req_id.0,
        DeletedProperty { id, deleted: true },
    ))
}

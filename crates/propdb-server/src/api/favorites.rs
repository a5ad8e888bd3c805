use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;

use crate::middleware::{Caller, RequestId};

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct FavoriteState {
    property_id: String,
    favorited: bool,
}

/// GET /api/v1/favorites
///
/// The caller's favorite property ids, newest first.
pub(super) async fn list_favorites(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let ids = propdb_db::list_favorite_ids(&state.pool, &caller.0.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(req_id.0, ids))
}

/// PUT /api/v1/favorites/{id}, idempotent.
pub(super) async fn add_favorite(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(caller): Extension<Caller>,
    Path(property_id): Path<String>,
) -> Result<Json<ApiResponse<FavoriteState>>, ApiError> {
    propdb_db::add_favorite(&state.pool, &caller.0.id, &property_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        req_id.0,
        FavoriteState {
            property_id,
            favorited: true,
        },
    ))
}

/// DELETE /api/v1/favorites/{id}, idempotent.
pub(super) async fn remove_favorite(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(caller): Extension<Caller>,
    Path(property_id): Path<String>,
) -> Result<Json<ApiResponse<FavoriteState>>, ApiError> {
    let removed = propdb_db::remove_favorite(&state.pool, &caller.0.id, &property_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    if !removed {
        tracing::debug!(property_id = %property_id, "favorite was not set");
    }

    Ok(ApiResponse::new(
        req_id.0,
        FavoriteState {
            property_id,
            favorited: false,
        },
    ))
}

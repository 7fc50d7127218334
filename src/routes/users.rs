use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::Json;

use crate::db;
use crate::error::AppResult;
use crate::extractors::ApiKey;
use crate::gateway;
use crate::identity;
use crate::routes::responses::{GetUserResponse, SimpleResult};
use crate::state::AppState;

/// GET /api/users/me
pub async fn me(
    State(state): State<AppState>,
    ApiKey(key): ApiKey,
) -> AppResult<Json<GetUserResponse>> {
    let user = db::read_transaction(&state.db, |tx| identity::resolve(tx, &key))?;
    Ok(Json(GetUserResponse { result: true, user }))
}

/// GET /api/users/{id}
pub async fn profile(
    State(state): State<AppState>,
    ApiKey(key): ApiKey,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<GetUserResponse>> {
    let Path(user_id) = path?;
    let user = db::read_transaction(&state.db, |tx| {
        identity::resolve(tx, &key)?;
        identity::resolve_by_id(tx, user_id)
    })?;
    Ok(Json(GetUserResponse { result: true, user }))
}

/// POST /api/users/{id}/follow
pub async fn follow(
    State(state): State<AppState>,
    ApiKey(key): ApiKey,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<SimpleResult>> {
    let Path(target_id) = path?;
    db::transaction(&state.db, |tx| {
        let user = identity::resolve(tx, &key)?;
        gateway::follow(tx, &user, target_id)
    })?;
    Ok(Json(SimpleResult::ok()))
}

/// DELETE /api/users/{id}/follow
pub async fn unfollow(
    State(state): State<AppState>,
    ApiKey(key): ApiKey,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<SimpleResult>> {
    let Path(target_id) = path?;
    db::transaction(&state.db, |tx| {
        let user = identity::resolve(tx, &key)?;
        gateway::unfollow(tx, &user, target_id)
    })?;
    Ok(Json(SimpleResult::ok()))
}

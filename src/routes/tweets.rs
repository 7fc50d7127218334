use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;

use crate::db;
use crate::error::AppResult;
use crate::extractors::ApiKey;
use crate::feed;
use crate::gateway;
use crate::identity;
use crate::routes::responses::{
    GetTweetsResponse, PostTweetRequest, PostTweetResponse, SimpleResult,
};
use crate::state::AppState;

/// GET /api/tweets
pub async fn list(
    State(state): State<AppState>,
    ApiKey(key): ApiKey,
) -> AppResult<Json<GetTweetsResponse>> {
    let order = state.config.feed.order;
    let tweets = db::read_transaction(&state.db, |tx| {
        let user = identity::resolve(tx, &key)?;
        feed::assemble_feed(tx, &user, order)
    })?;
    Ok(Json(GetTweetsResponse {
        result: true,
        tweets,
    }))
}

/// POST /api/tweets
pub async fn create(
    State(state): State<AppState>,
    ApiKey(key): ApiKey,
    body: Result<Json<PostTweetRequest>, JsonRejection>,
) -> AppResult<Json<PostTweetResponse>> {
    let Json(req) = body?;
    let media_ids = req.tweet_media_ids.unwrap_or_default();
    let tweet_id = db::transaction(&state.db, |tx| {
        let user = identity::resolve(tx, &key)?;
        gateway::post_tweet(tx, &user, &req.tweet_data, &media_ids)
    })?;
    Ok(Json(PostTweetResponse {
        result: true,
        tweet_id,
    }))
}

/// DELETE /api/tweets/{id}
pub async fn remove(
    State(state): State<AppState>,
    ApiKey(key): ApiKey,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<SimpleResult>> {
    let Path(tweet_id) = path?;
    let cleanup = state.blob_cleanup();
    db::transaction(&state.db, |tx| {
        let user = identity::resolve(tx, &key)?;
        gateway::delete_tweet(tx, state.blobs.as_ref(), cleanup, &user, tweet_id)
    })?;
    Ok(Json(SimpleResult::ok()))
}

/// POST /api/tweets/{id}/likes
pub async fn like(
    State(state): State<AppState>,
    ApiKey(key): ApiKey,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<SimpleResult>> {
    let Path(tweet_id) = path?;
    db::transaction(&state.db, |tx| {
        let user = identity::resolve(tx, &key)?;
        gateway::set_like(tx, &user, tweet_id)
    })?;
    Ok(Json(SimpleResult::ok()))
}

/// DELETE /api/tweets/{id}/likes
pub async fn unlike(
    State(state): State<AppState>,
    ApiKey(key): ApiKey,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<SimpleResult>> {
    let Path(tweet_id) = path?;
    db::transaction(&state.db, |tx| {
        let user = identity::resolve(tx, &key)?;
        gateway::unset_like(tx, &user, tweet_id)
    })?;
    Ok(Json(SimpleResult::ok()))
}

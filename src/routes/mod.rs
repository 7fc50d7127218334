pub mod media;
pub mod responses;
pub mod tweets;
pub mod users;

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use responses::HealthResponse;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);
    let body_limit = state.config.media.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/api/users/me", get(users::me))
        .route("/api/users/{id}", get(users::profile))
        .route(
            "/api/users/{id}/follow",
            post(users::follow).delete(users::unfollow),
        )
        .route("/api/tweets", get(tweets::list).post(tweets::create))
        .route("/api/tweets/{id}", delete(tweets::remove))
        .route(
            "/api/tweets/{id}/likes",
            post(tweets::like).delete(tweets::unlike),
        )
        .route("/api/medias", post(media::upload))
        .route("/media/{link}", get(media::serve))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

use axum::extract::rejection::PathRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::db;
use crate::error::{AppError, AppResult};
use crate::extractors::ApiKey;
use crate::gateway;
use crate::identity;
use crate::media;
use crate::routes::responses::PostMediaResponse;
use crate::state::AppState;

/// POST /api/medias
///
/// Expects a multipart form with the upload in a field named `file`.
pub async fn upload(
    State(state): State<AppState>,
    ApiKey(key): ApiKey,
    mut multipart: Multipart,
) -> AppResult<Json<PostMediaResponse>> {
    // Reject unknown keys before reading the body.
    db::read_transaction(&state.db, |tx| identity::resolve(tx, &key))?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let file_name = field.file_name().map(str::to_string);
            let data = field.bytes().await?;
            upload = Some((file_name, data));
            break;
        }
    }
    let (file_name, data) =
        upload.ok_or_else(|| AppError::BadRequest("Missing 'file' field".into()))?;

    let media_id = gateway::upload_media(
        &state.db,
        state.blobs.as_ref(),
        &key,
        file_name.as_deref(),
        &data,
    )?;

    Ok(Json(PostMediaResponse {
        result: true,
        media_id,
    }))
}

/// GET /media/{link}
pub async fn serve(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Response> {
    let Path(link) = path?;
    db::read_transaction(&state.db, |tx| media::find_by_link(tx, &link))?
        .ok_or_else(|| AppError::NotFound("Media not found".into()))?;
    let data = state.blobs.get(&link)?;

    let mime = mime_guess::from_path(&link).first_or_octet_stream();
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        data,
    )
        .into_response())
}

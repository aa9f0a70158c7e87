use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use time::{
    format_description::FormatItem, macros::format_description, OffsetDateTime, PrimitiveDateTime,
    UtcOffset,
};
use tracing::{debug, instrument};

use crate::{auth::extractors::AuthUser, error::AppError, state::AppState};

const HTTP_DATE: &[FormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub file_name: String,
}

pub fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/files", post(upload_file))
        .route("/files/:file_name", get(download_file))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

/// POST /files, raw request body
#[instrument(skip(state, headers, body))]
pub async fn upload_file(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadedFile>), AppError> {
    let declared = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let file_name = state.files.upload_file(body, declared).await?;
    debug!(%user_id, %file_name, "upload stored");
    Ok((StatusCode::CREATED, Json(UploadedFile { file_name })))
}

#[instrument(skip(state, headers))]
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(since) = if_modified_since(&headers) {
        let modified = state.files.get_file_last_modified(&file_name).await?;
        // HTTP dates carry whole seconds only.
        if modified.unix_timestamp() <= since.unix_timestamp() {
            return Ok((
                StatusCode::NOT_MODIFIED,
                [(header::LAST_MODIFIED, http_date(modified)?)],
            )
                .into_response());
        }
    }

    let object = state.files.download_file(&file_name).await?;
    Ok((
        [
            (header::CONTENT_TYPE, object.content_type),
            (header::LAST_MODIFIED, http_date(object.last_modified)?),
        ],
        object.body,
    )
        .into_response())
}

fn if_modified_since(headers: &HeaderMap) -> Option<OffsetDateTime> {
    let raw = headers.get(header::IF_MODIFIED_SINCE)?.to_str().ok()?;
    parse_http_date(raw)
}

fn parse_http_date(raw: &str) -> Option<OffsetDateTime> {
    PrimitiveDateTime::parse(raw.trim(), HTTP_DATE)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

fn http_date(t: OffsetDateTime) -> Result<String, AppError> {
    Ok(t.to_offset(UtcOffset::UTC)
        .format(HTTP_DATE)
        .context("format http date")?)
}

use std::path::Path as FsPath;

use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::services::sanitize::{resolve_within, PathError};
use crate::state::AppState;

/// `GET /view_image/{session_id}/{pdf_base}/{filename}`, served inline.
pub async fn view_image_handler(
    State(state): State<AppState>,
    Path((session_id, pdf_base, filename)): Path<(String, String, String)>,
    request: Request,
) -> AppResult<Response> {
    let root = &state.config.output_dir;
    let path = resolve_within(root, &[&session_id, &pdf_base, "images", &filename])
        .map_err(|e| path_error(e, "Image"))?;

    info!(path = %path.display(), "Serving image");
    Ok(serve_file(&path, request).await)
}

/// `GET /download/{session_id}/{filename}`, served as an attachment.
pub async fn download_handler(
    State(state): State<AppState>,
    Path((session_id, filename)): Path<(String, String)>,
    request: Request,
) -> AppResult<Response> {
    let root = &state.config.output_dir;
    let path = resolve_within(root, &[&session_id, &filename]).map_err(|e| path_error(e, "File"))?;

    // safe segments are plain ASCII, so the header value is always valid
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| AppError::internal(format!("Invalid download name: {}", e)))?;

    info!(path = %path.display(), "Serving archive download");
    let mut response = serve_file(&path, request).await;
    if response.status().is_success() {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, disposition);
    }
    Ok(response)
}

/// Streams `path` with a guessed content type and range support.
async fn serve_file(path: &FsPath, request: Request) -> Response {
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.map(Body::new).into_response(),
        Err(never) => match never {},
    }
}

fn path_error(error: PathError, what: &'static str) -> AppError {
    match error {
        PathError::Unsafe => {
            warn!("Rejected unsafe path");
            AppError::InvalidPath
        }
        PathError::Missing => AppError::not_found(what),
    }
}

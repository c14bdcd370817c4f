/**
 * Image Routes
 * Serves processed renditions (with a fallback to original sources)
 */
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::{AppError, AppResult};
use crate::media::storage::{self, Resolution};
use crate::state::AppState;

const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

fn etag_for(relative: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("\"{relative}\"")).ok()
}

fn matches_etag(headers: &HeaderMap, etag: &HeaderValue) -> bool {
    headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| {
            v.split(',')
                .map(str::trim)
                .any(|candidate| candidate == "*" || candidate.as_bytes() == etag.as_bytes())
        })
}

fn cache_headers(etag: Option<HeaderValue>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'"),
    );
    if let Some(etag) = etag {
        headers.insert(header::ETAG, etag);
    }
    headers
}

/// GET /api/images/{*path}
pub async fn serve_image(
    State(state): State<AppState>,
    Path(requested): Path<String>,
    request_headers: HeaderMap,
) -> AppResult<Response> {
    let config = &state.config;
    let (path, relative) =
        match storage::resolve(&config.upload_dir, &config.originals_dir, &requested).await {
            Resolution::Found { path, relative } => (path, relative),
            Resolution::NotFound => return Err(AppError::not_found("Không tìm thấy ảnh")),
            Resolution::Forbidden => {
                tracing::warn!("Rejected image path: {}", requested);
                return Err(AppError::Forbidden("Đường dẫn không hợp lệ".to_string()));
            }
        };

    let etag = etag_for(&relative);
    if let Some(etag) = &etag {
        if matches_etag(&request_headers, etag) {
            return Ok((StatusCode::NOT_MODIFIED, cache_headers(Some(etag.clone()))).into_response());
        }
    }

    let data = tokio::fs::read(&path)
        .await
        .map_err(|e| AppError::internal("Không thể đọc ảnh", e))?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let mut headers = cache_headers(etag);
    if let Ok(content_type) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, content_type);
    }

    Ok((StatusCode::OK, headers, Body::from(data)).into_response())
}

/**
 * Tag Routes
 * Tag catalogue CRUD and count synchronisation
 */
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{
    self,
    models::Tag,
    tags::{self as store, SyncStats, TagFilter, TagInput, DEFAULT_LIST_LIMIT},
};
use crate::error::{AppError, AppResult};
use crate::routes::auth::AdminSession;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagListParams {
    pub limit: Option<String>,
    pub search: Option<String>,
    pub active_only: Option<String>,
}

impl From<TagListParams> for TagFilter {
    fn from(params: TagListParams) -> Self {
        let limit = params
            .limit
            .and_then(|l| l.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_LIST_LIMIT);
        Self {
            // 0 (or anything negative) lifts the limit
            limit: (limit > 0).then_some(limit),
            search: params.search,
            active_only: params.active_only.as_deref() != Some("false"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TagListResponse {
    pub tags: Vec<Tag>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub tag: Tag,
}

#[derive(Debug, Serialize)]
pub struct TagMutationResponse {
    pub message: String,
    pub tag: Tag,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub message: String,
    pub stats: SyncStats,
}

fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::validation("ID đặc điểm không hợp lệ"))
}

/// GET /api/tags
pub async fn list_tags(Query(params): Query<TagListParams>) -> AppResult<impl IntoResponse> {
    let filter = TagFilter::from(params);
    let pool = db::require_pool()?;
    let tags = store::list_tags(&pool, &filter).await?;
    Ok(Json(TagListResponse {
        total: tags.len(),
        tags,
    }))
}

/// POST /api/tags
pub async fn create_tag(
    _admin: AdminSession,
    Json(input): Json<TagInput>,
) -> AppResult<impl IntoResponse> {
    let pool = db::require_pool()?;
    let tag = store::create_tag(&pool, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(TagMutationResponse {
            message: "Tạo đặc điểm thành công".to_string(),
            tag,
        }),
    ))
}

/// GET /api/tags/{id}
pub async fn get_tag(Path(id): Path<String>) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let pool = db::require_pool()?;
    let tag = store::get_tag(&pool, id).await?;
    Ok(Json(TagResponse { tag }))
}

/// PUT /api/tags/{id}
pub async fn update_tag(
    _admin: AdminSession,
    Path(id): Path<String>,
    Json(input): Json<TagInput>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let pool = db::require_pool()?;
    let tag = store::update_tag(&pool, id, input).await?;
    Ok(Json(TagMutationResponse {
        message: "Cập nhật đặc điểm thành công".to_string(),
        tag,
    }))
}

/// DELETE /api/tags/{id}
pub async fn delete_tag(
    _admin: AdminSession,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let pool = db::require_pool()?;
    store::delete_tag(&pool, id).await?;
    Ok(Json(MessageResponse {
        message: "Xóa đặc điểm thành công".to_string(),
    }))
}

/// POST /api/tags/sync
pub async fn sync_tags(_admin: AdminSession) -> AppResult<impl IntoResponse> {
    let pool = db::require_pool()?;
    let stats = store::resync_all_tags(&pool).await?;
    Ok(Json(SyncResponse {
        message: "Sync tags thành công".to_string(),
        stats,
    }))
}

/// GET /api/tags/sync
pub async fn sync_status() -> AppResult<impl IntoResponse> {
    let pool = db::require_pool()?;
    let report = store::sync_report(&pool).await?;
    Ok(Json(report))
}

/**
 * Profile Routes
 * Public listing and detail, admin create/update/delete
 */
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::db::{
    self,
    models::Profile,
    profiles::{self as store, ProfileInput},
    query::{Pagination, ProfileListParams},
    tags,
};
use crate::error::AppResult;
use crate::media::storage;
use crate::routes::auth::AdminSession;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileListResponse {
    pub profiles: Vec<Profile>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: Profile,
}

#[derive(Debug, Serialize)]
pub struct ProfileMutationResponse {
    pub message: String,
    pub profile: Profile,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// GET /api/profiles
pub async fn list_profiles(
    admin: Option<AdminSession>,
    Query(params): Query<ProfileListParams>,
) -> AppResult<impl IntoResponse> {
    let (query, page) = params.into_query(admin.is_some())?;
    let pool = db::require_pool()?;

    let result = store::list_profiles(&pool, &query, &page).await?;
    Ok(Json(ProfileListResponse {
        profiles: result.items,
        pagination: Pagination::new(&page, result.total),
    }))
}

/// GET /api/profiles/{slug}
/// Drafts and archived profiles are visible to admins only.
pub async fn get_profile(
    admin: Option<AdminSession>,
    Path(slug): Path<String>,
) -> AppResult<impl IntoResponse> {
    let pool = db::require_pool()?;
    let profile = store::get_profile(&pool, &slug, admin.is_some()).await?;
    Ok(Json(ProfileResponse { profile }))
}

/// POST /api/profiles
pub async fn create_profile(
    _admin: AdminSession,
    Json(input): Json<ProfileInput>,
) -> AppResult<impl IntoResponse> {
    let pool = db::require_pool()?;
    let profile = store::create_profile(&pool, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProfileMutationResponse {
            message: "Hồ sơ đã được tạo thành công".to_string(),
            profile,
        }),
    ))
}

/// PUT /api/profiles/{slug}
pub async fn update_profile(
    _admin: AdminSession,
    Path(slug): Path<String>,
    Json(patch): Json<ProfileInput>,
) -> AppResult<impl IntoResponse> {
    let pool = db::require_pool()?;
    let profile = store::update_profile(&pool, &slug, patch).await?;
    Ok(Json(ProfileMutationResponse {
        message: "Hồ sơ đã được cập nhật thành công".to_string(),
        profile,
    }))
}

/// DELETE /api/profiles/{slug}
/// Renditions and tag counts are cleaned up after the row is gone; neither
/// failure undoes the delete.
pub async fn delete_profile(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(slug): Path<String>,
) -> AppResult<impl IntoResponse> {
    let pool = db::require_pool()?;
    let profile = store::delete_profile(&pool, &slug).await?;

    let mut removed = 0;
    for photo in profile.photos.iter() {
        if storage::is_safe_filename(&photo.base_filename) {
            removed += storage::delete_renditions(&state.config.upload_dir, &photo.base_filename).await;
        } else {
            tracing::warn!(slug = %profile.slug, file = %photo.base_filename, "skipping unsafe photo filename");
        }
    }
    tracing::debug!(slug = %profile.slug, removed, "profile renditions removed");

    if !profile.tags.is_empty() {
        tags::sync_tags_from_profile(&pool, &profile.tags).await;
    }

    Ok(Json(MessageResponse {
        message: "Hồ sơ đã được xóa thành công".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{admin_cookie, test_state};
    use axum::body::Body;
    use axum::http::{header, Request};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn profile_router(state: AppState) -> Router {
        Router::new()
            .route("/api/profiles", get(list_profiles).post(create_profile))
            .route(
                "/api/profiles/{slug}",
                get(get_profile).put(update_profile).delete(delete_profile),
            )
            .with_state(state)
    }

    fn json_request(method: &str, uri: &str, cookie: Option<String>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder
            .body(Body::from(r#"{"name":"Linh","age":22,"province":"Hà Nội","occupation":"Sinh viên"}"#))
            .unwrap()
    }

    #[tokio::test]
    async fn test_mutations_require_admin() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        for (method, uri) in [
            ("POST", "/api/profiles"),
            ("PUT", "/api/profiles/linh-22-tuoi-sinh-vien-ha-noi"),
            ("DELETE", "/api/profiles/linh-22-tuoi-sinh-vien-ha-noi"),
        ] {
            let res = profile_router(state.clone())
                .oneshot(json_request(method, uri, None))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn test_invalid_filters_rejected_before_database() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        for uri in [
            "/api/profiles?age=duoi-18",
            "/api/profiles?age=12-16",
            "/api/profiles?ageMin=abc",
        ] {
            let req = Request::get(uri).body(Body::empty()).unwrap();
            let res = profile_router(state.clone()).oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{uri}");
        }

        // Status filters are validated for admins
        let req = Request::get("/api/profiles?status=deleted")
            .header(header::COOKIE, admin_cookie(&state))
            .body(Body::empty())
            .unwrap();
        let res = profile_router(state).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_without_database_returns_service_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let req = Request::get("/api/profiles?age=18-22").body(Body::empty()).unwrap();
        let res = profile_router(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

        let res = profile_router(state.clone())
            .oneshot(json_request("POST", "/api/profiles", Some(admin_cookie(&state))))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

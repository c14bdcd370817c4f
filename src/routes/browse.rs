/**
 * Browse Routes
 * Resolves a listing URL (path + query) into filters, canonical URL,
 * breadcrumbs and the matching page of profiles
 */
use axum::{
    extract::{Path, RawQuery},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use url::form_urlencoded;

use crate::db::{
    self,
    models::Profile,
    profiles as store,
    query::{PageRequest, Pagination, ProfileQuery},
};
use crate::error::{AppError, AppResult};
use crate::filters::{Breadcrumb, FilterState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseResponse {
    pub filters: FilterState,
    pub canonical_url: String,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub profiles: Vec<Profile>,
    pub pagination: Pagination,
}

/// Filters and page for a browse request; no database access.
pub fn resolve_request(segments: &str, query: &str) -> AppResult<(FilterState, PageRequest)> {
    let filters =
        FilterState::from_url(segments, query).map_err(|e| AppError::validation(e.to_string()))?;

    let mut page = None;
    let mut limit = None;
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "page" => page = Some(value.into_owned()),
            "limit" => limit = Some(value.into_owned()),
            _ => {}
        }
    }

    Ok((filters, PageRequest::parse(page.as_deref(), limit.as_deref())))
}

async fn browse(segments: &str, query: Option<String>) -> AppResult<BrowseResponse> {
    let (filters, page) = resolve_request(segments, query.as_deref().unwrap_or_default())?;
    let pool = db::require_pool()?;

    let result = store::list_profiles(&pool, &ProfileQuery::published_from(&filters), &page).await?;

    Ok(BrowseResponse {
        canonical_url: filters.to_url(),
        breadcrumbs: filters.breadcrumbs(),
        filters,
        profiles: result.items,
        pagination: Pagination::new(&page, result.total),
    })
}

/// GET /api/browse
pub async fn browse_root(RawQuery(query): RawQuery) -> AppResult<impl IntoResponse> {
    Ok(Json(browse("", query).await?))
}

/// GET /api/browse/{*segments}
pub async fn browse_path(
    Path(segments): Path<String>,
    RawQuery(query): RawQuery,
) -> AppResult<impl IntoResponse> {
    Ok(Json(browse(&segments, query).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::AgeRange;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn browse_router() -> Router {
        Router::new()
            .route("/api/browse", get(browse_root))
            .route("/api/browse/{*segments}", get(browse_path))
    }

    #[test]
    fn test_resolve_request_reads_filters_and_page() {
        let (filters, page) =
            resolve_request("ha-noi", "occupation=sinh-vien&age=18-22&page=2&limit=500").unwrap();
        assert_eq!(filters.region.as_deref(), Some("Miền Bắc"));
        assert_eq!(filters.province.as_deref(), Some("Hà Nội"));
        assert_eq!(filters.occupation.as_deref(), Some("Sinh viên"));
        assert_eq!(filters.age_range, Some(AgeRange::Between { min: 18, max: 22 }));
        assert_eq!(page, PageRequest { page: 2, limit: 100 });
        assert_eq!(filters.to_url(), "/kham-pha/mien-bac/ha-noi?occupation=sinh-vien&age=18-22");
    }

    #[test]
    fn test_resolve_request_empty() {
        let (filters, page) = resolve_request("", "").unwrap();
        assert!(filters.is_empty());
        assert_eq!(page, PageRequest::default());
    }

    #[tokio::test]
    async fn test_invalid_age_is_bad_request() {
        let req = Request::get("/api/browse/mien-bac?age=duoi-18")
            .body(Body::empty())
            .unwrap();
        let res = browse_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_without_database_returns_service_unavailable() {
        for uri in ["/api/browse", "/api/browse/mien-nam/ho-chi-minh?tags=de-thuong"] {
            let req = Request::get(uri).body(Body::empty()).unwrap();
            let res = browse_router().oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE, "{uri}");
        }
    }
}

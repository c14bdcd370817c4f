/**
 * Occupation Routes
 */
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::db::profiles::distinct_published_occupations;
use crate::error::AppResult;
use crate::taxonomy::OCCUPATIONS;

#[derive(Debug, Serialize, Deserialize)]
pub struct OccupationsResponse {
    pub success: bool,
    pub occupations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Defaults plus `found`, deduplicated and sorted.
pub fn merge_occupations(found: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = OCCUPATIONS.iter().map(|o| o.to_string()).collect();
    merged.extend(found.into_iter().map(|o| o.trim().to_string()).filter(|o| !o.is_empty()));
    merged.sort();
    merged.dedup();
    merged
}

async fn load() -> AppResult<Vec<String>> {
    let pool = db::require_pool()?;
    distinct_published_occupations(&pool).await
}

/// GET /api/occupations
/// On failure the default list is still returned, with the error status.
pub async fn list_occupations() -> impl IntoResponse {
    match load().await {
        Ok(found) => (
            StatusCode::OK,
            Json(OccupationsResponse {
                success: true,
                occupations: merge_occupations(found),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("Failed to load occupations: {}", e);
            (
                e.status_code(),
                Json(OccupationsResponse {
                    success: false,
                    occupations: merge_occupations(Vec::new()),
                    error: Some("Không thể lấy danh sách nghề nghiệp".to_string()),
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::body_json;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[test]
    fn test_merge_dedups_and_sorts() {
        let merged = merge_occupations(vec![
            OCCUPATIONS[0].to_string(),
            " Thợ gốm ".to_string(),
            "".to_string(),
        ]);
        assert_eq!(merged.len(), OCCUPATIONS.len() + 1);
        assert!(merged.contains(&"Thợ gốm".to_string()));
        assert!(merged.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_without_database_still_lists_defaults() {
        let app = Router::new().route("/api/occupations", get(list_occupations));
        let req = Request::get("/api/occupations").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: OccupationsResponse = body_json(res).await;
        assert!(!body.success);
        assert_eq!(body.occupations.len(), merge_occupations(Vec::new()).len());
        assert!(body.error.is_some());
    }
}

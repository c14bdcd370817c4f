/**
 * Admin Authentication Routes
 * Password login that issues a signed JWT in an HttpOnly cookie
 */
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, State},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub const ADMIN_COOKIE: &str = "admin-token";
const ADMIN_SUBJECT: &str = "admin";

// ============================================================================
// Types
// ============================================================================

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct VerifyResponse {
    pub authenticated: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

// ============================================================================
// Tokens
// ============================================================================

pub fn create_token(config: &AppConfig) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: ADMIN_SUBJECT.to_string(),
        exp: (now + Duration::hours(config.session_ttl_hours)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// Verify signature and expiry, and that the token was issued for the admin.
pub fn verify_token(config: &AppConfig, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;
    if token_data.claims.sub != ADMIN_SUBJECT {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }
    Ok(token_data.claims)
}

fn session_cookie(config: &AppConfig, token: String) -> Cookie<'static> {
    Cookie::build((ADMIN_COOKIE, token))
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::hours(config.session_ttl_hours))
        .build()
}

/// Same attributes as the session cookie, empty and already expired.
fn expired_cookie(config: &AppConfig) -> Cookie<'static> {
    Cookie::build((ADMIN_COOKIE, ""))
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

// ============================================================================
// Extractor
// ============================================================================

/// Proof of a valid admin cookie. Rejects with 401 when used directly;
/// `Option<AdminSession>` never rejects.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub claims: Claims,
}

fn session_from_parts(parts: &Parts, config: &AppConfig) -> Option<AdminSession> {
    let jar = CookieJar::from_headers(&parts.headers);
    let token = jar.get(ADMIN_COOKIE)?.value().to_string();
    match verify_token(config, &token) {
        Ok(claims) => Some(AdminSession { claims }),
        Err(e) => {
            tracing::debug!("Rejected admin cookie: {}", e);
            None
        }
    }
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        session_from_parts(parts, &state.config)
            .ok_or_else(|| AppError::Unauthorized("Không có quyền truy cập".to_string()))
    }
}

impl OptionalFromRequestParts<AppState> for AdminSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(session_from_parts(parts, &state.config))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/admin/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    if payload.password.is_empty() {
        return Err(AppError::validation("Vui lòng nhập mật khẩu"));
    }

    // bcrypt is CPU-bound; keep it off the async executor.
    let hash = state.config.admin_password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify(&payload.password, &hash))
        .await
        .map_err(|e| AppError::internal("Có lỗi xảy ra", e))?
        .map_err(|e| AppError::internal("Có lỗi xảy ra", e))?;

    if !valid {
        tracing::warn!("Admin login failed: wrong password");
        return Err(AppError::Unauthorized("Mật khẩu không đúng".to_string()));
    }

    let token = create_token(&state.config).map_err(|e| AppError::internal("Có lỗi xảy ra", e))?;
    tracing::info!("Admin logged in");

    Ok((
        jar.add(session_cookie(&state.config, token)),
        Json(LoginResponse { success: true }),
    ))
}

/// GET /api/admin/verify
pub async fn verify_session(_session: AdminSession) -> impl IntoResponse {
    Json(VerifyResponse {
        authenticated: true,
    })
}

/// POST /api/admin/logout
/// Always succeeds; clears the cookie whether or not it was valid.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    (
        StatusCode::OK,
        jar.add(expired_cookie(&state.config)),
        Json(LogoutResponse { success: true }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use axum::routing::{get, post};
    use axum::Router;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState::new(AppConfig::for_dirs("uploads", "images"))
    }

    fn auth_router(state: AppState) -> Router {
        Router::new()
            .route("/api/admin/login", post(login))
            .route("/api/admin/verify", get(verify_session))
            .route("/api/admin/logout", post(logout))
            .with_state(state)
    }

    async fn post_login(app: Router, password: &str) -> axum::response::Response {
        let body = Body::from(
            serde_json::to_vec(&LoginRequest {
                password: password.to_string(),
            })
            .unwrap(),
        );
        let req = Request::post("/api/admin/login")
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        app.oneshot(req).await.unwrap()
    }

    fn cookie_header(res: &axum::response::Response) -> String {
        res.headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn test_verify_token_invalid_returns_err() {
        let state = test_state();
        assert!(verify_token(&state.config, "invalid.jwt.token").is_err());
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let state = test_state();
        let mut other = (*state.config).clone();
        other.jwt_secret = "another-secret".to_string();
        let token = create_token(&other).unwrap();
        assert!(verify_token(&state.config, &token).is_err());
        assert!(verify_token(&other, &token).is_ok());
    }

    #[tokio::test]
    async fn test_login_empty_password_returns_bad_request() {
        let res = post_login(auth_router(test_state()), "").await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_wrong_password_returns_unauthorized() {
        let res = post_login(auth_router(test_state()), "wrongpassword").await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(cookie_header(&res).is_empty());
    }

    #[tokio::test]
    async fn test_login_sets_cookie_accepted_by_verify() {
        let state = test_state();
        let res = post_login(auth_router(state.clone()), "admin123").await;
        assert_eq!(res.status(), StatusCode::OK);

        let set_cookie = cookie_header(&res);
        assert!(set_cookie.starts_with("admin-token="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));
        assert!(set_cookie.contains("Path=/"));
        assert!(set_cookie.contains("Max-Age=86400"));

        let pair = set_cookie.split(';').next().unwrap().to_string();
        let req = Request::get("/api/admin/verify")
            .header(header::COOKIE, pair)
            .body(Body::empty())
            .unwrap();
        let res = auth_router(state).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: VerifyResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(body.authenticated);
    }

    #[tokio::test]
    async fn test_verify_without_cookie_returns_unauthorized() {
        let req = Request::get("/api/admin/verify").body(Body::empty()).unwrap();
        let res = auth_router(test_state()).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let req = Request::get("/api/admin/verify")
            .header(header::COOKIE, "admin-token=authenticated")
            .body(Body::empty())
            .unwrap();
        let res = auth_router(test_state()).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let req = Request::post("/api/admin/logout").body(Body::empty()).unwrap();
        let res = auth_router(test_state()).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let set_cookie = cookie_header(&res);
        assert!(set_cookie.starts_with("admin-token=;"));
        assert!(set_cookie.contains("Max-Age=0"));
        assert!(set_cookie.contains("Path=/"));
    }

    #[tokio::test]
    async fn test_logout_with_session_expires_it() {
        let state = test_state();
        let token = create_token(&state.config).unwrap();
        let req = Request::post("/api/admin/logout")
            .header(header::COOKIE, format!("{ADMIN_COOKIE}={token}"))
            .body(Body::empty())
            .unwrap();
        let res = auth_router(state).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let cookies: Vec<_> = res.headers().get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies.len(), 1);
        let set_cookie = cookies[0].to_str().unwrap();
        assert!(set_cookie.starts_with("admin-token=;"));
        assert!(set_cookie.contains("Max-Age=0"));
    }
}

/**
 * Routes Module
 * API route handlers
 */

pub mod auth;
pub mod browse;
pub mod health;
pub mod images;
pub mod occupations;
pub mod profiles;
pub mod tags;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use axum::response::Response;
    use serde::de::DeserializeOwned;

    use super::auth::{create_token, ADMIN_COOKIE};
    use crate::config::AppConfig;
    use crate::state::AppState;

    /// State whose upload and originals directories both live under `dir`.
    pub fn test_state(dir: &Path) -> AppState {
        AppState::new(AppConfig::for_dirs(dir, dir.join("originals")))
    }

    /// `Cookie` header value carrying a valid admin session.
    pub fn admin_cookie(state: &AppState) -> String {
        format!("{}={}", ADMIN_COOKIE, create_token(&state.config).unwrap())
    }

    pub async fn body_json<T: DeserializeOwned>(res: Response) -> T {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}

//! Runtime configuration read from the environment (and `.env` via dotenvy).

use std::path::PathBuf;

use bcrypt::{hash, DEFAULT_COST};

pub const DEFAULT_JWT_SECRET: &str = "default-jwt-secret-change-in-production";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    /// Root of processed renditions, served under `/api/images`.
    pub upload_dir: PathBuf,
    /// Fallback directory for unprocessed source images.
    pub originals_dir: PathBuf,
    pub admin_password_hash: String,
    pub jwt_secret: String,
    pub cookie_secure: bool,
    pub session_ttl_hours: i64,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Self {
        let admin_password_hash = if let Ok(hashed) = std::env::var("ADMIN_PASSWORD_HASH") {
            hashed
        } else if let Ok(plain) = std::env::var("ADMIN_PASSWORD") {
            hash(&plain, DEFAULT_COST).unwrap_or_default()
        } else {
            tracing::warn!(
                "SECURITY: neither ADMIN_PASSWORD_HASH nor ADMIN_PASSWORD is set; \
                 falling back to the development password 'admin123'"
            );
            hash("admin123", DEFAULT_COST).unwrap_or_default()
        };

        Self {
            environment: env_or("ENVIRONMENT", "development"),
            host: env_or("HOST", "127.0.0.1"),
            port: env_parse("PORT", 3001),
            upload_dir: PathBuf::from(env_or("UPLOAD_DIR", "public/uploads/images")),
            originals_dir: PathBuf::from(env_or("ORIGINALS_DIR", "images")),
            admin_password_hash,
            jwt_secret: env_or("JWT_SECRET", DEFAULT_JWT_SECRET),
            cookie_secure: env_parse("COOKIE_SECURE", false),
            session_ttl_hours: env_parse("ADMIN_SESSION_HOURS", 24),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Startup check: production must not run with the built-in JWT secret.
    pub fn validate(&self) -> Result<(), String> {
        if self.is_production()
            && (self.jwt_secret.is_empty() || self.jwt_secret == DEFAULT_JWT_SECRET)
        {
            return Err(
                "JWT_SECRET must be set to a secure, unique value in production".to_string(),
            );
        }
        if self.admin_password_hash.is_empty() {
            return Err("admin password hash could not be prepared".to_string());
        }
        Ok(())
    }

    /// Config pointing at caller-provided directories, used by tests.
    pub fn for_dirs(upload_dir: impl Into<PathBuf>, originals_dir: impl Into<PathBuf>) -> Self {
        Self {
            environment: "test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            upload_dir: upload_dir.into(),
            originals_dir: originals_dir.into(),
            // bcrypt("admin123", cost 4)
            admin_password_hash: hash("admin123", 4).unwrap_or_default(),
            jwt_secret: "test-secret".to_string(),
            cookie_secure: false,
            session_ttl_hours: 24,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_rejects_default_secret() {
        let mut config = AppConfig::for_dirs("up", "orig");
        config.environment = "production".to_string();
        config.jwt_secret = DEFAULT_JWT_SECRET.to_string();
        assert!(config.validate().is_err());

        config.jwt_secret = "a-real-secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_development_allows_default_secret() {
        let mut config = AppConfig::for_dirs("up", "orig");
        config.jwt_secret = DEFAULT_JWT_SECRET.to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_test_config_hash_verifies() {
        let config = AppConfig::for_dirs("up", "orig");
        assert!(bcrypt::verify("admin123", &config.admin_password_hash).unwrap());
    }
}

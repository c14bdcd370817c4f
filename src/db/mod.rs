pub mod models;
pub mod profiles;
pub mod query;
pub mod tags;

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::{AppError, AppResult};

static DB_POOL: OnceCell<Arc<PgPool>> = OnceCell::const_new();

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/profile_directory".to_string()),
            max_connections: std::env::var("DB_POOL_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            min_connections: std::env::var("DB_POOL_MIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            connect_timeout_secs: std::env::var("DB_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            idle_timeout_secs: std::env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        }
    }
}

pub async fn init_pool(config: Option<DbConfig>) -> Result<Arc<PgPool>, sqlx::Error> {
    let config = config.unwrap_or_default();

    tracing::info!("Initializing database connection pool...");
    tracing::debug!(
        "Database URL: {}",
        config.url.replace(
            |c: char| !c.is_ascii_alphanumeric() && c != ':' && c != '/' && c != '@' && c != '.',
            "*"
        )
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(std::time::Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    tracing::info!("Database connection pool initialized successfully");

    let pool = Arc::new(pool);
    let _ = DB_POOL.set(pool.clone());

    Ok(pool)
}

pub fn get_pool() -> Option<Arc<PgPool>> {
    DB_POOL.get().cloned()
}

/// Pool or a 503 for handlers that cannot work without the database.
pub fn require_pool() -> AppResult<Arc<PgPool>> {
    get_pool().ok_or(AppError::DatabaseUnavailable)
}

pub async fn health_check() -> Result<std::time::Duration, sqlx::Error> {
    let pool = get_pool()
        .ok_or_else(|| sqlx::Error::Configuration("Database pool not initialized".into()))?;

    let start = std::time::Instant::now();
    sqlx::query("SELECT 1").fetch_one(pool.as_ref()).await?;

    Ok(start.elapsed())
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL,
            slug TEXT UNIQUE NOT NULL,
            age INTEGER NOT NULL CHECK (age BETWEEN 18 AND 100),
            height INTEGER,
            weight INTEGER,
            region TEXT NOT NULL,
            province TEXT NOT NULL,
            district TEXT,
            occupation TEXT NOT NULL,
            occupation_slug TEXT NOT NULL,
            description TEXT,
            tags TEXT[] NOT NULL DEFAULT '{}',
            tag_slugs TEXT[] NOT NULL DEFAULT '{}',
            photos JSONB NOT NULL DEFAULT '[]',
            is_featured BOOLEAN NOT NULL DEFAULT false,
            featured_score INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'published',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            published_at TIMESTAMPTZ
        )
    "#,
    )
    .execute(pool)
    .await?;

    // Several statements in one call need the simple query protocol.
    sqlx::raw_sql(
        r#"
        CREATE INDEX IF NOT EXISTS idx_profiles_status_created
            ON profiles(status, created_at DESC, id DESC);
        CREATE INDEX IF NOT EXISTS idx_profiles_region_province
            ON profiles(region, province);
        CREATE INDEX IF NOT EXISTS idx_profiles_occupation_slug
            ON profiles(occupation_slug);
        CREATE INDEX IF NOT EXISTS idx_profiles_age ON profiles(age);
        CREATE INDEX IF NOT EXISTS idx_profiles_featured
            ON profiles(is_featured, featured_score DESC);
        CREATE INDEX IF NOT EXISTS idx_profiles_tags ON profiles USING GIN(tags);
        CREATE INDEX IF NOT EXISTS idx_profiles_tag_slugs ON profiles USING GIN(tag_slugs)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT UNIQUE NOT NULL CHECK (char_length(name) <= 50),
            slug TEXT UNIQUE NOT NULL,
            description TEXT CHECK (char_length(description) <= 200),
            count BIGINT NOT NULL DEFAULT 0,
            is_active BOOLEAN NOT NULL DEFAULT true,
            color TEXT NOT NULL DEFAULT '#6366f1',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::raw_sql(
        r#"
        CREATE INDEX IF NOT EXISTS idx_tags_lower_name ON tags(lower(name));
        CREATE INDEX IF NOT EXISTS idx_tags_active_count ON tags(is_active, count DESC, name)
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_default_uses_env_or_fallback() {
        let config = DbConfig::default();
        assert!(config.max_connections >= 1);
        assert!(config.connect_timeout_secs >= 1);
        assert!(config.idle_timeout_secs >= 1);
        assert!(!config.url.is_empty());
    }

    #[test]
    fn test_require_pool_is_unavailable_before_init() {
        assert!(get_pool().is_none());
        assert!(matches!(require_pool(), Err(AppError::DatabaseUnavailable)));
    }

    #[tokio::test]
    async fn test_health_check_fails_without_pool() {
        let result = health_check().await;
        assert!(result.is_err());
    }
}

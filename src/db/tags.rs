//! Tag catalogue. `count` mirrors how many published profiles carry the tag
//! and is kept eventually consistent by the sync functions below.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::Tag;
use crate::error::{AppError, AppResult};
use crate::slug::tag_to_slug;

pub const DEFAULT_COLOR: &str = "#6366f1";
pub const DEFAULT_LIST_LIMIT: i64 = 100;
pub const MAX_NAME_LEN: usize = 50;
pub const MAX_DESCRIPTION_LEN: usize = 200;
const MISSING_REPORT_LIMIT: usize = 10;

const TAG_COLUMNS: &str =
    "id, name, slug, description, count, is_active, color, created_at, updated_at";

lazy_static! {
    static ref COLOR_REGEX: Regex = Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap();
}

// ============================================================================
// Sync
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub total: u32,
    pub created: u32,
    pub updated: u32,
    pub errors: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagUsage {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReportStats {
    pub tag_model_count: i64,
    pub profile_unique_tags_count: i64,
    pub missing_tags_count: usize,
    pub needs_sync: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub stats: SyncReportStats,
    pub missing_tags: Vec<TagUsage>,
}

/// Published profiles carrying the tag with this slug.
pub async fn count_published_using(pool: &PgPool, slug: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM profiles WHERE status = 'published' AND $1 = ANY(tag_slugs)",
    )
    .bind(slug)
    .fetch_one(pool)
    .await
}

async fn find_matching(pool: &PgPool, name: &str, slug: &str) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM tags WHERE lower(name) = lower($1) OR slug = $2 LIMIT 1")
        .bind(name)
        .bind(slug)
        .fetch_optional(pool)
        .await
}

/// Set the count of the matching tag or create it. Returns true if created.
async fn upsert_count(pool: &PgPool, name: &str, slug: &str, count: i64) -> Result<bool, sqlx::Error> {
    match find_matching(pool, name, slug).await? {
        Some(id) => {
            sqlx::query("UPDATE tags SET count = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(count)
                .execute(pool)
                .await?;
            Ok(false)
        }
        None => {
            sqlx::query(
                "INSERT INTO tags (name, slug, count, is_active, color) VALUES ($1, $2, $3, TRUE, $4)",
            )
            .bind(name)
            .bind(slug)
            .bind(count)
            .bind(DEFAULT_COLOR)
            .execute(pool)
            .await?;
            Ok(true)
        }
    }
}

/// Recount (or create) each named tag. Failures are logged and counted; the
/// loop always runs to the end.
pub async fn sync_tags_from_profile(pool: &PgPool, names: &[String]) -> SyncStats {
    let mut stats = SyncStats::default();

    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let slug = tag_to_slug(name);
        if slug.is_empty() {
            continue;
        }
        stats.total += 1;

        let result = async {
            let count = count_published_using(pool, &slug).await?;
            upsert_count(pool, name, &slug, count).await
        }
        .await;

        match result {
            Ok(true) => stats.created += 1,
            Ok(false) => stats.updated += 1,
            Err(e) => {
                stats.errors += 1;
                tracing::error!(tag = %name, error = %e, "failed to sync tag");
            }
        }
    }

    tracing::debug!(?stats, "tags synced from profile");
    stats
}

/// Published tag usage grouped by slug, most used first.
async fn published_usage(pool: &PgPool) -> Result<Vec<(String, String, i64)>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT t.slug, MIN(t.name) AS name, COUNT(DISTINCT p.id) AS count
        FROM profiles p
        CROSS JOIN LATERAL unnest(p.tags, p.tag_slugs) AS t(name, slug)
        WHERE p.status = 'published'
        GROUP BY t.slug
        ORDER BY count DESC, t.slug ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Rebuild every tag count from the published profiles. Tags that are no
/// longer used drop to zero.
pub async fn resync_all_tags(pool: &PgPool) -> AppResult<SyncStats> {
    let usage = published_usage(pool)
        .await
        .map_err(|e| AppError::from(e).context("Không thể sync tags"))?;

    let mut stats = SyncStats {
        total: usage.len() as u32,
        ..SyncStats::default()
    };

    for (slug, name, count) in &usage {
        match upsert_count(pool, name, slug, *count).await {
            Ok(true) => stats.created += 1,
            Ok(false) => stats.updated += 1,
            Err(e) => {
                stats.errors += 1;
                tracing::error!(tag = %name, error = %e, "failed to resync tag");
            }
        }
    }

    let used: Vec<String> = usage.into_iter().map(|(slug, _, _)| slug).collect();
    let zeroed = sqlx::query(
        "UPDATE tags SET count = 0, updated_at = now() WHERE count <> 0 AND NOT (slug = ANY($1))",
    )
    .bind(&used)
    .execute(pool)
    .await
    .map_err(|e| AppError::from(e).context("Không thể sync tags"))?
    .rows_affected();

    tracing::info!(?stats, zeroed, "tag resync finished");
    Ok(stats)
}

/// How far the catalogue is from the tags actually used by published profiles.
pub async fn sync_report(pool: &PgPool) -> AppResult<SyncReport> {
    let result: Result<SyncReport, sqlx::Error> = async {
        let tag_model_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
            .fetch_one(pool)
            .await?;

        let usage = published_usage(pool).await?;
        let known: Vec<String> = sqlx::query_scalar("SELECT slug FROM tags")
            .fetch_all(pool)
            .await?;

        let missing: Vec<TagUsage> = usage
            .iter()
            .filter(|(slug, _, _)| !known.contains(slug))
            .map(|(_, name, count)| TagUsage {
                name: name.clone(),
                count: *count,
            })
            .collect();

        Ok(SyncReport {
            stats: SyncReportStats {
                tag_model_count,
                profile_unique_tags_count: usage.len() as i64,
                missing_tags_count: missing.len(),
                needs_sync: !missing.is_empty(),
            },
            missing_tags: missing.into_iter().take(MISSING_REPORT_LIMIT).collect(),
        })
    }
    .await;

    result.map_err(|e| AppError::from(e).context("Không thể kiểm tra trạng thái sync"))
}

// ============================================================================
// CRUD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    /// `None` means no limit
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub active_only: bool,
}

impl Default for TagFilter {
    fn default() -> Self {
        Self {
            limit: Some(DEFAULT_LIST_LIMIT),
            search: None,
            active_only: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub is_active: Option<bool>,
}

/// Escape LIKE wildcards so a search is a plain substring match.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn validate_name(name: Option<&str>) -> AppResult<(String, String)> {
    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::validation("Tên đặc điểm là bắt buộc"))?;
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(format!(
            "Tên đặc điểm không được quá {MAX_NAME_LEN} ký tự"
        )));
    }
    let slug = tag_to_slug(name);
    if slug.is_empty() {
        return Err(AppError::validation("Tên đặc điểm không hợp lệ"));
    }
    Ok((name.to_string(), slug))
}

fn validate_description(description: Option<&str>) -> AppResult<Option<String>> {
    let description = description.map(str::trim).filter(|d| !d.is_empty());
    if let Some(d) = description {
        if d.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(AppError::validation(format!(
                "Mô tả không được quá {MAX_DESCRIPTION_LEN} ký tự"
            )));
        }
    }
    Ok(description.map(str::to_string))
}

fn validate_color(color: Option<&str>) -> AppResult<Option<String>> {
    match color.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) if COLOR_REGEX.is_match(c) => Ok(Some(c.to_lowercase())),
        Some(c) => Err(AppError::validation(format!("Màu không hợp lệ: {c}"))),
        None => Ok(None),
    }
}

async fn name_taken(
    pool: &PgPool,
    name: &str,
    slug: &str,
    except: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM tags
            WHERE (lower(name) = lower($1) OR slug = $2)
              AND ($3::uuid IS NULL OR id <> $3)
        )
        "#,
    )
    .bind(name)
    .bind(slug)
    .bind(except)
    .fetch_one(pool)
    .await
}

pub async fn list_tags(pool: &PgPool, filter: &TagFilter) -> AppResult<Vec<Tag>> {
    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {TAG_COLUMNS} FROM tags WHERE TRUE"));
    if filter.active_only {
        qb.push(" AND is_active = TRUE");
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND name ILIKE ")
            .push_bind(format!("%{}%", escape_like(search)));
    }
    qb.push(" ORDER BY count DESC, name ASC");
    if let Some(limit) = filter.limit {
        qb.push(" LIMIT ").push_bind(limit);
    }

    let tags = qb
        .build_query_as::<Tag>()
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::from(e).context("Không thể lấy danh sách đặc điểm"))?;
    Ok(tags)
}

pub async fn get_tag(pool: &PgPool, id: Uuid) -> AppResult<Tag> {
    let sql = format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = $1");
    sqlx::query_as::<_, Tag>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| AppError::from(e).context("Không thể lấy thông tin đặc điểm"))?
        .ok_or_else(|| AppError::not_found("Không tìm thấy đặc điểm"))
}

pub async fn create_tag(pool: &PgPool, input: TagInput) -> AppResult<Tag> {
    let (name, slug) = validate_name(input.name.as_deref())?;
    let description = validate_description(input.description.as_deref())?;
    let color = validate_color(input.color.as_deref())?.unwrap_or_else(|| DEFAULT_COLOR.to_string());

    if name_taken(pool, &name, &slug, None).await? {
        return Err(AppError::conflict("Đặc điểm này đã tồn tại"));
    }
    let count = count_published_using(pool, &slug).await?;

    let sql = format!(
        r#"
        INSERT INTO tags (name, slug, description, count, is_active, color)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {TAG_COLUMNS}
        "#
    );
    let tag = sqlx::query_as::<_, Tag>(&sql)
        .bind(&name)
        .bind(&slug)
        .bind(&description)
        .bind(count)
        .bind(input.is_active.unwrap_or(true))
        .bind(&color)
        .fetch_one(pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict { .. } => AppError::conflict("Đặc điểm này đã tồn tại"),
            other => other.context("Không thể tạo đặc điểm"),
        })?;

    tracing::info!(tag = %tag.name, count = tag.count, "tag created");
    Ok(tag)
}

pub async fn update_tag(pool: &PgPool, id: Uuid, input: TagInput) -> AppResult<Tag> {
    let current = get_tag(pool, id).await?;

    let mut name = current.name.clone();
    let mut slug = current.slug.clone();
    let mut count = current.count;
    if let Some(raw) = input.name.as_deref() {
        let (new_name, new_slug) = validate_name(Some(raw))?;
        if new_name != current.name {
            if name_taken(pool, &new_name, &new_slug, Some(id)).await? {
                return Err(AppError::conflict("Tên đặc điểm này đã tồn tại"));
            }
            count = count_published_using(pool, &new_slug).await?;
            name = new_name;
            slug = new_slug;
        }
    }
    let description = match input.description.as_deref() {
        Some(raw) => validate_description(Some(raw))?,
        None => current.description.clone(),
    };
    let color = validate_color(input.color.as_deref())?.unwrap_or_else(|| current.color.clone());
    let is_active = input.is_active.unwrap_or(current.is_active);

    let sql = format!(
        r#"
        UPDATE tags SET
            name = $2, slug = $3, description = $4, count = $5,
            is_active = $6, color = $7, updated_at = now()
        WHERE id = $1
        RETURNING {TAG_COLUMNS}
        "#
    );
    let tag = sqlx::query_as::<_, Tag>(&sql)
        .bind(id)
        .bind(&name)
        .bind(&slug)
        .bind(&description)
        .bind(count)
        .bind(is_active)
        .bind(&color)
        .fetch_optional(pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict { .. } => AppError::conflict("Tên đặc điểm này đã tồn tại"),
            other => other.context("Không thể cập nhật đặc điểm"),
        })?
        .ok_or_else(|| AppError::not_found("Không tìm thấy đặc điểm"))?;

    tracing::info!(tag = %tag.name, "tag updated");
    Ok(tag)
}

/// Refuses while any published profile still carries the tag.
pub async fn delete_tag(pool: &PgPool, id: Uuid) -> AppResult<()> {
    let tag = get_tag(pool, id).await?;

    let in_use = count_published_using(pool, &tag.slug).await?;
    if in_use > 0 {
        return Err(AppError::Conflict {
            message: format!(
                "Không thể xóa đặc điểm này vì đang được sử dụng bởi {in_use} hồ sơ"
            ),
            hint: Some("Hãy tắt đặc điểm thay vì xóa".to_string()),
            profiles_count: Some(in_use),
        });
    }

    sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| AppError::from(e).context("Không thể xóa đặc điểm"))?;

    tracing::info!(tag = %tag.name, "tag deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("dễ thương"), "dễ thương");
    }

    #[test]
    fn test_validate_name_derives_slug() {
        assert_eq!(
            validate_name(Some("  Dễ thương ")).unwrap(),
            ("Dễ thương".to_string(), "de-thuong".to_string())
        );
        assert!(validate_name(None).is_err());
        assert!(validate_name(Some("   ")).is_err());
        assert!(validate_name(Some("!!!")).is_err());
        assert!(validate_name(Some(&"a".repeat(51))).is_err());
    }

    #[test]
    fn test_validate_color_and_description() {
        assert_eq!(validate_color(Some("#ABCDEF")).unwrap().as_deref(), Some("#abcdef"));
        assert_eq!(validate_color(None).unwrap(), None);
        assert!(validate_color(Some("red")).is_err());

        assert_eq!(validate_description(Some("  ")).unwrap(), None);
        assert!(validate_description(Some(&"x".repeat(201))).is_err());
    }

    #[test]
    fn test_default_filter() {
        let filter = TagFilter::default();
        assert_eq!(filter.limit, Some(100));
        assert!(filter.active_only);
    }

    #[test]
    fn test_sync_report_serializes_camel_case() {
        let report = SyncReport {
            stats: SyncReportStats {
                tag_model_count: 3,
                profile_unique_tags_count: 4,
                missing_tags_count: 1,
                needs_sync: true,
            },
            missing_tags: vec![TagUsage {
                name: "Dễ thương".to_string(),
                count: 2,
            }],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stats"]["tagModelCount"], 3);
        assert_eq!(json["stats"]["needsSync"], true);
        assert_eq!(json["missingTags"][0]["name"], "Dễ thương");
    }
}

//! Profile persistence. Create and update share `normalize_for_persist`, so
//! `occupation_slug` and `tag_slugs` always match their labels.

use std::collections::HashSet;

use chrono::Utc;
use serde::Deserialize;
use sqlx::{types::Json, PgPool};

use super::models::{Photo, Profile, ProfileStatus};
use super::query::{PageRequest, ProfileQuery, PROFILE_COLUMNS};
use super::tags;
use crate::error::{AppError, AppResult};
use crate::filters::{MAX_AGE, MIN_AGE};
use crate::media::storage::is_safe_filename;
use crate::slug::{generate_profile_slug, occupation_to_slug, pick_unique_slug, tag_to_slug};
use crate::taxonomy::{find_province, find_region};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_TAG_LEN: usize = 50;
pub const MAX_DESCRIPTION_LEN: usize = 5000;

// ============================================================================
// Input
// ============================================================================

/// Create body, and the patch body for updates (absent fields are kept).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub height: Option<i32>,
    pub weight: Option<i32>,
    pub region: Option<String>,
    pub province: Option<String>,
    pub district: Option<String>,
    pub occupation: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub photos: Option<Vec<Photo>>,
    pub is_featured: Option<bool>,
    pub featured_score: Option<i32>,
    pub status: Option<ProfileStatus>,
}

/// Every persisted column except identity and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFields {
    pub name: String,
    pub age: i32,
    pub height: Option<i32>,
    pub weight: Option<i32>,
    pub region: String,
    pub province: String,
    pub district: Option<String>,
    pub occupation: String,
    pub occupation_slug: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub tag_slugs: Vec<String>,
    pub photos: Vec<Photo>,
    pub is_featured: bool,
    pub featured_score: i32,
    pub status: ProfileStatus,
}

impl ProfileInput {
    /// Fields for a new profile; status defaults to published.
    pub fn into_new_fields(self) -> AppResult<ProfileFields> {
        let (Some(name), Some(age), Some(province), Some(occupation)) =
            (self.name, self.age, self.province, self.occupation)
        else {
            return Err(AppError::validation("Thiếu thông tin bắt buộc"));
        };

        Ok(ProfileFields {
            name,
            age,
            height: self.height,
            weight: self.weight,
            region: self.region.unwrap_or_default(),
            province,
            district: self.district,
            occupation,
            occupation_slug: String::new(),
            description: self.description,
            tags: self.tags.unwrap_or_default(),
            tag_slugs: Vec::new(),
            photos: self.photos.unwrap_or_default(),
            is_featured: self.is_featured.unwrap_or(false),
            featured_score: self.featured_score.unwrap_or(0),
            status: self.status.unwrap_or(ProfileStatus::Published),
        })
    }

    pub fn apply_to(self, fields: &mut ProfileFields) {
        if let Some(name) = self.name {
            fields.name = name;
        }
        if let Some(age) = self.age {
            fields.age = age;
        }
        if self.height.is_some() {
            fields.height = self.height;
        }
        if self.weight.is_some() {
            fields.weight = self.weight;
        }
        if let Some(province) = self.province {
            // A new province without a region re-derives the region.
            if self.region.is_none() {
                fields.region.clear();
            }
            fields.province = province;
        }
        if let Some(region) = self.region {
            fields.region = region;
        }
        if self.district.is_some() {
            fields.district = self.district;
        }
        if let Some(occupation) = self.occupation {
            fields.occupation = occupation;
        }
        if self.description.is_some() {
            fields.description = self.description;
        }
        if let Some(tags) = self.tags {
            fields.tags = tags;
        }
        if let Some(photos) = self.photos {
            fields.photos = photos;
        }
        if let Some(is_featured) = self.is_featured {
            fields.is_featured = is_featured;
        }
        if let Some(score) = self.featured_score {
            fields.featured_score = score;
        }
        if let Some(status) = self.status {
            fields.status = status;
        }
    }
}

impl From<&Profile> for ProfileFields {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            age: profile.age,
            height: profile.height,
            weight: profile.weight,
            region: profile.region.clone(),
            province: profile.province.clone(),
            district: profile.district.clone(),
            occupation: profile.occupation.clone(),
            occupation_slug: profile.occupation_slug.clone(),
            description: profile.description.clone(),
            tags: profile.tags.clone(),
            tag_slugs: profile.tag_slugs.clone(),
            photos: profile.photos.0.clone(),
            is_featured: profile.is_featured,
            featured_score: profile.featured_score,
            status: profile.status(),
        }
    }
}

// ============================================================================
// Normalization
// ============================================================================

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim, drop empties and de-duplicate by slug keeping the first spelling.
pub fn normalize_tags(tags: Vec<String>) -> AppResult<(Vec<String>, Vec<String>)> {
    let mut names = Vec::new();
    let mut slugs = Vec::new();
    for tag in tags {
        let name = tag.trim();
        let slug = tag_to_slug(name);
        if slug.is_empty() || slugs.contains(&slug) {
            continue;
        }
        if name.chars().count() > MAX_TAG_LEN {
            return Err(AppError::validation(format!(
                "Đặc điểm \"{name}\" dài quá {MAX_TAG_LEN} ký tự"
            )));
        }
        names.push(name.to_string());
        slugs.push(slug);
    }
    Ok((names, slugs))
}

fn check_range(value: Option<i32>, range: std::ops::RangeInclusive<i32>, label: &str) -> AppResult<()> {
    match value {
        Some(v) if !range.contains(&v) => Err(AppError::validation(format!(
            "{label} phải từ {} đến {}",
            range.start(),
            range.end()
        ))),
        _ => Ok(()),
    }
}

/// Validate and canonicalize every field before it is written.
pub fn normalize_for_persist(mut fields: ProfileFields) -> AppResult<ProfileFields> {
    fields.name = fields.name.trim().to_string();
    if fields.name.is_empty() || fields.name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation("Tên không hợp lệ"));
    }

    check_range(Some(fields.age), MIN_AGE..=MAX_AGE, "Tuổi")?;
    check_range(fields.height, 100..=250, "Chiều cao")?;
    check_range(fields.weight, 30..=200, "Cân nặng")?;

    let province = find_province(&fields.province)
        .ok_or_else(|| AppError::validation(format!("Tỉnh/thành không hợp lệ: {}", fields.province)))?;
    let province_region = province
        .region()
        .ok_or_else(|| AppError::internal("Dữ liệu vùng miền bị lỗi", province.region))?;
    let region = match trimmed(Some(fields.region.clone())) {
        Some(raw) => find_region(&raw)
            .ok_or_else(|| AppError::validation(format!("Vùng miền không hợp lệ: {raw}")))?,
        None => province_region,
    };
    if region.name != province_region.name {
        return Err(AppError::validation(format!(
            "{} không thuộc {}",
            province.name, region.name
        )));
    }
    fields.province = province.name.to_string();
    fields.region = region.name.to_string();
    fields.district = trimmed(fields.district);

    fields.occupation = fields.occupation.trim().to_string();
    fields.occupation_slug = occupation_to_slug(&fields.occupation);
    if fields.occupation_slug.is_empty() {
        return Err(AppError::validation("Nghề nghiệp không hợp lệ"));
    }

    fields.description = trimmed(fields.description)
        .map(|text| {
            ammonia::Builder::default()
                .tags(HashSet::new())
                .clean(&text)
                .to_string()
        })
        .filter(|text| !text.trim().is_empty());
    if let Some(text) = &fields.description {
        if text.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(AppError::validation(format!(
                "Mô tả dài quá {MAX_DESCRIPTION_LEN} ký tự"
            )));
        }
    }

    let (tags, tag_slugs) = normalize_tags(std::mem::take(&mut fields.tags))?;
    fields.tags = tags;
    fields.tag_slugs = tag_slugs;

    let default_alt = format!("{}, {} tuổi, {}", fields.name, fields.age, fields.province);
    for photo in &mut fields.photos {
        if !is_safe_filename(&photo.base_filename) {
            return Err(AppError::validation("Tên file ảnh không hợp lệ"));
        }
        photo.alt = photo.alt.trim().to_string();
        if photo.alt.is_empty() {
            photo.alt = default_alt.clone();
        }
    }
    if !fields.photos.iter().any(|p| p.is_lcp) {
        if let Some(first) = fields.photos.first_mut() {
            first.is_lcp = true;
        }
    }

    Ok(fields)
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Debug)]
pub struct ProfilePage {
    pub items: Vec<Profile>,
    pub total: i64,
}

fn slug_conflict(err: sqlx::Error) -> AppError {
    match AppError::from(err) {
        AppError::Conflict { .. } => AppError::conflict("Slug đã tồn tại"),
        other => other,
    }
}

/// Slugs already taken by `base` or its numbered variants.
pub async fn existing_slugs(pool: &PgPool, base: &str) -> AppResult<HashSet<String>> {
    let rows: Vec<String> =
        sqlx::query_scalar("SELECT slug FROM profiles WHERE slug = $1 OR slug LIKE $2")
            .bind(base)
            .bind(format!("{base}-%"))
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().collect())
}

pub async fn find_by_slug(pool: &PgPool, slug: &str) -> AppResult<Option<Profile>> {
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE slug = $1");
    let profile = sqlx::query_as::<_, Profile>(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(profile)
}

/// Unpublished profiles are only returned when `include_unpublished` is set.
pub async fn get_profile(pool: &PgPool, slug: &str, include_unpublished: bool) -> AppResult<Profile> {
    find_by_slug(pool, slug)
        .await
        .map_err(|e| e.context("Không thể lấy thông tin hồ sơ"))?
        .filter(|profile| include_unpublished || profile.is_published())
        .ok_or_else(|| AppError::not_found("Không tìm thấy hồ sơ"))
}

pub async fn list_profiles(
    pool: &PgPool,
    query: &ProfileQuery,
    page: &PageRequest,
) -> AppResult<ProfilePage> {
    let mut select = query.select_page(page);
    let mut count = query.count();

    let (items, total) = tokio::try_join!(
        select.build_query_as::<Profile>().fetch_all(pool),
        count.build_query_scalar::<i64>().fetch_one(pool),
    )
    .map_err(|e| AppError::from(e).context("Không thể lấy danh sách hồ sơ"))?;

    Ok(ProfilePage { items, total })
}

pub async fn create_profile(pool: &PgPool, input: ProfileInput) -> AppResult<Profile> {
    let fields = normalize_for_persist(input.into_new_fields()?)?;

    let base = generate_profile_slug(
        &fields.name,
        fields.age,
        &fields.occupation,
        fields.district.as_deref(),
        Some(&fields.province),
    );
    let slug = pick_unique_slug(&base, &existing_slugs(pool, &base).await?);
    let published_at = (fields.status == ProfileStatus::Published).then(Utc::now);

    let sql = format!(
        r#"
        INSERT INTO profiles (
            name, slug, age, height, weight, region, province, district,
            occupation, occupation_slug, description, tags, tag_slugs, photos,
            is_featured, featured_score, status, published_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        RETURNING {PROFILE_COLUMNS}
        "#
    );
    let profile = sqlx::query_as::<_, Profile>(&sql)
        .bind(&fields.name)
        .bind(&slug)
        .bind(fields.age)
        .bind(fields.height)
        .bind(fields.weight)
        .bind(&fields.region)
        .bind(&fields.province)
        .bind(&fields.district)
        .bind(&fields.occupation)
        .bind(&fields.occupation_slug)
        .bind(&fields.description)
        .bind(&fields.tags)
        .bind(&fields.tag_slugs)
        .bind(Json(&fields.photos))
        .bind(fields.is_featured)
        .bind(fields.featured_score)
        .bind(fields.status.as_str())
        .bind(published_at)
        .fetch_one(pool)
        .await
        .map_err(slug_conflict)
        .map_err(|e| e.context("Không thể tạo hồ sơ"))?;

    tracing::info!(slug = %profile.slug, "profile created");

    if !profile.tags.is_empty() {
        tags::sync_tags_from_profile(pool, &profile.tags).await;
    }

    Ok(profile)
}

/// Merge `patch` into the profile at `slug`. The slug itself never changes.
pub async fn update_profile(pool: &PgPool, slug: &str, patch: ProfileInput) -> AppResult<Profile> {
    let current = find_by_slug(pool, slug)
        .await?
        .ok_or_else(|| AppError::not_found("Không tìm thấy hồ sơ"))?;

    let mut fields = ProfileFields::from(&current);
    patch.apply_to(&mut fields);
    let fields = normalize_for_persist(fields)?;

    let from = current.status();
    if !from.can_transition_to(fields.status) {
        return Err(AppError::validation(format!(
            "Không thể chuyển trạng thái từ {from} sang {}",
            fields.status
        )));
    }
    let published_at = current
        .published_at
        .or_else(|| (fields.status == ProfileStatus::Published).then(Utc::now));

    let sql = format!(
        r#"
        UPDATE profiles SET
            name = $2, age = $3, height = $4, weight = $5, region = $6,
            province = $7, district = $8, occupation = $9, occupation_slug = $10,
            description = $11, tags = $12, tag_slugs = $13, photos = $14,
            is_featured = $15, featured_score = $16, status = $17,
            published_at = $18, updated_at = now()
        WHERE slug = $1
        RETURNING {PROFILE_COLUMNS}
        "#
    );
    let profile = sqlx::query_as::<_, Profile>(&sql)
        .bind(slug)
        .bind(&fields.name)
        .bind(fields.age)
        .bind(fields.height)
        .bind(fields.weight)
        .bind(&fields.region)
        .bind(&fields.province)
        .bind(&fields.district)
        .bind(&fields.occupation)
        .bind(&fields.occupation_slug)
        .bind(&fields.description)
        .bind(&fields.tags)
        .bind(&fields.tag_slugs)
        .bind(Json(&fields.photos))
        .bind(fields.is_featured)
        .bind(fields.featured_score)
        .bind(fields.status.as_str())
        .bind(published_at)
        .fetch_optional(pool)
        .await
        .map_err(|e| AppError::from(e).context("Không thể cập nhật hồ sơ"))?
        .ok_or_else(|| AppError::not_found("Không tìm thấy hồ sơ"))?;

    tracing::info!(slug = %profile.slug, status = %profile.status, "profile updated");

    // Removed tags need a recount too.
    let mut affected = current.tags;
    for tag in &profile.tags {
        if !affected.contains(tag) {
            affected.push(tag.clone());
        }
    }
    if !affected.is_empty() {
        tags::sync_tags_from_profile(pool, &affected).await;
    }

    Ok(profile)
}

/// Delete and return the removed row; callers clean up files and tag counts.
pub async fn delete_profile(pool: &PgPool, slug: &str) -> AppResult<Profile> {
    let sql = format!("DELETE FROM profiles WHERE slug = $1 RETURNING {PROFILE_COLUMNS}");
    let profile = sqlx::query_as::<_, Profile>(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .map_err(|e| AppError::from(e).context("Không thể xóa hồ sơ"))?
        .ok_or_else(|| AppError::not_found("Không tìm thấy hồ sơ"))?;

    tracing::info!(slug = %profile.slug, "profile deleted");
    Ok(profile)
}

pub async fn distinct_published_occupations(pool: &PgPool) -> AppResult<Vec<String>> {
    let occupations: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT occupation FROM profiles WHERE status = 'published' AND occupation <> ''",
    )
    .fetch_all(pool)
    .await?;
    Ok(occupations)
}

//! Typed profile listing query: facets each append one predicate to a
//! `QueryBuilder<Postgres>`, so filter values are always bound parameters.

use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::ProfileStatus;
use crate::error::{AppError, AppResult};
use crate::filters::{AgeRange, FilterState};
use crate::slug::{occupation_to_slug, tag_to_slug};
use crate::taxonomy::{find_province, find_region};

pub const DEFAULT_LIMIT: i64 = 12;
pub const MAX_LIMIT: i64 = 100;

pub const PROFILE_COLUMNS: &str = "id, name, slug, age, height, weight, region, province, \
    district, occupation, occupation_slug, description, tags, tag_slugs, photos, \
    is_featured, featured_score, status, created_at, updated_at, published_at";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Facet {
    Status(ProfileStatus),
    /// Canonical region name
    Region(String),
    /// Canonical province name (or the raw value when unknown)
    Province(String),
    /// Occupation slug
    Occupation(String),
    /// Matches profiles carrying ANY of these tag slugs
    Tags(Vec<String>),
    Age { min: i32, max: i32 },
    Exclude(Uuid),
    FeaturedOnly,
}

impl Facet {
    fn push_predicate(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        match self {
            Facet::Status(status) => {
                qb.push("status = ").push_bind(status.as_str());
            }
            Facet::Region(region) => {
                qb.push("region = ").push_bind(region.clone());
            }
            Facet::Province(province) => {
                qb.push("province = ").push_bind(province.clone());
            }
            Facet::Occupation(slug) => {
                qb.push("occupation_slug = ").push_bind(slug.clone());
            }
            Facet::Tags(slugs) => {
                qb.push("tag_slugs && ").push_bind(slugs.clone());
            }
            Facet::Age { min, max } => {
                qb.push("age >= ")
                    .push_bind(*min)
                    .push(" AND age <= ")
                    .push_bind(*max);
            }
            Facet::Exclude(id) => {
                qb.push("id <> ").push_bind(*id);
            }
            Facet::FeaturedOnly => {
                qb.push("is_featured = TRUE");
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileQuery {
    facets: Vec<Facet>,
}

impl ProfileQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, facet: Facet) -> Self {
        self.facets.push(facet);
        self
    }

    pub fn facets(&self) -> &[Facet] {
        &self.facets
    }

    /// Published profiles matching a browse filter state.
    pub fn published_from(filters: &FilterState) -> Self {
        let mut query = Self::new().with(Facet::Status(ProfileStatus::Published));
        if let Some(region) = filters.region.as_deref() {
            let name = find_region(region).map(|r| r.name).unwrap_or(region);
            query = query.with(Facet::Region(name.to_string()));
        }
        if let Some(province) = filters.province.as_deref() {
            let name = find_province(province).map(|p| p.name).unwrap_or(province);
            query = query.with(Facet::Province(name.to_string()));
        }
        if let Some(occupation) = filters.occupation.as_deref() {
            query = query.with(Facet::Occupation(occupation_to_slug(occupation)));
        }
        if !filters.tags.is_empty() {
            query = query.with(Facet::Tags(
                filters.tags.iter().map(|t| tag_to_slug(t)).collect(),
            ));
        }
        if let Some(age) = filters.age_range {
            let (min, max) = age.bounds();
            query = query.with(Facet::Age { min, max });
        }
        query
    }

    pub fn push_where(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        for (i, facet) in self.facets.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            facet.push_predicate(qb);
        }
    }

    pub fn select_page(&self, page: &PageRequest) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT {PROFILE_COLUMNS} FROM profiles"));
        self.push_where(&mut qb);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        qb
    }

    pub fn count(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM profiles");
        self.push_where(&mut qb);
        qb
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Unparseable values fall back to the defaults; `limit` is clamped.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        let limit = limit
            .and_then(|l| l.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: &PageRequest, total: i64) -> Self {
        Self {
            page: page.page,
            limit: page.limit,
            total,
            pages: (total + page.limit - 1) / page.limit,
            has_next: page.page.saturating_mul(page.limit) < total,
            has_prev: page.page > 1,
        }
    }
}

/// Raw `/api/profiles` query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub region: Option<String>,
    pub province: Option<String>,
    pub occupation: Option<String>,
    pub tags: Option<String>,
    pub age: Option<String>,
    pub age_min: Option<String>,
    pub age_max: Option<String>,
    pub exclude: Option<String>,
    pub featured: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_age_bound(value: Option<&str>) -> AppResult<Option<i32>> {
    value
        .map(|v| {
            v.parse::<i32>()
                .map_err(|_| AppError::validation(format!("Tuổi không hợp lệ: {v}")))
        })
        .transpose()
}

impl ProfileListParams {
    /// Normalize into a typed query. Non-published statuses are only honored
    /// for admins; anonymous callers always get published profiles.
    pub fn into_query(self, is_admin: bool) -> AppResult<(ProfileQuery, PageRequest)> {
        let page = PageRequest::parse(self.page.as_deref(), self.limit.as_deref());

        let status = match non_empty(&self.status) {
            Some(raw) => raw
                .parse::<ProfileStatus>()
                .map_err(|_| AppError::validation(format!("Trạng thái không hợp lệ: {raw}")))?,
            None => ProfileStatus::Published,
        };
        let status = if is_admin { status } else { ProfileStatus::Published };

        let mut query = ProfileQuery::new().with(Facet::Status(status));

        if let Some(region) = non_empty(&self.region) {
            let name = find_region(region).map(|r| r.name).unwrap_or(region);
            query = query.with(Facet::Region(name.to_string()));
        }
        if let Some(province) = non_empty(&self.province) {
            let name = find_province(province).map(|p| p.name).unwrap_or(province);
            query = query.with(Facet::Province(name.to_string()));
        }
        if let Some(occupation) = non_empty(&self.occupation) {
            query = query.with(Facet::Occupation(occupation_to_slug(occupation)));
        }
        if let Some(tags) = non_empty(&self.tags) {
            let mut slugs: Vec<String> = Vec::new();
            for slug in tags.split(',').map(tag_to_slug).filter(|s| !s.is_empty()) {
                if !slugs.contains(&slug) {
                    slugs.push(slug);
                }
            }
            if !slugs.is_empty() {
                query = query.with(Facet::Tags(slugs));
            }
        }

        let age = match non_empty(&self.age) {
            Some(raw) => Some(
                raw.parse::<AgeRange>()
                    .map_err(|e| AppError::validation(e.to_string()))?,
            ),
            None => AgeRange::from_bounds(
                parse_age_bound(non_empty(&self.age_min))?,
                parse_age_bound(non_empty(&self.age_max))?,
            )
            .map_err(|e| AppError::validation(e.to_string()))?,
        };
        if let Some(age) = age {
            let (min, max) = age.bounds();
            query = query.with(Facet::Age { min, max });
        }

        if let Some(id) = non_empty(&self.exclude).and_then(|raw| Uuid::parse_str(raw).ok()) {
            query = query.with(Facet::Exclude(id));
        }
        if non_empty(&self.featured) == Some("true") {
            query = query.with(Facet::FeaturedOnly);
        }

        Ok((query, page))
    }
}

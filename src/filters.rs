//! Two-way mapping between a browse filter state and its canonical URL
//! (`/kham-pha/{region}/{province}?occupation=&tags=&age=`).

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;
use url::form_urlencoded;

use crate::slug::{occupation_to_slug, slug_to_occupation, slug_to_tag, tag_to_slug};
use crate::taxonomy::{self, find_province, find_region};

pub const BASE_PATH: &str = "/kham-pha";
pub const BASE_LABEL: &str = "Khám phá";

pub const MIN_AGE: i32 = 18;
pub const MAX_AGE: i32 = 100;

/// Query value for "over 35".
const OVER_35: &str = "tren-35";
/// Legacy "under 18" value; always rejected.
const UNDER_18: &str = "duoi-18";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Bộ lọc độ tuổi không hợp lệ: {0}")]
    InvalidAge(String),
}

/// Age filter. Bounds are inclusive and never below [`MIN_AGE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeRange {
    Between { min: i32, max: i32 },
    Over35,
}

impl AgeRange {
    pub fn between(min: i32, max: i32) -> Result<Self, FilterError> {
        if min < MIN_AGE || max > MAX_AGE || min > max {
            return Err(FilterError::InvalidAge(format!("{min}-{max}")));
        }
        Ok(AgeRange::Between { min, max })
    }

    /// Build from separate `ageMin`/`ageMax` values; a missing side is open.
    pub fn from_bounds(min: Option<i32>, max: Option<i32>) -> Result<Option<Self>, FilterError> {
        match (min, max) {
            (None, None) => Ok(None),
            (min, max) => Self::between(min.unwrap_or(MIN_AGE), max.unwrap_or(MAX_AGE)).map(Some),
        }
    }

    pub const fn bounds(&self) -> (i32, i32) {
        match self {
            AgeRange::Between { min, max } => (*min, *max),
            AgeRange::Over35 => (36, MAX_AGE),
        }
    }
}

impl fmt::Display for AgeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgeRange::Between { min, max } => write!(f, "{min}-{max}"),
            AgeRange::Over35 => f.write_str(OVER_35),
        }
    }
}

impl FromStr for AgeRange {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            OVER_35 => return Ok(AgeRange::Over35),
            UNDER_18 => return Err(FilterError::InvalidAge(s.to_string())),
            _ => {}
        }
        let invalid = || FilterError::InvalidAge(s.to_string());
        let (min, max) = s.split_once('-').ok_or_else(invalid)?;
        let min: i32 = min.trim().parse().map_err(|_| invalid())?;
        let max: i32 = max.trim().parse().map_err(|_| invalid())?;
        Self::between(min, max)
    }
}

impl Serialize for AgeRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Labels, not slugs: region and province hold canonical names, occupation
/// and tags hold display labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub region: Option<String>,
    pub province: Option<String>,
    pub occupation: Option<String>,
    pub age_range: Option<AgeRange>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub label: String,
    pub href: String,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        *self == FilterState::default()
    }

    fn region_slug(&self) -> Option<String> {
        if let Some(region) = self.region.as_deref() {
            return Some(
                find_region(region)
                    .map(|r| r.slug.to_string())
                    .unwrap_or_else(|| crate::slug::to_slug(region)),
            );
        }
        self.province
            .as_deref()
            .and_then(find_province)
            .and_then(|p| p.region())
            .map(|r| r.slug.to_string())
    }

    fn province_slug(&self) -> Option<String> {
        self.province.as_deref().map(|province| {
            find_province(province)
                .map(|p| p.slug.to_string())
                .unwrap_or_else(|| crate::slug::to_slug(province))
        })
    }

    fn path(&self) -> String {
        let mut path = BASE_PATH.to_string();
        if let Some(region) = self.region_slug() {
            path.push('/');
            path.push_str(&region);
            if let Some(province) = self.province_slug() {
                path.push('/');
                path.push_str(&province);
            }
        }
        path
    }

    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(occupation) = self.occupation.as_deref() {
            pairs.push(("occupation", occupation_to_slug(occupation)));
        }
        if !self.tags.is_empty() {
            let slugs: Vec<String> = self.tags.iter().map(|t| tag_to_slug(t)).collect();
            pairs.push(("tags", slugs.join(",")));
        }
        if let Some(age) = self.age_range {
            pairs.push(("age", age.to_string()));
        }
        pairs
    }

    /// Canonical browse URL. Query values are slugs and need no escaping.
    pub fn to_url(&self) -> String {
        let pairs = self.query_pairs();
        let mut url = self.path();
        if !pairs.is_empty() {
            let query: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }

    /// Parse a browse path (with or without the base prefix) and its raw
    /// query string. Unknown region/province segments are dropped; unknown
    /// occupation and tag slugs fall back to title case.
    pub fn from_url(path: &str, query: &str) -> Result<Self, FilterError> {
        let mut state = FilterState::default();

        let trimmed = path.strip_prefix(BASE_PATH).unwrap_or(path);
        let mut segments = trimmed.split('/').filter(|s| !s.is_empty());

        if let Some(first) = segments.next() {
            if let Some(region) = find_region(first) {
                state.region = Some(region.name.to_string());
                if let Some(province) = segments.next().and_then(find_province) {
                    state.province = Some(province.name.to_string());
                }
            } else if let Some(province) = find_province(first) {
                state.province = Some(province.name.to_string());
            }
        }

        if state.region.is_none() {
            state.region = state.province.as_deref().and_then(region_of).map(str::to_string);
        }

        let mut age_min = None;
        let mut age_max = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "occupation" => state.occupation = Some(slug_to_occupation(value)),
                "tags" => {
                    state.tags = value
                        .split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(slug_to_tag)
                        .collect();
                }
                "age" => state.age_range = Some(value.parse()?),
                "ageMin" => age_min = Some(parse_age(value)?),
                "ageMax" => age_max = Some(parse_age(value)?),
                _ => {}
            }
        }
        if state.age_range.is_none() {
            state.age_range = AgeRange::from_bounds(age_min, age_max)?;
        }

        Ok(state)
    }

    /// `/api/profiles` query for this state, with canonical names for
    /// region and province.
    pub fn to_api_query(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if let Some(region) = self.region.as_deref() {
            let name = find_region(region).map(|r| r.name).unwrap_or(region);
            serializer.append_pair("region", name);
        }
        if let Some(province) = self.province.as_deref() {
            let name = find_province(province).map(|p| p.name).unwrap_or(province);
            serializer.append_pair("province", name);
        }
        for (key, value) in self.query_pairs() {
            serializer.append_pair(key, &value);
        }
        serializer.finish()
    }

    /// Trail from the base page down to the most specific filter.
    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        let mut crumbs = vec![Breadcrumb {
            label: BASE_LABEL.to_string(),
            href: BASE_PATH.to_string(),
        }];

        let region_only = FilterState {
            region: self
                .region
                .clone()
                .or_else(|| self.province.as_deref().and_then(region_of).map(str::to_string)),
            ..FilterState::default()
        };
        if let Some(region) = region_only.region.as_deref() {
            let label = find_region(region).map(|r| r.name).unwrap_or(region);
            crumbs.push(Breadcrumb {
                label: label.to_string(),
                href: region_only.to_url(),
            });
        }

        if let Some(province) = self.province.as_deref() {
            let label = find_province(province).map(|p| p.name).unwrap_or(province);
            let with_province = FilterState {
                province: Some(province.to_string()),
                ..region_only.clone()
            };
            crumbs.push(Breadcrumb {
                label: label.to_string(),
                href: with_province.to_url(),
            });
        }

        if self.occupation.is_some() || !self.tags.is_empty() || self.age_range.is_some() {
            let mut label_parts: Vec<String> = Vec::new();
            label_parts.extend(self.occupation.clone());
            label_parts.extend(self.tags.iter().cloned());
            if let Some(age) = self.age_range {
                let (min, max) = age.bounds();
                label_parts.push(match age {
                    AgeRange::Over35 => "Trên 35 tuổi".to_string(),
                    AgeRange::Between { .. } => format!("{min}-{max} tuổi"),
                });
            }
            crumbs.push(Breadcrumb {
                label: label_parts.join(", "),
                href: self.to_url(),
            });
        }

        crumbs
    }
}

fn parse_age(value: &str) -> Result<i32, FilterError> {
    value
        .parse()
        .map_err(|_| FilterError::InvalidAge(value.to_string()))
}

/// Region name for a province name, if the province is known.
pub fn region_of(province: &str) -> Option<&'static str> {
    taxonomy::find_province(province)
        .and_then(|p| p.region())
        .map(|r| r.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_range_parsing() {
        assert_eq!(
            "18-22".parse::<AgeRange>().unwrap(),
            AgeRange::Between { min: 18, max: 22 }
        );
        assert_eq!("tren-35".parse::<AgeRange>().unwrap().bounds(), (36, 100));
        assert!("duoi-18".parse::<AgeRange>().is_err());
        assert!("16-20".parse::<AgeRange>().is_err());
        assert!("30-20".parse::<AgeRange>().is_err());
        assert!("abc".parse::<AgeRange>().is_err());
    }

    #[test]
    fn test_from_bounds_opens_missing_side() {
        assert_eq!(AgeRange::from_bounds(None, None).unwrap(), None);
        assert_eq!(
            AgeRange::from_bounds(Some(25), None).unwrap(),
            Some(AgeRange::Between { min: 25, max: 100 })
        );
        assert!(AgeRange::from_bounds(Some(15), Some(20)).is_err());
    }

    #[test]
    fn test_to_url_full_state() {
        let state = FilterState {
            region: Some("Miền Bắc".to_string()),
            province: Some("Hà Nội".to_string()),
            occupation: Some("Sinh viên".to_string()),
            age_range: Some(AgeRange::Between { min: 18, max: 22 }),
            tags: vec!["Dễ thương".to_string(), "Năng động".to_string()],
        };
        assert_eq!(
            state.to_url(),
            "/kham-pha/mien-bac/ha-noi?occupation=sinh-vien&tags=de-thuong,nang-dong&age=18-22"
        );
    }

    #[test]
    fn test_province_alone_resolves_region() {
        let state = FilterState {
            province: Some("Đà Nẵng".to_string()),
            ..Default::default()
        };
        assert_eq!(state.to_url(), "/kham-pha/mien-trung/da-nang");
    }

    #[test]
    fn test_from_url_inverse() {
        let state = FilterState::from_url(
            "/kham-pha/mien-bac/ha-noi",
            "occupation=sinh-vien&tags=de-thuong&age=tren-35",
        )
        .unwrap();
        assert_eq!(state.region.as_deref(), Some("Miền Bắc"));
        assert_eq!(state.province.as_deref(), Some("Hà Nội"));
        assert_eq!(state.occupation.as_deref(), Some("Sinh viên"));
        assert_eq!(state.tags, vec!["Dễ thương".to_string()]);
        assert_eq!(state.age_range, Some(AgeRange::Over35));
        assert_eq!(
            state.to_url(),
            "/kham-pha/mien-bac/ha-noi?occupation=sinh-vien&tags=de-thuong&age=tren-35"
        );
    }

    #[test]
    fn test_from_url_drops_unknown_segments_and_rejects_minor_filter() {
        let state = FilterState::from_url("/kham-pha/atlantis/nowhere", "").unwrap();
        assert!(state.is_empty());

        let state = FilterState::from_url("/kham-pha/ho-chi-minh", "").unwrap();
        assert_eq!(state.region.as_deref(), Some("Miền Nam"));
        assert_eq!(state.province.as_deref(), Some("Hồ Chí Minh"));

        assert!(FilterState::from_url("/kham-pha", "age=duoi-18").is_err());
    }

    #[test]
    fn test_unknown_occupation_falls_back_to_title_case() {
        let state = FilterState::from_url("", "occupation=tho-lan").unwrap();
        assert_eq!(state.occupation.as_deref(), Some("Tho Lan"));
    }

    #[test]
    fn test_to_api_query_uses_canonical_names() {
        let state = FilterState::from_url("/kham-pha/mien-nam/can-tho", "age=20-25").unwrap();
        let query = state.to_api_query();
        let pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        assert!(pairs.contains(&("region".to_string(), "Miền Nam".to_string())));
        assert!(pairs.contains(&("province".to_string(), "Cần Thơ".to_string())));
        assert!(pairs.contains(&("age".to_string(), "20-25".to_string())));
    }

    #[test]
    fn test_breadcrumbs() {
        let state = FilterState::from_url("/kham-pha/mien-bac/ha-noi", "occupation=sinh-vien").unwrap();
        let crumbs = state.breadcrumbs();
        let hrefs: Vec<&str> = crumbs.iter().map(|c| c.href.as_str()).collect();
        assert_eq!(
            hrefs,
            vec![
                "/kham-pha",
                "/kham-pha/mien-bac",
                "/kham-pha/mien-bac/ha-noi",
                "/kham-pha/mien-bac/ha-noi?occupation=sinh-vien",
            ]
        );
        assert_eq!(crumbs[3].label, "Sinh viên");
    }
}

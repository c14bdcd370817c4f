//! Database Models - structs representing database tables (used by sqlx/serde).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// One rendition of a photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSize {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSizes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<PhotoSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small: Option<PhotoSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<PhotoSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large: Option<PhotoSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<PhotoSize>,
}

/// Photo metadata embedded in a profile (stored as JSONB)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub url: String,
    pub base_filename: String,
    pub alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub bytes: u64,
    #[serde(default, rename = "isLCP")]
    pub is_lcp: bool,
    #[serde(default, rename = "blurDataURL", skip_serializing_if = "Option::is_none")]
    pub blur_data_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dominant_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<PhotoSizes>,
}

/// Publication state of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Draft,
    Published,
    Archived,
}

impl ProfileStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProfileStatus::Draft => "draft",
            ProfileStatus::Published => "published",
            ProfileStatus::Archived => "archived",
        }
    }

    /// draft -> published -> archived, plus unpublish and restore.
    pub fn can_transition_to(&self, next: ProfileStatus) -> bool {
        use ProfileStatus::*;
        matches!(
            (self, next),
            (Draft, Draft)
                | (Draft, Published)
                | (Published, Published)
                | (Published, Draft)
                | (Published, Archived)
                | (Archived, Archived)
                | (Archived, Published)
        )
    }
}

impl fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ProfileStatus::Draft),
            "published" => Ok(ProfileStatus::Published),
            "archived" => Ok(ProfileStatus::Archived),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// Profile model
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
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
    pub photos: Json<Vec<Photo>>,
    pub is_featured: bool,
    pub featured_score: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn status(&self) -> ProfileStatus {
        self.status.parse().unwrap_or(ProfileStatus::Draft)
    }

    pub fn is_published(&self) -> bool {
        self.status() == ProfileStatus::Published
    }
}

/// Tag model
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub count: i64,
    pub is_active: bool,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_and_transitions() {
        for status in [ProfileStatus::Draft, ProfileStatus::Published, ProfileStatus::Archived] {
            assert_eq!(status.as_str().parse::<ProfileStatus>().unwrap(), status);
        }
        assert!("deleted".parse::<ProfileStatus>().is_err());

        assert!(ProfileStatus::Draft.can_transition_to(ProfileStatus::Published));
        assert!(ProfileStatus::Published.can_transition_to(ProfileStatus::Archived));
        assert!(!ProfileStatus::Draft.can_transition_to(ProfileStatus::Archived));
        assert!(!ProfileStatus::Archived.can_transition_to(ProfileStatus::Draft));
    }

    #[test]
    fn test_photo_serializes_with_source_field_names() {
        let photo = Photo {
            url: "/api/images/a-medium.webp".to_string(),
            base_filename: "a".to_string(),
            alt: "alt".to_string(),
            caption: None,
            width: 800,
            height: 800,
            format: "webp".to_string(),
            bytes: 1024,
            is_lcp: true,
            blur_data_url: Some("data:image/webp;base64,AA==".to_string()),
            dominant_color: None,
            sizes: None,
        };
        let json = serde_json::to_value(&photo).unwrap();
        assert_eq!(json["baseFilename"], "a");
        assert_eq!(json["isLCP"], true);
        assert_eq!(json["blurDataURL"], "data:image/webp;base64,AA==");
        assert!(json.get("caption").is_none());

        let back: Photo = serde_json::from_value(json).unwrap();
        assert_eq!(back, photo);
    }
}

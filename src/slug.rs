//! Slug normalizer
//!
//! Turns Vietnamese display text (names, provinces, occupations, tags) into
//! ASCII, diacritic-free, URL-safe slugs, and maps known slugs back to their
//! display labels.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::taxonomy::{OCCUPATIONS, TAG_LABELS};

lazy_static! {
    /// Valid slug pattern: lowercase letters, numbers, and hyphens
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();

    static ref OCCUPATION_BY_SLUG: HashMap<String, &'static str> =
        OCCUPATIONS.iter().map(|label| (to_slug(label), *label)).collect();

    static ref TAG_BY_SLUG: HashMap<String, &'static str> =
        TAG_LABELS.iter().map(|label| (to_slug(label), *label)).collect();
}

/// Combining diacritical marks block stripped after NFD.
fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

/// Lowercase, strip tones and map `đ`, leaving only the base letters.
pub(crate) fn remove_tones(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c == 'đ' { 'd' } else { c })
        .collect()
}

/// Convert free text into a URL slug.
///
/// `to_slug("Đà Nẵng") == "da-nang"`. Whitespace and hyphens become single
/// hyphens, every other non `[a-z0-9]` character is dropped.
pub fn to_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in remove_tones(text).chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if (c.is_whitespace() || c == '-') && !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

pub fn occupation_to_slug(occupation: &str) -> String {
    to_slug(occupation)
}

pub fn tag_to_slug(tag: &str) -> String {
    to_slug(tag)
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX.is_match(slug)
}

/// Naive inverse used when a slug is not in any dictionary. Cannot restore
/// diacritics: `"hoa-dong"` becomes `"Hoa Dong"`, not `"Hòa đồng"`.
fn title_case(slug: &str) -> String {
    slug.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn slug_to_occupation(slug: &str) -> String {
    OCCUPATION_BY_SLUG
        .get(slug)
        .map(|label| (*label).to_string())
        .unwrap_or_else(|| title_case(slug))
}

pub fn slug_to_tag(slug: &str) -> String {
    TAG_BY_SLUG
        .get(slug)
        .map(|label| (*label).to_string())
        .unwrap_or_else(|| title_case(slug))
}

/// Occupation dictionary first, then tags, then the lossy fallback.
pub fn slug_to_label(slug: &str) -> String {
    OCCUPATION_BY_SLUG
        .get(slug)
        .or_else(|| TAG_BY_SLUG.get(slug))
        .map(|label| (*label).to_string())
        .unwrap_or_else(|| title_case(slug))
}

/// `linh-22-tuoi-sinh-vien-ha-noi` style identifier for a profile.
pub fn generate_profile_slug(
    name: &str,
    age: i32,
    occupation: &str,
    district: Option<&str>,
    province: Option<&str>,
) -> String {
    let mut parts = vec![to_slug(name), format!("{age}-tuoi"), to_slug(occupation)];
    parts.extend(district.map(to_slug));
    parts.extend(province.map(to_slug));
    parts.retain(|part| !part.is_empty());
    parts.join("-")
}

/// First of `base`, `base-1`, `base-2`, ... not present in `existing`.
pub fn pick_unique_slug(base: &str, existing: &HashSet<String>) -> String {
    if !existing.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !existing.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_slug_vietnamese_place_names() {
        assert_eq!(to_slug("Đà Nẵng"), "da-nang");
        assert_eq!(to_slug("Hồ Chí Minh"), "ho-chi-minh");
        assert_eq!(to_slug("Bà Rịa - Vũng Tàu"), "ba-ria-vung-tau");
        assert_eq!(to_slug("Thừa Thiên Huế"), "thua-thien-hue");
        assert_eq!(to_slug("Đắk Lắk"), "dak-lak");
    }

    #[test]
    fn test_to_slug_strips_punctuation_and_collapses_separators() {
        assert_eq!(to_slug("  Nhân viên   IT!! "), "nhan-vien-it");
        assert_eq!(to_slug("--a--b--"), "a-b");
        assert_eq!(to_slug("TP. Hồ Chí Minh"), "tp-ho-chi-minh");
        assert_eq!(to_slug("!!!"), "");
    }

    #[test]
    fn test_to_slug_is_idempotent_and_ascii() {
        let inputs = [
            "Dễ thương",
            "Người mẫu ảnh",
            "ĐẶNG THỊ THẢO",
            "Quảng Ngãi",
            "Ấm áp, tin cậy",
            "Nguyễn Văn Đức 1990",
        ];
        for input in inputs {
            let once = to_slug(input);
            assert_eq!(to_slug(&once), once, "not idempotent for {input}");
            assert!(once.is_ascii());
            assert!(once.is_empty() || is_valid_slug(&once), "invalid slug {once}");
        }
    }

    #[test]
    fn test_occupation_and_tag_normalizers_agree() {
        for text in ["Sinh viên", "Dễ thương", "Hướng dẫn viên du lịch"] {
            assert_eq!(occupation_to_slug(text), tag_to_slug(text));
            assert_eq!(occupation_to_slug(text), to_slug(text));
        }
    }

    #[test]
    fn test_known_labels_round_trip() {
        for label in OCCUPATIONS {
            assert_eq!(slug_to_occupation(&to_slug(label)), *label);
            assert_eq!(slug_to_label(&to_slug(label)), *label);
        }
        for label in TAG_LABELS {
            assert_eq!(slug_to_tag(&to_slug(label)), *label);
        }
    }

    #[test]
    fn test_unknown_slug_falls_back_to_title_case() {
        // Lossy: diacritics are not recoverable for free text
        assert_eq!(slug_to_tag("me-phim-hoat-hinh"), "Me Phim Hoat Hinh");
        assert_eq!(slug_to_label("abc"), "Abc");
    }

    #[test]
    fn test_generate_profile_slug() {
        assert_eq!(
            generate_profile_slug("Linh", 22, "Sinh viên", None, Some("Hà Nội")),
            "linh-22-tuoi-sinh-vien-ha-noi"
        );
        assert_eq!(
            generate_profile_slug("Mai Anh", 25, "Kế toán", Some("Cầu Giấy"), Some("Hà Nội")),
            "mai-anh-25-tuoi-ke-toan-cau-giay-ha-noi"
        );
    }

    #[test]
    fn test_pick_unique_slug_appends_counter() {
        let base = "linh-22-tuoi-sinh-vien-ha-noi";
        let mut existing = HashSet::new();
        assert_eq!(pick_unique_slug(base, &existing), base);

        existing.insert(base.to_string());
        assert_eq!(pick_unique_slug(base, &existing), format!("{base}-1"));

        existing.insert(format!("{base}-1"));
        existing.insert(format!("{base}-2"));
        assert_eq!(pick_unique_slug(base, &existing), format!("{base}-3"));
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("da-nang"));
        assert!(!is_valid_slug("Da-Nang"));
        assert!(!is_valid_slug("da--nang"));
        assert!(!is_valid_slug("-da"));
        assert!(!is_valid_slug("../etc"));
    }
}

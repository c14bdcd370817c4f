//! Static taxonomy: regions, provinces, default occupations and tag labels.

use serde::Serialize;

use crate::slug::to_slug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub name: &'static str,
    pub code: &'static str,
    pub slug: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Province {
    pub name: &'static str,
    pub slug: &'static str,
    pub region: &'static str,
}

pub const NORTH: &str = "Miền Bắc";
pub const CENTRAL: &str = "Miền Trung";
pub const SOUTH: &str = "Miền Nam";

pub const REGIONS: &[Region] = &[
    Region { name: NORTH, code: "bac", slug: "mien-bac" },
    Region { name: CENTRAL, code: "trung", slug: "mien-trung" },
    Region { name: SOUTH, code: "nam", slug: "mien-nam" },
];

macro_rules! province {
    ($name:expr, $slug:expr, $region:expr) => {
        Province { name: $name, slug: $slug, region: $region }
    };
}

pub const PROVINCES: &[Province] = &[
    // Miền Bắc
    province!("Hà Nội", "ha-noi", NORTH),
    province!("Hải Phòng", "hai-phong", NORTH),
    province!("Quảng Ninh", "quang-ninh", NORTH),
    province!("Bắc Giang", "bac-giang", NORTH),
    province!("Bắc Ninh", "bac-ninh", NORTH),
    province!("Hải Dương", "hai-duong", NORTH),
    province!("Hưng Yên", "hung-yen", NORTH),
    province!("Hà Nam", "ha-nam", NORTH),
    province!("Nam Định", "nam-dinh", NORTH),
    province!("Thái Bình", "thai-binh", NORTH),
    province!("Ninh Bình", "ninh-binh", NORTH),
    province!("Vĩnh Phúc", "vinh-phuc", NORTH),
    province!("Phú Thọ", "phu-tho", NORTH),
    province!("Thái Nguyên", "thai-nguyen", NORTH),
    province!("Bắc Kạn", "bac-kan", NORTH),
    province!("Cao Bằng", "cao-bang", NORTH),
    province!("Lạng Sơn", "lang-son", NORTH),
    province!("Tuyên Quang", "tuyen-quang", NORTH),
    province!("Hà Giang", "ha-giang", NORTH),
    province!("Yên Bái", "yen-bai", NORTH),
    province!("Lào Cai", "lao-cai", NORTH),
    province!("Lai Châu", "lai-chau", NORTH),
    province!("Điện Biên", "dien-bien", NORTH),
    province!("Sơn La", "son-la", NORTH),
    province!("Hòa Bình", "hoa-binh", NORTH),
    // Miền Trung
    province!("Thanh Hóa", "thanh-hoa", CENTRAL),
    province!("Nghệ An", "nghe-an", CENTRAL),
    province!("Hà Tĩnh", "ha-tinh", CENTRAL),
    province!("Quảng Bình", "quang-binh", CENTRAL),
    province!("Quảng Trị", "quang-tri", CENTRAL),
    province!("Thừa Thiên Huế", "thua-thien-hue", CENTRAL),
    province!("Đà Nẵng", "da-nang", CENTRAL),
    province!("Quảng Nam", "quang-nam", CENTRAL),
    province!("Quảng Ngãi", "quang-ngai", CENTRAL),
    province!("Bình Định", "binh-dinh", CENTRAL),
    province!("Phú Yên", "phu-yen", CENTRAL),
    province!("Khánh Hòa", "khanh-hoa", CENTRAL),
    province!("Ninh Thuận", "ninh-thuan", CENTRAL),
    province!("Bình Thuận", "binh-thuan", CENTRAL),
    province!("Kon Tum", "kon-tum", CENTRAL),
    province!("Gia Lai", "gia-lai", CENTRAL),
    province!("Đắk Lắk", "dak-lak", CENTRAL),
    province!("Đắk Nông", "dak-nong", CENTRAL),
    province!("Lâm Đồng", "lam-dong", CENTRAL),
    // Miền Nam
    province!("Hồ Chí Minh", "ho-chi-minh", SOUTH),
    province!("Bình Dương", "binh-duong", SOUTH),
    province!("Đồng Nai", "dong-nai", SOUTH),
    province!("Bà Rịa - Vũng Tàu", "ba-ria-vung-tau", SOUTH),
    province!("Tây Ninh", "tay-ninh", SOUTH),
    province!("Bình Phước", "binh-phuoc", SOUTH),
    province!("Long An", "long-an", SOUTH),
    province!("Tiền Giang", "tien-giang", SOUTH),
    province!("Bến Tre", "ben-tre", SOUTH),
    province!("Trà Vinh", "tra-vinh", SOUTH),
    province!("Vĩnh Long", "vinh-long", SOUTH),
    province!("Đồng Tháp", "dong-thap", SOUTH),
    province!("An Giang", "an-giang", SOUTH),
    province!("Kiên Giang", "kien-giang", SOUTH),
    province!("Cần Thơ", "can-tho", SOUTH),
    province!("Hậu Giang", "hau-giang", SOUTH),
    province!("Sóc Trăng", "soc-trang", SOUTH),
    province!("Bạc Liêu", "bac-lieu", SOUTH),
    province!("Cà Mau", "ca-mau", SOUTH),
];

/// Occupations offered by the admin form and merged into `/api/occupations`.
pub const OCCUPATIONS: &[&str] = &[
    "Sinh viên",
    "Người mẫu",
    "Nhân viên văn phòng",
    "Giáo viên",
    "Y tá",
    "Kinh doanh",
    "Freelancer",
    "Nhân viên bán hàng",
    "Kế toán",
    "Nhân viên ngân hàng",
    "Kỹ sư",
    "Bác sĩ",
    "Lập trình viên",
    "Thiết kế đồ họa",
    "Luật sư",
    "Dược sĩ",
    "Thợ may",
    "Thợ cắt tóc",
    "Đầu bếp",
    "Tài xế",
    "Nhân viên y tế",
    "Nhân viên marketing",
    "Nhân viên IT",
    "Công nhân",
    "Nông dân",
    "Nhân viên khách sạn",
    "Hướng dẫn viên du lịch",
    "Kiến trúc sư",
    "Nhà báo",
    "Nhiếp ảnh gia",
    "Nghệ sĩ",
    "Vận động viên",
    "Diễn viên",
    "Ca sĩ",
];

/// Tag spellings whose slugs can be mapped back exactly.
pub const TAG_LABELS: &[&str] = &[
    "Thân thiện",
    "Hòa đồng",
    "Năng động",
    "Dễ thương",
    "Dịu dàng",
    "Cá tính",
    "Lạc quan",
    "Vui vẻ",
    "Chân thành",
    "Tích cực",
    "Sáng tạo",
    "Độc lập",
    "Kiên nhẫn",
    "Hài hước",
    "Thông minh",
    "Ấm áp",
    "Tin cậy",
    "Có trách nhiệm",
    "Yêu thích du lịch",
    "Thích đọc sách",
    "Yêu âm nhạc",
    "Thích nấu ăn",
    "Yêu thể thao",
    "Thích xem phim",
    "Yêu thiên nhiên",
    "Thích chụp ảnh",
];

/// Accepts a short code (`bac`), a slug (`mien-bac`) or the canonical name.
pub fn find_region(value: &str) -> Option<&'static Region> {
    let value = value.trim();
    REGIONS.iter().find(|region| {
        region.code == value || region.slug == value || region.name == value
    })
}

pub fn find_region_by_name(name: &str) -> Option<&'static Region> {
    REGIONS.iter().find(|region| region.name == name)
}

/// Accepts a province slug or name; names are compared through their slug so
/// that spelling variants in casing still resolve.
pub fn find_province(value: &str) -> Option<&'static Province> {
    let value = value.trim();
    PROVINCES
        .iter()
        .find(|province| province.slug == value || province.name == value)
        .or_else(|| {
            let slug = to_slug(value);
            PROVINCES.iter().find(|province| province.slug == slug)
        })
}

impl Province {
    pub fn region(&self) -> Option<&'static Region> {
        find_region_by_name(self.region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_province_table_is_consistent() {
        assert_eq!(PROVINCES.len(), 63);
        let mut seen = HashSet::new();
        for province in PROVINCES {
            assert_eq!(province.slug, to_slug(province.name), "{}", province.name);
            assert!(seen.insert(province.slug), "duplicate {}", province.slug);
            assert!(province.region().is_some());
        }
    }

    #[test]
    fn test_label_tables_have_unique_slugs() {
        let occupations: HashSet<_> = OCCUPATIONS.iter().map(|o| to_slug(o)).collect();
        assert_eq!(occupations.len(), OCCUPATIONS.len());
        let tags: HashSet<_> = TAG_LABELS.iter().map(|t| to_slug(t)).collect();
        assert_eq!(tags.len(), TAG_LABELS.len());
    }

    #[test]
    fn test_find_region_accepts_code_slug_and_name() {
        assert_eq!(find_region("bac").map(|r| r.name), Some(NORTH));
        assert_eq!(find_region("mien-trung").map(|r| r.name), Some(CENTRAL));
        assert_eq!(find_region("Miền Nam").map(|r| r.name), Some(SOUTH));
        assert!(find_region("mien-tay").is_none());
    }

    #[test]
    fn test_find_province_by_slug_or_name() {
        assert_eq!(find_province("da-nang").map(|p| p.name), Some("Đà Nẵng"));
        assert_eq!(find_province("Hà Nội").map(|p| p.slug), Some("ha-noi"));
        assert_eq!(find_province("hà nội").map(|p| p.slug), Some("ha-noi"));
        assert_eq!(
            find_province("can-tho").and_then(|p| p.region()).map(|r| r.slug),
            Some("mien-nam")
        );
        assert!(find_province("atlantis").is_none());
    }
}

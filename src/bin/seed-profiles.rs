//! Bulk-create sample profiles for local development.
//!
//! Usage: `seed-profiles [COUNT] [--with-photos]`
//!
//! With `--with-photos`, every jpg/png/webp file in `ORIGINALS_DIR` is run
//! through the rendition pipeline once and handed out round-robin.

use anyhow::Context;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

use profile_directory::config::AppConfig;
use profile_directory::db::{self, models::Photo, profiles::ProfileInput};
use profile_directory::media::{self, storage, PhotoText, ALLOWED_EXTENSIONS};
use profile_directory::taxonomy::{OCCUPATIONS, PROVINCES, TAG_LABELS};

const DEFAULT_COUNT: usize = 20;

const NAMES: &[&str] = &[
    "Nguyễn Văn An", "Trần Minh Đức", "Lê Hoàng Nam", "Phạm Quốc Huy", "Vũ Đình Khoa",
    "Đặng Thanh Long", "Ngô Minh Quân", "Lý Hoàng Phúc", "Đỗ Thanh Bình", "Mai Hoàng Anh",
    "Nguyễn Thị Lan", "Trần Thị Hoa", "Lê Thị Mai", "Phạm Thị Linh", "Vũ Thị Hương",
    "Đặng Thị Thảo", "Bùi Thị Yến", "Ngô Thị Trang", "Lý Thị Phương", "Chu Thị Vân",
];

const DESCRIPTIONS: &[&str] = &[
    "Thích giao lưu và làm quen với mọi người.",
    "Thích du lịch, khám phá những vùng đất mới và trải nghiệm văn hóa.",
    "Yêu thích âm nhạc, thể thao và các hoạt động ngoài trời.",
    "Thích nấu ăn, đọc sách và dành thời gian cho gia đình.",
    "Yêu thích nghệ thuật, điện ảnh và các hoạt động văn hóa.",
    "Thích làm việc nhóm và luôn cập nhật công nghệ mới.",
];

fn sample_input(rng: &mut impl Rng, photos: Vec<Photo>) -> ProfileInput {
    let name = NAMES.choose(rng).copied().unwrap_or("Nguyễn Văn An");
    let province = PROVINCES.choose(rng).map(|p| p.name).unwrap_or("Hà Nội");
    let occupation = OCCUPATIONS.choose(rng).copied().unwrap_or("Sinh viên");

    let mut tags: Vec<&str> = TAG_LABELS.to_vec();
    tags.shuffle(rng);
    let tag_count = rng.random_range(2..=5);

    ProfileInput {
        name: Some(name.to_string()),
        age: Some(rng.random_range(20..=45)),
        height: Some(rng.random_range(150..=185)),
        weight: Some(rng.random_range(45..=80)),
        province: Some(province.to_string()),
        occupation: Some(occupation.to_string()),
        description: DESCRIPTIONS.choose(rng).map(|d| d.to_string()),
        tags: Some(tags.into_iter().take(tag_count).map(str::to_string).collect()),
        photos: Some(photos),
        is_featured: Some(rng.random_bool(0.1)),
        featured_score: Some(rng.random_range(0..=100)),
        ..ProfileInput::default()
    }
}

/// Process every usable image in `config.originals_dir` once.
async fn load_photos(config: &AppConfig) -> anyhow::Result<Vec<Photo>> {
    let mut photos = Vec::new();
    let mut entries = tokio::fs::read_dir(&config.originals_dir)
        .await
        .with_context(|| format!("Cannot read {}", config.originals_dir.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let allowed = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| ALLOWED_EXTENSIONS.contains(&e.to_lowercase().as_str()));
        if !allowed {
            continue;
        }

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("anh");
        let base = format!("seed-{}-{:08x}", storage::file_stem(stem), rand::random::<u32>());
        let data = tokio::fs::read(&path).await?;
        match media::process_upload(&config.upload_dir, &base, data, PhotoText::default()).await {
            Ok(photo) => photos.push(photo),
            Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
        }
    }

    tracing::info!(count = photos.len(), "seed photos processed");
    Ok(photos)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "profile_directory=info,seed_profiles=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let with_photos = args.iter().any(|a| a == "--with-photos");
    let count = args
        .iter()
        .find_map(|a| a.parse::<usize>().ok())
        .unwrap_or(DEFAULT_COUNT);

    let config = AppConfig::from_env();
    let pool = db::init_pool(None)
        .await
        .context("DATABASE_URL must point at a reachable database")?;
    db::run_migrations(&pool).await?;

    let photos = if with_photos {
        load_photos(&config).await?
    } else {
        Vec::new()
    };

    let mut rng = rand::rng();
    let mut created = 0;
    for i in 0..count {
        let assigned: Vec<Photo> = if photos.is_empty() {
            Vec::new()
        } else {
            vec![photos[i % photos.len()].clone()]
        };
        let input = sample_input(&mut rng, assigned);
        match db::profiles::create_profile(&pool, input).await {
            Ok(profile) => {
                created += 1;
                tracing::info!(slug = %profile.slug, "seeded profile");
            }
            Err(e) => tracing::error!("Failed to seed profile {}: {}", i + 1, e),
        }
    }

    println!("Created {created}/{count} profiles");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use profile_directory::db::profiles::normalize_for_persist;

    #[test]
    fn test_sample_inputs_pass_normalization() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let input = sample_input(&mut rng, Vec::new());
            let fields = normalize_for_persist(input.into_new_fields().unwrap()).unwrap();
            assert!((20..=45).contains(&fields.age));
            assert!(!fields.region.is_empty());
            assert!(fields.tags.len() >= 2);
        }
    }
}

//! Rendition files on disk: naming, persisting, deleting and resolving
//! requested paths for the image endpoint.

use std::path::{Component, Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use tokio::fs;

use super::transform::{RenditionSize, TransformOutput};
use crate::slug::remove_tones;

/// Public prefix the serving endpoint is mounted under.
pub const PUBLIC_PREFIX: &str = "/api/images";

lazy_static! {
    static ref RENDITION_SUFFIX: Regex =
        Regex::new(r"-(?:thumbnail|small|medium|large|original)\.webp$").unwrap();
}

#[derive(Debug, Clone)]
pub struct StoredRendition {
    pub size: RenditionSize,
    pub file_name: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub bytes: u64,
}

/// File-safe stem: tones removed, then *every* non-alphanumeric character
/// becomes a hyphen (looser than `slug::to_slug`, which drops punctuation).
pub fn file_stem(text: &str) -> String {
    let replaced: String = remove_tones(text)
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '-'
            }
        })
        .collect();
    replaced
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

const FALLBACK_STEM: &str = "image";

fn stem_or_fallback(text: &str) -> String {
    let stem = file_stem(text);
    if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem
    }
}

/// `{name}-{age}-tuoi-{province}-{millis}-{8 hex}`
pub fn generate_base_filename(name: &str, age: i32, province: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let random_id: u32 = rand::random();
    format!(
        "{}-{}-tuoi-{}-{}-{:08x}",
        stem_or_fallback(name),
        age,
        stem_or_fallback(province),
        timestamp,
        random_id
    )
}

/// Reject names that could address anything other than a flat file in the
/// upload root.
pub fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains("..")
        && !filename.contains('/')
        && !filename.contains('\\')
        && !filename.contains('\0')
}

pub fn public_url(file_name: &str) -> String {
    format!("{PUBLIC_PREFIX}/{file_name}")
}

/// Write every rendition of `output` under `dir`. If any write fails, files
/// written so far are removed before the error is returned.
pub async fn persist_renditions(
    dir: &Path,
    base_filename: &str,
    output: &TransformOutput,
) -> std::io::Result<Vec<StoredRendition>> {
    fs::create_dir_all(dir).await?;

    let mut stored: Vec<StoredRendition> = Vec::with_capacity(output.renditions.len());
    for rendition in &output.renditions {
        let file_name = rendition.size.file_name(base_filename);
        let path = dir.join(&file_name);
        if let Err(e) = fs::write(&path, &rendition.data).await {
            tracing::error!("Failed to write rendition {}: {}", file_name, e);
            for written in &stored {
                let _ = fs::remove_file(dir.join(&written.file_name)).await;
            }
            return Err(e);
        }
        stored.push(StoredRendition {
            size: rendition.size,
            url: public_url(&file_name),
            file_name,
            width: rendition.width,
            height: rendition.height,
            bytes: rendition.data.len() as u64,
        });
    }

    tracing::info!(
        base_filename = %base_filename,
        renditions = stored.len(),
        "renditions written"
    );
    Ok(stored)
}

/// Best-effort removal of all five renditions. Missing files are fine.
/// Returns how many files were actually removed.
pub async fn delete_renditions(dir: &Path, base_filename: &str) -> usize {
    let mut removed = 0;
    for size in RenditionSize::ALL {
        let path = dir.join(size.file_name(base_filename));
        match fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to delete {}: {}", path.display(), e),
        }
    }
    removed
}

#[derive(Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Absolute path on disk plus the relative name used for the ETag.
    Found { path: PathBuf, relative: String },
    NotFound,
    Forbidden,
}

/// Lexically validate `requested` against the upload root. Any `..`, root or
/// prefix component is rejected so the joined path can never leave `root`.
fn confine(root: &Path, requested: &str) -> Option<PathBuf> {
    if requested.is_empty() || requested.contains('\\') || requested.contains('\0') {
        return None;
    }
    let relative = Path::new(requested);
    let mut out = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

/// Resolve a request for `requested` (relative to the upload root). When the
/// rendition is missing, the rendition suffix is stripped and the request is
/// retried against `originals`.
pub async fn resolve(root: &Path, originals: &Path, requested: &str) -> Resolution {
    let Some(path) = confine(root, requested) else {
        return Resolution::Forbidden;
    };

    if is_file(&path).await {
        return Resolution::Found {
            path,
            relative: requested.to_string(),
        };
    }

    let original = RENDITION_SUFFIX.replace(requested, "").into_owned();
    if original != requested && !original.is_empty() {
        if let Some(fallback) = confine(originals, &original) {
            if is_file(&fallback).await {
                return Resolution::Found {
                    path: fallback,
                    relative: original,
                };
            }
        }
    }

    Resolution::NotFound
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::transform::{tests::sample_jpeg, transform};

    #[test]
    fn test_file_stem_is_looser_than_slug() {
        assert_eq!(file_stem("Nguyễn Thị Lan"), "nguyen-thi-lan");
        assert_eq!(file_stem("TP. Hồ Chí Minh"), "tp-ho-chi-minh");
        assert_eq!(file_stem("A.B"), "a-b");
        assert_eq!(crate::slug::to_slug("A.B"), "ab");
    }

    #[test]
    fn test_generate_base_filename_shape() {
        let a = generate_base_filename("Lan", 24, "Đà Nẵng");
        let b = generate_base_filename("Lan", 24, "Đà Nẵng");
        assert!(a.starts_with("lan-24-tuoi-da-nang-"));
        assert_ne!(a, b);
        assert!(is_safe_filename(&a));
    }

    #[test]
    fn test_generate_base_filename_with_symbol_only_name() {
        assert_eq!(file_stem("李小龙"), "");
        let name = generate_base_filename("李小龙", 30, "!!!");
        assert!(name.starts_with("image-30-tuoi-image-"));
        assert!(!name.contains("--"));
    }

    #[test]
    fn test_is_safe_filename() {
        assert!(is_safe_filename("lan-24-tuoi"));
        assert!(!is_safe_filename("../etc/passwd"));
        assert!(!is_safe_filename("a/b"));
        assert!(!is_safe_filename("a\\b"));
        assert!(!is_safe_filename(""));
    }

    #[tokio::test]
    async fn test_persist_and_delete_renditions() {
        let dir = tempfile::tempdir().unwrap();
        let output = transform(&sample_jpeg()).unwrap();

        let stored = persist_renditions(dir.path(), "lan-24", &output).await.unwrap();
        assert_eq!(stored.len(), 5);
        for rendition in &stored {
            assert!(dir.path().join(&rendition.file_name).is_file());
            assert!(rendition.url.starts_with("/api/images/lan-24-"));
            assert!(rendition.file_name.ends_with(".webp"));
        }

        assert_eq!(delete_renditions(dir.path(), "lan-24").await, 5);
        // Idempotent
        assert_eq!(delete_renditions(dir.path(), "lan-24").await, 0);
    }

    #[tokio::test]
    async fn test_resolve_rejects_traversal() {
        let root = tempfile::tempdir().unwrap();
        let originals = tempfile::tempdir().unwrap();
        for attempt in ["../secret.txt", "a/../../secret.txt", "/etc/passwd", "..\\x"] {
            assert_eq!(
                resolve(root.path(), originals.path(), attempt).await,
                Resolution::Forbidden,
                "{attempt}"
            );
        }
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_original() {
        let root = tempfile::tempdir().unwrap();
        let originals = tempfile::tempdir().unwrap();
        std::fs::write(originals.path().join("3c80.jpg"), b"jpeg").unwrap();
        std::fs::write(root.path().join("x-small.webp"), b"webp").unwrap();

        match resolve(root.path(), originals.path(), "x-small.webp").await {
            Resolution::Found { relative, .. } => assert_eq!(relative, "x-small.webp"),
            other => panic!("unexpected {other:?}"),
        }
        match resolve(root.path(), originals.path(), "3c80.jpg-medium.webp").await {
            Resolution::Found { path, relative } => {
                assert_eq!(relative, "3c80.jpg");
                assert_eq!(path, originals.path().join("3c80.jpg"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            resolve(root.path(), originals.path(), "missing-large.webp").await,
            Resolution::NotFound
        );
    }
}

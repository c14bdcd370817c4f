//! Image pipeline: transform an upload into renditions and store them.

pub mod storage;
pub mod transform;

use std::path::Path;

use crate::db::models::{Photo, PhotoSize, PhotoSizes};
use crate::error::{AppError, AppResult};
use storage::StoredRendition;
use transform::{RenditionSize, TransformError, TransformOutput, OUTPUT_FORMAT};

pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024; // 10MB
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Caption and alt text supplied alongside the upload.
#[derive(Debug, Clone, Default)]
pub struct PhotoText {
    pub alt: String,
    pub caption: Option<String>,
}

/// Run the CPU-bound transform on the blocking pool, then persist every
/// rendition under `dir`. Nothing is written unless the transform succeeded.
pub async fn process_upload(
    dir: &Path,
    base_filename: &str,
    data: Vec<u8>,
    text: PhotoText,
) -> AppResult<Photo> {
    let output = tokio::task::spawn_blocking(move || transform::transform(&data))
        .await
        .map_err(|e| AppError::internal("Lỗi server khi xử lý ảnh", e))?
        .map_err(|e| match e {
            TransformError::Decode(_) => {
                tracing::warn!("Rejected undecodable upload: {}", e);
                AppError::validation("File ảnh bị hỏng hoặc không đọc được")
            }
            other => AppError::internal("Lỗi server khi xử lý ảnh", other),
        })?;

    let stored = storage::persist_renditions(dir, base_filename, &output)
        .await
        .map_err(|e| AppError::internal("Lỗi server khi lưu ảnh", e))?;

    build_photo(base_filename, &output, &stored, text)
}

fn to_photo_size(rendition: &StoredRendition) -> PhotoSize {
    PhotoSize {
        url: rendition.url.clone(),
        width: rendition.width,
        height: rendition.height,
        size: rendition.bytes,
    }
}

/// Metadata for a processed image; the medium rendition is the default `url`.
fn build_photo(
    base_filename: &str,
    output: &TransformOutput,
    stored: &[StoredRendition],
    text: PhotoText,
) -> AppResult<Photo> {
    let find = |size: RenditionSize| stored.iter().find(|r| r.size == size).map(to_photo_size);

    let medium = find(RenditionSize::Medium)
        .ok_or_else(|| AppError::internal("Không thể xử lý ảnh kích thước medium", "missing medium rendition"))?;

    Ok(Photo {
        url: medium.url.clone(),
        base_filename: base_filename.to_string(),
        alt: text.alt,
        caption: text.caption,
        width: medium.width,
        height: medium.height,
        format: OUTPUT_FORMAT.to_string(),
        bytes: medium.size,
        is_lcp: false,
        blur_data_url: Some(output.blur_placeholder.clone()),
        dominant_color: Some(output.dominant_color.clone()),
        sizes: Some(PhotoSizes {
            thumbnail: find(RenditionSize::Thumbnail),
            small: find(RenditionSize::Small),
            medium: Some(medium),
            large: find(RenditionSize::Large),
            original: find(RenditionSize::Original),
        }),
    })
}

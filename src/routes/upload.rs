/**
 * Upload Routes
 * Multipart image upload into five WebP renditions, and rendition deletion
 */
use axum::{
    body::Bytes,
    extract::{Multipart, Query, State},
    response::IntoResponse,
    Json,
};
use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::db::models::Photo;
use crate::error::{AppError, AppResult};
use crate::filters::{MAX_AGE, MIN_AGE};
use crate::media::{self, storage, PhotoText, ALLOWED_EXTENSIONS, MAX_FILE_SIZE};
use crate::routes::auth::AdminSession;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub data: Photo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub filename: Option<String>,
}

struct UploadedFile {
    file_name: String,
    data: Bytes,
}

/// Raw multipart fields, before validation.
#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    name: Option<String>,
    age: Option<String>,
    province: Option<String>,
    caption: Option<String>,
    alt: Option<String>,
}

#[derive(Debug)]
struct ValidUpload {
    name: String,
    age: i32,
    province: String,
    data: Vec<u8>,
    text: PhotoText,
}

fn invalid_multipart(e: impl std::fmt::Display) -> AppError {
    tracing::warn!("Multipart error: {}", e);
    AppError::validation("Dữ liệu upload không hợp lệ")
}

async fn read_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await.map_err(invalid_multipart)?;
            form.file = Some(UploadedFile { file_name, data });
            continue;
        }

        let value = field.text().await.map_err(invalid_multipart)?;
        let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
        match name.as_str() {
            "name" => form.name = value,
            "age" => form.age = value,
            "province" => form.province = value,
            "caption" => form.caption = value,
            "alt" => form.alt = value,
            _ => {}
        }
    }
    Ok(form)
}

fn sniff_is_allowed(data: &[u8]) -> bool {
    matches!(
        image::guess_format(data),
        Ok(ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP)
    )
}

impl UploadForm {
    /// Checks run in a fixed order; the first failure is reported.
    fn validate(self) -> AppResult<ValidUpload> {
        let file = self
            .file
            .ok_or_else(|| AppError::validation("Không có file được upload"))?;

        let (Some(name), Some(age), Some(province)) = (self.name, self.age, self.province) else {
            return Err(AppError::validation(
                "Thiếu thông tin bắt buộc: name, age, province",
            ));
        };

        let age: i32 = age
            .parse()
            .ok()
            .filter(|a| (MIN_AGE..=MAX_AGE).contains(a))
            .ok_or_else(|| {
                AppError::validation(format!("Tuổi không hợp lệ, phải từ {MIN_AGE} đến {MAX_AGE}"))
            })?;

        let extension = file
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(AppError::validation(format!(
                "Định dạng không được hỗ trợ. Chỉ chấp nhận: {}",
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }

        if file.data.len() > MAX_FILE_SIZE {
            return Err(AppError::validation(format!(
                "File quá lớn. Kích thước tối đa: {}MB",
                MAX_FILE_SIZE / 1024 / 1024
            )));
        }
        if file.data.is_empty() {
            return Err(AppError::validation("File rỗng"));
        }
        if !sniff_is_allowed(&file.data) {
            return Err(AppError::validation("Nội dung file không phải ảnh hợp lệ"));
        }

        let alt = self
            .alt
            .unwrap_or_else(|| format!("{name}, {age} tuổi, {province}"));

        Ok(ValidUpload {
            name,
            age,
            province,
            data: file.data.to_vec(),
            text: PhotoText {
                alt,
                caption: self.caption,
            },
        })
    }
}

/// POST /api/upload
pub async fn upload_image(
    State(state): State<AppState>,
    _admin: AdminSession,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let upload = read_form(multipart).await?.validate()?;

    let base_filename = storage::generate_base_filename(&upload.name, upload.age, &upload.province);
    let size = upload.data.len();
    let photo = media::process_upload(
        &state.config.upload_dir,
        &base_filename,
        upload.data,
        upload.text,
    )
    .await?;

    tracing::info!("Image uploaded: {} ({} bytes)", base_filename, size);

    Ok(Json(UploadResponse {
        success: true,
        data: photo,
    }))
}

/// DELETE /api/upload?filename=<base>
/// Idempotent: missing renditions are not an error.
pub async fn delete_image(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(params): Query<DeleteParams>,
) -> AppResult<impl IntoResponse> {
    let filename = params
        .filename
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| AppError::validation("Thiếu tham số filename"))?;

    if !storage::is_safe_filename(&filename) {
        return Err(AppError::validation("Tên file không hợp lệ"));
    }

    let removed = storage::delete_renditions(&state.config.upload_dir, &filename).await;
    tracing::info!("Image deleted: {} ({} files)", filename, removed);

    Ok(Json(DeleteResponse {
        success: true,
        message: "Đã xóa ảnh thành công".to_string(),
    }))
}

//! Image transform engine: five cover-fit WebP renditions, a blur
//! placeholder and a dominant color, all computed in memory.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::webp::WebPEncoder, imageops::FilterType, DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const OUTPUT_FORMAT: &str = "webp";
const PLACEHOLDER_SIDE: u32 = 10;
const PLACEHOLDER_SIGMA: f32 = 1.0;
/// Histogram bins per channel used for the dominant color.
const COLOR_BINS: u32 = 16;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode {size} rendition: {source}")]
    Encode {
        size: &'static str,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenditionSize {
    Thumbnail,
    Small,
    Medium,
    Large,
    Original,
}

impl RenditionSize {
    pub const ALL: [RenditionSize; 5] = [
        RenditionSize::Thumbnail,
        RenditionSize::Small,
        RenditionSize::Medium,
        RenditionSize::Large,
        RenditionSize::Original,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            RenditionSize::Thumbnail => "thumbnail",
            RenditionSize::Small => "small",
            RenditionSize::Medium => "medium",
            RenditionSize::Large => "large",
            RenditionSize::Original => "original",
        }
    }

    /// Target (width, height); renditions are cropped to exactly this box.
    pub const fn dimensions(&self) -> (u32, u32) {
        match self {
            RenditionSize::Thumbnail => (150, 150),
            RenditionSize::Small => (400, 400),
            RenditionSize::Medium => (800, 800),
            RenditionSize::Large => (1200, 1200),
            RenditionSize::Original => (2000, 2000),
        }
    }

    /// `{base}-{size}.webp`
    pub fn file_name(&self, base_filename: &str) -> String {
        format!("{base_filename}-{}.{OUTPUT_FORMAT}", self.name())
    }
}

#[derive(Debug, Clone)]
pub struct EncodedRendition {
    pub size: RenditionSize,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub renditions: Vec<EncodedRendition>,
    /// `data:image/webp;base64,...`
    pub blur_placeholder: String,
    /// `rgb(r, g, b)`
    pub dominant_color: String,
}

impl TransformOutput {
    pub fn rendition(&self, size: RenditionSize) -> Option<&EncodedRendition> {
        self.renditions.iter().find(|r| r.size == size)
    }
}

fn encode_webp(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
    let mut buf = Cursor::new(Vec::new());
    rgba.write_with_encoder(WebPEncoder::new_lossless(&mut buf))?;
    Ok(buf.into_inner())
}

/// Most populated bin of a 16x16x16 RGB histogram, reported as the bin center.
pub fn dominant_color(image: &DynamicImage) -> String {
    let step = 256 / COLOR_BINS;
    let mut histogram = vec![0u32; (COLOR_BINS * COLOR_BINS * COLOR_BINS) as usize];
    for pixel in image.to_rgb8().pixels() {
        let [r, g, b] = pixel.0;
        let idx = (u32::from(r) / step) * COLOR_BINS * COLOR_BINS
            + (u32::from(g) / step) * COLOR_BINS
            + u32::from(b) / step;
        histogram[idx as usize] += 1;
    }

    let (best, _) = histogram
        .iter()
        .enumerate()
        .max_by_key(|(idx, count)| (**count, std::cmp::Reverse(*idx)))
        .unwrap_or((0, &0));

    let best = best as u32;
    let r = (best / (COLOR_BINS * COLOR_BINS)) * step + step / 2;
    let g = ((best / COLOR_BINS) % COLOR_BINS) * step + step / 2;
    let b = (best % COLOR_BINS) * step + step / 2;
    format!("rgb({r}, {g}, {b})")
}

pub fn blur_placeholder(image: &DynamicImage) -> Result<String, image::ImageError> {
    let tiny = image
        .resize_to_fill(PLACEHOLDER_SIDE, PLACEHOLDER_SIDE, FilterType::Triangle)
        .blur(PLACEHOLDER_SIGMA);
    let bytes = encode_webp(&tiny)?;
    Ok(format!("data:image/webp;base64,{}", STANDARD.encode(bytes)))
}

/// Decode `data` and produce every rendition. Fails as a whole: callers get
/// either all five renditions or an error, never a partial set.
pub fn transform(data: &[u8]) -> Result<TransformOutput, TransformError> {
    let source = image::load_from_memory(data).map_err(TransformError::Decode)?;
    tracing::debug!(
        width = source.width(),
        height = source.height(),
        "decoded upload"
    );

    let mut renditions = Vec::with_capacity(RenditionSize::ALL.len());
    let mut dominant = None;
    for size in RenditionSize::ALL {
        let (width, height) = size.dimensions();
        let resized = source.resize_to_fill(width, height, FilterType::Lanczos3);
        if size == RenditionSize::Medium {
            dominant = Some(dominant_color(&resized));
        }
        let data = encode_webp(&resized).map_err(|source| TransformError::Encode {
            size: size.name(),
            source,
        })?;
        let (width, height) = resized.dimensions();
        renditions.push(EncodedRendition {
            size,
            width,
            height,
            data,
        });
    }

    let blur_placeholder =
        blur_placeholder(&source).map_err(|source| TransformError::Encode {
            size: "placeholder",
            source,
        })?;

    Ok(TransformOutput {
        renditions,
        blur_placeholder,
        dominant_color: dominant.unwrap_or_else(|| dominant_color(&source)),
    })
}

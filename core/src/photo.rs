//! Photo inputs and pre-upload normalization.
//!
//! # Design
//! Every photo endpoint takes base64-encoded JPEG. Before encoding, each
//! image is brought under a raw pixel-data budget (`width * height *
//! bytes_per_pixel`, 2,000,000 bytes by default) in a single proportional
//! resize:
//!
//! ```text
//! pixels = budget / bpp
//! h'     = floor(sqrt(pixels / aspect))
//! w'     = floor(h' * aspect)
//! ```
//!
//! Images already under the budget pass through untouched. If the resize
//! would exceed the allocation ceiling, one retry is made from a 1/8-scale
//! nearest-neighbour reduction; if that still does not fit, the call fails
//! with [`ApiError::Resource`]. There is no loop.

use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageError, ImageReader, Limits};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 2_000_000;
pub const DEFAULT_MAX_ALLOC: u64 = 512 * 1024 * 1024;
const JPEG_QUALITY: u8 = 100;
const FALLBACK_SCALE: u32 = 8;

/// An image to upload.
///
/// `Image` is for callers that already hold decoded pixels and cannot be
/// expressed in JSON. `Base64` must be standard-alphabet base64 of an
/// encoded image; it is decoded so the budget still applies.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Photo {
    #[serde(skip)]
    Image(DynamicImage),
    Bytes(Vec<u8>),
    Path(PathBuf),
    Base64(String),
}

impl fmt::Debug for Photo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Photo::Image(img) => write!(f, "Photo::Image({}x{})", img.width(), img.height()),
            Photo::Bytes(bytes) => write!(f, "Photo::Bytes({} bytes)", bytes.len()),
            Photo::Path(path) => write!(f, "Photo::Path({})", path.display()),
            Photo::Base64(data) => write!(f, "Photo::Base64({} chars)", data.len()),
        }
    }
}

impl Photo {
    /// Cheap structural check; no decoding.
    pub fn validate(&self) -> Result<(), ApiError> {
        match self {
            Photo::Image(img) if img.width() == 0 || img.height() == 0 => {
                Err(ApiError::InvalidImage("image has a zero dimension".into()))
            }
            Photo::Bytes(bytes) if bytes.is_empty() => Err(ApiError::InvalidImage("image bytes are empty".into())),
            Photo::Path(path) if path.as_os_str().is_empty() => {
                Err(ApiError::InvalidImage("image path is empty".into()))
            }
            Photo::Base64(data) if data.trim().is_empty() => {
                Err(ApiError::InvalidImage("base64 image is empty".into()))
            }
            _ => Ok(()),
        }
    }

    /// Decode into pixels, refusing allocations above `max_alloc`.
    pub fn load(&self, max_alloc: u64) -> Result<DynamicImage, ApiError> {
        self.validate()?;
        let mut limits = Limits::default();
        limits.max_alloc = Some(max_alloc);
        match self {
            Photo::Image(img) => Ok(img.clone()),
            Photo::Bytes(bytes) => decode(bytes, limits),
            Photo::Base64(data) => {
                let bytes = STANDARD
                    .decode(data.trim())
                    .map_err(|e| ApiError::InvalidImage(format!("invalid base64: {e}")))?;
                decode(&bytes, limits)
            }
            Photo::Path(path) => {
                let mut reader = ImageReader::open(path)
                    .map_err(|e| ApiError::InvalidImage(format!("{}: {e}", path.display())))?
                    .with_guessed_format()
                    .map_err(|e| ApiError::InvalidImage(format!("{}: {e}", path.display())))?;
                reader.limits(limits);
                reader.decode().map_err(image_error)
            }
        }
    }
}

fn decode(bytes: &[u8], limits: Limits) -> Result<DynamicImage, ApiError> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ApiError::InvalidImage(e.to_string()))?;
    reader.limits(limits);
    reader.decode().map_err(image_error)
}

fn image_error(err: ImageError) -> ApiError {
    match err {
        ImageError::Limits(e) => ApiError::Resource(e.to_string()),
        other => ApiError::InvalidImage(other.to_string()),
    }
}

/// Raw decoded size of `image` in bytes.
pub fn raw_size(image: &DynamicImage) -> u64 {
    let (w, h) = image.dimensions();
    u64::from(w) * u64::from(h) * u64::from(image.color().bytes_per_pixel())
}

/// Largest dimensions with the same aspect ratio whose raw size fits `budget`.
///
/// Never returns a zero dimension and never upscales.
pub fn target_dimensions(width: u32, height: u32, bytes_per_pixel: u8, budget: u64) -> (u32, u32) {
    let bpp = u64::from(bytes_per_pixel.max(1));
    let pixels = (budget / bpp).max(1);
    let aspect = f64::from(width) / f64::from(height);

    let h = ((pixels as f64 / aspect).sqrt().floor() as u64).clamp(1, u64::from(height));
    let w = ((h as f64 * aspect).floor() as u64)
        .min(pixels / h)
        .clamp(1, u64::from(width));
    (w as u32, h as u32)
}

/// Brings images under the upload budget and encodes them.
#[derive(Debug, Clone, Copy)]
pub struct ImageNormalizer {
    budget: u64,
    max_alloc: u64,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IMAGE_BYTES)
    }
}

impl ImageNormalizer {
    pub fn new(budget: u64) -> Self {
        Self {
            budget: budget.max(1),
            max_alloc: DEFAULT_MAX_ALLOC,
        }
    }

    pub fn with_max_alloc(mut self, max_alloc: u64) -> Self {
        self.max_alloc = max_alloc;
        self
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// Load, fit and encode one photo as base64 JPEG.
    pub fn prepare(&self, photo: &Photo) -> Result<String, ApiError> {
        let image = photo.load(self.max_alloc)?;
        let fitted = self.fit(image)?;
        encode_jpeg_base64(&fitted)
    }

    /// Resize `image` so its raw size is at most the budget.
    pub fn fit(&self, image: DynamicImage) -> Result<DynamicImage, ApiError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ApiError::InvalidImage("image has a zero dimension".into()));
        }
        if raw_size(&image) <= self.budget {
            return Ok(image);
        }

        let bpp = image.color().bytes_per_pixel();
        let (w, h) = target_dimensions(width, height, bpp, self.budget);
        if self.resize_cost(&image, w, h) <= self.max_alloc {
            tracing::debug!(width, height, w, h, "downscaling image to fit upload budget");
            return Ok(image.resize_exact(w, h, FilterType::Triangle));
        }

        tracing::warn!(
            width,
            height,
            max_alloc = self.max_alloc,
            "image resize exceeds allocation limit, retrying from 1/8 scale"
        );
        let small = image.resize_exact(
            (width / FALLBACK_SCALE).max(1),
            (height / FALLBACK_SCALE).max(1),
            FilterType::Nearest,
        );
        drop(image);
        if raw_size(&small) <= self.budget {
            return Ok(small);
        }
        let (sw, sh) = small.dimensions();
        let (w, h) = target_dimensions(sw, sh, bpp, self.budget);
        if self.resize_cost(&small, w, h) > self.max_alloc {
            return Err(ApiError::Resource(format!(
                "{width}x{height} image cannot be reduced within {} bytes of memory",
                self.max_alloc
            )));
        }
        Ok(small.resize_exact(w, h, FilterType::Triangle))
    }

    // Separable resize keeps an f32 intermediate of `w x source_height`.
    fn resize_cost(&self, image: &DynamicImage, w: u32, h: u32) -> u64 {
        let channels = u64::from(image.color().channel_count());
        let intermediate = u64::from(w) * u64::from(image.height()) * channels * 4;
        let output = u64::from(w) * u64::from(h) * u64::from(image.color().bytes_per_pixel());
        intermediate + output
    }
}

/// Encode as JPEG (quality 100, RGB) and then standard base64.
pub fn encode_jpeg_base64(image: &DynamicImage) -> Result<String, ApiError> {
    let rgb = image.to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(image_error)?;
    Ok(STANDARD.encode(jpeg))
}

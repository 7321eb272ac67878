//! Per-variant image normalization
//!
//! Every image is compressed on its own blocking task and the batch waits for
//! all of them to settle. A failed compression passes the original bytes
//! through, so the output always lines up index-for-index with the input.

use futures::future::join_all;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use crate::config::MediaConfig;
use crate::domain::aggregates::VariantImage;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawImageInput {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedImage {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    /// `false` when the original bytes were passed through.
    pub compressed: bool,
    pub original_size: usize,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl NormalizedImage {
    /// Gallery entry for this image once the caller has stored it at `url`.
    /// The file stem becomes the alt text; the position is set on attach.
    pub fn to_variant_image(&self, url: impl Into<String>) -> VariantImage {
        let alt = Path::new(&self.file_name).file_stem().map(|s| s.to_string_lossy().into_owned()).filter(|s| !s.is_empty());
        VariantImage { url: url.into(), alt, position: 0 }
    }

    fn compressed(input: RawImageInput, output: CompressedImage) -> Self {
        let file_name = Path::new(&input.file_name).with_extension("jpg").to_string_lossy().into_owned();
        Self {
            file_name, content_type: Some("image/jpeg".into()), original_size: input.bytes.len(), bytes: output.bytes,
            compressed: true, width: Some(output.width), height: Some(output.height),
        }
    }

    fn passthrough(input: RawImageInput) -> Self {
        Self {
            original_size: input.bytes.len(), file_name: input.file_name, content_type: input.content_type, bytes: input.bytes,
            compressed: false, width: None, height: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressedImage { pub bytes: Vec<u8>, pub width: u32, pub height: u32 }

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("Empty image")]
    Empty,
    #[error("Invalid image: {0}")]
    Decode(String),
    #[error("Image compression failed: {0}")]
    Encode(String),
    #[error("Compressed output is not smaller than the original")]
    NotSmaller,
    #[error("Compression task failed: {0}")]
    TaskFailed(String),
}

/// CPU-bound compression of a single image.
pub trait ImageCompressor: Send + Sync + 'static {
    fn compress(&self, input: &RawImageInput) -> Result<CompressedImage, MediaError>;
}

/// Decodes any supported format, downscales to fit `max_dimension` and
/// re-encodes as JPEG.
#[derive(Clone, Copy, Debug)]
pub struct JpegCompressor { quality: u8, max_dimension: u32 }

impl JpegCompressor {
    pub fn new(quality: u8, max_dimension: u32) -> Self { Self { quality: quality.clamp(1, 100), max_dimension: max_dimension.max(1) } }
}

impl Default for JpegCompressor {
    fn default() -> Self { Self::from(&MediaConfig::default()) }
}

impl From<&MediaConfig> for JpegCompressor {
    fn from(config: &MediaConfig) -> Self { Self::new(config.jpeg_quality, config.max_dimension) }
}

impl ImageCompressor for JpegCompressor {
    fn compress(&self, input: &RawImageInput) -> Result<CompressedImage, MediaError> {
        if input.bytes.is_empty() { return Err(MediaError::Empty); }
        let img = image::load_from_memory(&input.bytes).map_err(|e| MediaError::Decode(e.to_string()))?;
        let oversized = img.width() > self.max_dimension || img.height() > self.max_dimension;
        let img = if oversized { img.resize(self.max_dimension, self.max_dimension, FilterType::Triangle) } else { img };

        let mut buffer = Vec::new();
        {
            let mut cursor = Cursor::new(&mut buffer);
            let rgb_img = img.to_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut cursor, self.quality);
            rgb_img.write_with_encoder(encoder).map_err(|e| MediaError::Encode(e.to_string()))?;
        }

        if !oversized && buffer.len() >= input.bytes.len() { return Err(MediaError::NotSmaller); }
        Ok(CompressedImage { bytes: buffer, width: img.width(), height: img.height() })
    }
}

pub struct VariantMediaPipeline<C: ImageCompressor = JpegCompressor> {
    compressor: Arc<C>,
    max_concurrency: usize,
}

impl VariantMediaPipeline<JpegCompressor> {
    pub fn from_config(config: &MediaConfig) -> Self { Self::new(JpegCompressor::from(config), config.max_concurrency) }
}

impl<C: ImageCompressor> VariantMediaPipeline<C> {
    pub fn new(compressor: C, max_concurrency: usize) -> Self {
        Self { compressor: Arc::new(compressor), max_concurrency: max_concurrency.max(1) }
    }

    /// Never fails: empty input yields empty output, and per-image failures
    /// (including task panics) fall back to the original image.
    pub async fn normalize(&self, images: Vec<RawImageInput>) -> Vec<NormalizedImage> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let tasks = images.into_iter().enumerate().map(|(index, image)| {
            let semaphore = Arc::clone(&semaphore);
            let compressor = Arc::clone(&self.compressor);
            async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let input = Arc::new(image);
                let task_input = Arc::clone(&input);
                let outcome = match tokio::task::spawn_blocking(move || compressor.compress(&task_input)).await {
                    Ok(result) => result,
                    Err(e) => Err(MediaError::TaskFailed(e.to_string())),
                };
                let input = Arc::try_unwrap(input).unwrap_or_else(|shared| (*shared).clone());
                match outcome {
                    Ok(output) => {
                        debug!(index, file = %input.file_name, before = input.bytes.len(), after = output.bytes.len(), "Compressed variant image");
                        NormalizedImage::compressed(input, output)
                    }
                    Err(MediaError::NotSmaller) => {
                        debug!(index, file = %input.file_name, "Keeping original image, compression would not shrink it");
                        NormalizedImage::passthrough(input)
                    }
                    Err(e) => {
                        warn!(index, file = %input.file_name, error = %e, "Image compression failed, using original");
                        NormalizedImage::passthrough(input)
                    }
                }
            }
        });
        join_all(tasks).await
    }
}

//! Shrinking oversized images before upload.

use bytes::Bytes;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use portal_common::UploadConfig;

use crate::error::IngestError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DownsampleOptions {
    /// Files strictly larger than this are downsampled.
    pub threshold_bytes: u64,
    /// Longest edge after resizing.
    pub max_edge_px: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
}

impl Default for DownsampleOptions {
    fn default() -> Self {
        Self::from(&UploadConfig::default())
    }
}

impl From<&UploadConfig> for DownsampleOptions {
    fn from(config: &UploadConfig) -> Self {
        Self {
            threshold_bytes: config.size_threshold_bytes,
            max_edge_px: config.max_edge_px,
            quality: config.jpeg_quality.clamp(1, 100),
        }
    }
}

/// Bytes ready to upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedImage {
    pub data: Bytes,
    pub mime: String,
    pub downsampled: bool,
}

/// Decode, fit within `max_edge` preserving aspect ratio, and re-encode as JPEG.
pub fn downsample(data: &[u8], max_edge: u32, quality: u8) -> Result<Vec<u8>, IngestError> {
    let img = image::load_from_memory(data).map_err(|e| IngestError::Downsample(e.to_string()))?;
    let img = if img.width().max(img.height()) > max_edge {
        img.resize(max_edge, max_edge, FilterType::Lanczos3)
    } else {
        img
    };
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
        .map_err(|e| IngestError::Downsample(e.to_string()))?;
    Ok(out)
}

/// Downsample `data` if it is over the threshold.
///
/// Re-encoding runs on the blocking pool. Any failure falls back to the
/// original bytes; it never fails the upload.
pub async fn prepare(
    name: &str,
    data: Bytes,
    mime: String,
    options: DownsampleOptions,
) -> PreparedImage {
    if (data.len() as u64) <= options.threshold_bytes {
        return PreparedImage {
            data,
            mime,
            downsampled: false,
        };
    }

    let input = data.clone();
    let result = tokio::task::spawn_blocking(move || {
        downsample(&input, options.max_edge_px, options.quality)
    })
    .await;

    match result {
        Ok(Ok(jpeg)) => {
            tracing::debug!(file = name, before = data.len(), after = jpeg.len(), "downsampled");
            PreparedImage {
                data: Bytes::from(jpeg),
                mime: "image/jpeg".to_string(),
                downsampled: true,
            }
        }
        Ok(Err(err)) => {
            tracing::warn!(file = name, error = %err, "uploading original");
            PreparedImage {
                data,
                mime,
                downsampled: false,
            }
        }
        Err(err) => {
            tracing::warn!(file = name, error = %err, "downsample task failed, uploading original");
            PreparedImage {
                data,
                mime,
                downsampled: false,
            }
        }
    }
}

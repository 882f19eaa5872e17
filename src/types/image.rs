//! Image payloads and up-front input validation.

use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use sha2::{Digest, Sha256};

/// Default upper bound for a single image payload (10 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Image container formats recognised from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Bmp,
    Heic,
    Avif,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
            Self::Heic => "heic",
            Self::Avif => "avif",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Heic => "image/heic",
            Self::Avif => "image/avif",
        }
    }

    /// Sniff the container format from the leading bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }
        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            return Some(Self::Webp);
        }
        if bytes.starts_with(b"BM") && bytes.len() >= 14 {
            return Some(Self::Bmp);
        }
        // ISO-BMFF: size(4) "ftyp" brand(4)
        if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
            return match &bytes[8..12] {
                b"heic" | b"heix" | b"hevc" | b"heim" | b"heis" | b"mif1" | b"msf1" => {
                    Some(Self::Heic)
                }
                b"avif" | b"avis" => Some(Self::Avif),
                _ => None,
            };
        }
        None
    }
}

/// A single image submitted for classification.
///
/// `file_name` is optional and only consulted by the emergency fallback heuristic.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Bytes,
    pub file_name: Option<String>,
}

impl ImagePayload {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Read an image from disk, keeping the file name for the fallback heuristic.
    pub async fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let mut payload = Self::new(bytes);
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            payload = payload.with_file_name(name);
        }
        Ok(payload)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::detect(&self.bytes)
    }

    /// SHA-256 of the payload, hex encoded. Used for log correlation only.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.bytes);
        format!("{:x}", digest)
    }

    /// Reject payloads that must never reach a provider.
    pub fn validate(&self, max_bytes: usize) -> Result<ImageFormat> {
        if self.is_empty() {
            return Err(Error::invalid_input_with_context(
                "image payload is empty",
                ErrorContext::new()
                    .with_field_path("image.bytes")
                    .with_source("image_validator"),
            ));
        }
        if self.len() > max_bytes {
            return Err(Error::invalid_input_with_context(
                "image payload exceeds the size limit",
                ErrorContext::new()
                    .with_field_path("image.bytes")
                    .with_details(format!("{} bytes > {} bytes", self.len(), max_bytes))
                    .with_source("image_validator"),
            ));
        }
        self.format().ok_or_else(|| {
            Error::invalid_input_with_context(
                "payload is not a recognised image format",
                ErrorContext::new()
                    .with_field_path("image.bytes")
                    .with_details("expected jpeg, png, gif, webp, bmp, heic or avif")
                    .with_source("image_validator"),
            )
        })
    }
}

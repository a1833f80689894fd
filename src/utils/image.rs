//! Image decoding utilities.
//!
//! This module turns the inputs accepted by the classifier (a file path or an
//! in-memory encoded buffer) into decoded images. Any format supported by the
//! `image` crate is accepted.

use crate::core::errors::{EffNetError, EffNetResult};
use image::DynamicImage;
use std::path::{Path, PathBuf};

/// Where an input image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// An image file on disk.
    Path(PathBuf),
    /// An encoded image (PNG, JPEG, ...) already in memory.
    Bytes(Vec<u8>),
}

impl ImageSource {
    /// Decodes the source into an image.
    ///
    /// # Errors
    ///
    /// Returns [`EffNetError::ImageDecode`] if the file cannot be read or the
    /// data is not a supported image.
    pub fn decode(&self) -> EffNetResult<DynamicImage> {
        match self {
            ImageSource::Path(path) => load_image(path),
            ImageSource::Bytes(bytes) => load_image_from_memory(bytes),
        }
    }

    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<&str> for ImageSource {
    fn from(path: &str) -> Self {
        ImageSource::Path(PathBuf::from(path))
    }
}

impl From<String> for ImageSource {
    fn from(path: String) -> Self {
        ImageSource::Path(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

impl From<&[u8]> for ImageSource {
    fn from(bytes: &[u8]) -> Self {
        ImageSource::Bytes(bytes.to_vec())
    }
}

/// Loads an image from a file path.
///
/// # Arguments
///
/// * `path` - Path of the image file to load
///
/// # Errors
///
/// Returns [`EffNetError::ImageDecode`] if the file is missing, unreadable or
/// not a supported image format.
pub fn load_image(path: &Path) -> EffNetResult<DynamicImage> {
    image::open(path).map_err(EffNetError::ImageDecode)
}

/// Decodes an image from an encoded in-memory buffer.
///
/// # Errors
///
/// Returns [`EffNetError::ImageDecode`] if the buffer is not a supported image.
pub fn load_image_from_memory(bytes: &[u8]) -> EffNetResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(EffNetError::ImageDecode)
}

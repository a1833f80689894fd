//! Image preparation for EfficientNet inference.

use super::crop_resize::CenterCrop;
use super::normalization::{PixelNormalization, TensorEncoder};
use crate::core::Tensor4D;
use crate::core::errors::EffNetResult;
use image::{DynamicImage, RgbaImage};

/// Turns a decoded image into the normalized tensor for a given resolution.
///
/// Preparation is deterministic and holds no state between calls, so a single
/// instance can be shared freely across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePreprocessor {
    crop: CenterCrop,
    encoder: TensorEncoder,
}

impl ImagePreprocessor {
    /// Creates a preprocessor with the standard crop and the given normalization.
    pub fn new(normalization: PixelNormalization) -> Self {
        Self {
            crop: CenterCrop::new(),
            encoder: TensorEncoder::new(normalization),
        }
    }

    /// Replaces the crop stage.
    pub fn with_crop(mut self, crop: CenterCrop) -> Self {
        self.crop = crop;
        self
    }

    /// Center-crops and resizes to `resolution x resolution`.
    pub fn crop_and_resize(&self, image: &RgbaImage, resolution: u32) -> EffNetResult<RgbaImage> {
        self.crop.apply(image, resolution)
    }

    /// Encodes an already prepared image.
    pub fn create_tensor(&self, image: &RgbaImage) -> EffNetResult<Tensor4D> {
        self.encoder.encode(image)
    }

    /// Runs both stages, producing a `[1, resolution, resolution, 3]` tensor.
    pub fn prepare(&self, image: &DynamicImage, resolution: u32) -> EffNetResult<Tensor4D> {
        let rgba = image.to_rgba8();
        let resized = self.crop_and_resize(&rgba, resolution)?;
        self.create_tensor(&resized)
    }
}

//! Pixel normalization and tensor encoding.
//!
//! Converts an RGBA image into the dense `[1, H, W, 3]` float tensor the
//! classifier consumes. Pixels are visited in raster order (top to bottom,
//! left to right) and written channel-interleaved as R, G, B. Alpha is read
//! and dropped.

use crate::core::Tensor4D;
use crate::core::constants::NUM_CHANNELS;
use crate::core::errors::{EffNetError, EffNetResult, ProcessingStage};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// How each 8-bit channel value is mapped to a float.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelNormalization {
    /// `(c - 1) / 127` truncated toward zero.
    ///
    /// Collapses the byte range onto the integers `{0, 1, 2}`: `0` for
    /// `0..=127`, `1` for `128..=254` and `2` for `255`. Black truncates from
    /// `-1/127` to `0`, never to `-1`. This is the quantization the published
    /// checkpoints were exercised with and is reproduced exactly.
    #[default]
    Quantized,
    /// `(c - 127.5) / 127.5`, the conventional mapping into `[-1, 1]`.
    Symmetric,
}

impl PixelNormalization {
    /// Normalizes a single channel value.
    #[inline]
    pub fn apply(self, channel: u8) -> f32 {
        let c = f32::from(channel);
        match self {
            // `+ 0.0` turns the `-0.0` produced for black into `+0.0`.
            PixelNormalization::Quantized => ((c - 1.0) / 127.0).trunc() + 0.0,
            PixelNormalization::Symmetric => (c - 127.5) / 127.5,
        }
    }
}

/// Encodes prepared images into model input tensors.
#[derive(Debug, Clone, Copy, Default)]
pub struct TensorEncoder {
    normalization: PixelNormalization,
}

impl TensorEncoder {
    /// Creates an encoder with the given normalization.
    pub fn new(normalization: PixelNormalization) -> Self {
        Self { normalization }
    }

    /// The normalization in use.
    pub fn normalization(&self) -> PixelNormalization {
        self.normalization
    }

    /// Encodes `image` as a `[1, height, width, 3]` tensor.
    pub fn encode(&self, image: &RgbaImage) -> EffNetResult<Tensor4D> {
        let (width, height) = image.dimensions();
        let mut values = Vec::with_capacity(width as usize * height as usize * NUM_CHANNELS);
        for pixel in image.pixels() {
            let [r, g, b, _alpha] = pixel.0;
            values.push(self.normalization.apply(r));
            values.push(self.normalization.apply(g));
            values.push(self.normalization.apply(b));
        }

        Tensor4D::from_shape_vec(
            (1, height as usize, width as usize, NUM_CHANNELS),
            values,
        )
        .map_err(|e| {
            EffNetError::processing_error(
                ProcessingStage::TensorOperation,
                format!("failed to shape {width}x{height} image into a tensor"),
                e,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_quantized_values() {
        let n = PixelNormalization::Quantized;
        assert_eq!(n.apply(0), 0.0);
        assert_eq!(n.apply(1), 0.0);
        assert_eq!(n.apply(127), 0.0);
        assert_eq!(n.apply(128), 1.0);
        assert_eq!(n.apply(254), 1.0);
        assert_eq!(n.apply(255), 2.0);
    }

    #[test]
    fn test_quantized_range_over_all_bytes() {
        let n = PixelNormalization::Quantized;
        for c in 0..=255u8 {
            let v = n.apply(c);
            assert!([0.0, 1.0, 2.0].contains(&v), "c = {c} -> {v}");
            if c <= 127 {
                assert_eq!(v, 0.0, "c = {c}");
            }
        }
    }

    #[test]
    fn test_quantized_black_is_positive_zero() {
        let v = PixelNormalization::Quantized.apply(0);
        assert_eq!(v.to_bits(), 0.0f32.to_bits());
        assert!(v.is_sign_positive());
    }

    #[test]
    fn test_symmetric_bounds() {
        let n = PixelNormalization::Symmetric;
        assert_eq!(n.apply(0), -1.0);
        assert_eq!(n.apply(255), 1.0);
    }

    #[test]
    fn test_encode_shape_and_order() {
        let mut image = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        image.put_pixel(1, 0, Rgba([255, 128, 1, 0]));
        let tensor = TensorEncoder::new(PixelNormalization::Quantized)
            .encode(&image)
            .unwrap();

        assert_eq!(tensor.shape(), &[1, 2, 2, 3]);
        assert_eq!(tensor.len(), 2 * 2 * 3);
        // Row 0, column 1 holds the distinct pixel; alpha is ignored.
        assert_eq!(tensor[[0, 0, 1, 0]], 2.0);
        assert_eq!(tensor[[0, 0, 1, 1]], 1.0);
        assert_eq!(tensor[[0, 0, 1, 2]], 0.0);
        assert_eq!(tensor[[0, 1, 0, 0]], 0.0);
        let flat: Vec<f32> = tensor.iter().copied().collect();
        assert_eq!(&flat[3..6], &[2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_encode_length_for_resolution() {
        let image = RgbaImage::from_pixel(224, 224, Rgba([90, 90, 90, 255]));
        let tensor = TensorEncoder::default().encode(&image).unwrap();
        assert_eq!(tensor.len(), 224 * 224 * 3);
        assert!(tensor.iter().all(|&v| v == 0.0));
    }
}

//! Image processing and score decoding.
//!
//! * [`crop_resize`] - padded center crop and bicubic resize
//! * [`normalization`] - pixel normalization and tensor encoding
//! * [`preprocess`] - the composed [`ImagePreprocessor`]
//! * [`decode`] - top-k ranking and labelling of raw scores

pub mod crop_resize;
pub mod decode;
pub mod normalization;
pub mod preprocess;

pub use crop_resize::{CenterCrop, CropWindow};
pub use decode::{ResultDecoder, validate_top_k};
pub use normalization::{PixelNormalization, TensorEncoder};
pub use preprocess::ImagePreprocessor;

//! The core module of the classification pipeline.
//!
//! This module contains the fundamental components shared by every stage:
//! - Configuration validation and ONNX Runtime settings
//! - Constants used throughout the pipeline
//! - Error handling
//! - Inference engine and model loader seams, with the ONNX Runtime backend
//!
//! It also provides re-exports of commonly used types for convenience.

pub mod config;
pub mod constants;
pub mod errors;
pub mod inference;

pub use crate::utils::init_tracing;
pub use config::{ConfigError, ConfigValidator, ConfigValidatorExt, OrtSessionConfig};
pub use constants::*;
pub use errors::{EffNetError, EffNetResult, ProcessingStage};
pub use inference::{
    InferenceEngine, ModelFetcher, ModelLoader, NoProgress, OrtInfer, OrtModelLoader,
    ProgressObserver,
};

/// Dense `[batch, height, width, channels]` input tensor.
pub type Tensor4D = ndarray::Array4<f32>;

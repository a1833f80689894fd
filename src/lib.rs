//! # EfficientNet ORT
//!
//! Image classification with the pretrained EfficientNet checkpoints `B0`
//! through `B7`, running on ONNX Runtime.
//!
//! ## Features
//!
//! - Checkpoint resolution to a remote URL or a local model directory
//! - Center crop and resize to the checkpoint's native resolution
//! - Pixel normalization into a `[1, R, R, 3]` tensor
//! - Top-k decoding with locale-specific label tables
//! - Pooled ONNX Runtime sessions for concurrent inference
//!
//! ## Modules
//!
//! * [`core`] - Error handling, configuration validation and the inference seams
//! * [`domain`] - Checkpoints, model sources, label tables and predictions
//! * [`predictor`] - The [`EfficientNetModel`](predictor::EfficientNetModel) classifier
//! * [`processors`] - Cropping, normalization and result decoding
//! * [`utils`] - Image loading and tracing setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use efficientnet::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EfficientNetConfig {
//!     checkpoint: 0,
//!     local_model_root: Some("models".into()),
//!     model_file_name: "model.onnx".into(),
//!     labels_dir: Some("labels".into()),
//!     ..Default::default()
//! };
//! let model = EfficientNetModel::from_config(&config)?;
//! model.load_with_progress(&|p: f32| println!("loading {p:.0}%"))?;
//!
//! let result = model.inference(InferenceRequest::new("panda.jpg").top_k(3))?;
//! for prediction in &result {
//!     println!("{}: {:.3}", prediction.label, prediction.score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod domain;
pub mod predictor;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use efficientnet::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        EffNetError, EffNetResult, InferenceEngine, ModelLoader, NoProgress, OrtModelLoader,
        ProgressObserver,
    };
    pub use crate::domain::{Checkpoint, Classification, LabelTable, ModelSource, Prediction};
    pub use crate::predictor::{EfficientNetConfig, EfficientNetModel, InferenceRequest};
    pub use crate::processors::PixelNormalization;
    pub use crate::utils::{ImageSource, init_tracing, load_image};
}

//! Error types for the classification pipeline.
//!
//! This module defines the errors that can occur while resolving a checkpoint,
//! loading a model, preparing an image, running inference and decoding the
//! scores. It also provides constructors for building these errors with
//! appropriate context.

use std::path::PathBuf;
use thiserror::Error;

/// Enum representing different stages of processing in the pipeline.
///
/// This enum is used to identify which stage an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Error occurred while cropping the source image.
    Crop,
    /// Error occurred during image resizing.
    Resize,
    /// Error occurred during pixel normalization.
    Normalization,
    /// Error occurred during tensor operations.
    TensorOperation,
    /// Error occurred while decoding raw scores.
    PostProcessing,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Crop => write!(f, "crop"),
            ProcessingStage::Resize => write!(f, "resize"),
            ProcessingStage::Normalization => write!(f, "normalization"),
            ProcessingStage::TensorOperation => write!(f, "tensor operation"),
            ProcessingStage::PostProcessing => write!(f, "post-processing"),
        }
    }
}

/// Enum representing the errors that can occur in the classification pipeline.
#[derive(Error, Debug)]
pub enum EffNetError {
    /// The checkpoint ordinal is outside `0..=7`.
    #[error("invalid checkpoint {value}: expected an ordinal in 0..=7")]
    InvalidCheckpoint {
        /// The rejected ordinal.
        value: i64,
    },

    /// The model could not be retrieved or deserialized.
    #[error("failed to load model from '{source_desc}': {context}")]
    ModelLoad {
        /// Human readable description of the model source.
        source_desc: String,
        /// Additional context about the failure.
        context: String,
        /// The underlying error, when there is one.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Inference was requested before a successful `load()`.
    #[error("model is not loaded; call load() before inference")]
    ModelNotLoaded,

    /// The image source could not be read or decoded.
    #[error("failed to decode image")]
    ImageDecode(#[source] image::ImageError),

    /// The image is too small for the center crop required by the resolution.
    #[error(
        "invalid image dimensions {width}x{height} for resolution {resolution}: {message}"
    )]
    InvalidImageDimensions {
        /// Source image width.
        width: u32,
        /// Source image height.
        height: u32,
        /// Target model resolution.
        resolution: u32,
        /// What went wrong.
        message: String,
    },

    /// The requested number of predictions is not positive.
    #[error("invalid top-k {top_k}: must be greater than 0")]
    InvalidTopK {
        /// The rejected value.
        top_k: i64,
    },

    /// No label table exists for the requested locale.
    #[error("unsupported locale '{locale}'")]
    UnsupportedLocale {
        /// The requested locale.
        locale: String,
    },

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred inside the inference engine.
    #[error("inference failed for model '{model_name}': {context}")]
    Inference {
        /// Name of the model that failed.
        model_name: String,
        /// Additional context about the failure.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("json")]
    Json(#[from] serde_json::Error),
}

/// Convenient result alias for pipeline operations.
pub type EffNetResult<T> = Result<T, EffNetError>;

/// A plain message error used as the source of contextual errors that have no
/// underlying library error.
#[derive(Debug)]
pub struct SimpleError(String);

impl SimpleError {
    /// Creates a new error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for SimpleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for SimpleError {}

impl EffNetError {
    /// Creates a `ModelLoad` error for a local model file.
    ///
    /// # Arguments
    ///
    /// * `path` - The model path that failed to load.
    /// * `context` - What was being attempted.
    /// * `error` - The underlying error, if any.
    pub fn model_load_error(
        path: impl Into<PathBuf>,
        context: impl Into<String>,
        error: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        Self::ModelLoad {
            source_desc: path.into().display().to_string(),
            context: context.into(),
            source: error.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Creates a `ModelLoad` error with only a message.
    pub fn model_load_message(source_desc: impl Into<String>, context: impl Into<String>) -> Self {
        Self::ModelLoad {
            source_desc: source_desc.into(),
            context: context.into(),
            source: None,
        }
    }

    /// Creates an `Inference` error.
    ///
    /// # Arguments
    ///
    /// * `model_name` - Name of the model being run.
    /// * `context` - Additional context about the failure.
    /// * `error` - The underlying error that caused this error.
    pub fn inference_error(
        model_name: &str,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.to_string(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates a `Processing` error for the given stage.
    pub fn processing_error(
        kind: ProcessingStage,
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates an `InvalidImageDimensions` error.
    pub fn invalid_dimensions(
        width: u32,
        height: u32,
        resolution: u32,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidImageDimensions {
            width,
            height,
            resolution,
            message: message.into(),
        }
    }

    /// Creates an `UnsupportedLocale` error.
    pub fn unsupported_locale(locale: impl Into<String>) -> Self {
        Self::UnsupportedLocale {
            locale: locale.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }
}

impl From<crate::core::config::ConfigError> for EffNetError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

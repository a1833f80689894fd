//! The EfficientNet classifier and its configuration.
//!
//! - [`EfficientNetModel`] owns a checkpoint's engine and runs the
//!   decode, prepare, infer and decode-scores steps for each request.
//! - [`EfficientNetConfig`] is the serde-backed configuration a model can be
//!   built from.

/// Serializable classifier configuration
pub mod config;

/// Model orchestrator, builder and request type
pub mod efficientnet;

pub use config::EfficientNetConfig;
pub use efficientnet::{EfficientNetModel, EfficientNetModelBuilder, InferenceRequest};

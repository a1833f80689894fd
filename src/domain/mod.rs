//! Domain types for EfficientNet classification.
//!
//! * [`checkpoint`] - checkpoint ordinals, model sources and their resolution
//! * [`labels`] - locale-keyed class name tables
//! * [`prediction`] - ranked prediction results

pub mod checkpoint;
pub mod labels;
pub mod prediction;

pub use checkpoint::{Checkpoint, CheckpointResolver, ModelSource, ResolvedCheckpoint, resolve};
pub use labels::LabelTable;
pub use prediction::{Classification, Prediction};

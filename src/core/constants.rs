//! Constants used throughout the classification pipeline.
//!
//! This module defines the fixed parameters shared by checkpoint resolution,
//! preprocessing and decoding.

/// Square input resolution required by each checkpoint, indexed by ordinal.
///
/// The pretrained weights were exported at exactly these sizes, so the
/// checkpoint-to-resolution pairing must not change.
pub const CHECKPOINT_RESOLUTIONS: [u32; 8] = [224, 240, 260, 300, 380, 456, 528, 600];

/// Base URL of the published checkpoints.
///
/// The checkpoint ordinal is appended directly, so the URL ends with `B`.
pub const DEFAULT_MODELS_URL: &str =
    "https://raw.githubusercontent.com/ntedgi/efficientnet-tensorflowjs-binaries/main/models/B";

/// File name of the serialized graph inside each checkpoint directory.
///
/// This is the TensorFlow.js name used by the published checkpoints. The
/// ONNX Runtime loader refuses it, so local roots holding ONNX exports must
/// override `model_file_name`.
pub const DEFAULT_MODEL_FILE_NAME: &str = "model.json";

/// Padding added to the resolution when computing the center-crop size.
pub const CROP_PADDING: u32 = 32;

/// Number of color channels fed to the model.
pub const NUM_CHANNELS: usize = 3;

/// The default number of predictions returned per inference call.
pub const DEFAULT_TOPK: usize = 3;

/// The default locale used to label predictions.
pub const DEFAULT_LOCALE: &str = "en";

/// Upper bound on the class index accepted from an index-keyed label table.
///
/// Keys are allowed to leave gaps, so the table is sized by its largest key.
pub const MAX_LABEL_CLASSES: usize = 65_536;

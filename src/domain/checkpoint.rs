//! Checkpoint identifiers and their resolution to a model source.
//!
//! Each EfficientNet variant `B0`..`B7` was trained at one fixed square input
//! size. Resolving a checkpoint yields both where its graph lives and the
//! resolution images must be prepared at; the two always travel together.

use crate::core::constants::{CHECKPOINT_RESOLUTIONS, DEFAULT_MODEL_FILE_NAME, DEFAULT_MODELS_URL};
use crate::core::errors::{EffNetError, EffNetResult};
use std::fmt;
use std::path::{Path, PathBuf};

/// One of the eight pretrained EfficientNet variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Checkpoint {
    B0,
    B1,
    B2,
    B3,
    B4,
    B5,
    B6,
    B7,
}

impl Checkpoint {
    /// All checkpoints in ordinal order.
    pub const ALL: [Checkpoint; 8] = [
        Checkpoint::B0,
        Checkpoint::B1,
        Checkpoint::B2,
        Checkpoint::B3,
        Checkpoint::B4,
        Checkpoint::B5,
        Checkpoint::B6,
        Checkpoint::B7,
    ];

    /// Converts an ordinal into a checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`EffNetError::InvalidCheckpoint`] for anything outside `0..=7`.
    pub fn from_ordinal(ordinal: i64) -> EffNetResult<Self> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
            .ok_or(EffNetError::InvalidCheckpoint { value: ordinal })
    }

    /// The ordinal `0..=7` of this checkpoint.
    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Square input resolution the checkpoint's weights expect.
    pub fn resolution(self) -> u32 {
        CHECKPOINT_RESOLUTIONS[self.ordinal()]
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.ordinal())
    }
}

impl TryFrom<i64> for Checkpoint {
    type Error = EffNetError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_ordinal(value)
    }
}

impl TryFrom<u8> for Checkpoint {
    type Error = EffNetError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_ordinal(i64::from(value))
    }
}

/// Where a checkpoint's serialized graph can be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// A URL the loader has to fetch.
    Remote(String),
    /// A file on the local filesystem.
    Local(PathBuf),
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Remote(url) => f.write_str(url),
            ModelSource::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A checkpoint together with its model source and input resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCheckpoint {
    pub checkpoint: Checkpoint,
    pub source: ModelSource,
    pub resolution: u32,
}

/// Maps checkpoints to model sources.
///
/// Resolution is a pure mapping; nothing is read or downloaded here.
#[derive(Debug, Clone)]
pub struct CheckpointResolver {
    models_url: String,
    model_file_name: String,
    local_root: Option<PathBuf>,
}

impl Default for CheckpointResolver {
    fn default() -> Self {
        Self {
            models_url: DEFAULT_MODELS_URL.to_string(),
            model_file_name: DEFAULT_MODEL_FILE_NAME.to_string(),
            local_root: None,
        }
    }
}

impl CheckpointResolver {
    /// Creates a resolver pointing at the published remote checkpoints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves into `{root}/B{n}/{file}` instead of the remote URL.
    ///
    /// An empty root is treated as no root at all.
    pub fn local_root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.local_root = (!root.as_os_str().is_empty()).then_some(root);
        self
    }

    /// Overrides the remote base URL; the ordinal is appended directly to it.
    pub fn models_url(mut self, url: impl Into<String>) -> Self {
        self.models_url = url.into();
        self
    }

    /// Overrides the graph file name inside each checkpoint directory.
    pub fn model_file_name(mut self, name: impl Into<String>) -> Self {
        self.model_file_name = name.into();
        self
    }

    /// Resolves a checkpoint to its source and resolution.
    pub fn resolve(&self, checkpoint: Checkpoint) -> ResolvedCheckpoint {
        let n = checkpoint.ordinal();
        let source = match &self.local_root {
            Some(root) => ModelSource::Local(
                root.join(format!("B{n}")).join(&self.model_file_name),
            ),
            None => ModelSource::Remote(format!(
                "{}{}/{}",
                self.models_url, n, self.model_file_name
            )),
        };
        ResolvedCheckpoint {
            checkpoint,
            source,
            resolution: checkpoint.resolution(),
        }
    }

    /// Validates an ordinal and resolves it.
    ///
    /// # Errors
    ///
    /// Returns [`EffNetError::InvalidCheckpoint`] for ordinals outside `0..=7`.
    pub fn resolve_ordinal(&self, ordinal: i64) -> EffNetResult<ResolvedCheckpoint> {
        Ok(self.resolve(Checkpoint::from_ordinal(ordinal)?))
    }
}

/// Resolves an ordinal with the default URL and file name.
///
/// `local_root` switches the source from the remote URL to a local path.
pub fn resolve(ordinal: i64, local_root: Option<&Path>) -> EffNetResult<(ModelSource, u32)> {
    let mut resolver = CheckpointResolver::new();
    if let Some(root) = local_root {
        resolver = resolver.local_root(root);
    }
    let resolved = resolver.resolve_ordinal(ordinal)?;
    Ok((resolved.source, resolved.resolution))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolutions_match_table() {
        let expected = [224, 240, 260, 300, 380, 456, 528, 600];
        for (ordinal, want) in expected.iter().enumerate() {
            let checkpoint = Checkpoint::from_ordinal(ordinal as i64).unwrap();
            assert_eq!(checkpoint.resolution(), *want);
            assert_eq!(checkpoint.ordinal(), ordinal);
        }
    }

    #[test]
    fn test_invalid_ordinals() {
        for bad in [-1, 8, 100, i64::MIN, i64::MAX] {
            match Checkpoint::from_ordinal(bad) {
                Err(EffNetError::InvalidCheckpoint { value }) => assert_eq!(value, bad),
                other => panic!("expected InvalidCheckpoint for {bad}, got {other:?}"),
            }
        }
        assert!(Checkpoint::try_from(9u8).is_err());
    }

    #[test]
    fn test_remote_url() {
        let resolved = CheckpointResolver::new().resolve(Checkpoint::B3);
        assert_eq!(
            resolved.source,
            ModelSource::Remote(
                "https://raw.githubusercontent.com/ntedgi/efficientnet-tensorflowjs-binaries/main/models/B3/model.json"
                    .to_string()
            )
        );
        assert_eq!(resolved.resolution, 300);
    }

    #[test]
    fn test_local_path() {
        let (source, resolution) = resolve(5, Some(Path::new("/opt/models"))).unwrap();
        assert_eq!(
            source,
            ModelSource::Local(PathBuf::from("/opt/models/B5/model.json"))
        );
        assert_eq!(resolution, 456);
    }

    #[test]
    fn test_empty_local_root_falls_back_to_remote() {
        let (source, _) = resolve(0, Some(Path::new(""))).unwrap();
        assert!(matches!(source, ModelSource::Remote(_)));
    }

    #[test]
    fn test_custom_file_name_and_url() {
        let resolved = CheckpointResolver::new()
            .models_url("https://mirror.example/effnet/B")
            .model_file_name("model.onnx")
            .resolve(Checkpoint::B7);
        assert_eq!(resolved.source.to_string(), "https://mirror.example/effnet/B7/model.onnx");
    }

    #[test]
    fn test_resolve_ordinal_rejects_out_of_range() {
        assert!(matches!(
            CheckpointResolver::new().resolve_ordinal(8),
            Err(EffNetError::InvalidCheckpoint { value: 8 })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Checkpoint::B2.to_string(), "B2");
    }
}

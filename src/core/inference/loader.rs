//! Model loading for the ONNX Runtime backend.

use super::{InferenceEngine, ModelLoader, OrtInfer, ProgressObserver, ScaledProgress};
use crate::core::config::OrtSessionConfig;
use crate::core::errors::{EffNetError, EffNetResult};
use crate::domain::ModelSource;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Materializes a remote model URL as a local file.
///
/// Network retrieval, caching and retry policy live behind this trait; the
/// crate itself ships no implementation.
pub trait ModelFetcher: Send + Sync {
    /// Downloads `url` and returns the local path of the model file,
    /// reporting download progress in `[0, 100]`.
    fn fetch(&self, url: &str, progress: &dyn ProgressObserver) -> EffNetResult<PathBuf>;
}

/// Loads ONNX graphs into [`OrtInfer`] engines.
///
/// Local sources are opened directly. Remote sources need a [`ModelFetcher`];
/// without one they fail with [`EffNetError::ModelLoad`].
///
/// Only ONNX exports can be loaded. The published checkpoints are TensorFlow.js
/// graphs (`model.json` plus weight shards), which is what
/// [`DEFAULT_MODEL_FILE_NAME`](crate::core::constants::DEFAULT_MODEL_FILE_NAME)
/// names. Convert them to ONNX and set the config's `model_file_name` to the
/// exported file, such as `model.onnx`. A `.json` graph is rejected up front.
#[derive(Clone, Default)]
pub struct OrtModelLoader {
    session_config: Option<OrtSessionConfig>,
    session_pool_size: usize,
    input_name: Option<String>,
    output_name: Option<String>,
    fetcher: Option<Arc<dyn ModelFetcher>>,
}

impl std::fmt::Debug for OrtModelLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtModelLoader")
            .field("session_config", &self.session_config)
            .field("session_pool_size", &self.session_pool_size)
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("fetcher", &self.fetcher.is_some())
            .finish()
    }
}

impl OrtModelLoader {
    /// Creates a loader with default session settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ONNX Runtime session configuration.
    pub fn session_config(mut self, config: OrtSessionConfig) -> Self {
        self.session_config = Some(config);
        self
    }

    /// Sets how many sessions the engine pools for concurrent calls.
    pub fn session_pool_size(mut self, size: usize) -> Self {
        self.session_pool_size = size;
        self
    }

    /// Overrides the input tensor name instead of reading it from the model.
    pub fn input_name(mut self, name: impl Into<String>) -> Self {
        self.input_name = Some(name.into());
        self
    }

    /// Overrides the output tensor name instead of using the first output.
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Installs the fetcher used for remote sources.
    pub fn fetcher(mut self, fetcher: Arc<dyn ModelFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    fn local_path(
        &self,
        source: &ModelSource,
        progress: &dyn ProgressObserver,
    ) -> EffNetResult<PathBuf> {
        match source {
            ModelSource::Local(path) => {
                if !path.is_file() {
                    return Err(EffNetError::model_load_message(
                        path.display().to_string(),
                        "model file does not exist",
                    ));
                }
                Ok(path.clone())
            }
            ModelSource::Remote(url) => {
                let fetcher = self.fetcher.as_ref().ok_or_else(|| {
                    EffNetError::model_load_message(
                        url.as_str(),
                        "remote model sources require a ModelFetcher",
                    )
                })?;
                fetcher.fetch(url, progress).map_err(|e| match e {
                    EffNetError::ModelLoad { .. } => e,
                    other => EffNetError::ModelLoad {
                        source_desc: url.clone(),
                        context: "fetch failed".to_string(),
                        source: Some(Box::new(other)),
                    },
                })
            }
        }
    }

    fn build_engine(&self, path: &Path) -> EffNetResult<OrtInfer> {
        OrtInfer::from_config(
            path,
            self.session_config.as_ref(),
            self.session_pool_size,
            self.input_name.as_deref(),
            self.output_name.as_deref(),
        )
        .map_err(|e| match e {
            EffNetError::ModelLoad { .. } => e,
            other => EffNetError::ModelLoad {
                source_desc: path.display().to_string(),
                context: "failed to build inference session".to_string(),
                source: Some(Box::new(other)),
            },
        })
    }
}

fn reject_tfjs_graph(path: &Path) -> EffNetResult<()> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        return Err(EffNetError::model_load_message(
            path.display().to_string(),
            "TensorFlow.js graphs cannot be loaded; export the checkpoint to ONNX \
             and set model_file_name to the exported file",
        ));
    }
    Ok(())
}

impl ModelLoader for OrtModelLoader {
    fn load(
        &self,
        source: &ModelSource,
        progress: &dyn ProgressObserver,
    ) -> EffNetResult<Box<dyn InferenceEngine>> {
        let fetch_progress = ScaledProgress::new(progress, 0.0, 80.0);
        let path = self.local_path(source, &fetch_progress)?;
        reject_tfjs_graph(&path)?;
        progress.on_progress(80.0);
        tracing::debug!(path = %path.display(), "building ONNX Runtime session");
        let engine = self.build_engine(&path)?;
        Ok(Box::new(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::inference::NoProgress;

    struct FailingFetcher;

    impl ModelFetcher for FailingFetcher {
        fn fetch(&self, url: &str, progress: &dyn ProgressObserver) -> EffNetResult<PathBuf> {
            progress.on_progress(100.0);
            Err(EffNetError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("cannot reach {url}"),
            )))
        }
    }

    #[test]
    fn test_remote_without_fetcher_fails() {
        let loader = OrtModelLoader::new();
        let source = ModelSource::Remote("https://example.com/B0/model.json".to_string());
        let err = loader.load(&source, &NoProgress).err().unwrap();
        assert!(matches!(err, EffNetError::ModelLoad { .. }));
    }

    #[test]
    fn test_fetch_failure_becomes_model_load() {
        let loader = OrtModelLoader::new().fetcher(Arc::new(FailingFetcher));
        let source = ModelSource::Remote("https://example.com/B0/model.json".to_string());
        let err = loader.load(&source, &NoProgress).err().unwrap();
        match err {
            EffNetError::ModelLoad { source_desc, .. } => {
                assert_eq!(source_desc, "https://example.com/B0/model.json")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_local_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = ModelSource::Local(dir.path().join("B0").join("model.onnx"));
        let err = OrtModelLoader::new()
            .load(&source, &NoProgress)
            .err()
            .unwrap();
        assert!(matches!(err, EffNetError::ModelLoad { .. }));
    }

    #[test]
    fn test_tfjs_graph_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, r#"{"format": "graph-model", "modelTopology": {}}"#).unwrap();
        let err = OrtModelLoader::new()
            .load(&ModelSource::Local(path), &NoProgress)
            .err()
            .unwrap();
        match err {
            EffNetError::ModelLoad { context, .. } => assert!(context.contains("ONNX")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_corrupt_local_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        std::fs::write(&path, b"not a model").unwrap();
        let err = OrtModelLoader::new()
            .load(&ModelSource::Local(path), &NoProgress)
            .err()
            .unwrap();
        assert!(matches!(err, EffNetError::ModelLoad { .. }));
    }
}

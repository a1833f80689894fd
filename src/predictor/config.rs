//! Configuration for the EfficientNet classifier.

use crate::core::config::{ConfigError, ConfigValidator, OrtSessionConfig};
use crate::core::constants::{
    DEFAULT_LOCALE, DEFAULT_MODEL_FILE_NAME, DEFAULT_MODELS_URL, DEFAULT_TOPK,
};
use crate::core::errors::EffNetResult;
use crate::core::inference::OrtModelLoader;
use crate::domain::{Checkpoint, CheckpointResolver, LabelTable};
use crate::processors::PixelNormalization;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for an [`EfficientNetModel`](super::EfficientNetModel).
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```json
/// { "checkpoint": 3, "local_model_root": "models", "labels_dir": "labels" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EfficientNetConfig {
    /// Checkpoint ordinal, 0 for B0 through 7 for B7.
    pub checkpoint: u8,
    /// Directory holding `B{n}/{model_file_name}`. Empty means unset.
    pub local_model_root: Option<PathBuf>,
    /// Base URL the ordinal is appended to for remote checkpoints.
    pub models_url: String,
    /// File name of the graph inside a checkpoint directory.
    pub model_file_name: String,
    /// Directory of `{locale}.json` label tables.
    pub labels_dir: Option<PathBuf>,
    /// Number of predictions returned when a request does not say.
    pub default_top_k: usize,
    /// Locale used when a request does not say.
    pub default_locale: String,
    /// Pixel normalization applied to the input tensor.
    pub normalization: PixelNormalization,
    /// ONNX Runtime session settings.
    pub ort_session: Option<OrtSessionConfig>,
    /// Number of pooled inference sessions.
    pub session_pool_size: usize,
}

impl Default for EfficientNetConfig {
    fn default() -> Self {
        Self {
            checkpoint: 0,
            local_model_root: None,
            models_url: DEFAULT_MODELS_URL.to_string(),
            model_file_name: DEFAULT_MODEL_FILE_NAME.to_string(),
            labels_dir: None,
            default_top_k: DEFAULT_TOPK,
            default_locale: DEFAULT_LOCALE.to_string(),
            normalization: PixelNormalization::default(),
            ort_session: None,
            session_pool_size: 1,
        }
    }
}

impl EfficientNetConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a configuration from a JSON file and validates it.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, is not valid JSON, or does not
    /// pass [`ConfigValidator::validate`].
    pub fn from_json_file(path: impl AsRef<Path>) -> EffNetResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Parses a configuration from a JSON string and validates it.
    pub fn from_json_str(json: &str) -> EffNetResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigValidator::validate(self)
    }

    /// The configured checkpoint.
    pub fn checkpoint(&self) -> EffNetResult<Checkpoint> {
        Checkpoint::try_from(self.checkpoint)
    }

    /// Resolver built from the source settings.
    pub fn resolver(&self) -> CheckpointResolver {
        let mut resolver = CheckpointResolver::new()
            .models_url(self.models_url.clone())
            .model_file_name(self.model_file_name.clone());
        if let Some(root) = &self.local_model_root {
            resolver = resolver.local_root(root.clone());
        }
        resolver
    }

    /// Reads the label tables from `labels_dir`, or returns an empty table.
    pub fn label_table(&self) -> EffNetResult<LabelTable> {
        match &self.labels_dir {
            Some(dir) => LabelTable::from_dir(dir),
            None => Ok(LabelTable::new()),
        }
    }

    /// ONNX Runtime loader configured from the session settings.
    pub fn ort_loader(&self) -> OrtModelLoader {
        let mut loader = OrtModelLoader::new().session_pool_size(self.session_pool_size);
        if let Some(session) = &self.ort_session {
            loader = loader.session_config(session.clone());
        }
        loader
    }
}

impl ConfigValidator for EfficientNetConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if Checkpoint::try_from(self.checkpoint).is_err() {
            return Err(ConfigError::ValidationFailed {
                message: format!(
                    "checkpoint must be in 0..=7, got {}",
                    self.checkpoint
                ),
            });
        }
        self.validate_positive_usize(self.default_top_k, "default_top_k")?;
        self.validate_locale(&self.default_locale, "default_locale")?;
        self.validate_non_empty(&self.model_file_name, "model_file_name")?;
        self.validate_non_empty(&self.models_url, "models_url")?;
        self.validate_positive_usize(self.session_pool_size, "session_pool_size")?;
        if let Some(session) = &self.ort_session {
            session.validate()?;
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::EffNetError;
    use crate::domain::ModelSource;

    #[test]
    fn test_defaults_are_valid() {
        let config = EfficientNetConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_top_k, 3);
        assert_eq!(config.default_locale, "en");
        assert_eq!(config.normalization, PixelNormalization::Quantized);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config =
            EfficientNetConfig::from_json_str(r#"{ "checkpoint": 4, "default_top_k": 5 }"#)
                .unwrap();
        assert_eq!(config.checkpoint().unwrap(), Checkpoint::B4);
        assert_eq!(config.default_top_k, 5);
        assert_eq!(config.model_file_name, "model.json");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for json in [
            r#"{ "checkpoint": 8 }"#,
            r#"{ "default_top_k": 0 }"#,
            r#"{ "default_locale": "" }"#,
            r#"{ "model_file_name": " " }"#,
            r#"{ "session_pool_size": 0 }"#,
            r#"{ "ort_session": { "intra_threads": 0 } }"#,
        ] {
            let err = EfficientNetConfig::from_json_str(json).unwrap_err();
            assert!(matches!(err, EffNetError::ConfigError { .. }), "{json}");
        }
    }

    #[test]
    fn test_malformed_json_fails() {
        assert!(matches!(
            EfficientNetConfig::from_json_str("{ checkpoint"),
            Err(EffNetError::Json(_))
        ));
    }

    #[test]
    fn test_resolver_uses_local_root() {
        let config = EfficientNetConfig {
            checkpoint: 2,
            local_model_root: Some(PathBuf::from("/srv/models")),
            ..Default::default()
        };
        let resolved = config.resolver().resolve(config.checkpoint().unwrap());
        assert_eq!(
            resolved.source,
            ModelSource::Local(PathBuf::from("/srv/models/B2/model.json"))
        );
        assert_eq!(resolved.resolution, 260);
    }

    #[test]
    fn test_empty_local_root_resolves_remote() {
        let config = EfficientNetConfig {
            local_model_root: Some(PathBuf::new()),
            ..Default::default()
        };
        let resolved = config.resolver().resolve(Checkpoint::B0);
        assert!(matches!(resolved.source, ModelSource::Remote(_)));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("effnet.json");
        std::fs::write(&path, r#"{ "checkpoint": 7, "normalization": "Symmetric" }"#).unwrap();
        let config = EfficientNetConfig::from_json_file(&path).unwrap();
        assert_eq!(config.checkpoint().unwrap().resolution(), 600);
        assert_eq!(config.normalization, PixelNormalization::Symmetric);
    }
}

//! EfficientNet image classifier.
//!
//! [`EfficientNetModel`] ties the pieces together: a resolved checkpoint, a
//! [`ModelLoader`] that turns it into an [`InferenceEngine`], the
//! [`ImagePreprocessor`] and the [`ResultDecoder`]. A model is constructed
//! unloaded; [`EfficientNetModel::load`] must succeed once before any call to
//! [`EfficientNetModel::inference`].

use super::config::EfficientNetConfig;
use crate::core::config::ConfigValidator;
use crate::core::constants::{DEFAULT_LOCALE, DEFAULT_TOPK};
use crate::core::errors::{EffNetError, EffNetResult};
use crate::core::inference::{
    InferenceEngine, ModelLoader, MonotonicProgress, NoProgress, ProgressObserver,
};
use crate::domain::{Checkpoint, Classification, LabelTable, ModelSource};
use crate::processors::{ImagePreprocessor, PixelNormalization, ResultDecoder, validate_top_k};
use crate::utils::ImageSource;
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// A single classification request.
///
/// Only the image is required; `top_k` and `locale` fall back to the model's
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceRequest {
    /// The image to classify.
    pub image: ImageSource,
    /// Number of predictions to return.
    pub top_k: Option<i64>,
    /// Locale of the returned labels.
    pub locale: Option<String>,
}

impl InferenceRequest {
    /// Creates a request with default top-k and locale.
    pub fn new(image: impl Into<ImageSource>) -> Self {
        Self {
            image: image.into(),
            top_k: None,
            locale: None,
        }
    }

    /// Sets the number of predictions to return.
    pub fn top_k(mut self, top_k: i64) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Sets the label locale.
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }
}

impl From<ImageSource> for InferenceRequest {
    fn from(image: ImageSource) -> Self {
        Self::new(image)
    }
}

impl From<PathBuf> for InferenceRequest {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for InferenceRequest {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl From<&str> for InferenceRequest {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for InferenceRequest {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl From<Vec<u8>> for InferenceRequest {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for InferenceRequest {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

/// EfficientNet classifier bound to one checkpoint.
///
/// The model is `Send + Sync`. Once loaded, [`inference`](Self::inference)
/// can be called concurrently from any number of threads.
pub struct EfficientNetModel {
    checkpoint: Option<Checkpoint>,
    source: ModelSource,
    resolution: u32,
    loader: Arc<dyn ModelLoader>,
    preprocessor: ImagePreprocessor,
    decoder: ResultDecoder,
    default_top_k: usize,
    default_locale: String,
    engine: OnceCell<Box<dyn InferenceEngine>>,
    load_lock: Mutex<()>,
}

impl std::fmt::Debug for EfficientNetModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EfficientNetModel")
            .field("checkpoint", &self.checkpoint)
            .field("source", &self.source)
            .field("resolution", &self.resolution)
            .field("default_top_k", &self.default_top_k)
            .field("default_locale", &self.default_locale)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl EfficientNetModel {
    /// Starts building a model for `source`, prepared at `resolution`.
    pub fn builder(source: ModelSource, resolution: u32) -> EfficientNetModelBuilder {
        EfficientNetModelBuilder::new(source, resolution)
    }

    /// Builds an unloaded model from a configuration, using ONNX Runtime.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid, when its label tables cannot
    /// be read, or when they have no table for `default_locale`.
    pub fn from_config(config: &EfficientNetConfig) -> EffNetResult<Self> {
        let checkpoint = config.checkpoint()?;
        Self::configured(checkpoint, config, Arc::new(config.ort_loader()))
    }

    /// Resolves `checkpoint`, builds the model and loads it.
    ///
    /// `options` supplies the source settings, label tables and defaults; its
    /// own `checkpoint` field is ignored in favour of the argument.
    ///
    /// # Errors
    ///
    /// Fails like [`from_config`](Self::from_config) and like
    /// [`load`](Self::load).
    pub fn from_checkpoint(
        checkpoint: Checkpoint,
        options: &EfficientNetConfig,
        loader: Arc<dyn ModelLoader>,
    ) -> EffNetResult<Self> {
        let model = Self::configured(checkpoint, options, loader)?;
        model.load()?;
        Ok(model)
    }

    fn configured(
        checkpoint: Checkpoint,
        config: &EfficientNetConfig,
        loader: Arc<dyn ModelLoader>,
    ) -> EffNetResult<Self> {
        ConfigValidator::validate(config)?;
        let labels = config.label_table()?;
        if !labels.supports(&config.default_locale) {
            return Err(EffNetError::config_error(match &config.labels_dir {
                Some(dir) => format!(
                    "labels_dir {} has no {}.json for default_locale",
                    dir.display(),
                    config.default_locale
                ),
                None => "labels_dir is not set; every inference would fail".to_string(),
            }));
        }
        let resolved = config.resolver().resolve(checkpoint);
        let mut model = Self::builder(resolved.source, resolved.resolution)
            .loader(loader)
            .labels(labels)
            .normalization(config.normalization)
            .default_top_k(config.default_top_k)
            .default_locale(config.default_locale.clone())
            .build()?;
        model.checkpoint = Some(checkpoint);
        Ok(model)
    }

    /// Loads the model graph without progress reporting.
    pub fn load(&self) -> EffNetResult<()> {
        self.load_with_progress(&NoProgress)
    }

    /// Loads the model graph, reporting progress to `observer`.
    ///
    /// The observer sees `0` first and `100` once the model is usable, with
    /// non-decreasing values in between. On failure the model stays unloaded
    /// and `100` is never reported. A model can only be loaded once.
    ///
    /// # Errors
    ///
    /// Returns [`EffNetError::ModelLoad`] when the source cannot be retrieved
    /// or deserialized, or when the model is already loaded.
    pub fn load_with_progress(&self, observer: &dyn ProgressObserver) -> EffNetResult<()> {
        let source_desc = self.source.to_string();
        let _guard = self
            .load_lock
            .lock()
            .map_err(|_| EffNetError::model_load_message(&source_desc, "load lock poisoned"))?;
        if self.engine.get().is_some() {
            return Err(EffNetError::model_load_message(
                source_desc,
                "model is already loaded",
            ));
        }

        let progress = MonotonicProgress::new(observer);
        progress.on_progress(0.0);
        info!(source = %self.source, resolution = self.resolution, "loading model");

        let engine = self
            .loader
            .load(&self.source, &progress)
            .map_err(|e| match e {
                EffNetError::ModelLoad { .. } => e,
                other => EffNetError::ModelLoad {
                    source_desc: source_desc.clone(),
                    context: "loader failed".to_string(),
                    source: Some(Box::new(other)),
                },
            })?;
        let model_name = engine.model_name().to_string();
        if self.engine.set(engine).is_err() {
            return Err(EffNetError::model_load_message(
                source_desc,
                "model is already loaded",
            ));
        }

        progress.on_progress(100.0);
        info!(model = %model_name, "model loaded");
        Ok(())
    }

    /// Whether [`load`](Self::load) has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.engine.get().is_some()
    }

    /// Classifies one image.
    ///
    /// # Errors
    ///
    /// * [`EffNetError::ModelNotLoaded`] before a successful load.
    /// * [`EffNetError::InvalidTopK`] for a zero or negative `top_k`.
    /// * [`EffNetError::UnsupportedLocale`] for a locale without labels.
    /// * [`EffNetError::ImageDecode`] when the image cannot be decoded.
    /// * [`EffNetError::InvalidImageDimensions`] when the image is too small
    ///   for the center crop.
    pub fn inference(&self, request: impl Into<InferenceRequest>) -> EffNetResult<Classification> {
        let engine = self.engine.get().ok_or(EffNetError::ModelNotLoaded)?;
        let request = request.into();

        let top_k = match request.top_k {
            Some(k) => validate_top_k(k)?,
            None => self.default_top_k,
        };
        let locale = request.locale.as_deref().unwrap_or(&self.default_locale);
        self.decoder.labels().labels(locale)?;

        let image = request.image.decode()?;
        debug!(
            image = %request.image.describe(),
            width = image.width(),
            height = image.height(),
            resolution = self.resolution,
            "preparing image"
        );
        let tensor = self.preprocessor.prepare(&image, self.resolution)?;
        let scores = engine.predict(&tensor)?;
        debug!(classes = scores.len(), top_k, locale, "decoding scores");
        self.decoder.decode(&scores, top_k, locale)
    }

    /// Classifies several images in parallel.
    ///
    /// Results come back in request order; one failing request does not
    /// affect the others.
    pub fn inference_batch(
        &self,
        requests: Vec<InferenceRequest>,
    ) -> Vec<EffNetResult<Classification>> {
        requests
            .into_par_iter()
            .map(|request| self.inference(request))
            .collect()
    }

    /// The checkpoint, when the model was built from one.
    pub fn checkpoint(&self) -> Option<Checkpoint> {
        self.checkpoint
    }

    /// Where the model graph is loaded from.
    pub fn source(&self) -> &ModelSource {
        &self.source
    }

    /// Square input resolution.
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// The label tables used for decoding.
    pub fn labels(&self) -> &LabelTable {
        self.decoder.labels()
    }
}

/// Builder for [`EfficientNetModel`].
pub struct EfficientNetModelBuilder {
    source: ModelSource,
    resolution: u32,
    loader: Option<Arc<dyn ModelLoader>>,
    labels: LabelTable,
    preprocessor: ImagePreprocessor,
    default_top_k: usize,
    default_locale: String,
}

impl EfficientNetModelBuilder {
    /// Creates a builder with the ONNX Runtime loader and no label tables.
    pub fn new(source: ModelSource, resolution: u32) -> Self {
        Self {
            source,
            resolution,
            loader: None,
            labels: LabelTable::new(),
            preprocessor: ImagePreprocessor::default(),
            default_top_k: DEFAULT_TOPK,
            default_locale: DEFAULT_LOCALE.to_string(),
        }
    }

    /// Sets the loader that materializes the model source.
    pub fn loader(mut self, loader: Arc<dyn ModelLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Sets the label tables.
    pub fn labels(mut self, labels: LabelTable) -> Self {
        self.labels = labels;
        self
    }

    /// Sets the pixel normalization, keeping the standard crop.
    pub fn normalization(mut self, normalization: PixelNormalization) -> Self {
        self.preprocessor = ImagePreprocessor::new(normalization);
        self
    }

    /// Replaces the whole preprocessor.
    pub fn preprocessor(mut self, preprocessor: ImagePreprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    /// Sets the number of predictions returned when a request does not say.
    pub fn default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    /// Sets the locale used when a request does not say.
    pub fn default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }

    /// Builds the unloaded model.
    ///
    /// # Errors
    ///
    /// Returns [`EffNetError::ConfigError`] for a zero resolution, a zero
    /// default top-k or an empty default locale.
    pub fn build(self) -> EffNetResult<EfficientNetModel> {
        if self.resolution == 0 {
            return Err(EffNetError::config_error("resolution must be greater than 0"));
        }
        if self.default_top_k == 0 {
            return Err(EffNetError::config_error("default top-k must be greater than 0"));
        }
        if self.default_locale.trim().is_empty() {
            return Err(EffNetError::config_error("default locale must not be empty"));
        }

        let loader = match self.loader {
            Some(loader) => loader,
            None => Arc::new(crate::core::inference::OrtModelLoader::new()),
        };

        Ok(EfficientNetModel {
            checkpoint: None,
            source: self.source,
            resolution: self.resolution,
            loader,
            preprocessor: self.preprocessor,
            decoder: ResultDecoder::new(self.labels),
            default_top_k: self.default_top_k,
            default_locale: self.default_locale,
            engine: OnceCell::new(),
            load_lock: Mutex::new(()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Tensor4D;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    type Shapes = Arc<Mutex<Vec<Vec<usize>>>>;

    struct StubEngine {
        scores: Vec<f32>,
        shapes: Shapes,
    }

    impl InferenceEngine for StubEngine {
        fn predict(&self, tensor: &Tensor4D) -> EffNetResult<Vec<f32>> {
            self.shapes.lock().unwrap().push(tensor.shape().to_vec());
            Ok(self.scores.clone())
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    struct StubLoader {
        scores: Vec<f32>,
        steps: Vec<f32>,
        fail: bool,
        shapes: Shapes,
    }

    impl StubLoader {
        fn new(scores: Vec<f32>) -> Self {
            Self {
                scores,
                steps: Vec::new(),
                fail: false,
                shapes: Shapes::default(),
            }
        }
    }

    impl ModelLoader for StubLoader {
        fn load(
            &self,
            source: &ModelSource,
            progress: &dyn ProgressObserver,
        ) -> EffNetResult<Box<dyn InferenceEngine>> {
            for &step in &self.steps {
                progress.on_progress(step);
            }
            if self.fail {
                return Err(EffNetError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{source} is gone"),
                )));
            }
            Ok(Box::new(StubEngine {
                scores: self.scores.clone(),
                shapes: Arc::clone(&self.shapes),
            }))
        }
    }

    fn labels() -> LabelTable {
        LabelTable::new()
            .with_locale("en", vec!["cat".into(), "dog".into(), "fox".into(), "owl".into()])
            .with_locale("es", vec!["gato".into(), "perro".into(), "zorro".into(), "búho".into()])
    }

    fn model_with(loader: StubLoader) -> EfficientNetModel {
        EfficientNetModel::builder(ModelSource::Remote("stub://B0".into()), 224)
            .loader(Arc::new(loader))
            .labels(labels())
            .build()
            .unwrap()
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 200, 200])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_inference_before_load_fails() {
        let model = model_with(StubLoader::new(vec![0.1, 0.2, 0.3, 0.4]));
        assert!(!model.is_loaded());
        let err = model.inference(png(500, 500)).unwrap_err();
        assert!(matches!(err, EffNetError::ModelNotLoaded));
    }

    #[test]
    fn test_load_reports_progress_from_zero_to_hundred() {
        let mut loader = StubLoader::new(vec![0.5]);
        loader.steps = vec![50.0, 30.0, 120.0];
        let model = model_with(loader);

        let seen = Mutex::new(Vec::new());
        let observer = |p: f32| seen.lock().unwrap().push(p);
        model.load_with_progress(&observer).unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.first(), Some(&0.0));
        assert_eq!(seen.last(), Some(&100.0));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert!(seen.iter().all(|p| (0.0..=100.0).contains(p)));
        assert!(model.is_loaded());
    }

    #[test]
    fn test_failed_load_leaves_model_unloaded() {
        let mut loader = StubLoader::new(vec![0.5]);
        loader.steps = vec![40.0];
        loader.fail = true;
        let model = model_with(loader);

        let seen = Mutex::new(Vec::new());
        let observer = |p: f32| seen.lock().unwrap().push(p);
        let err = model.load_with_progress(&observer).unwrap_err();

        assert!(matches!(err, EffNetError::ModelLoad { .. }));
        assert!(!seen.into_inner().unwrap().contains(&100.0));
        assert!(!model.is_loaded());
        assert!(matches!(
            model.inference(png(500, 500)),
            Err(EffNetError::ModelNotLoaded)
        ));
    }

    #[test]
    fn test_second_load_is_rejected() {
        let model = model_with(StubLoader::new(vec![0.5]));
        model.load().unwrap();
        assert!(matches!(model.load(), Err(EffNetError::ModelLoad { .. })));
        assert!(model.is_loaded());
    }

    #[test]
    fn test_inference_uses_defaults() {
        let loader = StubLoader::new(vec![0.1, 0.6, 0.05, 0.25]);
        let shapes = Arc::clone(&loader.shapes);
        let model = model_with(loader);
        model.load().unwrap();

        let result = model.inference(png(500, 500)).unwrap();
        let labels: Vec<&str> = result.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["dog", "owl", "cat"]);
        assert_eq!(*shapes.lock().unwrap(), vec![vec![1, 224, 224, 3]]);
    }

    #[test]
    fn test_inference_top_k_and_locale() {
        let model = model_with(StubLoader::new(vec![0.1, 0.6, 0.05, 0.25]));
        model.load().unwrap();

        let result = model
            .inference(InferenceRequest::new(png(300, 200)).top_k(1).locale("es"))
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.predictions[0].label, "perro");
        assert_eq!(result.predictions[0].score, 0.6);
    }

    #[test]
    fn test_inference_rejects_bad_arguments() {
        let model = model_with(StubLoader::new(vec![0.1, 0.6, 0.05, 0.25]));
        model.load().unwrap();

        for top_k in [0, -2] {
            assert!(matches!(
                model.inference(InferenceRequest::new(png(64, 64)).top_k(top_k)),
                Err(EffNetError::InvalidTopK { .. })
            ));
        }
        assert!(matches!(
            model.inference(InferenceRequest::new(png(64, 64)).locale("de")),
            Err(EffNetError::UnsupportedLocale { .. })
        ));
        assert!(matches!(
            model.inference(&b"not an image"[..]),
            Err(EffNetError::ImageDecode(_))
        ));
        assert!(matches!(
            model.inference(png(1, 1)),
            Err(EffNetError::InvalidImageDimensions { .. })
        ));
    }

    #[test]
    fn test_inference_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.png");
        std::fs::write(&path, png(320, 240)).unwrap();

        let model = model_with(StubLoader::new(vec![0.9, 0.1]));
        model.load().unwrap();
        let result = model.inference(path.as_path()).unwrap();
        assert_eq!(result.top().unwrap().label, "cat");
    }

    #[test]
    fn test_inference_batch_keeps_order() {
        let model = model_with(StubLoader::new(vec![0.1, 0.6, 0.05, 0.25]));
        model.load().unwrap();

        let requests = vec![
            InferenceRequest::new(png(100, 100)).top_k(2),
            InferenceRequest::new(&b"broken"[..]),
            InferenceRequest::new(png(640, 480)).locale("es").top_k(1),
        ];
        let results = model.inference_batch(requests);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().len(), 2);
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().predictions[0].label, "perro");
    }

    fn english_labels_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("en.json"), r#"["cat", "dog"]"#).unwrap();
        dir
    }

    #[test]
    fn test_from_checkpoint_resolves_and_loads() {
        let labels_dir = english_labels_dir();
        let options = EfficientNetConfig {
            local_model_root: Some(PathBuf::from("/models")),
            labels_dir: Some(labels_dir.path().to_path_buf()),
            ..Default::default()
        };
        let model = EfficientNetModel::from_checkpoint(
            Checkpoint::B3,
            &options,
            Arc::new(StubLoader::new(vec![1.0])),
        )
        .unwrap();

        assert!(model.is_loaded());
        assert_eq!(model.checkpoint(), Some(Checkpoint::B3));
        assert_eq!(model.resolution(), 300);
        assert_eq!(
            model.source(),
            &ModelSource::Local(PathBuf::from("/models/B3/model.json"))
        );
    }

    #[test]
    fn test_from_config_is_unloaded() {
        let labels_dir = english_labels_dir();
        let config = EfficientNetConfig {
            labels_dir: Some(labels_dir.path().to_path_buf()),
            ..Default::default()
        };
        let model = EfficientNetModel::from_config(&config).unwrap();
        assert!(!model.is_loaded());
        assert_eq!(model.resolution(), 224);
        assert!(matches!(model.source(), ModelSource::Remote(url) if url.ends_with("B0/model.json")));
    }

    #[test]
    fn test_config_without_default_locale_labels_is_rejected() {
        let err = EfficientNetModel::from_config(&EfficientNetConfig::default()).unwrap_err();
        assert!(matches!(err, EffNetError::ConfigError { .. }));

        let labels_dir = english_labels_dir();
        let config = EfficientNetConfig {
            labels_dir: Some(labels_dir.path().to_path_buf()),
            default_locale: "fr".to_string(),
            ..Default::default()
        };
        let err = EfficientNetModel::from_checkpoint(
            Checkpoint::B0,
            &config,
            Arc::new(StubLoader::new(vec![1.0])),
        )
        .unwrap_err();
        match err {
            EffNetError::ConfigError { message } => assert!(message.contains("fr.json")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_builder_rejects_zero_resolution() {
        let err = EfficientNetModel::builder(ModelSource::Remote("x".into()), 0)
            .build()
            .unwrap_err();
        assert!(matches!(err, EffNetError::ConfigError { .. }));
    }
}

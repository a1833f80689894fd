//! ONNX Runtime inference engine with a small pool of sessions.

use super::InferenceEngine;
use crate::core::config::OrtSessionConfig;
use crate::core::errors::{EffNetError, EffNetResult, SimpleError};
use crate::core::Tensor4D;
use ort::logging::LogLevel;
use ort::session::Session;
use ort::session::builder::SessionBuilder;
use ort::value::TensorRef;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Runs a classification graph through ONNX Runtime.
///
/// `Session::run` needs exclusive access, so each session sits behind a mutex
/// and calls are spread over the pool round-robin.
pub struct OrtInfer {
    sessions: Vec<Mutex<Session>>,
    next_idx: AtomicUsize,
    input_name: String,
    output_name: Option<String>,
    model_path: PathBuf,
    model_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("sessions", &self.sessions.len())
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("model_path", &self.model_path)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl OrtInfer {
    /// Creates an engine with default session settings and a single session.
    ///
    /// The input tensor name is taken from the model.
    pub fn new(model_path: impl AsRef<Path>) -> EffNetResult<Self> {
        Self::from_config(model_path, None, 1, None, None)
    }

    /// Creates an engine from an optional session configuration.
    ///
    /// # Arguments
    ///
    /// * `model_path` - Path to the serialized graph.
    /// * `session_config` - ONNX Runtime options; `None` keeps the defaults.
    /// * `pool_size` - Number of sessions to create (at least one).
    /// * `input_name` - Input tensor name; discovered from the model when `None`.
    /// * `output_name` - Output tensor name; the first output when `None`.
    pub fn from_config(
        model_path: impl AsRef<Path>,
        session_config: Option<&OrtSessionConfig>,
        pool_size: usize,
        input_name: Option<&str>,
        output_name: Option<&str>,
    ) -> EffNetResult<Self> {
        let path = model_path.as_ref();
        let pool_size = pool_size.max(1);
        let mut sessions = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let builder = Session::builder()?;
            let builder = match session_config {
                Some(cfg) => Self::apply_ort_config(builder, cfg)?,
                None => builder.with_log_level(LogLevel::Error)?,
            };
            let session = builder.commit_from_file(path).map_err(|e| {
                EffNetError::model_load_error(path, "failed to create ONNX session", Some(e))
            })?;
            sessions.push(Mutex::new(session));
        }

        let input_name = match input_name {
            Some(name) => name.to_string(),
            None => Self::discover_input_name(&sessions, path)?,
        };

        let model_name = path
            .parent()
            .and_then(|p| p.file_name())
            .or_else(|| path.file_stem())
            .and_then(|s| s.to_str())
            .unwrap_or("unknown_model")
            .to_string();

        tracing::debug!(
            model = %model_name,
            input = %input_name,
            sessions = sessions.len(),
            "created ONNX Runtime engine"
        );

        Ok(Self {
            sessions,
            next_idx: AtomicUsize::new(0),
            input_name,
            output_name: output_name.map(str::to_string),
            model_path: path.to_path_buf(),
            model_name,
        })
    }

    fn discover_input_name(sessions: &[Mutex<Session>], path: &Path) -> EffNetResult<String> {
        let session = sessions
            .first()
            .ok_or_else(|| EffNetError::model_load_message(path.display().to_string(), "no sessions"))?
            .lock()
            .map_err(|_| {
                EffNetError::model_load_message(path.display().to_string(), "session lock poisoned")
            })?;
        session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| {
                EffNetError::model_load_message(
                    path.display().to_string(),
                    "model declares no inputs",
                )
            })
    }

    fn apply_ort_config(
        mut builder: SessionBuilder,
        cfg: &OrtSessionConfig,
    ) -> Result<SessionBuilder, ort::Error> {
        builder = builder.with_log_level(LogLevel::from(cfg.log_severity))?;
        if let Some(intra) = cfg.intra_threads {
            builder = builder.with_intra_threads(intra)?;
        }
        if let Some(inter) = cfg.inter_threads {
            builder = builder.with_inter_threads(inter)?;
        }
        if let Some(par) = cfg.parallel_execution {
            builder = builder.with_parallel_execution(par)?;
        }
        if let Some(level) = cfg.optimization_level {
            builder = builder.with_optimization_level(level.into())?;
        }
        Ok(builder)
    }

    /// Returns the model path associated with this engine.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Returns the input tensor name fed by [`InferenceEngine::predict`].
    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    /// Number of pooled sessions.
    pub fn pool_size(&self) -> usize {
        self.sessions.len()
    }

    fn output_name(&self, session: &Session) -> EffNetResult<String> {
        if let Some(name) = &self.output_name {
            return Ok(name.clone());
        }
        session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| {
                EffNetError::inference_error(
                    &self.model_name,
                    "model declares no outputs",
                    SimpleError::new("missing output"),
                )
            })
    }
}

impl InferenceEngine for OrtInfer {
    fn predict(&self, tensor: &Tensor4D) -> EffNetResult<Vec<f32>> {
        let input_shape = tensor.shape().to_vec();
        let input = TensorRef::from_array_view(tensor.view()).map_err(|e| {
            EffNetError::inference_error(
                &self.model_name,
                &format!("failed to convert input tensor with shape {input_shape:?}"),
                e,
            )
        })?;

        let idx = self.next_idx.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        let mut session = self.sessions[idx].lock().map_err(|_| {
            EffNetError::inference_error(
                &self.model_name,
                &format!("failed to acquire session {}/{}", idx, self.sessions.len()),
                SimpleError::new("session lock poisoned"),
            )
        })?;
        let output_name = self.output_name(&session)?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| {
                EffNetError::inference_error(
                    &self.model_name,
                    &format!(
                        "forward pass failed for input '{}' -> output '{}'",
                        self.input_name, output_name
                    ),
                    e,
                )
            })?;

        let (output_shape, scores) = outputs[output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                EffNetError::inference_error(
                    &self.model_name,
                    &format!("failed to extract output '{output_name}' as f32"),
                    e,
                )
            })?;
        tracing::debug!(
            model = %self.model_name,
            input_shape = ?input_shape,
            output_shape = ?output_shape.iter().collect::<Vec<_>>(),
            "forward pass complete"
        );

        Ok(scores.to_vec())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

//! Inference seams and the ONNX Runtime backend.
//!
//! The classifier never talks to a runtime directly. It goes through two small
//! traits:
//!
//! * [`InferenceEngine`] runs a prepared tensor and returns the raw class scores.
//! * [`ModelLoader`] turns a [`ModelSource`] into a ready engine, reporting
//!   progress to a [`ProgressObserver`] while it works.
//!
//! [`OrtInfer`] and [`OrtModelLoader`] implement them on top of ONNX Runtime.
//! Tests inject their own implementations so preprocessing and decoding can
//! be exercised without a trained model.

pub mod loader;
pub mod ort_infer;

pub use loader::{ModelFetcher, OrtModelLoader};
pub use ort_infer::OrtInfer;

use crate::core::{EffNetResult, Tensor4D};
use crate::domain::ModelSource;
use std::sync::Mutex;

/// A loaded model that maps an input tensor to a flat vector of class scores.
///
/// Implementations must be safe to call from several threads at once once
/// they are constructed.
pub trait InferenceEngine: Send + Sync {
    /// Runs the model on a `[1, R, R, 3]` tensor.
    fn predict(&self, tensor: &Tensor4D) -> EffNetResult<Vec<f32>>;

    /// Name used in logs and error messages.
    fn model_name(&self) -> &str;
}

/// Retrieves and deserializes a model graph from a [`ModelSource`].
pub trait ModelLoader: Send + Sync {
    /// Loads the model, reporting percentages in `[0, 100]` to `progress`.
    fn load(
        &self,
        source: &ModelSource,
        progress: &dyn ProgressObserver,
    ) -> EffNetResult<Box<dyn InferenceEngine>>;
}

/// Receives load progress as a percentage in `[0, 100]`.
pub trait ProgressObserver: Send + Sync {
    /// Called with the current percentage.
    fn on_progress(&self, percent: f32);
}

impl<F> ProgressObserver for F
where
    F: Fn(f32) + Send + Sync,
{
    fn on_progress(&self, percent: f32) {
        self(percent)
    }
}

/// Observer that discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _percent: f32) {}
}

/// Maps a sub-task's `[0, 100]` progress into the `[start, end]` window of an
/// enclosing observer.
pub(crate) struct ScaledProgress<'a> {
    inner: &'a dyn ProgressObserver,
    start: f32,
    end: f32,
}

impl<'a> ScaledProgress<'a> {
    pub(crate) fn new(inner: &'a dyn ProgressObserver, start: f32, end: f32) -> Self {
        Self { inner, start, end }
    }
}

impl ProgressObserver for ScaledProgress<'_> {
    fn on_progress(&self, percent: f32) {
        let fraction = percent.clamp(0.0, 100.0) / 100.0;
        self.inner
            .on_progress(self.start + (self.end - self.start) * fraction);
    }
}

/// Forwards progress clamped to `[0, 100]`, dropping updates that would move
/// backwards.
pub(crate) struct MonotonicProgress<'a> {
    inner: &'a dyn ProgressObserver,
    last: Mutex<Option<f32>>,
}

impl<'a> MonotonicProgress<'a> {
    pub(crate) fn new(inner: &'a dyn ProgressObserver) -> Self {
        Self {
            inner,
            last: Mutex::new(None),
        }
    }
}

impl ProgressObserver for MonotonicProgress<'_> {
    fn on_progress(&self, percent: f32) {
        if percent.is_nan() {
            return;
        }
        let percent = percent.clamp(0.0, 100.0);
        let Ok(mut last) = self.last.lock() else {
            return;
        };
        if last.is_some_and(|prev| percent < prev) {
            return;
        }
        *last = Some(percent);
        drop(last);
        self.inner.on_progress(percent);
    }
}

//! ONNX Runtime session settings.
//!
//! These mirror the handful of `SessionBuilder` knobs worth exposing for a
//! single-input classifier and translate into the `ort` types when a session
//! is committed.

use super::{ConfigError, ConfigValidator};
use ort::logging::LogLevel;
use ort::session::builder::GraphOptimizationLevel;
use serde::{Deserialize, Serialize};

/// How aggressively ONNX Runtime rewrites the graph before running it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrtGraphOptimizationLevel {
    /// Runs the graph as exported.
    DisableAll,
    /// Constant folding and redundant node elimination.
    #[default]
    Level1,
    /// Adds node fusions.
    Level2,
    /// Adds layout optimizations.
    Level3,
}

impl From<OrtGraphOptimizationLevel> for GraphOptimizationLevel {
    fn from(level: OrtGraphOptimizationLevel) -> Self {
        match level {
            OrtGraphOptimizationLevel::DisableAll => GraphOptimizationLevel::Disable,
            OrtGraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
            OrtGraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
            OrtGraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        }
    }
}

/// Minimum severity of messages ONNX Runtime emits itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrtLogSeverity {
    /// Everything, including per-node tracing.
    Verbose,
    Info,
    Warning,
    /// Errors only.
    #[default]
    Error,
    /// Only failures that abort the session.
    Fatal,
}

impl From<OrtLogSeverity> for LogLevel {
    fn from(severity: OrtLogSeverity) -> Self {
        match severity {
            OrtLogSeverity::Verbose => LogLevel::Verbose,
            OrtLogSeverity::Info => LogLevel::Info,
            OrtLogSeverity::Warning => LogLevel::Warning,
            OrtLogSeverity::Error => LogLevel::Error,
            OrtLogSeverity::Fatal => LogLevel::Fatal,
        }
    }
}

/// Settings applied to every pooled session.
///
/// Unset thread and optimization fields keep ONNX Runtime's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrtSessionConfig {
    /// Threads used inside a single operator.
    pub intra_threads: Option<usize>,
    /// Threads used to run independent operators concurrently.
    pub inter_threads: Option<usize>,
    /// Runs independent branches in parallel instead of in sequence.
    pub parallel_execution: Option<bool>,
    /// Graph rewrites applied before the session is committed.
    pub optimization_level: Option<OrtGraphOptimizationLevel>,
    /// Severity below which ONNX Runtime's own log output is dropped.
    pub log_severity: OrtLogSeverity,
}

impl OrtSessionConfig {
    /// Creates a configuration that keeps every ONNX Runtime default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-operator thread count.
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = Some(threads);
        self
    }

    /// Sets the cross-operator thread count.
    pub fn with_inter_threads(mut self, threads: usize) -> Self {
        self.inter_threads = Some(threads);
        self
    }

    /// Enables or disables parallel execution mode.
    pub fn with_parallel_execution(mut self, enabled: bool) -> Self {
        self.parallel_execution = Some(enabled);
        self
    }

    /// Sets the graph optimization level.
    pub fn with_optimization_level(mut self, level: OrtGraphOptimizationLevel) -> Self {
        self.optimization_level = Some(level);
        self
    }

    /// Sets the minimum ONNX Runtime log severity.
    pub fn with_log_severity(mut self, severity: OrtLogSeverity) -> Self {
        self.log_severity = severity;
        self
    }
}

impl ConfigValidator for OrtSessionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(threads) = self.intra_threads {
            self.validate_positive_usize(threads, "intra_threads")?;
        }
        if let Some(threads) = self.inter_threads {
            self.validate_positive_usize(threads, "inter_threads")?;
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

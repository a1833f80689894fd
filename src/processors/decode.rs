//! Top-k decoding of raw class scores into labelled predictions.

use crate::core::errors::{EffNetError, EffNetResult};
use crate::domain::{Classification, LabelTable, Prediction};
use std::sync::Arc;

/// Ranks raw scores and attaches locale-specific labels.
#[derive(Debug, Clone)]
pub struct ResultDecoder {
    labels: Arc<LabelTable>,
}

impl ResultDecoder {
    /// Creates a decoder over the given label tables.
    pub fn new(labels: impl Into<Arc<LabelTable>>) -> Self {
        Self {
            labels: labels.into(),
        }
    }

    /// The label tables this decoder reads from.
    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Selects the `top_k` best classes from `scores`.
    ///
    /// Predictions are sorted by descending score; equal scores keep ascending
    /// class order. NaN scores rank below every number. A `top_k` larger than
    /// the number of classes returns every class.
    ///
    /// # Errors
    ///
    /// * [`EffNetError::InvalidTopK`] when `top_k` is 0.
    /// * [`EffNetError::UnsupportedLocale`] when `locale` has no label table.
    pub fn decode(
        &self,
        scores: &[f32],
        top_k: usize,
        locale: &str,
    ) -> EffNetResult<Classification> {
        if top_k == 0 {
            return Err(EffNetError::InvalidTopK { top_k: 0 });
        }
        let names = self.labels.labels(locale)?;

        let predictions = top_k_indices(scores, top_k)
            .into_iter()
            .map(|class_id| Prediction {
                label: label_for(names, class_id, locale),
                score: scores[class_id],
                class_id,
            })
            .collect();

        Ok(Classification { predictions })
    }
}

/// Validates a signed top-k request.
///
/// # Errors
///
/// Returns [`EffNetError::InvalidTopK`] for zero or negative values.
pub fn validate_top_k(top_k: i64) -> EffNetResult<usize> {
    usize::try_from(top_k)
        .ok()
        .filter(|&k| k > 0)
        .ok_or(EffNetError::InvalidTopK { top_k })
}

fn rank_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        // Folds -0.0 into 0.0 so the two compare as a tie.
        score + 0.0
    }
}

fn top_k_indices(scores: &[f32], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        rank_key(scores[b])
            .total_cmp(&rank_key(scores[a]))
            .then_with(|| a.cmp(&b))
    });
    order.truncate(k.min(scores.len()));
    order
}

fn label_for(names: &[String], class_id: usize, locale: &str) -> String {
    match names.get(class_id) {
        Some(name) => name.clone(),
        None => {
            tracing::warn!(
                class_id,
                locale,
                classes = names.len(),
                "class index outside label table"
            );
            format!("Unknown({class_id})")
        }
    }
}

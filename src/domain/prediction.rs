//! Ranked prediction types returned by the classifier.

use serde::{Deserialize, Serialize};

/// A single labelled class score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Human readable class name in the requested locale.
    pub label: String,
    /// Raw score produced by the model for this class.
    pub score: f32,
    /// Index of the class in the model output.
    pub class_id: usize,
}

/// Predictions for one image, best first.
///
/// Holds at most the requested number of predictions, sorted by descending
/// score with ties broken by ascending class index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub predictions: Vec<Prediction>,
}

impl Classification {
    /// The highest-ranked prediction, if any.
    pub fn top(&self) -> Option<&Prediction> {
        self.predictions.first()
    }

    /// Number of predictions.
    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    /// Whether no predictions were produced.
    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    /// Iterates over the predictions in rank order.
    pub fn iter(&self) -> std::slice::Iter<'_, Prediction> {
        self.predictions.iter()
    }
}

impl IntoIterator for Classification {
    type Item = Prediction;
    type IntoIter = std::vec::IntoIter<Prediction>;

    fn into_iter(self) -> Self::IntoIter {
        self.predictions.into_iter()
    }
}

impl<'a> IntoIterator for &'a Classification {
    type Item = &'a Prediction;
    type IntoIter = std::slice::Iter<'a, Prediction>;

    fn into_iter(self) -> Self::IntoIter {
        self.predictions.iter()
    }
}

//! Model bundle
//!
//! A bundle is a JSON document exported next to the training run. It pairs
//! a fitted vectorizer with a fitted classifier and may carry the held-out
//! evaluation that was computed at export time.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::classifier::{build_classifier, Classifier, ClassifierSpec};
use super::vectorizer::{TextVectorizer, Vectorizer, VectorizerSpec};
use crate::error::ModelError;

/// Bundle format understood by this build
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

// ============================================================================
// SERIALIZED FORM
// ============================================================================

#[derive(Debug, Deserialize)]
struct BundleFile {
    format_version: u32,
    #[serde(default)]
    classes: Option<Vec<i64>>,
    vectorizer: VectorizerSpec,
    model: ClassifierSpec,
    #[serde(default)]
    classification_report: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    y_true: Option<Vec<i64>>,
    #[serde(default)]
    y_pred: Option<Vec<i64>>,
}

// ============================================================================
// EVALUATION ARTIFACTS
// ============================================================================

/// Per-class metrics row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    pub support: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportEntry {
    Metrics(ClassMetrics),
    /// Single summary value, e.g. accuracy
    Scalar(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub key: String,
    pub entry: ReportEntry,
}

/// Classification report rows, in the order they were exported
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub rows: Vec<ReportRow>,
}

impl ClassificationReport {
    fn from_map(map: serde_json::Map<String, Value>) -> Result<Self, ModelError> {
        let rows = map
            .into_iter()
            .map(|(key, value)| -> Result<ReportRow, ModelError> {
                let entry = serde_json::from_value(value)?;
                Ok(ReportRow { key, entry })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }
}

/// Held-out evaluation; only exists when report and both label lists were exported
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub report: ClassificationReport,
    pub y_true: Vec<i64>,
    pub y_pred: Vec<i64>,
}

// ============================================================================
// BUNDLE
// ============================================================================

/// Where a bundle came from
#[derive(Debug, Clone, Serialize)]
pub struct BundleSource {
    pub path: PathBuf,
    pub sha256: String,
    pub loaded_at: DateTime<Utc>,
}

/// A loaded, validated bundle; never mutated after load
#[derive(Debug)]
pub struct ModelBundle {
    pub model: Box<dyn Classifier>,
    pub vectorizer: Box<dyn Vectorizer>,
    /// Class order exported with the model, if any
    pub declared_classes: Option<Vec<i64>>,
    pub evaluation: Option<Evaluation>,
    pub source: BundleSource,
}

impl ModelBundle {
    /// Read, parse and validate a bundle file
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path)?;
        Self::from_slice(&bytes, path)
    }

    pub fn from_slice(bytes: &[u8], path: &Path) -> Result<Self, ModelError> {
        let file: BundleFile = serde_json::from_slice(bytes)?;

        if file.format_version != BUNDLE_FORMAT_VERSION {
            return Err(ModelError::Invalid(format!(
                "unsupported format_version {} (expected {})",
                file.format_version, BUNDLE_FORMAT_VERSION
            )));
        }

        let vectorizer = TextVectorizer::from_spec(file.vectorizer)?;
        let model = build_classifier(file.model, file.classes.as_deref())?;

        if !model.accepts_width(vectorizer.n_features()) {
            return Err(ModelError::DimensionMismatch {
                expected: model.n_features(),
                actual: vectorizer.n_features(),
            });
        }

        let evaluation = match (file.classification_report, file.y_true, file.y_pred) {
            (Some(_), Some(y_true), Some(y_pred)) if y_true.len() != y_pred.len() => {
                tracing::warn!(
                    "Bundle {}: y_true has {} labels but y_pred has {}, evaluation dropped",
                    path.display(),
                    y_true.len(),
                    y_pred.len()
                );
                None
            }
            (Some(report), Some(y_true), Some(y_pred)) => match ClassificationReport::from_map(report) {
                Ok(report) => Some(Evaluation {
                    report,
                    y_true,
                    y_pred,
                }),
                Err(e) => {
                    tracing::warn!(
                        "Bundle {}: classification report is unreadable ({}), evaluation dropped",
                        path.display(),
                        e
                    );
                    None
                }
            },
            _ => None,
        };

        Ok(Self {
            model,
            vectorizer: Box::new(vectorizer),
            declared_classes: file.classes,
            evaluation,
            source: BundleSource {
                path: path.to_path_buf(),
                sha256: hex::encode(Sha256::digest(bytes)),
                loaded_at: Utc::now(),
            },
        })
    }

    /// Vectorize and predict a batch of texts in one call each
    pub fn predict_texts(&self, texts: &[&str]) -> Result<Vec<i64>, ModelError> {
        let rows = self.vectorizer.transform(texts)?;
        self.model.predict(&rows)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::json;

    /// Three-class naive Bayes over a tiny vocabulary
    pub fn nb_bundle_json(with_evaluation: bool) -> serde_json::Value {
        let mut bundle = json!({
            "format_version": 1,
            "classes": [0, 1, 2],
            "vectorizer": {
                "type": "tfidf",
                "vocabulary": {"bad": 0, "great": 1, "okay": 2, "app": 3},
                "idf": [1.0, 1.0, 1.0, 1.0]
            },
            "model": {
                "type": "multinomial_nb",
                "class_log_prior": [-1.1, -1.1, -1.1],
                "feature_log_prob": [
                    [-0.2, -4.0, -3.0, -1.5],
                    [-4.0, -0.2, -3.0, -1.5],
                    [-3.0, -3.0, -0.2, -1.5]
                ]
            }
        });
        if with_evaluation {
            bundle["classification_report"] = json!({
                "0": {"precision": 1.0, "recall": 1.0, "f1-score": 1.0, "support": 2.0},
                "1": {"precision": 0.5, "recall": 1.0, "f1-score": 0.6667, "support": 1.0},
                "2": {"precision": 0.0, "recall": 0.0, "f1-score": 0.0, "support": 1.0},
                "accuracy": 0.75,
                "macro avg": {"precision": 0.5, "recall": 0.6667, "f1-score": 0.5556, "support": 4.0}
            });
            bundle["y_true"] = json!([0, 1, 2, 0]);
            bundle["y_pred"] = json!([0, 1, 1, 0]);
        }
        bundle
    }

    /// Binary linear model that always leans positive on "great"
    pub fn linear_bundle_json() -> serde_json::Value {
        json!({
            "format_version": 1,
            "vectorizer": {
                "type": "count",
                "vocabulary": {"bad": 0, "great": 1}
            },
            "model": {
                "type": "linear",
                "coef": [[-2.0, 2.0]],
                "intercept": [-0.1]
            }
        })
    }
}

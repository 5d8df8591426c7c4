//! Fitted classifiers
//!
//! Only evaluation of exported parameters lives here; fitting happens
//! elsewhere, before the bundle is written.

use serde::Deserialize;

use super::features::SparseVector;
use crate::error::ModelError;

/// Predicts one class id per feature row
pub trait Classifier: std::fmt::Debug + Send + Sync {
    fn predict(&self, rows: &[SparseVector]) -> Result<Vec<i64>, ModelError>;

    /// Class ids in the order the classifier scores them
    fn classes(&self) -> &[i64];

    fn n_features(&self) -> usize;

    /// Whether rows of this width can be scored
    fn accepts_width(&self, width: usize) -> bool {
        width == self.n_features()
    }

    /// Short kind name for listings
    fn kind(&self) -> &'static str;
}

// ============================================================================
// SERIALIZED FORM
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassifierSpec {
    MultinomialNb {
        class_log_prior: Vec<f64>,
        feature_log_prob: Vec<Vec<f64>>,
    },
    Linear {
        coef: Vec<Vec<f64>>,
        intercept: Vec<f64>,
    },
    RandomForest {
        trees: Vec<TreeSpec>,
    },
}

/// One decision tree as flat node arrays; `children_left[i] == -1` marks a leaf
#[derive(Debug, Clone, Deserialize)]
pub struct TreeSpec {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

/// Build a classifier, checking it against the declared class list
pub fn build_classifier(
    spec: ClassifierSpec,
    declared_classes: Option<&[i64]>,
) -> Result<Box<dyn Classifier>, ModelError> {
    match spec {
        ClassifierSpec::MultinomialNb { class_log_prior, feature_log_prob } => {
            let n_classes = class_log_prior.len();
            let n_features = uniform_width(&feature_log_prob, n_classes, "feature_log_prob")?;
            Ok(Box::new(MultinomialNb {
                classes: resolve_classes(declared_classes, n_classes)?,
                class_log_prior,
                feature_log_prob,
                n_features,
            }))
        }
        ClassifierSpec::Linear { coef, intercept } => {
            if intercept.len() != coef.len() {
                return Err(ModelError::DimensionMismatch {
                    expected: coef.len(),
                    actual: intercept.len(),
                });
            }
            let n_features = uniform_width(&coef, coef.len(), "coef")?;
            // A single coefficient row is a binary decision function
            let n_classes = if coef.len() == 1 { 2 } else { coef.len() };
            Ok(Box::new(LinearClassifier {
                classes: resolve_classes(declared_classes, n_classes)?,
                coef,
                intercept,
                n_features,
            }))
        }
        ClassifierSpec::RandomForest { trees } => {
            let first = trees
                .first()
                .ok_or_else(|| ModelError::Invalid("random forest has no trees".into()))?;
            let n_classes = first.value.first().map(Vec::len).unwrap_or(0);
            let n_features = trees
                .iter()
                .flat_map(|t| t.feature.iter())
                .filter(|f| **f >= 0)
                .map(|f| *f as usize + 1)
                .max()
                .unwrap_or(0);
            let trees = trees
                .into_iter()
                .map(|t| DecisionTree::from_spec(t, n_classes))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Box::new(RandomForest {
                classes: resolve_classes(declared_classes, n_classes)?,
                trees,
                n_features,
            }))
        }
    }
}

fn resolve_classes(declared: Option<&[i64]>, n_classes: usize) -> Result<Vec<i64>, ModelError> {
    if n_classes == 0 {
        return Err(ModelError::Invalid("classifier has no classes".into()));
    }
    match declared {
        Some(classes) if classes.len() != n_classes => Err(ModelError::Invalid(format!(
            "bundle declares {} classes but classifier scores {}",
            classes.len(),
            n_classes
        ))),
        Some(classes) => Ok(classes.to_vec()),
        None => Ok((0..n_classes as i64).collect()),
    }
}

/// Check a weight matrix has `rows` rows of equal, non-zero width
fn uniform_width(matrix: &[Vec<f64>], rows: usize, what: &str) -> Result<usize, ModelError> {
    if matrix.len() != rows || rows == 0 {
        return Err(ModelError::Invalid(format!(
            "{} has {} rows, expected {}",
            what,
            matrix.len(),
            rows
        )));
    }
    let width = matrix[0].len();
    if width == 0 || matrix.iter().any(|row| row.len() != width) {
        return Err(ModelError::Invalid(format!("{} rows have inconsistent widths", what)));
    }
    Ok(width)
}

fn check_width(rows: &[SparseVector], n_features: usize) -> Result<(), ModelError> {
    match rows.iter().find(|row| row.dim() != n_features) {
        Some(row) => Err(ModelError::DimensionMismatch {
            expected: n_features,
            actual: row.dim(),
        }),
        None => Ok(()),
    }
}

/// Index of the first maximum
fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, score) in scores.iter().enumerate() {
        if *score > scores[best] {
            best = i;
        }
    }
    best
}

// ============================================================================
// MULTINOMIAL NAIVE BAYES
// ============================================================================

#[derive(Debug)]
pub struct MultinomialNb {
    classes: Vec<i64>,
    class_log_prior: Vec<f64>,
    feature_log_prob: Vec<Vec<f64>>,
    n_features: usize,
}

impl Classifier for MultinomialNb {
    fn predict(&self, rows: &[SparseVector]) -> Result<Vec<i64>, ModelError> {
        check_width(rows, self.n_features)?;
        Ok(rows
            .iter()
            .map(|row| {
                let joint: Vec<f64> = self
                    .feature_log_prob
                    .iter()
                    .zip(&self.class_log_prior)
                    .map(|(log_prob, prior)| row.dot(log_prob) + prior)
                    .collect();
                self.classes[argmax(&joint)]
            })
            .collect())
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn kind(&self) -> &'static str {
        "multinomial_nb"
    }
}

// ============================================================================
// LINEAR MODELS
// ============================================================================

#[derive(Debug)]
pub struct LinearClassifier {
    classes: Vec<i64>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
    n_features: usize,
}

impl Classifier for LinearClassifier {
    fn predict(&self, rows: &[SparseVector]) -> Result<Vec<i64>, ModelError> {
        check_width(rows, self.n_features)?;
        Ok(rows
            .iter()
            .map(|row| {
                let scores: Vec<f64> = self
                    .coef
                    .iter()
                    .zip(&self.intercept)
                    .map(|(w, b)| row.dot(w) + b)
                    .collect();
                if scores.len() == 1 {
                    self.classes[usize::from(scores[0] > 0.0)]
                } else {
                    self.classes[argmax(&scores)]
                }
            })
            .collect())
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn kind(&self) -> &'static str {
        "linear"
    }
}

// ============================================================================
// RANDOM FOREST
// ============================================================================

#[derive(Debug)]
struct DecisionTree {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    /// Leaf class distributions, normalised to probabilities
    value: Vec<Vec<f64>>,
}

impl DecisionTree {
    fn from_spec(spec: TreeSpec, n_classes: usize) -> Result<Self, ModelError> {
        let n_nodes = spec.children_left.len();
        if n_nodes == 0
            || spec.children_right.len() != n_nodes
            || spec.feature.len() != n_nodes
            || spec.threshold.len() != n_nodes
            || spec.value.len() != n_nodes
        {
            return Err(ModelError::Invalid("tree node arrays have mismatched lengths".into()));
        }

        for node in 0..n_nodes {
            let (left, right) = (spec.children_left[node], spec.children_right[node]);
            if left == -1 {
                if spec.value[node].len() != n_classes {
                    return Err(ModelError::Invalid(format!(
                        "leaf {} has {} class values, expected {}",
                        node,
                        spec.value[node].len(),
                        n_classes
                    )));
                }
                continue;
            }
            // Children always come after their parent, so traversal terminates
            let in_range = |child: i64| child > node as i64 && (child as usize) < n_nodes;
            if !in_range(left) || !in_range(right) || spec.feature[node] < 0 {
                return Err(ModelError::Invalid(format!("tree node {} is malformed", node)));
            }
        }

        let value = spec
            .value
            .into_iter()
            .map(|row| {
                let total: f64 = row.iter().sum();
                if total > 0.0 {
                    row.into_iter().map(|v| v / total).collect()
                } else {
                    row
                }
            })
            .collect();

        Ok(Self {
            children_left: spec.children_left,
            children_right: spec.children_right,
            feature: spec.feature,
            threshold: spec.threshold,
            value,
        })
    }

    fn leaf(&self, row: &SparseVector) -> &[f64] {
        let mut node = 0usize;
        while self.children_left[node] != -1 {
            let x = row.get(self.feature[node] as usize);
            node = if x <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        &self.value[node]
    }
}

#[derive(Debug)]
pub struct RandomForest {
    classes: Vec<i64>,
    trees: Vec<DecisionTree>,
    n_features: usize,
}

impl Classifier for RandomForest {
    fn predict(&self, rows: &[SparseVector]) -> Result<Vec<i64>, ModelError> {
        if let Some(row) = rows.iter().find(|row| !self.accepts_width(row.dim())) {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_features,
                actual: row.dim(),
            });
        }

        Ok(rows
            .iter()
            .map(|row| {
                let mut proba = vec![0.0; self.classes.len()];
                for tree in &self.trees {
                    for (acc, p) in proba.iter_mut().zip(tree.leaf(row)) {
                        *acc += p;
                    }
                }
                self.classes[argmax(&proba)]
            })
            .collect())
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn accepts_width(&self, width: usize) -> bool {
        width >= self.n_features
    }

    fn kind(&self) -> &'static str {
        "random_forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn row(dim: usize, entries: &[(usize, f64)]) -> SparseVector {
        SparseVector::from_entries(dim, entries.iter().copied().collect::<BTreeMap<_, _>>())
    }

    fn spec(json: serde_json::Value) -> ClassifierSpec {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_multinomial_nb() {
        let clf = build_classifier(
            spec(serde_json::json!({
                "type": "multinomial_nb",
                "class_log_prior": [-1.0, -1.0, -1.0],
                "feature_log_prob": [[-0.5, -3.0], [-3.0, -0.5], [-1.5, -1.5]]
            })),
            Some(&[0, 1, 2][..]),
        )
        .unwrap();

        let preds = clf
            .predict(&[row(2, &[(0, 1.0)]), row(2, &[(1, 1.0)])])
            .unwrap();
        assert_eq!(preds, vec![0, 1]);
    }

    #[test]
    fn test_linear_binary() {
        let clf = build_classifier(
            spec(serde_json::json!({
                "type": "linear",
                "coef": [[2.0, -2.0]],
                "intercept": [0.0]
            })),
            None,
        )
        .unwrap();

        assert_eq!(clf.classes(), &[0, 1]);
        let preds = clf
            .predict(&[row(2, &[(0, 1.0)]), row(2, &[(1, 1.0)]), row(2, &[])])
            .unwrap();
        assert_eq!(preds, vec![1, 0, 0]);
    }

    #[test]
    fn test_linear_multiclass_uses_declared_classes() {
        let clf = build_classifier(
            spec(serde_json::json!({
                "type": "linear",
                "coef": [[1.0, 0.0], [0.0, 1.0], [0.5, 0.5]],
                "intercept": [0.0, 0.0, 0.1]
            })),
            Some(&[10, 20, 30][..]),
        )
        .unwrap();

        let preds = clf.predict(&[row(2, &[(1, 1.0)]), row(2, &[])]).unwrap();
        assert_eq!(preds, vec![20, 30]);
    }

    #[test]
    fn test_random_forest_majority() {
        let stump = |threshold: f64| {
            serde_json::json!({
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [0, -2, -2],
                "threshold": [threshold, -2.0, -2.0],
                "value": [[5.0, 5.0], [9.0, 1.0], [1.0, 9.0]]
            })
        };
        let clf = build_classifier(
            spec(serde_json::json!({
                "type": "random_forest",
                "trees": [stump(0.5), stump(0.5), stump(2.0)]
            })),
            None,
        )
        .unwrap();

        assert_eq!(clf.n_features(), 1);
        // x = 1.0 goes right in two of three trees
        let preds = clf.predict(&[row(1, &[(0, 1.0)]), row(1, &[])]).unwrap();
        assert_eq!(preds, vec![1, 0]);
    }

    #[test]
    fn test_declared_class_count_mismatch() {
        let err = build_classifier(
            spec(serde_json::json!({
                "type": "multinomial_nb",
                "class_log_prior": [-0.7, -0.7],
                "feature_log_prob": [[-1.0], [-1.0]]
            })),
            Some(&[0, 1, 2][..]),
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::Invalid(_)));
    }

    #[test]
    fn test_malformed_tree_rejected() {
        let err = build_classifier(
            spec(serde_json::json!({
                "type": "random_forest",
                "trees": [{
                    "children_left": [0, -1],
                    "children_right": [1, -1],
                    "feature": [0, -2],
                    "threshold": [0.5, -2.0],
                    "value": [[1.0, 1.0], [1.0, 0.0]]
                }]
            })),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::Invalid(_)));
    }

    #[test]
    fn test_dimension_mismatch() {
        let clf = build_classifier(
            spec(serde_json::json!({
                "type": "linear",
                "coef": [[1.0, 0.0]],
                "intercept": [0.0]
            })),
            None,
        )
        .unwrap();
        let err = clf.predict(&[row(3, &[])]).unwrap_err();
        assert!(matches!(err, ModelError::DimensionMismatch { expected: 2, actual: 3 }));
    }
}

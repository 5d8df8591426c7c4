//! Evaluation views: classification report table and confusion matrix

use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::{label_name, Evaluation, ReportEntry};
use crate::store::{ModelRegistry, RegisteredModel};

pub const EVALUATION_UNAVAILABLE: &str = "Evaluation is not available for this model.";

/// One report line, numbers already formatted to 2 decimals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportTableRow {
    pub label: String,
    pub precision: String,
    pub recall: String,
    pub f1_score: String,
    pub support: String,
}

/// Rows are actual labels, columns predicted labels, both in `classes` order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfusionMatrix {
    pub classes: Vec<i64>,
    pub labels: Vec<String>,
    pub counts: Vec<Vec<u64>>,
}

impl ConfusionMatrix {
    pub fn max_count(&self) -> u64 {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelEvaluation {
    pub model: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Vec<ReportTableRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confusion_matrix: Option<ConfusionMatrix>,
}

/// Class order for the matrix: the exported class list, else sorted distinct `y_true`
pub fn class_order(declared: Option<&[i64]>, y_true: &[i64]) -> Vec<i64> {
    match declared {
        Some(classes) => classes.to_vec(),
        None => y_true.iter().copied().collect::<BTreeSet<_>>().into_iter().collect(),
    }
}

/// Count (actual, predicted) pairs; labels outside `order` are skipped
pub fn confusion_matrix(y_true: &[i64], y_pred: &[i64], order: &[i64]) -> Vec<Vec<u64>> {
    let position = |label: i64| order.iter().position(|c| *c == label);
    let mut counts = vec![vec![0u64; order.len()]; order.len()];

    for (actual, predicted) in y_true.iter().zip(y_pred) {
        if let (Some(i), Some(j)) = (position(*actual), position(*predicted)) {
            counts[i][j] += 1;
        }
    }
    counts
}

fn report_label(key: &str) -> String {
    match key.parse::<i64>() {
        Ok(id) => label_name(id),
        Err(_) => key.to_string(),
    }
}

pub fn report_table(evaluation: &Evaluation) -> Vec<ReportTableRow> {
    evaluation
        .report
        .rows
        .iter()
        .map(|row| {
            // A scalar row fills every column with its value
            let (precision, recall, f1_score, support) = match &row.entry {
                ReportEntry::Metrics(m) => (m.precision, m.recall, m.f1_score, m.support),
                ReportEntry::Scalar(v) => (*v, *v, *v, *v),
            };
            ReportTableRow {
                label: report_label(&row.key),
                precision: format!("{:.2}", precision),
                recall: format!("{:.2}", recall),
                f1_score: format!("{:.2}", f1_score),
                support: format!("{:.2}", support),
            }
        })
        .collect()
}

pub fn evaluate_model(entry: &RegisteredModel) -> ModelEvaluation {
    let Some(evaluation) = entry.bundle.evaluation.as_ref() else {
        return ModelEvaluation {
            model: entry.name.clone(),
            available: false,
            notice: Some(EVALUATION_UNAVAILABLE),
            report: None,
            confusion_matrix: None,
        };
    };

    // The same order drives both the counts and the axis labels
    let classes = class_order(entry.bundle.declared_classes.as_deref(), &evaluation.y_true);
    let counts = confusion_matrix(&evaluation.y_true, &evaluation.y_pred, &classes);
    let labels = classes.iter().map(|c| label_name(*c)).collect();

    ModelEvaluation {
        model: entry.name.clone(),
        available: true,
        notice: None,
        report: Some(report_table(evaluation)),
        confusion_matrix: Some(ConfusionMatrix {
            classes,
            labels,
            counts,
        }),
    }
}

/// Evaluation view for every registered model, in registry order
pub fn render_evaluation(registry: &ModelRegistry) -> Vec<ModelEvaluation> {
    registry.iter().map(evaluate_model).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bundle::fixtures::*;
    use crate::store::test_support::registry;

    #[test]
    fn test_confusion_matrix_diagonal() {
        let y_true = [0, 1, 2, 0];
        let y_pred = [0, 1, 1, 0];
        let order = class_order(None, &y_true);
        assert_eq!(order, vec![0, 1, 2]);

        let cm = confusion_matrix(&y_true, &y_pred, &order);
        assert_eq!(cm, vec![vec![2, 0, 0], vec![0, 1, 0], vec![0, 1, 0]]);
        assert_eq!(cm[0][0], 2);
    }

    #[test]
    fn test_declared_order_is_used_for_counts_and_labels() {
        let y_true = [0, 1, 2, 0];
        let y_pred = [0, 1, 1, 0];
        let order = class_order(Some(&[2, 1, 0][..]), &y_true);

        let cm = confusion_matrix(&y_true, &y_pred, &order);
        // Negative is now the last row and column
        assert_eq!(cm[2][2], 2);
        assert_eq!(cm[0][1], 1);
    }

    #[test]
    fn test_labels_outside_order_are_skipped() {
        let cm = confusion_matrix(&[0, 1, 5], &[0, 7, 1], &[0, 1]);
        assert_eq!(cm, vec![vec![1, 0], vec![0, 0]]);
    }

    #[test]
    fn test_report_formatting() {
        let (_dir, registry) = registry(&[("Naive Bayes", nb_bundle_json(true))]);
        let views = render_evaluation(&registry);
        let report = views[0].report.as_ref().unwrap();

        assert_eq!(report[0].label, "Negative");
        assert_eq!(report[1].f1_score, "0.67");
        assert_eq!(report[0].support, "2.00");

        let accuracy = &report[3];
        assert_eq!(accuracy.label, "accuracy");
        assert_eq!(accuracy.precision, "0.75");
        assert_eq!(accuracy.support, "0.75");
        assert_eq!(report[4].label, "macro avg");
    }

    #[test]
    fn test_matrix_view_matches_axis_labels() {
        let (_dir, registry) = registry(&[("Naive Bayes", nb_bundle_json(true))]);
        let views = render_evaluation(&registry);
        let cm = views[0].confusion_matrix.as_ref().unwrap();

        assert_eq!(cm.labels, vec!["Negative", "Positive", "Neutral"]);
        assert_eq!(cm.counts[0][0], 2);
        assert_eq!(cm.max_count(), 2);
    }

    #[test]
    fn test_missing_evaluation_does_not_block_others() {
        let (_dir, registry) = registry(&[
            ("Logistic Regression", linear_bundle_json()),
            ("Naive Bayes", nb_bundle_json(true)),
        ]);
        let views = render_evaluation(&registry);

        assert!(!views[0].available);
        assert_eq!(views[0].notice, Some(EVALUATION_UNAVAILABLE));
        assert!(views[0].confusion_matrix.is_none());
        assert!(views[1].available);
    }
}

//! Single-text prediction

use serde::Serialize;

use crate::error::ModelError;
use crate::models::{label_name, Commentary};
use crate::store::ModelRegistry;

pub const BLANK_TEXT_WARNING: &str = "Please enter a review text.";

/// One model's verdict on the submitted text
#[derive(Debug, Clone, Serialize)]
pub struct ModelPrediction {
    pub model: String,
    pub label_id: i64,
    pub label: String,
    pub commentary: Commentary,
    pub icon: &'static str,
    pub comment: &'static str,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SinglePrediction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub predictions: Vec<ModelPrediction>,
}

/// Run every registered model on one text, in registry order.
/// Blank text yields a warning and no predictions.
pub fn predict_one(text: &str, registry: &ModelRegistry) -> Result<SinglePrediction, ModelError> {
    if text.trim().is_empty() {
        return Ok(SinglePrediction {
            warning: Some(BLANK_TEXT_WARNING.to_string()),
            predictions: Vec::new(),
        });
    }

    let mut predictions = Vec::with_capacity(registry.len());
    for entry in registry.iter() {
        let ids = entry.bundle.predict_texts(&[text])?;
        let label_id = ids.first().copied().ok_or_else(|| {
            ModelError::Invalid(format!("model {} returned no prediction", entry.name))
        })?;

        let label = label_name(label_id);
        let commentary = Commentary::for_label(&label);
        tracing::debug!("{} predicted {} ({})", entry.name, label, label_id);

        predictions.push(ModelPrediction {
            model: entry.name.clone(),
            label_id,
            label,
            commentary,
            icon: commentary.icon(),
            comment: commentary.message(),
        });
    }

    Ok(SinglePrediction {
        warning: None,
        predictions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bundle::fixtures::*;
    use crate::store::test_support::registry;

    #[test]
    fn test_blank_text_warns() {
        let (_dir, registry) = registry(&[("Naive Bayes", nb_bundle_json(false))]);

        for text in ["", "   ", "\n\t"] {
            let result = predict_one(text, &registry).unwrap();
            assert_eq!(result.warning.as_deref(), Some(BLANK_TEXT_WARNING));
            assert!(result.predictions.is_empty());
        }
    }

    #[test]
    fn test_two_models_great_app() {
        let (_dir, registry) = registry(&[
            ("Naive Bayes", nb_bundle_json(false)),
            ("Logistic Regression", linear_bundle_json()),
        ]);

        let result = predict_one("great app", &registry).unwrap();
        assert!(result.warning.is_none());
        assert_eq!(result.predictions.len(), 2);
        assert_eq!(result.predictions[0].model, "Naive Bayes");
        assert_eq!(result.predictions[1].model, "Logistic Regression");

        for p in &result.predictions {
            assert_eq!(p.label, "Positive");
            assert_eq!(p.commentary, Commentary::Congratulation);
        }
    }

    #[test]
    fn test_commentary_follows_each_model() {
        let (_dir, registry) = registry(&[
            ("Naive Bayes", nb_bundle_json(false)),
            ("Logistic Regression", linear_bundle_json()),
        ]);

        // NB sees "okay" as neutral; the binary model falls back to negative
        let result = predict_one("okay", &registry).unwrap();
        assert_eq!(result.predictions[0].label, "Neutral");
        assert_eq!(result.predictions[0].commentary, Commentary::Informational);
        assert_eq!(result.predictions[1].label, "Negative");
        assert_eq!(result.predictions[1].commentary, Commentary::Caution);
    }

    #[test]
    fn test_unmapped_class_passes_through() {
        let mut bundle = nb_bundle_json(false);
        bundle["classes"] = serde_json::json!([0, 1, 5]);
        let (_dir, registry) = registry(&[("Naive Bayes", bundle)]);

        let result = predict_one("okay", &registry).unwrap();
        assert_eq!(result.predictions[0].label_id, 5);
        assert_eq!(result.predictions[0].label, "5");
        assert_eq!(result.predictions[0].commentary, Commentary::Informational);
    }

    #[test]
    fn test_empty_registry() {
        let result = predict_one("great app", &ModelRegistry::empty()).unwrap();
        assert!(result.warning.is_none());
        assert!(result.predictions.is_empty());
    }
}

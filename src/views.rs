//! HTML page rendering
//!
//! The page lives in `templates/index.html`; values are HTML-escaped by
//! minijinja because the template name ends in `.html`.

use minijinja::{context, Environment};
use palette::{Hsl, IntoColor, Srgb};
use serde::Serialize;
use uuid::Uuid;

use crate::logic::batch::DOWNLOAD_FILE_NAME;
use crate::logic::evaluation::{ConfusionMatrix, ReportTableRow};
use crate::logic::{BatchOutcome, ModelEvaluation, SinglePrediction};
use crate::store::ModelRegistry;

const INDEX_TEMPLATE: &str = "index.html";

/// Template environment with the page registered
pub fn environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template(INDEX_TEMPLATE, include_str!("../templates/index.html"))?;
    Ok(env)
}

/// Green scale cell colours: (background, text)
pub fn heat_color(count: u64, max: u64) -> (String, &'static str) {
    let fraction = if max == 0 { 0.0 } else { count as f32 / max as f32 };
    let hsl: Hsl = Hsl::new(130.0_f32, 0.45, 0.95 - 0.65 * fraction);
    let rgb: Srgb = hsl.into_color();
    let background = format!(
        "#{:02x}{:02x}{:02x}",
        (rgb.red * 255.0).round() as u8,
        (rgb.green * 255.0).round() as u8,
        (rgb.blue * 255.0).round() as u8
    );
    let text = if fraction > 0.5 { "#fff" } else { "#222" };
    (background, text)
}

#[derive(Debug, Serialize)]
struct HeatCell {
    count: u64,
    background: String,
    text: &'static str,
}

#[derive(Debug, Serialize)]
struct HeatRow<'a> {
    label: &'a str,
    cells: Vec<HeatCell>,
}

/// Confusion matrix with a colour per cell
#[derive(Debug, Serialize)]
struct Heatmap<'a> {
    labels: &'a [String],
    rows: Vec<HeatRow<'a>>,
}

impl<'a> From<&'a ConfusionMatrix> for Heatmap<'a> {
    fn from(matrix: &'a ConfusionMatrix) -> Self {
        let max = matrix.max_count();
        let rows = matrix
            .labels
            .iter()
            .zip(&matrix.counts)
            .map(|(label, counts)| HeatRow {
                label,
                cells: counts
                    .iter()
                    .map(|&count| {
                        let (background, text) = heat_color(count, max);
                        HeatCell { count, background, text }
                    })
                    .collect(),
            })
            .collect();
        Self {
            labels: &matrix.labels,
            rows,
        }
    }
}

#[derive(Debug, Serialize)]
struct EvaluationView<'a> {
    model: &'a str,
    notice: Option<&'static str>,
    report: Option<&'a [ReportTableRow]>,
    heatmap: Option<Heatmap<'a>>,
}

impl<'a> From<&'a ModelEvaluation> for EvaluationView<'a> {
    fn from(evaluation: &'a ModelEvaluation) -> Self {
        Self {
            model: &evaluation.model,
            notice: evaluation.notice,
            report: evaluation.report.as_deref(),
            heatmap: evaluation.confusion_matrix.as_ref().map(Heatmap::from),
        }
    }
}

/// Everything the single page can show
#[derive(Default)]
pub struct Page {
    pub warnings: Vec<String>,
    pub text: String,
    pub single: Option<SinglePrediction>,
    pub single_error: Option<String>,
    pub evaluations: Vec<ModelEvaluation>,
    pub batch: Option<BatchOutcome>,
    pub download_id: Option<Uuid>,
    pub batch_error: Option<String>,
}

impl Page {
    pub fn new(registry: &ModelRegistry, evaluations: Vec<ModelEvaluation>) -> Self {
        Self {
            warnings: registry.warnings().to_vec(),
            evaluations,
            ..Default::default()
        }
    }

    pub fn render(&self, env: &Environment<'_>) -> Result<String, minijinja::Error> {
        let evaluations: Vec<EvaluationView> =
            self.evaluations.iter().map(EvaluationView::from).collect();

        env.get_template(INDEX_TEMPLATE)?.render(context! {
            warnings => &self.warnings,
            text => &self.text,
            single => &self.single,
            single_error => &self.single_error,
            evaluations => evaluations,
            batch => &self.batch,
            batch_summary => self.batch.as_ref().map(BatchOutcome::summary),
            batch_error => &self.batch_error,
            download_id => self.download_id,
            download_name => DOWNLOAD_FILE_NAME,
        })
    }
}

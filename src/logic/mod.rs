//! Prediction and evaluation logic shared by the HTML and JSON surfaces

pub mod predict;
pub mod evaluation;
pub mod batch;

pub use predict::{predict_one, ModelPrediction, SinglePrediction};
pub use evaluation::{render_evaluation, ModelEvaluation};
pub use batch::{predict_batch, BatchOutcome};

//! Model artifacts: labels, vectorizers, classifiers and bundles

pub mod label;
pub mod features;
pub mod vectorizer;
pub mod classifier;
pub mod bundle;

pub use label::*;
pub use bundle::*;

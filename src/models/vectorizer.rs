//! Text vectorizers
//!
//! Turns raw review text into sparse feature rows using the vocabulary and
//! weights fitted at export time. Tokenization follows the usual
//! bag-of-words convention: optional lower-casing, a regex token pattern,
//! then word n-grams joined by a single space.

use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde::{Deserialize, Deserializer};

use super::features::SparseVector;
use crate::error::ModelError;

/// Default token pattern: words of two or more characters
pub const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

/// Converts a batch of documents into feature rows
pub trait Vectorizer: std::fmt::Debug + Send + Sync {
    fn transform(&self, docs: &[&str]) -> Result<Vec<SparseVector>, ModelError>;

    /// Width of every produced row
    fn n_features(&self) -> usize;
}

// ============================================================================
// SERIALIZED FORM
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VectorizerSpec {
    Tfidf(TextVectorizerSpec),
    Count(TextVectorizerSpec),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Norm {
    L1,
    L2,
    None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextVectorizerSpec {
    pub vocabulary: HashMap<String, usize>,
    #[serde(default)]
    pub idf: Option<Vec<f64>>,
    #[serde(default = "default_lowercase")]
    pub lowercase: bool,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub sublinear_tf: bool,
    /// Missing key: type default. Explicit `null`: no normalisation.
    #[serde(default, deserialize_with = "present_norm")]
    pub norm: Option<Option<Norm>>,
    #[serde(default)]
    pub binary: bool,
    #[serde(default = "default_token_pattern")]
    pub token_pattern: String,
}

fn default_lowercase() -> bool {
    true
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_token_pattern() -> String {
    DEFAULT_TOKEN_PATTERN.to_string()
}

fn present_norm<'de, D>(deserializer: D) -> Result<Option<Option<Norm>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Norm>::deserialize(deserializer).map(Some)
}

// ============================================================================
// FITTED VECTORIZER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Weighting {
    Count,
    Tfidf,
}

#[derive(Debug)]
pub struct TextVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Option<Vec<f64>>,
    lowercase: bool,
    ngram_range: (usize, usize),
    sublinear_tf: bool,
    norm: Norm,
    binary: bool,
    token_pattern: Regex,
}

impl TextVectorizer {
    /// Validate the serialized form and compile the token pattern
    pub fn from_spec(spec: VectorizerSpec) -> Result<Self, ModelError> {
        let (weighting, spec) = match spec {
            VectorizerSpec::Tfidf(spec) => (Weighting::Tfidf, spec),
            VectorizerSpec::Count(spec) => (Weighting::Count, spec),
        };

        let n_features = spec.vocabulary.len();
        if n_features == 0 {
            return Err(ModelError::Invalid("vectorizer vocabulary is empty".into()));
        }

        let mut seen = vec![false; n_features];
        for (term, &index) in &spec.vocabulary {
            if index >= n_features || seen[index] {
                return Err(ModelError::Invalid(format!(
                    "vocabulary index {} for term '{}' is out of range or duplicated",
                    index, term
                )));
            }
            seen[index] = true;
        }

        let (min_n, max_n) = spec.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(ModelError::Invalid(format!(
                "invalid ngram_range ({}, {})",
                min_n, max_n
            )));
        }

        let idf = match (weighting, spec.idf) {
            (Weighting::Tfidf, None) => {
                return Err(ModelError::Invalid("tfidf vectorizer is missing idf weights".into()))
            }
            (_, Some(idf)) if idf.len() != n_features => {
                return Err(ModelError::DimensionMismatch {
                    expected: n_features,
                    actual: idf.len(),
                })
            }
            (_, idf) => idf,
        };

        let norm = match spec.norm {
            Some(explicit) => explicit.unwrap_or(Norm::None),
            None => match weighting {
                Weighting::Tfidf => Norm::L2,
                Weighting::Count => Norm::None,
            },
        };

        Ok(Self {
            vocabulary: spec.vocabulary,
            idf,
            lowercase: spec.lowercase,
            ngram_range: spec.ngram_range,
            sublinear_tf: spec.sublinear_tf,
            norm,
            binary: spec.binary,
            token_pattern: Regex::new(&spec.token_pattern)?,
        })
    }

    /// Split a document into vocabulary terms (tokens and n-grams)
    pub fn analyze(&self, doc: &str) -> Vec<String> {
        let text = if self.lowercase {
            doc.to_lowercase()
        } else {
            doc.to_string()
        };

        let tokens: Vec<&str> = self
            .token_pattern
            .find_iter(&text)
            .map(|m| m.as_str())
            .collect();

        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n.min(tokens.len()) {
            for window in tokens.windows(n) {
                terms.push(window.join(" "));
            }
        }
        terms
    }

    fn transform_one(&self, doc: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in self.analyze(doc) {
            if let Some(&index) = self.vocabulary.get(&term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        for (&index, value) in counts.iter_mut() {
            if self.binary {
                *value = 1.0;
            } else if self.sublinear_tf {
                *value = 1.0 + value.ln();
            }
            if let Some(idf) = &self.idf {
                *value *= idf[index];
            }
        }

        let mut row = SparseVector::from_entries(self.vocabulary.len(), counts);
        match self.norm {
            Norm::L1 => row.normalize_l1(),
            Norm::L2 => row.normalize_l2(),
            Norm::None => {}
        }
        row
    }
}

impl Vectorizer for TextVectorizer {
    fn transform(&self, docs: &[&str]) -> Result<Vec<SparseVector>, ModelError> {
        Ok(docs.iter().map(|doc| self.transform_one(doc)).collect())
    }

    fn n_features(&self) -> usize {
        self.vocabulary.len()
    }
}

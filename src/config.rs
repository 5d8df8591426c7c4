//! Configuration module

use std::env;
use std::path::PathBuf;

/// Model list used when `SENTIMENT_MODELS` is not set
const DEFAULT_MODELS: &str =
    "Random Forest=models/rf_tuned_bundle.json;Naive Bayes=models/nb_tuned_bundle.json";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Model display name -> bundle path, in display order
    pub model_paths: Vec<(String, PathBuf)>,

    /// Maximum request body size (CSV uploads)
    pub max_upload_bytes: usize,

    /// How many batch results stay downloadable
    pub download_retention: usize,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let models = env::var("SENTIMENT_MODELS").unwrap_or_else(|_| DEFAULT_MODELS.to_string());

        Self {
            host: env::var("HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8501),

            model_paths: parse_model_paths(&models),

            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|b| b.parse().ok())
                .unwrap_or(10 * 1024 * 1024),

            download_retention: env::var("DOWNLOAD_RETENTION")
                .ok()
                .and_then(|n| n.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(16),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            model_paths: parse_model_paths(DEFAULT_MODELS),
            max_upload_bytes: 10 * 1024 * 1024,
            download_retention: 16,
            environment: "development".to_string(),
        }
    }
}

/// Parse `name=path;name=path` pairs. Broken entries are skipped, duplicate names keep the first.
pub fn parse_model_paths(raw: &str) -> Vec<(String, PathBuf)> {
    let mut out: Vec<(String, PathBuf)> = Vec::new();

    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((name, path)) = entry.split_once('=') else {
            tracing::warn!("Ignoring model entry without '=': {}", entry);
            continue;
        };
        let (name, path) = (name.trim(), path.trim());
        if name.is_empty() || path.is_empty() {
            tracing::warn!("Ignoring incomplete model entry: {}", entry);
            continue;
        }
        if out.iter().any(|(existing, _)| existing == name) {
            tracing::warn!("Duplicate model name '{}', keeping the first entry", name);
            continue;
        }
        out.push((name.to_string(), PathBuf::from(path)));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_models_in_order() {
        let paths = parse_model_paths(DEFAULT_MODELS);
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].0, "Random Forest");
        assert_eq!(paths[1].0, "Naive Bayes");
        assert_eq!(paths[1].1, PathBuf::from("models/nb_tuned_bundle.json"));
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let paths = parse_model_paths("A=a.json; broken ;=x.json;B=;C = c.json;A=other.json");
        let names: Vec<&str> = paths.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(paths[0].1, PathBuf::from("a.json"));
        assert_eq!(paths[1].1, PathBuf::from("c.json"));
    }
}

//! Batch prediction over an uploaded CSV

use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::models::label_name;
use crate::store::ModelRegistry;

/// Column that must hold the review text
pub const TEXT_COLUMN: &str = "ulasan";

/// File name offered for the augmented CSV
pub const DOWNLOAD_FILE_NAME: &str = "hasil_prediksi_sentimen.csv";

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Output column for a model: `pred_` + lower-cased name, spaces as underscores
pub fn prediction_column(model_name: &str) -> String {
    format!("pred_{}", model_name.to_lowercase().replace(' ', "_"))
}

/// A parsed CSV table: header plus string cells
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn from_csv(bytes: &[u8]) -> AppResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes);

        let mut headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if let Some(first) = headers.first_mut() {
            if let Some(stripped) = first.strip_prefix('\u{feff}') {
                *first = stripped.to_string();
            }
        }

        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, csv::Error>>()?;

        Ok(Self { headers, rows })
    }

    pub fn to_csv(&self) -> AppResult<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| AppError::Internal(format!("flushing CSV output: {}", e)))
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn column(&self, index: usize) -> Vec<&str> {
        self.rows.iter().map(|row| row[index].as_str()).collect()
    }

    /// Set a column, overwriting it in place when the name already exists
    pub fn set_column(&mut self, name: &str, values: Vec<String>) {
        match self.column_index(name) {
            Some(index) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[index] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub rows_read: usize,
    pub added_columns: Vec<String>,
    pub table: Table,
}

impl BatchOutcome {
    pub fn summary(&self) -> String {
        format!("Successfully read {} reviews.", self.rows_read)
    }
}

/// Predict every row of the uploaded CSV with every registered model.
/// A failing model aborts the whole batch.
pub fn predict_batch(bytes: &[u8], registry: &ModelRegistry) -> AppResult<BatchOutcome> {
    let mut table = Table::from_csv(bytes)?;

    let text_index = table
        .column_index(TEXT_COLUMN)
        .ok_or_else(|| AppError::MissingColumn(TEXT_COLUMN.to_string()))?;

    let rows_read = table.rows.len();
    tracing::info!("Batch prediction: {} rows, {} models", rows_read, registry.len());

    let mut added_columns = Vec::with_capacity(registry.len());
    for entry in registry.iter() {
        let ids = {
            let texts = table.column(text_index);
            entry.bundle.predict_texts(&texts)?
        };
        if ids.len() != rows_read {
            return Err(AppError::Internal(format!(
                "model {} returned {} predictions for {} rows",
                entry.name,
                ids.len(),
                rows_read
            )));
        }

        let column = prediction_column(&entry.name);
        table.set_column(&column, ids.into_iter().map(label_name).collect());
        added_columns.push(column);
    }

    Ok(BatchOutcome {
        rows_read,
        added_columns,
        table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bundle::fixtures::*;
    use crate::store::test_support::registry;

    const REVIEWS: &str = "id,ulasan,rating\n1,great app,5\n2,bad app,1\n3,okay,3\n";

    #[test]
    fn test_prediction_column_name() {
        assert_eq!(prediction_column("Random Forest"), "pred_random_forest");
        assert_eq!(prediction_column("Naive Bayes"), "pred_naive_bayes");
        assert_eq!(prediction_column("SVM"), "pred_svm");
    }

    #[test]
    fn test_batch_shape() {
        let (_dir, registry) = registry(&[
            ("Naive Bayes", nb_bundle_json(false)),
            ("Logistic Regression", linear_bundle_json()),
        ]);

        let outcome = predict_batch(REVIEWS.as_bytes(), &registry).unwrap();
        assert_eq!(outcome.rows_read, 3);
        assert_eq!(outcome.summary(), "Successfully read 3 reviews.");
        assert_eq!(
            outcome.table.headers,
            vec!["id", "ulasan", "rating", "pred_naive_bayes", "pred_logistic_regression"]
        );
        assert_eq!(outcome.table.rows.len(), 3);

        let allowed = ["Negative", "Positive", "Neutral"];
        for row in &outcome.table.rows {
            assert_eq!(row.len(), 5);
            assert!(allowed.contains(&row[3].as_str()));
            assert!(allowed.contains(&row[4].as_str()));
        }
        assert_eq!(outcome.table.rows[0][3], "Positive");
        assert_eq!(outcome.table.rows[1][3], "Negative");
        assert_eq!(outcome.table.rows[2][3], "Neutral");
    }

    #[test]
    fn test_unmapped_class_ids_are_written_raw() {
        let mut bundle = nb_bundle_json(false);
        bundle["classes"] = serde_json::json!([0, 1, 5]);
        let (_dir, registry) = registry(&[("Naive Bayes", bundle)]);

        let outcome = predict_batch(REVIEWS.as_bytes(), &registry).unwrap();
        let column: Vec<&str> = outcome.table.rows.iter().map(|row| row[3].as_str()).collect();
        assert_eq!(column, vec!["Positive", "Negative", "5"]);
    }

    #[test]
    fn test_missing_text_column() {
        let (_dir, registry) = registry(&[("Naive Bayes", nb_bundle_json(false))]);

        let err = predict_batch(b"id,review\n1,great app\n", &registry).unwrap_err();
        assert!(matches!(err, AppError::MissingColumn(ref c) if c == "ulasan"));
        assert!(err.to_string().contains("`ulasan`"));
    }

    #[test]
    fn test_bom_header_and_quoting() {
        let (_dir, registry) = registry(&[("Naive Bayes", nb_bundle_json(false))]);
        let csv = "\u{feff}ulasan\n\"great, great app\"\n";

        let outcome = predict_batch(csv.as_bytes(), &registry).unwrap();
        assert_eq!(outcome.table.headers, vec!["ulasan", "pred_naive_bayes"]);

        let written = String::from_utf8(outcome.table.to_csv().unwrap()).unwrap();
        assert_eq!(written, "ulasan,pred_naive_bayes\n\"great, great app\",Positive\n");
    }

    #[test]
    fn test_existing_prediction_column_is_overwritten() {
        let (_dir, registry) = registry(&[("Naive Bayes", nb_bundle_json(false))]);
        let csv = "ulasan,pred_naive_bayes\nbad app,stale\n";

        let outcome = predict_batch(csv.as_bytes(), &registry).unwrap();
        assert_eq!(outcome.table.headers.len(), 2);
        assert_eq!(outcome.table.rows[0][1], "Negative");
    }

    #[test]
    fn test_ragged_rows_are_csv_errors() {
        let (_dir, registry) = registry(&[("Naive Bayes", nb_bundle_json(false))]);
        let err = predict_batch(b"ulasan,id\ngreat app\n", &registry).unwrap_err();
        assert!(matches!(err, AppError::Csv(_)));
    }

    #[test]
    fn test_empty_text_cell_is_empty_string() {
        let table = Table::from_csv(b"ulasan,id\n,1\ngreat app,2\n").unwrap();
        assert_eq!(table.column(0), vec!["", "great app"]);
    }

    #[test]
    fn test_header_only_file() {
        let (_dir, registry) = registry(&[("Naive Bayes", nb_bundle_json(false))]);
        let outcome = predict_batch(b"ulasan\n", &registry).unwrap();
        assert_eq!(outcome.rows_read, 0);
        assert_eq!(outcome.table.headers, vec!["ulasan", "pred_naive_bayes"]);
    }
}

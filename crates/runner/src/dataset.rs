//! Dataset download and parsing for the training pipeline.
//!
//! Supports the two dataset formats the connector accepts: CSV (header
//! row + comma rows, double-quote escaping) and ARFF (`@attribute`
//! declarations followed by a CSV-like `@data` section, `?` for missing
//! values). Everything here runs on the worker's blocking thread.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context};

use autofit_core::training::{DataConfig, DataType, ModelType};

/// A parsed dataset: named columns and rows of optional cell values.
/// `None` cells are missing values (empty CSV fields, `?` in ARFF).
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// Numeric feature matrix and target column extracted from a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingData {
    pub feature_columns: Vec<String>,
    /// Row-major feature values, one inner vec per retained row.
    pub features: Vec<Vec<f64>>,
    pub target: TargetValues,
}

/// Target values, typed by the requested model kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetValues {
    /// Class labels (classification). Always read as strings, whatever
    /// the raw cell looks like.
    Labels(Vec<String>),
    /// Numeric values (regression).
    Numbers(Vec<f64>),
}

impl TargetValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Labels(v) => v.len(),
            Self::Numbers(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Download
// ---------------------------------------------------------------------------

/// Download the training data URL to `dest`, creating parent directories.
pub fn download(url: &str, dest: &Path) -> anyhow::Result<()> {
    tracing::info!(url, dest = %dest.display(), "saving data from url to file");

    let response = reqwest::blocking::get(url)
        .with_context(|| format!("downloading training data from {url}"))?;
    if !response.status().is_success() {
        bail!("dataset download from {url} returned HTTP {}", response.status());
    }
    let bytes = response
        .bytes()
        .with_context(|| format!("reading dataset body from {url}"))?;

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    fs::write(dest, &bytes).with_context(|| format!("writing dataset to {}", dest.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Load a downloaded dataset file into a [`Table`].
pub fn load(path: &Path, data_type: DataType) -> anyhow::Result<Table> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading dataset file {}", path.display()))?;
    match data_type {
        DataType::Csv => parse_csv(&text),
        DataType::Arff => parse_arff(&text),
    }
}

/// Parse CSV text: first non-empty line is the header.
pub fn parse_csv(text: &str) -> anyhow::Result<Table> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header = lines.next().context("CSV file has no header row")?;
    let columns: Vec<String> = split_delimited_line(header)
        .into_iter()
        .map(|f| f.unwrap_or_default())
        .collect();

    let mut rows = Vec::new();
    for (i, line) in lines.enumerate() {
        let cells = split_delimited_line(line);
        if cells.len() != columns.len() {
            bail!(
                "CSV row {} has {} fields, expected {}",
                i + 2,
                cells.len(),
                columns.len()
            );
        }
        rows.push(cells);
    }

    Ok(Table { columns, rows })
}

/// Parse ARFF text: `@attribute` declarations name the columns, the
/// `@data` section holds the rows. `%` starts a comment line.
pub fn parse_arff(text: &str) -> anyhow::Result<Table> {
    let mut columns = Vec::new();
    let mut rows = Vec::new();
    let mut in_data = false;

    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }

        if !in_data {
            let lower = line.to_ascii_lowercase();
            if lower.starts_with("@attribute") {
                let rest = line["@attribute".len()..].trim();
                let name = parse_arff_attribute_name(rest)
                    .with_context(|| format!("malformed @attribute on line {}", i + 1))?;
                columns.push(name);
            } else if lower.starts_with("@data") {
                if columns.is_empty() {
                    bail!("ARFF @data section before any @attribute declaration");
                }
                in_data = true;
            }
            // @relation and anything else in the header is ignored.
            continue;
        }

        let cells = split_delimited_line(line);
        if cells.len() != columns.len() {
            bail!(
                "ARFF data row on line {} has {} fields, expected {}",
                i + 1,
                cells.len(),
                columns.len()
            );
        }
        rows.push(cells);
    }

    if columns.is_empty() {
        bail!("ARFF file has no @attribute declarations");
    }
    Ok(Table { columns, rows })
}

/// Extract the attribute name from the remainder of an `@attribute`
/// line. Names may be quoted to contain spaces.
fn parse_arff_attribute_name(rest: &str) -> anyhow::Result<String> {
    let rest = rest.trim_start();
    if rest.is_empty() {
        bail!("missing attribute name");
    }

    if let Some(stripped) = rest.strip_prefix(['\'', '"']) {
        let quote = rest.chars().next().unwrap_or('\'');
        match stripped.find(quote) {
            Some(end) => Ok(stripped[..end].to_string()),
            None => bail!("unterminated quoted attribute name"),
        }
    } else {
        Ok(rest
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string())
    }
}

/// Split one comma-delimited row into cells, honoring double-quote
/// escaping. Empty fields and `?` become `None` (missing).
fn split_delimited_line(line: &str) -> Vec<Option<String>> {
    let mut cells = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => cells.push(finish_cell(std::mem::take(&mut field))),
            _ => field.push(c),
        }
    }
    cells.push(finish_cell(field));
    cells
}

fn finish_cell(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "?" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ---------------------------------------------------------------------------
// Feature / target extraction
// ---------------------------------------------------------------------------

/// Split a table into numeric features and the target column.
///
/// Rows with a missing value in any used column are dropped. For
/// classification the target is kept as a string label; for regression
/// it must parse as a number. Feature cells must always be numeric.
pub fn features_and_target(table: &Table, config: &DataConfig) -> anyhow::Result<TrainingData> {
    tracing::info!("getting feature and target data");

    let target_idx = table
        .columns
        .iter()
        .position(|c| c == &config.target_field)
        .with_context(|| {
            format!(
                "target field '{}' not found in dataset columns {:?}",
                config.target_field, table.columns
            )
        })?;

    let known: HashSet<&str> = table.columns.iter().map(String::as_str).collect();
    for ignored in &config.ignore_columns {
        if !known.contains(ignored.as_str()) {
            bail!("ignore column '{ignored}' not found in dataset columns");
        }
    }

    let feature_indices: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(i, name)| *i != target_idx && !config.ignore_columns.contains(*name))
        .map(|(i, _)| i)
        .collect();
    if feature_indices.is_empty() {
        bail!("no feature columns remain after removing the target and ignored columns");
    }

    let feature_columns: Vec<String> = feature_indices
        .iter()
        .map(|&i| table.columns[i].clone())
        .collect();

    let mut features = Vec::new();
    let mut labels = Vec::new();
    let mut numbers = Vec::new();

    for row in &table.rows {
        // dropna over the used columns: target plus every feature.
        let target_cell = match &row[target_idx] {
            Some(v) => v,
            None => continue,
        };
        let Some(cells) = feature_indices
            .iter()
            .map(|&i| row[i].as_deref())
            .collect::<Option<Vec<&str>>>()
        else {
            continue;
        };

        let mut feature_row = Vec::with_capacity(cells.len());
        for (value, name) in cells.iter().zip(&feature_columns) {
            let parsed: f64 = value.parse().with_context(|| {
                format!("feature column '{name}' has non-numeric value '{value}'")
            })?;
            feature_row.push(parsed);
        }

        match config.model_type {
            ModelType::Classification => labels.push(target_cell.clone()),
            ModelType::Regression => {
                let parsed: f64 = target_cell.parse().with_context(|| {
                    format!(
                        "target field '{}' has non-numeric value '{target_cell}'",
                        config.target_field
                    )
                })?;
                numbers.push(parsed);
            }
        }
        features.push(feature_row);
    }

    let target = match config.model_type {
        ModelType::Classification => TargetValues::Labels(labels),
        ModelType::Regression => TargetValues::Numbers(numbers),
    };

    if target.is_empty() {
        bail!("no training rows remain after dropping rows with missing values");
    }

    Ok(TrainingData {
        feature_columns,
        features,
        target,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use autofit_core::training::{DataConfig, DataType, ModelType};

    use super::*;

    fn csv_config(model_type: ModelType, ignore: &[&str]) -> DataConfig {
        DataConfig {
            training_data: "https://example.com/data.csv".into(),
            data_type: DataType::Csv,
            target_field: "y".into(),
            model_type,
            ignore_columns: ignore.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn csv_parses_header_and_rows() {
        let table = parse_csv("a,b,y\n1,2,3\n4,5,6\n").unwrap();
        assert_eq!(table.columns, vec!["a", "b", "y"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][2].as_deref(), Some("3"));
    }

    #[test]
    fn csv_quoted_fields_keep_commas() {
        let table = parse_csv("name,y\n\"Doe, Jane\",1\n").unwrap();
        assert_eq!(table.rows[0][0].as_deref(), Some("Doe, Jane"));
    }

    #[test]
    fn csv_empty_cells_are_missing() {
        let table = parse_csv("a,y\n,1\n2,\n").unwrap();
        assert_eq!(table.rows[0][0], None);
        assert_eq!(table.rows[1][1], None);
    }

    #[test]
    fn csv_ragged_row_is_an_error() {
        let err = parse_csv("a,b\n1\n").unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn csv_without_header_is_an_error() {
        assert!(parse_csv("").is_err());
    }

    #[test]
    fn arff_parses_attributes_and_data() {
        let text = "\
% iris, abridged
@relation iris
@attribute sepal_length numeric
@attribute 'petal width' numeric
@attribute class {setosa,versicolor}
@data
5.1,0.2,setosa
?,0.4,versicolor
";
        let table = parse_arff(text).unwrap();
        assert_eq!(table.columns, vec!["sepal_length", "petal width", "class"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][0], None, "? must read as missing");
        assert_eq!(table.rows[1][2].as_deref(), Some("versicolor"));
    }

    #[test]
    fn arff_without_attributes_is_an_error() {
        assert!(parse_arff("@relation empty\n@data\n1,2\n").is_err());
    }

    #[test]
    fn extraction_drops_rows_with_missing_values() {
        let table = parse_csv("a,b,y\n1,2,3\n,2,3\n1,,3\n1,2,\n4,5,6\n").unwrap();
        let data = features_and_target(&table, &csv_config(ModelType::Regression, &[])).unwrap();

        assert_eq!(data.features, vec![vec![1.0, 2.0], vec![4.0, 5.0]]);
        assert_eq!(data.target, TargetValues::Numbers(vec![3.0, 6.0]));
    }

    #[test]
    fn extraction_honors_ignore_columns() {
        let table = parse_csv("id,a,y\n7,1,2\n8,3,4\n").unwrap();
        let data = features_and_target(&table, &csv_config(ModelType::Regression, &["id"])).unwrap();

        assert_eq!(data.feature_columns, vec!["a"]);
        assert_eq!(data.features, vec![vec![1.0], vec![3.0]]);
    }

    #[test]
    fn classification_target_stays_a_string() {
        let table = parse_csv("a,y\n1,0\n2,1\n").unwrap();
        let data =
            features_and_target(&table, &csv_config(ModelType::Classification, &[])).unwrap();

        assert_eq!(
            data.target,
            TargetValues::Labels(vec!["0".into(), "1".into()])
        );
    }

    #[test]
    fn unknown_target_field_is_an_error() {
        let table = parse_csv("a,b\n1,2\n").unwrap();
        let err = features_and_target(&table, &csv_config(ModelType::Regression, &[])).unwrap_err();
        assert!(err.to_string().contains("target field 'y'"));
    }

    #[test]
    fn unknown_ignore_column_is_an_error() {
        let table = parse_csv("a,y\n1,2\n").unwrap();
        let err =
            features_and_target(&table, &csv_config(ModelType::Regression, &["nope"])).unwrap_err();
        assert!(err.to_string().contains("ignore column 'nope'"));
    }

    #[test]
    fn non_numeric_feature_is_an_error() {
        let table = parse_csv("a,y\nred,2\n").unwrap();
        let err = features_and_target(&table, &csv_config(ModelType::Regression, &[])).unwrap_err();
        assert!(format!("{err:#}").contains("non-numeric value 'red'"));
    }

    #[test]
    fn all_rows_missing_is_an_error() {
        let table = parse_csv("a,y\n,1\n,2\n").unwrap();
        let err = features_and_target(&table, &csv_config(ModelType::Regression, &[])).unwrap_err();
        assert!(err.to_string().contains("no training rows remain"));
    }
}

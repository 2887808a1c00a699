//! CSV loading. The last column of every record is the label.

use crate::data::dataset::Dataset;
use crate::error::{ModelError, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Reads a table of categorical attributes with a categorical label.
pub fn read_categorical_csv<P: AsRef<Path>>(
    file_path: P,
    header: bool,
) -> Result<Dataset<String, String>> {
    read_categorical_from_reader(File::open(file_path)?, header)
}

pub fn read_categorical_from_reader<R: Read>(
    reader: R,
    header: bool,
) -> Result<Dataset<String, String>> {
    let mut reader = ReaderBuilder::new().has_headers(header).from_reader(reader);
    let mut features = Vec::new();
    let mut labels = Vec::new();

    for result in reader.records() {
        let record = result?;
        let (label, row) = split_label(&record)?;
        features.push(row.iter().map(|value| value.to_string()).collect());
        labels.push(label.to_string());
    }

    Dataset::from_rows(&features, labels)
}

/// Reads a table of numeric features with a numeric target.
pub fn read_regression_csv<P: AsRef<Path>>(
    file_path: P,
    header: bool,
) -> Result<Dataset<f64, f64>> {
    read_regression_from_reader(File::open(file_path)?, header)
}

pub fn read_regression_from_reader<R: Read>(reader: R, header: bool) -> Result<Dataset<f64, f64>> {
    let mut reader = ReaderBuilder::new().has_headers(header).from_reader(reader);
    let mut features = Vec::new();
    let mut labels = Vec::new();

    for result in reader.records() {
        let record = result?;
        let (label, row) = split_label(&record)?;
        let feature_row = row
            .iter()
            .map(|value| parse_number(value))
            .collect::<Result<Vec<_>>>()?;

        features.push(feature_row);
        labels.push(parse_number(label)?);
    }

    Dataset::from_rows(&features, labels)
}

fn split_label(record: &csv::StringRecord) -> Result<(&str, Vec<&str>)> {
    let values: Vec<&str> = record.iter().map(str::trim).collect();
    match values.split_last() {
        Some((label, row)) if !row.is_empty() => Ok((*label, row.to_vec())),
        _ => Err(ModelError::Parse(format!(
            "Record {:?} needs at least one feature and a label.",
            values
        ))),
    }
}

fn parse_number(value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|err| ModelError::Parse(format!("{:?}: {}", value, err)))
}

//! Code for reading time series from CSV files.
use super::input_err_msg;
use crate::error::{InvalidCell, InvalidInput};
use crate::id::{SeriesID, names_match};
use crate::time_series::{PeriodLabel, TimeSeriesInput};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::debug;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// The columns required in a time series table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableSchema {
    /// The column containing period labels
    pub period_column: &'static str,
    /// The columns containing series values
    pub series: &'static [&'static str],
}

/// The columns required for a demand series
pub const DEMAND_SCHEMA: TableSchema = TableSchema {
    period_column: "hour",
    series: &["demand"],
};

/// The columns required for a generation series
pub const GENERATION_SCHEMA: TableSchema = TableSchema {
    period_column: "datetime",
    series: &["wind", "solar", "total"],
};

impl TableSchema {
    /// All required columns, starting with the period column
    fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.period_column).chain(self.series.iter().copied())
    }
}

/// Find the index of each required column in the header, matching names case-insensitively.
///
/// All missing columns are reported together.
fn locate_columns(
    headers: &csv::StringRecord,
    schema: &TableSchema,
) -> Result<Vec<usize>, InvalidInput> {
    let mut indices = Vec::new();
    let mut missing = Vec::new();
    for column in schema.columns() {
        let mut matches = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| names_match(header, column));
        match (matches.next(), matches.next()) {
            (Some((idx, _)), None) => indices.push(idx),
            (Some(_), Some(_)) => return Err(InvalidInput::DuplicateColumn(column.to_string())),
            (None, _) => missing.push(column.to_string()),
        }
    }

    if !missing.is_empty() {
        return Err(InvalidInput::MissingColumns(missing));
    }

    Ok(indices)
}

/// Read a time series from CSV data.
///
/// Columns not named in the schema are ignored. Every cell which cannot be parsed is reported in
/// the error, not just the first one.
///
/// # Arguments
///
/// * `reader` - Source of CSV data
/// * `schema` - The required columns
pub fn read_time_series_from_reader<R: Read>(
    reader: R,
    schema: &TableSchema,
) -> Result<TimeSeriesInput, InvalidInput> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader
        .headers()
        .map_err(|err| InvalidInput::Malformed(err.to_string()))?
        .clone();
    let indices = locate_columns(&headers, schema)?;

    let mut labels = Vec::new();
    let mut values = vec![Vec::new(); schema.series.len()];
    let mut invalid = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|err| InvalidInput::Malformed(err.to_string()))?;
        let row = row + 1;
        let cell = |idx: usize| record.get(idx).unwrap_or_default();
        let invalid_cell = |idx: usize| InvalidCell {
            row,
            column: headers[idx].to_string(),
            value: cell(idx).to_string(),
        };

        match PeriodLabel::parse(cell(indices[0])) {
            Some(label) => labels.push(label),
            None => invalid.push(invalid_cell(indices[0])),
        }
        for (series_values, &idx) in values.iter_mut().zip(&indices[1..]) {
            match cell(idx).parse::<f64>() {
                Ok(value) if value.is_finite() => series_values.push(value),
                _ => invalid.push(invalid_cell(idx)),
            }
        }
    }

    if !invalid.is_empty() {
        return Err(InvalidInput::InvalidCells(invalid));
    }

    debug!(
        "Read {} periods with series: {}",
        labels.len(),
        schema.series.join(", ")
    );
    let series: IndexMap<_, _> = schema
        .series
        .iter()
        .map(|name| SeriesID::new(name))
        .zip(values)
        .collect();

    TimeSeriesInput::new(labels, series)
}

/// Read a time series from the specified CSV file
pub fn read_time_series(file_path: &Path, schema: &TableSchema) -> Result<TimeSeriesInput> {
    let file = File::open(file_path).with_context(|| input_err_msg(file_path))?;
    let time_series =
        read_time_series_from_reader(file, schema).with_context(|| input_err_msg(file_path))?;

    Ok(time_series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error_matches;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_read_demand() {
        let csv = "Hour,Demand,Notes\n2,15.0,peak\n0,5.0,\n1,10,\n";
        let ts = read_time_series_from_reader(csv.as_bytes(), &DEMAND_SCHEMA).unwrap();
        assert_eq!(ts.series("demand").unwrap(), [5.0, 10.0, 15.0]);
        assert_eq!(ts.labels()[0], PeriodLabel::Index(0));
        assert!(ts.series("notes").is_none());
    }

    #[test]
    fn test_read_generation() {
        let csv = "datetime,wind,solar,total\n\
                   2024-01-01 00:00:00,1.0,0.0,1.0\n\
                   2024-01-01 01:00:00,2.0,0.5,2.5\n";
        let ts = read_time_series_from_reader(csv.as_bytes(), &GENERATION_SCHEMA).unwrap();
        assert_eq!(ts.len(), 2);
        assert_eq!(ts.series("total").unwrap(), [1.0, 2.5]);
        assert_eq!(ts.series("solar").unwrap(), [0.0, 0.5]);
    }

    #[test]
    fn test_read_missing_columns() {
        let csv = "datetime,wind\n2024-01-01 00:00:00,1.0\n";
        let result = read_time_series_from_reader(csv.as_bytes(), &GENERATION_SCHEMA);
        assert_eq!(
            result.unwrap_err(),
            InvalidInput::MissingColumns(vec!["solar".into(), "total".into()])
        );
    }

    #[test]
    fn test_read_duplicate_column() {
        let csv = "hour,demand,DEMAND\n0,1,2\n";
        assert_error_matches!(
            read_time_series_from_reader(csv.as_bytes(), &DEMAND_SCHEMA),
            InvalidInput::DuplicateColumn(_)
        );
    }

    #[test]
    fn test_read_invalid_cells() {
        let csv = "hour,demand\n0,abc\nnot a time,1\n2,\n3,4\n";
        let result = read_time_series_from_reader(csv.as_bytes(), &DEMAND_SCHEMA);
        assert_eq!(
            result.unwrap_err(),
            InvalidInput::InvalidCells(vec![
                InvalidCell {
                    row: 1,
                    column: "demand".into(),
                    value: "abc".into()
                },
                InvalidCell {
                    row: 2,
                    column: "hour".into(),
                    value: "not a time".into()
                },
                InvalidCell {
                    row: 3,
                    column: "demand".into(),
                    value: "".into()
                },
            ])
        );
    }

    #[test]
    fn test_read_empty() {
        let csv = "datetime,wind,solar,total\n";
        assert_error_matches!(
            read_time_series_from_reader(csv.as_bytes(), &GENERATION_SCHEMA),
            InvalidInput::EmptySeries
        );
    }

    #[test]
    fn test_read_time_series_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("demand.csv");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "hour,demand\n0,1.5\n1,2.5").unwrap();
        }

        let ts = read_time_series(&file_path, &DEMAND_SCHEMA).unwrap();
        assert_eq!(ts.series("demand").unwrap(), [1.5, 2.5]);

        let err = read_time_series(&dir.path().join("missing.csv"), &DEMAND_SCHEMA).unwrap_err();
        assert!(err.to_string().starts_with("Error reading"));
    }
}

//! Raw-record loading and feature-matrix writing.
//!
//! CSV files are read with every column as text so that no value is
//! interpreted before the coercion stage sees it. Parquet numeric columns
//! arrive as numbers, everything else as text. JSON input is an array of
//! flat objects.

use crate::pipeline::PipelineOutput;
use crate::record::{Partition, RawCell, RawRecord, Split};
use anyhow::{Context as _, Result};
use polars::prelude::*;
use std::path::Path;

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Load a CSV, Parquet or JSON file as a labelled partition.
pub fn load_partition(path: impl AsRef<Path>, split: Split) -> Result<Partition> {
    let path = path.as_ref();
    let partition = match extension(path).as_str() {
        "csv" => {
            let df = LazyCsvReader::new(path)
                .with_infer_schema_length(Some(0))
                .with_has_header(true)
                .finish()?
                .collect()
                .with_context(|| format!("Failed to read CSV {}", path.display()))?;
            dataframe_to_partition(&df, split)?
        }
        "parquet" => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            let df = ParquetReader::new(file)
                .finish()
                .context("Failed to read Parquet")?;
            dataframe_to_partition(&df, split)?
        }
        "json" => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let records: Vec<RawRecord> =
                serde_json::from_str(&content).context("Failed to parse JSON records")?;
            Partition::from_records(split, records)
        }
        other => anyhow::bail!("Unsupported file extension: {other}"),
    };

    tracing::info!(
        path = %path.display(),
        rows = partition.len(),
        columns = partition.columns().len(),
        split = %split,
        "Loaded partition"
    );
    Ok(partition)
}

/// Convert a data frame into raw records, keeping its column order as the header.
pub fn dataframe_to_partition(df: &DataFrame, split: Split) -> Result<Partition> {
    let header: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let mut cells_by_column = Vec::with_capacity(header.len());
    for column in df.get_columns() {
        let series = column.as_materialized_series();
        let cells: Vec<RawCell> = if series.dtype().is_primitive_numeric() {
            series
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .map(|v| v.map_or(RawCell::Absent, RawCell::Number))
                .collect()
        } else {
            series
                .cast(&DataType::String)?
                .str()?
                .into_iter()
                .map(RawCell::from)
                .collect()
        };
        cells_by_column.push(cells);
    }

    let records = (0..df.height())
        .map(|i| {
            header
                .iter()
                .zip(&cells_by_column)
                .map(|(name, cells)| (name.clone(), cells[i].clone()))
                .collect()
        })
        .collect();

    Ok(Partition::new(split, header, records))
}

/// Kept columns, then features, then the label, as one data frame.
pub fn output_to_dataframe(output: &PipelineOutput) -> Result<DataFrame> {
    let mut columns: Vec<Column> = output
        .keys
        .iter()
        .map(|key| Column::from(Series::new(key.name.as_str().into(), key.values.as_slice())))
        .collect();
    columns.extend(output.matrix.to_columns());
    if let Some(labels) = &output.labels {
        let values: Vec<Option<&str>> = labels
            .values
            .iter()
            .map(|v| v.map(|s| s.as_str()))
            .collect();
        columns.push(Column::from(Series::new(labels.name.as_str().into(), values)));
    }
    DataFrame::new(columns).context("Failed to assemble output frame")
}

/// Write a pipeline output as Parquet (`.parquet`) or CSV (anything else).
pub fn save_output(output: &PipelineOutput, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut df = output_to_dataframe(output)?;

    if extension(path) == "parquet" {
        let file = std::fs::File::create(path).context("Failed to create Parquet file")?;
        ParquetWriter::new(file)
            .finish(&mut df)
            .context("Failed to write Parquet file")?;
    } else {
        let file = std::fs::File::create(path).context("Failed to create CSV file")?;
        CsvWriter::new(file)
            .include_header(true)
            .finish(&mut df)
            .context("Failed to write CSV file")?;
    }
    tracing::info!(path = %path.display(), rows = df.height(), "Wrote feature matrix");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_csv_loads_as_text() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("batch.csv");
        std::fs::write(
            &path,
            "Customer_ID,Annual_Income,Age\nCUS_1,19114.12,23\nCUS_2,34847.84_,\n",
        )?;

        let partition = load_partition(&path, Split::Train)?;
        assert_eq!(partition.columns(), &["Customer_ID", "Annual_Income", "Age"]);
        assert_eq!(partition.len(), 2);

        let first = &partition.records()[0];
        assert_eq!(first["Annual_Income"], RawCell::text("19114.12"));
        assert_eq!(first["Age"], RawCell::text("23"));
        let second = &partition.records()[1];
        assert_eq!(second["Annual_Income"], RawCell::text("34847.84_"));
        assert_eq!(second["Age"], RawCell::Absent);
        Ok(())
    }

    #[test]
    fn test_json_records() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("batch.json");
        std::fs::write(
            &path,
            r#"[{"Age": 23, "Occupation": "Scientist"}, {"Age": null, "Occupation": "_"}]"#,
        )?;

        let partition = load_partition(&path, Split::Production)?;
        assert_eq!(partition.split(), Split::Production);
        assert_eq!(partition.columns(), &["Age", "Occupation"]);
        assert_eq!(partition.records()[0]["Age"], RawCell::Number(23.0));
        assert_eq!(partition.records()[1]["Age"], RawCell::Absent);
        Ok(())
    }

    #[test]
    fn test_parquet_numeric_columns_stay_numeric() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("batch.parquet");
        let mut df = DataFrame::new(vec![
            Column::from(Series::new("Age".into(), vec![Some(23i64), None])),
            Column::from(Series::new("Occupation".into(), vec!["Scientist", "_"])),
        ])?;
        ParquetWriter::new(std::fs::File::create(&path)?).finish(&mut df)?;

        let partition = load_partition(&path, Split::Holdout)?;
        assert_eq!(partition.records()[0]["Age"], RawCell::Number(23.0));
        assert_eq!(partition.records()[1]["Age"], RawCell::Absent);
        assert_eq!(partition.records()[1]["Occupation"], RawCell::text("_"));
        Ok(())
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(load_partition("batch.xlsx", Split::Train).is_err());
    }
}

//! Columnar export of the flat table (Arrow/Parquet)
//!
//! The flat table becomes a single Arrow `RecordBatch`:
//!
//! | column       | type            | notes                               |
//! |--------------|-----------------|-------------------------------------|
//! | `result_id`  | Utf8            |                                     |
//! | `test_name`  | Utf8            |                                     |
//! | `metric`     | Utf8            |                                     |
//! | `value`      | Float64, null   | null for non-numeric samples        |
//! | `value_text` | Utf8            | display text of every sample        |
//! | `unit`       | Utf8, null      |                                     |
//! | one per fact | Utf8, null      | display text, null when absent      |
//!
//! A fact whose name collides with a fixed column is exported as
//! `fact_<name>`.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use crate::db::FlatTable;
use crate::Result;

/// Fixed leading columns of an exported flat table.
pub const FIXED_COLUMNS: [&str; 6] = [
    "result_id",
    "test_name",
    "metric",
    "value",
    "value_text",
    "unit",
];

/// Column names for the fact columns, in table order, renamed away from
/// fixed and already-used names.
fn fact_column_names(fact_names: &[String]) -> Vec<String> {
    let mut taken: BTreeSet<String> = FIXED_COLUMNS.iter().map(|c| (*c).to_string()).collect();
    taken.extend(fact_names.iter().cloned());
    let mut out = Vec::with_capacity(fact_names.len());
    for name in fact_names {
        if FIXED_COLUMNS.contains(&name.as_str()) {
            let mut renamed = format!("fact_{name}");
            while taken.contains(&renamed) {
                renamed = format!("fact_{renamed}");
            }
            taken.insert(renamed.clone());
            out.push(renamed);
        } else {
            out.push(name.clone());
        }
    }
    out
}

fn utf8_column(values: impl Iterator<Item = String>) -> ArrayRef {
    Arc::new(StringArray::from(values.collect::<Vec<_>>()))
}

impl FlatTable {
    /// Arrow schema of [`to_record_batch`](Self::to_record_batch).
    #[must_use]
    pub fn arrow_schema(&self) -> Schema {
        let mut fields = vec![
            Field::new("result_id", DataType::Utf8, false),
            Field::new("test_name", DataType::Utf8, false),
            Field::new("metric", DataType::Utf8, false),
            Field::new("value", DataType::Float64, true),
            Field::new("value_text", DataType::Utf8, false),
            Field::new("unit", DataType::Utf8, true),
        ];
        fields.extend(
            fact_column_names(self.fact_names())
                .into_iter()
                .map(|name| Field::new(name, DataType::Utf8, true)),
        );
        Schema::new(fields)
    }

    /// Convert to a single Arrow record batch.
    ///
    /// # Errors
    ///
    /// Returns error if Arrow rejects the assembled columns
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let rows = self.rows();
        let mut columns: Vec<ArrayRef> = vec![
            utf8_column(rows.iter().map(|r| r.result_id.clone())),
            utf8_column(rows.iter().map(|r| r.test_name.clone())),
            utf8_column(rows.iter().map(|r| r.metric.clone())),
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.value.as_f64()).collect::<Vec<_>>(),
            )),
            utf8_column(rows.iter().map(|r| r.value.to_string())),
            Arc::new(StringArray::from(
                rows.iter().map(|r| r.unit.clone()).collect::<Vec<_>>(),
            )),
        ];
        for fact in self.fact_names() {
            columns.push(Arc::new(StringArray::from(
                rows.iter()
                    .map(|r| r.fact(fact).map(ToString::to_string))
                    .collect::<Vec<_>>(),
            )));
        }

        Ok(RecordBatch::try_new(Arc::new(self.arrow_schema()), columns)?)
    }
}

/// Write the flat table to a Parquet file.
///
/// # Errors
///
/// Returns error if the file cannot be created or Parquet encoding fails
pub fn export_parquet(table: &FlatTable, path: impl AsRef<Path>) -> Result<()> {
    let batch = table.to_record_batch()?;
    let file = File::create(path.as_ref())?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    tracing::info!(
        path = %path.as_ref().display(),
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        "exported flat table"
    );
    Ok(())
}

/// Read every record batch of a Parquet file.
///
/// # Errors
///
/// Returns error if the file cannot be opened or decoded
pub fn read_parquet(path: impl AsRef<Path>) -> Result<Vec<RecordBatch>> {
    let file = File::open(path.as_ref())?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }
    Ok(batches)
}

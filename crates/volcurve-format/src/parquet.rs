//! Apache Parquet output format.

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::io::Write;
use std::ops::Range;
use std::sync::Arc;
use volcurve_types::{Column, Frame, TickTable};

use crate::{FormatError, Formatter, IndexKey};

/// Parquet formatter.
#[derive(Debug, Clone)]
pub struct ParquetFormatter {
    /// Row group size (number of rows per group).
    row_group_size: usize,
    /// Compression codec.
    compression: Compression,
}

impl Default for ParquetFormatter {
    fn default() -> Self {
        Self {
            row_group_size: 100_000,
            compression: Compression::SNAPPY,
        }
    }
}

impl ParquetFormatter {
    /// Creates a new Parquet formatter with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the row group size.
    #[must_use]
    pub const fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Sets the compression codec.
    #[must_use]
    pub const fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    fn props(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }

    /// Creates the Arrow schema for a table: the index plus one nullable
    /// `Float64` field per column.
    fn frame_schema<K: IndexKey>(index_name: &str, index_type: DataType, frame: &Frame<K>) -> Schema {
        let mut fields = vec![Field::new(index_name, index_type, false)];
        fields.extend(
            frame
                .column_names()
                .map(|name| Field::new(name, DataType::Float64, true)),
        );
        Schema::new(fields)
    }

    /// Creates the Arrow schema for tick data.
    fn tick_schema(with_codes: bool) -> Schema {
        let mut fields = vec![
            Field::new("time", DataType::Timestamp(TimeUnit::Microsecond, None), false),
            Field::new("type", DataType::Utf8, false),
            Field::new("value", DataType::Float64, false),
            Field::new("size", DataType::Int64, false),
        ];
        if with_codes {
            fields.push(Field::new("conditionCodes", DataType::Utf8, true));
        }
        Schema::new(fields)
    }

    /// Converts a slice of table rows to an Arrow `RecordBatch`.
    fn frame_to_batch<K: IndexKey>(
        schema: &Arc<Schema>,
        index: &[K],
        cells: &[Column],
        rows: Range<usize>,
    ) -> Result<RecordBatch, FormatError> {
        let (_, index) = K::arrow_column(&index[rows.clone()]);
        let mut columns: Vec<ArrayRef> = vec![index];
        columns.extend(cells.iter().map(|c| {
            Arc::new(Float64Array::from(c.values[rows.clone()].to_vec())) as ArrayRef
        }));

        RecordBatch::try_new(Arc::clone(schema), columns)
            .map_err(|e| FormatError::Parquet(e.to_string()))
    }

    /// Converts a slice of ticks to an Arrow `RecordBatch`.
    fn ticks_to_batch(
        schema: &Arc<Schema>,
        ticks: &TickTable,
        rows: Range<usize>,
    ) -> Result<RecordBatch, FormatError> {
        let (_, times) = NaiveDateTime::arrow_column(&ticks.index[rows.clone()]);
        let mut columns: Vec<ArrayRef> = vec![
            times,
            Arc::new(StringArray::from(ticks.event_type[rows.clone()].to_vec())),
            Arc::new(Float64Array::from(ticks.price[rows.clone()].to_vec())),
            Arc::new(Int64Array::from(ticks.size[rows.clone()].to_vec())),
        ];
        if let Some(codes) = &ticks.condition_codes {
            columns.push(Arc::new(StringArray::from(codes[rows].to_vec())));
        }

        RecordBatch::try_new(Arc::clone(schema), columns)
            .map_err(|e| FormatError::Parquet(e.to_string()))
    }

    fn chunks(&self, len: usize) -> impl Iterator<Item = Range<usize>> {
        let size = self.row_group_size.max(1);
        (0..len).step_by(size).map(move |start| start..(start + size).min(len))
    }
}

impl Formatter for ParquetFormatter {
    fn write_frame<K: IndexKey, W: Write + Send>(
        &self,
        index_name: &str,
        frame: &Frame<K>,
        writer: W,
    ) -> Result<(), FormatError> {
        let (index_type, _) = K::arrow_column(&[]);
        let schema = Arc::new(Self::frame_schema(index_name, index_type, frame));

        let mut arrow_writer = ArrowWriter::try_new(writer, Arc::clone(&schema), Some(self.props()))
            .map_err(|e| FormatError::Parquet(e.to_string()))?;

        let index = frame.index()?;
        let cells = frame.columns()?;
        for rows in self.chunks(index.len()) {
            let batch = Self::frame_to_batch(&schema, &index, &cells, rows)?;
            arrow_writer
                .write(&batch)
                .map_err(|e| FormatError::Parquet(e.to_string()))?;
        }

        arrow_writer
            .close()
            .map_err(|e| FormatError::Parquet(e.to_string()))?;

        Ok(())
    }

    fn write_ticks<W: Write + Send>(&self, ticks: &TickTable, writer: W) -> Result<(), FormatError> {
        let schema = Arc::new(Self::tick_schema(ticks.condition_codes.is_some()));

        let mut arrow_writer = ArrowWriter::try_new(writer, Arc::clone(&schema), Some(self.props()))
            .map_err(|e| FormatError::Parquet(e.to_string()))?;

        for rows in self.chunks(ticks.len()) {
            let batch = Self::ticks_to_batch(&schema, ticks, rows)?;
            arrow_writer
                .write(&batch)
                .map_err(|e| FormatError::Parquet(e.to_string()))?;
        }

        arrow_writer
            .close()
            .map_err(|e| FormatError::Parquet(e.to_string()))?;

        Ok(())
    }

    fn extension(&self) -> &str {
        "parquet"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::fs::File;
    use volcurve_types::TickRow;

    fn frame() -> Frame<NaiveDate> {
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        Frame::from_columns(
            vec![d(4), d(5), d(6)],
            vec![
                Column::new("7203 JP Equity", vec![Some(3650.0), None, Some(3702.0)]),
                Column::new("6758 JP Equity", vec![Some(13_120.0), Some(13_005.0), None]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_parquet_frame_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("px_last.parquet");

        ParquetFormatter::new()
            .with_row_group_size(2)
            .write_frame("date", &frame(), File::create(&path).unwrap())
            .unwrap();

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.map(Result::unwrap).collect();
        let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
        assert_eq!(rows, 3);

        let schema = batches[0].schema();
        assert_eq!(schema.field(0).name(), "date");
        assert_eq!(schema.field(0).data_type(), &DataType::Date32);
        assert!(schema.field_with_name("7203 JP Equity").unwrap().is_nullable());
        assert_eq!(batches[0].column(1).null_count(), 1);
    }

    #[test]
    fn test_parquet_ticks() {
        let mut ticks = TickTable::new(true);
        ticks.push(TickRow {
            time: NaiveDate::from_ymd_opt(2024, 3, 4)
                .unwrap()
                .and_hms_opt(9, 0, 1)
                .unwrap(),
            event_type: "TRADE".to_string(),
            value: 3650.0,
            size: 1200,
            condition_codes: None,
        });
        let mut output = Vec::new();
        ParquetFormatter::new()
            .write_ticks(&ticks, &mut output)
            .unwrap();

        // Parquet files start with "PAR1" magic bytes
        assert!(output.len() > 4);
        assert_eq!(&output[0..4], b"PAR1");
    }

    #[test]
    fn test_tick_schema() {
        assert_eq!(ParquetFormatter::tick_schema(false).fields().len(), 4);
        let schema = ParquetFormatter::tick_schema(true);
        assert!(schema.field_with_name("conditionCodes").unwrap().is_nullable());
    }

    #[test]
    fn test_chunks() {
        let formatter = ParquetFormatter::new().with_row_group_size(2);
        assert_eq!(formatter.chunks(5).collect::<Vec<_>>(), vec![0..2, 2..4, 4..5]);
        assert_eq!(formatter.chunks(0).count(), 0);
    }
}

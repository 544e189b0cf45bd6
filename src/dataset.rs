//! The append-only benchmark dataset and its CSV file.

use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::benchmark::{BenchmarkRow, ConfigKey, HarnessOutput};
use crate::SweepError;

/// Name of the column prepended to the harness header.
pub const BIT_WIDTH_COLUMN: &str = "bit_width";

/// Rows collected over a sweep, tagged with their bit-width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// Harness header, without the bit-width column. Empty until the first
    /// append.
    columns: Vec<String>,
    rows: Vec<BenchmarkRow>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Harness columns, configuration name first.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Full dataset header: `bit_width` followed by the harness columns.
    pub fn header(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.columns.len() + 1);
        out.push(BIT_WIDTH_COLUMN.to_string());
        out.extend(self.columns.iter().cloned());
        out
    }

    pub fn rows(&self) -> &[BenchmarkRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append the rows of one harness run at width `bits`.
    ///
    /// The first append fixes the header; later runs must report the same
    /// one. Nothing is appended if the run is rejected. Returns the number
    /// of rows added.
    pub fn append(&mut self, bits: u8, output: HarnessOutput) -> Result<usize, SweepError> {
        if output.header.is_empty() {
            return Err(SweepError::Parse {
                bits,
                line: 1,
                msg: "empty header".into(),
            });
        }
        if self.columns.is_empty() {
            self.columns = output.header;
        } else if self.columns != output.header {
            return Err(SweepError::Parse {
                bits,
                line: 1,
                msg: format!(
                    "header {:?} differs from the first run's {:?}",
                    output.header, self.columns
                ),
            });
        }
        let added = output.rows.len();
        self.rows.extend(
            output
                .rows
                .into_iter()
                .map(|(_, fields)| BenchmarkRow::from_fields(bits, fields)),
        );
        Ok(added)
    }

    /// Rows measured at width `bits`.
    pub fn rows_for(&self, bits: u8) -> impl Iterator<Item = &BenchmarkRow> {
        self.rows.iter().filter(move |r| r.bit_width == bits)
    }

    /// `(bit_width, value)` pairs of `column` for one configuration, in
    /// dataset order. Non-numeric cells are skipped.
    pub fn series(&self, key: &ConfigKey, column: &str) -> Vec<(u8, f64)> {
        self.rows
            .iter()
            .filter(|r| r.key.as_ref() == Some(key))
            .filter_map(|r| Some((r.bit_width, r.metric(&self.columns, column)?)))
            .collect()
    }

    /// Read a dataset file written by [`DatasetWriter`].
    pub fn load<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Self, SweepError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_path(path.as_ref())?;
        let header = reader.headers()?.clone();
        if header.get(0) != Some(BIT_WIDTH_COLUMN) || header.len() < 2 {
            return Err(SweepError::InvalidDataset(format!(
                "header must start with '{BIT_WIDTH_COLUMN}' and a configuration column"
            )));
        }
        let columns: Vec<String> = header.iter().skip(1).map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            if record.len() != header.len() {
                return Err(SweepError::InvalidDataset(format!(
                    "line {line}: {} fields, header has {}",
                    record.len(),
                    header.len()
                )));
            }
            let bits: u8 = record[0].trim().parse().map_err(|_| {
                SweepError::InvalidDataset(format!("line {line}: bad bit-width '{}'", &record[0]))
            })?;
            rows.push(BenchmarkRow::from_fields(
                bits,
                record.iter().skip(1).map(str::to_string).collect(),
            ));
        }
        Ok(Self { columns, rows })
    }
}

/// Incremental CSV output of a sweep.
pub struct DatasetWriter {
    writer: csv::Writer<File>,
    header_written: bool,
}

impl DatasetWriter {
    /// Create (truncating) the dataset file.
    pub fn create<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Self, SweepError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        let writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_writer(file);
        Ok(Self {
            writer,
            header_written: false,
        })
    }

    /// Write the rows of width `bits` (and the header on first use), then
    /// flush them to disk.
    pub fn append(&mut self, dataset: &Dataset, bits: u8) -> Result<usize, SweepError> {
        if !self.header_written {
            self.writer.write_record(dataset.header())?;
            self.header_written = true;
        }
        let mut written = 0;
        for row in dataset.rows_for(bits) {
            self.writer.write_record(row.record())?;
            written += 1;
        }
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(written)
    }
}

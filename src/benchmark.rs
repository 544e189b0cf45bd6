//! Harness output parsing and typed benchmark rows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codes::{BitOrder, CodeFamily};
use crate::SweepError;

/// Bit-buffering strategy of a benchmarked reader or writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Buffering {
    Buffered,
    Unbuffered,
}

impl fmt::Display for Buffering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Buffering::Buffered => "buffered",
            Buffering::Unbuffered => "unbuffered",
        })
    }
}

/// Structured form of a configuration name such as
/// `buffered::gamma::M2L::Table`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigKey {
    pub buffering: Buffering,
    pub family: CodeFamily,
    pub direction: BitOrder,
    /// Whether decoding went through a lookup table.
    pub table: bool,
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}::{}::{}",
            self.buffering,
            self.family,
            self.direction,
            if self.table { "Table" } else { "NoTable" }
        )
    }
}

impl FromStr for ConfigKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split("::").collect();
        let [buffering, family, direction, table] = parts.as_slice() else {
            return Err(format!("'{s}' does not have four '::' separated parts"));
        };
        let buffering = match buffering.to_ascii_lowercase().as_str() {
            "buffered" | "buff" => Buffering::Buffered,
            "unbuffered" | "unbuff" => Buffering::Unbuffered,
            other => return Err(format!("unknown buffering '{other}'")),
        };
        let table = match table.to_ascii_lowercase().as_str() {
            "table" => true,
            "notable" => false,
            other => return Err(format!("unknown table flag '{other}'")),
        };
        Ok(ConfigKey {
            buffering,
            family: family.parse()?,
            direction: direction.parse()?,
            table,
        })
    }
}

/// Output of one harness invocation, split into fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessOutput {
    pub header: Vec<String>,
    /// Data rows with their 1-based line numbers in the output.
    pub rows: Vec<(usize, Vec<String>)>,
}

impl HarnessOutput {
    /// Split the stdout of a run at width `bits`.
    ///
    /// The first non-blank line is the header; every other non-blank line
    /// is a row and must have as many fields as the header.
    pub fn parse(stdout: &str, bits: u8, delimiter: u8) -> Result<Self, SweepError> {
        let mut lines = stdout
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l))
            .filter(|(_, l)| !l.trim().is_empty());

        let (header_line, header) = match lines.next() {
            Some((n, line)) => (n, split_fields(line, delimiter, bits, n)?),
            None => {
                return Err(SweepError::HarnessExecution {
                    bits,
                    reason: "harness produced no output".into(),
                })
            }
        };
        log::trace!("harness header at line {header_line}: {header:?}");

        let mut rows = Vec::new();
        for (n, line) in lines {
            let fields = split_fields(line, delimiter, bits, n)?;
            if fields.len() != header.len() {
                return Err(SweepError::Parse {
                    bits,
                    line: n,
                    msg: format!(
                        "expected {} fields as in the header, found {}",
                        header.len(),
                        fields.len()
                    ),
                });
            }
            rows.push((n, fields));
        }
        Ok(Self { header, rows })
    }
}

fn split_fields(line: &str, delimiter: u8, bits: u8, n: usize) -> Result<Vec<String>, SweepError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(line.as_bytes());
    let mut record = csv::StringRecord::new();
    let found = reader.read_record(&mut record).map_err(|e| SweepError::Parse {
        bits,
        line: n,
        msg: e.to_string(),
    })?;
    if !found {
        return Err(SweepError::Parse {
            bits,
            line: n,
            msg: "no fields".into(),
        });
    }
    Ok(record.iter().map(str::to_string).collect())
}

/// One measured configuration at one bit-width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRow {
    /// Table width the harness ran with.
    pub bit_width: u8,
    /// Configuration name as printed by the harness.
    pub name: String,
    /// Parsed configuration, when the name follows the usual layout.
    pub key: Option<ConfigKey>,
    /// Remaining fields, in harness order.
    pub values: Vec<String>,
}

impl BenchmarkRow {
    /// Build a row from harness fields; the first field is the name.
    pub fn from_fields(bit_width: u8, mut fields: Vec<String>) -> Self {
        let name = if fields.is_empty() {
            String::new()
        } else {
            fields.remove(0)
        };
        let key = name.parse().ok();
        Self {
            bit_width,
            name,
            key,
            values: fields,
        }
    }

    /// All fields as written to the dataset, bit-width first.
    pub fn record(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.values.len() + 2);
        out.push(self.bit_width.to_string());
        out.push(self.name.clone());
        out.extend(self.values.iter().cloned());
        out
    }

    /// Value of a timing column. `columns` is the harness header, whose
    /// first entry names the configuration column.
    pub fn metric(&self, columns: &[String], column: &str) -> Option<f64> {
        let idx = columns.iter().skip(1).position(|c| c == column)?;
        self.values.get(idx)?.trim().parse().ok()
    }
}

//! Lookup-table sweeps for unary, Elias γ and Elias δ codes.
//!
//! For each table width in a range, the sweep regenerates the decoding and
//! encoding tables of the three codes, runs an external benchmark harness
//! against them and collects the harness output into a CSV dataset tagged
//! with the width.

pub mod benchmark;
pub mod codes;
pub mod config;
pub mod dataset;
pub mod error;
pub mod harness;
pub mod io_utils;
pub mod manifest;
pub mod persist;
pub mod report;
pub mod sweep;
pub mod table;

pub use benchmark::{BenchmarkRow, Buffering, ConfigKey, HarnessOutput};
pub use codes::{BitOrder, CodeFamily, Codeword};
pub use config::{HarnessConfig, SweepConfig, MAX_TABLE_BITS, MAX_WRITE_SYMBOLS};
pub use dataset::{Dataset, DatasetWriter};
pub use error::{Stage, SweepError};
pub use harness::{CommandHarness, Harness};
pub use persist::{DirSink, TableFormat, TableSink};
pub use sweep::{generate_tables, Sweep};
pub use table::{CodeTable, Resolution, UNRESOLVED};

use std::path::PathBuf;

use thiserror::Error;

use crate::codes::CodeFamily;

/// Pipeline stage in which a sweep failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configuration,
    Generation,
    Execution,
    Parsing,
    Output,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Configuration => "configuration",
            Stage::Generation => "generation",
            Stage::Execution => "execution",
            Stage::Parsing => "parsing",
            Stage::Output => "output",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum SweepError {
    /// Invalid sweep parameters.
    #[error("config error: {0}")]
    Configuration(String),

    /// Internal inconsistency while building a table.
    #[error("table generation error ({family}, {bits} bits): {msg}")]
    TableGeneration {
        family: CodeFamily,
        bits: u8,
        msg: String,
    },

    /// A generated table could not be written where the harness reads it.
    #[error("failed to persist {family} table ({bits} bits) to '{}': {source}", .path.display())]
    Persist {
        family: CodeFamily,
        bits: u8,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The harness could not be run, exited non-zero or printed nothing.
    #[error("harness failed at bit-width {bits}: {reason}")]
    HarnessExecution { bits: u8, reason: String },

    /// A harness data line disagrees with the header.
    #[error("parse error at bit-width {bits}, line {line}: {msg}")]
    Parse { bits: u8, line: usize, msg: String },

    /// A dataset file on disk is malformed.
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// bincode or JSON failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl SweepError {
    /// Stage of the sweep that produced this error.
    pub fn stage(&self) -> Stage {
        use SweepError::*;
        match self {
            Configuration(_) => Stage::Configuration,
            TableGeneration { .. } | Persist { .. } => Stage::Generation,
            HarnessExecution { .. } => Stage::Execution,
            Parse { .. } | InvalidDataset(_) => Stage::Parsing,
            Io(_) | Csv(_) | Serialization(_) => Stage::Output,
        }
    }

    /// Bit-width active when the error occurred, when known.
    pub fn bit_width(&self) -> Option<u8> {
        use SweepError::*;
        match self {
            TableGeneration { bits, .. }
            | Persist { bits, .. }
            | HarnessExecution { bits, .. }
            | Parse { bits, .. } => Some(*bits),
            _ => None,
        }
    }
}

impl From<bincode::Error> for SweepError {
    fn from(err: bincode::Error) -> Self {
        SweepError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SweepError {
    fn from(err: serde_json::Error) -> Self {
        SweepError::Serialization(err.to_string())
    }
}

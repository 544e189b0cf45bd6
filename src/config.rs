use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codes::CodeFamily;
use crate::persist::TableFormat;
use crate::SweepError;

/// Largest lookahead window a table may cover.
pub const MAX_TABLE_BITS: u8 = 24;

/// Largest number of symbols an encoding table may hold.
pub const MAX_WRITE_SYMBOLS: u64 = 1 << 20;

/// External benchmark command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Program to execute.
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
    /// Working directory, defaults to the current one.
    pub cwd: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            program: "cargo".into(),
            args: vec!["run".into(), "--release".into()],
            cwd: Some(PathBuf::from("benchmarks")),
        }
    }
}

/// Parameters of a table-width sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// First bit-width of the sweep.
    pub min_bits: u8,
    /// Last bit-width of the sweep, inclusive.
    pub max_bits: u8,
    /// Largest symbol in the unary encoding table.
    pub unary_cap: u64,
    /// Largest symbol in the γ encoding table.
    pub gamma_cap: u64,
    /// Largest symbol in the δ encoding table.
    pub delta_cap: u64,
    /// Directory the harness loads tables from.
    pub tables_dir: PathBuf,
    pub format: TableFormat,
    /// Output CSV.
    pub dataset: PathBuf,
    /// Field delimiter of the harness output and of the dataset.
    pub delimiter: char,
    pub harness: HarnessConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            min_bits: 1,
            max_bits: 19,
            unary_cap: 63,
            gamma_cap: 256,
            delta_cap: 256,
            tables_dir: PathBuf::from("benchmarks/src"),
            format: TableFormat::Rust,
            dataset: PathBuf::from("tables.csv"),
            delimiter: ',',
            harness: HarnessConfig::default(),
        }
    }
}

impl SweepConfig {
    /// Load a configuration from a JSON file. Missing keys take their
    /// default values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SweepError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            SweepError::Configuration(format!("{}: {e}", path.display()))
        })
    }

    /// Symbol cap of the encoding table for `family`.
    pub fn cap(&self, family: CodeFamily) -> u64 {
        match family {
            CodeFamily::Unary => self.unary_cap,
            CodeFamily::Gamma => self.gamma_cap,
            CodeFamily::Delta => self.delta_cap,
        }
    }

    /// Delimiter as the single byte the csv crate expects.
    pub fn delimiter_byte(&self) -> Result<u8, SweepError> {
        delimiter_byte(self.delimiter)
    }

    /// Check every parameter before any table is written.
    pub fn validate(&self) -> Result<(), SweepError> {
        validate_bits(self.min_bits)?;
        validate_bits(self.max_bits)?;
        if self.min_bits > self.max_bits {
            return Err(SweepError::Configuration(format!(
                "min_bits {} greater than max_bits {}",
                self.min_bits, self.max_bits
            )));
        }
        for family in CodeFamily::ALL {
            validate_cap(family, self.cap(family))?;
        }
        self.delimiter_byte()?;
        if self.harness.program.trim().is_empty() {
            return Err(SweepError::Configuration("harness program is empty".into()));
        }
        Ok(())
    }

    /// Bit-widths visited by the sweep, in order.
    pub fn widths(&self) -> std::ops::RangeInclusive<u8> {
        self.min_bits..=self.max_bits
    }
}

/// A table width must lie in `1..=MAX_TABLE_BITS`.
pub fn validate_bits(bits: u8) -> Result<(), SweepError> {
    if bits == 0 {
        return Err(SweepError::Configuration(
            "bit-width must be at least 1".into(),
        ));
    }
    if bits > MAX_TABLE_BITS {
        return Err(SweepError::Configuration(format!(
            "bit-width {bits} exceeds the maximum of {MAX_TABLE_BITS}"
        )));
    }
    Ok(())
}

/// The cap must be a symbol of the family whose codeword fits in 64 bits,
/// and the encoding table up to it at most [`MAX_WRITE_SYMBOLS`] long.
pub fn validate_cap(family: CodeFamily, cap: u64) -> Result<(), SweepError> {
    if cap < family.min_symbol() {
        return Err(SweepError::Configuration(format!(
            "{family} cap {cap} is below the smallest symbol {}",
            family.min_symbol()
        )));
    }
    if cap - family.min_symbol() >= MAX_WRITE_SYMBOLS {
        return Err(SweepError::Configuration(format!(
            "{family} cap {cap} needs more than {MAX_WRITE_SYMBOLS} codewords"
        )));
    }
    match family.codeword_len(cap) {
        Some(len) if len <= 64 => Ok(()),
        _ => Err(SweepError::Configuration(format!(
            "{family} cap {cap} has a codeword longer than 64 bits"
        ))),
    }
}

pub fn delimiter_byte(delimiter: char) -> Result<u8, SweepError> {
    u8::try_from(delimiter)
        .ok()
        .filter(|b| b.is_ascii() && *b != b'\n' && *b != b'\r')
        .ok_or_else(|| {
            SweepError::Configuration(format!("delimiter {delimiter:?} is not a single ASCII byte"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = SweepConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.widths().count(), 19);
    }

    #[test]
    fn rejects_bad_widths_and_caps() {
        let mut cfg = SweepConfig::default();
        cfg.min_bits = 0;
        assert!(matches!(cfg.validate(), Err(SweepError::Configuration(_))));

        let mut cfg = SweepConfig::default();
        cfg.min_bits = 10;
        cfg.max_bits = 5;
        assert!(cfg.validate().is_err());

        let mut cfg = SweepConfig::default();
        cfg.max_bits = MAX_TABLE_BITS + 1;
        assert!(cfg.validate().is_err());

        let mut cfg = SweepConfig::default();
        cfg.unary_cap = 64;
        assert!(cfg.validate().is_err());

        let mut cfg = SweepConfig::default();
        cfg.gamma_cap = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn huge_caps_are_configuration_errors() {
        let mut cfg = SweepConfig::default();
        cfg.gamma_cap = u32::MAX as u64;
        assert!(matches!(cfg.validate(), Err(SweepError::Configuration(_))));

        let mut cfg = SweepConfig::default();
        cfg.delta_cap = 1 << 50;
        assert!(matches!(cfg.validate(), Err(SweepError::Configuration(_))));

        assert!(validate_cap(CodeFamily::Delta, u64::MAX).is_err());
        assert!(validate_cap(CodeFamily::Gamma, MAX_WRITE_SYMBOLS).is_ok());
        assert!(validate_cap(CodeFamily::Gamma, MAX_WRITE_SYMBOLS + 1).is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: SweepConfig =
            serde_json::from_str(r#"{"max_bits": 8, "harness": {"program": "sh"}}"#).unwrap();
        assert_eq!(cfg.max_bits, 8);
        assert_eq!(cfg.min_bits, 1);
        assert_eq!(cfg.harness.program, "sh");
        assert!(cfg.harness.args.contains(&"--release".to_string()));
    }

    #[test]
    fn delimiter_must_be_ascii() {
        assert_eq!(delimiter_byte(';').unwrap(), b';');
        assert!(delimiter_byte('é').is_err());
        assert!(delimiter_byte('\n').is_err());
    }
}

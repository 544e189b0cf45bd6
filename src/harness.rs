//! Running the external benchmark harness.

use std::path::PathBuf;
use std::process::Command;

use crate::config::HarnessConfig;
use crate::SweepError;

/// Something that benchmarks the tables currently on disk and reports the
/// results as text.
pub trait Harness {
    /// Run once for tables of width `bits` and return the captured stdout.
    fn run(&mut self, bits: u8) -> Result<String, SweepError>;
}

/// Runs an external command and waits for it to exit.
#[derive(Debug, Clone)]
pub struct CommandHarness {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl CommandHarness {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Human readable command line, for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<&HarnessConfig> for CommandHarness {
    fn from(cfg: &HarnessConfig) -> Self {
        Self {
            program: cfg.program.clone(),
            args: cfg.args.clone(),
            cwd: cfg.cwd.clone(),
        }
    }
}

impl Harness for CommandHarness {
    fn run(&mut self, bits: u8) -> Result<String, SweepError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        log::info!("running harness for {bits} bits: {}", self.command_line());

        let output = cmd.output().map_err(|e| SweepError::HarnessExecution {
            bits,
            reason: format!("could not start '{}': {e}", self.program),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
                Some(last) => format!("{} ({})", output.status, last.trim()),
                None => output.status.to_string(),
            };
            return Err(SweepError::HarnessExecution { bits, reason });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

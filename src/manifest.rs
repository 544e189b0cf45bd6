//! JSON record of what produced each part of a dataset.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sysinfo::{CpuExt, System, SystemExt};

use crate::codes::CodeFamily;
use crate::config::SweepConfig;
use crate::persist::write_durable;
use crate::SweepError;

/// Machine the harness ran on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub cpu: Option<String>,
    pub logical_cpus: usize,
    pub os: Option<String>,
}

impl HostInfo {
    pub fn detect() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        Self {
            cpu: sys.cpus().first().map(|c| c.brand().trim().to_string()),
            logical_cpus: sys.cpus().len(),
            os: sys.long_os_version(),
        }
    }
}

/// What one completed sweep step produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub bit_width: u8,
    /// Table fingerprint per family.
    pub tables: BTreeMap<CodeFamily, String>,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub host: HostInfo,
    pub config: SweepConfig,
    pub steps: Vec<StepRecord>,
}

impl Manifest {
    pub fn new(host: HostInfo, config: SweepConfig) -> Self {
        Self {
            host,
            config,
            steps: Vec::new(),
        }
    }

    /// Manifest location for a dataset file: `<dataset>.manifest.json`.
    pub fn path_for(dataset: &Path) -> PathBuf {
        let mut name = dataset.as_os_str().to_owned();
        name.push(".manifest.json");
        PathBuf::from(name)
    }

    pub fn save(&self, path: &Path) -> Result<(), SweepError> {
        let mut json = serde_json::to_vec_pretty(self)?;
        json.push(b'\n');
        write_durable(path, &json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SweepError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

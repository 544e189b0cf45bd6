//! The table-width sweep.
//!
//! Every step regenerates the unary, γ and δ tables at one width, writes
//! them out, runs the harness and appends its rows to the dataset. Steps are
//! strictly sequential and the first failure ends the sweep; rows of
//! earlier steps are already flushed to disk by then.

use std::collections::BTreeMap;
use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};

use crate::benchmark::HarnessOutput;
use crate::codes::CodeFamily;
use crate::config::SweepConfig;
use crate::dataset::{Dataset, DatasetWriter};
use crate::harness::Harness;
use crate::manifest::{HostInfo, Manifest, StepRecord};
use crate::persist::TableSink;
use crate::table::CodeTable;
use crate::SweepError;

/// Generate and persist the three tables for one width. Returns each
/// family's fingerprint.
pub fn generate_tables<S: TableSink + ?Sized>(
    config: &SweepConfig,
    bits: u8,
    sink: &mut S,
) -> Result<BTreeMap<CodeFamily, String>, SweepError> {
    let mut fingerprints = BTreeMap::new();
    for family in CodeFamily::ALL {
        let table = CodeTable::generate(family, bits, config.cap(family))?;
        let path = sink.persist(&table)?;
        log::debug!("{family} table for {bits} bits at {}", path.display());
        fingerprints.insert(family, table.fingerprint());
    }
    Ok(fingerprints)
}

pub struct Sweep<'a> {
    config: SweepConfig,
    sink: &'a mut dyn TableSink,
    harness: &'a mut dyn Harness,
    writer: Option<DatasetWriter>,
    manifest: Option<(PathBuf, Manifest)>,
    progress: ProgressBar,
}

impl<'a> Sweep<'a> {
    /// Validate `config` and set up a sweep with no file output.
    pub fn new(
        config: SweepConfig,
        sink: &'a mut dyn TableSink,
        harness: &'a mut dyn Harness,
    ) -> Result<Self, SweepError> {
        config.validate()?;
        Ok(Self {
            config,
            sink,
            harness,
            writer: None,
            manifest: None,
            progress: ProgressBar::hidden(),
        })
    }

    /// Write the dataset to `config.dataset` as the sweep goes, with the
    /// manifest next to it.
    pub fn with_output(mut self, host: HostInfo) -> Result<Self, SweepError> {
        let delimiter = self.config.delimiter_byte()?;
        self.writer = Some(DatasetWriter::create(&self.config.dataset, delimiter)?);
        let path = Manifest::path_for(&self.config.dataset);
        self.manifest = Some((path, Manifest::new(host, self.config.clone())));
        Ok(self)
    }

    /// Show a progress bar on stderr.
    pub fn with_progress(mut self) -> Self {
        let bar = ProgressBar::new(self.config.widths().count() as u64);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} widths {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        self.progress = bar;
        self
    }

    /// Run every width of the sweep and return the collected dataset.
    pub fn run(mut self) -> Result<Dataset, SweepError> {
        let mut dataset = Dataset::new();
        for bits in self.config.widths() {
            self.progress.set_message(format!("{bits} bits"));
            if let Err(e) = self.step(bits, &mut dataset) {
                self.progress.abandon_with_message(format!("failed at {bits} bits"));
                log::error!("sweep halted during {} at {bits} bits: {e}", e.stage());
                return Err(e);
            }
            self.progress.inc(1);
        }
        self.progress.finish_with_message("done");
        log::info!(
            "sweep finished: {} rows over {} widths",
            dataset.len(),
            self.config.widths().count()
        );
        Ok(dataset)
    }

    /// One sweep step: tables, harness, parse, append, flush.
    pub fn step(&mut self, bits: u8, dataset: &mut Dataset) -> Result<usize, SweepError> {
        let tables = generate_tables(&self.config, bits, &mut *self.sink)?;
        log::info!("tables for {bits} bits written");

        let stdout = self.harness.run(bits)?;
        let output = HarnessOutput::parse(&stdout, bits, self.config.delimiter_byte()?)?;
        let rows = dataset.append(bits, output)?;
        log::info!("{rows} rows at {bits} bits");

        if let Some(writer) = self.writer.as_mut() {
            writer.append(dataset, bits)?;
        }
        if let Some((path, manifest)) = self.manifest.as_mut() {
            manifest.steps.push(StepRecord {
                bit_width: bits,
                tables,
                rows,
            });
            manifest.save(path)?;
        }
        Ok(rows)
    }
}

//! Per-configuration summaries of a dataset.

use std::collections::BTreeSet;
use std::fmt::{self, Write as _};

use serde::Serialize;

use crate::benchmark::ConfigKey;
use crate::codes::CodeFamily;
use crate::dataset::Dataset;

/// Metric column summarised when none is given.
pub const DEFAULT_METRIC: &str = "read_ns_pe";

/// How one configuration's metric evolves with the table width.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub key: ConfigKey,
    pub metric: String,
    /// `(bit_width, value)` in increasing width.
    pub points: Vec<(u8, f64)>,
    /// Width with the lowest value.
    pub best: Option<(u8, f64)>,
}

/// Summarise `metric` for every configuration with a structured key,
/// optionally restricted to one code family.
pub fn summarize(dataset: &Dataset, metric: &str, family: Option<CodeFamily>) -> Vec<SeriesSummary> {
    let keys: BTreeSet<ConfigKey> = dataset
        .rows()
        .iter()
        .filter_map(|row| row.key)
        .filter(|key| family.map_or(true, |f| f == key.family))
        .collect();
    keys.into_iter()
        .filter_map(|key| {
            let mut points = dataset.series(&key, metric);
            if points.is_empty() {
                return None;
            }
            points.sort_by_key(|(bits, _)| *bits);
            let best = points
                .iter()
                .copied()
                .min_by(|a, b| a.1.total_cmp(&b.1));
            Some(SeriesSummary {
                key,
                metric: metric.to_string(),
                points,
                best,
            })
        })
        .collect()
}

/// Plain-text rendering, one line per configuration.
pub fn render_text(summaries: &[SeriesSummary]) -> String {
    let mut out = String::new();
    match write_text(&mut out, summaries) {
        Ok(()) => out,
        Err(fmt::Error) => String::new(),
    }
}

fn write_text(out: &mut String, summaries: &[SeriesSummary]) -> fmt::Result {
    for s in summaries {
        write!(out, "{:<36}", s.key.to_string())?;
        if let Some((bits, value)) = s.best {
            write!(out, " best {} = {value:.3} at {bits:>2} bits |", s.metric)?;
        }
        for (bits, value) in &s.points {
            write!(out, " {bits}:{value:.2}")?;
        }
        out.push('\n');
    }
    Ok(())
}

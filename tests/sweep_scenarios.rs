use std::collections::VecDeque;
use std::fs;

use tablesweep::manifest::{HostInfo, Manifest};
use tablesweep::{
    CodeFamily, Dataset, DirSink, Harness, Stage, Sweep, SweepConfig, SweepError, TableFormat,
};

/// Replays canned harness results, one per invocation, and records which
/// widths it was run for.
struct Scripted {
    replies: VecDeque<Result<String, String>>,
    calls: Vec<u8>,
}

impl Scripted {
    fn new(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies: replies.into(),
            calls: Vec::new(),
        }
    }
}

impl Harness for Scripted {
    fn run(&mut self, bits: u8) -> Result<String, SweepError> {
        self.calls.push(bits);
        match self.replies.pop_front() {
            Some(Ok(stdout)) => Ok(stdout),
            Some(Err(reason)) => Err(SweepError::HarnessExecution { bits, reason }),
            None => Err(SweepError::HarnessExecution {
                bits,
                reason: "no scripted reply".into(),
            }),
        }
    }
}

fn config(dir: &std::path::Path, min_bits: u8, max_bits: u8) -> SweepConfig {
    SweepConfig {
        min_bits,
        max_bits,
        tables_dir: dir.join("tables"),
        dataset: dir.join("tables.csv"),
        format: TableFormat::Raw,
        ..SweepConfig::default()
    }
}

const HEADER: &str = "pat,read_ns_pe,write_ns_pe";

fn reply(rows: usize, bits: u8) -> Result<String, String> {
    let mut out = format!("{HEADER}\n");
    for i in 0..rows {
        out.push_str(&format!("buffered::gamma::L2M::Table,{}.{i},1.0\n", bits));
        out.push('\n');
    }
    Ok(out)
}

#[test]
fn dataset_grows_by_each_widths_rows() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), 1, 5);
    let counts = [3usize, 1, 4, 1, 5];
    let mut harness = Scripted::new(
        counts
            .iter()
            .enumerate()
            .map(|(i, &n)| reply(n, i as u8 + 1))
            .collect(),
    );
    let mut sink = DirSink::new(&cfg.tables_dir, cfg.format);

    let dataset = Sweep::new(cfg.clone(), &mut sink, &mut harness)
        .unwrap()
        .with_output(HostInfo::default())
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(harness.calls, vec![1, 2, 3, 4, 5]);
    assert_eq!(dataset.len(), counts.iter().sum::<usize>());
    for (i, &n) in counts.iter().enumerate() {
        let bits = i as u8 + 1;
        assert_eq!(dataset.rows_for(bits).count(), n);
        assert!(dataset
            .rows_for(bits)
            .all(|r| r.values[0].starts_with(&format!("{bits}."))));
    }

    let on_disk = Dataset::load(&cfg.dataset, b',').unwrap();
    assert_eq!(on_disk, dataset);
    let text = fs::read_to_string(&cfg.dataset).unwrap();
    assert!(text.starts_with("bit_width,pat,read_ns_pe,write_ns_pe\n"));
    assert_eq!(text.lines().count(), 1 + dataset.len());

    let manifest = Manifest::load(&Manifest::path_for(&cfg.dataset)).unwrap();
    assert_eq!(manifest.steps.len(), 5);
    assert_eq!(manifest.steps[2].rows, 4);
    assert_eq!(manifest.steps[2].tables.len(), 3);

    // tables of the last width are the ones left on disk
    for family in CodeFamily::ALL {
        let table = tablesweep::persist::load(sink.path_for(family)).unwrap();
        assert_eq!(table.bits, 5);
        assert_eq!(
            table.fingerprint(),
            manifest.steps[4].tables[&family]
        );
    }
}

#[test]
fn scenario_single_row_at_width_four() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), 4, 4);
    let mut harness = Scripted::new(vec![Ok(
        "name,read_ns_pe,write_ns_pe\nfoo,12.3,45.6\n".to_string()
    )]);
    let mut sink = DirSink::new(&cfg.tables_dir, cfg.format);
    Sweep::new(cfg.clone(), &mut sink, &mut harness)
        .unwrap()
        .with_output(HostInfo::default())
        .unwrap()
        .run()
        .unwrap();
    let text = fs::read_to_string(&cfg.dataset).unwrap();
    assert_eq!(text, "bit_width,name,read_ns_pe,write_ns_pe\n4,foo,12.3,45.6\n");
}

#[test]
fn harness_failure_halts_and_keeps_prior_rows() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), 1, 6);
    let mut harness = Scripted::new(vec![
        reply(2, 1),
        reply(2, 2),
        Err("exit status: 1".into()),
        reply(2, 4),
    ]);
    let mut sink = DirSink::new(&cfg.tables_dir, cfg.format);

    let err = Sweep::new(cfg.clone(), &mut sink, &mut harness)
        .unwrap()
        .with_output(HostInfo::default())
        .unwrap()
        .run()
        .unwrap_err();

    assert!(matches!(err, SweepError::HarnessExecution { bits: 3, .. }));
    assert_eq!(err.stage(), Stage::Execution);
    assert_eq!(harness.calls, vec![1, 2, 3]);

    let on_disk = Dataset::load(&cfg.dataset, b',').unwrap();
    assert_eq!(on_disk.len(), 4);
    assert_eq!(on_disk.rows_for(3).count(), 0);
    let manifest = Manifest::load(&Manifest::path_for(&cfg.dataset)).unwrap();
    assert_eq!(manifest.steps.len(), 2);
}

#[test]
fn malformed_row_halts_with_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), 2, 4);
    let mut harness = Scripted::new(vec![
        reply(1, 2),
        Ok(format!("{HEADER}\nbuffered::unary::M2L::Table,1.0,2.0\nshort,1.0\n")),
        reply(1, 4),
    ]);
    let mut sink = DirSink::new(&cfg.tables_dir, cfg.format);

    let err = Sweep::new(cfg.clone(), &mut sink, &mut harness)
        .unwrap()
        .with_output(HostInfo::default())
        .unwrap()
        .run()
        .unwrap_err();

    match err {
        SweepError::Parse { bits, line, .. } => {
            assert_eq!(bits, 3);
            assert_eq!(line, 3);
        }
        other => panic!("unexpected {other:?}"),
    }
    let on_disk = Dataset::load(&cfg.dataset, b',').unwrap();
    assert_eq!(on_disk.len(), 1);
    assert!(on_disk.rows().iter().all(|r| r.bit_width == 2));
}

#[test]
fn empty_output_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), 1, 2);
    let mut harness = Scripted::new(vec![Ok("\n\n".into())]);
    let mut sink = DirSink::new(&cfg.tables_dir, cfg.format);
    let err = Sweep::new(cfg, &mut sink, &mut harness)
        .unwrap()
        .run()
        .unwrap_err();
    assert!(matches!(err, SweepError::HarnessExecution { bits: 1, .. }));
    assert_eq!(err.bit_width(), Some(1));
}

#[test]
fn unwritable_tables_dir_fails_before_the_harness_runs() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("tables");
    fs::write(&blocker, b"not a directory").unwrap();
    let cfg = config(dir.path(), 1, 1);
    let mut harness = Scripted::new(vec![reply(1, 1)]);
    let mut sink = DirSink::new(&cfg.tables_dir, cfg.format);
    let err = Sweep::new(cfg, &mut sink, &mut harness)
        .unwrap()
        .run()
        .unwrap_err();
    assert!(matches!(err, SweepError::Persist { bits: 1, .. }));
    assert_eq!(err.stage(), Stage::Generation);
    assert!(harness.calls.is_empty());
}

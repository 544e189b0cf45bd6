use std::fs;
use std::process::Command;

#[test]
fn generate_writes_all_families() {
    let exe = env!("CARGO_BIN_EXE_tablesweep");
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(exe)
        .args(["generate", "--bits", "4", "--format", "rust", "--out-dir"])
        .arg(dir.path())
        .output()
        .expect("generate failed");
    assert!(output.status.success());
    for family in ["unary", "gamma", "delta"] {
        let src = fs::read_to_string(dir.path().join(format!("{family}_tables.rs"))).unwrap();
        assert!(src.contains("pub const READ_BITS: usize = 4;"));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 3);
}

#[test]
fn generate_rejects_zero_bits() {
    let exe = env!("CARGO_BIN_EXE_tablesweep");
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(exe)
        .args(["generate", "--bits", "0", "--out-dir"])
        .arg(dir.path())
        .output()
        .expect("run failed");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("configuration stage"));
}

#[test]
fn inspect_unary_one_bit() {
    let exe = env!("CARGO_BIN_EXE_tablesweep");
    let run = |window: &str| {
        let output = Command::new(exe)
            .args(["inspect", "--family", "unary", "--bits", "1", window])
            .output()
            .expect("inspect failed");
        assert!(output.status.success());
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    };
    assert_eq!(run("1"), "symbol 0, 1 bits");
    assert_eq!(run("0"), "unresolved");
}

#[cfg(unix)]
#[test]
fn sweep_and_report() {
    let exe = env!("CARGO_BIN_EXE_tablesweep");
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("tables.csv");
    let script = "printf 'pat,read_ns_pe,write_ns_pe\\nbuffered::delta::M2L::Table,%s,2\\n\\n' \
                  $(ls tables | wc -l)";

    let status = Command::new(exe)
        .current_dir(dir.path())
        .args([
            "sweep",
            "--min-bits",
            "1",
            "--max-bits",
            "3",
            "--tables-dir",
            "tables",
            "--format",
            "bincode",
            "--quiet",
            "--dataset",
        ])
        .arg(&dataset)
        .args(["--", "sh", "-c", script])
        .status()
        .expect("sweep failed");
    assert!(status.success());

    let text = fs::read_to_string(&dataset).unwrap();
    assert_eq!(
        text,
        "bit_width,pat,read_ns_pe,write_ns_pe\n\
         1,buffered::delta::M2L::Table,3,2\n\
         2,buffered::delta::M2L::Table,3,2\n\
         3,buffered::delta::M2L::Table,3,2\n"
    );
    assert!(dir.path().join("tables.csv.manifest.json").exists());

    let output = Command::new(exe)
        .args(["report", "--json"])
        .arg(&dataset)
        .output()
        .expect("report failed");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["best"][0], 1);
    assert_eq!(json[0]["points"].as_array().unwrap().len(), 3);
}

#[cfg(unix)]
#[test]
fn failing_harness_stops_the_sweep() {
    let exe = env!("CARGO_BIN_EXE_tablesweep");
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("tables.csv");
    let output = Command::new(exe)
        .current_dir(dir.path())
        .args([
            "sweep",
            "--max-bits",
            "4",
            "--tables-dir",
            "tables",
            "--quiet",
            "--dataset",
        ])
        .arg(&dataset)
        .args(["--", "sh", "-c", "exit 1"])
        .output()
        .expect("run failed");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bit-width 1"));
    assert!(stderr.contains("execution stage"));
    assert_eq!(fs::read_to_string(&dataset).unwrap(), "");
}

#[test]
fn table_dump_prints_windows() {
    let sweep = env!("CARGO_BIN_EXE_tablesweep");
    let dump = env!("CARGO_BIN_EXE_table_dump");
    let dir = tempfile::tempdir().unwrap();
    let status = Command::new(sweep)
        .args(["generate", "--bits", "3", "--family", "gamma", "--format", "raw", "--out-dir"])
        .arg(dir.path())
        .status()
        .expect("generate failed");
    assert!(status.success());

    let output = Command::new(dump)
        .arg(dir.path().join("gamma_tables.raw"))
        .output()
        .expect("dump failed");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("gamma table, 3 bits, cap 256, 6 of 8 windows resolved"));
    assert!(stdout.contains("010 -> 2 (3 bits)"));
    assert!(stdout.contains("001 -> unresolved"));
}

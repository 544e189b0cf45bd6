//! Writing generated tables where the benchmark harness loads them.

use std::fmt::{self, Write as _};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::codes::{BitOrder, CodeFamily, Codeword};
use crate::table::{CodeTable, ReadEntry, UNRESOLVED};
use crate::SweepError;

/// Magic bytes opening a raw table file.
pub const RAW_MAGIC: [u8; 8] = *b"CODETAB\0";

/// On-disk layout of generated tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    /// Rust module with `const` arrays, compiled into the harness.
    #[default]
    Rust,
    /// bincode-serialised [`CodeTable`].
    Bincode,
    /// Fixed header followed by plain-old-data entry arrays.
    Raw,
}

impl TableFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Rust => "rs",
            TableFormat::Bincode => "bin",
            TableFormat::Raw => "raw",
        }
    }

    /// File name of the `family` table, e.g. `gamma_tables.rs`.
    pub fn file_name(self, family: CodeFamily) -> String {
        format!("{family}_tables.{}", self.extension())
    }
}

impl FromStr for TableFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rust" | "rs" => Ok(TableFormat::Rust),
            "bincode" | "bin" => Ok(TableFormat::Bincode),
            "raw" => Ok(TableFormat::Raw),
            other => Err(format!("unknown table format '{other}'")),
        }
    }
}

/// Destination of generated tables.
pub trait TableSink {
    /// Persist `table`, replacing any previous table of the same family.
    /// Returns where it was written.
    fn persist(&mut self, table: &CodeTable) -> Result<PathBuf, SweepError>;
}

/// Writes one file per family into a directory.
#[derive(Debug, Clone)]
pub struct DirSink {
    dir: PathBuf,
    format: TableFormat,
}

impl DirSink {
    pub fn new<P: Into<PathBuf>>(dir: P, format: TableFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    pub fn path_for(&self, family: CodeFamily) -> PathBuf {
        self.dir.join(self.format.file_name(family))
    }
}

impl TableSink for DirSink {
    fn persist(&mut self, table: &CodeTable) -> Result<PathBuf, SweepError> {
        let path = self.path_for(table.family);
        let bytes = render(table, self.format)?;
        write_durable(&path, &bytes).map_err(|source| SweepError::Persist {
            family: table.family,
            bits: table.bits,
            path: path.clone(),
            source,
        })?;
        log::debug!("wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

/// Encode a table in the given format.
pub fn render(table: &CodeTable, format: TableFormat) -> Result<Vec<u8>, SweepError> {
    Ok(match format {
        TableFormat::Rust => render_rust(table).into_bytes(),
        TableFormat::Bincode => bincode::serialize(table)?,
        TableFormat::Raw => render_raw(table),
    })
}

/// Rust source declaring the table as constants.
pub fn render_rust(table: &CodeTable) -> String {
    let mut out = String::new();
    match write_rust(&mut out, table) {
        Ok(()) => out,
        // a String sink never reports an error
        Err(fmt::Error) => String::new(),
    }
}

fn write_rust(out: &mut String, table: &CodeTable) -> fmt::Result {
    writeln!(
        out,
        "// Lookup tables for {} codes, generated for a {}-bit window.",
        table.family, table.bits
    )?;
    writeln!(out, "// Do not edit: regenerated on every sweep step.\n")?;
    writeln!(out, "/// How many bits are read at once.")?;
    writeln!(out, "pub const READ_BITS: usize = {};", table.bits)?;
    writeln!(out, "/// Largest symbol in the encoding tables.")?;
    writeln!(out, "pub const WRITE_MAX: u64 = {};", table.cap)?;
    writeln!(out, "/// Length marking a window without a complete codeword.")?;
    writeln!(out, "pub const UNRESOLVED: u8 = {UNRESOLVED};")?;
    for order in BitOrder::ALL {
        writeln!(out, "\n/// (symbol, length) of the codeword starting each {order} window.")?;
        writeln!(out, "pub const READ_{order}: &[(u64, u8)] = &[")?;
        for e in table.read_entries(order) {
            writeln!(out, "    ({}, {}),", e.symbol, e.len)?;
        }
        writeln!(out, "];")?;
    }
    for order in BitOrder::ALL {
        writeln!(
            out,
            "\n/// (codeword, length) of symbols {}..={}, {order}.",
            table.family.min_symbol(),
            table.cap
        )?;
        writeln!(out, "pub const WRITE_{order}: &[(u64, u8)] = &[")?;
        for cw in table.write_entries(order) {
            writeln!(out, "    ({:#x}, {}),", cw.bits, cw.len)?;
        }
        writeln!(out, "];")?;
    }
    Ok(())
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RawHeader {
    magic: [u8; 8],
    family: u8,
    bits: u8,
    _pad: [u8; 6],
    cap: u64,
    read_entries: u64,
    write_entries: u64,
}

fn family_code(family: CodeFamily) -> u8 {
    match family {
        CodeFamily::Unary => 0,
        CodeFamily::Gamma => 1,
        CodeFamily::Delta => 2,
    }
}

fn family_from_code(code: u8) -> Option<CodeFamily> {
    CodeFamily::ALL.into_iter().find(|f| family_code(*f) == code)
}

fn render_raw(table: &CodeTable) -> Vec<u8> {
    let header = RawHeader {
        magic: RAW_MAGIC,
        family: family_code(table.family),
        bits: table.bits,
        _pad: [0; 6],
        cap: table.cap,
        read_entries: table.read_m2l.len() as u64,
        write_entries: table.write_m2l.len() as u64,
    };
    let mut out = Vec::new();
    out.extend_from_slice(bytemuck::bytes_of(&header));
    for order in BitOrder::ALL {
        out.extend_from_slice(bytemuck::cast_slice(table.read_entries(order)));
    }
    for order in BitOrder::ALL {
        out.extend_from_slice(bytemuck::cast_slice(table.write_entries(order)));
    }
    out
}

/// Parse a table written in the raw format.
pub fn parse_raw(bytes: &[u8]) -> Result<CodeTable, SweepError> {
    let corrupt = |msg: &str| SweepError::Serialization(format!("raw table: {msg}"));
    let header_size = std::mem::size_of::<RawHeader>();
    if bytes.len() < header_size {
        return Err(corrupt("file shorter than header"));
    }
    let header: RawHeader = bytemuck::pod_read_unaligned(&bytes[..header_size]);
    if header.magic != RAW_MAGIC {
        return Err(corrupt("bad magic"));
    }
    let family = family_from_code(header.family).ok_or_else(|| corrupt("unknown family"))?;

    let read_size = std::mem::size_of::<ReadEntry>();
    let write_size = std::mem::size_of::<Codeword>();
    let reads = header.read_entries as usize;
    let writes = header.write_entries as usize;
    let expected = reads
        .checked_mul(2 * read_size)
        .and_then(|r| writes.checked_mul(2 * write_size).and_then(|w| r.checked_add(w)))
        .and_then(|body| body.checked_add(header_size))
        .ok_or_else(|| corrupt("entry counts overflow"))?;
    if bytes.len() != expected {
        return Err(corrupt("length does not match entry counts"));
    }

    let mut body = &bytes[header_size..];
    let mut take_reads = || -> Vec<ReadEntry> {
        let (head, rest) = body.split_at(reads * read_size);
        body = rest;
        head.chunks_exact(read_size)
            .map(bytemuck::pod_read_unaligned)
            .collect()
    };
    let read_m2l = take_reads();
    let read_l2m = take_reads();
    let write_m2l: Vec<Codeword> = body[..writes * write_size]
        .chunks_exact(write_size)
        .map(bytemuck::pod_read_unaligned)
        .collect();
    let write_l2m: Vec<Codeword> = body[writes * write_size..]
        .chunks_exact(write_size)
        .map(bytemuck::pod_read_unaligned)
        .collect();

    verified(CodeTable {
        family,
        bits: header.bits,
        cap: header.cap,
        read_m2l,
        read_l2m,
        write_m2l,
        write_l2m,
    })
}

/// Reject a decoded table whose width, cap or entries are inconsistent.
fn verified(table: CodeTable) -> Result<CodeTable, SweepError> {
    table
        .check()
        .map_err(|e| SweepError::Serialization(format!("corrupt {} table: {e}", table.family)))?;
    Ok(table)
}

/// Load a `bin` or `raw` table, choosing the decoder by extension.
pub fn load<P: AsRef<Path>>(path: P) -> Result<CodeTable, SweepError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("bin") => verified(bincode::deserialize(&bytes)?),
        Some("raw") => parse_raw(&bytes),
        _ => Err(SweepError::Configuration(format!(
            "cannot load '{}': expected a .bin or .raw table",
            path.display()
        ))),
    }
}

/// Replace `path` with `bytes` so that readers see either the old or the
/// complete new content.
pub fn write_durable(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn rust_module_layout() {
        let table = CodeTable::generate(CodeFamily::Unary, 2, 3).unwrap();
        let src = render_rust(&table);
        assert!(src.contains("pub const READ_BITS: usize = 2;"));
        assert!(src.contains("pub const WRITE_MAX: u64 = 3;"));
        assert!(src.contains("pub const READ_M2L: &[(u64, u8)] = &["));
        assert!(src.contains("pub const WRITE_L2M: &[(u64, u8)] = &["));
        // window 00 is unresolved, 01 decodes to 1
        assert!(src.contains("    (0, 255),\n    (1, 2),"));
    }

    #[test]
    fn raw_and_bincode_reload() {
        let dir = tempdir().unwrap();
        let table = CodeTable::generate(CodeFamily::Delta, 5, 40).unwrap();
        for format in [TableFormat::Raw, TableFormat::Bincode] {
            let mut sink = DirSink::new(dir.path(), format);
            let path = sink.persist(&table).unwrap();
            assert_eq!(path, dir.path().join(format.file_name(CodeFamily::Delta)));
            assert_eq!(load(&path).unwrap(), table);
        }
    }

    #[test]
    fn raw_rejects_truncation() {
        let table = CodeTable::generate(CodeFamily::Gamma, 3, 8).unwrap();
        let bytes = render_raw(&table);
        assert!(parse_raw(&bytes[..bytes.len() - 1]).is_err());
        let mut bad = bytes.clone();
        bad[0] = b'X';
        assert!(parse_raw(&bad).is_err());
    }

    #[test]
    fn raw_rejects_tampered_header() {
        let table = CodeTable::generate(CodeFamily::Gamma, 1, 8).unwrap();
        let bytes = render_raw(&table);
        // the width byte follows the magic and the family code
        for bits in [0u8, 6, 200] {
            let mut bad = bytes.clone();
            bad[9] = bits;
            assert!(matches!(parse_raw(&bad), Err(SweepError::Serialization(_))));
        }
        let mut bad = bytes.clone();
        bad[8] = family_code(CodeFamily::Unary);
        assert!(matches!(parse_raw(&bad), Err(SweepError::Serialization(_))));
    }

    #[test]
    fn raw_rejects_wrong_entries() {
        let table = CodeTable::generate(CodeFamily::Gamma, 3, 8).unwrap();
        let mut bad = table.clone();
        bad.read_m2l[0b010] = ReadEntry::decoded(3, 3);
        assert!(parse_raw(&render_raw(&bad)).is_err());
        let mut bad = table.clone();
        bad.write_l2m[1] = bad.write_m2l[1];
        bad.write_l2m[1].len += 1;
        assert!(parse_raw(&render_raw(&bad)).is_err());
        assert_eq!(parse_raw(&render_raw(&table)).unwrap(), table);
    }

    #[test]
    fn bincode_load_checks_the_table() {
        let dir = tempdir().unwrap();
        let mut table = CodeTable::generate(CodeFamily::Delta, 4, 16).unwrap();
        table.bits = 6;
        let path = dir.path().join(TableFormat::Bincode.file_name(CodeFamily::Delta));
        fs::write(&path, bincode::serialize(&table).unwrap()).unwrap();
        assert!(matches!(load(&path), Err(SweepError::Serialization(_))));
    }

    #[test]
    fn overwrite_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("t.rs");
        write_durable(&path, b"first").unwrap();
        write_durable(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }
}

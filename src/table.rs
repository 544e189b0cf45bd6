//! Lookahead decoding tables and encoding tables for one code family.
//!
//! A table of width `b` has `2^b` read entries per bit order. Each entry is
//! the symbol of the codeword starting at the window together with its
//! length, or [`UNRESOLVED`] when the window ends before the codeword does.
//! Readers seeing [`UNRESOLVED`] fall back to bit-by-bit decoding.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::codes::{BitOrder, BitSource, CodeFamily, Codeword, WindowBits};
use crate::config::{validate_bits, validate_cap};
use crate::SweepError;

/// Length stored in a read entry whose window holds no complete codeword.
pub const UNRESOLVED: u8 = u8::MAX;

/// One read-table slot as persisted.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ReadEntry {
    pub symbol: u64,
    pub len: u8,
    #[serde(skip)]
    _pad: [u8; 7],
}

impl ReadEntry {
    pub fn decoded(symbol: u64, len: u8) -> Self {
        Self {
            symbol,
            len,
            _pad: [0; 7],
        }
    }

    pub fn unresolved() -> Self {
        Self::decoded(0, UNRESOLVED)
    }

    pub fn resolution(&self) -> Resolution {
        if self.len == UNRESOLVED {
            Resolution::Unresolved
        } else {
            Resolution::Decoded {
                symbol: self.symbol,
                consumed: self.len,
            }
        }
    }
}

/// Outcome of looking a window up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Decoded { symbol: u64, consumed: u8 },
    /// The window ends inside a codeword.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeTable {
    pub family: CodeFamily,
    /// Width of the lookahead window.
    pub bits: u8,
    /// Largest symbol of the encoding tables.
    pub cap: u64,
    pub read_m2l: Vec<ReadEntry>,
    pub read_l2m: Vec<ReadEntry>,
    /// Codewords of `min_symbol..=cap`, M2L.
    pub write_m2l: Vec<Codeword>,
    /// Codewords of `min_symbol..=cap`, L2M.
    pub write_l2m: Vec<Codeword>,
}

impl CodeTable {
    /// Build the tables of `family` for a `bits`-wide window and encoding
    /// tables up to `cap`.
    pub fn generate(family: CodeFamily, bits: u8, cap: u64) -> Result<Self, SweepError> {
        validate_bits(bits)?;
        validate_cap(family, cap)?;

        let size = 1usize << bits;
        let read_m2l = build_read(family, bits, BitOrder::M2L, size);
        let read_l2m = build_read(family, bits, BitOrder::L2M, size);

        let mut write_m2l = Vec::new();
        for n in family.min_symbol()..=cap {
            let cw = family.encode(n).ok_or_else(|| SweepError::TableGeneration {
                family,
                bits,
                msg: format!("symbol {n} has no codeword"),
            })?;
            write_m2l.push(cw);
        }
        let write_l2m = write_m2l.iter().map(|cw| cw.reversed()).collect();

        let table = Self {
            family,
            bits,
            cap,
            read_m2l,
            read_l2m,
            write_m2l,
            write_l2m,
        };
        table.check()?;
        log::debug!(
            "generated {family} table: {bits} bits, {} resolved windows, {} codewords",
            table.resolved_count(BitOrder::M2L),
            table.write_m2l.len()
        );
        Ok(table)
    }

    /// Number of windows, `2^bits`.
    pub fn len(&self) -> usize {
        self.read_m2l.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_m2l.is_empty()
    }

    pub fn read_entries(&self, order: BitOrder) -> &[ReadEntry] {
        match order {
            BitOrder::M2L => &self.read_m2l,
            BitOrder::L2M => &self.read_l2m,
        }
    }

    pub fn write_entries(&self, order: BitOrder) -> &[Codeword] {
        match order {
            BitOrder::M2L => &self.write_m2l,
            BitOrder::L2M => &self.write_l2m,
        }
    }

    /// Resolve a window. Bits above the table width are ignored.
    pub fn lookup(&self, window: u64, order: BitOrder) -> Resolution {
        let mask = (1u64 << self.bits) - 1;
        self.read_entries(order)[(window & mask) as usize].resolution()
    }

    /// Codeword of `n` from the encoding table, if `n` is within the cap.
    pub fn codeword(&self, n: u64, order: BitOrder) -> Option<Codeword> {
        let idx = n.checked_sub(self.family.min_symbol())?;
        self.write_entries(order).get(usize::try_from(idx).ok()?).copied()
    }

    pub fn resolved_count(&self, order: BitOrder) -> usize {
        self.read_entries(order)
            .iter()
            .filter(|e| e.len != UNRESOLVED)
            .count()
    }

    /// Hex SHA-256 over the table's entries in a fixed byte layout.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update([self.family as u8, self.bits]);
        hasher.update(self.cap.to_le_bytes());
        for order in BitOrder::ALL {
            hasher.update(bytemuck::cast_slice::<ReadEntry, u8>(self.read_entries(order)));
            hasher.update(bytemuck::cast_slice::<Codeword, u8>(self.write_entries(order)));
        }
        hex::encode(hasher.finalize())
    }

    /// Re-encode every resolved entry and check it is a prefix of its
    /// window, and that encoding tables agree with the encoder. Also run on
    /// tables read back from disk, so the width and cap are checked first.
    pub(crate) fn check(&self) -> Result<(), SweepError> {
        validate_bits(self.bits)?;
        validate_cap(self.family, self.cap)?;
        let fail = |msg: String| SweepError::TableGeneration {
            family: self.family,
            bits: self.bits,
            msg,
        };
        if self.read_m2l.len() != 1usize << self.bits || self.read_l2m.len() != self.read_m2l.len() {
            return Err(fail(format!("read table has {} entries", self.read_m2l.len())));
        }
        for order in BitOrder::ALL {
            for (window, entry) in self.read_entries(order).iter().enumerate() {
                let Resolution::Decoded { symbol, consumed } = entry.resolution() else {
                    continue;
                };
                let cw = self
                    .family
                    .encode(symbol)
                    .map(|cw| cw.in_order(order))
                    .ok_or_else(|| fail(format!("decoded symbol {symbol} is not encodable")))?;
                if cw.len != consumed || consumed > self.bits {
                    return Err(fail(format!(
                        "window {window:#b} ({order}) consumes {consumed} bits, codeword has {}",
                        cw.len
                    )));
                }
                if window_prefix(window as u64, self.bits, consumed, order) != cw.bits {
                    return Err(fail(format!(
                        "window {window:#b} ({order}) does not start with the codeword of {symbol}"
                    )));
                }
            }
        }
        let expected = (self.cap - self.family.min_symbol() + 1) as usize;
        if self.write_m2l.len() != expected || self.write_l2m.len() != expected {
            return Err(fail(format!(
                "encoding table has {} codewords, expected {expected}",
                self.write_m2l.len()
            )));
        }
        let symbols = self.family.min_symbol()..=self.cap;
        for ((n, m2l), l2m) in symbols.zip(&self.write_m2l).zip(&self.write_l2m) {
            let ok = self
                .family
                .encode(n)
                .is_some_and(|cw| cw == *m2l && cw.reversed() == *l2m);
            if !ok {
                return Err(fail(format!("encoding table entry for {n} is wrong")));
            }
        }
        Ok(())
    }
}

fn build_read(family: CodeFamily, bits: u8, order: BitOrder, size: usize) -> Vec<ReadEntry> {
    (0..size as u64)
        .map(|window| {
            let mut src = WindowBits::new(window, bits, order);
            match family.decode(&mut src) {
                Some(symbol) => ReadEntry::decoded(symbol, src.consumed() as u8),
                None => ReadEntry::unresolved(),
            }
        })
        .collect()
}

/// The first `len` stream bits of a window, as a codeword in `order`.
fn window_prefix(window: u64, bits: u8, len: u8, order: BitOrder) -> u64 {
    let mask = (1u64 << len) - 1;
    match order {
        BitOrder::M2L => (window >> (bits - len)) & mask,
        BitOrder::L2M => window & mask,
    }
}

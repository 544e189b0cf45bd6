//! Canonical unary, Elias γ and Elias δ codes.
//!
//! Bits are listed in stream order, i.e. the first bit a reader consumes
//! comes first:
//!
//! | Symbol |  unary |    γ    |    δ     |
//! |--------|-------:|--------:|---------:|
//! | 0      |      1 |         |          |
//! | 1      |     01 |       1 |        1 |
//! | 2      |    001 |     010 |     0100 |
//! | 3      |   0001 |     011 |     0101 |
//! | 4      |  00001 |   00100 |    01100 |
//! | 5      | 000001 |   00101 |    01101 |
//!
//! A [`Codeword`] stores those bits as an integer. In [`BitOrder::M2L`] the
//! first stream bit is the most significant of the `len` bits; in
//! [`BitOrder::L2M`] it is bit 0.

use std::fmt;
use std::str::FromStr;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Prefix-code family a table is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeFamily {
    Unary,
    Gamma,
    Delta,
}

impl CodeFamily {
    /// All families, in sweep order.
    pub const ALL: [CodeFamily; 3] = [CodeFamily::Unary, CodeFamily::Gamma, CodeFamily::Delta];

    pub fn name(self) -> &'static str {
        match self {
            CodeFamily::Unary => "unary",
            CodeFamily::Gamma => "gamma",
            CodeFamily::Delta => "delta",
        }
    }

    /// Smallest encodable symbol.
    pub fn min_symbol(self) -> u64 {
        match self {
            CodeFamily::Unary => 0,
            CodeFamily::Gamma | CodeFamily::Delta => 1,
        }
    }

    /// Length in bits of the codeword for `n`, or `None` if `n` is below
    /// [`min_symbol`](Self::min_symbol). May exceed 64.
    pub fn codeword_len(self, n: u64) -> Option<u32> {
        if n < self.min_symbol() {
            return None;
        }
        Some(match self {
            CodeFamily::Unary => u32::try_from(n).ok()?.checked_add(1)?,
            CodeFamily::Gamma => 2 * floor_log2(n) + 1,
            CodeFamily::Delta => {
                let l = floor_log2(n);
                CodeFamily::Gamma.codeword_len(l as u64 + 1)? + l
            }
        })
    }

    /// Encode `n` in M2L order. `None` if `n` is not a symbol of this family
    /// or its codeword does not fit in 64 bits.
    pub fn encode(self, n: u64) -> Option<Codeword> {
        let len = self.codeword_len(n)?;
        if len > 64 {
            return None;
        }
        let bits = match self {
            CodeFamily::Unary => 1,
            // L zeros followed by n itself, which has L + 1 significant bits
            CodeFamily::Gamma => n,
            CodeFamily::Delta => {
                let l = floor_log2(n);
                let prefix = CodeFamily::Gamma.encode(l as u64 + 1)?;
                (prefix.bits << l) | (n & low_mask(l))
            }
        };
        Some(Codeword::new(bits, len as u8))
    }

    /// Decode one codeword from `src`. Returns `None` when the source runs
    /// dry before the codeword is complete.
    pub fn decode<S: BitSource>(self, src: &mut S) -> Option<u64> {
        match self {
            CodeFamily::Unary => read_zero_run(src).map(u64::from),
            CodeFamily::Gamma => {
                let l = read_zero_run(src)?;
                let rest = read_bits(src, l)?;
                Some((1u64 << l) | rest)
            }
            CodeFamily::Delta => {
                let g = CodeFamily::Gamma.decode(src)?;
                let l = u32::try_from(g - 1).ok().filter(|l| *l < 64)?;
                let rest = read_bits(src, l)?;
                Some((1u64 << l) | rest)
            }
        }
    }
}

impl fmt::Display for CodeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CodeFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unary" => Ok(CodeFamily::Unary),
            "gamma" => Ok(CodeFamily::Gamma),
            "delta" => Ok(CodeFamily::Delta),
            other => Err(format!("unknown code family '{other}'")),
        }
    }
}

/// Order in which a reader pulls bits out of a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BitOrder {
    /// Least-to-most significant: the first bit read is bit 0.
    L2M,
    /// Most-to-least significant: the first bit read is the top bit.
    M2L,
}

impl BitOrder {
    pub const ALL: [BitOrder; 2] = [BitOrder::M2L, BitOrder::L2M];
}

impl fmt::Display for BitOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BitOrder::L2M => "L2M",
            BitOrder::M2L => "M2L",
        })
    }
}

impl FromStr for BitOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "L2M" | "LE" => Ok(BitOrder::L2M),
            "M2L" | "BE" => Ok(BitOrder::M2L),
            other => Err(format!("unknown bit order '{other}'")),
        }
    }
}

/// A codeword of at most 64 bits.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
pub struct Codeword {
    pub bits: u64,
    pub len: u8,
    #[serde(skip)]
    _pad: [u8; 7],
}

impl Codeword {
    pub fn new(bits: u64, len: u8) -> Self {
        Self {
            bits,
            len,
            _pad: [0; 7],
        }
    }

    /// Same codeword with its bits mirrored, turning an M2L codeword into
    /// the L2M one and back.
    pub fn reversed(self) -> Self {
        if self.len == 0 {
            return self;
        }
        Self::new(self.bits.reverse_bits() >> (64 - self.len as u32), self.len)
    }

    /// Codeword in the requested order, assuming `self` is M2L.
    pub fn in_order(self, order: BitOrder) -> Self {
        match order {
            BitOrder::M2L => self,
            BitOrder::L2M => self.reversed(),
        }
    }
}

/// Source of single bits in stream order.
pub trait BitSource {
    fn read_bit(&mut self) -> Option<bool>;
    /// Bits consumed so far.
    fn consumed(&self) -> u32;
}

/// The bits of a fixed-width lookahead window.
#[derive(Debug, Clone)]
pub struct WindowBits {
    window: u64,
    width: u32,
    order: BitOrder,
    pos: u32,
}

impl WindowBits {
    pub fn new(window: u64, width: u8, order: BitOrder) -> Self {
        Self {
            window,
            width: width as u32,
            order,
            pos: 0,
        }
    }
}

impl BitSource for WindowBits {
    fn read_bit(&mut self) -> Option<bool> {
        if self.pos >= self.width {
            return None;
        }
        let shift = match self.order {
            BitOrder::M2L => self.width - 1 - self.pos,
            BitOrder::L2M => self.pos,
        };
        self.pos += 1;
        Some((self.window >> shift) & 1 == 1)
    }

    fn consumed(&self) -> u32 {
        self.pos
    }
}

fn floor_log2(n: u64) -> u32 {
    63 - n.leading_zeros()
}

fn low_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

fn read_zero_run<S: BitSource>(src: &mut S) -> Option<u32> {
    let mut zeros = 0u32;
    while !src.read_bit()? {
        zeros += 1;
    }
    Some(zeros)
}

fn read_bits<S: BitSource>(src: &mut S, count: u32) -> Option<u64> {
    if count >= 64 {
        return None;
    }
    let mut value = 0u64;
    for _ in 0..count {
        value = (value << 1) | src.read_bit()? as u64;
    }
    Some(value)
}

//! Probabilistic vocabulary membership filter.
//!
//! Sized from an expected item count and target false-positive rate via
//! the standard optimal formulas, hashed with DJB2/SDBM double hashing.
//! Zero false negatives by construction; false positives bounded by the
//! configured rate.

use crate::types::{EngineError, EngineResult};

/// Serialized header: size, hash count, item count, byte length (u32 LE each).
const HEADER_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct BloomFilter {
    bits: Vec<u8>,
    size_bits: u32,
    hash_functions: u32,
    item_count: u32,
}

impl BloomFilter {
    /// Size the filter for `expected_items` entries at the target
    /// false-positive rate: `m = ceil(-n·ln(p)/ln(2)²)`, `k = ceil((m/n)·ln2)`.
    pub fn with_capacity(expected_items: usize, false_positive_rate: f64) -> Self {
        let n = expected_items.max(1) as f64;
        let p = false_positive_rate.clamp(1e-9, 0.5);
        let ln2 = std::f64::consts::LN_2;

        let size_bits = ((-n * p.ln()) / (ln2 * ln2)).ceil().max(8.0) as u32;
        let hash_functions = ((size_bits as f64 / n) * ln2).ceil().max(1.0) as u32;

        Self {
            bits: vec![0u8; Self::byte_len_for(size_bits)],
            size_bits,
            hash_functions,
            item_count: 0,
        }
    }

    fn byte_len_for(size_bits: u32) -> usize {
        (size_bits as usize + 7) / 8
    }

    // ─── Hashing ───────────────────────────────────────────────────────

    /// DJB2-style accumulator.
    fn hash_djb2(value: &str) -> u32 {
        let mut hash: u32 = 5381;
        for byte in value.bytes() {
            hash = hash.wrapping_mul(33).wrapping_add(u32::from(byte));
        }
        hash
    }

    /// SDBM-style accumulator.
    fn hash_sdbm(value: &str) -> u32 {
        let mut hash: u32 = 0;
        for byte in value.bytes() {
            hash = u32::from(byte)
                .wrapping_add(hash << 6)
                .wrapping_add(hash << 16)
                .wrapping_sub(hash);
        }
        hash
    }

    /// `i`-th double-hashed bit index: `(h1 + i·h2) mod m`.
    fn bit_index(h1: u32, h2: u32, i: u32, size_bits: u32) -> u32 {
        h1.wrapping_add(i.wrapping_mul(h2)) % size_bits
    }

    fn set_bit(&mut self, index: u32) {
        let byte = (index / 8) as usize;
        self.bits[byte] |= 1u8 << (index % 8);
    }

    fn get_bit(&self, index: u32) -> bool {
        let byte = (index / 8) as usize;
        self.bits[byte] & (1u8 << (index % 8)) != 0
    }

    // ─── Membership ────────────────────────────────────────────────────

    pub fn insert(&mut self, value: &str) {
        let h1 = Self::hash_djb2(value);
        let h2 = Self::hash_sdbm(value);
        for i in 0..self.hash_functions {
            let index = Self::bit_index(h1, h2, i, self.size_bits);
            self.set_bit(index);
        }
        self.item_count = self.item_count.saturating_add(1);
    }

    /// Returns false the instant any required bit is unset, so a false
    /// answer is always definitive.
    pub fn might_contain(&self, value: &str) -> bool {
        let h1 = Self::hash_djb2(value);
        let h2 = Self::hash_sdbm(value);
        for i in 0..self.hash_functions {
            let index = Self::bit_index(h1, h2, i, self.size_bits);
            if !self.get_bit(index) {
                return false;
            }
        }
        true
    }

    pub fn item_count(&self) -> u32 {
        self.item_count
    }

    pub fn size_bits(&self) -> u32 {
        self.size_bits
    }

    pub fn hash_functions(&self) -> u32 {
        self.hash_functions
    }

    // ─── Serialization ─────────────────────────────────────────────────

    /// Fixed 16-byte header followed by the packed bit array.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.bits.len());
        out.extend_from_slice(&self.size_bits.to_le_bytes());
        out.extend_from_slice(&self.hash_functions.to_le_bytes());
        out.extend_from_slice(&self.item_count.to_le_bytes());
        out.extend_from_slice(&(self.bits.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.bits);
        out
    }

    /// Rejects truncated or internally inconsistent buffers rather than
    /// ever yielding a silently-empty filter.
    pub fn from_bytes(bytes: &[u8]) -> EngineResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(EngineError::CorruptArtifact(format!(
                "bloom header needs {HEADER_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let size_bits = read_u32_le(bytes, 0);
        let hash_functions = read_u32_le(bytes, 4);
        let item_count = read_u32_le(bytes, 8);
        let byte_len = read_u32_le(bytes, 12) as usize;

        if size_bits == 0 || hash_functions == 0 {
            return Err(EngineError::CorruptArtifact(
                "bloom header has zero size or hash count".to_string(),
            ));
        }

        let body = &bytes[HEADER_LEN..];
        if body.len() != byte_len {
            return Err(EngineError::CorruptArtifact(format!(
                "bloom bit array is {} bytes, header says {byte_len}",
                body.len()
            )));
        }
        if byte_len != Self::byte_len_for(size_bits) {
            return Err(EngineError::CorruptArtifact(format!(
                "bloom bit array length {byte_len} does not cover {size_bits} bits"
            )));
        }

        Ok(Self {
            bits: body.to_vec(),
            size_bits,
            hash_functions,
            item_count,
        })
    }
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

#[cfg(test)]
#[path = "tests/bloom_tests.rs"]
mod tests;

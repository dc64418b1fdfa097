//! A streaming IEEE CRC-32 (the `zlib`/`cksum` polynomial, reflected),
//! exposed as an explicit three-call `begin`/`update`/`finalize` API
//! rather than a single one-shot function.
//!
//! Matching and signature generation both need to accumulate a CRC
//! across several discontiguous byte ranges — an object's `.text` with
//! individual relocated words masked out, one word at a time — so the
//! streaming shape is the natural fit; a single-buffer `crc32(&[u8])`
//! helper is built on top of it for convenience.

const POLY: u32 = 0xEDB8_8320;

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut n = 0u32;
    while (n as usize) < 256 {
        let mut c = n;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { POLY ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[n as usize] = c;
        n += 1;
    }
    table
}

/// The reflected CRC-32 lookup table, built once at compile time.
const TABLE: [u32; 256] = build_table();

/// A CRC-32 accumulator. Use [`Crc32::begin`] to start one, feed it
/// bytes with [`Crc32::update`], and read out the final value with
/// [`Crc32::finalize`].
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    /// Starts a new CRC computation.
    pub fn begin() -> Crc32 {
        Crc32 { state: 0xFFFF_FFFF }
    }

    /// Folds `bytes` into the running CRC. May be called any number of
    /// times before [`Crc32::finalize`].
    pub fn update(&mut self, bytes: &[u8]) {
        let mut crc = self.state;
        for &byte in bytes {
            let index = ((crc ^ byte as u32) & 0xFF) as usize;
            crc = TABLE[index] ^ (crc >> 8);
        }
        self.state = crc;
    }

    /// Finishes the computation and returns the CRC-32 value.
    ///
    /// Consumes `self`: a finalized CRC is a dead end, not a
    /// checkpoint to keep updating from.
    pub fn finalize(self) -> u32 {
        self.state ^ 0xFFFF_FFFF
    }
}

/// Computes the CRC-32 of a single contiguous buffer.
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = Crc32::begin();
    crc.update(bytes);
    crc.finalize()
}

//! A byte-offset indexed, NUL-delimited string table — `.strtab` and
//! `.shstrtab`. Borrows directly from the section's backing bytes; no
//! unsafe aliasing, no copying.

use core::str;

use crate::error::{Error, Result};

/// A string table borrowed from an ELF section's raw bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Strtab<'a> {
    bytes: &'a [u8],
}

impl<'a> Strtab<'a> {
    /// Wraps `bytes` (the full contents of a `.strtab`/`.shstrtab`
    /// section) as a string table.
    pub fn new(bytes: &'a [u8]) -> Strtab<'a> {
        Strtab { bytes }
    }

    /// Resolves the NUL-terminated string starting at byte offset
    /// `idx`. Bounds- and UTF-8-checked; a bad offset is a
    /// [`Error::TruncatedElf`], never a panic.
    pub fn get(&self, idx: usize) -> Result<&'a str> {
        let bytes = self.bytes;
        if idx > bytes.len() {
            return Err(Error::TruncatedElf(format!(
                "string table offset {idx} is out of bounds (table is {} bytes)",
                bytes.len()
            )));
        }
        let end = bytes[idx..]
            .iter()
            .position(|&b| b == 0)
            .map(|rel| idx + rel)
            .unwrap_or(bytes.len());
        str::from_utf8(&bytes[idx..end])
            .map_err(|_| Error::TruncatedElf(format!("string at offset {idx} is not valid utf-8")))
    }
}

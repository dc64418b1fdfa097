//! Parses `sig_v1` text into a queryable [`SignatureFile`] and performs
//! the relocation-aware two-CRC match test.

use std::ops::Range;

use crate::crc32::Crc32;
use crate::error::{Error, Result};
use crate::strip::strip_opcode;

use super::directive_to_reloc_type;

/// One symbol's worth of relocations: a type and the list of
/// 4-byte-aligned offsets (within the symbol's bytes) it applies to.
#[derive(Debug, Clone)]
struct RelocationLine {
    rel_type: u8,
    symbol_name: Range<usize>,
    offsets: Vec<u32>,
}

#[derive(Debug, Clone)]
struct SymbolEntry {
    name: Range<usize>,
    size: u32,
    crc_a: u32,
    crc_b: u32,
    relocations: Vec<RelocationLine>,
    /// Flattened `(offset, type)` pairs across every relocation line,
    /// sorted ascending by offset — what [`SignatureFile::test`] needs.
    offset_types: Vec<(u32, u8)>,
}

/// A parsed `sig_v1` signature file.
#[derive(Debug, Clone)]
pub struct SignatureFile {
    text: String,
    symbols: Vec<SymbolEntry>,
}

/// A read-only view of one signature file entry, with names resolved.
#[derive(Debug, Clone, Copy)]
pub struct SymbolView<'a> {
    pub name: &'a str,
    pub size: u32,
    pub crc_a: u32,
    pub crc_b: u32,
}

impl SignatureFile {
    /// Parses `text` as a `sig_v1` document.
    pub fn parse(text: &str) -> Result<SignatureFile> {
        let owned = text.to_string();
        let mut symbols = Vec::new();

        for raw_line in owned.split('\n') {
            let line = match raw_line.find('#') {
                Some(idx) => &raw_line[..idx],
                None => raw_line,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let is_relocation_line = line.starts_with('.');
            let mut tokens = line.split_whitespace();

            if is_relocation_line {
                let directive = tokens.next().unwrap();
                let rel_type = directive_to_reloc_type(directive).ok_or_else(|| {
                    Error::BadSignatureFile(format!("unknown relocation directive {directive:?}"))
                })?;
                let symbol_name_token = tokens.next().ok_or_else(|| {
                    Error::BadSignatureFile("relocation line missing symbol name".into())
                })?;
                let symbol_name = find_range(&owned, symbol_name_token);
                let mut offsets = Vec::new();
                for tok in tokens {
                    offsets.push(parse_number(tok)?);
                }
                let current = symbols.last_mut().ok_or_else(|| {
                    Error::BadSignatureFile("relocation line before any symbol header".into())
                })?;
                let current: &mut SymbolEntry = current;
                for &off in &offsets {
                    current.offset_types.push((off, rel_type));
                }
                current.relocations.push(RelocationLine { rel_type, symbol_name, offsets });
            } else {
                let name_token = tokens.next().ok_or_else(|| {
                    Error::BadSignatureFile("symbol header missing name".into())
                })?;
                let size_token = tokens.next().ok_or_else(|| {
                    Error::BadSignatureFile(format!("symbol {name_token:?} missing size"))
                })?;
                let crc_a_token = tokens.next().ok_or_else(|| {
                    Error::BadSignatureFile(format!("symbol {name_token:?} missing crcA"))
                })?;
                let crc_b_token = tokens.next().ok_or_else(|| {
                    Error::BadSignatureFile(format!("symbol {name_token:?} missing crcB"))
                })?;

                symbols.push(SymbolEntry {
                    name: find_range(&owned, name_token),
                    size: parse_number(size_token)?,
                    crc_a: parse_number(crc_a_token)?,
                    crc_b: parse_number(crc_b_token)?,
                    relocations: Vec::new(),
                    offset_types: Vec::new(),
                });
            }
        }

        for symbol in &mut symbols {
            symbol.offset_types.sort_by_key(|&(off, _)| off);
        }

        Ok(SignatureFile { text: owned, symbols })
    }

    /// Decompresses `bytes` (zlib/deflate) before parsing as `sig_v1`
    /// text — the on-disk form of a shipped signature bundle.
    #[cfg(feature = "compressed-signatures")]
    pub fn load_compressed(bytes: &[u8]) -> Result<SignatureFile> {
        use std::io::Read;
        let mut decoder = flate2::read::ZlibDecoder::new(bytes);
        let mut text = String::new();
        decoder
            .read_to_string(&mut text)
            .map_err(Error::IoFailure)?;
        SignatureFile::parse(&text)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbol(&self, index: usize) -> Option<SymbolView<'_>> {
        let entry = self.symbols.get(index)?;
        Some(SymbolView {
            name: &self.text[entry.name.clone()],
            size: entry.size,
            crc_a: entry.crc_a,
            crc_b: entry.crc_b,
        })
    }

    pub fn symbols(&self) -> impl Iterator<Item = SymbolView<'_>> {
        (0..self.symbols.len()).map(move |i| self.symbol(i).expect("index in range"))
    }

    /// Tests `window` (the candidate bytes at some offset in the target
    /// binary) against the symbol at `index`, per the two-CRC contract
    /// of the `sig_v1` format.
    pub fn test(&self, index: usize, window: &[u8]) -> bool {
        let symbol = match self.symbols.get(index) {
            Some(symbol) => symbol,
            None => return false,
        };
        if window.len() < symbol.size as usize {
            return false;
        }
        let l = core::cmp::min(symbol.size as usize, 8);

        let crc_a = crc_with_stripping(&window[..l], &symbol.offset_types);
        if crc_a != symbol.crc_a {
            return false;
        }
        let crc_b = crc_with_stripping(&window[..symbol.size as usize], &symbol.offset_types);
        crc_b == symbol.crc_b
    }
}

/// Feeds `data` into a CRC, replacing each 4-byte slot named in
/// `relocations` (sorted ascending by offset) with its stripped form.
fn crc_with_stripping(data: &[u8], relocations: &[(u32, u8)]) -> u32 {
    let mut crc = Crc32::begin();
    let mut i = 0usize;
    let mut r = 0usize;
    while i < data.len() {
        if i + 4 <= data.len() {
            if let Some(&(offset, rel_type)) = relocations.get(r) {
                if offset as usize == i {
                    let word = [data[i], data[i + 1], data[i + 2], data[i + 3]];
                    crc.update(&strip_opcode(word, rel_type));
                    r += 1;
                    i += 4;
                    continue;
                }
            }
        }
        let end = core::cmp::min(i + 4, data.len());
        crc.update(&data[i..end]);
        i = end;
    }
    crc.finalize()
}

fn find_range(haystack: &str, needle: &str) -> Range<usize> {
    let start = needle.as_ptr() as usize - haystack.as_ptr() as usize;
    start..start + needle.len()
}

fn parse_number(token: &str) -> Result<u32> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16)
            .map_err(|_| Error::BadSignatureFile(format!("bad hex number {token:?}")));
    }
    if token.len() > 1 && token.starts_with('0') && token.chars().all(|c| c.is_digit(8)) {
        return u32::from_str_radix(&token[1..], 8)
            .map_err(|_| Error::BadSignatureFile(format!("bad octal number {token:?}")));
    }
    token
        .parse::<u32>()
        .map_err(|_| Error::BadSignatureFile(format!("bad number {token:?}")))
}

//! Finds where an object's `.text` lives inside a target binary,
//! tolerating the bytes a linker would have patched via relocation.

use crate::elf::{ElfRelocation, ElfView};
use crate::error::Result;
use crate::strip::{is_known_relocation, strip_opcode};

/// The outcome of matching one object's `.text` against a target
/// binary: either a full match, the best partial match found (if any
/// reached the minimum length), or no match at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Full { address: u32, matched_bytes: usize },
    Partial { address: u32, matched_bytes: usize },
    NoMatch,
}

impl MatchOutcome {
    pub fn address(&self) -> Option<u32> {
        match self {
            MatchOutcome::Full { address, .. } | MatchOutcome::Partial { address, .. } => Some(*address),
            MatchOutcome::NoMatch => None,
        }
    }

    pub fn matched_bytes(&self) -> usize {
        match self {
            MatchOutcome::Full { matched_bytes, .. } | MatchOutcome::Partial { matched_bytes, .. } => {
                *matched_bytes
            }
            MatchOutcome::NoMatch => 0,
        }
    }

    pub fn is_match(&self) -> bool {
        !matches!(self, MatchOutcome::NoMatch)
    }
}

/// A partial match must cover at least this many bytes to be worth
/// reporting — short partial matches are noise, not evidence.
const MIN_PARTIAL_MATCH_BYTES: usize = 32;

/// Finds the lowest 4-byte-aligned offset in `binary` where `elf`'s
/// `.text` matches, under relocation-aware masking. Exhaustive over
/// every aligned offset; stops at the first full match, but keeps
/// scanning for a better partial match otherwise.
pub fn find_best_match(elf: &ElfView<'_>, binary: &[u8]) -> Result<MatchOutcome> {
    let text = match elf.text()? {
        Some(text) if !text.is_empty() => text,
        _ => return Ok(MatchOutcome::NoMatch),
    };
    if binary.len() < text.len() {
        return Ok(MatchOutcome::NoMatch);
    }
    let relocations = elf.text_relocations()?;

    let mut best: Option<(u32, usize)> = None;
    let last_offset = binary.len() - text.len();
    let mut address = 0usize;
    while address <= last_offset {
        let window = &binary[address..address + text.len()];
        match compare_at(text, window, &relocations) {
            MatchAtOffset::Full => {
                return Ok(MatchOutcome::Full {
                    address: address as u32,
                    matched_bytes: text.len(),
                });
            }
            MatchAtOffset::Partial(matched) => {
                if best.map(|(_, m)| matched > m).unwrap_or(true) {
                    best = Some((address as u32, matched));
                }
            }
        }
        address += 4;
    }

    Ok(match best {
        Some((address, matched)) if matched >= MIN_PARTIAL_MATCH_BYTES => {
            MatchOutcome::Partial { address, matched_bytes: matched }
        }
        _ => MatchOutcome::NoMatch,
    })
}

enum MatchAtOffset {
    Full,
    /// Number of leading bytes that matched before the first mismatch.
    Partial(usize),
}

/// Runs the word-by-word comparison of §4.5 at a single candidate
/// offset. `relocations` must already be sorted ascending by offset.
fn compare_at(text: &[u8], window: &[u8], relocations: &[ElfRelocation]) -> MatchAtOffset {
    if relocations.is_empty() {
        return if text == window {
            MatchAtOffset::Full
        } else {
            let matched = text.iter().zip(window).take_while(|(a, b)| a == b).count();
            MatchAtOffset::Partial(matched)
        };
    }

    let mut r = 0usize;
    let mut i = 0usize;
    while i < text.len() {
        let at_relocation = relocations.get(r).map(|rel| rel.offset as usize == i).unwrap_or(false);
        if at_relocation {
            let reloc = relocations[r];
            if !is_known_relocation(reloc.kind) {
                #[cfg(feature = "log")]
                log::trace!(
                    "unrecognized relocation type {} at offset {i:#x}, falling back to verbatim compare",
                    reloc.kind
                );
            }
            let b = [window[i], window[i + 1], window[i + 2], window[i + 3]];
            if b == [0, 0, 0, 0] {
                return MatchAtOffset::Partial(i);
            }
            let t = [text[i], text[i + 1], text[i + 2], text[i + 3]];
            let matches = if is_known_relocation(reloc.kind) {
                let t_stripped = strip_opcode(t, reloc.kind);
                let b_stripped = strip_opcode(b, reloc.kind);
                (t_stripped[0] & 0xFC) == (b_stripped[0] & 0xFC)
            } else {
                t == b
            };
            if !matches {
                return MatchAtOffset::Partial(i);
            }
            r += 1;
        } else if text[i..i + 4] != window[i..i + 4] {
            return MatchAtOffset::Partial(i);
        }
        i += 4;
    }
    MatchAtOffset::Full
}

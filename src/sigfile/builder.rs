//! Builds a `sig_v1` document from one or more ELF objects: computes
//! each function symbol's two CRCs and recovers stable pseudo-names for
//! the local (static) symbols its relocations point at.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::crc32::Crc32;
use crate::elf::reloc::{R_MIPS_26, R_MIPS_HI16, R_MIPS_LO16};
use crate::elf::sym::{STB_LOCAL, STT_FUNC};
use crate::elf::{ElfRelocation, ElfSymbol, ElfView};
use crate::error::Result;
use crate::strip::strip_opcode;

use super::reloc_type_to_directive;

#[derive(Debug, Clone)]
struct BuiltRelocation {
    rel_type: u8,
    symbol_name: String,
    offsets: Vec<u32>,
}

#[derive(Debug, Clone)]
struct BuiltSymbol {
    name: String,
    size: u32,
    crc_a: u32,
    crc_b: u32,
    relocations: Vec<BuiltRelocation>,
}

/// Accumulates symbols from one or more objects into a `sig_v1`
/// document, deduplicating by `crcB`.
#[derive(Debug, Default)]
pub struct SignatureBuilder {
    by_crc_b: BTreeMap<u32, BuiltSymbol>,
}

impl SignatureBuilder {
    pub fn new() -> SignatureBuilder {
        SignatureBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.by_crc_b.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_crc_b.is_empty()
    }

    /// Processes every `STT_FUNC` symbol of size > 0 whose section is
    /// `.text`, folding its result into this builder. A symbol with no
    /// `.text` section in `elf` at all (including one with a
    /// `section_index` pointing elsewhere, e.g. an undefined external
    /// or a symbol in another code section) contributes nothing.
    pub fn process_object(&mut self, elf: &ElfView<'_>, object_name: &str) -> Result<()> {
        let text = match elf.text()? {
            Some(text) => text,
            None => return Ok(()),
        };
        let text_index = match elf.section_index_by_name(".text") {
            Some(index) => index,
            None => return Ok(()),
        };
        let symbols = elf.symbols()?;
        let relocations = elf.text_relocations()?;

        for symbol in &symbols {
            if symbol.kind() != STT_FUNC || symbol.size == 0 || symbol.section_index as usize != text_index {
                continue;
            }
            let value = symbol.value as usize;
            let size = symbol.size as usize;
            if value.checked_add(size).map(|end| end > text.len()).unwrap_or(true) {
                #[cfg(feature = "log")]
                log::warn!("symbol {} extends past .text, skipping", symbol.name);
                continue;
            }

            let in_range: Vec<&ElfRelocation> = relocations
                .iter()
                .filter(|r| (r.offset as usize) >= value && (r.offset as usize) < value + size)
                .collect();
            let offset_types: Vec<(u32, u8)> =
                in_range.iter().map(|r| (r.offset - value as u32, r.kind)).collect();

            let l = core::cmp::min(size, 8);
            let crc_a = crc_region(&text[value..value + l], &offset_types);
            let crc_b = crc_region(&text[value..value + size], &offset_types);

            let relocation_lines = resolve_relocations(elf, &symbols, text, value, &in_range, object_name);

            let built = BuiltSymbol {
                name: symbol.name.to_string(),
                size: symbol.size,
                crc_a,
                crc_b,
                relocations: relocation_lines,
            };

            match self.by_crc_b.entry(crc_b) {
                std::collections::btree_map::Entry::Occupied(existing) => {
                    if existing.get().name != built.name {
                        #[cfg(feature = "log")]
                        log::warn!(
                            "crcB collision between {:?} and {:?}, keeping the first",
                            existing.get().name,
                            built.name
                        );
                    }
                }
                std::collections::btree_map::Entry::Vacant(slot) => {
                    slot.insert(built);
                }
            }
        }
        Ok(())
    }

    /// Emits the `sig_v1` text for everything accumulated so far,
    /// sorted by case-insensitive name with leading underscores
    /// skipped.
    pub fn write(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "# sig_v1")?;
        let mut entries: Vec<&BuiltSymbol> = self.by_crc_b.values().collect();
        entries.sort_by(|a, b| sort_key(&a.name).cmp(&sort_key(&b.name)));

        for symbol in entries {
            writeln!(out, "{} {} {:#010x} {:#010x}", symbol.name, symbol.size, symbol.crc_a, symbol.crc_b)?;
            for relocation in &symbol.relocations {
                let offsets: Vec<String> = relocation.offsets.iter().map(|o| format!("{o:#x}")).collect();
                writeln!(
                    out,
                    " {} {} {}",
                    reloc_type_to_directive(relocation.rel_type),
                    relocation.symbol_name,
                    offsets.join(" ")
                )?;
            }
        }
        Ok(())
    }
}

/// Case-insensitive sort key that skips leading underscores, matching
/// the original generator's comparator.
fn sort_key(name: &str) -> String {
    name.trim_start_matches('_').to_lowercase()
}

fn crc_region(data: &[u8], relocations: &[(u32, u8)]) -> u32 {
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

/// Resolves each in-range relocation to the name that should appear in
/// its `sig_v1` relocation line, grouping by `(type, name)` into one
/// offset list apiece. `R_MIPS_HI16`/`R_MIPS_LO16` pairs are walked
/// together since a `LO16`'s pseudo-name addend comes from its
/// preceding `HI16`.
fn resolve_relocations(
    elf: &ElfView<'_>,
    symbols: &[ElfSymbol<'_>],
    text: &[u8],
    symbol_value: usize,
    in_range: &[&ElfRelocation],
    object_name: &str,
) -> Vec<BuiltRelocation> {
    let mut grouped: BTreeMap<(u8, String), Vec<u32>> = BTreeMap::new();
    let mut pending_hi16_addend: Option<u32> = None;

    for (i, &reloc) in in_range.iter().enumerate() {
        let rel_offset = reloc.offset - symbol_value as u32;
        let target = symbols.get(reloc.symbol_index as usize).copied();

        let name = match reloc.kind {
            t if t == R_MIPS_26 || t == R_MIPS_HI16 || t == R_MIPS_LO16 => {
                match target {
                    Some(sym) if sym.bind() != STB_LOCAL && !sym.name.is_empty() => {
                        pending_hi16_addend = None;
                        Some(sym.name.to_string())
                    }
                    _ => pseudo_name_for(
                        elf, text, reloc, target, object_name, &mut pending_hi16_addend, i, in_range,
                    ),
                }
            }
            other => {
                #[cfg(feature = "log")]
                log::warn!("dropping unsupported relocation type {other} while building signature");
                None
            }
        };

        if let Some(name) = name {
            grouped.entry((reloc.kind, name)).or_default().push(rel_offset);
        }
    }

    grouped
        .into_iter()
        .map(|((rel_type, symbol_name), mut offsets)| {
            offsets.sort_unstable();
            BuiltRelocation { rel_type, symbol_name, offsets }
        })
        .collect()
}

/// Computes the addend-based pseudo-name for a local-symbol relocation,
/// per the `R_MIPS_26`/`HI16`/`LO16` addend rules. Returns `None` (and
/// logs) when a `LO16` isn't immediately preceded by its pairing `HI16`
/// — the relocation is dropped rather than treated as a hard error.
fn pseudo_name_for(
    elf: &ElfView<'_>,
    text: &[u8],
    reloc: &ElfRelocation,
    target: Option<ElfSymbol<'_>>,
    object_name: &str,
    pending_hi16_addend: &mut Option<u32>,
    index: usize,
    in_range: &[&ElfRelocation],
) -> Option<String> {
    let opcode_at = |offset: u32| -> Option<u32> {
        let start = offset as usize;
        text.get(start..start + 4)
            .map(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]))
    };
    let this_op = opcode_at(reloc.offset)?;

    let addend = match reloc.kind {
        R_MIPS_26 => {
            *pending_hi16_addend = None;
            (this_op & 0x03FF_FFFF) << 2
        }
        R_MIPS_HI16 => {
            let next = in_range.get(index + 1).copied();
            let paired_lo16_op = match next {
                Some(n) if n.kind == R_MIPS_LO16 => opcode_at(n.offset),
                _ => None,
            };
            let lo_imm = match paired_lo16_op {
                Some(op) => op & 0xFFFF,
                None => {
                    #[cfg(feature = "log")]
                    log::warn!("HI16 relocation at {:#x} has no paired LO16, dropping", reloc.offset);
                    *pending_hi16_addend = None;
                    return None;
                }
            };
            let hi_imm = this_op & 0xFFFF;
            let addend = (hi_imm << 16).wrapping_add(((lo_imm as i16) as i32) as u32);
            *pending_hi16_addend = Some(addend);
            addend
        }
        R_MIPS_LO16 => match pending_hi16_addend.take() {
            Some(addend) => addend,
            None => {
                #[cfg(feature = "log")]
                log::warn!("LO16 relocation at {:#x} has no preceding HI16, dropping", reloc.offset);
                return None;
            }
        },
        _ => return None,
    };

    let section_name = target
        .and_then(|sym| elf.section_name(sym.section_index as usize).ok())
        .unwrap_or("text");
    let section_name = section_name.strip_prefix('.').unwrap_or(section_name);

    Some(format!("{object_name}_{section_name}_{addend:04X}").replace('.', "_"))
}

//! Turns a matched (or best-partial) pairing of an object against the
//! target binary into named, addressed [`SearchResult`]s.

use crate::aggregate::{ResultSet, SearchResult};
use crate::elf::sym::{STB_GLOBAL, STT_NOTYPE};
use crate::elf::{reloc::R_MIPS_26, section_header::SHN_UNDEF, ElfView};
use crate::error::Result;
use crate::matcher::MatchOutcome;

/// The `jal` opcode's top 6 bits.
const JAL_OPCODE_TOP6: u8 = 0x0C;

/// Harvests every symbol this match outcome proves the location of,
/// inserting them into `results`.
///
/// `object_prefix` names the owning object (archive member or bare
/// object file), used only for the pseudo-names synthesised when a
/// `R_MIPS_26` relocation targets the compiler's placeholder symbol
/// (index 1, an anonymous static whose real symbol was tossed).
pub fn harvest(
    elf: &ElfView<'_>,
    matched_region: &[u8],
    outcome: MatchOutcome,
    object_prefix: &str,
    header_size: u32,
    results: &ResultSet,
) -> Result<()> {
    let (matched_base, matched_bytes, is_partial) = match outcome {
        MatchOutcome::Full { address, matched_bytes } => (address, matched_bytes, false),
        MatchOutcome::Partial { address, matched_bytes } => (address, matched_bytes, true),
        MatchOutcome::NoMatch => return Ok(()),
    };
    let max_text_offset = if is_partial { matched_bytes as u32 } else { 0 };

    harvest_global_symbols(elf, matched_base, max_text_offset, header_size, results)?;
    harvest_jal_targets(elf, matched_region, max_text_offset, object_prefix, header_size, results)?;
    Ok(())
}

/// Global `.text` symbols, iterated in reverse declaration order (the
/// order the original tool walked them in, preserved so that
/// deduplication-by-address ties resolve the same way).
fn harvest_global_symbols(
    elf: &ElfView<'_>,
    matched_base: u32,
    max_text_offset: u32,
    header_size: u32,
    results: &ResultSet,
) -> Result<()> {
    let symbols = elf.symbols()?;
    for symbol in symbols.iter().rev() {
        if symbol.bind() != STB_GLOBAL
            || symbol.kind() == STT_NOTYPE
            || symbol.section_index == SHN_UNDEF
            || symbol.size == 0
        {
            continue;
        }
        if max_text_offset > 0 && symbol.value >= max_text_offset {
            continue;
        }
        let address = header_size.wrapping_add(matched_base).wrapping_add(symbol.value);
        results.add(SearchResult::new(symbol.name, address));
    }
    Ok(())
}

/// `R_MIPS_26` relocations whose matched opcode is a `jal`: the target
/// of the jump is itself a function entry point, even when its symbol
/// didn't survive as a global (static functions the compiler stripped
/// down to relocation index 1 get a synthesised pseudo-name instead).
fn harvest_jal_targets(
    elf: &ElfView<'_>,
    matched_region: &[u8],
    max_text_offset: u32,
    object_prefix: &str,
    header_size: u32,
    results: &ResultSet,
) -> Result<()> {
    let symbols = elf.symbols()?;
    for relocation in elf.text_relocations()? {
        if relocation.kind != R_MIPS_26 {
            continue;
        }
        let offset = relocation.offset as usize;
        if max_text_offset > 0 && relocation.offset >= max_text_offset {
            continue;
        }
        if offset + 4 > matched_region.len() {
            continue;
        }
        let opcode = u32::from_be_bytes([
            matched_region[offset],
            matched_region[offset + 1],
            matched_region[offset + 2],
            matched_region[offset + 3],
        ]);
        if (opcode >> 26) as u8 != JAL_OPCODE_TOP6 {
            continue;
        }
        let target = header_size | ((opcode & 0x03FF_FFFF) << 2);

        let name = if relocation.symbol_index == 1 {
            format!("{}_{:04X}", object_prefix, offset).replace('.', "_")
        } else {
            symbols
                .get(relocation.symbol_index as usize)
                .map(|s| s.name.to_string())
                .unwrap_or_default()
        };
        if name.is_empty() {
            continue;
        }
        results.add(SearchResult::new(name, target));
    }
    Ok(())
}

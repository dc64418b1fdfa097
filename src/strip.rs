//! Masks the relocated bits out of a MIPS opcode word so that two
//! copies of "the same" instruction — one linked against a different
//! base address, or pointing at a different symbol — compare equal.
//!
//! A linker patches only the field a relocation targets; the rest of
//! the 32-bit word is untouched. Stripping that field back to zero
//! before a CRC or byte comparison makes the comparison relocation
//! tolerant instead of address tolerant: it proves the instruction is
//! the same *operation*, not that it was linked to the same place.

use crate::elf::reloc::{R_MIPS_26, R_MIPS_HI16, R_MIPS_LO16, R_MIPS_NONE};

/// Zeroes the bits of `word` (big-endian, as read straight from
/// `.text`) that a relocation of type `rel_type` would have patched.
///
/// `R_MIPS_NONE` is a no-op; `R_MIPS_26` clears the low 26 bits (the
/// jump target, preserving the 6-bit opcode); `R_MIPS_HI16`/`LO16`
/// clear the low 16 bits (the immediate, preserving the 6-bit opcode
/// and 5+5 bit register fields). Any other type passes through
/// unchanged — this function only knows the relocations MIPS-III
/// `gcc`/`gas` actually emit against `.text`; callers decide what an
/// unrecognized type means for them (the matcher falls back to a
/// verbatim compare, the signature builder drops the relocation).
pub fn strip_opcode(word: [u8; 4], rel_type: u8) -> [u8; 4] {
    let value = u32::from_be_bytes(word);
    let stripped = match rel_type {
        R_MIPS_26 => value & 0xFC00_0000,
        R_MIPS_HI16 | R_MIPS_LO16 => value & 0xFFFF_0000,
        R_MIPS_NONE | _ => value,
    };
    stripped.to_be_bytes()
}

/// Whether `rel_type` is one of the relocation kinds this crate
/// understands well enough to strip (as opposed to passing through
/// verbatim).
pub fn is_known_relocation(rel_type: u8) -> bool {
    matches!(rel_type, R_MIPS_NONE | R_MIPS_26 | R_MIPS_HI16 | R_MIPS_LO16)
}

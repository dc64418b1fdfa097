//! The `sig_v1` signature file format: a textual, portable alternative
//! to shipping whole archives for matching against a target binary.
//!
//! A signature file records, per symbol, two CRCs of its (relocation-
//! stripped) bytes and the list of relocated offsets needed to
//! reproduce that stripping at match time — no ELF object required.

pub mod builder;
pub mod reader;

pub use builder::SignatureBuilder;
pub use reader::SignatureFile;

/// The directive a relocation sub-line uses in the textual format, and
/// the MIPS relocation type number it corresponds to.
pub(crate) fn directive_to_reloc_type(directive: &str) -> Option<u8> {
    match directive {
        ".targ26" => Some(crate::elf::reloc::R_MIPS_26),
        ".hi16" => Some(crate::elf::reloc::R_MIPS_HI16),
        ".lo16" => Some(crate::elf::reloc::R_MIPS_LO16),
        _ => None,
    }
}

pub(crate) fn reloc_type_to_directive(rel_type: u8) -> &'static str {
    match rel_type {
        t if t == crate::elf::reloc::R_MIPS_26 => ".targ26",
        t if t == crate::elf::reloc::R_MIPS_HI16 => ".hi16",
        t if t == crate::elf::reloc::R_MIPS_LO16 => ".lo16",
        _ => ".unknown",
    }
}

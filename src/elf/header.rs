//! The ELF file header (`Elf32_Ehdr`), restricted to what this crate
//! needs: enough of it to confirm the file is a 32-bit big-endian MIPS
//! relocatable, plus the section header table location.

use scroll::{Pread, BE};

use crate::error::{Error, Result};

/// `e_ident[EI_MAG0..EI_MAG3]`
pub const ELFMAG: &[u8; 4] = b"\x7fELF";
/// 32-bit objects.
pub const ELFCLASS32: u8 = 1;
/// Big-endian data encoding.
pub const ELFDATA2MSB: u8 = 2;
/// Relocatable file.
pub const ET_REL: u16 = 1;
/// MIPS machine value (shared by all MIPS ISA variants).
pub const EM_MIPS: u16 = 8;

/// Size, in bytes, of a 32-bit ELF header.
pub const SIZEOF_EHDR: usize = 52;

/// The fixed-size portion of the ELF header this crate cares about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    pub e_type: u16,
    pub e_machine: u16,
    pub e_version: u32,
    pub e_entry: u32,
    pub e_phoff: u32,
    pub e_shoff: u32,
    pub e_flags: u32,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

impl Header {
    /// Parses and validates the header at the start of `bytes`.
    ///
    /// Only 32-bit, big-endian, MIPS relocatables are accepted; anything
    /// else is a [`Error::TruncatedElf`] (this crate has no use for other
    /// ELF flavors, see Non-goals in the specification).
    pub fn parse(bytes: &[u8]) -> Result<Header> {
        if bytes.len() < SIZEOF_EHDR {
            return Err(Error::TruncatedElf("file shorter than an ELF header".into()));
        }
        if &bytes[0..4] != ELFMAG {
            return Err(Error::TruncatedElf("bad e_ident magic".into()));
        }
        let class = bytes[4];
        let data = bytes[5];
        if class != ELFCLASS32 {
            return Err(Error::TruncatedElf(format!(
                "unsupported EI_CLASS {class} (only ELFCLASS32 is supported)"
            )));
        }
        if data != ELFDATA2MSB {
            return Err(Error::TruncatedElf(format!(
                "unsupported EI_DATA {data} (only ELFDATA2MSB is supported)"
            )));
        }

        let offset = &mut 16usize;
        let e_type = bytes.gread_with::<u16>(offset, BE)?;
        let e_machine = bytes.gread_with::<u16>(offset, BE)?;
        let e_version = bytes.gread_with::<u32>(offset, BE)?;
        let e_entry = bytes.gread_with::<u32>(offset, BE)?;
        let e_phoff = bytes.gread_with::<u32>(offset, BE)?;
        let e_shoff = bytes.gread_with::<u32>(offset, BE)?;
        let e_flags = bytes.gread_with::<u32>(offset, BE)?;
        let e_ehsize = bytes.gread_with::<u16>(offset, BE)?;
        let e_phentsize = bytes.gread_with::<u16>(offset, BE)?;
        let e_phnum = bytes.gread_with::<u16>(offset, BE)?;
        let e_shentsize = bytes.gread_with::<u16>(offset, BE)?;
        let e_shnum = bytes.gread_with::<u16>(offset, BE)?;
        let e_shstrndx = bytes.gread_with::<u16>(offset, BE)?;

        if e_machine != EM_MIPS {
            return Err(Error::TruncatedElf(format!(
                "unsupported e_machine {e_machine} (only EM_MIPS is supported)"
            )));
        }

        Ok(Header {
            e_type,
            e_machine,
            e_version,
            e_entry,
            e_phoff,
            e_shoff,
            e_flags,
            e_ehsize,
            e_phentsize,
            e_phnum,
            e_shentsize,
            e_shnum,
            e_shstrndx,
        })
    }
}

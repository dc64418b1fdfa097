//! A zero-copy, read-only view over a 32-bit big-endian MIPS relocatable
//! ELF object: the section table, `.symtab`, and `.rel.text`.
//!
//! Only the section types this crate consumes are understood
//! (`.text`/`.rel.text`/`.symtab`/`.strtab`/`.shstrtab`); general ELF
//! support — 64-bit, little-endian, non-MIPS, program headers, dynamic
//! linking, symbol versioning — is out of scope (see the specification's
//! Non-goals).

pub mod header;
pub mod reloc;
pub mod section_header;
pub mod strtab;
pub mod sym;

pub use header::Header;
pub use reloc::Rel;
pub use section_header::SectionHeader;
pub use strtab::Strtab;
pub use sym::Sym;

use crate::error::{Error, Result};

/// A named symbol borrowed from `.symtab`/`.strtab`.
#[derive(Debug, Clone, Copy)]
pub struct ElfSymbol<'a> {
    pub name: &'a str,
    pub value: u32,
    pub size: u32,
    pub info: u8,
    pub section_index: u16,
}

impl<'a> ElfSymbol<'a> {
    #[inline]
    pub fn bind(&self) -> u8 {
        sym::st_bind(self.info)
    }

    #[inline]
    pub fn kind(&self) -> u8 {
        sym::st_type(self.info)
    }
}

/// A relocation borrowed from `.rel.text`, with its symbol index and
/// type already decoded.
#[derive(Debug, Clone, Copy)]
pub struct ElfRelocation {
    pub offset: u32,
    pub symbol_index: u32,
    pub kind: u8,
}

/// A read-only, zero-copy view over one ELF relocatable object.
pub struct ElfView<'a> {
    bytes: &'a [u8],
    header: Header,
    section_headers: Vec<SectionHeader>,
    shstrtab: Strtab<'a>,
}

impl<'a> ElfView<'a> {
    /// Parses the header and section header table of `bytes`.
    ///
    /// Does not eagerly parse `.symtab`/`.rel.text`; those are decoded
    /// on demand by [`ElfView::symbols`] and [`ElfView::text_relocations`].
    pub fn parse(bytes: &'a [u8]) -> Result<ElfView<'a>> {
        let header = Header::parse(bytes)?;

        let shoff = header.e_shoff as usize;
        let shnum = header.e_shnum as usize;
        let shentsize = header.e_shentsize as usize;
        let mut section_headers = Vec::with_capacity(shnum);
        let mut cursor = shoff;
        for _ in 0..shnum {
            if cursor + shentsize > bytes.len() {
                return Err(Error::TruncatedElf(
                    "section header table runs past end of file".into(),
                ));
            }
            let mut entry_cursor = cursor;
            section_headers.push(SectionHeader::parse(bytes, &mut entry_cursor)?);
            cursor += shentsize;
        }

        let shstrtab = if (header.e_shstrndx as usize) < section_headers.len() {
            let sh = &section_headers[header.e_shstrndx as usize];
            Strtab::new(section_bytes(bytes, sh)?)
        } else {
            Strtab::new(&[])
        };

        Ok(ElfView {
            bytes,
            header,
            section_headers,
            shstrtab,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn section_headers(&self) -> &[SectionHeader] {
        &self.section_headers
    }

    /// The section header at `index`, if any.
    pub fn section_by_index(&self, index: usize) -> Option<&SectionHeader> {
        self.section_headers.get(index)
    }

    /// The name of the section at `index`, resolved through `.shstrtab`.
    pub fn section_name(&self, index: usize) -> Result<&'a str> {
        let sh = self
            .section_by_index(index)
            .ok_or_else(|| Error::TruncatedElf(format!("no section at index {index}")))?;
        self.shstrtab.get(sh.sh_name as usize)
    }

    /// Finds the index of the first section whose name (via
    /// `.shstrtab`) equals `name`.
    pub fn section_index_by_name(&self, name: &str) -> Option<usize> {
        (0..self.section_headers.len()).find(|&i| self.section_name(i).map(|n| n == name).unwrap_or(false))
    }

    /// Finds the first section whose name (via `.shstrtab`) equals `name`.
    pub fn section_by_name(&self, name: &str) -> Option<&SectionHeader> {
        self.section_index_by_name(name).map(|i| &self.section_headers[i])
    }

    /// The raw bytes of a section, bounds-checked against the backing
    /// buffer.
    pub fn section_data(&self, sh: &SectionHeader) -> Result<&'a [u8]> {
        section_bytes(self.bytes, sh)
    }

    /// The `.text` section's bytes, if present.
    pub fn text(&self) -> Result<Option<&'a [u8]>> {
        match self.section_by_name(".text") {
            Some(sh) => Ok(Some(self.section_data(sh)?)),
            None => Ok(None),
        }
    }

    /// All symbols in `.symtab`, resolved against `.strtab`.
    ///
    /// Returns an empty vector if the object carries no `.symtab`
    /// (e.g. it's been fully stripped).
    pub fn symbols(&self) -> Result<Vec<ElfSymbol<'a>>> {
        let symtab_sh = match self.section_by_name(".symtab") {
            Some(sh) => sh,
            None => return Ok(Vec::new()),
        };
        let strtab_sh = self
            .section_by_name(".strtab")
            .ok_or_else(|| Error::TruncatedElf(".symtab present without .strtab".into()))?;

        let symtab = self.section_data(symtab_sh)?;
        let strtab = Strtab::new(self.section_data(strtab_sh)?);

        if symtab.len() % sym::SIZEOF_SYM != 0 {
            return Err(Error::TruncatedElf(
                ".symtab size is not a multiple of Elf32_Sym".into(),
            ));
        }

        let count = symtab.len() / sym::SIZEOF_SYM;
        let mut out = Vec::with_capacity(count);
        let mut cursor = 0usize;
        for _ in 0..count {
            let raw = Sym::parse(symtab, &mut cursor)?;
            let name = strtab.get(raw.st_name as usize)?;
            out.push(ElfSymbol {
                name,
                value: raw.st_value,
                size: raw.st_size,
                info: raw.st_info,
                section_index: raw.st_shndx,
            });
        }
        Ok(out)
    }

    /// `.rel.text` entries, decoded and sorted ascending by offset (the
    /// matcher and harvester both require this; object files are not
    /// guaranteed to already be sorted).
    pub fn text_relocations(&self) -> Result<Vec<ElfRelocation>> {
        let rel_sh = match self.section_by_name(".rel.text") {
            Some(sh) => sh,
            None => return Ok(Vec::new()),
        };
        let data = self.section_data(rel_sh)?;
        if data.len() % reloc::SIZEOF_REL != 0 {
            return Err(Error::TruncatedElf(
                ".rel.text size is not a multiple of Elf32_Rel".into(),
            ));
        }
        let count = data.len() / reloc::SIZEOF_REL;
        let mut out = Vec::with_capacity(count);
        let mut cursor = 0usize;
        for _ in 0..count {
            let raw = Rel::parse(data, &mut cursor)?;
            out.push(ElfRelocation {
                offset: raw.r_offset,
                symbol_index: raw.symbol_index(),
                kind: raw.kind(),
            });
        }
        out.sort_by_key(|r| r.offset);
        Ok(out)
    }
}

fn section_bytes<'a>(bytes: &'a [u8], sh: &SectionHeader) -> Result<&'a [u8]> {
    if sh.sh_type == section_header::SHT_NOBITS {
        return Ok(&[]);
    }
    let start = sh.sh_offset as usize;
    let end = start
        .checked_add(sh.sh_size as usize)
        .ok_or_else(|| Error::TruncatedElf("section size overflows".into()))?;
    bytes.get(start..end).ok_or_else(|| {
        Error::TruncatedElf(format!(
            "section [{start:#x}..{end:#x}) is out of bounds (file is {:#x} bytes)",
            bytes.len()
        ))
    })
}

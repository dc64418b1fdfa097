//! End-to-end scenarios exercising the matching engine through its
//! public API: build small ELF objects and `ar` archives by hand (the
//! way `src/elf/mod.rs` and `src/archive/mod.rs`'s own unit tests do),
//! then drive `ElfView` -> `matcher` -> `harvest` -> `ResultSet` as the
//! scan driver would.

use n64symbolicator::aggregate::{ResultSet, SearchResult};
use n64symbolicator::elf::reloc::R_MIPS_26;
use n64symbolicator::elf::section_header::{SHT_PROGBITS, SHT_REL, SHT_STRTAB, SHT_SYMTAB};
use n64symbolicator::elf::sym::{STB_GLOBAL, STT_FUNC};
use n64symbolicator::elf::ElfView;
use n64symbolicator::harvest::harvest;
use n64symbolicator::matcher::{find_best_match, MatchOutcome};
use n64symbolicator::sigfile::{SignatureBuilder, SignatureFile};

/// A symbol destined for `.symtab`: name, value, size, STB/STT pair.
struct SymSpec<'a> {
    name: &'a str,
    value: u32,
    size: u32,
    bind: u8,
    kind: u8,
}

/// A relocation destined for `.rel.text`.
struct RelSpec {
    offset: u32,
    kind: u8,
    symbol_index: u32,
}

/// Hand-builds a minimal 32-bit big-endian MIPS relocatable ELF with one
/// `.text` section, an optional `.rel.text`, and the given symbols.
fn build_object(text: &[u8], relocs: &[RelSpec], symbols: &[SymSpec]) -> Vec<u8> {
    let mut shstrtab = vec![0u8];
    let text_name = shstrtab.len();
    shstrtab.extend_from_slice(b".text\0");
    let symtab_name = shstrtab.len();
    shstrtab.extend_from_slice(b".symtab\0");
    let strtab_name = shstrtab.len();
    shstrtab.extend_from_slice(b".strtab\0");
    let shstrtab_name = shstrtab.len();
    shstrtab.extend_from_slice(b".shstrtab\0");
    let reltext_name = shstrtab.len();
    shstrtab.extend_from_slice(b".rel.text\0");

    let mut strtab = vec![0u8];
    let mut name_offsets = Vec::with_capacity(symbols.len());
    for sym in symbols {
        name_offsets.push(strtab.len());
        strtab.extend_from_slice(sym.name.as_bytes());
        strtab.push(0);
    }

    let mut symtab = Vec::new();
    symtab.extend_from_slice(&[0u8; 16]); // null symbol
    for (sym, name_off) in symbols.iter().zip(&name_offsets) {
        symtab.extend_from_slice(&(*name_off as u32).to_be_bytes());
        symtab.extend_from_slice(&sym.value.to_be_bytes());
        symtab.extend_from_slice(&sym.size.to_be_bytes());
        symtab.push((sym.bind << 4) | sym.kind);
        symtab.push(0);
        symtab.extend_from_slice(&1u16.to_be_bytes()); // st_shndx: .text is section 1
    }

    let mut reltext = Vec::new();
    for rel in relocs {
        reltext.extend_from_slice(&rel.offset.to_be_bytes());
        let info = (rel.symbol_index << 8) | (rel.kind as u32);
        reltext.extend_from_slice(&info.to_be_bytes());
    }

    let has_reloc = !relocs.is_empty();
    let ehdr_size = 52usize;
    let text_off = ehdr_size;
    let reltext_off = text_off + text.len();
    let symtab_off = reltext_off + reltext.len();
    let strtab_off = symtab_off + symtab.len();
    let shstrtab_off = strtab_off + strtab.len();
    let shoff = shstrtab_off + shstrtab.len();
    let nsections = if has_reloc { 6 } else { 5 };

    let mut buf = Vec::new();
    buf.extend_from_slice(b"\x7fELF");
    buf.push(1); // ELFCLASS32
    buf.push(2); // ELFDATA2MSB
    buf.extend_from_slice(&[0u8; 10]);
    buf.extend_from_slice(&1u16.to_be_bytes()); // e_type = ET_REL
    buf.extend_from_slice(&8u16.to_be_bytes()); // e_machine = EM_MIPS
    buf.extend_from_slice(&1u32.to_be_bytes());
    buf.extend_from_slice(&0u32.to_be_bytes());
    buf.extend_from_slice(&0u32.to_be_bytes());
    buf.extend_from_slice(&(shoff as u32).to_be_bytes());
    buf.extend_from_slice(&0u32.to_be_bytes());
    buf.extend_from_slice(&(ehdr_size as u16).to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes());
    buf.extend_from_slice(&40u16.to_be_bytes());
    buf.extend_from_slice(&(nsections as u16).to_be_bytes());
    buf.extend_from_slice(&((nsections - 1) as u16).to_be_bytes());
    assert_eq!(buf.len(), ehdr_size);

    buf.extend_from_slice(text);
    buf.extend_from_slice(&reltext);
    buf.extend_from_slice(&symtab);
    buf.extend_from_slice(&strtab);
    buf.extend_from_slice(&shstrtab);

    let push_shdr = |buf: &mut Vec<u8>, name: usize, ty: u32, off: usize, size: usize, link: u32, entsize: u32| {
        buf.extend_from_slice(&(name as u32).to_be_bytes());
        buf.extend_from_slice(&ty.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&(off as u32).to_be_bytes());
        buf.extend_from_slice(&(size as u32).to_be_bytes());
        buf.extend_from_slice(&link.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&4u32.to_be_bytes());
        buf.extend_from_slice(&entsize.to_be_bytes());
    };

    push_shdr(&mut buf, 0, 0, 0, 0, 0, 0);
    push_shdr(&mut buf, text_name, SHT_PROGBITS, text_off, text.len(), 0, 0);
    let symtab_index = if has_reloc { 3 } else { 2 };
    if has_reloc {
        push_shdr(&mut buf, reltext_name, SHT_REL, reltext_off, reltext.len(), symtab_index, 8);
    }
    push_shdr(&mut buf, symtab_name, SHT_SYMTAB, symtab_off, symtab.len(), 0, 16);
    push_shdr(&mut buf, strtab_name, SHT_STRTAB, strtab_off, strtab.len(), 0, 0);
    push_shdr(&mut buf, shstrtab_name, SHT_STRTAB, shstrtab_off, shstrtab.len(), 0, 0);

    buf
}

fn pad_header(name: &str, size: usize) -> Vec<u8> {
    let mut h = vec![b' '; 60];
    h[0..name.len()].copy_from_slice(name.as_bytes());
    h[16..16 + 12].copy_from_slice(b"0           ");
    h[28..28 + 6].copy_from_slice(b"0     ");
    h[34..34 + 6].copy_from_slice(b"0     ");
    h[40..40 + 8].copy_from_slice(b"100644  ");
    let size_str = size.to_string();
    h[48..48 + size_str.len()].copy_from_slice(size_str.as_bytes());
    h[58] = 0x60;
    h[59] = 0x0A;
    h
}

/// Builds an archive out of `members`, routing any name over 15 bytes
/// through a GNU extended-identifier (`//`) table and a `/<decimal>`
/// indirect header, the way `ar` itself does for long names.
fn build_archive(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut names_table = Vec::new();
    let mut offsets = Vec::new();
    for (name, _) in members {
        if name.len() > 15 {
            offsets.push(Some(names_table.len()));
            names_table.extend_from_slice(name.as_bytes());
            names_table.push(b'/');
            names_table.push(b'\n');
        } else {
            offsets.push(None);
        }
    }

    let mut buf = n64symbolicator::archive::MAGIC.to_vec();
    if !names_table.is_empty() {
        buf.extend_from_slice(&pad_header("//", names_table.len()));
        buf.extend_from_slice(&names_table);
        if names_table.len() % 2 != 0 {
            buf.push(b'\n');
        }
    }

    for ((name, data), offset) in members.iter().zip(&offsets) {
        let header_name = match offset {
            Some(off) => format!("/{off}"),
            None => format!("{name}/"),
        };
        buf.extend_from_slice(&pad_header(&header_name, data.len()));
        buf.extend_from_slice(data);
        if data.len() % 2 != 0 {
            buf.push(b'\n');
        }
    }
    buf
}

/// Scenario 1: pure-binary match, no relocations.
#[test]
fn pure_binary_match() {
    let text: Vec<u8> = vec![0x24, 0x02, 0x00, 0x01, 0x03, 0xE0, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00];
    let obj = build_object(
        &text,
        &[],
        &[SymSpec { name: "foo", value: 0, size: 12, bind: STB_GLOBAL, kind: STT_FUNC }],
    );
    let elf = ElfView::parse(&obj).unwrap();

    let header_size = 0x8000_0000u32;
    let mut binary = vec![0u8; 0x2000];
    binary[0x1000..0x1000 + text.len()].copy_from_slice(&text);

    let outcome = find_best_match(&elf, &binary).unwrap();
    assert_eq!(outcome, MatchOutcome::Full { address: 0x1000, matched_bytes: 12 });

    let results = ResultSet::new();
    let region = &binary[0x1000..0x1000 + 12];
    harvest(&elf, region, outcome, "foo.o", header_size, &results).unwrap();
    let out = results.into_sorted_vec();
    assert_eq!(out, vec![SearchResult::new("foo", 0x8000_1000)]);
}

/// Scenario 2: a relocated `jal` call target is recovered alongside the
/// defining symbol.
#[test]
fn relocated_match_with_jal_target() {
    // li v0,1 becomes a jal-to-bar placeholder; jr ra; nop.
    let text: Vec<u8> = vec![0x0C, 0x00, 0x00, 0x00, 0x03, 0xE0, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00];
    let obj = build_object(
        &text,
        &[RelSpec { offset: 0, kind: R_MIPS_26, symbol_index: 1 }],
        &[SymSpec { name: "foo", value: 0, size: 12, bind: STB_GLOBAL, kind: STT_FUNC }],
    );
    let elf = ElfView::parse(&obj).unwrap();

    let header_size = 0x8000_0000u32;
    // jalTarget/4 = 0x00002000 -> top 6 bits 0x0C, low 26 bits 0x00002000.
    let jal_word: u32 = (0x0Cu32 << 26) | 0x0000_2000;
    let mut binary = vec![0u8; 0x2000];
    binary[0x1000..0x1000 + 4].copy_from_slice(&jal_word.to_be_bytes());
    binary[0x1004..0x1004 + 4].copy_from_slice(&[0x03, 0xE0, 0x00, 0x08]);
    binary[0x1008..0x100C].copy_from_slice(&[0, 0, 0, 0]);

    let outcome = find_best_match(&elf, &binary).unwrap();
    assert_eq!(outcome, MatchOutcome::Full { address: 0x1000, matched_bytes: 12 });

    let results = ResultSet::new();
    let region = &binary[0x1000..0x1000 + 12];
    harvest(&elf, region, outcome, "foo.o", header_size, &results).unwrap();
    let mut out = results.into_sorted_vec();
    out.sort_by_key(|r| r.address);
    assert_eq!(
        out,
        vec![
            SearchResult::new("foo", 0x8000_1000),
            SearchResult::new("bar", 0x8000_8000),
        ]
    );
}

/// Scenario 3: a relocated slot that is all-zero in the target binary
/// can never be a real match (a relocated instruction is never NOP).
#[test]
fn zero_in_relocated_slot_breaks_the_match() {
    let text: Vec<u8> = vec![0x0C, 0x00, 0x00, 0x00, 0x03, 0xE0, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00];
    let obj = build_object(
        &text,
        &[RelSpec { offset: 0, kind: R_MIPS_26, symbol_index: 1 }],
        &[SymSpec { name: "foo", value: 0, size: 12, bind: STB_GLOBAL, kind: STT_FUNC }],
    );
    let elf = ElfView::parse(&obj).unwrap();

    let mut binary = vec![0u8; 0x2000];
    // First word left zero: a relocated slot that never got linked.
    binary[0x1004..0x1004 + 4].copy_from_slice(&[0x03, 0xE0, 0x00, 0x08]);

    let outcome = find_best_match(&elf, &binary).unwrap();
    assert_eq!(outcome, MatchOutcome::NoMatch);
}

/// Scenario 4: a signature-file hit against `memcpy`-shaped bytes.
#[test]
fn signature_file_round_trip_hit() {
    let text: Vec<u8> = vec![
        0x27, 0xBD, 0xFF, 0xE0, // addiu $sp, $sp, -32 (prologue, a seed candidate)
        0x03, 0xE0, 0x00, 0x08, // jr $ra
        0x00, 0x00, 0x00, 0x00, // nop
    ];
    let obj = build_object(
        &text,
        &[],
        &[SymSpec { name: "memcpy", value: 0, size: text.len() as u32, bind: STB_GLOBAL, kind: STT_FUNC }],
    );
    let elf = ElfView::parse(&obj).unwrap();

    let mut builder = SignatureBuilder::new();
    builder.process_object(&elf, "libc.o").unwrap();
    assert_eq!(builder.len(), 1);

    let mut doc = Vec::new();
    builder.write(&mut doc).unwrap();
    let sig = SignatureFile::parse(std::str::from_utf8(&doc).unwrap()).unwrap();
    assert_eq!(sig.len(), 1);
    assert_eq!(sig.symbol(0).unwrap().name, "memcpy");

    let header_size = 0x8000_0000u32;
    let mut binary = vec![0u8; 0x8000];
    binary[0x4000..0x4000 + text.len()].copy_from_slice(&text);

    let driver = n64symbolicator::scan::ScanDriver::new(
        &n64symbolicator::TargetBinary::with_header_size_override(binary, header_size),
        false,
    );
    let results = ResultSet::new();
    driver.scan_signature_file(&sig, &results);
    assert_eq!(results.into_sorted_vec(), vec![SearchResult::new("memcpy", 0x8000_4000)]);
}

/// Scenario 5: two objects defining the same canonical `foo` at the
/// same target offset must yield one deduplicated result.
#[test]
fn duplicate_matches_are_suppressed() {
    let text: Vec<u8> = vec![0x24, 0x02, 0x00, 0x01, 0x03, 0xE0, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00];
    let header_size = 0x8000_0000u32;
    let mut binary = vec![0u8; 0x2000];
    binary[0x1000..0x1000 + text.len()].copy_from_slice(&text);

    let results = ResultSet::new();
    for _ in 0..2 {
        let obj = build_object(
            &text,
            &[],
            &[SymSpec { name: "foo", value: 0, size: 12, bind: STB_GLOBAL, kind: STT_FUNC }],
        );
        let elf = ElfView::parse(&obj).unwrap();
        let outcome = find_best_match(&elf, &binary).unwrap();
        let region = &binary[0x1000..0x1000 + 12];
        harvest(&elf, region, outcome, "dup.o", header_size, &results).unwrap();
    }
    let out = results.into_sorted_vec();
    assert_eq!(out, vec![SearchResult::new("foo", 0x8000_1000)]);
}

/// Scenario 6: archive round-trip, including the extended-identifier
/// indirection for a name over 16 bytes.
#[test]
fn archive_round_trip() {
    let obj_a = build_object(
        &[0u8; 4],
        &[],
        &[SymSpec { name: "a", value: 0, size: 4, bind: STB_GLOBAL, kind: STT_FUNC }],
    );
    let obj_b = build_object(
        &[0u8; 4],
        &[],
        &[SymSpec { name: "b", value: 0, size: 4, bind: STB_GLOBAL, kind: STT_FUNC }],
    );
    let long_name = "a_very_long_object_file_name_that_exceeds_sixteen_bytes.o";
    let archive_bytes = build_archive(&[("short.o", &obj_a), (long_name, &obj_b)]);

    let members = n64symbolicator::archive::members(&archive_bytes).unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].identifier, "short.o");
    assert_eq!(members[1].identifier, long_name);
    for member in &members {
        ElfView::parse(member.data).expect("each member is independently parseable");
    }
}

//! Drives the matching engine end to end: seeds candidate offsets,
//! tests signature-file symbols against them, and fans archive members
//! out across the worker pool.

use std::thread;

use crate::aggregate::ResultSet;
use crate::archive;
use crate::elf::ElfView;
use crate::error::Result;
use crate::matcher::find_best_match;
use crate::pool::Slots;
use crate::sigfile::SignatureFile;
use crate::target::TargetBinary;
use crate::{aggregate::SearchResult, harvest};

/// `jr $ra`, followed by a non-zero word 8 bytes later: the tail end of
/// one function and very likely the start of the next.
const JR_RA: u32 = 0x03E0_0008;
/// The fixed high half of `addiu $sp, $sp, imm16` — a stack frame setup,
/// and so also very likely a function start, when `imm16` is negative.
const ADDIU_SP_SP_HIGH: u32 = 0x27BD_0000;

/// Scans `binary` for "likely function start" offsets with a single
/// linear pass, per the heuristics above. Returns a sorted, deduplicated
/// list — the driver builds this once per run and never mutates it
/// afterward.
pub fn seed_candidates(binary: &[u8]) -> Vec<u32> {
    let mut candidates = Vec::new();
    let mut i = 0usize;
    while i + 4 <= binary.len() {
        let word = u32::from_be_bytes([binary[i], binary[i + 1], binary[i + 2], binary[i + 3]]);

        if word == JR_RA && i + 12 <= binary.len() {
            let next = u32::from_be_bytes([
                binary[i + 8],
                binary[i + 9],
                binary[i + 10],
                binary[i + 11],
            ]);
            if next != 0 {
                candidates.push((i + 8) as u32);
            }
        } else if word & 0xFFFF_0000 == ADDIU_SP_SP_HIGH {
            let imm = (word & 0xFFFF) as u16 as i16;
            if imm < 0 {
                candidates.push(i as u32);
            }
        }

        i += 4;
    }
    candidates.sort_unstable();
    candidates.dedup();
    candidates
}

/// Drives a scan against one target binary.
pub struct ScanDriver<'t> {
    target: &'t TargetBinary,
    thorough: bool,
}

impl<'t> ScanDriver<'t> {
    pub fn new(target: &'t TargetBinary, thorough: bool) -> ScanDriver<'t> {
        ScanDriver { target, thorough }
    }

    /// Tests every symbol in `sig` against the candidate offsets first,
    /// falling back to an exhaustive 4-byte-aligned sweep when
    /// `thorough` was requested. Each symbol stops at its first hit.
    pub fn scan_signature_file(&self, sig: &SignatureFile, results: &ResultSet) {
        let candidates = seed_candidates(self.target.bytes());
        for (index, symbol) in sig.symbols().enumerate() {
            let size = symbol.size as usize;
            let binary = self.target.bytes();
            if binary.len() < size {
                continue;
            }

            let hit = candidates
                .iter()
                .copied()
                .find(|&addr| self.test_signature_symbol(sig, index, addr, size))
                .or_else(|| {
                    if !self.thorough {
                        return None;
                    }
                    let last = binary.len() - size;
                    (0..=last)
                        .step_by(4)
                        .map(|addr| addr as u32)
                        .find(|&addr| self.test_signature_symbol(sig, index, addr, size))
                });

            if let Some(addr) = hit {
                let address = self.target.header_size().wrapping_add(addr);
                results.add(SearchResult::new(symbol.name, address));
            }
        }
    }

    fn test_signature_symbol(&self, sig: &SignatureFile, index: usize, addr: u32, size: usize) -> bool {
        let binary = self.target.bytes();
        let start = addr as usize;
        match binary.get(start..start + size) {
            Some(window) => sig.test(index, window),
            None => false,
        }
    }

    /// Matches every member of an `ar` archive's bytes against the
    /// target binary, one worker-pool task per member. Borrows
    /// `archive_bytes` for the whole scan via scoped threads, so the
    /// caller need not make the archive `'static`.
    pub fn scan_archive(&self, archive_bytes: &[u8], object_prefix: &str, slots: &Slots, results: &ResultSet) -> Result<()> {
        let members = archive::members(archive_bytes)?;
        thread::scope(|scope| {
            for member in &members {
                slots.acquire();
                scope.spawn(move || {
                    if let Err(_err) = self.process_member(member.data, object_prefix, results) {
                        #[cfg(feature = "log")]
                        log::debug!("{}: {_err}", member.identifier);
                    }
                    slots.release();
                });
            }
        });
        Ok(())
    }

    /// Matches a single object's bytes against the target binary and
    /// harvests whatever the match outcome proves.
    pub fn process_member(&self, object_bytes: &[u8], object_prefix: &str, results: &ResultSet) -> Result<()> {
        let elf = match ElfView::parse(object_bytes) {
            Ok(elf) => elf,
            Err(err) => {
                #[cfg(feature = "log")]
                log::debug!("{object_prefix}: not a recognizable elf object ({err})");
                return Ok(());
            }
        };
        let outcome = find_best_match(&elf, self.target.bytes())?;
        if !outcome.is_match() {
            return Ok(());
        }
        let address = outcome.address().expect("match implies an address");
        let region = &self.target.bytes()[address as usize..address as usize + outcome.matched_bytes()];
        harvest::harvest(&elf, region, outcome, object_prefix, self.target.header_size(), results)
    }
}

/// Matches a single already-parsed object file (not inside an archive)
/// against `target`.
pub fn scan_object(object_bytes: &[u8], object_prefix: &str, target: &TargetBinary, results: &ResultSet) -> Result<()> {
    ScanDriver::new(target, false).process_member(object_bytes, object_prefix, results)
}

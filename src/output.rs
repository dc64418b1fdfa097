//! The single output contract this crate commits to: a sorted iterator
//! over [`SearchResult`]s and one plain-text rendering of them.
//!
//! Third-party dialects (PJ64, Nemu, ARMIPS, n64split symbol maps) are
//! left to whatever consumes this crate's output — they're a matter of
//! taste in a text format, not part of the matching engine.

use std::io::{self, Write};

use crate::aggregate::SearchResult;

/// Identifies the rendering [`write_default`] produces, for callers
/// that want to label or validate their output format.
pub const DEFAULT_FORMAT: &str = "default";

/// Writes `results` (expected pre-sorted by address, as
/// [`crate::aggregate::ResultSet::into_sorted_vec`] returns them) as
/// `{address:08X} {name}`, one per line.
pub fn write_default(results: &[SearchResult], out: &mut dyn Write) -> io::Result<()> {
    for result in results {
        writeln!(out, "{:08X} {}", result.address, result.name)?;
    }
    Ok(())
}

/// Borrows `results` in ascending address order. A thin convenience
/// wrapper — today this is always pre-sorted by
/// [`crate::aggregate::ResultSet`], but callers shouldn't have to know
/// that to iterate correctly.
pub fn iter_sorted(results: &[SearchResult]) -> impl Iterator<Item = &SearchResult> {
    debug_assert!(results.windows(2).all(|w| w[0].address <= w[1].address));
    results.iter()
}

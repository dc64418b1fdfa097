//! Identifies function-level symbols inside a stripped Nintendo 64
//! executable image by matching its code against a corpus of known
//! object code drawn from `ar` archives of relocatable MIPS-III
//! big-endian ELF objects, and/or from precomputed signature files.
//!
//! The pipeline, leaves first:
//!
//! - [`archive`] streams an `ar` archive into named byte blocks.
//! - [`elf`] is a zero-copy view over a 32-bit big-endian ELF relocatable.
//! - [`crc32`] is a streaming IEEE CRC-32 with an explicit three-call API.
//! - [`strip`] canonicalises a MIPS opcode word given its relocation type.
//! - [`matcher`] slides an object's `.text` over the target binary.
//! - [`harvest`] turns a match into [`SearchResult`](aggregate::SearchResult)s.
//! - [`aggregate`] deduplicates and sorts results across the worker pool.
//! - [`sigfile`] reads and writes the `sig_v1` signature file format.
//! - [`scan`] seeds candidate offsets and drives everything above.
//! - [`pool`] is the bounded worker pool the scan driver submits to.
//! - [`target`] loads a raw buffer or N64 ROM image into a [`target::TargetBinary`].
//! - [`output`] is the single sorted-result-iterator / `default` dialect contract.
//!
//! A command-line front end, recursive directory enumeration, and
//! third-party output dialects (PJ64, Nemu, ARMIPS, n64split) are
//! intentionally not part of this crate; it exposes the matching engine
//! those tools are built on top of.

pub mod aggregate;
pub mod archive;
pub mod crc32;
pub mod elf;
pub mod error;
pub mod harvest;
pub mod matcher;
pub mod output;
pub mod pool;
pub mod scan;
pub mod sigfile;
pub mod strip;
pub mod target;

pub use aggregate::{ResultSet, SearchResult};
pub use error::{Error, Result};
pub use target::TargetBinary;

//! Crate-wide error type.
//!
//! Every fallible operation in this crate returns [`Result<T>`], a thin
//! alias over [`core::result::Result`] with [`Error`] fixed as the error
//! side. The variants mirror the error taxonomy of the matching engine:
//! a handful of things can go wrong (bad I/O, a malformed archive, a
//! truncated ELF, an unsupported relocation, a malformed signature file,
//! a bad argument) and each has exactly one variant.

use core::fmt;
use core::result;
use std::string::String;

/// The error type for this crate.
#[derive(Debug)]
pub enum Error {
    /// Reading or writing a file failed.
    IoFailure(std::io::Error),
    /// A byte-level parse via `scroll` failed (truncated buffer, usually).
    Malformed(scroll::Error),
    /// An `ar` archive did not start with `!<arch>\n`, or a member's size
    /// field failed to parse.
    MalformedArchive(String),
    /// A field of an ELF object pointed outside the bounds of its
    /// backing buffer.
    TruncatedElf(String),
    /// A relocation type this crate does not understand was encountered.
    UnsupportedRelocation(u8),
    /// A `sig_v1` signature file failed to parse.
    BadSignatureFile(String),
    /// A caller supplied an invalid argument (e.g. an out-of-range
    /// header size override).
    BadArgument(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoFailure(err) => write!(f, "io failure: {err}"),
            Error::Malformed(err) => write!(f, "malformed binary data: {err}"),
            Error::MalformedArchive(msg) => write!(f, "malformed archive: {msg}"),
            Error::TruncatedElf(msg) => write!(f, "truncated elf: {msg}"),
            Error::UnsupportedRelocation(ty) => write!(f, "unsupported relocation type: {ty}"),
            Error::BadSignatureFile(msg) => write!(f, "bad signature file: {msg}"),
            Error::BadArgument(msg) => write!(f, "bad argument: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoFailure(err) => Some(err),
            Error::Malformed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoFailure(err)
    }
}

impl From<scroll::Error> for Error {
    fn from(err: scroll::Error) -> Self {
        Error::Malformed(err)
    }
}

/// A specialized [`Result`](core::result::Result) type for this crate's
/// fallible operations.
pub type Result<T> = result::Result<T, Error>;

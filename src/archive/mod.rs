//! A minimal reader for the common (GNU/SysV) Unix archive format, as
//! produced by `ar` for static libraries (`.a` files).
//!
//! Only what's needed to walk an archive's members is implemented: the
//! `!<arch>\n` signature, the fixed 60-byte member header, the GNU
//! extended-filename table (`//`) and symbol table (`/ `, skipped), and
//! `/<decimal>` indirect long names. Thin archives, BSD-style names, and
//! write support are out of scope (see the specification's Non-goals).

use crate::error::{Error, Result};

/// The archive signature every member follows.
pub const MAGIC: &[u8; 8] = b"!<arch>\n";

const HEADER_LEN: usize = 60;
const HEADER_TERMINATOR: &[u8; 2] = b"\x60\x0A";

/// The GNU extended-filename table's own reserved identifier.
const EXTENDED_NAMES_IDENTIFIER: &str = "//";
/// The GNU archive symbol index's reserved identifier.
const SYMBOL_TABLE_IDENTIFIER: &str = "/";

/// One member of an archive: its resolved name and its data, borrowed
/// straight from the archive's backing bytes.
#[derive(Debug, Clone, Copy)]
pub struct ArMember<'a> {
    pub identifier: &'a str,
    pub data: &'a [u8],
}

/// Parses `bytes` as an archive and returns its members in order,
/// skipping the GNU symbol table (`/ `) member and resolving `//` and
/// `/<decimal>` names along the way.
pub fn members(bytes: &[u8]) -> Result<Vec<ArMember<'_>>> {
    if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
        return Err(Error::MalformedArchive("missing !<arch>\\n signature".into()));
    }

    let mut cursor = MAGIC.len();
    let mut extended_names: Option<&[u8]> = None;
    let mut out = Vec::new();

    while cursor < bytes.len() {
        // Archives can carry a single trailing newline after the last member.
        if bytes[cursor..].iter().all(|&b| b == b'\n') {
            break;
        }

        let (raw, name_field, size, data, next) = parse_header(bytes, cursor)?;
        let _ = raw;

        if name_field == EXTENDED_NAMES_IDENTIFIER {
            extended_names = Some(data);
            cursor = next;
            continue;
        }
        if name_field == SYMBOL_TABLE_IDENTIFIER || name_field == "/SYM64/" {
            cursor = next;
            continue;
        }

        let identifier = resolve_identifier(name_field, extended_names)?;
        out.push(ArMember { identifier, data });
        cursor = next;
    }

    Ok(out)
}

/// Parses one 60-byte member header starting at `cursor`, returning the
/// trimmed name field, the declared size, the member's data slice, and
/// the offset of the following header (after even-byte padding).
fn parse_header(bytes: &[u8], cursor: usize) -> Result<(&[u8], &str, usize, &[u8], usize)> {
    if cursor + HEADER_LEN > bytes.len() {
        return Err(Error::MalformedArchive(format!(
            "truncated member header at offset {cursor:#x}"
        )));
    }
    let header = &bytes[cursor..cursor + HEADER_LEN];

    let terminator = &header[58..60];
    if terminator != HEADER_TERMINATOR {
        return Err(Error::MalformedArchive(format!(
            "bad member header terminator at offset {cursor:#x}"
        )));
    }

    let name_field = trim_trailing_spaces(&header[0..16]);
    let name_field = std::str::from_utf8(name_field)
        .map_err(|_| Error::MalformedArchive("member name is not valid utf-8".into()))?;

    let size_field = trim_trailing_spaces(&header[48..58]);
    let size_str = std::str::from_utf8(size_field)
        .map_err(|_| Error::MalformedArchive("member size is not valid utf-8".into()))?;
    let size: usize = size_str
        .trim()
        .parse()
        .map_err(|_| Error::MalformedArchive(format!("bad member size {size_str:?}")))?;

    let data_start = cursor + HEADER_LEN;
    let data_end = data_start
        .checked_add(size)
        .ok_or_else(|| Error::MalformedArchive("member size overflows".into()))?;
    if data_end > bytes.len() {
        return Err(Error::MalformedArchive(format!(
            "member at offset {cursor:#x} claims {size} bytes, past end of archive"
        )));
    }
    let data = &bytes[data_start..data_end];

    // Members are padded to an even boundary with a newline byte.
    let mut next = data_end;
    if next % 2 != 0 {
        next += 1;
    }

    Ok((&header[0..16], name_field, size, data, next))
}

fn trim_trailing_spaces(field: &[u8]) -> &[u8] {
    let end = field
        .iter()
        .rposition(|&b| b != b' ')
        .map(|i| i + 1)
        .unwrap_or(0);
    &field[..end]
}

/// Resolves a raw name field to its final identifier: `name/` for
/// ordinary short names, `/<decimal>` for an offset into the extended
/// names table, or the field verbatim otherwise.
fn resolve_identifier<'a>(name_field: &'a str, extended_names: Option<&'a [u8]>) -> Result<&'a str> {
    if let Some(rest) = name_field.strip_prefix('/') {
        if let Ok(offset) = rest.parse::<usize>() {
            let table = extended_names.ok_or_else(|| {
                Error::MalformedArchive("indirect name with no preceding // table".into())
            })?;
            if offset >= table.len() {
                return Err(Error::MalformedArchive(format!(
                    "indirect name offset {offset} is out of bounds"
                )));
            }
            let end = table[offset..]
                .iter()
                .position(|&b| b == b'/' || b == b'\n')
                .map(|rel| offset + rel)
                .unwrap_or(table.len());
            return std::str::from_utf8(&table[offset..end])
                .map_err(|_| Error::MalformedArchive("indirect name is not valid utf-8".into()));
        }
    }
    Ok(name_field.strip_suffix('/').unwrap_or(name_field))
}

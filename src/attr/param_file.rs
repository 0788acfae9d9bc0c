//! Text codec for the persisted parameter file.
//!
//! One pair per line, `<id>=<value>\n`, with the id in decimal padded to
//! four digits. String attributes store their text verbatim; every other
//! type stores its little-endian bytes as lowercase hex.
//!
//! ```text
//! 0001=warehouse 7
//! 0004=40e20100
//! 0060=2a00
//! ```

use crate::attr::{AttrEntry, AttrError, AttrId, AttrType};

/// Largest binary value (in bytes) a non-string pair may decode to.
pub const MAX_BIN_SIZE: usize = 64;

/// How a value is encoded in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Str,
    Bin,
}

impl ParamKind {
    pub const fn of(ty: AttrType) -> Self {
        match ty {
            AttrType::String => ParamKind::Str,
            _ => ParamKind::Bin,
        }
    }
}

/// One parsed `id=value` pair; `value` is the raw text after `=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamPair<'a> {
    pub id: AttrId,
    pub value: &'a str,
}

const fn id_digits(id: AttrId) -> usize {
    if id >= 10000 { 5 } else { 4 }
}

/// Worst-case size of the parameter file generated from `entries`.
pub const fn file_bytes(entries: &[AttrEntry]) -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < entries.len() {
        let e = &entries[i];
        if e.is_saved() {
            let value = match e.ty {
                AttrType::String => e.size - 1,
                _ => 2 * e.size,
            };
            total += id_digits(e.id) + 1 + value + 1;
        }
        i += 1;
    }
    total
}

/// Appends one pair to `out`.
///
/// Fails with `InvalidArgument` if a string value contains a line break or
/// binary data exceeds [`MAX_BIN_SIZE`], and with `Io` if `out` is full.
pub fn append<const FS: usize>(
    out: &mut heapless::Vec<u8, FS>,
    id: AttrId,
    kind: ParamKind,
    data: &[u8],
) -> Result<(), AttrError> {
    let mut digits = [0u8; 5];
    let width = id_digits(id);
    let mut n = id;
    for d in digits[..width].iter_mut().rev() {
        *d = b'0' + (n % 10) as u8;
        n /= 10;
    }
    push(out, &digits[..width])?;
    push(out, b"=")?;

    match kind {
        ParamKind::Str => {
            if data.iter().any(|b| *b == b'\n' || *b == b'\r') {
                return Err(AttrError::InvalidArgument);
            }
            push(out, data)?;
        }
        ParamKind::Bin => {
            if data.len() > MAX_BIN_SIZE {
                return Err(AttrError::InvalidArgument);
            }
            for byte in data {
                push(out, &base16::encode_byte(*byte, base16::EncodeLower))?;
            }
        }
    }
    push(out, b"\n")
}

fn push<const FS: usize>(out: &mut heapless::Vec<u8, FS>, bytes: &[u8]) -> Result<(), AttrError> {
    out.extend_from_slice(bytes).map_err(|_| AttrError::Io)
}

fn parse_line(line: &str) -> Result<ParamPair<'_>, AttrError> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let (id, value) = line.split_once('=').ok_or(AttrError::Parse)?;
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AttrError::Parse);
    }
    let id = id.parse::<AttrId>().map_err(|_| AttrError::Parse)?;
    Ok(ParamPair { id, value })
}

/// Iterates the pairs of a parameter file, skipping blank lines.
pub fn pairs(text: &str) -> impl Iterator<Item = Result<ParamPair<'_>, AttrError>> {
    text.split('\n')
        .filter(|line| !line.trim_end_matches('\r').is_empty())
        .map(parse_line)
}

/// Checks every line of `text` and returns the number of pairs.
pub fn validate_file(text: &str) -> Result<usize, AttrError> {
    let mut count = 0;
    for pair in pairs(text) {
        pair?;
        count += 1;
    }
    Ok(count)
}

/// [`validate_file`] over raw bytes.
pub fn validate_bytes(bytes: &[u8]) -> Result<usize, AttrError> {
    let text = core::str::from_utf8(bytes).map_err(|_| AttrError::Parse)?;
    validate_file(text)
}

/// Decodes a hex value into `out`, returning the byte count.
pub fn decode_hex(text: &str, out: &mut [u8]) -> Result<usize, AttrError> {
    let n = text.len() / 2;
    if text.is_empty() || text.len() % 2 != 0 || n > out.len() {
        return Err(AttrError::InvalidArgument);
    }
    base16::decode_slice(text.as_bytes(), &mut out[..n]).map_err(|_| AttrError::InvalidArgument)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::test_support::{TEST_TABLE, TEST_TABLE_FILE_BYTES};

    #[test]
    fn append_formats_strings_and_hex() {
        let mut out: heapless::Vec<u8, 64> = heapless::Vec::new();
        append(&mut out, 1, ParamKind::Str, b"warehouse 7").unwrap();
        append(&mut out, 60, ParamKind::Bin, &42u16.to_le_bytes()).unwrap();
        append(&mut out, 12345, ParamKind::Bin, &[0xAB]).unwrap();
        assert_eq!(&out[..], b"0001=warehouse 7\n0060=2a00\n12345=ab\n");
    }

    #[test]
    fn append_rejects_line_breaks_and_overflow() {
        let mut out: heapless::Vec<u8, 64> = heapless::Vec::new();
        assert_eq!(
            append(&mut out, 1, ParamKind::Str, b"a\nb"),
            Err(AttrError::InvalidArgument)
        );

        let mut tiny: heapless::Vec<u8, 6> = heapless::Vec::new();
        assert_eq!(append(&mut tiny, 1, ParamKind::Bin, &[1, 2]), Err(AttrError::Io));
    }

    #[test]
    fn pairs_parse_ids_and_raw_values() {
        let text = "0001=a=b\r\n\n0060=2a00\n";
        let mut it = pairs(text);
        assert_eq!(it.next(), Some(Ok(ParamPair { id: 1, value: "a=b" })));
        assert_eq!(it.next(), Some(Ok(ParamPair { id: 60, value: "2a00" })));
        assert_eq!(it.next(), None);
        assert_eq!(validate_file(text), Ok(2));
    }

    #[test]
    fn empty_values_and_files_are_valid() {
        assert_eq!(validate_file(""), Ok(0));
        assert_eq!(validate_file("0001=\n"), Ok(1));
    }

    #[test]
    fn malformed_lines_are_parse_errors() {
        assert_eq!(validate_file("0001\n"), Err(AttrError::Parse));
        assert_eq!(validate_file("x1=2\n"), Err(AttrError::Parse));
        assert_eq!(validate_file("=2\n"), Err(AttrError::Parse));
        assert_eq!(validate_file("99999=2\n"), Err(AttrError::Parse));
        assert_eq!(validate_bytes(&[0xFF, b'=', b'1']), Err(AttrError::Parse));
    }

    #[test]
    fn hex_values_decode() {
        let mut out = [0u8; 4];
        assert_eq!(decode_hex("2a00", &mut out), Ok(2));
        assert_eq!(&out[..2], &[0x2a, 0x00]);
        assert_eq!(decode_hex("2a0", &mut out), Err(AttrError::InvalidArgument));
        assert_eq!(decode_hex("zz", &mut out), Err(AttrError::InvalidArgument));
        assert_eq!(decode_hex("0102030405", &mut out), Err(AttrError::InvalidArgument));
        assert_eq!(decode_hex("", &mut out), Err(AttrError::InvalidArgument));
    }

    #[test]
    fn file_bytes_bounds_a_full_save() {
        let mut out: heapless::Vec<u8, 1024> = heapless::Vec::new();
        for e in TEST_TABLE.iter().filter(|e| e.is_saved()) {
            let filler = [b'x'; 64];
            let data: &[u8] = match e.ty {
                AttrType::String => &filler[..e.size - 1],
                _ => &filler[..e.size],
            };
            append(&mut out, e.id, ParamKind::of(e.ty), data).unwrap();
        }
        assert_eq!(out.len(), TEST_TABLE_FILE_BYTES);
    }
}

use core::fmt;

use crate::attr::{AttrEntry, AttrType, values};

/// Display adapter rendering one entry as a "show" line.
///
/// ```text
/// [060] networkId                           42
/// [001] location                            'dock 4'
/// ```
#[derive(Clone, Copy)]
pub struct Shown<'a> {
    pub entry: &'a AttrEntry,
    pub bytes: &'a [u8],
}

impl<'a> Shown<'a> {
    pub fn new(entry: &'a AttrEntry, bytes: &'a [u8]) -> Self {
        Self { entry, bytes }
    }

    fn enum_name(&self, v: i32) -> &'static str {
        self.entry.enum_str.map_or("", |f| f(v))
    }
}

impl fmt::Display for Shown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = self.entry;
        write!(f, "[{:03}] {:<35} ", e.id, e.name)?;
        match e.ty {
            AttrType::Bool => {
                let b = self.bytes[0] != 0;
                write!(f, "{}", if b { "true" } else { "false" })
            }
            AttrType::U8 | AttrType::U16 | AttrType::U32 => {
                let mut b = [0u8; 4];
                b[..self.bytes.len()].copy_from_slice(self.bytes);
                let v = u32::from_le_bytes(b);
                write!(f, "{} {}", v, self.enum_name(v as i32))
            }
            AttrType::S8 | AttrType::S16 | AttrType::S32 => {
                let v = values::sign_extend(self.bytes) as i32;
                write!(f, "{} {}", v, self.enum_name(v))
            }
            AttrType::Float => {
                let mut b = [0u8; 4];
                b.copy_from_slice(self.bytes);
                write!(f, "{}", f32::from_le_bytes(b))
            }
            AttrType::String => {
                let text = values::text_of(self.bytes);
                match core::str::from_utf8(text) {
                    Ok(s) => write!(f, "'{}'", s),
                    Err(_) => write!(f, "'{:02x?}'", text),
                }
            }
            AttrType::U64 | AttrType::S64 => {
                let mut b = [0u8; 8];
                b.copy_from_slice(self.bytes);
                let v = u64::from_le_bytes(b);
                write!(f, "0x{:08x} {:08x}", (v >> 32) as u32, v as u32)
            }
            AttrType::ByteArray | AttrType::Any => write!(f, "size: {}", e.size),
        }
    }
}

impl fmt::Debug for Shown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Logs the show line for an entry.
pub(crate) fn log_show(entry: &AttrEntry, bytes: &[u8]) {
    log::info!("{}", Shown::new(entry, bytes));
    if entry.ty == AttrType::ByteArray {
        log::debug!("{:02x?}", bytes);
    }
}

use bitflags::bitflags;

use crate::attr::AttrError;

/// Stable numeric attribute identifier.
pub type AttrId = u16;

/// Storage type of an attribute.
///
/// `Any` is only meaningful as the requested type of a raw `set`, where it
/// matches every entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttrType {
    Any,
    Bool,
    U8,
    U16,
    U32,
    U64,
    S8,
    S16,
    S32,
    S64,
    Float,
    String,
    ByteArray,
}

impl AttrType {
    /// Native byte width for fixed-size types.
    pub const fn native_size(&self) -> Option<usize> {
        match self {
            AttrType::Bool | AttrType::U8 | AttrType::S8 => Some(1),
            AttrType::U16 | AttrType::S16 => Some(2),
            AttrType::U32 | AttrType::S32 | AttrType::Float => Some(4),
            AttrType::U64 | AttrType::S64 => Some(8),
            AttrType::Any | AttrType::String | AttrType::ByteArray => None,
        }
    }

    pub const fn is_unsigned(&self) -> bool {
        matches!(
            self,
            AttrType::U8 | AttrType::U16 | AttrType::U32 | AttrType::U64
        )
    }

    pub const fn is_signed(&self) -> bool {
        matches!(
            self,
            AttrType::S8 | AttrType::S16 | AttrType::S32 | AttrType::S64
        )
    }

    /// Inclusive range representable by an integer type, widened.
    pub(crate) const fn integer_range(&self) -> Option<(i128, i128)> {
        match self {
            AttrType::U8 => Some((0, u8::MAX as i128)),
            AttrType::U16 => Some((0, u16::MAX as i128)),
            AttrType::U32 => Some((0, u32::MAX as i128)),
            AttrType::U64 => Some((0, u64::MAX as i128)),
            AttrType::S8 => Some((i8::MIN as i128, i8::MAX as i128)),
            AttrType::S16 => Some((i16::MIN as i128, i16::MAX as i128)),
            AttrType::S32 => Some((i32::MIN as i128, i32::MAX as i128)),
            AttrType::S64 => Some((i64::MIN as i128, i64::MAX as i128)),
            _ => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            AttrType::Any => "any",
            AttrType::Bool => "bool",
            AttrType::U8 => "u8",
            AttrType::U16 => "u16",
            AttrType::U32 => "u32",
            AttrType::U64 => "u64",
            AttrType::S8 => "i8",
            AttrType::S16 => "i16",
            AttrType::S32 => "i32",
            AttrType::S64 => "i64",
            AttrType::Float => "float",
            AttrType::String => "string",
            AttrType::ByteArray => "byte array",
        }
    }
}

/// One bound of an entry's range.
///
/// The variant records how the bound was declared; validators read it
/// through the view matching the entry's type, so a bound declared as
/// `U(0)` reads as `0` for signed entries and as `0.0` for floats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limit {
    U(u32),
    S(i32),
    F(f32),
}

impl Limit {
    pub const fn bits(&self) -> u32 {
        match *self {
            Limit::U(v) => v,
            Limit::S(v) => v as u32,
            Limit::F(v) => v.to_bits(),
        }
    }

    pub const fn as_unsigned(&self) -> u32 {
        self.bits()
    }

    pub const fn as_signed(&self) -> i32 {
        self.bits() as i32
    }

    pub fn as_float(&self) -> f32 {
        f32::from_bits(self.bits())
    }
}

bitflags! {
    /// Capability flags of an attribute entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u8 {
        /// Persisted to the parameter file.
        const SAVABLE = 0b0000_0001;
        /// Settable through the external `set` path.
        const WRITABLE = 0b0000_0010;
        /// Gettable through the external `get` path.
        const READABLE = 0b0000_0100;
        /// Writable only while the global lock attribute is false.
        const LOCKABLE = 0b0000_1000;
        /// Id is listed in change broadcasts.
        const BROADCAST = 0b0001_0000;
        /// Kept for id stability only; excluded from save and dump.
        const DEPRECATED = 0b0010_0000;
    }
}

/// A candidate value handed to a validator.
///
/// Integers are carried widened so that narrowing to the entry's width is
/// checked rather than truncated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Bool(bool),
    Unsigned(u64),
    Signed(i64),
    Float(f32),
    /// String contents without terminator.
    Text(&'a [u8]),
    Bytes(&'a [u8]),
}

impl<'a> Value<'a> {
    /// Decodes raw little-endian bytes according to the entry type.
    ///
    /// Integer inputs may be 1 to 8 bytes wide and are widened (sign-extended
    /// for signed entries). Strings end at the first NUL.
    pub fn from_raw(ty: AttrType, raw: &'a [u8]) -> Result<Self, AttrError> {
        match ty {
            AttrType::String => {
                let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
                Ok(Value::Text(&raw[..end]))
            }
            AttrType::ByteArray => Ok(Value::Bytes(raw)),
            AttrType::Float => {
                let bytes: [u8; 4] = raw.try_into().map_err(|_| AttrError::InvalidArgument)?;
                Ok(Value::Float(f32::from_le_bytes(bytes)))
            }
            AttrType::Bool => match widen_unsigned(raw)? {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                _ => Err(AttrError::InvalidArgument),
            },
            t if t.is_signed() => Ok(Value::Signed(widen_signed(raw)?)),
            t if t.is_unsigned() => Ok(Value::Unsigned(widen_unsigned(raw)?)),
            _ => Err(AttrError::InvalidArgument),
        }
    }

    /// Widened integer view, if this is an integer or bool candidate.
    pub(crate) fn as_integer(&self) -> Option<i128> {
        match *self {
            Value::Bool(b) => Some(b as i128),
            Value::Unsigned(v) => Some(v as i128),
            Value::Signed(v) => Some(v as i128),
            _ => None,
        }
    }
}

fn widen_unsigned(raw: &[u8]) -> Result<u64, AttrError> {
    if raw.is_empty() || raw.len() > 8 {
        return Err(AttrError::InvalidArgument);
    }
    let mut bytes = [0u8; 8];
    bytes[..raw.len()].copy_from_slice(raw);
    Ok(u64::from_le_bytes(bytes))
}

fn widen_signed(raw: &[u8]) -> Result<i64, AttrError> {
    let unsigned = widen_unsigned(raw)?;
    let shift = 64 - 8 * raw.len() as u32;
    Ok(((unsigned << shift) as i64) >> shift)
}

/// Result of a validator run indicating whether the modified bit must be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteResult<R> {
    /// Stored bytes changed (or a control point fired).
    Dirty(R),
    /// Nothing was written.
    Clean(R),
}

impl<R> WriteResult<R> {
    #[inline]
    pub fn is_dirty(&self) -> bool {
        matches!(self, WriteResult::Dirty(_))
    }

    #[inline]
    pub fn into_inner(self) -> R {
        match self {
            WriteResult::Dirty(r) | WriteResult::Clean(r) => r,
        }
    }
}

/// Selection of entries for [`prepare_then_dump`](crate::attr::AttributeStore::prepare_then_dump).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DumpKind {
    /// Every readable, non-deprecated entry.
    Rw,
    /// Readable, non-deprecated and writable.
    W,
    /// Readable, non-deprecated and read-only.
    Ro,
}

impl DumpKind {
    pub fn includes(&self, flags: Flags) -> bool {
        let visible = flags.contains(Flags::READABLE) && !flags.contains(Flags::DEPRECATED);
        match self {
            DumpKind::Rw => visible,
            DumpKind::W => visible && flags.contains(Flags::WRITABLE),
            DumpKind::Ro => visible && !flags.contains(Flags::WRITABLE),
        }
    }
}

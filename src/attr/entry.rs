use crate::attr::{
    AttrError, AttrId, AttrType, Flags, Limit, RefreshView, Validator,
};

/// Hook run under the engine lock before a read to refresh a live value.
pub type PrepareFn = fn(&mut RefreshView<'_>) -> Result<(), AttrError>;

/// Maps an enumerated value to a display name for logs.
pub type EnumStrFn = fn(i32) -> &'static str;

/// Factory default of an entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Bool(bool),
    Unsigned(u64),
    Signed(i64),
    Float(f32),
    Str(&'static str),
    Bytes(&'static [u8]),
}

impl DefaultValue {
    /// Writes the default into a zeroed slot of the entry's size.
    pub(crate) fn encode(&self, slot: &mut [u8]) {
        slot.fill(0);
        let n = slot.len();
        match *self {
            DefaultValue::Bool(b) => slot[0] = b as u8,
            DefaultValue::Unsigned(v) => slot.copy_from_slice(&v.to_le_bytes()[..n]),
            DefaultValue::Signed(v) => slot.copy_from_slice(&v.to_le_bytes()[..n]),
            DefaultValue::Float(v) => slot.copy_from_slice(&v.to_le_bytes()),
            DefaultValue::Str(s) => slot[..s.len()].copy_from_slice(s.as_bytes()),
            DefaultValue::Bytes(b) => slot.copy_from_slice(b),
        }
    }
}

/// Static descriptor of one attribute.
///
/// Entries are built with the `const` constructors below and chained
/// modifiers, then given their id and name by [`attr_table!`](crate::attr_table).
#[derive(Clone, Copy)]
pub struct AttrEntry {
    pub id: AttrId,
    pub name: &'static str,
    pub ty: AttrType,
    /// Storage width in bytes; strings include the terminator.
    pub size: usize,
    pub default: DefaultValue,
    pub flags: Flags,
    pub validator: Validator,
    pub prepare: Option<PrepareFn>,
    pub enum_str: Option<EnumStrFn>,
    pub min: Limit,
    pub max: Limit,
}

impl core::fmt::Debug for AttrEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AttrEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("size", &self.size)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl AttrEntry {
    const fn base(ty: AttrType, size: usize, default: DefaultValue) -> Self {
        Self {
            id: 0,
            name: "",
            ty,
            size,
            default,
            flags: Flags::READABLE,
            validator: Validator::Stateful,
            prepare: None,
            enum_str: None,
            min: Limit::U(0),
            max: Limit::U(0),
        }
    }

    pub const fn boolean(default: bool) -> Self {
        Self::base(AttrType::Bool, 1, DefaultValue::Bool(default))
    }

    pub const fn u8(default: u8) -> Self {
        Self::base(AttrType::U8, 1, DefaultValue::Unsigned(default as u64))
    }

    pub const fn u16(default: u16) -> Self {
        Self::base(AttrType::U16, 2, DefaultValue::Unsigned(default as u64))
    }

    pub const fn u32(default: u32) -> Self {
        Self::base(AttrType::U32, 4, DefaultValue::Unsigned(default as u64))
    }

    pub const fn u64(default: u64) -> Self {
        Self::base(AttrType::U64, 8, DefaultValue::Unsigned(default))
    }

    pub const fn i8(default: i8) -> Self {
        Self::base(AttrType::S8, 1, DefaultValue::Signed(default as i64))
    }

    pub const fn i16(default: i16) -> Self {
        Self::base(AttrType::S16, 2, DefaultValue::Signed(default as i64))
    }

    pub const fn i32(default: i32) -> Self {
        Self::base(AttrType::S32, 4, DefaultValue::Signed(default as i64))
    }

    pub const fn i64(default: i64) -> Self {
        Self::base(AttrType::S64, 8, DefaultValue::Signed(default))
    }

    pub const fn float(default: f32) -> Self {
        Self::base(AttrType::Float, 4, DefaultValue::Float(default))
    }

    /// String of at most `max` bytes; storage is `max + 1`.
    pub const fn string(max: u32, default: &'static str) -> Self {
        let mut e = Self::base(
            AttrType::String,
            max as usize + 1,
            DefaultValue::Str(default),
        );
        e.max = Limit::U(max);
        e
    }

    /// Fixed byte array sized by its default.
    pub const fn bytes(default: &'static [u8]) -> Self {
        Self::base(AttrType::ByteArray, default.len(), DefaultValue::Bytes(default))
    }

    pub const fn with_id(mut self, id: AttrId, name: &'static str) -> Self {
        self.id = id;
        self.name = name;
        self
    }

    /// Replaces all capability flags.
    pub const fn flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    pub const fn savable(mut self) -> Self {
        self.flags = self.flags.union(Flags::SAVABLE);
        self
    }

    pub const fn writable(mut self) -> Self {
        self.flags = self.flags.union(Flags::WRITABLE);
        self
    }

    pub const fn lockable(mut self) -> Self {
        self.flags = self.flags.union(Flags::LOCKABLE);
        self
    }

    pub const fn broadcast(mut self) -> Self {
        self.flags = self.flags.union(Flags::BROADCAST);
        self
    }

    pub const fn deprecated(mut self) -> Self {
        self.flags = self.flags.union(Flags::DEPRECATED);
        self
    }

    /// Hidden from `get` and dumps.
    pub const fn unreadable(mut self) -> Self {
        self.flags = self.flags.difference(Flags::READABLE);
        self
    }

    /// Shorthand for savable + writable.
    pub const fn rw(self) -> Self {
        self.savable().writable()
    }

    pub const fn range_u(mut self, min: u32, max: u32) -> Self {
        self.min = Limit::U(min);
        self.max = Limit::U(max);
        self
    }

    pub const fn range_i(mut self, min: i32, max: i32) -> Self {
        self.min = Limit::S(min);
        self.max = Limit::S(max);
        self
    }

    pub const fn range_f(mut self, min: f32, max: f32) -> Self {
        self.min = Limit::F(min);
        self.max = Limit::F(max);
        self
    }

    /// Minimum accepted string length.
    pub const fn min_len(mut self, min: u32) -> Self {
        self.min = Limit::U(min);
        self
    }

    pub const fn control_point(mut self) -> Self {
        self.validator = Validator::ControlPoint;
        self
    }

    pub const fn custom(mut self, rule: fn(&crate::attr::Value<'_>) -> bool) -> Self {
        self.validator = Validator::Custom(rule);
        self
    }

    pub const fn prepare(mut self, hook: PrepareFn) -> Self {
        self.prepare = Some(hook);
        self
    }

    pub const fn enum_str(mut self, hook: EnumStrFn) -> Self {
        self.enum_str = Some(hook);
        self
    }

    #[inline]
    pub const fn is(&self, flag: Flags) -> bool {
        self.flags.contains(flag)
    }

    /// Included in the persisted parameter file.
    #[inline]
    pub const fn is_saved(&self) -> bool {
        self.is(Flags::SAVABLE) && !self.is(Flags::DEPRECATED)
    }
}

/// Declares a static attribute table, its entry count and an id module.
///
/// Rows are `id name => entry`, in ascending id order. For each row an id
/// constant named after the entry in upper snake case is generated, and the
/// table's value and parameter file byte budgets are computed as
/// `<TABLE>_VALUE_BYTES` and `<TABLE>_FILE_BYTES`.
///
/// ```
/// use embedded_attr::{attr_table, attr::AttrEntry};
///
/// attr_table! {
///     pub static DEMO: [_; DEMO_COUNT], mod demo_ids;
///     1 lock => AttrEntry::boolean(false).rw(),
///     7 networkId => AttrEntry::u16(0).rw().broadcast().range_u(0, 65535),
/// }
///
/// assert_eq!(DEMO_COUNT, 2);
/// assert_eq!(demo_ids::NETWORK_ID, 7);
/// assert_eq!(DEMO[1].name, "networkId");
/// assert_eq!(DEMO_VALUE_BYTES, 3);
/// ```
#[macro_export]
macro_rules! attr_table {
    (
        $(#[$meta:meta])*
        $vis:vis static $table:ident: [_; $count:ident], mod $ids:ident;
        $( $id:literal $name:ident => $entry:expr ),+ $(,)?
    ) => {
        $crate::paste::paste! {
            $vis const $count: usize = [$(stringify!($name)),+].len();

            #[allow(non_upper_case_globals)]
            const [<__ $table _ENTRIES>]: [$crate::attr::AttrEntry; $count] = [
                $( ($entry).with_id($id, stringify!($name)), )+
            ];

            $(#[$meta])*
            $vis static $table: [$crate::attr::AttrEntry; $count] = [<__ $table _ENTRIES>];

            /// Bytes of live value storage the table needs.
            $vis const [<$table _VALUE_BYTES>]: usize =
                $crate::attr::value_bytes(&[<__ $table _ENTRIES>]);

            /// Worst-case size of the table's parameter file.
            $vis const [<$table _FILE_BYTES>]: usize =
                $crate::attr::param_file::file_bytes(&[<__ $table _ENTRIES>]);

            /// Attribute id constants.
            $vis mod $ids {
                $( pub const [<$name:snake:upper>]: $crate::attr::AttrId = $id; )+
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_size_and_type() {
        assert_eq!(AttrEntry::u16(3).size, 2);
        assert_eq!(AttrEntry::i64(-1).ty, AttrType::S64);
        assert_eq!(AttrEntry::string(32, "").size, 33);
        assert_eq!(AttrEntry::bytes(&[0; 16]).size, 16);
    }

    #[test]
    fn modifiers_accumulate_flags() {
        let e = AttrEntry::u8(0).rw().lockable().broadcast();
        assert!(e.is(Flags::SAVABLE | Flags::WRITABLE | Flags::READABLE));
        assert!(e.is(Flags::LOCKABLE | Flags::BROADCAST));
        assert!(!e.is(Flags::DEPRECATED));
        assert!(e.is_saved());

        let hidden = AttrEntry::bytes(&[0; 4]).rw().unreadable();
        assert!(!hidden.is(Flags::READABLE));
        assert!(!AttrEntry::u8(0).rw().deprecated().is_saved());
    }

    #[test]
    fn defaults_encode_little_endian() {
        let mut slot = [0xAAu8; 2];
        DefaultValue::Unsigned(0x1234).encode(&mut slot);
        assert_eq!(slot, [0x34, 0x12]);

        let mut slot = [0xAAu8; 1];
        DefaultValue::Signed(-2).encode(&mut slot);
        assert_eq!(slot, [0xFE]);

        let mut slot = [0xAAu8; 5];
        DefaultValue::Str("ab").encode(&mut slot);
        assert_eq!(slot, [b'a', b'b', 0, 0, 0]);
    }
}

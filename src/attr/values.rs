use crate::attr::{AttrEntry, AttrType, RefreshView, Schema, Value};

/// Total live value bytes needed by `entries`.
pub const fn value_bytes(entries: &[AttrEntry]) -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < entries.len() {
        total += entries[i].size;
        i += 1;
    }
    total
}

/// Live value storage for every entry of a schema.
///
/// Entries are laid out back to back in table order inside `TS` bytes.
pub(crate) struct ValueTable<const N: usize, const TS: usize> {
    offsets: [usize; N],
    bytes: [u8; TS],
}

impl<const N: usize, const TS: usize> ValueTable<N, TS> {
    pub(crate) fn new(schema: &Schema) -> Self {
        assert_eq!(
            schema.len(),
            N,
            "Table has {} entries but the store is sized for {}",
            schema.len(),
            N
        );
        let needed = value_bytes(schema.entries());
        assert!(
            needed <= TS,
            "Attribute values need {} bytes but value_bytes is {}",
            needed,
            TS
        );

        let mut offsets = [0; N];
        let mut offset = 0;
        for (i, e) in schema.iter() {
            offsets[i] = offset;
            offset += e.size;
        }
        Self {
            offsets,
            bytes: [0; TS],
        }
    }

    #[inline]
    fn span(&self, schema: &Schema, index: usize) -> (usize, usize) {
        let start = self.offsets[index];
        (start, start + schema.entry_at(index).size)
    }

    pub(crate) fn slot(&self, schema: &Schema, index: usize) -> &[u8] {
        let (start, end) = self.span(schema, index);
        &self.bytes[start..end]
    }

    pub(crate) fn slot_mut(&mut self, schema: &Schema, index: usize) -> &mut [u8] {
        let (start, end) = self.span(schema, index);
        &mut self.bytes[start..end]
    }

    /// Startup: clears all storage then writes every default.
    pub(crate) fn initialize(&mut self, schema: &Schema) {
        self.bytes.fill(0);
        self.factory_reset(schema);
    }

    /// Copies each entry's default over its live value, regardless of flags.
    pub(crate) fn factory_reset(&mut self, schema: &Schema) {
        for index in 0..schema.len() {
            self.reset_entry(schema, index);
        }
    }

    pub(crate) fn reset_entry(&mut self, schema: &Schema, index: usize) {
        let default = schema.entry_at(index).default;
        default.encode(self.slot_mut(schema, index));
    }

    pub(crate) fn refresh_view<'a>(&'a mut self, schema: &Schema, target: usize) -> RefreshView<'a> {
        RefreshView::new(*schema, &self.offsets, &mut self.bytes, target)
    }
}

/// Typed view of a stored value.
pub fn decode<'a>(entry: &AttrEntry, slot: &'a [u8]) -> Value<'a> {
    match entry.ty {
        AttrType::Bool => Value::Bool(slot[0] != 0),
        AttrType::Float => {
            let mut b = [0u8; 4];
            b.copy_from_slice(slot);
            Value::Float(f32::from_le_bytes(b))
        }
        AttrType::String => Value::Text(text_of(slot)),
        AttrType::ByteArray => Value::Bytes(slot),
        ty if ty.is_signed() => Value::Signed(sign_extend(slot)),
        _ => {
            let mut b = [0u8; 8];
            b[..slot.len()].copy_from_slice(slot);
            Value::Unsigned(u64::from_le_bytes(b))
        }
    }
}

/// Stored string contents up to the terminator.
pub(crate) fn text_of(slot: &[u8]) -> &[u8] {
    let end = slot.iter().position(|b| *b == 0).unwrap_or(slot.len());
    &slot[..end]
}

pub(crate) fn sign_extend(slot: &[u8]) -> i64 {
    let mut b = [0u8; 8];
    b[..slot.len()].copy_from_slice(slot);
    let shift = 64 - 8 * slot.len() as u32;
    (i64::from_le_bytes(b) << shift) >> shift
}

/// Bytes written to the parameter file for an entry.
pub(crate) fn file_payload<'a>(entry: &AttrEntry, slot: &'a [u8]) -> &'a [u8] {
    match entry.ty {
        AttrType::String => text_of(slot),
        _ => slot,
    }
}

/// Copies a stored value into `out` the way `get` reports it.
///
/// Signed values are widened to 64 bits first so narrower reads of
/// negative numbers keep their sign. `out` is zeroed before copying.
pub(crate) fn copy_out(entry: &AttrEntry, slot: &[u8], out: &mut [u8]) -> usize {
    out.fill(0);
    if entry.ty.is_signed() {
        let wide = sign_extend(slot).to_le_bytes();
        let n = out.len().min(wide.len());
        out[..n].copy_from_slice(&wide[..n]);
        n
    } else {
        let n = out.len().min(slot.len());
        out[..n].copy_from_slice(&slot[..n]);
        n
    }
}

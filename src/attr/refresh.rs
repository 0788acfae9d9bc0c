use crate::attr::{
    AttrError, AttrId, Schema, Value, validator, values,
};

/// View handed to prepare hooks while the engine lock is held.
///
/// Writes go through the entry's validator but never mark the entry
/// modified: a refreshed status value is neither persisted nor broadcast.
/// Hooks must not call back into the engine.
pub struct RefreshView<'a> {
    schema: Schema,
    offsets: &'a [usize],
    bytes: &'a mut [u8],
    target: usize,
}

impl core::fmt::Debug for RefreshView<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RefreshView")
            .field("target", &self.target_id())
            .finish_non_exhaustive()
    }
}

impl<'a> RefreshView<'a> {
    pub(crate) fn new(
        schema: Schema,
        offsets: &'a [usize],
        bytes: &'a mut [u8],
        target: usize,
    ) -> Self {
        Self {
            schema,
            offsets,
            bytes,
            target,
        }
    }

    /// Id of the entry being read.
    pub fn target_id(&self) -> AttrId {
        self.schema.entry_at(self.target).id
    }

    fn span(&self, index: usize) -> (usize, usize) {
        let start = self.offsets[index];
        (start, start + self.schema.entry_at(index).size)
    }

    /// Current value of any entry.
    pub fn read(&self, id: AttrId) -> Result<Value<'_>, AttrError> {
        let (index, entry) = self.schema.locate(id)?;
        let (start, end) = self.span(index);
        Ok(values::decode(entry, &self.bytes[start..end]))
    }

    /// Validates and stores `value` without marking the entry modified.
    pub fn write(&mut self, id: AttrId, value: Value<'_>) -> Result<(), AttrError> {
        let (index, entry) = self.schema.locate(id)?;
        let (start, end) = self.span(index);
        validator::validate(entry, &mut self.bytes[start..end], &value, true).map(|_| ())
    }

    /// Writes the target entry.
    pub fn refresh(&mut self, value: Value<'_>) -> Result<(), AttrError> {
        self.write(self.target_id(), value)
    }
}

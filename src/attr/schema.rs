use crate::attr::{AttrEntry, AttrError, AttrId, AttrType, DefaultValue};

/// Read-only view over a static attribute table sorted by id.
///
/// Lookups binary-search the table, so sparse id spaces cost nothing.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    entries: &'static [AttrEntry],
}

impl Schema {
    /// Wraps a table after checking its layout invariants.
    ///
    /// # Panics
    /// Panics if ids are not strictly ascending, if a string entry's size is
    /// not `max + 1`, if a default does not fit its entry, or if an entry is
    /// declared with type `Any`.
    pub fn new(entries: &'static [AttrEntry]) -> Self {
        for (i, e) in entries.iter().enumerate() {
            if i > 0 {
                assert!(
                    entries[i - 1].id < e.id,
                    "Attribute ids must be strictly ascending: {} then {}",
                    entries[i - 1].id,
                    e.id
                );
            }
            assert!(e.ty != AttrType::Any, "Attribute {} has no concrete type", e.id);
            if e.ty == AttrType::String {
                assert_eq!(
                    e.size,
                    e.max.as_unsigned() as usize + 1,
                    "String attribute {} size must be max + 1",
                    e.id
                );
            }
            if let Some(native) = e.ty.native_size() {
                assert_eq!(e.size, native, "Attribute {} size does not match its type", e.id);
            }
            let fits = match e.default {
                DefaultValue::Str(s) => s.len() < e.size,
                DefaultValue::Bytes(b) => b.len() == e.size,
                _ => true,
            };
            assert!(fits, "Default of attribute {} does not fit its storage", e.id);
        }
        Self { entries }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn entries(&self) -> &'static [AttrEntry] {
        self.entries
    }

    /// Index of the entry with `id`.
    pub fn map(&self, id: AttrId) -> Option<usize> {
        self.entries.binary_search_by_key(&id, |e| e.id).ok()
    }

    /// Index and entry for `id`, or `NotFound`.
    pub fn locate(&self, id: AttrId) -> Result<(usize, &'static AttrEntry), AttrError> {
        let index = self.map(id).ok_or(AttrError::NotFound)?;
        Ok((index, &self.entries[index]))
    }

    pub fn entry(&self, id: AttrId) -> Option<&'static AttrEntry> {
        self.map(id).map(|i| &self.entries[i])
    }

    #[inline]
    pub fn entry_at(&self, index: usize) -> &'static AttrEntry {
        &self.entries[index]
    }

    /// Position of `entry` within this table.
    ///
    /// # Panics
    /// Panics if `entry` does not belong to this table.
    pub fn index_of(&self, entry: &AttrEntry) -> usize {
        let base = self.entries.as_ptr() as usize;
        let addr = entry as *const AttrEntry as usize;
        let offset = addr.wrapping_sub(base) / core::mem::size_of::<AttrEntry>();
        assert!(
            addr >= base && offset < self.entries.len(),
            "Entry is not part of this table"
        );
        offset
    }

    /// Id of the entry called `name`.
    pub fn get_id(&self, name: &str) -> Option<AttrId> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &'static AttrEntry)> {
        self.entries.iter().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::test_support::{TEST_TABLE, test_ids};

    #[test]
    fn map_finds_sparse_ids() {
        let schema = Schema::new(&TEST_TABLE);
        assert_eq!(schema.map(test_ids::LOCK), Some(0));
        assert_eq!(schema.entry(test_ids::NETWORK_ID).map(|e| e.name), Some("networkId"));
        assert_eq!(schema.map(0), None);
        assert_eq!(schema.map(59), None);
        assert_eq!(schema.map(u16::MAX), None);
    }

    #[test]
    fn locate_distinguishes_missing_ids() {
        let schema = Schema::new(&TEST_TABLE);
        assert!(schema.locate(test_ids::LABEL).is_ok());
        assert_eq!(schema.locate(9999).unwrap_err(), AttrError::NotFound);
    }

    #[test]
    fn index_of_round_trips() {
        let schema = Schema::new(&TEST_TABLE);
        for (i, e) in schema.iter() {
            assert_eq!(schema.index_of(e), i);
        }
    }

    #[test]
    #[should_panic(expected = "Entry is not part of this table")]
    fn index_of_rejects_foreign_entry() {
        let schema = Schema::new(&TEST_TABLE);
        let foreign = AttrEntry::u8(0);
        schema.index_of(&foreign);
    }

    #[test]
    fn get_id_by_name() {
        let schema = Schema::new(&TEST_TABLE);
        assert_eq!(schema.get_id("networkId"), Some(test_ids::NETWORK_ID));
        assert_eq!(schema.get_id("nope"), None);
    }

    #[test]
    #[should_panic(expected = "Attribute ids must be strictly ascending: 5 then 5")]
    fn duplicate_ids_panic() {
        static DUP: [AttrEntry; 2] = [
            AttrEntry::u8(0).with_id(5, "a"),
            AttrEntry::u8(0).with_id(5, "b"),
        ];
        Schema::new(&DUP);
    }

    #[test]
    #[should_panic(expected = "Default of attribute 1 does not fit its storage")]
    fn oversized_default_panics() {
        static BAD: [AttrEntry; 1] = [AttrEntry::string(2, "abc").with_id(1, "s")];
        Schema::new(&BAD);
    }
}

use core::marker::PhantomData;

use bitmaps::{Bits, BitsImpl};

use crate::attr::{
    AttrEntry, AttributeStore, ChangeSink, NoBroadcast, NoStore, ParamStore, Schema, StoreConfig,
    param_file, values,
};

// Builder states
pub struct NeedValueBytes;
pub struct NeedFileBytes;
pub struct NeedParamStore;
pub struct NeedSink;
pub struct Ready;

/// Typestate builder for [`AttributeStore`].
///
/// ```
/// use embedded_attr::{attr_table, prelude::*};
///
/// attr_table! {
///     static TABLE: [_; COUNT], mod ids;
///     1 lock => AttrEntry::boolean(false).rw(),
///     2 networkId => AttrEntry::u16(0).rw().lockable().broadcast(),
/// }
///
/// let store = AttributeStoreBuilder::new(&TABLE)
///     .value_bytes::<TABLE_VALUE_BYTES>()
///     .file_bytes::<TABLE_FILE_BYTES>()
///     .param_store(RamStore::<2, 64>::new())
///     .no_broadcast()
///     .config(StoreConfig::new().lock_id(ids::LOCK))
///     .build();
/// ```
pub struct AttributeStoreBuilder<const N: usize, const TS: usize, const FS: usize, PS, CS, State> {
    table: &'static [AttrEntry],
    params: PS,
    sink: CS,
    config: StoreConfig,
    _phantom: PhantomData<State>,
}

// Start the builder
impl<const N: usize> AttributeStoreBuilder<N, 0, 0, (), (), NeedValueBytes> {
    pub fn new(table: &'static [AttrEntry; N]) -> Self {
        AttributeStoreBuilder {
            table,
            params: (),
            sink: (),
            config: StoreConfig::new(),
            _phantom: PhantomData,
        }
    }
}

// Set live value storage
impl<const N: usize> AttributeStoreBuilder<N, 0, 0, (), (), NeedValueBytes> {
    /// Sets the live value storage size.
    ///
    /// # Panics
    /// Panics if `TS` is smaller than the table's value bytes.
    pub fn value_bytes<const TS: usize>(
        self,
    ) -> AttributeStoreBuilder<N, TS, 0, (), (), NeedFileBytes> {
        let needed = values::value_bytes(self.table);
        assert!(
            needed <= TS,
            "Table needs {} value bytes but value_bytes is {}",
            needed,
            TS
        );

        AttributeStoreBuilder {
            table: self.table,
            params: (),
            sink: (),
            config: self.config,
            _phantom: PhantomData,
        }
    }
}

// Set parameter file buffer
impl<const N: usize, const TS: usize> AttributeStoreBuilder<N, TS, 0, (), (), NeedFileBytes> {
    /// Sets the parameter file buffer size.
    ///
    /// # Panics
    /// Panics if `FS` cannot hold a full save of the table.
    pub fn file_bytes<const FS: usize>(
        self,
    ) -> AttributeStoreBuilder<N, TS, FS, (), (), NeedParamStore> {
        let needed = param_file::file_bytes(self.table);
        assert!(
            needed <= FS,
            "Table needs {} file bytes but file_bytes is {}",
            needed,
            FS
        );

        AttributeStoreBuilder {
            table: self.table,
            params: (),
            sink: (),
            config: self.config,
            _phantom: PhantomData,
        }
    }
}

// Set backing store
impl<const N: usize, const TS: usize, const FS: usize>
    AttributeStoreBuilder<N, TS, FS, (), (), NeedParamStore>
{
    pub fn param_store<PS: ParamStore>(
        self,
        params: PS,
    ) -> AttributeStoreBuilder<N, TS, FS, PS, (), NeedSink> {
        AttributeStoreBuilder {
            table: self.table,
            params,
            sink: (),
            config: self.config,
            _phantom: PhantomData,
        }
    }

    /// Keep values in memory only.
    pub fn no_store(self) -> AttributeStoreBuilder<N, TS, FS, NoStore, (), NeedSink> {
        self.param_store(NoStore)
    }
}

// Set change sink
impl<const N: usize, const TS: usize, const FS: usize, PS>
    AttributeStoreBuilder<N, TS, FS, PS, (), NeedSink>
where
    PS: ParamStore,
{
    pub fn sink<CS: ChangeSink>(self, sink: CS) -> AttributeStoreBuilder<N, TS, FS, PS, CS, Ready> {
        AttributeStoreBuilder {
            table: self.table,
            params: self.params,
            sink,
            config: self.config,
            _phantom: PhantomData,
        }
    }

    /// Drop every change broadcast.
    pub fn no_broadcast(self) -> AttributeStoreBuilder<N, TS, FS, PS, NoBroadcast, Ready> {
        self.sink(NoBroadcast)
    }
}

// Build the final store
impl<const N: usize, const TS: usize, const FS: usize, PS, CS>
    AttributeStoreBuilder<N, TS, FS, PS, CS, Ready>
where
    PS: ParamStore,
    CS: ChangeSink,
    BitsImpl<N>: Bits,
{
    /// Replaces the default [`StoreConfig`].
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the store. Call [`AttributeStore::init`] before using it.
    ///
    /// # Panics
    /// Panics if the table violates its layout rules (see [`Schema::new`]).
    pub fn build(self) -> AttributeStore<N, TS, FS, PS, CS> {
        AttributeStore::new(Schema::new(self.table), self.params, self.sink, self.config)
    }
}

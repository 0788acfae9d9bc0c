pub mod broadcast;
pub mod builder;
pub mod config;
pub mod entry;
pub mod error;
pub mod param_file;
pub mod persist;
pub mod refresh;
pub mod schema;
pub mod show;
pub mod store;
pub mod types;
pub mod validator;
pub(crate) mod values;

#[cfg(test)]
pub(crate) mod test_support;

pub use broadcast::{
    ATTR_TASK_ID, AttrChangedMsg, BROADCAST_RX_ID, ChangeSink, MsgCode, MsgHeader, NoBroadcast,
};
pub use builder::AttributeStoreBuilder;
pub use config::StoreConfig;
pub use entry::{AttrEntry, DefaultValue, EnumStrFn, PrepareFn};
pub use error::{AttrError, NotifyError, StoreError};
pub use persist::{NoStore, ParamStore, RamStore};
pub use refresh::RefreshView;
pub use schema::Schema;
pub use show::Shown;
pub use store::AttributeStore;
pub use types::{AttrId, AttrType, DumpKind, Flags, Limit, Value, WriteResult};
pub use validator::{Validator, tx_power};
pub use values::{decode, value_bytes};

pub mod prelude {
    pub use super::{
        AttrChangedMsg, AttrEntry, AttrError, AttrId, AttrType, AttributeStore,
        AttributeStoreBuilder, ChangeSink, DumpKind, NoBroadcast, NoStore, NotifyError,
        ParamStore, RamStore, RefreshView, StoreConfig, StoreError, Value,
    };
}

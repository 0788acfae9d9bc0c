//! A `no_std`, no-alloc attribute store for embedded gateways.
//!
//! Attributes are typed configuration and status values addressed by a
//! stable numeric id. A static table describes each one: type, size,
//! default, bounds and capability flags. The store validates every write,
//! tracks which entries changed, persists the savable ones to a text
//! parameter file and announces changes to the rest of the firmware.
//!
//! # Features
//!
//! - **Zero heap allocation** - values, bitmaps and file buffers are sized at compile time
//! - **Declarative tables** - [`attr_table!`] generates the table, id constants and byte budgets
//! - **Transactional loads** - a parameter file is validated in full before any value changes
//! - **Change broadcast** - one message per write cycle listing every changed id
//! - **JSON scanning** - a jsmn-style tokenizer and cursor for cloud shadow documents
//!
//! # Write path
//!
//! ```text
//! set(id, bytes)
//!   │
//!   ├─ unmapped?            ──▶ NotFound
//!   ├─ not writable/locked? ──▶ Forbidden
//!   ├─ validate + write     ──▶ modified bit
//!   ├─ savable + modified   ──▶ parameter file
//!   └─ broadcast cycle      ──▶ AttrChangedMsg { list } + notify, clear bits
//! ```
//!
//! Prepare hooks refresh live values (uptime, clocks) under the engine lock
//! before a read. Their writes never mark an entry modified.
//!
//! # Example
//!
//! ```rust
//! use embedded_attr::{attr_table, prelude::*};
//!
//! attr_table! {
//!     static TABLE: [_; COUNT], mod ids;
//!     1 location => AttrEntry::string(32, "").rw().lockable(),
//!     5 lock => AttrEntry::boolean(false).rw(),
//!     60 networkId => AttrEntry::u16(0).rw().lockable().broadcast().range_u(0, 65535),
//! }
//!
//! let store = AttributeStoreBuilder::new(&TABLE)
//!     .value_bytes::<TABLE_VALUE_BYTES>()
//!     .file_bytes::<TABLE_FILE_BYTES>()
//!     .param_store(RamStore::<2, 128>::new())
//!     .no_broadcast()
//!     .config(StoreConfig::new().lock_id(ids::LOCK))
//!     .build();
//! store.init().unwrap();
//!
//! store.set(ids::NETWORK_ID, AttrType::U16, &42u16.to_le_bytes()).unwrap();
//! assert_eq!(store.copy_u32(ids::NETWORK_ID), Ok(42));
//!
//! // out of bounds, value unchanged
//! let err = store.set(ids::NETWORK_ID, AttrType::Any, &70000u32.to_le_bytes());
//! assert_eq!(err, Err(AttrError::OutOfRange));
//!
//! store.set_bool(ids::LOCK, true).unwrap();
//! let err = store.set_without_broadcast(ids::LOCATION, AttrType::String, b"dock 4");
//! assert_eq!(err, Err(AttrError::Forbidden));
//! ```

#![deny(unsafe_code)]
#![no_std]

#[doc(hidden)]
pub use paste;

pub mod attr;
pub mod json;
pub mod product;

pub mod prelude {
    pub use crate::attr::prelude::*;
    pub use crate::json::prelude::*;
}

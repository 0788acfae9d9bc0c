//! Test support utilities - only compiled in test builds.

use crate::{
    attr::{
        AttrChangedMsg, AttrEntry, AttrError, AttrId, AttributeStore, AttributeStoreBuilder,
        ChangeSink, MsgCode, NotifyError, ParamStore, RamStore, RefreshView, StoreConfig,
        StoreError, Value, tx_power, values::ValueTable,
    },
    attr_table,
};

/// Value reported by the `upTime` prepare hook.
pub const UPTIME_MS: i64 = 86_400_123;

fn refresh_uptime(view: &mut RefreshView<'_>) -> Result<(), AttrError> {
    view.refresh(Value::Signed(UPTIME_MS))
}

fn status_name(v: i32) -> &'static str {
    match v {
        0 => "Idle",
        1 => "Busy",
        _ => "?",
    }
}

attr_table! {
    /// Small table covering every type and flag combination.
    pub static TEST_TABLE: [_; TEST_COUNT], mod test_ids;
    1 lock => AttrEntry::boolean(false).rw(),
    2 label => AttrEntry::string(8, "gw").rw(),
    3 passkey => AttrEntry::u32(123456).rw().lockable().range_u(0, 999999),
    4 offset => AttrEntry::i8(-5).rw().range_i(-20, 20),
    5 gain => AttrEntry::float(1.5).rw().range_f(0.0, 10.0),
    6 secret => AttrEntry::bytes(&[0; 4]).rw().unreadable(),
    7 command => AttrEntry::u8(0).writable().control_point().range_u(0, 3),
    8 status => AttrEntry::u8(0).broadcast().enum_str(status_name),
    9 legacyMode => AttrEntry::u8(0).rw().deprecated(),
    10 upTime => AttrEntry::i64(0).prepare(refresh_uptime),
    11 features => AttrEntry::u32(0).rw(),
    12 counter => AttrEntry::u64(0).rw(),
    13 loadPath => AttrEntry::string(16, "/ext/attr.txt").rw(),
    14 txPower => AttrEntry::i8(0).rw().custom(tx_power),
    60 networkId => AttrEntry::u16(0).rw().lockable().broadcast().range_u(0, 65535),
}

pub type TestValues = ValueTable<TEST_COUNT, TEST_TABLE_VALUE_BYTES>;
pub type TestParams = RamStore<4, 512>;
pub type TestStore = AttributeStore<
    TEST_COUNT,
    TEST_TABLE_VALUE_BYTES,
    TEST_TABLE_FILE_BYTES,
    TestParams,
    RecordingSink,
>;
pub type FailingTestStore = AttributeStore<
    TEST_COUNT,
    TEST_TABLE_VALUE_BYTES,
    TEST_TABLE_FILE_BYTES,
    FailingStore,
    RecordingSink,
>;

pub const TEST_CONFIG: StoreConfig = StoreConfig::new()
    .lock_id(test_ids::LOCK)
    .load_path_id(test_ids::LOAD_PATH);

pub type ChangeList = heapless::Vec<AttrId, TEST_COUNT>;

/// Sink recording every broadcast and notification.
#[derive(Debug)]
pub struct RecordingSink {
    pub messages: heapless::Vec<ChangeList, 16>,
    pub notified: heapless::Vec<AttrId, 16>,
    pub consumers: usize,
    pub notify_result: Result<(), NotifyError>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            messages: heapless::Vec::new(),
            notified: heapless::Vec::new(),
            consumers: 1,
            notify_result: Ok(()),
        }
    }
}

impl ChangeSink for RecordingSink {
    fn broadcast(&mut self, msg: &AttrChangedMsg<'_>) -> usize {
        assert_eq!(msg.header.code, MsgCode::AttrChanged);
        assert!(!msg.list.is_empty(), "empty broadcast");
        self.messages
            .push(ChangeList::from_slice(msg.list).unwrap())
            .unwrap();
        self.consumers
    }

    fn notify(&mut self, id: AttrId) -> Result<(), NotifyError> {
        self.notified.push(id).unwrap();
        self.notify_result
    }
}

/// Store whose writes always fail.
pub struct FailingStore;

impl ParamStore for FailingStore {
    fn read(&mut self, _name: &str, _buf: &mut [u8]) -> Result<usize, StoreError> {
        Err(StoreError::NotFound)
    }
    fn write(&mut self, _name: &str, _data: &[u8]) -> Result<(), StoreError> {
        Err(StoreError::Io)
    }
    fn delete(&mut self, _name: &str) -> Result<(), StoreError> {
        Err(StoreError::Io)
    }
}

/// Builds an uninitialized store over `params`.
pub fn build_store(params: TestParams, config: StoreConfig) -> TestStore {
    AttributeStoreBuilder::new(&TEST_TABLE)
        .value_bytes::<TEST_TABLE_VALUE_BYTES>()
        .file_bytes::<TEST_TABLE_FILE_BYTES>()
        .param_store(params)
        .sink(RecordingSink::new())
        .config(config)
        .build()
}

/// Initialized store with no files.
pub fn test_store() -> TestStore {
    let store = build_store(TestParams::new(), TEST_CONFIG);
    store.init().unwrap();
    store
}

/// Store whose parameter file holds `text`, initialized; returns the init result.
pub fn store_with_file(text: &str, config: StoreConfig) -> (TestStore, Result<(), AttrError>) {
    let mut params = TestParams::new();
    params.write(config.file_name, text.as_bytes()).unwrap();
    let store = build_store(params, config);
    let result = store.init();
    (store, result)
}

pub fn failing_store() -> FailingTestStore {
    let store = AttributeStoreBuilder::new(&TEST_TABLE)
        .value_bytes::<TEST_TABLE_VALUE_BYTES>()
        .file_bytes::<TEST_TABLE_FILE_BYTES>()
        .param_store(FailingStore)
        .sink(RecordingSink::new())
        .config(TEST_CONFIG)
        .build();
    store.init().unwrap();
    store
}

/// Contents of a file in the store's backend.
pub fn file_of(store: &TestStore, name: &str) -> Option<heapless::Vec<u8, 512>> {
    store
        .with_backends(|params, _| params.file(name).map(|f| heapless::Vec::from_slice(f).unwrap()))
        .unwrap()
}

/// The saved parameter file.
pub fn saved(store: &TestStore) -> heapless::Vec<u8, 512> {
    file_of(store, TEST_CONFIG.file_name).unwrap_or_default()
}

pub fn writes(store: &TestStore) -> usize {
    store.with_backends(|params, _| params.writes()).unwrap()
}

/// Removes and returns the broadcasts recorded so far.
pub fn take_broadcasts(store: &TestStore) -> heapless::Vec<ChangeList, 16> {
    store
        .with_backends(|_, sink| core::mem::take(&mut sink.messages))
        .unwrap()
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

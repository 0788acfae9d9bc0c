use embedded_attr::{
    attr::{AttrChangedMsg, AttrError, AttrId, AttrType, ChangeSink, RamStore},
    json::{JsonScanner, Parent, TokenKind, shadow},
    product::mg100::{self, Mg100Store, ids},
};

const DELTA: &str = concat!(
    r#"{"version":12,"timestamp":1700000000,"state":{"networkId":42,"motionOdr":7,"#,
    r#""topicPrefix":"mg100-ct/prod/gw/","txPower":-8,"#,
    r#""ctAesKey":"000102030405060708090a0b0c0d0e0f","lock":false,"colour":"red"},"#,
    r#""metadata":{"networkId":{"timestamp":1700000000},"motionOdr":{"timestamp":1700000000}}}"#
);

#[derive(Default)]
struct Changes {
    lists: Vec<Vec<AttrId>>,
}

impl ChangeSink for Changes {
    fn broadcast(&mut self, msg: &AttrChangedMsg<'_>) -> usize {
        self.lists.push(msg.list.to_vec());
        1
    }
}

type Gateway = Mg100Store<RamStore<2, 2048>, Changes>;

type Scanner = JsonScanner<32>;

fn gateway() -> Gateway {
    let store = mg100::store(RamStore::new(), Changes::default());
    store.init().unwrap();
    store
}

#[test]
fn delta_updates_matching_attributes() {
    let store = gateway();
    let scanner = Scanner::new();
    let mut session = scanner.start(DELTA).unwrap();
    assert!(session.valid());
    assert!(!session.json().contains("metadata"));

    assert_eq!(shadow::apply_state(&mut session, &store), Ok(6));
    drop(session);

    assert_eq!(store.get_u32(ids::NETWORK_ID, 0), 42);
    assert_eq!(store.get_u32(ids::MOTION_ODR, 0), 7);
    assert_eq!(store.get_i32(ids::TX_POWER, 0), -8);
    assert_eq!(
        store.copy_string::<64>(ids::TOPIC_PREFIX).unwrap(),
        "mg100-ct/prod/gw/"
    );
    let mut key = [0u8; 16];
    assert_eq!(store.copy_byte_array(ids::CT_AES_KEY, &mut key), Ok(16));
    assert_eq!(key[15], 0x0f);

    // each write runs its own cycle; unchanged and silent entries send nothing
    let lists = store
        .with_backends(|_, sink| core::mem::take(&mut sink.lists))
        .unwrap();
    assert_eq!(
        lists,
        vec![
            vec![ids::NETWORK_ID],
            vec![ids::MOTION_ODR],
            vec![ids::TOPIC_PREFIX],
            vec![ids::TX_POWER],
        ]
    );
}

#[test]
fn version_is_read_before_the_state() {
    let scanner = Scanner::new();
    let mut session = scanner.start(DELTA).unwrap();
    assert_eq!(shadow::find_uint(&mut session, "version"), Some(12));
    assert_eq!(shadow::find_uint(&mut session, "timestamp"), Some(1_700_000_000));

    let state = shadow::find_state(&mut session).unwrap();
    assert_eq!(session.size(state), 7);

    // members of the state object only
    let network_id = session.find("networkId", TokenKind::Primitive, Parent::Next);
    assert_eq!(network_id.map(|i| session.convert_uint(i)), Some(42));
}

#[test]
fn rejected_members_are_skipped() {
    let store = gateway();
    let scanner = Scanner::new();
    let delta = r#"{"state":{"txPower":1,"networkId":70000,"port":"88"}}"#;
    let mut session = scanner.start(delta).unwrap();
    assert_eq!(shadow::apply_state(&mut session, &store), Ok(0));
    drop(session);

    assert_eq!(store.get_i32(ids::TX_POWER, 1), 0);
    assert_eq!(store.copy_string::<17>(ids::PORT).unwrap(), "8883");
}

#[test]
fn delta_cannot_bypass_the_lock() {
    let store = gateway();
    store.set(ids::LOCK, AttrType::Bool, &[1]).unwrap();
    assert_eq!(
        store.set(ids::NETWORK_ID, AttrType::Any, &[7]),
        Err(AttrError::Forbidden)
    );

    let scanner = Scanner::new();
    let delta = r#"{"state":{"networkId":7,"certStatus":1,"lock":false,"motionOdr":9}}"#;
    let mut session = scanner.start(delta).unwrap();
    assert_eq!(shadow::apply_state(&mut session, &store), Ok(1));
    drop(session);

    assert_eq!(store.get_u32(ids::NETWORK_ID, 1), 0);
    assert_eq!(store.get_i32(ids::CERT_STATUS, 1), 0);
    assert!(store.get_bool(ids::LOCK, false));
    assert_eq!(store.get_u32(ids::MOTION_ODR, 0), 9);
}

#[test]
fn broken_documents_are_reported() {
    let store = gateway();
    let scanner = Scanner::new();
    let mut session = scanner.start(r#"{"state":{"networkId":"#).unwrap();
    assert!(session.tokens_found() < 0);
    assert_eq!(shadow::apply_state(&mut session, &store), Err(AttrError::Parse));
}

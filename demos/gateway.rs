//! Gateway example: MG100 attributes driven by a cloud shadow delta
//!
//! This example demonstrates:
//! - Building the MG100 store over an in-memory parameter store
//! - Registering the platform clock behind `upTime` and `qrtc`
//! - Applying a shadow delta and listening for change broadcasts
//! - Dumping the writable settings in parameter file format

use embedded_attr::{
    attr::{AttrChangedMsg, ChangeSink, DumpKind, RamStore},
    json::{JsonScanner, shadow},
    product::mg100::{self, Clock, ids},
};

static SCANNER: JsonScanner<64> = JsonScanner::new();

/// Prints every change list, as a cloud or BLE task would consume it.
struct PrintSink;

impl ChangeSink for PrintSink {
    fn broadcast(&mut self, msg: &AttrChangedMsg<'_>) -> usize {
        println!("changed: {:?}", msg.list);
        1
    }
}

fn uptime_ms() -> i64 {
    42_000
}

fn epoch() -> u32 {
    1_700_000_000
}

fn main() {
    mg100::set_clock(Clock {
        uptime_ms,
        epoch,
    });

    let store = mg100::store(RamStore::<4, 2048>::new(), PrintSink);
    store.init().unwrap();

    let delta = r#"{"version":3,"state":{"networkId":1234,"battery4":4150,"txPower":4}}"#;
    let mut session = SCANNER.start(delta).unwrap();
    let applied = shadow::apply_state(&mut session, &store).unwrap();
    let version = shadow::find_uint(&mut session, "version");
    drop(session);
    println!("applied {} attributes from version {:?}", applied, version);

    println!("upTime {} ms", store.get_i64(ids::UP_TIME, 0));
    println!("qrtc {}", store.get_u32(ids::QRTC, 0));

    let mut dump = heapless::Vec::<u8, 4096>::new();
    let count = store.prepare_then_dump(DumpKind::W, &mut dump).unwrap();
    println!("{} writable attributes:", count);
    print!("{}", core::str::from_utf8(&dump).unwrap());
}

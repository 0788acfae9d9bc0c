//! MG100 cellular gateway attributes.
//!
//! Ids are stable across firmware releases: entries are only ever added or
//! deprecated, never renumbered.
//!
//! ```
//! use embedded_attr::{attr::{NoBroadcast, RamStore}, product::mg100};
//!
//! let store = mg100::store(RamStore::<2, 2048>::new(), NoBroadcast);
//! store.init().unwrap();
//! assert_eq!(store.get_u32(mg100::ids::PASSKEY, 0), 123456);
//! ```

use core::cell::Cell;

use critical_section::Mutex;

use crate::{
    attr::{
        AttrEntry, AttrError, AttributeStore, AttributeStoreBuilder, ChangeSink, ParamStore,
        RefreshView, StoreConfig, Value, tx_power,
    },
    attr_table,
};

/// Time sources behind the `upTime` and `qrtc` attributes.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    /// Milliseconds since boot.
    pub uptime_ms: fn() -> i64,
    /// Seconds since the Unix epoch, 0 until synchronized.
    pub epoch: fn() -> u32,
}

static CLOCK: Mutex<Cell<Option<Clock>>> = Mutex::new(Cell::new(None));

/// Registers the platform clock. Until then both attributes keep their
/// last written value.
pub fn set_clock(clock: Clock) {
    critical_section::with(|cs| CLOCK.borrow(cs).set(Some(clock)));
}

fn clock() -> Option<Clock> {
    critical_section::with(|cs| CLOCK.borrow(cs).get())
}

fn prepare_up_time(view: &mut RefreshView<'_>) -> Result<(), AttrError> {
    match clock() {
        Some(c) => view.refresh(Value::Signed((c.uptime_ms)())),
        None => Ok(()),
    }
}

fn prepare_qrtc(view: &mut RefreshView<'_>) -> Result<(), AttrError> {
    match clock() {
        Some(c) => view.refresh(Value::Unsigned((c.epoch)() as u64)),
        None => Ok(()),
    }
}

pub fn cert_status(v: i32) -> &'static str {
    match v {
        1 => "Busy",
        0 => "Success",
        -1 => "Eperm",
        _ => "?",
    }
}

pub fn gateway_state(v: i32) -> &'static str {
    match v {
        0 => "Power Up Init",
        1 => "Network Init",
        2 => "Wait For Network",
        3 => "Network Connected",
        4 => "Network Disconnected",
        5 => "Network Error",
        6 => "Wait For Commission",
        7 => "Resolve Server",
        8 => "Wait Before Cloud Connect",
        9 => "Cloud Connected",
        10 => "Cloud Wait For Disconnect",
        11 => "Cloud Disconnected",
        12 => "Cloud Error",
        13 => "Fota Busy",
        14 => "Decommission",
        15 => "Cloud Request Disconnect",
        16 => "Cloud Connecting",
        17 => "Modem Init",
        18 => "Modem Error",
        _ => "?",
    }
}

pub fn lte_network_state(v: i32) -> &'static str {
    match v {
        0 => "Not Registered",
        1 => "Home Network",
        2 => "Searching",
        3 => "Registration Denied",
        4 => "Out Of Coverage",
        5 => "Roaming",
        8 => "Emergency",
        240 => "Unable To Configure",
        _ => "?",
    }
}

pub fn lte_startup_state(v: i32) -> &'static str {
    match v {
        0 => "Ready",
        1 => "Waiting For Access Code",
        2 => "Sim Not Present",
        3 => "Sim Lock",
        4 => "Unrecoverable Error",
        5 => "Unknown",
        6 => "Inactive Sim",
        _ => "?",
    }
}

pub fn lte_sleep_state(v: i32) -> &'static str {
    match v {
        0 => "Uninitialized",
        1 => "Asleep",
        2 => "Awake",
        _ => "?",
    }
}

pub fn central_state(v: i32) -> &'static str {
    match v {
        0 => "Finding Device",
        1 => "Finding Service",
        2 => "Finding Ess Temperature Char",
        3 => "Finding Ess Humidity Char",
        4 => "Finding Ess Pressure Char",
        5 => "Connected And Configured",
        6 => "Finding Smp Char",
        7 => "Challenge Request",
        8 => "Challenge Response",
        9 => "Log Download",
        _ => "?",
    }
}

pub fn modem_boot(v: i32) -> &'static str {
    match v {
        0 => "Normal",
        1 => "Delayed",
        2 => "Airplane",
        _ => "?",
    }
}

pub fn fota_control_point(v: i32) -> &'static str {
    match v {
        0 => "Nop",
        2 => "Modem Start",
        _ => "?",
    }
}

pub fn fota_status(v: i32) -> &'static str {
    match v {
        0 => "Success",
        1 => "Busy",
        2 => "Error",
        _ => "?",
    }
}

pub fn generate_psk(v: i32) -> &'static str {
    match v {
        0 => "LwM2M Default",
        1 => "LwM2M Random",
        _ => "?",
    }
}

pub fn lte_init_error(v: i32) -> &'static str {
    match v {
        0 => "None",
        -1 => "No Iface",
        -2 => "Iface Cfg",
        -3 => "Dns Cfg",
        -4 => "Modem",
        -5 => "Airplane",
        _ => "?",
    }
}

pub fn cloud_error(v: i32) -> &'static str {
    match v {
        0 => "None",
        -1 => "Init Endpoint",
        -2 => "Init Client",
        -3 => "Init Root Ca",
        -4 => "Read Cred Fs",
        -5 => "Cred Size",
        -6 => "Init Topic Prefix",
        -7 => "Init Client Cert",
        -8 => "Init Client Key",
        _ => "?",
    }
}

pub fn modem_functionality(v: i32) -> &'static str {
    match v {
        -1 => "Errno",
        0 => "Minimum",
        1 => "Full",
        4 => "Airplane",
        _ => "?",
    }
}

pub fn gps_status(v: i32) -> &'static str {
    match v {
        -1 => "Invalid",
        0 => "Fix Lost Or Not Available",
        1 => "Prediction Available",
        2 => "2D Available",
        3 => "3D Available",
        4 => "Fixed To Invalid",
        _ => "?",
    }
}

pub fn polte_control_point(v: i32) -> &'static str {
    match v {
        0 => "Reserved",
        1 => "Register",
        2 => "Enable",
        3 => "Locate",
        _ => "?",
    }
}

pub fn polte_status(v: i32) -> &'static str {
    match v {
        0 => "Success",
        1 => "Modem Invalid State",
        2 => "Bad Number Of Frames To Capture",
        3 => "Not Enough Memory",
        4 => "Pending Response From Modem",
        5 => "Retrying Capture Attempt",
        6 => "Reserved",
        7 => "Device Id Unavailable",
        8 => "Delaying Capture Attempt Because Of Ongoing Paging",
        9 => "Flash Write Failure",
        10 => "Server Error",
        100 => "Locate In Progress",
        127 => "Busy",
        _ => "?",
    }
}

const LWM2M_PSK: [u8; 16] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
];

attr_table! {
    /// MG100 attribute table, sorted by id.
    pub static TABLE: [_; ENTRY_COUNT], mod ids;
    1 location => AttrEntry::string(32, "").rw().lockable(),
    4 passkey => AttrEntry::u32(123456).rw().lockable().broadcast().range_u(0, 999999),
    5 lock => AttrEntry::boolean(false).rw().lockable(),
    11 firmwareVersion => AttrEntry::string(11, "0.0.0").min_len(3),
    12 resetReason => AttrEntry::string(12, "RESETPIN"),
    13 bluetoothAddress => AttrEntry::string(12, "0").min_len(12),
    14 resetCount => AttrEntry::u32(0),
    16 upTime => AttrEntry::i64(0).prepare(prepare_up_time),
    59 txPower => AttrEntry::i8(0).rw().broadcast().custom(tx_power).range_i(-40, 8),
    60 networkId => AttrEntry::u16(0).rw().lockable().broadcast().range_u(0, 65535),
    61 configVersion => AttrEntry::u8(0).rw().broadcast().range_u(0, 255),
    63 hardwareVersion => AttrEntry::u8(0).rw().broadcast().range_u(0, 255),
    75 batteryVoltageMv => AttrEntry::u16(0),
    93 attributeVersion => AttrEntry::string(11, "0.4.25").min_len(6),
    94 qrtc => AttrEntry::u32(0).prepare(prepare_qrtc),
    95 qrtcLastSet => AttrEntry::u32(0).savable(),
    140 name => AttrEntry::string(32, "").min_len(1),
    142 board => AttrEntry::string(32, "").min_len(1),
    143 buildId => AttrEntry::string(64, "0").min_len(1),
    144 appType => AttrEntry::string(32, "").min_len(1),
    145 mount => AttrEntry::string(32, "/lfs"),
    146 commissioned => AttrEntry::boolean(false).rw().broadcast().control_point(),
    147 certStatus => AttrEntry::i8(0).enum_str(cert_status),
    148 rootCaName => AttrEntry::string(48, "/lfs/root_ca.pem").rw().broadcast(),
    149 clientCertName => AttrEntry::string(48, "/lfs/client_cert.pem").rw().broadcast(),
    150 clientKeyName => AttrEntry::string(48, "/lfs/client_key.pem").rw().broadcast(),
    151 endpoint => AttrEntry::string(254, "a3273rvo818l4w-ats.iot.us-east-1.amazonaws.com")
        .rw()
        .broadcast(),
    152 port => AttrEntry::string(16, "8883").rw().broadcast().min_len(4),
    153 clientId => AttrEntry::string(32, "").rw().broadcast(),
    154 topicPrefix => AttrEntry::string(32, "mg100-ct/dev/gw/").rw().broadcast(),
    155 gatewayState => AttrEntry::u8(0).enum_str(gateway_state),
    157 batteryCapacity => AttrEntry::u8(0).range_u(0, 4),
    158 batteryTemperature => AttrEntry::i16(0),
    159 batteryChargingState => AttrEntry::u8(0),
    160 batteryLowThreshold => AttrEntry::u16(3400).rw().broadcast().range_u(0, 65535),
    161 batteryAlarmThreshold => AttrEntry::u16(3000).rw().broadcast().range_u(0, 65535),
    162 battery4 => AttrEntry::u16(4200).rw().broadcast().range_u(0, 65535),
    163 battery3 => AttrEntry::u16(3800).rw().broadcast().range_u(0, 65535),
    164 battery2 => AttrEntry::u16(3400).rw().broadcast().range_u(0, 65535),
    165 battery1 => AttrEntry::u16(3000).rw().broadcast().range_u(0, 65535),
    166 battery0 => AttrEntry::u16(2750).rw().broadcast().range_u(0, 65535),
    167 batteryAlarm => AttrEntry::boolean(false),
    168 motionOdr => AttrEntry::u8(5).rw().broadcast().range_u(0, 255),
    169 motionThresh => AttrEntry::u8(10).rw().broadcast().range_u(0, 255),
    170 motionScale => AttrEntry::u8(2).rw().broadcast().range_u(0, 255),
    171 motionDuration => AttrEntry::u8(6).rw().broadcast().range_u(0, 255),
    172 motionAlarm => AttrEntry::boolean(false),
    173 sdLogMaxSize => AttrEntry::u8(0).rw(),
    174 ctAesKey => AttrEntry::bytes(&[0xFF; 16]).rw().unreadable(),
    175 powerSupplyVoltage => AttrEntry::float(0.0).range_f(0.0, 10.0),
    176 gatewayId => AttrEntry::string(15, ""),
    177 lteNetworkState => AttrEntry::u8(0).enum_str(lte_network_state),
    178 lteStartupState => AttrEntry::u8(0).enum_str(lte_startup_state),
    179 lteRsrp => AttrEntry::i16(0),
    180 lteSinr => AttrEntry::i16(0),
    181 lteSleepState => AttrEntry::u8(0).enum_str(lte_sleep_state),
    182 lteRat => AttrEntry::u8(0).range_u(0, 1),
    183 iccid => AttrEntry::string(20, ""),
    184 lteSerialNumber => AttrEntry::string(14, ""),
    185 lteVersion => AttrEntry::string(29, ""),
    186 bands => AttrEntry::string(20, "").min_len(20),
    187 activeBands => AttrEntry::string(20, "").min_len(20),
    188 centralState => AttrEntry::u8(0).enum_str(central_state),
    189 sensorBluetoothAddress => AttrEntry::string(30, ""),
    190 joinDelay => AttrEntry::u32(0).rw().broadcast().control_point(),
    191 joinMin => AttrEntry::u16(1).rw(),
    192 joinMax => AttrEntry::u16(100).rw(),
    193 joinInterval => AttrEntry::u32(1).rw(),
    194 modemBoot => AttrEntry::u8(0).enum_str(modem_boot),
    195 delayCloudReconnect => AttrEntry::boolean(false).rw(),
    196 apn => AttrEntry::string(64, "").writable(),
    197 apnUsername => AttrEntry::string(65, ""),
    198 apnPassword => AttrEntry::string(65, ""),
    199 apnControlPoint => AttrEntry::u8(0).writable().unreadable().broadcast().control_point(),
    200 apnStatus => AttrEntry::i32(0),
    201 modemDesiredLogLevel => AttrEntry::u32(1)
        .rw()
        .broadcast()
        .control_point()
        .range_u(0, 4),
    202 lteOperatorIndex => AttrEntry::u8(255),
    203 fotaControlPoint => AttrEntry::u8(0)
        .writable()
        .unreadable()
        .broadcast()
        .control_point()
        .enum_str(fota_control_point),
    204 fotaStatus => AttrEntry::u8(0).enum_str(fota_status),
    205 fotaFileName => AttrEntry::string(64, "").writable(),
    206 fotaSize => AttrEntry::u32(0),
    207 fotaCount => AttrEntry::u32(0),
    208 loadPath => AttrEntry::string(32, "/lfs/params.txt").rw(),
    209 dumpPath => AttrEntry::string(32, "/lfs/dump.txt").rw(),
    210 nvImported => AttrEntry::boolean(false).savable(),
    211 floaty => AttrEntry::float(0.13).rw(),
    212 generatePsk => AttrEntry::u8(0)
        .writable()
        .unreadable()
        .broadcast()
        .control_point()
        .range_u(0, 1)
        .enum_str(generate_psk),
    213 lwm2mPsk => AttrEntry::bytes(&LWM2M_PSK).savable(),
    214 lwm2mClientId => AttrEntry::string(32, "Client_identity").rw().min_len(1),
    215 lwm2mPeerUrl => AttrEntry::string(128, "uwterminalx.lairdconnect.com").rw().min_len(6),
    216 lteInitError => AttrEntry::i8(0).enum_str(lte_init_error),
    217 cloudError => AttrEntry::i8(0).enum_str(cloud_error),
    218 commissioningBusy => AttrEntry::boolean(false),
    219 imsi => AttrEntry::string(15, "").min_len(14),
    220 modemFunctionality => AttrEntry::i8(0).enum_str(modem_functionality),
    242 gpsRate => AttrEntry::u32(0).rw().unreadable().broadcast().control_point(),
    243 gpsLatitude => AttrEntry::string(32, ""),
    244 gpsLongitude => AttrEntry::string(32, ""),
    245 gpsTime => AttrEntry::string(32, ""),
    246 gpsFixType => AttrEntry::string(3, ""),
    247 gpsHepe => AttrEntry::string(16, ""),
    248 gpsAltitude => AttrEntry::string(16, ""),
    249 gpsAltUnc => AttrEntry::string(16, ""),
    250 gpsHeading => AttrEntry::string(16, ""),
    251 gpsHorSpeed => AttrEntry::string(16, ""),
    252 gpsVerSpeed => AttrEntry::string(16, ""),
    253 gpsStatus => AttrEntry::i8(-1).enum_str(gps_status),
    254 polteControlPoint => AttrEntry::u8(0)
        .writable()
        .unreadable()
        .broadcast()
        .control_point()
        .enum_str(polte_control_point),
    255 polteStatus => AttrEntry::i8(0).enum_str(polte_status),
    256 polteUser => AttrEntry::string(16, "").savable(),
    257 poltePassword => AttrEntry::string(16, "").savable(),
    258 polteLatitude => AttrEntry::float(0.0),
    259 polteLongitude => AttrEntry::float(0.0),
    260 polteConfidence => AttrEntry::float(0.0),
    261 polteTimestamp => AttrEntry::u32(0),
}

pub const VALUE_BYTES: usize = TABLE_VALUE_BYTES;
pub const FILE_BYTES: usize = TABLE_FILE_BYTES;

/// Runtime settings used by the gateway firmware.
pub const CONFIG: StoreConfig = StoreConfig::new()
    .lock_id(ids::LOCK)
    .load_path_id(ids::LOAD_PATH);

pub type Mg100Store<PS, CS> = AttributeStore<ENTRY_COUNT, VALUE_BYTES, FILE_BYTES, PS, CS>;

/// Builds an uninitialized MG100 store with [`CONFIG`].
pub fn store<PS: ParamStore, CS: ChangeSink>(params: PS, sink: CS) -> Mg100Store<PS, CS> {
    AttributeStoreBuilder::new(&TABLE)
        .value_bytes::<VALUE_BYTES>()
        .file_bytes::<FILE_BYTES>()
        .param_store(params)
        .sink(sink)
        .config(CONFIG)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{AttrType, Flags, NoBroadcast, RamStore, Schema};

    type Params = RamStore<2, 2048>;

    fn mg100() -> Mg100Store<Params, NoBroadcast> {
        let store = store(Params::new(), NoBroadcast);
        store.init().unwrap();
        store
    }

    #[test]
    fn table_layout() {
        assert_eq!(ENTRY_COUNT, 115);
        let schema = Schema::new(&TABLE);
        assert_eq!(schema.len(), ENTRY_COUNT);
        assert_eq!(ids::LOCATION, 1);
        assert_eq!(ids::NETWORK_ID, 60);
        assert_eq!(ids::LWM2M_PSK, 213);
        assert_eq!(ids::POLTE_TIMESTAMP, 261);
        assert_eq!(TABLE[ENTRY_COUNT - 1].name, "polteTimestamp");
        assert!(FILE_BYTES < 2048);
    }

    #[test]
    fn flags_follow_the_gateway_roles() {
        let schema = Schema::new(&TABLE);
        let key = schema.entry(ids::CT_AES_KEY).unwrap();
        assert!(key.is_saved() && !key.is(Flags::READABLE));

        let cp = schema.entry(ids::FOTA_CONTROL_POINT).unwrap();
        assert!(cp.is(Flags::WRITABLE | Flags::BROADCAST));
        assert!(!cp.is(Flags::SAVABLE));

        // saved but only the firmware may change it
        let psk = schema.entry(ids::LWM2M_PSK).unwrap();
        assert!(psk.is_saved() && !psk.is(Flags::WRITABLE));
    }

    #[test]
    fn enum_names() {
        assert_eq!(gateway_state(9), "Cloud Connected");
        assert_eq!(cert_status(-1), "Eperm");
        assert_eq!(lte_network_state(240), "Unable To Configure");
        assert_eq!(gps_status(-1), "Invalid");
        assert_eq!(polte_status(127), "Busy");
        assert_eq!(modem_boot(3), "?");
    }

    #[test]
    fn defaults_after_init() {
        let store = mg100();
        assert_eq!(store.get_u32(ids::PASSKEY, 0), 123456);
        assert_eq!(store.get_i32(ids::GPS_STATUS, 0), -1);
        assert_eq!(store.get_u32(ids::LTE_OPERATOR_INDEX, 0), 255);
        assert_eq!(store.get_float(ids::FLOATY, 0.0), 0.13);
        assert_eq!(
            store.copy_string::<64>(ids::TOPIC_PREFIX).unwrap(),
            "mg100-ct/dev/gw/"
        );
        assert_eq!(store.get_type(ids::UP_TIME), Some(AttrType::S64));
        assert_eq!(store.get_size(ids::ENDPOINT), Some(255));
        assert_eq!(store.get_id("lteRsrp"), Some(ids::LTE_RSRP));
        assert!(!store.valid_id(2));
    }

    #[test]
    fn tx_power_accepts_radio_steps_only() {
        let store = mg100();
        assert_eq!(store.set_i32(ids::TX_POWER, -20), Ok(()));
        assert_eq!(store.set_i32(ids::TX_POWER, 1), Err(AttrError::OutOfRange));
        assert_eq!(store.set_i32(ids::TX_POWER, 9), Err(AttrError::OutOfRange));
        assert_eq!(store.get_i32(ids::TX_POWER, 0), -20);
    }

    #[test]
    fn lock_gates_gateway_identity() {
        let store = mg100();
        store.set_bool(ids::LOCK, true).unwrap();
        assert_eq!(
            store.set(ids::NETWORK_ID, AttrType::U16, &7u16.to_le_bytes()),
            Err(AttrError::Forbidden)
        );
        // not lockable
        assert_eq!(store.set(ids::MOTION_ODR, AttrType::U8, &[7]), Ok(()));
    }

    #[test]
    fn clock_feeds_time_attributes() {
        fn uptime() -> i64 {
            3_600_000
        }
        fn epoch() -> u32 {
            1_700_000_000
        }

        let store = mg100();
        set_clock(Clock {
            uptime_ms: uptime,
            epoch,
        });
        assert_eq!(store.copy_i64(ids::UP_TIME), Ok(3_600_000));
        assert_eq!(store.copy_u32(ids::QRTC), Ok(1_700_000_000));
        assert!(!store.is_modified(ids::UP_TIME));
    }
}

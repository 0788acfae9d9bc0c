//! The attribute engine.
//!
//! Every value change takes the same path: validate, write, mark modified,
//! persist when the entry is savable, then run the broadcast cycle which
//! logs, notifies and clears the modified bits.
//!
//! All mutable state sits behind one `critical_section::Mutex`. Calls made
//! while that state is already borrowed (from a prepare hook or a sink
//! callback) fail with [`AttrError::Busy`].

use core::{
    cell::RefCell,
    sync::atomic::{AtomicBool, Ordering},
};

use bitmaps::{Bitmap, Bits, BitsImpl};
use critical_section::Mutex;

use crate::attr::{
    AttrChangedMsg, AttrEntry, AttrError, AttrId, AttrType, ChangeSink, DumpKind, Flags,
    NotifyError, ParamStore, Schema, StoreConfig, StoreError, Value,
    param_file::{self, ParamKind, ParamPair},
    show, validator,
    values::{self, ValueTable},
};

/// Largest serialized quiet bitmap, enough for 1024 entries.
pub const QUIET_FILE_BYTES: usize = 128;

const fn quiet_len(entries: usize) -> usize {
    entries.div_ceil(8)
}

struct State<const N: usize, const TS: usize, const FS: usize, PS, CS>
where
    BitsImpl<N>: Bits,
{
    schema: Schema,
    config: StoreConfig,
    values: ValueTable<N, TS>,
    modified: Bitmap<N>,
    quiet: Bitmap<N>,
    notify: Bitmap<N>,
    file: heapless::Vec<u8, FS>,
    params: PS,
    sink: CS,
}

/// Serializes the selected entries into `out`, returning how many were written.
fn generate<const N: usize, const TS: usize, const D: usize>(
    schema: &Schema,
    values: &ValueTable<N, TS>,
    out: &mut heapless::Vec<u8, D>,
    include: impl Fn(&AttrEntry) -> bool,
) -> Result<usize, AttrError> {
    let mut count = 0;
    for (i, entry) in schema.iter() {
        if !include(entry) {
            continue;
        }
        let payload = values::file_payload(entry, values.slot(schema, i));
        param_file::append(out, entry.id, ParamKind::of(entry.ty), payload).inspect_err(|e| {
            log::error!("Unable to convert attribute [{}] into file: {}", entry.id, e)
        })?;
        count += 1;
    }
    Ok(count)
}

impl<const N: usize, const TS: usize, const FS: usize, PS, CS> State<N, TS, FS, PS, CS>
where
    PS: ParamStore,
    CS: ChangeSink,
    BitsImpl<N>: Bits,
{
    fn slot(&self, index: usize) -> &[u8] {
        self.values.slot(&self.schema, index)
    }

    fn is_locked(&self) -> bool {
        self.config
            .lock_id
            .and_then(|id| self.schema.map(id))
            .is_some_and(|i| self.slot(i)[0] != 0)
    }

    fn is_writable(&self, entry: &AttrEntry) -> bool {
        let writable =
            entry.is(Flags::WRITABLE) && !(entry.is(Flags::LOCKABLE) && self.is_locked());
        if !writable {
            log::debug!("Id [{}] {} is not writable", entry.id, entry.name);
        }
        writable
    }

    /// Runs the validator and records a change in the modified bitmap.
    fn validate(&mut self, index: usize, value: &Value<'_>, do_write: bool) -> Result<(), AttrError> {
        let entry = self.schema.entry_at(index);
        let slot = self.values.slot_mut(&self.schema, index);
        match validator::validate(entry, slot, value, do_write) {
            Ok(result) => {
                if result.is_dirty() {
                    self.modified.set(index, true);
                }
                Ok(())
            }
            Err(e) => {
                log::warn!("failure id: {} {}", entry.id, entry.name);
                log::debug!("attr data: {:?}", value);
                Err(e)
            }
        }
    }

    fn prepare(&mut self, index: usize) -> Result<(), AttrError> {
        match self.schema.entry_at(index).prepare {
            Some(hook) => hook(&mut self.values.refresh_view(&self.schema, index)),
            None => Ok(()),
        }
    }

    fn save_single(&mut self, index: usize) -> Result<(), AttrError> {
        if self.modified.get(index) && self.schema.entry_at(index).is_saved() {
            self.save_attributes()
        } else {
            Ok(())
        }
    }

    fn save_attributes(&mut self) -> Result<(), AttrError> {
        self.file.clear();
        generate(&self.schema, &self.values, &mut self.file, AttrEntry::is_saved)?;
        param_file::validate_bytes(&self.file)?;
        self.params
            .write(self.config.file_name, &self.file)
            .map_err(|e| {
                log::error!("Unable to write {}: {}", self.config.file_name, e);
                AttrError::from(e)
            })?;
        log::debug!("Wrote {} bytes of parameters to file", self.file.len());
        Ok(())
    }

    fn broadcast_single(&mut self, index: usize, send_notifications: bool) {
        if self.modified.get(index) {
            self.broadcast_handler(send_notifications);
        }
    }

    fn broadcast_handler(&mut self, send_notifications: bool) {
        let mut list: heapless::Vec<AttrId, N> = heapless::Vec::new();

        let mut next = self.modified.first_index();
        while let Some(i) = next {
            let entry = self.schema.entry_at(i);
            if entry.is(Flags::BROADCAST) {
                // one slot per entry, cannot overflow
                let _ = list.push(entry.id);
            }
            if !self.quiet.get(i) {
                show::log_show(entry, self.slot(i));
            }
            if send_notifications && self.notify.get(i) {
                match self.sink.notify(entry.id) {
                    Ok(()) => log::debug!("Notification [{}]", entry.id),
                    Err(NotifyError::NotConnected) => {
                        log::debug!("Notification [{}]: {}", entry.id, NotifyError::NotConnected)
                    }
                    Err(e) => log::error!("Notification [{}]: {}", entry.id, e),
                }
            }
            next = self.modified.next_index(i);
        }
        self.modified = Bitmap::new();

        if list.is_empty() {
            return;
        }
        if self.sink.broadcast(&AttrChangedMsg::new(&list)) == 0 {
            log::debug!("Zero consumers for broadcast");
        }
    }

    fn persist_quiet(&mut self) -> Result<(), AttrError> {
        let mut buf = [0u8; QUIET_FILE_BYTES];
        for i in 0..N {
            if self.quiet.get(i) {
                buf[i / 8] |= 1 << (i % 8);
            }
        }
        self.params
            .write(self.config.quiet_file_name, &buf[..quiet_len(N)])
            .map_err(AttrError::from)
    }

    /// Restores the quiet bitmap, rewriting the file when it is missing or
    /// does not match the table.
    fn initialize_quiet(&mut self) {
        let mut buf = [0u8; QUIET_FILE_BYTES];
        match self.params.read(self.config.quiet_file_name, &mut buf) {
            Ok(n) if n == quiet_len(N) => {
                for i in 0..N {
                    self.quiet.set(i, buf[i / 8] & (1 << (i % 8)) != 0);
                }
                return;
            }
            Ok(_) | Err(StoreError::TooLarge) => log::warn!("Unexpected quiet file size"),
            Err(_) => {}
        }
        if let Err(e) = self.persist_quiet() {
            log::error!("Unable to write quiet file: {}", e);
        }
    }

    fn load_attributes(
        &mut self,
        name: &str,
        validate_first: bool,
        mask_modified: bool,
    ) -> Result<usize, AttrError> {
        let mut file = core::mem::take(&mut self.file);
        let result = self.load_from(&mut file, name, validate_first, mask_modified);
        self.file = file;
        log::debug!("load status {:?}", result);
        result
    }

    fn load_from(
        &mut self,
        file: &mut heapless::Vec<u8, FS>,
        name: &str,
        validate_first: bool,
        mask_modified: bool,
    ) -> Result<usize, AttrError> {
        file.clear();
        file.resize(FS, 0).map_err(|_| AttrError::Io)?;
        let size = self.params.read(name, &mut file[..])?;
        file.truncate(size);

        let text = core::str::from_utf8(&file[..]).map_err(|_| AttrError::Parse)?;
        let pairs = param_file::validate_file(text)?;
        log::info!("pairs: {} fsize: {} file: {}", pairs, size, name);

        if validate_first {
            self.loader(text, false, mask_modified)?;
        }
        self.loader(text, true, mask_modified)
    }

    /// One pass over the pairs of a parameter file.
    ///
    /// The validate-only pass fails if any pair fails. The write pass skips
    /// bad pairs unless `break_on_load_failure` is set, and returns how many
    /// pairs were applied.
    fn loader(&mut self, text: &str, do_write: bool, mask_modified: bool) -> Result<usize, AttrError> {
        let mut applied = 0;
        let mut rejected = None;
        for pair in param_file::pairs(text) {
            let pair = pair?;
            let result = self.load_pair(&pair, do_write);
            if mask_modified {
                if let Some(i) = self.schema.map(pair.id) {
                    self.modified.set(i, false);
                }
            }
            match result {
                Ok(()) => applied += 1,
                Err(e) if self.config.break_on_load_failure => return Err(e),
                Err(e) if !do_write => {
                    rejected.get_or_insert(e);
                }
                Err(_) => {}
            }
        }
        rejected.map_or(Ok(applied), Err)
    }

    fn load_pair(&mut self, pair: &ParamPair<'_>, do_write: bool) -> Result<(), AttrError> {
        let Some(index) = self.schema.map(pair.id) else {
            log::debug!("Unknown id {} in parameter file", pair.id);
            return Err(AttrError::NotFound);
        };
        let entry = self.schema.entry_at(index);
        let mut bin = [0u8; param_file::MAX_BIN_SIZE];
        let value = match entry.ty {
            AttrType::String => Value::Text(pair.value.as_bytes()),
            ty => {
                let n = param_file::decode_hex(pair.value, &mut bin).inspect_err(|_| {
                    log::error!("Unable to convert hex->bin for id: {}", entry.id)
                })?;
                Value::from_raw(ty, &bin[..n])?
            }
        };
        self.validate(index, &value, do_write)
    }

    fn startup(&mut self) -> Result<(), AttrError> {
        self.values.initialize(&self.schema);
        self.modified = Bitmap::new();
        self.quiet = Bitmap::new();
        self.notify = Bitmap::new();

        if let Some(i) = self.config.load_path_id.and_then(|id| self.schema.map(id)) {
            if values::text_of(self.slot(i)) == self.config.file_name.as_bytes() {
                log::warn!("Load path should be different from attribute source");
            }
        }

        let name = self.config.file_name;
        let result = match self.load_attributes(name, false, true) {
            Ok(_) => Ok(()),
            Err(AttrError::NotFound) => {
                log::info!("Parameter file doesn't exist");
                Ok(())
            }
            Err(e) => {
                log::warn!("Unable to load {}, keeping defaults: {}", name, e);
                Err(e)
            }
        };

        self.initialize_quiet();
        result
    }
}

/// Typed attribute store over a static table.
///
/// # Const Generics
/// - `N`: number of entries in the table
/// - `TS`: live value bytes (at least the table's `_VALUE_BYTES`)
/// - `FS`: parameter file buffer bytes (at least the table's `_FILE_BYTES`)
///
/// # Type Parameters
/// - `PS`: backing store for the parameter and quiet files
/// - `CS`: receiver of change broadcasts and notifications
///
/// Every operation except the metadata queries waits until [`init`](Self::init)
/// has completed.
pub struct AttributeStore<const N: usize, const TS: usize, const FS: usize, PS, CS>
where
    PS: ParamStore,
    CS: ChangeSink,
    BitsImpl<N>: Bits,
{
    schema: Schema,
    config: StoreConfig,
    initialized: AtomicBool,
    state: Mutex<RefCell<State<N, TS, FS, PS, CS>>>,
}

impl<const N: usize, const TS: usize, const FS: usize, PS, CS> core::fmt::Debug
    for AttributeStore<N, TS, FS, PS, CS>
where
    PS: ParamStore,
    CS: ChangeSink,
    BitsImpl<N>: Bits,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AttributeStore")
            .field("entries", &N)
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl<const N: usize, const TS: usize, const FS: usize, PS, CS> AttributeStore<N, TS, FS, PS, CS>
where
    PS: ParamStore,
    CS: ChangeSink,
    BitsImpl<N>: Bits,
{
    /// Creates an uninitialized store.
    ///
    /// # Panics
    /// Panics if the schema does not fit `N`, `TS` or `FS`, or if the
    /// configured lock attribute is not a bool entry of the table.
    pub fn new(schema: Schema, params: PS, sink: CS, config: StoreConfig) -> Self {
        assert!(
            quiet_len(N) <= QUIET_FILE_BYTES,
            "Quiet bitmap of {} entries does not fit {} bytes",
            N,
            QUIET_FILE_BYTES
        );
        let needed = param_file::file_bytes(schema.entries());
        assert!(
            needed <= FS,
            "Parameter file needs {} bytes but file_bytes is {}",
            needed,
            FS
        );
        if let Some(id) = config.lock_id {
            assert!(
                schema.entry(id).is_some_and(|e| e.ty == AttrType::Bool),
                "Lock attribute {} must be a bool entry",
                id
            );
        }

        Self {
            schema,
            config,
            initialized: AtomicBool::new(false),
            state: Mutex::new(RefCell::new(State {
                schema,
                config,
                values: ValueTable::new(&schema),
                modified: Bitmap::new(),
                quiet: Bitmap::new(),
                notify: Bitmap::new(),
                file: heapless::Vec::new(),
                params,
                sink,
            })),
        }
    }

    /// Startup sequence: defaults, best-effort load of the parameter file,
    /// quiet bitmap restore.
    ///
    /// A missing parameter file is not an error. A file that fails to load
    /// leaves the defaults in place and its error is returned, but the
    /// store is initialized either way.
    pub fn init(&self) -> Result<(), AttrError> {
        let result = self.locked(|s| s.startup());
        self.initialized.store(true, Ordering::Release);
        result
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn locked<R>(
        &self,
        f: impl FnOnce(&mut State<N, TS, FS, PS, CS>) -> Result<R, AttrError>,
    ) -> Result<R, AttrError> {
        critical_section::with(|cs| {
            let mut state = self
                .state
                .borrow(cs)
                .try_borrow_mut()
                .map_err(|_| AttrError::Busy)?;
            f(&mut *state)
        })
    }

    fn with_state<R>(
        &self,
        f: impl FnOnce(&mut State<N, TS, FS, PS, CS>) -> Result<R, AttrError>,
    ) -> Result<R, AttrError> {
        while !self.is_initialized() {
            core::hint::spin_loop();
        }
        self.locked(f)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn valid_id(&self, id: AttrId) -> bool {
        self.schema.map(id).is_some()
    }

    pub fn entry(&self, id: AttrId) -> Option<&'static AttrEntry> {
        self.schema.entry(id)
    }

    pub fn get_id(&self, name: &str) -> Option<AttrId> {
        self.schema.get_id(name)
    }

    pub fn get_name(&self, id: AttrId) -> Option<&'static str> {
        self.entry(id).map(|e| e.name)
    }

    pub fn get_size(&self, id: AttrId) -> Option<usize> {
        self.entry(id).map(|e| e.size)
    }

    pub fn get_type(&self, id: AttrId) -> Option<AttrType> {
        self.entry(id).map(|e| e.ty)
    }

    /// Copies the current value into `buf` and returns the byte count.
    ///
    /// Runs the entry's prepare hook first. Signed values are sign-extended
    /// to 64 bits before being cut to `buf.len()`.
    pub fn get(&self, id: AttrId, buf: &mut [u8]) -> Result<usize, AttrError> {
        buf.fill(0);
        let (index, entry) = self.schema.locate(id)?;
        if !entry.is(Flags::READABLE) {
            return Err(AttrError::Forbidden);
        }
        self.with_state(|s| {
            s.prepare(index)?;
            Ok(values::copy_out(entry, s.slot(index), buf))
        })
    }

    /// Validated write from outside the firmware, then save and broadcast
    /// (without notifications).
    ///
    /// `ty` must be the entry's type or [`AttrType::Any`]. `raw` holds the
    /// little-endian value; integers may be 1 to 8 bytes wide.
    pub fn set(&self, id: AttrId, ty: AttrType, raw: &[u8]) -> Result<(), AttrError> {
        self.set_internal(id, ty, raw, true)
    }

    /// Like [`set`](Self::set) but leaves the modified bit for the next
    /// broadcast cycle.
    pub fn set_without_broadcast(
        &self,
        id: AttrId,
        ty: AttrType,
        raw: &[u8],
    ) -> Result<(), AttrError> {
        self.set_internal(id, ty, raw, false)
    }

    fn set_internal(
        &self,
        id: AttrId,
        ty: AttrType,
        raw: &[u8],
        broadcast: bool,
    ) -> Result<(), AttrError> {
        let (index, entry) = self.schema.locate(id)?;
        self.with_state(|s| {
            if !s.is_writable(entry) {
                return Err(AttrError::Forbidden);
            }
            if ty != AttrType::Any && ty != entry.ty {
                log::warn!("failure id: {} {} type {}", entry.id, entry.name, ty.name());
                return Err(AttrError::InvalidArgument);
            }
            let value = Value::from_raw(entry.ty, raw)?;
            s.validate(index, &value, false)?;
            s.validate(index, &value, true)?;
            let result = s.save_single(index);
            if broadcast {
                s.broadcast_single(index, false);
            }
            result
        })
    }

    /// Firmware-side write: skips the writable and lock checks.
    fn write_internal(&self, id: AttrId, value: Value<'_>) -> Result<(), AttrError> {
        let (index, _) = self.schema.locate(id)?;
        self.with_state(|s| {
            s.validate(index, &value, true)?;
            // a failed save does not undo the write, consumers still hear about it
            let result = s.save_single(index);
            s.broadcast_single(index, true);
            result
        })
    }

    pub fn set_string(&self, id: AttrId, value: &str) -> Result<(), AttrError> {
        self.write_internal(id, Value::Text(value.as_bytes()))
    }

    pub fn set_byte_array(&self, id: AttrId, value: &[u8]) -> Result<(), AttrError> {
        self.write_internal(id, Value::Bytes(value))
    }

    pub fn set_u64(&self, id: AttrId, value: u64) -> Result<(), AttrError> {
        self.write_internal(id, Value::Unsigned(value))
    }

    pub fn set_i64(&self, id: AttrId, value: i64) -> Result<(), AttrError> {
        self.write_internal(id, Value::Signed(value))
    }

    pub fn set_u32(&self, id: AttrId, value: u32) -> Result<(), AttrError> {
        self.write_internal(id, Value::Unsigned(value.into()))
    }

    pub fn set_i32(&self, id: AttrId, value: i32) -> Result<(), AttrError> {
        self.write_internal(id, Value::Signed(value.into()))
    }

    pub fn set_float(&self, id: AttrId, value: f32) -> Result<(), AttrError> {
        self.write_internal(id, Value::Float(value))
    }

    pub fn set_bool(&self, id: AttrId, value: bool) -> Result<(), AttrError> {
        if self.get_type(id).is_some_and(|ty| ty != AttrType::Bool) {
            return Err(AttrError::InvalidArgument);
        }
        self.write_internal(id, Value::Bool(value))
    }

    /// Sets or clears one bit of an unsigned entry at most 32 bits wide.
    pub fn set_mask32(&self, id: AttrId, bit: u8, value: bool) -> Result<(), AttrError> {
        self.set_mask(id, bit, value, 32)
    }

    /// Sets or clears one bit of an unsigned entry.
    pub fn set_mask64(&self, id: AttrId, bit: u8, value: bool) -> Result<(), AttrError> {
        self.set_mask(id, bit, value, 64)
    }

    fn set_mask(&self, id: AttrId, bit: u8, value: bool, width: usize) -> Result<(), AttrError> {
        if usize::from(bit) >= width {
            return Err(AttrError::InvalidArgument);
        }
        let (index, entry) = self.schema.locate(id)?;
        if !entry.ty.is_unsigned() || entry.size * 8 > width {
            return Err(AttrError::InvalidArgument);
        }
        self.with_state(|s| {
            let current = values::decode(entry, s.slot(index))
                .as_integer()
                .unwrap_or_default() as u64;
            let mask = 1u64 << bit;
            let next = if value { current | mask } else { current & !mask };
            s.validate(index, &Value::Unsigned(next), true)?;
            let result = s.save_single(index);
            s.broadcast_single(index, true);
            result
        })
    }

    /// Runs prepare and hands the decoded value to `f`; the readable flag is
    /// not consulted.
    fn read_entry<R>(
        &self,
        id: AttrId,
        accept: impl Fn(AttrType) -> bool,
        f: impl FnOnce(Value<'_>) -> R,
    ) -> Result<R, AttrError> {
        let (index, entry) = self.schema.locate(id)?;
        if !accept(entry.ty) {
            return Err(AttrError::InvalidArgument);
        }
        self.with_state(|s| {
            s.prepare(index)?;
            Ok(f(values::decode(entry, s.slot(index))))
        })
    }

    /// Value of a `u8`, `u16`, `u32` or bool entry.
    pub fn copy_u32(&self, id: AttrId) -> Result<u32, AttrError> {
        self.read_entry(
            id,
            |ty| matches!(ty, AttrType::U8 | AttrType::U16 | AttrType::U32 | AttrType::Bool),
            |v| v.as_integer().unwrap_or_default() as u32,
        )
    }

    /// Value of an `i8`, `i16` or `i32` entry.
    pub fn copy_i32(&self, id: AttrId) -> Result<i32, AttrError> {
        self.read_entry(
            id,
            |ty| matches!(ty, AttrType::S8 | AttrType::S16 | AttrType::S32),
            |v| v.as_integer().unwrap_or_default() as i32,
        )
    }

    pub fn copy_u64(&self, id: AttrId) -> Result<u64, AttrError> {
        self.read_entry(
            id,
            |ty| ty.is_unsigned(),
            |v| v.as_integer().unwrap_or_default() as u64,
        )
    }

    pub fn copy_i64(&self, id: AttrId) -> Result<i64, AttrError> {
        self.read_entry(
            id,
            |ty| ty.is_signed(),
            |v| v.as_integer().unwrap_or_default() as i64,
        )
    }

    pub fn copy_float(&self, id: AttrId) -> Result<f32, AttrError> {
        self.read_entry(
            id,
            |ty| ty == AttrType::Float,
            |v| match v {
                Value::Float(f) => f,
                _ => 0.0,
            },
        )
    }

    pub fn copy_bool(&self, id: AttrId) -> Result<bool, AttrError> {
        self.read_entry(
            id,
            |ty| ty == AttrType::Bool,
            |v| matches!(v, Value::Bool(true)),
        )
    }

    /// String value, cut at a character boundary to fit `S` bytes.
    pub fn copy_string<const S: usize>(&self, id: AttrId) -> Result<heapless::String<S>, AttrError> {
        self.read_entry(
            id,
            |ty| ty == AttrType::String,
            |v| {
                let mut out = heapless::String::new();
                if let Value::Text(text) = v {
                    let text = match core::str::from_utf8(text) {
                        Ok(s) => s,
                        Err(e) => core::str::from_utf8(&text[..e.valid_up_to()]).unwrap_or(""),
                    };
                    let mut end = text.len().min(S);
                    while !text.is_char_boundary(end) {
                        end -= 1;
                    }
                    let _ = out.push_str(&text[..end]);
                }
                out
            },
        )
    }

    /// Copies a byte array entry into `buf`, returning the byte count.
    pub fn copy_byte_array(&self, id: AttrId, buf: &mut [u8]) -> Result<usize, AttrError> {
        self.read_entry(
            id,
            |ty| ty == AttrType::ByteArray,
            |v| match v {
                Value::Bytes(bytes) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    n
                }
                _ => 0,
            },
        )
    }

    fn alt<T: Copy>(id: AttrId, result: Result<T, AttrError>, alt: T) -> T {
        result.unwrap_or_else(|e| {
            log::debug!("alt value used id [{}]: {}", id, e);
            alt
        })
    }

    pub fn get_u32(&self, id: AttrId, alt: u32) -> u32 {
        Self::alt(id, self.copy_u32(id), alt)
    }

    pub fn get_i32(&self, id: AttrId, alt: i32) -> i32 {
        Self::alt(id, self.copy_i32(id), alt)
    }

    pub fn get_u64(&self, id: AttrId, alt: u64) -> u64 {
        Self::alt(id, self.copy_u64(id), alt)
    }

    pub fn get_i64(&self, id: AttrId, alt: i64) -> i64 {
        Self::alt(id, self.copy_i64(id), alt)
    }

    pub fn get_float(&self, id: AttrId, alt: f32) -> f32 {
        Self::alt(id, self.copy_float(id), alt)
    }

    pub fn get_bool(&self, id: AttrId, alt: bool) -> bool {
        Self::alt(id, self.copy_bool(id), alt)
    }

    /// Restores one entry's default without marking it modified.
    pub fn default(&self, id: AttrId) -> Result<(), AttrError> {
        let (index, entry) = self.schema.locate(id)?;
        self.with_state(|s| {
            s.values.reset_entry(&s.schema, index);
            show::log_show(entry, s.slot(index));
            Ok(())
        })
    }

    /// Whether the entry has changed since the last broadcast cycle.
    pub fn is_modified(&self, id: AttrId) -> bool {
        self.schema
            .map(id)
            .is_some_and(|i| self.with_state(|s| Ok(s.modified.get(i))).unwrap_or(false))
    }

    /// Silences (or restores) the change log line of an entry. The quiet
    /// bitmap is persisted whenever it changes.
    pub fn set_quiet(&self, id: AttrId, value: bool) -> Result<(), AttrError> {
        let (index, _) = self.schema.locate(id)?;
        self.with_state(|s| {
            if s.quiet.get(index) == value {
                return Ok(());
            }
            s.quiet.set(index, value);
            s.persist_quiet()
        })
    }

    pub fn get_quiet(&self, id: AttrId) -> bool {
        self.schema
            .map(id)
            .is_some_and(|i| self.with_state(|s| Ok(s.quiet.get(i))).unwrap_or(false))
    }

    /// Requests a sink notification whenever the entry changes through a
    /// firmware-side write.
    pub fn set_notify(&self, id: AttrId, value: bool) -> Result<(), AttrError> {
        let (index, entry) = self.schema.locate(id)?;
        if !entry.is(Flags::READABLE) {
            return Err(AttrError::InvalidArgument);
        }
        self.with_state(|s| {
            s.notify.set(index, value);
            Ok(())
        })
    }

    pub fn get_notify(&self, id: AttrId) -> bool {
        self.schema
            .map(id)
            .is_some_and(|i| self.with_state(|s| Ok(s.notify.get(i))).unwrap_or(false))
    }

    pub fn disable_notify(&self) -> Result<(), AttrError> {
        self.with_state(|s| {
            s.notify = Bitmap::new();
            Ok(())
        })
    }

    /// Loads an external parameter file.
    ///
    /// Every pair is validated before any is written; one bad pair rejects
    /// the file. The result is saved and broadcast without notifications.
    /// Returns the number of pairs applied.
    pub fn load(&self, name: &str) -> Result<usize, AttrError> {
        self.with_state(|s| {
            let pairs = s.load_attributes(name, true, false)?;
            // broadcast even when the save fails
            let result = s.save_attributes();
            s.broadcast_handler(false);
            result.map(|()| pairs)
        })
    }

    /// Writes every savable entry to the parameter file.
    pub fn save(&self) -> Result<(), AttrError> {
        self.with_state(|s| s.save_attributes())
    }

    /// Runs a broadcast cycle for whatever is currently modified.
    pub fn broadcast(&self) -> Result<(), AttrError> {
        self.with_state(|s| {
            s.broadcast_handler(true);
            Ok(())
        })
    }

    /// Deletes the quiet file, restores every default and saves.
    pub fn factory_reset(&self) -> Result<(), AttrError> {
        self.with_state(|s| {
            match s.params.delete(s.config.quiet_file_name) {
                Ok(()) | Err(StoreError::NotFound) => {}
                Err(e) => log::warn!("Unable to delete quiet file: {}", e),
            }
            s.values.factory_reset(&s.schema);
            s.save_attributes()
        })
    }

    /// Writes the selected entries in parameter file format to `out`,
    /// refreshing each through its prepare hook first. Returns the entry
    /// count.
    pub fn prepare_then_dump<const D: usize>(
        &self,
        kind: DumpKind,
        out: &mut heapless::Vec<u8, D>,
    ) -> Result<usize, AttrError> {
        self.with_state(|s| {
            for i in 0..s.schema.len() {
                let entry = s.schema.entry_at(i);
                if kind.includes(entry.flags) {
                    if let Err(e) = s.prepare(i) {
                        log::warn!("Prepare failed for {} {}: {}", entry.id, entry.name, e);
                    }
                }
            }
            out.clear();
            let count = generate(&s.schema, &s.values, out, |e| kind.includes(e.flags))?;
            param_file::validate_bytes(out)?;
            Ok(count)
        })
    }

    /// Gives access to the backends while the store is locked.
    pub fn with_backends<R>(&self, f: impl FnOnce(&mut PS, &mut CS) -> R) -> Result<R, AttrError> {
        self.with_state(|s| Ok(f(&mut s.params, &mut s.sink)))
    }
}

#[cfg(feature = "shell")]
impl<const N: usize, const TS: usize, const FS: usize, PS, CS> AttributeStore<N, TS, FS, PS, CS>
where
    PS: ParamStore,
    CS: ChangeSink,
    BitsImpl<N>: Bits,
{
    /// Logs the show line of one entry.
    pub fn show(&self, id: AttrId) -> Result<(), AttrError> {
        let (index, entry) = self.schema.locate(id)?;
        self.with_state(|s| {
            show::log_show(entry, s.slot(index));
            Ok(())
        })
    }

    /// Logs the show line of every entry.
    pub fn show_all(&self) -> Result<(), AttrError> {
        self.with_state(|s| {
            for (i, entry) in s.schema.iter() {
                show::log_show(entry, s.slot(i));
            }
            Ok(())
        })
    }

    /// Deletes the parameter file; values in memory are kept.
    pub fn delete(&self) -> Result<(), AttrError> {
        self.with_state(|s| s.params.delete(s.config.file_name).map_err(AttrError::from))
    }
}

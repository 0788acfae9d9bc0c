use crate::attr::AttrId;

/// Runtime settings of an [`AttributeStore`](crate::attr::AttributeStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Parameter file holding every savable entry.
    pub file_name: &'static str,
    /// File holding the quiet bitmap.
    pub quiet_file_name: &'static str,
    /// Abort a load at the first pair that fails to write.
    pub break_on_load_failure: bool,
    /// Boolean entry gating every lockable entry.
    pub lock_id: Option<AttrId>,
    /// String entry naming an external file to load from.
    pub load_path_id: Option<AttrId>,
}

impl StoreConfig {
    pub const fn new() -> Self {
        Self {
            file_name: "/lfs/attr.txt",
            quiet_file_name: "/lfs/quiet.bin",
            break_on_load_failure: false,
            lock_id: None,
            load_path_id: None,
        }
    }

    pub const fn file_name(mut self, name: &'static str) -> Self {
        self.file_name = name;
        self
    }

    pub const fn quiet_file_name(mut self, name: &'static str) -> Self {
        self.quiet_file_name = name;
        self
    }

    pub const fn break_on_load_failure(mut self, enabled: bool) -> Self {
        self.break_on_load_failure = enabled;
        self
    }

    pub const fn lock_id(mut self, id: AttrId) -> Self {
        self.lock_id = Some(id);
        self
    }

    pub const fn load_path_id(mut self, id: AttrId) -> Self {
        self.load_path_id = Some(id);
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

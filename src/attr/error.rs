/// Errors returned by the attribute engine and its validators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttrError {
    /// No entry is mapped to the id (or the named file does not exist).
    NotFound,
    /// Capability flags or the global lock forbid the operation.
    Forbidden,
    /// Candidate has the wrong type, shape or length.
    InvalidArgument,
    /// Candidate is outside the entry's bounds or native width.
    OutOfRange,
    /// Backing store or serialization failure.
    Io,
    /// Malformed parameter file or JSON document.
    Parse,
    /// Engine re-entered while already locked.
    Busy,
}

impl AttrError {
    /// Negative errno-style code for callers that speak the numeric code space.
    pub const fn code(&self) -> i32 {
        match self {
            AttrError::NotFound => -2,
            AttrError::Forbidden => -1,
            AttrError::InvalidArgument => -22,
            AttrError::OutOfRange => -34,
            AttrError::Io => -5,
            AttrError::Parse => -74,
            AttrError::Busy => -16,
        }
    }
}

impl core::fmt::Display for AttrError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AttrError::NotFound => write!(f, "attribute or file not found"),
            AttrError::Forbidden => write!(f, "operation not permitted"),
            AttrError::InvalidArgument => write!(f, "invalid attribute value"),
            AttrError::OutOfRange => write!(f, "attribute value out of range"),
            AttrError::Io => write!(f, "parameter storage failure"),
            AttrError::Parse => write!(f, "malformed input"),
            AttrError::Busy => write!(f, "attribute engine busy"),
        }
    }
}

/// Errors reported by a [`ParamStore`](crate::attr::ParamStore) backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// The named file does not exist.
    NotFound,
    /// File contents do not fit the supplied buffer or the backend capacity.
    TooLarge,
    /// Any other backend failure.
    Io,
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "file not found"),
            StoreError::TooLarge => write!(f, "file too large"),
            StoreError::Io => write!(f, "storage i/o error"),
        }
    }
}

impl From<StoreError> for AttrError {
    fn from(e: StoreError) -> AttrError {
        match e {
            StoreError::NotFound => AttrError::NotFound,
            StoreError::TooLarge | StoreError::Io => AttrError::Io,
        }
    }
}

/// Errors a [`ChangeSink`](crate::attr::ChangeSink) may return from a notify callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NotifyError {
    /// Nobody is connected to receive the notification.
    NotConnected,
    /// Delivery failed.
    Failed,
}

impl core::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NotifyError::NotConnected => write!(f, "not connected"),
            NotifyError::Failed => write!(f, "notification failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_negative_and_distinct() {
        let all = [
            AttrError::NotFound,
            AttrError::Forbidden,
            AttrError::InvalidArgument,
            AttrError::OutOfRange,
            AttrError::Io,
            AttrError::Parse,
            AttrError::Busy,
        ];
        for (i, a) in all.iter().enumerate() {
            assert!(a.code() < 0);
            for b in &all[i + 1..] {
                assert_ne!(a.code(), b.code());
            }
        }
    }

    #[test]
    fn store_errors_map_into_attr_errors() {
        assert_eq!(AttrError::from(StoreError::NotFound), AttrError::NotFound);
        assert_eq!(AttrError::from(StoreError::TooLarge), AttrError::Io);
        assert_eq!(AttrError::from(StoreError::Io), AttrError::Io);
    }
}

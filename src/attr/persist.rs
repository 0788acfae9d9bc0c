use crate::attr::StoreError;

/// Backing store for the parameter and quiet files.
///
/// Writes are expected to be atomic: a reader never observes a partially
/// written file.
pub trait ParamStore {
    /// Reads `name` into `buf`, returning the byte count.
    fn read(&mut self, name: &str, buf: &mut [u8]) -> Result<usize, StoreError>;
    /// Replaces the contents of `name`.
    fn write(&mut self, name: &str, data: &[u8]) -> Result<(), StoreError>;
    /// Removes `name`.
    fn delete(&mut self, name: &str) -> Result<(), StoreError>;
}

/// Store without files: reads find nothing and writes are discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStore;

impl ParamStore for NoStore {
    fn read(&mut self, _name: &str, _buf: &mut [u8]) -> Result<usize, StoreError> {
        Err(StoreError::NotFound)
    }

    fn write(&mut self, _name: &str, _data: &[u8]) -> Result<(), StoreError> {
        Ok(())
    }

    fn delete(&mut self, _name: &str) -> Result<(), StoreError> {
        Err(StoreError::NotFound)
    }
}

/// Longest file name a [`RamStore`] keeps.
pub const RAM_NAME_LEN: usize = 32;

type FileName = heapless::String<RAM_NAME_LEN>;

/// In-memory store holding up to `F` files of at most `CAP` bytes each.
///
/// Useful on targets where the filesystem is mounted later, and in tests.
pub struct RamStore<const F: usize, const CAP: usize> {
    files: heapless::Vec<(FileName, heapless::Vec<u8, CAP>), F>,
    writes: usize,
}

impl<const F: usize, const CAP: usize> core::fmt::Debug for RamStore<F, CAP> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RamStore")
            .field("files", &self.files.len())
            .field("writes", &self.writes)
            .finish_non_exhaustive()
    }
}

impl<const F: usize, const CAP: usize> Default for RamStore<F, CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const F: usize, const CAP: usize> RamStore<F, CAP> {
    pub const fn new() -> Self {
        Self {
            files: heapless::Vec::new(),
            writes: 0,
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.files.iter().position(|(n, _)| n.as_str() == name)
    }

    /// Contents of `name`, if present.
    pub fn file(&self, name: &str) -> Option<&[u8]> {
        self.position(name).map(|i| self.files[i].1.as_slice())
    }

    /// Number of successful writes since creation.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl<const F: usize, const CAP: usize> ParamStore for RamStore<F, CAP> {
    fn read(&mut self, name: &str, buf: &mut [u8]) -> Result<usize, StoreError> {
        let data = self.file(name).ok_or(StoreError::NotFound)?;
        let out = buf.get_mut(..data.len()).ok_or(StoreError::TooLarge)?;
        out.copy_from_slice(data);
        Ok(data.len())
    }

    fn write(&mut self, name: &str, data: &[u8]) -> Result<(), StoreError> {
        let contents = heapless::Vec::from_slice(data).map_err(|_| StoreError::TooLarge)?;
        match self.position(name) {
            Some(i) => self.files[i].1 = contents,
            None => {
                let mut key = FileName::new();
                key.push_str(name).map_err(|_| StoreError::Io)?;
                self.files
                    .push((key, contents))
                    .map_err(|_| StoreError::Io)?;
            }
        }
        self.writes += 1;
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<(), StoreError> {
        let i = self.position(name).ok_or(StoreError::NotFound)?;
        self.files.swap_remove(i);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ram_store_round_trips_files() {
        let mut store: RamStore<2, 8> = RamStore::new();
        store.write("/a", b"abc").unwrap();
        store.write("/a", b"xy").unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(store.read("/a", &mut buf), Ok(2));
        assert_eq!(&buf[..2], b"xy");
        assert_eq!(store.writes(), 2);
    }

    #[test]
    fn ram_store_reports_missing_and_oversized() {
        let mut store: RamStore<1, 4> = RamStore::new();
        let mut buf = [0u8; 2];
        assert_eq!(store.read("/a", &mut buf), Err(StoreError::NotFound));
        assert_eq!(store.write("/a", b"12345"), Err(StoreError::TooLarge));
        store.write("/a", b"123").unwrap();
        assert_eq!(store.read("/a", &mut buf), Err(StoreError::TooLarge));
        assert_eq!(store.write("/b", b"1"), Err(StoreError::Io));
        assert_eq!(store.delete("/b"), Err(StoreError::NotFound));
        store.delete("/a").unwrap();
        assert_eq!(store.file("/a"), None);
    }

    #[test]
    fn no_store_discards_everything() {
        let mut store = NoStore;
        assert_eq!(store.write("/a", b"1"), Ok(()));
        assert_eq!(store.read("/a", &mut [0u8; 1]), Err(StoreError::NotFound));
    }
}

use crate::nvm::{Error, storage::EventSink};

/// Geometry of a non-volatile medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageInfo {
    /// Smallest erasable unit in bytes.
    pub erase_unit: u32,
    /// Value erased memory reads back as.
    pub erase_value: u8,
    /// Smallest programmable unit in bytes.
    pub program_unit: u32,
    /// True if the medium can be overwritten without a prior erase.
    pub no_explicit_erase: bool,
}

impl StorageInfo {
    /// Granularity enforced on erase requests.
    ///
    /// Media without explicit erase only simulate it, so program-unit
    /// alignment is enough.
    pub fn erase_align(&self) -> u32 {
        if self.no_explicit_erase {
            self.program_unit
        } else {
            self.erase_unit
        }
    }
}

/// Medium-specific implementation behind a [`Storage`](crate::nvm::Storage).
///
/// Requests reaching a backend are already validated: the range lies inside
/// the instance's address window and lengths respect the granularity
/// reported by [`StorageBackend::info`]. Backends only report failures of
/// their own (`Busy`, `Forbidden`, `NotSupported`, `Internal`, ...).
///
/// A successful `write` or `erase` raises exactly one event through `events`,
/// either before returning or later from the backend's own context.
///
/// Backends are shared by every bound [`Storage`](crate::nvm::Storage) and
/// reached from interrupt context, so they must be `Sync`.
pub trait StorageBackend: Sync {
    /// Geometry of the medium.
    fn info(&self) -> StorageInfo;

    fn init(&self) -> Result<(), Error>;

    fn uninit(&self) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    fn read(&self, src: u32, dest: &mut [u8]) -> Result<(), Error>;

    fn write(&self, dest: u32, src: &[u8], ctx: usize, events: EventSink) -> Result<(), Error>;

    fn erase(&self, _addr: u32, _len: u32, _ctx: usize, _events: EventSink) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    /// Returns true while an operation is outstanding.
    fn is_busy(&self) -> bool {
        false
    }
}

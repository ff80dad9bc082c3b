//! Non-volatile storage front end and its pluggable backends.
//!
//! A [`Storage`] instance owns an address window and an optional event
//! handler. Requests are checked against the window and the bound medium's
//! geometry before they reach the [`StorageBackend`].

pub mod backend;
pub mod builder;
pub mod event;
pub mod rram;
pub mod sim;

pub use backend::{StorageBackend, StorageInfo};
pub use builder::StorageBuilder;
pub use event::{Dispatch, EventHandler, EventKind, EventSink, StorageEvent};
pub use rram::{RRAM_WRITE_BLOCK_SIZE, RramBackend, RramController};
pub use sim::{SimBackend, SimMode};

use crate::nvm::{
    Error,
    helpers::{check_granularity, range_end},
};

struct Binding<'a> {
    backend: &'a dyn StorageBackend,
    info: StorageInfo,
}

/// One client's view of a storage medium.
///
/// Several instances may share a backend, each with its own address window
/// and handler. An instance is unusable until [`Storage::init`] binds it.
pub struct Storage<'a> {
    binding: Option<Binding<'a>>,
    start_addr: u32,
    end_addr: u32,
    events: EventSink,
}

impl<'a> Storage<'a> {
    pub(crate) fn new(start_addr: u32, end_addr: u32, events: EventSink) -> Self {
        Self {
            binding: None,
            start_addr,
            end_addr,
            events,
        }
    }

    /// Binds `backend` and initializes it.
    ///
    /// Returns `InvalidState` if the instance is already bound. A backend
    /// failure is returned unchanged and leaves the instance unbound.
    pub fn init(&mut self, backend: &'a dyn StorageBackend) -> Result<(), Error> {
        if self.binding.is_some() {
            return Err(Error::InvalidState);
        }

        self.binding = Some(Binding {
            backend,
            info: backend.info(),
        });

        if let Err(e) = backend.init() {
            self.binding = None;
            return Err(e);
        }

        log::debug!(
            "storage {:#x}..{:#x} bound",
            self.start_addr,
            self.end_addr
        );
        Ok(())
    }

    /// Releases the backend. The binding is kept if the backend refuses.
    pub fn uninit(&mut self) -> Result<(), Error> {
        let binding = self.binding.as_ref().ok_or(Error::InvalidState)?;
        binding.backend.uninit()?;
        self.binding = None;
        Ok(())
    }

    fn bound(&self) -> Result<&Binding<'a>, Error> {
        self.binding.as_ref().ok_or(Error::InvalidState)
    }

    fn len_u32(len: usize) -> Result<u32, Error> {
        u32::try_from(len).map_err(|_| Error::InvalidLength)
    }

    /// Reads `dest.len()` bytes starting at `src`.
    pub fn read(&self, src: u32, dest: &mut [u8]) -> Result<(), Error> {
        let b = self.bound()?;
        let len = Self::len_u32(dest.len())?;
        range_end(src, len, self.start_addr, self.end_addr)?;
        b.backend.read(src, dest)
    }

    /// Programs `src` at `dest`.
    ///
    /// The length must be a multiple of the medium's program unit. `ctx` is
    /// echoed back in the completion event.
    pub fn write(&self, dest: u32, src: &[u8], ctx: usize) -> Result<(), Error> {
        let b = self.bound()?;
        let len = Self::len_u32(src.len())?;
        check_granularity(len, b.info.program_unit)?;
        range_end(dest, len, self.start_addr, self.end_addr)?;
        b.backend.write(dest, src, ctx, self.events)
    }

    /// Erases `len` bytes starting at `addr`.
    pub fn erase(&self, addr: u32, len: u32, ctx: usize) -> Result<(), Error> {
        let b = self.bound()?;
        check_granularity(len, b.info.erase_align())?;
        range_end(addr, len, self.start_addr, self.end_addr)?;
        b.backend.erase(addr, len, ctx, self.events)
    }

    /// True while the backend has work in flight, or if nothing is bound.
    pub fn is_busy(&self) -> bool {
        match &self.binding {
            Some(b) => b.backend.is_busy(),
            None => true,
        }
    }

    /// Geometry of the bound medium.
    pub fn info(&self) -> Option<StorageInfo> {
        self.binding.as_ref().map(|b| b.info)
    }

    pub fn is_initialized(&self) -> bool {
        self.binding.is_some()
    }

    pub fn start_addr(&self) -> u32 {
        self.start_addr
    }

    pub fn end_addr(&self) -> u32 {
        self.end_addr
    }
}

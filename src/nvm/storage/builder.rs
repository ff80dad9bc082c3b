use core::marker::PhantomData;

use crate::nvm::{
    Error,
    storage::{EventHandler, EventSink, Storage},
};

// Builder states
pub struct NeedRange;
pub struct Ready;

/// Typestate builder for an unbound [`Storage`] instance.
///
/// ```
/// use embedded_persist::nvm::{StorageBuilder, StorageEvent};
///
/// fn on_event(_evt: &StorageEvent<'_>) {}
///
/// let storage = StorageBuilder::new()
///     .address_range(0x0007_0000, 0x0007_4000)
///     .event_handler(on_event)
///     .build()?;
/// assert!(!storage.is_initialized());
/// # Ok::<(), embedded_persist::nvm::Error>(())
/// ```
pub struct StorageBuilder<State> {
    start_addr: u32,
    end_addr: u32,
    handler: Option<EventHandler>,
    _phantom: PhantomData<State>,
}

// Start the builder
impl StorageBuilder<NeedRange> {
    pub fn new() -> Self {
        StorageBuilder {
            start_addr: 0,
            end_addr: 0,
            handler: None,
            _phantom: PhantomData,
        }
    }

    /// Set the `[start, end)` window the instance may touch.
    ///
    /// The range is checked by [`build`](StorageBuilder::build).
    pub fn address_range(self, start: u32, end: u32) -> StorageBuilder<Ready> {
        StorageBuilder {
            start_addr: start,
            end_addr: end,
            handler: self.handler,
            _phantom: PhantomData,
        }
    }
}

impl Default for StorageBuilder<NeedRange> {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBuilder<Ready> {
    /// Set the completion handler for write and erase events.
    pub fn event_handler(mut self, handler: EventHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Build the unbound instance.
    ///
    /// Returns `InvalidAddress` if the window ends below its start.
    pub fn build<'a>(self) -> Result<Storage<'a>, Error> {
        if self.end_addr < self.start_addr {
            log::warn!(
                "address range end {:#x} is below start {:#x}",
                self.end_addr,
                self.start_addr
            );
            return Err(Error::InvalidAddress);
        }
        Ok(Storage::new(
            self.start_addr,
            self.end_addr,
            EventSink::new(self.handler),
        ))
    }
}

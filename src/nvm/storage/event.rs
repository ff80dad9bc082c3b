use crate::nvm::Error;

/// Operation an event reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Completion of [`Storage::write`](crate::nvm::Storage::write).
    WriteResult,
    /// Completion of [`Storage::erase`](crate::nvm::Storage::erase).
    EraseResult,
}

/// How an event reached the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Delivered before the initiating call returned.
    Sync,
    /// Delivered later, from the backend's own execution context.
    Async,
}

/// One completed storage operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageEvent<'a> {
    pub kind: EventKind,
    pub dispatch: Dispatch,
    pub result: Result<(), Error>,
    /// Address the operation targeted.
    pub addr: u32,
    /// Bytes that were written; `None` for erase.
    pub src: Option<&'a [u8]>,
    pub len: u32,
    /// Opaque value passed by the caller of the operation.
    pub ctx: usize,
}

/// Completion callback registered on a storage instance.
pub type EventHandler = fn(&StorageEvent<'_>);

/// Where a backend delivers completion events.
///
/// Wraps the storage instance's optional handler so backends can send
/// unconditionally.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventSink(Option<EventHandler>);

impl EventSink {
    pub const fn new(handler: Option<EventHandler>) -> Self {
        Self(handler)
    }

    pub const fn none() -> Self {
        Self(None)
    }

    pub fn is_connected(&self) -> bool {
        self.0.is_some()
    }

    /// Invokes the handler, if any.
    pub fn send(&self, evt: &StorageEvent<'_>) {
        if let Some(handler) = self.0 {
            handler(evt);
        }
    }
}

#![allow(unsafe_code)]

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;

use crate::nvm::{
    Error,
    block_pool::{BlockId, BlockPool},
    critical::CriticalGuard,
};

/// Deferred handler; receives the payload copied at `defer` time.
pub type EventFn = fn(&[u8]);

struct Deferred {
    handler: EventFn,
    payload: Option<BlockId>,
    len: usize,
}

/// Hands events from any context over to the main loop.
///
/// Payloads are copied into blocks of a [`BlockPool`]; nodes wait in a
/// queue of `N` slots. Both are bounded, so [`Scheduler::defer`] never
/// allocates and is safe to call from interrupt context.
pub struct Scheduler<'a, const N: usize> {
    arena: BlockPool<'a>,
    queue: Mutex<RefCell<Deque<Deferred, N>>>,
}

impl<'a, const N: usize> Scheduler<'a, N> {
    pub fn new(arena: BlockPool<'a>) -> Self {
        Self {
            arena,
            queue: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Queues `handler` to run with a copy of `data` on the next [`process`].
    ///
    /// * `NullArgument` if `handler` is `None`
    /// * `InvalidParameter` if `data` is present but empty
    /// * `OutOfMemory` if the payload arena or the node queue is exhausted;
    ///   the event is dropped
    ///
    /// [`process`]: Scheduler::process
    pub fn defer(&self, handler: Option<EventFn>, data: Option<&[u8]>) -> Result<(), Error> {
        let handler = handler.ok_or(Error::NullArgument)?;
        let data: &[u8] = match data {
            Some([]) => return Err(Error::InvalidParameter),
            Some(d) => d,
            None => &[],
        };

        let payload = if data.is_empty() {
            None
        } else {
            let blocks = data.len().div_ceil(self.arena.block_size());
            let id = self.arena.acquire(blocks).ok_or(Error::OutOfMemory)?;
            // SAFETY: `id` was just acquired for `blocks` blocks covering `data.len()`.
            match unsafe { self.arena.bytes_mut(id, data.len()) } {
                Some(buf) => buf.copy_from_slice(data),
                None => {
                    self.arena.release_run(id, blocks);
                    return Err(Error::OutOfMemory);
                }
            }
            Some(id)
        };

        let node = Deferred {
            handler,
            payload,
            len: data.len(),
        };

        let pushed = {
            let guard = CriticalGuard::enter();
            self.queue.borrow_ref_mut(guard.token()).push_back(node)
        };

        if let Err(node) = pushed {
            self.free(&node);
            log::warn!("scheduler queue full, dropping event for {:#x}", handler as usize);
            return Err(Error::OutOfMemory);
        }

        log::debug!("event of {} bytes scheduled for {:#x}", data.len(), handler as usize);
        Ok(())
    }

    /// Same as [`Scheduler::defer`] with an empty payload meaning "no data".
    pub fn schedule(&self, handler: EventFn, payload: &[u8]) -> Result<(), Error> {
        let data = if payload.is_empty() { None } else { Some(payload) };
        self.defer(Some(handler), data)
    }

    /// Dispatches queued events in submission order until the queue is empty.
    ///
    /// Handlers run outside the critical section and may defer new events,
    /// which are dispatched by this same call. Must only be called from the
    /// main context. Returns the number of dispatched events.
    pub fn process(&self) -> usize {
        let mut dispatched = 0;

        loop {
            let next = {
                let guard = CriticalGuard::enter();
                self.queue.borrow_ref_mut(guard.token()).pop_front()
            };
            let Some(node) = next else {
                break;
            };

            let data: &[u8] = match node.payload {
                // SAFETY: the node owns its blocks until `free` below.
                Some(id) => match unsafe { self.arena.bytes(id, node.len) } {
                    Some(bytes) => bytes,
                    None => {
                        log::error!(
                            "payload blocks for {:#x} released early, dropping event",
                            node.handler as usize
                        );
                        self.free(&node);
                        continue;
                    }
                },
                None => &[],
            };

            log::debug!("dispatching event to {:#x}", node.handler as usize);
            (node.handler)(data);
            self.free(&node);
            dispatched += 1;
        }

        dispatched
    }

    /// Number of events waiting for [`Scheduler::process`].
    pub fn pending(&self) -> usize {
        critical_section::with(|cs| self.queue.borrow_ref(cs).len())
    }

    fn free(&self, node: &Deferred) {
        if let Some(id) = node.payload {
            let blocks = node.len.div_ceil(self.arena.block_size());
            self.arena.release_run(id, blocks);
        }
    }
}

use core::cell::RefCell;

use critical_section::Mutex;

use crate::nvm::{Error, critical::CriticalGuard};

struct Ring<'a> {
    buf: &'a mut [u8],
    item_size: usize,
    capacity: usize,
    head: usize,
    tail: usize,
    count: usize,
}

impl Ring<'_> {
    fn slot(&self, index: usize) -> core::ops::Range<usize> {
        let off = index * self.item_size;
        off..off + self.item_size
    }
}

/// Fixed-capacity FIFO of fixed-size items over caller-supplied memory.
///
/// All mutators run inside a critical section, so one side may live in an
/// interrupt handler while the other runs in the main loop.
pub struct CircularBuffer<'a> {
    ring: Mutex<RefCell<Ring<'a>>>,
}

impl<'a> CircularBuffer<'a> {
    /// Creates a buffer holding `capacity` items of `item_size` bytes.
    ///
    /// Returns `InvalidParameter` if either count is zero or `backing` is
    /// shorter than `capacity * item_size`.
    pub fn new(backing: &'a mut [u8], capacity: usize, item_size: usize) -> Result<Self, Error> {
        if capacity == 0 || item_size == 0 {
            return Err(Error::InvalidParameter);
        }
        let needed = capacity
            .checked_mul(item_size)
            .ok_or(Error::InvalidParameter)?;
        if backing.len() < needed {
            return Err(Error::InvalidParameter);
        }

        Ok(Self {
            ring: Mutex::new(RefCell::new(Ring {
                buf: backing,
                item_size,
                capacity,
                head: 0,
                tail: 0,
                count: 0,
            })),
        })
    }

    fn with_ring<R>(&self, f: impl FnOnce(&mut Ring<'a>) -> R) -> R {
        let guard = CriticalGuard::enter();
        let mut ring = self.ring.borrow_ref_mut(guard.token());
        f(&mut ring)
    }

    /// Copies `item` into the tail slot.
    pub fn enqueue(&self, item: &[u8]) -> Result<(), Error> {
        self.with_ring(|r| {
            if item.len() != r.item_size {
                return Err(Error::InvalidParameter);
            }
            if r.count == r.capacity {
                return Err(Error::OutOfMemory);
            }

            let slot = r.slot(r.tail);
            r.buf[slot].copy_from_slice(item);
            r.tail = (r.tail + 1) % r.capacity;
            r.count += 1;
            Ok(())
        })
    }

    /// Moves the oldest item into `out`.
    pub fn dequeue(&self, out: &mut [u8]) -> Result<(), Error> {
        self.with_ring(|r| {
            if out.len() != r.item_size {
                return Err(Error::InvalidParameter);
            }
            if r.count == 0 {
                return Err(Error::NotFound);
            }

            let slot = r.slot(r.head);
            out.copy_from_slice(&r.buf[slot]);
            r.head = (r.head + 1) % r.capacity;
            r.count -= 1;
            Ok(())
        })
    }

    /// Copies the oldest item into `out` without removing it.
    pub fn peek(&self, out: &mut [u8]) -> Result<(), Error> {
        self.with_ring(|r| {
            if out.len() != r.item_size {
                return Err(Error::InvalidParameter);
            }
            if r.count == 0 {
                return Err(Error::NotFound);
            }

            let slot = r.slot(r.head);
            out.copy_from_slice(&r.buf[slot]);
            Ok(())
        })
    }

    /// Drops the oldest item.
    pub fn discard(&self) -> Result<(), Error> {
        self.with_ring(|r| {
            if r.count == 0 {
                return Err(Error::NotFound);
            }
            r.head = (r.head + 1) % r.capacity;
            r.count -= 1;
            Ok(())
        })
    }

    pub fn clear(&self) {
        self.with_ring(|r| {
            r.head = 0;
            r.tail = 0;
            r.count = 0;
        })
    }

    pub fn len(&self) -> usize {
        self.with_ring(|r| r.count)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.with_ring(|r| r.count == r.capacity)
    }

    pub fn capacity(&self) -> usize {
        self.with_ring(|r| r.capacity)
    }

    pub fn item_size(&self) -> usize {
        self.with_ring(|r| r.item_size)
    }
}

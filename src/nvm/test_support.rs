//! Test support utilities - only compiled in test builds.

use core::{
    cell::RefCell,
    sync::atomic::{AtomicU32, Ordering},
};

use critical_section::Mutex;
use heapless::Deque;

use crate::nvm::{
    Error,
    storage::{
        Dispatch, EventKind, EventSink, RramController, StorageBackend, StorageEvent, StorageInfo,
    },
};

/// Fresh, all-free lock words for a `BlockPool`.
pub fn lock_array<const W: usize>() -> [AtomicU32; W] {
    core::array::from_fn(|_| AtomicU32::new(0))
}

/// Copy of the fields tests assert on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded {
    pub kind: EventKind,
    pub dispatch: Dispatch,
    pub result: Result<(), Error>,
    pub addr: u32,
    pub len: u32,
    pub ctx: usize,
}

/// Event log shared with a `fn` handler through a static.
///
/// Tests in one module run in parallel against the same log, so each test
/// should use a distinct `ctx` and search with [`RecordedEvents::any`].
pub struct RecordedEvents(Mutex<RefCell<Deque<Recorded, 32>>>);

impl RecordedEvents {
    pub const fn new() -> Self {
        Self(Mutex::new(RefCell::new(Deque::new())))
    }

    pub fn push(&self, evt: &StorageEvent<'_>) {
        let rec = Recorded {
            kind: evt.kind,
            dispatch: evt.dispatch,
            result: evt.result,
            addr: evt.addr,
            len: evt.len,
            ctx: evt.ctx,
        };
        critical_section::with(|cs| {
            let mut log = self.0.borrow_ref_mut(cs);
            if log.is_full() {
                log.pop_front();
            }
            let _ = log.push_back(rec);
        });
    }

    pub fn any(&self, f: impl Fn(&Recorded) -> bool) -> bool {
        critical_section::with(|cs| self.0.borrow_ref(cs).iter().any(f))
    }
}

/// Asserts that a successful event with these fields was recorded.
pub fn assert_event_seen(log: &RecordedEvents, kind: EventKind, addr: u32, len: u32, ctx: usize) {
    assert!(
        log.any(|e| e.kind == kind && e.addr == addr && e.len == len && e.ctx == ctx
            && e.result.is_ok()),
        "no {:?} event for addr {:#x} len {} ctx {:#x}",
        kind,
        addr,
        len,
        ctx
    );
}

/// Backend that accepts everything and answers synchronously.
pub struct FakeBackend {
    info: StorageInfo,
    init_result: Result<(), Error>,
    uninit_result: Result<(), Error>,
    init_calls: AtomicU32,
    write_calls: AtomicU32,
}

impl FakeBackend {
    pub fn new(program_unit: u32) -> Self {
        Self {
            info: StorageInfo {
                erase_unit: program_unit,
                erase_value: 0xFF,
                program_unit,
                no_explicit_erase: true,
            },
            init_result: Ok(()),
            uninit_result: Ok(()),
            init_calls: AtomicU32::new(0),
            write_calls: AtomicU32::new(0),
        }
    }

    pub fn with_erase_unit(mut self, erase_unit: u32, no_explicit_erase: bool) -> Self {
        self.info.erase_unit = erase_unit;
        self.info.no_explicit_erase = no_explicit_erase;
        self
    }

    pub fn failing_init(mut self, err: Error) -> Self {
        self.init_result = Err(err);
        self
    }

    pub fn failing_uninit(mut self, err: Error) -> Self {
        self.uninit_result = Err(err);
        self
    }

    pub fn init_calls(&self) -> u32 {
        self.init_calls.load(Ordering::Relaxed)
    }

    pub fn write_calls(&self) -> u32 {
        self.write_calls.load(Ordering::Relaxed)
    }
}

impl StorageBackend for FakeBackend {
    fn info(&self) -> StorageInfo {
        self.info
    }

    fn init(&self) -> Result<(), Error> {
        self.init_calls.fetch_add(1, Ordering::Relaxed);
        self.init_result
    }

    fn uninit(&self) -> Result<(), Error> {
        self.uninit_result
    }

    fn read(&self, _src: u32, dest: &mut [u8]) -> Result<(), Error> {
        dest.fill(self.info.erase_value);
        Ok(())
    }

    fn write(&self, dest: u32, src: &[u8], ctx: usize, events: EventSink) -> Result<(), Error> {
        self.write_calls.fetch_add(1, Ordering::Relaxed);
        events.send(&StorageEvent {
            kind: EventKind::WriteResult,
            dispatch: Dispatch::Sync,
            result: Ok(()),
            addr: dest,
            src: Some(src),
            len: src.len() as u32,
            ctx,
        });
        Ok(())
    }

    fn erase(&self, addr: u32, len: u32, ctx: usize, events: EventSink) -> Result<(), Error> {
        events.send(&StorageEvent {
            kind: EventKind::EraseResult,
            dispatch: Dispatch::Sync,
            result: Ok(()),
            addr,
            src: None,
            len,
            ctx,
        });
        Ok(())
    }
}

/// RRAM controller over a 256-byte array.
pub struct FakeRram {
    memory: Mutex<RefCell<[u8; 256]>>,
    init_calls: AtomicU32,
    fail_init: bool,
    write_hook: Option<fn()>,
}

impl FakeRram {
    pub fn new() -> Self {
        Self {
            memory: Mutex::new(RefCell::new([0xFF; 256])),
            init_calls: AtomicU32::new(0),
            fail_init: false,
            write_hook: None,
        }
    }

    /// Controller whose init always fails.
    pub fn failing() -> Self {
        Self {
            fail_init: true,
            ..Self::new()
        }
    }

    /// Runs `hook` at the start of every programming cycle.
    pub fn with_write_hook(mut self, hook: fn()) -> Self {
        self.write_hook = Some(hook);
        self
    }

    pub fn init_calls(&self) -> u32 {
        self.init_calls.load(Ordering::Relaxed)
    }
}

impl RramController for FakeRram {
    fn init(&self) -> Result<(), Error> {
        self.init_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_init {
            Err(Error::Internal)
        } else {
            Ok(())
        }
    }

    fn read(&self, addr: u32, buf: &mut [u8]) {
        let start = addr as usize;
        critical_section::with(|cs| {
            buf.copy_from_slice(&self.memory.borrow_ref(cs)[start..start + buf.len()]);
        });
    }

    fn write(&self, addr: u32, data: &[u8]) {
        if let Some(hook) = self.write_hook {
            hook();
        }
        let start = addr as usize;
        critical_section::with(|cs| {
            self.memory.borrow_ref_mut(cs)[start..start + data.len()].copy_from_slice(data);
        });
    }
}

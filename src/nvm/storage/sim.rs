use core::cell::RefCell;

use critical_section::Mutex;
use heapless::{Deque, Vec};

use crate::nvm::{
    Error,
    bytes::{LeBytes, LeBytesMut},
    storage::{Dispatch, EventKind, EventSink, StorageBackend, StorageEvent, StorageInfo},
};

const SIM_UNIT: u32 = 16;
const SIM_ERASE_VALUE: u8 = 0xFF;

/// Ticks an async write waits by default before it lands.
pub const DEFAULT_ASYNC_DELAY_TICKS: u32 = 100;

/// Completion behaviour of [`SimBackend`] writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimMode {
    /// Copy immediately and raise a `Sync` event before returning.
    Sync,
    /// Queue the copy; it lands once [`SimBackend::tick`] has advanced
    /// time by `delay_ticks`, raising an `Async` event.
    Async { delay_ticks: u32 },
}

impl SimMode {
    pub const fn delayed() -> Self {
        SimMode::Async {
            delay_ticks: DEFAULT_ASYNC_DELAY_TICKS,
        }
    }
}

struct PendingWrite<const MAX_WRITE: usize> {
    dest: u32,
    data: Vec<u8, MAX_WRITE>,
    ctx: usize,
    events: EventSink,
    due: u64,
}

struct SimState<const SIZE: usize, const PENDING: usize, const MAX_WRITE: usize> {
    memory: [u8; SIZE],
    pending: Deque<PendingWrite<MAX_WRITE>, PENDING>,
    now: u64,
    refcount: u32,
}

impl<const SIZE: usize, const PENDING: usize, const MAX_WRITE: usize>
    SimState<SIZE, PENDING, MAX_WRITE>
{
    fn region(&mut self, addr: u32, len: usize) -> Result<&mut [u8], Error> {
        LeBytesMut::new(&mut self.memory).into_window(addr as usize, len)
    }

    /// Pops the oldest write if its deadline has passed.
    fn take_due(&mut self) -> Option<PendingWrite<MAX_WRITE>> {
        match self.pending.front() {
            Some(w) if w.due <= self.now => self.pending.pop_front(),
            _ => None,
        }
    }
}

/// Host-side storage medium backed by a RAM array.
///
/// Addresses map 1:1 onto the array, so a storage window must lie within
/// `0..SIZE`. In async mode up to `PENDING` writes of at most `MAX_WRITE`
/// bytes may be queued; time only moves when [`SimBackend::tick`] is
/// called, which makes completion order fully deterministic.
pub struct SimBackend<const SIZE: usize, const PENDING: usize, const MAX_WRITE: usize> {
    mode: SimMode,
    state: Mutex<RefCell<SimState<SIZE, PENDING, MAX_WRITE>>>,
}

impl<const SIZE: usize, const PENDING: usize, const MAX_WRITE: usize>
    SimBackend<SIZE, PENDING, MAX_WRITE>
{
    /// Creates an erased medium.
    pub const fn new(mode: SimMode) -> Self {
        Self {
            mode,
            state: Mutex::new(RefCell::new(SimState {
                memory: [SIM_ERASE_VALUE; SIZE],
                pending: Deque::new(),
                now: 0,
                refcount: 0,
            })),
        }
    }

    pub fn mode(&self) -> SimMode {
        self.mode
    }

    /// Number of queued async writes.
    pub fn pending(&self) -> usize {
        critical_section::with(|cs| self.state.borrow_ref(cs).pending.len())
    }

    /// Advances simulated time and completes every write that became due.
    ///
    /// Events are raised outside the critical section, one per write, in
    /// submission order. Returns the number of completed writes.
    pub fn tick(&self, ticks: u32) -> usize {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.now = state.now.saturating_add(u64::from(ticks));
        });

        let mut completed = 0;
        loop {
            let done = critical_section::with(|cs| {
                let mut state = self.state.borrow_ref_mut(cs);
                let write = state.take_due()?;
                let result = state
                    .region(write.dest, write.data.len())
                    .map(|dst| dst.copy_from_slice(&write.data));
                Some((write, result))
            });
            let Some((write, result)) = done else {
                break;
            };

            log::debug!(
                "sim write of {} bytes at {:#x} completed",
                write.data.len(),
                write.dest
            );
            write.events.send(&StorageEvent {
                kind: EventKind::WriteResult,
                dispatch: Dispatch::Async,
                result,
                addr: write.dest,
                src: Some(write.data.as_slice()),
                len: write.data.len() as u32,
                ctx: write.ctx,
            });
            completed += 1;
        }
        completed
    }

    /// Copies raw medium contents, bypassing any storage window.
    pub fn snapshot(&self, addr: u32, out: &mut [u8]) -> Result<(), Error> {
        critical_section::with(|cs| {
            let state = self.state.borrow_ref(cs);
            let src = LeBytes::new(&state.memory).slice(addr as usize, out.len())?;
            out.copy_from_slice(src);
            Ok(())
        })
    }

    /// Overwrites one byte of the medium, e.g. to inject corruption.
    pub fn poke(&self, addr: u32, byte: u8) -> Result<(), Error> {
        critical_section::with(|cs| {
            self.state.borrow_ref_mut(cs).region(addr, 1)?[0] = byte;
            Ok(())
        })
    }
}

impl<const SIZE: usize, const PENDING: usize, const MAX_WRITE: usize> StorageBackend
    for SimBackend<SIZE, PENDING, MAX_WRITE>
{
    fn info(&self) -> StorageInfo {
        StorageInfo {
            erase_unit: SIM_UNIT,
            erase_value: SIM_ERASE_VALUE,
            program_unit: SIM_UNIT,
            no_explicit_erase: true,
        }
    }

    fn init(&self) -> Result<(), Error> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.refcount = state.refcount.saturating_add(1);
        });
        Ok(())
    }

    fn uninit(&self) -> Result<(), Error> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.refcount == 0 {
                return Err(Error::Forbidden);
            }
            state.refcount -= 1;
            Ok(())
        })
    }

    fn read(&self, src: u32, dest: &mut [u8]) -> Result<(), Error> {
        self.snapshot(src, dest)
    }

    fn write(&self, dest: u32, src: &[u8], ctx: usize, events: EventSink) -> Result<(), Error> {
        match self.mode {
            SimMode::Sync => {
                critical_section::with(|cs| {
                    let mut state = self.state.borrow_ref_mut(cs);
                    state.region(dest, src.len())?.copy_from_slice(src);
                    Ok::<(), Error>(())
                })?;

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
            SimMode::Async { delay_ticks } => {
                let data = Vec::from_slice(src).map_err(|_| Error::OutOfMemory)?;

                critical_section::with(|cs| {
                    let mut state = self.state.borrow_ref_mut(cs);
                    // Reject now rather than fail silently on completion.
                    state.region(dest, src.len())?;
                    let due = state.now.saturating_add(u64::from(delay_ticks));
                    state
                        .pending
                        .push_back(PendingWrite {
                            dest,
                            data,
                            ctx,
                            events,
                            due,
                        })
                        .map_err(|_| Error::OutOfMemory)
                })
            }
        }
    }

    fn erase(&self, addr: u32, len: u32, ctx: usize, events: EventSink) -> Result<(), Error> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.region(addr, len as usize)?.fill(SIM_ERASE_VALUE);
            Ok::<(), Error>(())
        })?;

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

    fn is_busy(&self) -> bool {
        self.pending() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nvm::{
        storage::{Storage, StorageBuilder},
        test_support::{RecordedEvents, assert_event_seen},
    };

    type TestSim = SimBackend<256, 2, 32>;

    static EVENTS: RecordedEvents = RecordedEvents::new();

    fn on_event(evt: &StorageEvent<'_>) {
        EVENTS.push(evt);
    }

    fn storage(sim: &TestSim) -> Storage<'_> {
        let mut storage = StorageBuilder::new()
            .address_range(0, 256)
            .event_handler(on_event)
            .build()
            .unwrap();
        storage.init(sim).unwrap();
        storage
    }

    #[test]
    fn starts_erased() {
        let sim = TestSim::new(SimMode::Sync);
        let mut buf = [0u8; 16];
        sim.snapshot(240, &mut buf).unwrap();
        assert_eq!(buf, [0xFF; 16]);
        assert_eq!(sim.snapshot(250, &mut buf), Err(Error::InvalidAddress));
    }

    #[test]
    fn sync_write_lands_before_return() {
        let sim = TestSim::new(SimMode::Sync);
        let storage = storage(&sim);

        storage.write(16, &[0xA5; 16], 0x1001).unwrap();
        assert_event_seen(&EVENTS, EventKind::WriteResult, 16, 16, 0x1001);
        assert!(EVENTS.any(|e| e.ctx == 0x1001 && e.dispatch == Dispatch::Sync));

        let mut back = [0u8; 16];
        storage.read(16, &mut back).unwrap();
        assert_eq!(back, [0xA5; 16]);
        assert!(!storage.is_busy());
    }

    #[test]
    fn async_write_lands_on_tick() {
        let sim = TestSim::new(SimMode::Async { delay_ticks: 10 });
        let storage = storage(&sim);

        storage.write(32, &[0x3C; 16], 0x2002).unwrap();
        assert!(storage.is_busy());
        assert!(!EVENTS.any(|e| e.ctx == 0x2002));

        let mut back = [0u8; 16];
        sim.snapshot(32, &mut back).unwrap();
        assert_eq!(back, [0xFF; 16]);

        assert_eq!(sim.tick(9), 0);
        assert_eq!(sim.tick(1), 1);
        assert!(!storage.is_busy());
        assert_event_seen(&EVENTS, EventKind::WriteResult, 32, 16, 0x2002);
        assert!(EVENTS.any(|e| e.ctx == 0x2002 && e.dispatch == Dispatch::Async));

        sim.snapshot(32, &mut back).unwrap();
        assert_eq!(back, [0x3C; 16]);
    }

    #[test]
    fn async_queue_is_bounded() {
        let sim = TestSim::new(SimMode::delayed());
        let storage = storage(&sim);

        storage.write(0, &[1; 16], 0).unwrap();
        storage.write(16, &[2; 16], 0).unwrap();
        assert_eq!(storage.write(32, &[3; 16], 0), Err(Error::OutOfMemory));
        assert_eq!(storage.write(48, &[4; 48], 0), Err(Error::OutOfMemory));

        assert_eq!(sim.tick(DEFAULT_ASYNC_DELAY_TICKS), 2);
        storage.write(32, &[3; 16], 0).unwrap();
    }

    #[test]
    fn erase_fills_with_erase_value() {
        let sim = TestSim::new(SimMode::Sync);
        let storage = storage(&sim);

        storage.write(64, &[0; 32], 0).unwrap();
        storage.erase(64, 16, 0x3003).unwrap();
        assert_event_seen(&EVENTS, EventKind::EraseResult, 64, 16, 0x3003);

        let mut back = [0u8; 32];
        sim.snapshot(64, &mut back).unwrap();
        assert_eq!(&back[..16], &[0xFF; 16]);
        assert_eq!(&back[16..], &[0x00; 16]);
    }

    #[test]
    fn refcounted_init() {
        let sim = TestSim::new(SimMode::Sync);

        assert_eq!(sim.uninit(), Err(Error::Forbidden));
        sim.init().unwrap();
        sim.init().unwrap();
        sim.uninit().unwrap();
        sim.uninit().unwrap();
        assert_eq!(sim.uninit(), Err(Error::Forbidden));
    }

    #[test]
    fn poke_corrupts_single_byte() {
        let sim = TestSim::new(SimMode::Sync);
        sim.poke(3, 0x00).unwrap();

        let mut back = [0u8; 4];
        sim.snapshot(2, &mut back).unwrap();
        assert_eq!(back, [0xFF, 0x00, 0xFF, 0xFF]);
        assert_eq!(sim.poke(256, 0), Err(Error::InvalidAddress));
    }
}

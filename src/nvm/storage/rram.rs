use core::sync::atomic::{AtomicBool, Ordering};

use crate::nvm::{
    Error,
    storage::{Dispatch, EventKind, EventSink, StorageBackend, StorageEvent, StorageInfo},
};

/// Bytes in one RRAM word line (128 bits).
pub const RRAM_WRITE_BLOCK_SIZE: u32 = 16;

/// Driver for the resistive RAM controller.
///
/// Writes are synchronous: `write` returns once the data is programmed.
/// The backend calls the driver with interrupts enabled and never runs two
/// `init`/`write` calls at once, but `read` may overlap a write from another
/// context.
pub trait RramController: Sync {
    fn init(&self) -> Result<(), Error>;
    fn read(&self, addr: u32, buf: &mut [u8]);
    fn write(&self, addr: u32, data: &[u8]);
}

/// Backend for RRAM, which is byte-writable and needs no explicit erase.
///
/// The controller is shared by every storage instance bound to this
/// backend. One operation may be in flight at a time; a concurrent caller
/// gets [`Error::Busy`].
pub struct RramBackend<D> {
    driver: D,
    initialized: AtomicBool,
    in_flight: AtomicBool,
}

impl<D: RramController> RramBackend<D> {
    pub const fn new(driver: D) -> Self {
        Self {
            driver,
            initialized: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
        }
    }

    fn try_claim(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn release(&self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

impl<D: RramController> StorageBackend for RramBackend<D> {
    fn info(&self) -> StorageInfo {
        StorageInfo {
            erase_unit: RRAM_WRITE_BLOCK_SIZE,
            erase_value: 0xFF,
            program_unit: RRAM_WRITE_BLOCK_SIZE,
            no_explicit_erase: true,
        }
    }

    fn init(&self) -> Result<(), Error> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        if !self.try_claim() {
            log::warn!("rram init while an operation is in flight");
            return Err(Error::Busy);
        }

        let res = self.driver.init();
        if res.is_ok() {
            self.initialized.store(true, Ordering::Release);
        } else {
            log::error!("rram controller init failed");
        }

        self.release();
        res.map_err(|_| Error::Internal)
    }

    fn uninit(&self) -> Result<(), Error> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(Error::Forbidden);
        }
        // Other clients may still use the controller.
        Ok(())
    }

    fn read(&self, src: u32, dest: &mut [u8]) -> Result<(), Error> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(Error::Forbidden);
        }
        self.driver.read(src, dest);
        Ok(())
    }

    fn write(&self, dest: u32, src: &[u8], ctx: usize, events: EventSink) -> Result<(), Error> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(Error::Forbidden);
        }
        if !self.try_claim() {
            log::warn!("rram write to {:#x} rejected, controller busy", dest);
            return Err(Error::Busy);
        }

        // The claim keeps other writers out while the controller programs.
        self.driver.write(dest, src);

        // Cleared first so the handler can start the next operation.
        self.release();

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

    fn is_busy(&self) -> bool {
        !self.initialized.load(Ordering::Acquire) || self.in_flight.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use core::{cell::RefCell, sync::atomic::AtomicUsize};
    use std::boxed::Box;

    use critical_section::Mutex;

    use super::*;
    use crate::nvm::{
        storage::{Storage, StorageBuilder},
        test_support::{FakeRram, RecordedEvents, assert_event_seen},
    };

    static EVENTS: RecordedEvents = RecordedEvents::new();

    fn on_event(evt: &StorageEvent<'_>) {
        EVENTS.push(evt);
    }

    #[test]
    fn uninitialized_backend_refuses_io() {
        let rram = RramBackend::new(FakeRram::new());
        let mut buf = [0u8; 16];

        assert!(rram.is_busy());
        assert_eq!(rram.read(0, &mut buf), Err(Error::Forbidden));
        assert_eq!(rram.write(0, &buf, 0, EventSink::none()), Err(Error::Forbidden));
        assert_eq!(rram.uninit(), Err(Error::Forbidden));
    }

    #[test]
    fn init_is_shared_between_clients() {
        let rram = RramBackend::new(FakeRram::new());

        rram.init().unwrap();
        rram.init().unwrap();
        assert_eq!(rram.driver.init_calls(), 1);
        assert!(!rram.is_busy());

        rram.uninit().unwrap();
        // Controller stays up after uninit.
        rram.uninit().unwrap();
    }

    #[test]
    fn driver_failure_is_internal() {
        let rram = RramBackend::new(FakeRram::failing());

        assert_eq!(rram.init(), Err(Error::Internal));
        assert!(rram.is_busy());
        // Guard released after the failure.
        assert!(!rram.in_flight.load(Ordering::Acquire));
    }

    #[test]
    fn claimed_guard_reports_busy() {
        let rram = RramBackend::new(FakeRram::new());
        rram.init().unwrap();

        assert!(rram.try_claim());
        assert!(rram.is_busy());
        assert_eq!(rram.write(0, &[0; 16], 0, EventSink::none()), Err(Error::Busy));
        rram.release();

        rram.write(0, &[0; 16], 0, EventSink::none()).unwrap();
    }

    #[test]
    fn erase_is_not_supported() {
        let rram = RramBackend::new(FakeRram::new());
        rram.init().unwrap();
        assert_eq!(rram.erase(0, 16, 0, EventSink::none()), Err(Error::NotSupported));
    }

    #[test]
    fn write_through_storage_raises_sync_event() {
        let rram = RramBackend::new(FakeRram::new());
        let mut storage = StorageBuilder::new()
            .address_range(0, 256)
            .event_handler(on_event)
            .build()
            .unwrap();
        storage.init(&rram).unwrap();

        let data = [0x42u8; 32];
        storage.write(0x20, &data, 0x5151).unwrap();
        assert_event_seen(&EVENTS, EventKind::WriteResult, 0x20, 32, 0x5151);
        assert!(EVENTS.any(|e| e.ctx == 0x5151 && e.dispatch == Dispatch::Sync));

        let mut back = [0u8; 32];
        storage.read(0x20, &mut back).unwrap();
        assert_eq!(back, data);

        // Program unit is one word line.
        assert_eq!(storage.write(0x20, &data[..8], 0), Err(Error::InvalidLength));
    }

    #[test]
    fn handler_may_write_again_from_write_event() {
        static STORAGE: Mutex<RefCell<Option<&'static Storage<'static>>>> =
            Mutex::new(RefCell::new(None));
        static EVENT_COUNT: AtomicUsize = AtomicUsize::new(0);
        static CHAINED: Mutex<RefCell<Option<Result<(), Error>>>> = Mutex::new(RefCell::new(None));

        fn chain_write(evt: &StorageEvent<'_>) {
            EVENT_COUNT.fetch_add(1, Ordering::SeqCst);
            if evt.ctx != 1 {
                return;
            }
            let storage = critical_section::with(|cs| *STORAGE.borrow_ref(cs));
            if let Some(storage) = storage {
                let res = storage.write(0x40, &[7; 16], 2);
                critical_section::with(|cs| CHAINED.borrow_ref_mut(cs).replace(res));
            }
        }

        let rram: &'static RramBackend<FakeRram> =
            Box::leak(Box::new(RramBackend::new(FakeRram::new())));
        let mut storage = StorageBuilder::new()
            .address_range(0, 256)
            .event_handler(chain_write)
            .build()
            .unwrap();
        storage.init(rram).unwrap();
        let storage: &'static Storage<'static> = Box::leak(Box::new(storage));
        critical_section::with(|cs| STORAGE.borrow_ref_mut(cs).replace(storage));

        storage.write(0x20, &[1; 16], 1).unwrap();

        assert_eq!(critical_section::with(|cs| *CHAINED.borrow_ref(cs)), Some(Ok(())));
        assert_eq!(EVENT_COUNT.load(Ordering::SeqCst), 2);
        assert!(!rram.is_busy());

        let mut back = [0u8; 16];
        storage.read(0x40, &mut back).unwrap();
        assert_eq!(back, [7; 16]);
    }

    #[test]
    fn write_in_flight_rejects_overlapping_write() {
        static BACKEND: Mutex<RefCell<Option<&'static RramBackend<FakeRram>>>> =
            Mutex::new(RefCell::new(None));
        static SEEN: Mutex<RefCell<Option<(bool, Result<(), Error>)>>> =
            Mutex::new(RefCell::new(None));

        // Stands in for an interrupt arriving mid-programming.
        fn interrupting_write() {
            let backend = critical_section::with(|cs| *BACKEND.borrow_ref(cs));
            if let Some(backend) = backend {
                let busy = backend.is_busy();
                let res = backend.write(0x80, &[0; 16], 9, EventSink::none());
                critical_section::with(|cs| SEEN.borrow_ref_mut(cs).replace((busy, res)));
            }
        }

        let rram: &'static RramBackend<FakeRram> = Box::leak(Box::new(RramBackend::new(
            FakeRram::new().with_write_hook(interrupting_write),
        )));
        rram.init().unwrap();
        critical_section::with(|cs| BACKEND.borrow_ref_mut(cs).replace(rram));

        rram.write(0x20, &[5; 16], 0, EventSink::none()).unwrap();

        assert_eq!(
            critical_section::with(|cs| *SEEN.borrow_ref(cs)),
            Some((true, Err(Error::Busy)))
        );
        assert!(!rram.is_busy());

        let mut back = [0u8; 16];
        rram.read(0x20, &mut back).unwrap();
        assert_eq!(back, [5; 16]);
        rram.read(0x80, &mut back).unwrap();
        assert_eq!(back, [0xFF; 16]);
    }
}

//! A `no_std`, no-alloc non-volatile storage layer for bare-metal systems.
//!
//! This crate provides a storage front end over pluggable NVM backends,
//! plus the small building blocks that make it usable from interrupt
//! context on a single-core MCU without an RTOS.
//!
//! # Features
//!
//! - **Pluggable backends** - RRAM controller and a host-side simulator behind one trait
//! - **Checked front end** - bounds and alignment validated once, before any backend call
//! - **Uniform completion events** - sync and async backends report the same way
//! - **Retained clipboard** - CRC-sealed TLV log that survives a warm reset
//! - **ISR hand-off** - deferred event scheduler, circular buffer and atomic block pool
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   defer()   ┌─────────────┐   process()   ┌──────────────┐
//! │ ISR          │────────────▶│ Scheduler   │──────────────▶│ Main loop    │
//! └──────────────┘             └─────────────┘               └──────┬───────┘
//!                                                                   │ write()
//!                              ┌─────────────┐  validated     ┌──────▼───────┐
//!                              │ Backend     │◀───────────────│ Storage      │
//!                              │ (RRAM, sim) │────event──────▶│ handler      │
//!                              └─────────────┘                └──────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use embedded_persist::prelude::*;
//!
//! fn on_event(evt: &StorageEvent<'_>) {
//!     let _ = (evt.kind, evt.result, evt.ctx);
//! }
//!
//! let sim: SimBackend<4096, 4, 64> = SimBackend::new(SimMode::Sync);
//! let mut storage = StorageBuilder::new()
//!     .address_range(0x0000, 0x1000)
//!     .event_handler(on_event)
//!     .build()
//!     .unwrap();
//! storage.init(&sim).unwrap();
//!
//! // Writes must cover whole program units (16 bytes here).
//! storage.write(0x100, &[0xA5; 16], 1).unwrap();
//!
//! // Hand a device name across a warm reset.
//! let mut retained = [0u8; 64];
//! let mut clip = Clipboard::new(&mut retained);
//! let mut w = clip.writer();
//! w.data_write(embedded_persist::nvm::clipboard::DEVICE_NAME, b"sensor-7").unwrap();
//! w.crc32_write().unwrap();
//! assert_eq!(clip.crc32_verify(), Ok(12));
//! ```

#![deny(unsafe_code)]
#![no_std]

pub mod nvm;

pub mod prelude {
    pub use crate::nvm::prelude::*;
}

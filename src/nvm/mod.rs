pub mod block_pool;
pub mod bytes;
pub mod clipboard;
pub mod crc;
pub(crate) mod critical;
pub mod error;
pub mod fifo;
pub mod helpers;
pub mod scheduler;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use block_pool::{BlockId, BlockPool, lock_words};
pub use clipboard::{Clipboard, ClipboardCtx, ClipboardReader, ClipboardWriter, DataDesc, Record};
pub use error::Error;
pub use fifo::CircularBuffer;
pub use scheduler::{EventFn, Scheduler};
pub use storage::{
    Dispatch, EventHandler, EventKind, EventSink, RramBackend, RramController, SimBackend,
    SimMode, Storage, StorageBackend, StorageBuilder, StorageEvent, StorageInfo,
};

pub mod prelude {
    pub use super::{
        BlockId, BlockPool, CircularBuffer, Clipboard, ClipboardCtx, ClipboardReader,
        ClipboardWriter, DataDesc, Dispatch, Error, EventFn, EventHandler, EventKind, EventSink,
        Record, RramBackend, RramController, Scheduler, SimBackend, SimMode, Storage,
        StorageBackend, StorageBuilder, StorageEvent, StorageInfo, lock_words,
    };
}

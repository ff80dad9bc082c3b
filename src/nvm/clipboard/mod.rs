//! Retained clipboard: a small TLV log in memory that survives warm reset.
//!
//! Layout, all fields little-endian:
//!
//! ```text
//! offset 0
//! | type u16 | len u16 | payload ... | type u16 | len u16 | payload ... |
//! | CRC32 (0x0002) | 4 | crc32(bytes[0..trailer]) u32 |
//! ```
//!
//! Records are appended from offset 0. Sealing appends a trailer whose
//! checksum covers every byte before it. A region is trusted only once the
//! trailer is found and its checksum matches.

pub mod tlv;

pub use tlv::{CRC32, DEVICE_NAME, Record, TLV_HEADER_SIZE, TRAILER_SIZE};

use crate::nvm::{
    Error,
    bytes::{LeBytes, LeBytesMut},
    crc::crc32_ieee,
};
use tlv::{TlvHeader, record_at};

/// Cursor over a clipboard region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipboardCtx {
    offset: usize,
    max_offset: usize,
}

impl ClipboardCtx {
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// End of the usable area: reserved trailer space for a writer, the
    /// verified length for a reader.
    pub fn max_offset(&self) -> usize {
        self.max_offset
    }
}

/// Lookup request for [`ClipboardReader::data_get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDesc<'a> {
    pub ty: u16,
    pub data: &'a [u8],
}

impl DataDesc<'_> {
    pub fn new(ty: u16) -> Self {
        Self { ty, data: &[] }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Retained memory region holding the TLV log.
pub struct Clipboard<'a> {
    region: &'a mut [u8],
}

impl<'a> Clipboard<'a> {
    pub fn new(region: &'a mut [u8]) -> Self {
        Self { region }
    }

    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    /// Starts a new log at offset 0, keeping room for the trailer.
    pub fn writer(&mut self) -> ClipboardWriter<'_> {
        let max_offset = self.region.len().saturating_sub(TRAILER_SIZE);
        ClipboardWriter {
            bytes: LeBytesMut::new(self.region),
            ctx: ClipboardCtx {
                offset: 0,
                max_offset,
            },
            sealed: false,
        }
    }

    /// Finds the trailer and checks its checksum.
    ///
    /// Returns the number of bytes the checksum covers.
    ///
    /// # Errors
    /// * [`Error::NotFound`] - no trailer, or the record chain runs past the region
    /// * [`Error::CrcMismatch`] - the stored checksum does not match
    pub fn crc32_verify(&self) -> Result<usize, Error> {
        let bytes = LeBytes::new(&*self.region);
        let mut offset = 0;

        loop {
            let hdr = TlvHeader::read_at(bytes, offset).map_err(|_| Error::NotFound)?;
            if hdr.is_trailer() {
                break;
            }
            offset = hdr.next(offset);
            if offset > bytes.len() {
                return Err(Error::NotFound);
            }
        }

        let stored = bytes
            .u32_le_at(offset + TLV_HEADER_SIZE)
            .map_err(|_| Error::NotFound)?;
        let covered = bytes.slice(0, offset)?;
        let computed = crc32_ieee(covered);

        if stored != computed {
            log::warn!(
                "clipboard crc mismatch: stored {:#010x}, computed {:#010x}",
                stored,
                computed
            );
            return Err(Error::CrcMismatch);
        }
        Ok(offset)
    }

    /// Opens a reader over the verified part of the region.
    pub fn reader(&self) -> Result<ClipboardReader<'_>, Error> {
        let max_offset = self.crc32_verify()?;
        Ok(ClipboardReader {
            bytes: LeBytes::new(&*self.region),
            ctx: ClipboardCtx {
                offset: 0,
                max_offset,
            },
        })
    }

    /// Zeroes the whole region, invalidating any sealed log.
    pub fn clear(&mut self) {
        self.region.fill(0);
    }
}

/// Appends records to a [`Clipboard`] and seals them.
pub struct ClipboardWriter<'c> {
    bytes: LeBytesMut<'c>,
    ctx: ClipboardCtx,
    sealed: bool,
}

impl ClipboardWriter<'_> {
    pub fn ctx(&self) -> ClipboardCtx {
        self.ctx
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Appends a `ty` record carrying `data`.
    ///
    /// # Errors
    /// * [`Error::InvalidParameter`] - `ty` is the reserved [`CRC32`] tag or
    ///   `data` is longer than `u16::MAX`
    /// * [`Error::InvalidState`] - the log is already sealed
    /// * [`Error::OutOfMemory`] - the record would cut into trailer space
    pub fn data_write(&mut self, ty: u16, data: &[u8]) -> Result<(), Error> {
        if ty == CRC32 {
            return Err(Error::InvalidParameter);
        }
        let len = u16::try_from(data.len()).map_err(|_| Error::InvalidParameter)?;
        if self.sealed {
            return Err(Error::InvalidState);
        }

        let hdr = TlvHeader { ty, len };
        let next = hdr.next(self.ctx.offset);
        if next > self.ctx.max_offset {
            return Err(Error::OutOfMemory);
        }

        hdr.write_at(&mut self.bytes, self.ctx.offset)?;
        self.bytes.put_at(self.ctx.offset + TLV_HEADER_SIZE, data)?;
        self.ctx.offset = next;
        Ok(())
    }

    /// Appends the checksum trailer. No records can follow.
    pub fn crc32_write(&mut self) -> Result<(), Error> {
        if self.sealed {
            return Err(Error::InvalidState);
        }

        let offset = self.ctx.offset;
        let crc = crc32_ieee(self.bytes.window(0, offset)?);

        let hdr = TlvHeader::trailer();
        hdr.write_at(&mut self.bytes, offset)
            .map_err(|_| Error::OutOfMemory)?;
        self.bytes
            .set_u32_le_at(offset + TLV_HEADER_SIZE, crc)
            .map_err(|_| Error::OutOfMemory)?;

        self.ctx.offset = hdr.next(offset);
        self.sealed = true;
        log::debug!("clipboard sealed, {} bytes covered", offset);
        Ok(())
    }
}

/// Looks up records in a verified [`Clipboard`].
///
/// Iterating yields records in write order and advances the cursor;
/// [`data_get`](ClipboardReader::data_get) and
/// [`find`](ClipboardReader::find) search from the cursor without moving it.
pub struct ClipboardReader<'c> {
    bytes: LeBytes<'c>,
    ctx: ClipboardCtx,
}

impl<'c> ClipboardReader<'c> {
    pub fn ctx(&self) -> ClipboardCtx {
        self.ctx
    }

    /// First record of type `ty` at or after the cursor.
    pub fn find(&self, ty: u16) -> Result<&'c [u8], Error> {
        let mut offset = self.ctx.offset;
        while let Some((rec, next)) = record_at(self.bytes, offset, self.ctx.max_offset) {
            if rec.ty == ty {
                return Ok(rec.data);
            }
            offset = next;
        }
        Err(Error::NotFound)
    }

    /// Fills `desc.data` with the payload of the first `desc.ty` record.
    pub fn data_get(&self, desc: &mut DataDesc<'c>) -> Result<(), Error> {
        desc.data = self.find(desc.ty)?;
        Ok(())
    }
}

impl<'c> Iterator for ClipboardReader<'c> {
    type Item = Record<'c>;

    fn next(&mut self) -> Option<Self::Item> {
        let (rec, next) = record_at(self.bytes, self.ctx.offset, self.ctx.max_offset)?;
        self.ctx.offset = next;
        Some(rec)
    }
}

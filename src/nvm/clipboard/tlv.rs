use crate::nvm::{
    Error,
    bytes::{LeBytes, LeBytesMut},
};

/// Device name handed over across a warm reset.
pub const DEVICE_NAME: u16 = 0x0001;
/// Reserved for the trailer record.
pub const CRC32: u16 = 0x0002;

/// `type` and `len`, both `u16` little-endian.
pub const TLV_HEADER_SIZE: usize = 4;
/// Trailer record: header plus the CRC32 value.
pub const TRAILER_SIZE: usize = TLV_HEADER_SIZE + CRC32_LEN as usize;

const CRC32_LEN: u16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TlvHeader {
    pub ty: u16,
    pub len: u16,
}

impl TlvHeader {
    pub fn read_at(bytes: LeBytes<'_>, offset: usize) -> Result<Self, Error> {
        Ok(Self {
            ty: bytes.u16_le_at(offset)?,
            len: bytes.u16_le_at(offset + 2)?,
        })
    }

    pub fn write_at(&self, bytes: &mut LeBytesMut<'_>, offset: usize) -> Result<(), Error> {
        bytes.set_u16_le_at(offset, self.ty)?;
        bytes.set_u16_le_at(offset + 2, self.len)
    }

    pub fn is_trailer(&self) -> bool {
        self.ty == CRC32 && self.len == CRC32_LEN
    }

    /// Offset just past this record's payload.
    pub fn next(&self, offset: usize) -> usize {
        offset + TLV_HEADER_SIZE + self.len as usize
    }

    pub fn trailer() -> Self {
        Self {
            ty: CRC32,
            len: CRC32_LEN,
        }
    }
}

/// One record read back from the clipboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub ty: u16,
    pub data: &'a [u8],
}

/// Parses the record at `offset`, requiring it to end by `limit`.
pub(crate) fn record_at(bytes: LeBytes<'_>, offset: usize, limit: usize) -> Option<(Record<'_>, usize)> {
    let hdr = TlvHeader::read_at(bytes, offset).ok()?;
    let next = hdr.next(offset);
    if next > limit {
        return None;
    }
    let data = bytes.slice(offset + TLV_HEADER_SIZE, hdr.len as usize).ok()?;
    Some((Record { ty: hdr.ty, data }, next))
}

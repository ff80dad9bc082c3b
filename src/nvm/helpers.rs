//! Address and alignment arithmetic shared by the storage front end.
//!
//! Backends never repeat these checks; [`Storage`](crate::nvm::Storage)
//! runs them once before forwarding a request.

use crate::nvm::Error;

/// Calculates the exclusive end of `[addr, addr + len)` inside `[start, end)`.
///
/// Returns `addr + len` if the whole range lies inside the region.
///
/// # Errors
/// * [`Error::InvalidLength`] - if `len` is 0
/// * [`Error::InvalidAddress`] - if any byte of the range is outside the region
///
/// # Example
/// ```
/// use embedded_persist::nvm::helpers::range_end;
///
/// // 0x1000..0x2000 region, 16 bytes at 0x1FF0 fit exactly
/// assert_eq!(range_end(0x1FF0, 16, 0x1000, 0x2000), Ok(0x2000));
///
/// // One more byte would cross the end
/// assert!(range_end(0x1FF0, 17, 0x1000, 0x2000).is_err());
/// ```
pub fn range_end(addr: u32, len: u32, start: u32, end: u32) -> Result<u32, Error> {
    if len == 0 {
        return Err(Error::InvalidLength);
    }

    let last = addr.checked_add(len).ok_or(Error::InvalidAddress)?;

    if addr < start || last > end {
        return Err(Error::InvalidAddress);
    }

    Ok(last)
}

/// Checks that `len` is a non-zero multiple of `unit`.
///
/// A `unit` of 0 or 1 imposes no granularity beyond non-zero length.
pub fn check_granularity(len: u32, unit: u32) -> Result<(), Error> {
    if len == 0 {
        return Err(Error::InvalidLength);
    }
    if unit > 1 && len % unit != 0 {
        return Err(Error::InvalidLength);
    }
    Ok(())
}

#[test]
fn range_end_edge_cases() {
    // Zero length
    assert_eq!(range_end(0, 0, 0, 16), Err(Error::InvalidLength));

    // Below start
    assert_eq!(range_end(3, 2, 4, 16), Err(Error::InvalidAddress));

    // Crossing end
    assert_eq!(range_end(15, 2, 0, 16), Err(Error::InvalidAddress));

    // Starting at end
    assert_eq!(range_end(16, 1, 0, 16), Err(Error::InvalidAddress));

    // Address overflow
    assert_eq!(range_end(u32::MAX, 2, 0, u32::MAX), Err(Error::InvalidAddress));

    // Whole region
    assert_eq!(range_end(0, 16, 0, 16), Ok(16));

    // Last byte
    assert_eq!(range_end(15, 1, 0, 16), Ok(16));
}

#[test]
fn granularity_edge_cases() {
    assert_eq!(check_granularity(0, 4), Err(Error::InvalidLength));
    assert_eq!(check_granularity(3, 4), Err(Error::InvalidLength));
    assert_eq!(check_granularity(4, 4), Ok(()));
    assert_eq!(check_granularity(32, 16), Ok(()));
    assert_eq!(check_granularity(7, 1), Ok(()));
    assert_eq!(check_granularity(7, 0), Ok(()));
}

//! Bounds-checked little-endian access over byte slices.
//!
//! The retained clipboard layout is defined in terms of `u16`/`u32`
//! little-endian fields at byte offsets. These wrappers replace raw
//! pointer casts: every access is range checked and reports
//! [`Error::InvalidAddress`] instead of panicking.

use crate::nvm::Error;

/// Generates a checked little-endian getter for one primitive type.
macro_rules! impl_le_get {
    ($type:ty, $size:literal) => {
        paste::paste! {
            #[doc = "Reads a little-endian `" $type "` at `offset`."]
            #[inline]
            pub fn [<$type _le_at>](&self, offset: usize) -> Result<$type, Error> {
                let raw = self.window(offset, $size)?;
                let mut buf = [0u8; $size];
                buf.copy_from_slice(raw);
                Ok(<$type>::from_le_bytes(buf))
            }
        }
    };
}

/// Generates a checked little-endian setter for one primitive type.
macro_rules! impl_le_set {
    ($type:ty, $size:literal) => {
        paste::paste! {
            #[doc = "Writes a little-endian `" $type "` at `offset`."]
            #[inline]
            pub fn [<set_ $type _le_at>](&mut self, offset: usize, value: $type) -> Result<(), Error> {
                self.window_mut(offset, $size)?
                    .copy_from_slice(&value.to_le_bytes());
                Ok(())
            }
        }
    };
}

/// Generates the shared read side: `len`, `window`, and the getters.
macro_rules! impl_le_reads {
    () => {
        /// Returns the length of the underlying slice.
        #[inline]
        pub fn len(&self) -> usize {
            self.0.len()
        }

        /// Returns true if the underlying slice is empty.
        #[inline]
        pub fn is_empty(&self) -> bool {
            self.0.is_empty()
        }

        /// Borrows `len` bytes starting at `offset`.
        #[inline]
        pub fn window(&self, offset: usize, len: usize) -> Result<&[u8], Error> {
            let end = offset.checked_add(len).ok_or(Error::InvalidAddress)?;
            self.0.get(offset..end).ok_or(Error::InvalidAddress)
        }

        impl_le_get!(u16, 2);
        impl_le_get!(u32, 4);
    };
}

/// Read-only little-endian view.
#[derive(Debug, Clone, Copy)]
pub struct LeBytes<'a>(&'a [u8]);

impl<'a> LeBytes<'a> {
    #[inline]
    pub fn new(slice: &'a [u8]) -> Self {
        Self(slice)
    }

    /// Borrows `len` bytes at `offset` for the full lifetime of the view.
    #[inline]
    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8], Error> {
        let end = offset.checked_add(len).ok_or(Error::InvalidAddress)?;
        self.0.get(offset..end).ok_or(Error::InvalidAddress)
    }

    impl_le_reads!();
}

/// Read-write little-endian view.
#[derive(Debug)]
pub struct LeBytesMut<'a>(&'a mut [u8]);

impl<'a> LeBytesMut<'a> {
    #[inline]
    pub fn new(slice: &'a mut [u8]) -> Self {
        Self(slice)
    }

    /// Mutably borrows `len` bytes starting at `offset`.
    #[inline]
    pub fn window_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8], Error> {
        let end = offset.checked_add(len).ok_or(Error::InvalidAddress)?;
        self.0.get_mut(offset..end).ok_or(Error::InvalidAddress)
    }

    /// Consumes the view, keeping `len` bytes at `offset` for its lifetime.
    #[inline]
    pub fn into_window(self, offset: usize, len: usize) -> Result<&'a mut [u8], Error> {
        let end = offset.checked_add(len).ok_or(Error::InvalidAddress)?;
        self.0.get_mut(offset..end).ok_or(Error::InvalidAddress)
    }

    /// Copies `src` into the slice at `offset`.
    #[inline]
    pub fn put_at(&mut self, offset: usize, src: &[u8]) -> Result<(), Error> {
        self.window_mut(offset, src.len())?.copy_from_slice(src);
        Ok(())
    }

    impl_le_reads!();
    impl_le_set!(u16, 2);
    impl_le_set!(u32, 4);
}
